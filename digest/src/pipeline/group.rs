use indexmap::IndexMap;
use strum::IntoEnumIterator;

use crate::model::{CategorizedMessage, Category};

/// Messages per category. Keys follow `Category` declaration order and
/// only categories with at least one message are present.
pub type CategoryGroup = IndexMap<Category, Vec<CategorizedMessage>>;

pub fn group(messages: Vec<CategorizedMessage>) -> CategoryGroup {
    let mut buckets: IndexMap<Category, Vec<CategorizedMessage>> =
        Category::iter().map(|c| (c, Vec::new())).collect();

    for message in messages {
        buckets.entry(message.category).or_default().push(message);
    }

    buckets.retain(|_, group| !group.is_empty());
    buckets
}
