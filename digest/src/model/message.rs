use derive_more::derive::Display;

use crate::email::extracted_message::ExtractedMessage;

use super::Category;

/// Why a message ended up in `other` without the model choosing it
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum FallbackReason {
    #[display("unrecognized label {_0:?}")]
    UnrecognizedLabel(String),
    #[display("provider failure: {_0}")]
    ProviderFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub fallback: Option<FallbackReason>,
}

impl Classification {
    pub fn matched(category: Category) -> Self {
        Self {
            category,
            fallback: None,
        }
    }

    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            category: Category::Other,
            fallback: Some(reason),
        }
    }
}

/// A message together with the one category it was assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedMessage {
    pub message: ExtractedMessage,
    pub category: Category,
}

impl CategorizedMessage {
    pub fn new(message: ExtractedMessage, category: Category) -> Self {
        Self { message, category }
    }

    pub fn id(&self) -> &str {
        &self.message.id
    }
}

/// `generated` is false when `text` is the placeholder, in which case the
/// group's messages never reached the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub category: Category,
    pub message_count: usize,
    pub text: String,
    pub generated: bool,
}
