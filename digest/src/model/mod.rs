pub mod category;
pub mod message;

pub use category::{Category, CategoryFamily};
pub use message::{CategorizedMessage, Classification, FallbackReason, Summary};
