pub mod client;
pub mod extracted_message;
pub mod mime;
