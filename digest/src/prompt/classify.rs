use indoc::formatdoc;
use strum::IntoEnumIterator;

use crate::{
    email::extracted_message::ExtractedMessage,
    error::{AppError, AppResult},
    model::{Category, Classification, FallbackReason},
};

use super::{CompletionProvider, CompletionRequest};

pub fn system_prompt() -> String {
    let category_lines = Category::iter()
        .map(|c| format!("- {}: {}", c.as_str(), c.description()))
        .collect::<Vec<_>>()
        .join("\n");

    formatdoc! {r#"
        You are a helpful assistant that sorts emails into exactly one of these categories:
        {category_lines}

        individual_recruitment and job_postings are easy to confuse. Tell them apart by:
        - Personalization: individual_recruitment addresses the recipient by name and refers to their background; job_postings is generic and could go to anyone.
        - Sender type: individual_recruitment comes from a named person writing from their own address; job_postings comes from automated senders such as alerts@, noreply@ or a job board.
        - Call to action: individual_recruitment asks for something specific (a call, an interview slot, a reply about one role); job_postings lists several openings or links to search results.

        Respond with the category label only, exactly as written above ({labels}). Do not provide explanations or multiple categories."#,
        category_lines = category_lines,
        labels = Category::all_labels(),
    }
}

pub fn classification_user_prompt(message: &ExtractedMessage, excerpt_chars: usize) -> String {
    formatdoc! {r#"
        Categorize the following email.
        <from>{from}</from>
        <subject>{subject}</subject>
        <date>{date}</date>
        <body>{body}</body>"#,
        from = message.from,
        subject = message.subject,
        date = message.date,
        body = message.excerpt(excerpt_chars),
    }
}

/// Decode a raw model answer, falling back to `other`
pub fn parse_category_answer(answer: &str) -> Classification {
    match Category::from_label(answer) {
        Some(category) => Classification::matched(category),
        None => Classification::fallback(FallbackReason::UnrecognizedLabel(answer.to_string())),
    }
}

/// Classify one message with one completion request.
/// Provider errors and unknown labels both land in `other`. Only rejected
/// credentials are returned as an error, since every later call would fail too.
pub async fn classify_message(
    llm: &dyn CompletionProvider,
    message: &ExtractedMessage,
    excerpt_chars: usize,
    max_tokens: u32,
) -> AppResult<Classification> {
    let request = CompletionRequest {
        system: Some(system_prompt()),
        prompt: classification_user_prompt(message, excerpt_chars),
        max_tokens,
    };

    let classification = match llm.complete(request).await {
        Ok(answer) => parse_category_answer(&answer),
        Err(e @ AppError::Auth(_)) => return Err(e),
        Err(e) => Classification::fallback(FallbackReason::ProviderFailure(e.to_string())),
    };

    match &classification.fallback {
        None => tracing::debug!(
            "Message {} classified as {}",
            message.id,
            classification.category
        ),
        Some(FallbackReason::UnrecognizedLabel(raw)) => tracing::warn!(
            "Message {} got unrecognized label {:?}, using other",
            message.id,
            raw
        ),
        Some(FallbackReason::ProviderFailure(e)) => tracing::error!(
            "Classification request for message {} failed, using other: {}",
            message.id,
            e
        ),
    }

    Ok(classification)
}
