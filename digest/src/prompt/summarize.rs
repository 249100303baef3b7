use indoc::{formatdoc, indoc};

use crate::{
    error::{AppError, AppResult},
    model::{CategorizedMessage, Category, CategoryFamily, Summary},
};

use super::{CompletionProvider, CompletionRequest};

pub const NO_SUMMARY: &str = "No summary available";

fn family_instructions(family: CategoryFamily) -> &'static str {
    match family {
        CategoryFamily::Recruitment => indoc! {"
            These emails are personal messages from recruiters and hiring managers.
            For each email give one bullet naming the sender, their company, the role offered and any urgency or deadline (interview slots, reply-by dates).
            End with the single most time-sensitive follow-up."},
        CategoryFamily::JobPostings => indoc! {"
            These emails are automated job alerts and job board digests.
            Be compact: do not summarize each email separately.
            State how many postings there are in total, then list the role titles and companies that appear, grouping duplicates."},
        CategoryFamily::Event => indoc! {"
            These emails are invitations and announcements for events.
            For each event give one bullet with what it is, the date and time, the location (or online) and what the recipient needs to do next (RSVP, buy tickets, register) including any deadline."},
        CategoryFamily::General => indoc! {"
            These emails did not fit a specific category.
            Group them by theme and write one short paragraph per theme, calling out anything that needs action."},
    }
}

pub fn system_prompt(category: Category) -> String {
    formatdoc! {r#"
        You are a helpful assistant that summarizes a batch of unread emails for their recipient.
        The batch belongs to the category "{title}".
        {instructions}
        Only use information present in the emails. Respond in plain text without preamble."#,
        title = category.title(),
        instructions = family_instructions(category.family()),
    }
}

pub fn summary_user_prompt(messages: &[CategorizedMessage], excerpt_chars: usize) -> String {
    let emails = messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            formatdoc! {r#"
                === EMAIL {n} ===
                From: {from}
                Subject: {subject}
                Date: {date}

                {body}
                "#,
                n = i + 1,
                from = m.message.from,
                subject = m.message.subject,
                date = m.message.date,
                body = m.message.excerpt(excerpt_chars),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Summarize the following {} email(s).\n\n{}",
        messages.len(),
        emails
    )
}

/// One completion for a whole category. Empty answers and provider errors
/// yield the placeholder text with `generated` unset. Rejected credentials
/// are returned as an error.
pub async fn summarize_category(
    llm: &dyn CompletionProvider,
    category: Category,
    messages: &[CategorizedMessage],
    excerpt_chars: usize,
    max_tokens: u32,
) -> AppResult<Summary> {
    let request = CompletionRequest {
        system: Some(system_prompt(category)),
        prompt: summary_user_prompt(messages, excerpt_chars),
        max_tokens,
    };

    let text = match llm.complete(request).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            tracing::warn!("Empty summary for {}", category);
            None
        }
        Err(e @ AppError::Auth(_)) => return Err(e),
        Err(e) => {
            tracing::error!("Summary request for {} failed: {}", category, e);
            None
        }
    };

    Ok(Summary {
        category,
        message_count: messages.len(),
        generated: text.is_some(),
        text: text.unwrap_or_else(|| NO_SUMMARY.to_string()),
    })
}
