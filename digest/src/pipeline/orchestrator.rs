//! Digest Orchestrator
//!
//! One linear pass over the unread mailbox:
//! list -> fetch -> extract -> classify -> group -> summarize -> mark read.
//!
//! Per-message and per-category failures are isolated. Only an
//! authentication failure (mailbox or model) or a failed listing aborts the
//! run. Messages are marked read strictly after every summary has been
//! produced, and only the ones whose group got a generated summary. The rest
//! stay unread for the next run.

use crate::{
    digest_config::DigestConfig,
    email::{client::Mailbox, extracted_message::ExtractedMessage},
    error::{AppError, AppResult},
    model::CategorizedMessage,
    prompt::{classify::classify_message, summarize::summarize_category, CompletionProvider},
};

use super::{
    group::group,
    report::{DigestReport, RunStats},
};

pub async fn run_digest(
    mailbox: &dyn Mailbox,
    llm: &dyn CompletionProvider,
    cfg: &DigestConfig,
) -> AppResult<DigestReport> {
    let settings = &cfg.settings;

    let ids = mailbox.list_unread(settings.max_messages).await?;
    let mut stats = RunStats {
        listed: ids.len(),
        mark_read_enabled: settings.mark_read,
        ..Default::default()
    };

    if ids.is_empty() {
        tracing::info!("No unread emails found");
        return Ok(DigestReport {
            summaries: vec![],
            stats,
        });
    }

    let mut categorized = Vec::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        let message = match mailbox.fetch_message(id).await {
            Ok(message) => message,
            Err(e @ AppError::Auth(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping message {}: {}", id, e);
                stats.skipped += 1;
                continue;
            }
        };

        let extracted = ExtractedMessage::from_gmail_message(&message);
        let classification = classify_message(
            llm,
            &extracted,
            settings.classify_excerpt_chars,
            cfg.model.classify_max_tokens,
        )
        .await?;

        tracing::info!(
            "[{}/{}] {} -> {}",
            i + 1,
            ids.len(),
            extracted.subject,
            classification.category
        );
        categorized.push(CategorizedMessage::new(extracted, classification.category));
    }
    stats.fetched = categorized.len();

    let groups = group(categorized);

    let mut summaries = Vec::with_capacity(groups.len());
    let mut processed_ids = Vec::with_capacity(stats.fetched);
    for (category, messages) in &groups {
        tracing::info!("Summarizing {} ({} emails)", category, messages.len());
        let summary = summarize_category(
            llm,
            *category,
            messages,
            settings.summary_excerpt_chars,
            cfg.model.summary_max_tokens,
        )
        .await?;
        if summary.generated {
            processed_ids.extend(messages.iter().map(|m| m.id().to_string()));
        } else {
            stats.unsummarized += messages.len();
        }
        summaries.push(summary);
    }

    if settings.mark_read && !processed_ids.is_empty() {
        let result = mailbox.mark_read(&processed_ids).await;
        stats.marked_read = result.marked.len();
        stats.mark_read_failed = result.failed.len();
        if !result.is_complete() {
            tracing::warn!(
                "{} of {} emails could not be marked as read",
                result.failed.len(),
                processed_ids.len()
            );
        }
    } else if !settings.mark_read {
        tracing::info!("Leaving {} emails unread", processed_ids.len());
    }

    Ok(DigestReport { summaries, stats })
}
