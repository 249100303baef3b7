use std::fmt::{self, Write};

use crate::model::Summary;

pub const NO_UNREAD: &str = "No unread emails found.";

const RULE: &str = "==================================================";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub listed: usize,
    pub fetched: usize,
    pub skipped: usize,
    /// Fetched but left unread because their group has no summary
    pub unsummarized: usize,
    pub marked_read: usize,
    pub mark_read_failed: usize,
    pub mark_read_enabled: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DigestReport {
    pub summaries: Vec<Summary>,
    pub stats: RunStats,
}

impl DigestReport {
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DigestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stats.listed == 0 {
            return f.write_str(NO_UNREAD);
        }

        let mut out = String::new();
        writeln!(out, "{RULE}")?;
        writeln!(out, "UNREAD EMAIL DIGEST")?;
        writeln!(out, "{RULE}")?;

        for summary in &self.summaries {
            writeln!(out)?;
            writeln!(
                out,
                "## {} ({} {})",
                summary.category.title(),
                summary.message_count,
                if summary.message_count == 1 { "email" } else { "emails" }
            )?;
            writeln!(out)?;
            writeln!(out, "{}", summary.text)?;
        }

        let stats = &self.stats;
        writeln!(out)?;
        writeln!(out, "{RULE}")?;
        write!(
            out,
            "{} unread listed, {} fetched, {} skipped",
            stats.listed, stats.fetched, stats.skipped
        )?;
        if stats.mark_read_enabled {
            write!(out, ", {} marked as read", stats.marked_read)?;
            if stats.mark_read_failed > 0 {
                write!(
                    out,
                    "\nWARNING: {} emails could not be marked as read and remain unread",
                    stats.mark_read_failed
                )?;
            }
        } else {
            write!(out, ", left unread")?;
        }
        if stats.unsummarized > 0 {
            write!(
                out,
                "\nWARNING: {} emails had no summary and were left unread",
                stats.unsummarized
            )?;
        }

        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn summary(category: Category, count: usize, text: &str) -> Summary {
        Summary {
            category,
            message_count: count,
            text: text.to_string(),
            generated: true,
        }
    }

    #[test]
    fn test_empty_run() {
        let report = DigestReport::default();
        assert!(report.summaries.is_empty());
        assert_eq!(report.render(), "No unread emails found.");
    }

    #[test]
    fn test_sections_in_order_with_counts() {
        let report = DigestReport {
            summaries: vec![
                summary(Category::IndividualRecruitment, 1, "Jane from Acme wants a call."),
                summary(Category::Other, 3, "Gardening newsletters."),
            ],
            stats: RunStats {
                listed: 4,
                fetched: 4,
                marked_read: 4,
                mark_read_enabled: true,
                ..Default::default()
            },
        };
        let out = report.render();

        let recruit = out.find("## Recruiters Reaching Out (1 email)").unwrap();
        let other = out.find("## Other (3 emails)").unwrap();
        assert!(recruit < other);
        assert!(out.contains("Jane from Acme wants a call."));
        assert!(out.ends_with("4 unread listed, 4 fetched, 0 skipped, 4 marked as read"));
    }

    #[test]
    fn test_footer_reports_mark_read_failures() {
        let report = DigestReport {
            summaries: vec![summary(Category::Fashion, 2, "Two sales.")],
            stats: RunStats {
                listed: 3,
                fetched: 2,
                skipped: 1,
                unsummarized: 0,
                marked_read: 0,
                mark_read_failed: 2,
                mark_read_enabled: true,
            },
        };
        let out = report.render();

        assert!(out.contains("3 unread listed, 2 fetched, 1 skipped, 0 marked as read"));
        assert!(out.contains("WARNING: 2 emails could not be marked as read"));
    }

    #[test]
    fn test_footer_reports_unsummarized() {
        let mut failed = summary(Category::Other, 2, "No summary available");
        failed.generated = false;
        let report = DigestReport {
            summaries: vec![failed],
            stats: RunStats {
                listed: 2,
                fetched: 2,
                unsummarized: 2,
                mark_read_enabled: true,
                ..Default::default()
            },
        };

        assert!(report
            .render()
            .ends_with("0 marked as read\nWARNING: 2 emails had no summary and were left unread"));
    }

    #[test]
    fn test_dry_run_footer() {
        let report = DigestReport {
            summaries: vec![summary(Category::Other, 1, "x")],
            stats: RunStats {
                listed: 1,
                fetched: 1,
                ..Default::default()
            },
        };

        assert!(report.render().ends_with(", left unread"));
    }
}
