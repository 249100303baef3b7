use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Closed set of labels messages are bucketed into.
/// Declaration order is the order categories appear in the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Category {
    IndividualRecruitment,
    JobPostings,
    ProfessionalTech,
    SocialEvents,
    CultureArts,
    Fashion,
    Other,
}

/// Categories sharing a summary template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFamily {
    Recruitment,
    JobPostings,
    Event,
    General,
}

impl Category {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    pub fn family(&self) -> CategoryFamily {
        match self {
            Category::IndividualRecruitment => CategoryFamily::Recruitment,
            Category::JobPostings => CategoryFamily::JobPostings,
            Category::SocialEvents
            | Category::CultureArts
            | Category::ProfessionalTech
            | Category::Fashion => CategoryFamily::Event,
            Category::Other => CategoryFamily::General,
        }
    }

    /// Heading used in the printed report
    pub fn title(&self) -> &'static str {
        match self {
            Category::IndividualRecruitment => "Recruiters Reaching Out",
            Category::JobPostings => "Job Postings",
            Category::ProfessionalTech => "Professional & Tech Events",
            Category::SocialEvents => "Social Events",
            Category::CultureArts => "Culture & Arts",
            Category::Fashion => "Fashion",
            Category::Other => "Other",
        }
    }

    /// One-line meaning of the label, embedded in the classification prompt
    pub fn description(&self) -> &'static str {
        match self {
            Category::IndividualRecruitment => {
                "a named person (recruiter, hiring manager, founder) personally writing to the recipient about a specific role, interview or opportunity"
            }
            Category::JobPostings => {
                "automated or bulk job alerts, job board digests and newsletters listing openings"
            }
            Category::ProfessionalTech => {
                "conferences, meetups, webinars, workshops and talks about technology or professional topics"
            }
            Category::SocialEvents => "parties, gatherings, dinners, sports and other social invitations",
            Category::CultureArts => {
                "exhibitions, concerts, theatre, film, literature and other cultural events"
            }
            Category::Fashion => "fashion shows, launches, sample sales and style events",
            Category::Other => "anything that fits none of the categories above",
        }
    }

    /// Comma separated list of every label, in declaration order
    pub fn all_labels() -> String {
        Category::iter()
            .map(|c| c.as_str().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Permissive decode of a model answer.
    ///
    /// Surrounding whitespace, quotes, backticks and a trailing period are
    /// ignored and case does not matter; any other deviation yields `None`.
    pub fn from_label(raw: &str) -> Option<Category> {
        let label = raw
            .trim()
            .trim_end_matches('.')
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
            .trim();
        Category::from_str(label).ok()
    }
}
