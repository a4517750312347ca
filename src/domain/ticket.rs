pub const SUMMARY_LIMIT: usize = 100;
const TRUNCATION_MARKER: &str = "...";

pub const TEST_CASES_HEADING: &str = "### Test Cases";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCases {
    Generated(String),
    Placeholder { reason: String },
}

impl TestCases {
    pub fn is_degraded(&self) -> bool {
        matches!(self, TestCases::Placeholder { .. })
    }

    pub fn text(&self) -> String {
        match self {
            TestCases::Generated(text) => text.clone(),
            TestCases::Placeholder { reason } => format!(
                "Test cases could not be generated ({reason}). Add them manually before starting work."
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub summary: String,
    pub description: String,
    pub test_cases: TestCases,
}

impl TicketDraft {
    pub fn from_requirement(text: &str, test_cases: TestCases) -> Self {
        Self {
            summary: summarize(text),
            description: text.to_string(),
            test_cases,
        }
    }

    /// Description body sent to the tracker, with the test cases appended under their own heading.
    pub fn body(&self) -> String {
        format!(
            "{}\n\n{}\n{}",
            self.description,
            TEST_CASES_HEADING,
            self.test_cases.text()
        )
    }
}

/// Single-line display title bounded to [`SUMMARY_LIMIT`] characters.
///
/// Counts characters rather than bytes and cuts at a fixed position, so a word may be split.
pub fn summarize(text: &str) -> String {
    let single_line = text
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if single_line.chars().count() <= SUMMARY_LIMIT {
        return single_line;
    }

    let keep = SUMMARY_LIMIT - TRUNCATION_MARKER.chars().count();
    let mut summary = single_line.chars().take(keep).collect::<String>();
    summary.push_str(TRUNCATION_MARKER);
    summary
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerResolution {
    pub key: String,
    pub created: bool,
    pub url: Option<String>,
}
