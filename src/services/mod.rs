pub mod issue_tracker;
pub mod requirement_source;
pub mod test_case_generator;
pub mod version_control;

pub use issue_tracker::{IssueTrackerService, SummaryMatch};
pub use requirement_source::RequirementSource;
pub use test_case_generator::TestCaseGenerator;
pub use version_control::VersionControlService;
