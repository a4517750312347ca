use std::fmt;

use crate::domain::branch::ScaffoldOutcome;
use crate::domain::state::RequirementState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Created,
    Found,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Created => "created",
            StepStatus::Found => "found",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    pub fn from_created(created: bool) -> Self {
        if created {
            StepStatus::Created
        } else {
            StepStatus::Found
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    AlreadyExisted,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => f.write_str("Created"),
            Outcome::AlreadyExisted => f.write_str("AlreadyExisted"),
            Outcome::Failed => f.write_str("Failed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub requirement: String,
    pub summary: String,
    pub ticket_key: Option<String>,
    pub ticket: StepStatus,
    pub branch: StepStatus,
    pub branch_created: bool,
    pub scaffold: Option<ScaffoldOutcome>,
    pub test_cases_degraded: bool,
    pub outcome: Outcome,
    /// Last pipeline state reached; `Done` for completed requirements.
    pub reached: RequirementState,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub records: Vec<SyncRecord>,
}

impl SyncReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome == outcome)
            .count()
    }

    pub fn branches_created(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.branch_created)
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(Outcome::Failed) > 0
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.records.len() + 2);
        for (position, record) in self.records.iter().enumerate() {
            let key = record.ticket_key.as_deref().unwrap_or("-");
            let mut line = format!(
                "{:>3}. [{}] {key} ticket {} / branch {} :: {}",
                position + 1,
                record.outcome,
                record.ticket.as_str(),
                record.branch.as_str(),
                record.summary,
            );
            if record.test_cases_degraded {
                line.push_str(" (placeholder test cases)");
            }
            if let Some(ScaffoldOutcome::Failed(reason)) = &record.scaffold {
                line.push_str(&format!(" (README not committed: {reason})"));
            }
            if let Some(error) = &record.error {
                line.push_str(&format!(
                    "\n       failed after {}: {error}\n       requirement: {}",
                    record.reached, record.requirement
                ));
            }
            lines.push(line);
        }
        lines.push(String::new());
        lines.push(format!(
            "{} requirement(s): {} created, {} already existed, {} failed; {} branch(es) created",
            self.records.len(),
            self.count(Outcome::Created),
            self.count(Outcome::AlreadyExisted),
            self.count(Outcome::Failed),
            self.branches_created(),
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: Outcome, key: Option<&str>) -> SyncRecord {
        SyncRecord {
            requirement: "Users can log in.".to_string(),
            summary: "Users can log in.".to_string(),
            ticket_key: key.map(str::to_string),
            ticket: StepStatus::Created,
            branch: StepStatus::Created,
            branch_created: true,
            scaffold: Some(ScaffoldOutcome::Committed),
            test_cases_degraded: false,
            outcome,
            reached: RequirementState::Done,
            error: None,
        }
    }

    #[test]
    fn counts_outcomes() {
        let report = SyncReport {
            records: vec![
                record(Outcome::Created, Some("APM-1")),
                record(Outcome::AlreadyExisted, Some("APM-1")),
                record(Outcome::Failed, None),
            ],
        };
        assert_eq!(report.count(Outcome::Created), 1);
        assert!(report.has_failures());
        assert!(
            report
                .render()
                .ends_with("3 requirement(s): 1 created, 1 already existed, 1 failed; 3 branch(es) created")
        );
    }

    #[test]
    fn renders_scaffold_failure_and_error() {
        let mut failed = record(Outcome::Failed, Some("APM-2"));
        failed.scaffold = Some(ScaffoldOutcome::Failed("permission denied".to_string()));
        failed.error = Some("version control error: boom".to_string());
        failed.reached = RequirementState::TrackerResolved;
        let rendered = SyncReport {
            records: vec![failed],
        }
        .render();
        assert!(rendered.contains("[Failed] APM-2"));
        assert!(rendered.contains("README not committed: permission denied"));
        assert!(rendered.contains("failed after TrackerResolved: version control error: boom"));
        assert!(rendered.contains("requirement: Users can log in."));
    }
}
