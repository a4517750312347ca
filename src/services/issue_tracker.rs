use async_trait::async_trait;

use crate::domain::ticket::{Ticket, TicketDraft, TrackerResolution};
use crate::error::AppResult;

/// How remote search candidates are compared with the draft summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryMatch {
    /// Only a candidate whose summary equals the draft summary counts as a duplicate.
    #[default]
    Exact,
    /// Every candidate the tracker's text search returns counts as a duplicate.
    Fuzzy,
}

impl SummaryMatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMatch::Exact => "exact",
            SummaryMatch::Fuzzy => "fuzzy",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "exact" => Some(SummaryMatch::Exact),
            "fuzzy" => Some(SummaryMatch::Fuzzy),
            _ => None,
        }
    }

    pub fn accepts(&self, draft_summary: &str, candidate_summary: &str) -> bool {
        match self {
            SummaryMatch::Exact => draft_summary.trim() == candidate_summary.trim(),
            SummaryMatch::Fuzzy => true,
        }
    }
}

#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    /// Fails when the project does not exist or the credentials cannot see it.
    async fn verify_project(&self, project: &str) -> AppResult<()>;

    /// Candidates in the order the tracker returned them.
    async fn search_by_summary(&self, project: &str, summary: &str) -> AppResult<Vec<Ticket>>;

    async fn create_ticket(&self, project: &str, draft: &TicketDraft) -> AppResult<Ticket>;

    /// Create-or-find: the first accepted search candidate wins, otherwise one item is created.
    async fn resolve(
        &self,
        project: &str,
        draft: &TicketDraft,
        mode: SummaryMatch,
    ) -> AppResult<TrackerResolution> {
        let candidates = self.search_by_summary(project, &draft.summary).await?;
        if let Some(existing) = candidates
            .into_iter()
            .find(|candidate| mode.accepts(&draft.summary, &candidate.summary))
        {
            return Ok(TrackerResolution {
                key: existing.key,
                created: false,
                url: existing.url,
            });
        }

        let ticket = self.create_ticket(project, draft).await?;
        Ok(TrackerResolution {
            key: ticket.key,
            created: true,
            url: ticket.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::ticket::TestCases;
    use crate::error::AppError;

    struct FakeTracker {
        existing: Vec<Ticket>,
        created: Mutex<Vec<String>>,
        search_fails: bool,
    }

    impl FakeTracker {
        fn with(existing: Vec<Ticket>) -> Self {
            Self {
                existing,
                created: Mutex::new(Vec::new()),
                search_fails: false,
            }
        }
    }

    fn ticket(key: &str, summary: &str) -> Ticket {
        Ticket {
            key: key.to_string(),
            summary: summary.to_string(),
            url: None,
        }
    }

    #[async_trait]
    impl IssueTrackerService for FakeTracker {
        async fn verify_project(&self, _project: &str) -> AppResult<()> {
            Ok(())
        }

        async fn search_by_summary(&self, _project: &str, summary: &str) -> AppResult<Vec<Ticket>> {
            if self.search_fails {
                return Err(AppError::IssueTracker("search unavailable".to_string()));
            }
            let needle = summary.to_lowercase();
            Ok(self
                .existing
                .iter()
                .filter(|t| t.summary.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }

        async fn create_ticket(&self, project: &str, draft: &TicketDraft) -> AppResult<Ticket> {
            let mut created = self.created.lock().unwrap();
            created.push(draft.summary.clone());
            Ok(ticket(
                &format!("{project}-{}", self.existing.len() + created.len()),
                &draft.summary,
            ))
        }
    }

    fn draft(text: &str) -> TicketDraft {
        TicketDraft::from_requirement(text, TestCases::Generated("cases".to_string()))
    }

    #[tokio::test]
    async fn creates_when_nothing_matches() {
        let tracker = FakeTracker::with(Vec::new());
        let resolution = tracker
            .resolve("APM", &draft("Users can reset their password."), SummaryMatch::Exact)
            .await
            .unwrap();
        assert_eq!(resolution.key, "APM-1");
        assert!(resolution.created);
        assert_eq!(tracker.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn first_exact_match_wins() {
        let tracker = FakeTracker::with(vec![
            ticket("APM-3", "Users can log in via SSO"),
            ticket("APM-4", "Users can log in"),
            ticket("APM-9", "Users can log in"),
        ]);
        let resolution = tracker
            .resolve("APM", &draft("Users can log in"), SummaryMatch::Exact)
            .await
            .unwrap();
        assert_eq!(resolution.key, "APM-4");
        assert!(!resolution.created);
        assert!(tracker.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fuzzy_mode_takes_first_search_result() {
        let tracker = FakeTracker::with(vec![
            ticket("APM-3", "Users can log in via SSO"),
            ticket("APM-4", "Users can log in"),
        ]);
        let resolution = tracker
            .resolve("APM", &draft("Users can log in"), SummaryMatch::Fuzzy)
            .await
            .unwrap();
        assert_eq!(resolution.key, "APM-3");
        assert!(!resolution.created);
    }

    #[tokio::test]
    async fn exact_mode_creates_when_only_wider_matches_exist() {
        let tracker = FakeTracker::with(vec![ticket("APM-3", "Users can log in via SSO")]);
        let resolution = tracker
            .resolve("APM", &draft("Users can log in"), SummaryMatch::Exact)
            .await
            .unwrap();
        assert!(resolution.created);
    }

    #[tokio::test]
    async fn search_failure_creates_nothing() {
        let mut tracker = FakeTracker::with(Vec::new());
        tracker.search_fails = true;
        let err = tracker
            .resolve("APM", &draft("Users can log in"), SummaryMatch::Exact)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IssueTracker(_)));
        assert!(tracker.created.lock().unwrap().is_empty());
    }

    #[test]
    fn parses_match_mode() {
        assert_eq!(SummaryMatch::from_str("EXACT"), Some(SummaryMatch::Exact));
        assert_eq!(SummaryMatch::from_str("fuzzy"), Some(SummaryMatch::Fuzzy));
        assert_eq!(SummaryMatch::from_str("loose"), None);
    }
}
