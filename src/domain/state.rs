use std::fmt;

use thiserror::Error;

/// Lifecycle of a single requirement through the sync pipeline.
///
/// ```text
/// Pending → GeneratingTests → TrackerResolved → WorkspaceResolved → Done
/// any non-terminal state → Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementState {
    Pending,
    GeneratingTests,
    TrackerResolved,
    WorkspaceResolved,
    Done,
    Failed,
}

impl RequirementState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RequirementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::GeneratingTests => "GeneratingTests",
            Self::TrackerResolved => "TrackerResolved",
            Self::WorkspaceResolved => "WorkspaceResolved",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

fn is_legal_transition(from: RequirementState, to: RequirementState) -> bool {
    use RequirementState::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Pending, GeneratingTests)
            | (GeneratingTests, TrackerResolved)
            | (TrackerResolved, WorkspaceResolved)
            | (WorkspaceResolved, Done)
    )
}

#[derive(Debug, Clone, Error)]
#[error("illegal requirement state transition: {from} -> {to}")]
pub struct IllegalTransition {
    pub from: RequirementState,
    pub to: RequirementState,
}

#[derive(Debug)]
pub struct RequirementProgress {
    current: RequirementState,
    history: Vec<RequirementState>,
}

impl RequirementProgress {
    pub fn new() -> Self {
        Self {
            current: RequirementState::Pending,
            history: vec![RequirementState::Pending],
        }
    }

    pub fn current(&self) -> RequirementState {
        self.current
    }

    pub fn history(&self) -> &[RequirementState] {
        &self.history
    }

    /// Furthest state reached before any failure.
    pub fn last_reached(&self) -> RequirementState {
        self.history
            .iter()
            .rev()
            .copied()
            .find(|state| *state != RequirementState::Failed)
            .unwrap_or(RequirementState::Pending)
    }

    pub fn advance(&mut self, to: RequirementState) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }
        tracing::debug!(from = %self.current, to = %to, "requirement state transition");
        self.current = to;
        self.history.push(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_the_happy_path() {
        let mut progress = RequirementProgress::new();
        for state in [
            RequirementState::GeneratingTests,
            RequirementState::TrackerResolved,
            RequirementState::WorkspaceResolved,
            RequirementState::Done,
        ] {
            progress.advance(state).unwrap();
        }
        assert_eq!(progress.current(), RequirementState::Done);
        assert_eq!(progress.history().len(), 5);
    }

    #[test]
    fn fails_from_any_non_terminal_state() {
        let mut progress = RequirementProgress::new();
        progress.advance(RequirementState::GeneratingTests).unwrap();
        progress.advance(RequirementState::Failed).unwrap();
        assert!(progress.current().is_terminal());
        assert_eq!(progress.last_reached(), RequirementState::GeneratingTests);
        assert!(progress.advance(RequirementState::Failed).is_err());
    }

    #[test]
    fn rejects_skipping_states() {
        let mut progress = RequirementProgress::new();
        let err = progress
            .advance(RequirementState::WorkspaceResolved)
            .unwrap_err();
        assert_eq!(err.from, RequirementState::Pending);
        assert_eq!(progress.current(), RequirementState::Pending);
    }

    #[test]
    fn done_is_terminal() {
        let mut progress = RequirementProgress::new();
        progress.advance(RequirementState::GeneratingTests).unwrap();
        progress.advance(RequirementState::TrackerResolved).unwrap();
        progress.advance(RequirementState::WorkspaceResolved).unwrap();
        progress.advance(RequirementState::Done).unwrap();
        assert!(progress.advance(RequirementState::Failed).is_err());
    }
}
