use async_trait::async_trait;

use crate::domain::branch::{BranchName, BranchResolution, ScaffoldFile, ScaffoldOutcome};
use crate::error::AppResult;

#[async_trait]
pub trait VersionControlService: Send + Sync {
    /// Fails when the repository or its base branch cannot be reached with the configured token.
    async fn verify_repository(&self, base: &str) -> AppResult<()>;

    async fn list_branches(&self) -> AppResult<Vec<String>>;

    /// Points a new branch at the head commit of `base`.
    async fn create_branch(&self, branch: &BranchName, base: &str) -> AppResult<()>;

    async fn commit_file(&self, branch: &BranchName, file: &ScaffoldFile) -> AppResult<()>;

    /// Create-or-skip. The existence check and the creation are not atomic.
    async fn ensure_branch(
        &self,
        branch: &BranchName,
        base: &str,
        summary: &str,
    ) -> AppResult<BranchResolution> {
        let existing = self.list_branches().await?;
        if existing.iter().any(|name| name == branch.as_str()) {
            tracing::info!(branch = %branch, "branch already exists");
            return Ok(BranchResolution {
                created: false,
                scaffold: None,
            });
        }

        self.create_branch(branch, base).await?;
        tracing::info!(branch = %branch, base, "branch created");

        let file = ScaffoldFile::for_branch(branch, summary);
        let scaffold = match self.commit_file(branch, &file).await {
            Ok(()) => {
                tracing::info!(branch = %branch, path = %file.path, "scaffold committed");
                ScaffoldOutcome::Committed
            }
            Err(err) => {
                tracing::warn!(branch = %branch, path = %file.path, error = %err, "scaffold commit failed");
                ScaffoldOutcome::Failed(err.to_string())
            }
        };

        Ok(BranchResolution {
            created: true,
            scaffold: Some(scaffold),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::AppError;

    #[derive(Default)]
    struct FakeRepo {
        branches: Mutex<Vec<String>>,
        files: Mutex<Vec<(String, ScaffoldFile)>>,
        commit_fails: bool,
        create_fails: bool,
    }

    #[async_trait]
    impl VersionControlService for FakeRepo {
        async fn verify_repository(&self, _base: &str) -> AppResult<()> {
            Ok(())
        }

        async fn list_branches(&self) -> AppResult<Vec<String>> {
            Ok(self.branches.lock().unwrap().clone())
        }

        async fn create_branch(&self, branch: &BranchName, _base: &str) -> AppResult<()> {
            if self.create_fails {
                return Err(AppError::VersionControl("reference rejected".to_string()));
            }
            self.branches.lock().unwrap().push(branch.as_str().to_string());
            Ok(())
        }

        async fn commit_file(&self, branch: &BranchName, file: &ScaffoldFile) -> AppResult<()> {
            if self.commit_fails {
                return Err(AppError::VersionControl("permission denied".to_string()));
            }
            self.files
                .lock()
                .unwrap()
                .push((branch.as_str().to_string(), file.clone()));
            Ok(())
        }
    }

    fn branch(name: &str) -> BranchName {
        BranchName::from_ticket_key(name).unwrap()
    }

    #[tokio::test]
    async fn creates_branch_and_scaffold() {
        let repo = FakeRepo::default();
        let resolution = repo
            .ensure_branch(&branch("APM-1"), "main", "Users can log in.")
            .await
            .unwrap();

        assert!(resolution.created);
        assert_eq!(resolution.scaffold, Some(ScaffoldOutcome::Committed));
        let files = repo.files.lock().unwrap();
        assert_eq!(files[0].0, "APM-1");
        assert_eq!(files[0].1.content, "# APM-1\n\nUsers can log in.");
    }

    #[tokio::test]
    async fn skips_existing_branch() {
        let repo = FakeRepo::default();
        repo.branches.lock().unwrap().push("APM-1".to_string());
        let resolution = repo
            .ensure_branch(&branch("APM-1"), "main", "Users can log in.")
            .await
            .unwrap();

        assert!(!resolution.created);
        assert_eq!(resolution.scaffold, None);
        assert!(repo.files.lock().unwrap().is_empty());
        assert_eq!(repo.branches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scaffold_failure_does_not_fail_the_branch() {
        let repo = FakeRepo {
            commit_fails: true,
            ..FakeRepo::default()
        };
        let resolution = repo
            .ensure_branch(&branch("APM-2"), "main", "Export reports.")
            .await
            .unwrap();

        assert!(resolution.created);
        assert!(matches!(resolution.scaffold, Some(ScaffoldOutcome::Failed(ref reason)) if reason.contains("permission denied")));
    }

    #[tokio::test]
    async fn branch_creation_failure_is_surfaced() {
        let repo = FakeRepo {
            create_fails: true,
            ..FakeRepo::default()
        };
        let err = repo
            .ensure_branch(&branch("APM-3"), "main", "Export reports.")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VersionControl(_)));
        assert!(repo.files.lock().unwrap().is_empty());
    }
}
