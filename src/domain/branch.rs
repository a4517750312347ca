use std::fmt;

use crate::error::{AppError, AppResult};

/// Branch named exactly after the tracking item key it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchName(String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_ticket_key(ticket_key: &str) -> AppResult<Self> {
        let key = ticket_key.trim();
        if key.is_empty() {
            return Err(AppError::VersionControl(
                "branch name cannot be empty".to_string(),
            ));
        }
        if !is_valid_ref_component(key) {
            return Err(AppError::VersionControl(format!(
                "ticket key '{key}' is not a valid branch name"
            )));
        }
        Ok(Self(key.to_string()))
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_ref_component(name: &str) -> bool {
    !name.starts_with(['-', '.'])
        && !name.ends_with(['.', '/'])
        && !name.ends_with(".lock")
        && !name.contains("..")
        && !name.contains("@{")
        && !name.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\')
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldFile {
    pub path: String,
    pub message: String,
    pub content: String,
}

impl ScaffoldFile {
    pub fn for_branch(branch: &BranchName, summary: &str) -> Self {
        Self {
            path: format!("{branch}_README.md"),
            message: format!("Add README for {branch}"),
            content: format!("# {branch}\n\n{summary}"),
        }
    }
}

/// Result of committing the scaffold file. A failed commit never fails the branch itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldOutcome {
    Committed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchResolution {
    pub created: bool,
    /// `None` when the branch already existed and nothing was committed.
    pub scaffold: Option<ScaffoldOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_is_the_ticket_key() {
        let branch = BranchName::from_ticket_key(" APM-17 ").unwrap();
        assert_eq!(branch.as_str(), "APM-17");
    }

    #[test]
    fn rejects_keys_git_cannot_use() {
        assert!(BranchName::from_ticket_key("").is_err());
        assert!(BranchName::from_ticket_key("APM 17").is_err());
        assert!(BranchName::from_ticket_key("APM..17").is_err());
        assert!(BranchName::from_ticket_key("-APM").is_err());
        assert!(BranchName::from_ticket_key("APM:1").is_err());
    }

    #[test]
    fn scaffold_file_names_and_content() {
        let branch = BranchName::from_ticket_key("APM-1").unwrap();
        let file = ScaffoldFile::for_branch(&branch, "Users can reset their password.");
        assert_eq!(file.path, "APM-1_README.md");
        assert_eq!(file.message, "Add README for APM-1");
        assert_eq!(file.content, "# APM-1\n\nUsers can reset their password.");
    }
}
