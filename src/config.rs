use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::SummaryMatch;

const APP_DIR_NAME: &str = "reqsync";
const CONFIG_FILE_NAME: &str = "config.json";

const DEFAULT_ISSUE_TYPE: &str = "Task";
const DEFAULT_BASE_BRANCH: &str = "main";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jira_base_url: Option<String>,
    pub jira_email: Option<String>,
    pub jira_token: Option<String>,
    pub project_key: Option<String>,
    pub jira_issue_type: String,
    pub summary_match: SummaryMatch,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub base_branch: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub max_output_tokens: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl RepositoryId {
    pub fn parse(value: &str) -> AppResult<Self> {
        let trimmed = value.trim().trim_end_matches(".git");
        match trimmed.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(AppError::Configuration(format!(
                "GitHub repository must look like 'owner/name', got '{value}'"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Self::from_sources(stored, |name| env::var(name).ok())
    }

    /// Merges the stored file with environment values; environment wins.
    pub fn from_sources<F>(stored: StoredConfig, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |var: &str, stored: Option<String>| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .or(stored.filter(|value| !value.trim().is_empty()))
        };

        let summary_match = match pick("REQSYNC_SUMMARY_MATCH", stored.summary_match) {
            Some(mode) => SummaryMatch::from_str(&mode).ok_or_else(|| {
                AppError::Configuration(format!(
                    "summary match must be 'exact' or 'fuzzy', got '{mode}'"
                ))
            })?,
            None => SummaryMatch::default(),
        };

        Ok(Self {
            jira_base_url: pick("REQSYNC_JIRA_URL", stored.jira_base_url),
            jira_email: pick("REQSYNC_JIRA_EMAIL", stored.jira_email),
            jira_token: pick("JIRA_API_TOKEN", stored.jira_token),
            project_key: pick("REQSYNC_PROJECT_KEY", stored.project_key),
            jira_issue_type: pick("REQSYNC_JIRA_ISSUE_TYPE", stored.jira_issue_type)
                .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
            summary_match,
            github_token: pick("GITHUB_TOKEN", stored.github_token),
            github_repo: pick("REQSYNC_GITHUB_REPO", stored.github_repo),
            base_branch: pick("REQSYNC_BASE_BRANCH", stored.base_branch)
                .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
            gemini_api_key: pick("GEMINI_API_KEY", stored.gemini_api_key),
            gemini_model: pick("REQSYNC_GEMINI_MODEL", stored.gemini_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            max_output_tokens: stored.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            request_timeout: Duration::from_secs(
                stored
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        })
    }

    /// CLI flags win over file and environment. A blank flag clears the setting so
    /// `validate` reports it instead of sending an empty value to a service.
    pub fn apply_overrides(
        &mut self,
        project: Option<String>,
        repo: Option<String>,
        base: Option<String>,
    ) {
        let trimmed = |value: String| {
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(value)
        };
        if let Some(project) = project {
            self.project_key = trimmed(project);
        }
        if let Some(repo) = repo {
            self.github_repo = trimmed(repo);
        }
        if let Some(base) = base {
            self.base_branch = trimmed(base).unwrap_or_default();
        }
    }

    /// Checks everything the sync run needs before any requirement is touched.
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("Jira base URL (REQSYNC_JIRA_URL)", &self.jira_base_url),
            ("Jira email (REQSYNC_JIRA_EMAIL)", &self.jira_email),
            ("Jira API token (JIRA_API_TOKEN)", &self.jira_token),
            ("Jira project key (REQSYNC_PROJECT_KEY)", &self.project_key),
            ("GitHub token (GITHUB_TOKEN)", &self.github_token),
            ("GitHub repository (REQSYNC_GITHUB_REPO)", &self.github_repo),
        ];
        let missing = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|value| value.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        self.repository()?;
        if self.base_branch.trim().is_empty() {
            return Err(AppError::Configuration(
                "base branch must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn repository(&self) -> AppResult<RepositoryId> {
        let repo = self.github_repo.as_deref().ok_or_else(|| {
            AppError::Configuration("GitHub repository not configured".to_string())
        })?;
        RepositoryId::parse(repo)
    }

    pub fn project(&self) -> AppResult<&str> {
        self.project_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("no Jira project configured".to_string()))
    }
}

/// Settings persisted by `reqsync config init`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    pub jira_base_url: Option<String>,
    pub jira_email: Option<String>,
    pub jira_token: Option<String>,
    pub project_key: Option<String>,
    pub jira_issue_type: Option<String>,
    pub summary_match: Option<String>,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub base_branch: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!(
                    "invalid config file {}: {err}",
                    path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| {
            AppError::Configuration("unable to determine the user config directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}
