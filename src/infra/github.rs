use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::{Deserialize, Serialize};

use crate::config::RepositoryId;
use crate::domain::branch::{BranchName, ScaffoldFile};
use crate::error::{AppError, AppResult};
use crate::infra::{http_client, response_body};
use crate::services::VersionControlService;

const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const BRANCH_PAGE_SIZE: usize = 100;

pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
    repository: RepositoryId,
}

impl GitHubClient {
    pub fn new(token: Option<String>, repository: RepositoryId, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_url: DEFAULT_API_URL.to_string(),
            token,
            repository,
        })
    }

    fn token(&self) -> AppResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("GitHub token not configured".to_string()))
    }

    fn repo_endpoint(&self, path: &str) -> String {
        let base = format!(
            "{}/repos/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.repository.owner,
            self.repository.name
        );
        if path.is_empty() {
            base
        } else {
            format!("{base}/{}", path.trim_start_matches('/'))
        }
    }

    fn authorized(&self, request: RequestBuilder) -> AppResult<RequestBuilder> {
        Ok(request
            .header(AUTHORIZATION, format!("Bearer {}", self.token()?))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> AppResult<Response> {
        let response = self
            .authorized(request)?
            .send()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to call GitHub: {err}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response_body(response).await;
        let message = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                format!("GitHub rejected the token while trying to {action} ({status}): {body}")
            }
            _ => format!("GitHub responded with {status} while trying to {action}: {body}"),
        };
        Err(AppError::VersionControl(message))
    }

    async fn head_sha(&self, base: &str) -> AppResult<String> {
        let response = self
            .send(
                self.http
                    .get(self.repo_endpoint(&format!("git/ref/heads/{base}"))),
                &format!("read branch {base}"),
            )
            .await?;
        let reference: GitReference = response.json().await.map_err(|err| {
            AppError::VersionControl(format!("failed to parse GitHub reference: {err}"))
        })?;
        Ok(reference.object.sha)
    }
}

#[async_trait]
impl VersionControlService for GitHubClient {
    async fn verify_repository(&self, base: &str) -> AppResult<()> {
        let into_config = |err: AppError| AppError::Configuration(err.to_string());
        self.send(self.http.get(self.repo_endpoint("")), "read the repository")
            .await
            .map_err(into_config)?;
        self.head_sha(base).await.map_err(into_config)?;
        Ok(())
    }

    async fn list_branches(&self) -> AppResult<Vec<String>> {
        let mut names = Vec::new();
        let mut page = 1usize;
        loop {
            let response = self
                .send(
                    self.http.get(self.repo_endpoint("branches")).query(&[
                        ("per_page", BRANCH_PAGE_SIZE.to_string()),
                        ("page", page.to_string()),
                    ]),
                    "list branches",
                )
                .await?;
            let branches: Vec<GitBranch> = response.json().await.map_err(|err| {
                AppError::VersionControl(format!("failed to parse GitHub branches: {err}"))
            })?;

            let fetched = branches.len();
            names.extend(branches.into_iter().map(|branch| branch.name));
            if fetched < BRANCH_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(names)
    }

    async fn create_branch(&self, branch: &BranchName, base: &str) -> AppResult<()> {
        let sha = self.head_sha(base).await?;
        let body = CreateReferenceRequest {
            reference: format!("refs/heads/{branch}"),
            sha,
        };
        self.send(
            self.http.post(self.repo_endpoint("git/refs")).json(&body),
            &format!("create branch {branch}"),
        )
        .await?;
        Ok(())
    }

    async fn commit_file(&self, branch: &BranchName, file: &ScaffoldFile) -> AppResult<()> {
        let body = CreateFileRequest::new(branch, file);
        self.send(
            self.http
                .put(self.repo_endpoint(&format!("contents/{}", file.path)))
                .json(&body),
            &format!("commit {}", file.path),
        )
        .await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct GitBranch {
    name: String,
}

#[derive(Deserialize)]
struct GitReference {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Serialize)]
struct CreateReferenceRequest {
    #[serde(rename = "ref")]
    reference: String,
    sha: String,
}

#[derive(Serialize)]
struct CreateFileRequest {
    message: String,
    content: String,
    branch: String,
}

impl CreateFileRequest {
    fn new(branch: &BranchName, file: &ScaffoldFile) -> Self {
        Self {
            message: file.message.clone(),
            content: BASE64_STANDARD.encode(&file.content),
            branch: branch.as_str().to_string(),
        }
    }
}
