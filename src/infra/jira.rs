use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};

use crate::domain::ticket::{Ticket, TicketDraft};
use crate::error::{AppError, AppResult};
use crate::infra::{http_client, response_body};
use crate::services::IssueTrackerService;

const SEARCH_PAGE_SIZE: u32 = 50;
const MAX_SEARCH_PAGES: usize = 40;

/// Characters with meaning in Jira's text-search syntax.
const TEXT_SEARCH_RESERVED: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '~', '*', '?', ':', '/',
];

pub struct JiraClient {
    http: Client,
    base_url: Option<String>,
    email: Option<String>,
    token: Option<String>,
    issue_type: String,
}

impl JiraClient {
    pub fn new(
        base_url: Option<String>,
        email: Option<String>,
        token: Option<String>,
        issue_type: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url,
            email,
            token,
            issue_type,
        })
    }

    fn api_details(&self) -> AppResult<(&str, &str, &str)> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira base URL not configured".to_string()))?;
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira email not configured".to_string()))?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira API token not configured".to_string()))?;
        Ok((base_url, email, token))
    }

    fn auth_header(email: &str, token: &str) -> String {
        let credentials = format!("{email}:{token}");
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn endpoint(base_url: &str, path: &str) -> String {
        format!("{}/rest/api/3/{path}", base_url.trim_end_matches('/'))
    }

    fn browse_url(base_url: &str, key: &str) -> String {
        format!("{}/browse/{}", base_url.trim_end_matches('/'), key)
    }

    async fn ensure_success(response: Response, action: &str) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response_body(response).await;
        let message = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                format!("Jira rejected the credentials while trying to {action} ({status}): {body}")
            }
            _ => format!("Jira responded with {status} while trying to {action}: {body}"),
        };
        Err(AppError::IssueTracker(message))
    }
}

#[async_trait]
impl IssueTrackerService for JiraClient {
    async fn verify_project(&self, project: &str) -> AppResult<()> {
        let (base_url, email, token) = self.api_details()?;
        let response = self
            .http
            .get(Self::endpoint(base_url, &format!("project/{}", project.trim())))
            .header(AUTHORIZATION, Self::auth_header(email, token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| AppError::Configuration(format!("failed to reach Jira: {err}")))?;

        Self::ensure_success(response, &format!("read project {project}"))
            .await
            .map_err(|err| AppError::Configuration(err.to_string()))?;
        Ok(())
    }

    async fn search_by_summary(&self, project: &str, summary: &str) -> AppResult<Vec<Ticket>> {
        let (base_url, email, token) = self.api_details()?;
        let jql = duplicate_query(project, summary);
        tracing::debug!(jql = %jql, "searching Jira for duplicates");

        let mut tickets = Vec::new();
        let mut page_token: Option<String> = None;
        for page in 1..=MAX_SEARCH_PAGES {
            let request_body = JiraSearchRequest {
                jql: jql.clone(),
                fields: vec!["summary"],
                max_results: SEARCH_PAGE_SIZE,
                next_page_token: page_token.take(),
            };

            let response = self
                .http
                .post(Self::endpoint(base_url, "search/jql"))
                .header(AUTHORIZATION, Self::auth_header(email, token))
                .header(ACCEPT, "application/json")
                .header(CONTENT_TYPE, "application/json")
                .json(&request_body)
                .send()
                .await
                .map_err(|err| AppError::IssueTracker(format!("failed to call Jira: {err}")))?;
            let response = Self::ensure_success(response, "search issues").await?;

            let payload: JiraSearchResponse = response.json().await.map_err(|err| {
                AppError::IssueTracker(format!("failed to parse Jira search response: {err}"))
            })?;

            tickets.extend(payload.issues.into_iter().map(|issue| Ticket {
                url: Some(Self::browse_url(base_url, &issue.key)),
                key: issue.key,
                summary: issue.fields.summary.unwrap_or_default(),
            }));

            match payload.next_page_token {
                Some(next) if !payload.is_last.unwrap_or(false) => {
                    if request_body.next_page_token.as_deref() == Some(next.as_str()) {
                        return Err(AppError::IssueTracker(
                            "Jira returned the same search page token twice".to_string(),
                        ));
                    }
                    tracing::debug!(page, found = tickets.len(), "fetching next search page");
                    page_token = Some(next);
                }
                _ => return Ok(tickets),
            }
        }

        // A partial candidate list could hide the duplicate and lead to a second item.
        Err(AppError::IssueTracker(format!(
            "duplicate search returned more than {} pages; narrow the summary or use fuzzy matching",
            MAX_SEARCH_PAGES
        )))
    }

    async fn create_ticket(&self, project: &str, draft: &TicketDraft) -> AppResult<Ticket> {
        let project_key = project.trim();
        if project_key.is_empty() {
            return Err(AppError::IssueTracker(
                "project key must not be empty".to_string(),
            ));
        }
        if draft.summary.trim().is_empty() {
            return Err(AppError::IssueTracker(
                "ticket summary must not be empty".to_string(),
            ));
        }

        let (base_url, email, token) = self.api_details()?;
        let request_body = JiraCreateIssueRequest::new(
            project_key,
            &self.issue_type,
            draft.summary.trim(),
            &draft.body(),
        );

        let response = self
            .http
            .post(Self::endpoint(base_url, "issue"))
            .header(AUTHORIZATION, Self::auth_header(email, token))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call Jira: {err}")))?;
        let response = Self::ensure_success(response, "create an issue").await?;

        let payload: JiraCreateIssueResponse = response.json().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to parse Jira response: {err}"))
        })?;

        Ok(Ticket {
            url: Some(Self::browse_url(base_url, &payload.key)),
            key: payload.key,
            summary: draft.summary.clone(),
        })
    }
}

/// JQL looking for items in `project` whose summary contains `summary` as literal text.
pub fn duplicate_query(project: &str, summary: &str) -> String {
    format!(
        "project = \"{}\" AND summary ~ \"{}\" ORDER BY created ASC",
        escape_jql_string(project.trim()),
        escape_text_search(summary.trim()),
    )
}

fn escape_jql_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\r' | '\n' | '\t' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

// Reserved characters and quotes need a backslash for the text search, and that
// backslash needs its own escape inside the JQL string literal.
fn escape_text_search(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\\\\\""),
            '\\' => escaped.push_str("\\\\\\\\"),
            '\r' | '\n' | '\t' => escaped.push(' '),
            c if TEXT_SEARCH_RESERVED.contains(&c) => {
                escaped.push_str("\\\\");
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Serialize)]
struct JiraSearchRequest {
    jql: String,
    fields: Vec<&'static str>,
    #[serde(rename = "maxResults")]
    max_results: u32,
    #[serde(rename = "nextPageToken", skip_serializing_if = "Option::is_none")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(default, rename = "isLast")]
    is_last: Option<bool>,
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    #[serde(default)]
    fields: JiraIssueFields,
}

#[derive(Deserialize, Default)]
struct JiraIssueFields {
    summary: Option<String>,
}

#[derive(Serialize)]
struct JiraCreateIssueRequest {
    fields: JiraCreateIssueFields,
}

impl JiraCreateIssueRequest {
    fn new(project_key: &str, issue_type: &str, summary: &str, description: &str) -> Self {
        Self {
            fields: JiraCreateIssueFields {
                project: JiraProject {
                    key: project_key.to_string(),
                },
                summary: summary.to_string(),
                description: JiraDescription::from_markdown(description),
                issuetype: JiraIssueType {
                    name: issue_type.to_string(),
                },
            },
        }
    }
}

#[derive(Serialize)]
struct JiraCreateIssueFields {
    project: JiraProject,
    summary: String,
    description: JiraDescription,
    issuetype: JiraIssueType,
}

#[derive(Serialize)]
struct JiraProject {
    key: String,
}

#[derive(Serialize)]
struct JiraIssueType {
    name: String,
}

#[derive(Serialize)]
struct JiraDescription {
    #[serde(rename = "type")]
    doc_type: &'static str,
    version: u8,
    content: Vec<JiraBlock>,
}

impl JiraDescription {
    /// Converts blank-line separated sections into ADF, turning `#` prefixed lines into headings.
    fn from_markdown(description: &str) -> Self {
        let cleaned = description.replace('\r', "");
        let mut content = Vec::new();

        for section in cleaned.split("\n\n") {
            let mut lines = section
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .peekable();

            if let Some(heading) = lines.peek().and_then(|line| JiraBlock::heading(line)) {
                content.push(heading);
                lines.next();
            }

            let paragraph = lines.collect::<Vec<_>>();
            if !paragraph.is_empty() {
                content.push(JiraBlock::paragraph(&paragraph));
            }
        }

        if content.is_empty() {
            content.push(JiraBlock::paragraph(&["Describe the planned work."]));
        }

        Self {
            doc_type: "doc",
            version: 1,
            content,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum JiraBlock {
    Paragraph {
        content: Vec<JiraInline>,
    },
    Heading {
        attrs: JiraHeadingAttrs,
        content: Vec<JiraInline>,
    },
}

impl JiraBlock {
    fn paragraph(lines: &[&str]) -> Self {
        let mut content = Vec::with_capacity(lines.len() * 2);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                content.push(JiraInline::HardBreak);
            }
            content.push(JiraInline::Text {
                text: line.to_string(),
            });
        }
        JiraBlock::Paragraph { content }
    }

    fn heading(line: &str) -> Option<Self> {
        let level = line.chars().take_while(|c| *c == '#').count();
        let text = line[level..].trim();
        if level == 0 || level > 6 || text.is_empty() || !line[level..].starts_with(' ') {
            return None;
        }
        Some(JiraBlock::Heading {
            attrs: JiraHeadingAttrs { level: level as u8 },
            content: vec![JiraInline::Text {
                text: text.to_string(),
            }],
        })
    }
}

#[derive(Serialize)]
struct JiraHeadingAttrs {
    level: u8,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum JiraInline {
    Text { text: String },
    HardBreak,
}

#[derive(Deserialize)]
struct JiraCreateIssueResponse {
    key: String,
}
