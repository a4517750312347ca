pub mod document;
pub mod gemini;
pub mod github;
pub mod jira;

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{AppError, AppResult};

const USER_AGENT: &str = concat!("reqsync/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))
}

pub(crate) async fn response_body(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read response>".to_string())
}
