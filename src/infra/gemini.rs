use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::infra::{http_client, response_body};
use crate::services::TestCaseGenerator;
use crate::services::test_case_generator::test_case_prompt;

const API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: String,
        max_output_tokens: u32,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model,
            max_output_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{API_URL}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl TestCaseGenerator for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, requirement: &str) -> AppResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::LanguageModel("Gemini API key not configured".to_string())
        })?;

        let request_body = GenerateRequest::greedy(&test_case_prompt(requirement), self.max_output_tokens);
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|err| AppError::LanguageModel(format!("failed to call Gemini: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response_body(response).await;
            return Err(AppError::LanguageModel(format!(
                "Gemini responded with {status}: {body}"
            )));
        }

        let payload: GenerateResponse = response.json().await.map_err(|err| {
            AppError::LanguageModel(format!("failed to parse Gemini response: {err}"))
        })?;
        Ok(payload.text())
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn greedy(prompt: &str, max_output_tokens: u32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                candidate_count: 1,
                max_output_tokens,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    candidate_count: u8,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
