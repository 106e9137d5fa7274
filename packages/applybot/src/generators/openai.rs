//! OpenAI chat-completions cover-letter generator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompt::{format_cover_letter_prompt, SYSTEM_PROMPT};
use crate::error::GenerationError;
use crate::security::SecretString;
use crate::traits::generator::CoverLetterGenerator;
use crate::types::{JobPosting, UserProfile};

/// Cover-letter generator backed by the OpenAI chat-completions API.
#[derive(Clone)]
pub struct OpenAiGenerator {
    http_client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    /// Create a new generator with the given API key and model.
    pub fn new(api_key: impl Into<SecretString>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
        }
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Bound each request; a timed-out request is not retried.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: String) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.6,
            max_tokens: 750,
        }
    }
}

#[async_trait]
impl CoverLetterGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        profile: &UserProfile,
        posting: &JobPosting,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let request = self.request(format_cover_letter_prompt(profile, posting));

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                if e.is_timeout() {
                    GenerationError::Timeout(start.elapsed())
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(classify_status(status, error_text));
        }

        let chat_response: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let letter = extract_letter(chat_response)?;

        debug!(
            model = %self.model,
            job_id = %posting.id,
            duration_ms = start.elapsed().as_millis(),
            "OpenAI cover letter generated"
        );

        if !profile.contact.email.is_empty() && !letter.contains(&profile.contact.email) {
            warn!(job_id = %posting.id, "cover letter may be missing contact details");
        }

        Ok(letter)
    }
}

fn classify_status(status: StatusCode, body: String) -> GenerationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => GenerationError::Quota(body),
        _ => GenerationError::Api(format!("{}: {}", status, body)),
    }
}

fn extract_letter(response: ChatResponseRaw) -> Result<String, GenerationError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerationError::Malformed("no choices in response".into()))?;

    let letter = content.trim();
    if letter.is_empty() {
        return Err(GenerationError::Malformed("empty completion".into()));
    }
    Ok(letter.to_string())
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
