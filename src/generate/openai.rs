//! OpenAI chat-completions backend.
use super::{build_prompt, generate_with_retries, CampaignParams, ContentGenerator, GeneratedEmail};
use crate::error::GenerationUnavailable;
use crate::sheet::RowRecord;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
}

#[derive(Deserialize)]
struct ChatAnswer {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(base_url: &str, model: &str, api_key: String, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        }
    }

    /// Build a generator using `OPENAI_API_KEY` from the environment.
    pub fn from_env(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("{OPENAI_API_KEY_ENV} is not set"))?;
        Ok(Self::new(base_url, model, api_key, timeout))
    }

    fn invoke(&self, prompt: &str) -> Result<String, GenerationUnavailable> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(&request)
            .map_err(|err| GenerationUnavailable(format!("OpenAI request failed: {err}")))?;
        let body: ChatResponse = response
            .body_mut()
            .read_json()
            .map_err(|err| GenerationUnavailable(format!("decode OpenAI response: {err}")))?;

        tracing::debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "openai completion"
        );

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GenerationUnavailable("OpenAI response had no content".to_string()))
    }
}

impl ContentGenerator for OpenAiGenerator {
    fn generate(
        &self,
        row: &RowRecord,
        company_info: &str,
        campaign: &CampaignParams,
    ) -> Result<GeneratedEmail, GenerationUnavailable> {
        let prompt = build_prompt(row, company_info, campaign);
        generate_with_retries(&prompt, |prompt| self.invoke(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        let generator = OpenAiGenerator::new(
            "https://api.example.test/v1/",
            DEFAULT_OPENAI_MODEL,
            "key".to_string(),
            Duration::from_secs(1),
        );
        assert_eq!(
            generator.endpoint,
            "https://api.example.test/v1/chat/completions"
        );
    }

    #[test]
    fn request_serializes_system_and_user_messages() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn response_content_is_decoded() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "{}"}}]}"#,
        )
        .expect("decode");
        assert_eq!(body.choices[0].message.content.as_deref(), Some("{}"));
    }
}
