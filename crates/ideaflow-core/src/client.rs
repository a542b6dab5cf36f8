//! Chat-completion HTTP client for the model service.
//!
//! Speaks the OpenAI-compatible `chat/completions` shape, which the Gemini
//! endpoint exposes. Each turn sends the role's system prompt plus the seed
//! idea and the accepted transcript so far, labelled by author so the model
//! can follow the hand-off chain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::driver::{CompletionClient, TranscriptEntry};
use crate::error::{PipelineError, Result};
use crate::roles::RoleSpec;

/// Appended to every role's system prompt under the sequence strategy.
const ENVELOPE_INSTRUCTION: &str = "\n\nWrap your entire reply in a single JSON object: \
    {\"sender\": \"<your role name>\", \"receiver\": \"<next role name>\", \
    \"turn_index\": <number>, \"content\": \"<your full analysis>\"}. \
    Output only the JSON object.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Production [`CompletionClient`] backed by `reqwest`.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_messages(
        role: &RoleSpec,
        idea: &str,
        transcript: &[TranscriptEntry],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: format!("{}{}", role.system_prompt, ENVELOPE_INSTRUCTION),
        });
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: format!("Research idea: {idea}"),
        });
        // Prior analyses arrive as assistant turns labelled by author so the
        // model can follow the hand-off chain.
        for entry in transcript {
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: format!("[{}] {}", entry.agent, entry.content),
            });
        }
        messages
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(
        &self,
        role: &RoleSpec,
        idea: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(role, idea, transcript),
        };
        debug!(role = %role.name, messages = request.messages.len(), "sending completion request");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(PipelineError::ModelCall(format!(
                "{} returned {status}: {snippet}",
                role.name
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                PipelineError::ModelCall(format!("{} returned no choices", role.name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::roles;

    #[test]
    fn messages_carry_system_prompt_idea_then_transcript() {
        let role = &roles()[2];
        let transcript = vec![
            TranscriptEntry {
                step: 1,
                agent: "domain_classifier".to_string(),
                content: "🎯 Domain Analysis ...".to_string(),
            },
            TranscriptEntry {
                step: 2,
                agent: "senior_researcher".to_string(),
                content: "💡 Refined Idea ...".to_string(),
            },
        ];

        let messages = ChatCompletionClient::build_messages(role, "wildfire drones", &transcript);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.starts_with(role.system_prompt));
        assert!(messages[0].content.contains("JSON object"));
        assert_eq!(messages[1].content, "Research idea: wildfire drones");
        assert_eq!(messages[2].role, "assistant");
        assert!(messages[2].content.starts_with("[domain_classifier]"));
        assert!(messages[3].content.starts_with("[senior_researcher]"));
    }

    #[test]
    fn endpoint_join_tolerates_trailing_slash() {
        let config = PipelineConfig::from_lookup(|key| match key {
            crate::config::API_KEY_ENV => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap();
        let client = ChatCompletionClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn response_shape_deserializes() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello");
    }
}
