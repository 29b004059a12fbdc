use std::env;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fitbot_core::ports::LanguageModel;

pub const DEFAULT_OPENAI_API_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "arcee-ai/trinity-large-preview:free";
pub const DEFAULT_OLLAMA_MODEL: &str = "gpt-oss:20b-cloud";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const OPENROUTER_REFERER: &str = "https://fitbot.app";
const OPENROUTER_TITLE: &str = "FitBot";

#[derive(Clone, Debug)]
enum Backend {
    Ollama(Ollama),
    OpenAi {
        http: reqwest::Client,
        api_url: String,
        api_key: String,
    },
}

/// Chat model used for coach replies.
#[derive(Clone, Debug)]
pub struct LlmService {
    backend: Backend,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionReply,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// First choice's text; an empty or missing choice reads as an empty reply.
    fn into_reply(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }
}

impl LlmService {
    pub fn ollama(host: impl Into<String>, port: u16, model: impl Into<String>) -> Self {
        Self {
            backend: Backend::Ollama(Ollama::new(host.into(), port)),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn openai(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend: Backend::OpenAi {
                http: reqwest::Client::new(),
                api_url: api_url.into().trim_end_matches('/').to_owned(),
                api_key: api_key.into(),
            },
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from `LLM_PROVIDER` (`ollama` or `openai`) and the matching variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let provider = env_trimmed("LLM_PROVIDER").unwrap_or_else(|| "ollama".to_owned());
        let timeout = env::var("LLM_TIMEOUT_SECONDS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|seconds| *seconds > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        let service = match provider.to_ascii_lowercase().as_str() {
            "ollama" => {
                let host = env_trimmed("OLLAMA_HOST").unwrap_or_else(|| "http://127.0.0.1".to_owned());
                let port = env::var("OLLAMA_PORT")
                    .ok()
                    .and_then(|value| value.trim().parse::<u16>().ok())
                    .unwrap_or(11434);
                let model =
                    env_trimmed("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_owned());
                Self::ollama(host, port, model)
            }
            "openai" | "openrouter" => {
                let api_key = env_trimmed("OPENAI_API_KEY")
                    .context("OPENAI_API_KEY is required when LLM_PROVIDER=openai")?;
                let api_url =
                    env_trimmed("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_owned());
                let model =
                    env_trimmed("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_owned());
                Self::openai(api_url, api_key, model)
            }
            other => anyhow::bail!("unknown LLM_PROVIDER `{other}` (expected `ollama` or `openai`)"),
        };

        Ok(service.with_timeout(timeout))
    }

    pub fn provider_name(&self) -> &'static str {
        match self.backend {
            Backend::Ollama(_) => "ollama",
            Backend::OpenAi { .. } => "openai",
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn chat(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String> {
        match &self.backend {
            Backend::Ollama(client) => {
                let messages = vec![
                    ChatMessage::system(system_prompt.to_owned()),
                    ChatMessage::user(user_message.to_owned()),
                ];
                let request = ChatMessageRequest::new(self.model.clone(), messages).options(
                    ModelOptions::default()
                        .temperature(0.75)
                        .repeat_penalty(1.2),
                );
                let response = client
                    .send_chat_messages(request)
                    .await
                    .context("failed to get ollama chat response")?;

                Ok(response.message.content)
            }
            Backend::OpenAi {
                http,
                api_url,
                api_key,
            } => {
                let body = ChatCompletionRequest {
                    model: &self.model,
                    messages: [
                        CompletionMessage {
                            role: "system",
                            content: system_prompt,
                        },
                        CompletionMessage {
                            role: "user",
                            content: user_message,
                        },
                    ],
                };

                let response = http
                    .post(format!("{api_url}/chat/completions"))
                    .bearer_auth(api_key)
                    .header("HTTP-Referer", OPENROUTER_REFERER)
                    .header("X-Title", OPENROUTER_TITLE)
                    .json(&body)
                    .send()
                    .await
                    .context("failed to send chat completion request")?;

                let status = response.status();
                if !status.is_success() {
                    let detail = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unable to read body".to_owned());
                    anyhow::bail!("chat completion returned {status}: {detail}");
                }

                let completion: ChatCompletionResponse = response
                    .json()
                    .await
                    .context("failed to parse chat completion response")?;

                Ok(completion.into_reply())
            }
        }
    }
}

#[async_trait]
impl LanguageModel for LlmService {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String> {
        debug!(
            provider = self.provider_name(),
            model = %self.model,
            "requesting coach reply"
        );

        let reply = tokio::time::timeout(self.timeout, self.chat(system_prompt, user_message))
            .await
            .map_err(|_| {
                anyhow::anyhow!("model call timed out after {}s", self.timeout.as_secs())
            })??;

        Ok(reply.trim().to_owned())
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
