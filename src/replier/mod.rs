//! Reply generation
//!
//! Turns a buyer question plus listing context into answer text. The contract
//! here is deliberately infallible: a reply generator always hands back
//! something postable, falling back to a canned courtesy message when the
//! generative backend is unavailable or misconfigured. A flaky upstream must
//! never keep a buyer waiting with no answer at all.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::marketplace::Item;

/// Posted verbatim when reply generation fails for any reason.
pub const FALLBACK_REPLY: &str =
    "Obrigado pela sua pergunta! Em breve retornaremos com os detalhes.";

/// Persona instruction for the generative backend. The marketplace serves
/// Brazilian buyers, so replies are requested in PT-BR.
const SYSTEM_PROMPT: &str = "You are a helpful marketplace seller assistant. \
     Write a short, persuasive reply in Brazilian Portuguese (PT-BR) to the \
     buyer's question, using only the listing details provided. Encourage \
     the purchase politely. If the details do not answer the question, say \
     the seller will follow up soon.";

/// Produces answer text for a buyer question. Implementations must not fail;
/// degraded output is returned instead of an error.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(&self, question_text: &str, item: &Item) -> String;
}

#[derive(Debug, Error)]
enum ReplyError {
    #[error("generative backend is not configured")]
    MissingApiKey,
    #[error("generative backend returned status {status}: {detail}")]
    Backend { status: u16, detail: String },
    #[error("network error calling generative backend: {0}")]
    Network(#[from] reqwest::Error),
    #[error("generative backend response missing choices")]
    EmptyCompletion,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Chat-completion backed reply generator
pub struct OpenAiReplyGenerator {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiReplyGenerator {
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            api_key,
            model: model.into(),
        }
    }

    pub fn from_config(http: reqwest::Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.openai_api_base.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        )
    }

    fn build_prompt(question_text: &str, item: &Item) -> String {
        let mut prompt = format!(
            "A buyer asked the following question about the listing \"{}\" \
             (price: {} {}): {}",
            item.title, item.price, item.currency_id, question_text
        );
        if let Some(permalink) = &item.permalink {
            prompt.push_str(&format!("\nListing page: {}", permalink));
        }
        prompt
    }

    async fn try_generate(&self, question_text: &str, item: &Item) -> Result<String, ReplyError> {
        let api_key = self.api_key.as_deref().ok_or(ReplyError::MissingApiKey)?;

        let url = format!("{}/chat/completions", self.api_base);
        debug!(%url, model = %self.model, "requesting chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": SYSTEM_PROMPT,
                    },
                    {
                        "role": "user",
                        "content": Self::build_prompt(question_text, item),
                    }
                ],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ReplyError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(ReplyError::EmptyCompletion)?;

        Ok(text)
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiReplyGenerator {
    async fn generate_reply(&self, question_text: &str, item: &Item) -> String {
        match self.try_generate(question_text, item).await {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "reply generation failed, using fallback");
                FALLBACK_REPLY.to_owned()
            }
        }
    }
}
