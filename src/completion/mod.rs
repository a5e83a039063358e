//! Completion client.
//!
//! Turns the current style state and a user command into a single
//! chat-completion request and hands back the model's raw text. No
//! interpretation happens here: parsing the text and deciding what the user
//! sees on failure belong to the widget pipeline.

pub mod openai;

use crate::config::CompletionConfig;
use crate::protocol::{ChatMessage, ChatRequest, ResponseFormat};
use crate::style::StyleState;
use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAIClient;

/// Fixed instruction sent as the system turn.
pub const SYSTEM_PROMPT: &str = "You are a UI styling assistant. Return only valid JSON for styling \
     modifications. Current styles are provided. Modify only the requested properties.";

/// Failure to obtain completion text.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(
        "API key not found. Set OPENAI_API_KEY environment variable or add api_key to config file."
    )]
    MissingApiKey,
    #[error("failed to reach completion endpoint: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("completion request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed completion response: {0}")]
    Envelope(String),
    #[error("completion response contained no message content")]
    EmptyChoices,
}

/// Anything that can answer a style command with raw completion text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Ask the model to restyle `current` according to `command`.
    async fn complete(&self, current: &StyleState, command: &str)
        -> Result<String, CompletionError>;
}

/// The user turn: serialized current state followed by the literal command.
pub fn user_turn(current: &StyleState, command: &str) -> String {
    format!("Current styles: {}. Command: {}", current, command)
}

/// Build the request body for one style command.
pub fn build_request(config: &CompletionConfig, current: &StyleState, command: &str) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_turn(current, command)),
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        response_format: ResponseFormat::json_object(),
    }
}
