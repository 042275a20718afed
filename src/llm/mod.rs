//! LLM integration for pipeforge.
//!
//! The synthesizer talks to a generative text service through the
//! [`LlmProvider`] trait. [`OpenAiClient`] is the bundled implementation for
//! OpenAI-compatible chat completions endpoints; tests substitute scripted
//! providers.
//!
//! ```ignore
//! use pipeforge::llm::{GenerationRequest, LlmProvider, Message, OpenAiClient};
//!
//! let client = OpenAiClient::with_api_key(api_key)?;
//! let request = GenerationRequest::new("gpt-4", vec![Message::user("Hello!")])
//!     .with_temperature(0.3);
//! let response = client.generate(request).await?;
//! ```

pub mod openai;

pub use openai::{
    Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, OpenAiClient, Usage,
    DEFAULT_API_BASE, DEFAULT_MODEL,
};
