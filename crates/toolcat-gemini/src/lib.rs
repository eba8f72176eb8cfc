//! Gemini as a decision-maker for toolcat catalogs.
//!
//! [`GeminiClient::choose_function`] sends every declaration of a catalog as
//! one tool and turns the model's function call into a
//! [`DispatchRequest`](toolcat_core::DispatchRequest).
//! [`GeminiClient::answer`] runs a [`TextQaPrompt`] for free-text answers.

mod client;
mod prompt;
mod wire;

pub use client::{DEFAULT_GEMINI_ENDPOINT, GeminiClient, GeminiError};
pub use prompt::{TEXT_QA_SYSTEM_PROMPT, TextQaPrompt};
