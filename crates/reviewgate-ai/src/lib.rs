//! Classifier gateway: turns review text into normalised verdicts via an external LLM.

mod backend;
mod error;
mod gateway;
mod gemini;
pub mod parse;
pub mod prompt;

pub use backend::{LlmBackend, Prompt};
pub use error::ClassifierError;
pub use gateway::{ClassifierGateway, Mode, Verdict};
pub use gemini::GeminiClient;
pub use parse::Outcome;
