//! Chat-completion provider abstraction and the OpenAI-compatible backend.

pub mod error;
pub mod extractor;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use extractor::Extractor;
pub use provider::{LlmProvider, Message, Role};
