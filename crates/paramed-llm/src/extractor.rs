use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::LlmError;
use crate::provider::{LlmProvider, Message};

/// Turns free text into a typed value by asking the provider for JSON that
/// matches the schema of the target type.
pub struct Extractor<'a, P: LlmProvider> {
    provider: &'a P,
    instructions: Option<Message>,
}

impl<'a, P: LlmProvider> Extractor<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            instructions: None,
        }
    }

    /// Sent as a leading system message.
    #[must_use]
    pub fn with_preamble(self, preamble: impl Into<String>) -> Self {
        Self {
            instructions: Some(Message::system(preamble)),
            ..self
        }
    }

    fn conversation(&self, input: &str) -> Vec<Message> {
        self.instructions
            .iter()
            .cloned()
            .chain(std::iter::once(Message::user(input)))
            .collect()
    }

    /// # Errors
    ///
    /// Provider failures pass through; undecodable output is
    /// [`LlmError::MalformedExtractionResponse`].
    pub async fn extract<T>(&self, input: &str) -> Result<T, LlmError>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        let messages = self.conversation(input);
        tracing::debug!(
            provider = self.provider.name(),
            chars = input.chars().count(),
            "structured extraction"
        );
        self.provider.chat_typed::<T>(&messages).await
    }
}
