use std::future::Future;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and return the assistant text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Like [`chat`](Self::chat) but asks the backend for a JSON object response.
    ///
    /// Backends without a JSON mode fall back to plain chat.
    ///
    /// # Errors
    ///
    /// Same as [`chat`](Self::chat).
    fn chat_json(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<String, LlmError>> + Send {
        self.chat(messages)
    }

    /// Request a JSON response and decode it into `T`.
    ///
    /// The JSON schema of `T` is appended as a trailing system message.
    ///
    /// # Errors
    ///
    /// Transport errors propagate unchanged; undecodable content yields
    /// [`LlmError::MalformedExtractionResponse`].
    fn chat_typed<T>(&self, messages: &[Message]) -> impl Future<Output = Result<T, LlmError>> + Send
    where
        T: DeserializeOwned + JsonSchema + Send,
        Self: Sized,
    {
        async move {
            let mut augmented = messages.to_vec();
            augmented.push(Message::system(schema_instruction::<T>()?));
            let content = self.chat_json(&augmented).await?;
            decode_json::<T>(&content)
        }
    }

    fn name(&self) -> &str;
}

/// Render the instruction that pins the reply to the JSON schema of `T`.
///
/// # Errors
///
/// Returns an error if the generated schema cannot be serialized.
pub fn schema_instruction<T: JsonSchema>() -> Result<String, LlmError> {
    let schema = schemars::schema_for!(T);
    let rendered = serde_json::to_string(&schema)?;
    Ok(format!(
        "Respond with a single JSON object and nothing else. \
         The object must conform to this JSON schema:\n{rendered}"
    ))
}

/// Decode model output into `T`, tolerating markdown code fences and prose
/// around the JSON object.
///
/// # Errors
///
/// Returns [`LlmError::MalformedExtractionResponse`] when no JSON object is found
/// or it does not match `T`.
pub fn decode_json<T: DeserializeOwned>(content: &str) -> Result<T, LlmError> {
    let Some(object) = json_object_slice(content) else {
        return Err(LlmError::MalformedExtractionResponse(
            "no JSON object in response".into(),
        ));
    };
    serde_json::from_str::<T>(object)
        .map_err(|e| LlmError::MalformedExtractionResponse(e.to_string()))
}

fn json_object_slice(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}
