#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion payload is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("completion endpoint is rate limiting requests")]
    RateLimited,

    #[error("completion endpoint answered HTTP {status}")]
    Api { status: u16 },

    #[error("{provider} returned no message content")]
    EmptyResponse { provider: &'static str },

    /// The completion arrived but its content is not the JSON document we asked for.
    #[error("malformed extraction response: {0}")]
    MalformedExtractionResponse(String),
}

impl LlmError {
    /// True when the failure is about the model output rather than transport.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedExtractionResponse(_))
    }
}
