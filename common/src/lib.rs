use serde::{Deserialize, Serialize};
use uuid::Uuid;
pub mod config;

/// Body of a `POST /api/generate` call to the inference endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, stream: bool) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream,
        }
    }
}

/// One JSON object from the inference endpoint. A non-streamed reply is a
/// single chunk; a streamed reply is one chunk per line.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerateChunk {
    /// The text fragment carried by this chunk, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.response.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Processing,
    Completed,
    Error,
}

impl RequestStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Error)
    }

    /// Transitions only move forward: `processing -> completed | error`.
    #[inline]
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self == RequestStatus::Processing && next.is_terminal()
    }
}

/// An accepted region request, owned by the tracking map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackedRequest {
    pub id: Uuid,
    pub region: String,
    pub status: RequestStatus,
}

impl TrackedRequest {
    pub fn processing(region: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            region: region.into(),
            status: RequestStatus::Processing,
        }
    }
}
