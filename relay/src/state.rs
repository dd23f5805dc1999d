//! Session pipeline state.

use serde::{Serialize, Serializer};
use std::fmt;

/// Where a session is in its utterance lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    /// No audio buffered and nothing in flight.
    #[default]
    Idle,
    /// Fragments received since the last trigger.
    Buffering,
    /// At least one triggered utterance is queued or running.
    Processing,
}

impl PipelineState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Buffering => "buffering",
            PipelineState::Processing => "processing",
        }
    }

    /// Returns true while a triggered utterance has not finished.
    pub fn is_busy(&self) -> bool {
        matches!(self, PipelineState::Processing)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for PipelineState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
