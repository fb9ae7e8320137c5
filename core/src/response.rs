//! Response envelope for the editor agent protocol
//!
//! Exactly one of five mutually exclusive shapes goes out per turn. The
//! externally tagged enum makes emitting zero or multiple top-level keys
//! unrepresentable; the serializer always produces exactly one of
//! `content | tool_call | ask_user | terminate | error`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProtocolError, Result};

/// Arguments payload of a tool call
pub type ToolArguments = Map<String, Value>;

/// One complete outbound turn
///
/// Constructed fresh per turn by the decision policy, serialized once and
/// discarded. Session continuity lives entirely in the resupplied message
/// history, never in this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseEnvelope {
    /// Final assistant reply text for the user
    #[serde(rename = "content")]
    Content(String),

    /// Request that the orchestrator execute an editor tool
    #[serde(rename = "tool_call")]
    ToolCall {
        name: String,
        arguments: ToolArguments,
    },

    /// Clarifying question surfaced to the user
    #[serde(rename = "ask_user")]
    AskUser { message: String },

    /// End the session, optionally with a closing note
    #[serde(rename = "terminate")]
    Terminate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Turn-level failure, the protocol's only error channel
    #[serde(rename = "error")]
    Error { message: String },
}

impl ResponseEnvelope {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    /// Tool call with no arguments; serializes `arguments` as `{}`, not absent
    pub fn tool_call(name: impl Into<String>) -> Self {
        Self::ToolCall {
            name: name.into(),
            arguments: ToolArguments::new(),
        }
    }

    /// Tool call with arguments.
    ///
    /// The name is not checked against any advertised tool set here; that
    /// validation belongs to the decision policy or the orchestrator.
    pub fn tool_call_with(name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self::ToolCall {
            name: name.into(),
            arguments,
        }
    }

    pub fn ask_user(message: impl Into<String>) -> Self {
        Self::AskUser {
            message: message.into(),
        }
    }

    /// Terminate without a note; serializes as `{"terminate": {}}`
    pub fn terminate() -> Self {
        Self::Terminate { message: None }
    }

    pub fn terminate_with(message: impl Into<String>) -> Self {
        Self::Terminate {
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to the single-key wire form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Wire tag of this envelope, useful for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Content(_) => "content",
            Self::ToolCall { .. } => "tool_call",
            Self::AskUser { .. } => "ask_user",
            Self::Terminate { .. } => "terminate",
            Self::Error { .. } => "error",
        }
    }

    /// Check whether this envelope ends the session. Content, Terminate
    /// and Error all do; ToolCall and AskUser suspend and resume.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Content(_) | Self::Terminate { .. } | Self::Error { .. }
        )
    }
}
