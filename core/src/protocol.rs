//! Request model for the editor agent protocol
//!
//! One JSON object arrives per process invocation. Parsing is intentionally
//! lenient: every field is optional and takes a documented default, so a
//! partial payload can never crash the agent. Only input that is not
//! syntactically valid JSON is rejected (and even that becomes an `error`
//! envelope at the process boundary, see [`crate::turn`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, Result};

/// Protocol version this implementation speaks
pub const PROTOCOL_VERSION: &str = "1.0";

// =============================================================================
// Wire Types
// =============================================================================

/// Single message in the conversation history
///
/// `role` is stored verbatim, including roles this implementation does not
/// know about. The system/user/assistant split is a convention enforced by
/// consumers, not by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// Editor tool advertised to the agent
///
/// `parameters` is an opaque JSON-Schema-like object. Schema correctness is
/// the editor's responsibility; the agent never validates it. The `name`
/// field matching the enclosing map key is a convention, not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object")]
    pub parameters: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Best-effort context about the buffer the user is editing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
}

/// Best-effort context about the editor process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// Aggregated editor context; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub buffer: BufferContext,
    #[serde(default)]
    pub editor: EditorContext,
}

/// The full inbound turn state
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// System-level guidance, empty when absent
    pub instructions: String,

    /// Conversation history, earliest first
    pub messages: Vec<Message>,

    /// Available editor tools, keyed by tool name
    pub tools: BTreeMap<String, ToolDescriptor>,

    /// Editor context, best-effort
    pub context: Context,

    /// 1-based iteration counter within the session.
    /// A literal `0` is indistinguishable from absence; both become 1.
    pub iteration: u32,

    /// Declared protocol version, never validated against a supported list
    pub protocol_version: String,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            instructions: String::new(),
            messages: Vec::new(),
            tools: BTreeMap::new(),
            context: Context::default(),
            iteration: 1,
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

impl Request {
    /// Parse a raw payload into a [`Request`].
    ///
    /// Empty (or whitespace-only) input is treated as `"{}"`. A payload
    /// that decodes to something other than a JSON object falls back to
    /// all-defaults. The only failure mode is syntactically invalid JSON.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| {
            tracing::debug!(error = %e, "inbound payload is not valid JSON");
            ProtocolError::InvalidInput {
                message: e.to_string(),
            }
        })?;
        Ok(Self::from_value(&value))
    }

    /// Build a [`Request`] from decoded JSON, defaulting every missing or
    /// malformed field. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let Some(data) = value.as_object() else {
            return Self::default();
        };

        let protocol_version = data
            .get("protocol")
            .and_then(Value::as_object)
            .and_then(|p| p.get("version"))
            .and_then(scalar_to_string)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| PROTOCOL_VERSION.to_string());

        let messages = data
            .get("messages")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(parse_message).collect())
            .unwrap_or_default();

        let tools = data
            .get("tools")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(name, raw)| (name.clone(), parse_tool_descriptor(raw)))
                    .collect()
            })
            .unwrap_or_default();

        let ctx_raw = data.get("context").and_then(Value::as_object);
        let buffer = nested_object(ctx_raw, "buffer");
        let editor = nested_object(ctx_raw, "editor");
        let context = Context {
            buffer: BufferContext {
                path: optional_string(buffer, "path"),
                filetype: optional_string(buffer, "filetype"),
            },
            editor: EditorContext {
                cwd: optional_string(editor, "cwd"),
            },
        };

        Self {
            instructions: data
                .get("instructions")
                .and_then(scalar_to_string)
                .unwrap_or_default(),
            messages,
            tools,
            context,
            iteration: parse_iteration(data.get("iteration")),
            protocol_version,
        }
    }

    /// Rebuild the wire shape of this request.
    ///
    /// Used by orchestrator-side code to construct the payload for the next
    /// iteration; round-trips through [`Request::from_value`].
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "protocol": { "version": self.protocol_version },
            "instructions": self.instructions,
            "messages": self.messages,
            "tools": self.tools,
            "context": self.context,
            "iteration": self.iteration,
        })
    }

    /// Last message with role `"user"`, if any
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }

    /// Check whether a tool with the given name was advertised
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

/// Stringify a JSON scalar. Null and containers yield `None`.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn optional_string(obj: Option<&serde_json::Map<String, Value>>, key: &str) -> Option<String> {
    obj.and_then(|o| o.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn nested_object<'a>(
    obj: Option<&'a serde_json::Map<String, Value>>,
    key: &str,
) -> Option<&'a serde_json::Map<String, Value>> {
    obj.and_then(|o| o.get(key)).and_then(Value::as_object)
}

/// Non-object history entries are dropped rather than rejected.
fn parse_message(entry: &Value) -> Option<Message> {
    let obj = entry.as_object()?;
    let role = obj
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("user")
        .to_string();
    let content = obj
        .get("content")
        .and_then(scalar_to_string)
        .unwrap_or_default();
    Some(Message { role, content })
}

/// Descriptors are passed through with minimal shaping: string fields are
/// defaulted, `parameters` is kept verbatim. No schema validation happens
/// at parse time.
fn parse_tool_descriptor(raw: &Value) -> ToolDescriptor {
    let Some(obj) = raw.as_object() else {
        return ToolDescriptor {
            name: String::new(),
            description: String::new(),
            parameters: empty_object(),
        };
    };
    ToolDescriptor {
        name: obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        parameters: obj.get("parameters").cloned().unwrap_or_else(empty_object),
    }
}

/// Coerce `iteration` to a positive integer. Absent, zero, negative or
/// unparseable values all become 1.
fn parse_iteration(value: Option<&Value>) -> u32 {
    let n = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 1,
    }
}
