//! Protocol core for editor-integrated agents
//!
//! A turn-based request/response protocol between an editor orchestrator
//! and an external agent process: one JSON object in, one JSON object out,
//! per invocation. The agent holds no state between invocations; all
//! continuity flows through the resupplied message history.
//!
//! The interoperability surface is two components, consumed in order:
//! [`protocol::Request`] (parse the inbound turn) and
//! [`response::ResponseEnvelope`] (construct exactly one of five outbound
//! shapes). Everything else is replaceable: the decision policy behind
//! [`turn::run_turn`] and the host loop modeled by [`session::Session`].

#![forbid(unsafe_code)]

pub mod error;
pub mod protocol;
pub mod response;
pub mod session;
pub mod turn;

pub use error::{ProtocolError, Result};
pub use protocol::{
    BufferContext, Context, EditorContext, Message, Request, ToolDescriptor, PROTOCOL_VERSION,
};
pub use response::{ResponseEnvelope, ToolArguments};
pub use session::{Session, SessionError, SessionOutcome, TurnState};
pub use turn::{run_turn, DecisionPolicy};
