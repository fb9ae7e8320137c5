//! Orchestrator-side session state machine
//!
//! The agent process itself is single-shot and stateless; this module is
//! the other half of the contract: the turn loop an orchestrator drives
//! around it. Pure state transitions, no IO: the host owns process
//! spawning and tool execution and feeds the results back in here.

use thiserror::Error;

use crate::protocol::{Context, Message, Request, ToolDescriptor};
use crate::response::ResponseEnvelope;

/// Where the turn loop currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Agent should be (re-)invoked with the current history
    AwaitingAgent,
    /// A tool call is outstanding; its result must be fed back
    AwaitingToolResult,
    /// A clarifying question is with the user
    AwaitingUser,
    /// Loop exited for this session
    Done,
}

/// How a finished session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Agent delivered a final answer
    Answered(String),
    /// Agent ended the session, optionally with a note
    Terminated(Option<String>),
    /// Agent reported a failure; the loop does not retry
    Failed(String),
    /// The externally imposed iteration cap was hit
    IterationLimit,
}

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("invalid transition: {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: TurnState,
    },
}

/// One conversation's turn loop.
///
/// Tracks history, the 1-based iteration counter and the loop state, and
/// builds the payload for each agent invocation. The protocol defines no
/// iteration cap of its own; hosts should set one via
/// [`Session::with_max_iterations`] to bound runaway tool-call cycles.
#[derive(Debug, Clone)]
pub struct Session {
    state: TurnState,
    iteration: u32,
    instructions: String,
    tools: std::collections::BTreeMap<String, ToolDescriptor>,
    context: Context,
    messages: Vec<Message>,
    max_iterations: Option<u32>,
    outcome: Option<SessionOutcome>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: TurnState::AwaitingAgent,
            iteration: 1,
            instructions: String::new(),
            tools: std::collections::BTreeMap::new(),
            context: Context::default(),
            messages: Vec::new(),
            max_iterations: None,
            outcome: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_tool(mut self, name: impl Into<String>, descriptor: ToolDescriptor) -> Self {
        self.tools.insert(name.into(), descriptor);
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_max_iterations(mut self, cap: u32) -> Self {
        self.max_iterations = Some(cap);
        self
    }

    pub fn with_user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.state == TurnState::Done
    }

    /// Payload for the next agent invocation.
    ///
    /// Only meaningful while [`TurnState::AwaitingAgent`]; the host
    /// serializes this with [`Request::to_value`] and pipes it in.
    pub fn next_request(&self) -> Request {
        Request {
            instructions: self.instructions.clone(),
            messages: self.messages.clone(),
            tools: self.tools.clone(),
            context: self.context.clone(),
            iteration: self.iteration,
            ..Request::default()
        }
    }

    /// Apply the envelope the agent produced for the current iteration.
    pub fn observe(&mut self, envelope: &ResponseEnvelope) -> Result<(), SessionError> {
        if self.state != TurnState::AwaitingAgent {
            return Err(SessionError::InvalidTransition {
                action: "observe",
                state: self.state,
            });
        }
        match envelope {
            ResponseEnvelope::Content(text) => {
                self.messages.push(Message::assistant(text.clone()));
                self.finish(SessionOutcome::Answered(text.clone()));
            }
            ResponseEnvelope::ToolCall { name, .. } => {
                tracing::debug!(tool = %name, iteration = self.iteration, "tool call pending");
                self.state = TurnState::AwaitingToolResult;
            }
            ResponseEnvelope::AskUser { message } => {
                self.messages.push(Message::assistant(message.clone()));
                self.state = TurnState::AwaitingUser;
            }
            ResponseEnvelope::Terminate { message } => {
                self.finish(SessionOutcome::Terminated(message.clone()));
            }
            ResponseEnvelope::Error { message } => {
                self.finish(SessionOutcome::Failed(message.clone()));
            }
        }
        Ok(())
    }

    /// Feed back the result of the outstanding tool call.
    ///
    /// Appends a tool-role message (the exact role tag is host convention;
    /// the request parser stores any role verbatim) and bumps the
    /// iteration counter.
    pub fn resume_with_tool_result(
        &mut self,
        content: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.state != TurnState::AwaitingToolResult {
            return Err(SessionError::InvalidTransition {
                action: "resume_with_tool_result",
                state: self.state,
            });
        }
        self.messages.push(Message::tool(content));
        self.advance_iteration();
        Ok(())
    }

    /// Feed back the user's reply to a clarifying question.
    pub fn resume_with_user_reply(
        &mut self,
        content: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.state != TurnState::AwaitingUser {
            return Err(SessionError::InvalidTransition {
                action: "resume_with_user_reply",
                state: self.state,
            });
        }
        self.messages.push(Message::user(content));
        self.advance_iteration();
        Ok(())
    }

    /// Start a fresh turn after a delivered answer: iteration restarts at 1
    /// with the history retained and the new user message appended.
    pub fn restart_with_user_message(
        &mut self,
        content: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.state != TurnState::Done {
            return Err(SessionError::InvalidTransition {
                action: "restart_with_user_message",
                state: self.state,
            });
        }
        self.messages.push(Message::user(content));
        self.iteration = 1;
        self.outcome = None;
        self.state = TurnState::AwaitingAgent;
        Ok(())
    }

    fn advance_iteration(&mut self) {
        self.iteration += 1;
        if let Some(cap) = self.max_iterations {
            if self.iteration > cap {
                tracing::warn!(cap, "iteration cap reached, ending session");
                self.finish(SessionOutcome::IterationLimit);
                return;
            }
        }
        self.state = TurnState::AwaitingAgent;
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        self.outcome = Some(outcome);
        self.state = TurnState::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new().with_user_message("hi")
    }

    #[test]
    fn test_initial_state() {
        let s = session();
        assert_eq!(s.state(), TurnState::AwaitingAgent);
        assert_eq!(s.iteration(), 1);
        let req = s.next_request();
        assert_eq!(req.iteration, 1);
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn test_content_finishes_session() {
        let mut s = session();
        s.observe(&ResponseEnvelope::content("answer")).unwrap();
        assert!(s.is_done());
        assert_eq!(
            s.outcome(),
            Some(&SessionOutcome::Answered("answer".to_string()))
        );
        assert_eq!(s.messages().last().unwrap().role, "assistant");
    }

    #[test]
    fn test_tool_call_round_trip_increments_iteration() {
        let mut s = session();
        s.observe(&ResponseEnvelope::tool_call("ReadFileLines"))
            .unwrap();
        assert_eq!(s.state(), TurnState::AwaitingToolResult);

        s.resume_with_tool_result("line 1\nline 2").unwrap();
        assert_eq!(s.state(), TurnState::AwaitingAgent);
        assert_eq!(s.iteration(), 2);
        assert_eq!(s.messages().last().unwrap().role, "tool");
        assert_eq!(s.next_request().iteration, 2);
    }

    #[test]
    fn test_ask_user_suspends_until_reply() {
        let mut s = session();
        s.observe(&ResponseEnvelope::ask_user("Which file?")).unwrap();
        assert_eq!(s.state(), TurnState::AwaitingUser);

        // Agent must not be re-invoked before the reply arrives.
        assert!(s.observe(&ResponseEnvelope::content("x")).is_err());

        s.resume_with_user_reply("/a/b.py").unwrap();
        assert_eq!(s.state(), TurnState::AwaitingAgent);
        assert_eq!(s.iteration(), 2);
    }

    #[test]
    fn test_terminate_and_error_finish_immediately() {
        let mut s = session();
        s.observe(&ResponseEnvelope::terminate_with("bye")).unwrap();
        assert_eq!(
            s.outcome(),
            Some(&SessionOutcome::Terminated(Some("bye".to_string())))
        );

        let mut s = session();
        s.observe(&ResponseEnvelope::error("boom")).unwrap();
        assert_eq!(s.outcome(), Some(&SessionOutcome::Failed("boom".to_string())));
    }

    #[test]
    fn test_iteration_cap_bounds_tool_loops() {
        let mut s = session().with_max_iterations(3);
        for _ in 0..2 {
            s.observe(&ResponseEnvelope::tool_call("T")).unwrap();
            s.resume_with_tool_result("ok").unwrap();
        }
        assert_eq!(s.iteration(), 3);
        s.observe(&ResponseEnvelope::tool_call("T")).unwrap();
        s.resume_with_tool_result("ok").unwrap();
        assert!(s.is_done());
        assert_eq!(s.outcome(), Some(&SessionOutcome::IterationLimit));
    }

    #[test]
    fn test_restart_after_answer_resets_iteration() {
        let mut s = session();
        s.observe(&ResponseEnvelope::tool_call("T")).unwrap();
        s.resume_with_tool_result("ok").unwrap();
        s.observe(&ResponseEnvelope::content("answer")).unwrap();
        assert!(s.is_done());

        s.restart_with_user_message("follow-up").unwrap();
        assert_eq!(s.state(), TurnState::AwaitingAgent);
        assert_eq!(s.iteration(), 1);
        // History is retained across the restart.
        assert_eq!(s.messages().len(), 4);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut s = session();
        assert_eq!(
            s.resume_with_tool_result("x"),
            Err(SessionError::InvalidTransition {
                action: "resume_with_tool_result",
                state: TurnState::AwaitingAgent,
            })
        );
        assert!(s.resume_with_user_reply("x").is_err());
        assert!(s.restart_with_user_message("x").is_err());
    }
}
