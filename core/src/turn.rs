//! Process-boundary turn execution
//!
//! One request in, one envelope out. Whatever goes wrong (unparseable
//! input, a policy that returns an error, a policy that panics) the
//! caller receives a well-formed JSON object. The orchestrator on the other
//! side of the pipe never sees a backtrace or empty output.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::ProtocolError;
use crate::protocol::Request;
use crate::response::ResponseEnvelope;

/// Emitted only if the error envelope itself fails to serialize, which
/// plain-string payloads cannot trigger in practice.
const FALLBACK_ERROR_JSON: &str = r#"{"error":{"message":"internal serialization failure"}}"#;

/// The pluggable decision logic mapping a request to an envelope.
///
/// Policies are the replaceable half of the agent: the protocol core stays
/// fixed while deployments swap in their own reasoning. A policy must be
/// pure with respect to process state: all session continuity arrives in
/// the request's message history.
pub trait DecisionPolicy {
    fn decide(&self, request: &Request) -> anyhow::Result<ResponseEnvelope>;
}

impl<F> DecisionPolicy for F
where
    F: Fn(&Request) -> anyhow::Result<ResponseEnvelope>,
{
    fn decide(&self, request: &Request) -> anyhow::Result<ResponseEnvelope> {
        self(request)
    }
}

/// Run one complete turn: parse, decide, serialize.
///
/// Total over all inputs; the returned string is always one JSON object
/// with exactly one top-level key.
pub fn run_turn(raw: &str, policy: &dyn DecisionPolicy) -> String {
    let request = match Request::parse(raw) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting unparseable request");
            return emit(&ResponseEnvelope::error(err.envelope_message()));
        }
    };

    let envelope = match decide_guarded(policy, &request) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, iteration = request.iteration, "policy failed");
            ResponseEnvelope::error(err.envelope_message())
        }
    };

    tracing::debug!(
        kind = envelope.kind(),
        iteration = request.iteration,
        "turn complete"
    );
    emit(&envelope)
}

/// Invoke the policy, converting both returned errors and panics into
/// [`ProtocolError::PolicyError`].
fn decide_guarded(
    policy: &dyn DecisionPolicy,
    request: &Request,
) -> Result<ResponseEnvelope, ProtocolError> {
    match catch_unwind(AssertUnwindSafe(|| policy.decide(request))) {
        Ok(Ok(envelope)) => Ok(envelope),
        Ok(Err(err)) => Err(err.into()),
        Err(panic) => Err(ProtocolError::PolicyError {
            message: panic_message(panic.as_ref()),
        }),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "policy panicked".to_string()
    }
}

fn emit(envelope: &ResponseEnvelope) -> String {
    match envelope.to_json() {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(error = %err, "envelope failed to serialize");
            ResponseEnvelope::error(err.envelope_message())
                .to_json()
                .unwrap_or_else(|_| FALLBACK_ERROR_JSON.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn echo_policy(request: &Request) -> anyhow::Result<ResponseEnvelope> {
        let text = request
            .last_user_message()
            .map(|m| m.content.clone())
            .unwrap_or_else(|| "How can I help you?".to_string());
        Ok(ResponseEnvelope::content(text))
    }

    fn parse_output(out: &str) -> Value {
        serde_json::from_str(out).expect("turn output must be valid JSON")
    }

    #[test]
    fn test_echo_turn() {
        let raw = r#"{"messages":[{"role":"user","content":"hi"}],"iteration":1}"#;
        let out = run_turn(raw, &echo_policy);
        assert_eq!(parse_output(&out), json!({ "content": "hi" }));
    }

    #[test]
    fn test_empty_input_runs_with_defaults() {
        let out = run_turn("", &echo_policy);
        assert_eq!(parse_output(&out), json!({ "content": "How can I help you?" }));
    }

    #[test]
    fn test_broken_json_becomes_error_envelope() {
        let out = run_turn("not json", &echo_policy);
        let value = parse_output(&out);
        let message = value["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid input JSON:"));
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_policy_error_becomes_error_envelope() {
        let failing = |_: &Request| -> anyhow::Result<ResponseEnvelope> {
            Err(anyhow::anyhow!("no viable action"))
        };
        let out = run_turn("{}", &failing);
        let value = parse_output(&out);
        let message = value["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("Runner error:"));
        assert!(message.contains("no viable action"));
    }

    #[test]
    fn test_policy_panic_becomes_error_envelope() {
        let panicking =
            |_: &Request| -> anyhow::Result<ResponseEnvelope> { panic!("unexpected state") };
        let out = run_turn("{}", &panicking);
        let value = parse_output(&out);
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("unexpected state"));
    }

    #[test]
    fn test_output_is_always_single_key_json() {
        let inputs = ["", "{}", "not json", "[3]", r#"{"iteration":"x"}"#];
        for raw in inputs {
            let out = run_turn(raw, &echo_policy);
            let value = parse_output(&out);
            assert_eq!(value.as_object().unwrap().len(), 1, "input {:?}", raw);
        }
    }
}
