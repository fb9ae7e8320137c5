//! Bundled demo decision policy
//!
//! A deliberately small policy that exercises every envelope shape the
//! protocol offers. Deployments replace this with their own reasoning;
//! the protocol core neither knows nor cares what sits behind the
//! [`DecisionPolicy`] seam.

use anyhow::Result;
use nvagent_core::{DecisionPolicy, Request, ResponseEnvelope, ToolArguments};
use serde_json::json;

const READ_FILE_TOOL: &str = "ReadFileLines";
const HEADER_LINES: u64 = 60;

/// Demo policy: inspect the current buffer on the first iteration, then
/// echo the last user message.
pub struct DemoPolicy;

impl DecisionPolicy for DemoPolicy {
    fn decide(&self, request: &Request) -> Result<ResponseEnvelope> {
        // First iteration with the file-reading tool available: look at the
        // buffer the user is editing before answering. Without a buffer
        // path there is nothing to read, so ask.
        if request.iteration == 1 && request.has_tool(READ_FILE_TOOL) {
            return Ok(match &request.context.buffer.path {
                Some(path) => read_file_header(path),
                None => ResponseEnvelope::ask_user("Which file should I inspect?"),
            });
        }

        Ok(ResponseEnvelope::content(echo_text(request)))
    }
}

fn read_file_header(path: &str) -> ResponseEnvelope {
    let mut arguments = ToolArguments::new();
    arguments.insert("path".to_string(), json!(path));
    arguments.insert("start_line".to_string(), json!(1));
    arguments.insert("end_line".to_string(), json!(HEADER_LINES));
    ResponseEnvelope::tool_call_with(READ_FILE_TOOL, arguments)
}

fn echo_text(request: &Request) -> String {
    let text = request
        .last_user_message()
        .map(|m| m.content.clone())
        .unwrap_or_else(|| "How can I help you?".to_string());
    if request.instructions.is_empty() {
        text
    } else {
        format!("{}\n\n{}", request.instructions, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvagent_core::run_turn;
    use serde_json::Value;

    fn turn(raw: &str) -> Value {
        serde_json::from_str(&run_turn(raw, &DemoPolicy)).unwrap()
    }

    #[test]
    fn test_echoes_last_user_message() {
        let out = turn(r#"{"messages":[{"role":"user","content":"hi"}],"iteration":1}"#);
        assert_eq!(out, json!({ "content": "hi" }));
    }

    #[test]
    fn test_asks_when_buffer_path_missing() {
        let out = turn(r#"{"iteration":1,"tools":{"ReadFileLines":{"name":"ReadFileLines","description":"","parameters":{}}}}"#);
        assert_eq!(out, json!({ "ask_user": { "message": "Which file should I inspect?" } }));
    }

    #[test]
    fn test_reads_buffer_when_path_present() {
        let out = turn(
            r#"{"iteration":1,
                "tools":{"ReadFileLines":{"name":"ReadFileLines","description":"","parameters":{}}},
                "context":{"buffer":{"path":"/a/b.py"}}}"#,
        );
        assert_eq!(
            out,
            json!({ "tool_call": { "name": "ReadFileLines",
                                   "arguments": { "path": "/a/b.py", "start_line": 1, "end_line": 60 } } })
        );
    }

    #[test]
    fn test_later_iterations_echo_even_with_tools() {
        let out = turn(
            r#"{"iteration":2,
                "tools":{"ReadFileLines":{"name":"ReadFileLines","description":"","parameters":{}}},
                "messages":[{"role":"user","content":"summarize"},{"role":"tool","content":"fn main() {}"}]}"#,
        );
        assert_eq!(out, json!({ "content": "summarize" }));
    }

    #[test]
    fn test_instructions_prefix_reply() {
        let out = turn(
            r#"{"instructions":"Be brief.","messages":[{"role":"user","content":"hi"}],"iteration":2}"#,
        );
        assert_eq!(out, json!({ "content": "Be brief.\n\nhi" }));
    }

    #[test]
    fn test_greeting_when_history_empty() {
        let out = turn("{}");
        assert_eq!(out, json!({ "content": "How can I help you?" }));
    }
}
