//! Protocol messages for client-server communication.
//!
//! The duel server speaks two dialects over one WebSocket: the client sends
//! plain text commands, the server answers with JSON objects discriminated by
//! their `type` field. The judge is a separate HTTP service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Language, Problem};

/// Length of a duel once a problem has been assigned.
pub const DUEL_DURATION_SECS: u32 = 600;

/// Default WebSocket base URL. The username is appended as a path segment.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/ws";

/// Default base URL of the execution service.
pub const DEFAULT_JUDGE_URL: &str = "http://127.0.0.1:8000";

/// Commands sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Enter the matchmaking queue.
    Join,

    /// Declare this side of the duel finished.
    Finish { opponent: String },
}

impl ClientCommand {
    /// Encode the command as the text frame the server expects.
    pub fn to_wire(&self) -> String {
        match self {
            ClientCommand::Join => "join".to_string(),
            ClientCommand::Finish { opponent } => format!("finish:{}", opponent),
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Informational status, e.g. "Waiting for opponent...".
    Status { message: String },

    /// A match was made and this is the shared problem.
    Problem(Problem),

    /// The duel is over.
    Result { message: String },

    /// The server did not understand a command and echoed it back.
    Echo { message: String },
}

/// Discriminant of a [`ServerMessage`], used as the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Status,
    Problem,
    Result,
    Echo,
}

impl ServerMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ServerMessage::Status { .. } => MessageKind::Status,
            ServerMessage::Problem(_) => MessageKind::Problem,
            ServerMessage::Result { .. } => MessageKind::Result,
            ServerMessage::Echo { .. } => MessageKind::Echo,
        }
    }
}

/// Body of `POST /run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRequest {
    pub slug: String,
    pub code: String,
    pub language: Language,
}

/// Body returned by `POST /run`.
///
/// The service answers with one of three shapes: `{error}`,
/// `{all_passed: true}` or `{all_passed: false, results}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub all_passed: Option<bool>,
    #[serde(default)]
    pub results: Option<Vec<CaseResult>>,
}

/// Outcome of a single test case, as reported by the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub input: Value,
    pub expected: Value,
    pub output: Value,
    #[serde(default)]
    pub status: Option<String>,
    pub passed: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /finish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishRequest {
    pub username: String,
    pub opponent: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        assert_eq!(ClientCommand::Join.to_wire(), "join");
        let finish = ClientCommand::Finish {
            opponent: "bob".to_string(),
        };
        assert_eq!(finish.to_wire(), "finish:bob");
    }

    #[test]
    fn test_problem_message_deserialization() {
        let json = r#"{
            "type": "problem",
            "slug": "two-sum",
            "title": "Two Sum",
            "difficulty": "Easy",
            "tags": ["Array", "Hash Table"],
            "link": "https://leetcode.com/problems/two-sum/",
            "description": "<p>Given an array...</p>",
            "opponent": "bob"
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind(), MessageKind::Problem);

        let ServerMessage::Problem(problem) = msg else {
            panic!("expected a problem message");
        };
        assert_eq!(problem.slug, "two-sum");
        assert_eq!(problem.tags, vec!["Array", "Hash Table"]);
        assert_eq!(problem.opponent.as_deref(), Some("bob"));
    }

    #[test]
    fn test_status_and_result_messages() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"status","message":"Waiting for opponent..."}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Status {
                message: "Waiting for opponent...".to_string()
            }
        );

        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"result","message":"alice wins"}"#).unwrap();
        assert_eq!(msg.kind(), MessageKind::Result);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"bogus"}"#).is_err());
        assert!(serde_json::from_str::<ServerMessage>(r#"{"message":"no type"}"#).is_err());
    }

    #[test]
    fn test_run_request_serialization() {
        let request = RunRequest {
            slug: "two-sum".to_string(),
            code: "print(1)".to_string(),
            language: Language::Cpp,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"language\":\"cpp\""));
        assert!(json.contains("\"slug\":\"two-sum\""));
    }

    #[test]
    fn test_case_results_keep_raw_values() {
        let json = r#"{
            "all_passed": false,
            "results": [
                {"input": [2, 7], "expected": [0, 1], "output": [1, 0], "status": "WA", "passed": false},
                {"input": "x", "expected": "y", "output": "y", "passed": true, "error": null}
            ]
        }"#;
        let response: RunResponse = serde_json::from_str(json).unwrap();
        let results = response.results.unwrap();
        assert_eq!(results[0].input, serde_json::json!([2, 7]));
        assert_eq!(results[0].status.as_deref(), Some("WA"));
        assert!(results[1].passed);
        assert!(results[1].error.is_none());
    }
}
