//! Search request decoding and frame encoding
//!
//! Inbound: one JSON request object per text message. Outbound frames are
//! told apart by shape alone:
//!
//! - `{"exploring_tree": {...}}` (optionally with `duration_ms`/`nodes_explored`)
//! - `[{...}, ...]`, the terminal result
//! - `{"error": "<Code>"}`, terminal for the request that caused it

use std::time::Duration;

use crucible_core::{GraphStore, RecipeTreeNode};
use crucible_engine::{ResultPolicy, SearchMode};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// A request as it arrives off the wire, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSearchRequest {
    pub target: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub find_best_tree: bool,
    #[serde(default)]
    pub max_tree_count: i64,
    #[serde(default)]
    pub delay_ms: i64,
}

/// A request that passed validation against the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub target: String,
    pub mode: SearchMode,
    pub policy: ResultPolicy,
    /// Minimum spacing between consecutive exploring frames.
    pub delay: Duration,
}

/// Parse one inbound text message. Anything that is not a request object
/// is `InvalidRequest`.
pub fn decode_request(text: &str) -> Result<RawSearchRequest, SessionError> {
    serde_json::from_str(text).map_err(|_| SessionError::InvalidRequest)
}

impl RawSearchRequest {
    /// Checks the target first, then the mode, then the result policy.
    pub fn validate(self, store: &GraphStore) -> Result<SearchRequest, SessionError> {
        if !store.contains(&self.target) {
            return Err(SessionError::ElementNotFound);
        }
        let mode: SearchMode = self.mode.parse().map_err(|_| SessionError::InvalidMode)?;
        let policy = if self.find_best_tree {
            ResultPolicy::Best
        } else if self.max_tree_count >= 1 {
            ResultPolicy::UpTo(self.max_tree_count as usize)
        } else {
            return Err(SessionError::InvalidResultPolicy);
        };
        let delay_ms = u64::try_from(self.delay_ms).map_err(|_| SessionError::InvalidRequest)?;

        Ok(SearchRequest {
            target: self.target,
            mode,
            policy,
            delay: Duration::from_millis(delay_ms),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploringFrame {
    pub exploring_tree: RecipeTreeNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_explored: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Exploring(ExploringFrame),
    Error(ErrorFrame),
    Result(Vec<RecipeTreeNode>),
}

impl Frame {
    pub fn exploring(tree: RecipeTreeNode) -> Self {
        Frame::Exploring(ExploringFrame {
            exploring_tree: tree,
            duration_ms: None,
            nodes_explored: None,
        })
    }

    pub fn exploring_with_stats(tree: RecipeTreeNode, duration: Duration, nodes_explored: u64) -> Self {
        Frame::Exploring(ExploringFrame {
            exploring_tree: tree,
            duration_ms: Some(duration.as_millis() as u64),
            nodes_explored: Some(nodes_explored),
        })
    }

    pub fn error(error: SessionError) -> Self {
        Frame::Error(ErrorFrame {
            error: error.code().to_string(),
        })
    }

    /// Result and error frames end a request; exploring frames never do.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Frame::Exploring(_))
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Frame, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_store;

    fn steam() -> RecipeTreeNode {
        RecipeTreeNode::branch(
            "Steam",
            "steam.png",
            RecipeTreeNode::leaf("Water", "water.png"),
            RecipeTreeNode::leaf("Fire", "fire.png"),
        )
    }

    fn validate(json: &str) -> Result<SearchRequest, SessionError> {
        decode_request(json)?.validate(&sample_store())
    }

    #[test]
    fn test_valid_request() {
        let request = validate(
            r#"{"target":"Steam","mode":"dfs","find_best_tree":false,"max_tree_count":3,"delay_ms":250}"#,
        )
        .unwrap();
        assert_eq!(request.mode, SearchMode::Dfs);
        assert_eq!(request.policy, ResultPolicy::UpTo(3));
        assert_eq!(request.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_best_tree_wins_over_count() {
        let request =
            validate(r#"{"target":"Steam","mode":"bfs","find_best_tree":true,"max_tree_count":0}"#)
                .unwrap();
        assert_eq!(request.policy, ResultPolicy::Best);
        assert_eq!(request.delay, Duration::ZERO);
    }

    #[test]
    fn test_validation_order() {
        // Target is checked before mode and policy.
        assert_eq!(
            validate(r#"{"target":"Phoenix","mode":"sideways","max_tree_count":0}"#),
            Err(SessionError::ElementNotFound)
        );
        assert_eq!(
            validate(r#"{"target":"Steam","mode":"sideways","max_tree_count":0}"#),
            Err(SessionError::InvalidMode)
        );
        assert_eq!(
            validate(r#"{"target":"Steam","mode":"bfs","find_best_tree":false,"max_tree_count":0}"#),
            Err(SessionError::InvalidResultPolicy)
        );
        assert_eq!(
            validate(r#"{"target":"Steam","mode":"bfs","max_tree_count":-2}"#),
            Err(SessionError::InvalidResultPolicy)
        );
    }

    #[test]
    fn test_target_is_case_sensitive() {
        assert_eq!(
            validate(r#"{"target":"steam","mode":"bfs","find_best_tree":true}"#),
            Err(SessionError::ElementNotFound)
        );
    }

    #[test]
    fn test_malformed_requests() {
        assert_eq!(decode_request("not json"), Err(SessionError::InvalidRequest));
        assert_eq!(decode_request("[1,2]"), Err(SessionError::InvalidRequest));
        assert_eq!(decode_request(r#"{"mode":"bfs"}"#), Err(SessionError::InvalidRequest));
        assert_eq!(
            validate(r#"{"target":"Steam","mode":"bfs","find_best_tree":true,"delay_ms":-1}"#),
            Err(SessionError::InvalidRequest)
        );
    }

    #[test]
    fn test_frame_shapes() {
        insta::assert_json_snapshot!(Frame::exploring(RecipeTreeNode::leaf("Steam", "")), @r###"
        {
          "exploring_tree": {
            "name": "Steam",
            "image_path": ""
          }
        }
        "###);
        insta::assert_json_snapshot!(Frame::error(SessionError::SessionBusy), @r###"
        {
          "error": "SessionBusy"
        }
        "###);
        insta::assert_json_snapshot!(
            Frame::exploring_with_stats(RecipeTreeNode::leaf("Mud", ""), Duration::from_millis(42), 7),
            @r###"
        {
          "exploring_tree": {
            "name": "Mud",
            "image_path": ""
          },
          "duration_ms": 42,
          "nodes_explored": 7
        }
        "###
        );
    }

    #[test]
    fn test_result_frame_is_bare_array() {
        let frame = Frame::Result(vec![steam()]);
        let text = frame.encode().unwrap();
        assert!(text.starts_with('['));
        assert_eq!(Frame::decode(&text).unwrap(), frame);
        assert!(frame.is_terminal());
    }

    #[test]
    fn test_decode_distinguishes_by_shape() {
        assert!(matches!(
            Frame::decode(r#"{"exploring_tree":{"name":"Steam","image_path":""}}"#),
            Ok(Frame::Exploring(_))
        ));
        assert_eq!(
            Frame::decode(r#"{"error":"Timeout"}"#).unwrap(),
            Frame::error(SessionError::Timeout)
        );
        assert_eq!(Frame::decode("[]").unwrap(), Frame::Result(vec![]));
    }
}
