//! Jobs sent to the engine and the events it streams back

use std::fmt;
use std::str::FromStr;

use crucible_core::RecipeTreeNode;
use serde::{Deserialize, Serialize};

/// Traversal strategy requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Bfs,
    Dfs,
    Bidirectional,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Bfs => "bfs",
            SearchMode::Dfs => "dfs",
            SearchMode::Bidirectional => "bidirectional",
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bfs" => Ok(SearchMode::Bfs),
            "dfs" => Ok(SearchMode::Dfs),
            "bidirectional" => Ok(SearchMode::Bidirectional),
            other => Err(format!("unknown search mode: {}", other)),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many completed trees the client wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultPolicy {
    /// The engine's single best tree.
    Best,
    /// Up to `n` trees, `n >= 1`.
    UpTo(usize),
}

impl ResultPolicy {
    /// Maximum number of trees this policy admits.
    pub fn limit(&self) -> usize {
        match self {
            ResultPolicy::Best => 1,
            ResultPolicy::UpTo(n) => *n,
        }
    }
}

/// A validated traversal job, in the shape the external engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchJob {
    pub target: String,
    pub mode: SearchMode,
    pub find_best_tree: bool,
    pub max_tree_count: usize,
}

impl SearchJob {
    pub fn new(target: impl Into<String>, mode: SearchMode, policy: ResultPolicy) -> Self {
        SearchJob {
            target: target.into(),
            mode,
            find_best_tree: matches!(policy, ResultPolicy::Best),
            max_tree_count: policy.limit(),
        }
    }

    pub fn policy(&self) -> ResultPolicy {
        if self.find_best_tree {
            ResultPolicy::Best
        } else {
            ResultPolicy::UpTo(self.max_tree_count)
        }
    }
}

/// Why the engine gave up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineFailure {
    /// No recipe path reaches the target from basic elements.
    Unreachable,
    Internal { message: String },
    Cancelled,
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineFailure::Unreachable => write!(f, "target unreachable"),
            EngineFailure::Internal { message } => write!(f, "engine internal error: {}", message),
            EngineFailure::Cancelled => write!(f, "search cancelled"),
        }
    }
}

/// One message on the engine's event stream.
///
/// An engine emits any number of `Progress` events followed by exactly one
/// `Done` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Progress {
        tree: RecipeTreeNode,
        /// The engine's own explored-node counter, when it keeps one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nodes_explored: Option<u64>,
    },
    Done {
        trees: Vec<RecipeTreeNode>,
    },
    Failed {
        failure: EngineFailure,
    },
}

impl EngineEvent {
    pub fn progress(tree: RecipeTreeNode) -> Self {
        EngineEvent::Progress {
            tree,
            nodes_explored: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EngineEvent::Failed {
            failure: EngineFailure::Internal {
                message: message.into(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EngineEvent::Progress { .. })
    }
}
