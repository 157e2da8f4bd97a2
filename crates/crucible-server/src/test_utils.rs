//! Test fixtures for sessions and handlers

use std::sync::Arc;
use std::time::Duration;

use crucible_core::{GraphStore, RawElement, RecipeTreeNode};
use crucible_engine::ScriptedEngine;

use crate::codec::Frame;
use crate::images::ImageResolver;
use crate::manager::{ClientEnd, SessionManager};
use crate::session::SessionConfig;

pub fn sample_store() -> GraphStore {
    GraphStore::from_elements(vec![
        RawElement::new("Air"),
        RawElement::new("Earth"),
        RawElement::new("Fire").with_image("images/Fire.svg"),
        RawElement::new("Water").with_image("../backend/images/Water.svg"),
        RawElement::new("Steam").with_recipe("Water", "Fire"),
        RawElement::new("Mud").with_recipe("Water", "Earth"),
        RawElement::new("Cloud")
            .with_recipe("Steam", "Air")
            .with_recipe("Water", "Air"),
        RawElement::new("Unicorn"),
    ])
    .unwrap()
}

pub fn steam_tree() -> RecipeTreeNode {
    RecipeTreeNode::branch(
        "Steam",
        "",
        RecipeTreeNode::leaf("Water", ""),
        RecipeTreeNode::leaf("Fire", ""),
    )
}

/// A recognisable partial tree for the `n`th exploration step.
pub fn partial(n: usize) -> RecipeTreeNode {
    RecipeTreeNode::leaf(format!("Cloud {}", n), "")
}

pub fn manager(engine: ScriptedEngine, config: SessionConfig) -> SessionManager {
    SessionManager::new(
        Arc::new(sample_store()),
        Arc::new(engine),
        ImageResolver::new("https://img.test/"),
        config,
    )
}

pub fn request(target: &str, mode: &str, max_tree_count: i64, delay_ms: i64) -> String {
    serde_json::json!({
        "target": target,
        "mode": mode,
        "find_best_tree": false,
        "max_tree_count": max_tree_count,
        "delay_ms": delay_ms,
    })
    .to_string()
}

pub fn best(target: &str) -> String {
    serde_json::json!({ "target": target, "mode": "bfs", "find_best_tree": true }).to_string()
}

/// Receive frames until (and including) the first terminal one.
pub async fn until_terminal(client: &mut ClientEnd) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(frame) = tokio::time::timeout(Duration::from_secs(30), client.frames.recv())
        .await
        .expect("timed out waiting for a frame")
    {
        let done = frame.is_terminal();
        frames.push(frame);
        if done {
            break;
        }
    }
    frames
}
