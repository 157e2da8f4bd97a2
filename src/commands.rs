//! CLI command implementations

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, bail};
use crucible_core::{CatalogQuery, GraphStore, RecipeTreeNode, VisitedSet, load_store, paginate};
use crucible_engine::{EngineSpec, create_engine};
use crucible_server::{CrucibleServer, Frame, RawSearchRequest};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::Config;

pub async fn serve(config: Config, engine: Option<EngineSpec>) -> anyhow::Result<()> {
    let store = load_store(&config.data.elements)
        .with_context(|| format!("loading {}", config.data.elements.display()))?;

    let spec = match engine {
        Some(spec) => spec,
        None => config
            .engine_spec()?
            .context("no search engine configured; pass --engine or add an [engine] section")?,
    };
    let engine = create_engine(&spec)?;
    tracing::info!("Using {} search engine", engine.name());

    let server = CrucibleServer::new(store, engine, config.server_config());
    server.start().await
}

pub fn check(data: &Path) -> anyhow::Result<()> {
    let store = load_store(data).with_context(|| format!("loading {}", data.display()))?;
    print!("{}", summary(&store));
    Ok(())
}

fn summary(store: &GraphStore) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} elements, {} recipes",
        store.element_count(),
        store.recipe_count()
    );
    for (tier, count) in store.tier_histogram() {
        let _ = writeln!(out, "  tier {:>2}: {}", tier, count);
    }
    out
}

pub struct ListOptions {
    pub category: String,
    pub sort: String,
    pub page: usize,
    pub page_size: usize,
    pub visited: Option<String>,
    pub query: Option<String>,
}

pub fn list(data: &Path, options: &ListOptions) -> anyhow::Result<()> {
    let store = load_store(data).with_context(|| format!("loading {}", data.display()))?;
    print!("{}", catalog_page(&store, options)?);
    Ok(())
}

fn catalog_page(store: &GraphStore, options: &ListOptions) -> anyhow::Result<String> {
    let query = CatalogQuery {
        category: options.category.parse().map_err(anyhow::Error::msg)?,
        sort: options.sort.parse().map_err(anyhow::Error::msg)?,
        search: options.query.clone(),
    };
    let visited = options
        .visited
        .as_deref()
        .map(VisitedSet::from_csv)
        .unwrap_or_default();

    let entries = store.list(&query, &visited);
    let page = paginate(&entries, options.page, options.page_size);

    let mut out = String::new();
    for entry in &page.items {
        let c = entry.classification;
        let _ = writeln!(
            out,
            "{:<28} tier {:>2}  {:<8} {}",
            entry.element.name,
            c.tier,
            if c.is_basic { "basic" } else { "advanced" },
            if c.is_visited { "visited" } else { "" }
        );
    }
    let _ = writeln!(
        out,
        "page {}/{} ({} {} elements)",
        page.page, page.total_pages, page.total, query.category
    );
    Ok(out)
}

pub async fn search(url: &str, request: &RawSearchRequest) -> anyhow::Result<()> {
    let (mut ws, _) = connect_async(url)
        .await
        .with_context(|| format!("connecting to {}", url))?;
    ws.send(Message::Text(serde_json::to_string(request)?)).await?;

    while let Some(msg) = ws.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        match Frame::decode(&text).with_context(|| format!("unexpected frame: {}", text))? {
            Frame::Exploring(frame) => {
                let stats = match (frame.duration_ms, frame.nodes_explored) {
                    (Some(ms), Some(nodes)) => format!(" [{} ms, {} explored]", ms, nodes),
                    _ => String::new(),
                };
                println!(
                    "exploring {} ({} nodes){}",
                    frame.exploring_tree.name,
                    frame.exploring_tree.node_count(),
                    stats
                );
            }
            Frame::Result(trees) => {
                for (i, tree) in trees.iter().enumerate() {
                    println!("tree {}:", i + 1);
                    print!("{}", render_tree(tree));
                }
                let _ = ws.close(None).await;
                return Ok(());
            }
            Frame::Error(frame) => {
                let _ = ws.close(None).await;
                bail!("search failed: {}", frame.error);
            }
        }
    }
    bail!("connection closed before a result arrived")
}

/// Indented outline of a recipe tree, one element per line.
fn render_tree(tree: &RecipeTreeNode) -> String {
    fn walk(node: &RecipeTreeNode, depth: usize, out: &mut String) {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth + 1), node.name);
        for child in [&node.element_1, &node.element_2].into_iter().flatten() {
            walk(child, depth + 1, out);
        }
    }
    let mut out = String::new();
    walk(tree, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::RawElement;

    fn store() -> GraphStore {
        GraphStore::from_elements(vec![
            RawElement::new("Air"),
            RawElement::new("Earth"),
            RawElement::new("Fire"),
            RawElement::new("Water"),
            RawElement::new("Steam").with_recipe("Water", "Fire"),
            RawElement::new("Cloud").with_recipe("Steam", "Air"),
        ])
        .unwrap()
    }

    #[test]
    fn test_render_tree() {
        let tree = RecipeTreeNode::branch(
            "Steam",
            "",
            RecipeTreeNode::leaf("Water", ""),
            RecipeTreeNode::leaf("Fire", ""),
        );
        assert_eq!(render_tree(&tree), "  Steam\n    Water\n    Fire\n");
    }

    #[test]
    fn test_summary() {
        let text = summary(&store());
        assert!(text.starts_with("6 elements, 2 recipes\n"));
        assert!(text.contains("tier  0: 4"));
        assert!(text.contains("tier  2: 1"));
    }

    #[test]
    fn test_catalog_page() {
        let options = ListOptions {
            category: "advanced".to_string(),
            sort: "tier".to_string(),
            page: 1,
            page_size: 1,
            visited: Some("Steam".to_string()),
            query: None,
        };
        let text = catalog_page(&store(), &options).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Steam"));
        assert!(lines[0].ends_with("visited"));
        assert_eq!(lines[1], "page 1/2 (2 advanced elements)");

        let bad = ListOptions {
            category: "mythic".to_string(),
            ..options
        };
        assert!(catalog_page(&store(), &bad).is_err());
    }
}
