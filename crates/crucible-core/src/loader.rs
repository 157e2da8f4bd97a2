//! Loading element data from the scraper's JSON format

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::GraphStore;

/// Default location of the element data file.
pub const DEFAULT_DATA_PATH: &str = "data/elements.json";

/// One element as produced by the scraper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawElement {
    pub name: String,
    /// Ingredient lists; only two-ingredient entries are kept.
    #[serde(default)]
    pub recipes: Vec<Vec<String>>,
    #[serde(default)]
    pub image_path: String,
}

impl RawElement {
    pub fn new(name: impl Into<String>) -> Self {
        RawElement {
            name: name.into(),
            recipes: Vec::new(),
            image_path: String::new(),
        }
    }

    pub fn with_recipe(mut self, one: &str, two: &str) -> Self {
        self.recipes.push(vec![one.to_string(), two.to_string()]);
        self
    }

    pub fn with_image(mut self, image_path: impl Into<String>) -> Self {
        self.image_path = image_path.into();
        self
    }
}

pub fn parse_elements(json: &str) -> Result<Vec<RawElement>, GraphError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_elements(path: &Path) -> Result<Vec<RawElement>, GraphError> {
    let json = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let elements = parse_elements(&json)?;
    tracing::debug!("Read {} raw elements from {}", elements.len(), path.display());
    Ok(elements)
}

/// Read and validate a data file into a ready [`GraphStore`].
pub fn load_store(path: &Path) -> Result<GraphStore, GraphError> {
    GraphStore::from_elements(load_elements(path)?)
}
