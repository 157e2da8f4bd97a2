//! Crucible Core — element/recipe graph model, classification and catalog

pub mod model;
pub mod error;
pub mod graph;
pub mod classify;
pub mod catalog;
pub mod loader;


#[cfg(test)]
pub mod test_utils;

pub use model::{
    ElementId, RecipeId, Element, Recipe, RecipeTreeNode, PRIMITIVE_ELEMENTS, TIME_ELEMENT,
    TIME_UNLOCK_THRESHOLD, is_primitive,
};
pub use error::GraphError;
pub use graph::GraphStore;
pub use classify::{Classification, Classifier, VisitedSet};
pub use catalog::{Category, CatalogEntry, CatalogQuery, Page, SortOrder, DEFAULT_PAGE_SIZE, compare_names, paginate};
pub use loader::{RawElement, DEFAULT_DATA_PATH, load_elements, load_store, parse_elements};
