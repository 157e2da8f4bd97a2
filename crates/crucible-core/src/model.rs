//! Core data structures for the element/recipe graph

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// The four primitive elements every recipe ultimately bottoms out in.
pub const PRIMITIVE_ELEMENTS: [&str; 4] = ["Air", "Earth", "Fire", "Water"];

/// The special element whose unlock depends on how much the viewer has discovered.
pub const TIME_ELEMENT: &str = "Time";

/// Number of visited elements needed before `Time` counts as basic.
pub const TIME_UNLOCK_THRESHOLD: usize = 100;

/// Returns true for one of the four fixed primitives.
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVE_ELEMENTS.contains(&name)
}

/// Stable index of an element inside a [`crate::GraphStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ElementId(pub u32);

/// Stable index of a recipe inside a [`crate::GraphStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct RecipeId(pub u32);

/// A named craftable item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    /// Opaque display reference, never interpreted by the store.
    pub image_path: String,
    /// Minimum recipe depth at which the element becomes producible.
    pub tier: u32,
    pub recipes_producing: Vec<RecipeId>,
    pub recipes_consuming: Vec<RecipeId>,
}

impl Element {
    /// True when no recipe produces this element.
    pub fn is_recipe_less(&self) -> bool {
        self.recipes_producing.is_empty()
    }
}

/// Two ingredients combined into a target.
///
/// Equality and hashing treat the ingredient pair as unordered, so
/// `Fire + Water -> Steam` equals `Water + Fire -> Steam`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub element_one: String,
    pub element_two: String,
    pub target_element_name: String,
}

impl Recipe {
    pub fn new(
        element_one: impl Into<String>,
        element_two: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Recipe {
            element_one: element_one.into(),
            element_two: element_two.into(),
            target_element_name: target.into(),
        }
    }

    /// Ingredients in canonical (sorted) order.
    pub fn canonical_pair(&self) -> (&str, &str) {
        if self.element_one <= self.element_two {
            (&self.element_one, &self.element_two)
        } else {
            (&self.element_two, &self.element_one)
        }
    }

    /// Whether `name` is one of the two ingredients.
    pub fn uses(&self, name: &str) -> bool {
        self.element_one == name || self.element_two == name
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.target_element_name == other.target_element_name
            && self.canonical_pair() == other.canonical_pair()
    }
}

impl Eq for Recipe {}

impl Hash for Recipe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_pair().hash(state);
        self.target_element_name.hash(state);
    }
}

/// A binary recipe tree produced by a search.
///
/// Leaves are basic elements or frontier placeholders; inner nodes carry the
/// two ingredients of the recipe used to produce them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RecipeTreeNode {
    pub name: String,
    pub image_path: String,
    #[serde(rename = "element_1", default, skip_serializing_if = "Option::is_none")]
    pub element_1: Option<Box<RecipeTreeNode>>,
    #[serde(rename = "element_2", default, skip_serializing_if = "Option::is_none")]
    pub element_2: Option<Box<RecipeTreeNode>>,
}

impl RecipeTreeNode {
    pub fn leaf(name: impl Into<String>, image_path: impl Into<String>) -> Self {
        RecipeTreeNode {
            name: name.into(),
            image_path: image_path.into(),
            element_1: None,
            element_2: None,
        }
    }

    pub fn branch(
        name: impl Into<String>,
        image_path: impl Into<String>,
        element_1: RecipeTreeNode,
        element_2: RecipeTreeNode,
    ) -> Self {
        RecipeTreeNode {
            name: name.into(),
            image_path: image_path.into(),
            element_1: Some(Box::new(element_1)),
            element_2: Some(Box::new(element_2)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.element_1.is_none() && self.element_2.is_none()
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + self.children().map(RecipeTreeNode::node_count).sum::<usize>()
    }

    /// Length of the longest root-to-leaf path, counting nodes.
    pub fn depth(&self) -> usize {
        1 + self.children().map(RecipeTreeNode::depth).max().unwrap_or(0)
    }

    fn children(&self) -> impl Iterator<Item = &RecipeTreeNode> {
        self.element_1
            .as_deref()
            .into_iter()
            .chain(self.element_2.as_deref())
    }
}
