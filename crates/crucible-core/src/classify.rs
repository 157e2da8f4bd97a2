//! Basic/tier classification, including the visited-count unlock of `Time`

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::GraphStore;
use crate::model::{Element, TIME_ELEMENT, TIME_UNLOCK_THRESHOLD, is_primitive};

/// The set of element names a viewer has marked visited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedSet {
    names: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Parse a comma-separated list, ignoring blanks.
    pub fn from_csv(csv: &str) -> Self {
        csv.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for VisitedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        VisitedSet {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Derived classification of a single element for one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_basic: bool,
    pub tier: u32,
    pub is_visited: bool,
}

/// Classifies elements against one visited set.
///
/// Holds a shared borrow of the visited set, so the `Time` unlock can never be
/// stale: a changed set means a new classifier.
pub struct Classifier<'a> {
    visited: &'a VisitedSet,
    time_unlocked: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(store: &GraphStore, visited: &'a VisitedSet) -> Self {
        let visited_count = store
            .elements()
            .filter(|e| visited.contains(&e.name))
            .count();
        Classifier {
            visited,
            time_unlocked: visited_count >= TIME_UNLOCK_THRESHOLD,
        }
    }

    pub fn time_unlocked(&self) -> bool {
        self.time_unlocked
    }

    pub fn is_basic(&self, element: &Element) -> bool {
        is_primitive(&element.name)
            || (element.name == TIME_ELEMENT && self.time_unlocked)
            || element.is_recipe_less()
    }

    pub fn classify(&self, element: &Element) -> Classification {
        let is_basic = self.is_basic(element);
        Classification {
            is_basic,
            tier: if is_basic { 0 } else { element.tier },
            is_visited: self.visited.contains(&element.name),
        }
    }
}

impl GraphStore {
    pub fn classifier<'a>(&self, visited: &'a VisitedSet) -> Classifier<'a> {
        Classifier::new(self, visited)
    }

    /// One-off classification; prefer [`GraphStore::classifier`] for lists.
    pub fn classify(&self, element: &Element, visited: &VisitedSet) -> Classification {
        self.classifier(visited).classify(element)
    }
}
