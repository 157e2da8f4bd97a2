//! Encyclopedia listing: category filters, stable sorting and pagination

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};

use crate::classify::{Classification, VisitedSet};
use crate::graph::GraphStore;
use crate::model::Element;

/// Page size used by the reference encyclopedia view.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Mutually exclusive views over the element list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    All,
    Basic,
    /// Not basic and tier > 0.
    Advanced,
    /// Exact tier, independent of basic/advanced.
    Tier(u32),
}

impl Category {
    pub fn matches(&self, c: &Classification) -> bool {
        match self {
            Category::All => true,
            Category::Basic => c.is_basic,
            Category::Advanced => !c.is_basic && c.tier > 0,
            Category::Tier(n) => c.tier == *n,
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Category::All),
            "basic" => Ok(Category::Basic),
            "advanced" => Ok(Category::Advanced),
            other => other
                .strip_prefix("tier-")
                .and_then(|n| n.parse().ok())
                .map(Category::Tier)
                .ok_or_else(|| format!("unknown category: {}", other)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::All => write!(f, "all"),
            Category::Basic => write!(f, "basic"),
            Category::Advanced => write!(f, "advanced"),
            Category::Tier(n) => write!(f, "tier-{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Name,
    /// Tier ascending, ties broken by name.
    Tier,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortOrder::Name),
            "tier" => Ok(SortOrder::Tier),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Case-insensitive ordinal compare with a case-sensitive tie break, so the
/// order is total and locale-independent.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub category: Category,
    pub sort: SortOrder,
    /// Optional fuzzy name filter.
    pub search: Option<String>,
}

/// An element together with its classification for the current viewer.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry<'a> {
    pub element: &'a Element,
    pub classification: Classification,
}

/// One window of a filtered, sorted sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Pure windowing over `items`. Out-of-range pages (including page 0) are
/// empty rather than errors; a zero page size is treated as one.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(page_size);

    let window = if page == 0 || page > total_pages {
        Vec::new()
    } else {
        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total);
        items[start..end].to_vec()
    };

    Page {
        items: window,
        page,
        page_size,
        total,
        total_pages,
    }
}

impl GraphStore {
    /// Filtered and sorted element list. Finite, restartable, and a pure
    /// function of the store and `visited`.
    pub fn list<'a>(&'a self, query: &CatalogQuery, visited: &VisitedSet) -> Vec<CatalogEntry<'a>> {
        let classifier = self.classifier(visited);
        let matcher = SkimMatcherV2::default();
        let needle = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut entries: Vec<CatalogEntry<'a>> = self
            .elements()
            .map(|element| CatalogEntry {
                element,
                classification: classifier.classify(element),
            })
            .filter(|entry| query.category.matches(&entry.classification))
            .filter(|entry| {
                needle.is_none_or(|n| matcher.fuzzy_match(&entry.element.name, n).is_some())
            })
            .collect();

        match query.sort {
            SortOrder::Name => {
                entries.sort_by(|a, b| compare_names(&a.element.name, &b.element.name))
            }
            SortOrder::Tier => entries.sort_by(|a, b| {
                a.classification
                    .tier
                    .cmp(&b.classification.tier)
                    .then_with(|| compare_names(&a.element.name, &b.element.name))
            }),
        }
        entries
    }
}
