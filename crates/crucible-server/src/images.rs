//! Display URLs for element images

use crucible_core::RecipeTreeNode;

/// Where the original scraper's images are hosted.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://nyo.kirisame.jp.net/";

/// Turns the stored, scraper-relative `image_path` into an absolute URL.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    base_url: String,
}

impl ImageResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Empty paths stay empty and absolute URLs pass through.
    pub fn resolve(&self, image_path: &str) -> String {
        if image_path.is_empty() {
            return String::new();
        }
        if image_path.starts_with("http://") || image_path.starts_with("https://") {
            return image_path.to_string();
        }
        let relative = image_path.strip_prefix("../backend/").unwrap_or(image_path);
        format!("{}{}", self.base_url, relative.trim_start_matches('/'))
    }

    /// Resolve every node of a recipe tree in place.
    pub fn resolve_tree(&self, tree: &mut RecipeTreeNode) {
        tree.image_path = self.resolve(&tree.image_path);
        for child in [&mut tree.element_1, &mut tree.element_2].into_iter().flatten() {
            self.resolve_tree(child);
        }
    }
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_BASE_URL)
    }
}
