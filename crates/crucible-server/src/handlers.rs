//! REST API handlers for the element encyclopedia

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::Query;
use crucible_core::{
    CatalogEntry, CatalogQuery, Category, Classification, Element, Page, Recipe, SortOrder,
    VisitedSet, compare_names, paginate,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ServerState;

/// One element as the encyclopedia shows it.
#[derive(Debug, Clone, Serialize)]
pub struct ElementResponse {
    pub name: String,
    pub image_path: String,
    pub tier: u32,
    pub is_basic: bool,
    pub is_visited: bool,
    pub recipes_to_make_this_element: Vec<Recipe>,
    pub recipes_to_make_other_element: Vec<Recipe>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub elements: usize,
    pub recipes: usize,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced by the REST endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    ElementNotFound,
    InvalidCategory,
    InvalidSort,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ElementNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidCategory | ApiError::InvalidSort => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::ElementNotFound => "ElementNotFound",
            ApiError::InvalidCategory => "InvalidCategory",
            ApiError::InvalidSort => "InvalidSort",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// `?visited=A,B` on element endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ViewerParams {
    pub visited: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub visited: Option<String>,
    pub q: Option<String>,
}

fn visited_from(param: Option<&str>) -> VisitedSet {
    param.map(VisitedSet::from_csv).unwrap_or_default()
}

fn element_response(
    state: &ServerState,
    element: &Element,
    classification: Classification,
) -> ElementResponse {
    ElementResponse {
        name: element.name.clone(),
        image_path: state.images.resolve(&element.image_path),
        tier: classification.tier,
        is_basic: classification.is_basic,
        is_visited: classification.is_visited,
        recipes_to_make_this_element: state.store.producing(element).cloned().collect(),
        recipes_to_make_other_element: state.store.consuming(element).cloned().collect(),
    }
}

/// Every element, sorted by name
pub async fn list_elements(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ViewerParams>,
) -> impl IntoResponse {
    let visited = visited_from(params.visited.as_deref());
    let classifier = state.store.classifier(&visited);

    let mut elements: Vec<&Element> = state.store.elements().collect();
    elements.sort_by(|a, b| compare_names(&a.name, &b.name));

    let body: Vec<ElementResponse> = elements
        .into_iter()
        .map(|element| element_response(&state, element, classifier.classify(element)))
        .collect();
    Json(body)
}

/// One element by exact name
pub async fn get_element(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    Query(params): Query<ViewerParams>,
) -> Result<Json<ElementResponse>, ApiError> {
    let element = state.store.get(&name).ok_or_else(|| {
        debug!("Unknown element requested: {}", name);
        ApiError::ElementNotFound
    })?;
    let visited = visited_from(params.visited.as_deref());
    let classification = state.store.classify(element, &visited);
    Ok(Json(element_response(&state, element, classification)))
}

/// Filtered, sorted, paginated encyclopedia view
pub async fn catalog(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<Page<ElementResponse>>, ApiError> {
    let category = match params.category.as_deref() {
        Some(raw) => raw.parse::<Category>().map_err(|_| ApiError::InvalidCategory)?,
        None => Category::All,
    };
    let sort = match params.sort.as_deref() {
        Some(raw) => raw.parse::<SortOrder>().map_err(|_| ApiError::InvalidSort)?,
        None => SortOrder::Name,
    };
    let query = CatalogQuery {
        category,
        sort,
        search: params.q,
    };
    let visited = visited_from(params.visited.as_deref());

    let entries: Vec<CatalogEntry<'_>> = state.store.list(&query, &visited);
    let page = paginate(
        &entries,
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(state.page_size),
    );

    Ok(Json(Page {
        items: page
            .items
            .iter()
            .map(|entry| element_response(&state, entry.element, entry.classification))
            .collect(),
        page: page.page,
        page_size: page.page_size,
        total: page.total,
        total_pages: page.total_pages,
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        elements: state.store.element_count(),
        recipes: state.store.recipe_count(),
        sessions: state.sessions.len(),
    })
}
