use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::{brick::BrickSearchResult, session::Session},
    services::{markdown::to_html_with_anchors, registry::SearchSort},
    state::AppState,
    util::published_ago,
    views::{Link, Page},
};

/// Hits per search page.
pub const SEARCH_PAGE_SIZE: u32 = 10;

/// The heading the policy document opens with; the page has its own.
const POLICY_TITLE: &str = "brickhub.dev policy";

/// `GET /`
pub async fn index(Extension(session): Extension<Session>) -> Result<Response> {
    Page::new("BrickHub", session.user, ()).render()
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
}

/// How the search page orders its results.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrder {
    Popularity,
    Updated,
}

impl SearchOrder {
    fn parse(sort: Option<&str>) -> Self {
        match sort {
            Some("updated") => SearchOrder::Updated,
            _ => SearchOrder::Popularity,
        }
    }

    fn registry_sort(self) -> SearchSort {
        match self {
            SearchOrder::Popularity => SearchSort::Downloads,
            SearchOrder::Updated => SearchSort::Created,
        }
    }
}

/// A search hit with its publication date spelled out.
#[derive(Serialize, Debug)]
pub struct SearchHit {
    #[serde(flatten)]
    pub brick: BrickSearchResult,
    pub published: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct SearchPageData {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: u64,
    pub page: u32,
    pub sort: SearchOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Page numbers start at 1; anything unreadable is the first page.
fn page_number(page: Option<&str>) -> u32 {
    page.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

fn search_title(query: &str, sort: SearchOrder) -> String {
    if !query.is_empty() {
        return format!("{} - brick search", query);
    }
    match sort {
        SearchOrder::Popularity => "Search | Top bricks".to_string(),
        SearchOrder::Updated => "Search | Latest bricks".to_string(),
    }
}

/// The canonical path of a search; an empty query is the bare search page.
fn search_path(query: &str) -> String {
    if query.is_empty() {
        return "/search".to_string();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("/search?q={}", encoded)
}

/// `GET /search?q&page&sort`
///
/// Registry failures still render the page, with no results and an error.
pub async fn search(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let query = params.q.unwrap_or_default();
    let page = page_number(params.page.as_deref());
    let sort = SearchOrder::parse(params.sort.as_deref());
    let offset = (page - 1).saturating_mul(SEARCH_PAGE_SIZE);

    let data = match state
        .registry
        .search(&query, SEARCH_PAGE_SIZE, offset, sort.registry_sort())
        .await
    {
        Ok(results) => SearchPageData {
            query: query.clone(),
            results: results
                .bricks
                .into_iter()
                .map(|brick| SearchHit {
                    published: published_ago(&brick.created_at),
                    brick,
                })
                .collect(),
            total: results.total,
            page,
            sort,
            error: None,
        },
        Err(e) => {
            tracing::warn!("❌ Search for {:?} failed: {}", query, e);
            SearchPageData {
                query: query.clone(),
                results: Vec::new(),
                total: 0,
                page,
                sort,
                error: Some(e.to_string()),
            }
        }
    };

    Page::new(search_title(&query, sort), session.user, data)
        .link(Link::canonical(&state.config.site_url, &search_path(&query)))
        .render()
}

#[derive(Serialize, Debug)]
pub struct PolicyPageData {
    pub html: String,
}

/// `GET /policy`: the published policy document, or its source page when it
/// can't be fetched.
pub async fn policy(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let document = match state.registry.fetch_document(&state.config.policy_url).await {
        Ok(Some(document)) => document,
        Ok(None) => return Ok(Redirect::to(&state.config.policy_fallback_url).into_response()),
        Err(e) => {
            tracing::warn!("❌ Policy document not fetched: {}", e);
            return Ok(Redirect::to(&state.config.policy_fallback_url).into_response());
        }
    };

    let html = to_html_with_anchors(&document, Some(POLICY_TITLE));
    Page::new("BrickHub | Policy", session.user, PolicyPageData { html })
        .link(Link::canonical(&state.config.site_url, "/policy"))
        .render()
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        r#"{"status":"ok"}"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_default_to_one() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some("0")), 1);
        assert_eq!(page_number(Some("-3")), 1);
        assert_eq!(page_number(Some("abc")), 1);
        assert_eq!(page_number(Some("4")), 4);
    }

    #[test]
    fn sort_maps_to_registry_order() {
        assert_eq!(SearchOrder::parse(Some("updated")).registry_sort(), SearchSort::Created);
        assert_eq!(SearchOrder::parse(Some("popularity")).registry_sort(), SearchSort::Downloads);
        assert_eq!(SearchOrder::parse(None).registry_sort(), SearchSort::Downloads);
    }

    #[test]
    fn canonical_search_path_drops_empty_query() {
        assert_eq!(search_path(""), "/search");
        assert_eq!(search_path("greeting"), "/search?q=greeting");
        assert_eq!(search_path("hello world"), "/search?q=hello+world");
    }

    #[test]
    fn titles_follow_query_and_sort() {
        assert_eq!(search_title("greeting", SearchOrder::Updated), "greeting - brick search");
        assert_eq!(search_title("", SearchOrder::Popularity), "Search | Top bricks");
        assert_eq!(search_title("", SearchOrder::Updated), "Search | Latest bricks");
    }
}
