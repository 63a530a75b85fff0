//! Page data handed to the view layer.
//!
//! Every page answers with the same envelope: document metadata, head links,
//! the optional signed-in user and the page's own data.

use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::Result;
use crate::models::user::User;
use crate::util::canonical_href;

/// The site-wide description, used when a page has none of its own.
pub const SITE_DESCRIPTION: &str = "BrickHub is the official registry for publishing, discovering, and consuming reusable brick templates.";

/// A `<link>` in the document head.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub rel: &'static str,
    pub href: String,
}

impl Link {
    pub fn canonical(site_url: &str, path: &str) -> Self {
        Self {
            rel: "canonical",
            href: canonical_href(site_url, path),
        }
    }
}

/// The page envelope.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub meta: BTreeMap<&'static str, String>,
    pub links: Vec<Link>,
    pub user: Option<User>,
    pub data: T,
}

impl<T: Serialize> Page<T> {
    pub fn new(title: impl Into<String>, user: Option<User>, data: T) -> Self {
        let mut meta = BTreeMap::new();
        meta.insert("title", title.into());
        meta.insert("description", SITE_DESCRIPTION.to_string());
        Self {
            meta,
            links: Vec::new(),
            user,
            data,
        }
    }

    pub fn meta(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.meta.insert(key, value.into());
        self
    }

    pub fn without_meta(mut self, key: &str) -> Self {
        self.meta.remove(key);
        self
    }

    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Renders the page with a `200 OK`.
    pub fn render(self) -> Result<Response> {
        self.render_with(StatusCode::OK)
    }

    /// Renders the page with the given status.
    pub fn render_with(self, status: StatusCode) -> Result<Response> {
        let body = sonic_rs::to_string(&self)?;
        Ok((
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response())
    }
}

/// Marks a response as not to be cached.
pub fn no_cache(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_meta_links_user_and_data() {
        let page = Page::new("BrickHub", None, sonic_rs::json!({"answer": 42}))
            .meta("og:type", "website")
            .link(Link::canonical("https://brickhub.dev", "/search"));

        let json = sonic_rs::to_string(&page).unwrap();
        assert!(json.contains(r#""title":"BrickHub""#));
        assert!(json.contains(r#""og:type":"website""#));
        assert!(json.contains(r#""href":"https://brickhub.dev/search""#));
        assert!(json.contains(r#""user":null"#));
        assert!(json.contains(r#""answer":42"#));
    }

    #[test]
    fn default_description_can_be_dropped() {
        let page = Page::new("t", None, ()).without_meta("description");
        assert!(!page.meta.contains_key("description"));
        assert_eq!(page.meta["title"], "t");
    }

    #[test]
    fn render_sets_status_and_content_type() {
        let response = Page::new("t", None, ())
            .render_with(StatusCode::BAD_REQUEST)
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let response = no_cache(response);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    }
}
