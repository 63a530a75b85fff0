use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{brick::BrickDetails, session::Session},
    services::bricks::{get_brick_details, is_publisher},
    state::AppState,
    util::{is_semantic_version, published_ago},
    validation::auth::FORM_NOT_SUBMITTED,
    views::{no_cache, Link, Page},
};

/// The brick page's data. `details` is `None` when the brick couldn't be
/// loaded, which the page shows as "not found".
#[derive(Serialize)]
pub struct BrickPageData {
    pub name: String,
    pub version: Option<String>,
    pub details: Option<BrickDetails>,
    pub published: Option<String>,
    pub is_publisher: bool,
}

#[derive(Deserialize, Debug)]
pub struct PublisherForm {
    #[serde(rename = "_action")]
    pub action: Option<String>,
    pub brick: Option<String>,
    pub publisher: Option<String>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublisherActionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_publisher: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_publisher_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_publisher: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_publisher_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /bricks/{name}`: the latest version of a brick.
pub async fn brick_latest(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> Result<Response> {
    brick_page(&state, session, name, None).await
}

/// `GET /bricks/{name}/{version}`: a specific version of a brick.
pub async fn brick_version(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Response> {
    if !is_semantic_version(&version) {
        tracing::debug!("Not a version: {}", version);
        return Ok(Redirect::to("/").into_response());
    }
    brick_page(&state, session, name, Some(version)).await
}

async fn brick_page(
    state: &AppState,
    session: Session,
    name: String,
    version: Option<String>,
) -> Result<Response> {
    let details = match get_brick_details(
        &state.registry,
        &name,
        version.as_deref().unwrap_or("latest"),
        session.access_token(),
    )
    .await
    {
        Ok(details) => Some(details),
        Err(e) => {
            tracing::warn!("❌ Brick {} not loaded: {}", name, e);
            None
        }
    };

    let published = details
        .as_ref()
        .and_then(|d| published_ago(&d.metadata.created_at));
    let is_publisher = match (&details, &session.user) {
        (Some(details), Some(user)) => is_publisher(details, &user.email),
        _ => false,
    };

    let site_url = &state.config.site_url;
    let title = format!("{} | Brick Template", name);
    let og_url = match &version {
        Some(version) => format!("{}/bricks/{}/{}", site_url, name, version),
        None => format!("{}/bricks/{}", site_url, name),
    };

    let mut page = Page::new(
        title.clone(),
        session.user,
        BrickPageData {
            name: name.clone(),
            version,
            details: None,
            published,
            is_publisher,
        },
    )
    .meta("twitter:card", "summary")
    .meta("og:type", "website")
    .meta("og:site_name", title.clone())
    .meta("og:title", title)
    .meta("og:url", og_url)
    .link(Link::canonical(site_url, &format!("/bricks/{}", name)));

    page = match &details {
        Some(details) => {
            let description = details.metadata.description.clone();
            page.meta("description", description.clone())
                .meta("twitter:description", description.clone())
                .meta("og:description", description)
        }
        None => page.without_meta("description"),
    };
    page.data.details = details;

    Ok(no_cache(page.render()?))
}

/// `POST /bricks/{name}/publishers`: invites or removes a publisher.
#[axum::debug_handler]
pub async fn publishers(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<PublisherForm>,
) -> Result<Response> {
    let (Some(credentials), Some(user)) = (&session.credentials, &session.user) else {
        return Ok(Redirect::to("/").into_response());
    };
    if !user.email_verified {
        return Ok(Redirect::to("/").into_response());
    }

    let (Some(brick), Some(publisher)) = (form.brick, form.publisher) else {
        return Page::new(
            "BrickHub",
            session.user.clone(),
            PublisherActionData {
                error: Some(FORM_NOT_SUBMITTED.to_string()),
                ..Default::default()
            },
        )
        .render_with(StatusCode::BAD_REQUEST);
    };

    let token = &credentials.access_token;
    let data = match form.action.as_deref() {
        Some("addPublisher") => match state.registry.add_publisher(token, &brick, &publisher).await {
            Ok(()) => {
                tracing::info!("✅ {} invited {} to {}", user.email, publisher, brick);
                PublisherActionData {
                    add_publisher: Some("success"),
                    ..Default::default()
                }
            }
            Err(e) => {
                tracing::warn!("❌ Adding publisher to {} failed: {}", brick, e);
                PublisherActionData {
                    add_publisher: Some("failure"),
                    add_publisher_error: Some(describe(&e)),
                    ..Default::default()
                }
            }
        },
        Some("removePublisher") => {
            match state.registry.remove_publisher(token, &brick, &publisher).await {
                Ok(()) => {
                    tracing::info!("✅ {} removed {} from {}", user.email, publisher, brick);
                    PublisherActionData {
                        remove_publisher: Some("success"),
                        ..Default::default()
                    }
                }
                Err(e) => {
                    tracing::warn!("❌ Removing publisher from {} failed: {}", brick, e);
                    PublisherActionData {
                        remove_publisher: Some("failure"),
                        remove_publisher_error: Some(describe(&e)),
                        ..Default::default()
                    }
                }
            }
        }
        _ => return Err(AppError::Validation("Unsupported form action.".to_string())),
    };

    Page::new(format!("{} | Brick Template", brick), session.user.clone(), data).render()
}

/// "<message> <details>" for registry errors, the error itself otherwise.
fn describe(error: &AppError) -> String {
    match error.server_error() {
        Some(e) => e.describe(),
        None => error.to_string(),
    }
}
