use crate::{
    error::Result,
    models::brick::{BrickBundle, BrickDetails, BrickMetadata},
    services::{bundle, markdown, registry::RegistryClient},
};

/// Fetches a brick version's metadata and bundle concurrently and renders
/// its documents.
pub async fn get_brick_details(
    registry: &RegistryClient,
    name: &str,
    version: &str,
    token: Option<&str>,
) -> Result<BrickDetails> {
    let (metadata, bundle) = futures::try_join!(
        registry.get_brick_metadata(name, version, token),
        registry.get_brick_bundle(name, version),
    )?;

    tracing::debug!("Rendering {} {}", metadata.name, metadata.version);
    Ok(render_details(metadata, &bundle))
}

/// Combines metadata with the bundle's documents rendered to HTML.
pub fn render_details(metadata: BrickMetadata, bundle: &BrickBundle) -> BrickDetails {
    let usage = bundle::usage(bundle);

    BrickDetails {
        metadata,
        readme: markdown::to_html(&bundle.readme),
        changelog: markdown::to_html(&bundle.changelog),
        license: markdown::to_html(&bundle.license),
        usage: markdown::to_html(&usage),
    }
}

/// Whether `email` may manage the brick's publishers.
pub fn is_publisher(details: &BrickDetails, email: &str) -> bool {
    !email.is_empty()
        && details
            .metadata
            .publishers
            .as_ref()
            .is_some_and(|publishers| publishers.iter().any(|p| p == email))
}
