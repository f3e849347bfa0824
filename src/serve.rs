//! HTTP server for the generated site and the dynamic endpoints.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /api/og?slug=/about` | PNG share image from [`OgCache`] |
//! | `GET /sitemap.xml` | sitemap built from the live CMS slug list |
//! | anything else | file from the output directory via `ServeDir`, `404.html` otherwise |
//!
//! CMS calls and browser screenshots are blocking, so handlers move them
//! onto tokio's blocking pool.

use crate::cms::{CmsError, ContentSource, page_path, slug_from_path};
use crate::config::SiteConfig;
use crate::og::{OgCache, OgError, OgImage};
use crate::sitemap::{base_url_for_domain, render_sitemap};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};

pub const OG_CACHE_CONTROL: &str = "public, max-age=30, s-maxage=30";

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no page at {0}")]
    UnknownPage(String),
    #[error("CMS error: {0}")]
    Cms(#[from] CmsError),
    #[error("OG image error: {0}")]
    Og(#[from] OgError),
}

/// Shared by all handlers.
pub struct AppState {
    pub dist: PathBuf,
    pub domain: String,
    pub source: Arc<dyn ContentSource>,
    pub og: Arc<OgCache>,
}

impl AppState {
    pub fn new(
        config: &SiteConfig,
        dist: PathBuf,
        source: Arc<dyn ContentSource>,
        og: Arc<OgCache>,
    ) -> Self {
        Self {
            dist,
            domain: config.site.domain.clone(),
            source,
            og,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let files = ServeDir::new(&state.dist)
        .not_found_service(ServeFile::new(state.dist.join("404.html")));
    Router::new()
        .route("/api/og", get(og_image))
        .route("/sitemap.xml", get(sitemap))
        .fallback_service(files)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, state: Arc<AppState>) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "serving {}", state.dist.display());
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct OgQuery {
    pub slug: Option<String>,
}

/// Share image for a page path.
///
/// An image within `og.max_age_secs` is returned without a CMS call.
/// Otherwise one lookup of the slug decides: render or reuse for a known
/// page, [`ServeError::UnknownPage`] for anything the CMS does not have,
/// and the stored file (if any) when the CMS cannot be reached.
pub fn share_image(state: &AppState, path: &str) -> Result<OgImage, ServeError> {
    if let Some(image) = state.og.recent(path) {
        debug!(%path, "OG image within max age");
        return Ok(image);
    }
    match state.source.fetch_slug_entry(&slug_from_path(path)) {
        Ok(Some(entry)) => Ok(state.og.get_or_render(path, entry.updated_at.as_deref())?),
        Ok(None) => Err(ServeError::UnknownPage(path.to_string())),
        Err(err) => {
            warn!(%path, "could not look up page: {err}");
            state.og.stored(path).ok_or(ServeError::Cms(err))
        }
    }
}

async fn og_image(State(state): State<Arc<AppState>>, Query(query): Query<OgQuery>) -> Response {
    let path = page_path(query.slug.as_deref().unwrap_or("/"));
    let task = tokio::task::spawn_blocking(move || share_image(&state, &path));

    match task.await {
        Ok(Ok(image)) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, OG_CACHE_CONTROL),
            ],
            image.bytes,
        )
            .into_response(),
        Ok(Err(err @ ServeError::UnknownPage(_))) => {
            json_error(StatusCode::NOT_FOUND, err.to_string())
        }
        Ok(Err(err)) => {
            warn!("OG image failed: {err}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn sitemap(State(state): State<Arc<AppState>>) -> Response {
    let source = Arc::clone(&state.source);
    let task = tokio::task::spawn_blocking(move || source.fetch_all_slugs_with_dates());

    match task.await {
        Ok(Ok(entries)) => {
            let xml = render_sitemap(
                &base_url_for_domain(&state.domain),
                &entries,
                chrono::Utc::now(),
            );
            ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
        }
        Ok(Err(err)) => {
            warn!("sitemap failed: {err}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockScreenshotter, MockSource, page_with_slug};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Fixture {
        tmp: TempDir,
        state: Arc<AppState>,
        source: Arc<MockSource>,
        shots: MockScreenshotter,
    }

    fn fixture_with(source: MockSource, shots: MockScreenshotter, max_age: Option<u64>) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        fs::create_dir_all(dist.join("about")).unwrap();
        fs::write(dist.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dist.join("about/index.html"), "<h1>about</h1>").unwrap();
        fs::write(dist.join("404.html"), "<h1>404</h1>").unwrap();
        fs::write(dist.join("gallery.js"), "// js").unwrap();
        fs::write(tmp.path().join("secret.txt"), "geheim").unwrap();

        let mut config = SiteConfig::default();
        config.site.url = "https://schule.test".into();
        config.site.domain = "schule.test".into();
        config.og.max_age_secs = max_age;
        let og = OgCache::new(&config, tmp.path(), Box::new(shots.clone()));
        let source = Arc::new(source);
        let state = AppState::new(&config, dist, source.clone(), Arc::new(og));
        Fixture {
            tmp,
            state: Arc::new(state),
            source,
            shots,
        }
    }

    fn fixture(source: MockSource, shots: MockScreenshotter) -> Fixture {
        fixture_with(source, shots, None)
    }

    fn site() -> MockSource {
        MockSource::new()
            .with_page(page_with_slug("/"))
            .with_page(page_with_slug("about"))
    }

    async fn body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn query(slug: Option<&str>) -> Query<OgQuery> {
        Query(OgQuery {
            slug: slug.map(String::from),
        })
    }

    async fn get(fx: &Fixture, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router(Arc::clone(&fx.state))
            .oneshot(request)
            .await
            .unwrap()
            .into_response()
    }

    #[tokio::test]
    async fn og_endpoint_returns_png_with_cache_headers() {
        let fx = fixture(site(), MockScreenshotter::default());
        let response = og_image(State(Arc::clone(&fx.state)), query(Some("/about"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::CACHE_CONTROL], OG_CACHE_CONTROL);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
        assert_eq!(fx.shots.urls(), vec!["https://schule.test/about"]);
    }

    #[tokio::test]
    async fn og_endpoint_defaults_to_home() {
        let fx = fixture(site(), MockScreenshotter::default());
        let response = og_image(State(Arc::clone(&fx.state)), query(None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fx.shots.urls(), vec!["https://schule.test/"]);
        assert_eq!(fx.source.page_requests(), vec!["/"]);
    }

    #[tokio::test]
    async fn og_failure_is_json_500() {
        let fx = fixture(site(), MockScreenshotter::failing());
        let response = og_image(State(Arc::clone(&fx.state)), query(Some("about"))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body(response).await).unwrap();
        assert!(json["error"].as_str().unwrap().contains("mock failure"));
    }

    #[tokio::test]
    async fn unknown_pages_get_404_and_no_screenshot() {
        let fx = fixture(site(), MockScreenshotter::default());
        for i in 0..3 {
            let slug = format!("/random-{i}");
            let response = og_image(State(Arc::clone(&fx.state)), query(Some(&slug))).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let json: serde_json::Value = serde_json::from_str(&body(response).await).unwrap();
            assert!(json["error"].as_str().unwrap().contains("random"));
        }
        assert!(fx.shots.urls().is_empty());
        assert!(!fx.state.og.dir().exists());
    }

    #[test]
    fn recent_image_skips_the_cms() {
        let fx = fixture_with(
            site().failing_page("about"),
            MockScreenshotter::default(),
            Some(3600),
        );
        fx.state.og.get_or_render("/about", None).unwrap();

        let image = share_image(&fx.state, "/about").unwrap();
        assert!(image.bytes.starts_with(b"\x89PNG"));
        assert!(fx.source.page_requests().is_empty());
        assert_eq!(fx.shots.urls().len(), 1);
    }

    #[test]
    fn unreachable_cms_serves_stored_image() {
        let fx = fixture(site().failing_page("about"), MockScreenshotter::default());
        fx.state.og.get_or_render("/about", None).unwrap();

        let image = share_image(&fx.state, "/about").unwrap();
        assert!(image.bytes.starts_with(b"\x89PNG"));
        assert_eq!(fx.source.page_requests(), vec!["about"]);
        assert_eq!(fx.shots.urls().len(), 1);
    }

    #[test]
    fn unreachable_cms_without_stored_image_fails() {
        let fx = fixture(site().failing_page("about"), MockScreenshotter::default());
        assert!(matches!(
            share_image(&fx.state, "/about"),
            Err(ServeError::Cms(_))
        ));
        assert!(fx.shots.urls().is_empty());
    }

    #[tokio::test]
    async fn sitemap_is_live_xml() {
        let fx = fixture(site(), MockScreenshotter::default());
        let response = sitemap(State(Arc::clone(&fx.state))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
        let xml = body(response).await;
        assert!(xml.contains("<loc>https://schule.test/about</loc>"));
    }

    #[tokio::test]
    async fn sitemap_failure_is_500() {
        let fx = fixture(MockSource::new().failing_slugs(), MockScreenshotter::default());
        let response = sitemap(State(Arc::clone(&fx.state))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn static_files_and_fallbacks() {
        let fx = fixture(MockSource::new(), MockScreenshotter::default());

        let home = get(&fx, "/").await;
        assert_eq!(home.status(), StatusCode::OK);
        assert_eq!(body(home).await, "<h1>home</h1>");

        let about = get(&fx, "/about/").await;
        assert_eq!(body(about).await, "<h1>about</h1>");

        let bare = get(&fx, "/about").await;
        assert!(bare.status().is_redirection());
        assert_eq!(bare.headers()[header::LOCATION], "/about/");

        let js = get(&fx, "/gallery.js").await;
        assert!(
            js.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .contains("javascript")
        );

        let missing = get(&fx, "/gibt-es-nicht").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(missing).await, "<h1>404</h1>");
    }

    #[tokio::test]
    async fn traversal_never_leaves_the_output_directory() {
        let fx = fixture(MockSource::new(), MockScreenshotter::default());
        assert!(fx.tmp.path().join("secret.txt").is_file());

        for uri in ["/../secret.txt", "/%2e%2e/secret.txt", "/about/%2E%2E/%2E%2E/secret.txt"] {
            let response = get(&fx, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(!body(response).await.contains("geheim"), "{uri}");
        }
    }

    #[tokio::test]
    async fn dynamic_routes_win_over_files() {
        let fx = fixture(site(), MockScreenshotter::default());
        fs::write(fx.state.dist.join("sitemap.xml"), "stale").unwrap();
        let response = get(&fx, "/sitemap.xml").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.contains("<urlset"));
    }
}
