//! End-to-end build tests: runs the `schoolsite` binary against a fake
//! Strapi server and inspects the generated site.
//!
//! Run with: `cargo test --test site_build`

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use std::io::{Cursor, Read as _, Write as _};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// ===========================================================================
// Fake Strapi
// ===========================================================================

struct FakeStrapi {
    port: u16,
    _stop: std::sync::mpsc::Sender<()>,
}

impl FakeStrapi {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = std::sync::mpsc::channel::<()>();

        thread::spawn(move || {
            listener.set_nonblocking(true).unwrap();
            loop {
                if rx.try_recv().is_ok() {
                    break;
                }
                match listener.accept() {
                    Ok((stream, _)) => {
                        thread::spawn(move || serve_request(stream));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self { port, _stop: tx }
    }

    fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

fn read_request_head(stream: &mut TcpStream) -> String {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(n) if n > 0 => data.extend_from_slice(&buf[..n]),
            _ => break,
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

fn serve_request(mut stream: TcpStream) {
    let request = read_request_head(&mut stream);
    let target = request.split_whitespace().nth(1).unwrap_or("/").to_string();
    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let param = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let (status, body, content_type) = match path {
        "/api/pages" if param("fields[0]") == Some("slug") => ok_json(json!({
            "data": [
                { "slug": "about", "updatedAt": "2024-05-01T10:00:00.000Z" },
                { "slug": "termine", "updatedAt": "2024-05-02T10:00:00.000Z" },
                { "slug": "/", "updatedAt": "2024-05-03T10:00:00.000Z" }
            ],
            "meta": { "pagination": { "page": 1, "pageSize": 100, "pageCount": 1, "total": 3 } }
        })),
        "/api/pages" => match param("filters[slug][$eq]") {
            Some("/") => ok_json(json!({ "data": [home_page()] })),
            Some("about") => ok_json(json!({ "data": [about_page()] })),
            Some("termine") => ("500 Internal Server Error", b"boom".to_vec(), "text/plain"),
            _ => ok_json(json!({ "data": [] })),
        },
        "/api/navigation-categories" => ok_json(json!({
            "data": [{
                "id": 1,
                "name": "Schule",
                "order": 1,
                "navigation_entries": [
                    { "id": 1, "label": "Über uns", "link": "/about", "order": 1 }
                ]
            }]
        })),
        "/api/site-metadatas" => ok_json(json!({
            "data": [{ "metaTitle": "Grundschule am Park", "metaDescription": "Willkommen" }]
        })),
        "/api/custom-csses" => ok_json(json!({
            "data": [{ "id": 1, "name": "Akzent", "css": ".accent { color: teal }", "active": true, "order": 1 }]
        })),
        "/api/not-found-page" => ok_json(json!({
            "data": { "headline": "Hier geht es nicht weiter", "helpfulLinks": [] }
        })),
        p if p.starts_with("/uploads/") && p.ends_with(".png") => {
            ("200 OK", png_bytes(32, 18), "image/png")
        }
        _ => ("404 Not Found", b"Not Found".to_vec(), "text/plain"),
    };

    let header = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
}

fn ok_json(value: Value) -> (&'static str, Vec<u8>, &'static str) {
    ("200 OK", value.to_string().into_bytes(), "application/json")
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 11) as u8, 90]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn home_page() -> Value {
    json!({
        "id": 1,
        "slug": "/",
        "updatedAt": "2024-05-03T10:00:00.000Z",
        "header": {
            "logo": { "url": "/uploads/logo.svg", "name": "Logo" },
            "impressum": "Tel.: 030 123456\nsekretariat@schule.test",
            "images": [{ "url": "/uploads/hof.png", "name": "Schulhof" }]
        },
        "footer": { "copyright": "© Grundschule am Park" },
        "siteMetadata": null,
        "pageContent": [{
            "__component": "page.group",
            "title": "Willkommen",
            "content": [{ "content": "**Willkommen** an unserer Schule!" }],
            "sections": [{
                "inline": false,
                "content": [{
                    "__component": "image-gallery.image-gallery",
                    "title": "Schulhof",
                    "images": [
                        { "url": "/uploads/hof.png" },
                        { "url": "/uploads/garten.png" }
                    ]
                }]
            }]
        }]
    })
}

fn about_page() -> Value {
    json!({
        "id": 2,
        "slug": "about",
        "updatedAt": "2024-05-01T10:00:00.000Z",
        "groups": [{
            "title": "Über uns",
            "content": [{ "content": "Seit 1905.", "variant": "dark" }]
        }]
    })
}

// ===========================================================================
// Helpers
// ===========================================================================

struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[cms]\nmax_retries = 1\nretry_delay_ms = 0\ntimeout_secs = 5\n",
        )
        .unwrap();
        Self { tmp }
    }

    fn dist(&self) -> PathBuf {
        self.tmp.path().join("dist")
    }

    fn temp(&self) -> PathBuf {
        self.tmp.path().join("temp")
    }

    fn run(&self, cms_url: &str, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_schoolsite"))
            .args(args)
            .arg("--config-dir")
            .arg(self.tmp.path())
            .arg("--output")
            .arg(self.dist())
            .arg("--temp-dir")
            .arg(self.temp())
            .env("STRAPI_URL", cms_url)
            .env("SITE_URL", "https://schule.test")
            .env("FRONTEND_DOMAIN", "schule.test")
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run schoolsite")
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "schoolsite failed\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn build_writes_complete_site() {
    let cms = FakeStrapi::start();
    let ws = Workspace::new();
    let output = ws.run(&cms.url(), &["build"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("==> Stage 1: Fetching from"));
    assert!(stdout.contains("==> Build complete"));

    for rel in ["index.html", "about/index.html", "termine/index.html", "404.html", "sitemap.xml", "gallery.js"] {
        assert!(ws.dist().join(rel).is_file(), "{rel} missing");
    }
    assert!(ws.temp().join("snapshot.json").is_file());
    assert!(ws.temp().join("processed.json").is_file());

    let home = read(&ws.dist().join("index.html"));
    assert!(home.contains("<strong>Willkommen</strong>"));
    assert!(home.contains("gallery-fullscreen"));
    assert!(home.contains("data:image/jpeg;base64,"));
    assert!(home.contains(r#"href="tel:030123456""#));
    assert!(home.contains(r#"<a href="/about">Über uns</a>"#));
    assert!(home.contains(".accent { color: teal }"));
    assert!(home.contains("https://schule.test/api/og?slug=%2F"));
}

#[test]
fn failed_page_becomes_error_page() {
    let cms = FakeStrapi::start();
    let ws = Workspace::new();
    assert_success(&ws.run(&cms.url(), &["build"]));

    let termine = read(&ws.dist().join("termine/index.html"));
    assert!(termine.contains("Service Unavailable"));
    assert!(termine.contains(r#"href="/termine">Retry</a>"#));
    assert!(termine.contains(r#"content="noindex""#));
}

#[test]
fn sitemap_and_404_page() {
    let cms = FakeStrapi::start();
    let ws = Workspace::new();
    assert_success(&ws.run(&cms.url(), &["build"]));

    let sitemap = read(&ws.dist().join("sitemap.xml"));
    assert!(sitemap.contains("<loc>https://schule.test</loc>"));
    assert!(sitemap.contains("<loc>https://schule.test/about</loc>"));
    assert!(sitemap.contains("<lastmod>2024-05-01T10:00:00.000Z</lastmod>"));

    let not_found = read(&ws.dist().join("404.html"));
    assert!(not_found.contains("Hier geht es nicht weiter"));
    assert!(not_found.contains("Zur Startseite"));
}

#[test]
fn stages_run_separately() {
    let cms = FakeStrapi::start();
    let ws = Workspace::new();
    assert_success(&ws.run(&cms.url(), &["fetch"]));
    assert!(ws.temp().join("snapshot.json").is_file());

    assert_success(&ws.run(&cms.url(), &["process"]));
    assert!(ws.temp().join("processed.json").is_file());

    let output = ws.run(&cms.url(), &["process"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("cached"));

    assert_success(&ws.run(&cms.url(), &["generate"]));
    assert!(ws.dist().join("about/index.html").is_file());
}

#[test]
fn unreachable_cms_fails_the_build() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let ws = Workspace::new();
    let output = ws.run(&format!("http://127.0.0.1:{port}"), &["build"]);
    assert!(!output.status.success());
    assert!(!ws.dist().join("index.html").exists());
}

#[test]
fn check_lists_cms_pages() {
    let cms = FakeStrapi::start();
    let ws = Workspace::new();
    let output = ws.run(&cms.url(), &["check"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CMS lists 3 pages"));
    assert!(stdout.contains("/termine"));
}

#[test]
fn gen_config_prints_documented_defaults() {
    let ws = Workspace::new();
    let output = ws.run("http://127.0.0.1:9", &["gen-config"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[cms]"));
    assert!(stdout.contains("[og]"));
}
