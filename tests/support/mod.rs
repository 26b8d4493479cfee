//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::TcpListener;

use serde_json::{Value, json};
use wiremock::MockServer;

/// Starts a mock server, or returns `None` when localhost sockets are unavailable.
///
/// Set `IIIF_REQUIRE_SOCKET_TESTS=1` to fail instead of skipping.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return Some(MockServer::start().await);
    }
    let required = std::env::var("IIIF_REQUIRE_SOCKET_TESTS")
        .is_ok_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    assert!(!required, "[socket-bound-test] cannot bind localhost socket");
    eprintln!("[socket-bound-test] cannot bind localhost socket; skipping test");
    None
}

/// A v2 canvas whose image is `{base}/images/p{n}.jpg`, optionally with a service.
pub fn v2_canvas(base: &str, n: usize, with_service: bool) -> Value {
    let mut resource = json!({
        "@id": format!("{base}/images/p{n}.jpg"),
        "@type": "dctypes:Image",
        "format": "image/jpeg",
        "width": 1200,
        "height": 1800
    });
    if with_service {
        resource["service"] = json!({
            "@context": "http://iiif.io/api/image/2/context.json",
            "@id": format!("{base}/iiif/p{n}"),
            "profile": "http://iiif.io/api/image/2/level1.json"
        });
    }
    json!({
        "@id": format!("{base}/canvas/{n}"),
        "@type": "sc:Canvas",
        "label": format!("f. {n}"),
        "width": 1200,
        "height": 1800,
        "images": [{"@type": "oa:Annotation", "motivation": "sc:painting", "resource": resource}]
    })
}

/// A v2 manifest with the given label and canvases.
pub fn v2_manifest(base: &str, label: &str, canvases: Vec<Value>) -> Value {
    json!({
        "@context": "http://iiif.io/api/presentation/2/context.json",
        "@id": format!("{base}/manifest.json"),
        "@type": "sc:Manifest",
        "label": label,
        "sequences": [{"@type": "sc:Sequence", "canvases": canvases}]
    })
}

/// Bytes served as a page image.
pub fn jpeg_body(n: usize) -> Vec<u8> {
    let mut body = vec![0xFF, 0xD8, 0xFF, 0xE0];
    body.extend(format!("page {n}").into_bytes());
    body
}
