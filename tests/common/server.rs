//! Mock project host and downloader construction

use super::fixtures::asset_bytes;
use scratch_dl::{Config, EndpointConfig, ProjectDownloader};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create a downloader pointed at the mock server, saving into `output_dir`
pub fn create_downloader(server: &MockServer, output_dir: &Path) -> ProjectDownloader {
    let mut config = Config {
        endpoints: EndpointConfig::with_base(&server.uri()),
        ..Default::default()
    };
    config.download.output_dir = output_dir.to_path_buf();
    config.retry.initial_delay = Duration::from_millis(1);
    config.retry.jitter = false;
    ProjectDownloader::new(config).expect("valid test config")
}

/// Serve a manifest on the current-generation project endpoint
pub async fn mount_project(server: &MockServer, id: u64, manifest: &Value) {
    Mock::given(method("GET"))
        .and(path(format!("/projects/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
        .mount(server)
        .await;
}

/// Serve a manifest on the legacy project endpoint
pub async fn mount_legacy_project(server: &MockServer, id: u64, manifest: &Value) {
    Mock::given(method("GET"))
        .and(path(format!("/internalapi/project/{id}/get/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
        .mount(server)
        .await;
}

/// Serve raw bytes on the current-generation project endpoint
pub async fn mount_project_bytes(server: &MockServer, id: u64, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/projects/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serve current-generation assets, each expected to be requested `times` times
pub async fn mount_assets(server: &MockServer, keys: &[&str], times: u64) {
    for key in keys {
        Mock::given(method("GET"))
            .and(path(format!("/assets/{key}/get/")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(asset_bytes(key)))
            .expect(times)
            .named(format!("asset {key}"))
            .mount(server)
            .await;
    }
}

/// Serve legacy assets, each expected to be requested `times` times
pub async fn mount_legacy_assets(server: &MockServer, keys: &[&str], times: u64) {
    for key in keys {
        Mock::given(method("GET"))
            .and(path(format!("/internalapi/asset/{key}/get/")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(asset_bytes(key)))
            .expect(times)
            .named(format!("legacy asset {key}"))
            .mount(server)
            .await;
    }
}

/// Serve project metadata on the REST API
pub async fn mount_info(server: &MockServer, id: u64, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/projects/{id}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": id, "title": title})),
        )
        .mount(server)
        .await;
}
