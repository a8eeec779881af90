use super::*;
use crate::archive::read_archive;
use crate::config::{EndpointConfig, FileCollisionAction, RetryConfig};
use crate::test_helpers::{StubTransport, drain_events, task_balance};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

const BASE: &str = "https://host";

fn test_config(output_dir: &std::path::Path) -> Config {
    let mut config = Config {
        endpoints: EndpointConfig::with_base(BASE),
        retry: RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Default::default()
    };
    config.download.output_dir = output_dir.to_path_buf();
    config
}

fn downloader(transport: &Arc<StubTransport>, config: Config) -> ProjectDownloader {
    ProjectDownloader::with_transport(config, transport.clone()).unwrap()
}

fn sb3_body() -> String {
    json!({
        "targets": [{
            "isStage": true,
            "costumes": [{"assetId": "abc", "md5ext": "abc.svg", "dataFormat": "svg"}],
            "sounds": []
        }]
    })
    .to_string()
}

fn sb2_body() -> String {
    json!({
        "objName": "Stage",
        "costumes": [{"baseLayerMD5": "abc.svg", "baseLayerID": 5}],
        "children": []
    })
    .to_string()
}

#[test]
fn invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path());
    config.fetch.max_concurrent_requests = 0;

    let err = ProjectDownloader::with_transport(config, Arc::new(StubTransport::new())).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn load_detects_format_and_emits_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(&format!("{BASE}/projects/1"), 200, sb3_body());
    transport.respond(&format!("{BASE}/assets/abc.svg/get/"), 200, "<svg/>");
    let downloader = downloader(&transport, test_config(temp_dir.path()));
    let mut rx = downloader.subscribe();

    let project = downloader.load(ProjectId(1)).await.unwrap();

    assert_eq!(project.extension(), "sb3");
    assert_eq!(project.files().unwrap().len(), 2);

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Detected {
            tag: FormatTag::Current,
            ..
        }
    )));
    assert!(matches!(
        events.last(),
        Some(Event::Loaded {
            id: ProjectId(1),
            files: 2
        })
    ));
    assert_eq!(task_balance(&events), (2, 2));
}

#[tokio::test]
async fn detect_reports_tag_without_loading_assets() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(&format!("{BASE}/projects/2"), 200, sb2_body());
    let downloader = downloader(&transport, test_config(temp_dir.path()));

    let tag = downloader.detect(ProjectId(2)).await.unwrap();

    assert_eq!(tag, FormatTag::MidJson);
    assert_eq!(transport.total_requests(), 1);
}

#[tokio::test]
async fn wrong_hint_is_corrected_once() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    // the current-generation endpoint serves the old manifest too
    transport.respond(&format!("{BASE}/projects/3"), 200, sb2_body());
    transport.respond(&format!("{BASE}/internalapi/project/3/get/"), 200, sb2_body());
    transport.respond(&format!("{BASE}/internalapi/asset/abc.svg/get/"), 200, "<svg/>");
    let downloader = downloader(&transport, test_config(temp_dir.path()));

    let err = downloader
        .load_as(ProjectId(3), ProjectFormat::Sb3)
        .await
        .unwrap_err();
    assert_eq!(err.probable_format(), Some(ProjectFormat::Sb2));

    let project = downloader
        .load_with_hint(ProjectId(3), Some(ProjectFormat::Sb3))
        .await
        .unwrap();
    assert_eq!(project.extension(), "sb2");
    let paths: Vec<_> = project.files().unwrap().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["project.json", "0.svg"]);
}

#[tokio::test]
async fn mismatch_without_suggestion_is_returned() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(&format!("{BASE}/projects/4"), 200, r#"{"hello": "world"}"#);
    let downloader = downloader(&transport, test_config(temp_dir.path()));

    let err = downloader
        .load_with_hint(ProjectId(4), Some(ProjectFormat::Sb3))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::FormatMismatch { probable: None, .. }));
    assert_eq!(transport.total_requests(), 1);
}

#[tokio::test]
async fn archive_reports_progress_and_produces_zip() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(&format!("{BASE}/projects/5"), 200, sb3_body());
    transport.respond(&format!("{BASE}/assets/abc.svg/get/"), 200, "<svg/>");
    let downloader = downloader(&transport, test_config(temp_dir.path()));

    let project = downloader.load(ProjectId(5)).await.unwrap();
    let mut rx = downloader.subscribe();
    let archive = downloader.archive(ProjectId(5), project).await.unwrap();

    assert_eq!(archive.file_name(), "5.sb3");
    let files = read_archive(&archive.data).unwrap();
    assert_eq!(files[0].path, "project.json");
    assert_eq!(files[1].data, b"<svg/>");

    let percents: Vec<f32> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            Event::Archiving { progress, .. } => Some(progress.percent),
            _ => None,
        })
        .collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last().copied(), Some(1.0));
}

#[tokio::test]
async fn concurrent_loads_share_the_request_cap() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new().with_delay(Duration::from_millis(2)));
    for id in 10..14u64 {
        let costumes: Vec<_> = (0..10)
            .map(|i| json!({"md5ext": format!("p{id}a{i}.png")}))
            .collect();
        transport.respond(
            &format!("{BASE}/projects/{id}"),
            200,
            json!({"targets": [{"costumes": costumes}]}).to_string(),
        );
        for i in 0..10 {
            transport.respond(&format!("{BASE}/assets/p{id}a{i}.png/get/"), 200, "png");
        }
    }
    let mut config = test_config(temp_dir.path());
    config.fetch.max_concurrent_requests = 3;
    let downloader = downloader(&transport, config);

    let loads = (10..14u64).map(|id| downloader.load_as(ProjectId(id), ProjectFormat::Sb3));
    let projects = futures::future::try_join_all(loads).await.unwrap();

    assert_eq!(projects.len(), 4);
    assert!(transport.max_concurrency() <= 3);
    assert_eq!(downloader.queue().in_flight(), 0);
}

#[tokio::test]
async fn download_to_dir_saves_and_reports_each_project() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(
        &format!("{BASE}/api/users/alice/projects?limit=20&offset=0"),
        200,
        json!([
            {"id": 21, "title": "Pong: Deluxe", "author": {"username": "alice"}},
            {"id": 22, "title": "Broken", "author": {"username": "alice"}},
            {"id": 23, "title": "  ", "author": {"username": "alice"}}
        ])
        .to_string(),
    );
    transport.respond(&format!("{BASE}/projects/21"), 200, sb3_body());
    transport.respond(&format!("{BASE}/assets/abc.svg/get/"), 200, "<svg/>");
    transport.respond(&format!("{BASE}/projects/22"), 404, "");
    transport.respond(&format!("{BASE}/projects/23"), 200, b"ScratchV01 old project".to_vec());
    let downloader = downloader(&transport, test_config(temp_dir.path()));
    let mut rx = downloader.subscribe();

    let report = downloader
        .download_to_dir(&ProjectSource::User("alice".to_string()), 10)
        .await
        .unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.saved.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, ProjectId(22));
    assert_eq!(report.failed[0].stage, "fetch");

    let pong = temp_dir.path().join("Pong- Deluxe.sb3");
    assert!(read_archive(&std::fs::read(&pong).unwrap()).is_ok());
    let old = std::fs::read(temp_dir.path().join("23.sb")).unwrap();
    assert_eq!(old, b"ScratchV01 old project");

    // a 404 is not retried
    assert_eq!(transport.hits(&format!("{BASE}/projects/22")), 1);

    let events = drain_events(&mut rx);
    let saved = events
        .iter()
        .filter(|e| matches!(e, Event::ProjectSaved { .. }))
        .count();
    assert_eq!(saved, 2);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::ProjectFailed {
            id: ProjectId(22),
            ..
        }
    )));
}

#[tokio::test]
async fn download_to_dir_retries_transient_failures() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(
        &format!("{BASE}/api/projects/30"),
        200,
        json!({"id": 30, "title": "Flaky"}).to_string(),
    );
    transport.fail(&format!("{BASE}/projects/30"), "connection reset");
    let downloader = downloader(&transport, test_config(temp_dir.path()));

    let report = downloader
        .download_to_dir(&ProjectSource::Single(ProjectId(30)), 1)
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    // first attempt plus max_attempts retries
    assert_eq!(transport.hits(&format!("{BASE}/projects/30")), 3);
}

#[tokio::test]
async fn download_to_dir_honors_collision_policy() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(
        &format!("{BASE}/api/projects/40"),
        200,
        json!({"id": 40, "title": "Maze"}).to_string(),
    );
    transport.respond(&format!("{BASE}/projects/40"), 200, b"ScratchV01 maze".to_vec());
    std::fs::write(temp_dir.path().join("Maze.sb"), "mine").unwrap();

    let mut config = test_config(temp_dir.path());
    config.download.file_collision = FileCollisionAction::Skip;
    let skipping = downloader(&transport, config);
    let report = skipping
        .download_to_dir(&ProjectSource::Single(ProjectId(40)), 1)
        .await
        .unwrap();
    assert_eq!(report.skipped, vec![ProjectId(40)]);
    assert_eq!(std::fs::read(temp_dir.path().join("Maze.sb")).unwrap(), b"mine");

    let renaming = downloader(&transport, test_config(temp_dir.path()));
    let report = renaming
        .download_to_dir(&ProjectSource::Single(ProjectId(40)), 1)
        .await
        .unwrap();
    assert_eq!(report.saved[0].path, temp_dir.path().join("Maze (1).sb"));
}

#[tokio::test]
async fn download_to_dir_can_name_files_by_id() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    transport.respond(
        &format!("{BASE}/api/projects/50"),
        200,
        json!({"id": 50, "title": "Platformer"}).to_string(),
    );
    transport.respond(&format!("{BASE}/projects/50"), 200, b"ScratchV01".to_vec());
    let mut config = test_config(temp_dir.path().join("nested").as_path());
    config.download.use_project_titles = false;
    let downloader = downloader(&transport, config);

    let report = downloader
        .download_to_dir(&ProjectSource::Single(ProjectId(50)), 1)
        .await
        .unwrap();

    assert_eq!(report.saved[0].path, temp_dir.path().join("nested").join("50.sb"));
}

#[tokio::test]
async fn listing_failure_fails_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::new());
    let downloader = downloader(&transport, test_config(temp_dir.path()));

    let err = downloader
        .download_to_dir(&ProjectSource::Studio(99), 5)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("studio 99"));
}
