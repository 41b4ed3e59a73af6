//! Integration tests for the capture/ingest/retrieval flow.

mod common;

use common::{signup, test_config, TestHarness};

fn video_form(bytes: Vec<u8>, file_name: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "video",
        reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
    )
}

#[tokio::test]
async fn recording_routes_require_auth() {
    let (_h, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    for url in [
        format!("http://{addr}/api/recordings/start"),
        format!("http://{addr}/api/recordings/stop"),
    ] {
        let resp = client.post(&url).send().await.unwrap();
        assert_eq!(resp.status(), 401, "url: {url}");
    }

    let resp = client
        .get(format!("http://{addr}/api/recordings"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn start_is_idempotent() {
    let (_h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let resp = client
            .post(format!("http://{addr}/api/recordings/start"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["message"], "Recording started");
    }
}

#[tokio::test]
async fn stop_without_file_is_rejected() {
    let (_h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&token)
        .multipart(reqwest::multipart::Form::new().text("note", "no video here"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn empty_upload_creates_no_artifact() {
    let (h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&token)
        .multipart(video_form(Vec::new(), "empty.webm"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // No row, no file.
    let uploads = h.ctx.config.server.uploads_dir.clone();
    assert_eq!(std::fs::read_dir(&uploads).unwrap().count(), 0);
}

#[tokio::test]
async fn ingest_persists_exact_bytes() {
    let (h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&token)
        .multipart(video_form(payload.clone(), "clip.webm"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "Recording stopped and saved");
    let recording = &json["recording"];
    assert_eq!(recording["status"], "raw");
    assert_eq!(recording["size_bytes"], 10_000);
    let file_name = recording["file_name"].as_str().unwrap();
    assert!(file_name.ends_with(".webm"), "file_name: {file_name}");

    // The raw artifact on disk holds exactly the uploaded bytes.
    let raw_path = h.ctx.config.server.uploads_dir.join(file_name);
    let on_disk = std::fs::read(&raw_path).unwrap();
    assert_eq!(on_disk, payload);
}

#[tokio::test]
async fn retrieval_falls_back_to_raw_before_transcode() {
    let (_h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let payload = b"raw bytes pending transcode".to_vec();
    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&token)
        .multipart(video_form(payload.clone(), "clip.webm"))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = resp.json().await.unwrap();
    let id = json["recording"]["id"].as_str().unwrap().to_string();

    let resp = client
        .get(format!("http://{addr}/api/recordings/{id}/video"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "video/webm"
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &payload[..]);
}

#[tokio::test]
async fn retrieval_supports_range_requests() {
    let (_h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let payload = b"0123456789".to_vec();
    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&token)
        .multipart(video_form(payload, "clip.webm"))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = resp.json().await.unwrap();
    let id = json["recording"]["id"].as_str().unwrap().to_string();

    let resp = client
        .get(format!("http://{addr}/api/recordings/{id}/video"))
        .bearer_auth(&token)
        .header("Range", "bytes=2-5")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], b"2345");
}

#[tokio::test]
async fn transcode_failure_never_breaks_retrieval() {
    // Transcoding enabled, but the payload is not a real video: whether or
    // not ffmpeg is installed, the background task ends in `failed` and
    // retrieval falls back to the raw artifact.
    let mut config = test_config();
    config.transcode.enabled = true;
    let (_h, addr) = TestHarness::with_server_config(config).await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let payload = b"definitely not a video container".to_vec();
    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&token)
        .multipart(video_form(payload.clone(), "clip.webm"))
        .send()
        .await
        .unwrap();
    // Ingest succeeds regardless of what the transcoder will do later.
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    let id = json["recording"]["id"].as_str().unwrap().to_string();

    // Wait for the background task to settle.
    let mut status = String::new();
    for _ in 0..50 {
        let resp = client
            .get(format!("http://{addr}/api/recordings/{id}"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        let json: serde_json::Value = resp.json().await.unwrap();
        status = json["status"].as_str().unwrap().to_string();
        if status == "failed" || status == "ready" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert_eq!(status, "failed");

    // Raw fallback, not a 500.
    let resp = client
        .get(format!("http://{addr}/api/recordings/{id}/video"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &payload[..]);
}

#[tokio::test]
async fn retrieval_prefers_transcoded_artifact_when_ready() {
    let (h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let raw = b"original raw upload".to_vec();
    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&token)
        .multipart(video_form(raw, "clip.webm"))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = resp.json().await.unwrap();
    let id: cv_core::RecordingId = json["recording"]["id"].as_str().unwrap().parse().unwrap();

    // Drive the state machine to `ready` as the transcode task would.
    let transcoded_path = h.ctx.config.server.uploads_dir.join(format!("{id}-final.mp4"));
    std::fs::write(&transcoded_path, b"normalized mp4 output").unwrap();
    {
        let conn = h.conn();
        cv_db::queries::recordings::mark_transcoding(&conn, id).unwrap();
        cv_db::queries::recordings::complete_transcode(
            &conn,
            id,
            &transcoded_path.to_string_lossy(),
        )
        .unwrap();
    }

    let resp = client
        .get(format!("http://{addr}/api/recordings/{id}/video"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "video/mp4");
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], b"normalized mp4 output");
}

#[tokio::test]
async fn recordings_are_scoped_to_their_owner() {
    let (_h, addr) = TestHarness::with_server().await;
    let alice = signup(addr, "alice@x.com", "pw").await;
    let bob = signup(addr, "bob@x.com", "pw").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/recordings/stop"))
        .bearer_auth(&alice)
        .multipart(video_form(b"alice's clip".to_vec(), "clip.webm"))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = resp.json().await.unwrap();
    let id = json["recording"]["id"].as_str().unwrap().to_string();

    // Bob cannot see Alice's recording, by status or by stream.
    for url in [
        format!("http://{addr}/api/recordings/{id}"),
        format!("http://{addr}/api/recordings/{id}/video"),
    ] {
        let resp = client.get(&url).bearer_auth(&bob).send().await.unwrap();
        assert_eq!(resp.status(), 404, "url: {url}");
    }

    // Bob's list is empty; Alice's has one entry.
    let resp = client
        .get(format!("http://{addr}/api/recordings"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    let list: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert!(list.is_empty());

    let resp = client
        .get(format!("http://{addr}/api/recordings"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    let list: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn unknown_and_invalid_ids() {
    let (_h, addr) = TestHarness::with_server().await;
    let token = signup(addr, "rec@x.com", "pw").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "http://{addr}/api/recordings/00000000-0000-0000-0000-000000000000/video"
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .get(format!("http://{addr}/api/recordings/not-a-uuid/video"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
