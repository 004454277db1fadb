// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Hub client and publisher against an in-process mock hub.

#![cfg(feature = "polars")]

use mastr_hub::{
    DatasetSplit, Error, Features, FolderSet, HubClient, PublishOptions, Record, Role, SampleId,
    publish_split,
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tempfile::TempDir;
use tiny_http::{Method, Request, Response, Server};

const TOKEN: &str = "hf_test_token";
const REPO_ID: &str = "tester/mastr";

#[ctor::ctor]
fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    url: String,
    authorization: Option<String>,
    body: Vec<u8>,
}

struct MockHub {
    url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockHub {
    /// Start a hub answering repository creation with `create_status`.
    fn start(create_status: u16) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}", server.server_addr().to_ip().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let base = url.clone();
        let log = requests.clone();
        std::thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = Vec::new();
                request.as_reader().read_to_end(&mut body).unwrap();
                let recorded = Recorded {
                    method: request.method().clone(),
                    url: request.url().to_string(),
                    authorization: header(&request, "Authorization"),
                    body,
                };
                let (status, payload) = route(&recorded, &base, create_status);
                log.lock().unwrap().push(recorded);
                let _ = request.respond(Response::from_data(payload).with_status_code(status));
            }
        });

        MockHub { url, requests }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn client(&self, token: &str) -> HubClient {
        HubClient::new(&self.url, token, Duration::from_secs(10)).unwrap()
    }
}

fn header(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn json(value: serde_json::Value) -> Vec<u8> {
    value.to_string().into_bytes()
}

fn route(request: &Recorded, base: &str, create_status: u16) -> (u16, Vec<u8>) {
    let authorized = request.authorization.as_deref() == Some(format!("Bearer {TOKEN}").as_str());
    let path = request.url.as_str();

    if path.starts_with("/lfs/") {
        // Presigned storage, no hub credentials expected.
        return (200, Vec::new());
    }
    if !authorized {
        return (401, json(serde_json::json!({"error": "Invalid credentials"})));
    }

    match (&request.method, path) {
        (Method::Get, "/api/whoami-v2") => (200, json(serde_json::json!({"name": "tester"}))),
        (Method::Post, "/api/repos/create") if create_status == 200 => (
            200,
            json(serde_json::json!({"url": format!("{base}/datasets/{REPO_ID}")})),
        ),
        (Method::Post, "/api/repos/create") => (
            create_status,
            json(serde_json::json!({"error": "You already created this dataset repo"})),
        ),
        (Method::Post, p) if p == format!("/api/datasets/{REPO_ID}/preupload/main") => {
            let params: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let files = params["files"]
                .as_array()
                .unwrap()
                .iter()
                .map(|file| {
                    let path = file["path"].as_str().unwrap();
                    let mode = if path.ends_with(".parquet") { "lfs" } else { "regular" };
                    serde_json::json!({"path": path, "uploadMode": mode})
                })
                .collect::<Vec<_>>();
            (200, json(serde_json::json!({"files": files})))
        }
        (Method::Post, p) if p == format!("/datasets/{REPO_ID}.git/info/lfs/objects/batch") => {
            let params: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let objects = params["objects"]
                .as_array()
                .unwrap()
                .iter()
                .map(|object| {
                    let oid = object["oid"].as_str().unwrap();
                    serde_json::json!({
                        "oid": oid,
                        "size": object["size"],
                        "actions": {
                            "upload": {"href": format!("{base}/lfs/{oid}")},
                            "verify": {"href": format!("{base}/api/lfs/verify")},
                        },
                    })
                })
                .collect::<Vec<_>>();
            (200, json(serde_json::json!({"objects": objects})))
        }
        (Method::Post, "/api/lfs/verify") => (200, json(serde_json::json!({}))),
        (Method::Post, p) if p == format!("/api/datasets/{REPO_ID}/commit/main") => (
            200,
            json(serde_json::json!({
                "commitUrl": format!("{base}/datasets/{REPO_ID}/commit/abc123"),
                "commitOid": "abc123",
            })),
        ),
        _ => (404, json(serde_json::json!({"error": "Not Found"}))),
    }
}

fn split(temp_dir: &TempDir, count: u32) -> DatasetSplit {
    let dest = FolderSet::new(temp_dir.path(), "images", "imus", "masks");
    for (_, folder) in dest.iter() {
        std::fs::create_dir_all(folder).unwrap();
    }
    let records = (1..=count)
        .map(|index| {
            let record = Record::for_id(&dest, SampleId::new(index).unwrap());
            for role in Role::ALL {
                std::fs::write(record.path(role), format!("{role} {index}")).unwrap();
            }
            record
        })
        .collect();
    DatasetSplit::new("train", Features::images(), records)
}

fn options() -> PublishOptions {
    PublishOptions {
        repo_id: REPO_ID.to_string(),
        private: false,
        max_shard_size: 500_000_000,
        summary: "Upload train split".to_string(),
    }
}

#[tokio::test]
async fn test_whoami() {
    let hub = MockHub::start(200);
    assert_eq!(hub.client(TOKEN).whoami().await.unwrap(), "tester");
}

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let hub = MockHub::start(200);
    let err = hub.client("hf_wrong").whoami().await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized), "got {err:?}");
}

#[tokio::test]
async fn test_publish_creates_repo_and_commits() {
    let temp_dir = TempDir::new().unwrap();
    let hub = MockHub::start(200);
    let split = split(&temp_dir, 3);

    let report = publish_split(&hub.client(TOKEN), &split, &options(), None)
        .await
        .unwrap();

    assert!(report.repo_created);
    assert_eq!(report.num_examples, 3);
    assert_eq!(report.commit.commit_oid, "abc123");
    assert_eq!(report.url, format!("{}/datasets/{REPO_ID}", hub.url));

    let requests = hub.requests();
    let create = &requests[0];
    assert_eq!(create.url, "/api/repos/create");
    let params: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert_eq!(
        params,
        serde_json::json!({
            "type": "dataset",
            "name": "mastr",
            "organization": "tester",
            "private": false,
        })
    );

    // The shard body goes to storage without the hub token.
    let put = requests
        .iter()
        .find(|r| r.method == Method::Put)
        .expect("shard upload");
    assert!(put.url.starts_with("/lfs/"));
    assert!(put.authorization.is_none());
    assert!(put.body.starts_with(b"PAR1"));

    let commit = requests.last().unwrap();
    assert_eq!(commit.url, format!("/api/datasets/{REPO_ID}/commit/main"));
    let lines = std::str::from_utf8(&commit.body)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["key"], "header");
    assert_eq!(lines[0]["value"]["summary"], "Upload train split");
    assert_eq!(lines[1]["key"], "lfsFile");
    assert_eq!(lines[1]["value"]["path"], "data/train-00000-of-00001.parquet");
    assert_eq!(lines[1]["value"]["size"], put.body.len());
    assert_eq!(lines[2]["key"], "file");
    assert_eq!(lines[2]["value"]["path"], "README.md");
}

#[tokio::test]
async fn test_failed_repo_creation_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let hub = MockHub::start(409);
    let split = split(&temp_dir, 2);

    let report = publish_split(&hub.client(TOKEN), &split, &options(), None)
        .await
        .unwrap();

    assert!(!report.repo_created);
    assert_eq!(report.num_examples, 2);
}

#[tokio::test]
async fn test_upload_failure_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let hub = MockHub::start(200);
    let split = split(&temp_dir, 1);
    let options = PublishOptions {
        repo_id: "someone/else".to_string(),
        ..options()
    };

    let err = publish_split(&hub.client(TOKEN), &split, &options, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HubError(404, _)), "got {err:?}");
}

#[tokio::test]
async fn test_upload_progress_reaches_total() {
    let temp_dir = TempDir::new().unwrap();
    let hub = MockHub::start(200);
    let split = split(&temp_dir, 2);

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    publish_split(&hub.client(TOKEN), &split, &options(), Some(tx))
        .await
        .unwrap();

    let mut last = None;
    while let Some(progress) = rx.recv().await {
        last = Some(progress);
    }
    let last = last.unwrap();
    assert!(last.total > 0);
    assert_eq!(last.current, last.total);
}
