// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! HTTP client for a Hugging Face compatible dataset hub.
//!
//! An upload is a single commit on the `main` revision:
//!
//! 1. `preupload` asks the hub which files go through git-lfs and which are
//!    committed inline.
//! 2. LFS files are announced to the git-lfs batch endpoint, then `PUT` to
//!    the returned storage URL and optionally verified. Objects the hub
//!    already stores come back without an upload action and are skipped.
//! 3. `commit` posts an NDJSON body: a header line, one `file` line per
//!    inline file (base64 content) and one `lfsFile` line per LFS file.
//!
//! Requests are sent one after the other and never retried.

use crate::{Error, Progress, config::split_repo_id};
use base64::Engine as _;
use log::{Level, debug, log_enabled, trace};
use reqwest::{Body, header::CONTENT_LENGTH, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest as _, Sha256};
use std::{collections::HashMap, path::PathBuf, time::Duration};
use tokio::{fs::File, io::AsyncReadExt as _, sync::mpsc::Sender};
use tokio_util::codec::{BytesCodec, FramedRead};
use url::Url;

/// Revision every commit is made on.
pub const REVISION: &str = "main";

/// Bytes of each file sent to `preupload` so the hub can sniff its type.
const SAMPLE_SIZE: usize = 512;

const LFS_CONTENT_TYPE: &str = "application/vnd.git-lfs+json";

/// A local file and where it goes in the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoFile {
    /// Path inside the repository, `/`-separated.
    pub path_in_repo: String,
    /// File on the local filesystem.
    pub local: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

impl RepoFile {
    pub fn new(path_in_repo: &str, local: PathBuf) -> Result<Self, Error> {
        let size = local.metadata()?.len();
        Ok(RepoFile {
            path_in_repo: path_in_repo.to_string(),
            local,
            size,
        })
    }
}

/// How the hub wants a file transferred.
#[derive(Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Committed inline, base64 encoded.
    Regular,
    /// Stored through git-lfs and referenced by its sha256.
    Lfs,
}

/// One change in a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOperation {
    /// Inline file content.
    Regular {
        path_in_repo: String,
        content: Vec<u8>,
    },
    /// Pointer to an LFS object already uploaded.
    Lfs {
        path_in_repo: String,
        oid: String,
        size: u64,
    },
}

impl CommitOperation {
    fn ndjson_line(&self) -> serde_json::Value {
        match self {
            CommitOperation::Regular {
                path_in_repo,
                content,
            } => serde_json::json!({
                "key": "file",
                "value": {
                    "content": base64::engine::general_purpose::STANDARD.encode(content),
                    "path": path_in_repo,
                    "encoding": "base64",
                },
            }),
            CommitOperation::Lfs {
                path_in_repo,
                oid,
                size,
            } => serde_json::json!({
                "key": "lfsFile",
                "value": {
                    "path": path_in_repo,
                    "algo": "sha256",
                    "oid": oid,
                    "size": size,
                },
            }),
        }
    }
}

/// Commit created by an upload.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub commit_url: String,
    pub commit_oid: String,
}

#[derive(Serialize)]
struct CreateRepoParams<'a> {
    #[serde(rename = "type")]
    repo_type: &'a str,
    name: &'a str,
    organization: &'a str,
    private: bool,
}

#[derive(Deserialize)]
struct CreateRepoResult {
    url: String,
}

#[derive(Deserialize)]
struct WhoamiResult {
    name: String,
}

#[derive(Serialize)]
struct PreuploadFile<'a> {
    path: &'a str,
    sample: String,
    size: u64,
}

#[derive(Serialize)]
struct PreuploadParams<'a> {
    files: Vec<PreuploadFile<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreuploadFileResult {
    path: String,
    upload_mode: UploadMode,
}

#[derive(Deserialize)]
struct PreuploadResult {
    files: Vec<PreuploadFileResult>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct LfsObject {
    oid: String,
    size: u64,
}

#[derive(Serialize)]
struct LfsBatchParams<'a> {
    operation: &'a str,
    transfers: Vec<&'a str>,
    objects: Vec<LfsObject>,
    hash_algo: &'a str,
}

#[derive(Deserialize, Debug)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: HashMap<String, String>,
}

#[derive(Deserialize, Debug, Default)]
struct LfsActions {
    upload: Option<LfsAction>,
    verify: Option<LfsAction>,
}

#[derive(Deserialize, Debug)]
struct LfsObjectError {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug)]
struct LfsObjectResult {
    oid: String,
    #[serde(default)]
    actions: Option<LfsActions>,
    #[serde(default)]
    error: Option<LfsObjectError>,
}

#[derive(Deserialize)]
struct LfsBatchResult {
    objects: Vec<LfsObjectResult>,
}

/// Authenticated client for the dataset hub.
#[derive(Clone)]
pub struct HubClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubClient")
            .field("endpoint", &self.endpoint)
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}

impl HubClient {
    /// Create a client for `endpoint` authenticated with `token`.
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }
        let endpoint = Url::parse(endpoint)?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;

        Ok(HubClient {
            http,
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Base URL of the hub, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Public page of a dataset repository.
    pub fn repo_url(&self, repo_id: &str) -> String {
        format!("{}/datasets/{}", self.endpoint, repo_id)
    }

    /// Name of the account owning the token.
    pub async fn whoami(&self) -> Result<String, Error> {
        let res = self
            .http
            .get(format!("{}/api/whoami-v2", self.endpoint))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let result: WhoamiResult = self.json_response(res).await?;
        Ok(result.name)
    }

    /// Create a public or private dataset repository and return its URL.
    ///
    /// Fails with [`Error::HubError`] (409) when the repository exists.
    pub async fn create_repo(&self, repo_id: &str, private: bool) -> Result<String, Error> {
        let (owner, name) = split_repo_id(repo_id)?;
        let params = CreateRepoParams {
            repo_type: "dataset",
            name,
            organization: owner,
            private,
        };
        let res = self
            .http
            .post(format!("{}/api/repos/create", self.endpoint))
            .bearer_auth(&self.token)
            .json(&params)
            .send()
            .await?;
        let result: CreateRepoResult = self.json_response(res).await?;
        Ok(result.url)
    }

    /// Ask the hub how each of `files` must be transferred.
    ///
    /// The returned modes follow the order of `files`.
    pub async fn preupload(
        &self,
        repo_id: &str,
        files: &[RepoFile],
    ) -> Result<Vec<UploadMode>, Error> {
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            entries.push(PreuploadFile {
                path: &file.path_in_repo,
                sample: base64::engine::general_purpose::STANDARD
                    .encode(read_sample(file).await?),
                size: file.size,
            });
        }

        let res = self
            .http
            .post(format!(
                "{}/api/datasets/{}/preupload/{}",
                self.endpoint, repo_id, REVISION
            ))
            .bearer_auth(&self.token)
            .json(&PreuploadParams { files: entries })
            .send()
            .await?;
        let result: PreuploadResult = self.json_response(res).await?;

        let modes: HashMap<String, UploadMode> = result
            .files
            .into_iter()
            .map(|f| (f.path, f.upload_mode))
            .collect();
        files
            .iter()
            .map(|file| {
                modes
                    .get(&file.path_in_repo)
                    .copied()
                    .ok_or(Error::InvalidResponse)
            })
            .collect()
    }

    /// Upload LFS objects, skipping those the hub already stores.
    ///
    /// `objects` pairs each file with its sha256 oid.
    async fn upload_lfs(
        &self,
        repo_id: &str,
        objects: &[(&RepoFile, String)],
        progress: Option<&Sender<Progress>>,
        current: &mut usize,
        total: usize,
    ) -> Result<(), Error> {
        if objects.is_empty() {
            return Ok(());
        }

        let params = LfsBatchParams {
            operation: "upload",
            transfers: vec!["basic"],
            objects: objects
                .iter()
                .map(|(file, oid)| LfsObject {
                    oid: oid.clone(),
                    size: file.size,
                })
                .collect(),
            hash_algo: "sha256",
        };
        let res = self
            .http
            .post(format!(
                "{}/datasets/{}.git/info/lfs/objects/batch",
                self.endpoint, repo_id
            ))
            .bearer_auth(&self.token)
            .header("Accept", LFS_CONTENT_TYPE)
            .header(CONTENT_TYPE, LFS_CONTENT_TYPE)
            .body(serde_json::to_vec(&params)?)
            .send()
            .await?;
        let batch: LfsBatchResult = self.json_response(res).await?;

        for (file, oid) in objects {
            let object = batch
                .objects
                .iter()
                .find(|o| &o.oid == oid)
                .ok_or(Error::InvalidResponse)?;
            if let Some(error) = &object.error {
                return Err(Error::HubError(
                    error.code.try_into().unwrap_or(500),
                    format!("{}: {}", file.path_in_repo, error.message),
                ));
            }

            let actions = object.actions.as_ref();
            match actions.and_then(|a| a.upload.as_ref()) {
                Some(upload) => {
                    debug!("Uploading {} ({} bytes)", file.path_in_repo, file.size);
                    self.put_object(file, upload).await?;
                    if let Some(verify) = actions.and_then(|a| a.verify.as_ref()) {
                        self.verify_object(oid, file.size, verify).await?;
                    }
                }
                None => debug!("{} already stored, skipping upload", file.path_in_repo),
            }

            *current += file.size as usize;
            if let Some(progress) = progress {
                let _ = progress
                    .send(Progress {
                        current: *current,
                        total,
                    })
                    .await;
            }
        }

        Ok(())
    }

    async fn put_object(&self, file: &RepoFile, upload: &LfsAction) -> Result<(), Error> {
        let stream = FramedRead::new(File::open(&file.local).await?, BytesCodec::new());

        // The upload URL is presigned storage, so no hub credentials here.
        let mut req = self
            .http
            .put(&upload.href)
            .header(CONTENT_LENGTH, file.size)
            .body(Body::wrap_stream(stream));
        for (name, value) in &upload.header {
            req = req.header(name.as_str(), value.as_str());
        }

        check_status(req.send().await?).await?;
        Ok(())
    }

    async fn verify_object(&self, oid: &str, size: u64, verify: &LfsAction) -> Result<(), Error> {
        let mut req = self
            .http
            .post(&verify.href)
            .bearer_auth(&self.token)
            .header("Accept", LFS_CONTENT_TYPE)
            .header(CONTENT_TYPE, LFS_CONTENT_TYPE)
            .body(serde_json::to_vec(&LfsObject {
                oid: oid.to_string(),
                size,
            })?);
        for (name, value) in &verify.header {
            req = req.header(name.as_str(), value.as_str());
        }

        check_status(req.send().await?).await?;
        Ok(())
    }

    /// Create a commit on [`REVISION`] applying `operations`.
    pub async fn commit(
        &self,
        repo_id: &str,
        summary: &str,
        description: &str,
        operations: &[CommitOperation],
    ) -> Result<CommitInfo, Error> {
        let header = serde_json::json!({
            "key": "header",
            "value": {"summary": summary, "description": description},
        });
        let mut body = String::new();
        for line in std::iter::once(header).chain(operations.iter().map(|op| op.ndjson_line())) {
            body.push_str(&serde_json::to_string(&line)?);
            body.push('\n');
        }

        let res = self
            .http
            .post(format!(
                "{}/api/datasets/{}/commit/{}",
                self.endpoint, repo_id, REVISION
            ))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        self.json_response(res).await
    }

    /// Upload `files` to the dataset repository in a single commit.
    ///
    /// `progress` receives the number of LFS bytes transferred so far.
    pub async fn upload_files(
        &self,
        repo_id: &str,
        files: &[RepoFile],
        summary: &str,
        description: &str,
        progress: Option<Sender<Progress>>,
    ) -> Result<CommitInfo, Error> {
        let modes = self.preupload(repo_id, files).await?;

        let mut operations = Vec::with_capacity(files.len());
        let mut lfs_objects = Vec::new();
        for (file, mode) in files.iter().zip(modes) {
            match mode {
                UploadMode::Regular => operations.push(CommitOperation::Regular {
                    path_in_repo: file.path_in_repo.clone(),
                    content: tokio::fs::read(&file.local).await?,
                }),
                UploadMode::Lfs => {
                    let oid = sha256_file(file).await?;
                    operations.push(CommitOperation::Lfs {
                        path_in_repo: file.path_in_repo.clone(),
                        oid: oid.clone(),
                        size: file.size,
                    });
                    lfs_objects.push((file, oid));
                }
            }
        }

        let total = lfs_objects
            .iter()
            .map(|(file, _)| file.size as usize)
            .sum::<usize>();
        let mut current = 0;
        if let Some(progress) = &progress {
            let _ = progress.send(Progress { current, total }).await;
        }
        self.upload_lfs(
            repo_id,
            &lfs_objects,
            progress.as_ref(),
            &mut current,
            total,
        )
        .await?;

        let commit = self
            .commit(repo_id, summary, description, &operations)
            .await?;
        debug!("Commit created: {}", commit.commit_url);
        Ok(commit)
    }

    async fn json_response<T: DeserializeOwned>(&self, res: reqwest::Response) -> Result<T, Error> {
        let body = check_status(res).await?.bytes().await?;

        if log_enabled!(Level::Trace) {
            trace!("Hub Response: {}", String::from_utf8_lossy(&body));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    match status.as_u16() {
        401 | 403 => Err(Error::Unauthorized),
        code => {
            let body = res.text().await.unwrap_or_default();
            Err(Error::HubError(code, body))
        }
    }
}

async fn read_sample(file: &RepoFile) -> Result<Vec<u8>, Error> {
    let mut sample = Vec::with_capacity(SAMPLE_SIZE);
    File::open(&file.local)
        .await?
        .take(SAMPLE_SIZE as u64)
        .read_to_end(&mut sample)
        .await?;
    Ok(sample)
}

/// Hex sha256 of a file, the LFS object id.
pub async fn sha256_file(file: &RepoFile) -> Result<String, Error> {
    let mut reader = File::open(&file.local).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_requires_token() {
        assert!(matches!(
            HubClient::new("https://huggingface.co", "", Duration::from_secs(5)),
            Err(Error::EmptyToken)
        ));
    }

    #[test]
    fn test_endpoint_is_normalized() {
        let hub = HubClient::new("https://huggingface.co/", "hf_x", Duration::from_secs(5)).unwrap();
        assert_eq!(hub.endpoint(), "https://huggingface.co");
        assert_eq!(
            hub.repo_url("Wilbur1240/MaSTr1325_512x384"),
            "https://huggingface.co/datasets/Wilbur1240/MaSTr1325_512x384"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let hub = HubClient::new("https://huggingface.co", "hf_secret", Duration::from_secs(5))
            .unwrap();
        assert!(!format!("{:?}", hub).contains("hf_secret"));
    }

    #[test]
    fn test_commit_operation_lines() {
        let regular = CommitOperation::Regular {
            path_in_repo: "README.md".to_string(),
            content: b"hi".to_vec(),
        };
        assert_eq!(
            regular.ndjson_line(),
            serde_json::json!({
                "key": "file",
                "value": {"content": "aGk=", "path": "README.md", "encoding": "base64"},
            })
        );

        let lfs = CommitOperation::Lfs {
            path_in_repo: "data/train-00000-of-00001.parquet".to_string(),
            oid: "abc".to_string(),
            size: 3,
        };
        assert_eq!(lfs.ndjson_line()["key"], "lfsFile");
        assert_eq!(lfs.ndjson_line()["value"]["algo"], "sha256");
    }

    #[tokio::test]
    async fn test_sha256_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc.bin");
        std::fs::write(&path, b"abc").unwrap();
        let file = RepoFile::new("abc.bin", path).unwrap();
        assert_eq!(file.size, 3);
        assert_eq!(
            sha256_file(&file).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
