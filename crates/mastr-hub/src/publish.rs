// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Push a split to a dataset repository.

use crate::{CommitInfo, Config, DatasetSplit, Error, HubClient, Progress, write_package};
use chrono::{DateTime, Utc};
use log::{info, warn};
use tokio::sync::mpsc::Sender;

/// Where and how a split is published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishOptions {
    /// Namespaced repository id, `owner/name`.
    pub repo_id: String,
    pub private: bool,
    /// Upper bound of embedded bytes per parquet shard.
    pub max_shard_size: u64,
    /// Commit title.
    pub summary: String,
}

impl PublishOptions {
    pub fn from_config(config: &Config) -> Self {
        PublishOptions {
            repo_id: config.repo_id.clone(),
            private: config.private,
            max_shard_size: config.max_shard_size,
            summary: format!("Upload {} split", config.split),
        }
    }
}

/// Outcome of a successful publish.
#[derive(Clone, Debug)]
pub struct PublishReport {
    /// Public page of the dataset.
    pub url: String,
    pub commit: CommitInfo,
    pub num_examples: usize,
    /// False when the repository already existed or creation was refused.
    pub repo_created: bool,
    pub published_at: DateTime<Utc>,
}

/// Create the repository if needed, package `split` and upload it.
///
/// A failed repository creation is logged and ignored, since the usual cause
/// is that the repository already exists. Packaging or upload errors abort.
pub async fn publish_split(
    hub: &HubClient,
    split: &DatasetSplit,
    options: &PublishOptions,
    progress: Option<Sender<Progress>>,
) -> Result<PublishReport, Error> {
    let repo_created = match hub.create_repo(&options.repo_id, options.private).await {
        Ok(url) => {
            info!("Created dataset repository {}", url);
            true
        }
        Err(err) => {
            warn!(
                "Repo creation skipped or failed for {}: {}",
                options.repo_id, err
            );
            false
        }
    };

    let staging = tempfile::TempDir::new()?;
    let package = write_package(split, staging.path(), options.max_shard_size)?;

    let published_at = Utc::now();
    let description = format!(
        "{} records in split `{}`, {} bytes of images, packaged {}.",
        package.num_examples,
        split.name(),
        package.num_bytes,
        published_at.to_rfc3339()
    );

    info!(
        "Uploading {} file(s) to {}",
        package.files.len(),
        options.repo_id
    );
    let commit = hub
        .upload_files(
            &options.repo_id,
            &package.files,
            &options.summary,
            &description,
            progress,
        )
        .await?;

    Ok(PublishReport {
        url: hub.repo_url(&options.repo_id),
        commit,
        num_examples: package.num_examples,
        repo_created,
        published_at,
    })
}
