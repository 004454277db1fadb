// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # MaSTr Hub
//!
//! Renumber the MaSTr1325 maritime segmentation dataset and publish it to a
//! Hugging Face compatible dataset hub.
//!
//! A sample is a primary camera frame with two companions, an IMU horizon
//! overlay and a segmentation mask, kept in three sibling folders. The
//! pipeline runs three stages strictly in sequence:
//!
//! - **Prepare**: [`prepare_dirs`] creates or empties the destination
//!   folders.
//! - **Copy**: [`rename_and_copy`] numbers the primary images in file name
//!   order, resolves and checks their companions, and copies each sample as
//!   `0001.jpg`, `0001.png`, `0001.png`.
//! - **Publish**: [`build_split`] re-scans the destination folders and
//!   [`publish_split`] packages the records as parquet shards and uploads
//!   them in a single commit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mastr_hub::{
//!     Config, Error, HubClient, PublishOptions, build_split, load_token, prepare_dirs,
//!     publish_split, rename_and_copy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let config = Config::load(None)?;
//!     let dest = config.dest_layout();
//!
//!     prepare_dirs(&dest).await?;
//!     rename_and_copy(&config.source_layout(), &dest, config.progress_interval, None).await?;
//!
//!     let split = build_split(&dest, &config.split)?;
//!     let token = load_token(&config.credential_sources())?;
//!     let hub = HubClient::new(&config.endpoint, &token, config.timeout())?;
//!     let report =
//!         publish_split(&hub, &split, &PublishOptions::from_config(&config), None).await?;
//!     println!("Pushed dataset to: {}", report.url);
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `polars` (default): parquet packaging of the split. Without it
//!   [`write_package`] fails with [`Error::FeatureNotEnabled`].

mod config;
mod error;
mod hub;
mod layout;
mod package;
mod prepare;
mod publish;
mod renumber;
mod resolve;
mod split;
mod storage;

pub use crate::{
    config::{Config, DEFAULT_ENDPOINT, split_repo_id},
    error::Error,
    hub::{CommitInfo, CommitOperation, HubClient, REVISION, RepoFile, UploadMode, sha256_file},
    layout::{FolderSet, Role},
    package::{DatasetPackage, dataset_card, plan_shards, shard_path, write_package},
    prepare::prepare_dirs,
    publish::{PublishOptions, PublishReport, publish_split},
    renumber::{
        CopiedSample, CopyReport, ID_WIDTH, PRIMARY_EXTENSION, SampleId, primary_images,
        rename_and_copy,
    },
    resolve::{ImuNaming, LEGACY_PREFIX, SourceSample, is_legacy_name},
    split::{DatasetSplit, FeatureType, Features, Record, build_split, renumbered_ids},
    storage::{
        CredentialSource, EnvTokenStorage, FileTokenStorage, MemoryTokenStorage, StorageError,
        TokenStorage, load_token,
    },
};

/// Progress information for long-running operations.
///
/// Sent by the copy stage (samples copied) and the upload (LFS bytes
/// transferred) over a `tokio::sync::mpsc` channel.
///
/// # Examples
///
/// ```rust
/// use mastr_hub::Progress;
///
/// let progress = Progress {
///     current: 25,
///     total: 100,
/// };
/// let percentage = (progress.current as f64 / progress.total as f64) * 100.0;
/// println!(
///     "Progress: {:.1}% ({}/{})",
///     percentage, progress.current, progress.total
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Current number of completed items.
    pub current: usize,
    /// Total number of items to process.
    pub total: usize,
}
