// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Run configuration.
//!
//! Settings are layered with the `config` crate, lowest priority first:
//!
//! 1. built-in defaults matching the MaSTr1325 512x384 release
//! 2. an optional TOML file
//! 3. `MASTR_*` environment variables (e.g. `MASTR_REPO_ID`)
//!
//! Command-line overrides are applied by the caller on the returned value.
//! `HF_ENDPOINT` replaces the default hub endpoint, matching the hub tooling.

use crate::{CredentialSource, Error, FolderSet};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Default hub endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Complete configuration for one pipeline run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Root of the original dataset.
    pub source_root: PathBuf,
    /// Folder of primary `.jpg` images under `source_root`.
    pub source_images: String,
    /// Folder of IMU overlays under `source_root`.
    pub source_imus: String,
    /// Folder of masks under `source_root`.
    pub source_masks: String,
    /// Root of the renumbered copy. Its folders are cleared on every run.
    pub dest_root: PathBuf,
    pub dest_images: String,
    pub dest_imus: String,
    pub dest_masks: String,
    /// Namespaced dataset repository, `owner/name`.
    pub repo_id: String,
    /// Name of the single published split.
    pub split: String,
    /// Create the repository as private.
    pub private: bool,
    /// Hub base URL.
    pub endpoint: String,
    /// Environment variable holding the hub token.
    pub token_env: String,
    /// Token file, the hub default location when unset.
    pub token_file: Option<PathBuf>,
    /// Log a progress line every this many copied samples.
    pub progress_interval: usize,
    /// Upper bound of embedded image bytes per parquet shard.
    pub max_shard_size: u64,
    /// HTTP request timeout in seconds.
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_root: PathBuf::from("../data/MaSTr1325"),
            source_images: "MaSTr1325_images_512x384".to_string(),
            source_imus: "MaSTr1325_imus_512x384".to_string(),
            source_masks: "MaSTr1325_masks_512x384".to_string(),
            dest_root: PathBuf::from("../data/MaSTr1325_renamed"),
            dest_images: "images_512x384".to_string(),
            dest_imus: "imus_512x384".to_string(),
            dest_masks: "masks_512x384".to_string(),
            repo_id: "Wilbur1240/MaSTr1325_512x384".to_string(),
            split: "train".to_string(),
            private: false,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token_env: "HF_TOKEN".to_string(),
            token_file: None,
            progress_interval: 200,
            max_shard_size: 500 * 1000 * 1000,
            timeout: 300,
        }
    }
}

impl Config {
    /// Load the layered configuration, reading `file` when given.
    pub fn load(file: Option<&Path>) -> Result<Self, Error> {
        let mut defaults = Config::default();
        if let Ok(endpoint) = std::env::var("HF_ENDPOINT")
            && !endpoint.trim().is_empty()
        {
            defaults.endpoint = endpoint.trim().to_string();
        }

        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&defaults)?);

        if let Some(file) = file {
            debug!("Loading configuration from {:?}", file);
            builder = builder.add_source(config::File::from(file).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("MASTR").try_parsing(true))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;

        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Check the values the stages rely on.
    pub fn validate(&self) -> Result<(), Error> {
        split_repo_id(&self.repo_id)?;
        if self.split.trim().is_empty() {
            return Err(Error::InvalidParameters("split name is empty".to_string()));
        }
        if self.progress_interval == 0 {
            return Err(Error::InvalidParameters(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        if self.max_shard_size == 0 {
            return Err(Error::InvalidParameters(
                "max_shard_size must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.endpoint)?;
        Ok(())
    }

    /// Folders of the original dataset.
    pub fn source_layout(&self) -> FolderSet {
        FolderSet::new(
            &self.source_root,
            &self.source_images,
            &self.source_imus,
            &self.source_masks,
        )
    }

    /// Folders of the renumbered copy.
    pub fn dest_layout(&self) -> FolderSet {
        FolderSet::new(
            &self.dest_root,
            &self.dest_images,
            &self.dest_imus,
            &self.dest_masks,
        )
    }

    /// Credential lookup order: environment variable, then token file.
    pub fn credential_sources(&self) -> Vec<CredentialSource> {
        vec![
            CredentialSource::Env(self.token_env.clone()),
            CredentialSource::File(self.token_file.clone()),
        ]
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Public page of the dataset repository.
    pub fn repo_url(&self) -> String {
        format!(
            "{}/datasets/{}",
            self.endpoint.trim_end_matches('/'),
            self.repo_id
        )
    }
}

/// Split `owner/name` into its namespace and repository name.
pub fn split_repo_id(repo_id: &str) -> Result<(&str, &str), Error> {
    match repo_id.split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((owner, name))
        }
        _ => Err(Error::InvalidParameters(format!(
            "repository id must be owner/name: {}",
            repo_id
        ))),
    }
}
