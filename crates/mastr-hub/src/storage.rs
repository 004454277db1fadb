// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Token storage for the hub credential.
//!
//! The hub accepts a bearer token. It is looked up in an ordered list of
//! [`CredentialSource`]s, each backed by a [`TokenStorage`]:
//!
//! - [`EnvTokenStorage`]: read-only, a process environment variable
//!   (`HF_TOKEN` by default)
//! - [`FileTokenStorage`]: the token file shared with the hub tooling
//!   (`$HF_HOME/token`, or `~/.cache/huggingface/token`)
//! - [`MemoryTokenStorage`]: a token given on the command line, or tests
//!
//! # Examples
//!
//! ```rust
//! use mastr_hub::{CredentialSource, load_token};
//!
//! let sources = [CredentialSource::Token("hf_example".to_string())];
//! assert_eq!(load_token(&sources).unwrap(), "hf_example");
//! ```

use directories::BaseDirs;
use log::debug;
use std::{path::PathBuf, sync::Arc, sync::RwLock};

use crate::Error;

/// Error type for token storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// Storage is not available (e.g., cannot determine home directory).
    NotAvailable(String),
    /// Failed to read token from storage.
    ReadError(String),
    /// Failed to write token to storage.
    WriteError(String),
    /// Failed to clear token from storage.
    ClearError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotAvailable(msg) => write!(f, "Token storage not available: {}", msg),
            StorageError::ReadError(msg) => write!(f, "Failed to read token: {}", msg),
            StorageError::WriteError(msg) => write!(f, "Failed to write token: {}", msg),
            StorageError::ClearError(msg) => write!(f, "Failed to clear token: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Persistent token storage.
pub trait TokenStorage: Send + Sync {
    /// Store the authentication token.
    fn store(&self, token: &str) -> Result<(), StorageError>;

    /// Load the stored authentication token.
    ///
    /// Returns `Ok(None)` if no token is stored.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Clear the stored authentication token.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Token file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Create a `FileTokenStorage` at the default hub token location.
    ///
    /// `$HF_HOME/token` when `HF_HOME` is set, otherwise
    /// `~/.cache/huggingface/token`.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_path(default_token_path()?))
    }

    /// Create a `FileTokenStorage` with a custom file path.
    pub fn with_path(path: PathBuf) -> Self {
        debug!("FileTokenStorage using path: {:?}", path);
        Self { path }
    }

    /// Returns the path where the token is stored.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

fn default_token_path() -> Result<PathBuf, StorageError> {
    if let Ok(home) = std::env::var("HF_HOME")
        && !home.trim().is_empty()
    {
        return Ok(PathBuf::from(home).join("token"));
    }

    let dirs = BaseDirs::new().ok_or_else(|| {
        StorageError::NotAvailable("Could not determine user home directory".to_string())
    })?;
    Ok(dirs
        .home_dir()
        .join(".cache")
        .join("huggingface")
        .join("token"))
}

impl TokenStorage for FileTokenStorage {
    fn store(&self, token: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::WriteError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }

        std::fs::write(&self.path, token).map_err(|e| {
            StorageError::WriteError(format!("Failed to write token to {:?}: {}", self.path, e))
        })?;

        debug!("Token stored to {:?}", self.path);
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            debug!("No token file found at {:?}", self.path);
            return Ok(None);
        }

        let token = std::fs::read_to_string(&self.path).map_err(|e| {
            StorageError::ReadError(format!("Failed to read token from {:?}: {}", self.path, e))
        })?;

        // The hub tooling writes the token followed by a newline.
        let token = token.trim();
        if token.is_empty() {
            debug!("Token file at {:?} is empty", self.path);
            return Ok(None);
        }

        debug!("Token loaded from {:?}", self.path);
        Ok(Some(token.to_string()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                StorageError::ClearError(format!(
                    "Failed to remove token file {:?}: {}",
                    self.path, e
                ))
            })?;
            debug!("Token file removed from {:?}", self.path);
        }
        Ok(())
    }
}

/// Read-only token held in an environment variable.
#[derive(Debug, Clone)]
pub struct EnvTokenStorage {
    var: String,
}

impl EnvTokenStorage {
    pub fn new(var: &str) -> Self {
        Self {
            var: var.to_string(),
        }
    }
}

impl TokenStorage for EnvTokenStorage {
    fn store(&self, _token: &str) -> Result<(), StorageError> {
        Err(StorageError::WriteError(format!(
            "environment variable {} is read-only",
            self.var
        )))
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(StorageError::ReadError(format!("{}: {}", self.var, e))),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::ClearError(format!(
            "environment variable {} is read-only",
            self.var
        )))
    }
}

/// In-memory token storage (no persistence).
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStorage {
    /// Create a new `MemoryTokenStorage`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn store(&self, token: &str) -> Result<(), StorageError> {
        let mut guard = self.token.write().map_err(|e| {
            StorageError::WriteError(format!("Failed to acquire write lock: {}", e))
        })?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .token
            .read()
            .map_err(|e| StorageError::ReadError(format!("Failed to acquire read lock: {}", e)))?;
        Ok(guard.clone())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.token.write().map_err(|e| {
            StorageError::ClearError(format!("Failed to acquire write lock: {}", e))
        })?;
        *guard = None;
        Ok(())
    }
}

/// Where the hub credential may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// A token passed explicitly, e.g. `--token`.
    Token(String),
    /// A process environment variable.
    Env(String),
    /// A token file. `None` selects the default hub token file.
    File(Option<PathBuf>),
}

impl CredentialSource {
    /// Storage backend reading this source.
    pub fn storage(&self) -> Result<Arc<dyn TokenStorage>, StorageError> {
        Ok(match self {
            CredentialSource::Token(token) => {
                let storage = MemoryTokenStorage::new();
                storage.store(token)?;
                Arc::new(storage)
            }
            CredentialSource::Env(var) => Arc::new(EnvTokenStorage::new(var)),
            CredentialSource::File(Some(path)) => Arc::new(FileTokenStorage::with_path(path.clone())),
            CredentialSource::File(None) => Arc::new(FileTokenStorage::new()?),
        })
    }
}

/// Return the first non-empty token found in `sources`, in order.
pub fn load_token(sources: &[CredentialSource]) -> Result<String, Error> {
    for source in sources {
        if let Some(token) = source.storage()?.load()? {
            debug!("Using hub token from {:?}", source_label(source));
            return Ok(token);
        }
    }
    Err(Error::EmptyToken)
}

fn source_label(source: &CredentialSource) -> String {
    match source {
        CredentialSource::Token(_) => "command line".to_string(),
        CredentialSource::Env(var) => format!("${}", var),
        CredentialSource::File(Some(path)) => path.display().to_string(),
        CredentialSource::File(None) => "default token file".to_string(),
    }
}
