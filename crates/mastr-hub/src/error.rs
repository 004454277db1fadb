// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{Role, storage::StorageError};
use std::path::PathBuf;

/// Error type for every stage of the renumber and publish pipeline.
///
/// Almost every variant is fatal for a run. The one failure the pipeline
/// tolerates, a rejected repository creation, is caught by the publisher and
/// never surfaces through this type.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// HTTP request error from the reqwest client.
    HttpError(reqwest::Error),
    /// URL parsing error.
    UrlParseError(url::ParseError),
    /// Token storage could not be read or written.
    StorageError(StorageError),
    /// A companion artifact of a primary image does not exist.
    MissingArtifact {
        /// Role of the missing file.
        role: Role,
        /// Base name of the primary image the file belongs to.
        sample: String,
        /// Path that was expected to exist.
        path: PathBuf,
    },
    /// A file name could not be interpreted (not UTF-8 or no stem).
    InvalidFileName(String),
    /// The hub answered with a non-success status code.
    HubError(u16, String),
    /// The hub returned an invalid or unexpected response.
    InvalidResponse,
    /// No token was found in any credential source.
    EmptyToken,
    /// The hub rejected the token for the requested operation.
    Unauthorized,
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
    /// Attempted to use a feature that is not enabled.
    FeatureNotEnabled(String),
    /// Polars dataframe operation error (only with "polars" feature).
    #[cfg(feature = "polars")]
    PolarsError(polars::error::PolarsError),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpError(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UrlParseError(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::StorageError(err)
    }
}

#[cfg(feature = "polars")]
impl From<polars::error::PolarsError> for Error {
    fn from(err: polars::error::PolarsError) -> Self {
        Error::PolarsError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::HttpError(e) => write!(f, "HTTP error: {}", e),
            Error::UrlParseError(e) => write!(f, "URL parse error: {}", e),
            Error::StorageError(e) => write!(f, "Token storage error: {}", e),
            Error::MissingArtifact { role, sample, path } => write!(
                f,
                "Missing {} for {} : {}",
                role.name(),
                sample,
                path.display()
            ),
            Error::InvalidFileName(s) => write!(f, "Invalid file name: {}", s),
            Error::HubError(status, body) => write!(f, "Hub error {}: {}", status, body),
            Error::InvalidResponse => write!(f, "Invalid hub response"),
            Error::EmptyToken => write!(f, "Authentication token is empty"),
            Error::Unauthorized => write!(f, "Unauthorized access"),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
            Error::FeatureNotEnabled(s) => write!(f, "Feature not enabled: {}", s),
            #[cfg(feature = "polars")]
            Error::PolarsError(e) => write!(f, "Polars error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::HttpError(e) => Some(e),
            Error::UrlParseError(e) => Some(e),
            Error::StorageError(e) => Some(e),
            #[cfg(feature = "polars")]
            Error::PolarsError(e) => Some(e),
            _ => None,
        }
    }
}
