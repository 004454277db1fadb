// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Copy every sample under a sequential, zero-padded identifier.
//!
//! Primary images are sorted by file name and numbered from `0001`. For each
//! one the companions are resolved and checked, then the three files are
//! copied into the destination folders as `<id>.jpg`, `<id>.png` and
//! `<id>.png`. The first missing companion aborts the stage; samples copied
//! before it stay on disk.

use crate::{Error, FolderSet, Progress, Role, SourceSample};
use log::{debug, info};
use std::{
    fmt::Display,
    fs::FileTimes,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::{fs, sync::mpsc::Sender};
use walkdir::WalkDir;

/// Extension selecting the primary images, compared case-insensitively.
pub const PRIMARY_EXTENSION: &str = "jpg";

/// Width of the zero-padded identifier.
pub const ID_WIDTH: usize = 4;

/// Sequential identifier of a renumbered sample, displayed as `0001`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleId(u32);

impl SampleId {
    /// Largest identifier that fits the fixed width.
    pub const MAX: u32 = 9999;

    /// Identifier of the sample at 1-based position `index`.
    pub fn new(index: u32) -> Result<Self, Error> {
        if index == 0 || index > Self::MAX {
            return Err(Error::InvalidParameters(format!(
                "sample index {} outside 1..={}",
                index,
                Self::MAX
            )));
        }
        Ok(SampleId(index))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:0width$}", self.0, width = ID_WIDTH)
    }
}

impl FromStr for SampleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ID_WIDTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidFileName(s.to_string()));
        }
        let value = s
            .parse::<u32>()
            .map_err(|_| Error::InvalidFileName(s.to_string()))?;
        SampleId::new(value)
    }
}

/// One sample copied into the destination folders.
#[derive(Clone, Debug)]
pub struct CopiedSample {
    pub id: SampleId,
    pub source: SourceSample,
    pub image: PathBuf,
    pub imu: PathBuf,
    pub mask: PathBuf,
}

impl CopiedSample {
    /// Destination path of the file playing `role`.
    pub fn path(&self, role: Role) -> &Path {
        match role {
            Role::Image => &self.image,
            Role::Imu => &self.imu,
            Role::Mask => &self.mask,
        }
    }
}

/// Result of the copy stage, in identifier order.
#[derive(Clone, Debug, Default)]
pub struct CopyReport {
    pub samples: Vec<CopiedSample>,
}

impl CopyReport {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// List the primary image file names of `images`, sorted lexicographically.
///
/// Only regular files directly inside the folder whose extension is `jpg`
/// in any case are returned.
pub fn primary_images(images: &Path) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    for entry in WalkDir::new(images).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            Error::IoError(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other(format!("cannot list {:?}", images))
            }))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_primary = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PRIMARY_EXTENSION));
        if !is_primary {
            continue;
        }
        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| Error::InvalidFileName(entry.path().display().to_string()))?;
        names.push(name.to_string());
    }
    names.sort();
    Ok(names)
}

/// Copy every sample of `source` into `dest` under sequential identifiers.
///
/// A progress line is logged every `progress_interval` samples and after
/// the last one; `progress` additionally receives an update per sample.
pub async fn rename_and_copy(
    source: &FolderSet,
    dest: &FolderSet,
    progress_interval: usize,
    progress: Option<Sender<Progress>>,
) -> Result<CopyReport, Error> {
    let names = primary_images(&source.images)?;
    let total = names.len();
    info!("Found {} original .jpg files in {:?}.", total, source.images);

    if total > SampleId::MAX as usize {
        return Err(Error::InvalidParameters(format!(
            "{} samples exceed the {}-digit identifier range",
            total, ID_WIDTH
        )));
    }

    if let Some(progress) = &progress {
        let _ = progress.send(Progress { current: 0, total }).await;
    }

    let mut report = CopyReport {
        samples: Vec::with_capacity(total),
    };

    for (index, name) in names.iter().enumerate() {
        let position = index + 1;
        let id = SampleId::new(position as u32)?;

        let sample = SourceSample::resolve(source, name)?;
        sample.verify().await?;

        let copied = CopiedSample {
            id,
            image: dest.file(Role::Image, id),
            imu: dest.file(Role::Imu, id),
            mask: dest.file(Role::Mask, id),
            source: sample,
        };
        for role in Role::ALL {
            copy_preserving_metadata(copied.source.path(role), copied.path(role)).await?;
        }
        debug!("{} -> {}", name, id);

        if logs_progress(position, total, progress_interval) {
            info!(
                "  → Copied {}/{}: {} → {}.(jpg/png)",
                position, total, name, id
            );
        }
        if let Some(progress) = &progress {
            let _ = progress
                .send(Progress {
                    current: position,
                    total,
                })
                .await;
        }

        report.samples.push(copied);
    }

    Ok(report)
}

/// True when a progress line is due after copying sample `position`.
fn logs_progress(position: usize, total: usize, interval: usize) -> bool {
    position % interval.max(1) == 0 || position == total
}

/// Copy contents and permissions, then carry over access and modification
/// times.
async fn copy_preserving_metadata(src: &Path, dst: &Path) -> Result<(), Error> {
    fs::copy(src, dst).await?;

    let meta = fs::metadata(src).await?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    let file = open_for_times(dst).await?.into_std().await;
    file.set_times(times)?;
    Ok(())
}

/// Open `path` with the access `set_times` needs.
///
/// Unix only checks ownership, so a read handle works even when the copy is
/// read-only. Windows needs `FILE_WRITE_ATTRIBUTES` on the handle.
async fn open_for_times(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    #[cfg(windows)]
    {
        const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
        options.access_mode(FILE_WRITE_ATTRIBUTES);
    }
    #[cfg(not(windows))]
    options.read(true);
    options.open(path).await
}
