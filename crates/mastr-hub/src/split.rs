// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Records and the published split.
//!
//! The split is rebuilt from the destination folders rather than from the
//! copy stage's report, so `publish` also works on a renumbered set left by
//! an earlier run.

use crate::{Error, FolderSet, Role, SampleId};
use log::debug;
use serde::{Serialize, ser::SerializeMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One published row: a file path per role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub image: PathBuf,
    pub imu: PathBuf,
    pub mask: PathBuf,
}

impl Record {
    /// Record of identifier `id` in the destination folders.
    pub fn for_id(dest: &FolderSet, id: SampleId) -> Self {
        Record {
            image: dest.file(Role::Image, id),
            imu: dest.file(Role::Imu, id),
            mask: dest.file(Role::Mask, id),
        }
    }

    pub fn path(&self, role: Role) -> &Path {
        match role {
            Role::Image => &self.image,
            Role::Imu => &self.imu,
            Role::Mask => &self.mask,
        }
    }
}

// Serialized as a role-name map so a printed record reads like a dataset row.
impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Role::ALL.len()))?;
        for role in Role::ALL {
            map.serialize_entry(role.name(), &self.path(role).to_string_lossy())?;
        }
        map.end()
    }
}

/// Column type in the dataset schema.
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "_type")]
pub enum FeatureType {
    /// Decodable image stored as `{bytes, path}`.
    Image,
}

impl FeatureType {
    /// `dtype` written in the dataset card.
    pub fn dtype(&self) -> &'static str {
        match self {
            FeatureType::Image => "image",
        }
    }
}

/// Ordered column schema of a split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Features {
    columns: Vec<(String, FeatureType)>,
}

impl Features {
    /// Every role as an image column.
    pub fn images() -> Self {
        Features {
            columns: Role::ALL
                .iter()
                .map(|role| (role.name().to_string(), FeatureType::Image))
                .collect(),
        }
    }

    pub fn columns(&self) -> &[(String, FeatureType)] {
        &self.columns
    }
}

impl Serialize for Features {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, feature) in &self.columns {
            map.serialize_entry(name, feature)?;
        }
        map.end()
    }
}

/// A named, ordered set of records with their schema.
#[derive(Clone, Debug)]
pub struct DatasetSplit {
    name: String,
    features: Features,
    records: Vec<Record>,
}

impl DatasetSplit {
    pub fn new(name: &str, features: Features, records: Vec<Record>) -> Self {
        DatasetSplit {
            name: name.to_string(),
            features,
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First `n` records, for a sanity check before upload.
    pub fn preview(&self, n: usize) -> &[Record] {
        &self.records[..n.min(self.records.len())]
    }
}

/// Identifiers of the renumbered primary images in `dest`, ascending.
///
/// Files with another extension are ignored. A `.jpg` that is not named
/// `<NNNN>.jpg` fails with [`Error::InvalidFileName`], so the split always
/// holds one record per image in the folder.
pub fn renumbered_ids(dest: &FolderSet) -> Result<Vec<SampleId>, Error> {
    let mut ids = Vec::new();
    for entry in WalkDir::new(&dest.images)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            Error::IoError(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other(format!("cannot list {:?}", dest.images))
            }))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(Role::Image.extension()) {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<SampleId>().ok())
            .ok_or_else(|| Error::InvalidFileName(path.display().to_string()))?;
        ids.push(id);
    }
    // Fixed-width names sort the same as their numbers.
    ids.sort();
    Ok(ids)
}

/// Build split `name` from the renumbered files in `dest`.
pub fn build_split(dest: &FolderSet, name: &str) -> Result<DatasetSplit, Error> {
    let records = renumbered_ids(dest)?
        .into_iter()
        .map(|id| Record::for_id(dest, id))
        .collect::<Vec<_>>();
    debug!("Built records for {} renamed samples.", records.len());
    Ok(DatasetSplit::new(name, Features::images(), records))
}
