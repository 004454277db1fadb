// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Folder layout shared by the source dataset and its renumbered copy.
//!
//! A sample is spread over three sibling folders, one per [`Role`]. The same
//! [`FolderSet`] type describes both the original folders and the
//! destination folders the pipeline writes to.

use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

/// The part a file plays within a sample.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Primary camera frame (`.jpg`).
    Image,
    /// Auxiliary image rendered from IMU readings (`.png`).
    Imu,
    /// Per-pixel segmentation mask (`.png`).
    Mask,
}

impl Role {
    /// Every role in column order.
    pub const ALL: [Role; 3] = [Role::Image, Role::Imu, Role::Mask];

    /// Column name of the role in published records.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Image => "image",
            Role::Imu => "imu",
            Role::Mask => "mask",
        }
    }

    /// Extension of the renumbered file for this role.
    ///
    /// Auxiliary and mask files are always written as `png`, whatever the
    /// source used.
    pub fn extension(&self) -> &'static str {
        match self {
            Role::Image => "jpg",
            Role::Imu | Role::Mask => "png",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Three sibling folders holding the images, IMU overlays and masks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FolderSet {
    pub images: PathBuf,
    pub imus: PathBuf,
    pub masks: PathBuf,
}

impl FolderSet {
    /// Build a folder set from a root and the three folder names under it.
    pub fn new(root: impl AsRef<Path>, images: &str, imus: &str, masks: &str) -> Self {
        let root = root.as_ref();
        FolderSet {
            images: root.join(images),
            imus: root.join(imus),
            masks: root.join(masks),
        }
    }

    /// Folder holding the files of `role`.
    pub fn folder(&self, role: Role) -> &Path {
        match role {
            Role::Image => &self.images,
            Role::Imu => &self.imus,
            Role::Mask => &self.masks,
        }
    }

    /// Path of the renumbered file for `role` under identifier `id`.
    pub fn file(&self, role: Role, id: impl Display) -> PathBuf {
        self.folder(role)
            .join(format!("{}.{}", id, role.extension()))
    }

    /// Iterate the folders in role order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &Path)> {
        Role::ALL.into_iter().map(move |role| (role, self.folder(role)))
    }
}
