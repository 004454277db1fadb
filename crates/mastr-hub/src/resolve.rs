// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Locate the companion files of a primary image.
//!
//! The mask of `<base>.jpg` is always `<base>m.png`. The IMU overlay normally
//! shares the base name, except for the legacy frames whose base name starts
//! with `old`: those were exported as `old_imu_<ID>.png`, where `<ID>` is the
//! last `_`-separated segment of the base name.

use crate::{Error, FolderSet, Role};
use std::path::{Path, PathBuf};

/// Base-name prefix of the frames with the legacy IMU naming.
pub const LEGACY_PREFIX: &str = "old";

/// Character appended to the base name of a mask file.
pub const MASK_SUFFIX: char = 'm';

/// Extension of the source IMU and mask files.
pub const COMPANION_EXTENSION: &str = "png";

/// How the IMU overlay of a sample is named on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImuNaming {
    /// `<imus>/<base>.png`
    Standard,
    /// `<imus>/old_imu_<id>.png`
    Legacy { id: String },
}

impl ImuNaming {
    /// Select the naming scheme for a base name.
    pub fn for_base_name(base_name: &str) -> Self {
        if is_legacy_name(base_name) {
            let id = base_name.rsplit('_').next().unwrap_or(base_name);
            ImuNaming::Legacy { id: id.to_string() }
        } else {
            ImuNaming::Standard
        }
    }

    /// Path of the IMU overlay under `imus`.
    pub fn path(&self, imus: &Path, base_name: &str) -> PathBuf {
        match self {
            ImuNaming::Standard => imus.join(format!("{}.{}", base_name, COMPANION_EXTENSION)),
            ImuNaming::Legacy { id } => {
                imus.join(format!("{}_imu_{}.{}", LEGACY_PREFIX, id, COMPANION_EXTENSION))
            }
        }
    }
}

/// True when the IMU overlay of `base_name` uses the legacy naming.
pub fn is_legacy_name(base_name: &str) -> bool {
    base_name.starts_with(LEGACY_PREFIX)
}

/// The three source files of one sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSample {
    /// File name of the primary image without its extension.
    pub base_name: String,
    pub naming: ImuNaming,
    pub image: PathBuf,
    pub imu: PathBuf,
    pub mask: PathBuf,
}

impl SourceSample {
    /// Derive the sample paths for the primary image `file_name`.
    ///
    /// Only computes paths; see [`SourceSample::verify`] for the existence
    /// check.
    pub fn resolve(source: &FolderSet, file_name: &str) -> Result<Self, Error> {
        let base_name = Path::new(file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| Error::InvalidFileName(file_name.to_string()))?
            .to_string();

        let naming = ImuNaming::for_base_name(&base_name);
        let imu = naming.path(&source.imus, &base_name);
        let mask = source.masks.join(format!(
            "{}{}.{}",
            base_name, MASK_SUFFIX, COMPANION_EXTENSION
        ));

        Ok(SourceSample {
            image: source.images.join(file_name),
            imu,
            mask,
            naming,
            base_name,
        })
    }

    /// Source path of the file playing `role`.
    pub fn path(&self, role: Role) -> &Path {
        match role {
            Role::Image => &self.image,
            Role::Imu => &self.imu,
            Role::Mask => &self.mask,
        }
    }

    /// Fail with [`Error::MissingArtifact`] unless both companions are
    /// regular files.
    pub async fn verify(&self) -> Result<(), Error> {
        for role in [Role::Imu, Role::Mask] {
            let path = self.path(role);
            let is_file = match tokio::fs::metadata(path).await {
                Ok(meta) => meta.is_file(),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
                Err(err) => return Err(err.into()),
            };
            if !is_file {
                return Err(Error::MissingArtifact {
                    role,
                    sample: self.base_name.clone(),
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source() -> FolderSet {
        FolderSet::new("src", "images", "imus", "masks")
    }

    #[test]
    fn test_standard_naming() {
        let sample = SourceSample::resolve(&source(), "0001_frame.jpg").unwrap();
        assert_eq!(sample.base_name, "0001_frame");
        assert_eq!(sample.naming, ImuNaming::Standard);
        assert_eq!(sample.image, PathBuf::from("src/images/0001_frame.jpg"));
        assert_eq!(sample.imu, PathBuf::from("src/imus/0001_frame.png"));
        assert_eq!(sample.mask, PathBuf::from("src/masks/0001_framem.png"));
    }

    #[test]
    fn test_legacy_naming_uses_last_segment() {
        let sample = SourceSample::resolve(&source(), "old_scene_7.jpg").unwrap();
        assert_eq!(
            sample.naming,
            ImuNaming::Legacy {
                id: "7".to_string()
            }
        );
        assert_eq!(sample.imu, PathBuf::from("src/imus/old_imu_7.png"));
        assert_eq!(sample.mask, PathBuf::from("src/masks/old_scene_7m.png"));
    }

    #[test]
    fn test_legacy_without_underscore_keeps_base_name() {
        assert_eq!(
            ImuNaming::for_base_name("old"),
            ImuNaming::Legacy {
                id: "old".to_string()
            }
        );
    }

    #[test]
    fn test_primary_extension_is_kept() {
        let sample = SourceSample::resolve(&source(), "a.JPG").unwrap();
        assert_eq!(sample.image, PathBuf::from("src/images/a.JPG"));
        assert_eq!(sample.mask, PathBuf::from("src/masks/am.png"));
    }

    #[test]
    fn test_invalid_file_name() {
        assert!(matches!(
            SourceSample::resolve(&source(), ""),
            Err(Error::InvalidFileName(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_reports_missing_mask() {
        let temp_dir = TempDir::new().unwrap();
        let source = FolderSet::new(temp_dir.path(), "images", "imus", "masks");
        for (_, folder) in source.iter() {
            std::fs::create_dir_all(folder).unwrap();
        }
        std::fs::write(source.images.join("a.jpg"), b"jpg").unwrap();
        std::fs::write(source.imus.join("a.png"), b"png").unwrap();

        let sample = SourceSample::resolve(&source, "a.jpg").unwrap();
        match sample.verify().await {
            Err(Error::MissingArtifact { role, sample, path }) => {
                assert_eq!(role, Role::Mask);
                assert_eq!(sample, "a");
                assert_eq!(path, source.masks.join("am.png"));
            }
            other => panic!("expected missing mask, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_rejects_directory_companion() {
        let temp_dir = TempDir::new().unwrap();
        let source = FolderSet::new(temp_dir.path(), "images", "imus", "masks");
        for (_, folder) in source.iter() {
            std::fs::create_dir_all(folder).unwrap();
        }
        std::fs::create_dir(source.imus.join("a.png")).unwrap();
        std::fs::write(source.masks.join("am.png"), b"png").unwrap();

        let sample = SourceSample::resolve(&source, "a.jpg").unwrap();
        assert!(matches!(
            sample.verify().await,
            Err(Error::MissingArtifact {
                role: Role::Imu,
                ..
            })
        ));
    }
}
