// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Serialize a split into the files of a hub dataset repository.
//!
//! Records are written to parquet shards under `data/`, each image column a
//! struct of the embedded file `bytes` and its file name as `path`. A
//! `README.md` dataset card carries the schema and split sizes in its YAML
//! front matter so the hub viewer and the `datasets` loader pick them up.

use crate::{DatasetSplit, Error, Record, RepoFile};
use std::{ops::Range, path::Path};

/// Folder holding the parquet shards inside the repository.
pub const DATA_DIR: &str = "data";

/// Name of the dataset card.
pub const CARD_NAME: &str = "README.md";

/// Files and sizes of a packaged split.
#[derive(Clone, Debug)]
pub struct DatasetPackage {
    /// Shards followed by the dataset card.
    pub files: Vec<RepoFile>,
    pub num_examples: usize,
    /// Bytes of every embedded file.
    pub num_bytes: u64,
    /// Bytes of every parquet shard.
    pub download_size: u64,
}

/// Repository path of shard `index` out of `count`.
pub fn shard_path(split: &str, index: usize, count: usize) -> String {
    format!("{}/{}-{:05}-of-{:05}.parquet", DATA_DIR, split, index, count)
}

/// Group consecutive records into shards of at most `max_shard_size` bytes.
///
/// A record larger than the limit still gets a shard of its own.
pub fn plan_shards(sizes: &[u64], max_shard_size: u64) -> Vec<Range<usize>> {
    let mut shards = Vec::new();
    let mut start = 0;
    let mut used = 0u64;
    for (index, size) in sizes.iter().enumerate() {
        if index > start && used + size > max_shard_size {
            shards.push(start..index);
            start = index;
            used = 0;
        }
        used += size;
    }
    if start < sizes.len() {
        shards.push(start..sizes.len());
    }
    shards
}

/// Bytes embedded for one record.
fn record_size(record: &Record) -> Result<u64, Error> {
    let mut size = 0;
    for role in crate::Role::ALL {
        size += std::fs::metadata(record.path(role))?.len();
    }
    Ok(size)
}

/// Write `split` as parquet shards and a dataset card under `out_dir`.
///
/// The returned files carry repository paths relative to `out_dir`.
#[cfg(feature = "polars")]
pub fn write_package(
    split: &DatasetSplit,
    out_dir: &Path,
    max_shard_size: u64,
) -> Result<DatasetPackage, Error> {
    use log::{debug, info};

    if split.is_empty() {
        return Err(Error::InvalidParameters(format!(
            "split {} has no records",
            split.name()
        )));
    }

    let sizes = split
        .records()
        .iter()
        .map(record_size)
        .collect::<Result<Vec<_>, _>>()?;
    let num_bytes = sizes.iter().sum::<u64>();
    let shards = plan_shards(&sizes, max_shard_size);

    std::fs::create_dir_all(out_dir.join(DATA_DIR))?;

    let mut files = Vec::with_capacity(shards.len() + 1);
    for (index, range) in shards.iter().enumerate() {
        let path_in_repo = shard_path(split.name(), index, shards.len());
        let local = out_dir.join(&path_in_repo);
        write_shard(split, &split.records()[range.clone()], &local)?;
        let file = RepoFile::new(&path_in_repo, local)?;
        debug!(
            "Wrote {} ({} records, {} bytes)",
            file.path_in_repo,
            range.len(),
            file.size
        );
        files.push(file);
    }
    let download_size = files.iter().map(|file| file.size).sum::<u64>();

    let card = dataset_card(split, num_bytes, download_size);
    let card_path = out_dir.join(CARD_NAME);
    std::fs::write(&card_path, card)?;
    files.push(RepoFile::new(CARD_NAME, card_path)?);

    info!(
        "Packaged {} records into {} shard(s), {} bytes.",
        split.len(),
        shards.len(),
        download_size
    );

    Ok(DatasetPackage {
        files,
        num_examples: split.len(),
        num_bytes,
        download_size,
    })
}

#[cfg(not(feature = "polars"))]
pub fn write_package(
    _split: &DatasetSplit,
    _out_dir: &Path,
    _max_shard_size: u64,
) -> Result<DatasetPackage, Error> {
    Err(Error::FeatureNotEnabled("polars".to_string()))
}

#[cfg(feature = "polars")]
fn write_shard(split: &DatasetSplit, records: &[Record], output: &Path) -> Result<(), Error> {
    use polars::prelude::*;

    let mut columns: Vec<Column> = Vec::with_capacity(split.features().columns().len());
    for (name, _) in split.features().columns() {
        let role = crate::Role::ALL
            .into_iter()
            .find(|role| role.name() == name.as_str())
            .ok_or_else(|| Error::InvalidParameters(format!("unknown column {}", name)))?;

        let (bytes, paths): (Vec<Vec<u8>>, Vec<String>) = itertools::process_results(
            records.iter().map(|record| embed(record.path(role))),
            |iter| iter.unzip(),
        )?;

        let fields = [
            BinaryChunked::from_slice("bytes".into(), bytes.as_slice()).into_series(),
            StringChunked::from_slice("path".into(), paths.as_slice()).into_series(),
        ];
        let column = StructChunked::from_series(name.as_str().into(), records.len(), fields.iter())?
            .into_series();
        columns.push(column.into());
    }

    let mut df = DataFrame::new(columns)?;
    let mut file = std::fs::File::create(output)?;
    ParquetWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

/// Contents and file name of one embedded image.
#[cfg(feature = "polars")]
fn embed(path: &Path) -> Result<(Vec<u8>, String), Error> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidFileName(path.display().to_string()))?
        .to_string();
    Ok((std::fs::read(path)?, name))
}

/// Dataset card with the `dataset_info` and `configs` front matter.
pub fn dataset_card(split: &DatasetSplit, num_bytes: u64, download_size: u64) -> String {
    let mut card = String::from("---\ndataset_info:\n  features:\n");
    for (name, feature) in split.features().columns() {
        card.push_str(&format!("  - name: {}\n    dtype: {}\n", name, feature.dtype()));
    }
    card.push_str(&format!(
        "  splits:\n  - name: {split}\n    num_bytes: {num_bytes}\n    num_examples: {num_examples}\n  download_size: {download_size}\n  dataset_size: {num_bytes}\n",
        split = split.name(),
        num_examples = split.len(),
    ));
    card.push_str(&format!(
        "configs:\n- config_name: default\n  data_files:\n  - split: {split}\n    path: {data}/{split}-*\n---\n",
        split = split.name(),
        data = DATA_DIR,
    ));

    let columns = split
        .features()
        .columns()
        .iter()
        .map(|(name, _)| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(", ");
    card.push_str(&format!(
        "\n# MaSTr1325 (512x384)\n\nRenumbered maritime obstacle segmentation samples. \
         Every row holds the camera frame, the IMU horizon overlay and the \
         segmentation mask of one scene as image columns ({}).\n",
        columns
    ));
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Features, FolderSet, Role, SampleId};
    use tempfile::TempDir;

    #[test]
    fn test_plan_shards() {
        assert_eq!(plan_shards(&[10, 10, 10], 100), vec![0..3]);
        assert_eq!(plan_shards(&[10, 10, 10], 20), vec![0..2, 2..3]);
        assert_eq!(plan_shards(&[50, 10, 10], 20), vec![0..1, 1..3]);
        assert!(plan_shards(&[], 20).is_empty());
    }

    #[test]
    fn test_shard_path() {
        assert_eq!(shard_path("train", 0, 1), "data/train-00000-of-00001.parquet");
        assert_eq!(shard_path("train", 3, 12), "data/train-00003-of-00012.parquet");
    }

    fn split_with(temp_dir: &TempDir, count: u32) -> DatasetSplit {
        let dest = FolderSet::new(temp_dir.path().join("dest"), "images", "imus", "masks");
        let mut records = Vec::new();
        for (_, folder) in dest.iter() {
            std::fs::create_dir_all(folder).unwrap();
        }
        for index in 1..=count {
            let record = Record::for_id(&dest, SampleId::new(index).unwrap());
            for role in Role::ALL {
                std::fs::write(record.path(role), format!("{}-{}", role, index)).unwrap();
            }
            records.push(record);
        }
        DatasetSplit::new("train", Features::images(), records)
    }

    #[test]
    fn test_dataset_card_front_matter() {
        let temp_dir = TempDir::new().unwrap();
        let split = split_with(&temp_dir, 2);
        let card = dataset_card(&split, 42, 1000);

        assert!(card.starts_with("---\ndataset_info:\n"));
        assert!(card.contains("  - name: imu\n    dtype: image\n"));
        assert!(card.contains("    num_examples: 2\n"));
        assert!(card.contains("  dataset_size: 42\n"));
        assert!(card.contains("  download_size: 1000\n"));
        assert!(card.contains("    path: data/train-*\n---\n"));
    }

    #[cfg(feature = "polars")]
    #[test]
    fn test_write_package_round_trips_through_parquet() {
        use polars::prelude::*;

        let temp_dir = TempDir::new().unwrap();
        let split = split_with(&temp_dir, 3);
        let out_dir = temp_dir.path().join("package");

        let package = write_package(&split, &out_dir, 500_000_000).unwrap();
        assert_eq!(package.num_examples, 3);
        assert_eq!(package.files.len(), 2);
        assert_eq!(package.files[0].path_in_repo, "data/train-00000-of-00001.parquet");
        assert_eq!(package.files[1].path_in_repo, "README.md");

        let file = std::fs::File::open(&package.files[0].local).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(
            df.get_column_names_str(),
            vec!["image", "imu", "mask"]
        );
        let mask = df
            .column("mask")
            .unwrap()
            .as_materialized_series()
            .struct_()
            .unwrap()
            .clone();
        let paths = mask.field_by_name("path").unwrap();
        assert_eq!(paths.str().unwrap().get(2), Some("0003.png"));
        let bytes = mask.field_by_name("bytes").unwrap();
        assert_eq!(bytes.binary().unwrap().get(0), Some(&b"mask-1"[..]));
    }

    #[cfg(feature = "polars")]
    #[test]
    fn test_write_package_splits_shards() {
        let temp_dir = TempDir::new().unwrap();
        let split = split_with(&temp_dir, 3);

        // Each record embeds 18 bytes.
        let package = write_package(&split, &temp_dir.path().join("package"), 40).unwrap();
        let paths = package
            .files
            .iter()
            .map(|file| file.path_in_repo.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec![
                "data/train-00000-of-00002.parquet",
                "data/train-00001-of-00002.parquet",
                "README.md",
            ]
        );
        assert_eq!(package.num_bytes, 54);
    }

    #[test]
    fn test_empty_split_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let split = DatasetSplit::new("train", Features::images(), vec![]);
        assert!(write_package(&split, temp_dir.path(), 10).is_err());
    }
}
