// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Create or empty the destination folders.

use crate::{Error, FolderSet};
use log::{debug, info};
use std::path::Path;
use tokio::fs;

/// Ensure every destination folder exists and holds no files.
///
/// Existing folders lose every file directly inside them; sub-folders are
/// left untouched. Missing folders are created along with their parents.
/// The destination is scratch space: anything in it is lost.
pub async fn prepare_dirs(dest: &FolderSet) -> Result<(), Error> {
    for (role, folder) in dest.iter() {
        if fs::metadata(folder)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            let removed = clear_dir(folder).await?;
            info!("Cleared {} files from {} folder {:?}", removed, role, folder);
        } else {
            fs::create_dir_all(folder).await?;
            info!("Created {} folder {:?}", role, folder);
        }
    }
    Ok(())
}

async fn clear_dir(folder: &Path) -> Result<usize, Error> {
    let mut removed = 0;
    let mut entries = fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            debug!("Keeping sub-folder {:?}", entry.path());
            continue;
        }
        fs::remove_file(entry.path()).await?;
        removed += 1;
    }
    Ok(removed)
}
