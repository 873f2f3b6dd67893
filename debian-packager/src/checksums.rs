// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The `md5sums` manifest of installed files. */

use {
    crate::{
        context::BuildContext,
        error::{PackagerError, Result},
        io::file_md5_hex,
    },
    std::{
        fs::File,
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
};

/// A line in an `md5sums` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChecksumEntry {
    /// Hex MD5 digest of the file content.
    pub digest: String,
    /// Path relative to the staging root.
    pub path: PathBuf,
}

impl ChecksumEntry {
    /// Write this entry as a manifest line.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.digest.as_bytes())?;
        writer.write_all(b"  ")?;
        writer.write_all(self.path.to_string_lossy().as_bytes())?;
        writer.write_all(b"\n")
    }
}

/// Compute checksums of every regular file under `root`, skipping `exclude`.
///
/// The walk is depth-first with siblings in file name order. `exclude` is
/// compared by path identity, so only that exact directory is pruned.
pub fn collect_checksums(root: &Path, exclude: &Path) -> Result<Vec<ChecksumEntry>> {
    let mut entries = vec![];

    let walk = walkdir::WalkDir::new(root)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|entry| entry.path() != exclude);

    for entry in walk {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        entries.push(ChecksumEntry {
            digest: file_md5_hex(entry.path())?,
            path: entry.path().strip_prefix(root)?.to_path_buf(),
        });
    }

    Ok(entries)
}

/// Regenerate `DEBIAN/md5sums` from the staging tree.
pub fn write_md5sums(context: &BuildContext) -> Result<Vec<ChecksumEntry>> {
    let path = context.metadata_path("md5sums");
    let entries = collect_checksums(context.staging_root(), context.metadata_dir())?;

    let fh = File::create(&path).map_err(|e| PackagerError::io_path(&path, e))?;
    let mut writer = BufWriter::new(fh);
    for entry in &entries {
        entry
            .write(&mut writer)
            .map_err(|e| PackagerError::io_path(&path, e))?;
    }
    writer.flush().map_err(|e| PackagerError::io_path(&path, e))?;

    Ok(entries)
}
