// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers. */

use {
    crate::error::{PackagerError, Result},
    md5::Digest,
    std::{
        fs::File,
        io::{Read, Write},
        path::{Path, PathBuf},
    },
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Compress data as a `.gz` stream.
pub fn gzip_compress(reader: &mut impl Read) -> Result<Vec<u8>> {
    let mut buffer = vec![];

    let header = libflate::gzip::HeaderBuilder::new().finish();

    let mut encoder = libflate::gzip::Encoder::with_options(
        &mut buffer,
        libflate::gzip::EncodeOptions::new().header(header),
    )?;
    std::io::copy(reader, &mut encoder)?;
    encoder.finish().into_result()?;

    Ok(buffer)
}

/// Write gzip compressed data to a path, creating parent directories.
pub fn write_gzip(path: &Path, data: &[u8]) -> Result<()> {
    let compressed = gzip_compress(&mut std::io::Cursor::new(data))?;
    write_file(path, &compressed)
}

/// Write a file, creating its parent directory and replacing existing content.
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PackagerError::io_path(parent, e))?;
    }

    let mut fh = File::create(path).map_err(|e| PackagerError::io_path(path, e))?;
    fh.write_all(data)
        .map_err(|e| PackagerError::io_path(path, e))?;

    Ok(())
}

/// Compute the hex MD5 digest of content from a reader.
pub fn md5_hex(reader: &mut impl Read) -> Result<String> {
    let mut context = md5::Md5::new();

    let mut buffer = [0; 32768];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }

        context.update(&buffer[0..read]);
    }

    Ok(hex::encode(context.finalize()))
}

/// Compute the hex MD5 digest of a file.
pub fn file_md5_hex(path: &Path) -> Result<String> {
    let mut fh = File::open(path).map_err(|e| PackagerError::io_path(path, e))?;
    md5_hex(&mut fh)
}

/// Add the execute bit for owner, group and other to a file's mode.
#[cfg(unix)]
pub fn add_executable_bits(path: &Path) -> Result<()> {
    let mut permissions = std::fs::metadata(path)
        .map_err(|e| PackagerError::io_path(path, e))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions).map_err(|e| PackagerError::io_path(path, e))?;

    Ok(())
}

#[cfg(windows)]
pub fn add_executable_bits(_path: &Path) -> Result<()> {
    Ok(())
}

/// Set an explicit mode on a file.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| PackagerError::io_path(path, e))
}

#[cfg(windows)]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn copy_failure(source: &Path, destination: &Path, error: std::io::Error) -> PackagerError {
    PackagerError::CopyFailure {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        error,
    }
}

/// Copy a single file, replacing any existing destination.
pub fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| copy_failure(source, destination, e))?;
    }

    std::fs::copy(source, destination).map_err(|e| copy_failure(source, destination, e))?;

    Ok(())
}

/// Recursively copy a directory, merging into an existing destination.
///
/// Returns the destination paths of copied regular files in walk order.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = vec![];

    let walk = walkdir::WalkDir::new(source).sort_by(|a, b| a.file_name().cmp(b.file_name()));

    for entry in walk {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(source)?;
        let dest_path = destination.join(rel_path);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path)
                .map_err(|e| copy_failure(entry.path(), &dest_path, e))?;
        } else {
            copy_file(entry.path(), &dest_path)?;
            copied.push(dest_path);
        }
    }

    Ok(copied)
}

/// Remove everything inside a directory, leaving the directory itself.
pub fn clear_directory(path: &Path) -> Result<()> {
    for entry in std::fs::read_dir(path).map_err(|e| PackagerError::io_path(path, e))? {
        let entry = entry?;
        let entry_path = entry.path();

        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&entry_path)
                .map_err(|e| PackagerError::io_path(&entry_path, e))?;
        } else {
            std::fs::remove_file(&entry_path)
                .map_err(|e| PackagerError::io_path(&entry_path, e))?;
        }
    }

    Ok(())
}
