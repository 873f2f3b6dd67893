// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Installation of upstream changelogs. */

use {
    crate::{
        context::BuildContext,
        error::{PackagerError, Result},
        io::write_gzip,
        spec::PackageSpec,
    },
    log::info,
    std::path::PathBuf,
};

/// Read the declared upstream changelog.
///
/// An undeclared or missing changelog yields empty content.
pub fn read_upstream_changelog(context: &BuildContext, spec: &PackageSpec) -> Result<Vec<u8>> {
    let path = match &spec.changelog_file {
        Some(path) => context.source_path(path),
        None => return Ok(vec![]),
    };

    if path.is_file() {
        std::fs::read(&path).map_err(|e| PackagerError::io_path(&path, e))
    } else {
        Ok(vec![])
    }
}

/// Write `changelog.gz` and `changelog.Debian.gz` into the package doc directory.
///
/// Returns the written paths.
pub fn write_changelogs(context: &BuildContext, spec: &PackageSpec) -> Result<Vec<PathBuf>> {
    let content = read_upstream_changelog(context, spec)?;
    let doc_dir = context.doc_dir(&spec.name);

    let paths = vec![
        doc_dir.join("changelog.gz"),
        doc_dir.join("changelog.Debian.gz"),
    ];

    for path in &paths {
        info!("writing {}", path.display());
        write_gzip(path, &content)?;
    }

    Ok(paths)
}
