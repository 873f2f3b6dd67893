// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Filesystem locations used during a package build. */

use std::path::{Path, PathBuf};

/// Name of the directory holding package metadata inside the staging root.
pub const METADATA_DIR_NAME: &str = "DEBIAN";

/// Filesystem layout of a single package build.
///
/// Instances are constructed once per run and passed to every stage. Nothing
/// in this crate consults the process environment for paths.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildContext {
    source_root: PathBuf,
    staging_root: PathBuf,
    metadata_dir: PathBuf,
    python_package_root: PathBuf,
    output_dir: PathBuf,
}

impl BuildContext {
    /// Construct an instance rooted at a source directory.
    ///
    /// Staging happens in `<source_root>/build` and the built package is
    /// written to `source_root`. Python packages are installed for
    /// `python_major_version`.
    pub fn new(source_root: impl AsRef<Path>, python_major_version: u8) -> Self {
        let source_root = source_root.as_ref().to_path_buf();
        let staging_root = source_root.join("build");

        Self {
            metadata_dir: staging_root.join(METADATA_DIR_NAME),
            staging_root,
            python_package_root: default_python_package_root(python_major_version),
            output_dir: source_root.clone(),
            source_root,
        }
    }

    /// Use a different staging directory.
    #[must_use]
    pub fn with_staging_root(mut self, path: impl AsRef<Path>) -> Self {
        self.staging_root = path.as_ref().to_path_buf();
        self.metadata_dir = self.staging_root.join(METADATA_DIR_NAME);
        self
    }

    /// Use a different absolute install root for Python packages.
    #[must_use]
    pub fn with_python_package_root(mut self, path: impl AsRef<Path>) -> Self {
        self.python_package_root = path.as_ref().to_path_buf();
        self
    }

    /// Write built packages to a different directory.
    #[must_use]
    pub fn with_output_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    /// Directory relative source paths are resolved against.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Root of the tree mirroring the installed filesystem.
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// The `DEBIAN` directory inside the staging root.
    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    /// Absolute install location of Python packages, e.g. `/usr/lib/python3/dist-packages`.
    pub fn python_package_root(&self) -> &Path {
        &self.python_package_root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolve a path declared in a package description.
    pub fn source_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.source_root.join(path)
    }

    /// Compute the staging location of an absolute install path.
    ///
    /// The install path is appended to the staging root, so `/usr/bin/foo`
    /// becomes `<staging_root>/usr/bin/foo`.
    pub fn staged_path(&self, install_path: impl AsRef<Path>) -> PathBuf {
        let install_path = install_path.as_ref();
        let relative = install_path.strip_prefix("/").unwrap_or(install_path);

        self.staging_root.join(relative)
    }

    /// Path of a file inside the metadata directory.
    pub fn metadata_path(&self, name: &str) -> PathBuf {
        self.metadata_dir.join(name)
    }

    /// Directory holding per-package documentation inside the staging root.
    pub fn doc_dir(&self, package: &str) -> PathBuf {
        self.staging_root.join("usr/share/doc").join(package)
    }
}

fn default_python_package_root(major_version: u8) -> PathBuf {
    PathBuf::from(format!("/usr/lib/python{}/dist-packages", major_version))
}
