// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {std::path::PathBuf, thiserror::Error};

/// Primary crate error type.
///
/// Every variant is fatal to a pipeline run. Recoverable conditions are
/// represented by [crate::stage::StageWarning] instead.
#[derive(Debug, Error)]
pub enum PackagerError {
    #[error("{value} is not allowed {field}, allowed: {allowed}")]
    Configuration {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("failed to copy {} to {}: {error:?}", .source_path.display(), .destination.display())]
    CopyFailure {
        source_path: PathBuf,
        destination: PathBuf,
        error: std::io::Error,
    },

    #[error("cannot derive man page section from file name: {0}")]
    ManPageSection(String),

    #[error("{program} exited with status {status:?}:\n{output}")]
    ExternalTool {
        program: String,
        status: Option<i32>,
        output: String,
    },

    #[error("unable to run {0}: {1:?}")]
    ExternalToolSpawn(String, std::io::Error),

    #[error("{0} did not finish within {1} seconds")]
    ExternalToolTimeout(String, u64),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("directory walk error: {0:?}")]
    WalkDir(#[from] walkdir::Error),

    #[error("path prefix error: {0:?}")]
    StripPrefix(#[from] std::path::StripPrefixError),
}

impl PackagerError {
    /// Construct a [Self::IoPath] from a path and the error encountered on it.
    pub fn io_path(path: impl AsRef<std::path::Path>, error: std::io::Error) -> Self {
        Self::IoPath(format!("{}", path.as_ref().display()), error)
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, PackagerError>;
