// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Staging of package content.

Declared [FileEntry] instances are materialized into the staging root of a
[BuildContext], which mirrors the filesystem of the machine the package is
installed on. Destinations are classified as they are processed:

* Man pages are compressed and moved to `usr/share/man/man<N>`.
* Files under an `etc` directory are registered as conffiles.
* Files under a `bin` directory are made executable.

Python packages are declared by their dotted name and are installed into
[BuildContext::python_package_root].
*/

use {
    crate::{
        context::BuildContext,
        error::{PackagerError, Result},
        io::{add_executable_bits, copy_file, copy_tree, write_gzip},
    },
    log::{info, warn},
    once_cell::sync::Lazy,
    serde::Deserialize,
    std::{
        ffi::OsStr,
        fs::OpenOptions,
        io::Write,
        path::{Component, Path, PathBuf},
    },
    thiserror::Error,
};

/// File marking a directory as a Python package.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Extension of source files installed from Python packages.
const PACKAGE_SOURCE_EXTENSION: &str = "py";

static MAN_SECTION_RE: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"\.(\d+)$").expect("static regex is valid"));

/// Something to install as part of a package.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum FileEntry {
    /// A file or directory, relative to the source root, and its absolute install path.
    Path(PathBuf, PathBuf),

    /// A dotted Python package name, e.g. `mypkg.sub`.
    Package(String),
}

/// A recoverable condition encountered during a build.
///
/// The affected item is skipped and the build continues.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StageWarning {
    #[error("{} don't exist", .0.display())]
    MissingSource(PathBuf),

    #[error("{} is not a python package or module", .0.display())]
    NotAPackage(PathBuf),

    #[error("script fragment {} not found", .0.display())]
    MissingFragment(PathBuf),
}

/// The set of conffiles of a package, backed by the `conffiles` metadata file.
///
/// Paths are appended to the backing file as they are registered. Registering
/// the same path twice has no effect.
#[derive(Debug)]
pub struct ConffileRegistry {
    path: PathBuf,
    entries: Vec<String>,
}

impl ConffileRegistry {
    /// Start a new registry, truncating an existing backing file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            std::fs::File::create(&path).map_err(|e| PackagerError::io_path(&path, e))?;
        }

        Ok(Self {
            path,
            entries: vec![],
        })
    }

    /// Register an absolute install path.
    ///
    /// Returns whether the path was newly added.
    pub fn register(&mut self, install_path: impl Into<String>) -> Result<bool> {
        let install_path = install_path.into();

        if self.entries.contains(&install_path) {
            return Ok(false);
        }

        let mut fh = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PackagerError::io_path(&self.path, e))?;
        writeln!(fh, "{}", install_path).map_err(|e| PackagerError::io_path(&self.path, e))?;

        self.entries.push(install_path);

        Ok(true)
    }

    /// Registered paths, in registration order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn has_component(path: &Path, name: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(v) if v == OsStr::new(name)))
}

/// Whether a declared install path ends with a separator, e.g. `/etc/app/`.
fn names_directory(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().ends_with('/')
}

/// Whether an install path designates a man page.
///
/// Any `man` or `man<N>` directory component qualifies.
pub fn is_man_destination(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(v) => match v.to_str() {
            Some(s) => {
                s == "man"
                    || s.strip_prefix("man").map_or(false, |rest| {
                        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
                    })
            }
            None => false,
        },
        _ => false,
    })
}

/// Derive the man section from a man page file name, e.g. `3` for `foo.3`.
pub fn man_section(file_name: &str) -> Result<u32> {
    MAN_SECTION_RE
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| PackagerError::ManPageSection(file_name.to_string()))
}

/// Copies declared entries into the staging root.
pub struct FileStager<'a> {
    context: &'a BuildContext,
    conffiles: &'a mut ConffileRegistry,
    warnings: Vec<StageWarning>,
}

impl<'a> FileStager<'a> {
    pub fn new(context: &'a BuildContext, conffiles: &'a mut ConffileRegistry) -> Self {
        Self {
            context,
            conffiles,
            warnings: vec![],
        }
    }

    /// Warnings accumulated so far.
    pub fn warnings(&self) -> &[StageWarning] {
        &self.warnings
    }

    /// Consume self, returning accumulated warnings.
    pub fn into_warnings(self) -> Vec<StageWarning> {
        self.warnings
    }

    fn warn(&mut self, warning: StageWarning) {
        warn!("Warning: {}", warning);
        self.warnings.push(warning);
    }

    /// Stage entries in declaration order.
    pub fn stage_entries<'e>(&mut self, entries: impl IntoIterator<Item = &'e FileEntry>) -> Result<()> {
        for entry in entries {
            self.stage_entry(entry)?;
        }

        Ok(())
    }

    /// Stage a single entry.
    pub fn stage_entry(&mut self, entry: &FileEntry) -> Result<()> {
        match entry {
            FileEntry::Path(source, destination) => self.stage_path(source, destination),
            FileEntry::Package(name) => self.stage_package(name),
        }
    }

    fn stage_path(&mut self, source: &Path, destination: &Path) -> Result<()> {
        let source = self.context.source_path(source);

        if !source.exists() {
            self.warn(StageWarning::MissingSource(source));
            return Ok(());
        }

        if is_man_destination(destination) {
            return self.stage_man_page(&source);
        }

        let staged = self.context.staged_path(destination);
        info!("copying {} to {}", source.display(), staged.display());

        let files = if source.is_dir() {
            copy_tree(&source, &staged)?
        } else {
            let staged = match source.file_name() {
                Some(name) if names_directory(destination) || staged.is_dir() => staged.join(name),
                _ => staged,
            };
            copy_file(&source, &staged)?;
            vec![staged]
        };

        let is_conffile = has_component(destination, "etc");
        let is_binary = has_component(destination, "bin");

        for path in files {
            if is_conffile {
                let rel_path = path.strip_prefix(self.context.staging_root())?;
                self.conffiles
                    .register(format!("/{}", rel_path.display()))?;
            }
            if is_binary {
                add_executable_bits(&path)?;
            }
        }

        Ok(())
    }

    fn stage_man_page(&mut self, source: &Path) -> Result<()> {
        let file_name = source
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let section = man_section(&file_name)?;

        let dest = self
            .context
            .staging_root()
            .join("usr/share/man")
            .join(format!("man{}", section))
            .join(format!("{}.gz", file_name));
        info!("compressing {} to {}", source.display(), dest.display());

        let data = std::fs::read(source).map_err(|e| PackagerError::io_path(source, e))?;
        write_gzip(&dest, &data)
    }

    fn stage_package(&mut self, name: &str) -> Result<()> {
        let package_path = name
            .split('.')
            .fold(self.context.source_root().to_path_buf(), |p, part| p.join(part));

        if !package_path.exists() {
            self.warn(StageWarning::MissingSource(package_path));
            return Ok(());
        }

        let walk = walkdir::WalkDir::new(&package_path)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));

        for entry in walk {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.path();
            if !dir.join(PACKAGE_MARKER).is_file() {
                self.warn(StageWarning::NotAPackage(dir.to_path_buf()));
                continue;
            }

            let rel_dir = dir.strip_prefix(self.context.source_root())?;
            let install_dir = self.context.python_package_root().join(rel_dir);

            let mut sources = std::fs::read_dir(dir)
                .map_err(|e| PackagerError::io_path(dir, e))?
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(|e| PackagerError::io_path(dir, e))?;
            sources.sort_by_key(|e| e.file_name());

            for source in sources {
                let path = source.path();
                if !source.file_type()?.is_file()
                    || path.extension() != Some(OsStr::new(PACKAGE_SOURCE_EXTENSION))
                {
                    continue;
                }

                let staged = self
                    .context
                    .staged_path(install_dir.join(source.file_name()));
                info!("copying {} to {}", path.display(), staged.display());
                copy_file(&path, &staged)?;
            }
        }

        Ok(())
    }
}
