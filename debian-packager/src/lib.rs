// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Assembly of Debian binary packages.

This crate turns a declarative package description into a `.deb` file. Files
and Python packages are copied into a *staging tree* mirroring the filesystem
of the target machine, Debian metadata is generated next to them, and the
tree is handed to `dpkg-deb` to produce the archive. The archive is then
checked with `lintian`.

# A Tour of Functionality

Package descriptions are defined by [spec::PackageDescription], typically
deserialized from YAML. Validating a description yields an immutable
[spec::PackageSpec] with defaults applied.

All filesystem locations used by a build are defined by a
[context::BuildContext]. Nothing in this crate reads paths from the process
environment.

[stage::FileStager] copies declared content into the staging tree. Metadata
files are emitted by the [control], [changelog], [copyright], [watch] and
[autostart] modules. Maintainer scripts are produced by
[scripts::ScriptGenerator] and the `md5sums` manifest by [checksums].

External programs are run through the [tool::ExternalTool] trait. [deb] drives
the package build tool and [lint] the package checker, which decides whether
the staging tree is cleared or preserved for inspection.

[pipeline::Pipeline] ties everything together. [pipeline::setup] runs a build
with default settings.

# Errors

Fatal errors are represented by [error::PackagerError]. Conditions that only
cause an item to be skipped are reported as [stage::StageWarning] and logged
through the `log` crate.
*/

pub mod autostart;
pub mod changelog;
pub mod checksums;
pub mod context;
pub mod control;
pub mod copyright;
pub mod deb;
pub mod error;
pub mod io;
pub mod lint;
pub mod pipeline;
pub mod scripts;
pub mod spec;
pub mod stage;
pub mod tool;
pub mod watch;
