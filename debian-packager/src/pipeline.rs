// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Running a package build from start to finish.

A build progresses through a fixed sequence of [Stage]s. Any error returned
from a stage halts the build and leaves the staging tree as it was at the
time of failure. Recoverable conditions are collected as [StageWarning]s and
returned in the [PipelineReport].
*/

use {
    crate::{
        autostart::write_autostart_entries,
        changelog::write_changelogs,
        checksums::write_md5sums,
        context::BuildContext,
        control::write_control,
        copyright::{current_year, write_copyright},
        deb::{build_package, BuildCommand},
        error::{PackagerError, Result},
        lint::{reconcile, run_lint, LintCommand, LintPolicy, Outcome},
        scripts::ScriptGenerator,
        spec::{PackageDescription, PackageSpec},
        stage::{ConffileRegistry, FileEntry, FileStager, StageWarning},
        tool::ExternalTool,
        watch::write_watch,
    },
    log::{debug, info},
    std::path::PathBuf,
};

/// Progress of a build.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    Validated,
    Staged,
    MetadataWritten,
    ScriptsWritten,
    ChecksummedManifest,
    Built,
    Cleaned,
    Preserved,
}

fn enter(stage: Stage) {
    debug!("entered stage {:?}", stage);
}

/// Result of a build that did not fail fatally.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// The validated spec the build ran with.
    pub spec: PackageSpec,
    /// Last stage reached.
    pub stage: Stage,
    /// Path of the built `.deb`. [None] if only assembly was requested.
    pub artifact: Option<PathBuf>,
    /// [None] if only assembly was requested.
    pub outcome: Option<Outcome>,
    pub warnings: Vec<StageWarning>,
}

/// A configurable package build.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    build_command: BuildCommand,
    lint_command: LintCommand,
    lint_policy: LintPolicy,
    copyright_year: Option<i32>,
    assemble_only: bool,
}

impl Pipeline {
    #[must_use]
    pub fn with_build_command(mut self, command: BuildCommand) -> Self {
        self.build_command = command;
        self
    }

    #[must_use]
    pub fn with_lint_command(mut self, command: LintCommand) -> Self {
        self.lint_command = command;
        self
    }

    #[must_use]
    pub fn with_lint_policy(mut self, policy: LintPolicy) -> Self {
        self.lint_policy = policy;
        self
    }

    /// Use a fixed year in the copyright file instead of the current one.
    #[must_use]
    pub fn with_copyright_year(mut self, year: i32) -> Self {
        self.copyright_year = Some(year);
        self
    }

    /// Stop after the staging tree is assembled, without building or linting.
    #[must_use]
    pub fn with_assemble_only(mut self, assemble_only: bool) -> Self {
        self.assemble_only = assemble_only;
        self
    }

    pub fn lint_policy(&self) -> &LintPolicy {
        &self.lint_policy
    }

    /// Create the staging and metadata directories and start a fresh conffiles list.
    pub fn prepare(&self, context: &BuildContext) -> Result<ConffileRegistry> {
        for dir in [context.staging_root(), context.metadata_dir()] {
            std::fs::create_dir_all(dir).map_err(|e| PackagerError::io_path(dir, e))?;
        }

        ConffileRegistry::open(context.metadata_path("conffiles"))
    }

    /// Populate the staging tree with files and metadata.
    ///
    /// On success the tree is ready to be handed to the build tool.
    pub fn assemble(
        &self,
        context: &BuildContext,
        spec: &PackageSpec,
        files: &[FileEntry],
    ) -> Result<Vec<StageWarning>> {
        let mut conffiles = self.prepare(context)?;

        let mut stager = FileStager::new(context, &mut conffiles);
        stager.stage_entries(files)?;
        let mut warnings = stager.into_warnings();
        write_autostart_entries(context, spec, &mut conffiles)?;
        enter(Stage::Staged);

        let size = write_control(context, spec)?;
        info!("installed size {} KiB", size);
        write_changelogs(context, spec)?;
        let year = self.copyright_year.unwrap_or_else(current_year);
        write_copyright(context, spec, year)?;
        write_watch(context, spec)?;
        enter(Stage::MetadataWritten);

        let mut scripts = ScriptGenerator::new(context, spec);
        scripts.write_all()?;
        warnings.extend(scripts.into_warnings());
        enter(Stage::ScriptsWritten);

        let checksums = write_md5sums(context)?;
        info!("{} files in checksum manifest", checksums.len());
        enter(Stage::ChecksummedManifest);

        Ok(warnings)
    }

    /// Run a build of a package description.
    pub fn run(
        &self,
        context: &BuildContext,
        description: &PackageDescription,
        tool: &dyn ExternalTool,
    ) -> Result<PipelineReport> {
        let spec = description.validate()?;
        info!("building {} {}", spec.name, spec.version);
        enter(Stage::Validated);

        let warnings = self.assemble(context, &spec, &description.files)?;

        if self.assemble_only {
            info!("staging tree assembled at {}", context.staging_root().display());

            return Ok(PipelineReport {
                spec,
                stage: Stage::ChecksummedManifest,
                artifact: None,
                outcome: None,
                warnings,
            });
        }

        let built = build_package(tool, &self.build_command, context, &spec)?;
        enter(Stage::Built);

        let lint = run_lint(tool, &self.lint_command, &built.path);
        let outcome = reconcile(context, &self.lint_policy, &lint)?;

        let stage = match outcome {
            Outcome::Cleaned => Stage::Cleaned,
            Outcome::Preserved { .. } => Stage::Preserved,
        };
        enter(stage);

        Ok(PipelineReport {
            spec,
            stage,
            artifact: Some(built.path),
            outcome: Some(outcome),
            warnings,
        })
    }
}

/// Build a package with default settings.
pub fn setup(
    context: &BuildContext,
    description: &PackageDescription,
    tool: &dyn ExternalTool,
) -> Result<PipelineReport> {
    Pipeline::default().run(context, description, tool)
}
