// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Linting built packages and deciding the fate of the staging tree.

After a `.deb` is built it is checked with `lintian`. A [LintPolicy] decides
whether the report is clean. A clean report results in the staging tree being
emptied. Otherwise the tree is preserved so the problems can be inspected.
*/

use {
    crate::{
        context::BuildContext,
        error::Result,
        io::clear_directory,
        tool::{ExternalTool, ToolOutput},
    },
    log::{info, warn},
    std::path::Path,
};

/// Output of a clean `lintian -Ivi` run, used as the length baseline.
pub const LINTIAN_BASELINE_OUTPUT: &str = "N: Using profile ubuntu/main.\n\
    N: Setting up lab in /tmp/temp-lintian-lab-XXXXXXXXXXXX ...\n\
    N: Unpacking packages in group observer/1.3.0-systemd\n\
    N: ----\n\
    N: Processing binary package observer (version 1.3.0-systemd, arch all) ...\n";

/// Bytes the lint output may differ from the baseline by.
pub const LINTIAN_BASELINE_TOLERANCE: usize = 10;

/// Describes how to invoke the lint tool.
///
/// The package path is appended to `args`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LintCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for LintCommand {
    fn default() -> Self {
        Self {
            program: "lintian".to_string(),
            args: vec!["-Ivi".to_string()],
        }
    }
}

/// Decides whether a lint report counts as success.
///
/// Any content on stderr is a failure under every policy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LintPolicy {
    /// The length of stdout is within `tolerance` bytes of `baseline` bytes.
    BaselineLength { baseline: usize, tolerance: usize },

    /// No stdout line carries an error (`E:`) or warning (`W:`) tag.
    NoDiagnostics,
}

impl Default for LintPolicy {
    fn default() -> Self {
        Self::BaselineLength {
            baseline: LINTIAN_BASELINE_OUTPUT.len(),
            tolerance: LINTIAN_BASELINE_TOLERANCE,
        }
    }
}

impl LintPolicy {
    /// Whether captured lint output passes this policy.
    pub fn accepts(&self, output: &ToolOutput) -> bool {
        if !output.stderr.is_empty() {
            return false;
        }

        match self {
            Self::BaselineLength {
                baseline,
                tolerance,
            } => output.stdout.len().abs_diff(*baseline) <= *tolerance,
            Self::NoDiagnostics => !output
                .stdout_lossy()
                .lines()
                .any(|line| line.starts_with("E:") || line.starts_with("W:")),
        }
    }
}

/// Terminal state of a pipeline run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Lint passed and the staging tree was emptied.
    Cleaned,

    /// Lint failed. The staging tree was left in place.
    Preserved { stdout: String, stderr: String },
}

/// Run the lint tool against a package.
///
/// Failure to run the tool is reported in the returned stderr rather than as an error.
pub fn run_lint(tool: &dyn ExternalTool, command: &LintCommand, package: &Path) -> ToolOutput {
    let mut args = command.args.clone();
    args.push(package.display().to_string());

    info!("checking {} with {}", package.display(), command.program);

    match tool.run(&command.program, &args) {
        Ok(output) => output,
        Err(e) => ToolOutput {
            status: None,
            stdout: vec![],
            stderr: format!("{}", e).into_bytes(),
        },
    }
}

/// Apply a lint policy, clearing the staging tree on success.
pub fn reconcile(context: &BuildContext, policy: &LintPolicy, output: &ToolOutput) -> Result<Outcome> {
    if policy.accepts(output) {
        info!("Building finished successfully");
        clear_directory(context.staging_root())?;
        info!("Build directory cleared");

        Ok(Outcome::Cleaned)
    } else {
        warn!("Building finished. Please review lintian report.");

        Ok(Outcome::Preserved {
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        })
    }
}
