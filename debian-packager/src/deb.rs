// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Building `.deb` files from a staging tree with `dpkg-deb`. */

use {
    crate::{
        context::BuildContext,
        error::{PackagerError, Result},
        spec::PackageSpec,
        tool::{ExternalTool, ToolOutput},
    },
    log::info,
    std::path::PathBuf,
};

/// Describes how to invoke the package build tool.
///
/// The staging root and the output path are appended to `args`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for BuildCommand {
    /// `fakeroot dpkg-deb --build`, so files are owned by root in the archive.
    fn default() -> Self {
        Self {
            program: "fakeroot".to_string(),
            args: vec!["dpkg-deb".to_string(), "--build".to_string()],
        }
    }
}

/// A `.deb` produced by [build_package].
#[derive(Clone, Debug)]
pub struct BuiltPackage {
    /// Path to the `.deb` file.
    pub path: PathBuf,
    /// Output of the build tool.
    pub output: ToolOutput,
}

/// Build the staging tree into `<output_dir>/<name>_<version>_<arch>.deb`.
///
/// A build tool exiting non-zero is fatal.
pub fn build_package(
    tool: &dyn ExternalTool,
    command: &BuildCommand,
    context: &BuildContext,
    spec: &PackageSpec,
) -> Result<BuiltPackage> {
    let path = context.output_dir().join(spec.artifact_name());

    let mut args = command.args.clone();
    args.push(context.staging_root().display().to_string());
    args.push(path.display().to_string());

    info!("building {}", path.display());
    let output = tool.run(&command.program, &args)?;

    if !output.success() {
        return Err(PackagerError::ExternalTool {
            program: command.program.clone(),
            status: output.status,
            output: output.combined_lossy(),
        });
    }

    info!("{}", output.combined_lossy().trim_end());

    Ok(BuiltPackage { path, output })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{spec::RawPackageSpec, tool::testutil::FakeTool},
    };

    fn spec() -> PackageSpec {
        let raw = RawPackageSpec {
            version: Some("2.1".to_string()),
            ..Default::default()
        };
        PackageSpec::from_raw("My Tool!", raw).unwrap()
    }

    #[test]
    fn invocation_arguments() -> Result<()> {
        let context = BuildContext::new("/src", 2);
        let tool = FakeTool::with_outputs([Ok(ToolOutput {
            status: Some(0),
            stdout: b"dpkg-deb: building package 'mytool'\n".to_vec(),
            stderr: vec![],
        })]);

        let built = build_package(&tool, &BuildCommand::default(), &context, &spec())?;
        assert_eq!(built.path, PathBuf::from("/src/mytool_2.1_all.deb"));

        let invocations = tool.invocations.borrow();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "fakeroot");
        assert_eq!(
            invocations[0].1,
            vec!["dpkg-deb", "--build", "/src/build", "/src/mytool_2.1_all.deb"]
        );

        Ok(())
    }

    #[test]
    fn nonzero_exit_is_fatal() {
        let context = BuildContext::new("/src", 2);
        let tool = FakeTool::with_outputs([Ok(ToolOutput {
            status: Some(2),
            stdout: vec![],
            stderr: b"dpkg-deb: error: control file missing\n".to_vec(),
        })]);

        match build_package(&tool, &BuildCommand::default(), &context, &spec()) {
            Err(PackagerError::ExternalTool { program, status, output }) => {
                assert_eq!(program, "fakeroot");
                assert_eq!(status, Some(2));
                assert!(output.contains("control file missing"));
            }
            res => panic!("expected tool failure; got {:?}", res.map(|b| b.path)),
        }
    }
}
