// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Maintainer scripts.

Maintainer scripts are executed by `dpkg` around installation and removal of
a package. Every script we emit shares one template, which runs the body in
strict mode and reports failures to syslog via `logger` before exiting with
the failing status.
*/

use {
    crate::{
        context::BuildContext,
        error::{PackagerError, Result},
        io::{set_mode, write_file},
        spec::PackageSpec,
        stage::StageWarning,
    },
    log::{info, warn},
    once_cell::sync::Lazy,
    std::path::PathBuf,
    strum::IntoEnumIterator,
    strum_macros::{AsRefStr, Display, EnumIter},
};

static INTERPRETER_LINE_RE: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"\A#![^\n]*\n?").expect("static regex is valid"));

/// A maintainer script lifecycle hook.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumIter, Eq, Hash, PartialEq)]
pub enum MaintainerScript {
    #[strum(serialize = "preinst")]
    PreInst,
    #[strum(serialize = "postinst")]
    PostInst,
    #[strum(serialize = "prerm")]
    PreRm,
    #[strum(serialize = "postrm")]
    PostRm,
}

/// Render a maintainer script around a body.
///
/// `tag` identifies syslog messages and `package` is included in them.
pub fn render_script(tag: &str, package: &str, body: &str) -> String {
    format!(
        r#"#!/bin/bash
set -e # fail on any error
set -u # treat unset variables as errors

# ======[ Trap Errors ]======#
set -E # let shell functions inherit ERR trap

# Trap non-normal exit signals:
# 1/HUP, 2/INT, 3/QUIT, 15/TERM, ERR
trap err_handler 1 2 3 15 ERR
function err_handler {{
    local exit_status=${{1:-$?}}
    logger -s -p "syslog.err" -t "{tag}" "{package} script '$0' error code $exit_status (line $BASH_LINENO: '$BASH_COMMAND')"
    exit $exit_status
}}

{body}

exit 0
"#,
        tag = tag,
        package = package,
        body = body
    )
}

/// Remove a leading `#!` interpreter line from a shell fragment.
pub fn strip_interpreter_line(fragment: &str) -> &str {
    match INTERPRETER_LINE_RE.find(fragment) {
        Some(m) => &fragment[m.end()..],
        None => fragment,
    }
}

/// Assembles maintainer script bodies from a [PackageSpec].
pub struct ScriptGenerator<'a> {
    context: &'a BuildContext,
    spec: &'a PackageSpec,
    warnings: Vec<StageWarning>,
}

impl<'a> ScriptGenerator<'a> {
    pub fn new(context: &'a BuildContext, spec: &'a PackageSpec) -> Self {
        Self {
            context,
            spec,
            warnings: vec![],
        }
    }

    /// Consume self, returning warnings for fragments that could not be found.
    pub fn into_warnings(self) -> Vec<StageWarning> {
        self.warnings
    }

    /// Assemble the body of a script.
    ///
    /// `preinst` starts with a `pip` install directive per Python dependency.
    /// Registered shell fragments follow, each terminated by a newline.
    pub fn body(&mut self, script: MaintainerScript) -> Result<String> {
        let mut body = String::new();

        if script == MaintainerScript::PreInst {
            for package in &self.spec.python_depends {
                body.push_str(&format!(
                    "pip{} install {}\n",
                    self.spec.python_major_version, package
                ));
            }
        }

        for fragment in self.spec.fragments.for_script(script) {
            let path = self.context.source_path(fragment);

            if !path.is_file() {
                let warning = StageWarning::MissingFragment(path);
                warn!("Warning: {}", warning);
                self.warnings.push(warning);
                continue;
            }

            let content =
                std::fs::read_to_string(&path).map_err(|e| PackagerError::io_path(&path, e))?;
            body.push_str(strip_interpreter_line(&content));
            body.push('\n');
        }

        Ok(body)
    }

    /// Render the full text of a script.
    pub fn render(&mut self, script: MaintainerScript) -> Result<String> {
        let body = self.body(script)?;

        Ok(render_script(&self.spec.maintainer, &self.spec.name, &body))
    }

    /// Write all four scripts into the metadata directory with mode 0755.
    pub fn write_all(&mut self) -> Result<Vec<PathBuf>> {
        let mut paths = vec![];

        for script in MaintainerScript::iter() {
            let path = self.context.metadata_path(script.as_ref());
            info!("writing {}", path.display());

            let content = self.render(script)?;
            write_file(&path, content.as_bytes())?;
            set_mode(&path, 0o755)?;

            paths.push(path);
        }

        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::spec::RawPackageSpec};

    const TRAP_LINE: &str = "trap err_handler 1 2 3 15 ERR\n";

    #[test]
    fn template_structure() {
        let script = render_script("Jane", "tool", "echo hi\n");

        assert!(script.starts_with("#!/bin/bash\nset -e"));
        assert!(script.contains("set -u"));
        assert!(script.contains("set -E"));
        assert!(script.contains(TRAP_LINE));
        assert!(script.contains(
            "logger -s -p \"syslog.err\" -t \"Jane\" \"tool script '$0' error code $exit_status (line $BASH_LINENO: '$BASH_COMMAND')\""
        ));
        assert!(script.contains("local exit_status=${1:-$?}\n"));
        assert!(script.contains("\necho hi\n"));
        assert!(script.ends_with("\nexit 0\n"));
    }

    #[test]
    fn interpreter_line_stripping() {
        assert_eq!(strip_interpreter_line("#!/bin/sh\necho a\n"), "echo a\n");
        assert_eq!(strip_interpreter_line("#! /bin/bash\necho a"), "echo a");
        assert_eq!(
            strip_interpreter_line("#!/usr/bin/env bash\necho a"),
            "echo a"
        );
        assert_eq!(strip_interpreter_line("echo a\n#!/bin/sh\n"), "echo a\n#!/bin/sh\n");
    }

    #[test]
    fn preinst_body() -> Result<()> {
        let td = tempfile::tempdir()?;
        std::fs::write(td.path().join("pre.sh"), "#!/bin/sh\nmkdir -p /var/lib/tool\n")?;
        let context = BuildContext::new(td.path(), 3);

        let raw = RawPackageSpec {
            python_depends: vec!["requests".to_string(), "six".to_string()],
            python_major_version: Some(3),
            preinstall_ext_sh: vec!["pre.sh".into(), "missing.sh".into()],
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("tool", raw)?;

        let mut generator = ScriptGenerator::new(&context, &spec);
        assert_eq!(
            generator.body(MaintainerScript::PreInst)?,
            "pip3 install requests\npip3 install six\nmkdir -p /var/lib/tool\n\n"
        );
        assert_eq!(generator.body(MaintainerScript::PostInst)?, "");

        let warnings = generator.into_warnings();
        assert_eq!(
            warnings,
            vec![StageWarning::MissingFragment(td.path().join("missing.sh"))]
        );

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn scripts_written_executable() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let td = tempfile::tempdir()?;
        std::fs::write(td.path().join("post.sh"), "systemctl daemon-reload\n")?;
        let context = BuildContext::new(td.path(), 2);

        let raw = RawPackageSpec {
            postremove_ext_sh: vec!["post.sh".into()],
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("tool", raw)?;

        let paths = ScriptGenerator::new(&context, &spec).write_all()?;
        assert_eq!(
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
                .collect::<Vec<_>>(),
            vec!["preinst", "postinst", "prerm", "postrm"]
        );

        for path in &paths {
            let mode = std::fs::metadata(path)?.permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
            assert!(std::fs::read_to_string(path)?.contains(TRAP_LINE));
        }

        assert!(std::fs::read_to_string(&paths[3])?.contains("\nsystemctl daemon-reload\n"));

        Ok(())
    }
}
