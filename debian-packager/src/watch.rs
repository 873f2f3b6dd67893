// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! `watch` files, which tell `uscan` where to look for new upstream releases. */

use {
    crate::{context::BuildContext, error::Result, io::write_file, spec::PackageSpec},
    std::path::PathBuf,
};

/// Format version of emitted watch files.
pub const WATCH_VERSION: u32 = 3;

/// Render a watch file from a rule.
pub fn render_watch(rule: &str) -> String {
    format!("version={}\n\n{}\n", WATCH_VERSION, rule)
}

/// Write `DEBIAN/watch` if the package declares a watch rule.
pub fn write_watch(context: &BuildContext, spec: &PackageSpec) -> Result<Option<PathBuf>> {
    if spec.watch.is_empty() {
        return Ok(None);
    }

    let path = context.metadata_path("watch");
    write_file(&path, render_watch(&spec.watch).as_bytes())?;

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use {super::*, crate::spec::RawPackageSpec};

    #[test]
    fn empty_rule_writes_nothing() -> Result<()> {
        let td = tempfile::tempdir()?;
        let context = BuildContext::new(td.path(), 2);
        let raw = RawPackageSpec {
            watch: Some(String::new()),
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("tool", raw)?;

        assert_eq!(write_watch(&context, &spec)?, None);
        assert!(!context.metadata_path("watch").exists());

        Ok(())
    }

    #[test]
    fn rule_written() -> Result<()> {
        let td = tempfile::tempdir()?;
        let context = BuildContext::new(td.path(), 2);
        let raw = RawPackageSpec {
            watch: Some(r"https://example.com .* v(\d+)".to_string()),
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("tool", raw)?;

        let path = write_watch(&context, &spec)?.unwrap();
        let content = std::fs::read_to_string(path)?;
        assert!(content.starts_with("version=3\n"));
        assert_eq!(content, "version=3\n\nhttps://example.com .* v(\\d+)\n");

        Ok(())
    }
}
