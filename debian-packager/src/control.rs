// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Control file primitives and generation of the binary package `control` file.

See <https://www.debian.org/doc/debian-policy/ch-controlfields.html>
for the canonical source of truth for how control files work.
*/

use {
    crate::{
        context::BuildContext,
        error::Result,
        io::write_file,
        spec::PackageSpec,
    },
    std::{
        borrow::Cow,
        io::Write,
        path::Path,
    },
};

/// Bytes accounted for every directory when estimating the installed size.
pub const DIRECTORY_SIZE_OVERHEAD: u64 = 4100;

/// Bytes added to every installed size estimate.
pub const INSTALLED_SIZE_RESERVE: u64 = 1024;

/// A field in a control file.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlField<'a> {
    name: Cow<'a, str>,
    value: Cow<'a, str>,
}

impl<'a> ControlField<'a> {
    /// Construct an instance from a field name and value.
    pub fn new(name: Cow<'a, str>, value: Cow<'a, str>) -> Self {
        Self { name, value }
    }

    /// The name of this field.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Write the contents of this field to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(b": ")?;
        writer.write_all(self.value.as_ref().as_bytes())?;
        writer.write_all(b"\n")
    }
}

/// A paragraph in a control file.
///
/// A paragraph is an ordered series of control fields.
///
/// Field names are case insensitive on set and case preserving.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlParagraph<'a> {
    fields: Vec<ControlField<'a>>,
}

impl<'a> ControlParagraph<'a> {
    /// Set the value of a field via a [ControlField].
    ///
    /// If a field with the same name (case insensitive compare) already exists, the old value
    /// will be replaced by the incoming value.
    pub fn set_field(&mut self, field: ControlField<'a>) {
        self.fields
            .retain(|cf| cf.name.to_lowercase() != field.name.to_lowercase());
        self.fields.push(field);
    }

    /// Set the value of a field defined via strings.
    pub fn set_field_from_string(&mut self, name: Cow<'a, str>, value: Cow<'a, str>) {
        self.set_field(ControlField::new(name, value));
    }

    /// Set a field only if its value is non-empty.
    pub fn set_field_if_not_empty(&mut self, name: &'a str, value: impl Into<Cow<'a, str>>) {
        let value = value.into();

        if !value.is_empty() {
            self.set_field_from_string(name.into(), value);
        }
    }

    /// Iterate over fields in this paragraph.
    ///
    /// Iteration order is insertion order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &ControlField<'a>> {
        self.fields.iter()
    }

    /// Serialize the paragraph to a writer.
    ///
    /// A trailing newline is written as part of the final field. However, an
    /// extra newline is not present.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for field in &self.fields {
            field.write(writer)?;
        }

        Ok(())
    }
}

/// A debian control file.
///
/// A control file is an ordered series of paragraphs.
#[derive(Clone, Debug, Default)]
pub struct ControlFile<'a> {
    paragraphs: Vec<ControlParagraph<'a>>,
}

impl<'a> ControlFile<'a> {
    /// Add a paragraph to this control file.
    pub fn add_paragraph(&mut self, p: ControlParagraph<'a>) {
        self.paragraphs.push(p);
    }

    /// Serialize the control file to a writer.
    ///
    /// Every paragraph, including the last, is terminated by a blank line.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for p in &self.paragraphs {
            p.write(writer)?;
            writer.write_all(b"\n")?;
        }

        Ok(())
    }
}

/// Format a multi-line value for a control field.
///
/// Continuation lines are indented by one space and blank lines become ` .`.
pub fn fold_multiline(value: &str) -> Cow<'_, str> {
    let value = value.trim_end();

    if !value.contains('\n') {
        return Cow::Borrowed(value);
    }

    let mut lines = value.lines();
    let mut folded = lines.next().unwrap_or_default().to_string();
    for line in lines {
        folded.push('\n');
        if line.trim().is_empty() {
            folded.push_str(" .");
        } else {
            folded.push(' ');
            folded.push_str(line);
        }
    }

    Cow::Owned(folded)
}

/// Estimate the installed size of a staged tree, in KiB.
///
/// Every directory, the root included, counts [DIRECTORY_SIZE_OVERHEAD] bytes
/// on top of the sizes of regular files. [INSTALLED_SIZE_RESERVE] bytes are
/// added before rounding down.
pub fn installed_size(root: &Path) -> Result<u64> {
    let mut total = INSTALLED_SIZE_RESERVE;

    for entry in walkdir::WalkDir::new(root) {
        let entry = entry?;

        if entry.file_type().is_dir() {
            total += DIRECTORY_SIZE_OVERHEAD;
        } else if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }

    Ok(total / 1024)
}

/// Build the paragraph of a binary package `control` file.
///
/// Fields with empty values are omitted.
pub fn binary_control_paragraph(spec: &PackageSpec, installed_size: u64) -> ControlParagraph<'_> {
    let mut p = ControlParagraph::default();

    p.set_field_from_string("Package".into(), spec.name.as_str().into());
    p.set_field_from_string("Version".into(), spec.version.as_str().into());
    p.set_field_if_not_empty("Provides", spec.provides.join(", "));
    p.set_field_from_string(
        "Maintainer".into(),
        format!("{} <{}>", spec.maintainer, spec.maintainer_email).into(),
    );
    p.set_field_from_string("Architecture".into(), spec.architecture.as_ref().into());
    p.set_field_from_string("Section".into(), spec.section.as_ref().into());
    p.set_field_if_not_empty("Description", fold_multiline(&spec.description));
    p.set_field_if_not_empty("Depends", spec.depends.join(", "));
    p.set_field_if_not_empty("Pre-Depends", spec.predepends.join(", "));
    p.set_field_if_not_empty("Conflicts", spec.conflicts.join(", "));
    p.set_field_if_not_empty("Replaces", spec.replaces.join(", "));
    p.set_field_if_not_empty("Recommends", spec.recommends.join(", "));
    p.set_field_if_not_empty("Suggests", spec.suggests.join(", "));
    p.set_field_if_not_empty("Build-Depends", spec.builddepends.join(", "));
    p.set_field_from_string("Installed-Size".into(), installed_size.to_string().into());
    p.set_field_from_string("Priority".into(), spec.priority.as_ref().into());
    if spec.essential {
        p.set_field_from_string("Essential".into(), "yes".into());
    }
    p.set_field_if_not_empty("Origin", spec.origin.as_deref().unwrap_or_default());
    p.set_field_if_not_empty("X-Source", spec.xsource.as_deref().unwrap_or_default());

    p
}

/// Write `DEBIAN/control` for the current state of the staging tree.
///
/// Returns the computed installed size.
pub fn write_control(context: &BuildContext, spec: &PackageSpec) -> Result<u64> {
    let size = installed_size(context.staging_root())?;

    let mut control = ControlFile::default();
    control.add_paragraph(binary_control_paragraph(spec, size));

    let mut data = vec![];
    control.write(&mut data)?;
    write_file(&context.metadata_path("control"), &data)?;

    Ok(size)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::spec::RawPackageSpec,
        indoc::indoc,
    };

    fn render(p: &ControlParagraph<'_>) -> Result<String> {
        let mut data = vec![];
        p.write(&mut data)?;

        Ok(String::from_utf8_lossy(&data).to_string())
    }

    #[test]
    fn control_paragraph_field_semantics() -> Result<()> {
        let mut p = ControlParagraph::default();

        // Same cased field name results in overwrite.
        p.set_field_from_string("foo".into(), "bar".into());
        p.set_field_from_string("foo".into(), "baz".into());
        assert_eq!(render(&p)?, "foo: baz\n");

        // Different case results in overwrite.
        p.set_field_from_string("FOO".into(), "bar".into());
        assert_eq!(render(&p)?, "FOO: bar\n");

        p.set_field_if_not_empty("Empty", "");
        assert_eq!(p.iter_fields().count(), 1);

        Ok(())
    }

    #[test]
    fn multiline_values_folded() {
        assert_eq!(fold_multiline("single line"), "single line");
        assert_eq!(fold_multiline("trailing\n"), "trailing");
        assert_eq!(
            fold_multiline("synopsis\nfirst paragraph\n\nsecond paragraph"),
            "synopsis\n first paragraph\n .\n second paragraph"
        );
    }

    #[test]
    fn multiline_description_written_folded() -> Result<()> {
        let raw = RawPackageSpec {
            description: Some("A tool\nIt does things.\n\nMany things.\n".to_string()),
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("tool", raw)?;

        let rendered = render(&binary_control_paragraph(&spec, 1))?;
        assert!(rendered.contains(
            "Description: A tool\n It does things.\n .\n Many things.\nInstalled-Size: 1\n"
        ));
        for line in rendered.lines() {
            assert!(line.starts_with(' ') || line.contains(": "), "bad line {:?}", line);
        }

        Ok(())
    }

    #[test]
    fn minimal_control_output() -> Result<()> {
        let raw = RawPackageSpec {
            version: Some("2.1".to_string()),
            section: Some("utils".to_string()),
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("My Tool!", raw)?;

        let mut control = ControlFile::default();
        control.add_paragraph(binary_control_paragraph(&spec, 12));
        let mut data = vec![];
        control.write(&mut data)?;

        assert_eq!(
            String::from_utf8(data).unwrap(),
            indoc! {"
                Package: mytool
                Version: 2.1
                Maintainer: UNKNOWN <UNKNOWN>
                Architecture: all
                Section: utils
                Description: UNKNOWN
                Installed-Size: 12
                Priority: optional

            "}
        );

        Ok(())
    }

    #[test]
    fn full_control_field_order() -> Result<()> {
        let raw = RawPackageSpec {
            architecture: Some("source".to_string()),
            maintainer: Some("Jane Doe".to_string()),
            maintainer_email: Some("jane@example.com".to_string()),
            description: Some("does things".to_string()),
            provides: vec!["tool".to_string()],
            depends: vec!["libc6".to_string(), "python3".to_string()],
            predepends: vec!["dpkg".to_string()],
            conflicts: vec!["old".to_string()],
            replaces: vec!["old".to_string()],
            recommends: vec!["extra".to_string()],
            suggests: vec!["docs".to_string()],
            builddepends: vec!["debhelper".to_string()],
            essential: Some(true),
            origin: Some("Example".to_string()),
            xsource: Some("https://example.com/src.tar.gz".to_string()),
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("tool", raw)?;

        let p = binary_control_paragraph(&spec, 5);
        let names = p.iter_fields().map(|f| f.name()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "Package",
                "Version",
                "Provides",
                "Maintainer",
                "Architecture",
                "Section",
                "Description",
                "Depends",
                "Pre-Depends",
                "Conflicts",
                "Replaces",
                "Recommends",
                "Suggests",
                "Build-Depends",
                "Installed-Size",
                "Priority",
                "Essential",
                "Origin",
                "X-Source",
            ]
        );
        let rendered = render(&p)?;
        assert!(rendered.contains("\nDepends: libc6, python3\n"));
        assert!(rendered.contains("\nMaintainer: Jane Doe <jane@example.com>\n"));
        assert!(rendered.contains("\nEssential: yes\n"));

        Ok(())
    }

    #[test]
    fn installed_size_formula() -> Result<()> {
        let td = tempfile::tempdir()?;
        let root = td.path().join("build");
        std::fs::create_dir_all(root.join("a/b"))?;
        std::fs::create_dir_all(root.join("c"))?;
        std::fs::write(root.join("a/one"), vec![0u8; 1000])?;
        std::fs::write(root.join("a/b/two"), vec![0u8; 3000])?;
        std::fs::write(root.join("c/three"), vec![0u8; 20000])?;

        // 4 directories: build, a, a/b, c.
        let expected = (4100 * 4 + 24000 + 1024) / 1024;
        assert_eq!(installed_size(&root)?, expected);

        Ok(())
    }

    #[test]
    fn written_control_ends_with_one_blank_line() -> Result<()> {
        let td = tempfile::tempdir()?;
        let context = BuildContext::new(td.path(), 2);
        std::fs::create_dir_all(context.metadata_dir())?;

        let spec = PackageSpec::from_raw("foo", RawPackageSpec::default())?;
        write_control(&context, &spec)?;

        let content = std::fs::read_to_string(context.metadata_path("control"))?;
        assert!(content.ends_with("Priority: optional\n\n"));
        assert!(!content.ends_with("\n\n\n"));
        assert!(!content.lines().any(|l| l.ends_with(": ")));
        assert!(!content.contains("Provides:"));
        assert!(!content.contains("Depends:"));

        Ok(())
    }
}
