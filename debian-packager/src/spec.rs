// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package specification parsing and validation.

A package is described by a [PackageDescription], which is typically
deserialized from YAML. Its options are captured as a [RawPackageSpec], where
every value is optional. [PackageSpec::from_raw] applies defaults, sanitizes the
package name and validates enumerated fields, producing the [PackageSpec] that
the rest of the pipeline consumes.
*/

use {
    crate::{
        error::{PackagerError, Result},
        scripts::MaintainerScript,
        stage::FileEntry,
    },
    serde::Deserialize,
    std::{path::PathBuf, str::FromStr},
    strum::IntoEnumIterator,
    strum_macros::{AsRefStr, Display, EnumIter, EnumString},
};

/// Architectures a binary package can be built for.
#[derive(
    AsRefStr, Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, PartialEq,
)]
#[strum(serialize_all = "lowercase")]
pub enum Architecture {
    I386,
    Amd64,
    All,
    Source,
}

/// Archive sections a package can be filed under.
#[derive(
    AsRefStr, Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, PartialEq,
)]
#[strum(serialize_all = "lowercase")]
pub enum Section {
    Admin,
    Base,
    Comm,
    Contrib,
    Devel,
    Doc,
    Editors,
    Electronics,
    Embedded,
    Games,
    Gnome,
    Graphics,
    Hamradio,
    Interpreters,
    Kde,
    Libs,
    Libdevel,
    Mail,
    Math,
    Misc,
    Net,
    News,
    #[strum(serialize = "non-free")]
    NonFree,
    Oldlibs,
    Otherosfs,
    Perl,
    Python,
    Science,
    Shells,
    Sound,
    Tex,
    Text,
    Utils,
    Web,
    X11,
}

/// Package priorities.
#[derive(
    AsRefStr, Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, PartialEq,
)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Extra,
    Optional,
    Standard,
    Important,
    Required,
}

/// An application started on desktop session login.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(from = "(String, String)")]
pub struct Autostart {
    pub name: String,
    pub command: String,
}

impl From<(String, String)> for Autostart {
    fn from((name, command): (String, String)) -> Self {
        Self { name, command }
    }
}

/// Shell fragments to splice into maintainer scripts, keyed by lifecycle hook.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScriptFragments {
    pub preinst: Vec<PathBuf>,
    pub postinst: Vec<PathBuf>,
    pub prerm: Vec<PathBuf>,
    pub postrm: Vec<PathBuf>,
}

impl ScriptFragments {
    /// Obtain the fragment paths registered for a hook.
    pub fn for_script(&self, script: MaintainerScript) -> &[PathBuf] {
        match script {
            MaintainerScript::PreInst => &self.preinst,
            MaintainerScript::PostInst => &self.postinst,
            MaintainerScript::PreRm => &self.prerm,
            MaintainerScript::PostRm => &self.postrm,
        }
    }
}

/// Unvalidated package options, as written by a user.
///
/// Every field is optional. Defaults are applied by [PackageSpec::from_raw].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RawPackageSpec {
    pub version: Option<String>,
    pub architecture: Option<String>,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub maintainer: Option<String>,
    pub maintainer_email: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub provides: Vec<String>,
    pub depends: Vec<String>,
    pub predepends: Vec<String>,
    #[serde(alias = "conflict")]
    pub conflicts: Vec<String>,
    pub replaces: Vec<String>,
    pub recommends: Vec<String>,
    pub suggests: Vec<String>,
    pub builddepends: Vec<String>,
    pub python_depends: Vec<String>,
    pub python_major_version: Option<u8>,
    pub essential: Option<bool>,
    pub origin: Option<String>,
    pub xsource: Option<String>,
    pub watch: Option<String>,
    pub autostart: Vec<Autostart>,
    pub changelog_file: Option<PathBuf>,
    pub preinstall_ext_sh: Vec<PathBuf>,
    pub postinstall_ext_sh: Vec<PathBuf>,
    pub preremove_ext_sh: Vec<PathBuf>,
    pub postremove_ext_sh: Vec<PathBuf>,
}

/// A complete declarative package description.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageDescription {
    /// Package name, prior to sanitization.
    pub name: String,

    /// Files, directories and Python packages to install.
    #[serde(default)]
    pub files: Vec<FileEntry>,

    #[serde(default)]
    pub options: RawPackageSpec,
}

/// A validated package specification.
///
/// Instances are obtained from [PackageSpec::from_raw] and are not mutated by
/// the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    pub architecture: Architecture,
    pub section: Section,
    pub priority: Priority,
    pub maintainer: String,
    pub maintainer_email: String,
    pub description: String,
    pub short_description: String,
    pub provides: Vec<String>,
    pub depends: Vec<String>,
    pub predepends: Vec<String>,
    pub conflicts: Vec<String>,
    pub replaces: Vec<String>,
    pub recommends: Vec<String>,
    pub suggests: Vec<String>,
    /// Only populated for [Architecture::Source].
    pub builddepends: Vec<String>,
    pub python_depends: Vec<String>,
    pub python_major_version: u8,
    pub essential: bool,
    pub origin: Option<String>,
    pub xsource: Option<String>,
    pub watch: String,
    pub autostart: Vec<Autostart>,
    pub changelog_file: Option<PathBuf>,
    pub fragments: ScriptFragments,
}

const UNKNOWN: &str = "UNKNOWN";

/// Python major versions we know how to emit `pip` directives for.
const PYTHON_MAJOR_VERSIONS: [u8; 2] = [2, 3];

/// Reduce a package name to lowercase ASCII word characters.
pub fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn parse_enumerated<T>(field: &'static str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr + IntoEnumIterator + AsRef<str>,
{
    let value = match value {
        Some(value) => value,
        None => return Ok(default),
    };

    T::from_str(&value).map_err(|_| PackagerError::Configuration {
        field,
        value,
        allowed: T::iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

impl PackageSpec {
    /// Validate raw options and apply defaults.
    ///
    /// Fails with [PackagerError::Configuration] if an enumerated field holds a
    /// value outside its domain, or if the name or version would be empty.
    pub fn from_raw(name: &str, raw: RawPackageSpec) -> Result<Self> {
        let architecture = parse_enumerated("architecture", raw.architecture, Architecture::All)?;
        let section = parse_enumerated("section", raw.section, Section::Misc)?;
        let priority = parse_enumerated("priority", raw.priority, Priority::Optional)?;

        let sanitized = sanitize_name(name);
        if sanitized.is_empty() {
            return Err(PackagerError::Configuration {
                field: "name",
                value: name.to_string(),
                allowed: "names containing ASCII letters, digits or underscores".to_string(),
            });
        }

        let version = raw.version.unwrap_or_else(|| "1.0".to_string());
        if version.trim().is_empty() {
            return Err(PackagerError::Configuration {
                field: "version",
                value: version,
                allowed: "non-empty versions".to_string(),
            });
        }

        let python_major_version = raw.python_major_version.unwrap_or(2);
        if !PYTHON_MAJOR_VERSIONS.contains(&python_major_version) {
            return Err(PackagerError::Configuration {
                field: "python_major_version",
                value: python_major_version.to_string(),
                allowed: "2, 3".to_string(),
            });
        }

        let builddepends = if architecture == Architecture::Source {
            raw.builddepends
        } else {
            vec![]
        };

        Ok(Self {
            name: sanitized,
            version,
            architecture,
            section,
            priority,
            maintainer: raw.maintainer.unwrap_or_else(|| UNKNOWN.to_string()),
            maintainer_email: raw.maintainer_email.unwrap_or_else(|| UNKNOWN.to_string()),
            description: raw.description.unwrap_or_else(|| UNKNOWN.to_string()),
            short_description: raw.short_description.unwrap_or_else(|| UNKNOWN.to_string()),
            provides: raw.provides,
            depends: raw.depends,
            predepends: raw.predepends,
            conflicts: raw.conflicts,
            replaces: raw.replaces,
            recommends: raw.recommends,
            suggests: raw.suggests,
            builddepends,
            python_depends: raw.python_depends,
            python_major_version,
            essential: raw.essential.unwrap_or(false),
            origin: raw.origin,
            xsource: raw.xsource,
            watch: raw.watch.unwrap_or_default(),
            autostart: raw.autostart,
            changelog_file: raw.changelog_file,
            fragments: ScriptFragments {
                preinst: raw.preinstall_ext_sh,
                postinst: raw.postinstall_ext_sh,
                prerm: raw.preremove_ext_sh,
                postrm: raw.postremove_ext_sh,
            },
        })
    }

    /// The file name of the `.deb` built from this spec.
    pub fn artifact_name(&self) -> String {
        format!("{}_{}_{}.deb", self.name, self.version, self.architecture)
    }
}

impl PackageDescription {
    /// Validate the options of this description.
    pub fn validate(&self) -> Result<PackageSpec> {
        PackageSpec::from_raw(&self.name, self.options.clone())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    #[test]
    fn defaults() -> Result<()> {
        let spec = PackageSpec::from_raw("Foo", RawPackageSpec::default())?;

        assert_eq!(spec.name, "foo");
        assert_eq!(spec.version, "1.0");
        assert_eq!(spec.architecture, Architecture::All);
        assert_eq!(spec.section, Section::Misc);
        assert_eq!(spec.priority, Priority::Optional);
        assert_eq!(spec.maintainer, "UNKNOWN");
        assert_eq!(spec.maintainer_email, "UNKNOWN");
        assert_eq!(spec.python_major_version, 2);
        assert!(!spec.essential);
        assert!(spec.watch.is_empty());
        assert!(spec.origin.is_none());

        Ok(())
    }

    #[test]
    fn name_sanitization() {
        assert_eq!(sanitize_name("My Tool!"), "mytool");
        assert_eq!(sanitize_name("lib-foo_bar.2"), "libfoo_bar2");
        assert_eq!(sanitize_name("Ünïcode"), "ncode");
    }

    #[test]
    fn empty_name_or_version_rejected() {
        assert!(matches!(
            PackageSpec::from_raw("!!!", RawPackageSpec::default()),
            Err(PackagerError::Configuration { field: "name", .. })
        ));

        let raw = RawPackageSpec {
            version: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PackageSpec::from_raw("tool", raw),
            Err(PackagerError::Configuration {
                field: "version",
                ..
            })
        ));
    }

    #[test]
    fn architecture_domain() {
        for arch in ["i386", "amd64", "all", "source"] {
            let raw = RawPackageSpec {
                architecture: Some(arch.to_string()),
                ..Default::default()
            };
            let spec = PackageSpec::from_raw("foo", raw).unwrap();
            assert_eq!(spec.architecture.to_string(), arch);
        }

        for arch in ["arm64", "AMD64", "", "any"] {
            let raw = RawPackageSpec {
                architecture: Some(arch.to_string()),
                ..Default::default()
            };
            match PackageSpec::from_raw("foo", raw) {
                Err(PackagerError::Configuration { field, value, allowed }) => {
                    assert_eq!(field, "architecture");
                    assert_eq!(value, arch);
                    assert_eq!(allowed, "i386, amd64, all, source");
                }
                res => panic!("expected configuration error; got {:?}", res),
            }
        }
    }

    #[test]
    fn section_and_priority_domain() {
        assert_eq!(Section::iter().count(), 35);
        assert_eq!(Section::from_str("non-free").unwrap(), Section::NonFree);
        assert_eq!(Section::X11.to_string(), "x11");

        let raw = RawPackageSpec {
            section: Some("toys".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PackageSpec::from_raw("foo", raw),
            Err(PackagerError::Configuration {
                field: "section",
                ..
            })
        ));

        let raw = RawPackageSpec {
            priority: Some("urgent".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PackageSpec::from_raw("foo", raw),
            Err(PackagerError::Configuration {
                field: "priority",
                ..
            })
        ));
    }

    #[test]
    fn python_major_version_domain() {
        let raw = RawPackageSpec {
            python_major_version: Some(4),
            ..Default::default()
        };
        assert!(matches!(
            PackageSpec::from_raw("foo", raw),
            Err(PackagerError::Configuration {
                field: "python_major_version",
                ..
            })
        ));
    }

    #[test]
    fn builddepends_only_for_source() -> Result<()> {
        let raw = RawPackageSpec {
            builddepends: vec!["debhelper".to_string()],
            ..Default::default()
        };
        assert!(PackageSpec::from_raw("foo", raw.clone())?
            .builddepends
            .is_empty());

        let raw = RawPackageSpec {
            architecture: Some("source".to_string()),
            ..raw
        };
        assert_eq!(
            PackageSpec::from_raw("foo", raw)?.builddepends,
            vec!["debhelper".to_string()]
        );

        Ok(())
    }

    #[test]
    fn artifact_name() -> Result<()> {
        let raw = RawPackageSpec {
            version: Some("2.1".to_string()),
            architecture: Some("amd64".to_string()),
            ..Default::default()
        };
        let spec = PackageSpec::from_raw("My Tool!", raw)?;
        assert_eq!(spec.artifact_name(), "mytool_2.1_amd64.deb");

        Ok(())
    }

    #[test]
    fn parse_yaml_description() -> Result<()> {
        let description: PackageDescription = serde_yaml::from_str(indoc! {r#"
            name: My Tool!
            files:
              - [local/bin/run, /usr/bin/run]
              - mypkg.sub
            options:
              version: "2.1"
              section: utils
              depends: [libc6, python]
              conflict: [oldtool]
              autostart:
                - [tray, /usr/bin/run --tray]
              postinstall_ext_sh: [scripts/postinst.sh]
        "#})
        .unwrap();

        assert_eq!(
            description.files,
            vec![
                FileEntry::Path("local/bin/run".into(), "/usr/bin/run".into()),
                FileEntry::Package("mypkg.sub".to_string()),
            ]
        );

        let spec = description.validate()?;
        assert_eq!(spec.name, "mytool");
        assert_eq!(spec.section, Section::Utils);
        assert_eq!(spec.depends, vec!["libc6", "python"]);
        assert_eq!(spec.conflicts, vec!["oldtool"]);
        assert_eq!(
            spec.autostart,
            vec![Autostart {
                name: "tray".to_string(),
                command: "/usr/bin/run --tray".to_string()
            }]
        );
        assert_eq!(
            spec.fragments.for_script(MaintainerScript::PostInst),
            &[PathBuf::from("scripts/postinst.sh")]
        );
        assert!(spec.fragments.for_script(MaintainerScript::PreInst).is_empty());

        Ok(())
    }

    #[test]
    fn unknown_option_rejected() {
        let res = serde_yaml::from_str::<PackageDescription>(indoc! {r#"
            name: foo
            options:
              flavour: vanilla
        "#});
        assert!(res.is_err());
    }
}
