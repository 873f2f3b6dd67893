// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    debian_packager::{
        context::BuildContext,
        control::binary_control_paragraph,
        error::PackagerError,
        lint::{LintPolicy, Outcome},
        pipeline::Pipeline,
        spec::{PackageDescription, PackageSpec},
        tool::DuctTool,
    },
    log::{warn, LevelFilter},
    std::{
        ffi::OsStr,
        path::{Path, PathBuf},
        time::Duration,
    },
    thiserror::Error,
};

const BUILD_ABOUT: &str = "\
Build a Debian binary package from a YAML package description.

Declared files are copied into a staging directory mirroring the filesystem
of the target machine. Debian metadata (control file, maintainer scripts,
changelogs, copyright, checksums) is generated next to them and the tree is
built into a `.deb` with `fakeroot dpkg-deb --build`. The package is then
checked with `lintian`.

If the lint report is clean, the staging directory is emptied. Otherwise it is
left in place and the report is printed.

# YAML Configuration

The YAML document has the following keys:

name (required) (string)
   Name of the package. Characters other than ASCII letters, digits and
   underscores are removed and the result is lowercased.

files (optional) (list)
   Content to install. Each item is either a 2-tuple of a path relative to
   the source root and an absolute install path, or the dotted name of a
   Python package, which is installed into the Python dist-packages directory.

options (optional) (mapping)
   Package options: version, architecture, section, priority, maintainer,
   maintainer_email, description, short_description, provides, depends,
   predepends, conflicts, replaces, recommends, suggests, builddepends,
   python_depends, python_major_version, essential, origin, xsource, watch,
   autostart, changelog_file, preinstall_ext_sh, postinstall_ext_sh,
   preremove_ext_sh, postremove_ext_sh.
";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("argument parsing error: {0:?}")]
    Clap(#[from] clap::Error),

    #[error("{0}")]
    Packager(#[from] PackagerError),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0:?}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("invalid sub-command: {0}")]
    InvalidSubCommand(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

fn config_arg() -> Arg<'static> {
    Arg::new("config")
        .long("config")
        .takes_value(true)
        .required(true)
        .allow_invalid_utf8(true)
        .help("Path to a YAML file describing the package")
}

pub fn run_cli() -> Result<()> {
    let app = Command::new("Debian Package Assembler")
        .version("0.1")
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Assemble Debian binary packages")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(
        Command::new("build")
            .about("Build a package from a YAML description")
            .long_about(BUILD_ABOUT)
            .arg(config_arg())
            .arg(
                Arg::new("source-root")
                    .long("source-root")
                    .takes_value(true)
                    .allow_invalid_utf8(true)
                    .help("Directory declared source paths are relative to (default: directory of the config file)"),
            )
            .arg(
                Arg::new("staging-root")
                    .long("staging-root")
                    .takes_value(true)
                    .allow_invalid_utf8(true)
                    .help("Directory to assemble the package in (default: <source-root>/build)"),
            )
            .arg(
                Arg::new("output-dir")
                    .long("output-dir")
                    .takes_value(true)
                    .allow_invalid_utf8(true)
                    .help("Directory to write the .deb to (default: <source-root>)"),
            )
            .arg(
                Arg::new("lint-policy")
                    .long("lint-policy")
                    .takes_value(true)
                    .possible_values(["baseline", "no-diagnostics"])
                    .default_value("baseline")
                    .help("How to decide whether the lintian report is clean"),
            )
            .arg(
                Arg::new("timeout")
                    .long("timeout")
                    .takes_value(true)
                    .help("Kill external programs running longer than this many seconds"),
            )
            .arg(
                Arg::new("assemble-only")
                    .long("assemble-only")
                    .help("Stop after assembling the staging directory"),
            ),
    );

    let mut app = app.subcommand(
        Command::new("validate")
            .about("Validate a package description and print its control fields")
            .arg(config_arg()),
    );

    let matches = app.clone().get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("build", args)) => command_build(args),
        Some(("validate", args)) => command_validate(args),
        Some((command, _)) => Err(ToolError::InvalidSubCommand(command.to_string())),
        None => {
            app.print_help()?;
            Ok(())
        }
    }
}

/// Read a package description from a YAML file.
pub fn load_description(path: &Path) -> Result<PackageDescription> {
    let fh = std::fs::File::open(path)?;

    Ok(serde_yaml::from_reader(fh)?)
}

/// Directory containing the config file, which source paths default to being relative to.
fn config_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Construct the [BuildContext] for a build.
pub fn build_context(
    spec: &PackageSpec,
    config: &Path,
    source_root: Option<&OsStr>,
    staging_root: Option<&OsStr>,
    output_dir: Option<&OsStr>,
) -> BuildContext {
    let source_root = source_root
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir(config));

    let mut context = BuildContext::new(source_root, spec.python_major_version);

    if let Some(path) = staging_root {
        context = context.with_staging_root(path);
    }
    if let Some(path) = output_dir {
        context = context.with_output_dir(path);
    }

    context
}

/// Map a `--lint-policy` value to a [LintPolicy].
pub fn lint_policy(value: Option<&str>) -> LintPolicy {
    match value {
        Some("no-diagnostics") => LintPolicy::NoDiagnostics,
        _ => LintPolicy::default(),
    }
}

fn command_build(args: &ArgMatches) -> Result<()> {
    let config = PathBuf::from(
        args.value_of_os("config")
            .expect("config argument is required"),
    );

    let description = load_description(&config)?;
    let spec = description.validate()?;

    let context = build_context(
        &spec,
        &config,
        args.value_of_os("source-root"),
        args.value_of_os("staging-root"),
        args.value_of_os("output-dir"),
    );

    let timeout = if args.is_present("timeout") {
        Some(Duration::from_secs(args.value_of_t::<u64>("timeout")?))
    } else {
        None
    };
    let tool = DuctTool::default().with_timeout(timeout);

    let pipeline = Pipeline::default()
        .with_lint_policy(lint_policy(args.value_of("lint-policy")))
        .with_assemble_only(args.is_present("assemble-only"));

    let report = pipeline.run(&context, &description, &tool)?;

    if !report.warnings.is_empty() {
        warn!("{} warnings during build", report.warnings.len());
    }

    if let Some(artifact) = &report.artifact {
        println!("package: {}", artifact.display());
    }

    match report.outcome {
        Some(Outcome::Cleaned) => {
            println!("staging directory cleared");
        }
        Some(Outcome::Preserved { stdout, stderr }) => {
            println!("lintian report:");
            print!("{}", stdout);
            eprint!("{}", stderr);
            println!(
                "staging directory preserved at {}",
                context.staging_root().display()
            );
        }
        None => {
            println!(
                "staging directory assembled at {}",
                context.staging_root().display()
            );
        }
    }

    Ok(())
}

fn command_validate(args: &ArgMatches) -> Result<()> {
    let config = PathBuf::from(
        args.value_of_os("config")
            .expect("config argument is required"),
    );

    let spec = load_description(&config)?.validate()?;

    // Installed-Size depends on staged content and is not known yet.
    let paragraph = binary_control_paragraph(&spec, 0);
    let mut stdout = std::io::stdout();
    for field in paragraph
        .iter_fields()
        .filter(|f| f.name() != "Installed-Size")
    {
        field.write(&mut stdout)?;
    }

    Ok(())
}
