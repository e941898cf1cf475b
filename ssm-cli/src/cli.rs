//! Argument parsing for the `ssm` executable.
//!
//! Grounded on `ssm_frontend.py`'s verb dispatch table and each driver
//! script's own hand-rolled `while args:` argument loop, ported to
//! `clap`'s derive API the way `alpm-db/src/desc/cli.rs` structures a
//! multi-verb command line tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Flags common to every subcommand (`ssm_frontend.py`'s
/// `globls.debug`/`globls.force`/`globls.verbose`).
#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    /// Enable debugging: narrate error sources on stderr.
    #[arg(long, global = true)]
    pub debug: bool,
    /// Force the operation past idempotency checks.
    #[arg(long, global = true)]
    pub force: bool,
    /// Enable verbose output.
    #[arg(long, global = true)]
    pub verbose: bool,
}

/// Simple Software Manager: install, publish and manage `.ssm`
/// packages across domains.
#[derive(Parser, Debug)]
#[command(name = "ssm", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Perform the steps needed to get named packages built and
    /// published to a domain.
    Build(BuildArgs),
    /// Clone one or more existing domains.
    Cloned(ClonedArgs),
    /// Create a new domain.
    Created(CreatedArgs),
    /// Compare two domains and show the differences.
    Diffd(DiffdArgs),
    /// Find SSM domains and packages under one or more paths.
    Find(FindArgs),
    /// Install a package into a domain.
    Install(InstallArgs),
    /// Take an inventory of a domain and print it as JSON.
    Invd(InvdArgs),
    /// List installed and published packages in a domain.
    Listd(ListdArgs),
    /// Make a `.ssm` package from the contents of a directory.
    Makepkg(MakepkgArgs),
    /// Publish an installed package to a platform.
    Publish(PublishArgs),
    /// Uninstall a package from a domain.
    Uninstall(UninstallArgs),
    /// Unpublish a package from a platform.
    Unpublish(UnpublishArgs),
    /// Upgrade a domain to the current layout.
    Upgraded(UpgradedArgs),
    /// Print the ssm version.
    Version,
}

#[derive(Args, Debug)]
pub struct CreatedArgs {
    /// Domain path.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: PathBuf,
    /// Short label for the domain.
    #[arg(short = 'L', long = "label")]
    pub label: Option<String>,
    /// Repository URL.
    #[arg(short = 'r', long = "repo")]
    pub repo: Option<PathBuf>,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Domain path.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: PathBuf,
    /// Explicit package archive to install.
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
    /// Package name to install from a repository.
    #[arg(short = 'p', long = "name")]
    pub name: Option<String>,
    /// Comma-separated package names (source-directory skeleton install).
    #[arg(long = "names")]
    pub names: Option<String>,
    /// Repository URL overriding the domain's configured one.
    #[arg(short = 'r', long = "repo")]
    pub repo: Option<PathBuf>,
    /// Reinstall even if already installed.
    #[arg(long)]
    pub reinstall: bool,
    /// Source directory: install a skeleton package whose `bin`/`lib`/...
    /// are symlinked from this directory.
    #[arg(short = 's', long = "srcdir")]
    pub srcdir: Option<PathBuf>,
    /// Install a control-only skeleton package with no publishable
    /// directories.
    #[arg(long)]
    pub skeleton: bool,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Domain path.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: Option<PathBuf>,
    /// Installed package name.
    #[arg(short = 'p', long = "name")]
    pub name: Option<String>,
    /// Package reference (`[DOMPATH/]NAME`), combining `-d`/`-p`.
    #[arg(short = 'x', long = "ref")]
    pub pkgref: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Domain path the package is installed in.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: Option<PathBuf>,
    /// Installed package name.
    #[arg(short = 'p', long = "name")]
    pub name: Option<String>,
    /// Platform to publish to; default derived from the environment.
    #[arg(long = "pp")]
    pub pubplatform: Option<String>,
    /// Alternate domain to publish into, when the installing and
    /// publishing domains differ.
    #[arg(short = 'P', long = "pubdompath")]
    pub pubdompath: Option<PathBuf>,
    /// Package reference (`[DOMPATH/]NAME`), combining `-d`/`-p`.
    #[arg(short = 'x', long = "ref")]
    pub pkgref: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct UnpublishArgs {
    /// Domain path the package is published from.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: Option<PathBuf>,
    /// Published package name.
    #[arg(short = 'p', long = "name")]
    pub name: Option<String>,
    /// Platform to unpublish from.
    #[arg(long = "pp")]
    pub pubplatform: Option<String>,
    /// Package reference (`[DOMPATH/]NAME@PLATFORM`), combining
    /// `-d`/`-p`/`--pp`.
    #[arg(short = 'x', long = "ref")]
    pub pkgref: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct ListdArgs {
    /// Domain path.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: PathBuf,
    /// Package name wildcard pattern (`*`/`?`); default matches all.
    #[arg(short = 'p', long = "pkgpat")]
    pub pkgpat: Option<String>,
    /// Platform wildcard pattern; default is the current platforms.
    #[arg(long = "pp")]
    pub platpat: Option<String>,
    /// Print each package's full path instead of a columnized summary.
    #[arg(long)]
    pub long: bool,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct DiffdArgs {
    /// Left-hand domain path.
    pub left: PathBuf,
    /// Right-hand domain path.
    pub right: PathBuf,
    /// Compare domain metadata.
    #[arg(long)]
    pub meta: bool,
    /// Compare installed packages.
    #[arg(long)]
    pub installed: bool,
    /// Compare published packages.
    #[arg(long)]
    pub published: bool,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct InvdArgs {
    /// Domain path.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: PathBuf,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Starting directories; default is `SSMUSE_PATH`.
    pub paths: Vec<PathBuf>,
    /// Domain path wildcard pattern.
    #[arg(short = 'd', long = "dompat")]
    pub dompat: Option<String>,
    /// Package name wildcard pattern.
    #[arg(short = 'p', long = "pkgpat")]
    pub pkgpat: Option<String>,
    /// Pattern applied to both domain and package name.
    #[arg(short = 'P', long = "bothpat")]
    pub bothpat: Option<String>,
    /// Platform wildcard pattern; default is the current platforms.
    #[arg(long = "pp")]
    pub platpat: Option<String>,
    /// Print results as `domain,state,platform,name` CSV.
    #[arg(long)]
    pub csv: bool,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct MakepkgArgs {
    /// Directory to be packaged.
    pub dir: PathBuf,
    /// Generate a minimal control.json, overriding an existing one.
    #[arg(long = "auto-control")]
    pub auto_control: bool,
    /// Alternate package name; implies `--auto-control`.
    #[arg(short = 'p', long = "name")]
    pub name: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct ClonedArgs {
    /// Source domains, and finally the destination domain.
    #[arg(required = true)]
    pub srcdoms: Vec<PathBuf>,
    /// Destination domain; created from the last source domain's
    /// metadata if it does not already exist.
    #[arg(required = true)]
    pub dstdom: PathBuf,
    /// Clone installed packages.
    #[arg(long)]
    pub installed: bool,
    /// Overwrite already-installed packages in the destination.
    #[arg(long = "installed-overwrite")]
    pub installed_overwrite: bool,
    /// Clone published packages, re-publishing from the destination
    /// domain's own installed copies.
    #[arg(long)]
    pub published: bool,
    /// Clone published packages, publishing from the source domain's
    /// installed copies instead (the default).
    #[arg(long = "published-src")]
    pub published_src: bool,
    /// Short label for the destination domain, if it is created.
    #[arg(short = 'L', long = "label")]
    pub label: Option<String>,
    /// Comma-separated platforms to limit publishing to.
    #[arg(long = "pp")]
    pub platforms: Option<String>,
    /// Repository URL overriding the source domain's configured one.
    #[arg(short = 'r', long = "repo")]
    pub repo: Option<PathBuf>,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct UpgradedArgs {
    /// Domain path.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: PathBuf,
    /// Comma-separated components to upgrade (meta, control, installed,
    /// published, old-files, old-dirs, self); default is all.
    #[arg(short = 'c', long = "components")]
    pub components: Option<String>,
    /// Treat the domain as a legacy (v10 and before) domain.
    #[arg(long)]
    pub legacy: bool,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory containing `.bssm` build spec files.
    #[arg(short = 'b', long = "bssmdir")]
    pub bssmdir: PathBuf,
    /// URL where source files are located (`BH_SOURCES_URL`).
    #[arg(short = 's', long = "sourcesurl")]
    pub sourcesurl: String,
    /// Domain path.
    #[arg(short = 'd', long = "dompath")]
    pub dompath: PathBuf,
    /// Target platform.
    #[arg(short = 'p', long = "platform")]
    pub platform: String,
    /// Short-form package names to build (and their dependencies).
    #[arg(required = true)]
    pub pkgnames: Vec<String>,
    /// Dry run: resolve and order the build list, but do not build.
    #[arg(long)]
    pub dry: bool,
    /// File sourced before building each package.
    #[arg(long = "init-file")]
    pub init_file: Option<PathBuf>,
    /// Package loaded before building each package.
    #[arg(long = "init-pkg")]
    pub init_pkg: Option<String>,
    /// Install each package after a successful build.
    #[arg(long)]
    pub install: bool,
    /// Publish (and install) each package after a successful build.
    #[arg(long)]
    pub publish: bool,
    /// Repository URL overriding the domain's configured one.
    #[arg(short = 'r', long = "repo")]
    pub repo: Option<PathBuf>,
    /// Print the ordered list of every package that would be built.
    #[arg(long = "show-all")]
    pub show_all: bool,
    /// Print the ordered list of packages still missing.
    #[arg(long = "show-missing")]
    pub show_missing: bool,
    /// Work directory; default is the current directory.
    #[arg(short = 'w', long = "workdir")]
    pub workdir: Option<PathBuf>,
    #[command(flatten)]
    pub common: CommonArgs,
}
