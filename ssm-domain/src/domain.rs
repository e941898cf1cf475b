//! Domain state: the per-domain installed/published registries and the
//! high-level operations that mutate them.
//!
//! Grounded on `ssm/domain.py::Domain`. The path reconstruction done by
//! [`Domain::get_installed_packages`] (rooted at the domain path, since an
//! installed package always lives there) deliberately differs from
//! [`Domain::get_published_packages`] (rooted at the registry symlink's
//! own directory): a "cloned" domain can publish packages it never
//! installed itself, and the published registry entry is the only thing
//! that knows where the real package directory is.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use ssm_control::Control;
use ssm_deps::DependencyManager;
use ssm_package::{Package, PackageSource, PUBLISHABLE_DIRS};
use ssm_repo::RepositoryGroup;
use ssm_types::{PackageName, Version};

use crate::constants::SSM_VERSION;
use crate::legacy;
use crate::Error;

/// A snapshot of a domain's state: metadata, legacy flag, and the
/// installed/published registries resolved to realpaths.
///
/// Grounded on `ssm/domain.py::Domain::get_inventory`.
#[derive(Clone, Debug)]
pub struct Inventory {
    /// The domain's root path.
    pub path: PathBuf,
    /// The domain's metadata.
    pub meta: Control,
    /// True if the domain uses the legacy flat registry layout.
    pub legacy: bool,
    /// Installed package name to the realpath of its `installed/` link.
    pub installed: HashMap<String, PathBuf>,
    /// Platform to (package name to realpath of its `published/` link).
    pub published: HashMap<String, HashMap<String, PathBuf>>,
}

/// Which steps of [`Domain::upgrade`] to perform, mirroring
/// `ssm_upgraded.py`'s `-c` component list
/// (`meta,control,installed,published,old-files,old-dirs,self`).
/// Selecting a subset limits `upgrade` to exactly those steps instead of
/// always running the full migration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeComponents {
    /// Rewrite `meta.json` from the legacy `label`/`sources.list`/
    /// `version` files.
    pub meta: bool,
    /// Rewrite each installed package's legacy control file to
    /// `control.json`.
    pub control: bool,
    /// Move flat `installed/NAME` entries into `installed/PLATFORM/NAME`.
    pub installed: bool,
    /// Move flat `published/NAME` entries into `published/PLATFORM/NAME`.
    pub published: bool,
    /// Delete the superseded `version`/`label`/`sources.list` files.
    pub old_files: bool,
    /// Delete the superseded `domainHomes`/`platforms` directories.
    pub old_dirs: bool,
    /// Rewrite the `etc/ssm.d/self` symlink.
    pub self_: bool,
}

impl UpgradeComponents {
    /// Every component selected: `upgrade`'s default when no `-c` list
    /// is given.
    pub fn all() -> Self {
        Self {
            meta: true,
            control: true,
            installed: true,
            published: true,
            old_files: true,
            old_dirs: true,
            self_: true,
        }
    }

    /// Parses a comma-separated component list (e.g. `"meta,installed"`).
    /// Unrecognized names are accepted and simply select nothing,
    /// matching the original's plain `name in components` membership
    /// test against whatever list the caller passed on `-c`.
    pub fn parse(spec: &str) -> Self {
        let names: HashSet<&str> = spec.split(',').map(str::trim).collect();
        Self {
            meta: names.contains("meta"),
            control: names.contains("control"),
            installed: names.contains("installed"),
            published: names.contains("published"),
            old_files: names.contains("old-files"),
            old_dirs: names.contains("old-dirs"),
            self_: names.contains("self"),
        }
    }
}

/// A domain: `DOMPATH/etc/ssm.d/{meta.json,self,installed/,published/,broken/}`.
#[derive(Clone, Debug)]
pub struct Domain {
    /// The domain's resolved root path (following `etc/ssm.d/self` if it
    /// exists, matching `ssm/domain.py::Domain.__init__`).
    pub path: PathBuf,
    self_path: PathBuf,
    installed_path: PathBuf,
    published_path: PathBuf,
    meta_path: PathBuf,
}

impl Domain {
    /// Wraps a domain directory. Resolves `etc/ssm.d/self` if it exists,
    /// redirecting to the domain it points at — this is what makes a
    /// "cloned" domain (one that shares another's installed packages)
    /// transparent to every other method.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut path = path.into();
        if path.is_relative() {
            if let Ok(cwd) = std::env::current_dir() {
                path = cwd.join(&path);
            }
        }

        let self_path = path.join("etc/ssm.d/self");
        if let Ok(target) = fs::read_link(&self_path) {
            path = target;
        }

        let installed_path = path.join("etc/ssm.d/installed");
        let published_path = path.join("etc/ssm.d/published");
        let meta_path = path.join("etc/ssm.d/meta.json");

        Self {
            path,
            self_path,
            installed_path,
            published_path,
            meta_path,
        }
    }

    fn ssmd_path(&self) -> PathBuf {
        self.path.join("etc/ssm.d")
    }

    /// True if the domain directory and its `etc/ssm.d` marker exist.
    pub fn exists(&self) -> bool {
        self.path.is_dir() && self.ssmd_path().is_dir()
    }

    /// True if the current process owns the domain directory.
    #[cfg(unix)]
    pub fn is_owner(&self) -> bool {
        use std::os::unix::fs::MetadataExt;

        match fs::metadata(&self.path) {
            Ok(meta) => nix::unistd::Uid::from_raw(meta.uid()) == nix::unistd::getuid(),
            Err(_) => false,
        }
    }

    /// True if the current process owns the domain directory. Always
    /// false off Unix, where there is no uid-based ownership model.
    #[cfg(not(unix))]
    pub fn is_owner(&self) -> bool {
        false
    }

    /// Reads `meta.json`, or an empty [`Control`] if it does not yet
    /// exist (matches `ssm/jsonfile.py::JsonFile`'s missing-file case).
    pub fn get_meta(&self) -> Result<Control, Error> {
        Ok(Control::load(&self.meta_path)?)
    }

    /// Overwrites `meta.json` with `meta`.
    pub fn put_meta(&self, meta: &Control) -> Result<(), Error> {
        Ok(meta.dump(&self.meta_path)?)
    }

    /// Sets a single metadata key and rewrites `meta.json`, matching
    /// `ssm/meta.py::Meta::setstore`.
    pub fn set_meta_value(&self, key: &str, value: impl Into<serde_json::Value>) -> Result<(), Error> {
        let mut meta = self.get_meta()?;
        meta.set(key, value);
        self.put_meta(&meta)
    }

    /// True if the domain's metadata version (or, absent that, its
    /// legacy `version` file) begins with a legacy prefix.
    pub fn is_legacy(&self) -> Result<bool, Error> {
        let meta = self.get_meta()?;
        let version = match meta.get_str("version") {
            Some(version) => Some(version.to_string()),
            None => legacy::read_version(&self.ssmd_path()),
        };
        Ok(version.map(|v| legacy::is_legacy_version(&v)).unwrap_or(false))
    }

    /// The repository group configured in `meta.json`'s `repository`
    /// field, or `None` if unset.
    pub fn get_repository(&self) -> Result<Option<RepositoryGroup>, Error> {
        let meta = self.get_meta()?;
        Ok(meta
            .get_str("repository")
            .map(|url| RepositoryGroup::from_urls([PathBuf::from(url)])))
    }

    /// The platform labels with at least one installed package.
    pub fn get_installed_platforms(&self) -> Result<Vec<String>, Error> {
        Ok(ssm_common::fs::list_dir_names_one_level(&self.installed_path)?)
    }

    /// The platform labels with at least one published package.
    pub fn get_published_platforms(&self) -> Result<Vec<String>, Error> {
        Ok(ssm_common::fs::list_dir_names_one_level(&self.published_path)?)
    }

    /// Every installed package, optionally restricted to `platforms`.
    pub fn get_installed_packages(&self, platforms: Option<&[String]>) -> Result<Vec<Package>, Error> {
        if self.is_legacy()? {
            return self.get_installed_packages_legacy(platforms);
        }

        let platforms = match platforms {
            Some(platforms) => platforms.to_vec(),
            None => self.get_installed_platforms()?,
        };

        let mut pkgs = Vec::new();
        for platform in platforms {
            let platdir = self.installed_path.join(&platform);
            for name in ssm_common::fs::list_dir_names_one_level(&platdir)? {
                pkgs.push(Package::new(self.path.join(name)));
            }
        }
        Ok(pkgs)
    }

    fn get_installed_packages_legacy(&self, platforms: Option<&[String]>) -> Result<Vec<Package>, Error> {
        let mut pkgs = Vec::new();
        for name in ssm_common::fs::list_dir_names_one_level(&self.installed_path)? {
            pkgs.push(Package::new(self.path.join(name)));
        }
        if let Some(platforms) = platforms {
            pkgs.retain(|pkg| {
                pkg.platform
                    .as_deref()
                    .map(|p| platforms.iter().any(|x| x == p))
                    .unwrap_or(false)
            });
        }
        Ok(pkgs)
    }

    /// The installed package named `name` (the package's full
    /// `SHORT_VERSION_PLATFORM` basename), or `None` if not installed.
    pub fn get_installed_package(&self, name: &str) -> Option<Package> {
        let pkg = Package::new(self.path.join(name));
        pkg.exists().then_some(pkg)
    }

    /// Every published package, optionally restricted to `platforms`.
    /// Rooted at the registry symlink's own directory, not the domain
    /// path — see the module docs.
    pub fn get_published_packages(&self, platforms: Option<&[String]>) -> Result<Vec<Package>, Error> {
        if self.is_legacy()? {
            return self.get_published_packages_legacy(platforms);
        }

        let platforms = match platforms {
            Some(platforms) => platforms.to_vec(),
            None => self.get_published_platforms()?,
        };

        let mut pkgs = Vec::new();
        for platform in platforms {
            let platdir = self.published_path.join(&platform);
            for name in ssm_common::fs::list_dir_names_one_level(&platdir)? {
                pkgs.push(Package::new(platdir.join(name)));
            }
        }
        Ok(pkgs)
    }

    fn get_published_packages_legacy(&self, platforms: Option<&[String]>) -> Result<Vec<Package>, Error> {
        let mut pkgs = Vec::new();
        for name in ssm_common::fs::list_dir_names_one_level(&self.published_path)? {
            pkgs.push(Package::new(self.published_path.join(name)));
        }
        if let Some(platforms) = platforms {
            pkgs.retain(|pkg| {
                pkg.platform
                    .as_deref()
                    .map(|p| platforms.iter().any(|x| x == p))
                    .unwrap_or(false)
            });
        }
        Ok(pkgs)
    }

    /// The published package named `name` on `platform` (or `name`'s own
    /// platform, if `platform` is `None`), or `None` if not published.
    pub fn get_published_package(&self, name: &str, platform: Option<&str>) -> Option<Package> {
        let pkg = Package::new(name);
        let platform = platform.or(pkg.platform.as_deref())?;
        let ppkg = Package::new(self.published_path.join(platform).join(name));
        ppkg.exists().then_some(ppkg)
    }

    /// The published package whose `SHORT` component is `short_name`,
    /// searched on `platform`, or (if `platform` is `None`) across every
    /// published platform in turn, returning the first match.
    pub fn get_published_package_short(
        &self,
        short_name: &str,
        platform: Option<&str>,
    ) -> Result<Option<Package>, Error> {
        let platforms = match platform {
            Some(platform) => vec![platform.to_string()],
            None => self.get_published_platforms()?,
        };

        for platform in platforms {
            let platdir = self.published_path.join(&platform);
            for name in ssm_common::fs::list_dir_names_one_level(&platdir)? {
                let ppkg = Package::new(platdir.join(&name));
                if ppkg.short.as_deref() == Some(short_name) && ppkg.exists() {
                    return Ok(Some(ppkg));
                }
            }
        }
        Ok(None)
    }

    /// True if `pkg`'s registered installed path matches `pkg.path`.
    pub fn is_installed(&self, pkg: &Package) -> bool {
        match self.get_installed_package(&pkg.name) {
            Some(ipkg) => ipkg.path == pkg.path,
            None => false,
        }
    }

    /// True if `pkg` is published on any of `platforms` (every published
    /// platform, if `None`), comparing by realpath so a package published
    /// via a different on-disk route still counts (I2).
    pub fn is_published(&self, pkg: &Package, platforms: Option<&[String]>) -> Result<bool, Error> {
        if !pkg.exists() {
            return Ok(false);
        }

        let platforms = match platforms {
            Some(platforms) => platforms.to_vec(),
            None => self.get_published_platforms()?,
        };

        for platform in platforms {
            if let Some(ppkg) = self.get_published_package(&pkg.name, Some(&platform)) {
                if ssm_common::fs::realpath(&ppkg.path)? == ssm_common::fs::realpath(&pkg.path)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// The published packages, on `platform`, that (directly or
    /// transitively) require `pkg`. Returns an empty list rather than
    /// propagating a dependency-graph error, matching
    /// `ssm/domain.py::Domain::get_dependents`'s blanket `except`.
    pub fn get_dependents(&self, pkg: &Package, platform: &str) -> Result<Vec<Package>, Error> {
        let platforms = vec![platform.to_string()];
        let ppkgs = self.get_published_packages(Some(&platforms))?;
        let mut short2ppkg: HashMap<String, Package> = HashMap::new();
        for ppkg in ppkgs {
            if let Some(short) = ppkg.short.clone() {
                short2ppkg.insert(short, ppkg);
            }
        }

        let Some(short) = pkg.short.clone() else {
            return Ok(Vec::new());
        };

        let dm = match self.create_depmgr(&platforms) {
            Ok(dm) => dm,
            Err(_) => return Ok(Vec::new()),
        };

        let shorts = dm.get_required_by(&[short], true);
        Ok(shorts
            .into_iter()
            .filter_map(|short| short2ppkg.get(&short).cloned())
            .collect())
    }

    /// A snapshot of metadata and both registries resolved to realpaths.
    pub fn get_inventory(&self) -> Result<Inventory, Error> {
        let legacy = self.is_legacy()?;
        let meta = self.get_meta()?;

        let mut installed = HashMap::new();
        if legacy {
            for name in ssm_common::fs::list_dir_names_one_level(&self.installed_path)? {
                if let Ok(target) = ssm_common::fs::realpath(&self.installed_path.join(&name)) {
                    installed.insert(name, target);
                }
            }
        } else {
            for platform in ssm_common::fs::list_dir_names_one_level(&self.installed_path)? {
                let platdir = self.installed_path.join(&platform);
                for name in ssm_common::fs::list_dir_names_one_level(&platdir)? {
                    if let Ok(target) = ssm_common::fs::realpath(&platdir.join(&name)) {
                        installed.insert(name, target);
                    }
                }
            }
        }

        let mut published = HashMap::new();
        for platform in ssm_common::fs::list_dir_names_one_level(&self.published_path)? {
            let platdir = self.published_path.join(&platform);
            let mut platpublished = HashMap::new();
            for name in ssm_common::fs::list_dir_names_one_level(&platdir)? {
                if let Ok(target) = ssm_common::fs::realpath(&platdir.join(&name)) {
                    platpublished.insert(name, target);
                }
            }
            published.insert(platform, platpublished);
        }

        Ok(Inventory {
            path: self.path.clone(),
            meta,
            legacy,
            installed,
            published,
        })
    }

    /// Builds a [`DependencyManager`] seeded with every published
    /// package on `platforms`, matching the private
    /// `Domain.__create_depmgr` helper.
    fn create_depmgr(&self, platforms: &[String]) -> Result<DependencyManager, Error> {
        let mut dm = DependencyManager::new();
        for pkg in self.get_published_packages(Some(platforms))? {
            let control = pkg.get_control(true)?;
            let name = control.name().unwrap_or(&pkg.name).to_string();
            let version = control.version().map(Version::new).transpose()?;
            dm.add(
                name,
                version,
                control.requires(),
                control.provides(),
                control.conflicts(),
            )?;
        }
        Ok(dm)
    }

    /// Creates a fresh domain at `self.path`: `broken/`, `installed/`,
    /// `published/`, the `self` symlink, and `meta.json` seeded from
    /// `metadata`. Fails with `AlreadyExists` unless `force`. Idempotent
    /// under `force` (directory creation and the `self` symlink are both
    /// no-ops on a second call), which is what lets [`Domain::upgrade`]
    /// reuse it.
    pub fn create(&self, metadata: &Control, force: bool) -> Result<(), Error> {
        if self.exists() && !force {
            return Err(Error::AlreadyExists {
                path: self.path.clone(),
            });
        }

        for rel in [".", "etc/ssm.d/broken", "etc/ssm.d/installed", "etc/ssm.d/published"] {
            let dir = self.path.join(rel);
            if !dir.is_dir() {
                ssm_common::fs::makedirs(&dir)?;
            }
        }

        ssm_common::fs::symlink(&self.path, &self.self_path, true)?;

        let mut meta = self.get_meta()?;
        for (key, value) in metadata.as_map() {
            meta.set(key, value.clone());
        }
        self.put_meta(&meta)?;
        Ok(())
    }

    /// Unpacks `pkgfile`, runs its `post-install` script, and registers
    /// it as installed. On failure after unpacking, the partially
    /// unpacked directory is moved under `etc/ssm.d/broken/<name>`
    /// rather than left in place (Design Note (c)).
    pub fn install(&self, pkgfile: &dyn PackageSource, force: bool, reinstall: bool) -> Result<Package, Error> {
        if !self.is_owner() {
            return Err(Error::NotOwner {
                path: self.path.clone(),
            });
        }
        if !pkgfile.is_valid() {
            return Err(Error::InvalidPackageFile {
                path: self.path.join(pkgfile.name()),
            });
        }

        let pkg = Package::new(self.path.join(pkgfile.name()));
        if self.is_installed(&pkg) && !force && !reinstall {
            return Err(Error::AlreadyInstalled { name: pkg.name });
        }

        debug!("install: {} into {}", pkgfile.name(), self.path.display());
        if let Err(source) = pkgfile.unpack(&self.path) {
            self.move_to_broken(&pkg)?;
            return Err(Error::InstallFailed {
                name: pkg.name,
                reason: source.to_string(),
            });
        }

        if let Err(source) = pkg.execute_script("post-install", &self.path) {
            self.move_to_broken(&pkg)?;
            return Err(Error::InstallFailed {
                name: pkg.name,
                reason: source.to_string(),
            });
        }

        self.set_installed(&pkg)?;
        Ok(pkg)
    }

    fn move_to_broken(&self, pkg: &Package) -> Result<(), Error> {
        if !pkg.path.is_dir() {
            return Ok(());
        }
        let broken_dir = self.path.join("etc/ssm.d/broken");
        ssm_common::fs::makedirs(&broken_dir)?;
        let dest = broken_dir.join(&pkg.name);
        fs::rename(&pkg.path, &dest).map_err(|source| Error::Io {
            path: pkg.path.clone(),
            source,
        })
    }

    fn set_installed(&self, pkg: &Package) -> Result<(), Error> {
        if self.is_legacy()? {
            let linkname = self.installed_path.join(&pkg.name);
            return Ok(ssm_common::fs::symlink(&pkg.path, &linkname, true)?);
        }

        let Some(platform) = pkg.platform.as_deref() else {
            return Err(Error::InvalidPackageName {
                path: pkg.path.clone(),
            });
        };
        let linkdir = self.installed_path.join(platform);
        let linkname = linkdir.join(&pkg.name);
        if !linkdir.exists() {
            ssm_common::fs::makedirs(&linkdir)?;
        }
        Ok(ssm_common::fs::symlink(&pkg.path, &linkname, true)?)
    }

    fn unset_installed(&self, pkg: &Package) -> Result<(), Error> {
        if self.is_legacy()? {
            let linkname = self.installed_path.join(&pkg.name);
            return Ok(ssm_common::fs::remove(&linkname)?);
        }

        let Some(platform) = pkg.platform.as_deref() else {
            return Err(Error::InvalidPackageName {
                path: pkg.path.clone(),
            });
        };
        let linkname = self.installed_path.join(platform).join(&pkg.name);
        Ok(ssm_common::fs::remove(&linkname)?)
    }

    fn set_published(&self, pkg: &Package, platform: Option<&str>) -> Result<(), Error> {
        let platform = platform
            .or(pkg.platform.as_deref())
            .ok_or_else(|| Error::InvalidPackageName {
                path: pkg.path.clone(),
            })?;
        let linkdir = self.published_path.join(platform);
        let linkname = linkdir.join(&pkg.name);
        if !linkdir.exists() {
            ssm_common::fs::makedirs(&linkdir)?;
        }
        Ok(ssm_common::fs::symlink(&pkg.path, &linkname, true)?)
    }

    fn unset_published(&self, pkg: &Package, platform: Option<&str>) -> Result<(), Error> {
        let platform = platform
            .or(pkg.platform.as_deref())
            .ok_or_else(|| Error::InvalidPackageName {
                path: pkg.path.clone(),
            })?;
        let linkname = self.published_path.join(platform).join(&pkg.name);
        Ok(ssm_common::fs::remove(&linkname)?)
    }

    /// Requires the package directory to be gone and unregisters it.
    /// Fails if `pkg` is not installed, or is still published anywhere
    /// (I5).
    pub fn uninstall(&self, pkg: &Package) -> Result<(), Error> {
        if !self.is_installed(pkg) {
            return Err(Error::NotInstalled {
                name: pkg.name.clone(),
            });
        }
        if self.is_published(pkg, None)? {
            return Err(Error::StillPublished {
                name: pkg.name.clone(),
            });
        }

        debug!("uninstall: {}", pkg.path.display());
        pkg.execute_script("pre-uninstall", &self.path)
            .map_err(|source| Error::UninstallFailed {
                name: pkg.name.clone(),
                reason: source.to_string(),
            })?;
        ssm_common::fs::rmtree(&pkg.path)?;
        self.unset_installed(pkg)
    }

    /// Registers an already-unpacked package directory (typically one
    /// belonging to another domain) as installed here, without
    /// unpacking anything or running `post-install`. Used by `cloned`
    /// to share a source domain's installed packages without
    /// re-installing them.
    pub fn register_installed(&self, pkg: &Package) -> Result<(), Error> {
        self.set_installed(pkg)
    }

    /// Checks that every package `pkg` (transitively) requires is
    /// already published on `platform`. Fails with `MissingPackage` for
    /// the first one that isn't.
    pub fn prepublish(&self, pkg: &Package, platform: &str) -> Result<(), Error> {
        let platforms = vec![platform.to_string()];
        let ppkgs = self.get_published_packages(Some(&platforms))?;
        let known: HashSet<String> = ppkgs.into_iter().filter_map(|ppkg| ppkg.short).collect();

        let mut dm = self.create_depmgr(&platforms)?;
        let control = pkg.get_control(true)?;
        let Some(short) = pkg.short.clone() else {
            return Err(Error::InvalidPackageName {
                path: pkg.path.clone(),
            });
        };
        let name = control.name().unwrap_or(&short).to_string();
        if dm.get_provider(&name).is_none() {
            let version = control.version().map(Version::new).transpose()?;
            dm.add(
                name.clone(),
                version,
                control.requires(),
                control.provides(),
                control.conflicts(),
            )?;
        }

        for depname in dm.generate(&[name.clone()])? {
            if depname != name && depname != short && !known.contains(&depname) {
                return Err(Error::MissingPackage { name: depname });
            }
        }
        Ok(())
    }

    /// Mirrors every file under `pkg`'s [`PUBLISHABLE_DIRS`] into
    /// `DOMPATH/PLATFORM/...` as a symlink, then registers `pkg` as
    /// published on `platform`.
    pub fn publish(&self, pkg: &Package, platform: &str, force: bool) -> Result<(), Error> {
        if !self.is_owner() {
            return Err(Error::NotOwner {
                path: self.path.clone(),
            });
        }

        let platforms = vec![platform.to_string()];
        if self.is_published(pkg, Some(&platforms))? {
            if !force {
                return Err(Error::AlreadyPublished {
                    name: pkg.name.clone(),
                    platform: platform.to_string(),
                });
            }
            self.unpublish(pkg, platform, force)?;
        }

        debug!("publish: {} on {}", pkg.name, platform);
        let pubplatpath = self.path.join(platform);
        for pubdirname in PUBLISHABLE_DIRS {
            let srcdir = pkg.path.join(pubdirname);
            if !srcdir.is_dir() {
                continue;
            }

            let mut walker = ssm_common::walker::Walker::new(&srcdir);
            while let Some(entry) = walker.next_entry()? {
                let relpath = entry
                    .dir
                    .strip_prefix(&pkg.path)
                    .expect("walker never leaves pkg.path");
                let pubbasedir = pubplatpath.join(relpath);
                if !pubbasedir.exists() {
                    ssm_common::fs::makedirs(&pubbasedir)?;
                }
                for file in &entry.files {
                    let filename = file.file_name().expect("directory entries are named");
                    let linkname = pubbasedir.join(filename);
                    ssm_common::fs::symlink(file, &linkname, force)?;
                }
            }
        }

        self.set_published(pkg, Some(platform))
    }

    /// Removes exactly the symlinks that resolve under `pkg.path` from
    /// `platform`'s published tree, and any directory left empty by
    /// that removal (I4). Files contributed by other published packages
    /// sharing the same directory are left untouched (P7).
    pub fn unpublish(&self, pkg: &Package, platform: &str, force: bool) -> Result<(), Error> {
        let platforms = vec![platform.to_string()];
        if !self.is_published(pkg, Some(&platforms))? && !force {
            return Err(Error::NotPublished {
                name: pkg.name.clone(),
                platform: platform.to_string(),
            });
        }

        debug!("unpublish: {} on {}", pkg.name, platform);
        let pubplatpath = self.path.join(platform);
        for pubdirname in PUBLISHABLE_DIRS {
            let pubdirpath = pubplatpath.join(pubdirname);
            if !pubdirpath.is_dir() {
                continue;
            }
            self.unpublish_dir(&pubdirpath, &pubdirpath, pkg)?;
        }

        self.unset_published(pkg, Some(platform))
    }

    /// Bottom-up removal of `pkg`'s contribution to the tree at `dir`
    /// (`root` is `dir`'s own top, which is never itself removed).
    fn unpublish_dir(&self, dir: &Path, root: &Path, pkg: &Package) -> Result<(), Error> {
        let (subdirs, files) = ssm_common::fs::list_dir_one_level(dir)?;
        for subdir in &subdirs {
            self.unpublish_dir(subdir, root, pkg)?;
        }

        let pkg_realpath = ssm_common::fs::realpath(&pkg.path).unwrap_or_else(|_| pkg.path.clone());
        let mut removed = 0usize;
        for file in &files {
            if let Ok(realpath) = ssm_common::fs::realpath(file) {
                if realpath.starts_with(&pkg_realpath) {
                    ssm_common::fs::remove(file)?;
                    removed += 1;
                }
            }
        }

        if removed == files.len() && dir != root {
            let (remaining_subdirs, _) = ssm_common::fs::list_dir_one_level(dir)?;
            if remaining_subdirs.is_empty() {
                let _ = ssm_common::fs::rmdir(dir);
            }
        }
        Ok(())
    }

    /// Upgrades a legacy domain in place: writes a current `meta.json`
    /// from the legacy `label`/`sources.list`/`version` files, rewrites
    /// per-package legacy control files to `control.json`, moves every
    /// flat `installed/`/`published/` entry into its per-platform
    /// subdirectory, and removes the now-superseded legacy files.
    ///
    /// `components` gates each step independently, matching
    /// `ssm_upgraded.py::upgrade_legacy`'s `-c` option: selecting only
    /// `"meta"` performs the metadata rewrite and nothing else, rather
    /// than running every step regardless of selection.
    pub fn upgrade(&self, components: &UpgradeComponents) -> Result<(), Error> {
        debug!("upgrade: {}", self.path.display());
        let ssmd_path = self.ssmd_path();

        if components.self_ {
            ssm_common::fs::symlink(&self.path, &self.self_path, true)?;
        }

        if components.meta {
            let mut metadata = Control::new();
            if let Some(label) = legacy::read_label(&ssmd_path) {
                metadata.set("label", label);
            }
            if let Some(repository) = legacy::read_sources(&ssmd_path) {
                metadata.set("repository", repository);
            }
            metadata.set("version", SSM_VERSION);
            self.create(&metadata, true)?;
        }

        if components.control {
            for (_, target) in self.upgrade_flat_registry(&self.installed_path)? {
                let pkg = Package::new(target);
                if pkg.exists() && !pkg.has_control(false) {
                    let control = pkg.get_control(true)?;
                    pkg.put_control(&control)?;
                }
            }
        }

        if components.installed {
            for (name, target) in self.upgrade_flat_registry(&self.installed_path)? {
                let pkg = Package::new(target);
                if pkg.exists() {
                    self.set_installed(&pkg)?;
                }
                let _ = ssm_common::fs::remove(&self.installed_path.join(&name));
            }
        }

        if components.published {
            for (name, target) in self.upgrade_flat_registry(&self.published_path)? {
                let pkg = Package::new(target);
                if pkg.exists() {
                    if let Some(platform) = pkg.platform.clone() {
                        self.set_published(&pkg, Some(&platform))?;
                    }
                }
                let _ = ssm_common::fs::remove(&self.published_path.join(&name));
            }
        }

        if components.old_files {
            for filename in ["version", "label", "sources.list"] {
                let path = ssmd_path.join(filename);
                if path.exists() {
                    let _ = ssm_common::fs::remove(&path);
                }
            }
        }

        if components.old_dirs {
            for dirname in ["domainHomes", "platforms"] {
                let path = ssmd_path.join(dirname);
                if path.exists() {
                    let _ = ssm_common::fs::rmtree(&path);
                }
            }
        }
        Ok(())
    }

    /// Lists the symlinked, name-triple entries directly under a flat
    /// legacy registry directory, pairing each with its link target.
    fn upgrade_flat_registry(&self, registry_path: &Path) -> Result<Vec<(String, PathBuf)>, Error> {
        let mut entries = Vec::new();
        let Ok(read_dir) = fs::read_dir(registry_path) else {
            return Ok(entries);
        };

        for direntry in read_dir {
            let direntry = direntry.map_err(|source| Error::Io {
                path: registry_path.to_path_buf(),
                source,
            })?;
            let file_type = direntry.file_type().map_err(|source| Error::Io {
                path: direntry.path(),
                source,
            })?;
            if !file_type.is_symlink() {
                continue;
            }

            let name = direntry.file_name().to_string_lossy().into_owned();
            if name.parse::<PackageName>().is_err() {
                continue;
            }

            let target = fs::read_link(direntry.path()).map_err(|source| Error::Io {
                path: direntry.path(),
                source,
            })?;
            entries.push((name, target));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use ssm_package::PackageFileSkeleton;
    use testresult::TestResult;

    use super::*;

    fn new_domain(dir: &Path) -> Domain {
        Domain::new(dir)
    }

    fn install_skeleton(dom: &Domain, name: &str) -> TestResult<Package> {
        let skeleton = PackageFileSkeleton::new(
            dom.path.join(format!("{name}.ssm")),
            vec!["control".to_string(), "pubdirs".to_string()],
        );
        skeleton.unpack(&dom.path)?;
        let pkg = Package::new(dom.path.join(name));
        dom.set_installed_for_test(&pkg)?;
        Ok(pkg)
    }

    impl Domain {
        // Test-only shortcut bypassing `is_owner`, which cannot be
        // faked portably in a sandboxed test environment.
        fn set_installed_for_test(&self, pkg: &Package) -> Result<(), Error> {
            self.set_installed(pkg)
        }
    }

    #[test]
    fn s1_create_writes_layout_and_version() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dompath = dir.path().join("dom");
        let dom = new_domain(&dompath);

        let mut meta = Control::new();
        meta.set("label", "test");
        meta.set("version", SSM_VERSION);
        dom.create(&meta, false)?;

        assert!(dompath.join("etc/ssm.d/broken").is_dir());
        assert!(dompath.join("etc/ssm.d/installed").is_dir());
        assert!(dompath.join("etc/ssm.d/published").is_dir());
        assert!(dompath.join("etc/ssm.d/self").exists());

        let loaded = dom.get_meta()?;
        assert_eq!(loaded.get_str("version"), Some(SSM_VERSION));
        assert_eq!(loaded.get_str("label"), Some("test"));
        Ok(())
    }

    #[test]
    fn create_without_force_fails_on_existing() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;
        let err = dom.create(&Control::new(), false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        Ok(())
    }

    #[test]
    fn s2_skeleton_install_registers_platform_symlink() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;

        let pkg = install_skeleton(&dom, "hello_1.0_linux-x86-64")?;
        assert!(pkg.path.join(".ssm.d/control.json").is_file());

        let link = dom
            .path
            .join("etc/ssm.d/installed/linux-x86-64/hello_1.0_linux-x86-64");
        assert_eq!(fs::read_link(&link)?, pkg.path);
        assert!(dom.is_installed(&pkg));
        Ok(())
    }

    #[test]
    fn p3_s3_s4_publish_unpublish_roundtrip() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;
        let pkg = install_skeleton(&dom, "hello_1.0_linux-x86-64")?;
        fs::write(pkg.path.join("bin/hello"), b"#!/bin/sh\n")?;

        // publish() requires is_owner(); bypass it by calling the
        // underlying mechanics directly is not possible from outside,
        // so this test exercises the parts that don't gate on
        // ownership: build the published tree by hand the way
        // `publish` would, then verify `unpublish` tears it down
        // surgically.
        let linkname = dom.path.join("linux-x86-64/bin/hello");
        ssm_common::fs::makedirs(linkname.parent().unwrap())?;
        ssm_common::fs::symlink(&pkg.path.join("bin/hello"), &linkname, false)?;
        dom.set_published(&pkg, Some("linux-x86-64"))?;

        assert!(dom.is_published(&pkg, None)?);
        assert!(linkname.is_symlink());

        dom.unpublish(&pkg, "linux-x86-64", false)?;
        assert!(!linkname.exists());
        assert!(!dom
            .path
            .join("etc/ssm.d/published/linux-x86-64/hello_1.0_linux-x86-64")
            .exists());
        assert!(pkg.path.join("bin/hello").is_file());
        Ok(())
    }

    #[test]
    fn p7_unpublish_is_surgical() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;

        let pkg_a = install_skeleton(&dom, "a_1.0_linux-x86-64")?;
        let pkg_b = install_skeleton(&dom, "b_1.0_linux-x86-64")?;
        fs::write(pkg_a.path.join("bin/hello"), b"a")?;
        fs::write(pkg_b.path.join("bin/hello"), b"b")?;

        let shared = dom.path.join("linux-x86-64/bin/hello");
        ssm_common::fs::makedirs(shared.parent().unwrap())?;

        // publish A, then B overwrites the same shared path (force).
        ssm_common::fs::symlink(&pkg_a.path.join("bin/hello"), &shared, false)?;
        dom.set_published(&pkg_a, Some("linux-x86-64"))?;
        ssm_common::fs::symlink(&pkg_b.path.join("bin/hello"), &shared, true)?;
        dom.set_published(&pkg_b, Some("linux-x86-64"))?;

        dom.unpublish(&pkg_a, "linux-x86-64", true)?;

        // A's symlink pointed at a path that no longer matches the
        // live link target (B's), so unpublishing A must not touch it.
        assert!(shared.is_symlink());
        assert_eq!(fs::read_link(&shared)?, pkg_b.path.join("bin/hello"));
        Ok(())
    }

    #[test]
    fn p8_uninstall_blocked_while_published() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;
        let pkg = install_skeleton(&dom, "hello_1.0_linux-x86-64")?;

        let linkname = dom.path.join("linux-x86-64/bin/hello");
        ssm_common::fs::makedirs(linkname.parent().unwrap())?;
        fs::write(pkg.path.join("bin/hello"), b"x")?;
        ssm_common::fs::symlink(&pkg.path.join("bin/hello"), &linkname, false)?;
        dom.set_published(&pkg, Some("linux-x86-64"))?;

        let err = dom.uninstall(&pkg).unwrap_err();
        assert!(matches!(err, Error::StillPublished { .. }));
        Ok(())
    }

    #[test]
    fn p4_reinstall_is_idempotent() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;
        let pkg = install_skeleton(&dom, "hello_1.0_linux-x86-64")?;

        // A second `set_installed` (what a `reinstall=true` install does
        // after re-unpacking) must leave the registry pointing at the
        // same place.
        dom.set_installed_for_test(&pkg)?;
        assert!(dom.is_installed(&pkg));
        Ok(())
    }

    #[test]
    fn is_published_false_for_uninstalled_package() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;
        let pkg = Package::new(dom.path.join("ghost_1.0_linux-x86-64"));
        assert!(!dom.is_published(&pkg, None)?);
        Ok(())
    }

    #[test]
    fn s6_legacy_upgrade() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dompath = dir.path().join("dom");
        let ssmd = dompath.join("etc/ssm.d");
        ssm_common::fs::makedirs(&ssmd)?;
        fs::write(ssmd.join("version"), "10.0")?;
        fs::write(ssmd.join("label"), "foo")?;
        fs::write(ssmd.join("sources.list"), "file:///repo")?;

        let pkgdir = dompath.join("hello_1.0_linux-x86-64");
        ssm_common::fs::makedirs(&pkgdir.join(".ssm.d"))?;
        fs::write(
            pkgdir.join(".ssm.d/control.json"),
            r#"{"name":"hello","version":"1.0","platform":"linux-x86-64"}"#,
        )?;
        ssm_common::fs::makedirs(&ssmd.join("installed"))?;
        ssm_common::fs::symlink(
            &pkgdir,
            &ssmd.join("installed/hello_1.0_linux-x86-64"),
            false,
        )?;

        let dom = Domain::new(&dompath);
        assert!(dom.is_legacy()?);

        dom.upgrade(&UpgradeComponents::all())?;

        assert!(!dom.is_legacy()?);
        let meta = dom.get_meta()?;
        assert_eq!(meta.get_str("label"), Some("foo"));
        assert_eq!(meta.get_str("repository"), Some("file:///repo"));
        assert_eq!(meta.get_str("version"), Some(SSM_VERSION));

        assert!(ssmd
            .join("installed/linux-x86-64/hello_1.0_linux-x86-64")
            .is_symlink());
        assert!(ssmd.join("self").is_symlink());
        assert!(!ssmd.join("version").exists());
        assert!(!ssmd.join("label").exists());
        assert!(!ssmd.join("sources.list").exists());
        Ok(())
    }

    #[test]
    fn upgrade_honors_selected_components_only() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dompath = dir.path().join("dom");
        let ssmd = dompath.join("etc/ssm.d");
        ssm_common::fs::makedirs(&ssmd)?;
        fs::write(ssmd.join("version"), "10.0")?;
        fs::write(ssmd.join("label"), "foo")?;
        fs::write(ssmd.join("sources.list"), "file:///repo")?;

        let pkgdir = dompath.join("hello_1.0_linux-x86-64");
        ssm_common::fs::makedirs(&pkgdir.join(".ssm.d"))?;
        fs::write(
            pkgdir.join(".ssm.d/control.json"),
            r#"{"name":"hello","version":"1.0","platform":"linux-x86-64"}"#,
        )?;
        ssm_common::fs::makedirs(&ssmd.join("installed"))?;
        ssm_common::fs::symlink(
            &pkgdir,
            &ssmd.join("installed/hello_1.0_linux-x86-64"),
            false,
        )?;

        let dom = Domain::new(&dompath);
        let meta_only = UpgradeComponents::parse("meta");
        assert!(!meta_only.installed);
        assert!(!meta_only.old_files);
        dom.upgrade(&meta_only)?;

        // meta.json was written...
        let meta = dom.get_meta()?;
        assert_eq!(meta.get_str("version"), Some(SSM_VERSION));
        // ...but the flat installed/ entry and the old legacy files are
        // untouched: selecting "meta" must not run the other steps.
        assert!(ssmd.join("installed/hello_1.0_linux-x86-64").is_symlink());
        assert!(!ssmd
            .join("installed/linux-x86-64/hello_1.0_linux-x86-64")
            .exists());
        assert!(ssmd.join("version").exists());
        assert!(ssmd.join("label").exists());
        assert!(ssmd.join("sources.list").exists());
        Ok(())
    }

    #[test]
    fn prepublish_reports_missing_dependency() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;

        let pkg = install_skeleton(&dom, "needs-hdf5_1.0_linux-x86-64")?;
        let mut control = pkg.get_control(false)?;
        control.set("name", "needs-hdf5");
        control.set("version", "1.0");
        control.set("requires", "hdf5");
        pkg.put_control(&control)?;

        let err = dom.prepublish(&pkg, "linux-x86-64").unwrap_err();
        assert!(matches!(err, Error::MissingPackage { .. }));
        Ok(())
    }

    #[test]
    fn get_inventory_reports_installed_and_published() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dom = new_domain(dir.path());
        dom.create(&Control::new(), false)?;
        let pkg = install_skeleton(&dom, "hello_1.0_linux-x86-64")?;

        let linkname = dom.path.join("linux-x86-64/bin/hello");
        ssm_common::fs::makedirs(linkname.parent().unwrap())?;
        fs::write(pkg.path.join("bin/hello"), b"x")?;
        ssm_common::fs::symlink(&pkg.path.join("bin/hello"), &linkname, false)?;
        dom.set_published(&pkg, Some("linux-x86-64"))?;

        let inventory = dom.get_inventory()?;
        assert!(inventory.installed.contains_key("hello_1.0_linux-x86-64"));
        assert!(inventory
            .published
            .get("linux-x86-64")
            .map(|m| m.contains_key("hello_1.0_linux-x86-64"))
            .unwrap_or(false));
        Ok(())
    }
}
