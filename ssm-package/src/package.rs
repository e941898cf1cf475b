//! An unpacked package directory: `$DOMAIN/pkg/$PLATFORM/$NAME/`.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use ssm_control::Control;
use ssm_types::PackageName;

use crate::Error;

/// An unpacked package directory.
///
/// Grounded on `ssm/package.py::Package`: wraps a directory path plus the
/// `short`/`version`/`platform` triple parsed from its basename.
#[derive(Clone, Debug)]
pub struct Package {
    /// The package directory.
    pub path: PathBuf,
    /// The `SHORT` component of the name, if the basename parsed.
    pub short: Option<String>,
    /// The `VERSION` component, if the basename parsed.
    pub version: Option<String>,
    /// The `PLATFORM` component, if the basename parsed.
    pub platform: Option<String>,
    /// The full basename (`SHORT_VERSION_PLATFORM`).
    pub name: String,
}

impl Package {
    /// Wraps an existing (or not-yet-created) package directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match name.parse::<PackageName>() {
            Ok(parsed) => Self {
                path,
                short: Some(parsed.short().to_string()),
                version: Some(parsed.version().to_string()),
                platform: Some(parsed.platform().to_string()),
                name,
            },
            Err(_) => Self {
                path,
                short: None,
                version: None,
                platform: None,
                name,
            },
        }
    }

    /// True if this package's directory exists on disk.
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    fn control_json_path(&self) -> PathBuf {
        self.path.join(".ssm.d/control.json")
    }

    fn control_legacy_path(&self) -> PathBuf {
        self.path.join(".ssm.d/control")
    }

    /// True if a control file exists (current by default, or legacy when
    /// `legacy` is set).
    pub fn has_control(&self, legacy: bool) -> bool {
        if legacy {
            self.control_legacy_path().is_file()
        } else {
            self.control_json_path().is_file()
        }
    }

    /// Loads this package's control metadata. Falls back to the legacy
    /// format when `allow_legacy` is set and no current control file
    /// exists, matching `ssm/package.py::Package::getControl`.
    pub fn get_control(&self, allow_legacy: bool) -> Result<Control, Error> {
        if self.control_json_path().is_file() {
            return Ok(Control::load(&self.control_json_path())?);
        }
        if allow_legacy && self.control_legacy_path().is_file() {
            return Ok(Control::load_legacy(&self.control_legacy_path()));
        }
        Ok(Control::load(&self.control_json_path())?)
    }

    /// Writes `control` as this package's current (JSON) control file.
    pub fn put_control(&self, control: &Control) -> Result<(), Error> {
        ssm_common::fs::makedirs(&self.path.join(".ssm.d"))?;
        Ok(control.dump(&self.control_json_path())?)
    }

    /// Lists this package's members (relative paths under `self.path`)
    /// whose path matches `prefix`, matching `Package::getMembers`.
    pub fn get_members(&self, prefix: &str) -> Result<Vec<PathBuf>, Error> {
        let mut out = Vec::new();
        let root = self.path.join(prefix);
        if !root.exists() {
            return Ok(out);
        }
        let mut walker = ssm_common::walker::Walker::new(&root);
        while let Some(entry) = walker.next_entry()? {
            for file in &entry.files {
                if let Ok(relative) = file.strip_prefix(&self.path) {
                    out.push(relative.to_path_buf());
                }
            }
        }
        Ok(out)
    }

    /// Runs a named lifecycle script (`pre-install`, `post-install`,
    /// `pre-uninstall`, `post-uninstall`, ...) from `.ssm.d/` if present.
    ///
    /// Grounded on `alpm-pkgbuild/src/bridge/mod.rs::run_bridge_script`'s
    /// use of `std::process::Command` with a fixed working directory and
    /// piped, captured-on-failure stdio, adapted from a `$PATH`-searched
    /// helper to a script addressed by its absolute path inside
    /// `.ssm.d/`, and honoring the `SSM_OLD_PREPOST` environment variable
    /// the way `ssm/package.py::execute_script` does: when set, the
    /// script is invoked as an argument to `/bin/sh` instead of directly,
    /// for packages whose scripts predate the executable-bit convention.
    pub fn execute_script(&self, script_name: &str, domain_home: &Path) -> Result<bool, Error> {
        let script_path = self.path.join(".ssm.d").join(script_name);
        if !script_path.is_file() {
            return Ok(false);
        }

        let mut argv: Vec<PathBuf> = Vec::new();
        if env::var_os("SSM_OLD_PREPOST").is_some() {
            argv.push(PathBuf::from("/bin/sh"));
            argv.push(script_path.clone());
        } else {
            if !is_executable(&script_path) {
                return Err(Error::ScriptNotExecutable { path: script_path });
            }
            argv.push(script_path.clone());
        }
        argv.push(domain_home.to_path_buf());
        argv.push(self.path.clone());

        let basename = self.short.as_deref().unwrap_or(&self.name);
        let profile_dir = self.path.join("etc/profile.d");

        let mut env_vars: HashMap<&str, String> = HashMap::new();
        env_vars.insert("SSM_INSTALL_DOMAIN_HOME", domain_home.display().to_string());
        env_vars.insert("SSM_INSTALL_PACKAGE_HOME", self.path.display().to_string());
        env_vars.insert(
            "SSM_INSTALL_PROFILE_PATH",
            profile_dir.join(format!("{basename}.sh")).display().to_string(),
        );
        env_vars.insert(
            "SSM_INSTALL_LOGIN_PATH",
            profile_dir.join(format!("{basename}.csh")).display().to_string(),
        );

        debug!("execute_script: {} in {}", script_path.display(), self.path.display());

        let (program, args) = argv.split_first().expect("argv always has one element");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.path)
            .envs(env_vars)
            .output()
            .map_err(|source| Error::ScriptLaunch {
                path: script_path.clone(),
                source,
            })?;

        if !output.status.success() {
            debug!(
                "script {} failed:\nstdout: {}\nstderr: {}",
                script_path.display(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(Error::ScriptFailed {
                path: script_path,
                status: output.status.code().unwrap_or(-1),
            });
        }

        Ok(true)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parses_name_triple_from_basename() {
        let pkg = Package::new("/domain/pkg/linux/hello_1.0_linux");
        assert_eq!(pkg.short.as_deref(), Some("hello"));
        assert_eq!(pkg.version.as_deref(), Some("1.0"));
        assert_eq!(pkg.platform.as_deref(), Some("linux"));
    }

    #[test]
    fn tolerates_unparseable_basename() {
        let pkg = Package::new("/domain/pkg/linux/not-a-triple");
        assert_eq!(pkg.short, None);
    }

    #[test]
    fn control_roundtrips() -> TestResult {
        let dir = tempdir()?;
        let pkg = Package::new(dir.path().join("hello_1.0_linux"));
        fs::create_dir_all(&pkg.path)?;

        let mut control = Control::new();
        control.set("name", "hello");
        pkg.put_control(&control)?;

        assert!(pkg.has_control(false));
        let loaded = pkg.get_control(false)?;
        assert_eq!(loaded.name(), Some("hello"));
        Ok(())
    }

    #[test]
    fn missing_script_is_noop() -> TestResult {
        let dir = tempdir()?;
        let pkg = Package::new(dir.path().join("hello_1.0_linux"));
        fs::create_dir_all(pkg.path.join(".ssm.d"))?;
        let ran = pkg.execute_script("post-install", dir.path())?;
        assert!(!ran);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn rejects_non_executable_script() -> TestResult {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let pkg = Package::new(dir.path().join("hello_1.0_linux"));
        let scripts_dir = pkg.path.join(".ssm.d");
        fs::create_dir_all(&scripts_dir)?;
        let script = scripts_dir.join("post-install");
        fs::write(&script, "#!/bin/sh\nexit 0\n")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644))?;

        let err = pkg.execute_script("post-install", dir.path()).unwrap_err();
        assert!(matches!(err, Error::ScriptNotExecutable { .. }));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn runs_executable_script() -> TestResult {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let pkg = Package::new(dir.path().join("hello_1.0_linux"));
        let scripts_dir = pkg.path.join(".ssm.d");
        fs::create_dir_all(&scripts_dir)?;
        let script = scripts_dir.join("post-install");
        fs::write(&script, "#!/bin/sh\nexit 0\n")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

        let ran = pkg.execute_script("post-install", dir.path())?;
        assert!(ran);
        Ok(())
    }
}
