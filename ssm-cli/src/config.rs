//! Loads `ssm.conf`, the ambient configuration file the `ssm/config.py`
//! original reads before dispatching any subcommand: a system-wide copy
//! next to the executable, overridden by a per-user copy under
//! `~/.ssm/ssm.conf`.

use std::env;
use std::path::PathBuf;

use ini::Ini;
use log::debug;

/// The `[defaults]` section of `ssm.conf`.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// `disabled_publish_platforms`: comma/space-separated platform
    /// labels.
    pub disabled_publish_platforms: Vec<String>,
    /// `list_for_all_platforms`: `yes`/`true` enables it.
    pub list_for_all_platforms: bool,
}

fn split_commaspace(v: &str) -> Vec<String> {
    v.replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn system_conf_path() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let dir = exe.parent()?;
    Some(dir.join("../etc/ssm/ssm.conf"))
}

fn user_conf_path() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".ssm/ssm.conf"))
}

/// Reads the system then user `ssm.conf`, the user copy overriding the
/// system one option-by-option, matching
/// `ConfigParser().read([SYSCONFPATH, USERCONFPATH])`. Missing files are
/// silently skipped; a present but malformed file is also skipped,
/// since a bad config file should never block every subcommand.
pub fn load_config() -> Config {
    let mut config = Config::default();

    for path in [system_conf_path(), user_conf_path()].into_iter().flatten() {
        let Ok(ini) = Ini::load_from_file(&path) else {
            continue;
        };
        debug!("loaded config file {}", path.display());

        if let Some(v) = ini.get_from(Some("defaults"), "disabled_publish_platforms") {
            config.disabled_publish_platforms = split_commaspace(v);
        }
        if let Some(v) = ini.get_from(Some("defaults"), "list_for_all_platforms") {
            config.list_for_all_platforms = matches!(v.to_lowercase().as_str(), "yes" | "true");
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_commaspace_handles_mixed_separators() {
        assert_eq!(
            split_commaspace("linux, windows  mac"),
            vec!["linux".to_string(), "windows".to_string(), "mac".to_string()]
        );
    }
}
