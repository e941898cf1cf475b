//! Reading `bcontrol.json` out of a `.bssm` build spec without a full
//! unpack, and seeding a [`ssm_deps::DependencyManager`] from a
//! directory of them.
//!
//! Grounded on `ssm/builder.py::Builder.__init__`'s
//! `json.load(tarfile.open(bssmpath).extractfile("bcontrol.json"))`.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use ssm_control::Control;
use ssm_deps::DependencyManager;
use ssm_types::Version;
use tar::Archive;

use crate::Error;

/// Reads and parses the `bcontrol.json` member of the `.bssm` archive
/// at `path`. Returns an empty [`Control`] if the archive has none,
/// matching the Python original's blanket `except: self.bcontrol = {}`.
pub fn read_bcontrol(path: &Path) -> Result<Control, Error> {
    let file = fs::File::open(path).map_err(|source| Error::OpenBssm {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = Archive::new(file);
    let entries = archive.entries().map_err(|source| Error::ReadMember {
        path: path.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|source| Error::ReadMember {
            path: path.to_path_buf(),
            source,
        })?;
        let entry_path = entry.path().map_err(|source| Error::ReadMember {
            path: path.to_path_buf(),
            source,
        })?;
        if entry_path.as_os_str() != "bcontrol.json" {
            continue;
        }

        let mut text = String::new();
        entry.read_to_string(&mut text).map_err(|source| Error::ReadMember {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|_| Error::MissingBControl {
                path: path.to_path_buf(),
            })?;
        let mut control = Control::new();
        if let serde_json::Value::Object(map) = value {
            for (key, v) in map {
                control.set(&key, v);
            }
        }
        return Ok(control);
    }

    Ok(Control::new())
}

/// One `.bssm` build spec found under a build-spec directory, paired
/// with its parsed `bcontrol.json`.
#[derive(Clone, Debug)]
pub struct BuildSpec {
    /// The `.bssm` archive's path.
    pub path: PathBuf,
    /// The spec's parsed build control metadata.
    pub bcontrol: Control,
}

/// Loads every `.bssm` file directly inside `dir`, matching build
/// orchestrator step 1 ("loads each `bcontrol.json`").
pub fn load_build_specs(dir: &Path) -> Result<Vec<BuildSpec>, Error> {
    let mut specs = Vec::new();
    let entries = fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("bssm") {
            continue;
        }
        let bcontrol = read_bcontrol(&path)?;
        specs.push(BuildSpec { path, bcontrol });
    }
    Ok(specs)
}

/// Registers every spec's `(name, version, requires, provides,
/// conflicts)` in a fresh [`DependencyManager`], matching build
/// orchestrator step 1.
pub fn build_depmgr(specs: &[BuildSpec]) -> Result<DependencyManager, Error> {
    let mut dm = DependencyManager::new();
    for spec in specs {
        let Some(name) = spec.bcontrol.name() else {
            continue;
        };
        let version = spec.bcontrol.version().map(Version::new).transpose().ok().flatten();
        dm.add(
            name.to_string(),
            version,
            spec.bcontrol.requires(),
            spec.bcontrol.provides(),
            spec.bcontrol.conflicts(),
        )?;
    }
    Ok(dm)
}
