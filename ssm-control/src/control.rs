//! Package and domain control metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

use crate::Error;

/// Package/domain metadata: `name`, `version`, `platform`, `summary`,
/// `requires`, `provides`, `conflicts`, `build-script`/`bh-script`,
/// `args`, `env`, and any other key a producer chose to stash here.
///
/// Backed by a `serde_json::Map`, the direct analogue of
/// `ssm/jsonfile.py::JsonFile`'s generic `self.d` dict.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Control {
    map: Map<String, Value>,
}

impl Control {
    /// An empty [`Control`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a current (JSON) control file. A missing file yields an
    /// empty [`Control`], matching `ssm/jsonfile.py::JsonFile::load`'s
    /// `if os.path.exists(path)` guard.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let map = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(Self { map })
    }

    /// Loads a legacy, `Debian`-style colon-separated control file.
    ///
    /// Never returns an error: a missing file or malformed content
    /// yields an empty [`Control`] with a debug-level trace, matching
    /// `ssm/control.py::Control::load_legacy`'s blanket `except` clause.
    pub fn load_legacy(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                debug!("load_legacy({}): {source}", path.display());
                return Self::new();
            }
        };

        fn commit(control: &mut Control, key: &str, lines: &[String]) {
            if key == "description" {
                if let Some((first, rest)) = lines.split_first() {
                    control.set("summary", first.clone());
                    let body: Vec<String> = rest
                        .iter()
                        .map(|s| s.strip_prefix(' ').unwrap_or(s).to_string())
                        .collect();
                    control.set("description", body.join("\n"));
                }
            } else {
                control.set(key, lines.join("\n"));
            }
        }

        let mut control = Self::new();
        let mut current_key: Option<String> = None;
        let mut current_lines: Vec<String> = Vec::new();

        for line in text.lines() {
            if let Some(continuation) = line.strip_prefix(' ') {
                current_lines.push(continuation.to_string());
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(key) = current_key.take() {
                commit(&mut control, &key, &current_lines);
            }
            current_lines.clear();

            let Some((raw_key, raw_value)) = trimmed.split_once(':') else {
                continue;
            };
            let mut key = raw_key.trim().to_lowercase().replace(' ', "-");
            if key == "package" {
                key = "name".to_string();
            }
            current_lines.push(raw_value.trim().to_string());
            current_key = Some(key);
        }
        if let Some(key) = current_key {
            commit(&mut control, &key, &current_lines);
        }

        control
    }

    /// Writes this [`Control`] as pretty, sorted-key JSON (2-space
    /// indent), matching `JsonFile::dump(..., sort_keys=True)`.
    pub fn dump(&self, path: &Path) -> Result<(), Error> {
        let sorted: BTreeMap<&String, &Value> = self.map.iter().collect();
        let text = serde_json::to_string_pretty(&sorted).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Gets a raw value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Gets a string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    /// Sets a raw value by key.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.map.insert(key.to_string(), value.into());
    }

    /// All key/value pairs.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    /// The `name` field.
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// The `version` field.
    pub fn version(&self) -> Option<&str> {
        self.get_str("version")
    }

    /// The `platform` field.
    pub fn platform(&self) -> Option<&str> {
        self.get_str("platform")
    }

    /// The `summary` field.
    pub fn summary(&self) -> Option<&str> {
        self.get_str("summary")
    }

    /// The `requires` field, as written (comma-separated testable
    /// expressions); parsing is `ssm-deps`'s job.
    pub fn requires(&self) -> Option<&str> {
        self.get_str("requires")
    }

    /// The `provides` field, as written.
    pub fn provides(&self) -> Option<&str> {
        self.get_str("provides")
    }

    /// The `conflicts` field, as written.
    pub fn conflicts(&self) -> Option<&str> {
        self.get_str("conflicts")
    }

    /// The build script name: `bh-script` if present, else
    /// `build-script`, else `None`.
    pub fn build_script(&self) -> Option<&str> {
        self.get_str("bh-script").or_else(|| self.get_str("build-script"))
    }

    /// The `args` field, as a list of strings.
    pub fn args(&self) -> Vec<String> {
        self.get("args")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `env` field, as a list of `(key, value)` pairs.
    pub fn env(&self) -> Vec<(String, String)> {
        self.get("env")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn load_missing_file_is_empty() -> TestResult {
        let dir = tempdir()?;
        let control = Control::load(&dir.path().join("control.json"))?;
        assert_eq!(control.name(), None);
        Ok(())
    }

    #[test]
    fn round_trips_json() -> TestResult {
        let dir = tempdir()?;
        let path = dir.path().join("control.json");
        let mut control = Control::new();
        control.set("name", "hello");
        control.set("version", "1.0");
        control.set("platform", "linux-x86-64");
        control.dump(&path)?;

        let loaded = Control::load(&path)?;
        assert_eq!(loaded.name(), Some("hello"));
        assert_eq!(loaded.version(), Some("1.0"));
        assert_eq!(loaded.platform(), Some("linux-x86-64"));
        Ok(())
    }

    #[test]
    fn dump_sorts_keys() -> TestResult {
        let dir = tempdir()?;
        let path = dir.path().join("control.json");
        let mut control = Control::new();
        control.set("version", "1.0");
        control.set("name", "hello");
        control.dump(&path)?;

        let text = fs::read_to_string(&path)?;
        let name_pos = text.find("\"name\"").unwrap();
        let version_pos = text.find("\"version\"").unwrap();
        assert!(name_pos < version_pos);
        Ok(())
    }

    #[test]
    fn legacy_parses_package_and_continuation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control");
        fs::write(
            &path,
            "Package: hello\n\
             Version: 1.0\n\
             Description: A friendly program\n\
             \x20that says hi\n\
             \x20and waves.\n",
        )
        .unwrap();

        let control = Control::load_legacy(&path);
        assert_eq!(control.name(), Some("hello"));
        assert_eq!(control.version(), Some("1.0"));
        assert_eq!(control.summary(), Some("A friendly program"));
        assert_eq!(
            control.get_str("description"),
            Some("that says hi\nand waves.")
        );
    }

    #[test]
    fn legacy_missing_file_is_empty() {
        let control = Control::load_legacy(Path::new("/nonexistent/control"));
        assert_eq!(control.name(), None);
    }

    #[test]
    fn legacy_renames_spaces_in_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control");
        fs::write(&path, "Build Script: build.sh\n").unwrap();
        let control = Control::load_legacy(&path);
        assert_eq!(control.get_str("build-script"), Some("build.sh"));
    }
}
