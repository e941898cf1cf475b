//! Dependency graph construction and ordering.

use std::collections::{HashMap, HashSet};

use ssm_types::Version;

use crate::testable::{Conflict, Provider, Requirement};
use crate::Error;

/// Tracks registered providers and the requires/provides/conflicts
/// edges between them, and answers ordering and reachability queries
/// over the resulting graph.
///
/// Grounded on `ssm/deps.py::DependencyManager`.
#[derive(Clone, Debug, Default)]
pub struct DependencyManager {
    name2provider: HashMap<String, Provider>,
    name2requires: HashMap<String, Vec<Requirement>>,
    name2provides: HashMap<String, Vec<Provider>>,
    name2conflicts: HashMap<String, Vec<Conflict>>,
    name2requiredby: HashMap<String, Vec<String>>,
    /// Names registered only as a synthetic `provides` alias, never
    /// via a real [`DependencyManager::add`] call. `generate`'s output
    /// excludes these: an alias exists purely to redirect a dependency
    /// edge to its real provider and is not itself an installable or
    /// buildable package.
    aliases: HashSet<String>,
}

impl DependencyManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a package's provider identity and its
    /// requires/provides/conflicts edges, each a comma-separated list
    /// of testable expressions.
    ///
    /// Every alias in `provides` additionally registers a synthetic
    /// provider under that alias's name and a synthetic requirement
    /// back to `name`, so that `generate` orders the real package
    /// ahead of anything depending on the alias.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        version: Option<Version>,
        requires: Option<&str>,
        provides: Option<&str>,
        conflicts: Option<&str>,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.name2provider.contains_key(&name) {
            return Err(Error::Duplicate { name });
        }

        let provider = Provider::new(name.clone(), version);
        self.name2provider.insert(name.clone(), provider.clone());
        self.aliases.remove(&name);

        if let Some(requires) = requires {
            let mut parsed = Vec::new();
            for testspec in split_list(requires) {
                let requirement = Requirement::parse(testspec)?;
                self.name2requiredby
                    .entry(requirement.name().to_string())
                    .or_default()
                    .push(name.clone());
                parsed.push(requirement);
            }
            self.name2requires.insert(name.clone(), parsed);
        }

        if let Some(provides) = provides {
            let mut aliases = Vec::new();
            for testspec in split_list(provides) {
                let testable = crate::testable::Testable::parse(testspec)?;
                let alias_name = testable.name().to_string();
                let alias_version = testable.version().cloned();
                let alias_provider = Provider::new(alias_name.clone(), alias_version);
                aliases.push(alias_provider.clone());
                self.name2provider.insert(alias_name.clone(), alias_provider);
                self.name2requires
                    .insert(alias_name.clone(), vec![Requirement::parse(&name)?]);
                self.aliases.insert(alias_name);
            }
            self.name2provides.insert(name.clone(), aliases);
        }

        if let Some(conflicts) = conflicts {
            let mut parsed = Vec::new();
            for testspec in split_list(conflicts) {
                parsed.push(Conflict::parse(testspec)?);
            }
            self.name2conflicts.insert(name, parsed);
        }

        Ok(())
    }

    /// The names of every registered provider (real packages and
    /// `provides` aliases alike), sorted for determinism.
    pub fn get_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.name2provider.keys().cloned().collect();
        names.sort();
        names
    }

    /// Looks up a registered provider by name.
    pub fn get_provider(&self, name: &str) -> Option<&Provider> {
        self.name2provider.get(name)
    }

    /// Confirms every requirement of every registered package is
    /// satisfied and no conflict matches a present provider.
    pub fn verify(&self) -> Result<(), Error> {
        let mut names: Vec<&String> = self.name2requires.keys().collect();
        names.extend(self.name2conflicts.keys());
        let mut checked = HashSet::new();
        for name in names {
            if checked.insert(name.as_str()) {
                self.expand(name)?;
            }
        }
        Ok(())
    }

    /// Returns the names that (directly, or transitively when
    /// `indirect` is set) require any of `names`.
    ///
    /// The original Python implementation's non-indirect branch
    /// references an undefined loop variable and can never run; this
    /// implements the sensible reading instead — the union of each
    /// name's direct requirers.
    pub fn get_required_by(&self, names: &[String], indirect: bool) -> Vec<String> {
        if !indirect {
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            for name in names {
                for requirer in self.name2requiredby.get(name).into_iter().flatten() {
                    if seen.insert(requirer.clone()) {
                        out.push(requirer.clone());
                    }
                }
            }
            return out;
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: Vec<String> = names.to_vec();
        while let Some(name) = queue.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            for requirer in self.name2requiredby.get(&name).into_iter().flatten() {
                if !seen.contains(requirer) {
                    queue.push(requirer.clone());
                }
            }
        }
        seen.into_iter().collect()
    }

    fn expand(&self, name: &str) -> Result<Vec<String>, Error> {
        self.name2provider
            .get(name)
            .ok_or_else(|| Error::MissingProvider { name: name.to_string() })?;

        if let Some(conflicts) = self.name2conflicts.get(name) {
            for conflict in conflicts {
                if let Some(target) = self.name2provider.get(conflict.name()) {
                    if conflict.test(target)? {
                        return Err(Error::ConflictDetected {
                            conflict: conflict.to_string(),
                            provider: target.to_string(),
                        });
                    }
                }
            }
        }

        let mut deps = Vec::new();
        if let Some(requirements) = self.name2requires.get(name) {
            for requirement in requirements {
                let target = self
                    .name2provider
                    .get(requirement.name())
                    .ok_or_else(|| Error::MissingProvider {
                        name: requirement.name().to_string(),
                    })?;
                if !requirement.test(target)? {
                    return Err(Error::UnresolvedRequire {
                        requirement: requirement.to_string(),
                        provider: target.to_string(),
                    });
                }
                deps.push(requirement.name().to_string());
            }
        }
        Ok(deps)
    }

    /// Generates a build/publish order for `names`: every package in
    /// the result appears after everything it requires (leaves last),
    /// with duplicates removed preserving first occurrence of the
    /// reversed traversal. Synthetic `provides` aliases are traversed
    /// for ordering purposes but never appear in the returned list.
    pub fn generate(&self, names: &[String]) -> Result<Vec<String>, Error> {
        let mut deps: Vec<String> = names.to_vec();
        let mut frontier = deps.clone();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for name in &frontier {
                next.extend(self.expand(name)?);
            }
            deps.extend(next.clone());
            frontier = next;
        }
        let ordered = uniq(deps.into_iter().rev());
        Ok(ordered
            .into_iter()
            .filter(|name| !self.aliases.contains(name))
            .collect())
    }
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn uniq(iter: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in iter {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    use super::*;

    fn v(s: &str) -> Version {
        Version::new(s).unwrap()
    }

    #[test]
    fn duplicate_add_fails() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add("hdf5", Some(v("1.8.3")), None, None, None)?;
        let err = dm.add("hdf5", Some(v("1.9.0")), None, None, None).unwrap_err();
        assert!(matches!(err, Error::Duplicate { .. }));
        Ok(())
    }

    #[test]
    fn generate_orders_leaves_last() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add("hdf5", Some(v("1.8.3")), None, None, None)?;
        dm.add("netcdf", Some(v("4.3.1")), Some("hdf5 >= 1.8"), None, None)?;
        dm.add(
            "netcdf-fortran",
            Some(v("4.4.2")),
            Some("netcdf >= 4.3"),
            None,
            None,
        )?;

        let order = dm.generate(&["netcdf-fortran".to_string()])?;
        assert_eq!(order, vec!["hdf5", "netcdf", "netcdf-fortran"]);
        Ok(())
    }

    #[test]
    fn generate_fails_on_missing_provider() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add("netcdf", Some(v("4.3.1")), Some("hdf5 >= 1.8"), None, None)?;
        let err = dm.generate(&["netcdf".to_string()]).unwrap_err();
        assert!(matches!(err, Error::MissingProvider { .. }));
        Ok(())
    }

    #[test]
    fn generate_fails_on_unresolved_version() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add("hdf5", Some(v("1.6.0")), None, None, None)?;
        dm.add("netcdf", Some(v("4.3.1")), Some("hdf5 >= 1.8"), None, None)?;
        let err = dm.generate(&["netcdf".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnresolvedRequire { .. }));
        Ok(())
    }

    #[test]
    fn generate_fails_on_conflict() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add("openmpi", Some(v("1.6.5")), None, None, None)?;
        dm.add(
            "mpich",
            Some(v("3.2")),
            None,
            None,
            Some("openmpi < 2.0"),
        )?;
        let err = dm.generate(&["mpich".to_string()]).unwrap_err();
        assert!(matches!(err, Error::ConflictDetected { .. }));
        Ok(())
    }

    #[test]
    fn provides_alias_orders_real_package_first() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add(
            "gcc",
            Some(v("4.9")),
            None,
            Some("c-compiler, fortran-compiler"),
            None,
        )?;
        dm.add("uses-c", Some(v("1.0")), Some("c-compiler"), None, None)?;

        let order = dm.generate(&["uses-c".to_string()])?;
        assert_eq!(order, vec!["gcc", "uses-c"]);
        Ok(())
    }

    #[test]
    fn deduplicates_shared_transitive_dependency() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add("hdf5", Some(v("1.8.3")), None, None, None)?;
        dm.add("netcdf", Some(v("4.3.1")), Some("hdf5"), None, None)?;
        dm.add("netcdf-fortran", Some(v("4.4.2")), Some("hdf5, netcdf"), None, None)?;

        let order = dm.generate(&["netcdf-fortran".to_string()])?;
        assert_eq!(order, vec!["hdf5", "netcdf", "netcdf-fortran"]);
        Ok(())
    }

    #[test]
    fn get_required_by_direct_and_indirect() -> TestResult {
        let mut dm = DependencyManager::new();
        dm.add("hdf5", Some(v("1.8.3")), None, None, None)?;
        dm.add("netcdf", Some(v("4.3.1")), Some("hdf5"), None, None)?;
        dm.add("netcdf-fortran", Some(v("4.4.2")), Some("netcdf"), None, None)?;

        let direct = dm.get_required_by(&["hdf5".to_string()], false);
        assert_eq!(direct, vec!["netcdf".to_string()]);

        let mut indirect = dm.get_required_by(&["hdf5".to_string()], true);
        indirect.sort();
        let mut expected = vec!["hdf5".to_string(), "netcdf".to_string(), "netcdf-fortran".to_string()];
        expected.sort();
        assert_eq!(indirect, expected);
        Ok(())
    }
}
