use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Result;
use coinst_core::{
    AlternativeGroup, BinaryFields, DepField, LookupError, Package, VersionComparator,
};

use crate::provides::VirtualIndex;
use crate::types::{Installability, SolverConfig, UnsatisfiedDep, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PackageId(usize);

#[derive(Debug)]
pub(crate) struct CollectedPackage {
    pub(crate) package: Arc<Package>,
    pub(crate) installed: u32,
    pub(crate) conflicted: u32,
    pub(crate) verdict: Verdict,
    /// Packages whose cached `Yes` relied on this package being installable.
    pub(crate) may_affect: BTreeSet<String>,
}

pub struct PackageUniverse {
    arch: String,
    slots: Vec<Option<CollectedPackage>>,
    free_slots: Vec<usize>,
    by_name: BTreeMap<String, PackageId>,
    provides: VirtualIndex,
    comparator: Arc<dyn VersionComparator + Send + Sync>,
    config: SolverConfig,
}

impl std::fmt::Debug for PackageUniverse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageUniverse")
            .field("arch", &self.arch)
            .field("packages", &self.by_name.len())
            .field("config", &self.config)
            .finish()
    }
}

impl PackageUniverse {
    pub fn new(arch: impl Into<String>, comparator: Arc<dyn VersionComparator + Send + Sync>) -> Self {
        Self {
            arch: arch.into(),
            slots: Vec::new(),
            free_slots: Vec::new(),
            by_name: BTreeMap::new(),
            provides: VirtualIndex::default(),
            comparator,
            config: SolverConfig::default(),
        }
    }

    pub fn with_step_budget(mut self, step_budget: u64) -> Self {
        self.config.step_budget = step_budget;
        self
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    pub fn config(&self) -> SolverConfig {
        self.config
    }

    /// Builds a throwaway universe from hand-supplied binaries, e.g. to ask
    /// whether a candidate set is co-installable.
    pub fn from_binaries<'a>(
        arch: impl Into<String>,
        comparator: Arc<dyn VersionComparator + Send + Sync>,
        binaries: impl IntoIterator<Item = (&'a str, &'a BinaryFields)>,
    ) -> Result<Self> {
        let mut universe = Self::new(arch, comparator);
        for (name, fields) in binaries {
            universe.add_binary(name, fields)?;
        }
        Ok(universe)
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn list_packages(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    pub fn package(&self, name: &str) -> Option<&Arc<Package>> {
        self.lookup(name).map(|id| &self.get(id).package)
    }

    pub fn version(&self, name: &str) -> Option<&str> {
        self.package(name).map(|pkg| pkg.version.as_str())
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.package(name).map(|pkg| pkg.source.as_str())
    }

    pub fn source_version(&self, name: &str) -> Option<&str> {
        self.package(name).map(|pkg| pkg.source_version.as_str())
    }

    pub fn is_arch_all(&self, name: &str) -> Option<bool> {
        self.package(name).map(|pkg| pkg.arch_all)
    }

    pub fn field(&self, name: &str, field: &str) -> Result<Option<&str>, LookupError> {
        self.package(name)
            .map(|pkg| pkg.field(field))
            .ok_or_else(|| LookupError::UnknownPackage(name.to_string()))
    }

    pub fn add_package(&mut self, package: Arc<Package>) -> bool {
        if self.by_name.contains_key(&package.name) {
            return false;
        }

        let collected = CollectedPackage {
            package: Arc::clone(&package),
            installed: 0,
            conflicted: 0,
            verdict: Verdict::Unknown,
            may_affect: BTreeSet::new(),
        };
        let id = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = Some(collected);
                PackageId(slot)
            }
            None => {
                self.slots.push(Some(collected));
                PackageId(self.slots.len() - 1)
            }
        };

        self.by_name.insert(package.name.clone(), id);
        self.provides.add(
            &package.name,
            Some(&package.version),
            id,
            package.priority,
            &package.name,
        );
        for provision in &package.provides {
            self.provides.add(
                &provision.name,
                provision.version.as_deref(),
                id,
                package.priority,
                &package.name,
            );
        }
        true
    }

    pub fn add_binary(&mut self, name: &str, fields: &BinaryFields) -> Result<bool> {
        let package = Package::from_fields(name, fields)?;
        Ok(self.add_package(Arc::new(package)))
    }

    /// Removes a package, dropping the cached verdict of everything whose
    /// installability relied on it.
    pub fn remove_binary(&mut self, name: &str) -> Option<Arc<Package>> {
        let id = self.lookup(name)?;

        let dependents = std::mem::take(&mut self.get_mut(id).may_affect);
        for dependent in &dependents {
            if let Some(dep_id) = self.lookup(dependent) {
                self.get_mut(dep_id).verdict = Verdict::Unknown;
            }
        }

        self.by_name.remove(name);
        let collected = self.slots[id.0]
            .take()
            .expect("indexed package slot must be occupied");
        debug_assert_eq!(collected.installed, 0);
        debug_assert_eq!(collected.conflicted, 0);
        self.free_slots.push(id.0);

        let package = collected.package;
        self.provides.remove(&package.name, id);
        for provision in &package.provides {
            self.provides.remove(&provision.name, id);
        }
        Some(package)
    }

    pub fn is_installable(&mut self, name: &str) -> Result<Installability, LookupError> {
        let id = self
            .lookup(name)
            .ok_or_else(|| LookupError::UnknownPackage(name.to_string()))?;
        Ok(self.check_installable(vec![id]))
    }

    pub fn is_uninstallable(&mut self, name: &str) -> Result<bool, LookupError> {
        self.is_installable(name)
            .map(|verdict| !verdict.is_installable())
    }

    pub fn is_any_installable(&mut self, names: &[&str]) -> Result<Installability, LookupError> {
        let roots = names
            .iter()
            .map(|name| {
                self.lookup(name)
                    .ok_or_else(|| LookupError::UnknownPackage(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.check_installable(roots))
    }

    pub fn is_cached_installable(&self, name: &str) -> bool {
        self.lookup(name)
            .map(|id| self.get(id).verdict == Verdict::Yes)
            .unwrap_or(false)
    }

    pub fn may_affect(&self, name: &str) -> Vec<String> {
        self.lookup(name)
            .map(|id| self.get(id).may_affect.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// `(installed, conflicted)` for a package. Both are zero whenever no
    /// installability check is running.
    pub fn simulation_counters(&self, name: &str) -> Option<(u32, u32)> {
        self.lookup(name).map(|id| {
            let collected = self.get(id);
            (collected.installed, collected.conflicted)
        })
    }

    /// Alternative groups of `package`'s `field` that nothing in this universe
    /// can satisfy, with the providers that were tried.
    pub fn unsatisfiable_deps(&mut self, package: &Package, field: DepField) -> Vec<UnsatisfiedDep> {
        let mut unsatisfied = Vec::new();
        for group in package.depends(field).iter() {
            let candidates = self.matching(group);
            let satisfied = candidates
                .iter()
                .any(|id| self.check_installable(vec![*id]).is_installable());
            if !satisfied {
                let mut names = candidates
                    .iter()
                    .map(|id| self.get(*id).package.name.clone())
                    .collect::<Vec<_>>();
                names.sort();
                names.dedup();
                unsatisfied.push(UnsatisfiedDep {
                    dependency: group.to_string(),
                    candidates: names,
                });
            }
        }
        unsatisfied
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<PackageId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn get(&self, id: PackageId) -> &CollectedPackage {
        self.slots[id.0]
            .as_ref()
            .expect("package id must refer to a live package")
    }

    pub(crate) fn get_mut(&mut self, id: PackageId) -> &mut CollectedPackage {
        self.slots[id.0]
            .as_mut()
            .expect("package id must refer to a live package")
    }

    pub(crate) fn matching(&self, group: &AlternativeGroup) -> Vec<PackageId> {
        let mut out = Vec::new();
        for dep in group.iter() {
            self.provides.matching(dep, &*self.comparator, &mut out);
        }
        out
    }

    fn conflict_matches(&self, id: PackageId) -> Vec<PackageId> {
        let mut out = Vec::new();
        for dep in &self.get(id).package.conflicts {
            self.provides.matching(dep, &*self.comparator, &mut out);
        }
        out
    }

    pub(crate) fn can_install(&self, id: PackageId) -> bool {
        let collected = self.get(id);
        if collected.installed > 0 {
            return true;
        }
        if collected.conflicted > 0 {
            return false;
        }
        self.conflict_matches(id)
            .into_iter()
            .all(|other| self.get(other).installed == 0)
    }

    pub(crate) fn install(&mut self, id: PackageId) {
        if self.get(id).installed == 0 {
            for other in self.conflict_matches(id) {
                if other == id {
                    continue;
                }
                let target = self.get_mut(other);
                debug_assert_eq!(target.installed, 0);
                target.conflicted += 1;
            }
        }
        let collected = self.get_mut(id);
        debug_assert_eq!(collected.conflicted, 0);
        collected.installed += 1;
    }

    pub(crate) fn uninstall(&mut self, id: PackageId) {
        let collected = self.get_mut(id);
        debug_assert!(collected.installed > 0, "uninstalling a package that is not installed");
        debug_assert_eq!(collected.conflicted, 0);
        collected.installed -= 1;
        if collected.installed == 0 {
            for other in self.conflict_matches(id) {
                if other == id {
                    continue;
                }
                let target = self.get_mut(other);
                debug_assert_eq!(target.installed, 0);
                debug_assert!(target.conflicted > 0);
                target.conflicted -= 1;
            }
        }
    }

    pub(crate) fn step_budget(&self) -> u64 {
        self.config.step_budget
    }

    #[cfg(test)]
    pub(crate) fn provider_names(&self, name: &str) -> Vec<String> {
        self.provides.provider_names(name)
    }
}
