use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use coinst_archive::{write_directory, SourceUniverse};
use coinst_core::{LookupError, Package, Source, VersionComparator};
use coinst_resolver::{PackageUniverse, SolverConfig};
use tracing::debug;

use crate::Change;

/// The binaries one source currently has in a working copy. These can
/// differ from the source's own list after single-arch upgrades or when a
/// newer source took over one of its binary names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNote {
    source: Arc<Source>,
    binaries: BTreeMap<String, Vec<Arc<Package>>>,
}

impl SourceNote {
    fn empty(source: Arc<Source>) -> Self {
        Self {
            source,
            binaries: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn binaries(&self, arch: &str) -> &[Arc<Package>] {
        self.binaries.get(arch).map(Vec::as_slice).unwrap_or(&[])
    }

    fn forget_binary(&mut self, arch: &str, name: &str) {
        if let Some(list) = self.binaries.get_mut(arch) {
            list.retain(|binary| binary.name != name);
            if list.is_empty() {
                self.binaries.remove(arch);
            }
        }
    }
}

/// Notes as they were before the first change of a group touched them.
/// `None` means the source did not exist yet.
#[derive(Debug, Default)]
struct UndoGroup {
    preimages: Vec<(String, Option<SourceNote>)>,
    touched: BTreeSet<String>,
}

/// A mutable simulation of an archive: which sources exist, which of their
/// binaries are active, and one solver universe per architecture built from
/// exactly those binaries. Changes are grouped and can be rolled back until
/// committed.
#[derive(Debug)]
pub struct WorkingCopy {
    arches: Vec<String>,
    universes: BTreeMap<String, PackageUniverse>,
    notes: BTreeMap<String, SourceNote>,
    /// (arch, binary name) -> source currently owning it.
    owners: BTreeMap<(String, String), String>,
    undo: Vec<UndoGroup>,
}

impl WorkingCopy {
    pub fn new(arches: Vec<String>, comparator: Arc<dyn VersionComparator + Send + Sync>) -> Self {
        let universes = arches
            .iter()
            .map(|arch| {
                (
                    arch.clone(),
                    PackageUniverse::new(arch.clone(), Arc::clone(&comparator)),
                )
            })
            .collect();
        Self {
            arches,
            universes,
            notes: BTreeMap::new(),
            owners: BTreeMap::new(),
            undo: Vec::new(),
        }
    }

    /// Seeds a working copy with every source of `archive`, committed.
    pub fn from_archive(
        archive: &SourceUniverse,
        comparator: Arc<dyn VersionComparator + Send + Sync>,
    ) -> Self {
        let mut copy = Self::new(archive.arches().to_vec(), comparator);
        copy.begin_group();
        for source in archive.sources() {
            copy.replace_source(Arc::clone(source));
        }
        copy.commit_changes();
        copy
    }

    pub fn set_solver_config(&mut self, config: SolverConfig) {
        for universe in self.universes.values_mut() {
            universe.set_config(config);
        }
    }

    pub fn arches(&self) -> &[String] {
        &self.arches
    }

    pub fn packages(&self, arch: &str) -> Result<&PackageUniverse, LookupError> {
        self.universes
            .get(arch)
            .ok_or_else(|| LookupError::UnknownArchitecture(arch.to_string()))
    }

    pub fn packages_mut(&mut self, arch: &str) -> Result<&mut PackageUniverse, LookupError> {
        self.universes
            .get_mut(arch)
            .ok_or_else(|| LookupError::UnknownArchitecture(arch.to_string()))
    }

    pub fn sources(&self) -> Vec<String> {
        self.notes.keys().cloned().collect()
    }

    pub fn note(&self, name: &str) -> Option<&SourceNote> {
        self.notes.get(name)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.notes.contains_key(name)
    }

    pub fn version(&self, name: &str) -> Option<&str> {
        self.notes.get(name).map(|note| note.source.version.as_str())
    }

    pub fn is_fake(&self, name: &str) -> Option<bool> {
        self.notes.get(name).map(|note| note.source.fake)
    }

    pub fn field(&self, name: &str, field: &str) -> Result<Option<&str>, LookupError> {
        self.notes
            .get(name)
            .map(|note| note.source.field(field))
            .ok_or_else(|| LookupError::UnknownSource(name.to_string()))
    }

    /// Names of the binaries `name` currently has on `arch`, sorted.
    pub fn binaries(&self, name: &str, arch: &str) -> Result<Vec<String>, LookupError> {
        self.check_arch(arch)?;
        let note = self
            .notes
            .get(name)
            .ok_or_else(|| LookupError::UnknownSource(name.to_string()))?;
        let mut names: Vec<String> = note
            .binaries(arch)
            .iter()
            .map(|binary| binary.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn upgrade_source(&mut self, source: Arc<Source>) {
        self.begin_group();
        self.replace_source(source);
    }

    pub fn upgrade_arch(&mut self, source: Arc<Source>, arch: &str) -> Result<(), LookupError> {
        self.check_arch(arch)?;
        self.begin_group();
        self.replace_arch(source, arch);
        Ok(())
    }

    /// Removing a source that is not present changes nothing, but still
    /// opens a group so every call pairs with one `undo_change`.
    pub fn remove_source(&mut self, name: &str) {
        self.begin_group();
        self.drop_source(name);
    }

    /// Applies every change inside a single undo group. Architectures are
    /// checked up front so a bad change leaves the copy untouched.
    pub fn apply_changes(&mut self, changes: &[Change]) -> Result<(), LookupError> {
        for change in changes {
            if let Change::UpgradeArch(_, arch) = change {
                self.check_arch(arch)?;
            }
        }

        self.begin_group();
        for change in changes {
            match change {
                Change::UpgradeSource(source) => self.replace_source(Arc::clone(source)),
                Change::UpgradeArch(source, arch) => self.replace_arch(Arc::clone(source), arch),
                Change::RemoveSource(name) => self.drop_source(name),
            }
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Rolls back the most recent group. Every touched note is deleted first
    /// and the preimages reinstalled afterwards, so a binary evicted by one
    /// touched source and owned by another comes back to its old owner.
    pub fn undo_change(&mut self) -> Result<()> {
        let group = self
            .undo
            .pop()
            .ok_or_else(|| anyhow!("no changes to undo"))?;

        for (name, _) in &group.preimages {
            self.delete_note(name);
        }
        for (name, preimage) in group.preimages {
            if let Some(note) = preimage {
                self.reinstall_note(name, note);
            }
        }
        debug!(depth = self.undo.len(), "undid change group");
        Ok(())
    }

    pub fn commit_changes(&mut self) {
        debug!(groups = self.undo.len(), "committing changes");
        self.undo.clear();
    }

    /// Writes the current state as `Sources` plus `Packages_<arch>` files.
    pub fn write_notes(&self, dir: impl AsRef<Path>) -> Result<()> {
        let sources: Vec<Source> = self
            .notes
            .values()
            .map(|note| Source {
                binaries: note.binaries.clone(),
                ..note.source.as_ref().clone()
            })
            .collect();
        write_directory(dir.as_ref(), &self.arches, &sources)
    }

    fn begin_group(&mut self) {
        self.undo.push(UndoGroup::default());
    }

    fn snapshot(&mut self, name: &str) {
        let Some(group) = self.undo.last_mut() else {
            debug_assert!(false, "changes must happen inside an undo group");
            return;
        };
        if group.touched.insert(name.to_string()) {
            group
                .preimages
                .push((name.to_string(), self.notes.get(name).cloned()));
        }
    }

    fn replace_source(&mut self, source: Arc<Source>) {
        let name = source.name.clone();
        self.snapshot(&name);
        self.delete_note(&name);
        self.notes
            .insert(name.clone(), SourceNote::empty(Arc::clone(&source)));

        for arch in self.arches.clone() {
            for binary in source.binaries(&arch) {
                self.install_binary(&name, &arch, Arc::clone(binary));
            }
        }
        debug!(source = %name, version = %source.version, "upgraded source");
    }

    fn replace_arch(&mut self, source: Arc<Source>, arch: &str) {
        let name = source.name.clone();
        self.snapshot(&name);

        let incoming: Vec<Arc<Package>> = source
            .binaries(arch)
            .iter()
            .filter(|binary| !binary.arch_all)
            .cloned()
            .collect();
        // Kept arch:all binaries yield to an incoming binary of the same name.
        let stale = match self.notes.get_mut(&name) {
            Some(note) => {
                let (kept, stale): (Vec<_>, Vec<_>) = note
                    .binaries
                    .remove(arch)
                    .unwrap_or_default()
                    .into_iter()
                    .partition(|binary| {
                        binary.arch_all
                            && !incoming.iter().any(|new| new.name == binary.name)
                    });
                if !kept.is_empty() {
                    note.binaries.insert(arch.to_string(), kept);
                }
                stale
            }
            None => {
                self.notes
                    .insert(name.clone(), SourceNote::empty(Arc::clone(&source)));
                Vec::new()
            }
        };
        for binary in &stale {
            self.evict_binary(arch, binary);
        }

        for binary in incoming {
            self.install_binary(&name, arch, binary);
        }
        debug!(
            source = %name,
            arch,
            version = %source.version,
            replaced = stale.len(),
            "upgraded source on one architecture"
        );
    }

    fn drop_source(&mut self, name: &str) {
        if !self.notes.contains_key(name) {
            debug!(source = %name, "source to remove is not present");
            return;
        }
        self.snapshot(name);
        self.delete_note(name);
        debug!(source = %name, "removed source");
    }

    fn delete_note(&mut self, name: &str) -> Option<SourceNote> {
        let note = self.notes.remove(name)?;
        for (arch, binaries) in &note.binaries {
            for binary in binaries {
                self.evict_binary(arch, binary);
            }
        }
        Some(note)
    }

    fn reinstall_note(&mut self, name: String, note: SourceNote) {
        for (arch, binaries) in &note.binaries {
            let Some(universe) = self.universes.get_mut(arch) else {
                continue;
            };
            for binary in binaries {
                let added = universe.add_package(Arc::clone(binary));
                debug_assert!(added, "restored binary '{}' already present", binary.name);
                self.owners
                    .insert((arch.clone(), binary.name.clone()), name.clone());
            }
        }
        self.notes.insert(name, note);
    }

    /// Removes `binary` from the universe and the owner index. The caller
    /// keeps the owning note in sync.
    fn evict_binary(&mut self, arch: &str, binary: &Arc<Package>) {
        let Some(universe) = self.universes.get_mut(arch) else {
            return;
        };
        let removed = universe.remove_binary(&binary.name);
        debug_assert!(
            removed.is_some_and(|removed| Arc::ptr_eq(&removed, binary)),
            "binary '{}' on {arch} is not the one the note holds",
            binary.name
        );
        self.owners.remove(&(arch.to_string(), binary.name.clone()));
    }

    /// Adds `binary` for `owner`, first evicting a same-named binary some
    /// other source owns. The newest binary of a name always wins.
    fn install_binary(&mut self, owner: &str, arch: &str, binary: Arc<Package>) {
        let key = (arch.to_string(), binary.name.clone());
        if let Some(previous) = self.owners.get(&key).cloned() {
            if previous == owner {
                debug!(
                    source = %owner,
                    arch,
                    package = %binary.name,
                    "duplicate binary in one batch ignored"
                );
                return;
            }

            self.snapshot(&previous);
            let evicted = self
                .notes
                .get(&previous)
                .and_then(|note| {
                    note.binaries(arch)
                        .iter()
                        .find(|existing| existing.name == binary.name)
                })
                .cloned();
            if let Some(evicted) = evicted {
                self.evict_binary(arch, &evicted);
            }
            if let Some(note) = self.notes.get_mut(&previous) {
                note.forget_binary(arch, &binary.name);
            }
            debug!(
                arch,
                package = %binary.name,
                from = %previous,
                to = %owner,
                "binary taken over by another source"
            );
        }

        let Some(universe) = self.universes.get_mut(arch) else {
            return;
        };
        let added = universe.add_package(Arc::clone(&binary));
        debug_assert!(added, "binary '{}' still present on {arch}", binary.name);
        self.owners.insert(key, owner.to_string());
        if let Some(note) = self.notes.get_mut(owner) {
            note.binaries
                .entry(arch.to_string())
                .or_default()
                .push(binary);
        }
    }

    fn check_arch(&self, arch: &str) -> Result<(), LookupError> {
        if self.universes.contains_key(arch) {
            Ok(())
        } else {
            Err(LookupError::UnknownArchitecture(arch.to_string()))
        }
    }
}
