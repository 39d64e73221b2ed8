use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use coinst_core::{LookupError, Package, Source, VersionComparator};
use coinst_resolver::PackageUniverse;
use tracing::debug;

mod archive_io;

pub use archive_io::{packages_file_name, read_directory, write_directory, SOURCES_FILE};

/// Every source of one archive tree together with the binaries it ships on
/// each loaded architecture.
#[derive(Debug, Clone, Default)]
pub struct SourceUniverse {
    arches: Vec<String>,
    sources: BTreeMap<String, Arc<Source>>,
}

impl SourceUniverse {
    pub fn new(arches: Vec<String>, sources: BTreeMap<String, Arc<Source>>) -> Self {
        Self { arches, sources }
    }

    pub fn load(dir: impl AsRef<Path>, arches: &[String]) -> Result<Self> {
        read_directory(dir.as_ref(), arches)
    }

    pub fn arches(&self) -> &[String] {
        &self.arches
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Source>> {
        self.sources.get(name)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn is_fake(&self, name: &str) -> Result<bool, LookupError> {
        self.lookup(name).map(|source| source.fake)
    }

    pub fn version(&self, name: &str) -> Result<&str, LookupError> {
        self.lookup(name).map(|source| source.version.as_str())
    }

    pub fn field(&self, name: &str, field: &str) -> Result<Option<&str>, LookupError> {
        self.lookup(name).map(|source| source.field(field))
    }

    /// Binaries `name` ships on `arch`, in file order.
    pub fn binaries(&self, name: &str, arch: &str) -> Result<&[Arc<Package>], LookupError> {
        self.check_arch(arch)?;
        self.lookup(name).map(|source| source.binaries(arch))
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Arc<Source>> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// A stand-alone universe holding every binary of `arch`. When two
    /// sources ship the same binary name, the source sorting first wins.
    pub fn packages_for_arch(
        &self,
        arch: &str,
        comparator: Arc<dyn VersionComparator + Send + Sync>,
    ) -> Result<PackageUniverse, LookupError> {
        self.check_arch(arch)?;

        let mut universe = PackageUniverse::new(arch, comparator);
        for source in self.sources.values() {
            for binary in source.binaries(arch) {
                if !universe.add_package(Arc::clone(binary)) {
                    debug!(
                        arch,
                        package = %binary.name,
                        source = %source.name,
                        "binary already provided by another source; skipped"
                    );
                }
            }
        }
        Ok(universe)
    }

    pub fn write(&self, dir: impl AsRef<Path>) -> Result<()> {
        write_directory(
            dir.as_ref(),
            &self.arches,
            self.sources.values().map(|source| source.as_ref()),
        )
    }

    fn lookup(&self, name: &str) -> Result<&Arc<Source>, LookupError> {
        self.sources
            .get(name)
            .ok_or_else(|| LookupError::UnknownSource(name.to_string()))
    }

    fn check_arch(&self, arch: &str) -> Result<(), LookupError> {
        if self.arches.iter().any(|known| known == arch) {
            Ok(())
        } else {
            Err(LookupError::UnknownArchitecture(arch.to_string()))
        }
    }
}

#[cfg(test)]
mod tests;
