use std::cmp::Ordering;
use std::collections::HashMap;

use coinst_core::{Dependency, Priority, Relation, VersionComparator};

use crate::universe::PackageId;

#[derive(Debug, Clone)]
struct Provider {
    id: PackageId,
    priority: Priority,
    package: String,
    version: Option<String>,
}

impl Provider {
    fn preference(&self, other: &Provider) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.package.cmp(&other.package))
    }
}

/// Name -> providers, kept in `(priority, package name)` order. Every real
/// package is listed under its own name too, so plain and virtual
/// dependencies resolve through the same lookup.
#[derive(Debug, Default)]
pub(crate) struct VirtualIndex {
    buckets: HashMap<String, Vec<Provider>>,
}

impl VirtualIndex {
    pub(crate) fn add(
        &mut self,
        name: &str,
        version: Option<&str>,
        id: PackageId,
        priority: Priority,
        package: &str,
    ) {
        let provider = Provider {
            id,
            priority,
            package: package.to_string(),
            version: version.map(str::to_string),
        };
        let bucket = self.buckets.entry(name.to_string()).or_default();
        // after every entry that sorts before or equal to the newcomer
        let position = bucket
            .iter()
            .position(|existing| provider.preference(existing) == Ordering::Less)
            .unwrap_or(bucket.len());
        bucket.insert(position, provider);
    }

    pub(crate) fn remove(&mut self, name: &str, id: PackageId) {
        let Some(bucket) = self.buckets.get_mut(name) else {
            debug_assert!(false, "no providers registered for '{name}'");
            return;
        };
        if let Some(position) = bucket.iter().position(|provider| provider.id == id) {
            bucket.remove(position);
        } else {
            debug_assert!(false, "package not registered as provider of '{name}'");
        }
        if bucket.is_empty() {
            self.buckets.remove(name);
        }
    }

    // Providers without a declared version only satisfy unversioned deps.
    pub(crate) fn matching(
        &self,
        dep: &Dependency,
        comparator: &dyn VersionComparator,
        out: &mut Vec<PackageId>,
    ) {
        let Some(bucket) = self.buckets.get(&dep.name) else {
            return;
        };
        for provider in bucket {
            let satisfied = match (dep.relation, &dep.version, &provider.version) {
                (Relation::None, _, _) => true,
                (_, None, _) => true,
                (_, Some(_), None) => false,
                (relation, Some(wanted), Some(provided)) => {
                    comparator.satisfies(provided, relation, wanted)
                }
            };
            if satisfied {
                out.push(provider.id);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn provider_names(&self, name: &str) -> Vec<String> {
        self.buckets
            .get(name)
            .map(|bucket| bucket.iter().map(|p| p.package.clone()).collect())
            .unwrap_or_default()
    }
}
