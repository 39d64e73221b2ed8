use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::{Package, Paragraph};

/// A source package and the binaries it owns on each architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub version: String,
    /// Synthesized because some binary named it in its `Source` field while
    /// the `Sources` file did not list it.
    pub fake: bool,
    pub binaries: BTreeMap<String, Vec<Arc<Package>>>,
    pub record: Option<Paragraph>,
}

impl Source {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            fake: false,
            binaries: BTreeMap::new(),
            record: None,
        }
    }

    pub fn fake(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            fake: true,
            ..Self::new(name, version)
        }
    }

    pub fn from_paragraph(paragraph: Paragraph) -> Result<Self> {
        let name = paragraph
            .get("Package")
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("source stanza is missing 'Package'"))?
            .to_string();
        let version = paragraph
            .get("Version")
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("source '{name}' is missing 'Version'"))?
            .to_string();

        Ok(Self {
            record: Some(paragraph),
            ..Self::new(name, version)
        })
    }

    pub fn binaries(&self, arch: &str) -> &[Arc<Package>] {
        self.binaries.get(arch).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_binary(&mut self, arch: &str, package: Arc<Package>) {
        self.binaries.entry(arch.to_string()).or_default().push(package);
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.record.as_ref().and_then(|record| record.get(name))
    }

    pub fn to_paragraph(&self) -> Paragraph {
        if let Some(record) = &self.record {
            return record.clone();
        }
        let mut paragraph = Paragraph::new();
        paragraph.push("Package", self.name.as_str());
        paragraph.push("Version", self.version.as_str());
        paragraph
    }
}
