use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use coinst_archive::SourceUniverse;
use coinst_core::{LookupError, Source};

/// One mutation of a working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Replace every binary of the source with the given one's.
    UpgradeSource(Arc<Source>),
    /// Replace the source's arch-specific binaries on one architecture.
    UpgradeArch(Arc<Source>, String),
    RemoveSource(String),
}

impl Change {
    pub fn source_name(&self) -> &str {
        match self {
            Self::UpgradeSource(source) | Self::UpgradeArch(source, _) => &source.name,
            Self::RemoveSource(name) => name,
        }
    }
}

/// A change as a planner writes it: `src`, `src/arch` or `-src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSpec {
    Upgrade { source: String },
    UpgradeArch { source: String, arch: String },
    Remove { source: String },
}

impl ChangeSpec {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if let Some(source) = input.strip_prefix('-') {
            validate_name(source, input)?;
            return Ok(Self::Remove {
                source: source.to_string(),
            });
        }

        match input.split_once('/') {
            Some((source, arch)) => {
                validate_name(source, input)?;
                validate_name(arch, input)?;
                Ok(Self::UpgradeArch {
                    source: source.to_string(),
                    arch: arch.to_string(),
                })
            }
            None => {
                validate_name(input, input)?;
                Ok(Self::Upgrade {
                    source: input.to_string(),
                })
            }
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Upgrade { source }
            | Self::UpgradeArch { source, .. }
            | Self::Remove { source } => source,
        }
    }

    /// Looks the source up in the archive the change comes from. Removals
    /// need nothing from it.
    pub fn resolve(&self, from: &SourceUniverse) -> Result<Change, LookupError> {
        match self {
            Self::Upgrade { source } => Ok(Change::UpgradeSource(lookup(from, source)?)),
            Self::UpgradeArch { source, arch } => {
                if !from.arches().iter().any(|known| known == arch) {
                    return Err(LookupError::UnknownArchitecture(arch.clone()));
                }
                Ok(Change::UpgradeArch(lookup(from, source)?, arch.clone()))
            }
            Self::Remove { source } => Ok(Change::RemoveSource(source.clone())),
        }
    }
}

impl fmt::Display for ChangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrade { source } => write!(f, "{source}"),
            Self::UpgradeArch { source, arch } => write!(f, "{source}/{arch}"),
            Self::Remove { source } => write!(f, "-{source}"),
        }
    }
}

fn lookup(from: &SourceUniverse, name: &str) -> Result<Arc<Source>, LookupError> {
    from.get(name)
        .cloned()
        .ok_or_else(|| LookupError::UnknownSource(name.to_string()))
}

fn validate_name(name: &str, input: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.starts_with('-')
        || name.chars().any(char::is_whitespace)
    {
        return Err(anyhow!("invalid change '{input}': expected 'src', 'src/arch' or '-src'"));
    }
    Ok(())
}
