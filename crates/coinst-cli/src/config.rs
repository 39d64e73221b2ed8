use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use coinst_resolver::SolverConfig;
use serde::Deserialize;

/// Settings read from the `--config` TOML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CoinstConfig {
    pub(crate) arches: Vec<String>,
    pub(crate) step_budget: Option<u64>,
    /// Architectures whose arch:all packages are checked too and must stay
    /// installable.
    pub(crate) nobreak_arch_all: Vec<String>,
}

impl CoinstConfig {
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file: {}", path.display()))
    }

    pub(crate) fn parse(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse coinst config")?;
        if config.step_budget == Some(0) {
            return Err(anyhow!("step_budget must be greater than zero"));
        }
        Ok(config)
    }

    pub(crate) fn solver_config(&self) -> SolverConfig {
        match self.step_budget {
            Some(step_budget) => SolverConfig { step_budget },
            None => SolverConfig::default(),
        }
    }

    /// Command-line architectures win over the configured ones.
    pub(crate) fn resolve_arches(&self, requested: &[String]) -> Result<Vec<String>> {
        let arches = if requested.is_empty() {
            self.arches.clone()
        } else {
            requested.to_vec()
        };
        if arches.is_empty() {
            return Err(anyhow!(
                "no architectures given: pass --arch or set 'arches' in the config file"
            ));
        }

        let mut unique: Vec<String> = Vec::with_capacity(arches.len());
        for arch in arches {
            if !unique.contains(&arch) {
                unique.push(arch);
            }
        }
        Ok(unique)
    }
}
