use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use coinst_archive::SourceUniverse;
use coinst_core::{DebianVersions, DepField};
use coinst_resolver::{Installability, PackageUniverse, SolverConfig};
use coinst_worktree::{ChangeSpec, WorkingCopy};
use serde::Serialize;
use tracing::info;

use crate::render::{Status, StatusLine};

/// Which architectures have their arch:all packages checked too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ArchAllPolicy {
    include_all: bool,
    nobreak: Vec<String>,
}

impl ArchAllPolicy {
    pub(crate) fn new(include_all: bool, nobreak: &[String]) -> Self {
        Self {
            include_all,
            nobreak: nobreak.to_vec(),
        }
    }

    fn checks_arch_all(&self, arch: &str) -> bool {
        self.include_all || self.nobreak.iter().any(|known| known == arch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ArchReport {
    pub(crate) arch: String,
    pub(crate) checked: usize,
    pub(crate) uninstallable: Vec<UninstallablePackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct UninstallablePackage {
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) outcome: &'static str,
    pub(crate) unsatisfied: Vec<UnsatisfiedReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct UnsatisfiedReport {
    pub(crate) field: &'static str,
    pub(crate) dependency: String,
    pub(crate) candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MigrationStep {
    pub(crate) change: String,
    pub(crate) accepted: bool,
    pub(crate) before: usize,
    pub(crate) after: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MigrationReport {
    pub(crate) steps: Vec<MigrationStep>,
    pub(crate) uninstallable: usize,
}

impl MigrationReport {
    fn accepted(&self) -> usize {
        self.steps.iter().filter(|step| step.accepted).count()
    }
}

pub(crate) struct MigrateOptions<'a> {
    pub(crate) testing: &'a Path,
    pub(crate) unstable: &'a Path,
    pub(crate) output: Option<&'a Path>,
    pub(crate) arches: &'a [String],
    pub(crate) ops: &'a [String],
    pub(crate) policy: &'a ArchAllPolicy,
    pub(crate) solver: SolverConfig,
}

pub(crate) fn run_check_command(
    dir: &Path,
    arches: &[String],
    policy: &ArchAllPolicy,
    solver: SolverConfig,
) -> Result<Vec<ArchReport>> {
    let archive = SourceUniverse::load(dir, arches)?;
    let mut copy = WorkingCopy::from_archive(&archive, Arc::new(DebianVersions));
    copy.set_solver_config(solver);

    let mut reports = Vec::with_capacity(arches.len());
    for arch in arches {
        let universe = copy.packages_mut(arch)?;
        reports.push(check_universe(universe, policy.checks_arch_all(arch))?);
    }
    Ok(reports)
}

pub(crate) fn run_list_command(dir: &Path, arch: &str) -> Result<Vec<(String, String)>> {
    let archive = SourceUniverse::load(dir, &[arch.to_string()])?;
    let universe = archive.packages_for_arch(arch, Arc::new(DebianVersions))?;
    Ok(universe
        .list_packages()
        .into_iter()
        .filter_map(|name| {
            let version = universe.version(&name)?.to_string();
            Some((name, version))
        })
        .collect())
}

/// Applies each operation in turn, keeping it only when the number of
/// uninstallable packages across all architectures does not grow.
pub(crate) fn run_migrate_command(options: &MigrateOptions<'_>) -> Result<MigrationReport> {
    let testing = SourceUniverse::load(options.testing, options.arches)?;
    let unstable = SourceUniverse::load(options.unstable, options.arches)?;
    let mut copy = WorkingCopy::from_archive(&testing, Arc::new(DebianVersions));
    copy.set_solver_config(options.solver);

    let mut baseline = count_uninstallable(&mut copy, options.policy)?;
    let mut steps = Vec::with_capacity(options.ops.len());
    for op in options.ops {
        let spec = ChangeSpec::parse(op)?;
        let change = spec
            .resolve(&unstable)
            .with_context(|| format!("failed resolving change '{spec}'"))?;
        copy.apply_changes(std::slice::from_ref(&change))
            .with_context(|| format!("failed applying change '{spec}'"))?;

        let after = count_uninstallable(&mut copy, options.policy)?;
        let accepted = after <= baseline;
        if accepted {
            info!(change = %spec, before = baseline, after, "accepted change");
        } else {
            info!(change = %spec, before = baseline, after, "rejected change");
            copy.undo_change()?;
        }
        steps.push(MigrationStep {
            change: spec.to_string(),
            accepted,
            before: baseline,
            after,
        });
        if accepted {
            baseline = after;
        }
    }
    copy.commit_changes();

    if let Some(output) = options.output {
        copy.write_notes(output)
            .with_context(|| format!("failed writing migrated tree: {}", output.display()))?;
    }

    Ok(MigrationReport {
        steps,
        uninstallable: baseline,
    })
}

fn count_uninstallable(copy: &mut WorkingCopy, policy: &ArchAllPolicy) -> Result<usize> {
    let arches = copy.arches().to_vec();
    let mut total = 0;
    for arch in &arches {
        let universe = copy.packages_mut(arch)?;
        total += uninstallable_packages(universe, policy.checks_arch_all(arch))?.len();
    }
    Ok(total)
}

fn uninstallable_packages(
    universe: &mut PackageUniverse,
    include_arch_all: bool,
) -> Result<Vec<(String, Installability)>> {
    let mut failed = Vec::new();
    for name in checked_packages(universe, include_arch_all) {
        let verdict = universe.is_installable(&name)?;
        if !verdict.is_installable() {
            failed.push((name, verdict));
        }
    }
    Ok(failed)
}

fn checked_packages(universe: &PackageUniverse, include_arch_all: bool) -> Vec<String> {
    universe
        .list_packages()
        .into_iter()
        .filter(|name| include_arch_all || universe.is_arch_all(name) != Some(true))
        .collect()
}

fn check_universe(universe: &mut PackageUniverse, include_arch_all: bool) -> Result<ArchReport> {
    let checked = checked_packages(universe, include_arch_all).len();
    let mut uninstallable = Vec::new();
    for (name, verdict) in uninstallable_packages(universe, include_arch_all)? {
        let Some(package) = universe.package(&name).cloned() else {
            continue;
        };
        let mut unsatisfied = Vec::new();
        for field in DepField::SOLVER {
            for dep in universe.unsatisfiable_deps(&package, field) {
                unsatisfied.push(UnsatisfiedReport {
                    field: field.field_name(),
                    dependency: dep.dependency,
                    candidates: dep.candidates,
                });
            }
        }
        uninstallable.push(UninstallablePackage {
            name,
            version: package.version.clone(),
            outcome: outcome_label(verdict),
            unsatisfied,
        });
    }

    Ok(ArchReport {
        arch: universe.arch().to_string(),
        checked,
        uninstallable,
    })
}

fn outcome_label(verdict: Installability) -> &'static str {
    match verdict {
        Installability::Installable => "installable",
        Installability::NotInstallable => "not-installable",
        Installability::BudgetExceeded => "budget-exceeded",
    }
}

pub(crate) fn format_check_lines(reports: &[ArchReport]) -> Vec<StatusLine> {
    let mut lines = Vec::new();
    for report in reports {
        for package in &report.uninstallable {
            let reason = match package.outcome {
                "budget-exceeded" => "gave up (step budget exhausted)",
                _ => "is not installable",
            };
            lines.push(StatusLine::new(
                Status::Err,
                format!(
                    "{}: {} {} {}",
                    report.arch, package.name, package.version, reason
                ),
            ));
            for dep in &package.unsatisfied {
                let candidates = if dep.candidates.is_empty() {
                    "no candidates".to_string()
                } else {
                    format!("candidates: {}", dep.candidates.join(", "))
                };
                lines.push(StatusLine::new(
                    Status::Info,
                    format!("  {} {} ({candidates})", dep.field, dep.dependency),
                ));
            }
        }

        let status = if report.uninstallable.is_empty() {
            Status::Ok
        } else {
            Status::Warn
        };
        lines.push(StatusLine::new(
            status,
            format!(
                "{}: {} of {} packages uninstallable",
                report.arch,
                report.uninstallable.len(),
                report.checked
            ),
        ));
    }
    lines
}

pub(crate) fn format_list_lines(packages: &[(String, String)]) -> Vec<String> {
    packages
        .iter()
        .map(|(name, version)| format!("{name} {version}"))
        .collect()
}

pub(crate) fn format_migration_lines(report: &MigrationReport) -> Vec<StatusLine> {
    let mut lines: Vec<StatusLine> = report
        .steps
        .iter()
        .map(|step| {
            let (status, verb) = if step.accepted {
                (Status::Ok, "accepted")
            } else {
                (Status::Warn, "rejected")
            };
            StatusLine::new(
                status,
                format!(
                    "{verb} {} (uninstallable {} -> {})",
                    step.change, step.before, step.after
                ),
            )
        })
        .collect();
    lines.push(StatusLine::new(
        Status::Info,
        format!(
            "committed {} of {} changes; {} uninstallable",
            report.accepted(),
            report.steps.len(),
            report.uninstallable
        ),
    ));
    lines
}
