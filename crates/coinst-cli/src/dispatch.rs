use anyhow::{Context, Result};

use crate::completion::write_completions_script;
use crate::config::CoinstConfig;
use crate::core_flows::{
    format_check_lines, format_list_lines, format_migration_lines, run_check_command,
    run_list_command, run_migrate_command, ArchAllPolicy, MigrateOptions,
};
use crate::render::TerminalRenderer;
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let config = CoinstConfig::load(cli.config.as_deref())?;
    let renderer = TerminalRenderer::current(cli.plain);

    match cli.command {
        Commands::Check {
            dir,
            arches,
            include_arch_all,
            json,
        } => {
            let arches = config.resolve_arches(&arches)?;
            let policy = ArchAllPolicy::new(include_arch_all, &config.nobreak_arch_all);
            let reports = run_check_command(&dir, &arches, &policy, config.solver_config())?;
            if json {
                let rendered = serde_json::to_string_pretty(&reports)
                    .context("failed serializing check report")?;
                println!("{rendered}");
            } else {
                renderer.print_section("check");
                renderer.print_lines(&format_check_lines(&reports));
            }
        }
        Commands::List { dir, arch } => {
            for line in format_list_lines(&run_list_command(&dir, &arch)?) {
                println!("{line}");
            }
        }
        Commands::Migrate {
            testing,
            unstable,
            output,
            arches,
            json,
            ops,
        } => {
            let arches = config.resolve_arches(&arches)?;
            let policy = ArchAllPolicy::new(false, &config.nobreak_arch_all);
            let report = run_migrate_command(&MigrateOptions {
                testing: &testing,
                unstable: &unstable,
                output: output.as_deref(),
                arches: &arches,
                ops: &ops,
                policy: &policy,
                solver: config.solver_config(),
            })?;
            if json {
                let rendered = serde_json::to_string_pretty(&report)
                    .context("failed serializing migration report")?;
                println!("{rendered}");
            } else {
                renderer.print_section("migrate");
                renderer.print_lines(&format_migration_lines(&report));
            }
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}
