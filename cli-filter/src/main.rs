//! Command-line front end for the submission filter.
//!
//! Option records travel as JSON: read from stdin, written to stdout. Logs go
//! to stderr so stdout stays machine-readable.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;

use cli_filter::cluster::{get_default_partition_or_env, get_node_gres, get_partition_info};
use cli_filter::core::options::OptionRecord;
use cli_filter::core::units::to_mebibytes;
use cli_filter::exit_codes;
use cli_filter::hooks::{post_submit, pre_submit, setup_defaults};
use cli_filter::io::config::{FilterConfig, config_path, load_config};
use cli_filter::io::env::ProcessEnv;
use cli_filter::io::query::SlurmQuery;
use cli_filter::logging::{self, TracingLogger};
use cli_filter::policy::PolicyEngine;

#[derive(Parser)]
#[command(
    name = "cli-filter",
    version,
    about = "Submission-time resource policy for batch job options"
)]
struct Cli {
    /// Config file (defaults to $CLI_FILTER_CONFIG, then /etc/slurm/cli_filter.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the policy to an option record (JSON on stdin); print the result.
    PreSubmit {
        /// Heterogeneous job component offset.
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Acknowledge a submitted job or step.
    PostSubmit {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        job_id: u32,
        #[arg(long, default_value_t = 0)]
        step_id: u32,
    },
    /// Seed configured default options into a record (JSON on stdin).
    SetupDefaults {
        /// Early pass, before the user's options are parsed.
        #[arg(long)]
        early: bool,
    },
    /// Print parsed attributes of a partition (default partition when omitted).
    ShowPartition { partition: Option<String> },
    /// Print the generic resources advertised by a partition's nodes.
    ShowGres { partition: String },
    /// Convert a size such as `512k` or `3500G` to mebibytes.
    ToMib { value: String },
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::ERROR
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&config_path(cli.config.as_deref()))?;
    let env = ProcessEnv;
    let logger = TracingLogger::from_env(&env, &config.debug_env);
    logging::init(logger.debug());

    match cli.command {
        Command::PreSubmit { offset } => cmd_pre_submit(&config, &logger, offset),
        Command::PostSubmit {
            offset,
            job_id,
            step_id,
        } => Ok(post_submit(&logger, offset, job_id, step_id)),
        Command::SetupDefaults { early } => cmd_setup_defaults(&config, early),
        Command::ShowPartition { partition } => cmd_show_partition(&config, partition),
        Command::ShowGres { partition } => cmd_show_gres(&config, &partition),
        Command::ToMib { value } => cmd_to_mib(&value),
    }
}

fn cmd_pre_submit(config: &FilterConfig, logger: &TracingLogger, offset: u32) -> Result<i32> {
    let mut options = read_options()?;
    let query = SlurmQuery::new(config.query.clone());
    let env = ProcessEnv;
    let engine = PolicyEngine::new(config, &query, &env, logger);
    let code = pre_submit(&engine, &mut options, offset);
    if code == exit_codes::SUCCESS {
        print_json(&options)?;
    }
    Ok(code)
}

fn cmd_setup_defaults(config: &FilterConfig, early: bool) -> Result<i32> {
    let mut options = read_options()?;
    let code = setup_defaults(config, &mut options, early);
    print_json(&options)?;
    Ok(code)
}

fn cmd_show_partition(config: &FilterConfig, partition: Option<String>) -> Result<i32> {
    let query = SlurmQuery::new(config.query.clone());
    let partition = match partition {
        Some(name) => name,
        None => get_default_partition_or_env(&query, &ProcessEnv, &config.partition_env)
            .ok_or_else(|| anyhow!("no default partition found"))?,
    };
    let info = get_partition_info(&query, &partition)
        .ok_or_else(|| anyhow!("unable to retrieve partition information for {partition}"))?;
    print_json(&info)?;
    Ok(exit_codes::SUCCESS)
}

fn cmd_show_gres(config: &FilterConfig, partition: &str) -> Result<i32> {
    let query = SlurmQuery::new(config.query.clone());
    print_json(&get_node_gres(&query, partition))?;
    Ok(exit_codes::SUCCESS)
}

fn cmd_to_mib(value: &str) -> Result<i32> {
    let mib = to_mebibytes(value).ok_or_else(|| anyhow!("not a size: {value:?}"))?;
    println!("{mib}");
    Ok(exit_codes::SUCCESS)
}

fn read_options() -> Result<OptionRecord> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("read options from stdin")?;
    if raw.trim().is_empty() {
        return Ok(OptionRecord::new());
    }
    serde_json::from_str(&raw).context("parse options json")
}

/// Print `value` as pretty JSON with a trailing newline.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pre_submit_defaults_offset() {
        let cli = Cli::parse_from(["cli-filter", "pre-submit"]);
        assert!(matches!(cli.command, Command::PreSubmit { offset: 0 }));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_global_config_after_subcommand() {
        let cli = Cli::parse_from(["cli-filter", "setup-defaults", "--early", "--config", "x.toml"]);
        assert!(matches!(cli.command, Command::SetupDefaults { early: true }));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn parse_post_submit_ids() {
        let cli = Cli::parse_from(["cli-filter", "post-submit", "--job-id", "42", "--step-id", "1"]);
        assert!(matches!(
            cli.command,
            Command::PostSubmit {
                offset: 0,
                job_id: 42,
                step_id: 1
            }
        ));
    }
}
