//! End-to-end tests for the `cli-filter` binary.
//!
//! Partition queries are served by `sh -c 'cat <fixture>'`; the partition name
//! the query appends lands in `$0` and is ignored.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use cli_filter::exit_codes;
use cli_filter::test_support::{CPU_PARTITION_LINE, ConfigDir};
use serde_json::Value;

fn config_dir(partition_report: &str) -> ConfigDir {
    let dir = ConfigDir::new("").expect("config dir");
    let fixture = dir
        .write_fixture("partition.txt", &format!("{partition_report}\n"))
        .expect("fixture");
    let config = format!(
        "[query]\npartition_command = [\"sh\", \"-c\", \"cat '{}'\"]\n",
        fixture.display()
    );
    std::fs::write(dir.config_path(), config).expect("write config");
    dir
}

fn run_cli(dir: &ConfigDir, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_cli-filter"))
        .arg("--config")
        .arg(dir.config_path())
        .args(args)
        .env_remove("SLURM_CLI_FILTER_DEBUG")
        .env_remove("SLURM_JOB_PARTITION")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn cli-filter");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait cli-filter")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

#[test]
fn pre_submit_sets_default_memory_per_cpu() {
    let dir = config_dir(CPU_PARTITION_LINE);
    let output = run_cli(&dir, &["pre-submit"], r#"{"partition": "cpu"}"#);

    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS));
    let options = stdout_json(&output);
    assert_eq!(options["partition"], "cpu");
    assert_eq!(options["mem-per-cpu"], "920");
}

#[test]
fn pre_submit_doubles_memory_for_one_thread_per_core() {
    let dir = config_dir(CPU_PARTITION_LINE);
    let output = run_cli(
        &dir,
        &["pre-submit", "--offset", "1"],
        r#"{"partition": "cpu", "threads-per-core": "1"}"#,
    );

    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS));
    assert_eq!(stdout_json(&output)["mem-per-cpu"], "1840");
}

#[test]
fn pre_submit_rejection_exits_with_error_and_no_output() {
    let dir = config_dir("PartitionName=cpu TotalCPUs=64 TotalNodes=2");
    let output = run_cli(&dir, &["pre-submit"], r#"{"partition": "cpu"}"#);

    assert_eq!(output.status.code(), Some(exit_codes::ERROR));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("default memory per cpu"), "{stderr}");
}

#[test]
fn pre_submit_leaves_acceptance_jobs_alone() {
    let dir = config_dir(CPU_PARTITION_LINE);
    let output = run_cli(
        &dir,
        &["pre-submit"],
        r#"{"partition": "acceptance", "mem": "1"}"#,
    );

    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS));
    let options = stdout_json(&output);
    assert_eq!(options["mem"], "1");
    assert!(options.get("mem-per-cpu").is_none());
}

#[test]
fn pre_submit_rejects_malformed_json() {
    let dir = config_dir(CPU_PARTITION_LINE);
    let output = run_cli(&dir, &["pre-submit"], "{not json");

    assert_eq!(output.status.code(), Some(exit_codes::ERROR));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse options json"), "{stderr}");
}

#[test]
fn setup_defaults_fills_threads_per_core() {
    let dir = config_dir(CPU_PARTITION_LINE);
    let output = run_cli(&dir, &["setup-defaults"], "");

    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS));
    assert_eq!(stdout_json(&output)["threads-per-core"], "1");
}

#[test]
fn show_partition_prints_structured_attributes() {
    let dir = config_dir(CPU_PARTITION_LINE);
    let output = run_cli(&dir, &["show-partition", "cpu"], "");

    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS));
    let info = stdout_json(&output);
    assert_eq!(info["DefMemPerCPU"], "920");
    assert_eq!(info["TRES"]["pairs"]["cpu"], "2048");
}

#[test]
fn to_mib_converts_suffixed_sizes() {
    let dir = config_dir(CPU_PARTITION_LINE);
    let output = run_cli(&dir, &["to-mib", "3500G"], "");

    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3584000");

    let bad = run_cli(&dir, &["to-mib", "lots"], "");
    assert_eq!(bad.status.code(), Some(exit_codes::ERROR));
}
