//! Submission hook boundary: the three entry points the scheduler calls.
//!
//! Each hook maps its outcome to [`exit_codes::SUCCESS`] or [`exit_codes::ERROR`].

use tracing::debug;

use crate::core::options::OptionRecord;
use crate::core::types::Decision;
use crate::exit_codes;
use crate::io::config::FilterConfig;
use crate::io::env::Environment;
use crate::io::query::ClusterQuery;
use crate::logging::Logger;
use crate::policy::PolicyEngine;

/// Apply the policy before a job or step is submitted.
pub fn pre_submit<Q, E, L>(
    engine: &PolicyEngine<'_, Q, E, L>,
    options: &mut OptionRecord,
    offset: u32,
) -> i32
where
    Q: ClusterQuery + ?Sized,
    E: Environment + ?Sized,
    L: Logger + ?Sized,
{
    match engine.evaluate(options, offset) {
        Decision::Accepted => exit_codes::SUCCESS,
        Decision::Rejected(_) => exit_codes::ERROR,
    }
}

/// Called once the job or step exists. Nothing to enforce at that point.
pub fn post_submit<L: Logger + ?Sized>(logger: &L, offset: u32, job_id: u32, step_id: u32) -> i32 {
    logger.info(&format!(
        "offset {offset}: submitted job {job_id} step {step_id}"
    ));
    exit_codes::SUCCESS
}

/// Seed configured defaults before the user's options are parsed.
///
/// Options the user already set (by the sentinel rules) are left untouched.
pub fn setup_defaults(config: &FilterConfig, options: &mut OptionRecord, early: bool) -> i32 {
    for (name, value) in &config.defaults {
        if config.sentinels.is_set(options, name) {
            continue;
        }
        debug!(option = %name, value = %value, early, "applying default option");
        options.set(name, value.clone());
    }
    exit_codes::SUCCESS
}
