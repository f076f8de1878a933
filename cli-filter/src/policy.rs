//! Submission policy: default unset resource options from partition state and
//! reject combinations the partition's accounting rules do not allow.
//!
//! Every evaluation starts from scratch. Partition and node records are queried
//! per call, read, and dropped; only the option record is written.

use crate::cluster::{get_default_partition_or_env, get_node_gres, get_partition_info};
use crate::core::gres::gres_count;
use crate::core::kvlist::{self, KvList};
use crate::core::options::{OptionRecord, names};
use crate::core::partition::PartitionInfo;
use crate::core::types::{Decision, PartitionClass};
use crate::core::units::{format_mebibytes, to_mebibytes};
use crate::io::config::FilterConfig;
use crate::io::env::Environment;
use crate::io::query::ClusterQuery;
use crate::logging::Logger;

const GRES_DELIMITER: &str = ":";
const GRES_PREFIX: &str = "gres/";
const GPU_GRES: &str = "gpu";
const TMP_GRES: &str = "tmp";
const SRUN: &str = "srun";

const CPU_OPTIONS: [&str; 3] = [
    names::CPUS_PER_TASK,
    names::CPUS_PER_GPU,
    names::CORES_PER_SOCKET,
];
const GPU_OPTIONS: [&str; 3] = [names::GPUS, names::GPUS_PER_NODE, names::GPUS_PER_TASK];

/// What the submission asks for, classified before any option is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFlags {
    /// `srun` launched inside an allocation that has already been granted.
    pub srun_in_allocation: bool,
    pub explicit_cpu: bool,
    pub explicit_gpu: bool,
    /// Explicit memory; asking for all node memory does not count.
    pub explicit_mem: bool,
    pub all_node_memory: bool,
    pub exclusive: bool,
    pub one_thread_per_core: bool,
    /// GPU count when the request states one per node.
    pub gpu_count: Option<u64>,
    /// Size of the `tmp` entry in the user's `gres`, as written.
    pub tmp_request: Option<String>,
}

#[derive(Debug)]
struct Rejection(String);

type Step = Result<(), Rejection>;

fn reject(message: impl Into<String>) -> Step {
    Err(Rejection(message.into()))
}

/// Decision engine over injected collaborators.
pub struct PolicyEngine<'a, Q: ?Sized, E: ?Sized, L: ?Sized> {
    config: &'a FilterConfig,
    query: &'a Q,
    env: &'a E,
    logger: &'a L,
}

impl<'a, Q, E, L> PolicyEngine<'a, Q, E, L>
where
    Q: ClusterQuery + ?Sized,
    E: Environment + ?Sized,
    L: Logger + ?Sized,
{
    pub fn new(config: &'a FilterConfig, query: &'a Q, env: &'a E, logger: &'a L) -> Self {
        Self {
            config,
            query,
            env,
            logger,
        }
    }

    /// Evaluate one submission, filling in defaults on `options`.
    ///
    /// A rejection returns immediately; options written before the failing
    /// check stay written.
    pub fn evaluate(&self, options: &mut OptionRecord, offset: u32) -> Decision {
        match self.apply(options, offset) {
            Ok(()) => {
                let rendered = serde_json::to_string(&*options)
                    .unwrap_or_else(|err| format!("<unserializable options: {err}>"));
                self.logger
                    .info(&format!("offset {offset}: final options {rendered}"));
                Decision::Accepted
            }
            Err(Rejection(message)) => {
                self.logger.error(&message);
                Decision::Rejected(message)
            }
        }
    }

    pub fn request_flags(&self, options: &OptionRecord) -> RequestFlags {
        let rules = &self.config.sentinels;
        let gres = rules
            .requested(options, names::GRES)
            .map(decode_gres)
            .unwrap_or_default();

        let gres_gpu = gres_gpu_requested(&gres);
        let all_node_memory =
            options.get(names::MEM) == Some(self.config.all_node_memory.as_str());
        let explicit_mem = (!all_node_memory && rules.is_set(options, names::MEM))
            || rules.any_set(options, &[names::MEM_PER_CPU, names::MEM_PER_GPU]);

        let gpu_count = [names::GPUS_PER_NODE, names::GPUS]
            .iter()
            .filter_map(|name| rules.requested(options, name))
            .chain(gres.get(GPU_GRES))
            .find_map(gres_count)
            .filter(|count| *count > 0);

        RequestFlags {
            srun_in_allocation: options.get(names::TYPE) == Some(SRUN)
                && self.env.non_empty(&self.config.partition_env).is_some(),
            explicit_cpu: rules.any_set(options, &CPU_OPTIONS),
            explicit_gpu: rules.any_set(options, &GPU_OPTIONS) || gres_gpu,
            explicit_mem,
            all_node_memory,
            exclusive: rules.is_set(options, names::EXCLUSIVE),
            one_thread_per_core: options.get(names::THREADS_PER_CORE) == Some("1"),
            gpu_count,
            tmp_request: gres.get(TMP_GRES).map(str::to_string),
        }
    }

    /// Partition option (first of a list), else the environment or default partition.
    pub fn resolve_partition(&self, options: &OptionRecord) -> Option<String> {
        if let Some(requested) = self.config.sentinels.requested(options, names::PARTITION) {
            let first = requested.split(',').next().unwrap_or(requested).trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
        get_default_partition_or_env(self.query, self.env, &self.config.partition_env)
    }

    fn apply(&self, options: &mut OptionRecord, offset: u32) -> Step {
        let flags = self.request_flags(options);
        let partition = self.resolve_partition(options);
        let class = self.config.classify(partition.as_deref());
        let name = partition.as_deref().unwrap_or("");
        self.logger.info(&format!(
            "offset {offset}: partition={} class={class:?} {flags:?}",
            partition.as_deref().unwrap_or("(none)")
        ));

        match class {
            PartitionClass::Acceptance => return Ok(()),
            PartitionClass::General => self.apply_general(options, &flags, name)?,
            PartitionClass::Gpu => self.apply_gpu(options, &flags, name)?,
        }
        self.apply_tmp(options, &flags, class, name)?;
        self.check_gated_options(options, &flags, class)
    }

    fn partition_info(&self, partition: &str) -> Result<PartitionInfo, Rejection> {
        get_partition_info(self.query, partition).ok_or_else(|| {
            Rejection(format!(
                "unable to retrieve partition information for partition '{partition}'"
            ))
        })
    }

    fn apply_general(
        &self,
        options: &mut OptionRecord,
        flags: &RequestFlags,
        partition: &str,
    ) -> Step {
        if flags.explicit_mem {
            return Ok(());
        }
        let info = self.partition_info(partition)?;
        let Some(mem_per_thread) = info
            .number("DefMemPerCPU")
            .filter(|mem| *mem > 0.0)
            .map(f64::floor)
        else {
            return reject(format!(
                "unable to determine default memory per cpu for partition '{partition}'"
            ));
        };

        if flags.exclusive || flags.all_node_memory {
            let (Some(cpus), Some(nodes)) = (info.number("TotalCPUs"), info.number("TotalNodes"))
            else {
                return reject(format!(
                    "unable to determine cpus per node for partition '{partition}'"
                ));
            };
            if nodes <= 0.0 {
                return reject(format!("partition '{partition}' reports no nodes"));
            }
            let mem = (mem_per_thread * cpus / nodes).floor();
            options.set(names::MEM, format!("{mem:.0}"));
        } else {
            // One thread per core still accounts both hardware threads of the core.
            let factor = if flags.one_thread_per_core { 2.0 } else { 1.0 };
            options.set(names::MEM_PER_CPU, format!("{:.0}", mem_per_thread * factor));
        }
        Ok(())
    }

    fn apply_gpu(
        &self,
        options: &mut OptionRecord,
        flags: &RequestFlags,
        partition: &str,
    ) -> Step {
        let info = self.partition_info(partition)?;
        let (Some(cpus), Some(gpus)) = (
            info.structured_number("TRES", "cpu"),
            info.structured_number("TRES", "gres/gpu"),
        ) else {
            return reject(format!(
                "unable to determine cpu to gpu ratio for partition '{partition}'"
            ));
        };
        if gpus <= 0.0 {
            return reject(format!(
                "unable to determine cpu to gpu ratio for partition '{partition}'"
            ));
        }
        let mut cpus_per_gpu = cpus / gpus;
        if flags.one_thread_per_core {
            cpus_per_gpu /= 2.0;
        }
        let cpus_per_gpu = cpus_per_gpu.floor();

        if flags.explicit_cpu && !flags.srun_in_allocation {
            return reject(format!(
                "cpu requests are not allowed on partition '{partition}': \
                 {cpus_per_gpu:.0} cpus are allocated with each gpu"
            ));
        }
        if flags.explicit_mem {
            let message = match info.structured_number("JobDefaults", "DefMemPerGPU") {
                Some(mem) => format!(
                    "memory requests are not allowed on partition '{partition}': \
                     {} of memory is allocated with each gpu",
                    format_mebibytes(mem)
                ),
                None => format!(
                    "memory requests are not allowed on partition '{partition}': \
                     memory is allocated in proportion to the gpus requested"
                ),
            };
            return reject(message);
        }
        if !flags.exclusive && !flags.explicit_gpu && !flags.srun_in_allocation {
            return reject("non-exclusive GPU allocations require a request for one or more GPUs");
        }

        if !flags.explicit_cpu {
            options.set(names::CPUS_PER_GPU, format!("{cpus_per_gpu:.0}"));
        }
        if flags.exclusive {
            self.update_gres(options, |gres| {
                gres.remove(GPU_GRES);
                gres.remove(&format!("{GRES_PREFIX}{GPU_GRES}"));
                gres.insert(GPU_GRES, self.config.gpus_per_node.to_string());
                gres.insert(TMP_GRES, self.config.tmp_ceiling.clone());
            });
        }
        Ok(())
    }

    fn apply_tmp(
        &self,
        options: &mut OptionRecord,
        flags: &RequestFlags,
        class: PartitionClass,
        partition: &str,
    ) -> Step {
        let Some(requested) = flags.tmp_request.as_deref() else {
            return Ok(());
        };

        if !get_node_gres(self.query, partition).contains(TMP_GRES) {
            self.logger.info(&format!(
                "partition '{partition}' nodes do not advertise tmp; \
                 applying the configured ceiling"
            ));
        }
        let Some(size) = to_mebibytes(requested) else {
            return reject(format!(
                "unable to parse temporary storage request '{requested}'"
            ));
        };
        let ceiling = self.config.tmp_ceiling_mib();
        if size > ceiling {
            return reject(format!(
                "temporary storage request {requested} exceeds the maximum of {} per node",
                self.config.tmp_ceiling
            ));
        }

        if flags.exclusive {
            self.update_gres(options, |gres| {
                gres.insert(TMP_GRES, self.config.tmp_ceiling.clone());
            });
            return Ok(());
        }

        if class == PartitionClass::Gpu
            && let Some(count) = flags.gpu_count
        {
            let count = count.min(self.config.gpus_per_node);
            let share = ceiling * count as f64 / self.config.gpus_per_node as f64;
            if size > share {
                return reject(format!(
                    "temporary storage request {requested} exceeds the {} available \
                     with {count} of {} gpus per node",
                    format_mebibytes(share),
                    self.config.gpus_per_node
                ));
            }
        }
        Ok(())
    }

    fn check_gated_options(
        &self,
        options: &OptionRecord,
        flags: &RequestFlags,
        class: PartitionClass,
    ) -> Step {
        // Granted (or refused) when the allocation was made.
        if flags.srun_in_allocation {
            return Ok(());
        }
        let allowed = class == PartitionClass::Gpu && flags.exclusive;
        for name in &self.config.gated_plugin_options {
            let requested = options
                .spank_option(name)
                .any(|(_, value)| !self.config.sentinels.is_unset(name, Some(value)));
            if requested && !allowed {
                return reject(format!(
                    "--{name} is only permitted on exclusive allocations in a GPU partition"
                ));
            }
        }
        Ok(())
    }

    fn update_gres(&self, options: &mut OptionRecord, edit: impl FnOnce(&mut KvList)) {
        let requested = self.config.sentinels.requested(options, names::GRES);
        let prefix = requested
            .is_some_and(|text| text.split(',').any(|item| item.starts_with(GRES_PREFIX)))
            .then_some(GRES_PREFIX);
        let mut gres = requested.map(decode_gres).unwrap_or_default();
        edit(&mut gres);
        options.set(names::GRES, kvlist::encode(&gres, GRES_DELIMITER, prefix));
    }
}

/// `gres` option keys, with any `gres/` type prefix stripped.
fn decode_gres(text: &str) -> KvList {
    kvlist::decode(text, GRES_DELIMITER, Some(GRES_PREFIX))
}

fn gres_gpu_requested(gres: &KvList) -> bool {
    match gres.get(GPU_GRES) {
        Some(value) => gres_count(value) != Some(0),
        None => gres
            .items()
            .iter()
            .any(|item| item.strip_prefix(GRES_PREFIX).unwrap_or(item) == GPU_GRES),
    }
}
