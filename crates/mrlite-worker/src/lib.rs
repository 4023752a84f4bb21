//! The worker binary's reusable half: wires parsed flags, registry
//! lookups for `mapper_class`/`reducer_class`, and `mrlite-driver`'s run
//! routines together, and turns the result into the process exit code of
//! spec.md §6 ("Zero on successful Finalize; non-zero on any validation
//! or resource failure; abort on any fatal runtime condition").
//!
//! A concrete job binary (a "demo" in this workspace) registers its
//! `Mapper`/`IncrementalReducer`/`BatchReducer` implementations into a
//! [`Registries`] at start-up, the same way the originating codebase's own
//! entry points registered their classes before handing off to the shared
//! driver loop, then calls [`run`].

use mrlite_base::logging::{crit, info, LogConfig, Logger};
use mrlite_driver::{
    BatchReducer, DriverError, IncrementalReducer, JobConfig, Mapper, WorkerRole,
};
use mrlite_io::Registry;

/// The three name→factory registries a job binary populates before
/// calling [`run`]. Exactly one of `incremental_reducers`/`batch_reducers`
/// is consulted for a given job, chosen by the `batch_reduction` flag.
pub struct Registries {
    pub mappers: Registry<dyn Mapper>,
    pub incremental_reducers: Registry<dyn IncrementalReducer>,
    pub batch_reducers: Registry<dyn BatchReducer>,
}

impl Registries {
    pub fn new() -> Registries {
        Registries {
            mappers: Registry::new(),
            incremental_reducers: Registry::new(),
            batch_reducers: Registry::new(),
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Registries::new()
    }
}

/// Parses the process's command-line flags, resolves this worker's role,
/// and runs the matching driver loop. Returns the process exit code:
/// non-zero on a `Configuration` error (caught before any resource opens)
/// or an unknown `mapper_class`/`reducer_class`; a fatal runtime error
/// is logged at `crit!` and also returns non-zero rather than aborting the
/// whole test process — `main.rs` is the one place that turns this into
/// an actual `process::exit`.
pub fn run(registries: &Registries) -> i32 {
    let matches = JobConfig::cli_app().get_matches();
    let config = match JobConfig::from_matches(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {}", err);
            return 1;
        }
    };

    let role = config.role().expect("a validated JobConfig always resolves a role");
    let (role_name, worker_id) = match role {
        WorkerRole::Mapper { id } => ("mapper", id as i32),
        WorkerRole::Reducer { id } => ("reducer", id as i32),
    };

    let log_config = LogConfig {
        level: "info".to_string(),
        file_base: config.log_filebase.clone(),
    };
    let log = mrlite_base::logging::init(&log_config, role_name, worker_id);

    let result = dispatch(&config, role, registries, &log);

    match result {
        Ok(()) => {
            info!(log, "worker finished successfully");
            0
        }
        Err(err) => {
            crit!(log, "fatal worker error"; "error" => %err);
            1
        }
    }
}

fn dispatch(config: &JobConfig, role: WorkerRole, registries: &Registries, log: &Logger) -> mrlite_driver::Result<()> {
    match role {
        WorkerRole::Mapper { .. } => {
            let mut mapper = registries
                .mappers
                .create(&config.mapper_class)
                .ok_or_else(|| DriverError::Configuration(format!("unknown mapper_class '{}'", config.mapper_class)))?;
            mrlite_driver::run_mapper(config, mapper.as_mut(), log)
        }
        WorkerRole::Reducer { .. } if config.batch_reduction => {
            let mut reducer = registries
                .batch_reducers
                .create(&config.reducer_class)
                .ok_or_else(|| DriverError::Configuration(format!("unknown reducer_class '{}'", config.reducer_class)))?;
            mrlite_driver::run_batch_reducer(config, reducer.as_mut(), log)
        }
        WorkerRole::Reducer { .. } => {
            let mut reducer = registries
                .incremental_reducers
                .create(&config.reducer_class)
                .ok_or_else(|| DriverError::Configuration(format!("unknown reducer_class '{}'", config.reducer_class)))?;
            mrlite_driver::run_incremental_reducer(config, reducer.as_mut(), log)
        }
    }
}
