//! `JobConfig`: the validated form of the CLI surface in spec.md §6,
//! parsed with `clap`'s builder API the way the originating codebase's own
//! two CLI entry points (`authenticator`'s `main.rs`/`gen_config.rs`) parse
//! theirs. `JobConfig` also derives `Serialize`/`Deserialize` so a worker
//! can additionally be launched from a TOML job file via `serdeconv`, the
//! same convenience the originating codebase's `GameConfig::load` used —
//! flags always take precedence over the file.

use crate::error::{DriverError, Result};
use clap::{App, Arg, ArgMatches};
use mrlite_io::reader::DEFAULT_MAX_INPUT_LINE_LENGTH;
use serde_derive::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// `input_format`/`output_format`: `text` or `protofile`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum RecordFormat {
    Text,
    Protofile,
}

impl RecordFormat {
    fn parse(value: &str) -> Result<RecordFormat> {
        match value {
            "text" => Ok(RecordFormat::Text),
            "protofile" => Ok(RecordFormat::Protofile),
            other => Err(DriverError::Configuration(format!(
                "unknown record format '{}', expected 'text' or 'protofile'",
                other
            ))),
        }
    }
}

/// Which half of the job this process is performing. Resolved from the
/// `map_worker_id`/`reduce_worker_id`/`map_only` flags — exactly one of
/// the first two is set.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WorkerRole {
    Mapper { id: usize },
    Reducer { id: usize },
}

/// The job-wide and per-worker configuration of spec.md §6, after flag
/// parsing and validation. Lives through `RESOURCES_OPEN`/`RUNNING`
/// unchanged; nothing here is mutated once a worker starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub num_map_workers: usize,
    pub reduce_workers: Vec<SocketAddr>,
    pub map_worker_id: Option<usize>,
    pub reduce_worker_id: Option<usize>,
    pub map_only: bool,
    pub batch_reduction: bool,
    pub mapper_class: String,
    pub reducer_class: String,
    pub input_filepattern: String,
    pub output_files: Vec<String>,
    pub input_format: RecordFormat,
    pub output_format: RecordFormat,
    pub reduce_input_filebase: String,
    pub num_reduce_input_buffer_files: u64,
    /// `B` in bytes, clamped to `[1, 2000]` MB at construction time
    /// (spec.md §9's Open Question, resolved here by picking the
    /// stricter, consistently enforced bound).
    pub reduce_input_buffer_size_bytes: u64,
    pub mapper_message_queue_size_bytes: usize,
    pub reducer_message_queue_size_bytes: usize,
    pub max_map_output_size: u64,
    pub log_filebase: Option<String>,
    /// Supplemented feature (SPEC_FULL.md §14): number of passes a mapper
    /// is driven over its input shard(s).
    pub multipass_map: u32,
    /// Bound on a `text`-format input line (spec.md §7's "oversize text
    /// lines" case); a longer line is skipped with a `warn!`, not fatal.
    pub max_input_line_length: usize,
}

const MIN_BUFFER_MB: u64 = 1;
const MAX_BUFFER_MB: u64 = 2000;

impl JobConfig {
    /// Builds the `clap` parser for the CLI surface of spec.md §6.
    pub fn cli_app<'a, 'b>() -> App<'a, 'b> {
        App::new("mrlite-worker")
            .version("0.1.0")
            .about("MapReduce-Lite worker process: runs one map or reduce role of a job.")
            .arg(Arg::with_name("job_config").long("job_config").takes_value(true).help(
                "Optional TOML file of defaults for the flags below; explicit flags still take precedence.",
            ))
            .arg(Arg::with_name("num_map_workers").long("num_map_workers").takes_value(true))
            .arg(
                Arg::with_name("reduce_workers")
                    .long("reduce_workers")
                    .takes_value(true)
                    .help("Comma-separated host:port list, one per reducer."),
            )
            .arg(Arg::with_name("map_worker_id").long("map_worker_id").takes_value(true))
            .arg(Arg::with_name("reduce_worker_id").long("reduce_worker_id").takes_value(true))
            .arg(Arg::with_name("map_only").long("map_only"))
            .arg(Arg::with_name("batch_reduction").long("batch_reduction").takes_value(true))
            .arg(Arg::with_name("mapper_class").long("mapper_class").takes_value(true))
            .arg(Arg::with_name("reducer_class").long("reducer_class").takes_value(true))
            .arg(Arg::with_name("input_filepattern").long("input_filepattern").takes_value(true))
            .arg(Arg::with_name("output_files").long("output_files").takes_value(true))
            .arg(Arg::with_name("input_format").long("input_format").takes_value(true))
            .arg(Arg::with_name("output_format").long("output_format").takes_value(true))
            .arg(Arg::with_name("reduce_input_filebase").long("reduce_input_filebase").takes_value(true))
            .arg(
                Arg::with_name("num_reduce_input_buffer_files")
                    .long("num_reduce_input_buffer_files")
                    .takes_value(true),
            )
            .arg(Arg::with_name("reduce_input_buffer_size").long("reduce_input_buffer_size").takes_value(true))
            .arg(
                Arg::with_name("mapper_message_queue_size")
                    .long("mapper_message_queue_size")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("reducer_message_queue_size")
                    .long("reducer_message_queue_size")
                    .takes_value(true),
            )
            .arg(Arg::with_name("max_map_output_size").long("max_map_output_size").takes_value(true))
            .arg(Arg::with_name("log_filebase").long("log_filebase").takes_value(true))
            .arg(Arg::with_name("multipass_map").long("multipass_map").takes_value(true))
            .arg(
                Arg::with_name("max_input_line_length")
                    .long("max_input_line_length")
                    .takes_value(true)
                    .help("Max text-format input line length in bytes; longer lines are skipped with a warning."),
            )
    }

    /// Parses and validates a `JobConfig` from already-matched CLI flags,
    /// layering them over an optional `--job_config` TOML file of
    /// defaults. Returns a `Configuration` error on any invalid
    /// combination or value — callers must not open any resource before
    /// this succeeds.
    pub fn from_matches(matches: &ArgMatches) -> Result<JobConfig> {
        let mut config = match matches.value_of("job_config") {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::placeholder(),
        };

        if let Some(v) = matches.value_of("num_map_workers") {
            config.num_map_workers = parse_field(v, "num_map_workers")?;
        }
        if let Some(v) = matches.value_of("reduce_workers") {
            config.reduce_workers = parse_reduce_workers(v)?;
        }
        if let Some(v) = matches.value_of("map_worker_id") {
            config.map_worker_id = Some(parse_field(v, "map_worker_id")?);
        }
        if let Some(v) = matches.value_of("reduce_worker_id") {
            config.reduce_worker_id = Some(parse_field(v, "reduce_worker_id")?);
        }
        if matches.is_present("map_only") {
            config.map_only = true;
        }
        if let Some(v) = matches.value_of("batch_reduction") {
            config.batch_reduction = parse_field(v, "batch_reduction")?;
        }
        if let Some(v) = matches.value_of("mapper_class") {
            config.mapper_class = v.to_string();
        }
        if let Some(v) = matches.value_of("reducer_class") {
            config.reducer_class = v.to_string();
        }
        if let Some(v) = matches.value_of("input_filepattern") {
            config.input_filepattern = v.to_string();
        }
        if let Some(v) = matches.value_of("output_files") {
            config.output_files = v.split(',').map(str::to_string).collect();
        }
        if let Some(v) = matches.value_of("input_format") {
            config.input_format = RecordFormat::parse(v)?;
        }
        if let Some(v) = matches.value_of("output_format") {
            config.output_format = RecordFormat::parse(v)?;
        }
        if let Some(v) = matches.value_of("reduce_input_filebase") {
            config.reduce_input_filebase = v.to_string();
        }
        if let Some(v) = matches.value_of("num_reduce_input_buffer_files") {
            config.num_reduce_input_buffer_files = parse_field(v, "num_reduce_input_buffer_files")?;
        }
        if let Some(v) = matches.value_of("reduce_input_buffer_size") {
            let mb: u64 = parse_field(v, "reduce_input_buffer_size")?;
            config.reduce_input_buffer_size_bytes = clamp_buffer_mb(mb) * (1 << 20);
        }
        if let Some(v) = matches.value_of("mapper_message_queue_size") {
            let mb: usize = parse_field(v, "mapper_message_queue_size")?;
            config.mapper_message_queue_size_bytes = mb * (1 << 20);
        }
        if let Some(v) = matches.value_of("reducer_message_queue_size") {
            let mb: usize = parse_field(v, "reducer_message_queue_size")?;
            config.reducer_message_queue_size_bytes = mb * (1 << 20);
        }
        if let Some(v) = matches.value_of("max_map_output_size") {
            config.max_map_output_size = parse_field(v, "max_map_output_size")?;
        }
        if let Some(v) = matches.value_of("log_filebase") {
            config.log_filebase = Some(v.to_string());
        }
        if let Some(v) = matches.value_of("multipass_map") {
            config.multipass_map = parse_field(v, "multipass_map")?;
        }
        if let Some(v) = matches.value_of("max_input_line_length") {
            config.max_input_line_length = parse_field(v, "max_input_line_length")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML job file with `serdeconv`, the same convenience the
    /// originating codebase's `GameConfig::load` used for local testing.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<JobConfig> {
        serdeconv::from_toml_file(path.as_ref())
            .map_err(|err| DriverError::Configuration(format!("failed to load job config file: {}", err)))
    }

    fn placeholder() -> JobConfig {
        JobConfig {
            num_map_workers: 0,
            reduce_workers: Vec::new(),
            map_worker_id: None,
            reduce_worker_id: None,
            map_only: false,
            batch_reduction: false,
            mapper_class: String::new(),
            reducer_class: String::new(),
            input_filepattern: String::new(),
            output_files: Vec::new(),
            input_format: RecordFormat::Text,
            output_format: RecordFormat::Text,
            reduce_input_filebase: String::new(),
            num_reduce_input_buffer_files: 0,
            reduce_input_buffer_size_bytes: clamp_buffer_mb(64) * (1 << 20),
            mapper_message_queue_size_bytes: 4 * (1 << 20),
            reducer_message_queue_size_bytes: 4 * (1 << 20),
            max_map_output_size: 64 * (1 << 20),
            log_filebase: None,
            multipass_map: 1,
            max_input_line_length: DEFAULT_MAX_INPUT_LINE_LENGTH,
        }
    }

    /// Resolves which role this worker plays. Exactly one of
    /// `map_worker_id`/`reduce_worker_id` must be set.
    pub fn role(&self) -> Result<WorkerRole> {
        match (self.map_worker_id, self.reduce_worker_id) {
            (Some(id), None) => Ok(WorkerRole::Mapper { id }),
            (None, Some(id)) => {
                if self.map_only {
                    Err(DriverError::Configuration(
                        "reduce_worker_id set together with map_only".to_string(),
                    ))
                } else {
                    Ok(WorkerRole::Reducer { id })
                }
            }
            (None, None) => Err(DriverError::Configuration(
                "exactly one of map_worker_id/reduce_worker_id must be set".to_string(),
            )),
            (Some(_), Some(_)) => Err(DriverError::Configuration(
                "map_worker_id and reduce_worker_id are mutually exclusive".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let role = self.role()?;

        if self.mapper_class.is_empty() {
            return Err(DriverError::Configuration("mapper_class is required".to_string()));
        }
        if !self.map_only && self.reducer_class.is_empty() {
            return Err(DriverError::Configuration(
                "reducer_class is required unless map_only is set".to_string(),
            ));
        }
        if self.output_files.is_empty() {
            return Err(DriverError::Configuration("output_files must name at least one channel".to_string()));
        }
        if self.multipass_map == 0 {
            return Err(DriverError::Configuration("multipass_map must be at least 1".to_string()));
        }

        match role {
            WorkerRole::Mapper { .. } => {
                if self.input_filepattern.is_empty() {
                    return Err(DriverError::Configuration("input_filepattern is required for mappers".to_string()));
                }
                if !self.map_only && self.reduce_workers.is_empty() {
                    return Err(DriverError::Configuration(
                        "reduce_workers must be set unless map_only is set".to_string(),
                    ));
                }
                if self.batch_reduction && !self.map_only && self.reduce_input_filebase.is_empty() {
                    return Err(DriverError::Configuration(
                        "reduce_input_filebase is required in batch mode".to_string(),
                    ));
                }
            }
            WorkerRole::Reducer { .. } => {
                if self.num_map_workers == 0 {
                    return Err(DriverError::Configuration("num_map_workers must be positive for reducers".to_string()));
                }
                if self.batch_reduction {
                    if self.reduce_input_filebase.is_empty() {
                        return Err(DriverError::Configuration(
                            "reduce_input_filebase is required in batch mode".to_string(),
                        ));
                    }
                    if self.num_reduce_input_buffer_files == 0 {
                        return Err(DriverError::Configuration(
                            "num_reduce_input_buffer_files must be positive in batch mode".to_string(),
                        ));
                    }
                } else if self.reduce_workers.get(self.reduce_worker_id.unwrap_or(0)).is_none() {
                    return Err(DriverError::Configuration(
                        "reduce_workers must include this reducer's own bind address".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn parse_field<T: std::str::FromStr>(value: &str, field: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| DriverError::Configuration(format!("invalid value for {}: '{}'", field, value)))
}

fn parse_reduce_workers(value: &str) -> Result<Vec<SocketAddr>> {
    value
        .split(',')
        .map(|part| {
            part.trim()
                .parse()
                .map_err(|_| DriverError::Configuration(format!("invalid reduce worker address: '{}'", part)))
        })
        .collect()
}

fn clamp_buffer_mb(mb: u64) -> u64 {
    mb.clamp(MIN_BUFFER_MB, MAX_BUFFER_MB)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_for(args: &[&str]) -> ArgMatches<'static> {
        let mut full = vec!["mrlite-worker"];
        full.extend_from_slice(args);
        JobConfig::cli_app().get_matches_from(full)
    }

    #[test]
    fn minimal_mapper_config_validates() {
        let matches = matches_for(&[
            "--map_worker_id",
            "0",
            "--num_map_workers",
            "2",
            "--reduce_workers",
            "127.0.0.1:9001",
            "--mapper_class",
            "wordcount",
            "--reducer_class",
            "wordcount",
            "--input_filepattern",
            "shard-*.txt",
            "--output_files",
            "out-0",
        ]);
        let config = JobConfig::from_matches(&matches).unwrap();
        assert_eq!(config.role().unwrap(), WorkerRole::Mapper { id: 0 });
    }

    #[test]
    fn ambiguous_role_is_a_configuration_error() {
        let matches = matches_for(&[
            "--map_worker_id",
            "0",
            "--reduce_worker_id",
            "0",
            "--mapper_class",
            "wordcount",
            "--reducer_class",
            "wordcount",
            "--output_files",
            "out-0",
        ]);
        assert!(matches!(JobConfig::from_matches(&matches), Err(DriverError::Configuration(_))));
    }

    #[test]
    fn buffer_size_is_clamped_to_2000mb() {
        let matches = matches_for(&[
            "--map_worker_id",
            "0",
            "--num_map_workers",
            "1",
            "--map_only",
            "--mapper_class",
            "wordcount",
            "--input_filepattern",
            "shard-*.txt",
            "--output_files",
            "out-0",
            "--reduce_input_buffer_size",
            "999999",
        ]);
        let config = JobConfig::from_matches(&matches).unwrap();
        assert_eq!(config.reduce_input_buffer_size_bytes, MAX_BUFFER_MB * (1 << 20));
    }

    #[test]
    fn map_only_does_not_require_reducer_class() {
        let matches = matches_for(&[
            "--map_worker_id",
            "0",
            "--num_map_workers",
            "1",
            "--map_only",
            "--mapper_class",
            "wordcount",
            "--input_filepattern",
            "shard-*.txt",
            "--output_files",
            "out-0",
        ]);
        assert!(JobConfig::from_matches(&matches).is_ok());
    }
}
