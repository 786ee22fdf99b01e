// sptl: environment-driven configuration
//
// Parsed once in `launch`, then handed around as an immutable record. Each
// setting has a `SPTL_<KEY>` environment variable and a compiled-in default.

use std::path::PathBuf;

use crate::error::ConfigError;

/// The subset of configuration consulted on granularity-controller hot
/// paths: `kappa` and `alpha`. Kept small and `Copy` so it can be passed by
/// value into `spguard`/`fork2` without indirection.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeParams {
    /// Target sequential-leaf duration, in microseconds.
    pub kappa: f64,
    /// Overshoot ratio admitted by `is_small`.
    pub alpha: f64,
}

impl RuntimeParams {
    pub const fn defaults() -> Self {
        Self {
            kappa: 100.0,
            alpha: 1.2,
        }
    }
}

impl Default for RuntimeParams {
    fn default() -> Self {
        Self::defaults()
    }
}

static GLOBAL_PARAMS: std::sync::OnceLock<RuntimeParams> = std::sync::OnceLock::new();

/// The `RuntimeParams` in effect for the process. Set once by `launch`; code
/// that runs without ever calling `launch` (most unit tests) sees the
/// compiled-in defaults.
pub fn global_params() -> RuntimeParams {
    *GLOBAL_PARAMS.get_or_init(RuntimeParams::defaults)
}

/// Install the `RuntimeParams` parsed by `launch`. Only the first call has
/// any effect, matching the "initialized once during launch" contract.
pub(crate) fn install_global_params(params: RuntimeParams) {
    let _ = GLOBAL_PARAMS.set(params);
}

/// Full configuration record built once at `launch` and never mutated
/// afterward.
#[derive(Debug, Clone)]
pub struct Config {
    pub params: RuntimeParams,
    pub nb_workers: usize,
    pub numa_alloc_interleaved: bool,
    pub log_text: Option<PathBuf>,
    pub constants_in: Option<PathBuf>,
    pub constants_out: Option<PathBuf>,
}

impl Config {
    /// Parse the recognized `SPTL_*` environment variables, falling back to
    /// the documented defaults for anything unset. `SPTL_PROC` defaults to
    /// the host's logical core count rather than 1, matching the worker
    /// pool `launch` actually builds.
    pub fn from_env() -> Result<Self, ConfigError> {
        let nb_workers = parse_env("SPTL_PROC", num_cpus::get())?;
        let kappa = parse_env("SPTL_KAPPA", 100.0f64)?;
        let alpha = parse_env("SPTL_ALPHA", 1.2f64)?;
        let numa_alloc_interleaved = match std::env::var("SPTL_NUMA_ALLOC_INTERLEAVED") {
            Ok(v) => parse_bool("SPTL_NUMA_ALLOC_INTERLEAVED", &v)?,
            Err(_) => nb_workers > 1,
        };

        Ok(Self {
            params: RuntimeParams { kappa, alpha },
            nb_workers,
            numa_alloc_interleaved,
            log_text: std::env::var("SPTL_LOG_TEXT").ok().map(PathBuf::from),
            constants_in: std::env::var("SPTL_CONSTANTS_IN").ok().map(PathBuf::from),
            constants_out: std::env::var("SPTL_CONSTANTS_OUT").ok().map(PathBuf::from),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params: RuntimeParams::defaults(),
            nb_workers: 1,
            numa_alloc_interleaved: false,
            log_text: None,
            constants_in: None,
            constants_out: None,
        }
    }
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key,
            value,
            expected: std::any::type_name::<T>(),
        }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            expected: "a boolean (true/false/1/0/yes/no/on/off)",
        }),
    }
}

/// Environment variables are process-global; tests anywhere in this crate
/// that touch `SPTL_*` vars serialize on this lock rather than each other's
/// private one, since `cargo test` runs unit tests from different modules
/// concurrently in the same process.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
