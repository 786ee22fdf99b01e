// sptl: bootstrap
//
// Grounded in the original source's `launch()` in `spmachine.hpp`: parse
// configuration, build the worker pool, run init callbacks, run the user
// body, run output/destroy callbacks in reverse, flush the log. Config
// parse failures short-circuit before the body ever runs.

use crate::config::Config;
use crate::error::LaunchError;
use crate::{callback, estimator, logging};

/// Run `body` under a freshly configured runtime. Builds the `rayon`
/// thread pool sized to `SPTL_PROC`, pre-warms it with a trivial
/// `install` round-trip so the first real `fork2` doesn't pay thread-spawn
/// cost, seeds the estimator table from `SPTL_CONSTANTS_IN` if set, runs
/// registered `init` callbacks, invokes `body`, then runs `output` and
/// `destroy` callbacks (destroy in reverse registration order) and flushes
/// the text log to `SPTL_LOG_TEXT` if set.
pub fn launch<R>(body: impl FnOnce() -> R) -> Result<R, LaunchError> {
    let config = Config::from_env()?;
    crate::config::install_global_params(config.params);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.nb_workers)
        .build()
        .map_err(|source| LaunchError::WorkerPool {
            requested: config.nb_workers,
            source,
        })?;
    pool.install(|| {});

    if let Some(path) = &config.constants_in {
        match std::fs::read_to_string(path) {
            Ok(text) => estimator::table().load_constants(&text),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read constants file")
            }
        }
    }

    let span = tracing::info_span!(
        "sptl::launch",
        nb_workers = config.nb_workers,
        kappa = config.params.kappa,
        alpha = config.params.alpha,
    );
    let _entered = span.enter();
    tracing::info!("launch: entering user body");

    callback::init_all();
    let result = pool.install(body);
    callback::output_all();
    callback::destroy_all();

    if let Some(path) = &config.constants_out {
        let dump = estimator::table().dump_constants();
        if let Err(err) = std::fs::write(path, dump) {
            tracing::warn!(path = %path.display(), error = %err, "could not write constants file");
        }
    }
    if let Err(err) = logging::buffer().output_text(config.log_text.as_deref()) {
        tracing::warn!(error = %err, "could not flush log text");
    }

    tracing::info!("launch: user body returned");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_LOCK;

    #[test]
    fn launch_runs_the_body_and_returns_its_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("SPTL_PROC");
        let result = launch(|| 1 + 1).unwrap();
        assert_eq!(result, 2);
    }

    #[test]
    fn launch_propagates_configuration_errors() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SPTL_KAPPA", "not-a-number");
        let result = launch(|| ());
        assert!(result.is_err());
        std::env::remove_var("SPTL_KAPPA");
    }
}
