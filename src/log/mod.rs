//! The `log` module configures `wardsim`'s diagnostic logging. This is not to be confused with
//! the news queue (what the simulated hospital announces) or with _reports_ (CSV output of a run).
//!
//! The five logging macros `error!`, `warn!`, `info!`, `debug!` and `trace!` are re-exported
//! here, `error!` being the highest priority and `trace!` the lowest:
//!
//! ```rust
//! use wardsim::log::info;
//!
//! pub fn open_ward() {
//!     info!("ward opened");
//! }
//! ```
//!
//! Logging is _disabled_ by default. The runner enables it with `--log-level <level>`; code can
//! use `enable_logging()`, `disable_logging()` and `set_log_level(level)`. Per-module filtering
//! is done with `set_module_filter()` / `set_module_filters()` and `remove_module_filter()`:
//!
//! ```rust
//! use wardsim::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! pub fn setup_logging() {
//!     set_log_level(LevelFilter::Info);
//!     // Per-tick chatter from the announcer only.
//!     set_module_filter("wardsim::announcer", LevelFilter::Trace);
//! }
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::collections::hash_map::Entry;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard};

pub use log::{debug, error, info, trace, warn, LevelFilter};

use crate::error::SimError;
use crate::HashMap;

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// A level filter for every log target that starts with `module` (e.g. `"wardsim::news"`).
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    module: String,
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Tracks the global level and the per-module levels, and owns the handle to the installed
/// logger. Loggers are process-global, so there is exactly one of these, behind a mutex; the
/// public free functions lock it and forward.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// Level for targets without a module filter. `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    pub(in crate::log) module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(feature = "logging")]
    root_handle: Option<log4rs::Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::default(),

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns true if the configuration changed.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().level == level {
                    return false;
                }
                entry.get_mut().level = level;
            }
            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    fn set_module_filters(&mut self, module_filters: &[(&str, LevelFilter)]) {
        let mut mutated = false;
        for (module, level) in module_filters {
            mutated |= self.insert_module_filter(module, *level);
        }
        if mutated {
            self.set_config();
        }
    }

    fn remove_module_filter(&mut self, module: &str) {
        if self.module_configurations.remove(module).is_some() {
            self.set_config();
        }
    }
}

/// Enables all log messages. Equivalent to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Parses `level` (`"off"`, `"error"`, ..., `"trace"`, case-insensitive) and applies it.
///
/// # Errors
///
/// Returns `SimError::InvalidParameter` if `level` is not a level name.
pub fn set_log_level_from_str(level: &str) -> Result<(), SimError> {
    let level = LevelFilter::from_str(level)
        .map_err(|_| SimError::InvalidParameter(format!("unknown log level {level:?}")))?;
    set_log_level(level);
    Ok(())
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    get_log_configuration().set_module_filters(&[(module_path, level_filter)]);
}

/// Sets the level filters for a set of modules in one reconfiguration.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    get_log_configuration().set_module_filters(module_filters);
}

/// Removes a module-specific filter so the global level applies to it again.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    // A panic while holding the lock leaves the configuration itself intact.
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Logging configuration is global; run these tests one at a time.
    static TEST_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(Mutex::default);

    #[test]
    fn test_set_log_level() {
        let _guard = TEST_MUTEX.lock().unwrap();
        set_log_level(LevelFilter::Error);
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Error);
        error!("test_set_log_level: global set to error");
        trace!("test_set_log_level: NOT EMITTED");

        set_log_level(LevelFilter::Trace);
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Trace);
        disable_logging();
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Off);
    }

    #[test]
    fn test_set_log_level_from_str() {
        let _guard = TEST_MUTEX.lock().unwrap();
        set_log_level_from_str("warn").unwrap();
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Warn);
        assert!(matches!(
            set_log_level_from_str("loud"),
            Err(SimError::InvalidParameter(_))
        ));
        // A bad level leaves the previous one in place.
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Warn);
        disable_logging();
    }

    #[test]
    fn test_set_remove_module_filters() {
        let _guard = TEST_MUTEX.lock().unwrap();
        set_log_level(LevelFilter::Info);
        set_module_filters(&[
            ("wardsim::announcer", LevelFilter::Trace),
            ("wardsim::news", LevelFilter::Off),
        ]);
        {
            let config = get_log_configuration();
            assert_eq!(
                config.module_configurations.get("wardsim::announcer"),
                Some(&("wardsim::announcer", LevelFilter::Trace).into())
            );
            assert_eq!(
                config.module_configurations.get("wardsim::news"),
                Some(&("wardsim::news", LevelFilter::Off).into())
            );
        }

        remove_module_filter("wardsim::news");
        {
            let config = get_log_configuration();
            assert!(!config.module_configurations.contains_key("wardsim::news"));
            assert!(config.module_configurations.contains_key("wardsim::announcer"));
        }
        remove_module_filter("wardsim::announcer");
        disable_logging();
    }
}
