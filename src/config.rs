//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::platform::key_decoder::DEFAULT_ESCAPE_TIMEOUT;
use crate::platform::process_terminal::DEFAULT_DEVICE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// `RAWLINE_DEVICE`
    pub device: PathBuf,
    /// `RAWLINE_ESCAPE_TIMEOUT_MS`
    pub escape_timeout: Duration,
    /// `RAWLINE_WRITE_LOG`
    pub write_log: Option<PathBuf>,
    /// `RAWLINE_LOG`
    pub log_file: Option<PathBuf>,
    /// `RAWLINE_DEBUG`
    pub debug: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            device: env_string_opt("RAWLINE_DEVICE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE)),
            escape_timeout: env_millis("RAWLINE_ESCAPE_TIMEOUT_MS").unwrap_or(DEFAULT_ESCAPE_TIMEOUT),
            write_log: env_string_opt("RAWLINE_WRITE_LOG").map(PathBuf::from),
            log_file: env_string_opt("RAWLINE_LOG").map(PathBuf::from),
            debug: env_flag("RAWLINE_DEBUG"),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            write_log: None,
            log_file: None,
            debug: false,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_millis(key: &str) -> Option<Duration> {
    let value = env_string_opt(key)?;
    match value.trim().parse::<u64>() {
        Ok(millis) => Some(Duration::from_millis(millis)),
        Err(_) => {
            log::warn!("ignoring {key}={value:?}: not a number of milliseconds");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EnvConfig;
    use std::env;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    const KEYS: [&str; 5] = [
        "RAWLINE_DEVICE",
        "RAWLINE_ESCAPE_TIMEOUT_MS",
        "RAWLINE_WRITE_LOG",
        "RAWLINE_LOG",
        "RAWLINE_DEBUG",
    ];

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn clear_all() -> Vec<EnvGuard> {
        KEYS.iter().map(|key| set_env_guard(key, None)).collect()
    }

    #[test]
    fn unset_environment_yields_defaults() {
        let _lock = env_lock();
        let _guards = clear_all();

        let config = EnvConfig::from_env();
        assert_eq!(config, EnvConfig::default());
        assert_eq!(config.device, PathBuf::from("/dev/tty"));
        assert_eq!(config.escape_timeout, Duration::from_millis(50));
    }

    #[test]
    fn every_variable_is_read() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g1 = set_env_guard("RAWLINE_DEVICE", Some("/dev/pts/7"));
        let _g2 = set_env_guard("RAWLINE_ESCAPE_TIMEOUT_MS", Some("120"));
        let _g3 = set_env_guard("RAWLINE_WRITE_LOG", Some("/tmp/writes.log"));
        let _g4 = set_env_guard("RAWLINE_LOG", Some("/tmp/rawline.log"));
        let _g5 = set_env_guard("RAWLINE_DEBUG", Some("1"));

        let config = EnvConfig::from_env();
        assert_eq!(config.device, PathBuf::from("/dev/pts/7"));
        assert_eq!(config.escape_timeout, Duration::from_millis(120));
        assert_eq!(config.write_log, Some(PathBuf::from("/tmp/writes.log")));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/rawline.log")));
        assert!(config.debug);
    }

    #[test]
    fn unparsable_timeout_falls_back_to_default() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g = set_env_guard("RAWLINE_ESCAPE_TIMEOUT_MS", Some("fast"));

        assert_eq!(EnvConfig::from_env().escape_timeout, Duration::from_millis(50));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g1 = set_env_guard("RAWLINE_DEVICE", Some(""));
        let _g2 = set_env_guard("RAWLINE_WRITE_LOG", Some("  "));
        let _g3 = set_env_guard("RAWLINE_DEBUG", Some("yes"));

        let config = EnvConfig::from_env();
        assert_eq!(config.device, PathBuf::from("/dev/tty"));
        assert!(config.write_log.is_none());
        assert!(!config.debug, "only \"1\" enables debug");
    }
}
