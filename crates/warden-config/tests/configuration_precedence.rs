//! Layering tests for defaults, configuration files, environment, and CLI.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use warden_config::{Config, LogFormat, OutputEncoding};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialises environment mutation and restores the previous values on drop.
struct EnvGuard {
    previous: Vec<(&'static str, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn new() -> Self {
        let lock = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self {
            previous: Vec::new(),
            _lock: lock,
        }
    }

    fn set(&mut self, key: &'static str, value: &OsStr) {
        self.previous.push((key, std::env::var_os(key)));
        // Environment mutation is `unsafe` under edition 2024; the guard holds
        // the process-wide mutex so no other test observes the change.
        unsafe { std::env::set_var(key, value) };
    }

    fn clear(&mut self, key: &'static str) {
        self.previous.push((key, std::env::var_os(key)));
        unsafe { std::env::remove_var(key) };
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..).rev() {
            match value {
                Some(previous) => unsafe { std::env::set_var(key, previous) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn env() -> EnvGuard {
    let mut guard = EnvGuard::new();
    guard.clear("WARDEN_LOG_FILTER");
    guard.clear("WARDEN_LOG_FORMAT");
    guard.clear("WARDEN_SLOW_COMMAND_LOG_THRESHOLD_SECONDS");
    guard.clear("WARDEN_OUTPUT_ENCODING");
    guard.clear("WARDEN_CONFIG_PATH");
    guard
}

fn write_config(dir: &Path, contents: &str) -> OsString {
    let path = dir.join("warden.toml");
    fs::write(&path, contents).expect("write configuration file");
    path.into_os_string()
}

fn load(args: &[&OsStr]) -> Config {
    let mut argv = vec![OsString::from("wardend")];
    argv.extend(args.iter().map(|arg| arg.to_os_string()));
    Config::load_from_iter(argv).expect("configuration should load")
}

#[rstest]
fn defaults_apply_without_overrides(env: EnvGuard) {
    let config = load(&[]);
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.slow_command_log_threshold(), Duration::from_secs(1));
    drop(env);
}

#[rstest]
fn file_overrides_defaults(env: EnvGuard) {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        dir.path(),
        "slow_command_log_threshold_seconds = 2.5\noutput_encoding = \"pretty_json\"\n",
    );

    let config = load(&[OsStr::new("--config-path"), path.as_os_str()]);
    assert_eq!(
        config.slow_command_log_threshold(),
        Duration::from_millis(2500)
    );
    assert_eq!(config.output_encoding(), OutputEncoding::PrettyJson);
    drop(env);
}

#[rstest]
fn environment_overrides_file(mut env: EnvGuard) {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(dir.path(), "slow_command_log_threshold_seconds = 2.5\n");
    env.set(
        "WARDEN_SLOW_COMMAND_LOG_THRESHOLD_SECONDS",
        OsStr::new("0.5"),
    );

    let config = load(&[OsStr::new("--config-path"), path.as_os_str()]);
    assert_eq!(
        config.slow_command_log_threshold(),
        Duration::from_millis(500)
    );
}

#[rstest]
fn cli_overrides_environment(mut env: EnvGuard) {
    env.set("WARDEN_LOG_FILTER", OsStr::new("warn"));

    let config = load(&[OsStr::new("--log-filter"), OsStr::new("debug")]);
    assert_eq!(config.log_filter(), "debug");
}
