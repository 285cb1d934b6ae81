use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Root of the application's home directory, `~/.household-charts/`.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".household-charts")
}

/// Ensure the standard `~/.household-charts/` directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `~/.household-charts/`
/// - `~/.household-charts/logs/`
pub fn ensure_directories() -> anyhow::Result<()> {
    let root = app_dir();
    std::fs::create_dir_all(&root)?;
    std::fs::create_dir_all(root.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name onto a `tracing` filter directive.
fn level_directive(log_level: &str) -> String {
    let upper = log_level.to_uppercase();
    match upper.as_str() {
        "DEBUG" | "CRITICAL" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output always goes to stderr so JSON on stdout stays clean. When
/// `log_file` is given, the same events are appended to that file without
/// ANSI colours. Unrecognised levels fall back to `"info"`.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Data-dir discovery ─────────────────────────────────────────────────────────

/// Locate the directory holding the CSV datasets.
///
/// Checks the following paths in order and returns the first directory that
/// exists:
/// 1. `./data`
/// 2. `~/.household-charts/data`
///
/// Returns `None` when neither path exists.
pub fn discover_data_dir() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_data_dir_in(&cwd, &app_dir())
}

fn discover_data_dir_in(cwd: &Path, app_dir: &Path) -> Option<PathBuf> {
    let candidates = [cwd.join("data"), app_dir.join("data")];
    candidates.into_iter().find(|p| p.is_dir())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        // Override HOME so that dirs::home_dir() resolves to our temp dir.
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let result = ensure_directories();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        result.expect("ensure_directories should succeed");

        let root = tmp.path().join(".household-charts");
        assert!(root.is_dir(), ".household-charts dir must exist");
        assert!(root.join("logs").is_dir(), "logs subdir must exist");
    }

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("critical"), "debug");
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("Trace"), "trace");
    }

    #[test]
    fn test_discover_prefers_working_directory() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(cwd.path().join("data")).unwrap();
        std::fs::create_dir_all(home.path().join("data")).unwrap();

        assert_eq!(
            discover_data_dir_in(cwd.path(), home.path()),
            Some(cwd.path().join("data"))
        );
    }

    #[test]
    fn test_discover_falls_back_to_app_dir() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(home.path().join("data")).unwrap();

        assert_eq!(
            discover_data_dir_in(cwd.path(), home.path()),
            Some(home.path().join("data"))
        );
    }

    #[test]
    fn test_discover_ignores_plain_files() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        std::fs::write(cwd.path().join("data"), "not a dir").unwrap();

        assert_eq!(discover_data_dir_in(cwd.path(), home.path()), None);
    }
}
