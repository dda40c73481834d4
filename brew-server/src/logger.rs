//! Logging setup
//!
//! - console: JSON in production, human-readable otherwise
//! - `<log_dir>/app/`: daily rotating application log, pruned after 14 days
//! - `<log_dir>/security/`: `target: "security"` events only, pruned after 90 days

use std::fs;
use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const APP_LOG_RETENTION_DAYS: i64 = 14;
const SECURITY_LOG_RETENTION_DAYS: i64 = 90;
const SECURITY_TARGET: &str = "security";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// File output layer: JSON or plain text, never ANSI-colored
fn file_layer<S>(appender: RollingFileAppender, json: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let writer = std::sync::Mutex::new(appender);
    if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    }
}

fn console_layer<S>(json: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    }
}

/// Initialize logging.
///
/// `RUST_LOG` overrides `level` when set. With `log_dir`, application and
/// security events are also written to daily rotating files.
pub fn init_logger(level: &str, json: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer<_>> = vec![console_layer(json)];

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let app_dir = log_dir.join("app");
        let security_dir = log_dir.join("security");
        fs::create_dir_all(&app_dir)?;
        fs::create_dir_all(&security_dir)?;

        let app = RollingFileAppender::new(Rotation::DAILY, app_dir, "app");
        layers.push(
            file_layer(app, json)
                .with_filter(filter::filter_fn(|meta| meta.target() != SECURITY_TARGET))
                .boxed(),
        );

        let security = RollingFileAppender::new(Rotation::DAILY, security_dir, SECURITY_TARGET);
        layers.push(
            file_layer(security, json)
                .with_filter(filter::filter_fn(|meta| meta.target() == SECURITY_TARGET))
                .boxed(),
        );

        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;
    Ok(())
}

/// Delete application and security logs older than their retention windows
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let app = prune_dir(&log_dir.join("app"), "app", APP_LOG_RETENTION_DAYS)?;
    let security = prune_dir(
        &log_dir.join(SECURITY_TARGET),
        SECURITY_TARGET,
        SECURITY_LOG_RETENTION_DAYS,
    )?;
    Ok(app + security)
}

/// Remove `<prefix>.YYYY-MM-DD` files dated before `today - days`
fn prune_dir(dir: &Path, prefix: &str, days: i64) -> anyhow::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(days);

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // tracing-appender names daily files `<prefix>.YYYY-MM-DD`
        if let Some(date) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }
    Ok(removed)
}

async fn periodic_cleanup(log_dir: PathBuf) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
    loop {
        interval.tick().await;
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Security event helper, routed to the security log file.
///
/// ```no_run
/// # use brew_server::security_log;
/// security_log!(WARN, "webhook_rejected", source = "catalog", reason = "bad signature");
/// security_log!(INFO, "admin_login", username = "ops");
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "WARN",
            $($arg)*
        );
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "ERROR",
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "INFO",
            $($arg)*
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_only_old_app_logs() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();

        let today = chrono::Local::now().date_naive();
        let old = today - chrono::Duration::days(30);
        let old_file = app.join(format!("app.{}", old.format("%Y-%m-%d")));
        let new_file = app.join(format!("app.{}", today.format("%Y-%m-%d")));
        let other = app.join("notes.txt");
        for f in [&old_file, &new_file, &other] {
            fs::write(f, b"x").unwrap();
        }

        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 1);
        assert!(!old_file.exists());
        assert!(new_file.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_cleanup_keeps_security_logs_longer() {
        let dir = tempfile::tempdir().unwrap();
        let security = dir.path().join("security");
        fs::create_dir_all(&security).unwrap();

        let today = chrono::Local::now().date_naive();
        let month_old = security.join(format!(
            "security.{}",
            (today - chrono::Duration::days(30)).format("%Y-%m-%d")
        ));
        let expired = security.join(format!(
            "security.{}",
            (today - chrono::Duration::days(120)).format("%Y-%m-%d")
        ));
        for f in [&month_old, &expired] {
            fs::write(f, b"x").unwrap();
        }

        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 1);
        assert!(month_old.exists());
        assert!(!expired.exists());
    }

    #[test]
    fn test_cleanup_without_app_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 0);
    }
}
