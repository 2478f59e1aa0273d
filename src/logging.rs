use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use tracing_subscriber::EnvFilter;

use crate::config::GeneralConfig;
use crate::error::ErrorLogError;

pub fn init_tracing(config: &GeneralConfig) {
    let filter = EnvFilter::new(&config.log_level);
    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

/// Sink for full failure detail of requests that could not be served.
pub trait ErrorLog: Send + Sync {
    /// Record `detail` (typically a report's `{:?}` rendering) under `context`.
    fn record<'a>(&'a self, context: &'a str, detail: &'a str) -> BoxFuture<'a, ()>;
}

/// Appends timestamped entries to a file, one entry per failure.
///
/// Writes run on tokio's blocking pool, never on an async worker.
pub struct FileErrorLog {
    file: Arc<Mutex<File>>,
}

impl FileErrorLog {
    pub fn open(path: &Path) -> Result<Self, Report<ErrorLogError>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .change_context(ErrorLogError::Open)
            .attach_with(|| format!("path: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

/// One whole entry per lock, so concurrent writers never interleave.
fn append(file: &Mutex<File>, entry: &str) -> Result<(), Report<ErrorLogError>> {
    let mut file = file
        .lock()
        .map_err(|_| Report::new(ErrorLogError::Write).attach("error log mutex poisoned"))?;
    file.write_all(entry.as_bytes())
        .and_then(|()| file.flush())
        .change_context(ErrorLogError::Write)
}

impl ErrorLog for FileErrorLog {
    fn record<'a>(&'a self, context: &'a str, detail: &'a str) -> BoxFuture<'a, ()> {
        let entry = format_entry(context, detail);
        let file = Arc::clone(&self.file);
        Box::pin(async move {
            let written = tokio::task::spawn_blocking(move || append(&file, &entry))
                .await
                .change_context(ErrorLogError::Write)
                .and_then(|result| result);
            if let Err(e) = written {
                tracing::warn!(error = ?e, "failed to append to error log");
            }
        })
    }
}

fn format_entry(context: &str, detail: &str) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("{timestamp} - ERROR - {context}\n{detail}\n")
}

/// Keeps entries in memory; used by handler tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryErrorLog {
    entries: Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MemoryErrorLog {
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ErrorLog for MemoryErrorLog {
    fn record<'a>(&'a self, context: &'a str, detail: &'a str) -> BoxFuture<'a, ()> {
        self.entries
            .lock()
            .unwrap()
            .push((context.to_owned(), detail.to_owned()));
        Box::pin(futures::future::ready(()))
    }
}
