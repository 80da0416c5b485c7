// MIT License - Copyright (c) 2026 Peter Wright
// Asterisk call file spooler

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, info};

use crate::control::DispatchDescriptor;
use crate::dispatch::DispatchSink;
use crate::error::Result;

/// Default Asterisk outgoing spool directory.
pub const DEFAULT_SPOOL_DIR: &str = "/var/spool/asterisk/outgoing";

/// Dialplan application that plays the tones once the panel answers.
pub const SEND_DTMF_APP: &str = "SendDTMF";

/// Render a descriptor in Asterisk call file format.
///
/// ```text
/// Channel: SIP/simonxt
/// WaitTime: 65
/// RetryTime: 10
/// MaxRetries: 2
/// Application: SendDTMF
/// Data: ww1234w1w9
/// Archive: yes
/// ```
pub fn render_call_file(descriptor: &DispatchDescriptor) -> String {
    format!(
        "Channel: {}\nWaitTime: {}\nRetryTime: {}\nMaxRetries: {}\nApplication: {}\nData: {}\nArchive: {}\n",
        descriptor.channel,
        descriptor.wait_time_secs,
        descriptor.retry_time_secs,
        descriptor.max_retries,
        SEND_DTMF_APP,
        descriptor.tones,
        if descriptor.archive { "yes" } else { "no" },
    )
}

/// Writes one call file per descriptor into the Asterisk spool directory.
///
/// Files are written under a dot-prefixed name and renamed into place, so
/// Asterisk never picks up a partially written file. The process must run
/// as a user Asterisk can read the files as.
#[derive(Debug)]
pub struct CallFileSink {
    spool_dir: PathBuf,
    counter: AtomicU64,
}

impl CallFileSink {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    fn next_name(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("simon-says-{}-{n}.call", Utc::now().timestamp_millis())
    }
}

impl DispatchSink for CallFileSink {
    fn dispatch(&self, descriptor: &DispatchDescriptor) -> Result<()> {
        let name = self.next_name();
        let staging = self.spool_dir.join(format!(".{name}"));
        let target = self.spool_dir.join(&name);

        debug!("Writing call file {}", staging.display());
        let mut file = fs::File::create(&staging)?;
        file.write_all(render_call_file(descriptor).as_bytes())?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        info!("Spooled call file {}", target.display());
        Ok(())
    }
}
