// MIT License - Copyright (c) 2026 Peter Wright
// Dispatch sinks: hand a command descriptor to whatever places the call

pub mod callfile;

use std::sync::Mutex;

use crate::control::DispatchDescriptor;
use crate::error::Result;

pub use callfile::CallFileSink;

/// Receives dispatch descriptors and is responsible for placing the call.
pub trait DispatchSink: Send + Sync {
    fn dispatch(&self, descriptor: &DispatchDescriptor) -> Result<()>;
}

/// Keeps descriptors in memory instead of calling anyone. Used for dry runs
/// and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    dispatched: Mutex<Vec<DispatchDescriptor>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptors received so far, oldest first.
    pub fn dispatched(&self) -> Vec<DispatchDescriptor> {
        self.dispatched
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl DispatchSink for MemorySink {
    fn dispatch(&self, descriptor: &DispatchDescriptor) -> Result<()> {
        let mut dispatched = self
            .dispatched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        dispatched.push(descriptor.clone());
        Ok(())
    }
}
