// MIT License - Copyright (c) 2026 Peter Wright
// Simon XT alarm receiver and controller
//
//! # simon-says
//!
//! Receives Ademco Contact ID reports from a GE/Interlogix Simon XT panel
//! (delivered by Asterisk's AlarmReceiver as `event-*` files), keeps the
//! decoded events and per-zone sensor state in memory, and controls the
//! panel by calling it and playing keypad DTMF tones through an Asterisk
//! call file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use simon_says::{AlarmService, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml")?;
//!     let service = AlarmService::from_config(&config)?;
//!
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     for event in service.process_spool().await? {
//!         println!("{}", event.to_json()?);
//!     }
//!     service.arm_away().await?;
//!     Ok(())
//! }
//! ```

pub mod codes;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod protocol;
pub mod sensors;
pub mod service;
pub mod spool;
pub mod store;

// Re-exports for convenience
pub use codes::{CodeCategory, CodeEntry, CodeTable, FieldKind};
pub use config::Config;
pub use control::{Action, Controller, DispatchDescriptor, RetryPolicy, encode};
pub use dispatch::{CallFileSink, DispatchSink, MemorySink};
pub use error::{Result, SimonError};
pub use event::{AlarmEvent, Qualifier, ZoneOrUser};
pub use protocol::ReportDecoder;
pub use sensors::{Sensor, SensorChange, SensorState, SensorTracker};
pub use service::{AlarmService, ServiceEvent, ServiceEventReceiver};
pub use spool::{ReportSpool, report_id_from_filename};
pub use store::EventStore;
