// MIT License - Copyright (c) 2026 Peter Wright
// Alarm service: decoder, event store, sensor tracker and controller together

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::control::{Action, Controller};
use crate::dispatch::CallFileSink;
use crate::error::{Result, SimonError};
use crate::event::AlarmEvent;
use crate::protocol::ReportDecoder;
use crate::sensors::{Sensor, SensorChange, SensorTracker};
use crate::spool::ReportSpool;
use crate::store::EventStore;

/// Everything the service announces to subscribers.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    /// A decoded event was added to the store
    EventRecorded(AlarmEvent),
    /// A sensor changed state (trouble event or bypass)
    SensorChanged { change: SensorChange, name: String },
    /// All sensors were reset to closed after a disarm
    SensorsCleared,
    /// A keypad command was handed to the dispatcher
    CommandSent { action: Action },
}

pub type ServiceEventSender = tokio::sync::broadcast::Sender<ServiceEvent>;
pub type ServiceEventReceiver = tokio::sync::broadcast::Receiver<ServiceEvent>;

pub fn event_channel(capacity: usize) -> (ServiceEventSender, ServiceEventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}

/// The public API of the receiver.
///
/// Store and tracker each sit behind an async mutex so that ingestion and
/// commands arriving concurrently are applied one at a time. When both are
/// needed, the store lock is taken first.
pub struct AlarmService {
    decoder: ReportDecoder,
    store: Arc<Mutex<EventStore>>,
    tracker: Arc<Mutex<SensorTracker>>,
    controller: Arc<Controller>,
    spool: Option<ReportSpool>,
    event_tx: ServiceEventSender,
}

impl AlarmService {
    pub fn new(decoder: ReportDecoder, tracker: SensorTracker, controller: Controller) -> Self {
        let (event_tx, _event_rx) = event_channel(256);
        Self {
            decoder,
            store: Arc::new(Mutex::new(EventStore::new())),
            tracker: Arc::new(Mutex::new(tracker)),
            controller: Arc::new(controller),
            spool: None,
            event_tx,
        }
    }

    /// Attach an inbound report directory for [`Self::process_spool`].
    pub fn with_spool(mut self, spool: ReportSpool) -> Self {
        self.spool = Some(spool);
        self
    }

    /// Wire up the service from a configuration file: call-file dispatch,
    /// spool directory and the configured zones.
    pub fn from_config(config: &Config) -> Result<Self> {
        let codes = Arc::new(config.code_table()?);
        let zone_names = Arc::new(config.zones.clone());
        let decoder = ReportDecoder::new(Arc::clone(&codes), Arc::clone(&zone_names));
        let tracker = SensorTracker::from_zone_names(codes, &zone_names);

        let sink = Arc::new(CallFileSink::new(&config.control.spool_dir));
        let controller = Controller::new(
            &config.control.access_code,
            &config.control.extension,
            config.control.retry_policy(),
            sink,
        )?
        .with_archive(config.control.archive);

        let spool = ReportSpool::new(
            &config.events.src_dir,
            &config.events.dst_dir,
            config.events.move_files,
        )?;

        Ok(Self::new(decoder, tracker, controller).with_spool(spool))
    }

    /// Subscribe to service events.
    pub fn subscribe(&self) -> ServiceEventReceiver {
        self.event_tx.subscribe()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    // --- Inbound ---

    /// Decode a report and record its event.
    ///
    /// Returns `Ok(None)` for a report without an event record. A report whose
    /// uid is already known fails with [`SimonError::DuplicateUid`] and leaves
    /// sensor state untouched.
    pub async fn ingest(&self, raw: &str, report_id: &str) -> Result<Option<AlarmEvent>> {
        let Some(event) = self.decoder.decode(raw, report_id)? else {
            return Ok(None);
        };

        let mut store = self.store.lock().await;
        store.add(event.clone())?;
        info!(
            "Event {}: {:03} {} ({:?})",
            event.uid, event.code, event.code_description, event.qualifier
        );

        let change = self.tracker.lock().await.apply_event(&event);
        drop(store);

        let _ = self.event_tx.send(ServiceEvent::EventRecorded(event.clone()));
        if let Some(change) = change {
            self.announce_change(change).await;
        }
        Ok(Some(event))
    }

    /// Ingest every pending report in the spool directory.
    ///
    /// Reports are moved out of the spool once handled, including reports
    /// that could not be decoded and duplicates. Reports that hit an I/O
    /// error are left for the next pass.
    pub async fn process_spool(&self) -> Result<Vec<AlarmEvent>> {
        let Some(spool) = &self.spool else {
            return Ok(Vec::new());
        };

        let mut recorded = Vec::new();
        for path in spool.pending().await? {
            let report = match spool.read(&path).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };
            match self.ingest(&report.text, &report.report_id).await {
                Ok(Some(event)) => recorded.push(event),
                Ok(None) => {}
                Err(e @ SimonError::DuplicateUid { .. }) => warn!("{}: {e}", path.display()),
                Err(e) if e.is_decode_error() => warn!("Failed to decode {}: {e}", path.display()),
                Err(e) => {
                    warn!("Leaving {} for retry: {e}", path.display());
                    continue;
                }
            }
            if let Err(e) = spool.finish(&path).await {
                warn!("Failed to move {}: {e}", path.display());
            }
        }
        if !recorded.is_empty() {
            debug!("Recorded {} events from spool", recorded.len());
        }
        Ok(recorded)
    }

    // --- Events ---

    /// All stored events, oldest first.
    pub async fn events(&self) -> Vec<AlarmEvent> {
        self.store.lock().await.list().into_iter().cloned().collect()
    }

    pub async fn event(&self, uid: &str) -> Result<AlarmEvent> {
        self.store.lock().await.get(uid).cloned()
    }

    pub async fn delete_event(&self, uid: &str) -> Result<AlarmEvent> {
        self.store.lock().await.delete(uid)
    }

    pub async fn set_status(&self, uid: &str, status: Option<String>) -> Result<()> {
        self.store.lock().await.set_status(uid, status)
    }

    // --- Sensors ---

    /// Snapshot of every sensor, in zone order.
    pub async fn sensors(&self) -> Vec<Sensor> {
        self.tracker.lock().await.sensors().cloned().collect()
    }

    pub async fn sensor(&self, number: u32) -> Result<Sensor> {
        self.tracker.lock().await.by_number(number).cloned()
    }

    /// Bypass a sensor.
    pub async fn bypass(&self, number: u32) -> Result<Option<SensorChange>> {
        let change = self.tracker.lock().await.bypass(number)?;
        if let Some(change) = change {
            self.announce_change(change).await;
        }
        Ok(change)
    }

    async fn announce_change(&self, change: SensorChange) {
        let name = self
            .tracker
            .lock()
            .await
            .by_number(change.number)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let _ = self.event_tx.send(ServiceEvent::SensorChanged { change, name });
    }

    // --- Commands ---

    /// Send a named keypad action. A successful disarm also resets every
    /// sensor to closed.
    ///
    /// For a disarm the tracker stays locked from dispatch until the reset,
    /// so a trouble event ingested meanwhile is applied after it.
    pub async fn send_command(&self, action: &str) -> Result<Action> {
        let action: Action = action.parse()?;
        let mut tracker = match action {
            Action::Disarm => Some(self.tracker.lock().await),
            _ => None,
        };

        // Call-file dispatch is blocking file I/O
        let controller = Arc::clone(&self.controller);
        tokio::task::spawn_blocking(move || controller.send_command(action.name()))
            .await
            .map_err(|e| SimonError::Io(std::io::Error::other(e.to_string())))??;
        let _ = self.event_tx.send(ServiceEvent::CommandSent { action });

        if let Some(tracker) = tracker.as_mut() {
            tracker.clear_all();
            let _ = self.event_tx.send(ServiceEvent::SensorsCleared);
        }
        Ok(action)
    }

    pub async fn disarm(&self) -> Result<Action> {
        self.send_command(Action::Disarm.name()).await
    }

    pub async fn arm_home(&self) -> Result<Action> {
        self.send_command("arm_home").await
    }

    pub async fn arm_away(&self) -> Result<Action> {
        self.send_command("arm_away").await
    }
}
