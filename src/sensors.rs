// MIT License - Copyright (c) 2026 Peter Wright
// Sensor (zone) state tracking

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codes::{CodeCategory, CodeTable};
use crate::error::{Result, SimonError};
use crate::event::{AlarmEvent, Qualifier};

/// Sensor state.
///
/// `Bypassed` is only ever set from outside ([`SensorTracker::bypass`]),
/// and only from `Closed`. Events can only open a sensor, and only
/// [`SensorTracker::clear_all`] closes one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorState {
    Open,
    #[default]
    Closed,
    Bypassed,
}

impl SensorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Bypassed => "bypassed",
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alarm sensor. These are "zones" in Contact ID terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sensor {
    pub number: u32,
    pub name: String,
    pub state: SensorState,
}

impl Sensor {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            state: SensorState::Closed,
        }
    }

    pub fn is_open(&self) -> bool { self.state == SensorState::Open }
    pub fn is_closed(&self) -> bool { self.state == SensorState::Closed }
    pub fn is_bypassed(&self) -> bool { self.state == SensorState::Bypassed }
}

/// A state transition caused by an event or a bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorChange {
    pub number: u32,
    pub from: SensorState,
    pub to: SensorState,
}

/// The set of configured sensors and their current state.
///
/// Sensors are created once from configuration and never removed.
#[derive(Debug, Clone)]
pub struct SensorTracker {
    codes: Arc<CodeTable>,
    sensors: BTreeMap<u32, Sensor>,
}

impl SensorTracker {
    pub fn new(codes: Arc<CodeTable>) -> Self {
        Self {
            codes,
            sensors: BTreeMap::new(),
        }
    }

    /// Build a tracker with one closed sensor per configured zone name.
    pub fn from_zone_names(codes: Arc<CodeTable>, zone_names: &HashMap<u32, String>) -> Self {
        let mut tracker = Self::new(codes);
        for (&number, name) in zone_names {
            tracker.sensors.insert(number, Sensor::new(number, name.clone()));
        }
        debug!("Loaded {} sensors", tracker.sensors.len());
        tracker
    }

    pub fn add_sensor(&mut self, number: u32, name: impl Into<String>) -> Result<()> {
        if self.sensors.contains_key(&number) {
            return Err(SimonError::DuplicateSensor { number });
        }
        self.sensors.insert(number, Sensor::new(number, name));
        Ok(())
    }

    pub fn by_number(&self, number: u32) -> Result<&Sensor> {
        self.sensors
            .get(&number)
            .ok_or(SimonError::SensorNotFound { number })
    }

    /// All sensors, in zone order.
    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.values()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Mark a closed sensor as bypassed. Stays bypassed until
    /// [`Self::clear_all`] or a trouble event opens it.
    ///
    /// An open sensor can't be bypassed ([`SimonError::InvalidTransition`]);
    /// bypassing an already bypassed sensor is a no-op.
    pub fn bypass(&mut self, number: u32) -> Result<Option<SensorChange>> {
        let sensor = self
            .sensors
            .get_mut(&number)
            .ok_or(SimonError::SensorNotFound { number })?;
        if sensor.is_open() {
            return Err(SimonError::InvalidTransition { number, from: sensor.state });
        }
        Ok(transition(sensor, SensorState::Bypassed))
    }

    /// Set every sensor back to closed. This is the side effect of a disarm.
    pub fn clear_all(&mut self) {
        debug!("Clearing all sensors");
        for sensor in self.sensors.values_mut() {
            sensor.state = SensorState::Closed;
        }
    }

    /// Update sensor state from a decoded event.
    ///
    /// Only new (or still-present) trouble-class events for a configured
    /// zone open a sensor; everything else leaves state untouched.
    pub fn apply_event(&mut self, event: &AlarmEvent) -> Option<SensorChange> {
        let zone = event.zone()?;
        let category = self.codes.lookup(event.code)?.category;
        if category != CodeCategory::Troubles {
            return None;
        }
        if !matches!(event.qualifier, Qualifier::New | Qualifier::Repeat) {
            debug!("Event {}: restore for zone {zone} leaves sensor state as is", event.uid);
            return None;
        }
        let Some(sensor) = self.sensors.get_mut(&u32::from(zone)) else {
            warn!("Event {}: zone {zone} has no configured sensor", event.uid);
            return None;
        };
        let change = transition(sensor, SensorState::Open)?;
        info!(
            "Sensor {} ({}) {} -> {} on code {:03}",
            change.number, sensor.name, change.from, change.to, event.code
        );
        Some(change)
    }
}

fn transition(sensor: &mut Sensor, to: SensorState) -> Option<SensorChange> {
    if sensor.state == to {
        return None;
    }
    let from = sensor.state;
    sensor.state = to;
    Some(SensorChange { number: sensor.number, from, to })
}
