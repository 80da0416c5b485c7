// MIT License - Copyright (c) 2026 Peter Wright
// In-memory event store

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, SimonError};
use crate::event::AlarmEvent;

#[derive(Debug, Clone)]
struct StoredEvent {
    seq: u64,
    event: AlarmEvent,
}

/// Decoded events keyed by uid.
///
/// Insertion is reject-on-duplicate, never upsert, and a uid stays taken
/// after its event is deleted. Listing is ordered by timestamp, with
/// insertion order breaking ties.
#[derive(Debug, Default)]
pub struct EventStore {
    events: HashMap<String, StoredEvent>,
    /// Uids of deleted events. Grows by one per delete and is never pruned;
    /// it only starts over when the store is rebuilt (config reload on SIGHUP).
    retired: HashSet<String>,
    next_seq: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: AlarmEvent) -> Result<()> {
        if self.events.contains_key(&event.uid) || self.retired.contains(&event.uid) {
            return Err(SimonError::DuplicateUid { uid: event.uid });
        }
        debug!("Adding event {}", event.uid);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.insert(event.uid.clone(), StoredEvent { seq, event });
        Ok(())
    }

    pub fn get(&self, uid: &str) -> Result<&AlarmEvent> {
        self.events
            .get(uid)
            .map(|s| &s.event)
            .ok_or_else(|| SimonError::EventNotFound { uid: uid.to_string() })
    }

    /// Remove an event, returning it.
    pub fn delete(&mut self, uid: &str) -> Result<AlarmEvent> {
        let stored = self
            .events
            .remove(uid)
            .ok_or_else(|| SimonError::EventNotFound { uid: uid.to_string() })?;
        debug!("Deleted event {uid}");
        self.retired.insert(uid.to_string());
        Ok(stored.event)
    }

    /// Attach a downstream status annotation to an event.
    pub fn set_status(&mut self, uid: &str, status: Option<String>) -> Result<()> {
        let stored = self
            .events
            .get_mut(uid)
            .ok_or_else(|| SimonError::EventNotFound { uid: uid.to_string() })?;
        stored.event.status = status;
        Ok(())
    }

    /// All events, oldest first.
    pub fn list(&self) -> Vec<&AlarmEvent> {
        let mut stored: Vec<&StoredEvent> = self.events.values().collect();
        stored.sort_by_key(|s| (s.event.timestamp, s.seq));
        stored.into_iter().map(|s| &s.event).collect()
    }

    /// The ordered event list as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.list())?)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
