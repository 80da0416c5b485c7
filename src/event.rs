// MIT License - Copyright (c) 2026 Peter Wright
// Decoded alarm events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact ID event qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// 1 - New event or opening
    New,
    /// 3 - New restore or closing
    Restore,
    /// 6 - Previously reported condition still present
    Repeat,
    /// Any other digit, passed through as received
    Other(u8),
}

impl Qualifier {
    pub fn from_digit(d: u8) -> Self {
        match d {
            1 => Self::New,
            3 => Self::Restore,
            6 => Self::Repeat,
            other => Self::Other(other),
        }
    }

    pub fn digit(&self) -> u8 {
        match self {
            Self::New => 1,
            Self::Restore => 3,
            Self::Repeat => 6,
            Self::Other(d) => *d,
        }
    }
}

/// The record's zone/user field, interpreted according to the event code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneOrUser {
    Zone { number: u16, name: Option<String> },
    User { number: u16 },
}

impl ZoneOrUser {
    pub fn zone(&self) -> Option<u16> {
        match self {
            Self::Zone { number, .. } => Some(*number),
            Self::User { .. } => None,
        }
    }

    pub fn zone_name(&self) -> Option<&str> {
        match self {
            Self::Zone { name, .. } => name.as_deref(),
            Self::User { .. } => None,
        }
    }

    pub fn user(&self) -> Option<u16> {
        match self {
            Self::User { number } => Some(*number),
            Self::Zone { .. } => None,
        }
    }
}

/// One decoded panel report.
///
/// Serializes to a flat JSON object with nullable `zone`, `zone_name` and
/// `user` fields. Deserialization rejects objects where both or neither of
/// `zone` and `user` are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "EventRecord", try_from = "EventRecord")]
pub struct AlarmEvent {
    pub uid: String,
    pub timestamp: DateTime<Utc>,
    pub extension: String,
    pub account: u16,
    pub msg_type: u8,
    pub qualifier: Qualifier,
    pub code: u16,
    pub code_description: String,
    pub partition: u8,
    pub zone_or_user: ZoneOrUser,
    /// As transmitted; the panel is trusted.
    pub checksum: u8,
    /// Set by downstream consumers, never by the decoder.
    pub status: Option<String>,
}

impl AlarmEvent {
    pub fn zone(&self) -> Option<u16> {
        self.zone_or_user.zone()
    }

    pub fn zone_name(&self) -> Option<&str> {
        self.zone_or_user.zone_name()
    }

    pub fn user(&self) -> Option<u16> {
        self.zone_or_user.user()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Flat wire form of [`AlarmEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub uid: String,
    pub timestamp: DateTime<Utc>,
    pub extension: String,
    pub account: u16,
    pub msg_type: u8,
    pub qualifier: u8,
    pub code: u16,
    pub code_description: String,
    pub partition: u8,
    pub zone: Option<u16>,
    pub zone_name: Option<String>,
    pub user: Option<u16>,
    pub checksum: u8,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<AlarmEvent> for EventRecord {
    fn from(e: AlarmEvent) -> Self {
        let (zone, zone_name, user) = match e.zone_or_user {
            ZoneOrUser::Zone { number, name } => (Some(number), name, None),
            ZoneOrUser::User { number } => (None, None, Some(number)),
        };
        Self {
            uid: e.uid,
            timestamp: e.timestamp,
            extension: e.extension,
            account: e.account,
            msg_type: e.msg_type,
            qualifier: e.qualifier.digit(),
            code: e.code,
            code_description: e.code_description,
            partition: e.partition,
            zone,
            zone_name,
            user,
            checksum: e.checksum,
            status: e.status,
        }
    }
}

impl TryFrom<EventRecord> for AlarmEvent {
    type Error = String;

    fn try_from(r: EventRecord) -> Result<Self, Self::Error> {
        let zone_or_user = match (r.zone, r.user) {
            (Some(number), None) => ZoneOrUser::Zone { number, name: r.zone_name },
            (None, Some(number)) => ZoneOrUser::User { number },
            (Some(_), Some(_)) => return Err(format!("event {}: both zone and user are set", r.uid)),
            (None, None) => return Err(format!("event {}: neither zone nor user is set", r.uid)),
        };
        Ok(Self {
            uid: r.uid,
            timestamp: r.timestamp,
            extension: r.extension,
            account: r.account,
            msg_type: r.msg_type,
            qualifier: Qualifier::from_digit(r.qualifier),
            code: r.code,
            code_description: r.code_description,
            partition: r.partition,
            zone_or_user,
            checksum: r.checksum,
            status: r.status,
        })
    }
}
