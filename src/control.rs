// MIT License - Copyright (c) 2026 Peter Wright
// Keypad command encoding for the Simon XT phone interface

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::dispatch::DispatchSink;
use crate::error::{Result, SimonError};

/// DTMF pause marker (half a second). The panel drops keypresses that
/// arrive without it.
pub const PAUSE: &str = "w";

/// How long to wait for the panel to answer. It rings 10 times first,
/// which is roughly a minute.
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(65);
pub const DEFAULT_RETRY_TIME: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Actions the panel accepts over the phone, with their keypad digits.
///
/// See the Simon XT user manual (466-2266) for the phone command menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Disarm,
    ArmDoorsAndWindows,
    ArmMotionSensors,
    ArmDoorsAndWindowsNoDelay,
    ArmMotionSensorsWithLatchkey,
    ArmDoorsAndWindowsAndMotionSensors,
    ArmDoorsAndWindowsNoEntryDelayAndMotionSensorsWithLatchkey,
    /// Hang up. Appended to every sequence.
    Terminate,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Disarm,
        Action::ArmDoorsAndWindows,
        Action::ArmMotionSensors,
        Action::ArmDoorsAndWindowsNoDelay,
        Action::ArmMotionSensorsWithLatchkey,
        Action::ArmDoorsAndWindowsAndMotionSensors,
        Action::ArmDoorsAndWindowsNoEntryDelayAndMotionSensorsWithLatchkey,
        Action::Terminate,
    ];

    /// Alias for arming while at home.
    pub const ARM_HOME: Action = Action::ArmDoorsAndWindowsNoDelay;
    /// Alias for arming when leaving.
    pub const ARM_AWAY: Action = Action::ArmDoorsAndWindowsAndMotionSensors;

    pub fn name(&self) -> &'static str {
        match self {
            Self::Disarm => "disarm",
            Self::ArmDoorsAndWindows => "arm_doors_and_windows",
            Self::ArmMotionSensors => "arm_motion_sensors",
            Self::ArmDoorsAndWindowsNoDelay => "arm_doors_and_windows_no_delay",
            Self::ArmMotionSensorsWithLatchkey => "arm_motion_sensors_with_latchkey",
            Self::ArmDoorsAndWindowsAndMotionSensors => "arm_doors_and_windows_and_motion_sensors",
            Self::ArmDoorsAndWindowsNoEntryDelayAndMotionSensorsWithLatchkey => {
                "arm_doors_and_windows_with_no_entry_delay_and_motion_sensors_with_latchkey"
            }
            Self::Terminate => "terminate",
        }
    }

    /// Keypad digits for this action, one entry per keypress.
    pub fn digits(&self) -> &'static [&'static str] {
        match self {
            Self::Disarm => &["1"],
            Self::ArmDoorsAndWindows => &["2"],
            Self::ArmMotionSensors => &["3"],
            Self::ArmDoorsAndWindowsNoDelay => &["2", "2"],
            Self::ArmMotionSensorsWithLatchkey => &["3", "3"],
            Self::ArmDoorsAndWindowsAndMotionSensors => &["2", "3"],
            Self::ArmDoorsAndWindowsNoEntryDelayAndMotionSensorsWithLatchkey => &["2", "2", "3", "3"],
            Self::Terminate => &["9"],
        }
    }
}

impl FromStr for Action {
    type Err = SimonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "arm_home" => return Ok(Self::ARM_HOME),
            "arm_away" => return Ok(Self::ARM_AWAY),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| SimonError::InvalidAction { action: s.to_string() })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn validate_access_code(access_code: &str) -> Result<()> {
    if access_code.is_empty()
        || access_code.len() > 8
        || !access_code.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(SimonError::InvalidAccessCode);
    }
    Ok(())
}

/// Build the DTMF string for an action.
///
/// Layout: pause, access code, action digits, terminate digit, with a
/// pause between every token. e.g. `disarm` with code `1234` → `ww1234w1w9`
pub fn encode_action(action: Action, access_code: &str) -> Result<String> {
    validate_access_code(access_code)?;
    let mut sections: Vec<&str> = vec![PAUSE, access_code];
    sections.extend_from_slice(action.digits());
    sections.extend_from_slice(Action::Terminate.digits());
    Ok(sections.join(PAUSE))
}

/// Build the DTMF string for a named action (aliases included).
pub fn encode(action: &str, access_code: &str) -> Result<String> {
    let action: Action = action.parse()?;
    encode_action(action, access_code)
}

/// Retry behaviour requested from the telephony dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// How long to wait for the call to be answered.
    pub wait_time: Duration,
    /// Delay between attempts.
    pub retry_time: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            wait_time: DEFAULT_WAIT_TIME,
            retry_time: DEFAULT_RETRY_TIME,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Everything a dispatcher needs to place the call and play the tones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchDescriptor {
    /// Target line, e.g. `SIP/simonxt`.
    pub channel: String,
    pub tones: String,
    pub wait_time_secs: u64,
    pub retry_time_secs: u64,
    pub max_retries: u32,
    /// Keep the call file after completion.
    pub archive: bool,
}

/// Target line identifier for a SIP extension.
pub fn sip_channel(extension: &str) -> String {
    format!("SIP/{extension}")
}

/// Package an action into a dispatch descriptor. Performs no I/O.
pub fn build_dispatch(
    action: &str,
    access_code: &str,
    extension: &str,
    policy: RetryPolicy,
) -> Result<DispatchDescriptor> {
    let tones = encode(action, access_code)?;
    Ok(DispatchDescriptor {
        channel: sip_channel(extension),
        tones,
        wait_time_secs: policy.wait_time.as_secs(),
        retry_time_secs: policy.retry_time.as_secs(),
        max_retries: policy.max_retries,
        archive: true,
    })
}

/// Sends keypad commands to the panel through a [`DispatchSink`].
pub struct Controller {
    access_code: String,
    extension: String,
    policy: RetryPolicy,
    archive: bool,
    sink: Arc<dyn DispatchSink>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("extension", &self.extension)
            .field("policy", &self.policy)
            .field("archive", &self.archive)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        access_code: impl Into<String>,
        extension: impl Into<String>,
        policy: RetryPolicy,
        sink: Arc<dyn DispatchSink>,
    ) -> Result<Self> {
        let access_code = access_code.into();
        validate_access_code(&access_code)?;
        Ok(Self {
            access_code,
            extension: extension.into(),
            policy,
            archive: true,
            sink,
        })
    }

    /// Whether dispatched call files are archived after completion (default: true).
    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Build the descriptor for an action without sending it.
    pub fn descriptor(&self, action: &str) -> Result<DispatchDescriptor> {
        let mut descriptor = build_dispatch(action, &self.access_code, &self.extension, self.policy)?;
        descriptor.archive = self.archive;
        Ok(descriptor)
    }

    /// Send a named action. Returns the resolved action.
    pub fn send_command(&self, action: &str) -> Result<Action> {
        let resolved: Action = action.parse()?;
        let descriptor = self.descriptor(action)?;
        // Tones contain the access code
        debug!("Sending action '{resolved}' (DTMF: '{}') to alarm", descriptor.tones);
        self.sink.dispatch(&descriptor)?;
        info!("Action '{resolved}' dispatched to {}", descriptor.channel);
        Ok(resolved)
    }

    pub fn disarm(&self) -> Result<Action> {
        self.send_command(Action::Disarm.name())
    }

    /// Arm while at home.
    pub fn arm_home(&self) -> Result<Action> {
        self.send_command("arm_home")
    }

    /// Arm when going away.
    pub fn arm_away(&self) -> Result<Action> {
        self.send_command("arm_away")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MemorySink;

    #[test]
    fn test_encode_disarm() {
        assert_eq!(encode("disarm", "1234").unwrap(), "ww1234w1w9");
        assert_eq!(encode("disarm", "123").unwrap(), "ww123w1w9");
    }

    #[test]
    fn test_encode_digits_only_content() {
        let tones = encode("disarm", "1234").unwrap();
        let digits: String = tones.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(digits, "123419");
    }

    #[test]
    fn test_encode_multi_digit_actions() {
        assert_eq!(encode("arm_doors_and_windows", "1234").unwrap(), "ww1234w2w9");
        assert_eq!(encode("arm_motion_sensors", "1234").unwrap(), "ww1234w3w9");
        assert_eq!(encode("arm_doors_and_windows_no_delay", "1234").unwrap(), "ww1234w2w2w9");
        assert_eq!(encode("arm_motion_sensors_with_latchkey", "1234").unwrap(), "ww1234w3w3w9");
        assert_eq!(
            encode("arm_doors_and_windows_and_motion_sensors", "1234").unwrap(),
            "ww1234w2w3w9"
        );
        assert_eq!(
            encode(
                "arm_doors_and_windows_with_no_entry_delay_and_motion_sensors_with_latchkey",
                "1234"
            )
            .unwrap(),
            "ww1234w2w2w3w3w9"
        );
        assert_eq!(encode("terminate", "1234").unwrap(), "ww1234w9w9");
    }

    #[test]
    fn test_aliases() {
        assert_eq!("arm_home".parse::<Action>().unwrap(), Action::ArmDoorsAndWindowsNoDelay);
        assert_eq!("arm_away".parse::<Action>().unwrap(), Action::ArmDoorsAndWindowsAndMotionSensors);
        assert_eq!(encode("arm_home", "1234").unwrap(), encode("arm_doors_and_windows_no_delay", "1234").unwrap());
    }

    #[test]
    fn test_invalid_action() {
        match encode("open_garage", "1234") {
            Err(SimonError::InvalidAction { action }) => assert_eq!(action, "open_garage"),
            other => panic!("expected InvalidAction, got {other:?}"),
        }
        // Action is checked before the access code
        assert!(matches!(encode("open_garage", "x"), Err(SimonError::InvalidAction { .. })));
    }

    #[test]
    fn test_invalid_access_code() {
        for code in ["", "12a4", "123456789", "12 4"] {
            assert!(matches!(encode("disarm", code), Err(SimonError::InvalidAccessCode)), "{code:?}");
        }
    }

    #[test]
    fn test_action_names_roundtrip() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_build_dispatch() {
        let policy = RetryPolicy {
            wait_time: Duration::from_secs(30),
            retry_time: Duration::from_secs(5),
            max_retries: 4,
        };
        let d = build_dispatch("disarm", "123", "simonxt", policy).unwrap();
        assert_eq!(d.channel, "SIP/simonxt");
        assert_eq!(d.tones, "ww123w1w9");
        assert_eq!(d.wait_time_secs, 30);
        assert_eq!(d.retry_time_secs, 5);
        assert_eq!(d.max_retries, 4);
        assert!(d.archive);
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.wait_time.as_secs(), 65);
        assert_eq!(p.retry_time.as_secs(), 10);
        assert_eq!(p.max_retries, 2);
    }

    #[test]
    fn test_controller_dispatches() {
        let sink = Arc::new(MemorySink::new());
        let controller = Controller::new("123", "simonxt", RetryPolicy::default(), sink.clone()).unwrap();

        assert_eq!(controller.disarm().unwrap(), Action::Disarm);
        assert_eq!(controller.arm_home().unwrap(), Action::ArmDoorsAndWindowsNoDelay);
        assert_eq!(controller.arm_away().unwrap(), Action::ArmDoorsAndWindowsAndMotionSensors);
        assert!(controller.send_command("bogus").is_err());

        let sent = sink.dispatched();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].tones, "ww123w1w9");
        assert_eq!(sent[1].tones, "ww123w2w2w9");
        assert_eq!(sent[2].tones, "ww123w2w3w9");
    }

    #[test]
    fn test_controller_rejects_bad_access_code() {
        let sink = Arc::new(MemorySink::new());
        assert!(Controller::new("abcd", "simonxt", RetryPolicy::default(), sink).is_err());
    }

    #[test]
    fn test_controller_archive_flag() {
        let sink = Arc::new(MemorySink::new());
        let controller = Controller::new("1234", "simonxt", RetryPolicy::default(), sink)
            .unwrap()
            .with_archive(false);
        assert!(!controller.descriptor("disarm").unwrap().archive);
    }
}
