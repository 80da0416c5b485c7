// MIT License - Copyright (c) 2026 Peter Wright
// Ademco Contact ID event code table

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimonError};

/// The only report protocol the decoder accepts.
pub const CONTACT_ID_PROTOCOL: &str = "ADEMCO_CONTACT_ID";

/// What the 3-digit zone/user field of a record carries for a given code.
///
/// Contact ID reuses the same field for either a zone number or a user
/// number; the event code decides which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Zone,
    User,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zone => "zone",
            Self::User => "user",
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zone" => Ok(Self::Zone),
            "user" => Ok(Self::User),
            _ => Err(s.to_string()),
        }
    }
}

/// Event class, following the grouping of the Contact ID code list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeCategory {
    Alarms,
    Supervisory,
    Troubles,
    OpenClose,
    BypassesDisables,
    TestMisc,
}

impl CodeCategory {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Alarms => "Alarms",
            Self::Supervisory => "Supervisory",
            Self::Troubles => "Troubles",
            Self::OpenClose => "Open/Close",
            Self::BypassesDisables => "Bypasses/Disables",
            Self::TestMisc => "Test/Misc",
        }
    }
}

impl fmt::Display for CodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One row of the code table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: u16,
    pub description: Cow<'static, str>,
    pub kind: FieldKind,
    pub category: CodeCategory,
}

/// A code supplied by configuration, on top of the builtin table.
///
/// `kind` stays a string until the table is built so that a typo is
/// reported as [`SimonError::InvalidCodeKind`] instead of being coerced.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomCode {
    pub description: String,
    pub kind: String,
    pub category: CodeCategory,
}

/// Immutable code -> entry lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct CodeTable {
    entries: HashMap<u16, CodeEntry>,
}

impl CodeTable {
    /// The standard Contact ID table.
    pub fn builtin() -> Self {
        let entries = BUILTIN_CODES
            .iter()
            .map(|e| (e.code, e.clone()))
            .collect();
        Self { entries }
    }

    /// The standard table extended (or overridden) by configured codes.
    pub fn with_custom(custom: &HashMap<u16, CustomCode>) -> Result<Self> {
        let mut table = Self::builtin();
        for (&code, row) in custom {
            if code > 999 {
                return Err(SimonError::Config(format!("code {code} has more than 3 digits")));
            }
            let kind = row
                .kind
                .parse::<FieldKind>()
                .map_err(|kind| SimonError::InvalidCodeKind { code, kind })?;
            table.entries.insert(
                code,
                CodeEntry {
                    code,
                    description: Cow::Owned(row.description.clone()),
                    kind,
                    category: row.category,
                },
            );
        }
        Ok(table)
    }

    pub fn lookup(&self, code: u16) -> Option<&CodeEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in code order.
    pub fn entries(&self) -> Vec<&CodeEntry> {
        let mut all: Vec<&CodeEntry> = self.entries.values().collect();
        all.sort_by_key(|e| e.code);
        all
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

const fn zone(code: u16, description: &'static str, category: CodeCategory) -> CodeEntry {
    CodeEntry { code, description: Cow::Borrowed(description), kind: FieldKind::Zone, category }
}

const fn user(code: u16, description: &'static str, category: CodeCategory) -> CodeEntry {
    CodeEntry { code, description: Cow::Borrowed(description), kind: FieldKind::User, category }
}

use CodeCategory::{Alarms, BypassesDisables, OpenClose, Supervisory, TestMisc, Troubles};

/// Contact ID (SIA DC-05) event codes.
static BUILTIN_CODES: &[CodeEntry] = &[
    // Medical
    zone(100, "Medical Zone", Alarms),
    zone(101, "Personal Emergency Zone", Alarms),
    zone(102, "Fail to report in Zone", Alarms),
    // Fire
    zone(110, "Fire Zone", Alarms),
    zone(111, "Smoke Zone", Alarms),
    zone(112, "Combustion Zone", Alarms),
    zone(113, "Water flow Zone", Alarms),
    zone(114, "Heat Zone", Alarms),
    zone(115, "Pull Station Zone", Alarms),
    zone(116, "Duct Zone", Alarms),
    zone(117, "Flame Zone", Alarms),
    zone(118, "Near Alarm Zone", Alarms),
    // Panic
    zone(120, "Panic Zone", Alarms),
    user(121, "Duress User", Alarms),
    zone(122, "Silent Zone", Alarms),
    zone(123, "Audible Zone", Alarms),
    zone(124, "Duress - Access granted Zone", Alarms),
    zone(125, "Duress - Egress granted Zone", Alarms),
    // Burglar
    zone(130, "Burglary Zone", Alarms),
    zone(131, "Perimeter Zone", Alarms),
    zone(132, "Interior Zone", Alarms),
    zone(133, "24 Hour (Safe) Zone", Alarms),
    zone(134, "Entry/Exit Zone", Alarms),
    zone(135, "Day/night Zone", Alarms),
    zone(136, "Outdoor Zone", Alarms),
    zone(137, "Tamper Zone", Alarms),
    zone(138, "Near alarm Zone", Alarms),
    zone(139, "Intrusion Verifier Zone", Alarms),
    // General
    zone(140, "General Alarm Zone", Alarms),
    zone(141, "Polling loop open Zone", Alarms),
    zone(142, "Polling loop short Zone", Alarms),
    zone(143, "Expansion module failure Zone", Alarms),
    zone(144, "Sensor tamper Zone", Alarms),
    zone(145, "Expansion module tamper Zone", Alarms),
    zone(146, "Silent Burglary Zone", Alarms),
    zone(147, "Sensor Supervision Failure Zone", Alarms),
    // 24 hour non-burglary
    zone(150, "24 Hour Non-Burglary Zone", Alarms),
    zone(151, "Gas detected Zone", Alarms),
    zone(152, "Refrigeration Zone", Alarms),
    zone(153, "Loss of heat Zone", Alarms),
    zone(154, "Water Leakage Zone", Alarms),
    zone(155, "Foil Break Zone", Alarms),
    zone(156, "Day Trouble Zone", Alarms),
    zone(157, "Low bottled gas level Zone", Alarms),
    zone(158, "High temp Zone", Alarms),
    zone(159, "Low temp Zone", Alarms),
    zone(161, "Loss of air flow Zone", Alarms),
    zone(162, "Carbon Monoxide detected Zone", Alarms),
    zone(163, "Tank level Zone", Alarms),
    // Fire supervisory
    zone(200, "Fire Supervisory Zone", Supervisory),
    zone(201, "Low water pressure Zone", Supervisory),
    zone(202, "Low CO2 Zone", Supervisory),
    zone(203, "Gate valve sensor Zone", Supervisory),
    zone(204, "Low water level Zone", Supervisory),
    zone(205, "Pump activated Zone", Supervisory),
    zone(206, "Pump failure Zone", Supervisory),
    // System troubles
    zone(300, "System Trouble Zone", Troubles),
    zone(301, "AC Loss Zone", Troubles),
    zone(302, "Low system battery Zone", Troubles),
    zone(303, "RAM Checksum bad Zone", Troubles),
    zone(304, "ROM checksum bad Zone", Troubles),
    zone(305, "System reset Zone", Troubles),
    zone(306, "Panel programming changed Zone", Troubles),
    zone(307, "Self-test failure Zone", Troubles),
    zone(308, "System shutdown Zone", Troubles),
    zone(309, "Battery test failure Zone", Troubles),
    zone(310, "Ground fault Zone", Troubles),
    zone(311, "Battery Missing/Dead Zone", Troubles),
    zone(312, "Power Supply Overcurrent Zone", Troubles),
    user(313, "Engineer Reset User", Troubles),
    // Sounder/relay troubles
    zone(320, "Sounder/Relay Zone", Troubles),
    zone(321, "Bell 1 Zone", Troubles),
    zone(322, "Bell 2 Zone", Troubles),
    zone(323, "Alarm relay Zone", Troubles),
    zone(324, "Trouble relay Zone", Troubles),
    zone(325, "Reversing relay Zone", Troubles),
    zone(326, "Notification Appliance Ckt. # 3 Zone", Troubles),
    zone(327, "Notification Appliance Ckt. #4 Zone", Troubles),
    // System peripheral troubles
    zone(330, "System Peripheral trouble Zone", Troubles),
    zone(331, "Polling loop open Zone", Troubles),
    zone(332, "Polling loop short Zone", Troubles),
    zone(333, "Expansion module failure Zone", Troubles),
    zone(334, "Repeater failure Zone", Troubles),
    zone(335, "Local printer out of paper Zone", Troubles),
    zone(336, "Local printer failure Zone", Troubles),
    zone(337, "Exp. Module DC Loss Zone", Troubles),
    zone(338, "Exp. Module Low Batt. Zone", Troubles),
    zone(339, "Exp. Module Reset Zone", Troubles),
    zone(341, "Exp. Module Tamper Zone", Troubles),
    zone(342, "Exp. Module AC Loss Zone", Troubles),
    zone(343, "Exp. Module self-test fail Zone", Troubles),
    zone(344, "RF Receiver Jam Detect Zone", Troubles),
    // Communication troubles
    zone(350, "Communication trouble Zone", Troubles),
    zone(351, "Telco 1 fault Zone", Troubles),
    zone(352, "Telco 2 fault Zone", Troubles),
    zone(353, "Long Range Radio xmitter fault Zone", Troubles),
    zone(354, "Failure to communicate event Zone", Troubles),
    zone(355, "Loss of Radio supervision Zone", Troubles),
    zone(356, "Loss of central polling Zone", Troubles),
    zone(357, "Long Range Radio VSWR problem Zone", Troubles),
    // Protection loop troubles
    zone(370, "Protection loop Zone", Troubles),
    zone(371, "Protection loop open Zone", Troubles),
    zone(372, "Protection loop short Zone", Troubles),
    zone(373, "Fire trouble Zone", Troubles),
    zone(374, "Exit error alarm (zone) Zone", Troubles),
    zone(375, "Panic zone trouble Zone", Troubles),
    zone(376, "Hold-up zone trouble Zone", Troubles),
    zone(377, "Swinger Trouble Zone", Troubles),
    zone(378, "Cross-zone Trouble Zone", Troubles),
    // Sensor troubles
    zone(380, "Sensor trouble Zone", Troubles),
    zone(381, "Loss of supervision - RF Zone", Troubles),
    zone(382, "Loss of supervision - RPM Zone", Troubles),
    zone(383, "Sensor tamper Zone", Troubles),
    zone(384, "RF low battery Zone", Troubles),
    zone(385, "Smoke detector Hi sensitivity Zone", Troubles),
    zone(386, "Smoke detector Low sensitivity Zone", Troubles),
    zone(387, "Intrusion detector Hi sensitivity Zone", Troubles),
    zone(388, "Intrusion detector Low sensitivity Zone", Troubles),
    zone(389, "Sensor self-test failure Zone", Troubles),
    zone(391, "Sensor Watch trouble Zone", Troubles),
    zone(392, "Drift Compensation Error Zone", Troubles),
    zone(393, "Maintenance Alert Zone", Troubles),
    // Open/close
    user(400, "Open/Close User", OpenClose),
    user(401, "O/C by user User", OpenClose),
    user(402, "Group O/C User", OpenClose),
    user(403, "Automatic O/C User", OpenClose),
    user(404, "Late to O/C User", OpenClose),
    user(405, "Deferred O/C User", OpenClose),
    user(406, "Cancel User", OpenClose),
    user(407, "Remote arm/disarm User", OpenClose),
    user(408, "Quick arm User", OpenClose),
    user(409, "Keyswitch O/C User", OpenClose),
    // Remote access
    user(411, "Callback request made User", OpenClose),
    user(412, "Successful download/access User", OpenClose),
    user(413, "Unsuccessful access User", OpenClose),
    user(414, "System shutdown command received User", OpenClose),
    user(415, "Dialer shutdown command received User", OpenClose),
    zone(416, "Successful Upload Zone", OpenClose),
    // Access control
    user(421, "Access denied User", OpenClose),
    user(422, "Access report by user User", OpenClose),
    zone(423, "Forced Access Zone", OpenClose),
    user(424, "Egress Denied User", OpenClose),
    user(425, "Egress Granted User", OpenClose),
    zone(426, "Access Door propped open Zone", OpenClose),
    zone(427, "Access point Door Status Monitor trouble Zone", OpenClose),
    zone(428, "Access point Request To Exit trouble Zone", OpenClose),
    user(429, "Access program mode entry User", OpenClose),
    user(430, "Access program mode exit User", OpenClose),
    user(431, "Access threat level change User", OpenClose),
    zone(432, "Access relay/trigger fail Zone", OpenClose),
    zone(433, "Access RTE shunt Zone", OpenClose),
    zone(434, "Access DSM shunt Zone", OpenClose),
    // Arm stay and exceptions
    user(441, "Armed STAY User", OpenClose),
    user(442, "Keyswitch Armed STAY User", OpenClose),
    user(450, "Exception O/C User", OpenClose),
    user(451, "Early O/C User", OpenClose),
    user(452, "Late O/C User", OpenClose),
    user(453, "Failed to Open User", OpenClose),
    user(454, "Failed to Close User", OpenClose),
    user(455, "Auto-arm Failed User", OpenClose),
    user(456, "Partial Arm User", OpenClose),
    user(457, "Exit Error (user) User", OpenClose),
    user(458, "User on Premises User", OpenClose),
    user(459, "Recent Close User", OpenClose),
    zone(461, "Wrong Code Entry Zone", OpenClose),
    user(462, "Legal Code Entry User", OpenClose),
    user(463, "Re-arm after Alarm User", OpenClose),
    user(464, "Auto-arm Time Extended User", OpenClose),
    zone(465, "Panic Alarm Reset Zone", OpenClose),
    user(466, "Service On/Off Premises User", OpenClose),
    // Access and sounder/relay disables
    zone(501, "Access reader disable Zone", BypassesDisables),
    zone(520, "Sounder/Relay Disable Zone", BypassesDisables),
    zone(521, "Bell 1 disable Zone", BypassesDisables),
    zone(522, "Bell 2 disable Zone", BypassesDisables),
    zone(523, "Alarm relay disable Zone", BypassesDisables),
    zone(524, "Trouble relay disable Zone", BypassesDisables),
    zone(525, "Reversing relay disable Zone", BypassesDisables),
    zone(526, "Notification Appliance Ckt. # 3 disable Zone", BypassesDisables),
    zone(527, "Notification Appliance Ckt. # 4 disable Zone", BypassesDisables),
    // System peripheral disables
    zone(531, "Module Added Zone", BypassesDisables),
    zone(532, "Module Removed Zone", BypassesDisables),
    // Communication disables
    zone(551, "Dialer disabled Zone", BypassesDisables),
    zone(552, "Radio transmitter disabled Zone", BypassesDisables),
    zone(553, "Remote Upload/Download disabled Zone", BypassesDisables),
    // Bypasses
    zone(570, "Zone/Sensor bypass Zone", BypassesDisables),
    zone(571, "Fire bypass Zone", BypassesDisables),
    zone(572, "24 Hour zone bypass Zone", BypassesDisables),
    zone(573, "Burg. Bypass Zone", BypassesDisables),
    user(574, "Group bypass User", BypassesDisables),
    zone(575, "Swinger bypass Zone", BypassesDisables),
    zone(576, "Access zone shunt Zone", BypassesDisables),
    zone(577, "Access point bypass Zone", BypassesDisables),
    // Test/misc
    zone(601, "Manual trigger test report Zone", TestMisc),
    zone(602, "Periodic test report Zone", TestMisc),
    zone(603, "Periodic RF transmission Zone", TestMisc),
    user(604, "Fire test User", TestMisc),
    zone(605, "Status report to follow Zone", TestMisc),
    zone(606, "Listen-in to follow Zone", TestMisc),
    user(607, "Walk test mode User", TestMisc),
    zone(608, "Periodic test - System Trouble Present Zone", TestMisc),
    zone(609, "Video Xmitter active Zone", TestMisc),
    zone(611, "Point tested OK Zone", TestMisc),
    zone(612, "Point not tested Zone", TestMisc),
    zone(613, "Intrusion Zone Walk Tested Zone", TestMisc),
    zone(614, "Fire Zone Walk Tested Zone", TestMisc),
    zone(615, "Panic Zone Walk Tested Zone", TestMisc),
    zone(616, "Service Request Zone", TestMisc),
    zone(621, "Event Log reset Zone", TestMisc),
    zone(622, "Event Log 50% full Zone", TestMisc),
    zone(623, "Event Log 90% full Zone", TestMisc),
    zone(624, "Event Log overflow Zone", TestMisc),
    user(625, "Time/Date reset User", TestMisc),
    zone(626, "Time/Date inaccurate Zone", TestMisc),
    zone(627, "Program mode entry Zone", TestMisc),
    zone(628, "Program mode exit Zone", TestMisc),
    zone(629, "32 Hour Event log marker Zone", TestMisc),
    zone(630, "Schedule change Zone", TestMisc),
    zone(631, "Exception schedule change Zone", TestMisc),
    zone(632, "Access schedule change Zone", TestMisc),
    zone(641, "Senior Watch Trouble Zone", TestMisc),
    user(642, "Latch-key Supervision User", TestMisc),
    zone(654, "System Inactivity Zone", TestMisc),
];
