// MIT License - Copyright (c) 2026 Peter Wright
// Contact ID report decoder

use std::collections::HashMap;
use std::ops::{ControlFlow, Range};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::codes::{CodeTable, FieldKind, CONTACT_ID_PROTOCOL};
use crate::error::{Result, SimonError};
use crate::event::{AlarmEvent, Qualifier, ZoneOrUser};

/// Report header keys written by Asterisk's AlarmReceiver.
pub const PROTOCOL_KEY: &str = "PROTOCOL";
pub const CALLING_FROM_KEY: &str = "CALLINGFROM";
pub const TIMESTAMP_KEY: &str = "TIMESTAMP";

/// `strftime` layout of the TIMESTAMP header, without the trailing zone
/// abbreviation (e.g. `Sat Dec 26, 2020 @ 16:16:29`).
const TIMESTAMP_FORMAT: &str = "%a %b %d, %Y @ %H:%M:%S";

/// Length of a Contact ID record: `ACCT MT Q EEE GG CCC S`.
pub const RECORD_LEN: usize = 16;

/// Digit fields of a Contact ID event record, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFields {
    pub account: u16,
    pub msg_type: u8,
    pub qualifier: u8,
    pub code: u16,
    pub partition: u8,
    pub zone_or_user: u16,
    pub checksum: u8,
}

/// Extract the value of a `KEY=value` header line.
/// e.g., `header_value("CALLINGFROM=simonxt", "CALLINGFROM")` → `Some("simonxt")`
pub fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?.strip_prefix('=')
}

fn digits<T: FromStr>(s: &str, range: Range<usize>) -> Option<T> {
    s.get(range)?.parse().ok()
}

/// Split a record line into its 4-2-1-3-2-3-1 digit groups.
///
/// The line must start with 16 ASCII digits; anything after them is ignored.
pub fn parse_record(line: &str) -> Option<RecordFields> {
    let record = line.get(..RECORD_LEN)?;
    if !record.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(RecordFields {
        account: digits(record, 0..4)?,
        msg_type: digits(record, 4..6)?,
        qualifier: digits(record, 6..7)?,
        code: digits(record, 7..10)?,
        partition: digits(record, 10..12)?,
        zone_or_user: digits(record, 12..15)?,
        checksum: digits(record, 15..16)?,
    })
}

/// UTC offset in seconds for the zone abbreviations strftime's `%Z` emits.
fn tz_offset_secs(abbrev: &str) -> Option<i32> {
    let hours = match abbrev {
        "UTC" | "GMT" | "Z" | "UT" | "WET" => 0,
        "BST" | "CET" | "WEST" => 1,
        "CEST" | "EET" => 2,
        "EEST" | "MSK" => 3,
        "AST" => -4,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" | "AKDT" => -8,
        "AKST" | "HDT" => -9,
        "HST" => -10,
        _ => return None,
    };
    Some(hours * 3600)
}

/// Parse a TIMESTAMP header value into an absolute time.
/// e.g., `Sat Dec 26, 2020 @ 16:16:29 UTC` → 2020-12-26T16:16:29Z
///
/// The weekday must agree with the date; `Fri Dec 26, 2020` is rejected.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    let fail = |reason: String| SimonError::TimestampParse { value: value.to_string(), reason };

    let (local, abbrev) = value
        .rsplit_once(' ')
        .ok_or_else(|| fail("missing timezone".to_string()))?;
    let offset = tz_offset_secs(abbrev)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| fail(format!("unknown timezone '{abbrev}'")))?;
    let naive = NaiveDateTime::parse_from_str(local.trim_end(), TIMESTAMP_FORMAT)
        .map_err(|e| fail(e.to_string()))?;
    let local = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| fail("ambiguous local time".to_string()))?;
    Ok(local.with_timezone(&Utc))
}

/// Header context accumulated while scanning a report top to bottom.
#[derive(Debug, Clone, Default)]
struct ReportContext {
    extension: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

/// Turns the text of one AlarmReceiver report into an [`AlarmEvent`].
///
/// Decoding is a pure function of the report text, the report id and the
/// tables the decoder was built with.
#[derive(Debug, Clone)]
pub struct ReportDecoder {
    codes: Arc<CodeTable>,
    zone_names: Arc<HashMap<u32, String>>,
}

impl ReportDecoder {
    pub fn new(codes: Arc<CodeTable>, zone_names: Arc<HashMap<u32, String>>) -> Self {
        Self { codes, zone_names }
    }

    pub fn codes(&self) -> &CodeTable {
        &self.codes
    }

    /// Decode a report.
    ///
    /// Returns `Ok(None)` for a well-formed report without an event record
    /// (e.g. a connectivity test). Only the first record line is used.
    pub fn decode(&self, raw: &str, report_id: &str) -> Result<Option<AlarmEvent>> {
        let outcome = raw
            .lines()
            .map(str::trim)
            .try_fold(ReportContext::default(), |ctx, line| self.step(ctx, line, report_id));

        match outcome {
            ControlFlow::Break(result) => result.map(Some),
            ControlFlow::Continue(_) => {
                warn!("No event record found in report {report_id}");
                Ok(None)
            }
        }
    }

    fn step(
        &self,
        mut ctx: ReportContext,
        line: &str,
        report_id: &str,
    ) -> ControlFlow<Result<AlarmEvent>, ReportContext> {
        if let Some(protocol) = header_value(line, PROTOCOL_KEY) {
            if protocol != CONTACT_ID_PROTOCOL {
                warn!("Report {report_id}: unsupported protocol {protocol}");
                return ControlFlow::Break(Err(SimonError::UnsupportedProtocol {
                    protocol: protocol.to_string(),
                }));
            }
        } else if let Some(extension) = header_value(line, CALLING_FROM_KEY) {
            ctx.extension = Some(extension.to_string());
        } else if let Some(timestamp) = header_value(line, TIMESTAMP_KEY) {
            match parse_timestamp(timestamp) {
                Ok(ts) => ctx.timestamp = Some(ts),
                Err(e) => return ControlFlow::Break(Err(e)),
            }
        } else if let Some(fields) = parse_record(line) {
            debug!("Report {report_id}: event line found: {line}");
            return ControlFlow::Break(self.build_event(ctx, fields, report_id));
        }
        ControlFlow::Continue(ctx)
    }

    fn build_event(
        &self,
        ctx: ReportContext,
        fields: RecordFields,
        report_id: &str,
    ) -> Result<AlarmEvent> {
        let extension = ctx
            .extension
            .ok_or(SimonError::MissingHeader { field: CALLING_FROM_KEY })?;
        let timestamp = ctx
            .timestamp
            .ok_or(SimonError::MissingHeader { field: TIMESTAMP_KEY })?;

        let entry = self
            .codes
            .lookup(fields.code)
            .ok_or(SimonError::UnknownCode { code: fields.code })?;

        let zone_or_user = match entry.kind {
            FieldKind::Zone => ZoneOrUser::Zone {
                number: fields.zone_or_user,
                name: self.zone_names.get(&u32::from(fields.zone_or_user)).cloned(),
            },
            FieldKind::User => ZoneOrUser::User { number: fields.zone_or_user },
        };

        let event = AlarmEvent {
            uid: report_id.to_string(),
            timestamp,
            extension,
            account: fields.account,
            msg_type: fields.msg_type,
            qualifier: Qualifier::from_digit(fields.qualifier),
            code: fields.code,
            code_description: entry.description.to_string(),
            partition: fields.partition,
            zone_or_user,
            checksum: fields.checksum,
            status: None,
        };
        debug!("Decoded event: {event:?}");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TEST_REPORT: &str = "[metadata]\n\
        \n\
        PROTOCOL=ADEMCO_CONTACT_ID\n\
        CALLINGFROM=simonxt\n\
        CALLERNAME=<unknown>\n\
        TIMESTAMP=Sat Dec 26, 2020 @ 16:16:29 UTC\n\
        \n\
        [events]\n\
        \n\
        1234181601000008\n";

    fn decoder() -> ReportDecoder {
        let mut names = HashMap::new();
        names.insert(15, "front window left".to_string());
        ReportDecoder::new(Arc::new(CodeTable::builtin()), Arc::new(names))
    }

    #[test]
    fn test_header_value() {
        assert_eq!(header_value("PROTOCOL=ADEMCO_CONTACT_ID", "PROTOCOL"), Some("ADEMCO_CONTACT_ID"));
        assert_eq!(header_value("CALLINGFROM=", "CALLINGFROM"), Some(""));
        assert_eq!(header_value("PROTOCOLX=1", "PROTOCOL"), None);
        assert_eq!(header_value("CALLERNAME=x", "PROTOCOL"), None);
    }

    #[test]
    fn test_parse_record_groups() {
        let f = parse_record("1234181131000154").unwrap();
        assert_eq!(f.account, 1234);
        assert_eq!(f.msg_type, 18);
        assert_eq!(f.qualifier, 1);
        assert_eq!(f.code, 131);
        assert_eq!(f.partition, 0);
        assert_eq!(f.zone_or_user, 15);
        assert_eq!(f.checksum, 4);
    }

    #[test]
    fn test_parse_record_ignores_trailing_characters() {
        assert_eq!(parse_record("123418160100000839").unwrap().checksum, 8);
        assert!(parse_record("123418160100000").is_none());
        assert!(parse_record("12341816010000x8").is_none());
        assert!(parse_record("[events]").is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("Sat Dec 26, 2020 @ 16:16:29 UTC").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2020, 12, 26, 16, 16, 29).unwrap());

        let ts = parse_timestamp("Sat Dec 26, 2020 @ 11:16:29 EST").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2020, 12, 26, 16, 16, 29).unwrap());
    }

    #[test]
    fn test_parse_timestamp_weekday_must_match_date() {
        // 2020-12-26 was a Saturday
        let result = parse_timestamp("Fri Dec 26, 2020 @ 16:16:29 UTC");
        assert!(matches!(result, Err(SimonError::TimestampParse { .. })));
    }

    #[test]
    fn test_parse_timestamp_errors() {
        for bad in [
            "Sat Dec 26, 2020 @ 16:16:29 XYZ",
            "Sat Dec 26, 2020 @ 16:16:29",
            "Sat Dec 26, 2020 @ 25:16:29 UTC",
            "2020-12-26 16:16:29 UTC",
            "",
        ] {
            assert!(
                matches!(parse_timestamp(bad), Err(SimonError::TimestampParse { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_decode_zone_event() {
        let event = decoder().decode(TEST_REPORT, "12abcd").unwrap().unwrap();
        assert_eq!(event.uid, "12abcd");
        assert_eq!(event.extension, "simonxt");
        assert_eq!(event.account, 1234);
        assert_eq!(event.msg_type, 18);
        assert_eq!(event.qualifier, Qualifier::New);
        assert_eq!(event.code, 601);
        assert_eq!(event.code_description, "Manual trigger test report Zone");
        assert_eq!(event.partition, 0);
        assert_eq!(event.zone(), Some(0));
        assert_eq!(event.zone_name(), None);
        assert_eq!(event.user(), None);
        assert_eq!(event.checksum, 8);
        assert_eq!(event.status, None);
        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2020, 12, 26, 16, 16, 29).unwrap());
    }

    #[test]
    fn test_decode_resolves_zone_name() {
        let report = TEST_REPORT.replace("1234181601000008", "1234181131000154");
        let event = decoder().decode(&report, "34efgh").unwrap().unwrap();
        assert_eq!(event.code_description, "Perimeter Zone");
        assert_eq!(event.zone(), Some(15));
        assert_eq!(event.zone_name(), Some("front window left"));
    }

    #[test]
    fn test_decode_user_event() {
        let report = TEST_REPORT.replace("1234181601000008", "1234183401000037");
        let event = decoder().decode(&report, "u1").unwrap().unwrap();
        assert_eq!(event.code, 401);
        assert_eq!(event.qualifier, Qualifier::Restore);
        assert_eq!(event.user(), Some(3));
        assert_eq!(event.zone(), None);
        assert_eq!(event.zone_name(), None);
    }

    #[test]
    fn test_exactly_one_of_zone_or_user_for_every_code() {
        let d = decoder();
        for entry in d.codes().entries() {
            let record = format!("1234181{:03}00015{}", entry.code, 0);
            let report = TEST_REPORT.replace("1234181601000008", &record);
            let event = d.decode(&report, "x").unwrap().unwrap();
            assert!(event.zone().is_some() != event.user().is_some(), "code {}", entry.code);
            match entry.kind {
                FieldKind::Zone => assert_eq!(event.zone(), Some(15)),
                FieldKind::User => assert_eq!(event.user(), Some(15)),
            }
        }
    }

    #[test]
    fn test_unsupported_protocol() {
        let report = TEST_REPORT.replace("ADEMCO_CONTACT_ID", "SOMETHING_ELSE");
        match decoder().decode(&report, "x") {
            Err(SimonError::UnsupportedProtocol { protocol }) => assert_eq!(protocol, "SOMETHING_ELSE"),
            other => panic!("expected UnsupportedProtocol, got {other:?}"),
        }
    }

    #[test]
    fn test_protocol_mismatch_stops_before_bad_lines() {
        let report = "PROTOCOL=SIA\nTIMESTAMP=garbage\n1234189991000008\n";
        assert!(matches!(
            decoder().decode(report, "x"),
            Err(SimonError::UnsupportedProtocol { .. })
        ));
    }

    #[test]
    fn test_unknown_code() {
        let report = TEST_REPORT.replace("1234181601000008", "1234181999000008");
        assert!(matches!(
            decoder().decode(&report, "x"),
            Err(SimonError::UnknownCode { code: 999 })
        ));
    }

    #[test]
    fn test_bad_timestamp_fails_whole_report() {
        let report = TEST_REPORT.replace("16:16:29 UTC", "16:16:29 XYZ");
        assert!(matches!(
            decoder().decode(&report, "x"),
            Err(SimonError::TimestampParse { .. })
        ));
    }

    #[test]
    fn test_no_record_is_empty_result() {
        let report = "PROTOCOL=ADEMCO_CONTACT_ID\nCALLINGFROM=simonxt\n";
        assert_eq!(decoder().decode(report, "x").unwrap(), None);
        assert_eq!(decoder().decode("", "x").unwrap(), None);
    }

    #[test]
    fn test_record_before_headers_is_rejected() {
        let report = "1234181601000008\nCALLINGFROM=simonxt\nTIMESTAMP=Sat Dec 26, 2020 @ 16:16:29 UTC\n";
        assert!(matches!(
            decoder().decode(report, "x"),
            Err(SimonError::MissingHeader { field: CALLING_FROM_KEY })
        ));

        let report = "CALLINGFROM=simonxt\n1234181601000008\n";
        assert!(matches!(
            decoder().decode(report, "x"),
            Err(SimonError::MissingHeader { field: TIMESTAMP_KEY })
        ));
    }

    #[test]
    fn test_only_first_record_is_used() {
        let report = format!("{TEST_REPORT}1234181131000154\n");
        let event = decoder().decode(&report, "x").unwrap().unwrap();
        assert_eq!(event.code, 601);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let d = decoder();
        let a = d.decode(TEST_REPORT, "12abcd").unwrap();
        let b = d.decode(TEST_REPORT, "12abcd").unwrap();
        assert_eq!(a, b);
    }
}
