//! Inbound telemetry frames
//!
//! The robot answers `b;` with `BATT <volts>` and `s;` with `SIG: <n>%`.
//! Anything else it writes (motor acknowledgments, error strings) ends up as
//! [`TelemetryReading::Unknown`] and is only shown to the operator.

use crate::protocol::error::ParseError;
use std::borrow::Cow;
use std::fmt;

/// Voltage of an empty battery pack
pub const BATTERY_EMPTY_VOLTS: f64 = 12.0;

/// Voltage of a fully charged battery pack
pub const BATTERY_FULL_VOLTS: f64 = 13.6;

const BATTERY_TAG: &str = "BATT";
const SIGNAL_TAG: &str = "SIG";

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryReading {
    /// `percent` is a raw linear estimate and may leave 0..=100
    Battery { volts: f64, percent: i32 },
    Signal { strength: Option<u8>, raw: String },
    Unknown(String),
}

impl fmt::Display for TelemetryReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryReading::Battery { volts, percent } => {
                write!(f, "{}v   -   {}%", volts, percent)
            }
            TelemetryReading::Signal {
                strength: Some(strength),
                ..
            } => write!(f, "signal {}%", strength),
            TelemetryReading::Signal { raw, .. } => write!(f, "signal {}", raw),
            TelemetryReading::Unknown(text) => write!(f, "{}", text),
        }
    }
}

/// Decodes one frame as returned by a single socket read
pub fn parse(raw: &[u8]) -> Result<TelemetryReading, ParseError> {
    let text = decode(raw);

    if text.starts_with(BATTERY_TAG) {
        parse_battery(&text)
    } else if text.starts_with(SIGNAL_TAG) {
        Ok(parse_signal(&text))
    } else {
        Ok(TelemetryReading::Unknown(text.into_owned()))
    }
}

/// Lossy text form of a frame, without trailing padding
pub fn decode(raw: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
    if trimmed.len() == text.len() {
        text
    } else {
        Cow::Owned(trimmed.to_string())
    }
}

/// Linear charge estimate between the empty and full pack voltage
///
/// Truncates toward zero and does not clamp: 11.0V reads as -62%.
pub fn battery_percent(volts: f64) -> i32 {
    ((volts - BATTERY_EMPTY_VOLTS) * 100.0 / (BATTERY_FULL_VOLTS - BATTERY_EMPTY_VOLTS)) as i32
}

fn parse_battery(text: &str) -> Result<TelemetryReading, ParseError> {
    let payload: String = text[BATTERY_TAG.len()..]
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\0')
        .collect();
    let payload = payload.strip_prefix(':').unwrap_or(&payload);

    if payload.is_empty() {
        return Err(ParseError::EmptyBatteryPayload {
            frame: text.to_string(),
        });
    }

    let volts = payload
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidBatteryVoltage {
            payload: payload.to_string(),
            frame: text.to_string(),
        })?;

    Ok(TelemetryReading::Battery {
        volts,
        percent: battery_percent(volts),
    })
}

fn parse_signal(text: &str) -> TelemetryReading {
    let payload: String = text[SIGNAL_TAG.len()..]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let strength = payload
        .trim_start_matches(':')
        .trim_end_matches('%')
        .parse::<u8>()
        .ok();

    TelemetryReading::Signal {
        strength,
        raw: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery(frame: &str) -> (f64, i32) {
        match parse(frame.as_bytes()) {
            Ok(TelemetryReading::Battery { volts, percent }) => (volts, percent),
            other => panic!("Expected battery reading, got {:?}", other),
        }
    }

    #[test]
    fn test_battery_percent_reference_points() {
        assert_eq!(battery("BATT 12.8"), (12.8, 50));
        assert_eq!(battery("BATT 12.0"), (12.0, 0));
        assert_eq!(battery("BATT 13.6"), (13.6, 100));
        assert_eq!(battery("BATT 11.0"), (11.0, -62));
    }

    #[test]
    fn test_battery_percent_is_not_clamped() {
        let (_, percent) = battery("BATT 14.4");
        assert_eq!(percent, 150);
        assert!(battery("BATT 0").1.is_negative());
    }

    #[test]
    fn test_battery_tolerates_whitespace_noise() {
        assert_eq!(battery("BATT 12.80\r\n"), (12.8, 50));
        assert_eq!(battery("BATT\t 12.\t80 \n"), (12.8, 50));
        assert_eq!(battery("BATT: 12.80"), (12.8, 50));
        assert_eq!(battery("BATT 12.80\0\0\0\0"), (12.8, 50));
    }

    #[test]
    fn test_battery_malformed_payload() {
        assert!(matches!(
            parse(b"BATT twelve"),
            Err(ParseError::InvalidBatteryVoltage { .. })
        ));
        assert!(matches!(
            parse(b"BATT NaN"),
            Err(ParseError::InvalidBatteryVoltage { .. })
        ));
        assert!(matches!(
            parse(b"BATT   "),
            Err(ParseError::EmptyBatteryPayload { .. })
        ));
    }

    #[test]
    fn test_prefix_is_case_sensitive_and_anchored() {
        assert_eq!(
            parse(b"batt 12.8").unwrap(),
            TelemetryReading::Unknown("batt 12.8".to_string())
        );
        assert_eq!(
            parse(b" BATT 12.8").unwrap(),
            TelemetryReading::Unknown(" BATT 12.8".to_string())
        );
    }

    #[test]
    fn test_signal_frame() {
        assert_eq!(
            parse(b"SIG: 100%").unwrap(),
            TelemetryReading::Signal {
                strength: Some(100),
                raw: "SIG: 100%".to_string()
            }
        );
        assert!(matches!(
            parse(b"SIG ???").unwrap(),
            TelemetryReading::Signal { strength: None, .. }
        ));
    }

    #[test]
    fn test_unknown_frames_pass_through() {
        assert_eq!(
            parse(b"XYZZY").unwrap(),
            TelemetryReading::Unknown("XYZZY".to_string())
        );
        assert_eq!(parse(b"").unwrap(), TelemetryReading::Unknown(String::new()));
        assert_eq!(
            parse(b"BAT").unwrap(),
            TelemetryReading::Unknown("BAT".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let reading = parse(&[0xff, b'o', b'k']).unwrap();
        assert_eq!(reading, TelemetryReading::Unknown("\u{fffd}ok".to_string()));
    }

    #[test]
    fn test_battery_display_matches_panel_label() {
        let reading = parse(b"BATT 12.8").unwrap();
        assert_eq!(reading.to_string(), "12.8v   -   50%");
    }
}
