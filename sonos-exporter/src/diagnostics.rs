//! Radio diagnostics parsing
//!
//! The player exposes `/proc/ath_rincon/status` wrapped in a `ZPSupportInfo`
//! document. Only two kinds of lines matter:
//! - `OFDM ANI level: <n>`
//! - `Noise Floor: <dBm> dBm (chain <id> ctl)`
//!
//! Parsing is tolerant: anything missing or unreadable counts as zero.

use crate::models::{DiagnosticStatus, CHAINS};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static ANI_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"OFDM ANI level: ([0-9]+)").expect("ANI regex is valid"));

static NOISE_FLOOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Noise Floor: (-?[0-9]+) dBm \(chain ([0-9]+) ctl\)")
        .expect("noise floor regex is valid")
});

#[derive(Debug, Deserialize)]
struct SupportInfo {
    #[serde(rename = "File", default)]
    files: Vec<SupportFile>,
}

#[derive(Debug, Deserialize)]
struct SupportFile {
    #[serde(rename = "$text", default)]
    text: String,
}

/// Returns the text of the `File` element of a `ZPSupportInfo` document,
/// or an empty string when the document has another shape.
pub fn extract_support_text(xml: &str) -> String {
    match quick_xml::de::from_str::<SupportInfo>(xml) {
        Ok(info) => info.files.into_iter().last().map(|f| f.text).unwrap_or_default(),
        Err(e) => {
            tracing::debug!("unexpected diagnostics envelope: {}", e);
            String::new()
        }
    }
}

/// Extracts ANI level and per-chain noise floor from diagnostic text.
pub fn parse(text: &str) -> DiagnosticStatus {
    let mut status = DiagnosticStatus {
        ani: ANI_LEVEL
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| to_int(m.as_str()))
            .unwrap_or(0),
        ..DiagnosticStatus::default()
    };

    for caps in NOISE_FLOOR.captures_iter(text) {
        let (Some(value), Some(chain)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        // Unknown chains are dropped, later lines overwrite earlier ones.
        match chain.as_str().parse::<usize>() {
            Ok(id) if id < CHAINS => status.noise[id] = to_int(value.as_str()),
            _ => {}
        }
    }

    status
}

fn to_int(digits: &str) -> i64 {
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference_payload() {
        let text = "OFDM ANI level: 47\nNoise Floor: -92 dBm (chain 0 ctl)\nNoise Floor: -88 dBm (chain 2 ctl)";
        let status = parse(text);
        assert_eq!(status.ani, 47);
        assert_eq!(status.noise, [-92, 0, -88]);
    }

    #[test]
    fn test_parse_without_matches_is_zero() {
        assert_eq!(parse(""), DiagnosticStatus::default());
        assert_eq!(
            parse("wlan0: link up\nbeacon interval 100"),
            DiagnosticStatus::default()
        );
    }

    #[test]
    fn test_missing_ani_defaults_to_zero() {
        let status = parse("Noise Floor: -95 dBm (chain 1 ctl)");
        assert_eq!(status.ani, 0);
        assert_eq!(status.noise, [0, -95, 0]);
    }

    #[test]
    fn test_last_noise_line_wins() {
        let text = "Noise Floor: -90 dBm (chain 0 ctl)\n\
                    Noise Floor: -91 dBm (chain 1 ctl)\n\
                    Noise Floor: -92 dBm (chain 2 ctl)\n\
                    Noise Floor: -80 dBm (chain 0 ctl)";
        assert_eq!(parse(text).noise, [-80, -91, -92]);
    }

    #[test]
    fn test_unknown_chain_is_ignored() {
        let text = "Noise Floor: -70 dBm (chain 3 ctl)\n\
                    Noise Floor: -71 dBm (chain 99999999999999999999999 ctl)\n\
                    Noise Floor: -93 dBm (chain 1 ctl)";
        assert_eq!(parse(text).noise, [0, -93, 0]);
    }

    #[test]
    fn test_overflowing_numbers_become_zero() {
        let text = "OFDM ANI level: 99999999999999999999999\n\
                    Noise Floor: -99999999999999999999999 dBm (chain 2 ctl)";
        let status = parse(text);
        assert_eq!(status.ani, 0);
        assert_eq!(status.noise, [0, 0, 0]);
    }

    #[test]
    fn test_first_ani_line_is_used() {
        let status = parse("OFDM ANI level: 3\nOFDM ANI level: 9");
        assert_eq!(status.ani, 3);
    }

    #[test]
    fn test_extract_support_text() {
        let xml = r#"<?xml version="1.0" ?>
<ZPSupportInfo><File name="/proc/ath_rincon/status">OFDM ANI level: 12
Noise Floor: -96 dBm (chain 0 ctl)</File></ZPSupportInfo>"#;
        let text = extract_support_text(xml);
        assert!(text.contains("OFDM ANI level: 12"));
        assert_eq!(parse(&text).noise[0], -96);
    }

    #[test]
    fn test_extract_support_text_skips_interleaved_elements() {
        let xml = r#"<ZPSupportInfo><File name="/proc/uptime">OFDM ANI level: 1</File><Command cmdline="dmesg">boot</Command><File name="/proc/ath_rincon/status">OFDM ANI level: 9</File></ZPSupportInfo>"#;
        assert_eq!(parse(&extract_support_text(xml)).ani, 9);
    }

    #[test]
    fn test_extract_support_text_tolerates_garbage() {
        assert_eq!(extract_support_text(""), "");
        assert_eq!(extract_support_text("<html><body>nope</body></html>"), "");
        assert_eq!(parse(&extract_support_text("not xml at all")), DiagnosticStatus::default());
    }
}
