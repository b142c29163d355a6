use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration literal: {0:?}")]
pub struct ParseDurationError(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid data size literal: {0:?}")]
pub struct ParseDataSizeError(String);

/// A wall or CPU time span as the engine serializes it: a decimal value with
/// a unit suffix, e.g. `"3.42ms"` or `"1.20m"`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineDuration {
    millis: f64,
}

impl EngineDuration {
    pub fn from_millis(millis: f64) -> Self {
        Self { millis }
    }

    pub fn as_millis_f64(&self) -> f64 {
        self.millis
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.millis / 1_000.0
    }
}

impl FromStr for EngineDuration {
    type Err = ParseDurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (value, unit) =
            split_literal(input).ok_or_else(|| ParseDurationError(input.to_string()))?;
        let scale = match unit {
            "ns" => 1e-6,
            "us" => 1e-3,
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            "d" => 86_400_000.0,
            _ => return Err(ParseDurationError(input.to_string())),
        };

        Ok(Self {
            millis: value * scale,
        })
    }
}

impl fmt::Display for EngineDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, unit) = if self.millis >= 86_400_000.0 {
            (self.millis / 86_400_000.0, "d")
        } else if self.millis >= 3_600_000.0 {
            (self.millis / 3_600_000.0, "h")
        } else if self.millis >= 60_000.0 {
            (self.millis / 60_000.0, "m")
        } else if self.millis >= 1_000.0 {
            (self.millis / 1_000.0, "s")
        } else if self.millis >= 1.0 {
            (self.millis, "ms")
        } else if self.millis >= 1e-3 {
            (self.millis * 1e3, "us")
        } else {
            (self.millis * 1e6, "ns")
        };

        write!(f, "{value:.2}{unit}")
    }
}

impl<'de> Deserialize<'de> for EngineDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl Serialize for EngineDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A byte count as the engine serializes it: a decimal value with a binary
/// unit suffix, e.g. `"10.90GB"` or `"128B"`. Units step by 1024.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DataSize {
    bytes: f64,
}

impl DataSize {
    pub fn from_bytes(bytes: f64) -> Self {
        Self { bytes }
    }

    pub fn as_bytes_f64(&self) -> f64 {
        self.bytes
    }
}

impl FromStr for DataSize {
    type Err = ParseDataSizeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (value, unit) =
            split_literal(input).ok_or_else(|| ParseDataSizeError(input.to_string()))?;
        let scale: f64 = match unit {
            "B" => 1.0,
            "kB" => 1024.0,
            "MB" => 1024.0 * 1024.0,
            "GB" => 1024.0 * 1024.0 * 1024.0,
            "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
            "PB" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
            _ => return Err(ParseDataSizeError(input.to_string())),
        };

        Ok(Self {
            bytes: value * scale,
        })
    }
}

impl fmt::Display for DataSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const STEP: f64 = 1024.0;
        let mut value = self.bytes;
        let mut unit = "B";
        for next in ["kB", "MB", "GB", "TB", "PB"] {
            if value < STEP {
                break;
            }
            value /= STEP;
            unit = next;
        }

        write!(f, "{value:.2}{unit}")
    }
}

impl<'de> Deserialize<'de> for DataSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl Serialize for DataSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

fn split_literal(input: &str) -> Option<(f64, &str)> {
    let trimmed = input.trim();
    let unit_start = trimmed.find(|c: char| c.is_ascii_alphabetic())?;
    let value: f64 = trimmed[..unit_start].trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    Some((value, trimmed[unit_start..].trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duration_parses_every_engine_unit() {
        let cases = [
            ("250.00ns", 0.00025),
            ("15.00us", 0.015),
            ("3.42ms", 3.42),
            ("1.20s", 1_200.0),
            ("2.50m", 150_000.0),
            ("1.00h", 3_600_000.0),
            ("1.00d", 86_400_000.0),
        ];

        for (literal, millis) in cases {
            let parsed: EngineDuration = literal.parse().expect("duration should parse");
            assert!(
                (parsed.as_millis_f64() - millis).abs() < 1e-9,
                "{literal} parsed to {}",
                parsed.as_millis_f64()
            );
        }
    }

    #[test]
    fn duration_tolerates_surrounding_whitespace() {
        let parsed: EngineDuration = "  1.50 s ".parse().expect("duration should parse");
        assert_eq!(parsed.as_millis_f64(), 1_500.0);
    }

    #[test]
    fn duration_rejects_bad_literals() {
        for literal in ["", "12", "ms", "-5.0s", "1.5lightyears", "1.0 m s"] {
            assert!(
                literal.parse::<EngineDuration>().is_err(),
                "{literal:?} should not parse"
            );
        }
    }

    #[test]
    fn duration_displays_most_succinct_unit() {
        assert_eq!(EngineDuration::from_millis(3.42).to_string(), "3.42ms");
        assert_eq!(EngineDuration::from_millis(90_000.0).to_string(), "1.50m");
        assert_eq!(EngineDuration::from_millis(0.015).to_string(), "15.00us");
    }

    #[test]
    fn data_size_parses_binary_units() {
        let cases = [
            ("128B", 128.0),
            ("1.00kB", 1024.0),
            ("2.50MB", 2.5 * 1024.0 * 1024.0),
            ("10.90GB", 10.9 * 1024.0 * 1024.0 * 1024.0),
        ];

        for (literal, bytes) in cases {
            let parsed: DataSize = literal.parse().expect("data size should parse");
            assert!(
                (parsed.as_bytes_f64() - bytes).abs() < 1e-3,
                "{literal} parsed to {}",
                parsed.as_bytes_f64()
            );
        }
    }

    #[test]
    fn data_size_rejects_decimal_units() {
        // The engine emits binary units only; "KB"/"KiB" spellings are not valid.
        for literal in ["1.0KB", "1.0KiB", "1.0bytes", "GB"] {
            assert!(
                literal.parse::<DataSize>().is_err(),
                "{literal:?} should not parse"
            );
        }
    }

    #[test]
    fn data_size_display_round_trips_canonical_forms() {
        for literal in ["512.00B", "1.50kB", "10.90GB"] {
            let parsed: DataSize = literal.parse().expect("data size should parse");
            assert_eq!(parsed.to_string(), literal);
        }
    }

    #[test]
    fn scalars_deserialize_from_json_strings() {
        let duration: EngineDuration =
            serde_json::from_value(json!("2.00s")).expect("duration from json");
        assert_eq!(duration.as_millis_f64(), 2_000.0);

        let size: DataSize = serde_json::from_value(json!("1.00MB")).expect("size from json");
        assert_eq!(size.as_bytes_f64(), 1024.0 * 1024.0);

        let err = serde_json::from_value::<EngineDuration>(json!("fast")).unwrap_err();
        assert!(err.to_string().contains("invalid duration literal"));
    }
}
