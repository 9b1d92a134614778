//! CSS-style lengths: absolute units resolve to pixels, `%` stays relative
//! until it meets the working area.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const PX_PER_INCH: f64 = 96.0;
pub const PX_PER_MM: f64 = PX_PER_INCH / 25.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Absolute length in CSS pixels.
    Px(f64),
    /// Percentage of the available dimension.
    Percent(f64),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LengthError {
    #[error("empty length")]
    Empty,
    #[error("invalid number in length '{0}'")]
    InvalidNumber(String),
    #[error("unknown unit in length '{0}'")]
    UnknownUnit(String),
    #[error("negative length '{0}'")]
    Negative(String),
}

impl Length {
    /// Absolute value in pixels, resolving percentages against `available`.
    pub fn to_px(self, available: f64) -> f64 {
        match self {
            Length::Px(px) => px,
            Length::Percent(pct) => available * pct / 100.0,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Length::Percent(_))
    }
}

impl FromStr for Length {
    type Err = LengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(LengthError::Empty);
        }
        let split = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(raw.len());
        let (number, unit) = raw.split_at(split);
        let value: f64 = number
            .parse()
            .map_err(|_| LengthError::InvalidNumber(raw.to_string()))?;
        if !value.is_finite() {
            return Err(LengthError::InvalidNumber(raw.to_string()));
        }
        if value < 0.0 {
            return Err(LengthError::Negative(raw.to_string()));
        }

        let length = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "px" => Length::Px(value),
            "%" => Length::Percent(value),
            "mm" => Length::Px(value * PX_PER_MM),
            "cm" => Length::Px(value * PX_PER_MM * 10.0),
            "in" => Length::Px(value * PX_PER_INCH),
            "pt" => Length::Px(value * PX_PER_INCH / 72.0),
            _ => return Err(LengthError::UnknownUnit(raw.to_string())),
        };
        Ok(length)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(px) => f.write_str(&format_px(*px)),
            Length::Percent(pct) => write!(f, "{}%", trim_number(*pct)),
        }
    }
}

/// A length as written in YAML: either a string (`"25%"`, `"40mm"`) or a
/// bare number, which is read as pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LengthValue {
    Number(f64),
    Text(String),
}

impl LengthValue {
    pub fn parse(&self) -> Result<Length, LengthError> {
        match self {
            LengthValue::Number(n) => Length::from_str(&n.to_string()),
            LengthValue::Text(s) => s.parse(),
        }
    }
}

impl From<&str> for LengthValue {
    fn from(s: &str) -> Self {
        LengthValue::Text(s.to_string())
    }
}

impl From<f64> for LengthValue {
    fn from(n: f64) -> Self {
        LengthValue::Number(n)
    }
}

impl fmt::Display for LengthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthValue::Number(n) => write!(f, "{}", n),
            LengthValue::Text(s) => f.write_str(s),
        }
    }
}

fn trim_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `250px`, `12.5px`, never more than two decimals.
pub fn format_px(px: f64) -> String {
    format!("{}px", trim_number(px))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("250px".parse::<Length>().unwrap(), Length::Px(250.0));
        assert_eq!("25%".parse::<Length>().unwrap(), Length::Percent(25.0));
        assert_eq!(" 12 ".parse::<Length>().unwrap(), Length::Px(12.0));
        assert_eq!("1in".parse::<Length>().unwrap(), Length::Px(96.0));
        assert_eq!("72pt".parse::<Length>().unwrap(), Length::Px(96.0));
        let mm = "25.4mm".parse::<Length>().unwrap().to_px(0.0);
        assert!((mm - 96.0).abs() < 1e-9);
        let cm = "2.54CM".parse::<Length>().unwrap().to_px(0.0);
        assert!((cm - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Length>(), Err(LengthError::Empty));
        assert!(matches!("abc".parse::<Length>(), Err(LengthError::InvalidNumber(_))));
        assert!(matches!("10furlongs".parse::<Length>(), Err(LengthError::UnknownUnit(_))));
        assert!(matches!("-5px".parse::<Length>(), Err(LengthError::Negative(_))));
        assert!(matches!("1.2.3px".parse::<Length>(), Err(LengthError::InvalidNumber(_))));
    }

    #[test]
    fn test_percent_resolution() {
        assert_eq!(Length::Percent(25.0).to_px(1000.0), 250.0);
        assert_eq!(Length::Px(40.0).to_px(1000.0), 40.0);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_px(250.0), "250px");
        assert_eq!(format_px(12.346), "12.35px");
        assert_eq!(format_px(0.0), "0px");
        assert_eq!(Length::Percent(12.5).to_string(), "12.5%");
    }

    #[test]
    fn test_length_value_number_is_px() {
        assert_eq!(LengthValue::from(300.0).parse().unwrap(), Length::Px(300.0));
        let v: LengthValue = serde_yaml::from_str("120").unwrap();
        assert_eq!(v.parse().unwrap(), Length::Px(120.0));
        let v: LengthValue = serde_yaml::from_str("'30%'").unwrap();
        assert_eq!(v.parse().unwrap(), Length::Percent(30.0));
    }
}
