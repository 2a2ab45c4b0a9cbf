//! Validated value types shared across the crate

use std::fmt;
use std::str::FromStr;

use crate::error::PreviewError;

/// RGB color written as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`. The leading `#` is required and exactly six hex digits must follow.
    pub fn parse(field: &'static str, value: &str) -> Result<Self, PreviewError> {
        let invalid = || PreviewError::InvalidConfiguration {
            field,
            value: value.to_string(),
            expected: "#RRGGBB (six hex digits)",
        };

        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Canvas size in pixels, written as `WxH`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn parse(field: &'static str, value: &str) -> Result<Self, PreviewError> {
        let invalid = || PreviewError::InvalidConfiguration {
            field,
            value: value.to_string(),
            expected: "WxH with positive integers (e.g. 532x365)",
        };

        let (w, h) = value.split_once('x').ok_or_else(invalid)?;
        let width = parse_positive(w).ok_or_else(invalid)?;
        let height = parse_positive(h).ok_or_else(invalid)?;
        Ok(Self::new(width, height))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One signed axis of an X geometry offset.
///
/// The sign is kept apart from the magnitude: `-0` anchors the window to the
/// right or bottom edge and is not the same as `+0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub negative: bool,
    pub magnitude: u32,
}

impl Offset {
    pub const fn plus(magnitude: u32) -> Self {
        Self {
            negative: false,
            magnitude,
        }
    }

    pub const fn minus(magnitude: u32) -> Self {
        Self {
            negative: true,
            magnitude,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let (negative, digits) = match s.split_at_checked(1)? {
            ("+", rest) => (false, rest),
            ("-", rest) => (true, rest),
            _ => return None,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let magnitude = u32::from_str(digits).ok()?;
        Some(Self { negative, magnitude })
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { '-' } else { '+' };
        write!(f, "{sign}{}", self.magnitude)
    }
}

/// Screen offset in X geometry notation, e.g. `+0+0`, `-20+40` or `-0+0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub x: Offset,
    pub y: Offset,
}

impl Location {
    pub const fn new(x: Offset, y: Offset) -> Self {
        Self { x, y }
    }

    pub fn parse(field: &'static str, value: &str) -> Result<Self, PreviewError> {
        let invalid = || PreviewError::InvalidConfiguration {
            field,
            value: value.to_string(),
            expected: "a signed offset like +X+Y (e.g. +0+0, -20+40)",
        };

        // Second sign may be either '+' or '-', never at index 0
        let split = value
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map(|(i, _)| i)
            .ok_or_else(invalid)?;
        let (x, y) = value.split_at(split);
        let x = Offset::parse(x).ok_or_else(invalid)?;
        let y = Offset::parse(y).ok_or_else(invalid)?;
        Ok(Self::new(x, y))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.x, self.y)
    }
}

/// Window geometry passed to the viewer (`WxH+X+Y`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub size: Dimensions,
    pub location: Location,
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.size, self.location)
    }
}

/// Font point size, always positive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointSize(u32);

impl PointSize {
    pub fn new(field: &'static str, value: u32) -> Result<Self, PreviewError> {
        if value == 0 {
            return Err(PreviewError::InvalidConfiguration {
                field,
                value: value.to_string(),
                expected: "a positive integer",
            });
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

fn parse_positive(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    u32::from_str(s).ok().filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_valid() {
        assert_eq!(HexColor::parse("bg", "#ffffff").unwrap(), HexColor::new(255, 255, 255));
        assert_eq!(HexColor::parse("bg", "#1A2b3C").unwrap(), HexColor::new(0x1a, 0x2b, 0x3c));
    }

    #[test]
    fn test_hex_color_rejects_bad_digits() {
        let err = HexColor::parse("background color", "#zzzzzz").unwrap_err();
        assert!(matches!(
            err,
            PreviewError::InvalidConfiguration { field: "background color", .. }
        ));
    }

    #[test]
    fn test_hex_color_rejects_wrong_shape() {
        for value in ["ffffff", "#fff", "#fffffff", "", "#", "#ff ff f"] {
            assert!(HexColor::parse("bg", value).is_err(), "accepted {value:?}");
        }
    }

    #[test]
    fn test_hex_color_display_is_lowercase_hex() {
        assert_eq!(HexColor::new(0xAB, 0, 0x0F).to_string(), "#ab000f");
    }

    #[test]
    fn test_dimensions_parse() {
        assert_eq!(Dimensions::parse("size", "532x365").unwrap(), Dimensions::new(532, 365));
        for value in ["0x10", "10x0", "10", "x10", "10x", "-1x5", "10X10", "1x2x3", "+5x5"] {
            assert!(Dimensions::parse("size", value).is_err(), "accepted {value:?}");
        }
    }

    #[test]
    fn test_location_parse() {
        assert_eq!(
            Location::parse("location", "+0+0").unwrap(),
            Location::new(Offset::plus(0), Offset::plus(0))
        );
        assert_eq!(
            Location::parse("location", "-20+40").unwrap(),
            Location::new(Offset::minus(20), Offset::plus(40))
        );
        assert_eq!(
            Location::parse("location", "+15-3").unwrap(),
            Location::new(Offset::plus(15), Offset::minus(3))
        );
        for value in ["0+0", "+0", "++0+0", "+a+0", "+0+", "", "+0+0+0"] {
            assert!(Location::parse("location", value).is_err(), "accepted {value:?}");
        }
    }

    #[test]
    fn test_negative_zero_keeps_its_edge() {
        for value in ["-0+0", "+0-0", "-0-0", "+0+0", "-12+7"] {
            assert_eq!(Location::parse("location", value).unwrap().to_string(), value);
        }
        assert_ne!(
            Location::parse("location", "-0+0").unwrap(),
            Location::parse("location", "+0+0").unwrap()
        );
    }

    #[test]
    fn test_geometry_display() {
        let geometry = Geometry {
            size: Dimensions::new(532, 365),
            location: Location::new(Offset::minus(5), Offset::plus(10)),
        };
        assert_eq!(geometry.to_string(), "532x365-5+10");
    }

    #[test]
    fn test_point_size_must_be_positive() {
        assert!(PointSize::new("font size", 0).is_err());
        assert_eq!(PointSize::new("font size", 38).unwrap().get(), 38);
    }
}
