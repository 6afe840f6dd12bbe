use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DescriptorError;
use super::layout;

/// Decode one BCD44 byte: each nibble is a decimal digit.
///
/// `0x23` is 23, not 35. Nibbles above 9 are rejected instead of truncated.
///
/// # Examples
/// ```
/// use uacshark_core::bcd44_to_dec;
///
/// assert_eq!(bcd44_to_dec(0x23).unwrap(), 23);
/// assert!(bcd44_to_dec(0x1a).is_err());
/// ```
pub fn bcd44_to_dec(value: u8) -> Result<u8, DescriptorError> {
    let tens = value >> 4;
    let units = value & 0x0f;
    if tens > 9 || units > 9 {
        return Err(DescriptorError::BcdOutOfRange { value });
    }
    Ok(tens * 10 + units)
}

/// Audio device class release number (`bcdADC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdcVersion {
    pub major: u8,
    pub minor: u8,
}

impl AdcVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Decode the little-endian `bcdADC` word: high byte is major, low byte minor.
    pub fn from_bcd(bcd: u16) -> Result<Self, DescriptorError> {
        let [minor, major] = bcd.to_le_bytes();
        Ok(Self {
            major: bcd44_to_dec(major)?,
            minor: bcd44_to_dec(minor)?,
        })
    }

    /// Display value, `major + minor / 100`.
    pub fn as_f64(self) -> f64 {
        f64::from(self.major) + f64::from(self.minor) / 100.0
    }

    pub fn layout(self) -> Result<Layout, DescriptorError> {
        match self.major {
            layout::ADC_MAJOR_V1 => Ok(Layout::V1),
            layout::ADC_MAJOR_V2 => Ok(Layout::V2),
            major => Err(DescriptorError::UnsupportedVersion { major }),
        }
    }
}

impl fmt::Display for AdcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// Wire layout family selected by the major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    V1,
    V2,
}

/// Version learned from the first audio control header of a session.
///
/// Created once by [`crate::Session::get_or_create_version_context`] and never
/// mutated afterwards. An unsupported major version is kept so dependent
/// parsers can refuse with the right reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionContext {
    version: AdcVersion,
}

impl VersionContext {
    pub(crate) fn new(version: AdcVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> AdcVersion {
        self.version
    }

    pub fn major(&self) -> u8 {
        self.version.major
    }

    pub fn layout(&self) -> Result<Layout, DescriptorError> {
        self.version.layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_reads_decimal_not_hex() {
        assert_eq!(bcd44_to_dec(0x23).unwrap(), 23);
        assert_eq!(bcd44_to_dec(0x00).unwrap(), 0);
        assert_eq!(bcd44_to_dec(0x99).unwrap(), 99);
    }

    #[test]
    fn bcd_rejects_high_nibbles() {
        assert_eq!(
            bcd44_to_dec(0xa0).unwrap_err(),
            DescriptorError::BcdOutOfRange { value: 0xa0 }
        );
        assert!(bcd44_to_dec(0x0f).is_err());
        assert!(bcd44_to_dec(0xff).is_err());
    }

    #[test]
    fn adc_version_from_wire_word() {
        let v1 = AdcVersion::from_bcd(u16::from_le_bytes([0x00, 0x01])).unwrap();
        assert_eq!(v1, AdcVersion::new(1, 0));
        assert_eq!(v1.layout().unwrap(), Layout::V1);

        let v2 = AdcVersion::from_bcd(u16::from_le_bytes([0x00, 0x02])).unwrap();
        assert_eq!(v2.layout().unwrap(), Layout::V2);

        let odd = AdcVersion::from_bcd(0x0123).unwrap();
        assert_eq!(odd, AdcVersion::new(1, 23));
        assert!((odd.as_f64() - 1.23).abs() < 1e-9);
        assert_eq!(odd.to_string(), "1.23");
    }

    #[test]
    fn unknown_major_has_no_layout() {
        let version = AdcVersion::from_bcd(0x0300).unwrap();
        assert_eq!(
            version.layout().unwrap_err(),
            DescriptorError::UnsupportedVersion { major: 3 }
        );
        let context = VersionContext::new(version);
        assert_eq!(context.major(), 3);
        assert!(context.layout().is_err());
    }

    #[test]
    fn invalid_minor_nibble_rejects_word() {
        assert!(AdcVersion::from_bcd(0x010a).is_err());
        assert!(AdcVersion::from_bcd(0x1f00).is_err());
    }
}
