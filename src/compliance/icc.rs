//! ICC profile header inspection.
//!
//! Only the fixed 128-byte header is read: enough to know the profile version,
//! device class and data colour space of an output intent.

use super::rules::DeviceColorSpace;
use super::types::{ConformanceLevel, ConformanceViolation, PdfAPart, RuleId};
use byteorder::{BigEndian, ByteOrder};

const HEADER_LEN: usize = 128;
const SIGNATURE: &[u8; 4] = b"acsp";

/// Profile/device class from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IccDeviceClass {
    /// `scnr`
    Input,
    /// `mntr`
    Display,
    /// `prtr`
    Output,
    /// `link`
    DeviceLink,
    /// `spac`
    ColorSpace,
    /// `abst`
    Abstract,
    /// `nmcl`
    NamedColor,
    /// Anything else
    Unknown([u8; 4]),
}

impl IccDeviceClass {
    fn from_signature(sig: [u8; 4]) -> Self {
        match &sig {
            b"scnr" => IccDeviceClass::Input,
            b"mntr" => IccDeviceClass::Display,
            b"prtr" => IccDeviceClass::Output,
            b"link" => IccDeviceClass::DeviceLink,
            b"spac" => IccDeviceClass::ColorSpace,
            b"abst" => IccDeviceClass::Abstract,
            b"nmcl" => IccDeviceClass::NamedColor,
            _ => IccDeviceClass::Unknown(sig),
        }
    }
}

/// A parsed ICC profile: the raw bytes plus the header fields we care about.
#[derive(Debug, Clone, PartialEq)]
pub struct IccProfile {
    data: bytes::Bytes,
    /// Major version (e.g. 2 or 4)
    pub major_version: u8,
    /// Minor version nibble
    pub minor_version: u8,
    /// Profile class
    pub device_class: IccDeviceClass,
    /// Data colour space signature, e.g. `RGB `
    pub color_space: [u8; 4],
}

impl IccProfile {
    /// Parse the header of `data`.
    ///
    /// Fails with `InvalidIccProfile` when the header is truncated, the
    /// `acsp` signature is missing or the declared size exceeds the data.
    pub fn parse(data: impl Into<bytes::Bytes>) -> Result<Self, ConformanceViolation> {
        let data: bytes::Bytes = data.into();
        let invalid = |detail: &str| ConformanceViolation::new(RuleId::InvalidIccProfile, None).with_detail(detail);

        if data.len() < HEADER_LEN {
            return Err(invalid("header is truncated"));
        }
        if &data[36..40] != SIGNATURE {
            return Err(invalid("missing acsp signature"));
        }
        let declared = BigEndian::read_u32(&data[0..4]) as usize;
        if declared > data.len() || declared < HEADER_LEN {
            return Err(invalid("declared size does not match data"));
        }

        let mut class = [0u8; 4];
        class.copy_from_slice(&data[12..16]);
        let mut color_space = [0u8; 4];
        color_space.copy_from_slice(&data[16..20]);

        Ok(Self {
            major_version: data[8],
            minor_version: data[9] >> 4,
            device_class: IccDeviceClass::from_signature(class),
            color_space,
            data,
        })
    }

    /// Raw profile bytes.
    pub fn data(&self) -> &bytes::Bytes {
        &self.data
    }

    /// Device colour space of the profile data, if it is Gray, RGB or CMYK.
    pub fn device_color_space(&self) -> Option<DeviceColorSpace> {
        match &self.color_space {
            b"GRAY" => Some(DeviceColorSpace::Gray),
            b"RGB " => Some(DeviceColorSpace::Rgb),
            b"CMYK" => Some(DeviceColorSpace::Cmyk),
            _ => None,
        }
    }

    /// Number of colour components (`N` of the ICCBased stream).
    pub fn components(&self) -> Option<usize> {
        self.device_color_space().map(|cs| cs.components())
    }

    /// Header checks that depend on the conformance level.
    pub fn validate(&self, level: ConformanceLevel, out: &mut Vec<ConformanceViolation>) {
        if !matches!(self.device_class, IccDeviceClass::Output | IccDeviceClass::Display) {
            out.push(
                ConformanceViolation::new(RuleId::IccProfileDeviceClassNotAllowed, None)
                    .with_detail(format_args!("{:?}", self.device_class)),
            );
        }
        let max_major = if level.part() == PdfAPart::Part1 { 2 } else { 4 };
        if self.major_version > max_major {
            out.push(
                ConformanceViolation::new(RuleId::IccProfileVersionNotAllowed, None)
                    .with_detail(format_args!("{}.{}", self.major_version, self.minor_version)),
            );
        }
        if self.device_color_space().is_none() {
            out.push(
                ConformanceViolation::new(RuleId::InvalidIccProfile, None)
                    .with_detail(String::from_utf8_lossy(&self.color_space).trim_end().to_string()),
            );
        }
    }

    /// Build a minimal header-only profile. Useful for tests and placeholders.
    pub fn synthetic(class: &[u8; 4], color_space: &[u8; 4], major_version: u8) -> Self {
        let mut data = vec![0u8; HEADER_LEN];
        BigEndian::write_u32(&mut data[0..4], HEADER_LEN as u32);
        data[8] = major_version;
        data[12..16].copy_from_slice(class);
        data[16..20].copy_from_slice(color_space);
        data[20..24].copy_from_slice(b"XYZ ");
        data[36..40].copy_from_slice(SIGNATURE);
        Self {
            data: bytes::Bytes::from(data),
            major_version,
            minor_version: 0,
            device_class: IccDeviceClass::from_signature(*class),
            color_space: *color_space,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_synthetic() {
        let built = IccProfile::synthetic(b"mntr", b"RGB ", 2);
        let parsed = IccProfile::parse(built.data().clone()).unwrap();
        assert_eq!(parsed, built);
        assert_eq!(parsed.device_class, IccDeviceClass::Display);
        assert_eq!(parsed.device_color_space(), Some(DeviceColorSpace::Rgb));
        assert_eq!(parsed.components(), Some(3));
    }

    #[test]
    fn test_rejects_truncated_or_unsigned() {
        let err = IccProfile::parse(vec![0u8; 64]).unwrap_err();
        assert_eq!(err.rule, RuleId::InvalidIccProfile);

        let mut data = IccProfile::synthetic(b"prtr", b"CMYK", 2).data().to_vec();
        data[36] = b'x';
        assert!(IccProfile::parse(data).is_err());
    }

    #[test]
    fn test_rejects_oversized_declaration() {
        let mut data = IccProfile::synthetic(b"prtr", b"CMYK", 2).data().to_vec();
        BigEndian::write_u32(&mut data[0..4], 4096);
        assert!(IccProfile::parse(data).is_err());
    }

    #[test]
    fn test_validate_by_level() {
        let v4 = IccProfile::synthetic(b"prtr", b"CMYK", 4);
        let mut out = Vec::new();
        v4.validate(ConformanceLevel::A2b, &mut out);
        assert!(out.is_empty());
        v4.validate(ConformanceLevel::A1b, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rule, RuleId::IccProfileVersionNotAllowed);

        let input = IccProfile::synthetic(b"scnr", b"Lab ", 2);
        let mut out = Vec::new();
        input.validate(ConformanceLevel::A2b, &mut out);
        let rules: Vec<RuleId> = out.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![RuleId::IccProfileDeviceClassNotAllowed, RuleId::InvalidIccProfile]);
    }
}
