use crate::core::range::{bitfield_contains, bitfield_ids, VendorState};
use crate::core::{DataReader, FromDataReader};
use crate::sections::{decode_segment, DecodeError};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::str::FromStr;

const TCF_EU_V1_VERSION: u8 = 1;

// See https://github.com/InteractiveAdvertisingBureau/GDPR-Transparency-and-Consent-Framework/blob/master/Consent%20string%20and%20vendor%20list%20formats%20v1.1%20Final.md
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct TcfEuV1 {
    /// The string this record was decoded from, empty if it was read from raw bits.
    pub consent_string: String,
    /// Creation time, in milliseconds since the Unix epoch.
    pub created: u64,
    /// Last update time, in milliseconds since the Unix epoch.
    pub last_updated: u64,
    pub cmp_id: u16,
    pub cmp_version: u16,
    pub consent_screen: u8,
    pub consent_language: String,
    pub vendor_list_version: u16,
    /// Consent flags for purposes 1 to 24.
    pub purposes_allowed: Vec<bool>,
    pub max_vendor_id: u16,
    /// Consent of vendors not listed in a range encoded vendor section.
    /// Always `false` with bitfield encoding.
    pub default_consent: bool,
    pub vendor_consents: VendorState,
}

impl FromStr for TcfEuV1 {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = decode_segment(s)?;
        let mut tcf: Self = DataReader::new(&bits).parse()?;
        tcf.consent_string = s.to_string();
        Ok(tcf)
    }
}

impl FromDataReader for TcfEuV1 {
    type Err = DecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let version = r.read_fixed_integer(6)?;
        if version != TCF_EU_V1_VERSION {
            return Err(DecodeError::InvalidVersion {
                expected: TCF_EU_V1_VERSION,
                found: version,
            });
        }

        let created = r.read_datetime_as_millis()?;
        let last_updated = r.read_datetime_as_millis()?;
        let cmp_id = r.read_fixed_integer(12)?;
        let cmp_version = r.read_fixed_integer(12)?;
        let consent_screen = r.read_fixed_integer(6)?;
        let consent_language = r.read_string(2)?;
        let vendor_list_version = r.read_fixed_integer(12)?;
        let purposes_allowed = r.read_fixed_bitfield(24)?;
        let max_vendor_id = r.read_fixed_integer::<u16>(16)?;

        let is_range = r.read_bool()?;
        let (default_consent, vendor_consents) = if is_range {
            let default_consent = r.read_bool()?;
            (default_consent, VendorState::Range(r.read_range_section()?))
        } else {
            let bitfield = r.read_fixed_bitfield(max_vendor_id as usize)?;
            (false, VendorState::Bitfield(bitfield))
        };

        Ok(Self {
            consent_string: String::new(),
            created,
            last_updated,
            cmp_id,
            cmp_version,
            consent_screen,
            consent_language,
            vendor_list_version,
            purposes_allowed,
            max_vendor_id,
            default_consent,
            vendor_consents,
        })
    }
}

impl TcfEuV1 {
    pub fn is_purpose_consented(&self, purpose_id: u8) -> bool {
        bitfield_contains(&self.purposes_allowed, purpose_id as usize)
    }

    pub fn consented_purposes(&self) -> Vec<u8> {
        bitfield_ids(&self.purposes_allowed)
            .into_iter()
            .map(|id| id as u8)
            .collect()
    }

    /// Tests the consent of a vendor.
    ///
    /// With range encoding, listed vendors get the opposite of the default consent.
    pub fn is_vendor_consented(&self, vendor_id: u16) -> bool {
        match &self.vendor_consents {
            VendorState::Range(section) => section.contains(vendor_id) ^ self.default_consent,
            bitfield => bitfield.contains(vendor_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::range::{RangeEntry, RangeSection};
    use crate::core::tests::b;
    use crate::core::BitsError;
    use test_case::test_case;

    #[test]
    fn parse_bitfield() {
        let actual = TcfEuV1::from_str("BN5lERiOMYEdiAOAWeFRAAYAAaAAptQ").unwrap();
        let expected = TcfEuV1 {
            consent_string: "BN5lERiOMYEdiAOAWeFRAAYAAaAAptQ".to_string(),
            created: 1492466185800,
            last_updated: 1524002185800,
            cmp_id: 14,
            cmp_version: 22,
            consent_screen: 30,
            consent_language: "FR".to_string(),
            vendor_list_version: 0,
            purposes_allowed: (1..=24).map(|id| [2, 3, 20, 21, 23].contains(&id)).collect(),
            max_vendor_id: 10,
            default_consent: false,
            vendor_consents: VendorState::Bitfield(
                (1..=10).map(|id| [1, 2, 4, 5, 7, 9].contains(&id)).collect(),
            ),
        };

        assert_eq!(actual, expected);
        assert_eq!(actual.consented_purposes(), vec![2, 3, 20, 21, 23]);
    }

    #[test]
    fn parse_range() {
        let actual = TcfEuV1::from_str("BONZt-1ONZt-1AHABBENAO-AAAAHCAEAASABmADYAOAAeA").unwrap();

        assert_eq!(actual.cmp_id, 7);
        assert_eq!(actual.max_vendor_id, 112);
        assert!(!actual.default_consent);
        assert_eq!(
            actual.vendor_consents,
            VendorState::Range(RangeSection::new(vec![
                RangeEntry::Single(9),
                RangeEntry::Single(25),
                RangeEntry::Interval { start: 27, end: 28 },
                RangeEntry::Single(30),
            ]))
        );
    }

    #[test_case(0 => false)]
    #[test_case(1 => false)]
    #[test_case(2 => true)]
    #[test_case(21 => true)]
    #[test_case(24 => false)]
    #[test_case(25 => false)]
    fn purpose_consent(id: u8) -> bool {
        TcfEuV1::from_str("BN5lERiOMYEdiAOAWeFRAAYAAaAAptQ")
            .unwrap()
            .is_purpose_consented(id)
    }

    #[test_case(0 => false)]
    #[test_case(1 => true)]
    #[test_case(5 => true)]
    #[test_case(7 => true)]
    #[test_case(9 => true)]
    #[test_case(10 => false)]
    #[test_case(11 => false ; "beyond max vendor id")]
    fn vendor_consent_bitfield(id: u16) -> bool {
        TcfEuV1::from_str("BN5lERiOMYEdiAOAWeFRAAYAAaAAptQ")
            .unwrap()
            .is_vendor_consented(id)
    }

    #[test_case(1 => false)]
    #[test_case(3 => false)]
    #[test_case(225 => true)]
    #[test_case(515 => true)]
    #[test_case(5000 => true)]
    #[test_case(0 => false)]
    #[test_case(3244 => false)]
    fn vendor_consent_range_default_deny(id: u16) -> bool {
        TcfEuV1::from_str("BN5lERiOMYEdiAKAWXEND1HoSBE6CAFAApAMgBkIDIgM0AgOJxAnQA==")
            .unwrap()
            .is_vendor_consented(id)
    }

    #[test_case(9 => false ; "listed")]
    #[test_case(1 => true)]
    #[test_case(8 => true)]
    #[test_case(2011 => true)]
    fn vendor_consent_range_default_allow(id: u16) -> bool {
        TcfEuV1::from_str("BOEFEAyOEFEAyAHABDENAI4AAAB9vABAASA")
            .unwrap()
            .is_vendor_consented(id)
    }

    #[test_case(true => false ; "default consent")]
    #[test_case(false => true ; "default deny")]
    fn excluded_vendor_xor_default(default_consent: bool) -> bool {
        let record = TcfEuV1 {
            consent_string: String::new(),
            created: 0,
            last_updated: 0,
            cmp_id: 0,
            cmp_version: 0,
            consent_screen: 0,
            consent_language: "EN".to_string(),
            vendor_list_version: 0,
            purposes_allowed: vec![false; 24],
            max_vendor_id: 20,
            default_consent,
            vendor_consents: VendorState::Range(RangeSection::new(vec![RangeEntry::Interval {
                start: 1,
                end: 9,
            }])),
        };

        // vendor 5 is listed as an exception to the default
        record.is_vendor_consented(5)
    }

    #[test]
    fn missing_data() {
        let r = TcfEuV1::from_str("BN5lERiOMYEdiAOAWeFRAAYAAa");
        assert!(matches!(
            r.unwrap_err(),
            DecodeError::Bits(BitsError::OutOfRange { .. })
        ));
    }

    #[test]
    fn wrong_version() {
        let r = TcfEuV1::from_str("COvf4CzOvf4CzEqAiYENAPC4AAgAABIAAIAAASgAAQAAAFkQAQFkAAA");
        assert!(matches!(
            r.unwrap_err(),
            DecodeError::InvalidVersion {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn truncated_range_section() {
        // version 1, zeroed header, max vendor id 2, range encoding, one entry missing its id
        let bits = b(&format!("000001 {} 0000000000000010 1 0 000000000001 0", "0".repeat(150)));
        let r = DataReader::new(&bits).parse::<TcfEuV1>();
        assert!(matches!(
            r.unwrap_err(),
            DecodeError::Bits(BitsError::OutOfRange { .. })
        ));
    }
}
