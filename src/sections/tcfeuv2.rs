use crate::core::range::{bitfield_contains, bitfield_ids, RangeSection, VendorState};
use crate::core::{DataReader, FromDataReader};
use crate::sections::{DecodeError, OptionalSegmentParser, SegmentType, SegmentedStr};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::str::FromStr;
use strum_macros::Display;

const TCF_EU_V2_VERSION: u8 = 2;

// See https://github.com/InteractiveAdvertisingBureau/GDPR-Transparency-and-Consent-Framework/blob/master/TCFv2/IAB%20Tech%20Lab%20-%20Consent%20string%20and%20vendor%20list%20formats%20v2.md
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct TcfEuV2 {
    /// The string this record was decoded from, empty if it was read from raw bits.
    pub consent_string: String,
    pub core: Core,
    pub disclosed_vendors: Option<VendorState>,
    pub allowed_vendors: Option<VendorState>,
    pub publisher_tc: Option<PublisherTc>,
}

impl FromStr for TcfEuV2 {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tcf: Self = s.parse_segmented_str()?;
        tcf.consent_string = s.to_string();
        Ok(tcf)
    }
}

impl FromDataReader for TcfEuV2 {
    type Err = DecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        Ok(Self {
            consent_string: String::new(),
            core: r.parse()?,
            disclosed_vendors: None,
            allowed_vendors: None,
            publisher_tc: None,
        })
    }
}

impl OptionalSegmentParser for TcfEuV2 {
    fn parse_optional_segment(
        segment_type: SegmentType,
        r: &mut DataReader,
        into: &mut Self,
    ) -> Result<(), DecodeError> {
        match segment_type {
            SegmentType::DisclosedVendors => {
                into.disclosed_vendors = Some(r.read_vendor_state()?);
            }
            SegmentType::AllowedVendors => {
                into.allowed_vendors = Some(r.read_vendor_state()?);
            }
            SegmentType::PublisherTc => {
                into.publisher_tc = Some(r.parse()?);
            }
            SegmentType::Core | SegmentType::Unknown => {
                tracing::trace!(%segment_type, "skipping segment");
            }
        }
        Ok(())
    }
}

impl TcfEuV2 {
    pub fn is_purpose_consented(&self, purpose_id: u8) -> bool {
        bitfield_contains(&self.core.purpose_consents, purpose_id as usize)
    }

    pub fn consented_purposes(&self) -> Vec<u8> {
        bitfield_ids(&self.core.purpose_consents)
            .into_iter()
            .map(|id| id as u8)
            .collect()
    }

    pub fn is_purpose_legit_interest_established(&self, purpose_id: u8) -> bool {
        bitfield_contains(&self.core.purpose_legitimate_interests, purpose_id as usize)
    }

    pub fn is_special_feature_opted_in(&self, feature_id: u8) -> bool {
        bitfield_contains(&self.core.special_feature_optins, feature_id as usize)
    }

    /// Purpose one is disclosed unless the publisher applied a specific treatment to it.
    pub fn is_purpose_one_disclosed(&self) -> bool {
        !self.core.purpose_one_treatment
    }

    pub fn is_vendor_consented(&self, vendor_id: u16) -> bool {
        self.core.vendor_consents.contains(vendor_id)
    }

    pub fn is_vendor_legit_interest_established(&self, vendor_id: u16) -> bool {
        self.core.vendor_legitimate_interests.contains(vendor_id)
    }

    pub fn is_vendor_disclosed(&self, vendor_id: u16) -> bool {
        self.disclosed_vendors
            .as_ref()
            .is_some_and(|v| v.contains(vendor_id))
    }

    pub fn is_vendor_allowed(&self, vendor_id: u16) -> bool {
        self.allowed_vendors
            .as_ref()
            .is_some_and(|v| v.contains(vendor_id))
    }

    pub fn is_publisher_purpose_consented(&self, purpose_id: u8) -> bool {
        self.publisher_tc
            .as_ref()
            .is_some_and(|p| bitfield_contains(&p.purpose_consents, purpose_id as usize))
    }

    pub fn is_publisher_purpose_legit_interest_established(&self, purpose_id: u8) -> bool {
        self.publisher_tc.as_ref().is_some_and(|p| {
            bitfield_contains(&p.purpose_legitimate_interests, purpose_id as usize)
        })
    }

    pub fn is_custom_purpose_consented(&self, purpose_id: u8) -> bool {
        self.publisher_tc
            .as_ref()
            .is_some_and(|p| bitfield_contains(&p.custom_purpose_consents, purpose_id as usize))
    }

    pub fn is_custom_purpose_legit_interest_established(&self, purpose_id: u8) -> bool {
        self.publisher_tc.as_ref().is_some_and(|p| {
            bitfield_contains(&p.custom_purpose_legitimate_interests, purpose_id as usize)
        })
    }

    /// Returns the restriction a publisher placed on a vendor for a given purpose, if any.
    ///
    /// If several restrictions match, the first one listed in the string is returned.
    pub fn vendor_restriction(&self, purpose_id: u8, vendor_id: u16) -> Option<RestrictionType> {
        self.core
            .publisher_restrictions
            .iter()
            .find(|r| r.purpose_id == purpose_id && r.applies_to(vendor_id))
            .map(|r| r.restriction_type)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct Core {
    /// Creation time, in milliseconds since the Unix epoch.
    pub created: u64,
    /// Last update time, in milliseconds since the Unix epoch.
    pub last_updated: u64,
    pub cmp_id: u16,
    pub cmp_version: u16,
    pub consent_screen: u8,
    pub consent_language: String,
    pub vendor_list_version: u16,
    pub policy_version: u8,
    pub is_service_specific: bool,
    pub use_non_standard_stacks: bool,
    pub special_feature_optins: Vec<bool>,
    pub purpose_consents: Vec<bool>,
    pub purpose_legitimate_interests: Vec<bool>,
    pub purpose_one_treatment: bool,
    pub publisher_country_code: String,
    pub vendor_consents: VendorState,
    pub vendor_legitimate_interests: VendorState,
    pub publisher_restrictions: Vec<PublisherRestriction>,
}

impl FromDataReader for Core {
    type Err = DecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let version = r.read_fixed_integer(6)?;
        if version != TCF_EU_V2_VERSION {
            return Err(DecodeError::InvalidVersion {
                expected: TCF_EU_V2_VERSION,
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
        let policy_version = r.read_fixed_integer(6)?;
        let is_service_specific = r.read_bool()?;
        let use_non_standard_stacks = r.read_bool()?;
        let special_feature_optins = r.read_fixed_bitfield(12)?;
        let purpose_consents = r.read_fixed_bitfield(24)?;
        let purpose_legitimate_interests = r.read_fixed_bitfield(24)?;
        let purpose_one_treatment = r.read_bool()?;
        let publisher_country_code = r.read_string(2)?;
        let vendor_consents = r.read_vendor_state()?;
        let vendor_legitimate_interests = r.read_vendor_state()?;
        let publisher_restrictions = parse_publisher_restrictions(r)?;

        Ok(Self {
            created,
            last_updated,
            cmp_id,
            cmp_version,
            consent_screen,
            consent_language,
            vendor_list_version,
            policy_version,
            is_service_specific,
            use_non_standard_stacks,
            special_feature_optins,
            purpose_consents,
            purpose_legitimate_interests,
            purpose_one_treatment,
            publisher_country_code,
            vendor_consents,
            vendor_legitimate_interests,
            publisher_restrictions,
        })
    }
}

fn parse_publisher_restrictions(
    r: &mut DataReader,
) -> Result<Vec<PublisherRestriction>, DecodeError> {
    let n = r.read_fixed_integer::<u16>(12)?;
    (0..n).map(|_| r.parse::<PublisherRestriction>()).collect()
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PublisherRestriction {
    pub purpose_id: u8,
    pub restriction_type: RestrictionType,
    pub restricted_vendor_ids: RangeSection,
}

impl PublisherRestriction {
    pub fn applies_to(&self, vendor_id: u16) -> bool {
        self.restricted_vendor_ids.contains(vendor_id)
    }
}

impl FromDataReader for PublisherRestriction {
    type Err = DecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let purpose_id = r.read_fixed_integer(6)?;
        let restriction_type = RestrictionType::from_u8(r.read_fixed_integer(2)?)
            .unwrap_or(RestrictionType::Undefined);
        let restricted_vendor_ids = r.read_range_section()?;

        Ok(Self {
            purpose_id,
            restriction_type,
            restricted_vendor_ids,
        })
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RestrictionType {
    NotAllowed = 0,
    RequireConsent = 1,
    RequireLegitimateInterest = 2,
    Undefined = 3,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub struct PublisherTc {
    pub purpose_consents: Vec<bool>,
    pub purpose_legitimate_interests: Vec<bool>,
    pub custom_purpose_consents: Vec<bool>,
    pub custom_purpose_legitimate_interests: Vec<bool>,
}

impl FromDataReader for PublisherTc {
    type Err = DecodeError;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err> {
        let purpose_consents = r.read_fixed_bitfield(24)?;
        let purpose_legitimate_interests = r.read_fixed_bitfield(24)?;
        let custom_purposes_num = r.read_fixed_integer::<u8>(6)? as usize;
        let custom_purpose_consents = r.read_fixed_bitfield(custom_purposes_num)?;
        let custom_purpose_legitimate_interests = r.read_fixed_bitfield(custom_purposes_num)?;

        Ok(Self {
            purpose_consents,
            purpose_legitimate_interests,
            custom_purpose_consents,
            custom_purpose_legitimate_interests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::range::RangeEntry;
    use crate::core::BitsError;
    use test_case::test_case;

    const DISCLOSED_VENDORS: &str = "IFoEUQQgAIQwgIwQABAEAAAAOIAACAIAAAAQAIAgEAACEAAAAAgAQBAAAAAAAGBAAgAAAAAAAFAAECAAAgAAQARAEQAAAAAJAAIAAgAAAYQEAAAQmAgBC3ZAYzUw";
    const DISCLOSED_VENDOR_IDS: [u16; 79] = [
        2, 6, 8, 12, 18, 23, 37, 42, 47, 48, 53, 61, 65, 66, 72, 88, 98, 127, 128, 129, 133, 153,
        163, 192, 205, 215, 224, 243, 248, 281, 294, 304, 350, 351, 358, 371, 422, 424, 440, 447,
        467, 486, 498, 502, 512, 516, 553, 556, 571, 587, 612, 613, 618, 626, 648, 653, 656, 657,
        665, 676, 681, 683, 684, 686, 687, 688, 690, 691, 694, 702, 703, 707, 708, 711, 712, 714,
        716, 719, 720,
    ];

    fn flags(len: usize, ids: &[usize]) -> Vec<bool> {
        (1..=len).map(|id| ids.contains(&id)).collect()
    }

    #[test]
    fn core_only() {
        let actual = TcfEuV2::from_str("COvf4CzOvf4CzEqAiYENAPC4AAgAABIAAIAAASgAAQAAAFkQAQFkAAA")
            .unwrap();
        let expected = TcfEuV2 {
            consent_string: "COvf4CzOvf4CzEqAiYENAPC4AAgAABIAAIAAASgAAQAAAFkQAQFkAAA".to_string(),
            core: Core {
                created: 1582927070700,
                last_updated: 1582927070700,
                cmp_id: 298,
                cmp_version: 34,
                consent_screen: 24,
                consent_language: "EN".to_string(),
                vendor_list_version: 15,
                policy_version: 2,
                is_service_specific: true,
                use_non_standard_stacks: true,
                special_feature_optins: flags(12, &[1]),
                purpose_consents: flags(24, &[5]),
                purpose_legitimate_interests: flags(24, &[4, 7]),
                purpose_one_treatment: true,
                publisher_country_code: "AA".to_string(),
                vendor_consents: VendorState::Bitfield(flags(37, &[18])),
                vendor_legitimate_interests: VendorState::Range(RangeSection::new(vec![
                    RangeEntry::Single(712),
                ])),
                publisher_restrictions: vec![],
            },
            disclosed_vendors: None,
            allowed_vendors: None,
            publisher_tc: None,
        };

        assert_eq!(actual, expected);
    }

    #[test]
    fn core_queries() {
        let tcf = TcfEuV2::from_str("COvf4CzOvf4CzEqAiYENAPC4AAgAABIAAIAAASgAAQAAAFkQAQFkAAA")
            .unwrap();

        assert!(tcf.is_vendor_consented(18));
        assert!(!tcf.is_vendor_consented(12));
        assert!(tcf.is_purpose_consented(5));
        assert!(!tcf.is_purpose_consented(4));
        assert_eq!(tcf.consented_purposes(), vec![5]);
        assert!(tcf.is_vendor_legit_interest_established(712));
        assert!(!tcf.is_vendor_legit_interest_established(714));
        assert!(tcf.is_purpose_legit_interest_established(4));
        assert!(tcf.is_purpose_legit_interest_established(7));
        assert!(!tcf.is_purpose_legit_interest_established(6));
        assert!(!tcf.is_purpose_one_disclosed());
        assert!(tcf.core.purpose_one_treatment);
        assert!(tcf.is_special_feature_opted_in(1));
        assert!(!tcf.is_special_feature_opted_in(2));
        assert!(!tcf.is_vendor_disclosed(18));
        assert!(!tcf.is_vendor_allowed(18));
        assert!(!tcf.is_publisher_purpose_consented(1));
    }

    #[test_case(2 => true)]
    #[test_case(6 => true)]
    #[test_case(12 => true)]
    #[test_case(23 => true)]
    #[test_case(42 => true)]
    #[test_case(43 => false)]
    #[test_case(721 => false ; "beyond max vendor id")]
    fn disclosed_vendors(id: u16) -> bool {
        TcfEuV2::from_str(&format!(
            "COvouH3OvouH3IyAAAENAPCAAAAAAAAAAAAAAAAAAAAA.{DISCLOSED_VENDORS}"
        ))
        .unwrap()
        .is_vendor_disclosed(id)
    }

    #[test_case(708 => true)]
    #[test_case(711 => true)]
    #[test_case(712 => true)]
    #[test_case(714 => true)]
    #[test_case(716 => true)]
    #[test_case(713 => false)]
    #[test_case(719 => false)]
    fn allowed_vendors(id: u16) -> bool {
        TcfEuV2::from_str(&format!(
            "COvf4CzOvf4CzEqAiYENAPCYAAgAABIAAIAAASgAAQAAAFkQAQFkAAA.{DISCLOSED_VENDORS}.QFmQBAFiQLHAsgBZQCzA"
        ))
        .unwrap()
        .is_vendor_allowed(id)
    }

    #[test]
    fn with_allowed_vendors() {
        let actual = TcfEuV2::from_str(&format!(
            "COvf4CzOvf4CzEqAiYENAPCYAAgAABIAAIAAASgAAQAAAFkQAQFkAAA.{DISCLOSED_VENDORS}.QFmQBAFiQLHAsgBZQCzA"
        ))
        .unwrap();

        assert!(!actual.core.is_service_specific);
        assert_eq!(
            actual.allowed_vendors,
            Some(VendorState::Range(RangeSection::new(vec![
                RangeEntry::Single(708),
                RangeEntry::Interval {
                    start: 711,
                    end: 712
                },
                RangeEntry::Single(714),
                RangeEntry::Single(716),
            ])))
        );
        assert_eq!(
            actual.disclosed_vendors,
            Some(VendorState::Bitfield(flags(
                720,
                &DISCLOSED_VENDOR_IDS.map(usize::from)
            )))
        );
    }

    #[test_case("COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.ZAAgH9794ulA" ; "publisher tc only")]
    #[test_case("COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.ZAAgH9794ulA.IFoEUQQgAIQwgIwQABAEAAAAOIAACAIAAAAQAIAgEAACEAAAAAgAQBAAAAAAAGBAAgAAAAAAAFAAECAAAgAAQARAEQAAAAAJAAIAAgAAAYQEAAAQmAgBC3ZAYzUw" ; "publisher tc first")]
    #[test_case("COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.IFoEUQQgAIQwgIwQABAEAAAAOIAACAIAAAAQAIAgEAACEAAAAAgAQBAAAAAAAGBAAgAAAAAAAFAAECAAAgAAQARAEQAAAAAJAAIAAgAAAYQEAAAQmAgBC3ZAYzUw.ZAAgH9794ulA" ; "disclosed vendors first")]
    fn with_publisher_tc(s: &str) {
        let actual = TcfEuV2::from_str(s).unwrap();

        assert_eq!(actual.core.purpose_consents, flags(24, &[1, 2, 3]));
        assert_eq!(
            actual.core.vendor_consents,
            VendorState::Bitfield(flags(8, &[2, 6, 8]))
        );
        assert_eq!(
            actual.publisher_tc,
            Some(PublisherTc {
                purpose_consents: flags(24, &[3, 16]),
                purpose_legitimate_interests: flags(
                    24,
                    &[1, 2, 3, 4, 5, 6, 7, 9, 10, 11, 12, 14, 15, 16, 17, 18, 19, 21, 22, 23, 24]
                ),
                custom_purpose_consents: flags(5, &[1, 2, 4]),
                custom_purpose_legitimate_interests: flags(5, &[2, 4]),
            })
        );

        assert!(actual.is_publisher_purpose_consented(16));
        assert!(!actual.is_publisher_purpose_consented(15));
        assert!(actual.is_publisher_purpose_legit_interest_established(24));
        assert!(!actual.is_publisher_purpose_legit_interest_established(8));
        assert!(actual.is_custom_purpose_consented(4));
        assert!(!actual.is_custom_purpose_consented(3));
        assert!(!actual.is_custom_purpose_consented(6));
        assert!(actual.is_custom_purpose_legit_interest_established(2));
        assert!(!actual.is_custom_purpose_legit_interest_established(1));
    }

    #[test]
    fn with_publisher_restrictions() {
        let actual = TcfEuV2::from_str("COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAEEgBAAIgAUABg4ACACA")
            .unwrap();

        assert_eq!(
            actual.core.publisher_restrictions,
            vec![
                PublisherRestriction {
                    purpose_id: 2,
                    restriction_type: RestrictionType::RequireConsent,
                    restricted_vendor_ids: RangeSection::new(vec![
                        RangeEntry::Single(8),
                        RangeEntry::Interval { start: 10, end: 12 },
                    ]),
                },
                PublisherRestriction {
                    purpose_id: 7,
                    restriction_type: RestrictionType::NotAllowed,
                    restricted_vendor_ids: RangeSection::new(vec![RangeEntry::Single(32)]),
                },
            ]
        );

        assert_eq!(
            actual.vendor_restriction(2, 11),
            Some(RestrictionType::RequireConsent)
        );
        assert_eq!(
            actual.vendor_restriction(7, 32),
            Some(RestrictionType::NotAllowed)
        );
        assert_eq!(actual.vendor_restriction(2, 9), None);
        assert_eq!(actual.vendor_restriction(3, 8), None);
    }

    #[test]
    fn unknown_segment_is_skipped() {
        let actual = TcfEuV2::from_str(
            "COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAEEgBAAIgAUABg4ACACA.QAUQAgACwAUACg.tQ",
        )
        .unwrap();

        assert!(actual.is_vendor_allowed(5));
        assert!(actual.is_vendor_allowed(33));
        assert!(!actual.is_vendor_allowed(6));
        assert_eq!(actual.disclosed_vendors, None);
        assert_eq!(actual.publisher_tc, None);
    }

    #[test_case("COvf4CzOvf4CzEqAiYENAPC4AAgAABIAAIAAASgAAQAAAFkQAQFkAAA" => false ; "treatment applied")]
    #[test_case("COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA" => true ; "no treatment")]
    #[test_case("COvouH3OvouH3IyAAAENAPCAAAAAAAAAAAAAAAAAAAAA" => true ; "empty core")]
    fn purpose_one_disclosed(s: &str) -> bool {
        let tcf = TcfEuV2::from_str(s).unwrap();
        assert_eq!(tcf.is_purpose_one_disclosed(), !tcf.core.purpose_one_treatment);
        tcf.is_purpose_one_disclosed()
    }

    #[test]
    fn keeps_consent_string() {
        let s = "COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.ZAAgH9794ulA";
        assert_eq!(TcfEuV2::from_str(s).unwrap().consent_string, s);
    }

    #[test_case(0 => RestrictionType::NotAllowed)]
    #[test_case(1 => RestrictionType::RequireConsent)]
    #[test_case(2 => RestrictionType::RequireLegitimateInterest)]
    #[test_case(3 => RestrictionType::Undefined)]
    fn restriction_type(n: u8) -> RestrictionType {
        RestrictionType::from_u8(n).unwrap_or(RestrictionType::Undefined)
    }

    #[test_case("CPX" => matches DecodeError::Bits(BitsError::OutOfRange { .. }) ; "truncated")]
    #[test_case("" => matches DecodeError::Bits(BitsError::OutOfRange { .. }) ; "empty string")]
    #[test_case("BN5lERiOMYEdiAOAWeFRAAYAAaAAptQ" => matches DecodeError::InvalidVersion { expected: 2, found: 1 } ; "version 1 string")]
    #[test_case("ZAAgH9794ulA" => matches DecodeError::InvalidVersion { .. } ; "publisher tc only")]
    #[test_case("COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.ZAA" => matches DecodeError::Bits(BitsError::OutOfRange { .. }) ; "truncated publisher tc")]
    #[test_case("COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAAA.ZAAgH9794ulA!" => matches DecodeError::Base64(_) ; "invalid character")]
    fn error(s: &str) -> DecodeError {
        TcfEuV2::from_str(s).unwrap_err()
    }
}
