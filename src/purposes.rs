//! Lookup tables for the purpose and special feature identifiers defined by each version of
//! the framework.
//!
//! Decoded records store purposes as plain numeric ids. The types in this module give names
//! to the known ids, and carry the schema version they belong to so that a purpose of one
//! version is never looked up in a record of another version.
//!
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
#[cfg(feature = "serde")]
use serde::Serialize;
use strum_macros::Display;

/// Purposes of version 1 of the framework.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum PurposeV1 {
    StorageAndAccess = 1,
    Personalization = 2,
    AdSelection = 3,
    ContentDelivery = 4,
    Measurement = 5,
    Undefined = 0,
}

/// Purposes of version 2 of the framework.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum PurposeV2 {
    StorageAndAccess = 1,
    BasicAds = 2,
    PersonalisedAdProfile = 3,
    PersonalisedAds = 4,
    PersonalisedContentProfile = 5,
    PersonalisedContent = 6,
    MeasureAds = 7,
    MeasureContent = 8,
    ApplyMarketResearch = 9,
    DevelopAndImprove = 10,
    Undefined = 0,
}

/// A purpose tied to the version of the framework that defines it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Purpose {
    V1(PurposeV1),
    V2(PurposeV2),
}

impl Purpose {
    /// The numeric id of this purpose, or `None` if it is undefined.
    pub fn id(&self) -> Option<u8> {
        let id = match self {
            Self::V1(p) => p.to_u8(),
            Self::V2(p) => p.to_u8(),
        };
        id.filter(|&id| id != 0)
    }

    /// The version of the framework defining this purpose.
    pub fn version(&self) -> u8 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
        }
    }
}

impl From<PurposeV1> for Purpose {
    fn from(p: PurposeV1) -> Self {
        Self::V1(p)
    }
}

impl From<PurposeV2> for Purpose {
    fn from(p: PurposeV2) -> Self {
        Self::V2(p)
    }
}

impl PurposeV1 {
    pub fn from_id(id: u8) -> Self {
        Self::from_u8(id).unwrap_or(Self::Undefined)
    }
}

impl PurposeV2 {
    pub fn from_id(id: u8) -> Self {
        Self::from_u8(id).unwrap_or(Self::Undefined)
    }
}

/// Special features of version 2 of the framework, which users opt in to.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SpecialFeature {
    Geolocation = 1,
    ScanDevice = 2,
    Undefined = 0,
}

impl SpecialFeature {
    pub fn from_id(id: u8) -> Self {
        Self::from_u8(id).unwrap_or(Self::Undefined)
    }

    /// The numeric id of this feature, or `None` if it is undefined.
    pub fn id(&self) -> Option<u8> {
        self.to_u8().filter(|&id| id != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Purpose::V1(PurposeV1::ContentDelivery) => Some(4))]
    #[test_case(Purpose::V2(PurposeV2::PersonalisedContentProfile) => Some(5))]
    #[test_case(Purpose::V2(PurposeV2::DevelopAndImprove) => Some(10))]
    #[test_case(Purpose::V1(PurposeV1::Undefined) => None)]
    fn purpose_id(p: Purpose) -> Option<u8> {
        p.id()
    }

    #[test]
    fn purpose_version() {
        assert_eq!(Purpose::from(PurposeV1::Measurement).version(), 1);
        assert_eq!(Purpose::from(PurposeV2::MeasureAds).version(), 2);
    }

    #[test_case(3 => PurposeV1::AdSelection)]
    #[test_case(6 => PurposeV1::Undefined)]
    #[test_case(0 => PurposeV1::Undefined)]
    fn purpose_v1_from_id(id: u8) -> PurposeV1 {
        PurposeV1::from_id(id)
    }

    #[test_case(7 => PurposeV2::MeasureAds)]
    #[test_case(11 => PurposeV2::Undefined)]
    fn purpose_v2_from_id(id: u8) -> PurposeV2 {
        PurposeV2::from_id(id)
    }

    #[test_case(1 => SpecialFeature::Geolocation)]
    #[test_case(2 => SpecialFeature::ScanDevice)]
    #[test_case(3 => SpecialFeature::Undefined)]
    fn special_feature_from_id(id: u8) -> SpecialFeature {
        SpecialFeature::from_id(id)
    }

    #[test]
    fn display() {
        assert_eq!(PurposeV2::BasicAds.to_string(), "BasicAds");
        assert_eq!(SpecialFeature::ScanDevice.to_string(), "ScanDevice");
    }
}
