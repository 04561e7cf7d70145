//! A single entry point to decode consent strings of any supported version.
//!
//! [`ConsentRecord::decode`] never fails: strings that cannot be fully decoded are mapped
//! to a stub record which consents to nothing. Use [`ConsentRecord::try_decode`] to observe
//! the cause of a failure instead.
//!
use crate::purposes::{Purpose, SpecialFeature};
use crate::sections::tcfeuv1::TcfEuV1;
use crate::sections::tcfeuv2::{PublisherRestriction, RestrictionType, TcfEuV2};
use crate::sections::{peek_version, DecodeError};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A decoded consent string.
///
/// Queries are uniform across versions: fields a version does not define take zero or
/// empty values, and membership tests of such fields return `false`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
pub enum ConsentRecord {
    V1(TcfEuV1),
    V2(TcfEuV2),
    /// Stands in for a string that could not be decoded.
    Stub(Stub),
}

/// The record returned in place of a string that could not be decoded.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Stub {
    /// Time of the decoding attempt, in milliseconds since the Unix epoch.
    pub decoded_at: u64,
}

impl Stub {
    pub fn now() -> Self {
        let decoded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_millis()).ok())
            .unwrap_or_default();
        Self { decoded_at }
    }
}

/// Decodes a consent string, falling back to a stub record on failure.
///
/// Shorthand for [`ConsentRecord::decode`].
pub fn decode(s: &str) -> ConsentRecord {
    ConsentRecord::decode(s)
}

impl FromStr for ConsentRecord {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_decode(s)
    }
}

impl ConsentRecord {
    /// Decodes a consent string of any supported version.
    ///
    /// Any failure results in a [`ConsentRecord::Stub`], whose version is 0 and whose
    /// timestamps are set to the current time.
    pub fn decode(s: &str) -> Self {
        Self::try_decode(s).unwrap_or_else(|error| {
            tracing::debug!(%error, "unable to decode consent string, using stub");
            Self::Stub(Stub::now())
        })
    }

    /// Decodes a consent string of any supported version, returning the first error met.
    pub fn try_decode(s: &str) -> Result<Self, DecodeError> {
        match peek_version(s)? {
            1 => Ok(Self::V1(s.parse()?)),
            2 => Ok(Self::V2(s.parse()?)),
            v => Err(DecodeError::UnsupportedVersion(v)),
        }
    }

    /// The string this record was decoded from, `None` for a stub.
    pub fn consent_string(&self) -> Option<&str> {
        match self {
            Self::V1(tcf) => Some(&tcf.consent_string),
            Self::V2(tcf) => Some(&tcf.consent_string),
            Self::Stub(_) => None,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub(_))
    }

    /// Version of the decoded string, 0 for a stub.
    pub fn version(&self) -> u8 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
            Self::Stub(_) => 0,
        }
    }

    pub fn created(&self) -> u64 {
        match self {
            Self::V1(tcf) => tcf.created,
            Self::V2(tcf) => tcf.core.created,
            Self::Stub(stub) => stub.decoded_at,
        }
    }

    pub fn last_updated(&self) -> u64 {
        match self {
            Self::V1(tcf) => tcf.last_updated,
            Self::V2(tcf) => tcf.core.last_updated,
            Self::Stub(stub) => stub.decoded_at,
        }
    }

    pub fn cmp_id(&self) -> u16 {
        match self {
            Self::V1(tcf) => tcf.cmp_id,
            Self::V2(tcf) => tcf.core.cmp_id,
            Self::Stub(_) => 0,
        }
    }

    pub fn cmp_version(&self) -> u16 {
        match self {
            Self::V1(tcf) => tcf.cmp_version,
            Self::V2(tcf) => tcf.core.cmp_version,
            Self::Stub(_) => 0,
        }
    }

    pub fn consent_screen(&self) -> u8 {
        match self {
            Self::V1(tcf) => tcf.consent_screen,
            Self::V2(tcf) => tcf.core.consent_screen,
            Self::Stub(_) => 0,
        }
    }

    /// Two letter ISO 639-1 language code, empty for a stub.
    pub fn consent_language(&self) -> &str {
        match self {
            Self::V1(tcf) => &tcf.consent_language,
            Self::V2(tcf) => &tcf.core.consent_language,
            Self::Stub(_) => "",
        }
    }

    pub fn vendor_list_version(&self) -> u16 {
        match self {
            Self::V1(tcf) => tcf.vendor_list_version,
            Self::V2(tcf) => tcf.core.vendor_list_version,
            Self::Stub(_) => 0,
        }
    }

    pub fn is_purpose_consented(&self, purpose_id: u8) -> bool {
        match self {
            Self::V1(tcf) => tcf.is_purpose_consented(purpose_id),
            Self::V2(tcf) => tcf.is_purpose_consented(purpose_id),
            Self::Stub(_) => false,
        }
    }

    /// Tests the consent to a named purpose.
    ///
    /// A purpose defined by another version than the one of this record is never consented.
    pub fn is_purpose_consented_ref(&self, purpose: impl Into<Purpose>) -> bool {
        self.purpose_id_for(purpose.into())
            .is_some_and(|id| self.is_purpose_consented(id))
    }

    /// Ids of the consented purposes, in ascending order.
    pub fn consented_purposes(&self) -> Vec<u8> {
        match self {
            Self::V1(tcf) => tcf.consented_purposes(),
            Self::V2(tcf) => tcf.consented_purposes(),
            Self::Stub(_) => vec![],
        }
    }

    pub fn is_vendor_consented(&self, vendor_id: u16) -> bool {
        match self {
            Self::V1(tcf) => tcf.is_vendor_consented(vendor_id),
            Self::V2(tcf) => tcf.is_vendor_consented(vendor_id),
            Self::Stub(_) => false,
        }
    }

    pub fn tcf_policy_version(&self) -> u8 {
        self.v2().map_or(0, |tcf| tcf.core.policy_version)
    }

    pub fn is_service_specific(&self) -> bool {
        self.v2().is_some_and(|tcf| tcf.core.is_service_specific)
    }

    pub fn use_non_standard_stacks(&self) -> bool {
        self.v2().is_some_and(|tcf| tcf.core.use_non_standard_stacks)
    }

    pub fn is_feature_opted_in(&self, feature_id: u8) -> bool {
        self.v2()
            .is_some_and(|tcf| tcf.is_special_feature_opted_in(feature_id))
    }

    pub fn is_special_feature_opted_in(&self, feature: SpecialFeature) -> bool {
        feature.id().is_some_and(|id| self.is_feature_opted_in(id))
    }

    pub fn is_purpose_legit_interest_established(&self, purpose_id: u8) -> bool {
        self.v2()
            .is_some_and(|tcf| tcf.is_purpose_legit_interest_established(purpose_id))
    }

    pub fn is_purpose_legit_interest_established_ref(&self, purpose: impl Into<Purpose>) -> bool {
        self.purpose_id_for(purpose.into())
            .is_some_and(|id| self.is_purpose_legit_interest_established(id))
    }

    pub fn is_purpose_one_disclosed(&self) -> bool {
        self.v2().is_some_and(|tcf| tcf.is_purpose_one_disclosed())
    }

    /// Two letter ISO 3166-1 alpha-2 country code of the publisher, empty before version 2.
    pub fn publisher_country_code(&self) -> &str {
        self.v2()
            .map_or("", |tcf| tcf.core.publisher_country_code.as_str())
    }

    pub fn is_vendor_legit_interest_established(&self, vendor_id: u16) -> bool {
        self.v2()
            .is_some_and(|tcf| tcf.is_vendor_legit_interest_established(vendor_id))
    }

    pub fn is_vendor_disclosed(&self, vendor_id: u16) -> bool {
        self.v2().is_some_and(|tcf| tcf.is_vendor_disclosed(vendor_id))
    }

    pub fn is_vendor_allowed(&self, vendor_id: u16) -> bool {
        self.v2().is_some_and(|tcf| tcf.is_vendor_allowed(vendor_id))
    }

    pub fn is_publisher_purpose_consented(&self, purpose_id: u8) -> bool {
        self.v2()
            .is_some_and(|tcf| tcf.is_publisher_purpose_consented(purpose_id))
    }

    pub fn is_publisher_purpose_legit_interest_established(&self, purpose_id: u8) -> bool {
        self.v2()
            .is_some_and(|tcf| tcf.is_publisher_purpose_legit_interest_established(purpose_id))
    }

    pub fn is_custom_purpose_consented(&self, purpose_id: u8) -> bool {
        self.v2()
            .is_some_and(|tcf| tcf.is_custom_purpose_consented(purpose_id))
    }

    pub fn is_custom_purpose_legit_interest_established(&self, purpose_id: u8) -> bool {
        self.v2()
            .is_some_and(|tcf| tcf.is_custom_purpose_legit_interest_established(purpose_id))
    }

    pub fn publisher_restrictions(&self) -> &[PublisherRestriction] {
        self.v2()
            .map(|tcf| tcf.core.publisher_restrictions.as_slice())
            .unwrap_or_default()
    }

    pub fn vendor_restriction(&self, purpose_id: u8, vendor_id: u16) -> Option<RestrictionType> {
        self.v2()
            .and_then(|tcf| tcf.vendor_restriction(purpose_id, vendor_id))
    }

    fn v2(&self) -> Option<&TcfEuV2> {
        match self {
            Self::V2(tcf) => Some(tcf),
            _ => None,
        }
    }

    fn purpose_id_for(&self, purpose: Purpose) -> Option<u8> {
        if purpose.version() == self.version() {
            purpose.id()
        } else {
            None
        }
    }
}
