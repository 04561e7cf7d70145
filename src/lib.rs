//! This crate is a decoder for the consent strings of the IAB Europe
//! [Transparency & Consent Framework](https://github.com/InteractiveAdvertisingBureau/GDPR-Transparency-and-Consent-Framework)
//! (TCF), versions 1.1 and 2.
//!
//! NOTE: This is not an official IAB library.
//!
//! # Decoding consent strings
//!
//! A consent string is a URL-safe base64 token. Version 2 strings are made of a mandatory
//! core segment, optionally followed by other segments separated by `.` characters.
//!
//! The [`ConsentRecord`](consent/enum.ConsentRecord.html) type decodes strings of any
//! supported version, and answers the same queries for all of them.
//!
//! ```
//! use iab_tcf::ConsentRecord;
//!
//! let s = "COvf4CzOvf4CzEqAiYENAPC4AAgAABIAAIAAASgAAQAAAFkQAQFkAAA";
//! let record = ConsentRecord::decode(s);
//!
//! assert_eq!(record.version(), 2);
//! assert_eq!(record.cmp_id(), 298);
//! assert_eq!(record.consent_language(), "EN");
//!
//! // does the user consent to purpose 5 (personalised content profile)?
//! assert!(record.is_purpose_consented(5));
//!
//! // does the user consent to vendor 18 using their data?
//! assert!(record.is_vendor_consented(18));
//! ```
//!
//! Queries which do not apply to the version of a string return `false`, or an empty value:
//!
//! ```
//! use iab_tcf::ConsentRecord;
//! use iab_tcf::purposes::{PurposeV1, PurposeV2};
//!
//! let record = ConsentRecord::decode("BN5lERiOMYEdiAOAWeFRAAYAAaAAptQ");
//!
//! assert_eq!(record.version(), 1);
//! assert_eq!(record.publisher_country_code(), "");
//! assert!(!record.is_vendor_legit_interest_established(1));
//!
//! // purposes are looked up in the schema of the version they belong to
//! assert!(record.is_purpose_consented_ref(PurposeV1::Personalization));
//! assert!(!record.is_purpose_consented_ref(PurposeV2::BasicAds));
//! ```
//!
//! # Error handling
//!
//! A string which cannot be fully decoded never yields a partially decoded record.
//!
//! [`ConsentRecord::decode`](consent/enum.ConsentRecord.html#method.decode) maps any failure
//! to a stub record of version 0 which consents to nothing, and whose timestamps are set to
//! the time of the decoding attempt.
//!
//! ```
//! use iab_tcf::ConsentRecord;
//!
//! let record = ConsentRecord::decode("not-base64!!");
//!
//! assert_eq!(record.version(), 0);
//! assert!(!record.is_vendor_consented(1));
//! ```
//!
//! The cause of the failure can be obtained with
//! [`ConsentRecord::try_decode`](consent/enum.ConsentRecord.html#method.try_decode), or by
//! parsing the string:
//!
//! ```
//! use iab_tcf::ConsentRecord;
//! use iab_tcf::sections::DecodeError;
//!
//! let r = "not-base64!!".parse::<ConsentRecord>();
//! assert!(matches!(r, Err(DecodeError::Base64(_))));
//! ```
//!
pub mod consent;
pub mod core;
pub mod purposes;
pub mod sections;

pub use consent::{decode, ConsentRecord};
pub use sections::peek_version;
