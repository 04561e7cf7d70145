//! Decoders for the segments of TCF consent strings.
//!
//! A version 1 string is a single base64 encoded bit string, decoded by [`tcfeuv1`].
//!
//! A version 2 string is made of a mandatory core segment, optionally followed by other
//! segments separated by `.` characters. Each optional segment starts with a 3 bits
//! [`SegmentType`] identifying how the rest of it must be decoded. See [`tcfeuv2`].
//!
use crate::core::base64;
use crate::core::{Bits, BitsError, DataReader, FromDataReader};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::Serialize;
use strum_macros::Display;
use thiserror::Error;

pub mod tcfeuv1;
pub mod tcfeuv2;

const SEGMENT_SEPARATOR: char = '.';

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("unable to decode segment: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unable to read segment: {0}")]
    Bits(#[from] BitsError),
    #[error("invalid version (expected {expected}, found {found})")]
    InvalidVersion { expected: u8, found: u8 },
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),
}

/// The type of a segment, read from the first 3 bits of every segment following the core one.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SegmentType {
    Core = 0,
    DisclosedVendors = 1,
    AllowedVendors = 2,
    PublisherTc = 3,
    Unknown = 7,
}

impl SegmentType {
    pub fn from_id(id: u8) -> Self {
        Self::from_u8(id).unwrap_or(Self::Unknown)
    }
}

pub(crate) fn decode_segment(s: &str) -> Result<Bits, DecodeError> {
    Ok(Bits::new(base64::decode(s)?))
}

/// Parses a string made of a mandatory core segment and an arbitrary number of optional
/// segments using '.' as separators.
pub(crate) trait SegmentedStr<T> {
    fn parse_segmented_str(&self) -> Result<T, DecodeError>;
}

impl<T> SegmentedStr<T> for str
where
    T: OptionalSegmentParser,
{
    fn parse_segmented_str(&self) -> Result<T, DecodeError> {
        let mut segments = self.split(SEGMENT_SEPARATOR);

        // first mandatory segment is the core segment, split always yields it
        let core = decode_segment(segments.next().unwrap_or_default())?;
        let mut output = DataReader::new(&core).parse()?;

        for s in segments {
            let bits = decode_segment(s)?;
            let mut r = DataReader::new(&bits);

            let segment_type = SegmentType::from_id(r.read_fixed_integer(3)?);
            T::parse_optional_segment(segment_type, &mut r, &mut output)?;
        }

        Ok(output)
    }
}

/// Decoding of the optional segments of a string, routed by their type.
pub(crate) trait OptionalSegmentParser: Sized + FromDataReader<Err = DecodeError> {
    fn parse_optional_segment(
        segment_type: SegmentType,
        r: &mut DataReader,
        into: &mut Self,
    ) -> Result<(), DecodeError>;
}

/// Reads the version of a consent string from the first 6 bits of its first segment,
/// without decoding anything else.
pub fn peek_version(s: &str) -> Result<u8, DecodeError> {
    let core = s.split(SEGMENT_SEPARATOR).next().unwrap_or_default();
    Ok(decode_segment(core)?.uint(0, 6)?)
}
