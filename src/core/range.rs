use crate::core::{Bits, BitsError, DataReader};
#[cfg(feature = "serde")]
use serde::Serialize;

/// A single entry of a range section: either one vendor id, or an inclusive interval of ids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RangeEntry {
    Single(u16),
    Interval { start: u16, end: u16 },
}

impl RangeEntry {
    pub fn min(&self) -> u16 {
        match *self {
            Self::Single(id) => id,
            Self::Interval { start, .. } => start,
        }
    }

    pub fn max(&self) -> u16 {
        match *self {
            Self::Single(id) => id,
            Self::Interval { end, .. } => end,
        }
    }

    pub fn contains(&self, id: u16) -> bool {
        (self.min()..=self.max()).contains(&id)
    }
}

/// A list of range entries, sorted by ascending id and non-overlapping.
///
/// The ordering is guaranteed by the encoder and is not checked when decoding.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RangeSection {
    entries: Vec<RangeEntry>,
}

impl RangeSection {
    pub fn new(entries: Vec<RangeEntry>) -> Self {
        Self { entries }
    }

    /// Decodes a range section at `offset` and returns it along with the offset of the
    /// first bit following the section.
    pub fn decode(bits: &Bits, offset: usize) -> Result<(Self, usize), BitsError> {
        let mut r = DataReader::at(bits, offset);
        let section = r.read_range_section()?;
        Ok((section, r.offset()))
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tests whether an id is covered by one of the entries.
    ///
    /// This is a binary search over the interval starts. It answers `true` wherever the
    /// legacy midpoint probing used by older decoders did, but it also finds ids in entries
    /// that probing skipped, and always terminates.
    pub fn contains(&self, id: u16) -> bool {
        let i = self.entries.partition_point(|e| e.min() <= id);
        i > 0 && self.entries[i - 1].contains(id)
    }
}

/// Membership of vendor ids, in either of the two wire encodings.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum VendorState {
    /// One flag per id, starting at id 1.
    Bitfield(Vec<bool>),
    Range(RangeSection),
}

impl Default for VendorState {
    fn default() -> Self {
        Self::Bitfield(vec![])
    }
}

impl VendorState {
    /// Tests whether an id is a member. Ids outside of a bitfield are not members.
    pub fn contains(&self, id: u16) -> bool {
        match self {
            Self::Bitfield(bits) => bitfield_contains(bits, id as usize),
            Self::Range(section) => section.contains(id),
        }
    }
}

/// Tests the flag of a 1-based id in a bitfield, `false` when the id is out of bounds.
pub(crate) fn bitfield_contains(bits: &[bool], id: usize) -> bool {
    id.checked_sub(1)
        .and_then(|i| bits.get(i))
        .copied()
        .unwrap_or(false)
}

/// Lists the 1-based ids set in a bitfield.
pub(crate) fn bitfield_ids(bits: &[bool]) -> Vec<u16> {
    bits.iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some((i + 1) as u16))
        .collect()
}
