use crate::core::range::{RangeEntry, RangeSection, VendorState};
use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};
use std::io;
use std::mem::size_of;
use thiserror::Error;

pub mod base64;
pub mod range;

/// The error type for bit level reads over a [`Bits`] buffer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BitsError {
    /// The requested bit range ends past the end of the buffer.
    #[error("requesting {size} bits at offset {start} beyond bit string length {len}")]
    OutOfRange { start: usize, size: usize, len: usize },
    /// The requested number of bits cannot fit in the target integer type.
    #[error("can't fit {size} bits in a {width} bits integer")]
    ExcessiveWidth { size: usize, width: usize },
    /// Six-bit character strings must have a bit length multiple of six.
    #[error("string bit length {0} must be a multiple of six")]
    InvalidStringLength(usize),
    /// A decisecond timestamp does not fit in milliseconds.
    #[error("timestamp {0} overflows milliseconds since epoch")]
    TimestampOverflow(u64),
    #[error("unable to read bits: {0}")]
    Read(#[from] io::Error),
}

/// An immutable bit string, read big-endian and addressed from bit 0.
///
/// Every read is a pure function of `(buffer, start, size)`: a read that would go past the
/// end of the buffer is an error, never a truncated value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bits {
    bytes: Vec<u8>,
}

impl Bits {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Number of bits in the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the bit at index `i`.
    pub fn bit(&self, i: usize) -> Result<bool, BitsError> {
        let mut r = self.reader_at(i, 1)?;
        Ok(r.read_bit()?)
    }

    /// Returns `size` bits starting at `start`, in wire order.
    pub fn bits(&self, start: usize, size: usize) -> Result<Vec<bool>, BitsError> {
        let mut r = self.reader_at(start, size)?;
        (0..size)
            .map(|_| r.read_bit().map_err(BitsError::from))
            .collect()
    }

    /// Interprets `size` bits starting at `start` as a big-endian unsigned integer.
    ///
    /// Fails if `size` exceeds the width of `U`.
    pub fn uint<U>(&self, start: usize, size: usize) -> Result<U, BitsError>
    where
        U: UnsignedInteger + Default,
    {
        let width = size_of::<U>() * 8;
        if size > width {
            return Err(BitsError::ExcessiveWidth { size, width });
        }

        let mut r = self.reader_at(start, size)?;
        if size == 0 {
            return Ok(U::default());
        }

        Ok(r.read_unsigned_var::<U>(size as u32)?)
    }

    /// Interprets `size` bits as a string of six-bit characters, where 0 is `A`.
    pub fn six_bit_chars(&self, start: usize, size: usize) -> Result<String, BitsError> {
        if size % 6 != 0 {
            return Err(BitsError::InvalidStringLength(size));
        }

        (0..size / 6)
            .map(|i| {
                self.uint::<u8>(start + i * 6, 6)
                    .map(|n| char::from(n + b'A').to_ascii_uppercase())
            })
            .collect()
    }

    /// Reads a count of deciseconds since the Unix epoch and returns it as milliseconds.
    pub fn epoch_deciseconds(&self, start: usize, size: usize) -> Result<u64, BitsError> {
        let deciseconds = self.uint::<u64>(start, size)?;
        deciseconds
            .checked_mul(100)
            .ok_or(BitsError::TimestampOverflow(deciseconds))
    }

    /// Renders the whole buffer as a string of `0` and `1` characters.
    pub fn to_binary_string(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:08b}")).collect()
    }

    fn reader_at(&self, start: usize, size: usize) -> Result<BitReader<&[u8], BigEndian>, BitsError> {
        let len = self.len();
        if start.checked_add(size).map_or(true, |end| end > len) {
            return Err(BitsError::OutOfRange { start, size, len });
        }

        let mut r = BitReader::endian(&self.bytes[start / 8..], BigEndian);
        r.skip((start % 8) as u32)?;
        Ok(r)
    }
}

impl From<Vec<u8>> for Bits {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// A type that can be decoded from the current position of a [`DataReader`].
pub trait FromDataReader: Sized {
    type Err;

    fn from_data_reader(r: &mut DataReader) -> Result<Self, Self::Err>;
}

/// A decode cursor over a [`Bits`] buffer.
///
/// Each read consumes bits at the current offset and advances it, so that fields whose
/// presence or width depend on earlier values can be decoded in a single forward pass.
pub struct DataReader<'a> {
    bits: &'a Bits,
    offset: usize,
}

impl<'a> DataReader<'a> {
    pub fn new(bits: &'a Bits) -> Self {
        Self::at(bits, 0)
    }

    pub fn at(bits: &'a Bits, offset: usize) -> Self {
        Self { bits, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn parse<F>(&mut self) -> Result<F, <F as FromDataReader>::Err>
    where
        F: FromDataReader,
    {
        FromDataReader::from_data_reader(self)
    }

    pub fn read_bool(&mut self) -> Result<bool, BitsError> {
        let b = self.bits.bit(self.offset)?;
        self.offset += 1;
        Ok(b)
    }

    pub fn read_fixed_integer<U>(&mut self, bits: usize) -> Result<U, BitsError>
    where
        U: UnsignedInteger + Default,
    {
        let n = self.bits.uint(self.offset, bits)?;
        self.offset += bits;
        Ok(n)
    }

    pub fn read_string(&mut self, chars: usize) -> Result<String, BitsError> {
        let s = self.bits.six_bit_chars(self.offset, chars * 6)?;
        self.offset += chars * 6;
        Ok(s)
    }

    pub fn read_datetime_as_millis(&mut self) -> Result<u64, BitsError> {
        let t = self.bits.epoch_deciseconds(self.offset, 36)?;
        self.offset += 36;
        Ok(t)
    }

    pub fn read_fixed_bitfield(&mut self, bits: usize) -> Result<Vec<bool>, BitsError> {
        let v = self.bits.bits(self.offset, bits)?;
        self.offset += bits;
        Ok(v)
    }

    /// Reads a self-delimiting range section: a 12 bits entry count followed by the entries.
    pub fn read_range_section(&mut self) -> Result<RangeSection, BitsError> {
        let n = self.read_fixed_integer::<u16>(12)?;
        let mut entries = Vec::with_capacity(n as usize);

        for _ in 0..n {
            let is_range = self.read_bool()?;
            if is_range {
                let start = self.read_fixed_integer(16)?;
                let end = self.read_fixed_integer(16)?;
                entries.push(RangeEntry::Interval { start, end });
            } else {
                let id = self.read_fixed_integer(16)?;
                entries.push(RangeEntry::Single(id));
            }
        }

        Ok(RangeSection::new(entries))
    }

    /// Reads a max vendor id, an encoding flag, then either a bitfield or a range section.
    pub fn read_vendor_state(&mut self) -> Result<VendorState, BitsError> {
        let max_vendor_id = self.read_fixed_integer::<u16>(16)?;
        let is_range = self.read_bool()?;
        Ok(if is_range {
            VendorState::Range(self.read_range_section()?)
        } else {
            VendorState::Bitfield(self.read_fixed_bitfield(max_vendor_id as usize)?)
        })
    }
}
