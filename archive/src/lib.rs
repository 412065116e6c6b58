#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Symmetric binary archives used for wire messages and entity snapshots.
//!
//! An [`OutputArchive`] appends fixed-width little-endian primitives to a
//! growable buffer while an [`InputArchive`] reads them back from a borrowed
//! span. Reads are bounds checked before any byte is copied, so truncated or
//! hostile input surfaces as an [`ArchiveError`] instead of an out-of-range
//! access. Composite values implement [`Archive`] by writing a discriminant or
//! length first and then their fields in a fixed order; readers mirror that
//! order exactly.

use glam::{Quat, Vec3};
use thiserror::Error;

/// Upper bound applied to sequence lengths when a field declares no tighter limit.
pub const DEFAULT_SEQUENCE_LIMIT: usize = 1 << 16;

/// Failures surfaced while decoding an [`InputArchive`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArchiveError {
    /// A read requested more bytes than remain in the buffer.
    #[error("read of {requested} bytes exceeds the {remaining} remaining")]
    Truncated {
        /// Number of bytes the read required.
        requested: usize,
        /// Number of bytes left after the cursor.
        remaining: usize,
    },
    /// A discriminant did not name any known variant.
    #[error("invalid discriminant {value} for {type_name}")]
    InvalidDiscriminant {
        /// Name of the type being decoded.
        type_name: &'static str,
        /// Raw discriminant found in the buffer.
        value: u8,
    },
    /// A bounded numeric field fell outside its declared range.
    #[error("field `{field}` is outside its permitted range")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A boolean byte held something other than zero or one.
    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),
    /// A sequence declared more elements than its field permits.
    #[error("sequence of {len} elements exceeds the limit of {max}")]
    SequenceTooLong {
        /// Length declared by the encoded sequence.
        len: usize,
        /// Maximum number of elements the field accepts.
        max: usize,
    },
    /// Decoding finished with unread bytes left in the buffer.
    #[error("{0} trailing bytes after the final field")]
    TrailingBytes(usize),
}

/// Fixed-width values that can be copied directly into and out of an archive.
pub trait Primitive: Copy + Default {
    /// Number of bytes the value occupies in an archive.
    const SIZE: usize;

    /// Appends the little-endian representation of `self` to `bytes`.
    fn put(self, bytes: &mut Vec<u8>);

    /// Reconstructs a value from exactly [`Self::SIZE`] bytes.
    fn take(bytes: &[u8]) -> Self;
}

macro_rules! primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn put(self, bytes: &mut Vec<u8>) {
                    bytes.extend_from_slice(&self.to_le_bytes());
                }

                fn take(bytes: &[u8]) -> Self {
                    let mut raw = [0_u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }

            impl Archive for $ty {
                fn serialize(&self, output: &mut OutputArchive) {
                    output.write_value(*self);
                }

                fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
                    input.read_value()
                }
            }
        )*
    };
}

primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Values with a symmetric binary encoding.
pub trait Archive: Sized {
    /// Writes the value's fields into `output` in their canonical order.
    fn serialize(&self, output: &mut OutputArchive);

    /// Reads a value back, consuming exactly the bytes `serialize` produced.
    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError>;
}

/// Growable byte buffer with an append-only write cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputArchive {
    bytes: Vec<u8>,
}

impl OutputArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty archive with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Appends every value in `values` as raw little-endian bytes.
    pub fn write<T: Primitive>(&mut self, values: &[T]) {
        self.bytes.reserve(values.len() * T::SIZE);
        for value in values {
            value.put(&mut self.bytes);
        }
    }

    /// Appends a single primitive value.
    pub fn write_value<T: Primitive>(&mut self, value: T) {
        value.put(&mut self.bytes);
    }

    /// Serializes a composite value through its [`Archive`] implementation.
    pub fn put<A: Archive>(&mut self, value: &A) {
        value.serialize(self);
    }

    /// Writes an enum discriminant ahead of a variant's fields.
    pub fn write_discriminant(&mut self, discriminant: u8) {
        self.write_value(discriminant);
    }

    /// Writes a sequence length prefix.
    pub fn write_len(&mut self, len: usize) {
        debug_assert!(len <= u32::MAX as usize, "sequence length overflows u32");
        self.write_value(len as u32);
    }

    /// Writes a length prefix followed by every element of `items`.
    pub fn write_sequence<A: Archive>(&mut self, items: &[A]) {
        self.write_len(items.len());
        for item in items {
            item.serialize(self);
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Reports whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the archive and returns the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read cursor over a fixed byte span.
#[derive(Clone, Debug)]
pub struct InputArchive<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> InputArchive<'a> {
    /// Wraps `bytes` with the read cursor at the first byte.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Number of bytes that have not been read yet.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    /// Offset of the read cursor from the start of the span.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor
    }

    /// Copies `dest.len()` values from the cursor into `dest`.
    ///
    /// Fails without reading anything when the requested range exceeds the
    /// remaining buffer; the cursor is left untouched in that case.
    pub fn read<T: Primitive>(&mut self, dest: &mut [T]) -> Result<(), ArchiveError> {
        let remaining = self.remaining();
        let requested = dest
            .len()
            .checked_mul(T::SIZE)
            .ok_or(ArchiveError::Truncated {
                requested: usize::MAX,
                remaining,
            })?;
        if requested > remaining {
            return Err(ArchiveError::Truncated {
                requested,
                remaining,
            });
        }

        let span = &self.bytes[self.cursor..self.cursor + requested];
        for (slot, chunk) in dest.iter_mut().zip(span.chunks_exact(T::SIZE)) {
            *slot = T::take(chunk);
        }
        self.cursor += requested;
        Ok(())
    }

    /// Reads a single primitive value.
    pub fn read_value<T: Primitive>(&mut self) -> Result<T, ArchiveError> {
        let mut value = [T::default()];
        self.read(&mut value)?;
        Ok(value[0])
    }

    /// Decodes a composite value through its [`Archive`] implementation.
    pub fn take<A: Archive>(&mut self) -> Result<A, ArchiveError> {
        A::deserialize(self)
    }

    /// Reads an enum discriminant and checks it names one of `variants` variants.
    pub fn read_discriminant(
        &mut self,
        type_name: &'static str,
        variants: u8,
    ) -> Result<u8, ArchiveError> {
        let value: u8 = self.read_value()?;
        if value >= variants {
            return Err(ArchiveError::InvalidDiscriminant { type_name, value });
        }
        Ok(value)
    }

    /// Reads a primitive and rejects it unless `min <= value <= max`.
    ///
    /// NaN never satisfies the range and is rejected as well.
    pub fn read_bounded<T: Primitive + PartialOrd>(
        &mut self,
        field: &'static str,
        min: T,
        max: T,
    ) -> Result<T, ArchiveError> {
        let value: T = self.read_value()?;
        if value >= min && value <= max {
            Ok(value)
        } else {
            Err(ArchiveError::OutOfRange { field })
        }
    }

    /// Reads a sequence length prefix and rejects lengths above `max`.
    pub fn read_len(&mut self, max: usize) -> Result<usize, ArchiveError> {
        let len = self.read_value::<u32>()? as usize;
        if len > max {
            return Err(ArchiveError::SequenceTooLong { len, max });
        }
        Ok(len)
    }

    /// Reads a length-prefixed sequence holding at most `max` elements.
    pub fn read_sequence<A: Archive>(&mut self, max: usize) -> Result<Vec<A>, ArchiveError> {
        let len = self.read_len(max)?;
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(A::deserialize(self)?);
        }
        Ok(items)
    }

    /// Confirms every byte of the span was consumed.
    pub fn finish(self) -> Result<(), ArchiveError> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(ArchiveError::TrailingBytes(trailing)),
        }
    }
}

/// Encodes `value` into a freshly allocated byte vector.
#[must_use]
pub fn to_bytes<A: Archive>(value: &A) -> Vec<u8> {
    let mut output = OutputArchive::new();
    value.serialize(&mut output);
    output.into_bytes()
}

/// Decodes a value that must occupy the whole of `bytes`.
pub fn from_bytes<A: Archive>(bytes: &[u8]) -> Result<A, ArchiveError> {
    let mut input = InputArchive::new(bytes);
    let value = A::deserialize(&mut input)?;
    input.finish()?;
    Ok(value)
}

impl Archive for bool {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_value(u8::from(*self));
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        match input.read_value::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ArchiveError::InvalidBool(other)),
        }
    }
}

impl<T: Archive> Archive for Option<T> {
    fn serialize(&self, output: &mut OutputArchive) {
        match self {
            None => output.write_discriminant(0),
            Some(value) => {
                output.write_discriminant(1);
                value.serialize(output);
            }
        }
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        match input.read_discriminant("Option", 2)? {
            0 => Ok(None),
            _ => Ok(Some(T::deserialize(input)?)),
        }
    }
}

impl<T: Archive> Archive for Vec<T> {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write_sequence(self);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        input.read_sequence(DEFAULT_SEQUENCE_LIMIT)
    }
}

impl Archive for Vec3 {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write(&self.to_array());
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        let mut raw = [0.0_f32; 3];
        input.read(&mut raw)?;
        Ok(Vec3::from_array(raw))
    }
}

impl Archive for Quat {
    fn serialize(&self, output: &mut OutputArchive) {
        output.write(&self.to_array());
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        let mut raw = [0.0_f32; 4];
        input.read(&mut raw)?;
        Ok(Quat::from_array(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_read_leaves_cursor_in_place() {
        let bytes = [1_u8, 0, 0];
        let mut input = InputArchive::new(&bytes);
        let mut word = [0_u32];
        assert_eq!(
            input.read(&mut word),
            Err(ArchiveError::Truncated {
                requested: 4,
                remaining: 3
            })
        );
        assert_eq!(input.position(), 0);
        assert_eq!(input.read_value::<u8>(), Ok(1));
        assert_eq!(input.remaining(), 2);
    }

    #[test]
    fn primitives_are_little_endian() {
        let mut output = OutputArchive::new();
        output.write(&[0x0102_u16, 0x0304]);
        assert_eq!(output.as_bytes(), &[0x02, 0x01, 0x04, 0x03]);
    }
}
