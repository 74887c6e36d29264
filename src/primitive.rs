//! Little-endian primitive reads over byte slices.
//!
//! All multi-byte values are little-endian. Strings map each byte to the `char` with the same
//! code point and stop at the first zero byte.

use bytes::{Buf, TryGetError};

use crate::{errors::DecodeError, value::Value};

/// A fixed-width numeric type that can be read from a buffer.
pub trait Primitive: Copy {
    /// Width in bytes.
    const SIZE: usize;

    fn get(buf: &mut &[u8]) -> Result<Self, TryGetError>;

    fn into_value(self) -> Value;
}

macro_rules! impl_primitive {
    ($ty:ty, $get:ident, $variant:ident) => {
        impl Primitive for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn get(buf: &mut &[u8]) -> Result<Self, TryGetError> {
                buf.$get()
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_primitive!(i8, try_get_i8, I8);
impl_primitive!(u8, try_get_u8, U8);
impl_primitive!(i16, try_get_i16_le, I16);
impl_primitive!(u16, try_get_u16_le, U16);
impl_primitive!(i32, try_get_i32_le, I32);
impl_primitive!(u32, try_get_u32_le, U32);
impl_primitive!(f32, try_get_f32_le, F32);
impl_primitive!(f64, try_get_f64_le, F64);

/// Forward-only read position within a buffer.
pub struct Cursor<'a> {
    rest: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> Cursor<'a> {
    /// Positions a cursor at `offset`. Fails if `offset` is past the end of `data`.
    pub fn new(data: &'a [u8], offset: usize) -> Result<Self, DecodeError> {
        let rest = data.get(offset..).ok_or(DecodeError::OutOfBounds {
            offset,
            length: 0,
            available: data.len(),
        })?;

        Ok(Cursor {
            rest,
            offset,
            len: data.len(),
        })
    }

    /// Absolute offset of the next byte to be read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn read<T: Primitive>(&mut self) -> Result<T, DecodeError> {
        let value = T::get(&mut self.rest).map_err(|_| self.out_of_bounds(T::SIZE))?;
        self.offset += T::SIZE;
        Ok(value)
    }

    /// Returns the next `n` bytes and moves past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.rest.len() < n {
            return Err(self.out_of_bounds(n));
        }

        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        self.offset += n;
        Ok(head)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        if self.rest.remaining() < n {
            return Err(self.out_of_bounds(n));
        }

        self.rest.advance(n);
        self.offset += n;
        Ok(())
    }

    fn out_of_bounds(&self, length: usize) -> DecodeError {
        DecodeError::OutOfBounds {
            offset: self.offset,
            length,
            available: self.len,
        }
    }
}

/// Builds a string from `bytes`, stopping at the first zero byte.
pub fn latin1_until_nul(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

/// Reads a string at `offset`.
///
/// With a length, exactly that many bytes are examined and the result truncates at the first zero
/// byte. Without one, the string runs to the next zero byte, which must exist.
pub fn read_string(data: &[u8], offset: usize, length: Option<usize>) -> Result<String, DecodeError> {
    match length {
        Some(length) => {
            let mut cursor = Cursor::new(data, offset)?;
            Ok(latin1_until_nul(cursor.take(length)?))
        }
        None => {
            let rest = Cursor::new(data, offset)?.rest;
            if !rest.contains(&0) {
                return Err(DecodeError::UnterminatedString { offset });
            }
            Ok(latin1_until_nul(rest))
        }
    }
}

/// Reads `count` consecutive values of `T` starting at `offset`.
pub fn read_array<T: Primitive>(data: &[u8], offset: usize, count: usize) -> Result<Vec<T>, DecodeError> {
    let length = count
        .checked_mul(T::SIZE)
        .ok_or(DecodeError::InvalidCount(count))?;
    DecodeError::check_range(offset, length, data.len())?;

    let mut cursor = Cursor::new(data, offset)?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.read::<T>()?);
    }

    Ok(values)
}
