//! Owned strings of binary digits

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::codec::CodecError;

/// Position and character of the first non-binary character, if any
pub fn find_non_binary(s: &str) -> Option<(usize, char)> {
    s.char_indices().find(|(_, ch)| *ch != '0' && *ch != '1')
}

/// True when every character is `'0'` or `'1'`
pub fn is_binary(s: &str) -> bool {
    find_non_binary(s).is_none()
}

/// A string made only of `'0'` and `'1'`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString(String);

impl BitString {
    /// `len` zero bits
    pub fn zeros(len: usize) -> Self {
        Self("0".repeat(len))
    }

    /// `len` independent fair-coin bits drawn from `rng`
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        Self(
            (0..len)
                .map(|_| if rng.random_bool(0.5) { '1' } else { '0' })
                .collect(),
        )
    }

    /// Validate and wrap a binary string
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        match find_non_binary(s) {
            Some((position, ch)) => Err(CodecError::NotBinary { position, ch }),
            None => Ok(Self(s.to_string())),
        }
    }

    /// Wrap a string already known to be binary
    pub(crate) fn from_trusted(s: String) -> Self {
        debug_assert!(is_binary(&s));
        Self(s)
    }

    /// `width` bits starting at bit `start`, or `None` past the end
    pub fn get(&self, start: usize, width: usize) -> Option<&str> {
        let end = start.checked_add(width)?;
        self.0.get(start..end)
    }

    /// Overwrite `bits.len()` bits starting at `start`
    ///
    /// Callers guarantee `bits` is binary and the range is in bounds.
    pub(crate) fn splice(&mut self, start: usize, bits: &str) {
        debug_assert!(is_binary(bits));
        self.0.replace_range(start..start + bits.len(), bits);
    }

    /// Consecutive `width`-bit items; a short tail is dropped
    pub fn items(&self, width: usize) -> impl Iterator<Item = &str> {
        let count = if width == 0 { 0 } else { self.0.len() / width };
        (0..count).map(move |i| &self.0[i * width..(i + 1) * width])
    }

    pub fn count_ones(&self) -> usize {
        self.0.bytes().filter(|b| *b == b'1').count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BitString {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BitString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
