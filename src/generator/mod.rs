//! Identifier generation
//!
//! Identifiers are fixed-length strings: a constant first character followed by
//! `id_length - 1` symbols drawn from [`ALPHABET`]. Two strategies share the
//! [`IdGenerator`] capability set:
//!
//! - [`RandomGenerator`]: uniform random suffixes from a seeded, per-instance RNG
//! - [`SequentialGenerator`]: every suffix exactly once, in alphabet order
//!
//! Both can be resumed from an offset, which is how a restarted run picks up
//! where the last checkpoint left off.

mod random;
mod sequential;

pub use random::RandomGenerator;
pub use sequential::SequentialGenerator;

use crate::{GeneratorError, GeneratorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbols used for every identifier position after the first
pub const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Shortest supported identifier (first character plus one symbol)
pub const MIN_ID_LENGTH: usize = 2;

/// Longest supported identifier; 36^12 is the largest power that fits in a u64
pub const MAX_ID_LENGTH: usize = 13;

/// Strategy used to produce identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    Random,
    Sequential,
}

impl GeneratorKind {
    /// Name stored in the progress file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "sequential" => Ok(Self::Sequential),
            other => Err(GeneratorError::UnknownStrategy(other.to_string())),
        }
    }
}

/// The shape of the identifier space: first character and suffix length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSpace {
    first_char: char,
    suffix_len: usize,
}

impl IdSpace {
    /// Creates an identifier space, validating the first character and length
    pub fn new(first_char: &str, id_length: usize) -> GeneratorResult<Self> {
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&id_length) {
            return Err(GeneratorError::InvalidLength {
                min: MIN_ID_LENGTH,
                max: MAX_ID_LENGTH,
                got: id_length,
            });
        }

        let mut chars = first_char.chars();
        let first = match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() && !c.is_control() => c,
            _ => return Err(GeneratorError::InvalidFirstChar(first_char.to_string())),
        };

        Ok(Self {
            first_char: first,
            suffix_len: id_length - 1,
        })
    }

    pub fn first_char(&self) -> char {
        self.first_char
    }

    /// Number of variable positions after the first character
    pub fn suffix_len(&self) -> usize {
        self.suffix_len
    }

    /// Total number of distinct identifiers, `36^suffix_len`
    pub fn size(&self) -> u64 {
        (ALPHABET.len() as u64).pow(self.suffix_len as u32)
    }

    /// Builds an identifier from suffix symbol positions in [`ALPHABET`]
    fn assemble(&self, positions: impl IntoIterator<Item = usize>) -> String {
        let mut id = String::with_capacity(self.suffix_len + self.first_char.len_utf8());
        id.push(self.first_char);
        id.extend(positions.into_iter().map(|p| ALPHABET[p] as char));
        id
    }
}

/// A stateful source of identifiers
///
/// Generators are driven from a single task; batches are fully materialized
/// before any identifier is handed to a worker.
pub trait IdGenerator: Send {
    /// Produces the next identifier
    fn next_id(&mut self) -> GeneratorResult<String>;

    /// Produces the next `n` identifiers in generation order
    ///
    /// Returns [`GeneratorError::Exhausted`] without consuming anything when
    /// fewer than `n` identifiers remain.
    fn next_n(&mut self, n: usize) -> GeneratorResult<Vec<String>> {
        if let Some(remaining) = self.remaining() {
            if remaining < n as u64 {
                return Err(GeneratorError::Exhausted {
                    requested: n as u64,
                    remaining,
                });
            }
        }

        (0..n).map(|_| self.next_id()).collect()
    }

    /// Identifiers left before exhaustion, or `None` if unbounded
    fn remaining(&self) -> Option<u64>;

    fn kind(&self) -> GeneratorKind;

    /// Seed for strategies that use one
    fn seed(&self) -> Option<u64>;
}

/// Builds a generator of the given kind, resumed at `offset`
///
/// # Arguments
///
/// * `kind` - Strategy to use
/// * `space` - Identifier space to draw from
/// * `seed` - RNG seed (ignored by the sequential strategy)
/// * `offset` - Number of identifiers to skip before serving output
pub fn build_generator(
    kind: GeneratorKind,
    space: IdSpace,
    seed: u64,
    offset: u64,
) -> Box<dyn IdGenerator> {
    tracing::info!(
        "{} generator over {} combinations, starting at offset {}",
        kind,
        space.size(),
        offset
    );

    match kind {
        GeneratorKind::Random => Box::new(RandomGenerator::new(space, seed, offset)),
        GeneratorKind::Sequential => Box::new(SequentialGenerator::new(space, offset)),
    }
}
