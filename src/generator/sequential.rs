use super::{GeneratorKind, IdGenerator, IdSpace, ALPHABET};
use crate::{GeneratorError, GeneratorResult};

/// Exhaustive enumeration of the identifier space
///
/// Suffixes are produced in the order of the Cartesian product over
/// [`ALPHABET`] (letters before digits), last position varying fastest. The
/// cursor is a plain index into that ordering, so resuming is O(1).
pub struct SequentialGenerator {
    space: IdSpace,
    cursor: u64,
}

impl SequentialGenerator {
    pub fn new(space: IdSpace, offset: u64) -> Self {
        if offset > 0 {
            tracing::debug!("Skipping first {} combinations", offset);
        }

        Self {
            space,
            cursor: offset,
        }
    }

    /// Identifier at `index` in the enumeration order
    fn id_at(&self, mut index: u64) -> String {
        let base = ALPHABET.len() as u64;
        let mut positions = vec![0usize; self.space.suffix_len()];

        for slot in positions.iter_mut().rev() {
            *slot = (index % base) as usize;
            index /= base;
        }

        self.space.assemble(positions)
    }
}

impl IdGenerator for SequentialGenerator {
    fn next_id(&mut self) -> GeneratorResult<String> {
        if self.cursor >= self.space.size() {
            return Err(GeneratorError::Exhausted {
                requested: 1,
                remaining: 0,
            });
        }

        let id = self.id_at(self.cursor);
        self.cursor += 1;
        Ok(id)
    }

    fn remaining(&self) -> Option<u64> {
        Some(self.space.size().saturating_sub(self.cursor))
    }

    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Sequential
    }

    fn seed(&self) -> Option<u64> {
        None
    }
}
