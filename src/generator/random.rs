use super::{GeneratorKind, IdGenerator, IdSpace, ALPHABET};
use crate::GeneratorResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random identifiers from a seeded RNG
///
/// The output is fully determined by the seed and call order. Resuming at
/// offset `k` reseeds and replays `k` identifiers, so only the seed and the
/// offset need to be persisted.
pub struct RandomGenerator {
    space: IdSpace,
    seed: u64,
    rng: StdRng,
}

impl RandomGenerator {
    pub fn new(space: IdSpace, seed: u64, offset: u64) -> Self {
        tracing::debug!("Random generator seeded with {}", seed);

        let mut generator = Self {
            space,
            seed,
            rng: StdRng::seed_from_u64(seed),
        };

        if offset > 0 {
            tracing::debug!("Replaying first {} identifiers", offset);
            for _ in 0..offset {
                generator.generate();
            }
        }

        generator
    }

    fn generate(&mut self) -> String {
        let rng = &mut self.rng;
        let positions: Vec<usize> = (0..self.space.suffix_len())
            .map(|_| rng.gen_range(0..ALPHABET.len()))
            .collect();
        self.space.assemble(positions)
    }
}

impl IdGenerator for RandomGenerator {
    fn next_id(&mut self) -> GeneratorResult<String> {
        Ok(self.generate())
    }

    fn remaining(&self) -> Option<u64> {
        None
    }

    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Random
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}
