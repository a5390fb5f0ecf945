//! Target duration generation.
//!
//! Targets are drawn uniformly from a tier's `[min_duration_ms, max_duration_ms)`
//! range on a fixed grid (1 ms by default; 1000 ms reproduces whole-second
//! targets). When the previous target is supplied it is excluded from the
//! draw, so consecutive targets never repeat unless the range holds a
//! single value.

use std::collections::VecDeque;

use rand::Rng;

use crate::tier::{Difficulty, TierTable};

/// Source of uniformly distributed integers.
///
/// Implemented for every `rand::RngCore`, so seeded `rand_pcg` generators
/// work directly. [`ScriptedSource`] replays a fixed sequence for tests.
pub trait RandomSource {
    /// Uniform integer in `[low, high)`. Callers guarantee `low < high`.
    fn next_in_range(&mut self, low: u64, high: u64) -> u64;
}

impl<R: rand::RngCore> RandomSource for R {
    fn next_in_range(&mut self, low: u64, high: u64) -> u64 {
        self.gen_range(low..high)
    }
}

/// Replays a cyclic sequence of raw values, each reduced into the requested range.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: VecDeque<u64>,
}

impl ScriptedSource {
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        let values: VecDeque<u64> = values.into_iter().collect();
        Self {
            values: if values.is_empty() {
                VecDeque::from([0])
            } else {
                values
            },
        }
    }
}

impl RandomSource for ScriptedSource {
    fn next_in_range(&mut self, low: u64, high: u64) -> u64 {
        let raw = self.values.pop_front().unwrap_or(0);
        self.values.push_back(raw);
        low + raw % (high - low)
    }
}

/// Produces target durations for a tier table.
#[derive(Debug, Clone)]
pub struct TargetGenerator {
    tiers: TierTable,
    granularity_ms: u64,
}

impl TargetGenerator {
    pub fn new(tiers: TierTable) -> Self {
        Self {
            tiers,
            granularity_ms: 1,
        }
    }

    /// Restrict targets to `min + k * granularity_ms`. Zero is treated as 1.
    pub fn with_granularity(mut self, granularity_ms: u64) -> Self {
        self.granularity_ms = granularity_ms.max(1);
        self
    }

    pub fn granularity_ms(&self) -> u64 {
        self.granularity_ms
    }

    /// Draw the next target for `tier`, never equal to `previous` when the
    /// range allows another value.
    pub fn generate<R: RandomSource + ?Sized>(
        &self,
        tier: Difficulty,
        previous: Option<u64>,
        rng: &mut R,
    ) -> u64 {
        let spec = self.tiers.get(tier);
        let step = self.granularity_ms;
        let min = spec.min_duration_ms;
        let slots = (spec.max_duration_ms - min).div_ceil(step);

        if slots <= 1 {
            return min;
        }

        // Only a previous value that sits on the grid can collide.
        let previous_slot = previous
            .filter(|p| *p >= min && *p < spec.max_duration_ms && (*p - min) % step == 0)
            .map(|p| (p - min) / step);

        let slot = match previous_slot {
            Some(taken) => {
                let drawn = rng.next_in_range(0, slots - 1);
                if drawn >= taken {
                    drawn + 1
                } else {
                    drawn
                }
            }
            None => rng.next_in_range(0, slots),
        };

        min + slot * step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierSpec;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    fn narrow_table(min: u64, max: u64) -> TierTable {
        let easy = TierSpec {
            margin_ms: 500,
            max_points: 100,
            min_duration_ms: min,
            max_duration_ms: max,
            unlock_score: 0,
        };
        TierTable::new(
            easy,
            TierSpec::default_for(Difficulty::Medium),
            TierSpec::default_for(Difficulty::Hard),
        )
        .unwrap()
    }

    #[test]
    fn scripted_source_is_reduced_into_range() {
        let generator = TargetGenerator::new(TierTable::default());
        let mut source = ScriptedSource::new([0, 1234]);
        assert_eq!(generator.generate(Difficulty::Medium, None, &mut source), 2000);
        assert_eq!(generator.generate(Difficulty::Medium, None, &mut source), 3234);
    }

    #[test]
    fn skips_previous_value() {
        let generator = TargetGenerator::new(TierTable::default());
        // Slot 0 drawn while slot 0 is taken moves to slot 1.
        let mut source = ScriptedSource::new([0]);
        assert_eq!(
            generator.generate(Difficulty::Easy, Some(3000), &mut source),
            3001
        );
        // Draws below the taken slot are kept as is.
        let mut source = ScriptedSource::new([5]);
        assert_eq!(
            generator.generate(Difficulty::Easy, Some(4000), &mut source),
            3005
        );
    }

    #[test]
    fn single_value_range_returns_without_looping() {
        let generator = TargetGenerator::new(narrow_table(3000, 3001));
        let mut source = ScriptedSource::new([7]);
        assert_eq!(
            generator.generate(Difficulty::Easy, Some(3000), &mut source),
            3000
        );
    }

    #[test]
    fn whole_second_granularity() {
        let generator = TargetGenerator::new(TierTable::default()).with_granularity(1000);
        let mut rng = Mcg128Xsl64::seed_from_u64(42);
        let mut previous = None;
        for _ in 0..200 {
            let t = generator.generate(Difficulty::Easy, previous, &mut rng);
            assert_eq!(t % 1000, 0);
            assert!((3000..8000).contains(&t));
            assert_ne!(Some(t), previous);
            previous = Some(t);
        }
    }

    #[test]
    fn two_slot_range_alternates() {
        let generator = TargetGenerator::new(narrow_table(3000, 3002));
        let mut rng = Mcg128Xsl64::seed_from_u64(1);
        let mut previous = Some(3000);
        for _ in 0..10 {
            let t = generator.generate(Difficulty::Easy, previous, &mut rng);
            assert_ne!(Some(t), previous);
            previous = Some(t);
        }
    }

    proptest! {
        #[test]
        fn stays_in_range_and_never_repeats(seed in any::<u64>(), tier_idx in 0usize..3, prev in proptest::option::of(0u64..10_000)) {
            let tier = Difficulty::ALL[tier_idx];
            let table = TierTable::default();
            let spec = *table.get(tier);
            let generator = TargetGenerator::new(table);
            let mut rng = Mcg128Xsl64::seed_from_u64(seed);
            let t = generator.generate(tier, prev, &mut rng);
            prop_assert!(t >= spec.min_duration_ms && t < spec.max_duration_ms);
            prop_assert_ne!(Some(t), prev);
        }
    }
}
