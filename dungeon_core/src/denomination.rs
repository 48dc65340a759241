use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One discrete crystal size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DenominationValue(pub u32);

impl fmt::Display for DenominationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error raised when a denomination set violates the decomposition invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DenominationError {
    #[error("denomination set is empty")]
    Empty,
    #[error("smallest denomination must be 1, got {0}")]
    BaseNotUnit(u32),
    #[error("denominations must be strictly ascending: {prev} then {next}")]
    NotAscending { prev: u32, next: u32 },
    #[error("denomination {next} is not an exact multiple of {prev}")]
    NotMultiple { prev: u32, next: u32 },
}

/// Fixed ascending set of crystal denominations.
///
/// Every denomination divides the next one exactly, so the greedy
/// decomposition in [`DenominationSet::decompose`] is exact with zero
/// remainder. A set that cannot guarantee that is a configuration error and
/// is rejected here, at construction, rather than silently losing crystals
/// later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenominationSet {
    values: Vec<u32>,
}

impl DenominationSet {
    pub fn new(values: Vec<u32>) -> Result<Self, DenominationError> {
        let first = *values.first().ok_or(DenominationError::Empty)?;
        if first != 1 {
            return Err(DenominationError::BaseNotUnit(first));
        }
        for pair in values.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next <= prev {
                return Err(DenominationError::NotAscending { prev, next });
            }
            if next % prev != 0 {
                return Err(DenominationError::NotMultiple { prev, next });
            }
        }
        Ok(Self { values })
    }

    pub fn smallest(&self) -> DenominationValue {
        DenominationValue(self.values[0])
    }

    pub fn largest(&self) -> DenominationValue {
        DenominationValue(self.values[self.values.len() - 1])
    }

    pub fn contains(&self, value: DenominationValue) -> bool {
        self.values.contains(&value.0)
    }

    /// Greedy exact decomposition of `amount` into discrete crystal values,
    /// largest denomination first. Pure; the remainder is always zero.
    pub fn decompose(&self, mut amount: u32) -> Vec<DenominationValue> {
        let mut crystals = Vec::new();
        for &value in self.values.iter().rev() {
            let count = amount / value;
            amount -= count * value;
            for _ in 0..count {
                crystals.push(DenominationValue(value));
            }
        }
        debug_assert_eq!(amount, 0, "unit base denomination leaves no remainder");
        crystals
    }

    /// Merge rule for the "equal crystals collide and combine" behavior:
    /// two equal values combine into the next denomination up, if one exists.
    pub fn merge(
        &self,
        a: DenominationValue,
        b: DenominationValue,
    ) -> Option<DenominationValue> {
        if a != b {
            return None;
        }
        self.next_above(a)
    }

    fn next_above(&self, value: DenominationValue) -> Option<DenominationValue> {
        let index = self.values.iter().position(|&v| v == value.0)?;
        self.values.get(index + 1).copied().map(DenominationValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> DenominationSet {
        DenominationSet::new(vec![1, 4, 16]).unwrap()
    }

    #[test]
    fn decompose_sums_back_to_the_input() {
        let set = set();
        for amount in 0..200 {
            let crystals = set.decompose(amount);
            let total: u32 = crystals.iter().map(|value| value.0).sum();
            assert_eq!(total, amount, "decompose({amount}) lost currency");
        }
    }

    #[test]
    fn decompose_twenty_one_is_sixteen_four_one() {
        let crystals = set().decompose(21);
        assert_eq!(
            crystals,
            vec![
                DenominationValue(16),
                DenominationValue(4),
                DenominationValue(1)
            ]
        );
    }

    #[test]
    fn decompose_zero_is_empty() {
        assert!(set().decompose(0).is_empty());
    }

    #[test]
    fn merge_equal_values_yields_the_next_denomination() {
        let set = set();
        assert_eq!(
            set.merge(DenominationValue(4), DenominationValue(4)),
            Some(DenominationValue(16))
        );
        // Deterministic: asking again gives the same answer.
        assert_eq!(
            set.merge(DenominationValue(4), DenominationValue(4)),
            Some(DenominationValue(16))
        );
    }

    #[test]
    fn merge_rejects_unequal_values_and_the_top_denomination() {
        let set = set();
        assert_eq!(set.merge(DenominationValue(1), DenominationValue(4)), None);
        assert_eq!(set.merge(DenominationValue(16), DenominationValue(16)), None);
    }

    #[test]
    fn construction_rejects_bad_sets() {
        assert_eq!(
            DenominationSet::new(Vec::new()).unwrap_err(),
            DenominationError::Empty
        );
        assert_eq!(
            DenominationSet::new(vec![2, 4]).unwrap_err(),
            DenominationError::BaseNotUnit(2)
        );
        assert_eq!(
            DenominationSet::new(vec![1, 3, 5]).unwrap_err(),
            DenominationError::NotMultiple { prev: 3, next: 5 }
        );
        assert_eq!(
            DenominationSet::new(vec![1, 16, 4]).unwrap_err(),
            DenominationError::NotAscending { prev: 16, next: 4 }
        );
    }
}
