use std::collections::BTreeMap;

use tracing::debug;

use crate::denomination::{DenominationSet, DenominationValue};

/// Handle to a crystal lying in the current room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrystalId(pub u64);

/// A collectible crystal in the world. Times are room-clock seconds.
#[derive(Debug, Clone)]
pub struct Crystal {
    pub id: CrystalId,
    pub value: DenominationValue,
    pub pos: (f32, f32),
    spawned_at: f64,
    expires_at: f64,
    combining: bool,
}

impl Crystal {
    pub fn is_combining(&self) -> bool {
        self.combining
    }
}

/// Crystals currently lying in the room, with the collide-and-combine rule.
///
/// Collisions are reported by the presentation layer; the field owns the
/// invariants: each input crystal is retired exactly once, exactly one
/// merged crystal spawns at the midpoint, and merged crystals expire after
/// the configured stay time.
pub struct CrystalField {
    denominations: DenominationSet,
    stay_secs: f64,
    crystals: BTreeMap<CrystalId, Crystal>,
    next_id: u64,
}

impl CrystalField {
    pub fn new(denominations: DenominationSet, stay_secs: f64) -> Self {
        Self {
            denominations,
            stay_secs,
            crystals: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.crystals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crystals.is_empty()
    }

    pub fn get(&self, id: CrystalId) -> Option<&Crystal> {
        self.crystals.get(&id)
    }

    pub fn spawn(&mut self, value: DenominationValue, pos: (f32, f32), now: f64) -> CrystalId {
        let id = CrystalId(self.next_id);
        self.next_id += 1;
        self.crystals.insert(
            id,
            Crystal {
                id,
                value,
                pos,
                spawned_at: now,
                expires_at: now + self.stay_secs,
                combining: false,
            },
        );
        id
    }

    /// Drop `amount` worth of crystals at a position, decomposed into
    /// discrete denominations. Used when a unit dies and sheds its carry.
    pub fn scatter(&mut self, amount: u32, pos: (f32, f32), now: f64) -> Vec<CrystalId> {
        self.denominations
            .decompose(amount)
            .into_iter()
            .map(|value| self.spawn(value, pos, now))
            .collect()
    }

    /// Handle a reported collision between two crystals.
    ///
    /// Succeeds only for two live, equal-valued crystals with a next
    /// denomination to merge into. Both inputs are latched as combining so a
    /// concurrent report of the same collision is rejected; they are removed
    /// on the next [`CrystalField::prune`]. Returns the merged crystal's id.
    pub fn collide(&mut self, a: CrystalId, b: CrystalId, now: f64) -> Option<CrystalId> {
        if a == b {
            return None;
        }
        let (value_a, pos_a) = {
            let crystal = self.crystals.get(&a)?;
            if crystal.combining {
                return None;
            }
            (crystal.value, crystal.pos)
        };
        let (value_b, pos_b) = {
            let crystal = self.crystals.get(&b)?;
            if crystal.combining {
                return None;
            }
            (crystal.value, crystal.pos)
        };

        let merged = self.denominations.merge(value_a, value_b)?;

        if let Some(crystal) = self.crystals.get_mut(&a) {
            crystal.combining = true;
        }
        if let Some(crystal) = self.crystals.get_mut(&b) {
            crystal.combining = true;
        }

        let midpoint = ((pos_a.0 + pos_b.0) * 0.5, (pos_a.1 + pos_b.1) * 0.5);
        let id = self.spawn(merged, midpoint, now);
        debug!(target: "hollowgrid::crystal", value = %merged, "crystals combined");
        Some(id)
    }

    /// Remove retired and expired crystals; returns what was removed.
    pub fn prune(&mut self, now: f64) -> Vec<Crystal> {
        let dead: Vec<CrystalId> = self
            .crystals
            .values()
            .filter(|crystal| crystal.combining || crystal.expires_at <= now)
            .map(|crystal| crystal.id)
            .collect();
        dead.into_iter()
            .filter_map(|id| self.crystals.remove(&id))
            .collect()
    }

    /// Crystals start blinking once 75% of their stay time has elapsed.
    pub fn is_blinking(&self, id: CrystalId, now: f64) -> bool {
        self.crystals
            .get(&id)
            .map(|crystal| now - crystal.spawned_at > 0.75 * self.stay_secs)
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.crystals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denomination::DenominationSet;

    fn field() -> CrystalField {
        let set = DenominationSet::new(vec![1, 4, 16]).unwrap();
        CrystalField::new(set, 0.5)
    }

    #[test]
    fn collision_merges_once_at_the_midpoint() {
        let mut field = field();
        let a = field.spawn(DenominationValue(4), (0.0, 0.0), 0.0);
        let b = field.spawn(DenominationValue(4), (2.0, 4.0), 0.0);

        let merged = field.collide(a, b, 0.1).expect("equal values merge");
        let crystal = field.get(merged).unwrap();
        assert_eq!(crystal.value, DenominationValue(16));
        assert_eq!(crystal.pos, (1.0, 2.0));

        // The same collision reported again must not double-merge.
        assert_eq!(field.collide(a, b, 0.1), None);
        assert_eq!(field.collide(b, a, 0.1), None);
    }

    #[test]
    fn unequal_and_top_values_do_not_merge() {
        let mut field = field();
        let a = field.spawn(DenominationValue(1), (0.0, 0.0), 0.0);
        let b = field.spawn(DenominationValue(4), (1.0, 0.0), 0.0);
        assert_eq!(field.collide(a, b, 0.0), None);

        let c = field.spawn(DenominationValue(16), (0.0, 1.0), 0.0);
        let d = field.spawn(DenominationValue(16), (1.0, 1.0), 0.0);
        assert_eq!(field.collide(c, d, 0.0), None);
    }

    #[test]
    fn prune_removes_retired_inputs_and_expired_crystals() {
        let mut field = field();
        let a = field.spawn(DenominationValue(4), (0.0, 0.0), 0.0);
        let b = field.spawn(DenominationValue(4), (1.0, 0.0), 0.0);
        let merged = field.collide(a, b, 0.0).unwrap();

        let removed = field.prune(0.0);
        assert_eq!(removed.len(), 2, "both inputs retired exactly once");
        assert!(field.get(merged).is_some());

        // The merged crystal expires after the stay time.
        let removed = field.prune(0.6);
        assert_eq!(removed.len(), 1);
        assert!(field.is_empty());
    }

    #[test]
    fn scatter_decomposes_the_amount() {
        let mut field = field();
        let ids = field.scatter(21, (0.0, 0.0), 0.0);
        let values: Vec<u32> = ids
            .iter()
            .map(|id| field.get(*id).unwrap().value.0)
            .collect();
        assert_eq!(values, vec![16, 4, 1]);
    }

    #[test]
    fn blinking_starts_at_three_quarters_of_stay_time() {
        let mut field = field();
        let id = field.spawn(DenominationValue(1), (0.0, 0.0), 0.0);
        assert!(!field.is_blinking(id, 0.3));
        assert!(field.is_blinking(id, 0.4));
    }
}
