use tracing::{debug, info};

use dungeon_proto::{RoomId, UnitRecord};

use crate::config::EconomyConfig;
use crate::denomination::{DenominationSet, DenominationValue};
use crate::map::UnitCounter;

/// Shared crystal pool. Withdrawals are fractional (the drain loop spends
/// `rate * dt`); deposits are whole crystals. Mutated only from the session
/// tick and finish paths.
#[derive(Debug)]
pub struct CrystalPool {
    balance: f64,
}

impl CrystalPool {
    pub fn new(starting: u32) -> Self {
        Self {
            balance: starting as f64,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn deposit(&mut self, amount: u32) {
        self.balance += amount as f64;
    }

    /// Withdraw if the full amount is available; a short pool withdraws
    /// nothing.
    pub fn try_withdraw(&mut self, amount: f64) -> bool {
        if self.balance < amount {
            return false;
        }
        self.balance -= amount;
        true
    }
}

/// The level-up cost curve of one draft unit.
///
/// `to_next` starts at 1 and grows by the new power level on every level-up,
/// so level `k` costs progressively more. Fractional leftover carries into
/// the next threshold; only whole thresholds are committed as spent.
#[derive(Debug)]
pub struct PowerCurve {
    drained: f64,
    to_next: f64,
    power: u32,
    total_spent: u32,
}

impl PowerCurve {
    fn new() -> Self {
        Self {
            drained: 0.0,
            to_next: 1.0,
            power: 0,
            total_spent: 0,
        }
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn to_next(&self) -> f64 {
        self.to_next
    }

    pub fn total_spent(&self) -> u32 {
        self.total_spent
    }

    /// Feed drained crystals into the curve; returns levels gained.
    pub fn absorb(&mut self, amount: f64) -> u32 {
        self.drained += amount;
        let mut gained = 0;
        while self.drained > self.to_next {
            self.level_up();
            gained += 1;
        }
        gained
    }

    fn level_up(&mut self) {
        self.total_spent += self.to_next.floor() as u32;
        self.drained -= self.to_next;
        self.power += 1;
        self.to_next += self.power as f64;
    }
}

/// Display crystal shuttling from the build anchor to the draft unit while
/// it drains. Its travel time is `value / drain_rate`; when acceleration
/// pushes that below the configured floor the carried value doubles so the
/// shuttle stays visible.
#[derive(Debug)]
pub struct EscortCrystal {
    value: u32,
}

impl EscortCrystal {
    fn new(value: DenominationValue) -> Self {
        Self { value: value.0 }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn travel_secs(&self, drain_rate: f64) -> f64 {
        self.value as f64 / drain_rate
    }

    pub fn denominations(&self, set: &DenominationSet) -> Vec<DenominationValue> {
        set.decompose(self.value)
    }

    fn update(&mut self, drain_rate: f64, floor_secs: f64) {
        while self.travel_secs(drain_rate) < floor_secs {
            let doubled = self.value.saturating_mul(2);
            if doubled == self.value {
                break;
            }
            self.value = doubled;
        }
    }
}

/// Why a spawn attempt did not start a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Started,
    AlreadyDraining,
    NotBuilding,
    RoomFull,
    InsufficientCrystals,
}

/// What one drain tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Draining,
    /// The pool ran dry; the session finished itself.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Draining,
}

/// A unit under construction, or finished and awaiting upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftUnit {
    pub power_level: u32,
    pub carried: u32,
    pub pos: (f32, f32),
}

/// One room-build session.
///
/// Spawn and finalize complete within their calls, so the observable phases
/// are idle and draining; a second spawn attempt while draining is rejected
/// without side effects.
pub struct RoomSession {
    config: EconomyConfig,
    denominations: DenominationSet,
    phase: Phase,
    draft: Option<DraftUnit>,
    curve: PowerCurve,
    drain_rate: f64,
    accel_elapsed: f64,
    escort: Option<EscortCrystal>,
    completed: Vec<DraftUnit>,
}

impl RoomSession {
    pub fn new(config: EconomyConfig, denominations: DenominationSet) -> Self {
        Self {
            config,
            denominations,
            phase: Phase::Idle,
            draft: None,
            curve: PowerCurve::new(),
            drain_rate: 0.0,
            accel_elapsed: 0.0,
            escort: None,
            completed: Vec::new(),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.phase == Phase::Draining
    }

    pub fn drain_rate(&self) -> f64 {
        self.drain_rate
    }

    pub fn draft(&self) -> Option<&DraftUnit> {
        self.draft.as_ref()
    }

    pub fn escort(&self) -> Option<&EscortCrystal> {
        self.escort.as_ref()
    }

    pub fn curve(&self) -> &PowerCurve {
        &self.curve
    }

    pub fn completed_units(&self) -> &[DraftUnit] {
        &self.completed
    }

    /// Try to start building a unit at an offset from the build anchor.
    ///
    /// The minimum-crystal check is the initial payment itself: one smallest
    /// denomination is withdrawn and converted into the unit's first power
    /// level. If that payment cannot be fulfilled nothing changes.
    pub fn start(
        &mut self,
        anchor: (f32, f32),
        build_mode: bool,
        debug_override: bool,
        pool: &mut CrystalPool,
        counter: &UnitCounter,
    ) -> SpawnOutcome {
        if self.phase != Phase::Idle {
            return SpawnOutcome::AlreadyDraining;
        }
        if !build_mode && !debug_override {
            return SpawnOutcome::NotBuilding;
        }
        if counter.live() >= self.config.room_unit_cap() {
            return SpawnOutcome::RoomFull;
        }
        let entry = self.denominations.smallest();
        if !pool.try_withdraw(entry.0 as f64) {
            return SpawnOutcome::InsufficientCrystals;
        }

        let offset = self.config.build_offset();
        self.draft = Some(DraftUnit {
            power_level: 0,
            carried: 0,
            pos: (anchor.0 + offset.0, anchor.1 + offset.1),
        });
        self.curve = PowerCurve::new();
        self.curve.drained = entry.0 as f64;
        self.curve.level_up();
        if let Some(draft) = self.draft.as_mut() {
            draft.power_level = self.curve.power();
        }

        self.drain_rate = self.config.drain_rate();
        self.accel_elapsed = 0.0;
        self.escort = Some(EscortCrystal::new(entry));
        self.phase = Phase::Draining;
        info!(target: "hollowgrid::economy", pool = pool.balance(), "unit build started");
        SpawnOutcome::Started
    }

    /// Advance the drain loop by `dt` seconds.
    ///
    /// Rate acceleration is geometric in whole-second steps. A pool too
    /// short for this tick's withdrawal ends the session through the normal
    /// finish path rather than erroring.
    pub fn tick(&mut self, dt: f64, pool: &mut CrystalPool, counter: &UnitCounter) -> TickOutcome {
        if self.phase != Phase::Draining {
            return TickOutcome::Idle;
        }

        self.accel_elapsed += dt;
        if self.accel_elapsed >= 1.0 {
            self.drain_rate *= self.config.drain_acceleration();
            self.accel_elapsed = 0.0;
            debug!(target: "hollowgrid::economy", rate = self.drain_rate, "drain accelerated");
        }

        let spent = self.drain_rate * dt;
        if !pool.try_withdraw(spent) {
            self.finish(pool, counter);
            return TickOutcome::Exhausted;
        }

        let gained = self.curve.absorb(spent);
        if gained > 0 {
            if let Some(draft) = self.draft.as_mut() {
                draft.power_level = self.curve.power();
            }
        }
        if let Some(escort) = self.escort.as_mut() {
            escort.update(self.drain_rate, self.config.escort_travel_floor_secs());
        }
        TickOutcome::Draining
    }

    /// Finish the draining unit: refund the committed spend to the pool,
    /// grant the unit half of it (rounded up) as carried crystals, and move
    /// it onto the completed list.
    pub fn finish(&mut self, pool: &mut CrystalPool, counter: &UnitCounter) -> bool {
        if self.phase != Phase::Draining {
            return false;
        }
        let total_spent = self.curve.total_spent();
        pool.deposit(total_spent);
        if let Some(mut draft) = self.draft.take() {
            draft.carried = total_spent.div_ceil(2);
            info!(
                target: "hollowgrid::economy",
                power = draft.power_level,
                carried = draft.carried,
                "unit finished"
            );
            self.completed.push(draft);
            counter.increment();
        }
        self.escort = None;
        self.phase = Phase::Idle;
        true
    }

    /// Discard everything built this room visit. No refund beyond what the
    /// drain loop already returned on natural exhaustion.
    pub fn abandon(&mut self, counter: &UnitCounter) {
        let discarded = self.completed.len() + usize::from(self.draft.is_some());
        self.completed.clear();
        self.draft = None;
        self.escort = None;
        self.phase = Phase::Idle;
        counter.reset();
        info!(target: "hollowgrid::economy", discarded, "session abandoned");
    }

    /// Snapshot the completed units into immutable records bound for the
    /// store and clear the local list. Wire positions are fixed-point.
    pub fn finalize_units(
        &mut self,
        room_id: RoomId,
        owner_id: i64,
        owner_name: &str,
    ) -> Vec<UnitRecord> {
        self.completed
            .drain(..)
            .map(|draft| UnitRecord {
                room_id: room_id.0,
                power_level: draft.power_level,
                crystal_value: draft.carried,
                pos_x: (draft.pos.0 * UnitRecord::POS_MULTIPLIER).floor() as i32,
                pos_y: (draft.pos.1 * UnitRecord::POS_MULTIPLIER).floor() as i32,
                owner_id,
                owner_name: owner_name.to_string(),
                uploaded: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn session() -> RoomSession {
        let config = ClientConfig::default();
        RoomSession::new(
            config.economy().clone(),
            config.crystal().denominations().unwrap(),
        )
    }

    fn started(pool: &mut CrystalPool, counter: &UnitCounter) -> RoomSession {
        let mut session = session();
        assert_eq!(
            session.start((0.0, 0.0), true, false, pool, counter),
            SpawnOutcome::Started
        );
        session
    }

    #[test]
    fn start_pays_one_crystal_and_grants_the_first_level() {
        let mut pool = CrystalPool::new(10);
        let counter = UnitCounter::new();
        let session = started(&mut pool, &counter);

        assert_eq!(pool.balance(), 9.0);
        let draft = session.draft().unwrap();
        assert_eq!(draft.power_level, 1);
        assert_eq!(draft.pos, (0.0, 2.0));
        assert_eq!(session.curve().to_next(), 2.0);
    }

    #[test]
    fn start_guards_reject_without_side_effects() {
        let mut pool = CrystalPool::new(10);
        let counter = UnitCounter::new();

        let mut session = session();
        assert_eq!(
            session.start((0.0, 0.0), false, false, &mut pool, &counter),
            SpawnOutcome::NotBuilding
        );
        assert_eq!(pool.balance(), 10.0);

        // The debug override bypasses the build-mode guard only.
        assert_eq!(
            session.start((0.0, 0.0), false, true, &mut pool, &counter),
            SpawnOutcome::Started
        );
        assert_eq!(
            session.start((0.0, 0.0), true, false, &mut pool, &counter),
            SpawnOutcome::AlreadyDraining
        );
    }

    #[test]
    fn full_rooms_and_empty_pools_reject_the_spawn() {
        let counter = UnitCounter::new();
        for _ in 0..10 {
            counter.increment();
        }
        let mut pool = CrystalPool::new(10);
        let mut session = session();
        assert_eq!(
            session.start((0.0, 0.0), true, false, &mut pool, &counter),
            SpawnOutcome::RoomFull
        );

        let empty_counter = UnitCounter::new();
        let mut broke = CrystalPool::new(0);
        assert_eq!(
            session.start((0.0, 0.0), true, false, &mut broke, &empty_counter),
            SpawnOutcome::InsufficientCrystals
        );
        assert_eq!(broke.balance(), 0.0);
    }

    #[test]
    fn drain_rate_accelerates_in_whole_second_steps() {
        let mut pool = CrystalPool::new(1000);
        let counter = UnitCounter::new();
        let mut session = started(&mut pool, &counter);
        assert_eq!(session.drain_rate(), 1.0);

        session.tick(0.5, &mut pool, &counter);
        session.tick(0.5, &mut pool, &counter);
        assert!((session.drain_rate() - 1.2).abs() < 1e-9);

        session.tick(0.5, &mut pool, &counter);
        session.tick(0.5, &mut pool, &counter);
        assert!((session.drain_rate() - 1.44).abs() < 1e-9);
    }

    #[test]
    fn power_curve_carries_fractional_leftover() {
        let mut curve = PowerCurve::new();
        assert_eq!(curve.to_next(), 1.0);

        let gained = curve.absorb(1.5);
        assert_eq!(gained, 1);
        assert_eq!(curve.power(), 1);
        assert_eq!(curve.to_next(), 2.0);
        assert!((curve.drained - 0.5).abs() < 1e-9);
        assert_eq!(curve.total_spent(), 1);
    }

    #[test]
    fn to_next_never_decreases_across_ticks() {
        let mut pool = CrystalPool::new(1000);
        let counter = UnitCounter::new();
        let mut session = started(&mut pool, &counter);

        let mut last = session.curve().to_next();
        for _ in 0..50 {
            let before_power = session.curve().power();
            session.tick(0.25, &mut pool, &counter);
            let now = session.curve().to_next();
            assert!(now >= last);
            if session.curve().power() > before_power {
                assert!(now > last, "level-up must raise the threshold");
            }
            last = now;
        }
    }

    #[test]
    fn exhaustion_finishes_the_session_instead_of_erroring() {
        let mut pool = CrystalPool::new(2);
        let counter = UnitCounter::new();
        let mut session = started(&mut pool, &counter);

        let mut outcome = TickOutcome::Draining;
        for _ in 0..100 {
            outcome = session.tick(0.5, &mut pool, &counter);
            if outcome == TickOutcome::Exhausted {
                break;
            }
        }
        assert_eq!(outcome, TickOutcome::Exhausted);
        assert!(!session.is_draining());
        assert_eq!(session.completed_units().len(), 1);
        assert_eq!(counter.live(), 1);
    }

    #[test]
    fn finish_refunds_spend_and_grants_half_rounded_up() {
        let mut pool = CrystalPool::new(100);
        let counter = UnitCounter::new();
        let mut session = started(&mut pool, &counter);

        // Drain enough for a few level-ups, then finish manually.
        for _ in 0..12 {
            session.tick(0.5, &mut pool, &counter);
        }
        let spent = session.curve().total_spent();
        assert!(spent > 1);
        let before = pool.balance();
        assert!(session.finish(&mut pool, &counter));
        assert_eq!(pool.balance(), before + spent as f64);

        let unit = &session.completed_units()[0];
        assert_eq!(unit.carried, spent.div_ceil(2));
        assert_eq!(counter.live(), 1);

        // Finish is draining-only.
        assert!(!session.finish(&mut pool, &counter));
    }

    #[test]
    fn abandon_discards_units_and_zeroes_the_live_count() {
        let mut pool = CrystalPool::new(100);
        let counter = UnitCounter::new();
        let mut session = started(&mut pool, &counter);
        session.finish(&mut pool, &counter);
        assert_eq!(counter.live(), 1);

        let balance = pool.balance();
        session.abandon(&counter);
        assert!(session.completed_units().is_empty());
        assert_eq!(counter.live(), 0);
        assert_eq!(pool.balance(), balance, "abandon refunds nothing extra");

        // A fresh build may start again after abandoning.
        assert_eq!(
            session.start((0.0, 0.0), true, false, &mut pool, &counter),
            SpawnOutcome::Started
        );
    }

    #[test]
    fn escort_value_doubles_only_below_the_travel_floor() {
        let mut escort = EscortCrystal::new(DenominationValue(1));
        // 1 crystal at rate 2 travels in 0.5s, above the 1/6s floor.
        escort.update(2.0, 1.0 / 6.0);
        assert_eq!(escort.value(), 1);

        // At rate 12 travel would be 1/12s; the value doubles to clear it.
        escort.update(12.0, 1.0 / 6.0);
        assert_eq!(escort.value(), 2);
        assert!(escort.travel_secs(12.0) >= 1.0 / 6.0);
    }

    #[test]
    fn escort_value_saturates_under_an_absurd_rate() {
        let mut escort = EscortCrystal::new(DenominationValue(1));
        // A rate so high no u32 clears the floor: doubling must stop at the
        // ceiling instead of wrapping through zero.
        escort.update(f64::MAX, 1.0 / 6.0);
        assert_eq!(escort.value(), u32::MAX);
    }

    #[test]
    fn finalize_snapshots_fixed_point_positions_and_clears() {
        let mut pool = CrystalPool::new(100);
        let counter = UnitCounter::new();
        let mut session = started(&mut pool, &counter);
        session.finish(&mut pool, &counter);

        let records = session.finalize_units(RoomId(7), 3, "Borik");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.room_id, 7);
        assert_eq!(record.pos_x, 0);
        assert_eq!(record.pos_y, 2000);
        assert_eq!(record.owner_id, 3);
        assert!(!record.uploaded);
        assert!(session.completed_units().is_empty());
    }
}
