//! The battle container: flat entity lists plus incrementally maintained
//! lookups.
//!
//! [`GameState`] is plain data. During a tick the simulation step is its only
//! writer; between ticks callers read it, hash it or serialize it. The id
//! index and per-team counts are updated on every spawn and removal so the
//! hot path never rescans the ship list to answer "how many are left".

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{Bullet, Effect, EntityId, Ship, ShipId, Team};
use crate::error::{Result, SimError};
use crate::pool::EntityKind;

/// Every entity in one battle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Simulated seconds elapsed.
    #[serde(default)]
    pub time: f64,
    /// Ticks applied.
    #[serde(default)]
    pub tick: u64,
    /// Live ships.
    #[serde(default)]
    pub ships: Vec<Ship>,
    /// Bullets in flight.
    #[serde(default)]
    pub bullets: Vec<Bullet>,
    /// Ship death explosions.
    #[serde(default)]
    pub explosions: Vec<Effect>,
    /// Damage absorbed by shields.
    #[serde(default)]
    pub shield_hits: Vec<Effect>,
    /// Damage dealt to hulls.
    #[serde(default)]
    pub health_hits: Vec<Effect>,
    /// Debris.
    #[serde(default)]
    pub particles: Vec<Effect>,

    #[serde(skip)]
    ship_index: HashMap<ShipId, usize>,
    #[serde(default)]
    team_counts: BTreeMap<Team, usize>,
    #[serde(default)]
    next_id: EntityId,
}

impl GameState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a state produced by [`GameState::to_bytes`] and rebuild its
    /// lookups.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] on malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut state: GameState = bincode::deserialize(bytes)
            .map_err(|e| SimError::Serialization(format!("Failed to decode state: {e}")))?;
        state.reindex();
        Ok(state)
    }

    /// Encode the state with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to encode state: {e}")))
    }

    /// Rebuild the id index and team counts from the ship list, and move the
    /// id counter past every id in use.
    ///
    /// Called after a state arrives from outside (deserialization or a
    /// `setState` command). Duplicate ship ids keep the first occurrence.
    pub fn reindex(&mut self) {
        let mut seen = HashSet::with_capacity(self.ships.len());
        self.ships.retain(|ship| seen.insert(ship.id));

        self.ship_index.clear();
        self.team_counts.clear();
        let mut max_id = 0;
        for (i, ship) in self.ships.iter().enumerate() {
            self.ship_index.insert(ship.id, i);
            *self.team_counts.entry(ship.team).or_insert(0) += 1;
            max_id = max_id.max(ship.id);
        }
        let entity_ids = self
            .bullets
            .iter()
            .map(|b| b.id)
            .chain(self.all_effects().map(|e| e.id));
        for id in entity_ids {
            max_id = max_id.max(id);
        }
        if self.next_id <= max_id {
            self.next_id = max_id + 1;
        }
    }

    // ========================================================================
    // Ids
    // ========================================================================

    /// Reserve a fresh entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The id the next allocation will return.
    #[must_use]
    pub fn peek_next_id(&self) -> EntityId {
        self.next_id.max(1)
    }

    // ========================================================================
    // Ships
    // ========================================================================

    /// Register a ship, updating the id index and team count.
    ///
    /// A ship whose id is already present replaces the existing record.
    pub fn add_ship(&mut self, ship: Ship) -> ShipId {
        let id = ship.id;
        if id >= self.next_id {
            self.next_id = id + 1;
        }

        if let Some(&idx) = self.ship_index.get(&id) {
            let old_team = self.ships[idx].team;
            self.decrement_team(old_team);
            *self.team_counts.entry(ship.team).or_insert(0) += 1;
            self.ships[idx] = ship;
            return id;
        }

        *self.team_counts.entry(ship.team).or_insert(0) += 1;
        self.ship_index.insert(id, self.ships.len());
        self.ships.push(ship);
        id
    }

    /// Remove a ship by id, keeping the lookups consistent.
    ///
    /// The last ship moves into the vacated slot.
    pub fn remove_ship(&mut self, id: ShipId) -> Option<Ship> {
        let idx = self.ship_index.remove(&id)?;
        let ship = self.ships.swap_remove(idx);
        if let Some(moved) = self.ships.get(idx) {
            self.ship_index.insert(moved.id, idx);
        }
        self.decrement_team(ship.team);
        Some(ship)
    }

    fn decrement_team(&mut self, team: Team) {
        if let Some(count) = self.team_counts.get_mut(&team) {
            *count = count.saturating_sub(1);
        }
    }

    /// Position of a ship in [`GameState::ships`].
    #[must_use]
    pub fn index_of(&self, id: ShipId) -> Option<usize> {
        self.ship_index.get(&id).copied()
    }

    /// Look up a ship.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.index_of(id).and_then(|i| self.ships.get(i))
    }

    /// Look up a ship mutably.
    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        let idx = self.index_of(id)?;
        self.ships.get_mut(idx)
    }

    /// Ship list and id index borrowed together, for systems that mutate
    /// ships while resolving other ships by id.
    pub(crate) fn ships_with_index(&mut self) -> (&mut [Ship], &HashMap<ShipId, usize>) {
        (&mut self.ships, &self.ship_index)
    }

    /// Cached number of ships on `team`.
    #[must_use]
    pub fn team_count(&self, team: Team) -> usize {
        self.team_counts.get(&team).copied().unwrap_or(0)
    }

    /// Cached ship counts for every team that has had ships.
    #[must_use]
    pub fn team_counts(&self) -> &BTreeMap<Team, usize> {
        &self.team_counts
    }

    /// Summed hp per team; every team is present, possibly with zero.
    ///
    /// A ship with non-finite hp counts as one point so strength still
    /// tracks head count.
    #[must_use]
    pub fn team_strengths(&self) -> BTreeMap<Team, f64> {
        let mut strengths: BTreeMap<Team, f64> = Team::ALL.iter().map(|&t| (t, 0.0)).collect();
        for ship in &self.ships {
            let hp = if ship.hp.is_finite() { ship.hp.max(0.0) } else { 1.0 };
            *strengths.entry(ship.team).or_insert(0.0) += hp;
        }
        strengths
    }

    /// The only team with ships left, if exactly one team has any.
    #[must_use]
    pub fn winner(&self) -> Option<Team> {
        let mut alive = Team::ALL.iter().filter(|&&t| self.team_count(t) > 0);
        match (alive.next(), alive.next()) {
            (Some(&team), None) => Some(team),
            _ => None,
        }
    }

    // ========================================================================
    // Effects
    // ========================================================================

    /// Live effect list for `kind`. `EntityKind::Bullet` maps to particles.
    pub fn effects_mut(&mut self, kind: EntityKind) -> &mut Vec<Effect> {
        match kind {
            EntityKind::Explosion => &mut self.explosions,
            EntityKind::ShieldHit => &mut self.shield_hits,
            EntityKind::HealthHit => &mut self.health_hits,
            EntityKind::Particle | EntityKind::Bullet => &mut self.particles,
        }
    }

    /// Read-only effect list for `kind`.
    #[must_use]
    pub fn effects(&self, kind: EntityKind) -> &[Effect] {
        match kind {
            EntityKind::Explosion => &self.explosions,
            EntityKind::ShieldHit => &self.shield_hits,
            EntityKind::HealthHit => &self.health_hits,
            EntityKind::Particle | EntityKind::Bullet => &self.particles,
        }
    }

    fn all_effects(&self) -> impl Iterator<Item = &Effect> {
        self.explosions
            .iter()
            .chain(&self.shield_hits)
            .chain(&self.health_hits)
            .chain(&self.particles)
    }

    /// Number of live effects of every kind.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.explosions.len()
            + self.shield_hits.len()
            + self.health_hits.len()
            + self.particles.len()
    }

    // ========================================================================
    // Hashing
    // ========================================================================

    /// Hash of everything that influences future ticks.
    ///
    /// Floats are hashed by bit pattern, so two states hash equal only if
    /// they are bit-identical. Effects are observational and excluded.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.time.to_bits().hash(&mut hasher);
        self.next_id.hash(&mut hasher);

        self.ships.len().hash(&mut hasher);
        for ship in &self.ships {
            ship.id.hash(&mut hasher);
            ship.team.hash(&mut hasher);
            ship.ship_type.hash(&mut hasher);
            for value in [
                ship.x,
                ship.y,
                ship.angle,
                ship.vx,
                ship.vy,
                ship.throttle,
                ship.steering,
                ship.hp,
                ship.max_hp,
                ship.shield,
                ship.max_shield,
                ship.xp,
            ] {
                value.to_bits().hash(&mut hasher);
            }
            ship.level.hash(&mut hasher);
            ship.kills.hash(&mut hasher);
            if let Some(ai) = &ship.ai {
                ai.behavior.hash(&mut hasher);
                ai.timer.to_bits().hash(&mut hasher);
                ai.target.hash(&mut hasher);
            }
        }

        self.bullets.len().hash(&mut hasher);
        for bullet in &self.bullets {
            bullet.id.hash(&mut hasher);
            bullet.owner.hash(&mut hasher);
            for value in [bullet.x, bullet.y, bullet.vx, bullet.vy, bullet.ttl, bullet.damage] {
                value.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Verify the lookups agree with the lists and every value is sane.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.ship_index.len() != self.ships.len() {
            return Err(format!(
                "index holds {} ids for {} ships",
                self.ship_index.len(),
                self.ships.len()
            ));
        }
        let mut counts: BTreeMap<Team, usize> = BTreeMap::new();
        for (i, ship) in self.ships.iter().enumerate() {
            if self.ship_index.get(&ship.id) != Some(&i) {
                return Err(format!("ship {} is not indexed at {i}", ship.id));
            }
            if ship.id >= self.next_id {
                return Err(format!("ship {} is not below next_id {}", ship.id, self.next_id));
            }
            if !(ship.hp > 0.0 && ship.hp <= ship.max_hp) {
                return Err(format!("ship {} has hp {} of {}", ship.id, ship.hp, ship.max_hp));
            }
            if !(ship.shield >= 0.0 && ship.shield <= ship.max_shield) {
                return Err(format!("ship {} has shield {} of {}", ship.id, ship.shield, ship.max_shield));
            }
            if !(ship.x.is_finite() && ship.y.is_finite() && ship.vx.is_finite() && ship.vy.is_finite()) {
                return Err(format!("ship {} has a non-finite position or velocity", ship.id));
            }
            *counts.entry(ship.team).or_default() += 1;
        }
        let recorded: BTreeMap<Team, usize> = self
            .team_counts
            .iter()
            .filter(|(_, &n)| n > 0)
            .map(|(&t, &n)| (t, n))
            .collect();
        if recorded != counts {
            return Err(format!("team counts {recorded:?} disagree with ships {counts:?}"));
        }
        if let Some(bullet) = self.bullets.iter().find(|b| !(b.x.is_finite() && b.y.is_finite())) {
            return Err(format!("bullet {} has a non-finite position", bullet.id));
        }
        Ok(())
    }
}
