//! Object pools for bullets and transient effects.
//!
//! The simulation fires and retires hundreds of bullets and effects per
//! second. Pools hand retired records back out instead of constructing new
//! ones, keeping steady-state allocation near zero.
//!
//! # Invariants
//!
//! - An item is either referenced by a live list in
//!   [`GameState`](crate::state::GameState) or sits in exactly one free list.
//!   `acquire` moves ownership out of the pool and `release` moves it back.
//! - `release` is idempotent: handing back an item whose key is already free
//!   is a no-op.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::components::{Bullet, Effect};
use crate::error::{Result, SimError};

/// Pooled entity kinds. Each kind has its own pool and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Projectiles.
    Bullet,
    /// Ship death explosions.
    Explosion,
    /// Damage absorbed by shields.
    ShieldHit,
    /// Damage dealt to hulls.
    HealthHit,
    /// Debris particles.
    Particle,
}

impl EntityKind {
    /// Every pooled kind, in a stable order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Bullet,
        EntityKind::Explosion,
        EntityKind::ShieldHit,
        EntityKind::HealthHit,
        EntityKind::Particle,
    ];

    /// The observational kinds, everything but bullets.
    pub const EFFECTS: [EntityKind; 4] = [
        EntityKind::Explosion,
        EntityKind::ShieldHit,
        EntityKind::HealthHit,
        EntityKind::Particle,
    ];
}

/// What a pool does when it runs past its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Keep at most `capacity` free items; a release into a full free list
    /// evicts the least recently freed one.
    #[default]
    DiscardOldest,
    /// No cap on free items or allocations.
    Grow,
    /// Refuse allocations beyond `capacity` outstanding items, and drop
    /// releases into a full free list.
    Error,
}

/// Capacity and overflow behavior for one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of free items retained (and, under
    /// [`OverflowStrategy::Error`], of outstanding items).
    pub capacity: usize,
    /// Overflow behavior.
    #[serde(default)]
    pub overflow: OverflowStrategy,
}

impl PoolConfig {
    /// Create a pool configuration.
    #[must_use]
    pub const fn new(capacity: usize, overflow: OverflowStrategy) -> Self {
        Self { capacity, overflow }
    }
}

/// Pool configuration for every pooled kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolsConfig {
    /// Bullets.
    pub bullet: PoolConfig,
    /// Explosions.
    pub explosion: PoolConfig,
    /// Shield hits.
    pub shield_hit: PoolConfig,
    /// Hull hits.
    pub health_hit: PoolConfig,
    /// Particles.
    pub particle: PoolConfig,
}

impl PoolsConfig {
    /// Configuration for `kind`.
    #[must_use]
    pub const fn get(&self, kind: EntityKind) -> PoolConfig {
        match kind {
            EntityKind::Bullet => self.bullet,
            EntityKind::Explosion => self.explosion,
            EntityKind::ShieldHit => self.shield_hit,
            EntityKind::HealthHit => self.health_hit,
            EntityKind::Particle => self.particle,
        }
    }
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            bullet: PoolConfig::new(2048, OverflowStrategy::DiscardOldest),
            explosion: PoolConfig::new(128, OverflowStrategy::DiscardOldest),
            shield_hit: PoolConfig::new(512, OverflowStrategy::DiscardOldest),
            health_hit: PoolConfig::new(512, OverflowStrategy::DiscardOldest),
            particle: PoolConfig::new(1024, OverflowStrategy::DiscardOldest),
        }
    }
}

/// Re-initialization hook implemented by every pooled record.
pub trait Resettable: Sized {
    /// Typed initialization arguments.
    type Init;

    /// Construct a brand-new item.
    fn create(init: Self::Init) -> Self;

    /// Overwrite every field of a recycled item from `init`.
    fn reset(&mut self, init: Self::Init);

    /// Identity used to detect double releases.
    fn pool_key(&self) -> u64;
}

/// Counters describing pool traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Items constructed fresh.
    pub created: u64,
    /// Items handed out from the free list.
    pub reused: u64,
    /// Items accepted back into the free list.
    pub released: u64,
    /// Releases ignored because the key was already free.
    pub duplicate_releases: u64,
    /// Free items evicted by `DiscardOldest`.
    pub discarded: u64,
    /// Acquisitions or releases refused by `Error`.
    pub rejected: u64,
}

/// Free list for one entity kind.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    kind: EntityKind,
    config: PoolConfig,
    free: VecDeque<T>,
    free_keys: HashSet<u64>,
    outstanding: usize,
    stats: PoolStats,
}

impl<T: Resettable> Pool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new(kind: EntityKind, config: PoolConfig) -> Self {
        Self {
            kind,
            config,
            free: VecDeque::new(),
            free_keys: HashSet::new(),
            outstanding: 0,
            stats: PoolStats::default(),
        }
    }

    /// Kind this pool serves.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Take an item initialized from `init`.
    ///
    /// Reuses the most recently freed item when one exists, otherwise
    /// constructs one with [`Resettable::create`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PoolExhausted`] under [`OverflowStrategy::Error`]
    /// when the free list is empty and `capacity` items are outstanding.
    pub fn acquire(&mut self, init: T::Init) -> Result<T> {
        if let Some(mut item) = self.free.pop_back() {
            self.free_keys.remove(&item.pool_key());
            item.reset(init);
            self.forget_free(item.pool_key());
            self.outstanding += 1;
            self.stats.reused += 1;
            return Ok(item);
        }

        if self.config.overflow == OverflowStrategy::Error
            && self.outstanding >= self.config.capacity
        {
            self.stats.rejected += 1;
            return Err(SimError::PoolExhausted(self.kind));
        }

        let item = T::create(init);
        self.forget_free(item.pool_key());
        self.outstanding += 1;
        self.stats.created += 1;
        Ok(item)
    }

    /// Hand an item back.
    ///
    /// Returns `true` if the item entered the free list. Releasing an item
    /// whose key is already free does nothing and returns `false`.
    pub fn release(&mut self, item: T) -> bool {
        let key = item.pool_key();
        if self.free_keys.contains(&key) {
            self.stats.duplicate_releases += 1;
            return false;
        }
        self.outstanding = self.outstanding.saturating_sub(1);

        if self.free.len() >= self.config.capacity {
            match self.config.overflow {
                OverflowStrategy::Grow => {}
                OverflowStrategy::DiscardOldest => {
                    if let Some(oldest) = self.free.pop_front() {
                        self.free_keys.remove(&oldest.pool_key());
                        self.stats.discarded += 1;
                    }
                    if self.config.capacity == 0 {
                        return false;
                    }
                }
                OverflowStrategy::Error => {
                    self.stats.rejected += 1;
                    return false;
                }
            }
        }

        self.free_keys.insert(key);
        self.free.push_back(item);
        self.stats.released += 1;
        true
    }

    /// Take over a live list this pool did not hand out, such as a restored
    /// snapshot.
    ///
    /// Free entries sharing a key with a live item are dropped and
    /// `outstanding` becomes the number of live items.
    pub fn adopt<'a>(&mut self, live: impl IntoIterator<Item = &'a T>)
    where
        T: 'a,
    {
        let mut count = 0;
        for item in live {
            self.forget_free(item.pool_key());
            count += 1;
        }
        self.outstanding = count;
    }

    /// Drop the free entry keyed `key`, if any. Keys repeat once ids are
    /// rewound by a state restore.
    fn forget_free(&mut self, key: u64) {
        if self.free_keys.remove(&key) {
            self.free.retain(|item| item.pool_key() != key);
            self.stats.discarded += 1;
        }
    }

    /// Number of items waiting for reuse.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Whether an item with `key` is currently in the free list.
    #[must_use]
    pub fn is_free(&self, key: u64) -> bool {
        self.free_keys.contains(&key)
    }

    /// Items handed out and not yet released.
    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Traffic counters.
    #[must_use]
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }
}

/// Every pool the simulation owns, keyed by [`EntityKind`].
#[derive(Debug, Clone)]
pub struct Pools {
    /// Bullet pool.
    pub bullets: Pool<Bullet>,
    explosions: Pool<Effect>,
    shield_hits: Pool<Effect>,
    health_hits: Pool<Effect>,
    particles: Pool<Effect>,
}

impl Pools {
    /// Build pools from configuration.
    #[must_use]
    pub fn new(config: &PoolsConfig) -> Self {
        Self {
            bullets: Pool::new(EntityKind::Bullet, config.bullet),
            explosions: Pool::new(EntityKind::Explosion, config.explosion),
            shield_hits: Pool::new(EntityKind::ShieldHit, config.shield_hit),
            health_hits: Pool::new(EntityKind::HealthHit, config.health_hit),
            particles: Pool::new(EntityKind::Particle, config.particle),
        }
    }

    /// Effect pool for `kind`. Bullets have no effect pool; passing
    /// `EntityKind::Bullet` trips a debug assertion and falls back to the
    /// particle pool.
    pub fn effects_mut(&mut self, kind: EntityKind) -> &mut Pool<Effect> {
        debug_assert_ne!(kind, EntityKind::Bullet, "bullets are not effects");
        match kind {
            EntityKind::Explosion => &mut self.explosions,
            EntityKind::ShieldHit => &mut self.shield_hits,
            EntityKind::HealthHit => &mut self.health_hits,
            EntityKind::Particle | EntityKind::Bullet => &mut self.particles,
        }
    }

    /// Read-only effect pool for `kind`.
    #[must_use]
    pub fn effects(&self, kind: EntityKind) -> &Pool<Effect> {
        match kind {
            EntityKind::Explosion => &self.explosions,
            EntityKind::ShieldHit => &self.shield_hits,
            EntityKind::HealthHit => &self.health_hits,
            EntityKind::Particle | EntityKind::Bullet => &self.particles,
        }
    }

    /// Traffic counters for `kind`.
    #[must_use]
    pub fn stats(&self, kind: EntityKind) -> PoolStats {
        match kind {
            EntityKind::Bullet => self.bullets.stats(),
            other => self.effects(other).stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal pooled record.
    #[derive(Debug, Clone, PartialEq)]
    struct Token {
        key: u64,
        value: i32,
    }

    impl Resettable for Token {
        type Init = (u64, i32);

        fn create(init: (u64, i32)) -> Self {
            Token {
                key: init.0,
                value: init.1,
            }
        }

        fn reset(&mut self, init: (u64, i32)) {
            self.key = init.0;
            self.value = init.1;
        }

        fn pool_key(&self) -> u64 {
            self.key
        }
    }

    fn pool(capacity: usize, overflow: OverflowStrategy) -> Pool<Token> {
        Pool::new(EntityKind::Bullet, PoolConfig::new(capacity, overflow))
    }

    #[test]
    fn test_acquire_constructs_then_reuses() {
        let mut p = pool(4, OverflowStrategy::DiscardOldest);
        let a = p.acquire((1, 10)).unwrap();
        assert_eq!(p.stats().created, 1);

        assert!(p.release(a));
        assert_eq!(p.free_len(), 1);

        let b = p.acquire((2, 20)).unwrap();
        assert_eq!(b, Token { key: 2, value: 20 });
        assert_eq!(p.stats().reused, 1);
        assert_eq!(p.free_len(), 0);
        assert!(!p.is_free(1));
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut p = pool(4, OverflowStrategy::Grow);
        let a = p.acquire((7, 0)).unwrap();
        let copy = a.clone();

        assert!(p.release(a));
        assert!(!p.release(copy));
        assert_eq!(p.free_len(), 1);
        assert_eq!(p.stats().duplicate_releases, 1);
    }

    #[test]
    fn test_discard_oldest_evicts_least_recently_freed() {
        let mut p = pool(2, OverflowStrategy::DiscardOldest);
        let items: Vec<Token> = (0..3).map(|k| p.acquire((k, 0)).unwrap()).collect();
        for item in items {
            p.release(item);
        }
        assert_eq!(p.free_len(), 2);
        assert!(!p.is_free(0));
        assert!(p.is_free(1));
        assert!(p.is_free(2));
        assert_eq!(p.stats().discarded, 1);
    }

    #[test]
    fn test_grow_keeps_everything() {
        let mut p = pool(1, OverflowStrategy::Grow);
        let items: Vec<Token> = (0..5).map(|k| p.acquire((k, 0)).unwrap()).collect();
        for item in items {
            assert!(p.release(item));
        }
        assert_eq!(p.free_len(), 5);
    }

    #[test]
    fn test_error_strategy_rejects_beyond_capacity() {
        let mut p = pool(2, OverflowStrategy::Error);
        let a = p.acquire((1, 0)).unwrap();
        let _b = p.acquire((2, 0)).unwrap();
        assert!(matches!(
            p.acquire((3, 0)),
            Err(SimError::PoolExhausted(EntityKind::Bullet))
        ));

        // Returning one frees a slot.
        p.release(a);
        assert!(p.acquire((3, 0)).is_ok());
    }

    #[test]
    fn test_outstanding_tracks_live_items() {
        let mut p = pool(8, OverflowStrategy::DiscardOldest);
        let a = p.acquire((1, 0)).unwrap();
        let b = p.acquire((2, 0)).unwrap();
        assert_eq!(p.outstanding(), 2);
        p.release(a);
        assert_eq!(p.outstanding(), 1);
        p.release(b);
        assert_eq!(p.outstanding(), 0);
    }

    #[test]
    fn test_adopt_evicts_live_keys_from_free_list() {
        let mut p = pool(8, OverflowStrategy::DiscardOldest);
        let a = p.acquire((1, 0)).unwrap();
        let b = p.acquire((2, 0)).unwrap();
        p.release(a.clone());
        p.release(b.clone());
        assert!(p.is_free(1) && p.is_free(2));

        // The same items come back as live, e.g. from a snapshot.
        let live = vec![a, b, Token { key: 9, value: 0 }];
        p.adopt(&live);
        assert!(!p.is_free(1));
        assert!(!p.is_free(2));
        assert_eq!(p.free_len(), 0);
        assert_eq!(p.outstanding(), 3);

        for item in live {
            assert!(p.release(item));
        }
        assert_eq!(p.outstanding(), 0);
        assert_eq!(p.stats().duplicate_releases, 0);
    }

    #[test]
    fn test_acquire_drops_stale_entry_with_reused_key() {
        let mut p = pool(8, OverflowStrategy::DiscardOldest);
        let items: Vec<Token> = (1..=3).map(|k| p.acquire((k, 0)).unwrap()).collect();
        for item in items {
            p.release(item);
        }

        // Reuses the entry keyed 3 and relabels it 2; the stale 2 must go.
        let fresh = p.acquire((2, 5)).unwrap();
        assert_eq!(fresh, Token { key: 2, value: 5 });
        assert!(!p.is_free(2));
        assert!(p.is_free(1));
        assert_eq!(p.free_len(), 1);
        assert!(p.release(fresh));
    }

    #[test]
    fn test_pools_route_by_kind() {
        let pools = Pools::new(&PoolsConfig::default());
        for kind in EntityKind::EFFECTS {
            assert_eq!(pools.effects(kind).kind(), kind);
        }
        assert_eq!(pools.bullets.kind(), EntityKind::Bullet);
    }
}
