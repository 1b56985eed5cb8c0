//! Bird-of-the-day rotation state machine.
//!
//! The rotation walks a shuffled backlog of bird ids. Each advance removes
//! one id uniformly at random and features it; an exhausted backlog is
//! refilled with a fresh permutation that leaves out the bird just featured,
//! so a cycle boundary never repeats a bird back to back.
//!
//! ## Invariants
//! - `current` is never a member of `backlog`.
//! - `backlog` holds no duplicates and only ids of the population.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use super::BirdId;

/// Reasons a population or rotation state is unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RotationError {
    #[error("bird population is empty")]
    EmptyPopulation,
    #[error("bird ids must be contiguous from 1; expected {expected}, found {found}")]
    NonContiguous { expected: i32, found: i32 },
}

/// The fixed set of featureable birds, ids `1..=N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirdPopulation {
    size: i32,
}

impl BirdPopulation {
    /// Validate that `ids` form the contiguous range `1..=N`.
    pub fn from_ids(ids: impl IntoIterator<Item = BirdId>) -> Result<Self, RotationError> {
        let mut raw: Vec<i32> = ids.into_iter().map(BirdId::get).collect();
        raw.sort_unstable();
        for (expected, found) in (1..).zip(raw.iter().copied()) {
            if expected != found {
                return Err(RotationError::NonContiguous { expected, found });
            }
        }
        // Contiguous from 1, so the largest id is the population size.
        let size = raw.last().copied().ok_or(RotationError::EmptyPopulation)?;
        Ok(Self { size })
    }

    pub const fn size(&self) -> i32 {
        self.size
    }

    pub fn contains(&self, id: BirdId) -> bool {
        id.get() <= self.size
    }

    pub fn ids(&self) -> impl Iterator<Item = BirdId> + '_ {
        (1..=self.size).filter_map(|raw| BirdId::new(raw).ok())
    }
}

/// Backlog plus the featured bird.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RotationState {
    pub backlog: Vec<BirdId>,
    pub current: Option<BirdId>,
}

impl RotationState {
    pub fn new(backlog: Vec<BirdId>, current: Option<BirdId>) -> Self {
        Self { backlog, current }
    }

    pub fn is_exhausted(&self) -> bool {
        self.backlog.is_empty()
    }

    /// Compute the next state, returning the newly featured bird.
    ///
    /// Stale ids (outside the population, duplicated, or equal to
    /// `current`) are dropped from the backlog first.
    ///
    /// # Examples
    /// ```
    /// use birdwatch::domain::{BirdId, BirdPopulation, RotationState};
    /// use rand::SeedableRng;
    /// use rand::rngs::SmallRng;
    ///
    /// let population = BirdPopulation::from_ids((1..=3).map(|id| BirdId::new(id).expect("id")))
    ///     .expect("population");
    /// let mut state = RotationState::default();
    /// let mut rng = SmallRng::seed_from_u64(7);
    ///
    /// let featured = state.advance(&population, &mut rng);
    /// assert_eq!(state.current, Some(featured));
    /// assert_eq!(state.backlog.len(), 2);
    /// assert!(!state.backlog.contains(&featured));
    /// ```
    pub fn advance<R: Rng + ?Sized>(&mut self, population: &BirdPopulation, rng: &mut R) -> BirdId {
        self.prune(population);
        if self.backlog.is_empty() {
            self.refill(population, rng);
        }
        let index = rng.gen_range(0..self.backlog.len());
        let next = self.backlog.remove(index);
        self.current = Some(next);
        next
    }

    fn prune(&mut self, population: &BirdPopulation) {
        let current = self.current;
        let mut seen = HashSet::with_capacity(self.backlog.len());
        self.backlog
            .retain(|id| population.contains(*id) && Some(*id) != current && seen.insert(*id));
    }

    fn refill<R: Rng + ?Sized>(&mut self, population: &BirdPopulation, rng: &mut R) {
        let current = self.current;
        let mut fresh: Vec<BirdId> = population
            .ids()
            .filter(|id| population.size() == 1 || Some(*id) != current)
            .collect();
        fresh.shuffle(rng);
        self.backlog = fresh;
    }

    /// Whether the state satisfies the rotation invariants for `population`.
    pub fn is_consistent(&self, population: &BirdPopulation) -> bool {
        let mut seen = HashSet::with_capacity(self.backlog.len() + 1);
        let backlog_ok = self
            .backlog
            .iter()
            .all(|id| population.contains(*id) && seen.insert(*id));
        let current_ok = self
            .current
            .is_none_or(|id| population.contains(id) && !seen.contains(&id));
        backlog_ok && current_ok
    }
}

/// Persisted rotation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationRecord {
    pub state: RotationState,
    /// Optimistic concurrency counter; bumped on every save.
    pub revision: i32,
    pub rotated_at: Option<DateTime<Utc>>,
}
