//! Jersey number allocation.
//!
//! Numbers are tracked per team for the life of one import session. A
//! requested number is honoured when free, otherwise the position's pool is
//! scanned in declared order. Only a fully used pool falls back to a random
//! pick, which may duplicate a number and is always reported.

use crate::constants::jersey_pool;
use crate::error::{RosterError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Warning raised when every number in a position's pool is taken on a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolExhausted {
    pub team: String,
    pub position: String,
    pub number: u8,
}

/// Numbers assigned so far, per team
#[derive(Debug, Clone, Default)]
pub struct AllocationState {
    assigned: HashMap<String, BTreeSet<u8>>,
    exhausted: Vec<PoolExhausted>,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_assigned(&self, team: &str, number: u8) -> bool {
        self.assigned
            .get(team)
            .is_some_and(|numbers| numbers.contains(&number))
    }

    /// Numbers in use on a team, ascending
    pub fn assigned(&self, team: &str) -> Vec<u8> {
        self.assigned
            .get(team)
            .map(|numbers| numbers.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn team_count(&self) -> usize {
        self.assigned.len()
    }

    pub fn exhausted_events(&self) -> &[PoolExhausted] {
        &self.exhausted
    }

    fn assign(&mut self, team: &str, number: u8) {
        self.assigned
            .entry(team.to_string())
            .or_default()
            .insert(number);
    }
}

/// How an allocated number was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationSource {
    Requested,
    Pool,
    /// Random pick from a fully used pool; may duplicate a teammate
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub number: u8,
    pub source: AllocationSource,
}

impl Allocation {
    pub fn is_exhausted(&self) -> bool {
        self.source == AllocationSource::Exhausted
    }
}

/// Resolves jersey numbers against an [`AllocationState`]
#[derive(Debug)]
pub struct JerseyNumberAllocator {
    rng: StdRng,
}

impl JerseyNumberAllocator {
    /// Create an allocator; a seed makes the exhaustion fallback reproducible
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn allocate(
        &mut self,
        state: &mut AllocationState,
        team: &str,
        position: &str,
        requested: Option<u8>,
    ) -> Result<Allocation> {
        let pool = jersey_pool(position).ok_or_else(|| RosterError::UnrecognizedPosition {
            position: position.to_string(),
        })?;

        if let Some(number) = requested {
            if !state.is_assigned(team, number) {
                state.assign(team, number);
                return Ok(Allocation {
                    number,
                    source: AllocationSource::Requested,
                });
            }
            debug!("{} #{} already taken, choosing from {} pool", team, number, position);
        }

        let free = pool_numbers(pool).find(|number| !state.is_assigned(team, *number));
        let allocation = match free {
            Some(number) => Allocation {
                number,
                source: AllocationSource::Pool,
            },
            None => {
                let candidates: Vec<u8> = pool_numbers(pool).collect();
                let number = candidates[self.rng.gen_range(0..candidates.len())];
                warn!(
                    "Jersey pool for {} exhausted on {}, reusing #{}",
                    position, team, number
                );
                state.exhausted.push(PoolExhausted {
                    team: team.to_string(),
                    position: position.to_string(),
                    number,
                });
                Allocation {
                    number,
                    source: AllocationSource::Exhausted,
                }
            }
        };

        state.assign(team, allocation.number);
        Ok(allocation)
    }
}

/// Every number in a pool, in declared order
fn pool_numbers(ranges: &'static [(u8, u8)]) -> impl Iterator<Item = u8> {
    ranges.iter().flat_map(|(low, high)| *low..=*high)
}
