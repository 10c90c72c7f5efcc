//! Priority queue for tracking position health (min-heap by health)

use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;
use torsion_core::PositionId;

/// Position health snapshot
#[derive(Debug, Clone)]
pub struct PositionHealth {
    pub id: PositionId,
    /// Health = value - maintenance
    pub health: i128,
    /// Current exit value before fees
    pub value: u128,
    /// Maintenance margin requirement
    pub maintenance: u128,
    /// Simulated time of the snapshot
    pub last_update: u64,
}

impl PositionHealth {
    /// Below maintenance: the position can be liquidated
    pub fn needs_liquidation(&self) -> bool {
        self.health < 0
    }

    /// Above maintenance but within the buffer
    pub fn in_watch_zone(&self, buffer: i128) -> bool {
        self.health >= 0 && self.health < buffer
    }
}

/// Health-based priority queue (min-heap: lowest health first)
pub struct HealthQueue {
    /// Priority queue (using Reverse for min-heap)
    queue: PriorityQueue<PositionId, Reverse<i128>>,
    /// Map for O(1) lookups
    map: HashMap<PositionId, PositionHealth>,
}

impl HealthQueue {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            map: HashMap::new(),
        }
    }

    /// Push or update a position's health
    pub fn push(&mut self, health: PositionHealth) {
        let id = health.id;
        let h = health.health;
        self.map.insert(id, health);
        self.queue.push(id, Reverse(h));
    }

    /// Pop the position with the lowest health
    pub fn pop(&mut self) -> Option<PositionHealth> {
        let (id, _priority) = self.queue.pop()?;
        self.map.remove(&id)
    }

    /// Peek at the position with the lowest health without removing
    pub fn peek(&self) -> Option<&PositionHealth> {
        let (id, _priority) = self.queue.peek()?;
        self.map.get(id)
    }

    /// Remove a position from the queue
    pub fn remove(&mut self, id: PositionId) -> Option<PositionHealth> {
        self.queue.remove(&id);
        self.map.remove(&id)
    }

    pub fn get(&self, id: PositionId) -> Option<&PositionHealth> {
        self.map.get(&id)
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All positions below maintenance, worst first
    pub fn get_liquidatable(&self) -> Vec<PositionHealth> {
        let mut out: Vec<_> = self
            .map
            .values()
            .filter(|ph| ph.needs_liquidation())
            .cloned()
            .collect();
        out.sort_by_key(|ph| ph.health);
        out
    }

    /// Positions close enough to maintenance to watch each tick
    pub fn get_watch_candidates(&self, buffer: i128) -> Vec<PositionHealth> {
        self.map
            .values()
            .filter(|ph| ph.in_watch_zone(buffer))
            .cloned()
            .collect()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.queue.clear();
        self.map.clear();
    }
}

impl Default for HealthQueue {
    fn default() -> Self {
        Self::new()
    }
}
