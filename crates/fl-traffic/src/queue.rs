//! `LaneQueue`: FIFO of robots waiting for one lane.
//!
//! Each entry carries an expiry instant.  Expired entries are dropped lazily
//! (on promotion, status queries, and explicit `prune`) and are never handed
//! the lane.

use std::collections::VecDeque;
use std::time::Instant;

use fl_core::RobotId;

#[derive(Clone, Debug)]
struct WaitEntry {
    robot:   RobotId,
    expires: Instant,
}

/// Waiters for a single lane, oldest first.
#[derive(Clone, Debug, Default)]
pub struct LaneQueue {
    entries: VecDeque<WaitEntry>,
}

impl LaneQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `robot`, or refresh its expiry if it is already waiting.
    ///
    /// A refresh keeps the robot's original place in line.  Returns `true`
    /// if a new entry was appended.
    pub fn enqueue(&mut self, robot: &RobotId, expires: Instant) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.robot == robot) {
            entry.expires = expires;
            return false;
        }
        self.entries.push_back(WaitEntry { robot: robot.clone(), expires });
        true
    }

    /// Pop waiters until one is still live at `now`; return it.
    ///
    /// Expired entries encountered on the way are discarded and returned in
    /// `expired` so the caller can log them.
    pub fn pop_live(&mut self, now: Instant, expired: &mut Vec<RobotId>) -> Option<RobotId> {
        while let Some(entry) = self.entries.pop_front() {
            if entry.expires > now {
                return Some(entry.robot);
            }
            expired.push(entry.robot);
        }
        None
    }

    /// Drop every entry expired at `now`.  Returns how many were dropped.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.expires > now);
        before - self.entries.len()
    }

    /// Withdraw `robot` from the queue.  Returns `true` if it was present.
    pub fn remove(&mut self, robot: &RobotId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.robot != robot);
        before != self.entries.len()
    }

    /// Waiting robots, oldest first (expired entries included until pruned).
    pub fn robots(&self) -> impl Iterator<Item = &RobotId> + '_ {
        self.entries.iter().map(|e| &e.robot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
