//! A priority queue of timed plans
//!
//! Defines a `PlanQueue<T>` that stores items of type `T` (the 'plans') sorted
//! by `f64` time and then by `ExecutionPhase`. Adding a plan is *O*(log(*n*))
//! while cancellation is *O*(1) and retrieval is amortized *O*(log(*n*)).
//!
//! `Context` uses this queue to hold future callbacks, most notably the
//! periodic announcer tick, which runs in the `Last` phase so that every
//! same-time mutation of the hospital has landed before it takes its snapshot.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{HashMap, HashMapExt};

/// The order in which plans scheduled for the same time are executed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExecutionPhase {
    First,
    #[default]
    Normal,
    Last,
}

/// A priority queue that stores arbitrary data sorted by time
///
/// When plans are created they are sequentially assigned a `PlanId`. If two
/// plans are scheduled for the same time, the one in the earlier
/// `ExecutionPhase` goes first; if they also share a phase, the one that was
/// scheduled first goes first.
///
/// The time, phase, and id are stored in a binary heap of `Entry` objects.
/// The payload is stored in a hash map by plan id, and cancellation simply
/// removes the payload. Cancelled entries are skipped when popped.
pub struct PlanQueue<T> {
    queue: BinaryHeap<Entry>,
    data_map: HashMap<u64, T>,
    plan_counter: u64,
}

impl<T> PlanQueue<T> {
    #[must_use]
    pub fn new() -> PlanQueue<T> {
        PlanQueue {
            queue: BinaryHeap::new(),
            data_map: HashMap::new(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified time and phase
    ///
    /// Returns a `PlanId` for the newly-added plan that can be used to cancel
    /// it if needed.
    pub fn add_plan(&mut self, time: f64, data: T, phase: ExecutionPhase) -> PlanId {
        let id = self.plan_counter;
        self.queue.push(Entry { time, phase, id });
        self.data_map.insert(id, data);
        self.plan_counter += 1;
        PlanId(id)
    }

    /// Cancel a plan that has been added to the queue
    ///
    /// Returns the payload, or `None` if the plan was already cancelled or
    /// executed.
    pub fn cancel_plan(&mut self, id: PlanId) -> Option<T> {
        self.data_map.remove(&id.0)
    }

    /// Retrieve the earliest live plan in the queue
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        while let Some(entry) = self.queue.pop() {
            if let Some(data) = self.data_map.remove(&entry.id) {
                return Some(Plan {
                    time: entry.time,
                    phase: entry.phase,
                    data,
                });
            }
        }
        None
    }

    /// Number of plans that have neither run nor been cancelled.
    #[must_use]
    pub fn remaining_plan_count(&self) -> usize {
        self.data_map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_map.is_empty()
    }

    /// Drops every pending plan.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.data_map.clear();
    }
}

impl<T> Default for PlanQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(PartialEq, Debug)]
struct Entry {
    time: f64,
    phase: ExecutionPhase,
    id: u64,
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// `BinaryHeap` is a max-heap, so every comparison is reversed to pop the
// earliest time, earliest phase, lowest id first.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.phase.cmp(&other.phase))
            .then_with(|| self.id.cmp(&other.id))
            .reverse()
    }
}

/// A unique identifier for a plan added to a `PlanQueue<T>`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlanId(u64);

/// A plan that holds data of type `T` intended to be used at the specified time
pub struct Plan<T> {
    pub time: f64,
    pub phase: ExecutionPhase,
    pub data: T,
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::{ExecutionPhase, PlanQueue};

    #[test]
    fn empty_queue() {
        let mut plan_queue = PlanQueue::<()>::new();
        assert!(plan_queue.get_next_plan().is_none());
        assert!(plan_queue.is_empty());
    }

    #[test]
    fn plans_come_out_in_time_order() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1, ExecutionPhase::Normal);
        plan_queue.add_plan(3.0, 3, ExecutionPhase::Normal);
        plan_queue.add_plan(2.0, 2, ExecutionPhase::Normal);

        let times: Vec<(f64, i32)> = std::iter::from_fn(|| plan_queue.get_next_plan())
            .map(|plan| (plan.time, plan.data))
            .collect();
        assert_eq!(times, vec![(1.0, 1), (2.0, 2), (3.0, 3)]);
    }

    #[test]
    fn same_time_same_phase_keeps_insertion_order() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1, ExecutionPhase::Normal);
        plan_queue.add_plan(1.0, 2, ExecutionPhase::Normal);

        assert_eq!(plan_queue.get_next_plan().unwrap().data, 1);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 2);
        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn same_time_orders_by_phase() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, "last", ExecutionPhase::Last);
        plan_queue.add_plan(1.0, "normal", ExecutionPhase::Normal);
        plan_queue.add_plan(1.0, "first", ExecutionPhase::First);

        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.data, "first");
        assert_eq!(next_plan.phase, ExecutionPhase::First);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "normal");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "last");
    }

    #[test]
    fn cancelled_plans_are_skipped() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1, ExecutionPhase::Normal);
        let plan_to_cancel = plan_queue.add_plan(2.0, 2, ExecutionPhase::Normal);
        plan_queue.add_plan(3.0, 3, ExecutionPhase::Normal);
        assert_eq!(plan_queue.cancel_plan(plan_to_cancel), Some(2));
        assert_eq!(plan_queue.remaining_plan_count(), 2);

        assert_eq!(plan_queue.get_next_plan().unwrap().time, 1.0);
        assert_eq!(plan_queue.get_next_plan().unwrap().time, 3.0);
        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn cancelling_twice_returns_none() {
        let mut plan_queue = PlanQueue::new();
        let plan_id = plan_queue.add_plan(1.0, (), ExecutionPhase::Normal);
        plan_queue.get_next_plan();
        assert!(plan_queue.cancel_plan(plan_id).is_none());
    }

    #[test]
    fn plan_added_after_pop_interleaves() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1, ExecutionPhase::Normal);
        plan_queue.add_plan(2.0, 2, ExecutionPhase::Normal);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 1);

        plan_queue.add_plan(1.5, 3, ExecutionPhase::Normal);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 3);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 2);
    }
}
