//! Flush coordination.
//!
//! Decides which in-memory objects are written and in what order. Ordering
//! is delegated to a pluggable [`FlushPolicy`]; the coordinator only makes
//! sure that whatever the policy returns, every pending object is written
//! exactly once and pinned objects stay in memory until close.

use crate::error::Result;
use crate::graph::{FlushState, ObjectGraph};
use crate::object::ObjectRef;
use std::collections::{BTreeSet, HashSet};

/// Result of a flush request for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The object was checked and handed to the writer
    Written,
    /// The object had already been written; nothing happened
    AlreadyFlushed,
    /// The object is pinned and will be written at close
    Deferred,
}

/// Strategy deciding the order in which pending objects are flushed.
///
/// A policy may reorder, drop or add entries. Dropped pending objects are
/// flushed after the policy's list; added objects are flushed like explicit
/// requests if they are still in memory; unknown or pinned ones are skipped.
pub trait FlushPolicy: Send {
    /// Order `pending` (ascending object numbers) for flushing.
    fn order(&mut self, pending: Vec<ObjectRef>) -> Vec<ObjectRef>;

    /// Return the name of this policy for debugging.
    fn name(&self) -> &'static str;
}

/// Flush in ascending object-number order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AscendingPolicy;

impl FlushPolicy for AscendingPolicy {
    fn order(&mut self, pending: Vec<ObjectRef>) -> Vec<ObjectRef> {
        pending
    }

    fn name(&self) -> &'static str {
        "ascending"
    }
}

/// Flush in descending object-number order, referents before referrers
/// for graphs built top-down.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescendingPolicy;

impl FlushPolicy for DescendingPolicy {
    fn order(&mut self, mut pending: Vec<ObjectRef>) -> Vec<ObjectRef> {
        pending.reverse();
        pending
    }

    fn name(&self) -> &'static str {
        "descending"
    }
}

/// Adapter turning a closure into a [`FlushPolicy`].
pub struct FnPolicy<F>(pub F);

impl<F> FlushPolicy for FnPolicy<F>
where
    F: FnMut(Vec<ObjectRef>) -> Vec<ObjectRef> + Send,
{
    fn order(&mut self, pending: Vec<ObjectRef>) -> Vec<ObjectRef> {
        (self.0)(pending)
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Wrap `f` as a flush policy.
pub fn policy_fn<F>(f: F) -> FnPolicy<F>
where
    F: FnMut(Vec<ObjectRef>) -> Vec<ObjectRef> + Send,
{
    FnPolicy(f)
}

/// Pending-set computation and ordering for one document.
pub struct FlushCoordinator {
    policy: Box<dyn FlushPolicy>,
    pinned: BTreeSet<ObjectRef>,
}

impl std::fmt::Debug for FlushCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushCoordinator")
            .field("policy", &self.policy.name())
            .field("pinned", &self.pinned)
            .finish()
    }
}

impl Default for FlushCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushCoordinator {
    /// Create a coordinator with the ascending policy.
    pub fn new() -> Self {
        Self {
            policy: Box::new(AscendingPolicy),
            pinned: BTreeSet::new(),
        }
    }

    /// Replace the flush policy.
    pub fn set_policy(&mut self, policy: Box<dyn FlushPolicy>) {
        log::debug!("Flush policy: {} -> {}", self.policy.name(), policy.name());
        self.policy = policy;
    }

    /// Name of the active policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Keep `r` in memory until close.
    pub fn pin(&mut self, r: ObjectRef) {
        self.pinned.insert(r);
    }

    /// Release a pin.
    pub fn unpin(&mut self, r: ObjectRef) {
        self.pinned.remove(&r);
    }

    /// Whether `r` is pinned.
    pub fn is_pinned(&self, r: ObjectRef) -> bool {
        self.pinned.contains(&r)
    }

    /// Pinned objects, ascending.
    pub fn pinned(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.pinned.iter().copied()
    }

    /// In-memory objects reachable from `roots`, minus `forbidden` and pinned
    /// objects, in ascending object-number order.
    ///
    /// Recomputed on every call; forced flushes between calls are picked up.
    pub fn pending(
        &self,
        graph: &ObjectGraph,
        roots: &[ObjectRef],
        forbidden: &HashSet<ObjectRef>,
    ) -> Result<Vec<ObjectRef>> {
        let mut pending = BTreeSet::new();
        for root in roots {
            for r in graph.reachable_from(*root)? {
                if graph.state(r)? == FlushState::InMemory && !forbidden.contains(&r) && !self.is_pinned(r) {
                    pending.insert(r);
                }
            }
        }
        Ok(pending.into_iter().collect())
    }

    /// Ask the policy for an order and repair it.
    ///
    /// The result holds every object of `pending` plus any in-memory,
    /// unpinned object the policy added, each exactly once.
    pub fn plan(&mut self, graph: &ObjectGraph, pending: Vec<ObjectRef>) -> Vec<ObjectRef> {
        let ordered = self.policy.order(pending.clone());
        let mut seen = HashSet::new();
        let mut plan = Vec::with_capacity(pending.len());

        for r in ordered.into_iter().chain(pending) {
            if !seen.insert(r) || self.is_pinned(r) {
                continue;
            }
            match graph.state(r) {
                Ok(FlushState::InMemory) => plan.push(r),
                _ => log::debug!("Flush policy '{}' named {}; skipped", self.policy.name(), r),
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::writer::object_serializer::{dict, name, reference};

    fn chain() -> (ObjectGraph, Vec<ObjectRef>) {
        let mut graph = ObjectGraph::new();
        let leaf = graph.add_object(Object::Integer(1));
        let mid = graph.add_object(dict(vec![("Leaf", reference(leaf))]));
        let root = graph.add_object(dict(vec![("Type", name("Catalog")), ("Mid", reference(mid))]));
        (graph, vec![leaf, mid, root])
    }

    #[test]
    fn test_pending_excludes_pinned_and_forbidden() {
        let (graph, refs) = chain();
        let mut coordinator = FlushCoordinator::new();
        coordinator.pin(refs[2]);

        let pending = coordinator.pending(&graph, &[refs[2]], &HashSet::new()).unwrap();
        assert_eq!(pending, vec![refs[0], refs[1]]);

        let forbidden: HashSet<_> = [refs[0]].into_iter().collect();
        let pending = coordinator.pending(&graph, &[refs[2]], &forbidden).unwrap();
        assert_eq!(pending, vec![refs[1]]);
    }

    #[test]
    fn test_pending_skips_flushed() {
        let (mut graph, refs) = chain();
        graph.mark_flushed(refs[1]).unwrap();
        let coordinator = FlushCoordinator::new();
        let pending = coordinator.pending(&graph, &[refs[2]], &HashSet::new()).unwrap();
        // The leaf stays reachable through the flushed middle object
        assert_eq!(pending, vec![refs[0], refs[2]]);
    }

    #[test]
    fn test_plan_repairs_policy_output() {
        let (graph, refs) = chain();
        let mut coordinator = FlushCoordinator::new();
        coordinator.set_policy(Box::new(policy_fn(|mut pending: Vec<ObjectRef>| {
            // Drop everything but the last entry, then repeat it and add junk
            let last = pending.pop().into_iter().collect::<Vec<_>>();
            let mut out = last.clone();
            out.extend(last);
            out.push(ObjectRef::new(99, 0));
            out
        })));
        assert_eq!(coordinator.policy_name(), "custom");

        let plan = coordinator.plan(&graph, refs.clone());
        assert_eq!(plan, vec![refs[2], refs[0], refs[1]]);
    }

    #[test]
    fn test_descending_policy() {
        let (graph, refs) = chain();
        let mut coordinator = FlushCoordinator::new();
        coordinator.set_policy(Box::new(DescendingPolicy));
        let plan = coordinator.plan(&graph, refs.clone());
        assert_eq!(plan, vec![refs[2], refs[1], refs[0]]);
    }

    #[test]
    fn test_plan_never_includes_pinned() {
        let (graph, refs) = chain();
        let mut coordinator = FlushCoordinator::new();
        let pinned = refs[1];
        coordinator.pin(pinned);
        coordinator.set_policy(Box::new(policy_fn(move |_| vec![pinned])));
        let plan = coordinator.plan(&graph, vec![refs[0]]);
        assert_eq!(plan, vec![refs[0]]);
    }
}
