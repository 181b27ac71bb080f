use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::hash::{Hash, Hasher};

use log::trace;
use rustc_hash::{FxHashMap, FxHasher};
use sift_ir::Block;
use smallvec::{SmallVec, smallvec};

use crate::domain::Domain;
use crate::stack::CallStack;

/// An exploration edge: arrival at `dst` (from `src`, when known) under the
/// call stack `stk`.
///
/// Edges are the keys of the depth bookkeeping. Equality, ordering and
/// hashing all treat the stack under inlined-location equivalence, so two
/// arrivals that differ only in elided recursive frames count as the same
/// program point.
pub struct Edge<'pgm, D: Domain> {
    pub dst: Block,
    pub src: Option<Block>,
    pub stk: CallStack<'pgm, D>,
}

impl<'pgm, D: Domain> Clone for Edge<'pgm, D> {
    fn clone(&self) -> Self {
        Edge {
            dst: self.dst,
            src: self.src,
            stk: self.stk.clone(),
        }
    }
}

impl<D: Domain> PartialEq for Edge<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: Domain> Eq for Edge<'_, D> {}

impl<D: Domain> PartialOrd for Edge<'_, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Domain> Ord for Edge<'_, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dst
            .cmp(&other.dst)
            .then_with(|| self.src.cmp(&other.src))
            .then_with(|| self.stk.cmp_inlined(&other.stk))
    }
}

impl<D: Domain> Hash for Edge<'_, D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut h = FxHasher::default();
        h.write_u32(self.dst.raw());
        match self.src {
            Some(src) => h.write_u32(src.raw()),
            None => h.write_u32(u32::MAX),
        }
        self.stk.hash(&mut h);
        state.write_u64(h.finish());
    }
}

impl<D: Domain> std::fmt::Debug for Edge<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.src {
            Some(src) => write!(f, "{} -> {} {:?}", src, self.dst, self.stk),
            None => write!(f, "-> {} {:?}", self.dst, self.stk),
        }
    }
}

/// Per-path depth bookkeeping: how many times each edge has retreated along
/// the path that carried this map.
///
/// Maps are joined pointwise by max when waiting states merge, so recorded
/// depths never decrease along any path.
pub struct Depths<'pgm, D: Domain>(FxHashMap<Edge<'pgm, D>, u32>);

impl<'pgm, D: Domain> Depths<'pgm, D> {
    pub fn find(&self, edge: &Edge<'pgm, D>) -> Option<u32> {
        self.0.get(edge).copied()
    }

    fn set(&mut self, edge: Edge<'pgm, D>, depth: u32) {
        self.0.insert(edge, depth);
    }

    /// Pointwise-max join.
    pub fn join(mut self, other: Self) -> Self {
        for (edge, depth) in other.0 {
            self.0
                .entry(edge)
                .and_modify(|d| *d = (*d).max(depth))
                .or_insert(depth);
        }
        self
    }
}

impl<'pgm, D: Domain> Default for Depths<'pgm, D> {
    fn default() -> Self {
        Depths(FxHashMap::default())
    }
}

impl<'pgm, D: Domain> Clone for Depths<'pgm, D> {
    fn clone(&self) -> Self {
        Depths(self.0.clone())
    }
}

struct Pending<'pgm, D: Domain> {
    prev: Option<Block>,
    retreating: bool,
    stk: CallStack<'pgm, D>,
    state: D,
    dst: Block,
}

/// A worklist transform: a batch of pending edge additions produced by one
/// block transfer.
///
/// `skip` is the identity, [`add`](Work::add) a single addition, and
/// [`seq`](Work::seq) left-then-right composition. The batch is interpreted
/// by [`Worklist::apply`] against the depth map carried by the edge that
/// produced it.
pub struct Work<'pgm, D: Domain>(SmallVec<[Pending<'pgm, D>; 2]>);

impl<'pgm, D: Domain> Work<'pgm, D> {
    /// The identity transform.
    pub fn skip() -> Self {
        Work(SmallVec::new())
    }

    /// Enqueue `state` at `block` under `stk`, stepping the edge's depth
    /// when the edge retreats.
    pub fn add(
        prev: Option<Block>,
        retreating: bool,
        stk: CallStack<'pgm, D>,
        state: D,
        block: Block,
    ) -> Self {
        Work(smallvec![Pending {
            prev,
            retreating,
            stk,
            state,
            dst: block,
        }])
    }

    /// Compose two transforms, left then right.
    pub fn seq(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }
}

struct PrioEdge<'pgm, D: Domain> {
    depth: u32,
    edge: Edge<'pgm, D>,
}

impl<D: Domain> PartialEq for PrioEdge<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: Domain> Eq for PrioEdge<'_, D> {}

impl<D: Domain> PartialOrd for PrioEdge<'_, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Domain> Ord for PrioEdge<'_, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| self.edge.cmp(&other.edge))
    }
}

/// The exploration frontier.
///
/// A min-heap of `(depth, edge)` pairs drives lowest-depth-first order,
/// with ties broken by the deterministic edge order. States arriving at a
/// block wait in `waiting` until the block is dequeued, at which point all
/// of them are drained and fold-joined into a single transfer — the
/// join-on-dequeue policy that keeps merge points monotone and avoids
/// re-enqueueing work per arrival.
pub struct Worklist<'pgm, D: Domain> {
    bound: u32,
    queue: BinaryHeap<Reverse<PrioEdge<'pgm, D>>>,
    waiting: FxHashMap<Block, Vec<(D, Depths<'pgm, D>)>>,
}

impl<'pgm, D: Domain> Worklist<'pgm, D> {
    /// A worklist holding the initial edge into `entry` at depth 0.
    pub fn init(state: D, entry: Block, bound: u32) -> Self {
        let mut wl = Worklist {
            bound,
            queue: BinaryHeap::new(),
            waiting: FxHashMap::default(),
        };
        wl.apply(
            Work::add(None, false, CallStack::empty(), state, entry),
            &Depths::default(),
        );
        wl
    }

    /// Interpret a transform batch against the depth map of the edge that
    /// produced it. Additions whose stepped depth exceeds the bound are
    /// pruned silently.
    pub fn apply(&mut self, work: Work<'pgm, D>, depths: &Depths<'pgm, D>) {
        for pending in work.0 {
            let Pending {
                prev,
                retreating,
                stk,
                state,
                dst,
            } = pending;
            let edge = Edge {
                dst,
                src: prev,
                stk,
            };
            let mut depth = depths.find(&edge).unwrap_or(0);
            if retreating {
                depth += 1;
            }
            if depth > self.bound {
                trace!("prune {edge:?} at depth {depth}");
                continue;
            }
            let mut depths = depths.clone();
            depths.set(edge.clone(), depth);
            trace!("enqueue {edge:?} at depth {depth}");
            self.queue.push(Reverse(PrioEdge { depth, edge }));
            self.waiting.entry(dst).or_default().push((state, depths));
        }
    }

    /// Drive the exploration to quiescence.
    ///
    /// Repeatedly pops the lowest-depth edge, drains and fold-joins every
    /// state waiting at its destination block, hands the joined state to
    /// `f`, and applies the returned transform under the joined depth map.
    /// Pops whose destination was already drained by an earlier pop are
    /// skipped.
    pub fn run<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&CallStack<'pgm, D>, D, Block) -> Result<Work<'pgm, D>, E>,
    {
        while let Some(Reverse(PrioEdge { depth, edge })) = self.queue.pop() {
            let Some(entries) = self.waiting.remove(&edge.dst) else {
                continue;
            };
            let mut entries = entries.into_iter();
            let Some((mut state, mut depths)) = entries.next() else {
                continue;
            };
            for (waiting_state, waiting_depths) in entries {
                state = state.join(&waiting_state);
                depths = depths.join(waiting_depths);
            }
            trace!("dequeue {edge:?} at depth {depth}: {state}");
            let work = f(&edge.stk, state, edge.dst)?;
            self.apply(work, &depths);
        }
        Ok(())
    }
}
