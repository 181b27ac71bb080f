use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::{FxHashSet, FxHasher};
use sift_ir::{Call, Jump, Var};

use crate::domain::Domain;

/// One frame of an interprocedural call stack.
pub enum Frame<'pgm, D: Domain> {
    /// An active call: where to resume in the caller, the callee's formals
    /// and locals (needed to unwind the frame), and the domain's token for
    /// reconciling the eventual return.
    Call {
        recursive: bool,
        dst: Jump,
        params: &'pgm [Var],
        locals: &'pgm FxHashSet<Var>,
        from_call: D::FromCall,
    },
    /// An exception landing pad installed by the enclosing call.
    Throw { handler: Jump },
}

struct Node<'pgm, D: Domain> {
    frame: Frame<'pgm, D>,
    tail: CallStack<'pgm, D>,
    /// Rolling hash of the stack up to this node under inlined-location
    /// equivalence: recursive call frames are transparent and `from_call`
    /// is excluded, keeping the hash consistent with
    /// [`CallStack::cmp_inlined`].
    inlined_hash: u64,
}

/// A persistent interprocedural call stack.
///
/// Stacks are immutable cons lists sharing their tails, so pushing never
/// copies and the many stacks alive in a worklist share structure. Identity
/// is *inlined-location* equivalence: two stacks are equal when they denote
/// the same chain of return sites after eliding recursive call frames,
/// ignoring the domain's `from_call` tokens. All of `Eq`, `Ord` and `Hash`
/// agree with that equivalence.
pub struct CallStack<'pgm, D: Domain> {
    head: Option<Arc<Node<'pgm, D>>>,
}

const EMPTY_HASH: u64 = 0x9e37_79b9_7f4a_7c15;

fn mix(tag: u64, jump: Jump, tail: u64) -> u64 {
    let mut h = FxHasher::default();
    h.write_u64(tag);
    h.write_u32(jump.dst.raw());
    h.write_u8(jump.retreating as u8);
    h.write_u64(tail);
    h.finish()
}

impl<'pgm, D: Domain> CallStack<'pgm, D> {
    /// The empty stack.
    pub fn empty() -> Self {
        CallStack { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn push(&self, frame: Frame<'pgm, D>) -> Self {
        let inlined_hash = match &frame {
            Frame::Call {
                recursive: true, ..
            } => self.inlined_hash(),
            Frame::Call { dst, .. } => mix(1, *dst, self.inlined_hash()),
            Frame::Throw { handler } => mix(2, *handler, self.inlined_hash()),
        };
        CallStack {
            head: Some(Arc::new(Node {
                frame,
                tail: self.clone(),
                inlined_hash,
            })),
        }
    }

    /// Push the frames for a call transition: the call frame for the
    /// callee, with the landing-pad throw frame paired on top when the call
    /// site has one.
    ///
    /// Refused (`None`) when the stack already holds more than `bound` call
    /// frames returning to the same site — the recursion bound.
    pub fn push_call(
        &self,
        call: &Call,
        bound: u32,
        from_call: D::FromCall,
        params: &'pgm [Var],
        locals: &'pgm FxHashSet<Var>,
    ) -> Option<Self> {
        let repeats = self
            .frames()
            .filter(|frame| matches!(frame, Frame::Call { dst, .. } if *dst == call.retn))
            .count() as u32;
        if repeats > bound {
            return None;
        }
        let stk = self.push(Frame::Call {
            recursive: call.recursive,
            dst: call.retn,
            params,
            locals,
            from_call,
        });
        Some(match call.throw {
            Some(handler) => stk.push(Frame::Throw { handler }),
            None => stk,
        })
    }

    /// Pop the frame of a returning function: discard any throw frames on
    /// top, then pop the first call frame, yielding its `from_call`, the
    /// return site, and the remaining stack. `None` on a top-level return.
    pub fn pop_return(&self) -> Option<(D::FromCall, Jump, Self)> {
        let mut cur = self;
        loop {
            let node = cur.head.as_ref()?;
            match &node.frame {
                Frame::Throw { .. } => cur = &node.tail,
                Frame::Call { from_call, dst, .. } => {
                    return Some((from_call.clone(), *dst, node.tail.clone()));
                }
            }
        }
    }

    /// Unwind the stack for a raised exception.
    ///
    /// Walks from the top, folding each call frame's formals, locals and
    /// `from_call` through `unwind` to accumulate the unwound state. At a
    /// throw frame, also pops the enclosing call frame directly beneath it
    /// (guaranteed by stack well-formedness) and yields that frame's
    /// `from_call`, the handler, the remaining stack, and the accumulator.
    /// `None` when the exception escapes every frame.
    pub fn pop_throw<A>(
        &self,
        init: A,
        mut unwind: impl FnMut(&'pgm [Var], &'pgm FxHashSet<Var>, &D::FromCall, A) -> A,
    ) -> Option<(D::FromCall, Jump, Self, A)> {
        let mut acc = init;
        let mut cur = self;
        loop {
            let node = cur.head.as_ref()?;
            match &node.frame {
                Frame::Call {
                    params,
                    locals,
                    from_call,
                    ..
                } => {
                    acc = unwind(params, locals, from_call, acc);
                    cur = &node.tail;
                }
                Frame::Throw { handler } => {
                    let below = node
                        .tail
                        .head
                        .as_ref()
                        .unwrap_or_else(|| panic!("malformed call stack: throw frame above empty"));
                    match &below.frame {
                        Frame::Call { from_call, .. } => {
                            return Some((from_call.clone(), *handler, below.tail.clone(), acc));
                        }
                        Frame::Throw { .. } => {
                            panic!("malformed call stack: throw frame without enclosing call")
                        }
                    }
                }
            }
        }
    }

    /// Iterate over the frames, top first.
    pub fn frames(&self) -> Frames<'_, 'pgm, D> {
        Frames { cur: self }
    }

    fn inlined_hash(&self) -> u64 {
        match &self.head {
            Some(node) => node.inlined_hash,
            None => EMPTY_HASH,
        }
    }

    /// Compare under inlined-location equivalence: recursive call frames
    /// are transparent on both sides, `from_call` is ignored, the empty
    /// stack is minimal, and call frames order before throw frames.
    pub fn cmp_inlined(&self, other: &Self) -> Ordering {
        let mut x = self;
        let mut y = other;
        loop {
            if let Some(node) = &x.head {
                if matches!(
                    node.frame,
                    Frame::Call {
                        recursive: true,
                        ..
                    }
                ) {
                    x = &node.tail;
                    continue;
                }
            }
            if let Some(node) = &y.head {
                if matches!(
                    node.frame,
                    Frame::Call {
                        recursive: true,
                        ..
                    }
                ) {
                    y = &node.tail;
                    continue;
                }
            }
            return match (&x.head, &y.head) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => {
                    if Arc::ptr_eq(a, b) {
                        return Ordering::Equal;
                    }
                    match (&a.frame, &b.frame) {
                        (Frame::Call { dst: d1, .. }, Frame::Call { dst: d2, .. }) => {
                            match d1.cmp(d2) {
                                Ordering::Equal => a.tail.cmp_inlined(&b.tail),
                                ord => ord,
                            }
                        }
                        (Frame::Throw { handler: h1 }, Frame::Throw { handler: h2 }) => {
                            match h1.cmp(h2) {
                                Ordering::Equal => a.tail.cmp_inlined(&b.tail),
                                ord => ord,
                            }
                        }
                        (Frame::Call { .. }, Frame::Throw { .. }) => Ordering::Less,
                        (Frame::Throw { .. }, Frame::Call { .. }) => Ordering::Greater,
                    }
                }
            };
        }
    }
}

/// Iterator over stack frames, top first.
pub struct Frames<'a, 'pgm, D: Domain> {
    cur: &'a CallStack<'pgm, D>,
}

impl<'a, 'pgm, D: Domain> Iterator for Frames<'a, 'pgm, D> {
    type Item = &'a Frame<'pgm, D>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur.head.as_ref()?;
        self.cur = &node.tail;
        Some(&node.frame)
    }
}

impl<'pgm, D: Domain> Clone for CallStack<'pgm, D> {
    fn clone(&self) -> Self {
        CallStack {
            head: self.head.clone(),
        }
    }
}

impl<D: Domain> PartialEq for CallStack<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_inlined(other) == Ordering::Equal
    }
}

impl<D: Domain> Eq for CallStack<'_, D> {}

impl<D: Domain> PartialOrd for CallStack<'_, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Domain> Ord for CallStack<'_, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_inlined(other)
    }
}

impl<D: Domain> Hash for CallStack<'_, D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inlined_hash());
    }
}

impl<D: Domain> fmt::Debug for CallStack<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for frame in self.frames() {
            match frame {
                Frame::Call {
                    recursive, dst, ..
                } => {
                    if *recursive {
                        list.entry(&format_args!("call* {dst}"));
                    } else {
                        list.entry(&format_args!("call {dst}"));
                    }
                }
                Frame::Throw { handler } => {
                    list.entry(&format_args!("throw {handler}"));
                }
            }
        }
        list.finish()
    }
}
