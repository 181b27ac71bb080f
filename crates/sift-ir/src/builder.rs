use std::sync::Arc;

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::block::{Block, BlockInfo};
use crate::exp::{Exp, FuncName, Var};
use crate::func::FuncInfo;
use crate::inst::Inst;
use crate::program::Program;
use crate::term::Term;

/// Error raised by [`ProgramBuilder`] on malformed input.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("function {0} declared twice")]
    DuplicateFunction(FuncName),
    #[error("block {block} ({lbl}) reserved but never defined")]
    UndefinedBlock { block: Block, lbl: Arc<str> },
    #[error("block {block} reachable from both {first} and {second}")]
    SharedBlock {
        block: Block,
        first: FuncName,
        second: FuncName,
    },
    #[error("block {block} ({lbl}) not reachable from any function entry")]
    UnreachedBlock { block: Block, lbl: Arc<str> },
}

/// Builder for [`Program`]s.
///
/// Blocks are reserved first, so terminators can reference blocks defined
/// later (as loops require), and filled in via [`define`](Self::define).
/// Functions are declared with the [`func`](Self::func) builder.
/// [`finish`](Self::finish) assembles the program and derives the metadata
/// analyses rely on: block membership and [`sort_index`] by depth-first
/// traversal from each entry, retreating flags on loop-closing jumps, and
/// `recursive` flags on calls inside call-graph cycles.
///
/// [`sort_index`]: crate::BlockInfo::sort_index
pub struct ProgramBuilder {
    globals: Vec<Var>,
    labels: Vec<Arc<str>>,
    defs: Vec<Option<(Vec<Inst>, Term)>>,
    functions: IndexMap<FuncName, PendingFunc>,
}

struct PendingFunc {
    params: Vec<Var>,
    freturn: Option<Var>,
    fthrow: Var,
    locals: FxHashSet<Var>,
    entry: Option<Block>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            globals: Vec::new(),
            labels: Vec::new(),
            defs: Vec::new(),
            functions: IndexMap::new(),
        }
    }

    /// Declare a global variable, returning it for convenience.
    pub fn global(&mut self, name: impl Into<Var>) -> Var {
        let var = name.into();
        self.globals.push(var.clone());
        var
    }

    /// Reserve a block id with the given label. The block's contents are
    /// supplied later via [`define`](Self::define).
    pub fn block(&mut self, lbl: &str) -> Block {
        let block = Block(self.labels.len() as u32);
        self.labels.push(Arc::from(lbl));
        self.defs.push(None);
        block
    }

    /// Fill in a reserved block's instructions and terminator.
    pub fn define(&mut self, block: Block) -> BlockDef<'_> {
        BlockDef {
            builder: self,
            block,
            cmnd: Vec::new(),
        }
    }

    /// Consume the builder, deriving metadata and producing the [`Program`].
    pub fn finish(self) -> Result<Program, BuildError> {
        let ProgramBuilder {
            globals,
            labels,
            defs,
            functions,
        } = self;

        let mut bodies = Vec::with_capacity(defs.len());
        for (i, def) in defs.into_iter().enumerate() {
            match def {
                Some(def) => bodies.push(def),
                None => {
                    return Err(BuildError::UndefinedBlock {
                        block: Block(i as u32),
                        lbl: labels[i].clone(),
                    });
                }
            }
        }

        // Per-function DFS: block membership, reverse postorder, back-edges.
        let mut parent: FxHashMap<Block, FuncName> = FxHashMap::default();
        let mut sort_index: FxHashMap<Block, u32> = FxHashMap::default();
        let mut func_blocks: FxHashMap<FuncName, Vec<Block>> = FxHashMap::default();
        let mut back_edges: FxHashSet<(Block, usize)> = FxHashSet::default();
        for (name, pending) in &functions {
            let Some(entry) = pending.entry else { continue };
            let postorder = dfs(name, entry, &bodies, &mut parent, &mut back_edges)?;
            let blocks: Vec<Block> = postorder.into_iter().rev().collect();
            for (i, block) in blocks.iter().enumerate() {
                sort_index.insert(*block, i as u32);
            }
            func_blocks.insert(name.clone(), blocks);
        }

        for &(block, jump_idx) in &back_edges {
            if let Some(jump) = bodies[block.0 as usize].1.jumps_mut().nth(jump_idx) {
                jump.retreating = true;
            }
        }

        mark_recursive_calls(&functions, &parent, &mut bodies);

        let mut blocks = Vec::with_capacity(bodies.len());
        for (i, (cmnd, term)) in bodies.into_iter().enumerate() {
            let block = Block(i as u32);
            let Some(parent) = parent.get(&block) else {
                return Err(BuildError::UnreachedBlock {
                    block,
                    lbl: labels[i].clone(),
                });
            };
            blocks.push(BlockInfo {
                parent: parent.clone(),
                sort_index: sort_index[&block],
                lbl: labels[i].clone(),
                cmnd,
                term,
            });
        }

        let functions = functions
            .into_iter()
            .map(|(name, pending)| {
                let func = FuncInfo {
                    name: name.clone(),
                    params: pending.params,
                    freturn: pending.freturn,
                    fthrow: pending.fthrow,
                    locals: pending.locals,
                    entry: pending.entry,
                    blocks: func_blocks.remove(&name).unwrap_or_default(),
                };
                (name, func)
            })
            .collect();

        Ok(Program {
            globals,
            functions,
            blocks,
        })
    }
}

#[bon::bon]
impl ProgramBuilder {
    /// Declare a function.
    ///
    /// `entry` is omitted for a function that is declared but has no body.
    /// `fthrow` defaults to a fresh `<name>.throw` variable.
    #[builder(finish_fn = new)]
    pub fn func(
        &mut self,
        #[builder(into)] name: FuncName,
        params: Option<Vec<Var>>,
        freturn: Option<Var>,
        fthrow: Option<Var>,
        locals: Option<Vec<Var>>,
        entry: Option<Block>,
    ) -> Result<FuncName, BuildError> {
        if self.functions.contains_key(&name) {
            return Err(BuildError::DuplicateFunction(name));
        }
        let fthrow =
            fthrow.unwrap_or_else(|| Var::new(format!("{}.throw", name.as_str())));
        self.functions.insert(
            name.clone(),
            PendingFunc {
                params: params.unwrap_or_default(),
                freturn,
                fthrow,
                locals: locals.unwrap_or_default().into_iter().collect(),
                entry,
            },
        );
        Ok(name)
    }
}

/// In-progress definition of one block, finished by [`term`](Self::term).
pub struct BlockDef<'a> {
    builder: &'a mut ProgramBuilder,
    block: Block,
    cmnd: Vec<Inst>,
}

impl BlockDef<'_> {
    /// Append an instruction.
    pub fn inst(mut self, inst: Inst) -> Self {
        self.cmnd.push(inst);
        self
    }

    /// Set the terminator and commit the block.
    pub fn term(self, term: Term) {
        self.builder.defs[self.block.0 as usize] = Some((self.cmnd, term));
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Grey,
    Black,
}

/// Iterative depth-first traversal of one function body from `entry`.
///
/// Claims every visited block for `name` in `parent`, records loop-closing
/// `(block, jump index)` pairs in `back_edges`, and returns the blocks in
/// postorder.
fn dfs(
    name: &FuncName,
    entry: Block,
    bodies: &[(Vec<Inst>, Term)],
    parent: &mut FxHashMap<Block, FuncName>,
    back_edges: &mut FxHashSet<(Block, usize)>,
) -> Result<Vec<Block>, BuildError> {
    let mut color: FxHashMap<Block, Color> = FxHashMap::default();
    let mut postorder = Vec::new();
    claim(parent, entry, name)?;
    color.insert(entry, Color::Grey);
    let mut stack: Vec<(Block, usize)> = vec![(entry, 0)];
    while let Some(&(block, next)) = stack.last() {
        let succ = bodies[block.0 as usize].1.jumps().map(|j| j.dst).nth(next);
        match succ {
            Some(succ) => {
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                match color.get(&succ) {
                    Some(Color::Grey) => {
                        back_edges.insert((block, next));
                    }
                    Some(Color::Black) => {}
                    None => {
                        claim(parent, succ, name)?;
                        color.insert(succ, Color::Grey);
                        stack.push((succ, 0));
                    }
                }
            }
            None => {
                color.insert(block, Color::Black);
                postorder.push(block);
                stack.pop();
            }
        }
    }
    Ok(postorder)
}

fn claim(
    parent: &mut FxHashMap<Block, FuncName>,
    block: Block,
    name: &FuncName,
) -> Result<(), BuildError> {
    match parent.get(&block) {
        Some(first) if first != name => Err(BuildError::SharedBlock {
            block,
            first: first.clone(),
            second: name.clone(),
        }),
        _ => {
            parent.insert(block, name.clone());
            Ok(())
        }
    }
}

/// Mark calls that close a call-graph cycle: call edges whose endpoints sit
/// in the same strongly-connected component.
fn mark_recursive_calls(
    functions: &IndexMap<FuncName, PendingFunc>,
    parent: &FxHashMap<Block, FuncName>,
    bodies: &mut [(Vec<Inst>, Term)],
) {
    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let nodes: FxHashMap<&FuncName, NodeIndex> = functions
        .keys()
        .map(|name| (name, graph.add_node(())))
        .collect();

    let mut sites: Vec<(usize, NodeIndex, NodeIndex)> = Vec::new();
    for (i, (_, term)) in bodies.iter().enumerate() {
        let Term::Call(call) = term else { continue };
        let Exp::Func(callee) = &call.callee else {
            continue;
        };
        let Some(caller) = parent.get(&Block(i as u32)) else {
            continue;
        };
        let (Some(&caller), Some(&callee)) = (nodes.get(caller), nodes.get(callee)) else {
            continue;
        };
        graph.add_edge(caller, callee, ());
        sites.push((i, caller, callee));
    }

    let mut scc: FxHashMap<NodeIndex, (usize, usize)> = FxHashMap::default();
    for (id, component) in tarjan_scc(&graph).into_iter().enumerate() {
        let len = component.len();
        for node in component {
            scc.insert(node, (id, len));
        }
    }

    for (i, caller, callee) in sites {
        let (caller_scc, len) = scc[&caller];
        let (callee_scc, _) = scc[&callee];
        if caller_scc == callee_scc && (len > 1 || caller == callee) {
            if let Term::Call(call) = &mut bodies[i].1 {
                call.recursive = true;
            }
        }
    }
}
