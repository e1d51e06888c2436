//! Computation DAG construction
//!
//! A [`DependencyTable`] is the raw input: one fixed-width row per node, where
//! every entry is a 1-based predecessor index and `0` marks an unused slot.
//! [`Dag::from_table`] validates the table and builds an arena of [`Node`]s
//! addressed by [`NodeId`], with predecessor and successor lists kept in sync.
//!
//! # Invariants
//!
//! - Every node id refers to a node of the same DAG.
//! - `p` is a predecessor of `n` exactly when `n` is a successor of `p`.
//! - The graph is acyclic and has no self-loops or repeated edges.
//! - Inputs are the nodes without predecessors, outputs the nodes without
//!   successors (an isolated node is both).

use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Errors raised while turning a dependency table into a DAG.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency table has no rows")]
    Empty,

    #[error("row {row} has {width} entries but the table allows {max_deps}")]
    RowTooWide {
        row: usize,
        width: usize,
        max_deps: usize,
    },

    #[error("node {node} depends on {index}, but the table only has {len} nodes")]
    IndexOutOfRange { node: NodeId, index: u32, len: usize },

    #[error("node {0} depends on itself")]
    SelfLoop(NodeId),

    #[error("node {node} lists predecessor {predecessor} more than once")]
    DuplicatePredecessor { node: NodeId, predecessor: NodeId },

    #[error("dependency cycle through node {0}")]
    Cycle(NodeId),
}

/// Index of a node in its [`Dag`].
///
/// Stored 0-based; displayed and serialized with the 1-based numbering used by
/// dependency tables, so `NodeId::from_index(0)` prints as `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    /// Build an id from a 1-based table number. Returns `None` for the `0` sentinel.
    pub fn from_number(number: u32) -> Option<Self> {
        (number as usize).checked_sub(1).map(NodeId)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// 1-based number, as written in dependency tables.
    pub fn number(self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.number() as u64)
    }
}

/// Fixed-width dependency rows, one per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTable {
    max_deps: usize,
    rows: Vec<Vec<u32>>,
}

impl DependencyTable {
    /// Create a table whose rows hold at most `max_deps` entries.
    ///
    /// Shorter rows are padded with the `0` sentinel so every row has the
    /// same width.
    pub fn new(max_deps: usize, rows: Vec<Vec<u32>>) -> Result<Self, GraphError> {
        let mut padded = Vec::with_capacity(rows.len());
        for (row, mut entries) in rows.into_iter().enumerate() {
            if entries.len() > max_deps {
                return Err(GraphError::RowTooWide {
                    row: row + 1,
                    width: entries.len(),
                    max_deps,
                });
            }
            entries.resize(max_deps, 0);
            padded.push(entries);
        }
        Ok(DependencyTable {
            max_deps,
            rows: padded,
        })
    }

    /// Create a table as wide as its widest row.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Self {
        let max_deps = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut entries| {
                entries.resize(max_deps, 0);
                entries
            })
            .collect();
        DependencyTable { max_deps, rows }
    }

    pub fn max_deps(&self) -> usize {
        self.max_deps
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A vertex of the computation DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Node {
            id,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn is_input(&self) -> bool {
        self.predecessors.is_empty()
    }

    pub fn is_output(&self) -> bool {
        self.successors.is_empty()
    }
}

/// Validated, immutable computation DAG.
#[derive(Debug, Clone)]
pub struct Dag {
    nodes: Vec<Node>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    topological_order: Vec<NodeId>,
}

impl Dag {
    /// Build a DAG from a dependency table.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] for an empty table, a predecessor index past
    /// the last row, a self-loop, a repeated predecessor, or a cycle.
    pub fn from_table(table: &DependencyTable) -> Result<Self, GraphError> {
        if table.is_empty() {
            return Err(GraphError::Empty);
        }

        let len = table.len();
        let mut nodes: Vec<Node> = (0..len).map(|i| Node::new(NodeId(i))).collect();

        for (row, entries) in table.rows().iter().enumerate() {
            let node = NodeId(row);
            for &entry in entries {
                let Some(pred) = NodeId::from_number(entry) else {
                    continue;
                };
                if pred.index() >= len {
                    return Err(GraphError::IndexOutOfRange {
                        node,
                        index: entry,
                        len,
                    });
                }
                if pred == node {
                    return Err(GraphError::SelfLoop(node));
                }
                if nodes[row].predecessors.contains(&pred) {
                    return Err(GraphError::DuplicatePredecessor {
                        node,
                        predecessor: pred,
                    });
                }
                nodes[row].predecessors.push(pred);
                nodes[pred.index()].successors.push(node);
            }
        }

        let topological_order = topological_sort(&nodes)?;
        let inputs = nodes.iter().filter(|n| n.is_input()).map(|n| n.id).collect();
        let outputs = nodes.iter().filter(|n| n.is_output()).map(|n| n.id).collect();

        Ok(Dag {
            nodes,
            inputs,
            outputs,
            topological_order,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].predecessors
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].successors
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn is_input(&self, id: NodeId) -> bool {
        self.node(id).is_input()
    }

    pub fn is_output(&self, id: NodeId) -> bool {
        self.node(id).is_output()
    }

    /// Nodes ordered so that every predecessor precedes its successors.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topological_order
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.predecessors.len()).sum()
    }

    /// Number of edges on the longest input-to-output path.
    pub fn depth(&self) -> usize {
        let mut level = vec![0usize; self.nodes.len()];
        for &id in &self.topological_order {
            let node = &self.nodes[id.index()];
            level[id.index()] = node
                .predecessors
                .iter()
                .map(|p| level[p.index()] + 1)
                .max()
                .unwrap_or(0);
        }
        level.into_iter().max().unwrap_or(0)
    }
}

/// Kahn's algorithm. Fails on the first node left with unresolved predecessors.
fn topological_sort(nodes: &[Node]) -> Result<Vec<NodeId>, GraphError> {
    let mut pending: Vec<usize> = nodes.iter().map(|n| n.predecessors.len()).collect();
    let mut ready: VecDeque<NodeId> = nodes.iter().filter(|n| n.is_input()).map(|n| n.id).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(id) = ready.pop_front() {
        order.push(id);
        for &succ in &nodes[id.index()].successors {
            pending[succ.index()] -= 1;
            if pending[succ.index()] == 0 {
                ready.push_back(succ);
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck = pending
            .iter()
            .position(|&count| count > 0)
            .map(NodeId)
            .unwrap_or(NodeId(0));
        return Err(GraphError::Cycle(stuck));
    }
    Ok(order)
}
