//! Pebbling rules and the symbol registry
//!
//! A symbol is the boolean proposition "rule `r` is applied to node `n` at
//! time `t`". The [`SymbolTable`] hands out a dense [`SymbolId`] per distinct
//! `(node, rule, time)` triple; registering the same triple twice returns the
//! same id, so the encoder can ask for symbols freely while building formulas.

use crate::dag::NodeId;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Internal lookup failures. Reaching one of these is a bug, not bad input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol id {0} does not belong to this table")]
    Foreign(SymbolId),
}

/// The four moves of the red/blue pebble game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Rule {
    /// Slow memory to register (R1).
    Load,
    /// Register to slow memory (R2).
    Store,
    /// Produce a value in a register from resident operands (R3).
    Compute,
    /// Free a register (R4).
    Delete,
}

impl Rule {
    pub const ALL: [Rule; 4] = [Rule::Load, Rule::Store, Rule::Compute, Rule::Delete];

    /// Change in register occupancy caused by applying the rule.
    pub fn weight(self) -> i64 {
        match self {
            Rule::Load | Rule::Compute => 1,
            Rule::Store | Rule::Delete => -1,
        }
    }

    /// Short name used in schedule dumps.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Rule::Load => "R1",
            Rule::Store => "R2",
            Rule::Compute => "R3",
            Rule::Delete => "R4",
        }
    }

    pub fn is_io(self) -> bool {
        matches!(self, Rule::Load | Rule::Store)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Load => "load",
            Rule::Store => "store",
            Rule::Compute => "compute",
            Rule::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// Dense handle of a registered symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn from_index(index: usize) -> Self {
        SymbolId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl FromStr for SymbolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('s')
            .and_then(|digits| digits.parse::<u32>().ok())
            .map(SymbolId)
            .ok_or_else(|| format!("not a symbol id: {}", s))
    }
}

/// The `(node, rule, time)` triple a symbol stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolKey {
    pub node: NodeId,
    pub rule: Rule,
    pub time: u32,
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.rule.mnemonic(), self.node, self.time)
    }
}

/// Registry of all symbols created while encoding one instance.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    keys: Vec<SymbolKey>,
    index: HashMap<SymbolKey, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the symbol for `(node, rule, time)`, creating it if needed.
    pub fn register(&mut self, node: NodeId, rule: Rule, time: u32) -> SymbolId {
        let key = SymbolKey { node, rule, time };
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = SymbolId::from_index(self.keys.len());
        self.keys.push(key);
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, node: NodeId, rule: Rule, time: u32) -> Option<SymbolId> {
        self.index.get(&SymbolKey { node, rule, time }).copied()
    }

    pub fn key(&self, id: SymbolId) -> Result<SymbolKey, SymbolError> {
        self.keys
            .get(id.index())
            .copied()
            .ok_or(SymbolError::Foreign(id))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolKey)> + '_ {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, key)| (SymbolId::from_index(i), key))
    }

    /// Symbols and their keys grouped by time step, `budget` groups in total.
    /// Symbols dated at or after `budget` are left out.
    pub fn by_time(&self, budget: u32) -> Vec<Vec<(SymbolId, SymbolKey)>> {
        let mut steps = vec![Vec::new(); budget as usize];
        for (id, key) in self.iter() {
            if let Some(step) = steps.get_mut(key.time as usize) {
                step.push((id, *key));
            }
        }
        steps
    }

    pub fn count(&self, rule: Rule) -> usize {
        self.keys.iter().filter(|k| k.rule == rule).count()
    }
}
