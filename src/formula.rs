//! Boolean formula store
//!
//! Formulas over pebbling symbols are kept in an egg e-graph used purely as a
//! hash-consing arena: every structurally identical subformula is stored once
//! and referred to by its [`Id`]. The encoder builds the same "no delete in
//! `[a, b)`" or "value is available at `t`" subformula from many places, and
//! sharing keeps the store (and the CNF later produced from it) compact.
//!
//! No rewrites are ever run, so every e-class holds exactly one e-node.
//!
//! # Smart constructors
//!
//! [`FormulaStore::and`], [`FormulaStore::or`] and [`FormulaStore::not`] fold
//! constants as they build:
//!
//! ```text
//! and()            = true        or()            = false
//! and(x, false, …) = false       or(x, true, …)  = true
//! and(x, true)     = x           or(x, false)    = x
//! not(not(x))      = x           not(true)       = false
//! ```
//!
//! Operands are sorted and deduplicated, so `and(a, b)` and `and(b, a, a)`
//! land on the same node.

use crate::symbols::SymbolId;
use egg::{define_language, EGraph, Id};

define_language! {
    pub enum Prop {
        "and" = And(Box<[Id]>),
        "or" = Or(Box<[Id]>),
        "not" = Not(Id),

        // Terminals
        Const(bool),
        Var(SymbolId),
    }
}

/// Hash-consed arena of boolean formulas.
pub struct FormulaStore {
    egraph: EGraph<Prop, ()>,
    truth: Id,
    falsity: Id,
}

impl Default for FormulaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaStore {
    pub fn new() -> Self {
        let mut egraph: EGraph<Prop, ()> = EGraph::default();
        let truth = egraph.add(Prop::Const(true));
        let falsity = egraph.add(Prop::Const(false));
        FormulaStore {
            egraph,
            truth,
            falsity,
        }
    }

    pub fn constant(&self, value: bool) -> Id {
        if value {
            self.truth
        } else {
            self.falsity
        }
    }

    pub fn var(&mut self, symbol: SymbolId) -> Id {
        self.egraph.add(Prop::Var(symbol))
    }

    pub fn not(&mut self, operand: Id) -> Id {
        let folded = match self.node(operand) {
            Prop::Const(value) => Some(self.constant(!*value)),
            Prop::Not(inner) => Some(*inner),
            _ => None,
        };
        folded.unwrap_or_else(|| self.egraph.add(Prop::Not(operand)))
    }

    pub fn and<I: IntoIterator<Item = Id>>(&mut self, operands: I) -> Id {
        self.junction(operands, true)
    }

    pub fn or<I: IntoIterator<Item = Id>>(&mut self, operands: I) -> Id {
        self.junction(operands, false)
    }

    /// `premise → conclusion`
    pub fn implies(&mut self, premise: Id, conclusion: Id) -> Id {
        let negated = self.not(premise);
        self.or([negated, conclusion])
    }

    /// Shared body of `and`/`or`. `identity` is the neutral constant
    /// (`true` for conjunction); its negation absorbs the whole junction.
    fn junction<I: IntoIterator<Item = Id>>(&mut self, operands: I, identity: bool) -> Id {
        let mut kept = Vec::new();
        for id in operands {
            match self.const_value(id) {
                Some(value) if value == identity => {}
                Some(_) => return self.constant(!identity),
                None => kept.push(id),
            }
        }
        kept.sort_unstable();
        kept.dedup();
        match kept.len() {
            0 => self.constant(identity),
            1 => kept[0],
            _ if identity => self.egraph.add(Prop::And(kept.into_boxed_slice())),
            _ => self.egraph.add(Prop::Or(kept.into_boxed_slice())),
        }
    }

    /// The single e-node stored for `id`.
    pub fn node(&self, id: Id) -> &Prop {
        &self.egraph[id].nodes[0]
    }

    pub fn const_value(&self, id: Id) -> Option<bool> {
        match self.node(id) {
            Prop::Const(value) => Some(*value),
            _ => None,
        }
    }

    /// Number of distinct subformulas stored.
    pub fn len(&self) -> usize {
        self.egraph.number_of_classes()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate `id` under an assignment of symbols.
    pub fn evaluate<F: Fn(SymbolId) -> bool>(&self, id: Id, value_of: &F) -> bool {
        match self.node(id) {
            Prop::Const(value) => *value,
            Prop::Var(symbol) => value_of(*symbol),
            Prop::Not(inner) => !self.evaluate(*inner, value_of),
            Prop::And(items) => items.iter().all(|&i| self.evaluate(i, value_of)),
            Prop::Or(items) => items.iter().any(|&i| self.evaluate(i, value_of)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(store: &mut FormulaStore, count: usize) -> Vec<Id> {
        (0..count)
            .map(|i| store.var(SymbolId::from_index(i)))
            .collect()
    }

    #[test]
    fn test_hash_consing_shares_nodes() {
        let mut store = FormulaStore::new();
        let v = vars(&mut store, 2);
        let first = store.and([v[0], v[1]]);
        let size = store.len();
        let second = store.and([v[1], v[0], v[1]]);
        assert_eq!(first, second);
        assert_eq!(store.len(), size);
    }

    #[test]
    fn test_constant_folding() {
        let mut store = FormulaStore::new();
        let v = vars(&mut store, 1);
        let t = store.constant(true);
        let f = store.constant(false);
        assert_eq!(store.and([v[0], t]), v[0]);
        assert_eq!(store.and([v[0], f]), f);
        assert_eq!(store.or([v[0], t]), t);
        assert_eq!(store.or([v[0], f]), v[0]);
        assert_eq!(store.and(Vec::new()), t);
        assert_eq!(store.or(Vec::new()), f);
        assert_eq!(store.not(t), f);
    }

    #[test]
    fn test_double_negation() {
        let mut store = FormulaStore::new();
        let v = vars(&mut store, 1);
        let negated = store.not(v[0]);
        assert_ne!(negated, v[0]);
        assert_eq!(store.not(negated), v[0]);
    }

    #[test]
    fn test_evaluate() {
        let mut store = FormulaStore::new();
        let v = vars(&mut store, 3);
        let left = store.and([v[0], v[1]]);
        let formula = store.implies(left, v[2]);
        let assignment = |s: SymbolId| s.index() != 2;
        assert!(!store.evaluate(formula, &assignment));
        assert!(store.evaluate(formula, &|_| true));
        assert!(store.evaluate(formula, &|_| false));
    }
}
