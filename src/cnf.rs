//! CNF translation of an [`Encoding`]
//!
//! Variables `0..symbols.len()` are the pebbling symbols themselves, so a model
//! can be read back by index. Every other variable is auxiliary.
//!
//! - Formulas are translated with Tseitin definitions, one per shared
//!   subformula. Top-level conjunctions and disjunctions are asserted
//!   directly as clauses.
//! - `AtMost` uses pairwise exclusion for small sets and a sequential counter
//!   otherwise.
//! - `RunningSum` uses an order-encoded accumulator (`ge[v]` ⇔ "sum ≥ v")
//!   per transition. Values above the bound are forbidden. Values that can no
//!   longer reach the bound, even if every remaining positive term fires, are
//!   clamped upward, which keeps the ladders short without losing models.
//!
//! A running-sum step whose formulas are all covered by a single `AtMost 1`
//! constraint is encoded as one transition. Any other step is split into one
//! transition per term, decrements first, so intermediate sums never exceed
//! the value reached at the end of the step.

use crate::constraints::{Constraint, Encoding};
use crate::formula::{FormulaStore, Prop};
use egg::Id;
use std::collections::{HashMap, HashSet};
use varisat::{CnfFormula, ExtendFormula, Lit, Var};

/// Clauses for one encoding.
pub struct Cnf {
    pub formula: CnfFormula,
    /// Number of leading variables that stand for symbols.
    pub symbol_count: usize,
    pub var_count: usize,
}

impl Cnf {
    pub fn clause_count(&self) -> usize {
        self.formula.len()
    }

    /// Literal of a symbol variable.
    pub fn symbol_lit(index: usize) -> Lit {
        Lit::positive(Var::from_index(index))
    }
}

pub fn translate(encoding: &Encoding) -> Cnf {
    let mut translator = Translator::new(&encoding.formulas, encoding.symbols.len());

    let exclusive: Vec<HashSet<Id>> = encoding
        .constraints
        .iter()
        .filter_map(|(_, constraint)| match constraint {
            Constraint::AtMost { bound: 1, items } => Some(items.iter().copied().collect()),
            _ => None,
        })
        .collect();

    for (_, constraint) in &encoding.constraints {
        match constraint {
            Constraint::Assert(id) => translator.assert(*id),
            Constraint::AtMost { bound, items } => translator.at_most(*bound, items),
            Constraint::RunningSum { steps, bound } => {
                translator.running_sum(steps, *bound, &exclusive)
            }
        }
    }

    translator.finish()
}

/// Truth value of an order-encoding bound.
#[derive(Clone, Copy)]
enum Level {
    True,
    False,
    Lit(Lit),
}

/// Order-encoded integer in `[lo, hi]`; `ge[i]` ⇔ value ≥ `lo + 1 + i`.
struct Ladder {
    lo: i64,
    hi: i64,
    ge: Vec<Lit>,
}

impl Ladder {
    fn zero() -> Self {
        Ladder {
            lo: 0,
            hi: 0,
            ge: Vec::new(),
        }
    }

    fn at_least(&self, value: i64) -> Level {
        if value <= self.lo {
            Level::True
        } else if value > self.hi {
            Level::False
        } else {
            Level::Lit(self.ge[(value - self.lo - 1) as usize])
        }
    }
}

struct Translator<'a> {
    store: &'a FormulaStore,
    cnf: CnfFormula,
    symbol_count: usize,
    next_var: usize,
    cache: HashMap<Id, Lit>,
    truth: Option<Lit>,
}

impl<'a> Translator<'a> {
    fn new(store: &'a FormulaStore, symbol_count: usize) -> Self {
        Translator {
            store,
            cnf: CnfFormula::new(),
            symbol_count,
            next_var: symbol_count,
            cache: HashMap::new(),
            truth: None,
        }
    }

    fn finish(self) -> Cnf {
        Cnf {
            formula: self.cnf,
            symbol_count: self.symbol_count,
            var_count: self.next_var,
        }
    }

    fn fresh(&mut self) -> Lit {
        let var = Var::from_index(self.next_var);
        self.next_var += 1;
        Lit::positive(var)
    }

    /// A literal forced true.
    fn truth(&mut self) -> Lit {
        if let Some(lit) = self.truth {
            return lit;
        }
        let lit = self.fresh();
        self.cnf.add_clause(&[lit]);
        self.truth = Some(lit);
        lit
    }

    fn lit(&mut self, id: Id) -> Lit {
        if let Some(&lit) = self.cache.get(&id) {
            return lit;
        }
        let store = self.store;
        let lit = match store.node(id) {
            Prop::Const(true) => self.truth(),
            Prop::Const(false) => !self.truth(),
            Prop::Var(symbol) => Cnf::symbol_lit(symbol.index()),
            Prop::Not(inner) => !self.lit(*inner),
            Prop::And(items) => {
                let operands: Vec<Lit> = items.iter().map(|&i| self.lit(i)).collect();
                let out = self.fresh();
                for &operand in &operands {
                    self.cnf.add_clause(&[!out, operand]);
                }
                let mut all: Vec<Lit> = operands.iter().map(|&l| !l).collect();
                all.push(out);
                self.cnf.add_clause(&all);
                out
            }
            Prop::Or(items) => {
                let operands: Vec<Lit> = items.iter().map(|&i| self.lit(i)).collect();
                let out = self.fresh();
                for &operand in &operands {
                    self.cnf.add_clause(&[!operand, out]);
                }
                let mut any = operands;
                any.push(!out);
                self.cnf.add_clause(&any);
                out
            }
        };
        self.cache.insert(id, lit);
        lit
    }

    fn assert(&mut self, id: Id) {
        let store = self.store;
        match store.node(id) {
            Prop::Const(true) => {}
            Prop::And(items) => {
                for &item in items.iter() {
                    self.assert(item);
                }
            }
            Prop::Or(items) => {
                let clause: Vec<Lit> = items.iter().map(|&i| self.lit(i)).collect();
                self.cnf.add_clause(&clause);
            }
            _ => {
                let lit = self.lit(id);
                self.cnf.add_clause(&[lit]);
            }
        }
    }

    fn at_most(&mut self, bound: u32, items: &[Id]) {
        let lits: Vec<Lit> = items.iter().map(|&i| self.lit(i)).collect();
        let k = bound as usize;
        let n = lits.len();
        if n <= k {
            return;
        }
        if k == 0 {
            for &lit in &lits {
                self.cnf.add_clause(&[!lit]);
            }
            return;
        }
        if k == 1 && n <= 6 {
            for i in 0..n {
                for j in i + 1..n {
                    self.cnf.add_clause(&[!lits[i], !lits[j]]);
                }
            }
            return;
        }

        // Sinz sequential counter: s[i][j] ⇔ at least j + 1 of lits[..=i] hold
        let s: Vec<Vec<Lit>> = (0..n - 1)
            .map(|_| (0..k).map(|_| self.fresh()).collect())
            .collect();

        self.cnf.add_clause(&[!lits[0], s[0][0]]);
        for j in 1..k {
            self.cnf.add_clause(&[!s[0][j]]);
        }
        for i in 1..n - 1 {
            self.cnf.add_clause(&[!lits[i], s[i][0]]);
            self.cnf.add_clause(&[!s[i - 1][0], s[i][0]]);
            for j in 1..k {
                self.cnf.add_clause(&[!lits[i], !s[i - 1][j - 1], s[i][j]]);
                self.cnf.add_clause(&[!s[i - 1][j], s[i][j]]);
            }
            self.cnf.add_clause(&[!lits[i], !s[i - 1][k - 1]]);
        }
        self.cnf.add_clause(&[!lits[n - 1], !s[n - 2][k - 1]]);
    }

    fn running_sum(&mut self, steps: &[Vec<(i64, Id)>], bound: u32, exclusive: &[HashSet<Id>]) {
        let bound = i64::from(bound);

        // each transition has at most one active term
        let mut transitions: Vec<Vec<(i64, Lit)>> = Vec::new();
        for step in steps {
            let terms: Vec<(i64, Id)> = step.iter().copied().filter(|(w, _)| *w != 0).collect();
            if terms.is_empty() {
                continue;
            }
            let covered = exclusive
                .iter()
                .any(|set| terms.iter().all(|(_, id)| set.contains(id)));
            let lits: Vec<(i64, Lit)> = terms.iter().map(|&(w, id)| (w, self.lit(id))).collect();
            if covered {
                transitions.push(lits);
            } else {
                let (decrements, increments): (Vec<_>, Vec<_>) =
                    lits.into_iter().partition(|(w, _)| *w < 0);
                transitions.extend(decrements.into_iter().map(|term| vec![term]));
                transitions.extend(increments.into_iter().map(|term| vec![term]));
            }
        }

        // potential[k]: most the sum can still grow from transition k on
        let mut potential = vec![0i64; transitions.len() + 1];
        for k in (0..transitions.len()).rev() {
            let gain = transitions[k].iter().map(|(w, _)| *w).max().unwrap_or(0).max(0);
            potential[k] = potential[k + 1] + gain;
        }

        let mut prev = Ladder::zero();
        for (k, terms) in transitions.iter().enumerate() {
            let drop = terms.iter().map(|(w, _)| *w).min().unwrap_or(0).min(0);
            let gain = terms.iter().map(|(w, _)| *w).max().unwrap_or(0).max(0);
            let hi = bound.min(prev.hi + gain);
            let lo = (prev.lo + drop).max(bound - potential[k + 1]).min(hi);

            let ge: Vec<Lit> = (lo + 1..=hi).map(|_| self.fresh()).collect();
            for pair in ge.windows(2) {
                self.cnf.add_clause(&[!pair[1], pair[0]]);
            }
            let next = Ladder { lo, hi, ge };

            let decrements: Vec<Lit> = terms
                .iter()
                .filter(|(w, _)| *w < 0)
                .map(|(_, lit)| *lit)
                .collect();

            // v = hi + 1 forbids overflow
            for v in lo + 1..=hi + 1 {
                let conclusion = next.at_least(v);
                self.implication(prev.at_least(v), &[], &decrements, conclusion);
                for &(w, lit) in terms {
                    self.implication(prev.at_least(v - w), &[lit], &[], conclusion);
                }
            }
            prev = next;
        }
    }

    /// `premise ∧ conditions → conclusion ∨ alternatives`
    fn implication(&mut self, premise: Level, conditions: &[Lit], alternatives: &[Lit], conclusion: Level) {
        let mut clause = Vec::with_capacity(conditions.len() + alternatives.len() + 2);
        match premise {
            Level::False => return,
            Level::True => {}
            Level::Lit(lit) => clause.push(!lit),
        }
        match conclusion {
            Level::True => return,
            Level::False => {}
            Level::Lit(lit) => clause.push(lit),
        }
        clause.extend(conditions.iter().map(|&lit| !lit));
        clause.extend_from_slice(alternatives);
        if clause.is_empty() {
            let truth = self.truth();
            clause.push(!truth);
        }
        self.cnf.add_clause(&clause);
    }
}
