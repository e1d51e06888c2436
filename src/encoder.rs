//! Pebble-game constraint encoding
//!
//! Translates a DAG, its mobility windows, a time budget `B` and a register
//! capacity into an [`Encoding`]: a set of boolean and cardinality constraints
//! over symbols `rule(node, time)` that is satisfiable exactly when a
//! schedule of at most `B` rule applications exists under this model.
//!
//! # Constraint families
//!
//! 1. **Node schedule.** Every computed node `n` is computed exactly once at
//!    some `t` in its window. Computing at `t` is *guarded*: each predecessor
//!    must be available at `t` and deleted later, and outputs must be stored
//!    after `t`.
//! 2. **Frame.** Every rule application implies its register preconditions
//!    (a load needs a non-resident, undeleted value; a compute needs resident
//!    operands; store and delete need a resident value). Residency is derived
//!    from the symbols themselves.
//! 3. **Exclusivity.** At most one rule application per time step.
//! 4. **Capacity.** The running sum of `+1` (load, compute) and `-1` (store,
//!    delete) never exceeds the capacity.
//!
//! Symbols are created lazily while the node schedules are built; the other
//! families only talk about symbols that already exist, treating any missing
//! symbol as false.

use crate::constraints::{Constraint, Encoding, Origin};
use crate::dag::{Dag, NodeId};
use crate::formula::FormulaStore;
use crate::mobility::Mobility;
use crate::symbols::{Rule, SymbolTable};
use egg::Id;
use log::{debug, info};
use std::collections::HashMap;
use std::ops::Range;

/// Builds an [`Encoding`] for one (DAG, budget, capacity) configuration.
pub struct Encoder<'a> {
    dag: &'a Dag,
    mobility: &'a Mobility,
    budget: u32,
    capacity: u32,
    symbols: SymbolTable,
    formulas: FormulaStore,
    guards: HashMap<(NodeId, u32), Id>,
    constraints: Vec<(Origin, Constraint)>,
}

impl<'a> Encoder<'a> {
    pub fn new(dag: &'a Dag, mobility: &'a Mobility, capacity: u32) -> Self {
        Encoder {
            dag,
            mobility,
            budget: mobility.budget(),
            capacity,
            symbols: SymbolTable::new(),
            formulas: FormulaStore::new(),
            guards: HashMap::new(),
            constraints: Vec::new(),
        }
    }

    pub fn encode(mut self) -> Encoding {
        info!(
            "encoding {} nodes, budget {}, capacity {}",
            self.dag.len(),
            self.budget,
            self.capacity
        );

        info!("building node constraints");
        let dag = self.dag;
        for &id in dag.topological_order() {
            if !dag.is_input(id) {
                self.schedule_node(id);
            }
        }

        info!("building frame constraints");
        self.frame_constraints();

        info!("building exclusivity constraints");
        self.exclusivity_constraints();

        info!("building capacity constraint");
        self.capacity_constraint();

        let mut encoding = Encoding::new(self.symbols, self.formulas, self.budget, self.capacity);
        encoding.constraints = self.constraints;
        debug!("encoding: {}", encoding.stats());
        encoding
    }

    // ========================================================================
    // Symbol helpers
    // ========================================================================

    fn sym(&mut self, node: NodeId, rule: Rule, time: u32) -> Id {
        let symbol = self.symbols.register(node, rule, time);
        self.formulas.var(symbol)
    }

    /// Existing symbol as a formula, or `false` if it was never created.
    fn existing(&mut self, node: NodeId, rule: Rule, time: u32) -> Id {
        match self.symbols.get(node, rule, time) {
            Some(symbol) => self.formulas.var(symbol),
            None => self.formulas.constant(false),
        }
    }

    /// `rule` is applied to `node` at some time in `range`.
    fn any(&mut self, node: NodeId, rule: Rule, range: Range<u32>) -> Id {
        let items: Vec<Id> = range.map(|t| self.sym(node, rule, t)).collect();
        self.formulas.or(items)
    }

    fn none(&mut self, node: NodeId, rule: Rule, range: Range<u32>) -> Id {
        let any = self.any(node, rule, range);
        self.formulas.not(any)
    }

    // ========================================================================
    // Node schedule
    // ========================================================================

    fn schedule_node(&mut self, node: NodeId) {
        let preds = self.dag.predecessors(node).to_vec();
        let is_output = self.dag.is_output(node);

        let mut guards = Vec::new();
        for t in self.mobility.compute_steps(node) {
            let mut parts = vec![self.sym(node, Rule::Compute, t)];
            for &p in &preds {
                parts.push(self.availability(p, t));
                parts.push(self.release(p, t));
            }
            if is_output {
                parts.push(self.any(node, Rule::Store, t + 1..self.budget));
            }
            let guard = self.formulas.and(parts);
            self.guards.insert((node, t), guard);
            guards.push(guard);
        }
        debug!("node {}: {} candidate compute times", node, guards.len());

        let scheduled = self.formulas.or(guards.iter().copied());
        self.constraints
            .push((Origin::NodeSchedule, Constraint::Assert(scheduled)));
        self.constraints.push((
            Origin::NodeSchedule,
            Constraint::AtMost {
                bound: 1,
                items: guards,
            },
        ));
    }

    /// Value `p` sits in a register when a consumer is computed at `t`.
    fn availability(&mut self, p: NodeId, t: u32) -> Id {
        let start = self.mobility.asap(p);
        let mut routes = Vec::new();

        if self.dag.is_input(p) {
            let kept = self.none(p, Rule::Delete, 0..t);
            for tt in start..t {
                let load = self.sym(p, Rule::Load, tt);
                let no_spill = self.none(p, Rule::Store, tt + 1..t);
                routes.push(self.formulas.and([load, kept, no_spill]));
            }
        } else {
            let window = self.mobility.compute_steps(p);
            for tt in start..t {
                let mut via = Vec::new();
                if window.contains(&tt) {
                    let compute = self.sym(p, Rule::Compute, tt);
                    let kept = self.none(p, Rule::Delete, tt..t);
                    via.push(self.formulas.and([compute, kept]));
                }
                // reloaded at tt after an earlier compute
                let mut earlier = Vec::new();
                for ttt in window.start..tt.min(window.end) {
                    let compute = self.sym(p, Rule::Compute, ttt);
                    let kept = self.none(p, Rule::Delete, ttt..t);
                    earlier.push(self.formulas.and([compute, kept]));
                }
                if !earlier.is_empty() {
                    let load = self.sym(p, Rule::Load, tt);
                    let computed = self.formulas.or(earlier);
                    via.push(self.formulas.and([load, computed]));
                }
                let via = self.formulas.or(via);
                let no_spill = self.none(p, Rule::Store, tt + 1..t);
                routes.push(self.formulas.and([via, no_spill]));
            }
        }

        self.formulas.or(routes)
    }

    /// `p` is deleted at some point after `t`.
    fn release(&mut self, p: NodeId, t: u32) -> Id {
        self.any(p, Rule::Delete, t + 1..self.budget)
    }

    // ========================================================================
    // Frame
    // ========================================================================

    fn frame_constraints(&mut self) {
        let budget = self.budget as usize;
        let node_count = self.dag.len();

        // occupied[n][t]: n holds a register just before step t
        // retired[n][t]:  n was deleted before step t
        let mut occupied = Vec::with_capacity(node_count);
        let mut retired = Vec::with_capacity(node_count);
        for index in 0..node_count {
            let node = NodeId::from_index(index);
            let mut occ = Vec::with_capacity(budget + 1);
            let mut ret = Vec::with_capacity(budget + 1);
            occ.push(self.formulas.constant(false));
            ret.push(self.formulas.constant(false));
            for t in 0..self.budget {
                let load = self.existing(node, Rule::Load, t);
                let compute = self.existing(node, Rule::Compute, t);
                let store = self.existing(node, Rule::Store, t);
                let delete = self.existing(node, Rule::Delete, t);

                let enter = self.formulas.or([load, compute]);
                let leave = self.formulas.or([store, delete]);
                let stays = self.formulas.not(leave);
                let kept = self.formulas.and([occ[t as usize], stays]);
                occ.push(self.formulas.or([enter, kept]));
                ret.push(self.formulas.or([ret[t as usize], delete]));
            }
            occupied.push(occ);
            retired.push(ret);
        }

        let registered: Vec<_> = self.symbols.iter().map(|(id, key)| (id, *key)).collect();
        for (symbol, key) in registered {
            let node = key.node;
            let t = key.time as usize;
            if t >= budget {
                continue;
            }
            let resident = occupied[node.index()][t];
            let gone = retired[node.index()][t];

            let requirement = match key.rule {
                Rule::Load => {
                    let fresh = self.formulas.not(resident);
                    let alive = self.formulas.not(gone);
                    let mut parts = vec![fresh, alive];
                    if !self.dag.is_input(node) {
                        // only values with a copy in slow memory can be loaded
                        let stored: Vec<Id> = (0..key.time)
                            .map(|s| self.existing(node, Rule::Store, s))
                            .collect();
                        parts.push(self.formulas.or(stored));
                    }
                    self.formulas.and(parts)
                }
                Rule::Compute => match guard_of(&self.guards, node, key.time) {
                    Some(guard) => {
                        let fresh = self.formulas.not(resident);
                        let alive = self.formulas.not(gone);
                        let mut parts = vec![fresh, alive, guard];
                        for &p in self.dag.predecessors(node) {
                            parts.push(occupied[p.index()][t]);
                        }
                        self.formulas.and(parts)
                    }
                    None => self.formulas.constant(false),
                },
                Rule::Store | Rule::Delete => resident,
            };

            let var = self.formulas.var(symbol);
            let frame = self.formulas.implies(var, requirement);
            self.constraints.push((Origin::Frame, Constraint::Assert(frame)));
        }
    }

    // ========================================================================
    // Global constraints
    // ========================================================================

    fn exclusivity_constraints(&mut self) {
        for step in self.symbols.by_time(self.budget) {
            if step.is_empty() {
                continue;
            }
            let items: Vec<Id> = step.into_iter().map(|(s, _)| self.formulas.var(s)).collect();
            self.constraints
                .push((Origin::Exclusivity, Constraint::AtMost { bound: 1, items }));
        }
    }

    fn capacity_constraint(&mut self) {
        let mut steps = Vec::with_capacity(self.budget as usize);
        for step in self.symbols.by_time(self.budget) {
            let terms = step
                .into_iter()
                .map(|(symbol, key)| (key.rule.weight(), self.formulas.var(symbol)))
                .collect();
            steps.push(terms);
        }
        self.constraints.push((
            Origin::Capacity,
            Constraint::RunningSum {
                steps,
                bound: self.capacity,
            },
        ));
    }
}

fn guard_of(guards: &HashMap<(NodeId, u32), Id>, node: NodeId, time: u32) -> Option<Id> {
    guards.get(&(node, time)).copied()
}

/// Convenience wrapper around [`Encoder`].
pub fn encode(dag: &Dag, mobility: &Mobility, capacity: u32) -> Encoding {
    Encoder::new(dag, mobility, capacity).encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DependencyTable;
    use crate::symbols::SymbolKey;
    use std::collections::HashSet;

    fn sample3() -> Dag {
        Dag::from_table(&DependencyTable::from_rows(vec![vec![0, 0], vec![0, 0], vec![1, 2]]))
            .unwrap()
    }

    fn n(number: u32) -> NodeId {
        NodeId::from_number(number).unwrap()
    }

    fn encode_sample3(budget: u32, capacity: u32) -> Encoding {
        let dag = sample3();
        let mobility = Mobility::analyze(&dag, budget).unwrap();
        encode(&dag, &mobility, capacity)
    }

    /// LA, LB, C, store C, delete A, delete B
    fn hand_schedule() -> HashSet<SymbolKey> {
        [
            (1, Rule::Load, 0),
            (2, Rule::Load, 1),
            (3, Rule::Compute, 2),
            (3, Rule::Store, 3),
            (1, Rule::Delete, 4),
            (2, Rule::Delete, 5),
        ]
        .into_iter()
        .map(|(node, rule, time)| SymbolKey {
            node: n(node),
            rule,
            time,
        })
        .collect()
    }

    fn violation_with(encoding: &Encoding, schedule: &HashSet<SymbolKey>) -> Option<Origin> {
        for key in schedule {
            assert!(
                encoding.symbols.get(key.node, key.rule, key.time).is_some(),
                "{} should be registered",
                key
            );
        }
        let truth = |s| {
            encoding
                .symbols
                .key(s)
                .map(|key| schedule.contains(&key))
                .unwrap_or(false)
        };
        encoding
            .first_violation(&truth)
            .map(|index| encoding.constraints[index].0)
    }

    #[test]
    fn test_symbols_stay_inside_horizon() {
        let encoding = encode_sample3(6, 3);
        for (_, key) in encoding.symbols.iter() {
            assert!(key.time < 6, "{} is past the horizon", key);
        }
    }

    #[test]
    fn test_compute_symbols_follow_window() {
        let encoding = encode_sample3(6, 3);
        let times: Vec<u32> = encoding
            .symbols
            .iter()
            .filter(|(_, k)| k.rule == Rule::Compute && k.node == n(3))
            .map(|(_, k)| k.time)
            .collect();
        assert_eq!(times, vec![2, 3, 4, 5]);
        // inputs are never computed
        assert_eq!(encoding.symbols.count(Rule::Compute), 4);
    }

    #[test]
    fn test_constraint_families() {
        let encoding = encode_sample3(6, 3);
        let stats = encoding.stats();
        assert_eq!(stats.node_constraints, 2);
        assert_eq!(stats.capacity_constraints, 1);
        assert_eq!(stats.frame_constraints, stats.symbols);
        assert!(stats.exclusivity_constraints <= 6);
    }

    #[test]
    fn test_capacity_covers_every_symbol() {
        let encoding = encode_sample3(6, 3);
        let (steps, bound) = encoding
            .constraints
            .iter()
            .find_map(|(_, c)| match c {
                Constraint::RunningSum { steps, bound } => Some((steps, *bound)),
                _ => None,
            })
            .unwrap();
        assert_eq!(bound, 3);
        assert_eq!(steps.len(), 6);
        let terms: usize = steps.iter().map(Vec::len).sum();
        assert_eq!(terms, encoding.symbols.len());

        let occupying = steps.iter().flatten().filter(|(w, _)| *w == 1).count();
        assert_eq!(
            occupying,
            encoding.symbols.count(Rule::Load) + encoding.symbols.count(Rule::Compute)
        );
    }

    #[test]
    fn test_valid_schedule_satisfies_encoding() {
        let encoding = encode_sample3(6, 3);
        assert_eq!(violation_with(&encoding, &hand_schedule()), None);
    }

    #[test]
    fn test_valid_schedule_breaks_smaller_capacity() {
        let encoding = encode_sample3(6, 2);
        assert_eq!(
            violation_with(&encoding, &hand_schedule()),
            Some(Origin::Capacity)
        );
    }

    #[test]
    fn test_missing_release_breaks_node_schedule() {
        let encoding = encode_sample3(6, 3);
        let mut schedule = hand_schedule();
        schedule.remove(&SymbolKey {
            node: n(2),
            rule: Rule::Delete,
            time: 5,
        });
        assert_eq!(
            violation_with(&encoding, &schedule),
            Some(Origin::NodeSchedule)
        );
    }

    #[test]
    fn test_reordered_deletes_still_valid() {
        let encoding = encode_sample3(6, 3);
        let mut schedule = hand_schedule();
        // LA, LB, C, delete A, store C, delete B
        let moves = [
            ((3, Rule::Store, 3), (3, Rule::Store, 4)),
            ((1, Rule::Delete, 4), (1, Rule::Delete, 3)),
        ];
        for ((node, rule, time), (new_node, new_rule, new_time)) in moves {
            schedule.remove(&SymbolKey { node: n(node), rule, time });
            schedule.insert(SymbolKey {
                node: n(new_node),
                rule: new_rule,
                time: new_time,
            });
        }
        assert_eq!(violation_with(&encoding, &schedule), None);
    }

    #[test]
    fn test_double_delete_breaks_frame() {
        let encoding = encode_sample3(7, 3);
        let mut schedule = hand_schedule();
        schedule.insert(SymbolKey {
            node: n(1),
            rule: Rule::Delete,
            time: 6,
        });
        assert_eq!(violation_with(&encoding, &schedule), Some(Origin::Frame));
    }

    /// fft4 on four registers: 6 and 7 are stored and loaded back.
    fn fft4_spill_schedule() -> HashSet<SymbolKey> {
        use Rule::*;
        [
            (1, Load), (2, Load), (5, Compute), (6, Compute), (1, Delete), (2, Delete),
            (6, Store), (3, Load), (4, Load), (7, Compute), (7, Store), (8, Compute),
            (3, Delete), (4, Delete), (7, Load), (9, Compute), (9, Store), (11, Compute),
            (11, Store), (5, Delete), (7, Delete), (6, Load), (10, Compute), (10, Store),
            (12, Compute), (12, Store), (6, Delete), (8, Delete),
        ]
        .into_iter()
        .zip(0u32..)
        .map(|((node, rule), time)| SymbolKey {
            node: n(node),
            rule,
            time,
        })
        .collect()
    }

    fn encode_fft4(budget: u32, capacity: u32) -> Encoding {
        let table = crate::catalog::lookup("fft4").unwrap().table;
        let dag = Dag::from_table(&table).unwrap();
        let mobility = Mobility::analyze(&dag, budget).unwrap();
        encode(&dag, &mobility, capacity)
    }

    #[test]
    fn test_reload_after_store_satisfies_encoding() {
        let encoding = encode_fft4(28, 4);
        assert_eq!(violation_with(&encoding, &fft4_spill_schedule()), None);
    }

    #[test]
    fn test_reload_without_store_breaks_frame() {
        let encoding = encode_fft4(28, 4);
        let mut schedule = fft4_spill_schedule();
        schedule.remove(&SymbolKey {
            node: n(6),
            rule: Rule::Store,
            time: 6,
        });
        assert_eq!(violation_with(&encoding, &schedule), Some(Origin::Frame));
    }
}
