//! Crate `clausifier` turns netlist cones into CNF incrementally, memoising
//! the gate→literal mapping per (frame, side) unrolled copy (`spec.md` §4.1).
use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::error::{PdrError, Result};
use crate::netlist::{GateId, GateKind, GateRef, Netlist, PoKind, TRUE_GATE};
use crate::sat::{Lit, SatSolver};

/// Polled between clausification steps so a caller can cooperatively cancel
/// long-running work (`spec.md` §4.1 "Failure", §5 "Cancellation /
/// timeouts"). Replaces the source's global "par mode" messaging flag with
/// an injected collaborator, per `spec.md` §9.
pub trait EffortCallback {
    fn poll(&mut self) -> ControlFlow<()>;
}

/// An effort callback that never asks for cancellation.
pub struct NoEffortLimit;
impl EffortCallback for NoEffortLimit {
    fn poll(&mut self) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Identifies one unrolled copy of the design: a frame index (for multi-step
/// unrolling) and a side tag distinguishing simultaneous copies at the same
/// frame. PDR's two-state relative-induction queries only ever need two
/// copies, `(0, CUR)` and `(0, NEXT)`, reused across every depth — frame
/// *semantics* are carried by activation literals (`spec.md` §4.4), not by
/// allocating a fresh variable copy per PDR depth. Multi-frame unrolling
/// (side tags beyond CUR/NEXT) is available for callers that need it, e.g. a
/// future BMC-style companion engine, which is why `frame` is not hardwired
/// to zero.
pub type Side = u8;
pub const CUR: Side = 0;
pub const NEXT: Side = 1;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct CopyKey {
    frame: u32,
    side: Side,
}

/// Translates netlist gates into CNF for a given SAT solver, memoising
/// results per unrolled copy. One `Clausifier` is normally shared by all the
/// solver instances the PDR engine keeps open (`spec.md` §4.1 "Contract").
pub struct Clausifier {
    /// gate id -> literal, per unrolled copy.
    maps: HashMap<CopyKey, HashMap<GateId, Lit>>,
    /// If set, flops in this copy are forced to their init value instead of
    /// receiving a fresh variable (`spec.md` §4.1) — used for the copy fed
    /// to the initial-state solver `SI`.
    force_init: HashMap<CopyKey, bool>,
    true_lit: Option<Lit>,
}

impl Default for Clausifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Clausifier {
    pub fn new() -> Clausifier {
        Clausifier { maps: HashMap::new(), force_init: HashMap::new(), true_lit: None }
    }

    /// Clausification is monotone: deleting the underlying netlist
    /// invalidates every memoised mapping (`spec.md` §4.1 "Contract").
    pub fn invalidate(&mut self) {
        self.maps.clear();
        self.force_init.clear();
        self.true_lit = None;
    }

    pub fn mark_force_init(&mut self, frame: u32, side: Side, force: bool) {
        self.force_init.insert(CopyKey { frame, side }, force);
    }

    fn true_literal(&mut self, solver: &mut dyn SatSolver) -> Lit {
        if let Some(l) = self.true_lit {
            return l;
        }
        let v = solver.new_var();
        let l = Lit::positive(v);
        solver.add_clause(&[l]);
        self.true_lit = Some(l);
        l
    }

    /// Clausify wire `w` in unrolled copy `(frame, side)`, returning a
    /// literal true in every model iff `w` is true there.
    pub fn clausify(
        &mut self,
        n: &Netlist,
        solver: &mut dyn SatSolver,
        w: GateRef,
        frame: u32,
        side: Side,
        cb: &mut dyn EffortCallback,
    ) -> Result<Lit> {
        let p = self.clausify_id(n, solver, w.id, frame, side, cb)?;
        Ok(if w.inv { p.negate() } else { p })
    }

    fn clausify_id(
        &mut self,
        n: &Netlist,
        solver: &mut dyn SatSolver,
        id: GateId,
        frame: u32,
        side: Side,
        cb: &mut dyn EffortCallback,
    ) -> Result<Lit> {
        let key = CopyKey { frame, side };
        if let Some(l) = self.maps.get(&key).and_then(|m| m.get(&id)) {
            return Ok(*l);
        }
        if cb.poll().is_break() {
            log::debug!("clausify aborted by effort callback at gate {} (frame {}, side {})", id, frame, side);
            return Err(PdrError::ClausifyAbort);
        }
        log::trace!("clausify cache miss: gate {} (frame {}, side {})", id, frame, side);
        let lit = match n.kind(id).clone() {
            GateKind::True => {
                if id == TRUE_GATE {
                    self.true_literal(solver)
                } else {
                    return Err(PdrError::UnsupportedGate("stray True gate".into()));
                }
            }
            GateKind::Pi { .. } => Lit::positive(solver.new_var()),
            GateKind::Flop { init, .. } => {
                if side == NEXT {
                    // Clausifying a flop at the `NEXT` side means "this
                    // flop's value one step in the future", which is exactly
                    // its own next-state function evaluated in the *same*
                    // frame's `CUR` copy (the Delay gate's fanin is itself
                    // expressed purely in terms of current-frame wires).
                    // Recursing through `clausify` rather than `clausify_id`
                    // lets the gate's own sign ride along unchanged, and
                    // makes every other gate kind's NEXT-side clausification
                    // (And, Po, Delay — all of which just forward `side`
                    // unchanged to their fanins) automatically compute "this
                    // wire's value one step in the future" by substituting
                    // every flop leaf with its next-state function, with no
                    // special-casing needed beyond this one arm.
                    let next = n.next_of(id).ok_or_else(|| {
                        PdrError::MalformedNetlist(format!("flop {} has no next-state function", id))
                    })?;
                    self.clausify(n, solver, next, frame, CUR, cb)?
                } else {
                    let force = self.force_init.get(&key).copied().unwrap_or(false);
                    if force {
                        match init {
                            Some(true) => self.true_literal(solver),
                            Some(false) => self.true_literal(solver).negate(),
                            None => {
                                return Err(PdrError::MalformedNetlist(
                                    "flop has no init value after preparation".into(),
                                ))
                            }
                        }
                    } else {
                        Lit::positive(solver.new_var())
                    }
                }
            }
            GateKind::Delay { next, .. } => {
                // A Delay gate's value *is* its next-state function,
                // evaluated in the same (frame, side) copy: it is a pure
                // combinational pass-through, not a state boundary itself.
                self.clausify(n, solver, next, frame, side, cb)?
            }
            GateKind::Po { input, kind: PoKind::Output }
            | GateKind::Po { input, kind: PoKind::Property }
            | GateKind::Po { input, kind: PoKind::Constraint } => {
                self.clausify(n, solver, input, frame, side, cb)?
            }
            GateKind::And { a, b } => {
                let la = self.clausify(n, solver, a, frame, side, cb)?;
                let lb = self.clausify(n, solver, b, frame, side, cb)?;
                let p = Lit::positive(solver.new_var());
                // Tseitin: p <-> a & b
                solver.add_clause(&[p.negate(), la]);
                solver.add_clause(&[p.negate(), lb]);
                solver.add_clause(&[p, la.negate(), lb.negate()]);
                p
            }
            #[cfg(feature = "lut")]
            other => return Err(PdrError::UnsupportedGate(format!("{:?}", other))),
        };
        self.maps.entry(key).or_default().insert(id, lit);
        Ok(lit)
    }

    /// Plaisted–Greenbaum clausification: when the caller only ever
    /// consumes `w` under a single known polarity, only the implication
    /// needed for that polarity is emitted, halving clause count for
    /// unshared gates. Gates with fanout > 1 ("keep" gates, `spec.md` §4.1)
    /// fall back to full Tseitin since some other consumer may need the
    /// opposite polarity.
    pub fn clausify_polarity(
        &mut self,
        n: &Netlist,
        solver: &mut dyn SatSolver,
        w: GateRef,
        positive: bool,
        frame: u32,
        side: Side,
        cb: &mut dyn EffortCallback,
    ) -> Result<Lit> {
        let key = CopyKey { frame, side };
        if self.maps.get(&key).and_then(|m| m.get(&w.id)).is_some() {
            return self.clausify(n, solver, w, frame, side, cb);
        }
        let required_positive = positive != w.inv;
        match n.kind(w.id).clone() {
            GateKind::And { a, b } if n.gate(w.id).fanout <= 1 => {
                let pa = self.clausify_polarity(n, solver, a, required_positive, frame, side, cb)?;
                let pb = self.clausify_polarity(n, solver, b, required_positive, frame, side, cb)?;
                let p = Lit::positive(solver.new_var());
                if required_positive {
                    // only need p -> a & b to hold when used positively elsewhere is wrong;
                    // for a positive-only consumer we need: whenever a&b holds, p may be
                    // taken true, i.e. emit (¬p∨a),(¬p∨b) is unnecessary; we need the
                    // direction that makes "p true" derivable: (a∧b) -> p.
                    solver.add_clause(&[p, pa.negate(), pb.negate()]);
                } else {
                    // consumer only needs p false forcing a&b false: emit p -> a, p -> b
                    solver.add_clause(&[p.negate(), pa]);
                    solver.add_clause(&[p.negate(), pb]);
                }
                self.maps.entry(key).or_default().insert(w.id, p);
                Ok(if w.inv { p.negate() } else { p })
            }
            _ => self.clausify(n, solver, w, frame, side, cb),
        }
    }

    /// Clausify every literal of a cube over state variables, returning the
    /// corresponding solver literals in `(frame, side)`.
    pub fn clausify_cube(
        &mut self,
        n: &Netlist,
        solver: &mut dyn SatSolver,
        lits: &[GateRef],
        frame: u32,
        side: Side,
        cb: &mut dyn EffortCallback,
    ) -> Result<Vec<Lit>> {
        lits.iter().map(|&l| self.clausify(n, solver, l, frame, side, cb)).collect()
    }

    pub fn literal_of(&self, id: GateId, frame: u32, side: Side) -> Option<Lit> {
        self.maps.get(&CopyKey { frame, side }).and_then(|m| m.get(&id)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::Netlist;
    use crate::sat::{splr_backend::SplrSolver, SatResult};

    #[test]
    fn and_gate_clausifies_to_equisatisfiable_cnf() {
        let mut n = Netlist::new();
        let a = n.add_pi(Some(0)).unwrap();
        let b = n.add_pi(Some(1)).unwrap();
        let and_ab = n.add_and(a, b);
        let mut solver = SplrSolver::new();
        let mut cz = Clausifier::new();
        let mut cb = NoEffortLimit;
        let l = cz.clausify(&n, &mut solver, and_ab, 0, CUR, &mut cb).unwrap();
        // forcing the And gate true should force both inputs true.
        let la = cz.clausify(&n, &mut solver, a, 0, CUR, &mut cb).unwrap();
        let lb = cz.clausify(&n, &mut solver, b, 0, CUR, &mut cb).unwrap();
        assert_eq!(solver.solve(&[l]), SatResult::Sat);
        assert_eq!(solver.value(la), Some(true));
        assert_eq!(solver.value(lb), Some(true));
    }

    #[test]
    fn forced_init_pins_flop_value() {
        let mut n = Netlist::new();
        let f = n.add_flop(Some(0), Some(false)).unwrap();
        n.set_flop_next(f, f).unwrap();
        let mut solver = SplrSolver::new();
        let mut cz = Clausifier::new();
        cz.mark_force_init(0, CUR, true);
        let mut cb = NoEffortLimit;
        let l = cz.clausify(&n, &mut solver, f, 0, CUR, &mut cb).unwrap();
        assert_eq!(solver.solve(&[]), SatResult::Sat);
        assert_eq!(solver.value(l), Some(false));
    }
}
