//! Crate `ternary` implements three-valued (true/false/unknown) propagation
//! over the combinational part of a netlist (`spec.md` §4.2 "Ternary
//! (X-)Simulator").
use std::collections::HashMap;

use crate::netlist::{GateId, GateKind, GateRef, Netlist, TRUE_GATE};

/// A three-valued logic value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum X {
    True,
    False,
    Unknown,
}

impl X {
    pub fn from_bool(b: bool) -> X {
        if b {
            X::True
        } else {
            X::False
        }
    }

    pub fn negate(self) -> X {
        match self {
            X::True => X::False,
            X::False => X::True,
            X::Unknown => X::Unknown,
        }
    }

    pub fn and(self, other: X) -> X {
        match (self, other) {
            (X::False, _) | (_, X::False) => X::False,
            (X::True, X::True) => X::True,
            _ => X::Unknown,
        }
    }

    pub fn to_bool(self) -> Option<bool> {
        match self {
            X::True => Some(true),
            X::False => Some(false),
            X::Unknown => None,
        }
    }

    pub fn is_determined(self) -> bool {
        !matches!(self, X::Unknown)
    }
}

/// A concrete (partial) trace: an assignment of `X` to every flop (the
/// starting state) and, per time step, to every PI. `spec.md` §4.2
/// "Operations: simulate(cex, abstr)".
#[derive(Clone, Default)]
pub struct Trace {
    pub init_flops: HashMap<GateId, X>,
    pub pi_steps: Vec<HashMap<GateId, X>>,
}

/// Per-depth, per-gate three-valued evaluation, addressable as
/// `sim[depth][wire]` (`spec.md` §4.2).
pub struct TernarySim<'a> {
    n: &'a Netlist,
    /// values[depth][gate]
    values: Vec<HashMap<GateId, X>>,
}

impl<'a> TernarySim<'a> {
    pub fn new(n: &'a Netlist) -> TernarySim<'a> {
        TernarySim { n, values: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn value_at(&self, depth: usize, w: GateRef) -> X {
        let base = self.values.get(depth).and_then(|m| m.get(&w.id)).copied().unwrap_or(X::Unknown);
        if w.inv {
            base.negate()
        } else {
            base
        }
    }

    /// Evaluate every gate at `depth`, given flop values already known at
    /// `depth` (frame 0 takes them from `trace.init_flops`; later frames take
    /// them from the previous frame's `Delay` evaluation) and PI values from
    /// `trace.pi_steps[depth]`.
    fn eval_frame(&mut self, depth: usize, flop_values: &HashMap<GateId, X>, trace: &Trace) {
        let mut frame = HashMap::new();
        frame.insert(TRUE_GATE, X::True);
        for (&id, &v) in flop_values {
            frame.insert(id, v);
        }
        let roots: Vec<GateId> = self.n.pos().to_vec();
        let mut extra_roots = roots.clone();
        extra_roots.extend(self.n.flop_delay.values().copied());
        let order = self.n.topo_order(&extra_roots);
        for id in order {
            if frame.contains_key(&id) {
                continue;
            }
            let v = match self.n.kind(id) {
                GateKind::True => X::True,
                GateKind::Pi { .. } => trace.pi_steps.get(depth).and_then(|m| m.get(&id)).copied().unwrap_or(X::Unknown),
                GateKind::Flop { .. } => X::Unknown, // supplied externally; absence means "don't care"
                GateKind::And { a, b } => {
                    let va = self.lookup(&frame, *a);
                    let vb = self.lookup(&frame, *b);
                    va.and(vb)
                }
                GateKind::Delay { next, .. } => self.lookup(&frame, *next),
                GateKind::Po { input, .. } => self.lookup(&frame, *input),
                #[cfg(feature = "lut")]
                _ => X::Unknown,
            };
            frame.insert(id, v);
        }
        self.values.push(frame);
    }

    fn lookup(&self, frame: &HashMap<GateId, X>, w: GateRef) -> X {
        let base = frame.get(&w.id).copied().unwrap_or(X::Unknown);
        if w.inv {
            base.negate()
        } else {
            base
        }
    }

    /// Run the simulator over a full trace, one frame per PI step plus the
    /// initial frame, feeding each frame's `Delay` output forward as the
    /// next frame's flop value. `spec.md` §4.2 "simulate(cex, abstr)";
    /// `abstr` (an abstraction mask limiting which gates are considered) is
    /// represented implicitly: gates outside the mask should simply be left
    /// unset by the caller-supplied `trace`, reading back as `X::Unknown`.
    pub fn simulate(&mut self, trace: &Trace) {
        self.values.clear();
        let mut flop_values: HashMap<GateId, X> = trace.init_flops.clone();
        let steps = trace.pi_steps.len().max(1);
        for depth in 0..steps {
            self.eval_frame(depth, &flop_values, trace);
            let mut next_values = HashMap::new();
            for &flop in self.n.flops() {
                let next = self.n.next_of(flop).unwrap_or(GateRef::pos(TRUE_GATE));
                next_values.insert(flop, self.lookup(&self.values[depth], next));
            }
            flop_values = next_values;
        }
    }

    /// Re-run [`Self::simulate`] with one additional flop in `trace.init_flops`
    /// forced to `X::Unknown`, reporting whether `bad` still evaluates
    /// determinedly true at `depth` — the core primitive cube weakening
    /// uses to decide whether a flop literal can be dropped (`spec.md` §4.2
    /// "weakening cubes by introducing X's on flops").
    pub fn still_determined_with_x(
        &mut self,
        trace: &Trace,
        flop: GateId,
        depth: usize,
        target: GateRef,
    ) -> bool {
        let mut relaxed = trace.clone();
        relaxed.init_flops.insert(flop, X::Unknown);
        self.simulate(&relaxed);
        self.value_at(depth, target) == X::True
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::Netlist;

    #[test]
    fn unconstrained_flop_leaves_and_gate_undetermined() {
        let mut n = Netlist::new();
        let f = n.add_flop(Some(0), Some(false)).unwrap();
        let pi = n.add_pi(Some(0)).unwrap();
        let and_fp = n.add_and(f, pi);
        n.set_flop_next(f, f).unwrap();
        let mut trace = Trace::default();
        trace.init_flops.insert(f.id, X::Unknown);
        let mut step = HashMap::new();
        step.insert(pi.id, X::True);
        trace.pi_steps.push(step);
        let mut sim = TernarySim::new(&n);
        sim.simulate(&trace);
        assert_eq!(sim.value_at(0, and_fp), X::Unknown);
    }

    #[test]
    fn known_false_flop_forces_and_gate_false() {
        let mut n = Netlist::new();
        let f = n.add_flop(Some(0), Some(false)).unwrap();
        let pi = n.add_pi(Some(0)).unwrap();
        let and_fp = n.add_and(f, pi);
        n.set_flop_next(f, f).unwrap();
        let mut trace = Trace::default();
        trace.init_flops.insert(f.id, X::False);
        let mut step = HashMap::new();
        step.insert(pi.id, X::True);
        trace.pi_steps.push(step);
        let mut sim = TernarySim::new(&n);
        sim.simulate(&trace);
        assert_eq!(sim.value_at(0, and_fp), X::False);
    }
}
