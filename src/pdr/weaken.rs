//! Weakening: turning a full flop+PI valuation found by a SAT query into a
//! smaller cube over flops only (`spec.md` §4.5 "Weakening"). Two
//! strategies, selected by [`crate::config::Weaken`]:
//!
//! - `Just`: a topological pass over the target's transitive fanin,
//!   collecting only the flops the target's combinational cone actually
//!   reads.
//! - `Sim`: ternary simulation, dropping one flop to `X` at a time (in
//!   reverse flop-creation order) and keeping the drop only if the target
//!   stays determinedly true — `crate::ternary::TernarySim`'s stated purpose.
//!   `pre_weak` runs the justification pass first to shrink the starting
//!   set before simulation gets to work, matching
//!   `original_source/Bip/Treb.hh`'s `Params_Treb::pre_weak`.
//!
//! Either way, a back-off applies to predecessor obligations (not to the
//! direct bad-state cube, which is never itself an obligation at frame 0):
//! if the weakened cube turns out to intersect the initial states and the
//! target frame isn't the terminal frame-0 case where that is expected, the
//! weakening is discarded in favor of the full, unweakened valuation.
use std::collections::{HashMap, HashSet};

use crate::cube::Cube;
use crate::error::Result;
use crate::config::Weaken as WeakenMode;
use crate::netlist::{GateId, GateKind, GateRef};
use crate::ternary::{Trace, TernarySim, X};

use super::PdrEngine;

fn justification_needed_flops(engine: &PdrEngine, roots: &[GateRef]) -> HashSet<GateId> {
    let mut needed = HashSet::new();
    let ids: Vec<GateId> = roots.iter().map(|r| r.id).collect();
    for g in engine.n.topo_order(&ids) {
        if let GateKind::Flop { .. } = engine.n.kind(g) {
            needed.insert(g);
        }
    }
    needed
}

/// Drop flops to `X`, one at a time in reverse creation order, keeping the
/// drop whenever `check` still reports the target determined-true.
fn sim_weaken(
    engine: &mut PdrEngine,
    flops: &HashMap<GateId, bool>,
    pis: &[(GateId, bool)],
    mut check: impl FnMut(&mut TernarySim, &Trace) -> bool,
) -> HashMap<GateId, bool> {
    let mut trace = Trace::default();
    for (&id, &v) in flops {
        trace.init_flops.insert(id, X::from_bool(v));
    }
    let mut step = HashMap::new();
    for &(id, v) in pis {
        step.insert(id, X::from_bool(v));
    }
    trace.pi_steps.push(step);

    let mut order: Vec<GateId> = engine.n.flops().to_vec();
    order.reverse();
    let mut sim = TernarySim::new(engine.n);
    for flop in order {
        let saved = match trace.init_flops.get(&flop) {
            Some(&v) => v,
            None => continue, // already dropped by a justification pre-pass
        };
        trace.init_flops.insert(flop, X::Unknown);
        if !check(&mut sim, &trace) {
            trace.init_flops.insert(flop, saved);
        }
    }
    trace.init_flops.iter().filter_map(|(&id, &v)| v.to_bool().map(|b| (id, b))).collect()
}

fn to_cube(map: &HashMap<GateId, bool>) -> Cube {
    Cube::new(map.iter().map(|(&id, &v)| GateRef { id, inv: !v }).collect())
}

/// Weaken a state found to directly satisfy `bad` (`spec.md` §4.5 main loop
/// step 3 "Block bad"), i.e. the target is evaluated at the *same* time
/// step as the flop valuation, not its successor.
pub(crate) fn weaken_bad_predecessor(
    engine: &mut PdrEngine,
    flops: &[(GateId, bool)],
    pis: &[(GateId, bool)],
    bad: GateRef,
) -> Result<Cube> {
    let mut flop_map: HashMap<GateId, bool> = flops.iter().cloned().collect();
    match engine.config.weaken {
        WeakenMode::None => {}
        WeakenMode::Just => {
            let needed = justification_needed_flops(engine, &[bad]);
            flop_map.retain(|id, _| needed.contains(id));
        }
        WeakenMode::Sim => {
            if engine.config.pre_weak {
                let needed = justification_needed_flops(engine, &[bad]);
                flop_map.retain(|id, _| needed.contains(id));
            }
            flop_map = sim_weaken(engine, &flop_map, pis, move |sim, trace| {
                sim.simulate(trace);
                sim.value_at(0, bad) == X::True
            });
        }
    }
    Ok(to_cube(&flop_map))
}

/// Weaken a predecessor state found by `solve_relative`'s SAT branch: the
/// target `s` must hold in the *successor* state, so membership is checked
/// through each target literal's `next_of` function.
pub(crate) fn weaken_predecessor(
    engine: &mut PdrEngine,
    flops: &[(GateId, bool)],
    pis: &[(GateId, bool)],
    target: &Cube,
    is_terminal: bool,
) -> Result<Cube> {
    let mut flop_map: HashMap<GateId, bool> = flops.iter().cloned().collect();
    let next_roots: Vec<GateRef> = target.iter().filter_map(|l| engine.n.next_of(l.id)).collect();

    match engine.config.weaken {
        WeakenMode::None => {}
        WeakenMode::Just => {
            let needed = justification_needed_flops(engine, &next_roots);
            flop_map.retain(|id, _| needed.contains(id));
        }
        WeakenMode::Sim => {
            if engine.config.pre_weak {
                let needed = justification_needed_flops(engine, &next_roots);
                flop_map.retain(|id, _| needed.contains(id));
            }
            let n = engine.n;
            let target_owned = target.clone();
            flop_map = sim_weaken(engine, &flop_map, pis, move |sim, trace| {
                sim.simulate(trace);
                target_owned.iter().all(|&l| match n.next_of(l.id) {
                    Some(next) => sim.value_at(0, next).to_bool() == Some(!l.inv),
                    None => false,
                })
            });
        }
    }

    let cube = to_cube(&flop_map);
    if !is_terminal && engine.intersects_init(&cube)? {
        let full: HashMap<GateId, bool> = flops.iter().cloned().collect();
        return Ok(to_cube(&full));
    }
    Ok(cube)
}
