//! Counterexample extraction (`spec.md` §3 "Counterexample", §4.5
//! "Termination"): walk a frame-0 proof obligation's parent chain back up to
//! the bad-violating root, re-deriving a concrete PI witness for each hop,
//! then re-verify the whole trace under full ternary simulation before
//! handing it back — a produced counterexample that fails to reproduce
//! `bad = true` is a bug in the engine, not in the input, hence
//! [`PdrError::CexRejected`] rather than a silent best-effort result.
use std::collections::HashMap;
use std::rc::Rc;

use crate::cube::{Cube, Pobl};
use crate::error::{PdrError, Result};
use crate::netlist::{GateId, GateRef};
use crate::sat::SatResult;
use crate::ternary::{Trace, TernarySim, X};

use super::PdrEngine;

/// A concrete trace disproving the property: an initial flop valuation plus
/// one PI valuation per time step, ending in a state where `bad` holds.
#[derive(Clone, Debug)]
pub struct Counterexample {
    pub initial_flops: Vec<(GateId, bool)>,
    pub pi_steps: Vec<Vec<(GateId, bool)>>,
}

pub(crate) fn extract_counterexample(engine: &mut PdrEngine, leaf: &Rc<Pobl>) -> Result<Counterexample> {
    let mut chain: Vec<Rc<Pobl>> = Vec::new();
    let mut cur = Rc::clone(leaf);
    loop {
        chain.push(Rc::clone(&cur));
        match cur.parent.clone() {
            Some(p) => cur = p,
            None => break,
        }
    }
    // chain[0] is the frame-0 obligation (an initial state); chain[last] is
    // the root obligation at the frame where `bad` was found to hold
    // directly.

    let mut flop_vals: HashMap<GateId, bool> = HashMap::new();
    for &f in engine.n.flops() {
        flop_vals.insert(f, engine.n.flop_init(f).unwrap_or(false));
    }
    for &l in chain[0].tcube.cube.iter() {
        flop_vals.insert(l.id, !l.inv);
    }
    let initial_flops: Vec<(GateId, bool)> = flop_vals.iter().map(|(&id, &v)| (id, v)).collect();

    let mut pi_steps: Vec<Vec<(GateId, bool)>> = Vec::new();
    for i in 0..chain.len().saturating_sub(1) {
        let from_cube = flop_cube(&flop_vals);
        let to_cube = chain[i + 1].tcube.cube.clone();
        let pis = transition_witness(engine, &from_cube, &to_cube)?;
        flop_vals = step_flops(engine, &flop_vals, &pis);
        pi_steps.push(pis);
    }

    let bad = engine.n.bad()?;
    let final_pis = direct_witness(engine, &flop_cube(&flop_vals), bad)?;
    pi_steps.push(final_pis);

    verify(engine, &initial_flops, &pi_steps, bad)?;
    Ok(Counterexample { initial_flops, pi_steps })
}

fn flop_cube(vals: &HashMap<GateId, bool>) -> Cube {
    Cube::new(vals.iter().map(|(&id, &v)| GateRef { id, inv: !v }).collect())
}

fn step_flops(engine: &PdrEngine, flops: &HashMap<GateId, bool>, pis: &[(GateId, bool)]) -> HashMap<GateId, bool> {
    let mut trace = Trace::default();
    for (&id, &v) in flops {
        trace.init_flops.insert(id, X::from_bool(v));
    }
    let mut step = HashMap::new();
    for &(id, v) in pis {
        step.insert(id, X::from_bool(v));
    }
    trace.pi_steps.push(step);
    let mut sim = TernarySim::new(engine.n);
    sim.simulate(&trace);
    engine
        .n
        .flops()
        .iter()
        .filter_map(|&f| {
            let next = engine.n.next_of(f)?;
            Some((f, sim.value_at(0, next).to_bool().unwrap_or(false)))
        })
        .collect()
}

fn transition_witness(engine: &mut PdrEngine, from: &Cube, to: &Cube) -> Result<Vec<(GateId, bool)>> {
    let mut assumps = Vec::new();
    for &l in from.iter() {
        assumps.push(engine.cur_lit(l)?);
    }
    for &l in to.iter() {
        assumps.push(engine.next_state_lit(l)?);
    }
    if engine.solver.solve(&assumps) != SatResult::Sat {
        return Err(PdrError::CexRejected(
            "transition between reconstructed counterexample states is unsatisfiable on re-check".into(),
        ));
    }
    Ok(read_pis(engine))
}

fn direct_witness(engine: &mut PdrEngine, state: &Cube, target: GateRef) -> Result<Vec<(GateId, bool)>> {
    let mut assumps = Vec::new();
    for &l in state.iter() {
        assumps.push(engine.cur_lit(l)?);
    }
    assumps.push(engine.cur_lit(target)?);
    if engine.solver.solve(&assumps) != SatResult::Sat {
        return Err(PdrError::CexRejected(
            "bad signal unsatisfiable at final counterexample state on re-check".into(),
        ));
    }
    Ok(read_pis(engine))
}

fn read_pis(engine: &PdrEngine) -> Vec<(GateId, bool)> {
    engine
        .n
        .pis()
        .iter()
        .filter_map(|&p| {
            let lit = engine.clausifier.literal_of(p, 0, crate::clausifier::CUR)?;
            engine.solver.value(lit).map(|v| (p, v))
        })
        .collect()
}

fn verify(
    engine: &PdrEngine,
    initial_flops: &[(GateId, bool)],
    pi_steps: &[Vec<(GateId, bool)>],
    bad: GateRef,
) -> Result<()> {
    let mut trace = Trace::default();
    for &(id, v) in initial_flops {
        trace.init_flops.insert(id, X::from_bool(v));
    }
    for step in pi_steps {
        let mut s = HashMap::new();
        for &(id, v) in step {
            s.insert(id, X::from_bool(v));
        }
        trace.pi_steps.push(s);
    }
    let mut sim = TernarySim::new(engine.n);
    sim.simulate(&trace);
    let last = pi_steps.len().saturating_sub(1);
    if sim.value_at(last, bad).to_bool() != Some(true) {
        return Err(PdrError::CexRejected(
            "reconstructed counterexample does not reproduce bad=true under full simulation".into(),
        ));
    }
    Ok(())
}
