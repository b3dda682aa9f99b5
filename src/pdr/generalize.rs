//! `generalize(z, k)` (`spec.md` §4.5 "Generalization"): given a relatively
//! inductive cube `z` that was just shown to block frame `k`, drop as many
//! literals as possible while it remains both relatively inductive at `k`
//! and non-initial, following the Treb contract's iterative single-literal
//! removal (`original_source/Bip/Treb.cc`'s `generalize`).
use rand::seq::SliceRandom;

use crate::cube::{Cube, Frame, TCube};
use crate::error::Result;

use super::{PdrEngine, RelResult};

/// The order literal-drop attempts are tried in. `spec.md` §6 `seed`:
/// "randomization, 0 = none" — with a nonzero seed the drop order is
/// shuffled per cube length so which literal survives a tie is no longer an
/// artifact of storage order; with `seed == 0` (the default) it stays the
/// plain left-to-right scan, matching a deterministic run byte-for-byte.
fn drop_order(engine: &mut PdrEngine, len: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if engine.config.seed != 0 {
        order.shuffle(&mut engine.rng);
    }
    order
}

/// Iteratively try dropping one literal of `z` at a time, keeping the drop
/// whenever the resulting (smaller) cube is both non-initial and still
/// relatively inductive at `k` — in which case we also adopt whatever
/// further shrinking `solve_relative`'s own conflict-based minimization
/// found. Bounded by `orbits * len` attempts (`spec.md` §6 `orbits`), the
/// same style of proportional budget the teacher's restart policy scales
/// off of clause count rather than a flat constant.
pub(crate) fn generalize(engine: &mut PdrEngine, z: Cube, k: u32) -> Result<Cube> {
    let mut cube = z;
    let budget = ((engine.config.orbits * cube.len().max(1) as f32).ceil() as u32).max(1);
    let mut attempts = 0u32;
    let mut order = drop_order(engine, cube.len());
    let mut pos = 0usize;
    while pos < order.len() && attempts < budget {
        attempts += 1;
        let i = order[pos];
        let mut keep = vec![true; cube.len()];
        keep[i] = false;
        let candidate = cube.retain_indices(&keep);
        if candidate.is_empty() {
            pos += 1;
            continue;
        }
        if engine.intersects_init(&candidate)? {
            pos += 1;
            continue;
        }
        let probe = TCube::new(candidate.clone(), Frame::At(k));
        match engine.solve_relative(&probe, true)? {
            RelResult::Unsat { z: shrunk } => {
                // `solve_relative`'s own conflict-core minimization can drop
                // literals of `candidate` beyond what this loop asked for;
                // `candidate` was checked non-initial above, but that subset
                // relation runs the wrong way to inherit the check — a
                // smaller cube covers *more* states, so `shrunk` must be
                // re-validated rather than assumed safe. Back off to
                // `candidate` (already known non-initial and relatively
                // inductive, since `solve_relative` returned `Unsat` for it)
                // if `shrunk` turns out to intersect the initial states.
                cube = if shrunk == candidate || !engine.intersects_init(&shrunk)? { shrunk } else { candidate };
                // literal indices shifted; redraw a fresh order for the new length.
                order = drop_order(engine, cube.len());
                pos = 0;
            }
            RelResult::Sat { .. } => {
                pos += 1;
            }
        }
    }
    Ok(cube)
}
