//! Crate `frame_trace` stores and queries the PDR frame sequence
//! `F[0..depth]` and `F[∞]` (`spec.md` §3 "Frame trace F", §4.4 "PDR Frame
//! Trace").
use std::collections::HashSet;

use crate::cube::{Cube, Frame, TCube};

/// The sequence of cube sets. `F[0]` is *not* populated through
/// [`FrameTrace::add_cube`] — it is conceptually the initial-state
/// predicate itself (`spec.md` §3: "`F[0]` equals the initial-state
/// predicate"), and membership queries against it are answered by the
/// dedicated initial-state solver rather than this structure. `frames[0]`
/// therefore always stays empty; indices `1..=depth` hold real blocked-cube
/// sets, and `inf` holds `F[∞]`.
pub struct FrameTrace {
    frames: Vec<HashSet<Cube>>,
    inf: HashSet<Cube>,
}

impl Default for FrameTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTrace {
    pub fn new() -> FrameTrace {
        FrameTrace { frames: vec![HashSet::new()], inf: HashSet::new() }
    }

    /// Current finite depth: the highest `k` with a materialized `F[k]`.
    pub fn depth(&self) -> u32 {
        (self.frames.len() - 1) as u32
    }

    /// Append a new empty `F[depth+1]` (`spec.md` §4.5 step 2 "Extend
    /// frame").
    pub fn new_frame(&mut self) -> u32 {
        self.frames.push(HashSet::new());
        self.depth()
    }

    pub fn frame(&self, k: u32) -> Option<&HashSet<Cube>> {
        self.frames.get(k as usize)
    }

    pub fn inf(&self) -> &HashSet<Cube> {
        &self.inf
    }

    /// Insert `s.cube` into `F[s.frame]`, removing every cube in
    /// `F[0..=s.frame]` that `s.cube` subsumes (a more general cube makes
    /// the more specific ones redundant at the same or lower frames).
    /// Returns the set of cubes removed by subsumption, and whether the
    /// insertion was itself new (a cube already present, or already
    /// subsumed by something stored, is not re-inserted).
    ///
    /// This method is pure bookkeeping over the cube sets: the caller
    /// (`crate::pdr::PdrEngine`) is responsible for emitting the
    /// corresponding blocking clause into the SAT solver(s) activated by the
    /// frame's activation literal, per `spec.md` §4.4's `addCube` contract —
    /// keeping this structure itself solver-agnostic, the way the teacher
    /// keeps its `ClauseDB`'s set-membership bookkeeping (`clause_manage.rs`)
    /// free of the propagation/solve loop that lives in `solver/conflict.rs`.
    pub fn add_cube(&mut self, s: &TCube, subsumption: bool) -> (bool, Vec<Cube>) {
        let k = match s.frame {
            Frame::At(k) => k as usize,
            Frame::Inf => {
                let was_new = self.inf.insert(s.cube.clone());
                return (was_new, Vec::new());
            }
            Frame::Null => return (false, Vec::new()),
        };
        debug_assert!(k >= 1, "F[0] is the initial-state predicate, not a stored cube set");
        while self.frames.len() <= k {
            self.frames.push(HashSet::new());
        }
        if self.subsumed_up_to(&s.cube, k as u32) {
            return (false, Vec::new());
        }
        let mut removed = Vec::new();
        if subsumption {
            for frame in self.frames[0..=k].iter_mut() {
                let dead: Vec<Cube> = frame.iter().filter(|c| s.cube.subsumes(c)).cloned().collect();
                for d in dead {
                    frame.remove(&d);
                    removed.push(d);
                }
            }
        }
        self.frames[k].insert(s.cube.clone());
        (true, removed)
    }

    /// Is `cube` already covered by some cube stored at frame `k` or above
    /// (up to and including `F[∞]`)? Pure subsumption check, the first half
    /// of `spec.md` §4.4 `isBlocked`'s disjunction — the second half (a SAT
    /// query) lives in `crate::pdr::PdrEngine::is_blocked`.
    pub fn subsumed_from(&self, cube: &Cube, k: u32) -> bool {
        for frame in self.frames.iter().skip(k as usize) {
            if frame.iter().any(|c| c.subsumes(cube)) {
                return true;
            }
        }
        self.inf.iter().any(|c| c.subsumes(cube))
    }

    /// Is `cube` already subsumed by something stored anywhere at or below
    /// frame `k`? Used by `add_cube` to avoid storing a cube that a more
    /// general, already-present cube renders redundant — mirrors
    /// `spec.md` §3's non-redundancy rule ("each cube sits in the earliest
    /// frame where it was first learned").
    fn subsumed_up_to(&self, cube: &Cube, k: u32) -> bool {
        for frame in self.frames.iter().take(k as usize + 1) {
            if frame.iter().any(|c| c.subsumes(cube)) {
                return true;
            }
        }
        false
    }

    /// Move `cube` from `F[k]` to `F[k+1]` after a successful propagation
    /// attempt (`spec.md` §4.5 step 4 "Propagate").
    pub fn promote(&mut self, k: u32, cube: &Cube) {
        if let Some(frame) = self.frames.get_mut(k as usize) {
            frame.remove(cube);
        }
        let k1 = k as usize + 1;
        while self.frames.len() <= k1 {
            self.frames.push(HashSet::new());
        }
        self.frames[k1].insert(cube.clone());
    }

    /// Set-theoretic equality of `F[k]` and `F[k+1]` — the termination test
    /// of `spec.md` §4.5 "Propagate".
    pub fn frames_equal(&self, k: u32) -> bool {
        match (self.frames.get(k as usize), self.frames.get(k as usize + 1)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// All cubes whose negation conjoins into the inductive invariant once
    /// a fixed point at frame `k` is found: `F[k] ∪ F[k+1] ∪ … ∪ F[∞]`
    /// (`spec.md` §4.5 "Termination").
    pub fn invariant_cubes(&self, from: u32) -> Vec<Cube> {
        let mut out: Vec<Cube> = Vec::new();
        for frame in self.frames.iter().skip(from as usize) {
            out.extend(frame.iter().cloned());
        }
        out.extend(self.inf.iter().cloned());
        out
    }

    pub fn iter_frames(&self) -> impl Iterator<Item = (u32, &HashSet<Cube>)> {
        self.frames.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::GateRef;

    fn lit(id: u32, inv: bool) -> GateRef {
        GateRef { id, inv }
    }

    #[test]
    fn add_cube_removes_subsumed_cubes_at_lower_frames() {
        let mut ft = FrameTrace::new();
        ft.new_frame();
        ft.new_frame();
        let specific = Cube::new(vec![lit(1, false), lit(2, true)]);
        ft.add_cube(&TCube::new(specific.clone(), Frame::At(1)), true);
        assert!(ft.frame(1).unwrap().contains(&specific));

        let general = Cube::new(vec![lit(1, false)]);
        let (was_new, removed) = ft.add_cube(&TCube::new(general.clone(), Frame::At(2)), true);
        assert!(was_new);
        assert_eq!(removed, vec![specific.clone()]);
        assert!(!ft.frame(1).unwrap().contains(&specific));
        assert!(ft.frame(2).unwrap().contains(&general));
    }

    #[test]
    fn redundant_cube_is_not_reinserted() {
        let mut ft = FrameTrace::new();
        ft.new_frame();
        ft.new_frame();
        let general = Cube::new(vec![lit(1, false)]);
        ft.add_cube(&TCube::new(general.clone(), Frame::At(1)), true);
        let specific = Cube::new(vec![lit(1, false), lit(2, true)]);
        let (was_new, _) = ft.add_cube(&TCube::new(specific, Frame::At(2)), true);
        assert!(!was_new);
    }

    #[test]
    fn frames_equal_detects_fixed_point() {
        let mut ft = FrameTrace::new();
        ft.new_frame();
        ft.new_frame();
        let c = Cube::new(vec![lit(1, false)]);
        ft.add_cube(&TCube::new(c.clone(), Frame::At(1)), false);
        ft.add_cube(&TCube::new(c, Frame::At(2)), false);
        assert!(ft.frames_equal(1));
    }
}
