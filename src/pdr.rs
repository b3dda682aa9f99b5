//! Crate `pdr` implements the main PDR/IC3 loop (`spec.md` §4.5 "PDR Engine
//! (core loop)"): frame extension, bad-state blocking, recursive blocking,
//! `solveRelative`, forward propagation, and termination.
//!
//! Generalization strategy: of the three overlapping source variants
//! `spec.md` §9 notes as ambiguous (`Pdr`, `Pdr2`, `Treb`), this engine
//! implements the **Treb** contract (`original_source/Bip/Treb.{cc,hh}`,
//! `TrebSat.cc`) — chosen because it is the only one of the three with a
//! fully fleshed-out parameter record and weakening pipeline in the original
//! source; `Pdr.cc` is a thin wrapper and `Pdr2` is explicitly a stub. See
//! `DESIGN.md`.
pub mod cex;
pub mod generalize;
pub mod weaken;

use std::collections::BinaryHeap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::clausifier::{Clausifier, EffortCallback, NoEffortLimit, CUR, NEXT};
use crate::config::Config;
use crate::cube::{Cube, Frame, Pobl, PoblOrd, TCube};
use crate::error::{PdrError, Result};
use crate::frame_trace::FrameTrace;
use crate::netlist::{GateId, GateRef, Netlist};
use crate::sat::splr_backend::SplrSolver;
use crate::sat::{Lit, SatResult, SatSolver};

use cex::Counterexample;

/// The three verdicts the core can return (`spec.md` §6).
pub enum Verdict {
    /// Proved, with an inductive invariant expressed over flops (the
    /// conjunction of the negation of every surviving cube).
    Proved { invariant: Vec<Cube> },
    /// Disproved, with a concrete counterexample trace.
    Failed { cex: Counterexample },
    /// Neither proved nor refuted within the resource budget, reporting how
    /// deep the search got before giving up.
    Undetermined { bug_free_depth: u32 },
}

/// Outcome of [`PdrEngine::solve_relative`].
enum RelResult {
    /// The candidate cube was shown relatively inductive; `z` is the
    /// (possibly smaller) subset of `s` sufficient for the contradiction.
    Unsat { z: Cube },
    /// A predecessor model was found; `flops`/`pis` give its full
    /// valuation.
    Sat { flops: Vec<(GateId, bool)>, pis: Vec<(GateId, bool)> },
}

enum BlockOutcome {
    Exhausted,
    Failed(Counterexample),
}

/// The PDR engine: owns the frame trace, the proof-obligation queue, the
/// reachability solver `S`, the dedicated initial-state solver `SI`, and
/// their clausifiers.
pub struct PdrEngine<'n> {
    pub(crate) n: &'n Netlist,
    pub(crate) config: Config,
    pub(crate) trace: FrameTrace,
    queue: BinaryHeap<PoblOrd>,
    priority_counter: u64,
    pub(crate) solver: Box<dyn SatSolver>,
    pub(crate) clausifier: Clausifier,
    solver_init: Box<dyn SatSolver>,
    clausifier_init: Clausifier,
    /// One activation literal per frame index `1..=depth`, gating the
    /// blocking clause of every cube first stored at that frame
    /// (`spec.md` §4.4 `addCube`).
    activation_lits: Vec<Lit>,
    pub(crate) rng: ChaCha8Rng,
    cb: Box<dyn EffortCallback>,
    next_restart_limit: f64,
}

impl<'n> PdrEngine<'n> {
    pub fn new(n: &'n Netlist, config: Config) -> PdrEngine<'n> {
        let seed = if config.seed == 0 { 0xC0FFEE } else { config.seed };
        let restart_lim = if config.restart_lim <= 0.0 { f64::INFINITY } else { config.restart_lim };
        PdrEngine {
            n,
            trace: FrameTrace::new(),
            queue: BinaryHeap::new(),
            priority_counter: 0,
            solver: Box::new(SplrSolver::new()),
            clausifier: Clausifier::new(),
            solver_init: Box::new(SplrSolver::new()),
            clausifier_init: {
                let mut cz = Clausifier::new();
                cz.mark_force_init(0, CUR, true);
                cz
            },
            activation_lits: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            cb: Box::new(NoEffortLimit),
            next_restart_limit: restart_lim,
            config,
        }
    }

    pub fn set_effort_callback(&mut self, cb: Box<dyn EffortCallback>) {
        self.cb = cb;
    }

    /// `spec.md` §6 `sort_pob_size`: "secondary order by cube size". `0`
    /// when the flag is off, so it never perturbs the plain
    /// frame-then-priority order `PoblOrd` otherwise implements.
    fn size_key(&self, cube: &Cube) -> u32 {
        if self.config.sort_pob_size {
            cube.len() as u32
        } else {
            0
        }
    }

    fn next_priority(&mut self) -> u64 {
        // `spec.md` §5 requires newer obligations derived from the same
        // parent to win ties; since `PoblOrd` treats a *smaller* priority as
        // "pop first" (see `cube::PoblOrd`), handing out a strictly
        // decreasing counter makes every freshly created obligation outrank
        // everything before it.
        self.priority_counter = self.priority_counter.wrapping_sub(1);
        self.priority_counter
    }

    /// One activation literal per frame, left as a free variable: a blocking
    /// clause is emitted as `[¬act_k, ¬cube…]` (`emit_blocking_clause`), so
    /// the clause is only live in queries that *assume* `act_k` true
    /// (`solve_relative` assumes exactly `act(j)` for `j in (k-1)..=depth`
    /// when querying `F[k-1]`). Pinning the literal true here — as an
    /// earlier revision did via `add_clause(&[l])` — would collapse every
    /// blocking clause to unconditional `[¬cube…]`, active in every query
    /// regardless of which frame is being asked about; a cube blocked only
    /// at a low frame would then wrongly exclude states genuinely reachable
    /// at higher frames, breaking the `F[k] ⊆ F[k+1]` over-approximation.
    fn activation_lit(&mut self, frame: u32) -> Lit {
        while (self.activation_lits.len() as u32) <= frame {
            let l = self.solver.new_activation_lit();
            self.activation_lits.push(l);
        }
        self.activation_lits[frame as usize]
    }

    fn cur_lit(&mut self, g: GateRef) -> Result<Lit> {
        self.clausifier.clausify(self.n, &mut *self.solver, g, 0, CUR, &mut *self.cb)
    }

    fn next_state_lit(&mut self, flop_lit: GateRef) -> Result<Lit> {
        self.clausifier.clausify(self.n, &mut *self.solver, flop_lit, 0, NEXT, &mut *self.cb)
    }

    /// Current-state literals of every `spec.md` §3/§6 safety constraint,
    /// assumed true wherever a query inspects a concrete state: an
    /// unconstrained state is not a legal one, so it must not be allowed to
    /// stand in for a predecessor, an initial state, or a bad state.
    fn constraint_lits_cur(&mut self) -> Result<Vec<Lit>> {
        let constraints = self.n.constraints();
        constraints.iter().map(|&c| self.cur_lit(c)).collect()
    }

    /// Next-state literals of every constraint, for the `s(x')` side of
    /// `solveRelative`'s transition query: a transition into an
    /// unconstrained successor state is not a legal transition either.
    fn constraint_lits_next(&mut self) -> Result<Vec<Lit>> {
        let constraints = self.n.constraints();
        constraints
            .iter()
            .map(|&c| self.clausifier.clausify(self.n, &mut *self.solver, c, 0, NEXT, &mut *self.cb))
            .collect()
    }

    /// Constraint literals clausified against the dedicated initial-state
    /// solver `SI`, for `initial_check`'s standalone query.
    fn constraint_lits_init(&mut self) -> Result<Vec<Lit>> {
        let constraints = self.n.constraints();
        constraints
            .iter()
            .map(|&c| self.clausifier_init.clausify(self.n, &mut *self.solver_init, c, 0, CUR, &mut *self.cb))
            .collect()
    }

    /// Is `Init ∧ cube` satisfiable? Used by the non-initiality checks in
    /// `spec.md` §8 item 2 and the weakening back-off in §4.5.
    pub(crate) fn intersects_init(&mut self, cube: &Cube) -> Result<bool> {
        let mut assumps = Vec::new();
        for &l in cube.iter() {
            let lit = self.clausifier_init.clausify(self.n, &mut *self.solver_init, l, 0, CUR, &mut *self.cb)?;
            assumps.push(lit);
        }
        Ok(self.solver_init.solve(&assumps) == SatResult::Sat)
    }

    fn bad_lit(&mut self) -> Result<Lit> {
        let bad = self.n.bad()?;
        self.cur_lit(bad)
    }

    /// `spec.md` §4.5 main loop step 1: does the initial state already
    /// violate the property?
    fn initial_check(&mut self) -> Result<Option<Counterexample>> {
        let bad = self.n.bad()?;
        let bad_lit = self.clausifier_init.clausify(self.n, &mut *self.solver_init, bad, 0, CUR, &mut *self.cb)?;
        let mut assumps = self.constraint_lits_init()?;
        assumps.push(bad_lit);
        if self.solver_init.solve(&assumps) == SatResult::Sat {
            let flops: Vec<(GateId, bool)> =
                self.n.flops().iter().map(|&f| (f, self.n.flop_init(f).unwrap_or(false))).collect();
            return Ok(Some(Counterexample { initial_flops: flops, pi_steps: Vec::new() }));
        }
        Ok(None)
    }

    /// `solveRelative((s,k), params)` (`spec.md` §4.5). `no_induct`
    /// corresponds to the `NO_INDUCT` flag disabling the `¬s(x)` assumption.
    fn solve_relative(&mut self, s: &TCube, no_induct: bool) -> Result<RelResult> {
        let k = s.frame.index().expect("solve_relative requires a concrete frame");
        assert!(k >= 1, "F[0] obligations terminate directly, never via solve_relative");

        let mut assumptions = Vec::new();
        if k == 1 {
            for &flop in self.n.flops() {
                let lit = self.cur_lit(GateRef::pos(flop))?;
                let init = self.n.flop_init(flop).unwrap_or(false);
                assumptions.push(if init { lit } else { lit.negate() });
            }
        } else {
            for j in (k - 1)..=self.trace.depth() {
                assumptions.push(self.activation_lit(j));
            }
        }

        if !no_induct {
            let nia = self.solver.new_activation_lit();
            let mut clause = vec![nia.negate()];
            for &l in s.cube.negate_to_clause().iter() {
                clause.push(self.cur_lit(l)?);
            }
            self.solver.add_clause(&clause);
            assumptions.push(nia);
        }

        // Current-state side of every safety constraint: `x` only counts as
        // a predecessor (or, for `k == 1`, as the initial state) if it is
        // itself legal (`spec.md` §3/§6).
        assumptions.extend(self.constraint_lits_cur()?);

        // s(x'): one assumption literal per cube literal, recorded so we
        // can shrink `s` against the final conflict on UNSAT.
        let mut next_assumps: Vec<(GateRef, Lit)> = Vec::new();
        for &l in s.cube.iter() {
            let lit = self.next_state_lit(l)?;
            assumptions.push(lit);
            next_assumps.push((l, lit));
        }

        // And the successor state `x'` must be legal too, or the transition
        // does not count as a real one.
        assumptions.extend(self.constraint_lits_next()?);

        match self.run_sat(&assumptions)? {
            SatResult::Unsat => {
                let conflict = self.solver.conflict().to_vec();
                let kept: Vec<GateRef> =
                    next_assumps.iter().filter(|(_, lit)| conflict.contains(lit)).map(|(l, _)| *l).collect();
                let z = if kept.is_empty() { s.cube.clone() } else { Cube::new(kept) };
                Ok(RelResult::Unsat { z })
            }
            SatResult::Sat => {
                let flops = self
                    .n
                    .flops()
                    .iter()
                    .filter_map(|&f| {
                        let lit = self.clausifier.literal_of(f, 0, CUR)?;
                        self.solver.value(lit).map(|v| (f, v))
                    })
                    .collect();
                let pis = self
                    .n
                    .pis()
                    .iter()
                    .filter_map(|&p| {
                        let lit = self.clausifier.literal_of(p, 0, CUR)?;
                        self.solver.value(lit).map(|v| (p, v))
                    })
                    .collect();
                Ok(RelResult::Sat { flops, pis })
            }
            SatResult::Unknown => Err(PdrError::ResourceExhausted),
        }
    }

    /// Run `solve`, applying the restart policy of `spec.md` §4.5
    /// "Restarts" around it: if the solver gives up under its conflict
    /// budget, clear it and re-clausify from the trace before retrying once.
    fn run_sat(&mut self, assumptions: &[Lit]) -> Result<SatResult> {
        let result = self.solver.solve(assumptions);
        if result == SatResult::Unknown && self.next_restart_limit.is_finite() {
            self.restart()?;
            return Ok(self.solver.solve(assumptions));
        }
        Ok(result)
    }

    fn restart(&mut self) -> Result<()> {
        log::debug!("restarting SAT solver, next budget x{:.2}", self.config.restart_mult);
        self.solver.clear();
        self.clausifier.invalidate();
        self.activation_lits.clear();
        self.next_restart_limit *= self.config.restart_mult;
        self.rebuild_activation_and_blocking_clauses()
    }

    /// After a restart, the SAT solver's clauses are gone but the frame
    /// trace is untouched (`spec.md` §4.5): replay every stored cube's
    /// blocking clause so the solver's state matches the trace again.
    fn rebuild_activation_and_blocking_clauses(&mut self) -> Result<()> {
        let depth = self.trace.depth();
        for k in 1..=depth {
            let _ = self.activation_lit(k);
        }
        for k in 1..=depth {
            if let Some(frame) = self.trace.frame(k) {
                let cubes: Vec<Cube> = frame.iter().cloned().collect();
                for cube in cubes {
                    self.emit_blocking_clause(&cube, k)?;
                }
            }
        }
        Ok(())
    }

    fn emit_blocking_clause(&mut self, cube: &Cube, frame: u32) -> Result<()> {
        let act = self.activation_lit(frame);
        let mut clause = vec![act.negate()];
        for &l in cube.negate_to_clause().iter() {
            clause.push(self.cur_lit(l)?);
        }
        self.solver.add_clause(&clause);
        Ok(())
    }

    /// `spec.md` §4.4 `addCube`: insert into the trace and emit the
    /// corresponding blocking clause.
    pub(crate) fn add_cube(&mut self, s: &TCube) -> Result<()> {
        if let Frame::At(k) = s.frame {
            if self.intersects_init(&s.cube)? {
                return Err(PdrError::Invariant(format!(
                    "cube about to be stored at frame {} intersects the initial states",
                    k
                )));
            }
        }
        // `redund_cubes` (`spec.md` §6): when set, skip subsumption-based
        // elimination so redundant cubes accumulate in the trace instead of
        // being dropped — useful for comparing against a run that prunes
        // aggressively, at the cost of a larger clause database.
        let (was_new, _removed) = self.trace.add_cube(s, !self.config.redund_cubes);
        if was_new {
            if let Frame::At(k) = s.frame {
                log::debug!("stored cube {:?} in F[{}]", s.cube, k);
                self.emit_blocking_clause(&s.cube, k)?;
                if self.config.use_activity {
                    for &lit in s.cube.iter() {
                        if let Some(l) = self.clausifier.literal_of(lit.id, 0, CUR) {
                            self.solver.bump_var_activity(l);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// `spec.md` §4.4 `isBlocked`.
    fn is_blocked(&mut self, s: &TCube) -> Result<bool> {
        let k = match s.frame {
            Frame::At(k) => k,
            Frame::Inf => return Ok(self.trace.inf().iter().any(|c| c.subsumes(&s.cube))),
            Frame::Null => return Ok(false),
        };
        if self.trace.subsumed_from(&s.cube, k) {
            return Ok(true);
        }
        if k == 0 {
            return Ok(!self.intersects_init(&s.cube)?);
        }
        match self.solve_relative(s, true)? {
            RelResult::Unsat { .. } => Ok(true),
            RelResult::Sat { .. } => Ok(false),
        }
    }

    /// `spec.md` §4.5 main loop. Returns the verdict once the engine
    /// terminates, or propagates a fatal [`PdrError`].
    pub fn run(&mut self) -> Result<Verdict> {
        if let Some(cex) = self.initial_check()? {
            return Ok(Verdict::Failed { cex });
        }
        loop {
            let depth = self.trace.new_frame();
            log::info!("extending to frame {}", depth);
            match self.block_bad(depth) {
                Ok(BlockOutcome::Exhausted) => {}
                Ok(BlockOutcome::Failed(cex)) => {
                    log::info!("counterexample found at depth {}", cex.pi_steps.len());
                    return Ok(Verdict::Failed { cex });
                }
                Err(PdrError::ResourceExhausted) | Err(PdrError::ClausifyAbort) => {
                    log::warn!("giving up at frame {}: resource budget exhausted", depth);
                    return Ok(Verdict::Undetermined { bug_free_depth: depth.saturating_sub(1) });
                }
                Err(e) => return Err(e),
            }
            if !self.config.skip_prop {
                if let Some(invariant) = self.propagate()? {
                    log::info!("converged with a {}-cube invariant", invariant.len());
                    return Ok(Verdict::Proved { invariant });
                }
            }
        }
    }

    /// `spec.md` §4.5 main loop step 3 "Block bad".
    fn block_bad(&mut self, depth: u32) -> Result<BlockOutcome> {
        loop {
            let bad_lit = self.bad_lit()?;
            let act = self.activation_lit(depth);
            let mut assumps = vec![act, bad_lit];
            assumps.extend(self.constraint_lits_cur()?);
            match self.run_sat(&assumps)? {
                SatResult::Unknown => return Err(PdrError::ResourceExhausted),
                SatResult::Unsat => return Ok(BlockOutcome::Exhausted),
                SatResult::Sat => {
                    let bad = self.n.bad()?;
                    let flops: Vec<(GateId, bool)> = self
                        .n
                        .flops()
                        .iter()
                        .filter_map(|&f| {
                            let lit = self.clausifier.literal_of(f, 0, CUR)?;
                            self.solver.value(lit).map(|v| (f, v))
                        })
                        .collect();
                    let pis: Vec<(GateId, bool)> = self
                        .n
                        .pis()
                        .iter()
                        .filter_map(|&p| {
                            let lit = self.clausifier.literal_of(p, 0, CUR)?;
                            self.solver.value(lit).map(|v| (p, v))
                        })
                        .collect();
                    let cube = weaken::weaken_bad_predecessor(self, &flops, &pis, bad)?;
                    log::debug!("frame {}: bad reachable, weakened to cube of size {}", depth, cube.len());
                    let size_key = self.size_key(&cube);
                    let tcube = TCube::new(cube, Frame::At(depth));
                    let priority = self.next_priority();
                    let root = Pobl::root(tcube, priority, size_key);
                    self.queue.push(PoblOrd(root));
                    if let Some(cex) = self.recursive_block()? {
                        return Ok(BlockOutcome::Failed(cex));
                    }
                }
            }
        }
    }

    /// `spec.md` §4.5 "Recursive blocking", draining the queue until it is
    /// empty (returning `None`) or a frame-0 obligation proves a real
    /// counterexample (`Some`).
    fn recursive_block(&mut self) -> Result<Option<Counterexample>> {
        while let Some(PoblOrd(pobl)) = self.queue.pop() {
            let tcube = pobl.tcube.clone();
            let k = match tcube.frame {
                Frame::At(k) => k,
                _ => continue,
            };
            if k == 0 {
                return Ok(Some(cex::extract_counterexample(self, &pobl)?));
            }
            // Syntactic check only: a cube already subsumed by something
            // stored at or above `k` is redundant to re-derive. Deliberately
            // *not* `is_blocked` (`spec.md` §4.4's full disjunction, which
            // also asks a SAT query) — that query is exactly
            // `solve_relative(tcube, true)` below, and folding it into the
            // skip-gate would discard the obligation on the same UNSAT
            // result that is supposed to drive `generalize`/`add_cube`,
            // leaving nothing learned and the obligation endlessly re-derived.
            if self.trace.subsumed_from(&tcube.cube, k) {
                continue;
            }
            match self.solve_relative(&tcube, true)? {
                RelResult::Unsat { z } => {
                    let generalized = generalize::generalize(self, z, k)?;
                    self.add_cube(&TCube::new(generalized.clone(), Frame::At(k)))?;
                    let pushed_to = self.push_forward(&generalized, k);
                    if pushed_to < self.trace.depth() {
                        let size_key = self.size_key(&generalized);
                        let priority = self.next_priority();
                        let child = Pobl::child(
                            TCube::new(generalized, Frame::At(pushed_to + 1)),
                            priority,
                            size_key,
                            &pobl,
                        );
                        self.queue.push(PoblOrd(child));
                    }
                }
                RelResult::Sat { flops, pis } => {
                    let target = tcube.cube.clone();
                    let is_terminal = k - 1 == 0;
                    let weakened = weaken::weaken_predecessor(self, &flops, &pis, &target, is_terminal)?;
                    log::debug!("frame {}: predecessor found, weakened to cube of size {}", k, weakened.len());
                    let size_key = self.size_key(&weakened);
                    let priority = self.next_priority();
                    let child = Pobl::child(TCube::new(weakened, Frame::At(k - 1)), priority, size_key, &pobl);
                    self.queue.push(PoblOrd(child));

                    let retry_size_key = self.size_key(&tcube.cube);
                    let priority2 = self.next_priority();
                    let retry = Pobl::child(tcube.clone(), priority2, retry_size_key, &pobl);
                    self.queue.push(PoblOrd(retry));
                }
            }
        }
        Ok(None)
    }

    /// Optionally push `z` forward past frame `k` to the highest frame where
    /// it still holds, per `spec.md` §4.5's "optionally push `z` forward".
    /// Returns the highest frame confirmed, which may just be `from`. Unlike
    /// `recursive_block`'s obligation skip-gate, this only needs a yes/no
    /// answer (not a possibly-smaller witness to generalize further), so it
    /// uses the full `isBlocked` query (`spec.md` §4.4) rather than the
    /// syntactic subsumption check alone.
    fn push_forward(&mut self, z: &Cube, from: u32) -> u32 {
        let mut k = from;
        let depth = self.trace.depth();
        while k < depth {
            let probe = TCube::new(z.clone(), Frame::At(k + 1));
            match self.is_blocked(&probe) {
                Ok(true) => k += 1,
                _ => break,
            }
        }
        k
    }

    /// `spec.md` §4.5 main loop step 4 "Propagate".
    fn propagate(&mut self) -> Result<Option<Vec<Cube>>> {
        let depth = self.trace.depth();
        for k in 1..depth {
            let cubes: Vec<Cube> = self.trace.frame(k).map(|s| s.iter().cloned().collect()).unwrap_or_default();
            for c in cubes {
                let probe = TCube::new(c.clone(), Frame::At(k + 1));
                if let RelResult::Unsat { z } = self.solve_relative(&probe, true)? {
                    self.trace.promote(k, &c);
                    if z != c {
                        self.add_cube(&TCube::new(z, Frame::At(k + 1)))?;
                    } else {
                        self.emit_blocking_clause(&c, k + 1)?;
                    }
                }
            }
            if self.trace.frames_equal(k) {
                log::debug!("F[{}] = F[{}]: fixed point reached", k, k + 1);
                return Ok(Some(self.trace.invariant_cubes(k)));
            }
        }
        Ok(None)
    }
}
