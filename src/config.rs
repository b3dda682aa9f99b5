//! Crate `config` provides the PDR engine's parameter record and a CLI
//! wrapper around it, following the split the teacher's `config.rs` uses
//! between a plain `Default`-able `Config` and a separate flag-parsing layer
//! (there `structopt`, here `clap`'s derive API — the ecosystem's current
//! equivalent).
use clap::Parser;

/// Cube-weakening strategy for predecessor extraction (`spec.md` §4.5
/// "Weakening").
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Weaken {
    /// No weakening; use the full SAT model.
    None,
    /// Ternary-simulation based weakening.
    Sim,
    /// Justification-based weakening.
    Just,
}

impl Default for Weaken {
    fn default() -> Self {
        Weaken::Sim
    }
}

/// Choice of underlying CDCL engine (`spec.md` §6 `sat_solver`). Only
/// [`SatSolverKind::Splr`] is wired to a constructor by this crate; the other
/// variants name external engines this crate does not vendor, so
/// `PdrEngine::new` builds the bundled backend regardless of this field —
/// see `DESIGN.md`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SatSolverKind {
    /// The bundled incremental CDCL core, adapted from the teacher crate.
    Splr,
    Msc,
    Abc,
    Glu,
    Zz,
    Msr,
    Glr,
}

impl Default for SatSolverKind {
    fn default() -> Self {
        SatSolverKind::Splr
    }
}

/// The PDR engine's parameter record (`spec.md` §6).
#[derive(Clone, Debug)]
pub struct Config {
    pub seed: u64,
    pub multi_sat: bool,
    pub use_activity: bool,
    pub weaken: Weaken,
    pub pre_weak: bool,
    /// Run semantic cone-of-influence: bit0 = before propagation, bit1 =
    /// after propagation.
    pub semant_coi: u8,
    pub skip_prop: bool,
    pub restart_lim: f64,
    pub restart_mult: f64,
    pub orbits: f32,
    pub gen_with_cex: bool,
    pub hq: bool,
    pub redund_cubes: bool,
    pub sort_pob_size: bool,
    pub pre_cubes: u32,
    /// 0 = no simplification, 1 = fast, 2 = full.
    pub simp_invar: u8,
    pub sat_solver: SatSolverKind,
    pub quiet: bool,
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            seed: 0,
            multi_sat: false,
            use_activity: true,
            weaken: Weaken::Sim,
            pre_weak: true,
            semant_coi: 0,
            skip_prop: false,
            restart_lim: 0.0,
            restart_mult: 1.2,
            orbits: 2.0,
            gen_with_cex: false,
            hq: false,
            redund_cubes: false,
            sort_pob_size: false,
            pre_cubes: 1,
            simp_invar: 0,
            sat_solver: SatSolverKind::Splr,
            quiet: false,
            verbosity: 0,
        }
    }
}

/// Command-line surface for the demo binary (`src/bin/pdr.rs`). Not used by
/// the library itself — kept here, next to `Config`, the way the teacher
/// keeps its CLI-derived struct and the plain defaults it falls back to in
/// the same module.
#[derive(Parser, Debug)]
#[command(name = "pdr", about = "Property-directed reachability for small hardware netlists")]
pub struct Cli {
    /// Path to a netlist in the demo textual format.
    pub netlist: std::path::PathBuf,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long)]
    pub multi_sat: bool,

    #[arg(long, value_enum, default_value_t = Weaken::Sim)]
    pub weaken: Weaken,

    #[arg(long, default_value_t = 1.2)]
    pub restart_mult: f64,

    #[arg(long, default_value_t = 2.0)]
    pub orbits: f32,

    #[arg(short, long)]
    pub quiet: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Cli {
    pub fn into_config(self) -> Config {
        Config {
            seed: self.seed,
            multi_sat: self.multi_sat,
            weaken: self.weaken,
            restart_mult: self.restart_mult,
            orbits: self.orbits,
            quiet: self.quiet,
            verbosity: self.verbosity,
            ..Config::default()
        }
    }
}
