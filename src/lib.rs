/*!
# Property-directed reachability for finite-state hardware models

This crate implements IC3/PDR, a SAT-based algorithm for proving or
refuting safety properties of finite-state sequential circuits. Given a
netlist (primary inputs, flops, combinational gates, and a distinguished
safety property), it either:

- proves the property holds at every reachable state, returning an
  inductive invariant expressed as a set of blocked cubes, or
- finds a concrete counterexample trace, or
- reports how deep it searched before giving up under a resource budget.

Front-ends (AIGER/BLIF parsers, a Verilog/Liberty toolchain, a CLI driver
beyond the small demo binary) and companion engines (BMC, interpolation,
BDD-based reachability, liveness/LTL, constraint extraction, property
clustering) are out of scope — build a [`netlist::Netlist`] directly, or
read one in with whatever front-end your application needs.

## Module map

- [`netlist`]: the And-Inverter-graph substrate every other module operates
  on.
- [`cube`]: `Cube`, `TCube`, and the proof-obligation record built on it.
- [`sat`]: the SAT-solver adapter trait, with a bundled CDCL backend in
  [`sat::splr_backend`].
- [`clausifier`]: incremental Tseitin/Plaisted–Greenbaum CNF translation.
- [`ternary`]: three-valued simulation, used for cube weakening.
- [`frame_trace`]: the `F[0..depth]`/`F[∞]` cube-set bookkeeping.
- [`pdr`]: the engine itself — main loop, `solveRelative`, generalization,
  weakening, and counterexample extraction.
- [`config`]: the engine's parameter record and demo CLI.
- [`error`]: the crate-wide failure taxonomy.
*/
pub mod clausifier;
pub mod config;
pub mod cube;
pub mod error;
pub mod frame_trace;
pub mod netlist;
pub mod pdr;
pub mod sat;
pub mod ternary;

pub use config::Config;
pub use error::{PdrError, Result};
pub use pdr::{PdrEngine, Verdict};
