//! Crate `error` collects the failure taxonomy of the PDR core (see `spec.md` §7).
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PdrError>;

/// Something a fallible core operation can fail with.
///
/// Malformed-input and internal-invariant variants are fatal: they unwind out
/// of [`crate::pdr::PdrEngine::run`] to the caller. [`PdrError::ResourceExhausted`]
/// and [`PdrError::ClausifyAbort`] are recoverable — the main loop turns them
/// into [`crate::pdr::Verdict::Undetermined`].
#[derive(Debug, Error)]
pub enum PdrError {
    /// The netlist violates a structural precondition the preparation pass is
    /// supposed to guarantee (missing/duplicate bad signal, gate numbering
    /// clash, reference to a deleted gate).
    #[error("malformed netlist: {0}")]
    MalformedNetlist(String),

    /// An unsupported gate type was reached during clausification. The
    /// preparation pass should have rejected this netlist; reaching it here
    /// means the core was handed something the front-end never validated.
    #[error("clausification cannot handle gate kind: {0}")]
    UnsupportedGate(String),

    /// The clausifier's effort callback asked for work to stop.
    #[error("clausification aborted by resource callback")]
    ClausifyAbort,

    /// A SAT query ran out of budget (conflict count or wall clock) and
    /// returned `l_Undef`.
    #[error("SAT query exhausted its resource budget")]
    ResourceExhausted,

    /// A cube violated a frame-trace invariant (e.g. it subsumes an initial
    /// state). This indicates a bug in the engine, not in the input, so it is
    /// treated as fatal per `spec.md` §7.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// A counterexample produced by the engine failed to re-simulate to a
    /// `bad = true` verdict. Fatal for the same reason as `Invariant`.
    #[error("counterexample rejected by ternary simulator: {0}")]
    CexRejected(String),
}
