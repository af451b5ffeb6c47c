// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all SGC Kernel failures.
///
/// Errors only arise at construction boundaries (parameters, graphs,
/// payloads). Once a collection run starts it always completes;
/// non-finite numeric input is dropped or clamped with a warning.
#[derive(Error, Debug)]
pub enum SgcError {
    /// Out-of-range or unparseable configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Graph violates the labeled-graph invariants.
    #[error("graph error: {0}")]
    Graph(String),

    /// Listener payload could not be decoded.
    #[error("payload error: {0}")]
    Payload(String),
}

pub type SgcResult<T> = Result<T, SgcError>;
