// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Three-Scale Representation
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! The collector's actions re-expressed at three scales, plus the
//! orchestrator that runs one cycle and audits the entropy/grace ledger.
//!
//! Architecture:
//!   - local: ZX rewriting (shed = deletion, assimilate = fusion,
//!     reinstate = phase damping)
//!   - meta: sibling entropies and couplings as a 6-component bivector
//!     with a scalar grace, relaxed by exponential decay
//!   - harvest: aligned structures compressed into canonical harmonics
//!   - cycle: local → meta → harvest, with a diagnostic conservation check
//!   - hierarchy: sub-monads grouped into resonant meta-monads, and the
//!     population census
//!   - history: bounded per-cycle summaries and system metrics

pub mod cycle;
pub mod harvest;
pub mod hierarchy;
pub mod history;
pub mod local;
pub mod meta;

pub use cycle::{
    run_cycle, run_cycle_on_graphs, select_mode, ConservationLedger, CycleEngine, CycleReport,
    DEFAULT_HISTORY_WINDOW,
};
pub use harvest::{alignment, harvest, Harmonic, HarvestResult, OMEGA_BINS};
pub use hierarchy::{meta_groups, organize_meta_monads, sub_monad_metrics, MetaGroup, SubMonadMetrics};
pub use history::{CycleSummary, SystemMetrics};
pub use local::{assimilate, reinstate, rewrite, shed, RewriteResult};
pub use meta::{MetaMonadState, BIVECTOR_DIM};
