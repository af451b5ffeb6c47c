// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! SGC Kernel — recursive Soul Garbage Collection over morphic trees.

pub mod config;
pub mod error;
pub mod metrics;

pub use config::{CycleConfig, ModePolicy, SgcParams};
pub use error::{SgcError, SgcResult};
pub use metrics::{clamp_score, PruneSummary, RewriteMode};
