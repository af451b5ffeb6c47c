// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Graph Model
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Labeled spider graphs and the read-only oracles the collector
//! consults: Ω signature + resonance, the coherence functional, and
//! the field-regime classifier.

pub mod coherence;
pub mod graph;
pub mod phase;
pub mod regime;
pub mod signature;

pub use coherence::coherence;
pub use graph::{Graph, NodeId, NodeLabel, SpiderKind};
pub use phase::{circular_distance, circular_mean, order_parameter, wrap_to_pi, Phase};
pub use regime::FieldRegime;
pub use signature::{resonance, OmegaSignature};
