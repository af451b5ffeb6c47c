// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Morphic structure trees and the recursive Soul Garbage Collector.
//!
//! 𝒮GC(μ) = ∅ if resonance(μ) < ε and grace(μ), else μ ← { 𝒮GC(ν) | ν ∈ children(μ) }
//!
//! # Invariants
//!
//! 1. **No invented nodes**: the surviving node-id set after `collect` is
//!    always a subset of the input node-id set.
//!
//! 2. **Hard depth ceiling**: a structure at depth `≥ max_recursion_depth`
//!    is returned untouched without evaluation. The root sits at depth 0,
//!    so a run performs at most `2^d` evaluations at any single level.
//!
//! 3. **Total recursion**: every branch returns; there is no mid-run abort.
//!    Configuration is validated before the first call.
//!
//! 4. **Independent siblings**: child subtrees only share the read-only
//!    tree and Ω signature, so they are dispatched through `rayon::join`
//!    when the `parallel` feature is on.

pub mod collector;
pub mod listener;
pub mod morphic;

pub use collector::{compute_entropy_reduction, CollectOutcome, SoulGarbageCollector};
pub use listener::{PruneRecord, SgcListener};
pub use morphic::{MorphicNode, MorphicTree, StructureId};
