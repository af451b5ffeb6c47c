// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Listener Wrapper
// ─────────────────────────────────────────────────────────────────────
//! Caller-facing wrapper: takes an opaque JSON payload, runs one
//! collection, and answers with a flat record. Empty or undecodable
//! payloads produce the inert record `{ None, [], 0.0, false }`.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use sgc_graph::{Graph, NodeId, OmegaSignature};
use sgc_types::{PruneSummary, SgcError, SgcParams, SgcResult};

use crate::collector::{compute_entropy_reduction, SoulGarbageCollector};
use crate::morphic::MorphicTree;

/// Structured answer returned to the listener.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneRecord {
    pub pruned_structure: Option<MorphicTree>,
    pub pruned_nodes: Vec<NodeId>,
    pub entropy_reduction: f64,
    pub sgc_applied: bool,
}

impl PruneRecord {
    pub fn inert() -> Self {
        Self::default()
    }
}

/// Decode a payload into a graph. `Ok(None)` means "nothing to do".
pub fn decode_payload(payload: &Value) -> SgcResult<Option<Graph>> {
    match payload {
        Value::Null => return Ok(None),
        Value::Object(map) if map.is_empty() => return Ok(None),
        Value::Object(map) if !map.contains_key("nodes") || !map.contains_key("labels") => {
            return Ok(None)
        }
        Value::Object(_) => {}
        other => {
            return Err(SgcError::Payload(format!(
                "expected a graph object, got {other}"
            )))
        }
    }
    let graph: Graph = serde_json::from_value(payload.clone())
        .map_err(|e| SgcError::Payload(format!("graph decode failed: {e}")))?;
    Ok((!graph.is_empty()).then_some(graph))
}

/// Thread-safe listener front-end with a bounded run history.
pub struct SgcListener {
    params: SgcParams,
    reference: Option<OmegaSignature>,
    history_window: usize,
    history: Mutex<VecDeque<PruneSummary>>,
}

impl SgcListener {
    /// `reference` fixes Ω for every run; without it Ω is derived from
    /// each payload graph.
    pub fn new(params: SgcParams, reference: Option<&Graph>, history_window: usize) -> SgcResult<Self> {
        params.validate()?;
        if history_window == 0 {
            return Err(SgcError::Config(
                "history_window must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            params,
            reference: reference.map(OmegaSignature::derive),
            history_window,
            history: Mutex::new(VecDeque::with_capacity(history_window)),
        })
    }

    pub fn params(&self) -> &SgcParams {
        &self.params
    }

    pub fn apply(&self, payload: &Value) -> PruneRecord {
        let graph = match decode_payload(payload) {
            Ok(Some(g)) => g,
            Ok(None) => return PruneRecord::inert(),
            Err(e) => {
                log::warn!("SGC listener: {e}");
                return PruneRecord::inert();
            }
        };

        let omega = self
            .reference
            .clone()
            .unwrap_or_else(|| OmegaSignature::derive(&graph));
        let collector = match SoulGarbageCollector::new(Some(omega), self.params) {
            Ok(c) => c,
            Err(e) => {
                log::error!("SGC listener: {e}");
                return PruneRecord::inert();
            }
        };

        let before = MorphicTree::build(graph);
        let outcome = collector.collect(&before);
        let entropy_reduction = compute_entropy_reduction(&before, outcome.structure.as_ref());

        self.record(PruneSummary::new(
            outcome.pruned_nodes.len(),
            entropy_reduction,
            true,
        ));

        PruneRecord {
            pruned_structure: outcome.structure,
            pruned_nodes: outcome.pruned_nodes,
            entropy_reduction,
            sgc_applied: true,
        }
    }

    /// `apply` on a JSON string; unparseable text is treated as empty.
    pub fn apply_json(&self, json: &str) -> PruneRecord {
        match serde_json::from_str::<Value>(json) {
            Ok(v) => self.apply(&v),
            Err(e) => {
                log::warn!("SGC listener: payload is not JSON: {e}");
                PruneRecord::inert()
            }
        }
    }

    fn record(&self, summary: PruneSummary) {
        let mut history = self.history.lock();
        if history.len() == self.history_window {
            history.pop_front();
        }
        history.push_back(summary);
    }

    pub fn history(&self) -> Vec<PruneSummary> {
        self.history.lock().iter().copied().collect()
    }

    pub fn reset(&self) {
        self.history.lock().clear();
    }
}
