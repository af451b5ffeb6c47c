// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Kernel PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied — PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the SGC kernel.
//!
//! Exposes `SgcParams`, `CycleConfig`, `RustSoulGarbageCollector`,
//! `RustSgcListener`, `RustCycleEngine` and the `run_cycle` /
//! `run_cycle_json` / `sub_monad_metrics` functions.
//!
//! # FFI Safety
//!
//! - Graphs cross the boundary as JSON text; decode failures raise
//!   `ValueError`, except in the listener, which answers with the inert
//!   record.
//! - All config validated before storage.
//!
//! Usage from Python:
//! ```python
//! from sgc_kernel import RustSgcListener, SgcParams, run_cycle
//!
//! listener = RustSgcListener(SgcParams(epsilon=0.3))
//! record = listener.apply({"nodes": [0, 1], "edges": [[0, 1]], "labels": {...}})
//! report = run_cycle([[0.1, 0.2, 3.0], [1.0, 1.05]])
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyString};

use sgc_core::{
    compute_entropy_reduction, MorphicTree, PruneRecord, SgcListener, SoulGarbageCollector,
};
use sgc_graph::Graph;
use sgc_tfca::{CycleEngine, CycleReport, SystemMetrics, DEFAULT_HISTORY_WINDOW};
use sgc_types::{CycleConfig, ModePolicy, SgcParams};

fn value_err(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_graph(json: &str) -> PyResult<Graph> {
    serde_json::from_str(json).map_err(|e| value_err(format!("invalid graph JSON: {e}")))
}

// ─── PySgcParams ────────────────────────────────────────────────────

/// Python-visible collector parameters.
#[pyclass(name = "SgcParams")]
#[derive(Clone)]
struct PySgcParams {
    inner: SgcParams,
}

#[pymethods]
impl PySgcParams {
    #[new]
    #[pyo3(signature = (
        epsilon = 0.3,
        grace_readiness_threshold = 0.5,
        max_recursion_depth = 10,
        observer_feedback_weight = 0.2,
    ))]
    fn new(
        epsilon: f64,
        grace_readiness_threshold: f64,
        max_recursion_depth: u32,
        observer_feedback_weight: f64,
    ) -> PyResult<Self> {
        let params = SgcParams {
            epsilon,
            grace_readiness_threshold,
            max_recursion_depth,
            observer_feedback_weight,
        };
        params.validate().map_err(value_err)?;
        Ok(Self { inner: params })
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let params = SgcParams::from_json(json).map_err(value_err)?;
        Ok(Self { inner: params })
    }

    #[getter]
    fn epsilon(&self) -> f64 {
        self.inner.epsilon
    }

    #[getter]
    fn grace_readiness_threshold(&self) -> f64 {
        self.inner.grace_readiness_threshold
    }

    #[getter]
    fn max_recursion_depth(&self) -> u32 {
        self.inner.max_recursion_depth
    }

    fn __repr__(&self) -> String {
        format!(
            "SgcParams(epsilon={}, grace_readiness_threshold={}, max_recursion_depth={}, observer_feedback_weight={})",
            self.inner.epsilon,
            self.inner.grace_readiness_threshold,
            self.inner.max_recursion_depth,
            self.inner.observer_feedback_weight
        )
    }
}

// ─── PyCycleConfig ──────────────────────────────────────────────────

/// Python-visible three-scale cycle configuration.
#[pyclass(name = "CycleConfig")]
#[derive(Clone)]
struct PyCycleConfig {
    inner: CycleConfig,
}

#[pymethods]
impl PyCycleConfig {
    #[new]
    #[pyo3(signature = (
        dissonance_threshold = 0.5,
        resonance_threshold = 0.2,
        grace_flow_rate = 0.1,
        coupling_strength = 0.5,
        dt = 1.0,
        grace_damping = 0.1,
        alignment_threshold = 0.8,
        mode_policy = "round_robin",
        meta_group_threshold = 0.5,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        dissonance_threshold: f64,
        resonance_threshold: f64,
        grace_flow_rate: f64,
        coupling_strength: f64,
        dt: f64,
        grace_damping: f64,
        alignment_threshold: f64,
        mode_policy: &str,
        meta_group_threshold: f64,
    ) -> PyResult<Self> {
        let mode_policy = match mode_policy {
            "round_robin" => ModePolicy::RoundRobin,
            "by_coherence" => ModePolicy::ByCoherence,
            other => {
                return Err(PyValueError::new_err(format!(
                    "mode_policy must be 'round_robin' or 'by_coherence', got '{other}'"
                )))
            }
        };
        let config = CycleConfig {
            dissonance_threshold,
            resonance_threshold,
            grace_flow_rate,
            coupling_strength,
            dt,
            grace_damping,
            alignment_threshold,
            meta_group_threshold,
            mode_policy,
        };
        config.validate().map_err(value_err)?;
        Ok(Self { inner: config })
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = CycleConfig::from_json(json).map_err(value_err)?;
        Ok(Self { inner: config })
    }

    fn __repr__(&self) -> String {
        format!(
            "CycleConfig(dissonance_threshold={}, resonance_threshold={}, dt={}, alignment_threshold={})",
            self.inner.dissonance_threshold,
            self.inner.resonance_threshold,
            self.inner.dt,
            self.inner.alignment_threshold
        )
    }
}

// ─── PySoulGarbageCollector ─────────────────────────────────────────

/// Collector bound to a reference graph's Ω signature.
#[pyclass(name = "RustSoulGarbageCollector")]
struct PySoulGarbageCollector {
    inner: SoulGarbageCollector,
}

#[pymethods]
impl PySoulGarbageCollector {
    /// `reference_json` is the Ω source graph; without it `collect`
    /// returns every structure unchanged.
    #[new]
    #[pyo3(signature = (reference_json = None, params = None))]
    fn new(reference_json: Option<&str>, params: Option<PySgcParams>) -> PyResult<Self> {
        let params = params.map(|p| p.inner).unwrap_or_default();
        let inner = match reference_json {
            Some(json) => SoulGarbageCollector::for_reference(&parse_graph(json)?, params),
            None => SoulGarbageCollector::new(None, params),
        }
        .map_err(value_err)?;
        Ok(Self { inner })
    }

    /// Decompose and collect a graph. Returns a dict with
    /// `structure` (tree JSON or None), `pruned_nodes`,
    /// `entropy_released`, `entropy_reduction` and `evaluations`.
    fn collect<'py>(&self, py: Python<'py>, graph_json: &str) -> PyResult<Bound<'py, PyDict>> {
        let before = MorphicTree::build(parse_graph(graph_json)?);
        let outcome = self.inner.collect(&before);
        let reduction = compute_entropy_reduction(&before, outcome.structure.as_ref());
        let structure = outcome
            .structure
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(value_err)?;

        let dict = PyDict::new(py);
        dict.set_item("structure", structure)?;
        dict.set_item("pruned_nodes", outcome.pruned_nodes)?;
        dict.set_item("entropy_released", outcome.entropy_released)?;
        dict.set_item("entropy_reduction", reduction)?;
        dict.set_item("evaluations", outcome.evaluations)?;
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        format!(
            "RustSoulGarbageCollector(has_signature={}, epsilon={})",
            self.inner.signature().is_some(),
            self.inner.params().epsilon
        )
    }
}

// ─── PySgcListener ──────────────────────────────────────────────────

fn record_to_dict<'py>(py: Python<'py>, record: &PruneRecord) -> PyResult<Bound<'py, PyDict>> {
    let structure = record
        .pruned_structure
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(value_err)?;
    let dict = PyDict::new(py);
    dict.set_item("pruned_structure", structure)?;
    dict.set_item("pruned_nodes", record.pruned_nodes.clone())?;
    dict.set_item("entropy_reduction", record.entropy_reduction)?;
    dict.set_item("sgc_applied", record.sgc_applied)?;
    Ok(dict)
}

/// Listener wrapper: payload in, flat record dict out.
#[pyclass(name = "RustSgcListener")]
struct PySgcListener {
    inner: SgcListener,
}

#[pymethods]
impl PySgcListener {
    #[new]
    #[pyo3(signature = (params = None, reference_json = None, history_window = 16))]
    fn new(
        params: Option<PySgcParams>,
        reference_json: Option<&str>,
        history_window: usize,
    ) -> PyResult<Self> {
        let params = params.map(|p| p.inner).unwrap_or_default();
        let reference = reference_json.map(parse_graph).transpose()?;
        let inner =
            SgcListener::new(params, reference.as_ref(), history_window).map_err(value_err)?;
        Ok(Self { inner })
    }

    /// Accepts a JSON string, a dict, or None.
    fn apply<'py>(
        &self,
        py: Python<'py>,
        payload: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let record = if payload.is_none() {
            PruneRecord::inert()
        } else if payload.is_instance_of::<PyString>() {
            self.inner.apply_json(&payload.extract::<String>()?)
        } else {
            let json = py.import("json")?;
            match json.call_method1("dumps", (payload,)) {
                Ok(text) => self.inner.apply_json(&text.extract::<String>()?),
                Err(e) => {
                    log::warn!("SGC listener: payload is not JSON-serialisable: {e}");
                    PruneRecord::inert()
                }
            }
        };
        record_to_dict(py, &record)
    }

    /// Recent run summaries, oldest first.
    fn history<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty(py);
        for summary in self.inner.history() {
            let dict = PyDict::new(py);
            dict.set_item("pruned_count", summary.pruned_count)?;
            dict.set_item("entropy_reduction", summary.entropy_reduction)?;
            dict.set_item("sgc_applied", summary.sgc_applied)?;
            list.append(dict)?;
        }
        Ok(list)
    }

    fn reset(&self) {
        self.inner.reset();
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

fn report_to_dict<'py>(py: Python<'py>, report: &CycleReport) -> PyResult<Bound<'py, PyDict>> {
    let local = PyList::empty(py);
    for r in &report.local {
        let d = PyDict::new(py);
        d.set_item("structure_id", r.structure_id)?;
        d.set_item("mode_used", r.mode_used.as_str())?;
        d.set_item("initial_spider_count", r.initial_spider_count)?;
        d.set_item("final_spider_count", r.final_spider_count)?;
        d.set_item("spiders_fused", r.spiders_fused)?;
        d.set_item("entropy_released", r.entropy_released)?;
        d.set_item("grace_accumulated", r.grace_accumulated)?;
        d.set_item("phases", r.phases.clone())?;
        local.append(d)?;
    }

    let groups = PyList::empty(py);
    for g in &report.meta_groups {
        let d = PyDict::new(py);
        d.set_item("members", g.members.clone())?;
        d.set_item("order_parameter", g.order_parameter)?;
        d.set_item("total_entropy", g.state.total_entropy)?;
        d.set_item("scalar_grace", g.state.scalar_grace)?;
        d.set_item("stability", g.state.stability())?;
        groups.append(d)?;
    }

    let ledger = &report.ledger;
    let dict = PyDict::new(py);
    dict.set_item("cycle_number", report.cycle_number)?;
    dict.set_item("local", local)?;
    dict.set_item("meta_groups", groups)?;
    dict.set_item("meta_bivector", report.meta_final.bivector.to_vec())?;
    dict.set_item("meta_scalar_grace", report.meta_final.scalar_grace)?;
    dict.set_item("meta_stability", report.meta_final.stability())?;
    dict.set_item("compressed_harmonics", report.harvest.compressed_harmonics)?;
    dict.set_item("compression_ratio", report.harvest.compression_ratio)?;
    dict.set_item("grace_yield", report.harvest.grace_yield)?;
    dict.set_item("omega_signature", report.harvest.omega_signature.clone())?;
    dict.set_item("total_entropy_released", ledger.total_entropy_released())?;
    dict.set_item("total_grace_accumulated", ledger.total_grace_accumulated())?;
    dict.set_item("conservation_error", report.conservation_error)?;
    dict.set_item("relative_error", ledger.relative_error())?;
    Ok(dict)
}

fn engine(config: Option<PyCycleConfig>) -> PyResult<CycleEngine> {
    CycleEngine::new(config.map(|c| c.inner).unwrap_or_default()).map_err(value_err)
}

/// Run one local → meta → harvest cycle over per-structure phase lists.
#[pyfunction]
#[pyo3(signature = (phases, config = None))]
fn run_cycle<'py>(
    py: Python<'py>,
    phases: Vec<Vec<f64>>,
    config: Option<PyCycleConfig>,
) -> PyResult<Bound<'py, PyDict>> {
    let report = engine(config)?.run(&phases);
    report_to_dict(py, &report)
}

/// As `run_cycle`, returning the full report as JSON text.
#[pyfunction]
#[pyo3(signature = (phases, config = None))]
fn run_cycle_json(phases: Vec<Vec<f64>>, config: Option<PyCycleConfig>) -> PyResult<String> {
    let report = engine(config)?.run(&phases);
    serde_json::to_string(&report).map_err(value_err)
}

fn metrics_to_dict<'py>(py: Python<'py>, m: &SystemMetrics) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("cycles_completed", m.cycles_completed)?;
    dict.set_item("cycles_in_window", m.cycles_in_window)?;
    dict.set_item("compression_efficiency", m.compression_efficiency)?;
    dict.set_item("avg_relative_error", m.avg_relative_error)?;
    dict.set_item("avg_meta_groups", m.avg_meta_groups)?;
    dict.set_item("avg_meta_stability", m.avg_meta_stability)?;
    Ok(dict)
}

/// Cycle runner that keeps a bounded history across calls.
#[pyclass(name = "RustCycleEngine")]
struct PyCycleEngine {
    inner: CycleEngine,
}

#[pymethods]
impl PyCycleEngine {
    #[new]
    #[pyo3(signature = (config = None, history_window = DEFAULT_HISTORY_WINDOW))]
    fn new(config: Option<PyCycleConfig>, history_window: usize) -> PyResult<Self> {
        let config = config.map(|c| c.inner).unwrap_or_default();
        let inner = CycleEngine::with_history_window(config, history_window).map_err(value_err)?;
        Ok(Self { inner })
    }

    fn run<'py>(&self, py: Python<'py>, phases: Vec<Vec<f64>>) -> PyResult<Bound<'py, PyDict>> {
        let report = self.inner.run(&phases);
        report_to_dict(py, &report)
    }

    /// Run on graphs given as JSON text, one per structure.
    fn run_on_graphs<'py>(
        &self,
        py: Python<'py>,
        graphs_json: Vec<String>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let graphs = graphs_json
            .iter()
            .map(|json| parse_graph(json))
            .collect::<PyResult<Vec<Graph>>>()?;
        let report = self.inner.run_on_graphs(&graphs);
        report_to_dict(py, &report)
    }

    /// Recent cycle summaries, oldest first.
    fn history<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty(py);
        for s in self.inner.history() {
            let dict = PyDict::new(py);
            dict.set_item("cycle_number", s.cycle_number)?;
            dict.set_item("structures", s.structures)?;
            dict.set_item("meta_groups", s.meta_groups)?;
            dict.set_item("entropy_released", s.entropy_released)?;
            dict.set_item("grace_accumulated", s.grace_accumulated)?;
            dict.set_item("relative_error", s.relative_error)?;
            dict.set_item("compression_ratio", s.compression_ratio)?;
            dict.set_item("meta_stability", s.meta_stability)?;
            list.append(dict)?;
        }
        Ok(list)
    }

    fn metrics<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        metrics_to_dict(py, &self.inner.metrics())
    }

    fn reset(&self) {
        self.inner.reset();
    }

    fn __repr__(&self) -> String {
        format!(
            "RustCycleEngine(history_window={}, cycles_completed={})",
            self.inner.history_window(),
            self.inner.metrics().cycles_completed
        )
    }
}

/// Census of graphs (JSON text) as sub-monads: `count`,
/// `avg_coherence` and `regime_distribution` keyed by regime name.
#[pyfunction]
fn sub_monad_metrics<'py>(py: Python<'py>, graphs_json: Vec<String>) -> PyResult<Bound<'py, PyDict>> {
    let graphs = graphs_json
        .iter()
        .map(|json| parse_graph(json))
        .collect::<PyResult<Vec<Graph>>>()?;
    let m = sgc_tfca::sub_monad_metrics(&graphs);
    let regimes = PyDict::new(py);
    for (regime, count) in &m.regime_distribution {
        regimes.set_item(regime.as_str(), *count)?;
    }
    let dict = PyDict::new(py);
    dict.set_item("count", m.count)?;
    dict.set_item("avg_coherence", m.avg_coherence)?;
    dict.set_item("regime_distribution", regimes)?;
    Ok(dict)
}

// ─── Module ─────────────────────────────────────────────────────────

#[pymodule]
fn sgc_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Configuration
    m.add_class::<PySgcParams>()?;
    m.add_class::<PyCycleConfig>()?;
    // Collector
    m.add_class::<PySoulGarbageCollector>()?;
    m.add_class::<PySgcListener>()?;
    // Three-scale cycle
    m.add_function(wrap_pyfunction!(run_cycle, m)?)?;
    m.add_function(wrap_pyfunction!(run_cycle_json, m)?)?;
    m.add_class::<PyCycleEngine>()?;
    m.add_function(wrap_pyfunction!(sub_monad_metrics, m)?)?;
    Ok(())
}
