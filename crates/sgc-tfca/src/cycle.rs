// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Three-Scale Cycle
// ─────────────────────────────────────────────────────────────────────
//! One cycle: local rewrites → meta-monad aggregate → harvest.
//!
//! Ledger sign convention: entropy released counts as ΔS = −S, grace
//! accumulated as ΔG = +G, so the conservation error is |−S + G|.
//! Mid-scale dissipation D = S_meta(0) − S_meta(dt) is booked on both
//! sides (released as entropy, gained as grace).
//!
//! The error is a diagnostic. Nothing here fails on a large value.
//! On incoherent populations it stays under 2·S. Tightly aligned
//! populations are grace-dominated instead: reinstatement and harvest
//! grace outgrow the little entropy there is to release, and the
//! relative error exceeds 2.
//!
//! Alongside the population-wide aggregate, structures are grouped into
//! resonant meta-monads (see `hierarchy`). The groups are reported and
//! feed the engine's history; the ledger uses the population aggregate.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use sgc_graph::{order_parameter, Graph};
use sgc_types::{CycleConfig, ModePolicy, RewriteMode, SgcError, SgcResult};

use crate::harvest::{harvest, HarvestResult};
use crate::hierarchy::{meta_groups, MetaGroup};
use crate::history::{CycleHistory, CycleSummary, SystemMetrics};
use crate::local::{rewrite, RewriteResult};
use crate::meta::MetaMonadState;

/// Order-parameter band edges for `ModePolicy::ByCoherence`.
const SHED_BELOW_R: f64 = 0.3;
const ASSIMILATE_ABOVE_R: f64 = 0.7;

/// Cycles kept by `CycleEngine::new`.
pub const DEFAULT_HISTORY_WINDOW: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConservationLedger {
    pub local_entropy: f64,
    pub local_grace: f64,
    pub mid_entropy: f64,
    pub mid_grace: f64,
    pub harvest_entropy: f64,
    pub harvest_grace: f64,
}

impl ConservationLedger {
    pub fn total_entropy_released(&self) -> f64 {
        self.local_entropy + self.mid_entropy + self.harvest_entropy
    }

    pub fn total_grace_accumulated(&self) -> f64 {
        self.local_grace + self.mid_grace + self.harvest_grace
    }

    /// |ΔS + ΔG| with ΔS = −released.
    pub fn conservation_error(&self) -> f64 {
        (-self.total_entropy_released() + self.total_grace_accumulated()).abs()
    }

    pub fn relative_error(&self) -> f64 {
        self.conservation_error() / self.total_entropy_released().max(f64::EPSILON)
    }

    /// Error no larger than `multiple` × total entropy processed.
    pub fn within_bound(&self, multiple: f64) -> bool {
        self.conservation_error() <= multiple * self.total_entropy_released()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Position in the engine's run sequence, from 0.
    pub cycle_number: u64,
    pub local: Vec<RewriteResult>,
    pub meta_initial: MetaMonadState,
    pub meta_final: MetaMonadState,
    pub meta_groups: Vec<MetaGroup>,
    pub harvest: HarvestResult,
    pub ledger: ConservationLedger,
    pub conservation_error: f64,
}

/// Rewrite mode for structure `index` under `policy`.
pub fn select_mode(index: usize, phases: &[f64], policy: ModePolicy) -> RewriteMode {
    match policy {
        ModePolicy::RoundRobin => RewriteMode::ALL[index % RewriteMode::ALL.len()],
        ModePolicy::ByCoherence => {
            let finite: Vec<f64> = phases.iter().copied().filter(|p| p.is_finite()).collect();
            let r = order_parameter(&finite);
            if r < SHED_BELOW_R {
                RewriteMode::Shed
            } else if r > ASSIMILATE_ABOVE_R {
                RewriteMode::Assimilate
            } else {
                RewriteMode::Reinstate
            }
        }
    }
}

/// Validated cycle runner with a bounded history of completed cycles.
#[derive(Debug)]
pub struct CycleEngine {
    config: CycleConfig,
    history: Mutex<CycleHistory>,
}

impl CycleEngine {
    pub fn new(config: CycleConfig) -> SgcResult<Self> {
        Self::with_history_window(config, DEFAULT_HISTORY_WINDOW)
    }

    pub fn with_history_window(config: CycleConfig, history_window: usize) -> SgcResult<Self> {
        config.validate()?;
        if history_window == 0 {
            return Err(SgcError::Config(
                "history_window must be >= 1".to_string(),
            ));
        }
        Ok(Self::unchecked(config, history_window))
    }

    fn unchecked(config: CycleConfig, history_window: usize) -> Self {
        Self {
            config,
            history: Mutex::new(CycleHistory::new(history_window)),
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    fn rewrite_one(&self, index: usize, phases: &[f64]) -> RewriteResult {
        let cfg = &self.config;
        let mode = select_mode(index, phases, cfg.mode_policy);
        let threshold = match mode {
            RewriteMode::Shed => cfg.dissonance_threshold,
            RewriteMode::Assimilate => cfg.resonance_threshold,
            RewriteMode::Reinstate => cfg.grace_flow_rate,
        };
        rewrite(mode, index, phases, threshold)
    }

    fn rewrite_all(&self, seeds: &[Vec<f64>]) -> Vec<RewriteResult> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            seeds
                .par_iter()
                .enumerate()
                .map(|(i, s)| self.rewrite_one(i, s))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            seeds
                .iter()
                .enumerate()
                .map(|(i, s)| self.rewrite_one(i, s))
                .collect()
        }
    }

    pub fn run(&self, seeds: &[Vec<f64>]) -> CycleReport {
        let cfg = &self.config;
        let local = self.rewrite_all(seeds);

        let n = local.len();
        let entropies: Vec<f64> = local.iter().map(|r| r.entropy_released).collect();
        let couplings: Vec<(usize, usize, f64)> = if n > 1 {
            (0..n).map(|i| (i, (i + 1) % n, cfg.coupling_strength)).collect()
        } else {
            Vec::new()
        };
        let meta_initial = MetaMonadState::create(&entropies, &couplings);
        let meta_final = meta_initial.evolve(cfg.dt, cfg.grace_damping);
        let dissipated = (meta_initial.total_entropy - meta_final.total_entropy).max(0.0);

        let groups = meta_groups(seeds, &entropies, cfg);

        let outputs: Vec<Vec<f64>> = local.iter().map(|r| r.phases.clone()).collect();
        let harvested = harvest(&outputs, cfg.alignment_threshold);

        let ledger = ConservationLedger {
            local_entropy: entropies.iter().sum(),
            local_grace: local.iter().map(|r| r.grace_accumulated).sum(),
            mid_entropy: dissipated,
            mid_grace: dissipated,
            harvest_entropy: harvested.entropy_compressed,
            harvest_grace: harvested.grace_yield,
        };
        let conservation_error = ledger.conservation_error();

        let mut history = self.history.lock();
        let cycle_number = history.next_cycle();

        log::info!(
            "SGC cycle {cycle_number}: {n} structures in {} meta-monads, S={:.4} G={:.4} \
             error={conservation_error:.4} (relative {:.3}), {} harmonics",
            groups.len(),
            ledger.total_entropy_released(),
            ledger.total_grace_accumulated(),
            ledger.relative_error(),
            harvested.compressed_harmonics,
        );

        let report = CycleReport {
            cycle_number,
            local,
            meta_initial,
            meta_final,
            meta_groups: groups,
            harvest: harvested,
            ledger,
            conservation_error,
        };
        history.record(CycleSummary::from_report(&report));
        report
    }

    /// Run on the spider phases of each graph, in node order.
    pub fn run_on_graphs(&self, graphs: &[Graph]) -> CycleReport {
        let seeds: Vec<Vec<f64>> = graphs.iter().map(Graph::phases_radians).collect();
        self.run(&seeds)
    }

    /// Recent cycle summaries, oldest first.
    pub fn history(&self) -> Vec<CycleSummary> {
        self.history.lock().summaries()
    }

    pub fn history_window(&self) -> usize {
        self.history.lock().window()
    }

    pub fn metrics(&self) -> SystemMetrics {
        self.history.lock().metrics()
    }

    /// Forget every recorded cycle; numbering restarts at 0.
    pub fn reset(&self) {
        self.history.lock().clear();
    }
}

/// Run one cycle with `config`. Out-of-range values are clamped by the
/// individual stages; use `CycleEngine::new` to reject them up front.
pub fn run_cycle(seeds: &[Vec<f64>], config: &CycleConfig) -> CycleReport {
    CycleEngine::unchecked(*config, 1).run(seeds)
}

pub fn run_cycle_on_graphs(graphs: &[Graph], config: &CycleConfig) -> CycleReport {
    CycleEngine::unchecked(*config, 1).run_on_graphs(graphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgc_graph::{NodeLabel, Phase};
    use std::f64::consts::{PI, TAU};

    fn golden_seeds(structures: usize, spiders: usize) -> Vec<Vec<f64>> {
        let phi = (1.0 + 5f64.sqrt()) / 2.0;
        (0..structures)
            .map(|s| {
                (0..spiders)
                    .map(|k| (((s * spiders + k) as f64 * phi).fract()) * TAU)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_cross_scale_conservation() {
        let report = run_cycle(&golden_seeds(8, 8), &CycleConfig::default());
        let ledger = report.ledger;
        let s = ledger.total_entropy_released();
        assert!(s > 0.0);
        assert!(ledger.within_bound(2.0), "error={} S={s}", report.conservation_error);
        assert!(report.conservation_error < 2.0 * s);
        assert!((report.conservation_error - ledger.conservation_error()).abs() < 1e-12);
        assert!((ledger.mid_entropy - ledger.mid_grace).abs() < 1e-12);
    }

    #[test]
    fn test_aligned_population_is_grace_dominated() {
        let seeds: Vec<Vec<f64>> = (0..8)
            .map(|s| (0..6).map(|k| 2.0 + 0.01 * k as f64 + 0.003 * s as f64).collect())
            .collect();
        let report = run_cycle(&seeds, &CycleConfig::default());
        let ledger = report.ledger;
        assert_eq!(report.harvest.compressed_harmonics, 1);
        assert!(ledger.local_grace > ledger.local_entropy);
        assert!(ledger.total_grace_accumulated() > ledger.total_entropy_released());
        assert!(!ledger.within_bound(2.0), "relative={}", ledger.relative_error());
    }

    #[test]
    fn test_round_robin_modes() {
        let report = run_cycle(&golden_seeds(6, 5), &CycleConfig::default());
        let modes: Vec<RewriteMode> = report.local.iter().map(|r| r.mode_used).collect();
        assert_eq!(
            modes,
            vec![
                RewriteMode::Shed,
                RewriteMode::Assimilate,
                RewriteMode::Reinstate,
                RewriteMode::Shed,
                RewriteMode::Assimilate,
                RewriteMode::Reinstate,
            ]
        );
        for (i, r) in report.local.iter().enumerate() {
            assert_eq!(r.structure_id, i);
            assert!(r.final_spider_count <= r.initial_spider_count);
        }
    }

    #[test]
    fn test_mid_scale_decays() {
        let report = run_cycle(&golden_seeds(6, 8), &CycleConfig::default());
        assert_eq!(report.meta_initial.sub_monad_count, 6);
        assert!(report.meta_final.bivector_norm() <= report.meta_initial.bivector_norm());
        assert!(report.meta_final.scalar_grace >= report.meta_initial.scalar_grace);
        assert!(report.meta_final.total_entropy <= report.meta_initial.total_entropy);
        assert!((report.meta_initial.resonance_coupling - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_cycle() {
        let report = run_cycle(&[], &CycleConfig::default());
        assert!(report.local.is_empty());
        assert_eq!(report.ledger, ConservationLedger::default());
        assert_eq!(report.conservation_error, 0.0);
        assert_eq!(report.harvest.compression_ratio, 1.0);
        assert!(report.ledger.within_bound(2.0));
    }

    #[test]
    fn test_by_coherence_policy() {
        let tight = vec![1.0, 1.02, 0.98, 1.01];
        let spread: Vec<f64> = (0..4).map(|k| k as f64 * PI / 2.0).collect();
        let half = vec![0.0, 0.0, PI / 2.0, PI];
        assert_eq!(select_mode(0, &tight, ModePolicy::ByCoherence), RewriteMode::Assimilate);
        assert_eq!(select_mode(0, &spread, ModePolicy::ByCoherence), RewriteMode::Shed);
        // R = |(1+1+i-1)/4| = √2/4 ≈ 0.35
        assert_eq!(select_mode(0, &half, ModePolicy::ByCoherence), RewriteMode::Reinstate);
        assert_eq!(select_mode(4, &tight, ModePolicy::RoundRobin), RewriteMode::Assimilate);
    }

    #[test]
    fn test_non_finite_phases_are_dropped_not_fatal() {
        let seeds = vec![
            vec![0.1, f64::NAN, 0.12, 0.11],
            vec![1.0, f64::INFINITY, 1.05],
            vec![f64::NEG_INFINITY, 2.0, 2.0],
        ];
        let report = run_cycle(&seeds, &CycleConfig::default());
        assert_eq!(report.local[0].initial_spider_count, 3);
        assert_eq!(report.local[1].initial_spider_count, 2);
        assert_eq!(report.local[2].initial_spider_count, 2);
        assert!(report.conservation_error.is_finite());
        assert!(report.local.iter().all(|r| r.phases.iter().all(|p| p.is_finite())));
    }

    #[test]
    fn test_report_serializes() {
        let report = run_cycle(&golden_seeds(3, 4), &CycleConfig::default());
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["local"].as_array().unwrap().len(), 3);
        assert_eq!(v["local"][0]["mode_used"], "shed");
        assert_eq!(v["meta_final"]["bivector"].as_array().unwrap().len(), 6);
        assert!(v["ledger"]["local_entropy"].is_number());
    }

    #[test]
    fn test_engine_rejects_bad_config() {
        let cfg = CycleConfig {
            dt: 0.0,
            ..CycleConfig::default()
        };
        assert!(CycleEngine::new(cfg).is_err());
        assert!(CycleEngine::new(CycleConfig::default()).is_ok());
        assert!(CycleEngine::with_history_window(CycleConfig::default(), 0).is_err());
    }

    #[test]
    fn test_engine_history_and_metrics() {
        let engine = CycleEngine::with_history_window(CycleConfig::default(), 2).unwrap();
        assert_eq!(engine.metrics(), SystemMetrics::default());

        let reports: Vec<CycleReport> = (0..3)
            .map(|i| engine.run(&golden_seeds(6 + i, 6)))
            .collect();
        let numbers: Vec<u64> = reports.iter().map(|r| r.cycle_number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);

        let history = engine.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].cycle_number, 1);
        assert_eq!(history[1].structures, 8);
        assert_eq!(history[1].meta_groups, reports[2].meta_groups.len());

        let m = engine.metrics();
        assert_eq!(m.cycles_completed, 3);
        assert_eq!(m.cycles_in_window, 2);
        let mean_ratio = (reports[1].harvest.compression_ratio
            + reports[2].harvest.compression_ratio)
            / 2.0;
        assert!((m.compression_efficiency - mean_ratio).abs() < 1e-12);
        assert!(m.avg_meta_groups >= 1.0);
        assert!(m.avg_meta_stability > 0.0 && m.avg_meta_stability <= 1.0);

        engine.reset();
        assert!(engine.history().is_empty());
        assert_eq!(engine.run(&golden_seeds(2, 3)).cycle_number, 0);
    }

    #[test]
    fn test_meta_groups_cover_every_structure() {
        let report = run_cycle(&golden_seeds(8, 8), &CycleConfig::default());
        let mut members: Vec<usize> = report
            .meta_groups
            .iter()
            .flat_map(|g| g.members.iter().copied())
            .collect();
        members.sort_unstable();
        assert_eq!(members, (0..8).collect::<Vec<_>>());
        for g in &report.meta_groups {
            assert_eq!(g.state.sub_monad_count, g.members.len());
        }
    }

    #[test]
    fn test_run_on_graphs() {
        let labelled = (0..4u32)
            .map(|i| (i, NodeLabel::z(Phase::new(i64::from(i), 4).unwrap())))
            .collect();
        let g = Graph::from_parts(labelled, vec![(0, 1), (1, 2), (2, 3)]).unwrap();
        let engine = CycleEngine::new(CycleConfig::default()).unwrap();
        let report = engine.run_on_graphs(&[g.clone(), g]);
        assert_eq!(report.local.len(), 2);
        assert_eq!(report.local[0].initial_spider_count, 4);
        // phases 0, π/4, π/2, 3π/4: shed keeps the π/4-wide consensus
        assert!(report.local[0].final_spider_count < 4);
    }

    mod props {
        use std::f64::consts::TAU;

        use proptest::prelude::*;

        use super::super::*;

        fn seed_sets() -> impl Strategy<Value = Vec<Vec<f64>>> {
            (8usize..17, 6usize..13).prop_flat_map(|(structures, spiders)| {
                prop::collection::vec(prop::collection::vec(0.0f64..TAU, spiders), structures)
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_conservation_on_uniform_phases(seeds in seed_sets()) {
                let report = run_cycle(&seeds, &CycleConfig::default());
                let ledger = report.ledger;
                prop_assert!(ledger.total_entropy_released() > 0.0);
                prop_assert!(
                    ledger.within_bound(2.0),
                    "error={} S={}",
                    report.conservation_error,
                    ledger.total_entropy_released()
                );
            }
        }
    }
}
