// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Cycle History and System Metrics
// ─────────────────────────────────────────────────────────────────────
//! Bounded record of completed cycles and the averages reported over it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::cycle::CycleReport;

/// Flat per-cycle summary kept in the engine history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_number: u64,
    pub structures: usize,
    pub meta_groups: usize,
    pub entropy_released: f64,
    pub grace_accumulated: f64,
    pub relative_error: f64,
    pub compression_ratio: f64,
    /// Mean stability of the meta-monad groups; the population
    /// aggregate's stability when there are none.
    pub meta_stability: f64,
}

impl CycleSummary {
    pub fn from_report(report: &CycleReport) -> Self {
        let meta_stability = if report.meta_groups.is_empty() {
            report.meta_final.stability()
        } else {
            report
                .meta_groups
                .iter()
                .map(|g| g.state.stability())
                .sum::<f64>()
                / report.meta_groups.len() as f64
        };
        Self {
            cycle_number: report.cycle_number,
            structures: report.local.len(),
            meta_groups: report.meta_groups.len(),
            entropy_released: report.ledger.total_entropy_released(),
            grace_accumulated: report.ledger.total_grace_accumulated(),
            relative_error: report.ledger.relative_error(),
            compression_ratio: report.harvest.compression_ratio,
            meta_stability,
        }
    }
}

/// Averages over the cycles still inside the history window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Cycles run since construction or the last reset.
    pub cycles_completed: u64,
    /// Cycles the averages below are taken over.
    pub cycles_in_window: usize,
    /// Mean harvest compression ratio.
    pub compression_efficiency: f64,
    pub avg_relative_error: f64,
    pub avg_meta_groups: f64,
    pub avg_meta_stability: f64,
}

#[derive(Debug)]
pub(crate) struct CycleHistory {
    window: usize,
    completed: u64,
    recent: VecDeque<CycleSummary>,
}

impl CycleHistory {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            window,
            completed: 0,
            recent: VecDeque::with_capacity(window),
        }
    }

    pub(crate) fn window(&self) -> usize {
        self.window
    }

    /// Number the next recorded cycle will carry.
    pub(crate) fn next_cycle(&self) -> u64 {
        self.completed
    }

    pub(crate) fn record(&mut self, summary: CycleSummary) {
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(summary);
        self.completed += 1;
    }

    pub(crate) fn summaries(&self) -> Vec<CycleSummary> {
        self.recent.iter().copied().collect()
    }

    pub(crate) fn metrics(&self) -> SystemMetrics {
        let n = self.recent.len();
        if n == 0 {
            return SystemMetrics {
                cycles_completed: self.completed,
                ..SystemMetrics::default()
            };
        }
        let mean = |f: fn(&CycleSummary) -> f64| self.recent.iter().map(f).sum::<f64>() / n as f64;
        SystemMetrics {
            cycles_completed: self.completed,
            cycles_in_window: n,
            compression_efficiency: mean(|s| s.compression_ratio),
            avg_relative_error: mean(|s| s.relative_error),
            avg_meta_groups: mean(|s| s.meta_groups as f64),
            avg_meta_stability: mean(|s| s.meta_stability),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.completed = 0;
        self.recent.clear();
    }
}
