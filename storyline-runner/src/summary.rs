// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only summaries of a set of outcomes, for reporting tools.

use crate::store::OutcomeSnapshot;
use std::{collections::BTreeMap, time::Duration};
use storyline_report::{ResultKind, ScenarioId, TestOutcome, aggregate::aggregate};

/// A summary of a set of outcomes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunSummary {
    counts: BTreeMap<ResultKind, usize>,
    scenarios: Vec<ScenarioSummary>,
    total_time: Duration,
}

/// A summary of one scenario within a [`RunSummary`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScenarioSummary {
    /// The scenario.
    pub id: ScenarioId,

    /// The scenario result.
    pub result: ResultKind,

    /// The number of steps at every nesting level.
    pub nested_step_count: usize,

    /// The descriptions of the top-level steps, in order.
    pub step_descriptions: Vec<String>,
}

impl RunSummary {
    /// Summarizes every outcome in the snapshot.
    pub fn from_snapshot(snapshot: &OutcomeSnapshot) -> Self {
        Self::from_outcomes(snapshot.iter().map(|outcome| outcome.as_ref()))
    }

    /// Summarizes the given outcomes, keeping their order.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a TestOutcome>) -> Self {
        let mut counts = BTreeMap::new();
        let mut scenarios = Vec::new();
        let mut total_time = Duration::ZERO;

        for outcome in outcomes {
            let result = outcome.result();
            *counts.entry(result).or_default() += 1;
            total_time += outcome.time().unwrap_or_default();
            scenarios.push(ScenarioSummary {
                id: outcome.id().clone(),
                result,
                nested_step_count: outcome.nested_step_count(),
                step_descriptions: outcome
                    .step_descriptions()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            });
        }

        Self {
            counts,
            scenarios,
            total_time,
        }
    }

    /// The number of scenarios summarized.
    pub fn total(&self) -> usize {
        self.scenarios.len()
    }

    /// The number of scenarios with the given result.
    pub fn count(&self, result: ResultKind) -> usize {
        self.counts.get(&result).copied().unwrap_or(0)
    }

    /// The number of scenarios for each result that occurs at least once, in severity order.
    pub fn counts(&self) -> &BTreeMap<ResultKind, usize> {
        &self.counts
    }

    /// The most severe result across every scenario, or success if there are none.
    pub fn verdict(&self) -> ResultKind {
        aggregate(self.counts.keys().copied())
    }

    /// Returns true if no scenario has a failing result.
    pub fn is_passing(&self) -> bool {
        !self.verdict().is_failing()
    }

    /// Per-scenario summaries, in input order.
    pub fn scenarios(&self) -> &[ScenarioSummary] {
        &self.scenarios
    }

    /// Returns the summary for the first scenario called `name`.
    pub fn scenario(&self, name: &str) -> Option<&ScenarioSummary> {
        self.scenarios.iter().find(|scenario| scenario.id.name == name)
    }

    /// The sum of the recorded scenario times.
    pub fn total_time(&self) -> Duration {
        self.total_time
    }
}
