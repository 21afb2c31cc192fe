//! Reduction of judged rows into per-criterion pass rates.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::judge::{EvaluatorResult, OutputItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub passed: u64,
    pub total: u64,
}

impl Tally {
    fn record(mut self, passed: bool) -> Self {
        self.total += 1;
        if passed {
            self.passed += 1;
        }
        self
    }

    /// `passed / total`; a tally only exists once a result was recorded, so `total > 0`.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

/// Criterion name to pass rate. Iteration order is lexicographic by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassRateSummary {
    tallies: BTreeMap<String, Tally>,
}

impl PassRateSummary {
    pub fn rate(&self, name: &str) -> Option<f64> {
        self.tallies.get(name).map(Tally::rate)
    }

    pub fn tally(&self, name: &str) -> Option<Tally> {
        self.tallies.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.tallies
            .iter()
            .map(|(name, tally)| (name.as_str(), tally.rate()))
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Build directly from known counts.
    pub fn from_tallies<I>(tallies: I) -> Self
    where
        I: IntoIterator<Item = (String, Tally)>,
    {
        Self {
            tallies: tallies.into_iter().collect(),
        }
    }

    pub fn rates(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

impl Serialize for PassRateSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rates().serialize(serializer)
    }
}

/// Count passed/total per criterion name across every row.
///
/// Pure: the result depends only on the multiset of results, not on row order.
pub fn aggregate<'a, I>(items: I) -> PassRateSummary
where
    I: IntoIterator<Item = &'a OutputItem>,
{
    let tallies = items
        .into_iter()
        .flat_map(|item| item.results.iter())
        .fold(
            BTreeMap::<String, Tally>::new(),
            |mut acc, EvaluatorResult { name, passed }| {
                let tally = acc.entry(name.clone()).or_default();
                *tally = tally.record(*passed);
                acc
            },
        );
    PassRateSummary { tallies }
}
