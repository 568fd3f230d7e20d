//! Completed-item index - finished derivations bucketed by start position
//!
//! Bucket `start` lists every `(rule, end)` such that the chart recognized the
//! whole right-hand side of `rule` over the span `[start, end)`. The forest
//! extractor only ever asks "which completed derivations begin here?", so the
//! index is built once from a finished chart and never changes afterwards.

use crate::chart::Chart;
use crate::grammar::Grammar;

/// A rule recognized over `[start, end)`, where `start` is the bucket index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Completed {
    pub rule: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct CompletedIndex {
    buckets: Vec<Vec<Completed>>,
}

impl CompletedIndex {
    /// Transpose the completed items of `chart`.
    ///
    /// Within a bucket, entries appear in order of increasing `end`, then in
    /// discovery order inside each state set.
    pub fn from_chart(chart: &Chart, grammar: &Grammar) -> Self {
        let mut buckets: Vec<Vec<Completed>> = vec![Vec::new(); chart.sets().len()];

        for (end, set) in chart.sets().iter().enumerate() {
            for item in set.items().iter().filter(|it| it.is_complete(grammar)) {
                buckets[item.start].push(Completed {
                    rule: item.rule,
                    end,
                });
            }
        }

        CompletedIndex { buckets }
    }

    /// Completed derivations beginning at `start` (empty past the input end)
    pub fn at(&self, start: usize) -> &[Completed] {
        self.buckets.get(start).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of buckets, i.e. input length + 1
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}
