//! Static table of retrievers and the regions they cover.
//!
//! The aggregator and the response `source` label both read from the same
//! table, so the label always names exactly the retrievers that were asked.

use std::sync::Arc;

use pricecomp_core::{Coverage, Region, Retriever};

struct Entry {
    coverage: Coverage,
    retriever: Arc<dyn Retriever>,
}

/// Registered retrievers in registration order.
#[derive(Default)]
pub struct SourceTable {
    entries: Vec<Entry>,
}

impl SourceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a retriever consulted for every region.
    #[must_use]
    pub fn global(self, retriever: Arc<dyn Retriever>) -> Self {
        self.register(Coverage::Global, retriever)
    }

    /// Adds a retriever consulted only for `regions`.
    #[must_use]
    pub fn regional<I, S>(self, regions: I, retriever: Arc<dyn Retriever>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.register(Coverage::regions(regions), retriever)
    }

    #[must_use]
    pub fn register(mut self, coverage: Coverage, retriever: Arc<dyn Retriever>) -> Self {
        self.entries.push(Entry {
            coverage,
            retriever,
        });
        self
    }

    /// Retrievers applicable to `region`: all global ones, then the
    /// region-gated ones whose coverage includes it.
    #[must_use]
    pub fn for_region(&self, region: &Region) -> Vec<Arc<dyn Retriever>> {
        let global = self
            .entries
            .iter()
            .filter(|e| matches!(e.coverage, Coverage::Global));
        let regional = self
            .entries
            .iter()
            .filter(|e| matches!(e.coverage, Coverage::Regions(_)) && e.coverage.includes(region));
        global
            .chain(regional)
            .map(|e| Arc::clone(&e.retriever))
            .collect()
    }

    /// Human-readable list of the sources consulted for `region`,
    /// e.g. `"Amazon, eBay, Flipkart"`.
    #[must_use]
    pub fn source_label(&self, region: &Region) -> String {
        self.for_region(region)
            .iter()
            .map(|r| r.name().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Every registered retriever name with the regions it covers.
    /// `None` means global.
    #[must_use]
    pub fn describe(&self) -> Vec<(String, Option<Vec<Region>>)> {
        self.entries
            .iter()
            .map(|e| {
                let regions = match &e.coverage {
                    Coverage::Global => None,
                    Coverage::Regions(regions) => Some(regions.clone()),
                };
                (e.retriever.name().to_string(), regions)
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for SourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| (e.retriever.name(), &e.coverage)),
            )
            .finish()
    }
}
