//! The end-to-end acceptance scenario.
//!
//! Ingest a fixture, re-process, count everything, then require every named
//! collection to hold as many relevant entities as the whole dataset (or at
//! most as many, with `allow_subset`).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use twine_acceptance_core::{inspect_fixture, Harness};

#[derive(Debug, Clone)]
pub(crate) struct CheckPlan {
    pub fixture: PathBuf,
    pub collections: Vec<String>,
    pub allow_subset: bool,
    /// Also require the dataset count to equal the fixture's relevant statements.
    pub compare_fixture: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CollectionCheck {
    pub collection: String,
    pub location: String,
    pub catalog_uri: String,
    pub count: u64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CheckReport {
    pub fixture: String,
    pub fixture_relevant: u64,
    pub everything_uri: String,
    pub everything: u64,
    pub fixture_matches: Option<bool>,
    pub collections: Vec<CollectionCheck>,
}

impl CheckReport {
    pub(crate) fn passed(&self) -> bool {
        self.fixture_matches.unwrap_or(true) && self.collections.iter().all(|c| c.passed)
    }
}

/// `m == n`, or `m <= n` when the collection may be a strict subset.
pub(crate) fn collection_passes(collection: u64, everything: u64, allow_subset: bool) -> bool {
    if allow_subset {
        collection <= everything
    } else {
        collection == everything
    }
}

/// Runs every step; transport and protocol failures abort, count mismatches
/// are recorded in the report.
pub(crate) fn run_check(harness: &Harness, plan: &CheckPlan) -> Result<CheckReport> {
    let document = std::fs::read(&plan.fixture)
        .with_context(|| format!("failed to read fixture {}", plan.fixture.display()))?;
    let summary = inspect_fixture(&document, harness.vocabulary())
        .with_context(|| format!("fixture {}", plan.fixture.display()))?;
    if summary.statements == 0 {
        bail!("fixture {} holds no statements", plan.fixture.display());
    }

    harness.ingest(&document).context("ingest step")?;
    harness.reprocess_all().context("update step")?;

    let everything_uri = harness.everything_uri();
    let everything = harness
        .count_entities(&everything_uri)
        .with_context(|| format!("counting {everything_uri}"))?;
    tracing::info!(everything, fixture_relevant = summary.relevant, "dataset counted");

    let mut collections = Vec::with_capacity(plan.collections.len());
    for collection in &plan.collections {
        let location = harness
            .resolve_collection(collection)
            .with_context(|| format!("resolving collection {collection}"))?;
        let catalog_uri = harness.collection_uri(&location);
        let count = harness
            .count_entities(&catalog_uri)
            .with_context(|| format!("counting {catalog_uri}"))?;
        collections.push(CollectionCheck {
            collection: collection.clone(),
            location: location.to_string(),
            catalog_uri,
            count,
            passed: collection_passes(count, everything, plan.allow_subset),
        });
    }

    Ok(CheckReport {
        fixture: plan.fixture.display().to_string(),
        fixture_relevant: summary.relevant,
        everything_uri,
        everything,
        fixture_matches: plan.compare_fixture.then_some(everything == summary.relevant),
        collections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_mode_requires_equal_counts() {
        assert!(collection_passes(2, 2, false));
        assert!(!collection_passes(1, 2, false));
        assert!(!collection_passes(3, 2, false));
    }

    #[test]
    fn subset_mode_allows_smaller_collections() {
        assert!(collection_passes(0, 2, true));
        assert!(collection_passes(2, 2, true));
        assert!(!collection_passes(3, 2, true));
    }

    #[test]
    fn report_fails_on_any_failed_collection_or_fixture_mismatch() {
        let check = |passed| CollectionCheck {
            collection: "urn:c".to_string(),
            location: "/collections/C".to_string(),
            catalog_uri: "http://quilt/collections/C.nt".to_string(),
            count: 1,
            passed,
        };
        let mut report = CheckReport {
            fixture: "fixture.nq".to_string(),
            fixture_relevant: 2,
            everything_uri: "http://quilt/everything.nt".to_string(),
            everything: 2,
            fixture_matches: None,
            collections: vec![check(true)],
        };
        assert!(report.passed());

        report.fixture_matches = Some(false);
        assert!(!report.passed());

        report.fixture_matches = Some(true);
        report.collections.push(check(false));
        assert!(!report.passed());
    }
}
