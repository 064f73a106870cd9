use std::cell::Cell;

use proptest::prelude::*;
use twine_acceptance_core::graph::parse_ntriples;
use twine_acceptance_core::test_support::PageBuilder;
use twine_acceptance_core::vocab::RELEVANT_TYPE_IRIS;
use twine_acceptance_core::{
    CatalogPage, EntityCounter, HarnessError, Operation, PageSource, PageWindow, Vocabulary,
};

const BASE: &str = "http://quilt/everything.nt";
const MAX_PAGES: usize = 12;
const MAX_PER_PAGE: usize = 20;

/// Page `i` (offset `i * limit`) holds `relevant[i]` relevant and
/// `noise[i]` irrelevant type statements; every page but the last links on.
struct SyntheticCatalog {
    limit: u64,
    relevant: Vec<usize>,
    noise: Vec<usize>,
    fetches: Cell<usize>,
}

impl PageSource for SyntheticCatalog {
    fn fetch_page(&self, base: &str, window: PageWindow) -> twine_acceptance_core::Result<CatalogPage> {
        self.fetches.set(self.fetches.get() + 1);
        let index = (window.offset / self.limit) as usize;
        if window.limit != self.limit || window.offset % self.limit != 0 || index >= self.relevant.len() {
            return Err(HarnessError::Protocol {
                operation: Operation::FetchPage,
                uri: base.to_string(),
                status: 404,
                body: String::new(),
            });
        }

        let mut page = PageBuilder::new();
        for n in 0..self.relevant[index] {
            let ty = RELEVANT_TYPE_IRIS[n % RELEVANT_TYPE_IRIS.len()];
            page = page.typed(&format!("http://quilt/p{index}/e{n}#id"), ty);
        }
        for n in 0..self.noise[index] {
            page = page.typed(
                &format!("http://quilt/p{index}/x{n}#id"),
                "http://xmlns.com/foaf/0.1/Organization",
            );
        }
        if index + 1 < self.relevant.len() {
            page = page.next(BASE);
        }

        Ok(CatalogPage {
            offset: window.offset,
            limit: window.limit,
            statements: parse_ntriples(page.build().as_bytes()).expect("synthetic page parses"),
        })
    }
}

fn catalog_strategy() -> impl Strategy<Value = (u64, Vec<usize>, Vec<usize>)> {
    (1usize..=MAX_PAGES, 1u64..=250).prop_flat_map(|(pages, limit)| {
        (
            Just(limit),
            prop::collection::vec(0usize..=MAX_PER_PAGE, pages),
            prop::collection::vec(0usize..=MAX_PER_PAGE, pages),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn total_is_the_sum_of_relevant_statements_over_all_pages((limit, relevant, noise) in catalog_strategy()) {
        let catalog = SyntheticCatalog {
            limit,
            relevant: relevant.clone(),
            noise,
            fetches: Cell::new(0),
        };
        let counter = EntityCounter::new(&catalog, Vocabulary::default());

        let total = counter.count_entities_from(BASE, 0, limit).expect("traversal succeeds");

        prop_assert_eq!(total, relevant.iter().sum::<usize>() as u64);
        prop_assert_eq!(catalog.fetches.get(), relevant.len());
    }

    #[test]
    fn uniform_pages_count_k_times_e(pages in 1usize..=MAX_PAGES, per_page in 0usize..=MAX_PER_PAGE) {
        let catalog = SyntheticCatalog {
            limit: 100,
            relevant: vec![per_page; pages],
            noise: vec![3; pages],
            fetches: Cell::new(0),
        };
        let counter = EntityCounter::new(&catalog, Vocabulary::default());

        prop_assert_eq!(counter.count_entities(BASE).expect("count"), (pages * per_page) as u64);
    }
}
