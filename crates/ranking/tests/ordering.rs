use core_types::DriverRankingEntry;
use proptest::prelude::*;
use ranking::compare_entries;
use std::cmp::Ordering;
use std::collections::BTreeSet;

fn entry() -> impl Strategy<Value = DriverRankingEntry> {
    (
        "[A-E]",
        prop::sample::select(vec![-1.0f64, -0.0, 0.0, 0.5, 1.0]),
        prop::collection::btree_set(1990i32..1995, 1..4),
    )
        .prop_map(|(driver_id, score, seasons): (String, f64, BTreeSet<i32>)| DriverRankingEntry {
            driver_id,
            aggregate_score: score,
            low_confidence: seasons.len() == 1,
            seasons_considered: seasons,
            rank: 0,
            model_score: score,
            ground_truth: None,
        })
}

proptest! {
    #[test]
    fn comparison_is_antisymmetric_and_transitive(
        a in entry(),
        b in entry(),
        c in entry(),
    ) {
        prop_assert_eq!(compare_entries(&a, &b), compare_entries(&b, &a).reverse());
        if compare_entries(&a, &b) != Ordering::Greater && compare_entries(&b, &c) != Ordering::Greater {
            prop_assert_ne!(compare_entries(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn sorted_output_respects_the_tie_break_rule(mut entries in prop::collection::vec(entry(), 0..12)) {
        entries.sort_by(compare_entries);
        for pair in entries.windows(2) {
            let (x, y) = (&pair[0], &pair[1]);
            prop_assert!(x.aggregate_score >= y.aggregate_score);
            if x.aggregate_score == y.aggregate_score {
                prop_assert!(x.seasons_considered.len() >= y.seasons_considered.len());
                if x.seasons_considered.len() == y.seasons_considered.len() {
                    prop_assert!(x.driver_id <= y.driver_id);
                }
            }
        }
    }
}
