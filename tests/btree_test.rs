//! Black-box scenario tests covering spec section 8's end-to-end
//! scenarios for insert/search/range_query.

use pg_btree_compress::PostgreSQLBTree;

mod common;

#[test]
fn duplicate_keys_scenario() {
    common::setup();
    let mut tree: PostgreSQLBTree<String, String> = PostgreSQLBTree::new(256, true).unwrap();
    tree.insert("user_001".to_string(), "A".to_string());
    tree.insert("user_002".to_string(), "B".to_string());
    tree.insert("user_001".to_string(), "C".to_string());

    let values = tree.search(&"user_001".to_string()).unwrap();
    assert_eq!(values, vec!["A".to_string(), "C".to_string()]);
    assert_eq!(tree.len(), 3);
}

#[test]
fn range_scan_across_leaves_order_four() {
    common::setup();
    let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
    for i in 1..=20 {
        tree.insert(i, i);
    }
    let results: Vec<(i64, i64)> = tree.range_query(5, 10, true).unwrap().collect();
    assert_eq!(results, (5..=10).map(|i| (i, i)).collect::<Vec<_>>());
}

#[test]
fn range_with_equal_start_and_end_returns_all_values_for_that_key() {
    common::setup();
    let mut tree: PostgreSQLBTree<i64, String> = PostgreSQLBTree::new(8, false).unwrap();
    tree.insert(5, "a".to_string());
    tree.insert(5, "b".to_string());
    tree.insert(6, "c".to_string());

    let results: Vec<(i64, String)> = tree.range_query(5, 5, true).unwrap().collect();
    assert_eq!(results.len(), 2);

    let excluded: Vec<(i64, String)> = tree.range_query(5, 5, false).unwrap().collect();
    assert!(excluded.is_empty());
}

#[test]
fn in_order_traversal_is_non_decreasing_after_random_inserts() {
    common::setup();
    let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(8, false).unwrap();
    let mut rng_state: u64 = 0x1234_5678_9abc_def0;
    let mut next = || {
        rng_state ^= rng_state << 13;
        rng_state ^= rng_state >> 7;
        rng_state ^= rng_state << 17;
        (rng_state % 500) as i64
    };
    for _ in 0..300 {
        let k = next();
        tree.insert(k, k);
    }

    let traversal: Vec<(i64, i64)> = tree.range_query(i64::MIN, i64::MAX, true).unwrap().collect();
    assert!(traversal.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(traversal.len(), 300);
}

#[test]
fn order_four_exercises_splits_on_small_trees() {
    common::setup();
    let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
    for i in 1..=50 {
        tree.insert(i, i);
    }
    let stats = tree.get_statistics();
    assert!(stats.height >= 2, "order-4 tree with 50 keys should not stay flat");
    assert_eq!(stats.total_keys, 50);

    let traversal: Vec<(i64, i64)> = tree.range_query(i64::MIN, i64::MAX, true).unwrap().collect();
    assert_eq!(traversal, (1..=50).map(|i| (i, i)).collect::<Vec<_>>());
}

#[test]
fn search_on_empty_tree_returns_empty_sequence() {
    common::setup();
    let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(16, false).unwrap();
    assert!(tree.search(&42).unwrap().is_empty());
}

#[test]
fn construction_rejects_order_below_four() {
    common::setup();
    let result: Result<PostgreSQLBTree<i64, i64>, _> = PostgreSQLBTree::new(3, false);
    assert!(result.is_err());
}

#[test]
fn randomized_insert_order_still_yields_sorted_traversal() {
    common::setup();
    use rand::seq::SliceRandom;

    let mut keys: Vec<i64> = (0..500).collect();
    keys.shuffle(&mut rand::thread_rng());

    let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(8, false).unwrap();
    for &k in &keys {
        tree.insert(k, k * 2);
    }

    let traversal: Vec<(i64, i64)> = tree.range_query(i64::MIN, i64::MAX, true).unwrap().collect();
    assert_eq!(traversal, (0..500).map(|i| (i, i * 2)).collect::<Vec<_>>());
}
