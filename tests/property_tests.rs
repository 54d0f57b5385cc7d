//! Property-based tests for graph ordering and data cells

mod common;

use proptest::prelude::*;
use sensorchain::process::processes::LinearTransformProcess;
use sensorchain::process::DataCell;
use sensorchain::{ChainError, CompositeProcess, Record};

/// Ring of `n` linear components, plus a tail hanging off the ring.
fn ring_links(n: usize) -> Vec<(String, String)> {
    let mut links: Vec<(String, String)> = (0..n)
        .map(|i| (format!("n{}/value", i), format!("n{}/value", (i + 1) % n)))
        .collect();
    links.push((format!("n{}/value", n - 1), "tail/value".to_string()));
    links
}

proptest! {
    #[test]
    fn prop_cycle_detected_in_any_link_order(
        (n, order) in (1usize..7).prop_flat_map(|n| {
            (Just(n), Just((0..=n).collect::<Vec<usize>>()).prop_shuffle())
        })
    ) {
        let links = ring_links(n);
        let mut chain = CompositeProcess::new("ring");
        for i in 0..n {
            chain.add_component(format!("n{}", i), LinearTransformProcess::new()).unwrap();
        }
        chain.add_component("tail", LinearTransformProcess::new()).unwrap();
        for &index in &order {
            let (source, dest) = &links[index];
            chain.add_connection(source.as_str(), dest.as_str()).unwrap();
        }

        let err = chain.init().unwrap_err();
        prop_assert!(matches!(err, ChainError::CyclicGraph { .. }), "got {}", err);
        prop_assert!(!err.to_string().contains("tail"));
    }

    #[test]
    fn prop_acyclic_chain_runs_in_link_order(order in Just((0..5).collect::<Vec<usize>>()).prop_shuffle()) {
        // n0 -> n1 -> ... -> n5, each adding one.
        let mut chain = CompositeProcess::new("line");
        for i in 0..6 {
            chain.add_component(format!("n{}", i), LinearTransformProcess::with_coefficients(1.0, 1.0)).unwrap();
        }
        for &i in &order {
            chain.add_connection(format!("n{}/value", i), format!("n{}/value", i + 1)).unwrap();
        }
        chain.init().unwrap();
        chain.set_input("n0/value", Record::quantity(0.0)).unwrap();
        chain.execute().unwrap();
        prop_assert_eq!(
            chain.component_output("n5/value").unwrap().latest_record(),
            Some(Record::quantity(6.0))
        );
    }

    #[test]
    fn prop_cell_holds_last_publish(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..32)) {
        let cell = DataCell::new();
        let mut last_generation = cell.generation();
        for (i, v) in values.iter().enumerate() {
            cell.publish(Record::quantity(*v), i as i64);
            prop_assert!(cell.generation() > last_generation);
            last_generation = cell.generation();
        }
        prop_assert_eq!(cell.read(), values.last().map(|v| Record::quantity(*v)));
        prop_assert_eq!(cell.time_millis(), values.len() as i64 - 1);
    }
}
