//! Property-based tests for fieldtree-reactive using proptest.

use fieldtree_reactive::{Label, MatchPolicy, Packet, Sensor, Value};
use proptest::prelude::*;
use std::collections::BTreeMap;

const OBJECTS: [&str; 4] = ["a", "b", "c", "d"];
const LABELS: [&str; 3] = ["x", "y", "z"];

fn write_strategy() -> impl Strategy<Value = (usize, usize, i64)> {
    (0..OBJECTS.len(), 0..LABELS.len(), 0i64..4)
}

fn packet() -> Packet {
    let mut packet = Packet::new();
    for name in OBJECTS {
        packet.create_object(name).unwrap();
    }
    packet
}

proptest! {
    /// After any sequence of write batches and commits, the index answers
    /// every (label, value) query exactly as the committed state does.
    #[test]
    fn index_matches_committed_state(
        batches in prop::collection::vec(prop::collection::vec(write_strategy(), 0..10), 1..8)
    ) {
        let mut packet = packet();
        let mut committed: BTreeMap<(usize, usize), i64> = BTreeMap::new();

        for batch in batches {
            for (object, label, value) in batch {
                packet.object(OBJECTS[object]).unwrap().set(LABELS[label], value).unwrap();
                committed.insert((object, label), value);
            }
            packet.commit();

            for (l, label) in LABELS.iter().enumerate() {
                for value in 0i64..4 {
                    let expected: Vec<String> = committed
                        .iter()
                        .filter(|((_, cl), cv)| *cl == l && **cv == value)
                        .map(|((o, _), _)| OBJECTS[*o].to_string())
                        .collect();
                    let actual: Vec<String> = packet
                        .lookup(&Label::from(*label), &Value::Int(value))
                        .into_iter()
                        .collect();
                    prop_assert_eq!(actual, expected);
                }
            }
        }
    }

    /// A second commit without writes is always empty.
    #[test]
    fn commit_is_idempotent(batch in prop::collection::vec(write_strategy(), 0..20)) {
        let mut packet = packet();
        for (object, label, value) in &batch {
            packet.object(OBJECTS[*object]).unwrap().set(LABELS[*label], *value).unwrap();
        }
        let first = packet.commit();
        prop_assert_eq!(first.is_empty(), batch.is_empty());
        prop_assert!(packet.commit().is_empty());
    }

    /// Under the default policy a sensor fires exactly when every pattern is
    /// matched by some changed object.
    #[test]
    fn all_patterns_policy(batch in prop::collection::vec(write_strategy(), 0..12)) {
        let mut packet = packet();
        let mut sensor = Sensor::new("xy").with_policy(MatchPolicy::AllPatterns);
        sensor.add_pattern(|c| c.has(&Label::from("x"), &Value::Int(0)));
        sensor.add_pattern(|c| c.has(&Label::from("y"), &Value::Int(0)));
        let id = packet.add_sensor(sensor);

        let mut latest: BTreeMap<(usize, usize), i64> = BTreeMap::new();
        for (object, label, value) in &batch {
            packet.object(OBJECTS[*object]).unwrap().set(LABELS[*label], *value).unwrap();
            latest.insert((*object, *label), *value);
        }
        packet.commit();

        let x_hit = latest.iter().any(|((_, l), v)| *l == 0 && *v == 0);
        let y_hit = latest.iter().any(|((_, l), v)| *l == 1 && *v == 0);
        let fired = packet.sensor(id).unwrap().notifications().len();
        prop_assert_eq!(fired, usize::from(x_hit && y_hit));
    }
}
