//! Sensors: pattern subscribers evaluated on commit.
//!
//! A [`Sensor`] holds predicates ("patterns") over one object's changed
//! fields. After each non-empty commit the packet asks every sensor whether
//! the changeset matches; a matching sensor emits a [`Notification`] naming
//! the objects involved, logs it, hands it to its subscribers and, if wired,
//! mirrors it into an output object.

use crate::change_set::{Changeset, ObjectChanges};
use crate::subscription::{SubscriptionId, Subscribers};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use fieldtree_core::{Error, Object, Result, Value};

/// Predicate over the changed fields of one object.
pub type Pattern = Box<dyn Fn(&ObjectChanges) -> bool>;

/// How pattern matches across objects decide whether a sensor fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Every pattern matches at least one changed object.
    #[default]
    AllPatterns,
    /// At least one pattern matches some changed object.
    AnyPattern,
    /// One changed object satisfies every pattern.
    SameObject,
}

/// Record emitted when a sensor fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Name of the sensor that fired.
    pub sensor: String,
    /// 1 for the sensor's first notification, then increasing.
    pub sequence: u64,
    /// Matching object name -> indexes of the patterns it matched.
    pub matches: BTreeMap<String, Vec<usize>>,
}

impl Notification {
    /// Names of the matching objects, in order.
    pub fn objects(&self) -> impl Iterator<Item = &str> + '_ {
        self.matches.keys().map(String::as_str)
    }

    /// Patterns matched by `object`; empty if it did not match.
    pub fn patterns_for(&self, object: &str) -> &[usize] {
        self.matches.get(object).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct Sensor {
    name: String,
    policy: MatchPolicy,
    patterns: Vec<Pattern>,
    log: Vec<Notification>,
    subscriptions: Subscribers,
    output: Option<Object>,
    output_error: Option<Error>,
}

impl Sensor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: MatchPolicy::default(),
            patterns: Vec::new(),
            log: Vec::new(),
            subscriptions: Subscribers::new(),
            output: None,
            output_error: None,
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Mirrors every notification into `output` as `sensor`, `objects` and
    /// `count` fields. A failed write is kept in [`Sensor::output_error`] and
    /// does not stop the notification.
    pub fn with_output(mut self, output: Object) -> Self {
        self.output = Some(output);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn output(&self) -> Option<&Object> {
        self.output.as_ref()
    }

    /// Adds a pattern and returns its index.
    pub fn add_pattern<F>(&mut self, pattern: F) -> usize
    where
        F: Fn(&ObjectChanges) -> bool + 'static,
    {
        self.patterns.push(Box::new(pattern));
        self.patterns.len() - 1
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Returns the objects that would be named if the changeset fires the
    /// sensor, or `None` if it does not. A sensor without patterns never
    /// fires.
    pub fn evaluate(&self, changeset: &Changeset) -> Option<BTreeMap<String, Vec<usize>>> {
        if self.patterns.is_empty() {
            return None;
        }
        let mut matches: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (name, changes) in changeset.iter() {
            let matched: Vec<usize> = self
                .patterns
                .iter()
                .enumerate()
                .filter(|(_, pattern)| pattern(changes))
                .map(|(i, _)| i)
                .collect();
            if !matched.is_empty() {
                matches.insert(name.to_string(), matched);
            }
        }

        let total = self.patterns.len();
        let fires = match self.policy {
            MatchPolicy::AllPatterns => {
                (0..total).all(|i| matches.values().any(|matched| matched.contains(&i)))
            }
            MatchPolicy::AnyPattern => !matches.is_empty(),
            MatchPolicy::SameObject => {
                matches.retain(|_, matched| matched.len() == total);
                !matches.is_empty()
            }
        };
        fires.then_some(matches)
    }

    /// Returns true if the changeset fires the sensor.
    pub fn matches(&self, changeset: &Changeset) -> bool {
        self.evaluate(changeset).is_some()
    }

    /// Fires the sensor if the changeset matches.
    ///
    /// Returns whether a notification was emitted.
    pub fn notify(&mut self, changeset: &Changeset) -> bool {
        let Some(matches) = self.evaluate(changeset) else {
            return false;
        };
        let notification = Notification {
            sensor: self.name.clone(),
            sequence: self.log.len() as u64 + 1,
            matches,
        };
        tracing::debug!(
            sensor = %self.name,
            sequence = notification.sequence,
            objects = notification.matches.len(),
            "sensor fired"
        );

        if let Some(output) = &self.output {
            if let Err(err) = mirror(output, &notification) {
                tracing::warn!(sensor = %self.name, error = %err, "sensor output write failed");
                self.output_error = Some(err);
            }
        }
        self.subscriptions.notify_all(&notification);
        self.log.push(notification);
        true
    }

    /// The most recent failure to write the output object, if any.
    pub fn output_error(&self) -> Option<&Error> {
        self.output_error.as_ref()
    }

    pub fn take_output_error(&mut self) -> Option<Error> {
        self.output_error.take()
    }

    /// Every notification emitted so far, oldest first.
    pub fn notifications(&self) -> &[Notification] {
        &self.log
    }

    pub fn last_notification(&self) -> Option<&Notification> {
        self.log.last()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + 'static,
    {
        self.subscriptions.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }
}

fn mirror(output: &Object, notification: &Notification) -> Result<()> {
    let objects: Vec<Value> = notification.objects().map(Value::from).collect();
    output.set("sensor", notification.sensor.as_str())?;
    output.set("objects", Value::List(objects))?;
    output.set("count", notification.sequence as i64)?;
    Ok(())
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("patterns", &self.patterns.len())
            .field("notifications", &self.log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;
    use fieldtree_core::{Key, Label, Reference};

    fn changes(fields: &[(&str, i64)]) -> ObjectChanges {
        let mut changes = ObjectChanges::new();
        for (label, value) in fields {
            changes.record(Key::next(), Label::from(*label), Value::Int(*value));
        }
        changes
    }

    fn field_is(label: &'static str, value: i64) -> impl Fn(&ObjectChanges) -> bool {
        move |changes: &ObjectChanges| changes.has(&Label::from(label), &Value::Int(value))
    }

    fn sensor(policy: MatchPolicy) -> Sensor {
        let mut sensor = Sensor::new("watch").with_policy(policy);
        sensor.add_pattern(field_is("x", 1));
        sensor.add_pattern(field_is("y", 2));
        sensor
    }

    #[test]
    fn test_all_patterns_across_objects() {
        let sensor = sensor(MatchPolicy::AllPatterns);

        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("x", 1)]));
        assert!(!sensor.matches(&cs));

        cs.insert("b", changes(&[("y", 2)]));
        cs.insert("c", changes(&[("z", 3)]));
        let matches = sensor.evaluate(&cs).unwrap();
        assert_eq!(matches.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(matches["b"], vec![1]);
    }

    #[test]
    fn test_any_pattern() {
        let sensor = sensor(MatchPolicy::AnyPattern);
        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("y", 2)]));
        assert!(sensor.matches(&cs));

        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("y", 3)]));
        assert!(!sensor.matches(&cs));
    }

    #[test]
    fn test_same_object() {
        let sensor = sensor(MatchPolicy::SameObject);
        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("x", 1)]));
        cs.insert("b", changes(&[("y", 2)]));
        assert!(!sensor.matches(&cs));

        cs.insert("c", changes(&[("x", 1), ("y", 2)]));
        let matches = sensor.evaluate(&cs).unwrap();
        assert_eq!(matches.keys().collect::<Vec<_>>(), ["c"]);
    }

    #[test]
    fn test_no_patterns_never_fires() {
        let mut sensor = Sensor::new("idle");
        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("x", 1)]));
        assert!(!sensor.matches(&cs));
        assert!(!sensor.notify(&cs));
        assert!(sensor.notifications().is_empty());
    }

    #[test]
    fn test_notify_logs_and_calls_subscribers() {
        let mut sensor = sensor(MatchPolicy::AnyPattern);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let id = sensor.subscribe(move |n: &Notification| {
            seen_clone.borrow_mut().push(n.sequence);
        });

        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("x", 1)]));
        assert!(sensor.notify(&cs));
        assert!(sensor.notify(&cs));

        assert_eq!(*seen.borrow(), vec![1, 2]);
        let last = sensor.last_notification().unwrap();
        assert_eq!(last.sensor, "watch");
        assert_eq!(last.objects().collect::<Vec<_>>(), ["a"]);
        assert_eq!(last.patterns_for("a"), &[0]);
        assert!(last.patterns_for("b").is_empty());

        assert!(sensor.unsubscribe(id));
        sensor.notify(&cs);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(sensor.notifications().len(), 3);
    }

    #[test]
    fn test_output_object_mirrors_notification() {
        let output = Object::named("alerts");
        let mut sensor = sensor(MatchPolicy::AnyPattern).with_output(output.clone());

        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("x", 1)]));
        sensor.notify(&cs);

        assert_eq!(output.get("sensor").unwrap(), Value::from("watch"));
        assert_eq!(
            output.get("objects").unwrap(),
            Value::List(vec![Value::from("a")])
        );
        assert_eq!(output.get("count").unwrap(), Value::Int(1));
        assert!(output.has_changes());
    }

    #[test]
    fn test_failed_output_write_still_notifies() {
        let output = Object::named("alerts");
        {
            let gone = Object::new();
            output.set("count", Reference::new(&gone, "x")).unwrap();
        }
        let mut sensor = sensor(MatchPolicy::AnyPattern).with_output(output.clone());
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        sensor.subscribe(move |_| *seen_clone.borrow_mut() += 1);

        let mut cs = Changeset::new();
        cs.insert("a", changes(&[("x", 1)]));
        assert!(sensor.notify(&cs));
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(sensor.notifications().len(), 1);
        assert_eq!(output.get("sensor").unwrap(), Value::from("watch"));
        assert!(sensor.output_error().unwrap().is_not_found());
        assert!(sensor.take_output_error().is_some());
        assert!(sensor.output_error().is_none());
    }
}
