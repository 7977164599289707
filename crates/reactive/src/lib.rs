//! Fieldtree Reactive - object registry, commits and sensors.
//!
//! This crate builds the publish/notify layer on top of `fieldtree-core`
//! objects. Writes to objects are buffered per object; committing a packet
//! turns them into a changeset, updates an inverted index of committed
//! values, and lets sensors react.
//!
//! # Core Concepts
//!
//! - `Packet`: registry of named objects, the commit boundary
//! - `Changeset`: the fields changed per object since the previous commit
//! - `ValueIndex`: label -> value -> object names, maintained on commit
//! - `Sensor`: predicates over changed fields, firing `Notification`s
//! - `Subscribers`: callbacks subscribed to a sensor
//!
//! # Example
//!
//! ```rust
//! use fieldtree_reactive::{Label, MatchPolicy, Packet, Sensor, Value};
//!
//! let mut packet = Packet::new();
//! let (alice, alice_name) = packet.create_object("alice").unwrap();
//! let (bob, _) = packet.create_object("bob").unwrap();
//!
//! let mut sensor = Sensor::new("moved").with_policy(MatchPolicy::AllPatterns);
//! sensor.add_pattern(|changes| changes.get(&Label::from("city")).is_some());
//! let id = packet.add_sensor(sensor);
//!
//! alice.set("city", "Paris").unwrap();
//! bob.set("age", 40i64).unwrap();
//! packet.commit();
//!
//! let fired = packet.sensor(id).unwrap().last_notification().unwrap();
//! assert_eq!(fired.objects().collect::<Vec<_>>(), ["alice"]);
//! assert_eq!(packet.get(&alice_name.field("city")).unwrap(), Value::from("Paris"));
//! ```

#![no_std]

extern crate alloc;

pub mod change_set;
pub mod index;
pub mod packet;
pub mod sensor;
pub mod subscription;

pub use change_set::{Changeset, ObjectChanges};
pub use index::ValueIndex;
pub use packet::{Packet, PacketOptions, SensorId};
pub use sensor::{MatchPolicy, Notification, Pattern, Sensor};
pub use subscription::{NotificationCallback, SubscriptionId, Subscribers};

// Re-export commonly used types from fieldtree-core
pub use fieldtree_core::{Error, Label, Object, ObjectName, Result, Value, ValueName};
