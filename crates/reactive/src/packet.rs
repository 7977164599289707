//! Packet: a registry of named objects.
//!
//! The packet owns its objects by name, keeps an inverted index of their
//! committed field values, and notifies its sensors whenever a commit carries
//! changes. `commit` is the only point at which writes to objects become
//! visible to the index and to sensors.
//!
//! ```
//! use fieldtree_reactive::{Label, Packet, Sensor, Value};
//!
//! let mut packet = Packet::new();
//! let (alice, _) = packet.create_object("alice").unwrap();
//! alice.set("city", "Paris").unwrap();
//!
//! let mut sensor = Sensor::new("parisians");
//! sensor.add_pattern(|changes| changes.has(&Label::from("city"), &Value::from("Paris")));
//! let id = packet.add_sensor(sensor);
//!
//! let changes = packet.commit();
//! assert_eq!(changes.object_names(), ["alice"]);
//! assert_eq!(packet.sensor(id).unwrap().notifications().len(), 1);
//! assert!(packet.lookup(&Label::from("city"), &Value::from("Paris")).contains("alice"));
//! ```

use crate::change_set::{Changeset, ObjectChanges};
use crate::index::ValueIndex;
use crate::sensor::Sensor;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use fieldtree_core::{Error, EvalOptions, Label, Object, ObjectName, Result, Value, ValueName};

/// Unique identifier of a sensor registered with a packet.
pub type SensorId = u64;

/// Packet configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketOptions {
    /// Evaluation options for objects created by the packet.
    pub eval: EvalOptions,
}

impl PacketOptions {
    pub fn with_eval(mut self, eval: EvalOptions) -> Self {
        self.eval = eval;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.eval = self.eval.with_max_depth(max_depth);
        self
    }
}

#[derive(Debug)]
pub struct Packet {
    objects: BTreeMap<String, Object>,
    index: ValueIndex,
    sensors: Vec<(SensorId, Sensor)>,
    next_sensor: SensorId,
    options: PacketOptions,
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet {
    pub fn new() -> Self {
        Self::with_options(PacketOptions::default())
    }

    pub fn with_options(options: PacketOptions) -> Self {
        Self {
            objects: BTreeMap::new(),
            index: ValueIndex::new(),
            sensors: Vec::new(),
            next_sensor: 1,
            options,
        }
    }

    pub fn options(&self) -> PacketOptions {
        self.options
    }

    // ---------------------------------------------------------------------
    // Objects
    // ---------------------------------------------------------------------

    /// Creates an empty object registered under `name`.
    pub fn create_object(&mut self, name: &str) -> Result<(Object, ObjectName)> {
        let object = Object::with_options(Some(name.to_string()), self.options.eval);
        let handle = self.add(object.clone())?;
        Ok((object, handle))
    }

    /// Registers an object under its name.
    ///
    /// Fails with `InvalidArgument` if the object is unnamed or the name is
    /// already taken.
    pub fn add(&mut self, object: Object) -> Result<ObjectName> {
        let name = object
            .name()
            .ok_or_else(|| Error::invalid_argument("only named objects can be added to a packet"))?
            .to_string();
        if self.objects.contains_key(&name) {
            return Err(Error::invalid_argument(format!(
                "an object named {} is already registered",
                name
            )));
        }
        let handle = ObjectName::with_name(&object, &name);
        self.objects.insert(name, object);
        Ok(handle)
    }

    /// Unregisters an object and drops its index entries. Uncommitted
    /// changes of the object are discarded.
    pub fn remove(&mut self, name: &str) -> Result<Object> {
        let object = self
            .objects
            .remove(name)
            .ok_or_else(|| Error::not_found(format!("object {}", name)))?;
        object.take_changes();
        self.index.forget(name);
        Ok(object)
    }

    pub fn object(&self, name: &str) -> Result<Object> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("object {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Names of the registered objects, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.objects.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Reads a field of a registered object by name.
    pub fn get(&self, name: &ValueName) -> Result<Value> {
        self.object(name.object_name().name())?
            .get(name.label().clone())
    }

    /// Writes a field of a registered object by name.
    pub fn set(&self, name: &ValueName, value: impl Into<Value>) -> Result<()> {
        self.object(name.object_name().name())?
            .set(name.label().clone(), value)
            .map(|_| ())
    }

    // ---------------------------------------------------------------------
    // Sensors
    // ---------------------------------------------------------------------

    /// Registers a sensor, returning its id.
    pub fn add_sensor(&mut self, sensor: Sensor) -> SensorId {
        let id = self.next_sensor;
        self.next_sensor += 1;
        self.sensors.push((id, sensor));
        id
    }

    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, sensor)| sensor)
    }

    pub fn sensor_mut(&mut self, id: SensorId) -> Option<&mut Sensor> {
        self.sensors
            .iter_mut()
            .find(|(sid, _)| *sid == id)
            .map(|(_, sensor)| sensor)
    }

    pub fn remove_sensor(&mut self, id: SensorId) -> Option<Sensor> {
        let position = self.sensors.iter().position(|(sid, _)| *sid == id)?;
        Some(self.sensors.remove(position).1)
    }

    // ---------------------------------------------------------------------
    // Commit
    // ---------------------------------------------------------------------

    /// Drains every object's change buffer into a changeset, updates the
    /// index, then notifies sensors in registration order.
    ///
    /// Sensors are not consulted for an empty changeset. Every sensor sees
    /// the changeset: a sensor whose output object rejects a write still
    /// fires and reports it through [`Sensor::output_error`]. Writes a sensor
    /// makes to its output object are picked up by the next commit.
    pub fn commit(&mut self) -> Changeset {
        let mut changeset = Changeset::new();
        for (name, object) in &self.objects {
            if object.has_changes() {
                changeset.insert(name.as_str(), ObjectChanges::from(object.take_changes()));
            }
        }
        if changeset.is_empty() {
            return changeset;
        }

        self.index.apply(&changeset);
        tracing::debug!(
            objects = changeset.len(),
            fields = changeset.field_count(),
            "packet committed"
        );

        for (_, sensor) in self.sensors.iter_mut() {
            sensor.notify(&changeset);
        }
        changeset
    }

    /// Names of objects whose committed field `label` equals `value`.
    pub fn lookup(&self, label: &Label, value: &Value) -> BTreeSet<String> {
        self.index.lookup(label, value)
    }

    pub fn index(&self) -> &ValueIndex {
        &self.index
    }
}
