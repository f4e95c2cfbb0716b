// src/model/dataset.rs
//! Named collection of signal groups plus free-form scalar attributes

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult};
use crate::model::signal_group::SignalGroup;
use crate::model::time::TimeAxis;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute attached to a dataset (source file name, case name, run number, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Flag
    Bool(bool),
    /// Number, integer or not
    Number(f64),
    /// Text
    Text(String),
    /// Nested list
    List(Vec<AttributeValue>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Number(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => write!(f, "{}", s),
            AttributeValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

/// Attribute holding the absolute epoch (seconds) of `Time == 0`
pub const TIME_ORIGIN_ATTRIBUTE: &str = "time_origin";

/// Dataset: a `Time` group, further signal groups sharing its sample count, and attributes.
///
/// Groups keep insertion order with `Time` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Dataset {
    /// Named groups in insertion order, `Time` first
    pub groups: Vec<(String, SignalGroup)>,
    /// Scalar metadata; names never collide with group names
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Dataset {
    /// Dataset holding only the given time group
    pub fn new(time: SignalGroup) -> VtoolResult<Self> {
        let validity = crate::validation::check_time_group(&time);
        if !validity.is_valid {
            return Err(VtoolError::invalid_input(names::TIME_GROUP, validity.reason));
        }
        Ok(Self {
            groups: vec![(names::TIME_GROUP.to_string(), time)],
            attributes: BTreeMap::new(),
        })
    }

    /// Dataset whose time group holds elapsed seconds `samples`
    pub fn from_time(samples: Vec<f64>) -> Self {
        Self {
            groups: vec![(names::TIME_GROUP.to_string(), SignalGroup::time(samples))],
            attributes: BTreeMap::new(),
        }
    }

    /// The `Time` group
    pub fn time(&self) -> Option<&SignalGroup> {
        self.group(names::TIME_GROUP)
    }

    /// Time samples as a vector (empty if the time group is missing)
    pub fn time_values(&self) -> Vec<f64> {
        self.time()
            .filter(|t| t.n_signals() == 1)
            .map(|t| t.column_vec(0))
            .unwrap_or_default()
    }

    /// Sample count N, defined by the time group
    pub fn n_samples(&self) -> usize {
        self.time().map_or(0, SignalGroup::n_samples)
    }

    /// Group called `name`
    pub fn group(&self, name: &str) -> Option<&SignalGroup> {
        self.groups.iter().find(|(n, _)| n == name).map(|(_, g)| g)
    }

    /// Mutable access; callers keep the sample count unchanged
    pub fn group_mut(&mut self, name: &str) -> Option<&mut SignalGroup> {
        self.groups.iter_mut().find(|(n, _)| n == name).map(|(_, g)| g)
    }

    /// True if a group called `name` exists
    pub fn contains_group(&self, name: &str) -> bool {
        self.group(name).is_some()
    }

    /// Group names in order, `Time` included
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Group names other than `Time`
    pub fn signal_group_names(&self) -> Vec<&str> {
        self.groups
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(|n| *n != names::TIME_GROUP)
            .collect()
    }

    /// Insert or replace a group; length and layer checks happen in [`Dataset::insert_group`]
    pub(crate) fn put_group(&mut self, name: &str, group: SignalGroup) -> Option<SignalGroup> {
        match self.groups.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, group)),
            None => {
                self.groups.push((name.to_string(), group));
                None
            }
        }
    }

    /// Insert or replace a signal group, enforcing the shared-N and shared-layer invariants.
    /// Returns the replaced group, if any.
    pub fn insert_group(&mut self, name: &str, group: SignalGroup) -> VtoolResult<Option<SignalGroup>> {
        if name == names::TIME_GROUP {
            let validity = crate::validation::check_time_group(&group);
            if !validity.is_valid {
                return Err(VtoolError::invalid_input(names::TIME_GROUP, validity.reason));
            }
        } else if self.attributes.contains_key(name) {
            return Err(VtoolError::invalid_input(
                "name",
                format!("'{}' is already an attribute", name),
            ));
        } else {
            crate::validation::check_signal_group(&group).into_result(name)?;
        }
        if name != names::TIME_GROUP && group.n_samples() != self.n_samples() {
            return Err(VtoolError::incompatible(
                "sample count",
                format!("group '{}' has {} samples, dataset has {}", name, group.n_samples(), self.n_samples()),
            ));
        }
        if let Some(time) = self.time() {
            if name != names::TIME_GROUP && !group.layers.same_layer_set(&time.layers) {
                return Err(VtoolError::incompatible(
                    "name layers",
                    format!(
                        "group '{}' has layers [{}], dataset has [{}]",
                        name,
                        group.layer_names().join(", "),
                        time.layer_names().join(", ")
                    ),
                ));
            }
        }
        Ok(self.put_group(name, group))
    }

    /// Remove a signal group; `Time` cannot be removed
    pub fn remove_group(&mut self, name: &str) -> VtoolResult<SignalGroup> {
        if name == names::TIME_GROUP {
            return Err(VtoolError::invalid_input("name", "the Time group cannot be removed"));
        }
        let pos = self
            .groups
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| VtoolError::not_found(name, "dataset groups"))?;
        Ok(self.groups.remove(pos).1)
    }

    /// Set an attribute unless a group already uses the name
    pub fn set_attribute(&mut self, name: &str, value: AttributeValue) -> VtoolResult<()> {
        if self.contains_group(name) {
            return Err(VtoolError::invalid_input(
                "name",
                format!("'{}' is already a signal group", name),
            ));
        }
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// Attribute called `name`
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Time axis, absolute if a time origin attribute is present
    pub fn time_axis(&self) -> TimeAxis {
        let elapsed = self.time_values();
        match self.attributes.get(TIME_ORIGIN_ATTRIBUTE) {
            Some(AttributeValue::Number(origin)) => TimeAxis::absolute_from_elapsed(*origin, &elapsed),
            _ => TimeAxis::Elapsed(elapsed),
        }
    }

    /// Replace the time samples, recording an origin for absolute axes
    pub fn set_time_axis(&mut self, axis: &TimeAxis) -> VtoolResult<()> {
        let (origin, elapsed) = axis.to_elapsed();
        if elapsed.len() != self.n_samples() {
            return Err(VtoolError::incompatible(
                "sample count",
                format!("time axis has {} samples, dataset has {}", elapsed.len(), self.n_samples()),
            ));
        }
        let layers = self.time().map(|t| t.layers.clone());
        let mut time = SignalGroup::time(elapsed);
        if let Some(layers) = layers {
            time.layers = layers;
        }
        self.put_group(names::TIME_GROUP, time);
        match origin {
            Some(origin) => {
                self.attributes.insert(TIME_ORIGIN_ATTRIBUTE.to_string(), AttributeValue::Number(origin));
            }
            None => {
                self.attributes.remove(TIME_ORIGIN_ATTRIBUTE);
            }
        }
        Ok(())
    }
}

impl TryFrom<Map<String, Value>> for Dataset {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut groups = Vec::new();
        let mut attributes = BTreeMap::new();
        for (key, value) in map {
            let is_group = value
                .as_object()
                .is_some_and(|obj| obj.contains_key(names::VALUES_FIELD));
            if is_group {
                let group: SignalGroup =
                    serde_json::from_value(value).map_err(|e| format!("group '{}': {}", key, e))?;
                groups.push((key, group));
            } else {
                let attr: AttributeValue =
                    serde_json::from_value(value).map_err(|e| format!("attribute '{}': {}", key, e))?;
                attributes.insert(key, attr);
            }
        }
        groups.sort_by_key(|(name, _)| name != names::TIME_GROUP);
        Ok(Dataset { groups, attributes })
    }
}

impl From<Dataset> for Map<String, Value> {
    fn from(dataset: Dataset) -> Self {
        let mut map = Map::new();
        for (name, value) in dataset.attributes {
            map.insert(name, serde_json::to_value(value).unwrap_or(Value::Null));
        }
        for (name, group) in dataset.groups {
            map.insert(name, serde_json::to_value(group).unwrap_or(Value::Null));
        }
        map
    }
}
