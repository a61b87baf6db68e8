//! Records: one remote entity instance
//!
//! A record keeps its attributes, an original snapshot for dirty tracking and
//! a map of loaded relations. A relation that is absent from the map was not
//! loaded; a relation present as [`RelationValue::Null`] was loaded and had
//! no match.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::casts::CastTable;
use super::entity::Entity;

/// Loaded value of a relation
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    Null,
    One(Box<Record>),
    Many(Vec<Record>),
}

impl RelationValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RelationValue::Null)
    }

    pub fn as_one(&self) -> Option<&Record> {
        match self {
            RelationValue::One(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Record]> {
        match self {
            RelationValue::Many(records) => Some(records),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RelationValue::Null => Value::Null,
            RelationValue::One(record) => Value::Object(record.to_map()),
            RelationValue::Many(records) => {
                Value::Array(records.iter().map(|r| Value::Object(r.to_map())).collect())
            }
        }
    }
}

/// A remote entity instance
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    key_name: String,
    connection: Option<String>,
    attributes: Map<String, Value>,
    original: Map<String, Value>,
    relations: BTreeMap<String, RelationValue>,
    casts: CastTable,
    exists: bool,
    recently_created: bool,
}

impl Record {
    /// Empty, unsaved record
    pub fn new(entity: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            key_name: key_name.into(),
            connection: None,
            attributes: Map::new(),
            original: Map::new(),
            relations: BTreeMap::new(),
            casts: CastTable::new(),
            exists: false,
            recently_created: false,
        }
    }

    /// Empty, unsaved record carrying the entity's metadata
    pub fn for_entity(entity: &dyn Entity) -> Self {
        let mut record = Self::new(entity.name(), entity.key_name());
        record.casts = entity.casts();
        record.connection = entity.connection().map(str::to_string);
        record
    }

    /// Record materialized from a server object
    pub fn from_remote(entity: &dyn Entity, connection: &str, raw: Map<String, Value>) -> Self {
        let mut record = Self::for_entity(entity);
        record.connection = Some(connection.to_string());
        record.fill(raw);
        record.exists = true;
        record.sync_original();
        record
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn set_connection(&mut self, connection: impl Into<String>) {
        self.connection = Some(connection.into());
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn set_exists(&mut self, exists: bool) {
        self.exists = exists;
    }

    pub fn was_recently_created(&self) -> bool {
        self.recently_created
    }

    pub(crate) fn mark_created(&mut self) {
        self.exists = true;
        self.recently_created = true;
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn original(&self) -> &Map<String, Value> {
        &self.original
    }

    /// Set several attributes, applying casts
    pub fn fill(&mut self, attributes: Map<String, Value>) -> &mut Self {
        for (key, value) in attributes {
            self.set_attribute(key, value);
        }
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = self.casts.apply(&key, &value.into());
        self.attributes.insert(key, value);
    }

    pub fn get_attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get_attribute(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_attribute(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_attribute(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_attribute(key).and_then(Value::as_bool)
    }

    /// Remove an attribute from both the attributes and the original snapshot
    pub fn extract_attribute(&mut self, key: &str) -> Option<Value> {
        self.original.remove(key);
        self.attributes.remove(key)
    }

    /// Primary key value, if set and not null
    pub fn key(&self) -> Option<&Value> {
        self.get_attribute(&self.key_name).filter(|v| !v.is_null())
    }

    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Attributes that differ from the original snapshot
    pub fn dirty(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .filter(|(key, value)| match self.original.get(key.as_str()) {
                Some(original) => !values_equivalent(original, value),
                None => true,
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    pub fn set_relation(&mut self, name: impl Into<String>, value: RelationValue) {
        self.relations.insert(name.into(), value);
    }

    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, RelationValue> {
        &self.relations
    }

    /// Attributes (cast) plus loaded relations
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), self.casts.apply(key, value)))
            .collect();

        for (name, relation) in &self.relations {
            map.insert(name.clone(), relation.to_value());
        }

        map
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

// Numbers compare by value so `1` and `1.0` are not a change
fn values_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}
