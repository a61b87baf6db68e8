//! BelongsTo: the parent holds the foreign key

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::traits::Relation;
use crate::error::RestResult;
use crate::model::{canonical_key, distinct_keys, Record, RelationValue};
use crate::query::Descriptor;

pub struct BelongsTo {
    descriptor: Descriptor,
    foreign_key: String,
    other_key: String,
    has_keys: bool,
}

impl BelongsTo {
    pub fn new(descriptor: Descriptor, foreign_key: impl Into<String>, other_key: impl Into<String>) -> Self {
        Self {
            descriptor,
            foreign_key: foreign_key.into(),
            other_key: other_key.into(),
            has_keys: false,
        }
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn other_key(&self) -> &str {
        &self.other_key
    }
}

#[async_trait]
impl Relation for BelongsTo {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn add_eager_constraints(&mut self, parents: &[Record]) {
        let keys = distinct_keys(parents.iter().filter_map(|p| p.get_attribute(&self.foreign_key)));
        self.has_keys = !keys.is_empty();
        if !self.has_keys {
            return;
        }

        let related = self.descriptor.entity().clone();
        if related.supports_filter_set() {
            let param = related.filter_param(&self.other_key);
            self.descriptor.set_where(param, Value::Array(keys));
            self.descriptor.collection_only = true;
        } else {
            // Primary key filter: the descriptor fetches each id on its own
            self.descriptor.set_where(related.key_name(), Value::Array(keys));
        }
    }

    async fn get_eager(&self) -> RestResult<Vec<Record>> {
        if !self.has_keys {
            return Ok(Vec::new());
        }
        self.descriptor.clone().get().await
    }

    async fn match_eager(
        &self,
        parents: &mut [Record],
        results: Vec<Record>,
        name: &str,
    ) -> RestResult<()> {
        // Later rows win on duplicate keys
        let mut dictionary: HashMap<String, Record> = HashMap::new();
        for record in results {
            if let Some(key) = record.get_attribute(&self.other_key).and_then(canonical_key) {
                dictionary.insert(key, record);
            }
        }

        for parent in parents.iter_mut() {
            let matched = parent
                .get_attribute(&self.foreign_key)
                .and_then(canonical_key)
                .and_then(|key| dictionary.get(&key));

            let value = match matched {
                Some(related) => RelationValue::One(Box::new(related.clone())),
                None => RelationValue::Null,
            };
            parent.set_relation(name, value);
        }

        Ok(())
    }
}
