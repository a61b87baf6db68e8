//! HasMany: the related records hold the foreign key

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::traits::Relation;
use crate::error::RestResult;
use crate::model::{canonical_key, distinct_keys, Record, RelationValue};
use crate::query::Descriptor;

pub struct HasMany {
    descriptor: Descriptor,
    foreign_key: String,
    local_key: String,
    has_keys: bool,
}

impl HasMany {
    pub fn new(descriptor: Descriptor, foreign_key: impl Into<String>, local_key: impl Into<String>) -> Self {
        Self {
            descriptor,
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
            has_keys: false,
        }
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn local_key(&self) -> &str {
        &self.local_key
    }
}

#[async_trait]
impl Relation for HasMany {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn add_eager_constraints(&mut self, parents: &[Record]) {
        let keys = distinct_keys(parents.iter().filter_map(|p| p.get_attribute(&self.local_key)));
        self.has_keys = !keys.is_empty();
        if !self.has_keys {
            return;
        }

        let param = self.descriptor.entity().filter_param(&self.foreign_key);
        self.descriptor.set_where(param, Value::Array(keys));
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
        let mut dictionary: HashMap<String, Vec<Record>> = HashMap::new();
        for record in results {
            if let Some(key) = record.get_attribute(&self.foreign_key).and_then(canonical_key) {
                dictionary.entry(key).or_default().push(record);
            }
        }

        for parent in parents.iter_mut() {
            let matched = parent
                .get_attribute(&self.local_key)
                .and_then(canonical_key)
                .and_then(|key| dictionary.get(&key));

            let value = match matched {
                Some(related) => RelationValue::Many(related.clone()),
                None => RelationValue::Null,
            };
            parent.set_relation(name, value);
        }

        Ok(())
    }
}
