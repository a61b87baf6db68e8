//! Embedded relations
//!
//! The related data arrives inside the parent payload. The primary request is
//! asked to include it through `remote_load`; matching then moves the
//! embedded attribute off each parent and hydrates it.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::Relation;
use crate::error::RestResult;
use crate::model::{Record, RelationValue};
use crate::query::Descriptor;

pub struct ComesWith {
    descriptor: Descriptor,
    accessor: String,
    request_name: String,
    many: bool,
}

impl ComesWith {
    /// One embedded record
    pub fn one(descriptor: Descriptor, accessor: impl Into<String>, request_name: impl Into<String>) -> Self {
        Self {
            descriptor,
            accessor: accessor.into(),
            request_name: request_name.into(),
            many: false,
        }
    }

    /// An embedded collection
    pub fn many(descriptor: Descriptor, accessor: impl Into<String>, request_name: impl Into<String>) -> Self {
        Self {
            many: true,
            ..Self::one(descriptor, accessor, request_name)
        }
    }

    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    pub fn request_name(&self) -> &str {
        &self.request_name
    }

    fn raw_items(&self, raw: Value) -> Vec<Value> {
        match raw {
            Value::Array(items) => items.into_iter().filter(Value::is_object).collect(),
            Value::Object(_) => vec![raw],
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl Relation for ComesWith {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn is_embedded(&self) -> bool {
        true
    }

    fn add_pre_constraints(&self, parent: &mut Descriptor) {
        parent.remote_load(&self.request_name);
    }

    fn add_eager_constraints(&mut self, _parents: &[Record]) {}

    async fn get_eager(&self) -> RestResult<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn match_eager(
        &self,
        parents: &mut [Record],
        _results: Vec<Record>,
        name: &str,
    ) -> RestResult<()> {
        // Hydrate every parent's payload, then eager-load nested paths in one pass
        let mut counts = Vec::with_capacity(parents.len());
        let mut hydrated = Vec::new();

        for parent in parents.iter_mut() {
            let raw = parent.extract_attribute(&self.accessor).unwrap_or(Value::Null);
            let records = self.descriptor.hydrate(self.raw_items(raw));
            counts.push(records.len());
            hydrated.extend(records);
        }

        if !hydrated.is_empty() {
            self.descriptor.load(&mut hydrated).await?;
        }

        let mut hydrated = hydrated.into_iter();
        for (parent, count) in parents.iter_mut().zip(counts) {
            let mut records: Vec<Record> = hydrated.by_ref().take(count).collect();

            let value = if records.is_empty() {
                RelationValue::Null
            } else if self.many {
                RelationValue::Many(records)
            } else {
                RelationValue::One(Box::new(records.remove(0)))
            };
            parent.set_relation(name, value);
        }

        Ok(())
    }
}
