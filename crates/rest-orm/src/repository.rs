//! Repositories - CRUD facades over descriptors

use serde_json::{Map, Value};

use crate::error::RestResult;
use crate::manager::RestManager;
use crate::model::{EntityRef, Record};
use crate::query::Descriptor;

/// CRUD over a top-level resource
#[derive(Clone)]
pub struct RestRepository {
    manager: RestManager,
    entity: EntityRef,
}

impl RestRepository {
    pub fn new(manager: RestManager, entity: EntityRef) -> Self {
        Self { manager, entity }
    }

    pub fn query(&self) -> RestResult<Descriptor> {
        self.manager.query(self.entity.clone())
    }

    pub async fn all(&self) -> RestResult<Vec<Record>> {
        self.query()?.get().await
    }

    pub async fn create(&self, attributes: Map<String, Value>) -> RestResult<Record> {
        let query = self.query()?;
        let mut record = query.new_record(attributes);
        query.save(&mut record).await?;
        Ok(record)
    }

    pub async fn get(&self, id: impl Into<Value>) -> RestResult<Record> {
        self.query()?.find_or_fail(id).await
    }

    /// Find, fill and save; only the changed attributes are sent
    pub async fn update(&self, id: impl Into<Value>, attributes: Map<String, Value>) -> RestResult<Record> {
        let query = self.query()?;
        let mut record = query.clone().find_or_fail(id).await?;
        record.fill(attributes);
        query.save(&mut record).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: impl Into<Value>) -> RestResult<bool> {
        self.query()?.delete_one(id).await
    }
}

/// CRUD over a resource nested under parent records, e.g. `users/{0}/posts`
#[derive(Clone)]
pub struct RestNestedRepository {
    manager: RestManager,
    entity: EntityRef,
}

impl RestNestedRepository {
    pub fn new(manager: RestManager, entity: EntityRef) -> Self {
        Self { manager, entity }
    }

    /// Descriptor scoped to the given parent ids, outermost first
    pub fn query_for_parent(&self, parents: Vec<Value>) -> RestResult<Descriptor> {
        Ok(self.manager.query(self.entity.clone())?.within(parents))
    }

    pub async fn all_for_parent(&self, parents: Vec<Value>) -> RestResult<Vec<Record>> {
        self.query_for_parent(parents)?.get().await
    }

    pub async fn get_for_parent(&self, parents: Vec<Value>, id: impl Into<Value>) -> RestResult<Record> {
        self.query_for_parent(parents)?.find_or_fail(id).await
    }

    pub async fn create_for_parent(
        &self,
        parents: Vec<Value>,
        attributes: Map<String, Value>,
    ) -> RestResult<Record> {
        let query = self.query_for_parent(parents)?;
        let mut record = query.new_record(attributes);
        query.save(&mut record).await?;
        Ok(record)
    }

    pub async fn delete_for_parent(&self, parents: Vec<Value>, id: impl Into<Value>) -> RestResult<bool> {
        self.query_for_parent(parents)?.delete_one(id).await
    }
}
