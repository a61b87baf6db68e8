//! Mutations and record persistence
//!
//! Unlike reads, mutations surface transport failures. A 422 response becomes
//! [`RestError::RemoteValidation`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::builder::Descriptor;
use super::execution::data_get;
use crate::config::Operation;
use crate::connection::{CallOptions, HttpVerb, TransportResponse};
use crate::error::{RestError, RestResult};
use crate::model::Record;

impl Descriptor {
    /// POST a new object to the collection endpoint
    pub async fn store_one(&self, attributes: Map<String, Value>) -> RestResult<Option<Record>> {
        let endpoint = self.collection_endpoint();
        let response = self
            .client()?
            .call(
                HttpVerb::Post,
                &endpoint,
                CallOptions::new().json(Value::Object(attributes)),
                &self.request_name("store"),
            )
            .await
            .map_err(RestError::into_remote_validation)?;

        let record = self.record_from_response(&response, Operation::Store)?;
        Ok(record.map(|mut record| {
            record.mark_created();
            record
        }))
    }

    /// Update one object with the connection's update verb
    pub async fn update_one(
        &self,
        id: impl Into<Value>,
        attributes: Map<String, Value>,
    ) -> RestResult<Option<Record>> {
        let endpoint = self
            .object_endpoint(&id.into())
            .ok_or(RestError::MissingPrimaryKey)?;

        let response = self
            .client()?
            .call(
                *self.config.get_update_verb(),
                &endpoint,
                CallOptions::new().json(Value::Object(attributes)),
                &self.request_name("update"),
            )
            .await
            .map_err(RestError::into_remote_validation)?;

        self.record_from_response(&response, Operation::Update)
    }

    /// DELETE one object. True only for 200 and 204.
    pub async fn delete_one(&self, id: impl Into<Value>) -> RestResult<bool> {
        let endpoint = self
            .object_endpoint(&id.into())
            .ok_or(RestError::MissingPrimaryKey)?;

        let response = self
            .client()?
            .call(
                HttpVerb::Delete,
                &endpoint,
                CallOptions::new(),
                &self.request_name("destroy"),
            )
            .await
            .map_err(RestError::into_remote_validation)?;

        Ok(matches!(response.status, 200 | 204))
    }

    /// HEAD one object and return its response headers
    pub async fn head_one(&self, id: impl Into<Value>) -> RestResult<BTreeMap<String, String>> {
        let endpoint = self
            .object_endpoint(&id.into())
            .ok_or(RestError::MissingPrimaryKey)?;

        let response = self
            .client()?
            .with_query(self.params.clone())
            .call(HttpVerb::Head, &endpoint, CallOptions::new(), &self.request_name("head"))
            .await?;

        Ok(response.headers)
    }

    fn record_from_response(
        &self,
        response: &TransportResponse,
        operation: Operation,
    ) -> RestResult<Option<Record>> {
        if response.body.trim().is_empty() {
            return Ok(None);
        }

        let body = response.body_json()?;
        let path = self.config.data_variable(operation, &self.endpoint_name());
        match data_get(&body, path.as_deref()) {
            Value::Object(map) => Ok(Some(Record::from_remote(
                self.entity.as_ref(),
                &self.connection,
                map,
            ))),
            _ => Ok(None),
        }
    }

    /// Insert or update `record`.
    ///
    /// New records are stored with all attributes; existing ones send only
    /// their dirty attributes. Attributes echoed by the server are merged back
    /// and the original snapshot is resynced.
    pub async fn save(&self, record: &mut Record) -> RestResult<bool> {
        if !record.exists() {
            let stored = self.store_one(record.attributes().clone()).await?;
            if let Some(stored) = stored {
                record.fill(stored.attributes().clone());
            }
            record.set_connection(self.connection.clone());
            record.mark_created();
            record.sync_original();
            return Ok(true);
        }

        let dirty = record.dirty();
        if dirty.is_empty() {
            return Ok(true);
        }

        let key = record.key().cloned().ok_or(RestError::MissingPrimaryKey)?;
        if let Some(updated) = self.update_one(key, dirty).await? {
            record.fill(updated.attributes().clone());
        }
        record.sync_original();
        Ok(true)
    }

    /// Delete a stored record
    pub async fn delete(&self, record: &mut Record) -> RestResult<bool> {
        let key = record.key().cloned().ok_or(RestError::MissingPrimaryKey)?;
        let deleted = self.delete_one(key).await?;
        if deleted {
            record.set_exists(false);
        }
        Ok(deleted)
    }

    /// Find each id and delete the ones that exist, returning how many were deleted
    pub async fn destroy<I, V>(&self, ids: I) -> RestResult<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut count = 0;
        for id in ids {
            if let Some(mut record) = self.get_one(id).await? {
                if self.delete(&mut record).await? {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}
