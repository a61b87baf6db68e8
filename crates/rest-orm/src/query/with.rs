//! Eager loading
//!
//! Eager-load paths are kept as a flat list of dotted strings. The relation
//! tree is derived on demand: the first segment names a relation of this
//! entity, the remainder is handed to that relation's own descriptor.

use std::sync::Arc;

use futures::future::join_all;

use super::builder::Descriptor;
use crate::error::{RestError, RestResult};
use crate::model::Record;
use crate::relationships::{build_relation, Relation};

/// Anything that names one or more eager-load paths
pub trait EagerPaths {
    fn into_paths(self) -> Vec<String>;
}

impl EagerPaths for &str {
    fn into_paths(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl EagerPaths for String {
    fn into_paths(self) -> Vec<String> {
        vec![self]
    }
}

impl EagerPaths for &[&str] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(|path| path.to_string()).collect()
    }
}

impl<const N: usize> EagerPaths for [&str; N] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(|path| path.to_string()).collect()
    }
}

impl EagerPaths for Vec<&str> {
    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl EagerPaths for Vec<String> {
    fn into_paths(self) -> Vec<String> {
        self
    }
}

impl Descriptor {
    /// Eager-load one or more dotted relation paths
    pub fn with(mut self, paths: impl EagerPaths) -> Self {
        self.add_eager_loads(paths.into_paths());
        self
    }

    /// Eager-load `path` and customize the relation's descriptor when it is resolved
    pub fn with_constraint<F>(mut self, path: &str, customizer: F) -> Self
    where
        F: Fn(&mut Descriptor) + Send + Sync + 'static,
    {
        self.add_eager_loads(vec![path.to_string()]);
        self.customizers.insert(path.to_string(), Arc::new(customizer));
        self
    }

    pub fn add_eager_loads(&mut self, paths: Vec<String>) {
        for path in paths {
            let path = path.trim().trim_matches('.').to_string();
            if !path.is_empty() && !self.eager_load.contains(&path) {
                self.eager_load.push(path);
            }
        }
    }

    /// Ask the server to embed `request_name` in this descriptor's primary response
    pub fn remote_load(&mut self, request_name: &str) {
        let entity = self.entity.clone();
        entity.remote_load(self, request_name);
    }

    /// Distinct first segments of the eager-load paths, in order
    pub fn top_level_relations(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for path in &self.eager_load {
            let first = path.split('.').next().unwrap_or_default();
            if !first.is_empty() && !names.iter().any(|name| name == first) {
                names.push(first.to_string());
            }
        }
        names
    }

    /// Build the relation `name` with a descriptor for the related entity.
    ///
    /// Nested paths `name.rest` are attached to the related descriptor as
    /// `rest`, together with their customizers.
    pub fn get_relation(&self, name: &str) -> RestResult<Box<dyn Relation>> {
        let definition = self.entity.relations().get(name).ok_or_else(|| {
            RestError::Relationship(format!(
                "Call to undefined relationship [{}] on entity [{}]",
                name,
                self.entity.name()
            ))
        })?;

        let mut related = self.manager.query(definition.related.clone())?;
        let prefix = format!("{}.", name);

        let nested: Vec<String> = self
            .eager_load
            .iter()
            .filter_map(|path| path.strip_prefix(&prefix))
            .map(str::to_string)
            .collect();
        related.add_eager_loads(nested);

        for (path, customizer) in &self.customizers {
            if let Some(rest) = path.strip_prefix(&prefix) {
                related.customizers.insert(rest.to_string(), customizer.clone());
            }
        }
        if let Some(customizer) = self.customizers.get(name) {
            customizer(&mut related);
        }

        Ok(build_relation(definition, self.entity.as_ref(), related))
    }

    /// Let embedded relations mutate the primary request before it is sent
    pub(crate) fn apply_pre_relations(&mut self) -> RestResult<()> {
        for name in self.top_level_relations() {
            let relation = self.get_relation(&name)?;
            if relation.is_embedded() {
                relation.add_pre_constraints(self);
            }
        }
        Ok(())
    }

    /// Eager-load this descriptor's paths onto records that are already fetched
    pub async fn load(&self, records: &mut Vec<Record>) -> RestResult<()> {
        if records.is_empty() || self.eager_load.is_empty() {
            return Ok(());
        }
        self.eager_load_relations(records).await
    }

    pub(crate) async fn eager_load_relations(&self, records: &mut Vec<Record>) -> RestResult<()> {
        let mut relations: Vec<(String, Box<dyn Relation>)> = Vec::new();

        for name in self.top_level_relations() {
            let mut relation = self.get_relation(&name)?;
            relation.add_eager_constraints(records);
            relation.init_relation(records, &name);
            relations.push((name, relation));
        }

        // Every sibling fetch is started before any is awaited
        let results = join_all(relations.iter().map(|(_, relation)| relation.get_eager())).await;

        for ((name, relation), result) in relations.iter().zip(results) {
            match result {
                Ok(related) => relation.match_eager(records, related, name).await?,
                Err(err @ RestError::Relationship(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        "Eager load of [{}] on [{}] failed, leaving it null: {}",
                        name,
                        self.entity.name(),
                        err
                    );
                }
            }
        }

        Ok(())
    }
}
