//! Relation registry
//!
//! Each entity declares its relations explicitly: relation name to a
//! constructor returning a [`RelationDefinition`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use convert_case::{Case, Casing};

use crate::model::EntityRef;

/// Constructor for a relation definition
pub type RelationFactory = Arc<dyn Fn() -> RelationDefinition + Send + Sync>;

/// Strategy and keys of one relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Parent holds `foreign_key`, pointing at the related `other_key`
    BelongsTo {
        foreign_key: String,
        other_key: String,
    },
    /// Related records hold `foreign_key`, pointing at the parent `local_key`.
    /// `None` resolves to the parent entity's conventions.
    HasMany {
        foreign_key: Option<String>,
        local_key: Option<String>,
    },
    /// One related record embedded in the parent payload under `accessor`
    ComesWith {
        accessor: String,
        request_name: String,
    },
    /// Several related records embedded in the parent payload under `accessor`
    ComesWithMany {
        accessor: String,
        request_name: String,
    },
}

impl RelationKind {
    pub fn is_embedded(&self) -> bool {
        matches!(
            self,
            RelationKind::ComesWith { .. } | RelationKind::ComesWithMany { .. }
        )
    }
}

/// A relation declaration: the related entity and how to reach it
#[derive(Clone)]
pub struct RelationDefinition {
    pub related: EntityRef,
    pub kind: RelationKind,
}

impl fmt::Debug for RelationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDefinition")
            .field("related", &self.related.name())
            .field("kind", &self.kind)
            .finish()
    }
}

impl RelationDefinition {
    pub fn new(related: EntityRef, kind: RelationKind) -> Self {
        Self { related, kind }
    }

    pub fn is_embedded(&self) -> bool {
        self.kind.is_embedded()
    }
}

/// Relations declared by one entity
#[derive(Clone, Default)]
pub struct RelationRegistry {
    factories: BTreeMap<String, RelationFactory>,
}

impl fmt::Debug for RelationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationRegistry")
            .field("relations", &self.names())
            .finish()
    }
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> RelationDefinition + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// BelongsTo with `<relation>_id` as foreign key and the related key name as other key
    pub fn belongs_to(self, name: &str, related: EntityRef) -> Self {
        let foreign_key = format!("{}_id", name.to_case(Case::Snake));
        let other_key = related.key_name().to_string();
        self.belongs_to_with_keys(name, related, foreign_key, other_key)
    }

    pub fn belongs_to_with_keys(
        self,
        name: &str,
        related: EntityRef,
        foreign_key: impl Into<String>,
        other_key: impl Into<String>,
    ) -> Self {
        let kind = RelationKind::BelongsTo {
            foreign_key: foreign_key.into(),
            other_key: other_key.into(),
        };
        self.register(name, move || RelationDefinition::new(related.clone(), kind.clone()))
    }

    /// HasMany with the parent's foreign key and key name
    pub fn has_many(self, name: &str, related: EntityRef) -> Self {
        let kind = RelationKind::HasMany {
            foreign_key: None,
            local_key: None,
        };
        self.register(name, move || RelationDefinition::new(related.clone(), kind.clone()))
    }

    pub fn has_many_with_keys(
        self,
        name: &str,
        related: EntityRef,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        let kind = RelationKind::HasMany {
            foreign_key: Some(foreign_key.into()),
            local_key: Some(local_key.into()),
        };
        self.register(name, move || RelationDefinition::new(related.clone(), kind.clone()))
    }

    /// Embedded single record; accessor and request name default to the relation name
    pub fn comes_with(self, name: &str, related: EntityRef) -> Self {
        self.comes_with_as(name, related, name, name)
    }

    pub fn comes_with_as(
        self,
        name: &str,
        related: EntityRef,
        accessor: &str,
        request_name: &str,
    ) -> Self {
        let kind = RelationKind::ComesWith {
            accessor: accessor.to_string(),
            request_name: request_name.to_string(),
        };
        self.register(name, move || RelationDefinition::new(related.clone(), kind.clone()))
    }

    /// Embedded collection; accessor and request name default to the relation name
    pub fn comes_with_many(self, name: &str, related: EntityRef) -> Self {
        self.comes_with_many_as(name, related, name, name)
    }

    pub fn comes_with_many_as(
        self,
        name: &str,
        related: EntityRef,
        accessor: &str,
        request_name: &str,
    ) -> Self {
        let kind = RelationKind::ComesWithMany {
            accessor: accessor.to_string(),
            request_name: request_name.to_string(),
        };
        self.register(name, move || RelationDefinition::new(related.clone(), kind.clone()))
    }

    /// Build the definition for `name`
    pub fn get(&self, name: &str) -> Option<RelationDefinition> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}
