//! In-process metamodel collaborator.
//!
//! The builder consults the schema for attribute resolution, join kinds
//! (nullability decides INNER vs LEFT for to-one paths), KEY vs INDEX
//! restrictions on indexed collection joins, and the unique-last-order-key
//! check performed when pagination parameters are supplied.

use hashbrown::HashMap;

/// How an attribute relates its owner to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Basic,
    ToOne,
    /// Key-indexed collection; implicit joins carry `KEY(alias) = index`.
    MapCollection,
    /// Position-indexed collection; implicit joins carry `INDEX(alias) = index`.
    ListCollection,
    /// Unindexed collection; array-index access is a resolution error.
    SetCollection,
}

impl AttributeKind {
    #[inline]
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            AttributeKind::MapCollection | AttributeKind::ListCollection | AttributeKind::SetCollection
        )
    }

    #[inline]
    pub fn is_relation(self) -> bool {
        self != AttributeKind::Basic
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    pub nullable: bool,
    pub unique: bool,
    /// Target entity for relations; `None` for basic attributes and
    /// basic-element collections.
    pub target: Option<String>,
}

/// An entity type with a designated identifier attribute.
#[derive(Debug, Clone)]
pub struct EntityType {
    name: String,
    id_attribute: String,
    attributes: HashMap<String, Attribute>,
}

impl EntityType {
    /// Creates an entity with a non-null unique `id` attribute under the
    /// given name.
    pub fn new(name: impl Into<String>, id_attribute: impl Into<String>) -> Self {
        let id_attribute = id_attribute.into();
        let mut entity = EntityType {
            name: name.into(),
            id_attribute: id_attribute.clone(),
            attributes: HashMap::new(),
        };
        entity.attributes.insert(
            id_attribute.clone(),
            Attribute {
                name: id_attribute,
                kind: AttributeKind::Basic,
                nullable: false,
                unique: true,
                target: None,
            },
        );
        entity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    // ==================== fluent definition ====================

    pub fn basic(self, name: &str) -> Self {
        self.add(name, AttributeKind::Basic, true, false, None)
    }

    pub fn basic_unique(self, name: &str) -> Self {
        self.add(name, AttributeKind::Basic, false, true, None)
    }

    pub fn to_one(self, name: &str, target: &str) -> Self {
        self.add(name, AttributeKind::ToOne, false, false, Some(target))
    }

    pub fn to_one_nullable(self, name: &str, target: &str) -> Self {
        self.add(name, AttributeKind::ToOne, true, false, Some(target))
    }

    pub fn map_of(self, name: &str, target: &str) -> Self {
        self.add(name, AttributeKind::MapCollection, true, false, Some(target))
    }

    /// A map whose values are basic (non-entity) elements.
    pub fn map_of_basic(self, name: &str) -> Self {
        self.add(name, AttributeKind::MapCollection, true, false, None)
    }

    pub fn list_of(self, name: &str, target: &str) -> Self {
        self.add(name, AttributeKind::ListCollection, true, false, Some(target))
    }

    pub fn set_of(self, name: &str, target: &str) -> Self {
        self.add(name, AttributeKind::SetCollection, true, false, Some(target))
    }

    fn add(
        mut self,
        name: &str,
        kind: AttributeKind,
        nullable: bool,
        unique: bool,
        target: Option<&str>,
    ) -> Self {
        self.attributes.insert(
            name.to_owned(),
            Attribute {
                name: name.to_owned(),
                kind,
                nullable,
                unique,
                target: target.map(str::to_owned),
            },
        );
        self
    }
}

/// A registry of entity types.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<String, EntityType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, entity: EntityType) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn entity(&self, name: &str) -> Option<&EntityType> {
        self.entities.get(name)
    }
}
