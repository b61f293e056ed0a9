//! # criteria
//!
//! A fluent criteria-query compiler: assemble an object-graph-aware query
//! from expression text through a stateful builder, and render it to a
//! SQL-derived object-query dialect. Dotted paths create implicit joins
//! against an in-process schema, and a built query can be split into the
//! count / id / content variants of an efficient pagination scheme, with
//! optional keyset continuation.
//!
//! ## Quick Start
//!
//! ```rust
//! use criteria::prelude::*;
//!
//! # fn main() -> criteria::Result<()> {
//! let schema = Schema::new()
//!     .register(
//!         EntityType::new("Document", "id")
//!             .basic("name")
//!             .to_one("owner", "Person"),
//!     )
//!     .register(EntityType::new("Person", "id").basic("name"));
//!
//! let query = CriteriaBuilder::new(schema, "Document", "d")?
//!     .select("d.name")?
//!     .where_("d.owner.name")?
//!     .eq("Karl")?
//!     .order_by_asc("d.id")?
//!     .query_string()?;
//!
//! assert_eq!(
//!     query,
//!     "SELECT d.name FROM Document d JOIN d.owner owner_1 \
//!      WHERE owner_1.name = :param_0 ORDER BY d.id ASC NULLS LAST"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Construction is single-owner and not thread safe; only the process-wide
//! parse cache is shared between queries, and it only hands out clones.

pub mod ast;
pub mod builder;
mod clause;
pub mod error;
mod join;
pub mod pagination;
mod params;
pub mod parser;
mod render;
pub mod schema;
pub mod value;

pub use builder::{CriteriaBuilder, JoinType};
pub use error::{CriteriaError, Result};
pub use pagination::{PageRequest, PaginatedCriteria};
pub use params::ParameterBinding;
pub use schema::{Attribute, AttributeKind, EntityType, Schema};
pub use value::Value;

pub mod prelude {
    pub use crate::builder::{CriteriaBuilder, JoinType};
    pub use crate::error::{CriteriaError, Result};
    pub use crate::pagination::{PageRequest, PaginatedCriteria};
    pub use crate::schema::{AttributeKind, EntityType, Schema};
    pub use crate::value::Value;
}
