//! # symfind-core
//!
//! Shared vocabulary of the symbolic find criteria compiler: criteria values,
//! entity metadata, orderings, the boolean condition algebra emitted by the
//! compiler, and the criteria error taxonomy.

pub mod condition;
pub mod error;
pub mod metadata;
pub mod order;
pub mod value;

pub use condition::{Comparator, Condition, FieldRef};
pub use error::{CriteriaError, Result};
pub use metadata::{Association, EntityDescriptor, EntityMetadata, FieldType};
pub use order::{Direction, OrderBy};
pub use value::{BackedEnum, Value};
