//! # symfind-orm
//!
//! Compiler for symbolic find criteria and the repository that runs them.
//!
//! Criteria keys embed their operators:
//!
//! | Prefix / suffix | Meaning |
//! |-----------------|---------|
//! | `(&`, `(\|`     | open an AND / OR group |
//! | `!(&`, `!(\|`   | open a negated group |
//! | `)`             | close the innermost group (may be omitted at the end) |
//! | `!`             | negate this term, `!!` cancels out |
//! | `=`, `<`, `<=`, `>`, `>=` | comparator, equality when absent |
//! | `a.b.c`         | field `c` reached by joining `a` then `b` |
//! | `:type`         | declared type of the bound parameter |
//! | `#FN(%s)`       | inline function applied to the field |
//! | `@AGG(%s)`      | aggregate; the term goes to HAVING |
//!
//! Compilation runs in phases: [`parser`] splits criteria into WHERE and
//! HAVING terms, [`resolver`] derives joins and result indexing, [`tree`]
//! builds the boolean expression, [`compiler`] turns each term into a leaf,
//! and [`assembler`] produces the [`Query`](query::Query) handed to a
//! [`Backend`](backend::Backend). The [`fast_path`] guard skips all of this
//! for plain equality criteria.

pub mod assembler;
pub mod backend;
pub mod compiler;
pub mod criteria;
pub mod criterion;
pub mod error;
pub mod fast_path;
pub mod parser;
pub mod parts;
pub mod query;
pub mod repository;
pub mod resolver;
pub mod settings;
pub mod tree;

pub use backend::{Backend, EqualityFilter, MetadataProvider};
pub use criteria::{Criteria, CriteriaEntry, CriteriaOptions, SearchRequest, SelectableCriteria};
pub use criterion::{Combinator, Criterion, CriterionBuilder, Junctor, Modifier};
pub use error::{FindError, FindResult};
pub use parts::QueryParts;
pub use query::{Join, Parameter, Projection, Query};
pub use repository::Repository;
pub use resolver::{JoinDescriptor, ROOT_ALIAS};
pub use settings::{RepositorySettings, SettingsError};
