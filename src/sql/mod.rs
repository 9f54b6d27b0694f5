//! Named-parameter query engine: placeholders, typed binds, execution and
//! pagination. Identifiers only come from code; values are always bound.

pub mod named;
pub mod pagination;
pub mod params;
pub mod query;

pub use named::{NamedArgs, NamedQuery, ToNamedArgs};
pub use pagination::{Direction, Pagination, PaginationConfig};
pub use params::PgBindValue;
pub use query::{execute, query_many, query_one, translate, DbResult, DATA_NOT_FOUND};
