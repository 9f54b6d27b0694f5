//! Request extractors: per-request context and the required header set.

pub mod context;
pub mod headers;
pub use headers::RequiredHeaders;
