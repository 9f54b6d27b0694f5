//! The standard middleware stack.

mod errors;
mod headers;
mod logger;
mod panics;

pub use errors::errors;
pub use headers::headers;
pub use logger::logger;
pub use panics::panics;

use super::Middleware;

/// Global middleware in execution order: logging, error translation, header
/// validation (when enforced), panic recovery.
pub fn standard(enforce_headers: bool) -> Vec<Middleware> {
    let mut mw = Vec::with_capacity(4);
    mw.push(logger());
    mw.push(errors());
    if enforce_headers {
        mw.push(headers());
    }
    mw.push(panics());
    mw
}
