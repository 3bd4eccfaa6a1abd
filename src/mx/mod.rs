//! Mail-exchanger resolution.
//!
//! [`MxResolver`] wraps any [`LookupMx`] implementation (the system
//! [`trust_dns_resolver::Resolver`] in production) and returns the exchanges
//! ranked by preference.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{LookupMx, MxResolver, system_resolver};
pub use types::MxHost;
