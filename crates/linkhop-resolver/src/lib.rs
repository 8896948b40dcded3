//! Short code allocation, cache-aside resolution and the redirect path.
//!
//! [`ResolutionService`] owns the read/write logic against a [`UrlStore`]
//! and a [`LinkCache`]; [`Redirector`] layers click recording on top of it.
//!
//! [`UrlStore`]: linkhop_core::UrlStore
//! [`LinkCache`]: linkhop_core::LinkCache

pub mod config;
pub mod error;
pub mod redirector;
pub mod service;

pub use config::ResolverConfig;
pub use error::{ResolutionError, Result};
pub use redirector::Redirector;
pub use service::{CreateLink, ResolutionService};
