//! Vetrina: a multi-tenant storefront rendering core.
//!
//! Requests arrive with a Host header, resolve to a tenant, and come back as
//! fully rendered HTML: templates compiled once and cached, data fetched
//! under a hard deadline, assets deduplicated and injected into the layout.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod template;
