//! Application services layer.

pub mod context;
pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod reload;
pub mod repos;
