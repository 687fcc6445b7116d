pub mod entities;
pub mod error;
pub mod handle;
pub mod navigation;

pub use error::DomainError;
