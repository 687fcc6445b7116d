//! Cache-first data fetchers over the storage ports.

mod content;
mod navigation;
mod products;
mod stores;

pub use content::ContentFetcher;
pub use navigation::NavigationFetcher;
pub use products::ProductFetcher;
pub use stores::StoreFetcher;
