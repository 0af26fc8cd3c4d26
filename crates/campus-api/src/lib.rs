// campus-api: Async HTTP adapters for the school-management resource services

pub mod client;
pub mod error;
pub mod filters;
pub mod page;
pub mod resource;
pub mod transport;

pub use client::ResourceClient;
pub use error::{Error, ErrorKind, timeout_secs};
pub use filters::Filters;
pub use page::{Page, item_id};
pub use resource::{ResourceKind, Service};
pub use transport::{TlsMode, TransportConfig};
