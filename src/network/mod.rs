pub mod client;
pub mod registry;
pub mod sync;

pub use client::{HttpClient, NodeClient};
pub use registry::{PeerRegistry, normalize_address};
