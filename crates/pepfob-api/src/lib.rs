// pepfob-api: Async Rust client for the Peplink router administrative API

pub mod auth;
pub mod error;
pub mod router;
pub mod transport;

pub use auth::{AuthContext, ClientScope};
pub use error::Error;
pub use reqwest::Method;
pub use router::RouterClient;
pub use router::models;
pub use router::{decode, paths, wan_query};
pub use transport::{TlsMode, TransportConfig};
