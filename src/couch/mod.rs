pub mod error;
pub mod transport;

pub use error::{SyncError, TransportError, UNREACHABLE_MESSAGE};
pub use transport::{HttpTransport, Transport, TransportConfig};
