pub mod agent;
pub mod bootstrap;
pub mod document;
pub mod pusher;
pub mod resolver;
pub mod test_utils;

pub use agent::{DEFAULT_BATCH_SIZE, PushAgent, PushPhase, SyncEvent, TargetEvent};
pub use bootstrap::{DatabaseState, ensure};
pub use document::{Document, DocumentSet, doc_id};
