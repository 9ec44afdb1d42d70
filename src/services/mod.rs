// Service exports
pub mod cache;
pub mod store;
pub mod transport;

pub use cache::ProfileCache;
pub use store::{CandidateFilter, PostgresProfileStore, ProfileStore, StoreError};
pub use transport::{Notifier, TransportError, WebhookNotifier};
