pub mod catalog;
pub mod directory;

pub use catalog::{EventCatalog, EventSummary};
pub use directory::UserDirectory;

/// Boxed error type shared by the collaborator seams and storage traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
