pub mod engine;
pub mod error;
pub mod notifier;
pub mod rollback;
pub mod storage;

pub use engine::{RotationEngine, RotationOutcome};
pub use error::{PolicyError, RotationError, StorageError};
pub use notifier::{DeliveryResult, NotificationEvent, Notifier};
pub use rollback::{RollbackAction, RollbackManager, RollbackPlan, RollbackRequest};
pub use storage::RotationStorage;
