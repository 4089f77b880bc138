pub mod data_driven;
pub mod error;
pub mod provider;
pub mod registry;
pub mod secret_stores;
pub mod service;
pub mod services_builtin;

pub use error::{ProviderError, RegistryError, ServiceError};
pub use provider::Provider;
pub use registry::Registry;
pub use service::{
    OnConflict, PlanStep, RotationConstraints, RotationPlan, RotationRequest, RotationResult, Service,
};
