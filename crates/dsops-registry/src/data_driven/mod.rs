mod model;
mod repository;

pub use model::{PrincipalDef, RotationPolicyDef, ServiceInstanceDef, ServiceTypeDef};
pub use repository::DataDrivenRegistry;
