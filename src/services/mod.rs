//! Business logic services layer

pub mod audit_service;
pub mod resolver;
pub mod signage_client;
pub mod unlock_service;

pub use audit_service::AuditService;
pub use resolver::DeviceResolver;
pub use signage_client::SignageClient;
pub use unlock_service::UnlockService;
