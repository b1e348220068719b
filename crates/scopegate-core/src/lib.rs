pub mod catalog;
pub mod definition;
pub mod document;
pub mod identity;
pub mod ownership;
pub mod policy;
pub mod registry;

pub use definition::{PolicyDefinition, PolicyDefinitionError, ReadVisibility};
pub use document::Document;
pub use identity::{CallerIdentity, IdentityAttribute};
pub use ownership::OwnershipPredicate;
pub use policy::Policy;
pub use registry::{PolicyRegistry, PolicyRegistryBuilder};
