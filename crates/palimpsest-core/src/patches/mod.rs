//! Service Patching
//!
//! Declarative service replacement applied to an external container at
//! process startup.

pub mod container;
pub mod plugin;
pub mod registry;
pub mod token;

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::Lazy;

pub use container::{InMemoryContainer, ServiceContainer};
pub use plugin::{
    discover_and_load, load_all, GlobDiscovery, ModuleCatalog, ModuleDiscovery, ModuleRef,
    PatchModule,
};
pub use registry::{ApplyReport, PatchFactory, PatchRegistry, ServicePatch, SharedRegistry};
pub use token::TargetId;

/// Type-erased service instance for containers holding heterogeneous services
pub type AnyService = Arc<dyn Any + Send + Sync>;

/// Process-wide registry for hosts that register patches from scattered
/// startup code. Tests should build their own `PatchRegistry` instead.
static GLOBAL_REGISTRY: Lazy<SharedRegistry<AnyService>> = Lazy::new(SharedRegistry::new);

/// Handle to the process-wide registry
pub fn global_registry() -> SharedRegistry<AnyService> {
    GLOBAL_REGISTRY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_service_downcast_through_patch() {
        let mut container: InMemoryContainer<AnyService> = InMemoryContainer::new();
        container.provide("Greeting", Arc::new("hello".to_string()) as AnyService);

        let mut registry: PatchRegistry<AnyService> = PatchRegistry::new();
        registry
            .register(ServicePatch::new("Greeting", |original: AnyService| {
                let text = original
                    .downcast_ref::<String>()
                    .ok_or("Greeting is not a String")?;
                Ok(Arc::new(format!("{}, world", text)) as AnyService)
            }))
            .unwrap();
        registry.apply(&mut container).unwrap();

        let patched = container.peek("Greeting").unwrap();
        assert_eq!(
            patched.downcast_ref::<String>().map(String::as_str),
            Some("hello, world")
        );
    }

    #[test]
    fn test_global_registry_handles_share_one_registry() {
        let a = global_registry();
        a.register(ServicePatch::new("GlobalProbe", |s: AnyService| Ok(s)))
            .unwrap();

        let b = global_registry();
        assert!(b
            .lock()
            .patches()
            .any(|p| p.target().as_str() == "GlobalProbe"));
    }
}
