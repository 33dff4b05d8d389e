//! Service Container Contract
//!
//! The only capability the registry needs from a host's dependency-injection
//! container: fetch the current instance for a target, and replace it.

use std::collections::HashMap;

use super::token::TargetId;
use crate::common::ContainerError;

/// Minimal container capability used by `PatchRegistry::apply`
///
/// `get` must hand out an instance without removing it from the container,
/// so implementations typically store `Arc` handles.
pub trait ServiceContainer {
    type Instance;

    fn get(&self, target: &TargetId) -> Result<Self::Instance, ContainerError>;

    fn set(&mut self, target: &TargetId, instance: Self::Instance) -> Result<(), ContainerError>;
}

/// Map-backed container for hosts without their own, and for tests
#[derive(Debug, Clone)]
pub struct InMemoryContainer<I> {
    services: HashMap<TargetId, I>,
}

impl<I> InMemoryContainer<I> {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register an instance before patching
    pub fn provide(&mut self, target: impl Into<TargetId>, instance: I) -> &mut Self {
        self.services.insert(target.into(), instance);
        self
    }

    pub fn contains(&self, target: &str) -> bool {
        self.services.contains_key(target)
    }

    pub fn peek(&self, target: &str) -> Option<&I> {
        self.services.get(target)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl<I> Default for InMemoryContainer<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Clone> ServiceContainer for InMemoryContainer<I> {
    type Instance = I;

    fn get(&self, target: &TargetId) -> Result<I, ContainerError> {
        self.services
            .get(target)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(target.clone()))
    }

    /// Only replaces services that were provided; patches never introduce
    /// new targets.
    fn set(&mut self, target: &TargetId, instance: I) -> Result<(), ContainerError> {
        match self.services.get_mut(target) {
            Some(slot) => {
                *slot = instance;
                Ok(())
            }
            None => Err(ContainerError::NotFound(target.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let mut container = InMemoryContainer::new();
        container.provide("Clock", 1_u32);

        let id = TargetId::new("Clock");
        assert_eq!(container.get(&id).unwrap(), 1);
        container.set(&id, 2).unwrap();
        assert_eq!(container.peek("Clock"), Some(&2));
    }

    #[test]
    fn test_missing_target() {
        let mut container: InMemoryContainer<u32> = InMemoryContainer::new();
        let id = TargetId::new("Nope");
        assert!(matches!(container.get(&id), Err(ContainerError::NotFound(_))));
        assert!(matches!(container.set(&id, 1), Err(ContainerError::NotFound(_))));
        assert!(container.is_empty());
    }
}
