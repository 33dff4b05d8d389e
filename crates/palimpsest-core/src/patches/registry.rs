//! Patch Registry
//!
//! Collects service-replacement requests and applies them to a container in
//! registration order. Once a full application succeeds the registry is
//! sealed and further registrations fail.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexSet;
use tracing::{debug, error, info};

use super::container::ServiceContainer;
use super::token::TargetId;
use crate::common::{ApplyStage, BoxError, PatchError, PatchResult};

/// Builds the patched instance from the original
pub type PatchFactory<I> = Box<dyn Fn(I) -> Result<I, BoxError> + Send + Sync>;

/// A request to replace the instance registered under `target`
pub struct ServicePatch<I> {
    target: TargetId,
    factory: PatchFactory<I>,
    description: Option<String>,
    overridden_operations: IndexSet<String>,
}

impl<I> ServicePatch<I> {
    pub fn new<F>(target: impl Into<TargetId>, factory: F) -> Self
    where
        F: Fn(I) -> Result<I, BoxError> + Send + Sync + 'static,
    {
        Self {
            target: target.into(),
            factory: Box::new(factory),
            description: None,
            overridden_operations: IndexSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Record which operations the patched instance implements itself.
    /// Duplicates are dropped; first occurrence keeps its position.
    pub fn with_operations<S: Into<String>>(mut self, ops: impl IntoIterator<Item = S>) -> Self {
        for op in ops {
            self.overridden_operations.insert(op.into());
        }
        self
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn overridden_operations(&self) -> &IndexSet<String> {
        &self.overridden_operations
    }

    fn apply_to<C>(&self, container: &mut C) -> PatchResult<()>
    where
        C: ServiceContainer<Instance = I>,
    {
        let fail = |stage: ApplyStage, source: BoxError| PatchError::Apply {
            target: self.target.clone(),
            stage,
            source,
        };

        let original = container
            .get(&self.target)
            .map_err(|e| fail(ApplyStage::Get, e.into()))?;
        let patched = (self.factory)(original).map_err(|e| fail(ApplyStage::Factory, e))?;
        container
            .set(&self.target, patched)
            .map_err(|e| fail(ApplyStage::Set, e.into()))
    }
}

impl<I> fmt::Debug for ServicePatch<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePatch")
            .field("target", &self.target)
            .field("description", &self.description)
            .field("overridden_operations", &self.overridden_operations)
            .finish_non_exhaustive()
    }
}

struct RegisteredPatch<I> {
    patch: ServicePatch<I>,
    applied: bool,
}

/// Outcome of a successful `PatchRegistry::apply`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    /// Patches applied by this call
    pub applied: usize,
    /// Index of the first patch this call applied; non-zero when an earlier
    /// call failed part-way through
    pub resumed_from: usize,
}

/// Ordered registry of service patches
///
/// Each patch remembers whether it has been applied. A failed `apply` leaves
/// the successful prefix marked, and the next `apply` resumes at the first
/// unapplied patch, so no instance is ever wrapped twice.
pub struct PatchRegistry<I> {
    patches: Vec<RegisteredPatch<I>>,
    applied: bool,
}

impl<I> PatchRegistry<I> {
    pub fn new() -> Self {
        Self {
            patches: Vec::new(),
            applied: false,
        }
    }

    /// Queue a patch. Fails once the registry has been applied.
    pub fn register(&mut self, patch: ServicePatch<I>) -> PatchResult<()> {
        if self.applied {
            return Err(PatchError::RegistrationAfterApply {
                target: patch.target.clone(),
            });
        }

        debug!(service = %patch.target, "Registered service patch");
        self.patches.push(RegisteredPatch {
            patch,
            applied: false,
        });
        Ok(())
    }

    /// Apply every pending patch to `container`, strictly in registration order
    ///
    /// Stops at the first failure and returns it; the registry stays open in
    /// that case.
    pub fn apply<C>(&mut self, container: &mut C) -> PatchResult<ApplyReport>
    where
        C: ServiceContainer<Instance = I>,
    {
        let resumed_from = self
            .patches
            .iter()
            .position(|p| !p.applied)
            .unwrap_or(self.patches.len());
        if resumed_from > 0 && resumed_from < self.patches.len() {
            info!(
                "Resuming service patches at #{} ({} already applied)",
                resumed_from, resumed_from
            );
        }

        let mut applied = 0;
        for entry in self.patches.iter_mut().filter(|p| !p.applied) {
            if let Err(e) = entry.patch.apply_to(container) {
                error!("Service patch application aborted: {}", e);
                return Err(e);
            }
            entry.applied = true;
            applied += 1;
            debug!(service = %entry.patch.target, "Applied service patch");
        }

        self.applied = true;
        info!("Applied {} service patches", applied);
        Ok(ApplyReport {
            applied,
            resumed_from,
        })
    }

    /// Drop all patches and reopen the registry
    pub fn reset(&mut self) {
        self.patches.clear();
        self.applied = false;
    }

    pub fn patches(&self) -> impl Iterator<Item = &ServicePatch<I>> {
        self.patches.iter().map(|p| &p.patch)
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Patches not yet applied to a container
    pub fn pending(&self) -> usize {
        self.patches.iter().filter(|p| !p.applied).count()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

impl<I> Default for PatchRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> fmt::Debug for PatchRegistry<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchRegistry")
            .field("patches", &self.patches.len())
            .field("pending", &self.pending())
            .field("applied", &self.applied)
            .finish()
    }
}

/// Cloneable handle to one registry, for hosts that register from several
/// places during startup
///
/// Calls are serialized by the inner mutex; concurrent startup phases are
/// still the caller's problem.
pub struct SharedRegistry<I> {
    inner: Arc<Mutex<PatchRegistry<I>>>,
}

impl<I> SharedRegistry<I> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PatchRegistry::new())),
        }
    }

    /// Lock the registry. A panic in another holder does not invalidate it.
    pub fn lock(&self) -> MutexGuard<'_, PatchRegistry<I>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, patch: ServicePatch<I>) -> PatchResult<()> {
        self.lock().register(patch)
    }

    pub fn apply<C>(&self, container: &mut C) -> PatchResult<ApplyReport>
    where
        C: ServiceContainer<Instance = I>,
    {
        self.lock().apply(container)
    }

    pub fn is_applied(&self) -> bool {
        self.lock().is_applied()
    }
}

impl<I> Clone for SharedRegistry<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I> Default for SharedRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ContainerError;
    use crate::patches::InMemoryContainer;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    trait Mailer: Send + Sync {
        fn send(&self, to: &str) -> String;
        fn transport(&self) -> String;
    }

    struct SmtpMailer;

    impl Mailer for SmtpMailer {
        fn send(&self, to: &str) -> String {
            format!("smtp:{}", to)
        }

        fn transport(&self) -> String {
            "smtp".to_string()
        }
    }

    /// Overrides `send`, forwards everything else to the original
    struct AuditedMailer {
        inner: Arc<dyn Mailer>,
    }

    impl Mailer for AuditedMailer {
        fn send(&self, to: &str) -> String {
            format!("audited[{}]", self.inner.send(to))
        }

        fn transport(&self) -> String {
            self.inner.transport()
        }
    }

    fn mail_container() -> InMemoryContainer<Arc<dyn Mailer>> {
        let mut container = InMemoryContainer::new();
        container.provide("Mailer", Arc::new(SmtpMailer) as Arc<dyn Mailer>);
        container
    }

    fn counter_container() -> InMemoryContainer<u32> {
        let mut container = InMemoryContainer::new();
        container.provide("A", 1).provide("B", 10).provide("C", 100);
        container
    }

    #[test]
    fn test_delegating_adapter() {
        let mut container = mail_container();
        let mut registry = PatchRegistry::new();
        registry
            .register(
                ServicePatch::new("Mailer", |original: Arc<dyn Mailer>| {
                    Ok(Arc::new(AuditedMailer { inner: original }) as Arc<dyn Mailer>)
                })
                .with_description("Audit outgoing mail")
                .with_operations(["send", "send"]),
            )
            .unwrap();

        let report = registry.apply(&mut container).unwrap();
        assert_eq!(report.applied, 1);

        let mailer = container.peek("Mailer").unwrap();
        assert_eq!(mailer.send("ops@example.com"), "audited[smtp:ops@example.com]");
        assert_eq!(mailer.transport(), "smtp");
        let patch = registry.patches().next().unwrap();
        assert_eq!(patch.overridden_operations().len(), 1);
        assert_eq!(patch.description(), Some("Audit outgoing mail"));
    }

    #[test]
    fn test_patches_apply_in_registration_order() {
        let mut container = counter_container();
        let mut registry = PatchRegistry::new();
        registry
            .register(ServicePatch::new("A", |v: u32| Ok(v + 1)))
            .unwrap();
        registry
            .register(ServicePatch::new("A", |v: u32| Ok(v * 10)))
            .unwrap();

        registry.apply(&mut container).unwrap();
        // (1 + 1) * 10, not 1 * 10 + 1
        assert_eq!(container.peek("A"), Some(&20));
    }

    #[test]
    fn test_register_after_apply_fails() {
        let mut container = counter_container();
        let mut registry = PatchRegistry::new();
        registry
            .register(ServicePatch::new("A", |v: u32| Ok(v + 1)))
            .unwrap();
        registry.apply(&mut container).unwrap();

        for _ in 0..3 {
            let err = registry
                .register(ServicePatch::new("B", |v: u32| Ok(v)))
                .unwrap_err();
            assert!(matches!(err, PatchError::RegistrationAfterApply { .. }));
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_apply_empty_registry() {
        let mut container = counter_container();
        let mut registry: PatchRegistry<u32> = PatchRegistry::new();

        let report = registry.apply(&mut container).unwrap();
        assert_eq!(report.applied, 0);
        assert!(registry.is_applied());
    }

    #[test]
    fn test_failed_apply_stops_and_stays_open() {
        let mut container = counter_container();
        let mut registry = PatchRegistry::new();
        let third_called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&third_called);

        registry
            .register(ServicePatch::new("A", |v: u32| Ok(v + 1)))
            .unwrap();
        registry
            .register(ServicePatch::new("B", |_: u32| Err("boom".into())))
            .unwrap();
        registry
            .register(ServicePatch::new("C", move |v: u32| {
                flag.store(true, Ordering::SeqCst);
                Ok(v + 1)
            }))
            .unwrap();

        let err = registry.apply(&mut container).unwrap_err();
        assert_eq!(err.target().map(TargetId::as_str), Some("B"));
        assert!(matches!(
            err,
            PatchError::Apply {
                stage: ApplyStage::Factory,
                ..
            }
        ));
        assert_eq!(container.peek("A"), Some(&2));
        assert_eq!(container.peek("B"), Some(&10));
        assert!(!third_called.load(Ordering::SeqCst));
        assert!(!registry.is_applied());
        assert_eq!(registry.pending(), 2);
    }

    #[test]
    fn test_retry_after_failure_does_not_double_apply() {
        let mut container = counter_container();
        let mut registry = PatchRegistry::new();
        let should_fail = Arc::new(AtomicBool::new(true));
        let fail_flag = Arc::clone(&should_fail);

        registry
            .register(ServicePatch::new("A", |v: u32| Ok(v + 1)))
            .unwrap();
        registry
            .register(ServicePatch::new("B", move |v: u32| {
                if fail_flag.load(Ordering::SeqCst) {
                    Err("not yet".into())
                } else {
                    Ok(v + 1)
                }
            }))
            .unwrap();

        assert!(registry.apply(&mut container).is_err());
        should_fail.store(false, Ordering::SeqCst);

        let report = registry.apply(&mut container).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.resumed_from, 1);
        assert_eq!(container.peek("A"), Some(&2));
        assert_eq!(container.peek("B"), Some(&11));
        assert!(registry.is_applied());
    }

    #[test]
    fn test_missing_target_reports_get_stage() {
        let mut container = counter_container();
        let mut registry = PatchRegistry::new();
        registry
            .register(ServicePatch::new("Missing", |v: u32| Ok(v)))
            .unwrap();

        let err = registry.apply(&mut container).unwrap_err();
        assert!(matches!(
            err,
            PatchError::Apply {
                stage: ApplyStage::Get,
                ..
            }
        ));
    }

    /// Refuses to replace read-only targets
    struct SealedContainer {
        inner: InMemoryContainer<u32>,
        sealed: &'static str,
    }

    impl ServiceContainer for SealedContainer {
        type Instance = u32;

        fn get(&self, target: &TargetId) -> Result<u32, ContainerError> {
            self.inner.get(target)
        }

        fn set(&mut self, target: &TargetId, instance: u32) -> Result<(), ContainerError> {
            if target.as_str() == self.sealed {
                return Err(ContainerError::Rejected {
                    target: target.clone(),
                    reason: "read-only service".to_string(),
                });
            }
            self.inner.set(target, instance)
        }
    }

    #[test]
    fn test_rejected_set_reports_set_stage() {
        let mut container = SealedContainer {
            inner: counter_container(),
            sealed: "B",
        };
        let mut registry = PatchRegistry::new();
        registry
            .register(ServicePatch::new("A", |v: u32| Ok(v + 1)))
            .unwrap();
        registry
            .register(ServicePatch::new("B", |v: u32| Ok(v + 1)))
            .unwrap();

        let err = registry.apply(&mut container).unwrap_err();
        assert_eq!(err.target().map(TargetId::as_str), Some("B"));
        assert!(matches!(
            err,
            PatchError::Apply {
                stage: ApplyStage::Set,
                ..
            }
        ));
        let source = std::error::Error::source(&err).unwrap().to_string();
        assert!(source.contains("read-only service"));
        assert_eq!(container.inner.peek("A"), Some(&2));
        assert_eq!(container.inner.peek("B"), Some(&10));
        assert!(!registry.is_applied());
    }

    #[test]
    fn test_second_apply_is_noop() {
        let mut container = counter_container();
        let mut registry = PatchRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry
            .register(ServicePatch::new("A", move |v: u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(v + 1)
            }))
            .unwrap();

        registry.apply(&mut container).unwrap();
        let report = registry.apply(&mut container).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(container.peek("A"), Some(&2));
    }

    #[test]
    fn test_reset_reopens_registry() {
        let mut container = counter_container();
        let mut registry = PatchRegistry::new();
        registry
            .register(ServicePatch::new("A", |v: u32| Ok(v + 1)))
            .unwrap();
        registry.apply(&mut container).unwrap();

        registry.reset();
        assert!(!registry.is_applied());
        assert!(registry.is_empty());
        assert!(registry
            .register(ServicePatch::new("A", |v: u32| Ok(v)))
            .is_ok());
    }

    #[test]
    fn test_shared_registry_handles_share_state() {
        let shared: SharedRegistry<u32> = SharedRegistry::new();
        let other = shared.clone();
        other
            .register(ServicePatch::new("C", |v: u32| Ok(v + 5)))
            .unwrap();

        let mut container = counter_container();
        let report = shared.apply(&mut container).unwrap();
        assert_eq!(report.applied, 1);
        assert!(other.is_applied());
        assert_eq!(container.peek("C"), Some(&105));
    }
}
