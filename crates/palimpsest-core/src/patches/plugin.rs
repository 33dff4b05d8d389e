//! Patch Module Lifecycle
//!
//! Two explicit phases replace filesystem-driven dynamic loading:
//! `discover` produces an ordered list of module references, and `load_all`
//! runs each module's registration against a registry in that order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use globset::{GlobSet, GlobSetBuilder};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::registry::PatchRegistry;
use crate::common::{is_hidden, module_name, relative_to, ConfigError, PatchError, PatchResult};
use crate::config::NamingConvention;

/// A discovered patch module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    /// Root-relative path without its final extension, e.g. `server/mail.patch`
    pub name: String,
    pub path: PathBuf,
}

/// Produces the ordered list of modules to load
pub trait ModuleDiscovery {
    fn discover(&self) -> PatchResult<Vec<ModuleRef>>;
}

/// A fixed list, for hosts that enumerate modules themselves
impl ModuleDiscovery for Vec<ModuleRef> {
    fn discover(&self) -> PatchResult<Vec<ModuleRef>> {
        Ok(self.clone())
    }
}

/// Discovers modules by matching root-relative paths against glob patterns
#[derive(Debug, Clone)]
pub struct GlobDiscovery {
    root: PathBuf,
    patterns: GlobSet,
}

impl GlobDiscovery {
    pub fn new(root: impl Into<PathBuf>, patterns: &[&str]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = globset::Glob::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let patterns = builder
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: patterns.join(", "),
                source,
            })?;

        Ok(Self {
            root: root.into(),
            patterns,
        })
    }

    /// Discover the server-side extension files named by `conventions`
    pub fn from_conventions(
        root: impl Into<PathBuf>,
        conventions: &[NamingConvention],
    ) -> Result<Self, ConfigError> {
        let patterns: Vec<&str> = conventions
            .iter()
            .filter(|c| c.kind.is_extension_file())
            .map(|c| c.pattern.as_str())
            .collect();
        Self::new(root, &patterns)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModuleDiscovery for GlobDiscovery {
    fn discover(&self) -> PatchResult<Vec<ModuleRef>> {
        let mut modules = Vec::new();

        if !self.root.exists() {
            info!("Patch module directory does not exist: {:?}", self.root);
            return Ok(modules);
        }

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| PatchError::Discovery(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || is_hidden(path) {
                continue;
            }
            let Some(rel) = relative_to(path, &self.root) else {
                continue;
            };
            if !self.patterns.is_match(&rel) {
                continue;
            }

            let name = module_name(&rel).to_string();
            debug!("Discovered patch module {} at {:?}", name, path);
            modules.push(ModuleRef {
                name,
                path: path.to_path_buf(),
            });
        }

        info!("Discovered {} patch modules under {:?}", modules.len(), self.root);
        Ok(modules)
    }
}

/// A unit of registration side effects
pub trait PatchModule<I> {
    fn register(&self, registry: &mut PatchRegistry<I>) -> PatchResult<()>;
}

impl<I, F> PatchModule<I> for F
where
    F: Fn(&mut PatchRegistry<I>) -> PatchResult<()>,
{
    fn register(&self, registry: &mut PatchRegistry<I>) -> PatchResult<()> {
        self(registry)
    }
}

/// Compiled-in patch modules, keyed by discovered module name
pub struct ModuleCatalog<I> {
    modules: HashMap<String, Box<dyn PatchModule<I> + Send + Sync>>,
}

impl<I> ModuleCatalog<I> {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    pub fn with<M>(mut self, name: impl Into<String>, module: M) -> Self
    where
        M: PatchModule<I> + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Box::new(module));
        self
    }

    pub fn get(&self, name: &str) -> Option<&(dyn PatchModule<I> + Send + Sync)> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl<I> Default for ModuleCatalog<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run each module's registration in discovery order
///
/// Fails fast on a module missing from the catalog or a failing registration.
/// Returns the number of patches the modules registered.
pub fn load_all<I>(
    modules: &[ModuleRef],
    catalog: &ModuleCatalog<I>,
    registry: &mut PatchRegistry<I>,
) -> PatchResult<usize> {
    let before = registry.len();

    for module_ref in modules {
        let module = catalog
            .get(&module_ref.name)
            .ok_or_else(|| PatchError::UnknownModule(module_ref.name.clone()))?;
        module
            .register(registry)
            .map_err(|e| PatchError::ModuleRegistration {
                module: module_ref.name.clone(),
                source: Box::new(e),
            })?;
        debug!("Loaded patch module {}", module_ref.name);
    }

    let registered = registry.len() - before;
    info!(
        "Loaded {} patch modules ({} patches registered)",
        modules.len(),
        registered
    );
    Ok(registered)
}

/// Discover, then load
pub fn discover_and_load<I, D>(
    discovery: &D,
    catalog: &ModuleCatalog<I>,
    registry: &mut PatchRegistry<I>,
) -> PatchResult<usize>
where
    D: ModuleDiscovery + ?Sized,
{
    let modules = discovery.discover()?;
    load_all(&modules, catalog, registry)
}
