//! The host application.
//!
//! Owns the settings, the extension registry, and the disk cache, and is
//! the single place that constructs per-call extension contexts. There is
//! no ambient global state: one `Host` is built at startup and passed by
//! reference into the scheduler and into extensions.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::DiskCache;
use crate::error::{HostError, Result};
use crate::registry::{
    ExtensionContext, ExtensionInstance, ExtensionRegistry, POINT_API_ENDPOINT, POINT_CALLABLE,
    POINT_RECURRING_TASK,
};
use crate::settings::Settings;

/// The automation host: settings, registry, and cache.
pub struct Host {
    settings: Arc<Settings>,
    registry: ExtensionRegistry,
    cache: DiskCache,
}

impl Host {
    /// Create a host with the built-in extension points declared.
    ///
    /// Extensions (built-in plugins included) are registered afterwards
    /// through [`registry_mut`].
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    ///
    /// [`registry_mut`]: Self::registry_mut
    pub fn new(settings: Settings, cache_dir: PathBuf) -> Result<Self> {
        let mut registry = ExtensionRegistry::new();
        registry.register_point(POINT_CALLABLE)?;
        registry.register_point(POINT_API_ENDPOINT)?;
        registry.register_point(POINT_RECURRING_TASK)?;

        let cache = DiskCache::new(cache_dir)?;

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            cache,
        })
    }

    /// Read-only view of the host settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The disk-backed content cache.
    #[must_use]
    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// The extension registry (lookups only).
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Mutable registry access for startup-time extension registration.
    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.registry
    }

    /// Resolve an extension, injecting a fresh per-call context scoped
    /// `<point>::<name>`.
    ///
    /// # Errors
    ///
    /// Propagates registry lookup errors and factory failures.
    pub fn resolve(
        &self,
        point: &str,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<ExtensionInstance> {
        let ctx = ExtensionContext::new(Arc::clone(&self.settings), format!("{point}::{name}"));
        self.registry.resolve(point, name, ctx, args)
    }

    /// Print a user-facing notification.
    ///
    /// Each action is a `(label, callable name)` pair; the callable is
    /// resolved and its description printed next to the label.
    ///
    /// # Errors
    ///
    /// Returns an error when an action names an unknown callable.
    pub fn notify(
        &self,
        summary: &str,
        body: Option<&str>,
        actions: &[(String, String)],
    ) -> Result<()> {
        println!("*{summary}*");
        if let Some(body) = body {
            println!("{body}");
        }

        for (label, name) in actions {
            let instance = self.resolve(POINT_CALLABLE, name, &serde_json::Value::Null)?;
            let callable = instance
                .into_callable()
                .ok_or_else(|| HostError::WrongCapability {
                    point: POINT_CALLABLE.to_owned(),
                    name: name.clone(),
                })?;
            println!("{label}: {}", callable.describe());
        }

        Ok(())
    }
}
