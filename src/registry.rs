//! Extension registry: declared capability points, named extension
//! factories, and context-injecting resolution.
//!
//! A *point* is a named capability contract; an *extension* is a named
//! implementor registered under a point. Declaration, registration, and
//! resolution are separate steps so that consumers (like the scheduler)
//! treat a point purely as a capability name — new extensions are added by
//! registering, never by modifying the consumer.
//!
//! Extensions are stateless templates: `resolve` constructs a fresh
//! instance on every call, owning its [`ExtensionContext`] for the
//! duration of that call only.

use std::sync::Arc;

use crate::error::{HostError, Result};
use crate::host::Host;
use crate::settings::Settings;

/// Extension point for directly invokable applets.
pub const POINT_CALLABLE: &str = "callable";

/// Extension point for request/response API endpoints.
pub const POINT_API_ENDPOINT: &str = "api-endpoint";

/// Extension point for interval-scheduled recurring tasks.
pub const POINT_RECURRING_TASK: &str = "recurring-task";

/// Per-call bundle injected into every resolved extension.
///
/// Constructed fresh by the registry on each `resolve`; owned exclusively
/// by the resolved instance and never retained beyond the call.
#[derive(Debug, Clone)]
pub struct ExtensionContext {
    settings: Arc<Settings>,
    scope: String,
}

impl ExtensionContext {
    pub(crate) fn new(settings: Arc<Settings>, scope: String) -> Self {
        Self { settings, scope }
    }

    /// Read-only view of the host settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The `<point>::<name>` scope this context was resolved for.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// A tracing span scoped to this extension; extensions run their work
    /// inside it so log lines carry the `<point>::<name>` identity.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("extension", scope = %self.scope)
    }
}

/// A directly invokable applet.
pub trait Callable: Send {
    /// One-line human description of what invoking this callable does.
    fn describe(&self) -> String;

    /// Invoke the callable against the host.
    ///
    /// # Errors
    ///
    /// Returns whatever error the applet's own logic produces.
    fn call(&mut self, host: &Host) -> Result<serde_json::Value>;
}

/// A request/response endpoint.
pub trait ApiEndpoint: Send {
    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Returns whatever error the endpoint's own logic produces.
    fn handle(&mut self, host: &Host, request: &serde_json::Value) -> Result<serde_json::Value>;
}

/// A recurring task driven by the scheduler.
pub trait RecurringTask: Send {
    /// Interval literal, e.g. `"1H"`. Parsed once when task descriptors
    /// are derived at scheduler construction.
    fn interval(&self) -> &str;

    /// Run one pass of the task.
    ///
    /// # Errors
    ///
    /// Returns whatever error the task's own logic produces; the scheduler
    /// recovers it (logged, timestamp still advanced).
    fn execute(&mut self, host: &Host) -> Result<()>;
}

/// A freshly constructed extension instance, tagged by capability.
pub enum ExtensionInstance {
    /// An applet registered under [`POINT_CALLABLE`].
    Callable(Box<dyn Callable>),
    /// An endpoint registered under [`POINT_API_ENDPOINT`].
    Endpoint(Box<dyn ApiEndpoint>),
    /// A task registered under [`POINT_RECURRING_TASK`].
    Task(Box<dyn RecurringTask>),
}

impl ExtensionInstance {
    /// Unwrap to a callable, if that is this instance's capability.
    #[must_use]
    pub fn into_callable(self) -> Option<Box<dyn Callable>> {
        match self {
            Self::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// Unwrap to an endpoint, if that is this instance's capability.
    #[must_use]
    pub fn into_endpoint(self) -> Option<Box<dyn ApiEndpoint>> {
        match self {
            Self::Endpoint(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Unwrap to a recurring task, if that is this instance's capability.
    #[must_use]
    pub fn into_task(self) -> Option<Box<dyn RecurringTask>> {
        match self {
            Self::Task(task) => Some(task),
            _ => None,
        }
    }
}

/// Builds a fresh extension instance from a per-call context and
/// caller-supplied named arguments.
pub type ExtensionFactory =
    Box<dyn Fn(ExtensionContext, &serde_json::Value) -> Result<ExtensionInstance> + Send + Sync>;

struct PointTable {
    name: String,
    // Registration order is the enumeration and scheduling order.
    extensions: Vec<(String, ExtensionFactory)>,
}

/// Process-wide table of extension points and their registered extensions.
#[derive(Default)]
pub struct ExtensionRegistry {
    points: Vec<PointTable>,
}

impl ExtensionRegistry {
    /// An empty registry with no points declared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn point(&self, point: &str) -> Result<&PointTable> {
        self.points
            .iter()
            .find(|table| table.name == point)
            .ok_or_else(|| HostError::UnknownPoint {
                point: point.to_owned(),
            })
    }

    /// Declare a capability point.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::DuplicatePoint`] if the point is already declared.
    pub fn register_point(&mut self, point: &str) -> Result<()> {
        if self.points.iter().any(|table| table.name == point) {
            return Err(HostError::DuplicatePoint {
                point: point.to_owned(),
            });
        }
        self.points.push(PointTable {
            name: point.to_owned(),
            extensions: Vec::new(),
        });
        Ok(())
    }

    /// Register a named extension factory under a declared point.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownPoint`] if the point was never declared,
    /// or [`HostError::DuplicateExtension`] if the name is taken within it.
    pub fn register_extension(
        &mut self,
        point: &str,
        name: &str,
        factory: ExtensionFactory,
    ) -> Result<()> {
        let table = self
            .points
            .iter_mut()
            .find(|table| table.name == point)
            .ok_or_else(|| HostError::UnknownPoint {
                point: point.to_owned(),
            })?;

        if table.extensions.iter().any(|(existing, _)| existing == name) {
            return Err(HostError::DuplicateExtension {
                point: point.to_owned(),
                name: name.to_owned(),
            });
        }

        table.extensions.push((name.to_owned(), factory));
        Ok(())
    }

    /// Extension names under a point, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownPoint`] if the point was never declared.
    pub fn list_extensions(&self, point: &str) -> Result<Vec<String>> {
        Ok(self
            .point(point)?
            .extensions
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    /// Construct a fresh instance of a named extension.
    ///
    /// The context is consumed by the new instance; `args` carries any
    /// extension-specific construction arguments the caller supplies.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownPoint`] or [`HostError::UnknownExtension`]
    /// for lookup failures, or whatever the factory itself reports.
    pub fn resolve(
        &self,
        point: &str,
        name: &str,
        ctx: ExtensionContext,
        args: &serde_json::Value,
    ) -> Result<ExtensionInstance> {
        let table = self.point(point)?;
        let (_, factory) = table
            .extensions
            .iter()
            .find(|(existing, _)| existing == name)
            .ok_or_else(|| HostError::UnknownExtension {
                point: point.to_owned(),
                name: name.to_owned(),
            })?;

        tracing::debug!(point, name, %args, "resolving extension");
        factory(ctx, args)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    struct NullCallable {
        label: String,
    }

    impl Callable for NullCallable {
        fn describe(&self) -> String {
            self.label.clone()
        }
        fn call(&mut self, _host: &Host) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    struct EchoEndpoint;

    impl ApiEndpoint for EchoEndpoint {
        fn handle(
            &mut self,
            _host: &Host,
            request: &serde_json::Value,
        ) -> Result<serde_json::Value> {
            Ok(serde_json::json!({ "echo": request }))
        }
    }

    fn ctx(scope: &str) -> ExtensionContext {
        ExtensionContext::new(Arc::new(Settings::new()), scope.to_owned())
    }

    fn null_factory(label: &str) -> ExtensionFactory {
        let label = label.to_owned();
        Box::new(move |_ctx, _args| {
            Ok(ExtensionInstance::Callable(Box::new(NullCallable {
                label: label.clone(),
            })))
        })
    }

    #[test]
    fn duplicate_point_is_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry.register_point("callable").unwrap();
        assert!(matches!(
            registry.register_point("callable"),
            Err(HostError::DuplicatePoint { .. })
        ));
    }

    #[test]
    fn registering_under_undeclared_point_fails() {
        let mut registry = ExtensionRegistry::new();
        assert!(matches!(
            registry.register_extension("missing", "x", null_factory("x")),
            Err(HostError::UnknownPoint { .. })
        ));
    }

    #[test]
    fn duplicate_extension_name_within_point_is_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry.register_point("callable").unwrap();
        registry
            .register_extension("callable", "x", null_factory("x"))
            .unwrap();
        assert!(matches!(
            registry.register_extension("callable", "x", null_factory("x")),
            Err(HostError::DuplicateExtension { .. })
        ));
    }

    #[test]
    fn same_name_is_allowed_under_different_points() {
        let mut registry = ExtensionRegistry::new();
        registry.register_point("callable").unwrap();
        registry.register_point("recurring-task").unwrap();
        registry
            .register_extension("callable", "archive", null_factory("a"))
            .unwrap();
        registry
            .register_extension("recurring-task", "archive", null_factory("b"))
            .unwrap();
    }

    #[test]
    fn listing_preserves_registration_order() {
        let mut registry = ExtensionRegistry::new();
        registry.register_point("callable").unwrap();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register_extension("callable", name, null_factory(name))
                .unwrap();
        }
        assert_eq!(
            registry.list_extensions("callable").unwrap(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn listing_unknown_point_fails() {
        let registry = ExtensionRegistry::new();
        assert!(matches!(
            registry.list_extensions("missing"),
            Err(HostError::UnknownPoint { .. })
        ));
    }

    #[test]
    fn resolve_unknown_extension_and_point_are_distinct_errors() {
        let mut registry = ExtensionRegistry::new();
        registry.register_point("callable").unwrap();

        assert!(matches!(
            registry.resolve("missing", "x", ctx("missing::x"), &serde_json::Value::Null),
            Err(HostError::UnknownPoint { .. })
        ));
        assert!(matches!(
            registry.resolve("callable", "x", ctx("callable::x"), &serde_json::Value::Null),
            Err(HostError::UnknownExtension { .. })
        ));
    }

    #[test]
    fn resolve_constructs_a_fresh_instance_per_call() {
        let mut registry = ExtensionRegistry::new();
        registry.register_point("callable").unwrap();
        registry
            .register_extension("callable", "x", null_factory("instance"))
            .unwrap();

        for _ in 0..2 {
            let instance = registry
                .resolve("callable", "x", ctx("callable::x"), &serde_json::Value::Null)
                .unwrap();
            let callable = instance.into_callable().unwrap();
            assert_eq!(callable.describe(), "instance");
        }
    }

    #[test]
    fn resolved_endpoint_handles_requests() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(Settings::new(), dir.path().join("cache")).unwrap();

        let mut registry = ExtensionRegistry::new();
        registry.register_point("api-endpoint").unwrap();
        registry
            .register_extension(
                "api-endpoint",
                "echo",
                Box::new(|_ctx, _args| Ok(ExtensionInstance::Endpoint(Box::new(EchoEndpoint)))),
            )
            .unwrap();

        let instance = registry
            .resolve(
                "api-endpoint",
                "echo",
                ctx("api-endpoint::echo"),
                &serde_json::Value::Null,
            )
            .unwrap();
        let mut endpoint = instance.into_endpoint().unwrap();
        let response = endpoint
            .handle(&host, &serde_json::json!({ "ping": 1 }))
            .unwrap();
        assert_eq!(response["echo"]["ping"], 1);
    }

    #[test]
    fn endpoint_instance_is_not_a_callable() {
        let instance = ExtensionInstance::Endpoint(Box::new(EchoEndpoint));
        assert!(instance.into_callable().is_none());
    }

    #[test]
    fn context_carries_scope_and_settings() {
        let ctx = ctx("callable::x");
        assert_eq!(ctx.scope(), "callable::x");
        assert!(ctx.settings().get("anything").is_none());
    }

    #[test]
    fn instance_unwrap_is_capability_checked() {
        let instance = ExtensionInstance::Callable(Box::new(NullCallable {
            label: "x".to_owned(),
        }));
        assert!(instance.into_task().is_none());
    }
}
