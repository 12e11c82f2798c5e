//! Page dispatch.
//!
//! A request names a page and carries a JSON payload. The dispatcher resolves the page's
//! controller through the [`ControllerRegistry`], runs it, and renders the [`ViewDescriptor`] it
//! returns in one of three modes:
//!
//! - full document, framed by the `index` controller ([`Dispatcher::render_document`]);
//! - bare content, for nesting one view in another ([`Dispatcher::embed_content`]);
//! - envelope `{status, content}`, for asynchronous callers ([`Dispatcher::dispatch_async`]).
//!
//! Controller errors propagate to the caller. Controllers that want to recover return an error
//! view instead.

pub mod registry;
pub mod render;

pub use registry::{canonical_name, ControllerRegistry, Handler, Target};
pub use render::{TeraRenderer, ViewRenderer};

use crate::config::CoreConfig;
use crate::constants::{DEFAULT_PAGE, DOCUMENT_TITLE, HTTP_CODE_REDIRECT, INDEX_PAGE};
use crate::error::{PortalError, PortalResult};
use crate::links::decode_uri_component;
use crate::master_index::MasterIndex;
use crate::models::PatientService;
use crate::response::{Document, Envelope, FrameOptions, ResponseMetadata};
use crate::services::Services;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Everything a controller knows about the request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Page the request asked for.
    pub page: String,
    /// Controller resolved for `page`.
    pub handler: Handler,
    /// Address of the authenticated user.
    pub user_name: String,
    pub base_url: String,
    /// Decoded `data` payload.
    pub query: Map<String, Value>,
}

impl RequestContext {
    /// A payload value as text. Numbers and booleans are rendered; blanks count as absent.
    pub fn param(&self, key: &str) -> Option<String> {
        match self.query.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like [`param`](Self::param), but a missing value is an `InvalidInput` error.
    pub fn require(&self, key: &str) -> PortalResult<String> {
        self.param(key)
            .ok_or_else(|| PortalError::InvalidInput(format!("missing required field {key}")))
    }
}

/// Output of running and rendering one controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    pub content: String,
    pub metadata: ResponseMetadata,
}

impl Rendered {
    pub fn is_redirect(&self) -> bool {
        self.metadata.status == Some(HTTP_CODE_REDIRECT)
    }
}

pub struct Dispatcher {
    cfg: Arc<CoreConfig>,
    services: Services,
    registry: ControllerRegistry,
    renderer: Arc<dyn ViewRenderer>,
}

impl Dispatcher {
    pub fn new(
        cfg: Arc<CoreConfig>,
        services: Services,
        registry: ControllerRegistry,
        renderer: Arc<dyn ViewRenderer>,
    ) -> Self {
        Self {
            cfg,
            services,
            registry,
            renderer,
        }
    }

    pub fn cfg(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn patients(&self) -> PatientService {
        PatientService::new(self.cfg.clone(), self.services.clone())
    }

    pub fn master_index(&self) -> MasterIndex {
        MasterIndex::new(self.cfg.clone(), self.services.tabular.clone())
    }

    /// Builds the context for a page request.
    ///
    /// `page` defaults to `home`. `data` is the URL-encoded JSON payload of the request; it must
    /// decode to a JSON object. The page's controller is resolved here so an unknown page fails
    /// before any controller runs.
    pub fn context(&self, page: Option<&str>, data: Option<&str>) -> PortalResult<RequestContext> {
        let query = match data.map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => {
                let json = decode_uri_component(raw)?;
                match serde_json::from_str::<Value>(&json).map_err(PortalError::Payload)? {
                    Value::Object(map) => map,
                    other => {
                        return Err(PortalError::InvalidInput(format!(
                            "query payload must be a JSON object, got {other}"
                        )))
                    }
                }
            }
            None => Map::new(),
        };
        self.context_with_payload(page, query)
    }

    /// Builds the context for a request whose payload is already decoded.
    pub fn context_with_payload(
        &self,
        page: Option<&str>,
        query: Map<String, Value>,
    ) -> PortalResult<RequestContext> {
        let page = page
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PAGE);
        let handler = self.registry.resolve(page)?;

        Ok(RequestContext {
            page: page.to_string(),
            handler,
            user_name: self.services.identity.active_user_email(),
            base_url: self.cfg.base_url().to_string(),
            query,
        })
    }

    /// Runs `target` against `ctx` and renders its descriptor.
    ///
    /// Literal content is returned verbatim. Otherwise the view is `view_override` if given,
    /// else the view the controller chose, rendered with the controller's data plus `view_name`,
    /// `page`, `base_url`, `user_name`, `status` and the request payload as `query`.
    pub fn embed<'a>(
        &self,
        target: impl Into<Target<'a>>,
        ctx: &RequestContext,
        view_override: Option<&str>,
    ) -> PortalResult<Rendered> {
        let handler = match target.into() {
            Target::Page(page) => self.registry.resolve(page)?,
            Target::Resolved(handler) => handler,
        };
        let descriptor = handler(self, ctx)?;

        if let Some(content) = descriptor.literal_content {
            return Ok(Rendered {
                content,
                metadata: descriptor.metadata,
            });
        }

        let view = view_override
            .map(str::to_string)
            .or(descriptor.view_name)
            .ok_or(PortalError::MissingView)?;

        let mut scope = descriptor.data;
        scope.insert("view_name".into(), Value::from(view.as_str()));
        scope.insert("page".into(), Value::from(ctx.page.as_str()));
        scope.insert("base_url".into(), Value::from(ctx.base_url.as_str()));
        scope.insert("user_name".into(), Value::from(ctx.user_name.as_str()));
        scope.insert(
            "status".into(),
            Value::from(descriptor.metadata.status_or_default()),
        );
        scope
            .entry("query")
            .or_insert_with(|| Value::Object(ctx.query.clone()));

        let content = self.renderer.render(&view, &scope)?;
        Ok(Rendered {
            content,
            metadata: descriptor.metadata,
        })
    }

    /// Content-only render of `target`.
    pub fn embed_content<'a>(
        &self,
        target: impl Into<Target<'a>>,
        ctx: &RequestContext,
    ) -> PortalResult<String> {
        Ok(self.embed(target, ctx, None)?.content)
    }

    /// Full-document render of `page`, framed by the index controller.
    pub fn render_document(&self, page: Option<&str>, data: Option<&str>) -> PortalResult<Document> {
        let ctx = self.context(page, data)?;
        let rendered = self.embed(INDEX_PAGE, &ctx, None)?;
        tracing::debug!("rendered document for page {}", ctx.page);

        Ok(Document {
            title: DOCUMENT_TITLE.to_string(),
            frame_options: FrameOptions::AllowAll,
            status: rendered.metadata.status_or_default(),
            content: rendered.content,
        })
    }

    /// Runs `page` for an asynchronous caller and wraps the result in an envelope.
    pub fn dispatch_async(
        &self,
        page: Option<&str>,
        query: Map<String, Value>,
        view_override: Option<&str>,
    ) -> PortalResult<Envelope> {
        let ctx = self.context_with_payload(page, query)?;
        let rendered = self.embed(ctx.handler, &ctx, view_override)?;
        Ok(Envelope::new(rendered.content, &rendered.metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LocalBackend;
    use crate::constants::{HTTP_CODE_SUCCESS, HTTP_CODE_UNPROCESSABLE_ENTITY};
    use crate::response::ViewDescriptor;
    use crate::services::{FixedClock, StaticIdentity};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Records every render and returns `view:<name>`.
    #[derive(Default)]
    struct StubRenderer {
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    impl ViewRenderer for StubRenderer {
        fn render(&self, view: &str, scope: &Map<String, Value>) -> PortalResult<String> {
            self.calls
                .lock()
                .expect("lock")
                .push((view.to_string(), scope.clone()));
            Ok(format!("view:{view}"))
        }
    }

    fn home(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
        ViewDescriptor::view("Home").with("greeting", "hi")
    }

    fn index(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
        let content = d.embed_content(ctx.handler, ctx)?;
        ViewDescriptor::view("Index").with("content", &content)
    }

    fn rejected(_: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
        Ok(ViewDescriptor::view("Form")
            .with_status(HTTP_CODE_UNPROCESSABLE_ENTITY)
            .merge(&ctx.query))
    }

    fn jump(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
        Ok(ViewDescriptor::redirect("https://x/?page=Home"))
    }

    fn failing(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
        Err(PortalError::InvalidInput("boom".into()))
    }

    fn setup() -> (Arc<LocalBackend>, Arc<StubRenderer>, Dispatcher) {
        let backend = Arc::new(LocalBackend::new());
        let now = NaiveDate::from_ymd_opt(2025, 12, 29)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid timestamp");
        let services = Services::from_backend(
            backend.clone(),
            Arc::new(StaticIdentity("md@example.com".into())),
            Arc::new(FixedClock(now)),
        );
        let cfg = CoreConfig::new("https://x/", "master", "md@example.com", "UTC")
            .expect("config should be valid");

        let mut registry = ControllerRegistry::new();
        registry
            .register("home", home)
            .register("index", index)
            .register("rejected", rejected)
            .register("jump", jump)
            .register("failing", failing);

        let renderer = Arc::new(StubRenderer::default());
        let dispatcher = Dispatcher::new(Arc::new(cfg), services, registry, renderer.clone());
        (backend, renderer, dispatcher)
    }

    #[test]
    fn context_defaults_to_home_and_decodes_payload() {
        let (_, _, d) = setup();
        let ctx = d.context(None, None).expect("context");
        assert_eq!(ctx.page, "home");
        assert!(ctx.query.is_empty());
        assert_eq!(ctx.user_name, "md@example.com");
        let resolved = (ctx.handler)(&d, &ctx).expect("resolved handler runs");
        assert_eq!(resolved.view_name.as_deref(), Some("Home"));

        let ctx = d
            .context(Some("Home"), Some("%7B%22patientId%22%3A%22abc123%22%7D"))
            .expect("context");
        assert_eq!(ctx.param("patientId").as_deref(), Some("abc123"));
        assert_eq!(ctx.page, "Home");
    }

    #[test]
    fn payload_must_be_an_object() {
        let (_, _, d) = setup();
        assert!(matches!(
            d.context(None, Some("%5B1%2C2%5D")),
            Err(PortalError::InvalidInput(_))
        ));
        assert!(matches!(
            d.context(None, Some("not-json")),
            Err(PortalError::Payload(_))
        ));
    }

    #[test]
    fn unknown_page_fails_without_writes() {
        let (backend, renderer, d) = setup();
        let err = d
            .render_document(Some("Nope"), None)
            .expect_err("unknown page");
        assert!(matches!(err, PortalError::HandlerNotFound { .. }));

        let err = d
            .dispatch_async(Some("Nope"), Map::new(), None)
            .expect_err("unknown page");
        assert!(matches!(err, PortalError::HandlerNotFound { .. }));

        assert_eq!(backend.document_count(), 0);
        assert_eq!(backend.folder_count(), 0);
        assert_eq!(backend.event_count(), 0);
        assert!(renderer.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn document_is_framed_by_index() {
        let (_, renderer, d) = setup();
        let doc = d.render_document(Some("home"), None).expect("render");
        assert_eq!(doc.title, "MD Portal");
        assert_eq!(doc.frame_options, FrameOptions::AllowAll);
        assert_eq!(doc.status, HTTP_CODE_SUCCESS);
        assert_eq!(doc.content, "view:Index");

        let calls = renderer.calls.lock().expect("lock");
        assert_eq!(calls[0].0, "Home");
        assert_eq!(calls[0].1.get("greeting"), Some(&Value::from("hi")));
        assert_eq!(calls[0].1.get("base_url"), Some(&Value::from("https://x/")));
        assert_eq!(calls[1].0, "Index");
        assert_eq!(calls[1].1.get("content"), Some(&Value::from("view:Home")));
    }

    #[test]
    fn envelope_carries_controller_status() {
        let (_, renderer, d) = setup();
        let mut query = Map::new();
        query.insert("patientName".into(), Value::from(""));

        let envelope = d
            .dispatch_async(Some("rejected"), query, None)
            .expect("dispatch");
        assert_eq!(envelope.status, HTTP_CODE_UNPROCESSABLE_ENTITY);
        assert_eq!(envelope.content, "view:Form");

        let calls = renderer.calls.lock().expect("lock");
        assert_eq!(calls[0].1.get("status"), Some(&Value::from(422)));
        assert_eq!(calls[0].1.get("patientName"), Some(&Value::from("")));
    }

    #[test]
    fn envelope_defaults_to_success_and_honours_view_override() {
        let (_, renderer, d) = setup();
        let envelope = d
            .dispatch_async(Some("home"), Map::new(), Some("Other"))
            .expect("dispatch");
        assert_eq!(envelope.status, HTTP_CODE_SUCCESS);
        assert_eq!(envelope.content, "view:Other");
        assert_eq!(renderer.calls.lock().expect("lock")[0].0, "Other");
    }

    #[test]
    fn literal_content_bypasses_the_renderer() {
        let (_, renderer, d) = setup();
        let envelope = d
            .dispatch_async(Some("jump"), Map::new(), Some("Ignored"))
            .expect("dispatch");
        assert_eq!(envelope.status, HTTP_CODE_REDIRECT);
        assert_eq!(envelope.content, "https://x/?page=Home");
        assert!(renderer.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn resolved_handlers_skip_lookup() {
        let (_, _, d) = setup();
        let ctx = d.context(None, None).expect("context");
        let unregistered: Handler = |_, _| Ok(ViewDescriptor::literal("direct"));
        assert_eq!(d.embed_content(unregistered, &ctx).expect("embed"), "direct");
    }

    #[test]
    fn controller_errors_propagate() {
        let (_, _, d) = setup();
        assert!(matches!(
            d.dispatch_async(Some("failing"), Map::new(), None),
            Err(PortalError::InvalidInput(_))
        ));
    }
}
