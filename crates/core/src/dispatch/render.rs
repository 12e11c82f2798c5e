//! Template rendering.

use crate::error::{PortalError, PortalResult};
use serde_json::{Map, Value};
use std::path::Path;
use tera::{Context, Tera};

/// Turns a view name and its scope into content.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &str, scope: &Map<String, Value>) -> PortalResult<String>;
}

/// Renders `<view>.html` templates with Tera.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Loads every `*.html` file under `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> PortalResult<Self> {
        let dir = dir.as_ref();
        let glob = format!("{}/**/*.html", dir.display());
        let tera = Tera::new(&glob).map_err(|source| PortalError::TemplateLoad {
            dir: dir.display().to_string(),
            source,
        })?;
        tracing::info!(
            "loaded {} templates from {}",
            tera.get_template_names().count(),
            dir.display()
        );
        Ok(Self { tera })
    }

    /// Builds a renderer from in-memory `(view name, template source)` pairs.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> PortalResult<Self> {
        let mut tera = Tera::default();
        let named: Vec<(String, &str)> = sources
            .into_iter()
            .map(|(view, source)| (format!("{view}.html"), source))
            .collect();
        tera.add_raw_templates(named)
            .map_err(|source| PortalError::TemplateLoad {
                dir: "<memory>".into(),
                source,
            })?;
        Ok(Self { tera })
    }
}

impl ViewRenderer for TeraRenderer {
    fn render(&self, view: &str, scope: &Map<String, Value>) -> PortalResult<String> {
        let render_err = |source| PortalError::Render {
            view: view.to_string(),
            source,
        };
        let context = Context::from_value(Value::Object(scope.clone())).map_err(render_err)?;
        self.tera
            .render(&format!("{view}.html"), &context)
            .map_err(render_err)
    }
}
