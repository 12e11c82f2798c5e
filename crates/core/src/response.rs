//! View descriptors and response envelopes.
//!
//! Every controller returns a [`ViewDescriptor`]. The dispatcher turns it into one of three
//! outputs: a framed [`Document`], a bare content string, or an [`Envelope`] for asynchronous
//! callers.

use crate::constants::{HTTP_CODE_REDIRECT, HTTP_CODE_SUCCESS};
use crate::error::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response metadata attached to a view descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Application status code. `None` means the caller's default (200).
    pub status: Option<u16>,
}

impl ResponseMetadata {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
        }
    }

    pub fn status_or_default(&self) -> u16 {
        self.status.unwrap_or(HTTP_CODE_SUCCESS)
    }
}

/// What a controller wants rendered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewDescriptor {
    /// Template to render. Callers of the dispatcher may override it.
    pub view_name: Option<String>,
    /// Pre-rendered content, returned verbatim without touching the template engine.
    pub literal_content: Option<String>,
    pub metadata: ResponseMetadata,
    /// Values bound into the template's scope.
    pub data: Map<String, Value>,
}

impl ViewDescriptor {
    /// A descriptor rendering `view_name`.
    pub fn view(view_name: impl Into<String>) -> Self {
        Self {
            view_name: Some(view_name.into()),
            ..Self::default()
        }
    }

    /// A descriptor whose content is `content`, verbatim.
    pub fn literal(content: impl Into<String>) -> Self {
        Self {
            literal_content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A redirect instruction: the target URL as literal content, tagged 302.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::literal(url).with_status(HTTP_CODE_REDIRECT)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.metadata = ResponseMetadata::with_status(status);
        self
    }

    /// Binds `key` to the JSON form of `value`.
    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> PortalResult<Self> {
        let value = serde_json::to_value(value).map_err(PortalError::ViewData)?;
        self.data.insert(key.to_string(), value);
        Ok(self)
    }

    /// Binds every entry of `map`, overwriting existing keys.
    pub fn merge(mut self, map: &Map<String, Value>) -> Self {
        for (k, v) in map {
            self.data.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn status(&self) -> u16 {
        self.metadata.status_or_default()
    }

    pub fn is_redirect(&self) -> bool {
        self.metadata.status == Some(HTTP_CODE_REDIRECT) && self.literal_content.is_some()
    }
}

/// Uniform shape returned to asynchronous callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: u16,
    pub content: String,
}

impl Envelope {
    pub fn new(content: String, metadata: &ResponseMetadata) -> Self {
        Self {
            status: metadata.status_or_default(),
            content,
        }
    }
}

/// How a full document may be embedded by other pages. Portal pages are always embeddable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FrameOptions {
    AllowAll,
}

/// A full page with its top-level framing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub frame_options: FrameOptions,
    pub status: u16,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{HTTP_CODE_FORBIDDEN, HTTP_CODE_UNPROCESSABLE_ENTITY};

    #[test]
    fn envelope_carries_forbidden_status() {
        let d = ViewDescriptor::literal("Access denied").with_status(HTTP_CODE_FORBIDDEN);
        let envelope = Envelope::new(d.literal_content.clone().unwrap_or_default(), &d.metadata);
        assert_eq!(envelope.status, 403);
        assert_eq!(envelope.content, "Access denied");
    }

    #[test]
    fn redirect_is_a_tagged_literal() {
        let d = ViewDescriptor::redirect("https://x/?page=Home");
        assert_eq!(d.literal_content.as_deref(), Some("https://x/?page=Home"));
        assert_eq!(d.status(), HTTP_CODE_REDIRECT);
        assert!(d.is_redirect());
        assert!(d.view_name.is_none());
    }

    #[test]
    fn envelope_defaults_to_success() {
        let envelope = Envelope::new("<p>hi</p>".into(), &ResponseMetadata::default());
        assert_eq!(envelope.status, HTTP_CODE_SUCCESS);

        let rejected = Envelope::new(
            String::new(),
            &ResponseMetadata::with_status(HTTP_CODE_UNPROCESSABLE_ENTITY),
        );
        assert_eq!(rejected.status, HTTP_CODE_UNPROCESSABLE_ENTITY);
        assert_eq!(
            serde_json::to_value(&rejected).expect("serialize"),
            serde_json::json!({ "status": 422, "content": "" })
        );
    }

    #[test]
    fn binds_view_data() {
        let d = ViewDescriptor::view("Home")
            .with("count", &3)
            .expect("bind")
            .with("name", "Ada")
            .expect("bind");
        assert_eq!(d.data.get("count"), Some(&Value::from(3)));
        assert_eq!(d.data.get("name"), Some(&Value::from("Ada")));
        assert_eq!(d.status(), HTTP_CODE_SUCCESS);
    }
}
