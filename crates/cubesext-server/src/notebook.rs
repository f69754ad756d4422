//! Notebook embedding
//!
//! Produces the HTML fragment a notebook cell displays to show one viewer
//! instance for a cube. Each embed gets its own element id.

use crate::templates;
use cubesext_core::ViewerSettings;
use minijinja::context;

/// Embedding errors
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("View definition is not valid JSON: {0}")]
    InvalidView(#[source] serde_json::Error),

    #[error("Failed to render notebook cell: {0}")]
    Template(#[from] minijinja::Error),
}

/// Per-notebook embedding state
#[derive(Debug, Clone)]
pub struct NotebookSession {
    index: u32,
    last_html: Option<String>,
    static_url: String,
    cubes_url: String,
    delay_ms: u64,
}

impl NotebookSession {
    pub fn new(static_url: impl Into<String>, cubes_url: impl Into<String>) -> Self {
        Self {
            index: 0,
            last_html: None,
            static_url: static_url.into(),
            cubes_url: cubes_url.into(),
            delay_ms: 3000,
        }
    }

    pub fn from_settings(settings: &ViewerSettings, cubes_url: impl Into<String>) -> Self {
        Self::new(settings.static_url_prefix.clone(), cubes_url).with_delay(settings.embed_delay_ms)
    }

    /// Delay before the viewer initialises in the page
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Render an embed for `cube`; `view` overrides the default explore view
    pub fn embed(&mut self, cube: &str, view: Option<&str>) -> Result<String, NotebookError> {
        self.last_html = None;

        let serialized_view = match view {
            Some(view) => {
                serde_json::from_str::<serde_json::Value>(view).map_err(NotebookError::InvalidView)?;
                view.to_string()
            }
            None => default_view(cube),
        };

        self.index += 1;
        let html = templates::render(
            templates::NOTEBOOK_HTML,
            context! {
                static_url => &self.static_url,
                cubes_url => json_string(&self.cubes_url),
                index => self.index,
                serialized_view => serialized_view,
                delay_ms => self.delay_ms,
            },
        )?;

        tracing::debug!(cube, index = self.index, "rendered notebook embed");
        self.last_html = Some(html.clone());
        Ok(html)
    }

    /// HTML of the most recent successful embed
    pub fn last_html(&self) -> Option<&str> {
        self.last_html.as_deref()
    }

    /// Number of embeds rendered so far
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn clear(&mut self) {
        self.last_html = None;
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn default_view(cube: &str) -> String {
    format!(
        r#"{{"mode":"explore", "cubename":{}, "name": "Sample View"}}"#,
        json_string(cube)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> NotebookSession {
        NotebookSession::new("/static/", "http://localhost:5000/").with_delay(10)
    }

    #[test]
    fn embeds_get_increasing_ids() {
        let mut notebook = session();

        let first = notebook.embed("orders", None).unwrap();
        let second = notebook.embed("orders", None).unwrap();

        assert!(first.contains(r#"<div id="cv_embedded_1">"#));
        assert!(first.contains(r#""cubesutilscube1""#));
        assert!(second.contains(r#"<div id="cv_embedded_2">"#));
        assert!(second.contains("createView('#cv_embedded_2'"));
        assert_eq!(notebook.index(), 2);
        assert_eq!(notebook.last_html(), Some(second.as_str()));
    }

    #[test]
    fn embed_references_static_assets_and_slicer() {
        let mut notebook = session();
        let html = notebook.embed("orders", None).unwrap();

        assert!(html.contains(r#"href="/static/lib/cubesviewer/cubesviewer.css""#));
        assert!(html.contains(r#"var cubesUrl = "http://localhost:5000/";"#));
        assert!(html.contains(
            r#"var serializedView = {"mode":"explore", "cubename":"orders", "name": "Sample View"};"#
        ));
        assert!(html.contains("}, 10);"));
    }

    #[test]
    fn custom_view_is_embedded_verbatim() {
        let mut notebook = session();
        let view = r#"{"mode":"chart","cubename":"orders"}"#;
        let html = notebook.embed("orders", Some(view)).unwrap();
        assert!(html.contains(&format!("var serializedView = {};", view)));
    }

    #[test]
    fn invalid_view_is_rejected() {
        let mut notebook = session();
        notebook.embed("orders", None).unwrap();

        let err = notebook.embed("orders", Some("{not json")).unwrap_err();
        assert!(matches!(err, NotebookError::InvalidView(_)));
        assert_eq!(notebook.last_html(), None);
        assert_eq!(notebook.index(), 1);
    }

    #[test]
    fn settings_provide_prefix_and_delay() {
        let settings = ViewerSettings::default();
        let mut notebook = NotebookSession::from_settings(&settings, "http://localhost:5000/");
        let html = notebook.embed("sales", None).unwrap();

        assert!(html.contains(&settings.static_url_prefix));
        assert!(html.contains("}, 3000);"));
    }
}
