//! Text templates rendered with minijinja

use minijinja::{AutoEscape, Environment, Value};

/// Slicer server configuration (INI)
pub const SLICER_INI: &str = include_str!("../templates/slicer.ini");

/// Notebook cell embedding one viewer
pub const NOTEBOOK_HTML: &str = include_str!("../templates/notebook.html");

/// Render a template source with the given context
///
/// Values are inserted verbatim; callers encode anything that needs it.
pub fn render(source: &str, context: Value) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.render_str(source, context)
}
