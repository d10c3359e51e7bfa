//! Vector markup generation through the page's diagram library

use crate::{Error, Result, SurfaceHandle};
use log::debug;
use serde_json::{Map, Value};

/// Build the object handed to `mermaid.initialize`.
///
/// The user config is applied first; `startOnLoad` is always forced off
/// since diagrams are rendered on demand, and an explicit theme wins over
/// any theme in the config.
pub fn initialize_options(theme: Option<&str>, config: Option<&Value>) -> Result<Value> {
    let mut options = match config {
        None => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(Error::InvalidConfig(format!(
                "mermaid config must be a JSON object, got {}",
                json_type_name(other)
            )))
        }
    };
    options.insert("startOnLoad".into(), Value::Bool(false));
    if let Some(theme) = theme.map(str::trim).filter(|t| !t.is_empty()) {
        options.insert("theme".into(), Value::String(theme.to_string()));
    }
    Ok(Value::Object(options))
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Check that markup has exactly one top-level `<svg>` root, allowing an XML
/// prolog and surrounding whitespace.
pub fn has_single_svg_root(markup: &str) -> bool {
    let mut body = markup.trim();
    if body.starts_with("<?xml") {
        match body.find("?>") {
            Some(end) => body = body[end + 2..].trim_start(),
            None => return false,
        }
    }
    if !(body.starts_with("<svg") && body.ends_with("</svg>")) {
        return false;
    }
    // The root's closing tag must be the last one; a second sibling root
    // would close the first `<svg` before the end.
    let opened = body.matches("<svg").count();
    let closed = body.matches("</svg>").count();
    opened == closed && first_root_end(body) == Some(body.len())
}

// Byte offset just past the closing tag that balances the first `<svg`.
fn first_root_end(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < body.len() {
        let rest = &body[i..];
        if rest.starts_with("</svg>") {
            depth = depth.checked_sub(1)?;
            i += "</svg>".len();
            if depth == 0 {
                return Some(i);
            }
        } else if rest.starts_with("<svg") {
            depth += 1;
            i += "<svg".len();
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

/// Render diagram source to SVG markup on the surface.
///
/// Styles are appended to the page before rendering. An empty result from
/// the library, or markup without a single `<svg>` root, is a render failure.
pub async fn render(
    surface: &SurfaceHandle,
    source: &str,
    css_override: Option<&str>,
    options: &Value,
) -> Result<String> {
    surface.initialize(options.clone()).await?;

    if let Some(css) = css_override.filter(|c| !c.trim().is_empty()) {
        debug!("injecting {} bytes of CSS", css.len());
        surface.inject_style(css).await?;
    }

    let markup = surface
        .render_diagram(source)
        .await?
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| Error::RenderFailure("diagram library returned no output".into()))?;

    if !has_single_svg_root(&markup) {
        return Err(Error::RenderFailure("output is not a single <svg> document".into()));
    }
    debug!("rendered {} bytes of SVG", markup.len());
    Ok(markup)
}
