//! Chrome DevTools Protocol surface implementation

use crate::rendering::geometry::ResolvedGeometry;
use crate::rendering::probe::RawBox;
use crate::{Error, RenderSurface, Result, ScriptSource, SurfaceConfig};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page, DOM};
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Blank, margin-free page the library and diagrams are loaded into.
const HOST_PAGE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<style>html, body { margin: 0; padding: 0; background: transparent; }</style>
</head>
<body></body>
</html>"#;

/// Resolves after two animation frames, i.e. once pending layout and style
/// work has been painted.
const AFTER_PAINT: &str =
    "new Promise(function(resolve){ requestAnimationFrame(function(){ requestAnimationFrame(function(){ resolve(true); }); }); })";

/// Extra device pixels added to the screenshot clip.
const CLIP_SLACK: f64 = 0.25;

/// CDP-based render surface (uses the `headless_chrome` crate)
///
/// Launches a headless Chrome instance, opens a single tab on the host page
/// and loads the mermaid library into it. One instance serves exactly one
/// conversion.
pub struct CdpSurface {
    browser: Browser,
    tab: Arc<Tab>,
}

/// Encode a Rust string as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn host_page_url() -> String {
    let b64 = Base64Engine::encode(&base64::engine::general_purpose::STANDARD, HOST_PAGE);
    format!("data:text/html;charset=utf-8;base64,{}", b64)
}

/// Screenshot clip in CSS pixels for `geometry`.
///
/// Chrome sizes the image from `clip * scale`. A quarter device pixel of
/// slack keeps float error from dropping the last row or column.
fn clip_area(geometry: &ResolvedGeometry) -> (f64, f64) {
    (
        (geometry.final_width as f64 + CLIP_SLACK) / geometry.zoom_scale,
        (geometry.final_height as f64 + CLIP_SLACK) / geometry.zoom_scale,
    )
}

impl CdpSurface {
    fn eval_value(&self, script: &str, await_promise: bool) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.tab.evaluate(script, await_promise)?.value)
    }

    fn load_library(&self, script: &ScriptSource) -> Result<()> {
        match script {
            ScriptSource::Url(url) => {
                let loader = format!(
                    r#"new Promise(function(resolve, reject){{
                        var s = document.createElement('script');
                        s.src = {src};
                        s.onload = function(){{ resolve(true); }};
                        s.onerror = function(){{ reject(new Error('failed to load ' + {src})); }};
                        document.head.appendChild(s);
                    }})"#,
                    src = js_string(url)
                );
                self.eval_value(&loader, true)
                    .map_err(|e| Error::RenderFailure(format!("Failed to load mermaid from {}: {}", url, e)))?;
            }
            ScriptSource::File(path) => {
                let source = std::fs::read_to_string(path)
                    .map_err(|e| Error::RenderFailure(format!("Failed to read {}: {}", path.display(), e)))?;
                self.eval_value(&source, false)
                    .map_err(|e| Error::RenderFailure(format!("Failed to evaluate {}: {}", path.display(), e)))?;
            }
        }

        let present = self
            .eval_value("typeof window.mermaid !== 'undefined'", false)
            .map_err(|e| Error::RenderFailure(format!("Failed to inspect page: {}", e)))?;
        if present != Some(serde_json::Value::Bool(true)) {
            return Err(Error::RenderFailure("mermaid library did not define window.mermaid".into()));
        }
        Ok(())
    }
}

impl RenderSurface for CdpSurface {
    fn open(config: &SurfaceConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let timeout = Duration::from_millis(config.timeout_ms);

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .path(config.chrome_path.clone())
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(timeout.max(Duration::from_secs(30)))
            .build()
            .map_err(|e| Error::RenderFailure(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::RenderFailure(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::RenderFailure(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(timeout);

        // Screenshots are white-backed unless the default background is cleared
        tab.call_method(Emulation::SetDefaultBackgroundColorOverride {
            color: Some(DOM::RGBA { r: 0, g: 0, b: 0, a: Some(0.0) }),
        })
        .map_err(|e| Error::RenderFailure(format!("Failed to clear default background: {}", e)))?;

        tab.navigate_to(&host_page_url())
            .map_err(|e| Error::RenderFailure(format!("Failed to load page: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| Error::RenderFailure(format!("Failed to load page: {}", e)))?;

        let surface = Self { browser, tab };
        surface.load_library(&config.script)?;
        debug!("surface ready with mermaid from {:?}", config.script);
        Ok(surface)
    }

    fn initialize(&mut self, options: &serde_json::Value) -> Result<()> {
        let script = format!(
            r#"(function(opts){{
                window.mermaid.initialize(opts);
                window.__mmdc_render = async function(code){{
                    var out = await window.mermaid.render('mmdc-diagram', code);
                    return typeof out === 'string' ? out : (out && out.svg) || '';
                }};
                return true;
            }})({})"#,
            options
        );
        self.eval_value(&script, false)
            .map_err(|e| Error::RenderFailure(format!("mermaid.initialize failed: {}", e)))?;
        Ok(())
    }

    fn inject_style(&mut self, css: &str) -> Result<()> {
        let script = format!(
            r#"(function(cssText){{
                var style = document.createElement('style');
                style.type = 'text/css';
                style.appendChild(document.createTextNode(cssText));
                document.head.appendChild(style);
                return true;
            }})({})"#,
            js_string(css)
        );
        self.eval_value(&script, false)
            .map_err(|e| Error::RenderFailure(format!("Failed to inject CSS: {}", e)))?;
        Ok(())
    }

    fn render_diagram(&mut self, source: &str) -> Result<Option<String>> {
        let script = format!("window.__mmdc_render({})", js_string(source));
        let value = self
            .eval_value(&script, true)
            .map_err(|e| Error::RenderFailure(format!("mermaid.render failed: {}", e)))?;

        match value {
            Some(serde_json::Value::String(svg)) => Ok(Some(svg)),
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(other) => {
                warn!("mermaid.render returned a non-string value: {}", other);
                Ok(None)
            }
        }
    }

    fn mount_markup(&mut self, markup: &str) -> Result<()> {
        let script = format!(
            r#"(function(svgContent){{
                var div = document.createElement('div');
                div.id = 'mmdc-mount';
                div.style.margin = '0';
                div.style.padding = '0';
                div.style.lineHeight = '0';
                div.innerHTML = svgContent;
                document.body.appendChild(div);
                return {after_paint};
            }})({markup})"#,
            after_paint = AFTER_PAINT,
            markup = js_string(markup)
        );
        self.eval_value(&script, true)
            .map_err(|e| Error::CaptureFailure(format!("Failed to mount SVG: {}", e)))?;
        Ok(())
    }

    fn measure(&mut self) -> Result<Option<RawBox>> {
        let script = r#"(function(){
            var svg = document.querySelector('#mmdc-mount > svg');
            if (!svg || typeof svg.getBBox !== 'function') return null;
            var b = svg.getBBox();
            return JSON.stringify({ x: b.x, y: b.y, width: b.width, height: b.height });
        })()"#;
        let value = self
            .eval_value(script, false)
            .map_err(|e| Error::GeometryUnavailable(format!("Failed to measure SVG: {}", e)))?;

        match value {
            Some(serde_json::Value::String(json)) => serde_json::from_str::<RawBox>(&json)
                .map(Some)
                .map_err(|e| Error::GeometryUnavailable(format!("Malformed bounding box: {}", e))),
            _ => Ok(None),
        }
    }

    fn capture(&mut self, geometry: &ResolvedGeometry, background: Option<&str>) -> Result<Vec<u8>> {
        let css_width = geometry.css_width();
        let css_height = geometry.css_height();

        let (clip_width, clip_height) = clip_area(geometry);

        // In headless mode the window is the viewport
        self.tab
            .set_bounds(Bounds::Normal {
                left: Some(0),
                top: Some(0),
                width: Some(clip_width.ceil()),
                height: Some(clip_height.ceil()),
            })
            .map_err(|e| Error::CaptureFailure(format!("Failed to size viewport: {}", e)))?;

        let script = format!(
            r#"(function(w, h, stretch, bg){{
                var svg = document.querySelector('#mmdc-mount > svg');
                if (!svg) return false;
                svg.style.maxWidth = 'none';
                svg.style.width = w + 'px';
                svg.style.height = h + 'px';
                svg.setAttribute('width', w);
                svg.setAttribute('height', h);
                if (stretch) {{ svg.setAttribute('preserveAspectRatio', 'none'); }}
                if (bg) {{ document.body.style.backgroundColor = bg; }}
                return {after_paint};
            }})({w}, {h}, {stretch}, {bg})"#,
            after_paint = AFTER_PAINT,
            w = css_width,
            h = css_height,
            stretch = geometry.stretch,
            bg = background.map(js_string).unwrap_or_else(|| "null".to_string())
        );
        self.eval_value(&script, true)
            .map_err(|e| Error::CaptureFailure(format!("Failed to prepare capture: {}", e)))?;

        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: clip_width,
            height: clip_height,
            scale: geometry.zoom_scale,
        };
        let png = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::CaptureFailure(format!("Screenshot failed: {}", e)))?;

        Ok(png)
    }

    fn close(self) -> Result<()> {
        // Drop the tab before the browser so the child process exits promptly
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes_and_newlines() {
        assert_eq!(js_string("graph TD\n  A-->\"B\""), r#""graph TD\n  A-->\"B\"""#);
    }

    #[test]
    fn clip_scales_back_to_the_resolved_size() {
        for dpi in [72u32, 96, 120, 144, 150, 200, 216, 300, 600] {
            let zoom = dpi as f64 / 96.0;
            for px in 1..2000u32 {
                let geometry = ResolvedGeometry {
                    final_width: px,
                    final_height: px,
                    zoom_scale: zoom,
                    stretch: false,
                };
                let (w, _) = clip_area(&geometry);
                assert_eq!((w * zoom).floor() as u32, px, "floor at {} dpi, {} px", dpi, px);
                assert_eq!((w * zoom).round() as u32, px, "round at {} dpi, {} px", dpi, px);
            }
        }
    }

    #[test]
    fn host_page_is_a_base64_data_url() {
        let url = host_page_url();
        let b64 = url.strip_prefix("data:text/html;charset=utf-8;base64,").unwrap();
        let html = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(String::from_utf8(html).unwrap(), HOST_PAGE);
    }

    #[test]
    fn test_cdp_surface_creation() {
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let result = CdpSurface::open(&SurfaceConfig::default());
        if let Err(e) = result {
            eprintln!("Skipping CDP surface creation test because Chrome or the network is unavailable: {}", e);
            return;
        }
        assert!(result.is_ok());
    }
}
