//! mmdc: Mermaid diagram rendering on a headless page surface
//!
//! Turns Mermaid source text into SVG markup or a PNG image by driving a
//! headless Chrome page that hosts the mermaid.js library. The crate is the
//! terminal stage of a conversion tool: it takes a validated [`RenderRequest`],
//! renders it on a fresh [`RenderSurface`], and writes the artifact to stdout
//! or a file.
//!
//! # Features
//!
//! - **CDP Backend** (default): headless Chrome via the DevTools protocol
//! - **Surface trait**: the pipeline only talks to [`RenderSurface`], so
//!   backends and test doubles are swappable
//! - **DPI-aware raster export**: final pixel size from the natural SVG box,
//!   explicit width/height and a resolution scale
//!
//! # Example
//!
//! ```no_run
//! use mmdc::{RenderRequest, SurfaceConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = RenderRequest {
//!     source_text: "graph TD\n  A --> B".to_string(),
//!     output_descriptor: "diagram.png".to_string(),
//!     resolution_dpi: 192,
//!     ..Default::default()
//! };
//!
//! mmdc::convert(request, SurfaceConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod output;
pub use output::{Artifact, ArtifactKind, OutputTarget, Route};

pub mod rendering;
pub use rendering::capture::Background;
pub use rendering::geometry::ResolvedGeometry;
pub use rendering::probe::{NaturalBox, RawBox};

pub mod pipeline;
pub use pipeline::{PipelineState, RenderPipeline};

// Async command facade over a surface owned by a worker thread
pub mod async_api;
pub use async_api::SurfaceHandle;

#[cfg(feature = "cdp")]
pub mod cdp;

/// Default mermaid bundle loaded into the host page.
pub const DEFAULT_MERMAID_URL: &str = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// Resolution treated as scale 1.0.
pub const BASE_DPI: u32 = 96;

/// Where the surface loads the mermaid library from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Injected as `<script src>` and awaited until its load event fires
    Url(String),
    /// File contents evaluated directly in the page
    File(PathBuf),
}

impl ScriptSource {
    /// Interpret a user-supplied location: http(s) URLs are fetched by the
    /// page, `file://` URLs and everything else are read from disk.
    pub fn parse(location: &str) -> Self {
        match url::Url::parse(location) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => ScriptSource::Url(location.to_string()),
            Ok(u) if u.scheme() == "file" => match u.to_file_path() {
                Ok(path) => ScriptSource::File(path),
                Err(_) => ScriptSource::File(PathBuf::from(location)),
            },
            _ => ScriptSource::File(PathBuf::from(location)),
        }
    }
}

impl Default for ScriptSource {
    fn default() -> Self {
        ScriptSource::Url(DEFAULT_MERMAID_URL.to_string())
    }
}

/// Configuration for a rendering surface
///
/// One surface is created per conversion, so these settings never leak
/// between runs. Defaults:
/// - the jsDelivr mermaid v10 bundle
/// - a 1280x720 initial window (resized at capture time)
/// - 30 second operation timeout, 100ms settle delay
///
/// # Examples
///
/// ```
/// let cfg = mmdc::SurfaceConfig::default();
/// assert_eq!(cfg.settle_ms, 100);
/// assert!(cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Location of the mermaid library
    pub script: ScriptSource,
    /// Initial window dimensions
    pub viewport: Viewport,
    /// Timeout for each surface operation in milliseconds
    pub timeout_ms: u64,
    /// Wait between mounting content and measuring/capturing it
    pub settle_ms: u64,
    /// Chrome/Chromium executable; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Whether Chrome runs with its sandbox enabled
    pub sandbox: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            script: ScriptSource::default(),
            viewport: Viewport::default(),
            timeout_ms: 30000,
            settle_ms: 100,
            chrome_path: None,
            sandbox: true,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A single conversion request
///
/// `source_text` is captured in full before any rendering starts and is not
/// modified afterwards.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Diagram source; must be non-empty after trimming
    pub source_text: String,
    /// `"svg"`/`"png"` for stdout, or a file path whose extension picks the kind
    pub output_descriptor: String,
    /// Extra stylesheet appended to the page before rendering
    pub css_override: Option<String>,
    /// Target width in CSS pixels before DPI scaling
    pub explicit_width: Option<u32>,
    /// Target height in CSS pixels before DPI scaling
    pub explicit_height: Option<u32>,
    /// Resolution relative to the 96 DPI baseline
    pub resolution_dpi: u32,
    /// Raster background; unset, `transparent` and `none` keep transparency
    pub background_color: Option<String>,
    /// Forces the artifact kind (`svg` or `png`) regardless of the extension
    pub format: Option<String>,
    /// Mermaid theme name
    pub theme: Option<String>,
    /// Mermaid configuration object merged into `mermaid.initialize`
    pub mermaid_config: Option<serde_json::Value>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            source_text: String::new(),
            output_descriptor: "svg".to_string(),
            css_override: None,
            explicit_width: None,
            explicit_height: None,
            resolution_dpi: BASE_DPI,
            background_color: None,
            format: None,
            theme: None,
            mermaid_config: None,
        }
    }
}

/// Core trait for page surfaces that can host the diagram library
///
/// Every method is one suspension point from the pipeline's point of view:
/// it either succeeds with a value or fails, never both.
pub trait RenderSurface {
    /// Create a surface and load the diagram library into it
    fn open(config: &SurfaceConfig) -> Result<Self>
    where
        Self: Sized;

    /// Pass the initialization object to `mermaid.initialize`
    fn initialize(&mut self, options: &serde_json::Value) -> Result<()>;

    /// Append a stylesheet to the page's style scope
    fn inject_style(&mut self, css: &str) -> Result<()>;

    /// Run the diagram capability. `Ok(None)` means it returned nothing.
    fn render_diagram(&mut self, source: &str) -> Result<Option<String>>;

    /// Attach vector markup to the page's layout tree and wait for it to paint
    fn mount_markup(&mut self, markup: &str) -> Result<()>;

    /// Bounding box of the mounted top-level vector element, if there is one
    fn measure(&mut self) -> Result<Option<RawBox>>;

    /// Paint the background (when given), size the capture area to the
    /// geometry and return the encoded PNG
    fn capture(&mut self, geometry: &ResolvedGeometry, background: Option<&str>) -> Result<Vec<u8>>;

    /// Tear the surface down
    fn close(self) -> Result<()>;
}

/// Launch a fresh headless Chrome surface, run the request through it and
/// write the artifact. The surface is closed whether or not the run succeeds.
#[cfg(feature = "cdp")]
pub async fn convert(request: RenderRequest, config: SurfaceConfig) -> Result<Route> {
    let pipeline = RenderPipeline::new(request)?.with_settle_delay(config.settle_ms);
    let route = pipeline.route().clone();

    let surface = SurfaceHandle::open::<cdp::CdpSurface>(config).await?;
    let outcome = pipeline.run(&surface).await;
    let closed = surface.close().await;

    outcome?;
    if let Err(e) = closed {
        log::warn!("Failed to close surface cleanly: {}", e);
    }
    Ok(route)
}
