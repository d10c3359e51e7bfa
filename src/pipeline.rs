//! Request-to-artifact orchestration
//!
//! A [`RenderPipeline`] walks one request through
//! `Idle → SourceLoaded → VectorReady → [GeometryResolved → Captured] →
//! Written → Done`. Stages run strictly one after another on the caller's
//! task; the first failure moves the pipeline to `Failed` and is returned.
//! Nothing is written unless the whole artifact was produced.

use crate::output::{self, Artifact, ArtifactKind, Route};
use crate::rendering::capture::{self, Background};
use crate::rendering::{geometry, probe, vector};
use crate::{Error, RenderRequest, Result, SurfaceHandle};
use log::{debug, info};
use std::sync::Mutex;
use std::time::Duration;

/// Pipeline progress, logged at each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    SourceLoaded,
    VectorReady,
    GeometryResolved,
    Captured,
    Written,
    Done,
    Failed(&'static str),
}

/// One request's pass through the rendering stages.
pub struct RenderPipeline {
    request: RenderRequest,
    route: Route,
    settle: Duration,
    state: Mutex<PipelineState>,
}

impl RenderPipeline {
    /// Validate the source and route the output.
    ///
    /// Unsupported output combinations fail here, before any surface exists.
    pub fn new(request: RenderRequest) -> Result<Self> {
        if request.source_text.trim().is_empty() {
            return Err(Error::EmptySource("diagram source is empty".into()));
        }
        let route = output::route(&request.output_descriptor, request.format.as_deref())?;
        debug!("pipeline Idle -> SourceLoaded ({:?} to {:?})", route.kind, route.target);

        Ok(Self {
            request,
            route,
            settle: Duration::from_millis(crate::SurfaceConfig::default().settle_ms),
            state: Mutex::new(PipelineState::SourceLoaded),
        })
    }

    /// Wait this long between mounting content and measuring it.
    pub fn with_settle_delay(mut self, settle_ms: u64) -> Self {
        self.settle = Duration::from_millis(settle_ms);
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn advance(&self, next: PipelineState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!("pipeline {:?} -> {:?}", *state, next);
        *state = next;
    }

    fn fail<T>(&self, err: Error) -> Result<T> {
        self.advance(PipelineState::Failed(err.kind()));
        Err(err)
    }

    /// Produce the artifact without writing it.
    pub async fn produce(&self, surface: &SurfaceHandle) -> Result<Artifact> {
        match self.produce_inner(surface).await {
            Ok(artifact) => Ok(artifact),
            Err(err) => self.fail(err),
        }
    }

    async fn produce_inner(&self, surface: &SurfaceHandle) -> Result<Artifact> {
        let req = &self.request;
        let options = vector::initialize_options(req.theme.as_deref(), req.mermaid_config.as_ref())?;
        let markup = vector::render(surface, &req.source_text, req.css_override.as_deref(), &options).await?;
        self.advance(PipelineState::VectorReady);

        if self.route.kind == ArtifactKind::Vector {
            return Ok(Artifact::Vector(markup));
        }

        surface.mount_markup(&markup).await?;
        tokio::time::sleep(self.settle).await;

        let natural = probe::probe(surface).await?;
        let geometry = geometry::resolve(&natural, req.explicit_width, req.explicit_height, req.resolution_dpi)?;
        self.advance(PipelineState::GeometryResolved);

        let background = Background::from_option(req.background_color.as_deref());
        let png = capture::capture(surface, &geometry, &background).await?;
        self.advance(PipelineState::Captured);

        Ok(Artifact::Raster(png))
    }

    /// Produce the artifact and write it to the routed target.
    pub async fn run(&self, surface: &SurfaceHandle) -> Result<Artifact> {
        let artifact = self.produce(surface).await?;
        if let Err(err) = output::write(&artifact, &self.route.target) {
            return self.fail(err);
        }
        self.advance(PipelineState::Written);
        info!("{} artifact written", artifact.kind().extension());
        self.advance(PipelineState::Done);
        Ok(artifact)
    }
}
