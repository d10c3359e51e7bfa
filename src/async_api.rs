use crate::rendering::geometry::ResolvedGeometry;
use crate::rendering::probe::RawBox;
use crate::{Error, RenderSurface, Result, SurfaceConfig};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Initialize(serde_json::Value, oneshot::Sender<Result<()>>),
    InjectStyle(String, oneshot::Sender<Result<()>>),
    Render(String, oneshot::Sender<Result<Option<String>>>),
    Mount(String, oneshot::Sender<Result<()>>),
    Measure(oneshot::Sender<Result<Option<RawBox>>>),
    Capture(ResolvedGeometry, Option<String>, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async handle to a render surface owned by a dedicated worker thread.
///
/// The worker thread creates and owns the surface and executes commands
/// sent from async code, so the surface never has to be `Send`. Each
/// command carries a oneshot sender and therefore resolves exactly once.
/// Dropping the handle without `close` stops the worker and drops the
/// surface.
pub struct SurfaceHandle {
    cmd_tx: Sender<Command>,
}

impl SurfaceHandle {
    /// Open a surface of type `S` on a fresh worker thread.
    pub async fn open<S>(config: SurfaceConfig) -> Result<Self>
    where
        S: RenderSurface + 'static,
    {
        Self::spawn(move || S::open(&config)).await
    }

    /// Spawn a worker thread that builds its surface with `factory`.
    pub async fn spawn<S, F>(factory: F) -> Result<Self>
    where
        S: RenderSurface + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name("mmdc-surface".into())
            .spawn(move || {
                // Initialize the surface on the worker thread
                let mut surface = match factory() {
                    Ok(s) => s,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::Initialize(options, resp) => {
                            let _ = resp.send(surface.initialize(&options));
                        }
                        Command::InjectStyle(css, resp) => {
                            let _ = resp.send(surface.inject_style(&css));
                        }
                        Command::Render(source, resp) => {
                            let _ = resp.send(surface.render_diagram(&source));
                        }
                        Command::Mount(markup, resp) => {
                            let _ = resp.send(surface.mount_markup(&markup));
                        }
                        Command::Measure(resp) => {
                            let _ = resp.send(surface.measure());
                        }
                        Command::Capture(geometry, background, resp) => {
                            let _ = resp.send(surface.capture(&geometry, background.as_deref()));
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(surface.close());
                            break;
                        }
                    }
                }
            })
            .map_err(|e| Error::RenderFailure(format!("Failed to spawn surface worker: {}", e)))?;

        // Wait for the worker to report surface creation success or failure
        init_rx
            .await
            .map_err(|e| Error::RenderFailure(format!("Surface worker exited during startup: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    /// Send one command and await its reply.
    ///
    /// A worker that is gone, or that dies before replying, fails with the
    /// error of the stage being served.
    async fn call<T>(
        &self,
        what: &str,
        stage_error: fn(String) -> Error,
        cmd: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(cmd(tx))
            .map_err(|_| stage_error(format!("{}: surface worker is not running", what)))?;
        rx.await
            .map_err(|_| stage_error(format!("{}: surface worker stopped before replying", what)))?
    }

    /// Configure the diagram library
    pub async fn initialize(&self, options: serde_json::Value) -> Result<()> {
        self.call("Initialize", Error::RenderFailure, |tx| Command::Initialize(options, tx)).await
    }

    /// Append a stylesheet to the page
    pub async fn inject_style(&self, css: &str) -> Result<()> {
        self.call("InjectStyle", Error::RenderFailure, |tx| Command::InjectStyle(css.to_string(), tx)).await
    }

    /// Render diagram source; `None` when the library returned nothing
    pub async fn render_diagram(&self, source: &str) -> Result<Option<String>> {
        self.call("Render", Error::RenderFailure, |tx| Command::Render(source.to_string(), tx)).await
    }

    /// Attach markup to the page's layout tree
    pub async fn mount_markup(&self, markup: &str) -> Result<()> {
        self.call("Mount", Error::CaptureFailure, |tx| Command::Mount(markup.to_string(), tx)).await
    }

    /// Bounding box of the mounted vector root
    pub async fn measure(&self) -> Result<Option<RawBox>> {
        self.call("Measure", Error::GeometryUnavailable, Command::Measure).await
    }

    /// Capture PNG bytes at the given geometry
    pub async fn capture(&self, geometry: ResolvedGeometry, background: Option<String>) -> Result<Vec<u8>> {
        self.call("Capture", Error::CaptureFailure, |tx| Command::Capture(geometry, background, tx)).await
    }

    /// Close the surface and stop the worker.
    pub async fn close(self) -> Result<()> {
        self.call("Close", Error::Other, Command::Close).await
    }
}
