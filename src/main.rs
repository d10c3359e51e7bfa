use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use mmdc::{Error, RenderRequest, ScriptSource, SurfaceConfig, Viewport};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Convert Mermaid diagrams to SVG or PNG with headless Chrome
#[derive(Parser, Debug)]
#[command(name = "mmdc", version, about)]
struct Cli {
    /// Input Mermaid file, or '-' for standard input
    input: Option<String>,

    /// 'svg' or 'png' for stdout, or a filename with .svg/.png extension
    output: Option<String>,

    /// CSS appended to the page before rendering
    #[arg(long, conflicts_with = "css_file")]
    css: Option<String>,

    /// Read the CSS from a file
    #[arg(long, value_name = "PATH")]
    css_file: Option<PathBuf>,

    /// PNG width in pixels at 96 DPI (0 = natural)
    #[arg(long)]
    width: Option<u32>,

    /// PNG height in pixels at 96 DPI (0 = natural)
    #[arg(long)]
    height: Option<u32>,

    /// PNG resolution in DPI
    #[arg(long, default_value_t = mmdc::BASE_DPI)]
    resolution: u32,

    /// PNG background color (default transparent)
    #[arg(long, value_name = "COLOR")]
    background: Option<String>,

    /// Force the output kind: svg or png
    #[arg(long)]
    format: Option<String>,

    /// Mermaid theme
    #[arg(long)]
    theme: Option<String>,

    /// JSON file with mermaid configuration
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// URL or path of the mermaid library
    #[arg(long, value_name = "URL|PATH")]
    mermaid_js: Option<String>,

    /// Timeout for each browser operation, in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Delay between mounting the SVG and measuring it, in milliseconds
    #[arg(long, default_value_t = 100)]
    settle_ms: u64,

    /// Chrome/Chromium executable
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Disable the Chrome sandbox (needed in some containers)
    #[arg(long)]
    no_sandbox: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn read_source(input: &str) -> mmdc::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| Error::FileReadError(format!("stdin: {}", e)))?;
        if buf.trim().is_empty() {
            return Err(Error::EmptySource("no input provided via stdin".into()));
        }
        Ok(buf)
    } else {
        std::fs::read_to_string(input).map_err(|e| Error::FileReadError(format!("{}: {}", input, e)))
    }
}

fn read_config(path: &Path) -> mmdc::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::FileReadError(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
    if !value.is_object() {
        return Err(Error::InvalidConfig(format!("{}: expected a JSON object", path.display())));
    }
    Ok(value)
}

fn build(cli: Cli) -> mmdc::Result<(RenderRequest, SurfaceConfig)> {
    let input = cli.input.ok_or_else(|| Error::MissingArgument("<INPUT>".into()))?;
    let output = cli.output.ok_or_else(|| Error::MissingArgument("<OUTPUT>".into()))?;

    let css_override = match (&cli.css, &cli.css_file) {
        (Some(css), _) => Some(css.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path).map_err(|e| Error::FileReadError(format!("{}: {}", path.display(), e)))?,
        ),
        (None, None) => None,
    };
    let mermaid_config = cli.config_file.as_deref().map(read_config).transpose()?;

    let request = RenderRequest {
        source_text: String::new(),
        output_descriptor: output,
        css_override,
        explicit_width: cli.width.filter(|w| *w > 0),
        explicit_height: cli.height.filter(|h| *h > 0),
        resolution_dpi: if cli.resolution == 0 { mmdc::BASE_DPI } else { cli.resolution },
        background_color: cli.background,
        format: cli.format,
        theme: cli.theme,
        mermaid_config,
    };

    let config = SurfaceConfig {
        script: cli.mermaid_js.as_deref().map(ScriptSource::parse).unwrap_or_default(),
        viewport: Viewport::default(),
        timeout_ms: cli.timeout.saturating_mul(1000),
        settle_ms: cli.settle_ms,
        chrome_path: cli.chrome,
        sandbox: !cli.no_sandbox,
    };

    // Route before reading stdin so unsupported outputs fail without consuming input
    mmdc::output::route(&request.output_descriptor, request.format.as_deref())?;
    let source_text = read_source(&input)?;

    Ok((RenderRequest { source_text, ..request }, config))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    init_logging(cli.verbose);

    let outcome = match build(cli) {
        Ok((request, config)) => mmdc::convert(request, config).await.map(|_| ()),
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        log::debug!("run failed with {}", e.kind());
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
