//! Output routing: artifact kind and destination from the output descriptor

use crate::{Error, Result};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of artifact the run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// SVG markup
    Vector,
    /// PNG bytes
    Raster,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Vector => "svg",
            ArtifactKind::Raster => "png",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(ArtifactKind::Vector),
            "png" => Ok(ArtifactKind::Raster),
            _ => Err(Error::UnsupportedOutputType(s.to_string())),
        }
    }
}

/// Where the artifact is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// Kind and destination, derived once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kind: ArtifactKind,
    pub target: OutputTarget,
}

/// A finished artifact, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Vector(String),
    Raster(Vec<u8>),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Vector(_) => ArtifactKind::Vector,
            Artifact::Raster(_) => ArtifactKind::Raster,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Artifact::Vector(markup) => markup.as_bytes(),
            Artifact::Raster(bytes) => bytes,
        }
    }
}

/// Decide kind and target for a descriptor.
///
/// The exact tokens `svg` and `png` mean standard output. Anything else is
/// a file path whose extension (case-insensitive) picks the kind; unknown or
/// missing extensions fall back to SVG. `format`, when given, forces the
/// kind. A raster artifact on standard output is rejected here, before any
/// rendering work starts.
pub fn route(descriptor: &str, format: Option<&str>) -> Result<Route> {
    let (descriptor_kind, target) = match descriptor {
        "svg" => (ArtifactKind::Vector, OutputTarget::Stdout),
        "png" => (ArtifactKind::Raster, OutputTarget::Stdout),
        path => (kind_from_extension(Path::new(path)), OutputTarget::File(PathBuf::from(path))),
    };

    let kind = match format {
        Some(f) => f.parse::<ArtifactKind>()?,
        None => descriptor_kind,
    };

    if kind == ArtifactKind::Raster && target == OutputTarget::Stdout {
        return Err(Error::UnsupportedStdoutFormat);
    }
    Ok(Route { kind, target })
}

fn kind_from_extension(path: &Path) -> ArtifactKind {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse::<ArtifactKind>().ok())
        .unwrap_or(ArtifactKind::Vector)
}

/// Write a complete artifact to its target. Files are created or truncated.
pub fn write(artifact: &Artifact, target: &OutputTarget) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_to(artifact, &mut out)
        }
        OutputTarget::File(path) => {
            std::fs::write(path, artifact.as_bytes())
                .map_err(|e| Error::FileWriteError(format!("{}: {}", path.display(), e)))?;
            info!("wrote {} bytes of {} to {}", artifact.as_bytes().len(), artifact.kind().extension(), path.display());
            Ok(())
        }
    }
}

/// Write the raw artifact bytes to any writer and flush it.
pub fn write_to<W: Write>(artifact: &Artifact, out: &mut W) -> Result<()> {
    out.write_all(artifact.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| Error::FileWriteError(format!("stdout: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_svg_goes_to_stdout() {
        let r = route("svg", None).unwrap();
        assert_eq!(r, Route { kind: ArtifactKind::Vector, target: OutputTarget::Stdout });
    }

    #[test]
    fn sentinel_png_is_rejected_on_stdout() {
        let err = route("png", None).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedStdoutFormat");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let r = route("diagram.PNG", None).unwrap();
        assert_eq!(r.kind, ArtifactKind::Raster);
        assert_eq!(r.target, OutputTarget::File(PathBuf::from("diagram.PNG")));
    }

    #[test]
    fn unknown_or_missing_extension_defaults_to_svg() {
        assert_eq!(route("out.jpeg", None).unwrap().kind, ArtifactKind::Vector);
        assert_eq!(route("out", None).unwrap().kind, ArtifactKind::Vector);
        assert_eq!(route("dir.png/out", None).unwrap().kind, ArtifactKind::Vector);
    }

    #[test]
    fn sentinels_are_exact_tokens() {
        // "SVG" is not the sentinel, so it names a file without extension
        let r = route("SVG", None).unwrap();
        assert_eq!(r.target, OutputTarget::File(PathBuf::from("SVG")));
    }

    #[test]
    fn format_overrides_extension() {
        let r = route("diagram.svg", Some("PNG")).unwrap();
        assert_eq!(r.kind, ArtifactKind::Raster);
        let err = route("svg", Some("png")).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedStdoutFormat");
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let err = route("diagram.svg", Some("pdf")).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedOutputType");
    }

    #[test]
    fn write_to_emits_raw_bytes() {
        let mut buf = Vec::new();
        write_to(&Artifact::Vector("<svg></svg>".into()), &mut buf).unwrap();
        assert_eq!(buf, b"<svg></svg>");
    }

    #[test]
    fn write_overwrites_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.svg");
        std::fs::write(&path, "old contents that are longer").unwrap();
        write(&Artifact::Vector("<svg/>".into()), &OutputTarget::File(path.clone())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>");
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let err = write(&Artifact::Raster(vec![1, 2, 3]), &OutputTarget::File(path)).unwrap_err();
        assert_eq!(err.kind(), "FileWriteError");
    }
}
