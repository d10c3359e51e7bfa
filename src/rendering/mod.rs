//! Rendering stages run against a surface
//!
//! Each stage is a free function over a [`SurfaceHandle`](crate::SurfaceHandle):
//! `vector` produces markup, `probe` measures mounted content, `geometry`
//! turns the measurement into a capture size and `capture` samples pixels.

pub mod capture;
pub mod geometry;
pub mod probe;
pub mod vector;
