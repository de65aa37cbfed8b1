pub mod abort;
pub mod bake;
pub mod cli;
pub mod config;
pub mod cubemap;
pub mod ggx;
pub mod procedural;
pub mod report;

pub use abort::{AbortSignal, NeverAbort};
pub use cubemap::{ConvolveReport, CubeFace, CubeMap, GgxSettings, LobeStats};
