pub(crate) mod imageops;
mod raster;
mod regularize;
mod scatter;
mod text;

pub use raster::{BBox, GlyphRasterizer};
pub use regularize::Regularizer;
pub use scatter::{Cluster, ClusterRule, ScatterRequest, compose_scatter, scatter_units};
pub use text::{RenderRequest, RenderResult, render_text};
