//! suji: edge tracing and ambiguity-cluster management (sans-IO).
//!
//! Converts a thinned binary edge image into vector form:
//! cluster preprocessing -> recursive tracing -> edge / edge-id
//! bookkeeping, plus geometry-aware post-processing (continuity-weighted
//! connection inside clusters, gap bridging, closure, length-based
//! pruning, three-pixel absorption).
//!
//! This crate has **no I/O dependencies** -- it reads pixels through the
//! [`EdgeImage`] trait (implemented for [`image::GrayImage`]) and returns
//! structured data. Decoding, thinning, rendering, and annotation live
//! with external collaborators.
//!
//! # Overview
//!
//! [`EdgeProcessor`] owns the two data structures of a processing
//! session: the [`EdgeTable`] (ordered edges, each an ordered pixel
//! sequence, identified by position) and the [`EdgeMap`] (per-pixel
//! edge-id index plus per-pixel ambiguity-cluster index). A session
//! starts with [`EdgeProcessor::trace_edges`]; post-processing operations
//! mutate both structures in lockstep, and renderers read them afterward
//! through the read-only views.
//!
//! ```
//! use image::{GrayImage, Luma};
//! use suji::EdgeProcessor;
//!
//! let mut img = GrayImage::new(5, 1);
//! for x in 0..5 {
//!     img.put_pixel(x, 0, Luma([255]));
//! }
//!
//! let mut processor = EdgeProcessor::new();
//! processor.trace_edges(&img);
//! assert_eq!(processor.edges().len(), 1);
//! assert_eq!(processor.edges().edge_len(0), 5);
//! ```

mod bridge;
mod connect;
pub mod geometry;
pub mod map;
pub mod neighborhood;
pub mod processor;
mod prune;
pub mod raster;
pub mod table;
pub mod types;

pub use geometry::{bresenham_line, edge_angle, point_pair_angle};
pub use map::EdgeMap;
pub use processor::EdgeProcessor;
pub use raster::EdgeImage;
pub use table::EdgeTable;
pub use types::{
    ClusterConnectConfig, EdgeId, GapBridgeConfig, PixelPoint, PruneClasses, TraceError,
};
