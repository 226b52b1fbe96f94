//! Shared types for the edge tracing engine.

use serde::{Deserialize, Serialize};

/// Identifier of an edge: its position in the [`EdgeTable`](crate::EdgeTable).
///
/// Identifiers are stable across merges (the merged edge keeps the smaller
/// identifier, the larger one becomes a tombstone) and only change when the
/// table is compacted via
/// [`EdgeProcessor::clean_up_edges`](crate::EdgeProcessor::clean_up_edges).
pub type EdgeId = usize;

/// An integer pixel coordinate in image space.
///
/// `x` grows to the right, `y` grows downward, matching the raster layout
/// of the input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal position (pixels from the left edge).
    pub x: i32,
    /// Vertical position (pixels from the top edge).
    pub y: i32,
}

impl PixelPoint {
    /// Create a new pixel point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    /// Returns `true` if the two points are 8-neighbors.
    ///
    /// A squared distance of 2 or less replaces the `< 1.5` norm test: any
    /// pair of pixels that are not 8-adjacent is at least 2 apart. A point
    /// is considered a neighbor of itself, which the closure test relies on.
    #[must_use]
    pub const fn is_eight_neighbor(self, other: Self) -> bool {
        self.distance_squared(other) <= 2
    }
}

impl std::fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Errors that can occur in the edge tracing engine.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// An operation was requested in a state it cannot run in, e.g.
    /// post-processing before any tracing pass.
    #[error("invalid processor state: {0}")]
    InvalidState(String),

    /// A configuration struct failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration for continuity-weighted connection inside clusters
/// ([`EdgeProcessor::connect_edges_in_clusters`](crate::EdgeProcessor::connect_edges_in_clusters)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConnectConfig {
    /// Number of pixels walked from each connection point to estimate the
    /// local tangent angle of an edge.
    pub fit_window: usize,

    /// Maximum angular mismatch in degrees. Two tangents match best when
    /// they point at each other (folded difference of 0°); pairs at or
    /// above this threshold are never connected.
    pub threshold_angle: f64,

    /// Weight on the angular mismatch in the cost `C = alpha*angle + beta*distance`.
    pub alpha: f64,

    /// Weight on the pixel distance in the cost `C = alpha*angle + beta*distance`.
    pub beta: f64,

    /// Whether an edge may be connected with itself (closing it through
    /// the cluster). Three-pixel L edges are never self-connected.
    pub connect_same_edge: bool,
}

impl ClusterConnectConfig {
    /// Default tangent estimation window in pixels.
    pub const DEFAULT_FIT_WINDOW: usize = 5;
    /// Default angular mismatch threshold in degrees.
    pub const DEFAULT_THRESHOLD_ANGLE: f64 = 40.0;
    /// Default weight on angular mismatch.
    pub const DEFAULT_ALPHA: f64 = 1.0;
    /// Default weight on pixel distance.
    pub const DEFAULT_BETA: f64 = 1.0;
    /// Self-connections are allowed by default.
    pub const DEFAULT_CONNECT_SAME_EDGE: bool = true;

    /// Validate that all fields satisfy the documented invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidConfig`] with a human-readable message
    /// if any invariant is violated.
    pub fn validate(&self) -> Result<(), TraceError> {
        validate_fit_window(self.fit_window)?;
        validate_threshold_angle(self.threshold_angle)?;
        validate_weights(self.alpha, self.beta)
    }
}

impl Default for ClusterConnectConfig {
    fn default() -> Self {
        Self {
            fit_window: Self::DEFAULT_FIT_WINDOW,
            threshold_angle: Self::DEFAULT_THRESHOLD_ANGLE,
            alpha: Self::DEFAULT_ALPHA,
            beta: Self::DEFAULT_BETA,
            connect_same_edge: Self::DEFAULT_CONNECT_SAME_EDGE,
        }
    }
}

/// Configuration for gap bridging between closely aligned edges
/// ([`EdgeProcessor::bridge_edge_gaps`](crate::EdgeProcessor::bridge_edge_gaps)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapBridgeConfig {
    /// Number of pixels walked from each endpoint to estimate the local
    /// tangent angle of an edge.
    pub fit_window: usize,

    /// Maximum angular mismatch in degrees, applied both when scanning the
    /// search window and when scoring candidates.
    pub threshold_angle: f64,

    /// Chebyshev radius of the square search window around each endpoint.
    pub block_distance: i32,

    /// Weight on the angular mismatch in the cost `C = alpha*angle + beta*distance`.
    pub alpha: f64,

    /// Weight on the pixel distance in the cost `C = alpha*angle + beta*distance`.
    pub beta: f64,
}

impl GapBridgeConfig {
    /// Default tangent estimation window in pixels.
    pub const DEFAULT_FIT_WINDOW: usize = 5;
    /// Default angular mismatch threshold in degrees.
    pub const DEFAULT_THRESHOLD_ANGLE: f64 = 40.0;
    /// Default search window radius in pixels.
    pub const DEFAULT_BLOCK_DISTANCE: i32 = 5;
    /// Default weight on angular mismatch.
    pub const DEFAULT_ALPHA: f64 = 1.0;
    /// Default weight on pixel distance.
    pub const DEFAULT_BETA: f64 = 1.0;

    /// Validate that all fields satisfy the documented invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidConfig`] with a human-readable message
    /// if any invariant is violated.
    pub fn validate(&self) -> Result<(), TraceError> {
        validate_fit_window(self.fit_window)?;
        validate_threshold_angle(self.threshold_angle)?;
        validate_weights(self.alpha, self.beta)?;
        if self.block_distance < 0 {
            return Err(TraceError::InvalidConfig(format!(
                "block_distance must be non-negative, got {}",
                self.block_distance,
            )));
        }
        Ok(())
    }
}

impl Default for GapBridgeConfig {
    fn default() -> Self {
        Self {
            fit_window: Self::DEFAULT_FIT_WINDOW,
            threshold_angle: Self::DEFAULT_THRESHOLD_ANGLE,
            block_distance: Self::DEFAULT_BLOCK_DISTANCE,
            alpha: Self::DEFAULT_ALPHA,
            beta: Self::DEFAULT_BETA,
        }
    }
}

/// Selects which edge classes length-based pruning applies to.
///
/// Every non-empty edge falls in exactly one class, determined by how many
/// of its endpoints lie in a cluster: *free* (neither), *dangling* (exactly
/// one), *bridged* (both).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneClasses {
    /// Remove free-standing edges (no endpoint in a cluster).
    pub free: bool,
    /// Remove dangling edges (exactly one endpoint in a cluster).
    pub dangling: bool,
    /// Remove bridged edges (both endpoints in clusters).
    pub bridged: bool,
}

impl PruneClasses {
    /// Returns `true` if at least one class is selected.
    #[must_use]
    pub const fn any_enabled(self) -> bool {
        self.free || self.dangling || self.bridged
    }
}

impl Default for PruneClasses {
    fn default() -> Self {
        Self {
            free: true,
            dangling: true,
            bridged: false,
        }
    }
}

fn validate_fit_window(fit_window: usize) -> Result<(), TraceError> {
    if fit_window == 0 {
        return Err(TraceError::InvalidConfig(
            "fit_window must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

fn validate_threshold_angle(threshold_angle: f64) -> Result<(), TraceError> {
    if !(threshold_angle > 0.0 && threshold_angle < 360.0) {
        return Err(TraceError::InvalidConfig(format!(
            "threshold_angle must be in (0, 360) degrees, got {threshold_angle}",
        )));
    }
    Ok(())
}

fn validate_weights(alpha: f64, beta: f64) -> Result<(), TraceError> {
    if !(alpha.is_finite() && alpha >= 0.0) {
        return Err(TraceError::InvalidConfig(format!(
            "alpha must be finite and non-negative, got {alpha}",
        )));
    }
    if !(beta.is_finite() && beta >= 0.0) {
        return Err(TraceError::InvalidConfig(format!(
            "beta must be finite and non-negative, got {beta}",
        )));
    }
    Ok(())
}
