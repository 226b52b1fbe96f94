//! Gap bridging between closely aligned edges outside clusters.

use crate::geometry::{bresenham_line, edge_angle, point_pair_angle};
use crate::processor::EdgeProcessor;
use crate::types::{EdgeId, GapBridgeConfig, PixelPoint, TraceError};

impl EdgeProcessor {
    /// Bridge gaps between closely aligned edges.
    ///
    /// Each endpoint of every non-closed edge scans the Chebyshev square
    /// of radius `block_distance` for endpoints of other edges whose
    /// direction is compatible, scores the candidates with
    /// `C = alpha * angle_mismatch + beta * distance`, and merges the
    /// cheapest one in over a Bresenham bridge. After a merge the scan
    /// resumes from the merged identifier, so a freshly grown edge is
    /// revisited until no candidate remains.
    ///
    /// Single-pixel edges carry no tangent of their own; for those the
    /// point-pair angle toward the candidate substitutes for the
    /// neighbor's tangent.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidConfig`] for an invalid `config` and
    /// [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn bridge_edge_gaps(&mut self, config: &GapBridgeConfig) -> Result<(), TraceError> {
        config.validate()?;
        self.require_traced()?;

        // Bridges pushed during merging extend the table past this
        // bound; they are tombstoned immediately and need no visit.
        let edge_count = self.edges().len();
        let mut edge_id = 0;
        while edge_id < edge_count {
            loop {
                // Tombstones left by merging are skipped, and isolated
                // single-pixel edges make no reference tangent to start
                // from.
                if self.edges().edge_len(edge_id) <= 1 {
                    break;
                }

                let Some(merged_into) = self.bridge_best_candidate(edge_id, config) else {
                    break;
                };
                // The merge result carries the smaller identifier; keep
                // working on it so the grown edge is revisited.
                edge_id = merged_into;
            }
            edge_id += 1;
        }
        Ok(())
    }

    /// Try both endpoints of `edge_id` in order; merge the first endpoint
    /// that has a qualifying candidate and return the merged identifier.
    fn bridge_best_candidate(
        &mut self,
        edge_id: EdgeId,
        config: &GapBridgeConfig,
    ) -> Option<EdgeId> {
        for side in 0..2 {
            if self.edges().is_closed(edge_id) {
                continue;
            }
            let reference = if side == 0 {
                self.edges().start_point(edge_id)?
            } else {
                self.edges().end_point(edge_id)?
            };
            let reference_angle = edge_angle(&self.edges().points_from(
                edge_id,
                reference,
                config.fit_window,
            ));

            let candidates = self.edges_in_search_area(
                reference,
                config.block_distance,
                config.threshold_angle,
                reference_angle,
            );

            let mut smallest_cost = f64::INFINITY;
            let mut best: Option<(EdgeId, PixelPoint)> = None;

            for &(candidate_id, candidate_point) in &candidates {
                if self.edges().is_closed(candidate_id) {
                    continue;
                }

                let neighbor_angle = edge_angle(&self.edges().points_from(
                    candidate_id,
                    candidate_point,
                    config.fit_window,
                ));
                let mut angle_diff = ((reference_angle - neighbor_angle).abs() - 180.0).abs();

                if self.edges().edge_len(candidate_id) == 1 {
                    let neighbor_point_angle = point_pair_angle(reference, candidate_point);
                    angle_diff = (reference_angle - neighbor_point_angle).abs();
                }

                let distance = reference.distance(candidate_point);
                let cost = config.alpha * angle_diff + config.beta * distance;

                if angle_diff < config.threshold_angle && cost < smallest_cost {
                    smallest_cost = cost;
                    best = Some((candidate_id, candidate_point));
                }
            }

            if let Some((candidate_id, candidate_point)) = best {
                let bridge_id = self.push_bridge(bresenham_line(reference, candidate_point));
                self.merge_edges(edge_id, bridge_id);
                self.merge_edges(edge_id, candidate_id);
                return Some(edge_id.min(candidate_id));
            }
        }
        None
    }

    /// Endpoints of other edges inside the search window around `p`,
    /// with their edge identifier.
    ///
    /// A pixel qualifies when its point-pair angle from `p` is within the
    /// threshold of the reference tangent, it carries exactly one edge
    /// identifier, it is not in a cluster, and it is the first or last
    /// pixel of that edge.
    fn edges_in_search_area(
        &self,
        p: PixelPoint,
        block_distance: i32,
        threshold_angle: f64,
        reference_angle: f64,
    ) -> Vec<(EdgeId, PixelPoint)> {
        let mut found = Vec::new();

        for dy in -block_distance..=block_distance {
            for dx in -block_distance..=block_distance {
                let neighbor = PixelPoint::new(p.x + dx, p.y + dy);

                let neighbor_point_angle = point_pair_angle(p, neighbor);
                if (reference_angle - neighbor_point_angle).abs() >= threshold_angle {
                    continue;
                }

                let inside = neighbor.x >= 0
                    && neighbor.y >= 0
                    && neighbor.x < self.edge_map().cols()
                    && neighbor.y < self.edge_map().rows();
                if !inside {
                    continue;
                }

                if self.edge_map().edge_id_count(neighbor.x, neighbor.y) != 1
                    || self.edge_map().is_cluster(neighbor.x, neighbor.y)
                {
                    continue;
                }

                let neighbor_id = self.edge_map().edge_ids(neighbor.x, neighbor.y)[0];
                if self.edges().start_point(neighbor_id) == Some(neighbor)
                    || self.edges().end_point(neighbor_id) == Some(neighbor)
                {
                    found.push((neighbor_id, neighbor));
                }
            }
        }

        found
    }
}
