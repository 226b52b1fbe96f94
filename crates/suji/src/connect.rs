//! Cluster-local post-processing: continuity-weighted connection,
//! closure, two-edge connection, three-pixel absorption, and removal of
//! degenerate clusters.

use crate::geometry::{bresenham_line, edge_angle};
use crate::processor::EdgeProcessor;
use crate::types::{ClusterConnectConfig, EdgeId, PixelPoint, TraceError};

/// The winning pair of one candidate scan at a cluster.
#[derive(Debug, Clone, Copy)]
struct ClusterConnection {
    first_id: EdgeId,
    second_id: EdgeId,
    first_point: PixelPoint,
    second_point: PixelPoint,
}

impl EdgeProcessor {
    /// Connect edges meeting in the same cluster by angular continuity.
    ///
    /// For every cluster pixel, all pairs of connection points of
    /// non-closed incident edges are scored with
    /// `C = alpha * angle_mismatch + beta * distance`, where the mismatch
    /// folds the two tangent angles around 180 degrees (0 means the
    /// tangents point at each other). The cheapest pair below the angle
    /// threshold is bridged with a Bresenham segment and merged; this
    /// repeats at the same pixel until no pair qualifies. With
    /// `connect_same_edge` the two ends of one edge may be joined,
    /// closing it -- except for three-pixel L edges.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidConfig`] for an invalid `config` and
    /// [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn connect_edges_in_clusters(
        &mut self,
        config: &ClusterConnectConfig,
    ) -> Result<(), TraceError> {
        config.validate()?;
        self.require_traced()?;

        for y in 0..self.edge_map().rows() {
            for x in 0..self.edge_map().cols() {
                if !self.edge_map().is_cluster(x, y) {
                    continue;
                }

                while let Some(connection) = self.best_cluster_connection(x, y, config) {
                    let bridge = bresenham_line(connection.first_point, connection.second_point);
                    let bridge_id = self.push_bridge(bridge);
                    self.merge_edges(connection.first_id, bridge_id);

                    // Joining an edge with itself only needs the bridge;
                    // the connecting pixels are already part of it then.
                    if connection.first_id != connection.second_id {
                        self.merge_edges(connection.first_id, connection.second_id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Scan all connection-point pairs at the cluster of `(x, y)` and
    /// return the cheapest qualifying one.
    fn best_cluster_connection(
        &self,
        x: i32,
        y: i32,
        config: &ClusterConnectConfig,
    ) -> Option<ClusterConnection> {
        let cluster_edge_ids = self.edge_map().cluster_edge_ids(x, y);

        let mut smallest_cost = f64::INFINITY;
        let mut best = None;

        for (i, &first_id) in cluster_edge_ids.iter().enumerate() {
            // There is no meaningful connection point on a closed edge.
            if self.edges().is_closed(first_id) {
                continue;
            }

            for first_point in self.connection_points_in_cluster(x, y, first_id) {
                let first_angle = edge_angle(&self.edges().points_from(
                    first_id,
                    first_point,
                    config.fit_window,
                ));

                for &second_id in &cluster_edge_ids[i..] {
                    if self.edges().is_closed(second_id) {
                        continue;
                    }
                    // Connecting a three-pixel L with itself is not
                    // meaningful.
                    if first_id == second_id && self.edges().is_three_pixel_l(first_id) {
                        continue;
                    }
                    if first_id == second_id && !config.connect_same_edge {
                        continue;
                    }

                    for second_point in self.connection_points_in_cluster(x, y, second_id) {
                        if first_point == second_point && first_id == second_id {
                            continue;
                        }

                        let second_angle = edge_angle(&self.edges().points_from(
                            second_id,
                            second_point,
                            config.fit_window,
                        ));

                        // Best match is at 180: the tangents point at
                        // each other.
                        let angle_diff = ((first_angle - second_angle).abs() - 180.0).abs();
                        let distance = first_point.distance(second_point);
                        let cost = config.alpha * angle_diff + config.beta * distance;

                        if angle_diff < config.threshold_angle && cost < smallest_cost {
                            smallest_cost = cost;
                            best = Some(ClusterConnection {
                                first_id,
                                second_id,
                                first_point,
                                second_point,
                            });
                        }
                    }
                }
            }
        }

        best
    }

    /// Close edges whose start and end both lie in the same cluster.
    ///
    /// Applies to non-closed edges of at least 5 points; the endpoints
    /// are bridged with a Bresenham segment and merged in.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn close_edges_in_clusters(&mut self) -> Result<(), TraceError> {
        self.require_traced()?;

        for y in 0..self.edge_map().rows() {
            for x in 0..self.edge_map().cols() {
                if !self.edge_map().is_cluster(x, y) {
                    continue;
                }

                for edge_id in self.edge_map().cluster_edge_ids(x, y) {
                    // Anything shorter cannot put both of its endpoints
                    // into the cluster without already being closed.
                    if self.edges().edge_len(edge_id) < 5 {
                        continue;
                    }
                    let (Some(start), Some(end)) = (
                        self.edges().start_point(edge_id),
                        self.edges().end_point(edge_id),
                    ) else {
                        continue;
                    };

                    let both_in_cluster = self.edge_map().is_point_in_cluster(x, y, start)
                        && self.edge_map().is_point_in_cluster(x, y, end);
                    if both_in_cluster && !self.edges().is_closed(edge_id) {
                        log::debug!("closing edge {edge_id} across the cluster at ({x}, {y})");
                        let bridge_id = self.push_bridge(bresenham_line(start, end));
                        self.merge_edges(edge_id, bridge_id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Connect the two edges of every cluster with exactly two incident
    /// non-closed edges.
    ///
    /// Each edge must have exactly one endpoint in the cluster (its
    /// connection point). With `only_if_8_neighbors` the connection only
    /// happens when the two points are 8-adjacent (joined directly);
    /// otherwise a Bresenham bridge is used. After a merge the cluster is
    /// optionally cleared, and a merged edge that came out closed with
    /// neither endpoint in a cluster is rotated so that its first pixel
    /// lies in a cluster, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn connect_edges_in_two_edge_clusters(
        &mut self,
        only_if_8_neighbors: bool,
        delete_clusters_after_connect: bool,
    ) -> Result<(), TraceError> {
        self.require_traced()?;

        for y in 0..self.edge_map().rows() {
            for x in 0..self.edge_map().cols() {
                let cluster_edge_ids = self.edge_map().cluster_edge_ids(x, y);

                // A single branch point on a closed contour also shows up
                // as a two-id cluster; the contour cannot be merged
                // further, so closed edges are excluded.
                let [first_id, second_id] = cluster_edge_ids.as_slice() else {
                    continue;
                };
                let (first_id, second_id) = (*first_id, *second_id);
                if !self.edge_map().is_cluster(x, y)
                    || self.edges().is_closed(first_id)
                    || self.edges().is_closed(second_id)
                {
                    continue;
                }

                let (Some(first_point), Some(second_point)) = (
                    self.exclusive_connection_point(x, y, first_id),
                    self.exclusive_connection_point(x, y, second_id),
                ) else {
                    continue;
                };

                let are_8_neighbors = first_point.is_eight_neighbor(second_point);
                let merged = if only_if_8_neighbors && are_8_neighbors {
                    let bridge_id = self.push_bridge(vec![first_point, second_point]);
                    self.merge_edges(first_id, bridge_id);
                    self.merge_edges(first_id, second_id);
                    true
                } else if !only_if_8_neighbors {
                    let bridge_id = self.push_bridge(bresenham_line(first_point, second_point));
                    self.merge_edges(first_id, bridge_id);
                    self.merge_edges(first_id, second_id);
                    true
                } else {
                    false
                };

                if !merged {
                    continue;
                }
                if delete_clusters_after_connect {
                    self.edge_map_mut().clear_cluster(x, y);
                }

                // Removing ambiguity can close a contour whose endpoints
                // ended up outside every cluster; rotate it so the first
                // pixel sits in a cluster again.
                let merged_id = first_id.min(second_id);
                self.rotate_closed_edge_into_cluster(merged_id);
            }
        }
        Ok(())
    }

    /// Absorb three-pixel edges that connect two clusters.
    ///
    /// For every length-3 edge whose first and last pixels both lie in
    /// clusters: the middle pixel joins the first endpoint's cluster, and
    /// when the two endpoint clusters are distinct (by their edge-id
    /// sets) the second cluster is folded into the first. The edge itself
    /// is unregistered and tombstoned.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn three_point_edges_to_clusters(&mut self) -> Result<(), TraceError> {
        self.require_traced()?;

        for edge_id in 0..self.edges().len() {
            if self.edges().edge_len(edge_id) != 3 {
                continue;
            }
            let edge = self.edges().edge(edge_id).to_vec();
            let (start, middle, end) = (edge[0], edge[1], edge[2]);

            let start_in_cluster = self.edge_map().is_cluster(start.x, start.y);
            let end_in_cluster = self.edge_map().is_cluster(end.x, end.y);
            if !(start_in_cluster && end_in_cluster) {
                continue;
            }

            self.edge_map_mut().add_point_to_cluster(start.x, start.y, middle);

            // Edge-id sets double as cluster identity here: equal sets
            // mean the endpoints already share a cluster.
            if self.edge_map().cluster_edge_ids(start.x, start.y)
                != self.edge_map().cluster_edge_ids(end.x, end.y)
            {
                for point in self.edge_map().cluster_points(end.x, end.y).to_vec() {
                    self.edge_map_mut().add_point_to_cluster(start.x, start.y, point);
                }
            }

            for point in &edge {
                self.edge_map_mut().erase_edge_id(point.x, point.y, edge_id);
            }
            self.edges_mut().clear_edge(edge_id);
        }
        Ok(())
    }

    /// Clear every cluster with at most one incident edge.
    ///
    /// Such clusters appear when edges are removed; without at least two
    /// incident edges there is nothing ambiguous left to resolve.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn remove_zero_and_one_edge_clusters(&mut self) -> Result<(), TraceError> {
        self.require_traced()?;

        for y in 0..self.edge_map().rows() {
            for x in 0..self.edge_map().cols() {
                if self.edge_map().is_cluster(x, y)
                    && self.edge_map().cluster_edge_ids(x, y).len() <= 1
                {
                    self.edge_map_mut().clear_cluster(x, y);
                }
            }
        }
        Ok(())
    }

    /// The endpoints of `edge_id` that lie inside the cluster at
    /// `(x, y)`: at most the start and the end point, in that order.
    pub(crate) fn connection_points_in_cluster(
        &self,
        x: i32,
        y: i32,
        edge_id: EdgeId,
    ) -> Vec<PixelPoint> {
        let mut points = Vec::new();
        if let Some(start) = self.edges().start_point(edge_id)
            && self.edge_map().is_point_in_cluster(x, y, start)
        {
            points.push(start);
        }
        if let Some(end) = self.edges().end_point(edge_id)
            && self.edge_map().is_point_in_cluster(x, y, end)
        {
            points.push(end);
        }
        points
    }

    /// The one endpoint of `edge_id` inside the cluster at `(x, y)`, or
    /// `None` when neither or both endpoints are inside.
    pub(crate) fn exclusive_connection_point(
        &self,
        x: i32,
        y: i32,
        edge_id: EdgeId,
    ) -> Option<PixelPoint> {
        let start = self.edges().start_point(edge_id)?;
        let end = self.edges().end_point(edge_id)?;
        let start_in = self.edge_map().is_point_in_cluster(x, y, start);
        let end_in = self.edge_map().is_point_in_cluster(x, y, end);
        match (start_in, end_in) {
            (true, false) => Some(start),
            (false, true) => Some(end),
            _ => None,
        }
    }

    /// Rotate a closed edge so its first pixel lies in a cluster when
    /// both of its endpoints ended up outside every cluster. A no-op for
    /// open edges and edges that touch no cluster at all.
    fn rotate_closed_edge_into_cluster(&mut self, edge_id: EdgeId) {
        if !self.edges().is_closed(edge_id) {
            return;
        }
        let (Some(start), Some(end)) = (
            self.edges().start_point(edge_id),
            self.edges().end_point(edge_id),
        ) else {
            return;
        };
        if self.edge_map().is_cluster(start.x, start.y) || self.edge_map().is_cluster(end.x, end.y)
        {
            return;
        }

        let edge = self.edges().edge(edge_id);
        if let Some(position) = edge
            .iter()
            .position(|point| self.edge_map().is_cluster(point.x, point.y))
        {
            let mut rotated = edge.to_vec();
            rotated.rotate_left(position);
            self.edges_mut().overwrite(edge_id, rotated);
        }
    }
}
