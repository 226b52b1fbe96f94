//! The orchestration layer: cluster preprocessing, tracing, and the
//! merge protocol.
//!
//! [`EdgeProcessor`] owns both the [`EdgeTable`] and the [`EdgeMap`] and
//! exposes only high-level operations, so every mutation of one side is
//! paired with the matching update of the other in the same step. On
//! return from any public operation, every non-empty edge is registered
//! at each of its pixels and no tombstone is registered anywhere.

use crate::map::EdgeMap;
use crate::neighborhood::{contains_four_cluster, direct_neighbors, occupancy_code};
use crate::raster::{EdgeImage, OverlayRaster};
use crate::table::EdgeTable;
use crate::types::{EdgeId, PixelPoint, TraceError};

/// Traces a thinned binary edge image into ordered edges and ambiguity
/// clusters, and post-processes the resulting graph.
///
/// A processing session starts with [`trace_edges`](Self::trace_edges);
/// post-processing operations mutate the traced state and renderers read
/// it afterward through [`edges`](Self::edges) and
/// [`edge_map`](Self::edge_map).
#[derive(Debug, Default)]
pub struct EdgeProcessor {
    edge_id_counter: usize,
    edges: EdgeTable,
    edge_map: EdgeMap,
    traced: bool,
}

impl EdgeProcessor {
    /// Create a processor with no traced state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the traced edges.
    #[must_use]
    pub const fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    /// Read-only view of the per-pixel edge-id and cluster indices.
    #[must_use]
    pub const fn edge_map(&self) -> &EdgeMap {
        &self.edge_map
    }

    /// Trace all edges of a thinned binary image.
    ///
    /// Resets any previous state, detects ambiguity clusters, then sweeps
    /// the image in raster order: every edge pixel that has no edge-id
    /// yet and is outside every cluster seeds a trace. Tracing is
    /// deterministic -- identical input produces identical edges with
    /// identical identifiers.
    pub fn trace_edges<I: EdgeImage + ?Sized>(&mut self, img: &I) {
        self.edge_id_counter = 0;
        self.edges.clear();
        self.edge_map.init(img.rows(), img.cols());

        self.preprocess_clusters(img);

        for y in 0..img.rows() {
            for x in 0..img.cols() {
                if img.is_edge(x, y)
                    && self.edge_map.edge_id_count(x, y) == 0
                    && !self.edge_map.is_cluster(x, y)
                {
                    self.trace_edge(img, PixelPoint::new(x, y), Vec::new());
                }
            }
        }

        self.traced = true;
    }

    /// Identify all ambiguity clusters of `img` and store them in the
    /// cluster index.
    ///
    /// A pixel is a cluster point iff its occupancy code contains a
    /// corner four-cluster or it has more than two direct neighbors. Each
    /// unclustered cluster point seeds a breadth-first expansion over
    /// direct neighbors that admits further cluster points; the finished
    /// cluster list is stored at every member pixel.
    fn preprocess_clusters<I: EdgeImage + ?Sized>(&mut self, img: &I) {
        for y in 0..img.rows() {
            for x in 0..img.cols() {
                if !img.is_edge(x, y) || self.edge_map.is_cluster(x, y) {
                    continue;
                }
                let point = PixelPoint::new(x, y);
                if !is_cluster_point(img, point) {
                    continue;
                }

                let mut cluster = vec![point];
                let mut c = 0;
                while c < cluster.len() {
                    for neighbor in direct_neighbors(img, cluster[c]) {
                        if !cluster.contains(&neighbor) && is_cluster_point(img, neighbor) {
                            cluster.push(neighbor);
                        }
                    }
                    c += 1;
                }

                for member in &cluster {
                    self.edge_map.set_cluster(member.x, member.y, cluster.clone());
                }
            }
        }
    }

    /// Trace one edge starting at `start`, extending `edge`.
    ///
    /// Chains (a single unvisited continuation) are followed iteratively;
    /// recursion only happens at a two-way branch, where each side is
    /// traced as its own edge seeded with the branch pixel and the two
    /// results are merged afterward. Cluster pixels terminate a trace:
    /// they are entered (so edges reach cluster boundaries) but never
    /// expanded from.
    fn trace_edge<I: EdgeImage + ?Sized>(
        &mut self,
        img: &I,
        start: PixelPoint,
        mut edge: Vec<PixelPoint>,
    ) {
        let mut point = start;
        loop {
            edge.push(point);
            self.edge_map.push_edge_id(point.x, point.y, self.edge_id_counter);

            let unvisited: Vec<PixelPoint> = if self.edge_map.is_cluster(point.x, point.y) {
                Vec::new()
            } else {
                direct_neighbors(img, point)
                    .into_iter()
                    .filter(|q| {
                        self.edge_map.edge_id_count(q.x, q.y) == 0
                            || self.edge_map.is_cluster(q.x, q.y)
                    })
                    .collect()
            };

            match unvisited.as_slice() {
                [] => {
                    self.edges.push_back(edge);
                    self.edge_id_counter += 1;
                    return;
                }
                [next] => point = *next,
                [first, second, ..] => {
                    // A non-cluster pixel has at most two direct
                    // continuations; trace both sides and splice them.
                    let (first, second) = (*first, *second);
                    self.trace_edge(img, first, vec![point]);
                    self.trace_edge(img, second, vec![point]);
                    self.merge_edges(self.edge_id_counter - 2, self.edge_id_counter - 1);
                    return;
                }
            }
        }
    }

    /// Merge two edges into the smaller identifier.
    ///
    /// The merged edge is written to `min(first, second)`; the larger
    /// position becomes a tombstone. The edge-id index is rewritten for
    /// every pixel of the second edge. Merging an identifier with itself
    /// is logged and skipped.
    pub(crate) fn merge_edges(&mut self, first: EdgeId, second: EdgeId) {
        let (first, second) = if second < first {
            (second, first)
        } else {
            (first, second)
        };
        if first == second {
            log::warn!("cannot merge edge {first} with itself");
            return;
        }

        log::debug!("merging edge {first} and {second}");

        let first_edge = self.edges.edge(first).to_vec();
        let second_edge = self.edges.edge(second).to_vec();

        self.edges.clear_edge(first);
        self.edges.clear_edge(second);

        // Both identifiers may be registered at shared pixels; push is
        // deduplicated, so the second id is simply replaced by the first.
        for point in &second_edge {
            self.edge_map.erase_edge_id(point.x, point.y, second);
            self.edge_map.push_edge_id(point.x, point.y, first);
        }

        let spliced = splice_edges(first_edge, second_edge);
        self.edges.overwrite(first, spliced);
    }

    /// Compact the edge table and rebuild the edge-id index.
    ///
    /// Afterwards there are no tombstones and identifiers are contiguous
    /// from zero.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn clean_up_edges(&mut self) -> Result<(), TraceError> {
        self.require_traced()?;

        self.edges.erase_empty_edges();
        self.edge_map.reset_edge_ids();

        let Self { edges, edge_map, .. } = self;
        for (edge_id, edge) in edges.iter().enumerate() {
            for point in edge {
                edge_map.push_edge_id(point.x, point.y, edge_id);
            }
        }
        Ok(())
    }

    /// Re-detect ambiguity clusters from the input image unioned with all
    /// currently traced edge pixels.
    ///
    /// Bridges added by post-processing can create junctions the original
    /// image did not have; rerunning cluster preprocessing on the overlay
    /// picks those up.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run or
    /// the image dimensions do not match the traced state.
    pub fn reset_clusters<I: EdgeImage + ?Sized>(&mut self, img: &I) -> Result<(), TraceError> {
        self.require_traced()?;
        if img.rows() != self.edge_map.rows() || img.cols() != self.edge_map.cols() {
            return Err(TraceError::InvalidState(format!(
                "image is {}x{} but the traced state is {}x{}",
                img.rows(),
                img.cols(),
                self.edge_map.rows(),
                self.edge_map.cols(),
            )));
        }

        self.edge_map.reset_clusters();

        let mut overlay = OverlayRaster::from_image(img);
        for edge in &self.edges {
            for &point in edge {
                overlay.mark_edge(point);
            }
        }

        self.preprocess_clusters(&overlay);
        Ok(())
    }

    /// Reverse the point order of every edge.
    pub fn reverse_all_edges(&mut self) {
        self.edges.reverse_all();
    }

    /// Log image and tracing statistics through the `log` facade.
    pub fn log_edge_stats<I: EdgeImage + ?Sized>(&self, img: &I) {
        let total = i64::from(img.rows()) * i64::from(img.cols());
        let mut edge_pixels = 0_i64;
        for y in 0..img.rows() {
            for x in 0..img.cols() {
                if img.is_edge(x, y) {
                    edge_pixels += 1;
                }
            }
        }
        log::info!(
            "input image: {} rows x {} cols = {total} px, {edge_pixels} edge px, {} traced edges",
            img.rows(),
            img.cols(),
            self.edges.len(),
        );
    }

    /// Mutable access for sibling operation modules; the public surface
    /// only hands out read-only views.
    pub(crate) fn edges_mut(&mut self) -> &mut EdgeTable {
        &mut self.edges
    }

    pub(crate) fn edge_map_mut(&mut self) -> &mut EdgeMap {
        &mut self.edge_map
    }

    /// Append a bridge segment to the table. Its pixels are registered
    /// in the edge-id index by the merge that follows.
    pub(crate) fn push_bridge(&mut self, bridge: Vec<PixelPoint>) -> EdgeId {
        self.edges.push_back(bridge)
    }

    /// Guard for post-processing: tracing must have run first.
    pub(crate) fn require_traced(&self) -> Result<(), TraceError> {
        if self.traced {
            Ok(())
        } else {
            Err(TraceError::InvalidState(
                "no traced edges available: run trace_edges first".to_owned(),
            ))
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(edges: EdgeTable, edge_map: EdgeMap) -> Self {
        Self {
            edge_id_counter: edges.len(),
            edges,
            edge_map,
            traced: true,
        }
    }
}

/// Returns `true` iff `point` qualifies as a cluster point: its 3x3
/// occupancy contains a corner four-cluster, or it has more than two
/// direct neighbors.
fn is_cluster_point<I: EdgeImage + ?Sized>(img: &I, point: PixelPoint) -> bool {
    contains_four_cluster(occupancy_code(img, point)) || direct_neighbors(img, point).len() > 2
}

/// Splice two edges into one by matching endpoints.
///
/// The four cases are checked in order and the first match applies:
/// shared first points (reverse-prepend), first-to-last (prepend),
/// last-to-first (append), shared last points (reverse-append). A shared
/// pixel present at both ends is dropped once so closing a contour does
/// not duplicate it. Without any endpoint match the first edge is
/// returned unchanged, which callers treat as a post-condition breach.
fn splice_edges(mut first: Vec<PixelPoint>, mut second: Vec<PixelPoint>) -> Vec<PixelPoint> {
    let (Some(&a_first), Some(&a_last)) = (first.first(), first.last()) else {
        return first;
    };
    let (Some(&b_first), Some(&b_last)) = (second.first(), second.last()) else {
        return first;
    };

    if a_first == b_first {
        second.remove(0);
        if second.last() == Some(&a_last) {
            second.pop();
        }
        let _ = first.splice(0..0, second.into_iter().rev());
    } else if a_first == b_last {
        second.pop();
        if second.first() == Some(&a_last) {
            second.remove(0);
        }
        let _ = first.splice(0..0, second);
    } else if a_last == b_first {
        second.remove(0);
        first.extend(second);
    } else if a_last == b_last {
        second.pop();
        first.extend(second.into_iter().rev());
    } else {
        log::warn!(
            "edge splice: no shared endpoint between {a_first}-{a_last} and {b_first}-{b_last}, \
             keeping the first edge unchanged",
        );
    }

    first
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::grid;

    fn p(x: i32, y: i32) -> PixelPoint {
        PixelPoint::new(x, y)
    }

    /// Check the cross-index invariant: every non-empty edge is
    /// registered at each of its pixels, every registered id covers its
    /// pixel, and cluster replication is symmetric.
    fn assert_consistent(processor: &EdgeProcessor) {
        let edges = processor.edges();
        let map = processor.edge_map();

        for y in 0..map.rows() {
            for x in 0..map.cols() {
                for &edge_id in map.edge_ids(x, y) {
                    assert!(
                        edges.edge(edge_id).contains(&p(x, y)),
                        "edge {edge_id} registered at ({x}, {y}) but does not contain it",
                    );
                }
                for &member in map.cluster_points(x, y) {
                    assert!(
                        map.is_point_in_cluster(member.x, member.y, p(x, y)),
                        "cluster replication broken between ({x}, {y}) and {member}",
                    );
                }
            }
        }

        for (edge_id, edge) in edges.iter().enumerate() {
            for point in edge {
                assert!(
                    map.edge_ids(point.x, point.y).contains(&edge_id),
                    "edge {edge_id} missing from the index at {point}",
                );
            }
        }
    }

    fn non_empty_edges(processor: &EdgeProcessor) -> Vec<Vec<PixelPoint>> {
        processor
            .edges()
            .iter()
            .filter(|e| !e.is_empty())
            .cloned()
            .collect()
    }

    #[test]
    fn straight_line_is_one_edge() {
        let img = grid(&["#####"]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        let edges = non_empty_edges(&processor);
        assert_eq!(edges.len(), 1);
        assert_eq!(
            edges[0],
            vec![p(0, 0), p(1, 0), p(2, 0), p(3, 0), p(4, 0)],
        );
        assert_consistent(&processor);
    }

    #[test]
    fn empty_image_produces_nothing() {
        let img = grid(&["...", "..."]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);
        assert!(processor.edges().is_empty());
    }

    #[test]
    fn one_by_one_image() {
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&grid(&["#"]));
        let edges = non_empty_edges(&processor);
        assert_eq!(edges, vec![vec![p(0, 0)]]);

        processor.trace_edges(&grid(&["."]));
        assert!(processor.edges().is_empty());
    }

    #[test]
    fn isolated_pixel_becomes_single_point_edge() {
        let img = grid(&[
            ".....", //
            "..#..",
            ".....",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        let edges = non_empty_edges(&processor);
        assert_eq!(edges, vec![vec![p(2, 1)]]);
        assert_consistent(&processor);
    }

    #[test]
    fn t_junction_produces_three_arm_edges() {
        let img = grid(&[
            "###", //
            ".#.",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        // The junction pixel is a cluster of one; each arm traces into it.
        assert!(processor.edge_map().is_cluster(1, 0));
        assert_eq!(processor.edge_map().cluster_points(1, 0), &[p(1, 0)]);

        let edges = non_empty_edges(&processor);
        assert_eq!(edges.len(), 3);
        for edge in &edges {
            assert_eq!(edge.len(), 2);
            assert_eq!(*edge.last().unwrap(), p(1, 0));
        }
        assert_eq!(processor.edge_map().cluster_edge_ids(1, 0), vec![0, 1, 2]);
        assert_consistent(&processor);
    }

    #[test]
    fn plus_junction_produces_four_arm_edges() {
        let img = grid(&[
            ".#.", //
            "###",
            ".#.",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        assert!(processor.edge_map().is_cluster(1, 1));
        let edges = non_empty_edges(&processor);
        assert_eq!(edges.len(), 4);
        for edge in &edges {
            assert_eq!(edge.len(), 2);
        }
        assert_eq!(
            processor.edge_map().cluster_edge_ids(1, 1),
            vec![0, 1, 2, 3],
        );
        assert_consistent(&processor);
    }

    #[test]
    fn ring_produces_one_closed_edge() {
        let img = grid(&[
            "###", //
            "#.#",
            "###",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        let edges = non_empty_edges(&processor);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].len(), 8);
        // The surviving identifier is 0; the splice partner is a tombstone.
        assert!(processor.edges().is_closed(0));
        assert_consistent(&processor);
    }

    #[test]
    fn diamond_seed_in_the_middle_merges_both_sides() {
        // The raster sweep seeds at (1, 0), which has two divergent
        // continuations; both are traced and spliced back into one loop.
        let img = grid(&[
            ".#.", //
            "#.#",
            ".#.",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        let edges = non_empty_edges(&processor);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].len(), 4);
        assert!(processor.edges().is_closed(0));
        assert_consistent(&processor);
    }

    #[test]
    fn square_block_is_one_cluster_with_no_edges() {
        let img = grid(&[
            "##", //
            "##",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        assert!(processor.edges().is_empty());
        for y in 0..2 {
            for x in 0..2 {
                assert!(processor.edge_map().is_cluster(x, y));
                assert_eq!(processor.edge_map().cluster_point_count(x, y), 4);
            }
        }
        assert_consistent(&processor);
    }

    #[test]
    fn tracing_is_deterministic() {
        let rows = [
            "#...#..", //
            ".#.#...",
            "..#....",
            ".#.#...",
            "#...###",
        ];
        let mut a = EdgeProcessor::new();
        a.trace_edges(&grid(&rows));
        let mut b = EdgeProcessor::new();
        b.trace_edges(&grid(&rows));

        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn retrace_resets_previous_state() {
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&grid(&["#####"]));
        processor.trace_edges(&grid(&["##"]));

        let edges = non_empty_edges(&processor);
        assert_eq!(edges, vec![vec![p(0, 0), p(1, 0)]]);
        assert_consistent(&processor);
    }

    // --- splice_edges ---

    #[test]
    fn splice_case_i_shared_first() {
        let a = vec![p(2, 2), p(3, 2), p(4, 2)];
        let b = vec![p(2, 2), p(1, 2), p(0, 2)];
        assert_eq!(
            splice_edges(a, b),
            vec![p(0, 2), p(1, 2), p(2, 2), p(3, 2), p(4, 2)],
        );
    }

    #[test]
    fn splice_case_i_drops_pixel_shared_at_both_ends() {
        // Both halves of a loop share the seed and the far pixel.
        let a = vec![p(1, 0), p(0, 1), p(1, 2), p(2, 1)];
        let b = vec![p(1, 0), p(2, 1)];
        assert_eq!(
            splice_edges(a, b),
            vec![p(1, 0), p(0, 1), p(1, 2), p(2, 1)],
        );
    }

    #[test]
    fn splice_case_ii_first_to_last() {
        let a = vec![p(2, 0), p(3, 0)];
        let b = vec![p(0, 0), p(1, 0), p(2, 0)];
        assert_eq!(
            splice_edges(a, b),
            vec![p(0, 0), p(1, 0), p(2, 0), p(3, 0)],
        );
    }

    #[test]
    fn splice_case_iii_last_to_first() {
        let a = vec![p(0, 0), p(1, 0)];
        let b = vec![p(1, 0), p(2, 0), p(3, 0)];
        assert_eq!(
            splice_edges(a, b),
            vec![p(0, 0), p(1, 0), p(2, 0), p(3, 0)],
        );
    }

    #[test]
    fn splice_case_iv_shared_last() {
        let a = vec![p(0, 0), p(1, 0), p(2, 0)];
        let b = vec![p(4, 0), p(3, 0), p(2, 0)];
        assert_eq!(
            splice_edges(a, b),
            vec![p(0, 0), p(1, 0), p(2, 0), p(3, 0), p(4, 0)],
        );
    }

    #[test]
    fn splice_endpoints_come_from_the_inputs() {
        // Whatever the case, the result's endpoints are a subset of the
        // four input endpoints with the shared one moved inside.
        let a = vec![p(0, 0), p(1, 1), p(2, 2)];
        let b = vec![p(2, 2), p(3, 3), p(4, 4)];
        let spliced = splice_edges(a, b);
        assert_eq!(*spliced.first().unwrap(), p(0, 0));
        assert_eq!(*spliced.last().unwrap(), p(4, 4));
        assert_eq!(spliced.iter().filter(|&&q| q == p(2, 2)).count(), 1);
    }

    #[test]
    fn splice_without_shared_endpoint_keeps_first() {
        let a = vec![p(0, 0), p(1, 0)];
        let b = vec![p(5, 5), p(6, 5)];
        assert_eq!(splice_edges(a, b), vec![p(0, 0), p(1, 0)]);
    }

    #[test]
    fn splice_with_empty_side_keeps_first() {
        let a = vec![p(0, 0), p(1, 0)];
        assert_eq!(splice_edges(a.clone(), Vec::new()), a);
        assert!(splice_edges(Vec::new(), a).is_empty());
    }

    // --- merge bookkeeping ---

    #[test]
    fn merge_rewrites_the_edge_id_index() {
        let img = grid(&[
            "###", //
            "#.#",
            "###",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);

        // The ring merge left id 1 as a tombstone; no pixel may still
        // carry it.
        let map = processor.edge_map();
        for y in 0..3 {
            for x in 0..3 {
                assert!(!map.edge_ids(x, y).contains(&1), "stale id at ({x}, {y})");
            }
        }
    }

    #[test]
    fn merge_same_id_is_a_no_op() {
        let img = grid(&["###"]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);
        let before = processor.edges().clone();
        processor.merge_edges(0, 0);
        assert_eq!(*processor.edges(), before);
    }

    // --- cleanup / reset ---

    #[test]
    fn clean_up_requires_tracing() {
        let mut processor = EdgeProcessor::new();
        assert!(matches!(
            processor.clean_up_edges(),
            Err(TraceError::InvalidState(_)),
        ));
    }

    #[test]
    fn clean_up_removes_tombstones_and_rebuilds_index() {
        let img = grid(&[
            "###", //
            "#.#",
            "###",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);
        assert_eq!(processor.edges().len(), 2); // ring + tombstone

        processor.clean_up_edges().unwrap();
        assert_eq!(processor.edges().len(), 1);
        assert_eq!(processor.edges().edge_len(0), 8);
        assert_consistent(&processor);
    }

    #[test]
    fn reset_clusters_rejects_mismatched_dimensions() {
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&grid(&["###"]));
        let err = processor.reset_clusters(&grid(&["##"])).unwrap_err();
        assert!(matches!(err, TraceError::InvalidState(_)));
    }

    #[test]
    fn reset_clusters_detects_junctions_formed_by_edges() {
        // The image has two separate strokes; drawing them together
        // forms a T-junction, which only shows up after reset_clusters.
        let img = grid(&[
            "###", //
            ".#.",
        ]);
        let mut processor = EdgeProcessor::new();
        processor.trace_edges(&img);
        assert!(processor.edge_map().is_cluster(1, 0));

        // Clearing and re-detecting from the same image restores the
        // same cluster.
        processor.edge_map.reset_clusters();
        assert!(!processor.edge_map().is_cluster(1, 0));
        processor.reset_clusters(&img).unwrap();
        assert!(processor.edge_map().is_cluster(1, 0));
    }
}
