//! Length-based edge removal.

use crate::processor::EdgeProcessor;
use crate::types::{PruneClasses, TraceError};

impl EdgeProcessor {
    /// Remove edges shorter than `number_pixels`, restricted to the
    /// selected endpoint classes.
    ///
    /// Removing edges can leave clusters with fewer incident edges, so a
    /// cleanup pass runs afterward: clusters left with exactly two edges
    /// are connected directly and clusters with at most one edge are
    /// dissolved. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn remove_edges_shorter_than(
        &mut self,
        number_pixels: usize,
        classes: PruneClasses,
    ) -> Result<bool, TraceError> {
        self.require_traced()?;
        self.remove_edges_where(|len| len > 0 && len < number_pixels, classes)
    }

    /// Remove edges longer than `number_pixels`, restricted to the
    /// selected endpoint classes. Runs the same cleanup pass as
    /// [`remove_edges_shorter_than`](Self::remove_edges_shorter_than) and
    /// returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidState`] if no tracing pass has run.
    pub fn remove_edges_longer_than(
        &mut self,
        number_pixels: usize,
        classes: PruneClasses,
    ) -> Result<bool, TraceError> {
        self.require_traced()?;
        self.remove_edges_where(|len| len > number_pixels, classes)
    }

    fn remove_edges_where(
        &mut self,
        length_matches: impl Fn(usize) -> bool,
        classes: PruneClasses,
    ) -> Result<bool, TraceError> {
        if !classes.any_enabled() {
            return Ok(false);
        }

        let mut changes = false;
        for edge_id in 0..self.edges().len() {
            if !length_matches(self.edges().edge_len(edge_id)) {
                continue;
            }
            let (Some(start), Some(end)) = (
                self.edges().start_point(edge_id),
                self.edges().end_point(edge_id),
            ) else {
                continue;
            };

            let start_in_cluster = self.edge_map().is_cluster(start.x, start.y);
            let end_in_cluster = self.edge_map().is_cluster(end.x, end.y);

            let remove = (classes.free && !start_in_cluster && !end_in_cluster)
                || (classes.dangling && (start_in_cluster != end_in_cluster))
                || (classes.bridged && start_in_cluster && end_in_cluster);
            if !remove {
                continue;
            }

            for point in self.edges().edge(edge_id).to_vec() {
                self.edge_map_mut().erase_edge_id(point.x, point.y, edge_id);
            }
            self.edges_mut().clear_edge(edge_id);
            changes = true;
        }

        // Removing edges in clusters can eliminate ambiguity, allowing
        // direct connections between the remaining edges, and can leave
        // clusters with at most one incident edge behind.
        if changes {
            self.connect_edges_in_two_edge_clusters(false, true)?;
            self.remove_zero_and_one_edge_clusters()?;
        }

        Ok(changes)
    }
}
