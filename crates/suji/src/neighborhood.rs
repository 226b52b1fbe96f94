//! Neighborhood primitives: occupancy codes, corner four-cluster masks,
//! and the reduced "direct neighbor" relation.
//!
//! All three read the image through [`EdgeImage`], so they work on the
//! caller's input as well as on the overlay raster used for cluster
//! re-detection. Out-of-bounds neighbors are simply absent.

use crate::raster::EdgeImage;
use crate::types::PixelPoint;

// Corner masks over the occupancy code. A 2x2 block of edge pixels (a
// "four-cluster" with the center) always shows up as one fully-set corner
// triple in the 3x3 neighborhood.
const UPPER_LEFT: u8 = 0b1100_0001; // TL | TC | ML
const UPPER_RIGHT: u8 = 0b0111_0000; // TC | TR | MR
const LOWER_RIGHT: u8 = 0b0001_1100; // MR | BR | BC
const LOWER_LEFT: u8 = 0b0000_0111; // BC | BL | ML

/// Occupancy of the 8 neighbors of `p` as a binary code.
///
/// Neighbors are ordered clockwise beginning at the top-left with bit
/// weights TL=128, TC=64, TR=32, MR=16, BR=8, BC=4, BL=2, ML=1. A bit is
/// set iff the neighbor is inside the image and an edge pixel.
#[must_use]
pub fn occupancy_code<I: EdgeImage + ?Sized>(img: &I, p: PixelPoint) -> u8 {
    let mut code = 0_u8;
    if img.is_edge(p.x - 1, p.y - 1) {
        code |= 128; // top left
    }
    if img.is_edge(p.x, p.y - 1) {
        code |= 64; // top center
    }
    if img.is_edge(p.x + 1, p.y - 1) {
        code |= 32; // top right
    }
    if img.is_edge(p.x + 1, p.y) {
        code |= 16; // middle right
    }
    if img.is_edge(p.x + 1, p.y + 1) {
        code |= 8; // bottom right
    }
    if img.is_edge(p.x, p.y + 1) {
        code |= 4; // bottom center
    }
    if img.is_edge(p.x - 1, p.y + 1) {
        code |= 2; // bottom left
    }
    if img.is_edge(p.x - 1, p.y) {
        code |= 1; // middle left
    }
    code
}

/// Returns `true` iff the occupancy code contains at least one corner
/// four-cluster. Four-clusters are always located in corners of the 3x3
/// region.
#[must_use]
pub const fn contains_four_cluster(code: u8) -> bool {
    (code & UPPER_LEFT) == UPPER_LEFT
        || (code & UPPER_RIGHT) == UPPER_RIGHT
        || (code & LOWER_RIGHT) == LOWER_RIGHT
        || (code & LOWER_LEFT) == LOWER_LEFT
}

/// Direct neighbors of `p`, clockwise from top-left.
///
/// A diagonal neighbor is suppressed whenever one of the two orthogonal
/// neighbors bracketing it is an edge pixel -- the diagonal step would be
/// redundant alongside the orthogonal one. The ordering is stable, which
/// makes tracing deterministic.
#[must_use]
pub fn direct_neighbors<I: EdgeImage + ?Sized>(img: &I, p: PixelPoint) -> Vec<PixelPoint> {
    let mut v = Vec::new();

    // top left
    if img.is_edge(p.x - 1, p.y - 1) && !(img.is_edge(p.x, p.y - 1) || img.is_edge(p.x - 1, p.y)) {
        v.push(PixelPoint::new(p.x - 1, p.y - 1));
    }
    // top center
    if img.is_edge(p.x, p.y - 1) {
        v.push(PixelPoint::new(p.x, p.y - 1));
    }
    // top right
    if img.is_edge(p.x + 1, p.y - 1) && !(img.is_edge(p.x, p.y - 1) || img.is_edge(p.x + 1, p.y)) {
        v.push(PixelPoint::new(p.x + 1, p.y - 1));
    }
    // middle right
    if img.is_edge(p.x + 1, p.y) {
        v.push(PixelPoint::new(p.x + 1, p.y));
    }
    // bottom right
    if img.is_edge(p.x + 1, p.y + 1) && !(img.is_edge(p.x + 1, p.y) || img.is_edge(p.x, p.y + 1)) {
        v.push(PixelPoint::new(p.x + 1, p.y + 1));
    }
    // bottom center
    if img.is_edge(p.x, p.y + 1) {
        v.push(PixelPoint::new(p.x, p.y + 1));
    }
    // bottom left
    if img.is_edge(p.x - 1, p.y + 1) && !(img.is_edge(p.x, p.y + 1) || img.is_edge(p.x - 1, p.y)) {
        v.push(PixelPoint::new(p.x - 1, p.y + 1));
    }
    // middle left
    if img.is_edge(p.x - 1, p.y) {
        v.push(PixelPoint::new(p.x - 1, p.y));
    }

    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::grid;

    #[test]
    fn occupancy_code_of_plus_center() {
        let img = grid(&[
            ".#.", //
            "###",
            ".#.",
        ]);
        // TC + MR + BC + ML
        assert_eq!(
            occupancy_code(&img, PixelPoint::new(1, 1)),
            64 | 16 | 4 | 1
        );
    }

    #[test]
    fn occupancy_code_clamps_at_borders() {
        let img = grid(&[
            "##", //
            "##",
        ]);
        // Top-left pixel only sees MR, BR, BC.
        assert_eq!(occupancy_code(&img, PixelPoint::new(0, 0)), 16 | 8 | 4);
    }

    #[test]
    fn four_cluster_masks() {
        assert!(contains_four_cluster(0b1100_0001)); // upper left triple
        assert!(contains_four_cluster(0b0111_0000)); // upper right triple
        assert!(contains_four_cluster(0b0001_1100)); // lower right triple
        assert!(contains_four_cluster(0b0000_0111)); // lower left triple
        assert!(contains_four_cluster(0b1111_1111));
        assert!(!contains_four_cluster(0b0100_0001)); // TC + ML, no TL
        assert!(!contains_four_cluster(0b0101_0101)); // orthogonals only
        assert!(!contains_four_cluster(0));
    }

    #[test]
    fn square_block_pixels_contain_four_cluster() {
        let img = grid(&[
            "##", //
            "##",
        ]);
        for y in 0..2 {
            for x in 0..2 {
                let code = occupancy_code(&img, PixelPoint::new(x, y));
                assert!(contains_four_cluster(code), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn direct_neighbors_clockwise_order() {
        let img = grid(&[
            ".#.", //
            "###",
            ".#.",
        ]);
        let neighbors = direct_neighbors(&img, PixelPoint::new(1, 1));
        assert_eq!(
            neighbors,
            vec![
                PixelPoint::new(1, 0),
                PixelPoint::new(2, 1),
                PixelPoint::new(1, 2),
                PixelPoint::new(0, 1),
            ],
        );
    }

    #[test]
    fn diagonal_suppressed_next_to_orthogonal() {
        // The top-right diagonal of the center pixel is bracketed by the
        // top-center edge pixel, so it is not a direct neighbor.
        let img = grid(&[
            ".##", //
            ".#.",
        ]);
        let neighbors = direct_neighbors(&img, PixelPoint::new(1, 1));
        assert_eq!(neighbors, vec![PixelPoint::new(1, 0)]);
    }

    #[test]
    fn lone_diagonal_is_direct() {
        let img = grid(&[
            "#..", //
            ".#.",
        ]);
        let neighbors = direct_neighbors(&img, PixelPoint::new(1, 1));
        assert_eq!(neighbors, vec![PixelPoint::new(0, 0)]);
    }

    #[test]
    fn diagonal_suppression_is_mutual() {
        // The two cells bracketing a diagonal pair are the same from
        // either side, so (0,0) and (1,1) suppress each other; (1,0) is
        // orthogonal to both and remains the connecting direct neighbor.
        let img = grid(&[
            "##", //
            ".#",
        ]);
        assert_eq!(
            direct_neighbors(&img, PixelPoint::new(0, 0)),
            vec![PixelPoint::new(1, 0)],
        );
        assert_eq!(
            direct_neighbors(&img, PixelPoint::new(1, 1)),
            vec![PixelPoint::new(1, 0)],
        );
    }
}
