//! Angular geometry and discrete line rasterization.
//!
//! Angles use an azimuthal convention: `atan2(dx, dy)` measured from the
//! +y axis, in degrees normalized to `[0, 360)`. The edge angle retries
//! the least-squares fit with the axes swapped and keeps whichever frame
//! fits better; the resulting hemisphere ambiguity is compensated by
//! callers folding differences around 180 degrees. Changing either
//! convention changes which connections win, so both are kept exactly.

use crate::types::PixelPoint;

/// A straight line `y = a*x + b` fitted to a point set, with its summed
/// squared residual. The intercept is anchored at the first point so the
/// extrapolation through the connection endpoint stays stable.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineFit {
    pub a: f64,
    pub b: f64,
    pub error: f64,
}

/// Least-squares fit of a straight line through `points`.
///
/// Degenerate inputs (fewer than two distinct x values, so
/// `var(x) < 1e-9`) produce an infinite error; callers treat such fits as
/// non-matching.
pub(crate) fn fit_line(points: &[PixelPoint]) -> LineFit {
    let n = points.len() as f64;

    let mut x_mean = 0.0;
    let mut y_mean = 0.0;
    let mut x_squared_mean = 0.0;
    let mut xy_mean = 0.0;

    for point in points {
        let x = f64::from(point.x);
        let y = f64::from(point.y);
        x_mean += x;
        y_mean += y;
        x_squared_mean += x * x;
        xy_mean += x * y;
    }

    x_mean /= n;
    y_mean /= n;
    x_squared_mean /= n;
    xy_mean /= n;

    let x_variance = x_squared_mean - x_mean * x_mean;
    if x_variance.abs() < 1e-9 || x_variance.is_nan() {
        return LineFit {
            a: 0.0,
            b: 0.0,
            error: f64::INFINITY,
        };
    }

    let a = (xy_mean - x_mean * y_mean) / x_variance;
    // Anchor the intercept at the first point (the connection endpoint)
    // instead of the centroid.
    let b = f64::from(points[0].y) - a * f64::from(points[0].x);

    let mut error = 0.0;
    for point in points {
        let y_approx = a * f64::from(point.x) + b;
        let residual = y_approx - f64::from(point.y);
        error += residual * residual;
    }

    LineFit { a, b, error }
}

/// Tangent angle of an edge fragment in degrees, `[0, 360)`.
///
/// Fits a line through the points and takes the azimuth of the fitted
/// segment between the first and last point. The fit is retried with x
/// and y swapped; if the swapped frame has the smaller residual, the
/// angle is recomputed there with the `atan2` arguments swapped as well.
/// The first point must be the connection endpoint the fragment was
/// walked from.
#[must_use]
pub fn edge_angle(points: &[PixelPoint]) -> f64 {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return 0.0;
    };

    let fit = fit_line(points);
    let dx = f64::from(first.x - last.x);
    let dy = (fit.a * f64::from(first.x) + fit.b) - (fit.a * f64::from(last.x) + fit.b);
    let mut angle = dx.atan2(dy);

    // Swap x and y to check if it gives a better fit.
    let swapped: Vec<PixelPoint> = points.iter().map(|p| PixelPoint::new(p.y, p.x)).collect();
    let swapped_fit = fit_line(&swapped);
    if swapped_fit.error < fit.error {
        let dx = f64::from(first.y - last.y);
        let dy = (swapped_fit.a * f64::from(first.y) + swapped_fit.b)
            - (swapped_fit.a * f64::from(last.y) + swapped_fit.b);
        angle = dy.atan2(dx);
    }

    normalize_degrees(angle.to_degrees())
}

/// Azimuth from `start` toward `end` in degrees, `[0, 360)`.
#[must_use]
pub fn point_pair_angle(start: PixelPoint, end: PixelPoint) -> f64 {
    let dx = f64::from(end.x - start.x);
    let dy = f64::from(end.y - start.y);
    normalize_degrees(dx.atan2(dy).to_degrees())
}

fn normalize_degrees(angle: f64) -> f64 {
    if angle < 0.0 { angle + 360.0 } else { angle }
}

/// Discrete line between two pixels using Bresenham's algorithm.
///
/// Both endpoints are included. Steep lines swap the driving axis and the
/// walk is normalized left-to-right, so `line(p, q)` and `line(q, p)`
/// cover the same pixel set.
#[must_use]
pub fn bresenham_line(start: PixelPoint, end: PixelPoint) -> Vec<PixelPoint> {
    let mut points = Vec::new();

    let (mut x0, mut y0) = (start.x, start.y);
    let (mut x1, mut y1) = (end.x, end.y);

    // Swap x and y for steep lines so the slope stays below 1.
    let is_steep = (y1 - y0).abs() > (x1 - x0).abs();
    if is_steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }

    // Walk from left to right.
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let dy = (y1 - y0).abs();

    // Accumulated difference to the ideal y coordinate.
    let mut error = dx / 2;
    let y_step = if y0 < y1 { 1 } else { -1 };
    let mut y = y0;

    for x in x0..=x1 {
        points.push(if is_steep {
            PixelPoint::new(y, x)
        } else {
            PixelPoint::new(x, y)
        });

        error -= dy;
        if error < 0 {
            y += y_step;
            error += dx;
        }
    }

    points
}
