//! ASCII plotting of a rate series for terminal output.
//!
//! Fixed-size character grid, deterministic so it can be golden-tested.
//!
//! - x axis: calendar days since the first point
//! - y axis: rate in percent
//! - observations: `o`, joined by `-`

use crate::domain::Maturity;
use crate::store::SeriesPoint;

/// Render `points` (ascending by date) as a `width` x `height` chart.
pub fn render_series_plot(
    points: &[SeriesPoint],
    country: &str,
    maturity: Maturity,
    width: usize,
    height: usize,
) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return format!("Plot: {country} {maturity}Y | no data\n");
    };

    let width = width.max(10);
    let height = height.max(5);

    let xy: Vec<(f64, f64)> = points
        .iter()
        .map(|p| ((p.date - first.date).num_days() as f64, p.rate * 100.0))
        .collect();

    let x_max = xy.last().map(|&(x, _)| x).filter(|&x| x > 0.0).unwrap_or(1.0);
    let (y_min, y_max) = y_range(&xy).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Line first so the observations overlay it.
    let cells: Vec<(usize, usize)> = xy
        .iter()
        .map(|&(x, y)| (map_x(x, x_max, width), map_y(y, y_min, y_max, height)))
        .collect();
    for pair in cells.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }
    for &(x, y) in &cells {
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {country} {maturity}Y | {} -> {} | rate=[{y_min:.2}, {y_max:.2}]%\n",
        first.date, last.date
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn y_range(xy: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in xy {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    (min_y.is_finite() && max_y.is_finite()).then_some((min_y, max_y))
}

/// Widen by `frac` of the span on each side; a flat series gets one basis point.
fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(if span > 0.0 { 1e-12 } else { 0.01 });
    (min - pad, max + pad)
}

fn map_x(x: f64, x_max: f64, width: usize) -> usize {
    let u = (x / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the chart.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham), only into empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
            .filter(|c| **c == ' ')
        {
            *cell = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
