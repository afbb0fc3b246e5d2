//! Equity-curve screenshot.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::ReportError;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([120, 120, 120]);
const BASELINE: Rgb<u8> = Rgb([200, 200, 200]);
const EQUITY: Rgb<u8> = Rgb([33, 150, 243]);
const UNDERWATER: Rgb<u8> = Rgb([255, 205, 210]);

#[derive(Clone, Debug)]
pub struct EquityPlot {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
}

impl Default for EquityPlot {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            margin: 40,
        }
    }
}

impl EquityPlot {
    /// Line chart of `equity`, with a baseline at the starting value and
    /// drawdown periods shaded between the curve and its running peak.
    pub fn render(&self, equity: &[f64]) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, WHITE);
        let (left, right) = (self.margin, self.width.saturating_sub(self.margin + 1));
        let (top, bottom) = (self.margin, self.height.saturating_sub(self.margin + 1));
        if right <= left || bottom <= top {
            return img;
        }

        draw_line(&mut img, (left, bottom), (right, bottom), AXIS);
        draw_line(&mut img, (left, top), (left, bottom), AXIS);

        let finite: Vec<f64> = equity.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return img;
        }
        let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if hi - lo < f64::EPSILON {
            lo -= 1.0;
            hi += 1.0;
        }

        let x_of = |i: usize| -> u32 {
            if equity.len() < 2 {
                return left;
            }
            left + ((right - left) as f64 * i as f64 / (equity.len() - 1) as f64).round() as u32
        };
        let y_of = |v: f64| -> u32 {
            let t = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
            bottom - ((bottom - top) as f64 * t).round() as u32
        };

        if equity[0].is_finite() {
            let y = y_of(equity[0]);
            draw_line(&mut img, (left + 1, y), (right, y), BASELINE);
        }

        let mut peak = f64::NEG_INFINITY;
        for (i, &v) in equity.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            peak = peak.max(v);
            if v < peak {
                draw_line(&mut img, (x_of(i), y_of(peak)), (x_of(i), y_of(v)), UNDERWATER);
            }
        }

        let mut prev: Option<(u32, u32)> = None;
        for (i, &v) in equity.iter().enumerate() {
            if !v.is_finite() {
                prev = None;
                continue;
            }
            let pt = (x_of(i), y_of(v));
            match prev {
                Some(p) => draw_line(&mut img, p, pt, EQUITY),
                None => img.put_pixel(pt.0, pt.1, EQUITY),
            }
            prev = Some(pt);
        }
        img
    }

    pub fn save(&self, equity: &[f64], path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
        }
        self.render(equity).save(path)?;
        Ok(())
    }
}

/// Bresenham line, clipped to the image.
fn draw_line(img: &mut RgbImage, from: (u32, u32), to: (u32, u32), color: Rgb<u8>) {
    let (mut x0, mut y0) = (from.0 as i64, from.1 as i64);
    let (x1, y1) = (to.0 as i64, to.1 as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (w, h) = (img.width() as i64, img.height() as i64);
    loop {
        if (0..w).contains(&x0) && (0..h).contains(&y0) {
            img.put_pixel(x0 as u32, y0 as u32, color);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> EquityPlot {
        EquityPlot {
            width: 120,
            height: 60,
            margin: 10,
        }
    }

    #[test]
    fn curve_endpoints_land_on_plot_corners() {
        let img = small().render(&[100.0, 90.0, 120.0]);
        // first point: left edge, value 100 -> one third up from the bottom
        assert_eq!(*img.get_pixel(10, 49 - 13), EQUITY);
        // last point is the max -> top right
        assert_eq!(*img.get_pixel(109, 10), EQUITY);
    }

    #[test]
    fn flat_and_empty_curves_render() {
        let flat = small().render(&[5.0; 10]);
        // flat series is padded by one unit each way, so it sits mid-plot
        assert_eq!(*flat.get_pixel(60, 29), EQUITY);
        let empty = small().render(&[]);
        assert_eq!(*empty.get_pixel(10, 49), AXIS);
    }

    #[test]
    fn save_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshots").join("X_equity.png");
        small().save(&[1.0, 2.0, 1.5], &path).unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!(back.width(), 120);
    }
}
