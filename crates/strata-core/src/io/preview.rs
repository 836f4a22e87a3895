use std::path::Path;

use image::{Rgb, RgbImage};
use ndarray::ArrayView2;
use tracing::debug;

use crate::error::Result;

/// Width of the separator between panels, in pixels.
const GUTTER: u32 = 4;

/// Fill color for missing samples and the gutter.
const BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);

/// Render named single-band panels side by side for visual comparison.
///
/// Each panel is log1p-scaled and normalized independently over its finite
/// values, then mapped through a turbo-style colormap. Missing (non-finite)
/// samples render as dark gray. Purely diagnostic output; nothing downstream
/// depends on it.
pub fn render_comparison(panels: &[(&str, ArrayView2<f32>)]) -> RgbImage {
    let height = panels.iter().map(|(_, p)| p.nrows()).max().unwrap_or(0) as u32;
    let width: u32 = panels.iter().map(|(_, p)| p.ncols() as u32).sum::<u32>()
        + GUTTER * panels.len().saturating_sub(1) as u32;

    let mut img = RgbImage::from_pixel(width.max(1), height.max(1), BACKGROUND);

    let mut x0 = 0u32;
    for (title, panel) in panels {
        debug!(title, rows = panel.nrows(), cols = panel.ncols(), "Rendering preview panel");

        // log1p compresses the dynamic range the same way the diagnostic
        // plots of the source data do; negatives clamp to zero first.
        let scaled = panel.mapv(|v| if v.is_finite() { (v.max(0.0)).ln_1p() } else { f32::NAN });

        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &v in scaled.iter() {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        let span = if hi > lo { hi - lo } else { 1.0 };

        for row in 0..panel.nrows() {
            for col in 0..panel.ncols() {
                let v = scaled[[row, col]];
                let pixel = if v.is_finite() {
                    turbo(((v - lo) / span).clamp(0.0, 1.0))
                } else {
                    BACKGROUND
                };
                img.put_pixel(x0 + col as u32, row as u32, pixel);
            }
        }
        x0 += panel.ncols() as u32 + GUTTER;
    }

    img
}

/// Render and save the comparison as PNG.
pub fn save_comparison_png(path: &Path, panels: &[(&str, ArrayView2<f32>)]) -> Result<()> {
    let img = render_comparison(panels);
    img.save_with_format(path, image::ImageFormat::Png)?;
    debug!(path = %path.display(), panels = panels.len(), "Preview written");
    Ok(())
}

/// Polynomial approximation of the turbo colormap, t in [0, 1].
fn turbo(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let r = 0.13572138
        + t * (4.61539260
            + t * (-42.66032258 + t * (132.13108234 + t * (-152.94239396 + t * 59.28637943))));
    let g = 0.09140261
        + t * (2.19418839
            + t * (4.84296658 + t * (-14.18503333 + t * (4.27729857 + t * 2.82956604))));
    let b = 0.10667330
        + t * (12.64194608
            + t * (-60.58204836 + t * (110.36276771 + t * (-89.90310912 + t * 27.34824973))));
    Rgb([
        (r.clamp(0.0, 1.0) * 255.0) as u8,
        (g.clamp(0.0, 1.0) * 255.0) as u8,
        (b.clamp(0.0, 1.0) * 255.0) as u8,
    ])
}
