//! SVG heatmap of a correlation matrix.
//!
//! Lower triangle and diagonal only; the upper triangle duplicates it. Cells
//! use a diverging blue-white-red scale fixed to [-1, 1] so colours mean the
//! same thing across runs. Undefined cells are grey and annotated `NA`.

use std::path::Path;

use oncoexpr_common::{OncoexprError, Result};
use plotters::prelude::*;
use tracing::info;

use crate::correlation::CorrelationMatrix;

const TITLE_HEIGHT: i32 = 60;
const LABEL_WIDTH: i32 = 110;
const BOTTOM_MARGIN: i32 = 50;
const COLORBAR_WIDTH: i32 = 20;
const COLORBAR_MARGIN: i32 = 50;
const PLOT_MARGIN: i32 = 10;
const COLORBAR_STEPS: i32 = 100;

const NEGATIVE: (f64, f64, f64) = (33.0, 102.0, 172.0);
const NEUTRAL: (f64, f64, f64) = (247.0, 247.0, 247.0);
const POSITIVE: (f64, f64, f64) = (178.0, 24.0, 43.0);
const UNDEFINED: RGBColor = RGBColor(200, 200, 200);

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapStyle {
    pub width: u32,
    pub height: u32,
    /// Print the coefficient (3 decimals) in each cell.
    pub annotate: bool,
    pub title: String,
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 700,
            annotate: true,
            title: "Gene Co-expression Correlation Matrix".to_string(),
        }
    }
}

/// Map a coefficient in [-1, 1] onto the diverging scale.
pub fn diverging_color(r: f64) -> RGBColor {
    if !r.is_finite() {
        return UNDEFINED;
    }
    let r = r.clamp(-1.0, 1.0);
    let (from, to, t) = if r < 0.0 {
        (NEUTRAL, NEGATIVE, -r)
    } else {
        (NEUTRAL, POSITIVE, r)
    };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

fn render_error(path: &Path, e: impl std::fmt::Display) -> OncoexprError {
    OncoexprError::computation(format!(
        "failed to render heatmap {}: {e}",
        path.display()
    ))
}

/// Render `corr` to an SVG file at `path`.
///
/// The output depends only on `corr` and `style`: rendering the same matrix
/// twice yields identical bytes.
pub fn render_heatmap(corr: &CorrelationMatrix, path: &Path, style: &HeatmapStyle) -> Result<()> {
    let n = corr.len() as i32;
    if n == 0 {
        return Err(OncoexprError::computation("cannot render an empty correlation matrix"));
    }

    let width = style.width as i32;
    let height = style.height as i32;
    let plot_w = width - LABEL_WIDTH - COLORBAR_WIDTH - COLORBAR_MARGIN - PLOT_MARGIN * 2;
    let plot_h = height - TITLE_HEIGHT - BOTTOM_MARGIN - PLOT_MARGIN;
    let cell = (plot_w.min(plot_h) / n).max(1);
    let x0 = LABEL_WIDTH + PLOT_MARGIN;
    let y0 = TITLE_HEIGHT + PLOT_MARGIN;
    let font_size = (cell / 5).clamp(8, 14);

    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_error(path, e))?;

    root.draw(&Text::new(
        style.title.clone(),
        (width / 2 - style.title.len() as i32 * 5, 25),
        ("sans-serif", 20).into_font().color(&BLACK),
    ))
    .map_err(|e| render_error(path, e))?;

    for i in 0..n {
        let gene = &corr.genes()[i as usize];
        // Row labels on the left, column labels underneath.
        root.draw(&Text::new(
            gene.clone(),
            (PLOT_MARGIN, y0 + i * cell + cell / 2 - font_size / 2),
            ("sans-serif", 12).into_font().color(&BLACK),
        ))
        .map_err(|e| render_error(path, e))?;
        root.draw(&Text::new(
            gene.clone(),
            (x0 + i * cell + cell / 2 - gene.len() as i32 * 3, y0 + n * cell + 8),
            ("sans-serif", 12).into_font().color(&BLACK),
        ))
        .map_err(|e| render_error(path, e))?;

        for j in 0..=i {
            let r = corr.get(i as usize, j as usize);
            let (left, top) = (x0 + j * cell, y0 + i * cell);
            root.draw(&Rectangle::new(
                [(left, top), (left + cell, top + cell)],
                diverging_color(r).filled(),
            ))
            .map_err(|e| render_error(path, e))?;
            root.draw(&Rectangle::new(
                [(left, top), (left + cell, top + cell)],
                WHITE.stroke_width(1),
            ))
            .map_err(|e| render_error(path, e))?;

            if style.annotate {
                let label = if r.is_finite() {
                    format!("{r:.3}")
                } else {
                    "NA".to_string()
                };
                let ink = if r.is_finite() && r.abs() > 0.6 { &WHITE } else { &BLACK };
                root.draw(&Text::new(
                    label.clone(),
                    (
                        left + cell / 2 - label.len() as i32 * font_size / 4,
                        top + cell / 2 - font_size / 2,
                    ),
                    ("sans-serif", font_size).into_font().color(ink),
                ))
                .map_err(|e| render_error(path, e))?;
            }
        }
    }

    // Colour bar, +1 at the top.
    let bar_x = width - COLORBAR_WIDTH - COLORBAR_MARGIN;
    let bar_h = n * cell;
    for step in 0..COLORBAR_STEPS {
        let top = y0 + step * bar_h / COLORBAR_STEPS;
        let bottom = y0 + (step + 1) * bar_h / COLORBAR_STEPS;
        let r = 1.0 - 2.0 * (step as f64 + 0.5) / COLORBAR_STEPS as f64;
        root.draw(&Rectangle::new(
            [(bar_x, top), (bar_x + COLORBAR_WIDTH, bottom.max(top + 1))],
            diverging_color(r).filled(),
        ))
        .map_err(|e| render_error(path, e))?;
    }
    for (label, y) in [("1.0", y0), ("0.0", y0 + bar_h / 2), ("-1.0", y0 + bar_h)] {
        root.draw(&Text::new(
            label,
            (bar_x + COLORBAR_WIDTH + 4, y - 5),
            ("sans-serif", 10).into_font().color(&BLACK),
        ))
        .map_err(|e| render_error(path, e))?;
    }

    root.present().map_err(|e| render_error(path, e))?;
    info!(path = %path.display(), n_genes = n, "Rendered correlation heatmap");
    Ok(())
}
