//! Confusion-matrix heatmap rendered to PNG with the plotters bitmap backend.

use std::path::Path;
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::writer::ensure_parent_exists;

/// Figure size in inches; pixel size is this times the DPI.
const FIGURE_INCHES: (f64, f64) = (6.4, 4.8);
const DEFAULT_DPI: u32 = 100;
/// Text size in points.
const FONT_POINTS: f64 = 10.0;
/// Share of the figure width given to the matrix; the colour bar gets the rest.
const MATRIX_SHARE: f64 = 0.82;
/// Colour bar gradient resolution.
const BAR_STEPS: usize = 128;

const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Make the embedded font available to plotters under [`FONT_FAMILY`].
fn ensure_font() -> bool {
    *FONT_REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok())
}

/// Pixel placement of the matrix cells in a rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellGrid {
    pub left: i32,
    pub top: i32,
    pub cell_width: i32,
    pub cell_height: i32,
}

/// Heatmap of a square count matrix with class names on both axes.
///
/// Rows are true classes, columns predicted classes. Cell colours follow the
/// viridis map between the smallest and largest count; every cell shows its
/// count and a colour bar maps colours back to counts.
pub struct ConfusionPlot<'a> {
    rows: &'a [Vec<usize>],
    labels: &'a [String],
    dpi: u32,
}

impl<'a> ConfusionPlot<'a> {
    /// `rows[t][p]` counts samples of true class `t` predicted as `p`;
    /// `labels` names the classes in the same order.
    pub fn new(rows: &'a [Vec<usize>], labels: &'a [String]) -> Self {
        Self {
            rows,
            labels,
            dpi: DEFAULT_DPI,
        }
    }

    #[must_use]
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    /// Image size in pixels at the configured DPI.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (FIGURE_INCHES.0 * dpi).round() as u32,
            (FIGURE_INCHES.1 * dpi).round() as u32,
        )
    }

    /// Render and write a PNG to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EmptyMatrix`] | No classes |
    /// | [`IoError::LabelCountMismatch`] | Matrix is not square or labels disagree with it |
    /// | [`IoError::OutputDirMissing`] | The parent directory of `path` does not exist |
    /// | [`IoError::Render`] | Font setup, drawing or PNG encoding failed |
    #[instrument(skip_all, fields(path = %path.display(), dpi = self.dpi))]
    pub fn save(&self, path: &Path) -> Result<(), IoError> {
        self.validate()?;
        ensure_parent_exists(path)?;
        let render_error = |message: String| IoError::Render {
            path: path.to_path_buf(),
            message,
        };
        if !ensure_font() {
            return Err(render_error("embedded font could not be loaded".to_string()));
        }

        let (width, height) = self.dimensions();
        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        let grid = self.draw(&root).map_err(|e| render_error(e.to_string()))?;
        root.present().map_err(|e| render_error(e.to_string()))?;

        debug!(cell_width = grid.cell_width, cell_height = grid.cell_height, "matrix laid out");
        info!(width, height, n_classes = self.labels.len(), "confusion matrix image written");
        Ok(())
    }

    fn validate(&self) -> Result<(), IoError> {
        let n = self.rows.len();
        if n == 0 {
            return Err(IoError::EmptyMatrix);
        }
        if let Some(row) = self.rows.iter().find(|r| r.len() != n) {
            return Err(IoError::LabelCountMismatch {
                n_rows: n,
                n_columns: row.len(),
                n_labels: self.labels.len(),
            });
        }
        if self.labels.len() != n {
            return Err(IoError::LabelCountMismatch {
                n_rows: n,
                n_columns: n,
                n_labels: self.labels.len(),
            });
        }
        Ok(())
    }

    /// Smallest and largest count, widened so the colour scale is never empty.
    fn count_range(&self) -> (f64, f64) {
        let counts = self.rows.iter().flatten().copied();
        let low = counts.clone().min().unwrap_or(0) as f64;
        let high = counts.max().unwrap_or(0) as f64;
        if high > low { (low, high) } else { (low, low + 1.0) }
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<CellGrid, DrawingAreaErrorKind<DB::ErrorType>> {
        let n = self.rows.len() as i32;
        let (low, high) = self.count_range();
        let midpoint = (low + high) / 2.0;

        let font: FontDesc = (FONT_FAMILY, FONT_POINTS * f64::from(self.dpi) / 72.0).into_font();
        let label_style = font.color(&BLACK);
        let text_height = root.estimate_text_size("Ag", &label_style)?.1 as i32;
        let pad = text_height / 2;
        let mut widest_label = 0;
        for label in self.labels {
            widest_label = widest_label.max(root.estimate_text_size(label, &label_style)?.0 as i32);
        }

        root.fill(&WHITE)?;
        let (width, _) = root.dim_in_pixel();
        let (matrix_area, bar_area) =
            root.split_horizontally((f64::from(width) * MATRIX_SHARE).round() as i32);

        // ---- matrix ----
        let x_label_area = 2 * text_height + 3 * pad;
        let mut chart = ChartBuilder::on(&matrix_area)
            .margin(2 * pad)
            .x_label_area_size(x_label_area)
            .y_label_area_size(widest_label + text_height + 3 * pad)
            .build_cartesian_2d(0..n, n..0)?;

        let (plot_width, plot_height) = chart.plotting_area().dim_in_pixel();
        let (left, top) = chart.plotting_area().get_base_pixel();
        let grid = CellGrid {
            left,
            top,
            cell_width: plot_width as i32 / n,
            cell_height: plot_height as i32 / n,
        };

        let class_name = |v: &i32| {
            usize::try_from(*v)
                .ok()
                .and_then(|i| self.labels.get(i))
                .cloned()
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n as usize + 1)
            .y_labels(n as usize + 1)
            .x_label_offset(grid.cell_width / 2)
            .y_label_offset(grid.cell_height / 2)
            .x_label_formatter(&class_name)
            .y_label_formatter(&class_name)
            .x_desc("Predicted label")
            .y_desc("True label")
            .label_style(label_style.clone())
            .axis_desc_style(label_style.clone())
            .draw()?;

        let cells = || {
            self.rows.iter().zip(0..).flat_map(|(row, t)| {
                row.iter().zip(0..).map(move |(&count, p)| (t, p, count))
            })
        };
        chart.draw_series(cells().map(|(t, p, count)| {
            Rectangle::new(
                [(p, t), (p + 1, t + 1)],
                ViridisRGB.get_color_normalized(count as f64, low, high).filled(),
            )
        }))?;

        let centred = Pos::new(HPos::Center, VPos::Center);
        let offset = (grid.cell_width / 2, grid.cell_height / 2);
        chart.draw_series(cells().map(|(t, p, count)| {
            // Light text on dark cells, dark text on light ones.
            let ink = if (count as f64) < midpoint {
                ViridisRGB::get_color(1.0)
            } else {
                ViridisRGB::get_color(0.0)
            };
            EmptyElement::at((p, t))
                + Text::new(count.to_string(), offset, font.color(&ink).pos(centred))
        }))?;

        // ---- colour bar ----
        let mut bar = ChartBuilder::on(&bar_area)
            .margin_top(2 * pad)
            .margin_bottom(2 * pad + x_label_area)
            .margin_left(pad)
            .margin_right(2 * pad)
            .right_y_label_area_size(widest_count(&label_style, root, high)? + 2 * pad)
            .build_cartesian_2d(0.0..1.0, low..high)?;
        let tick = |v: &f64| {
            if v.fract() == 0.0 { format!("{v:.0}") } else { format!("{v:.1}") }
        };
        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(6)
            .y_label_formatter(&tick)
            .label_style(label_style.clone())
            .draw()?;
        let step = (high - low) / BAR_STEPS as f64;
        bar.draw_series((0..BAR_STEPS).map(|i| {
            let from = low + step * i as f64;
            Rectangle::new(
                [(0.0, from), (1.0, from + step)],
                ViridisRGB.get_color_normalized(from + step / 2.0, low, high).filled(),
            )
        }))?;

        Ok(grid)
    }

    /// Render into an RGB byte buffer of `width * height * 3` bytes.
    #[cfg(test)]
    fn render_rgb(&self) -> Result<(Vec<u8>, CellGrid), IoError> {
        self.validate()?;
        assert!(ensure_font());
        let (width, height) = self.dimensions();
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        let grid = {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            let render_error = |e: DrawingAreaErrorKind<_>| IoError::Render {
                path: std::path::PathBuf::from("<buffer>"),
                message: e.to_string(),
            };
            let grid = self.draw(&root).map_err(render_error)?;
            root.present().map_err(render_error)?;
            grid
        };
        Ok((buffer, grid))
    }
}

/// Pixel width of the widest colour bar tick label.
fn widest_count<DB: DrawingBackend>(
    style: &TextStyle,
    root: &DrawingArea<DB, Shift>,
    high: f64,
) -> Result<i32, DrawingAreaErrorKind<DB::ErrorType>> {
    Ok(root.estimate_text_size(&format!("{high:.1}"), style)?.0 as i32)
}
