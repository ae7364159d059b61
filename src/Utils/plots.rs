use nalgebra::DVector;
use plotters::prelude::*;
use std::path::Path;

/// One line of a figure
pub struct Series<'a> {
    pub x: &'a DVector<f64>,
    pub y: &'a DVector<f64>,
    pub color: RGBColor,
    pub label: String,
}

/// Figure description: labels, axis limits and grid toggle
pub struct Figure<'a> {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// x limits; data range if None
    pub x_range: Option<(f64, f64)>,
    /// y limits; data range if None
    pub y_range: Option<(f64, f64)>,
    pub grid: bool,
    pub size: (u32, u32),
    pub series: Vec<Series<'a>>,
}

impl<'a> Figure<'a> {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Figure {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_range: None,
            y_range: None,
            grid: true,
            size: (800, 600),
            series: Vec::new(),
        }
    }

    pub fn ylim(mut self, lo: f64, hi: f64) -> Self {
        self.y_range = Some((lo, hi));
        self
    }

    pub fn line(
        mut self,
        x: &'a DVector<f64>,
        y: &'a DVector<f64>,
        color: RGBColor,
        label: &str,
    ) -> Self {
        self.series.push(Series {
            x,
            y,
            color,
            label: label.to_string(),
        });
        self
    }

    fn data_range(&self, pick_x: bool) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for s in &self.series {
            let v = if pick_x { s.x } else { s.y };
            for &val in v.iter().filter(|val| val.is_finite()) {
                lo = lo.min(val);
                hi = hi.max(val);
            }
        }
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        if lo == hi {
            return (lo - 0.5, hi + 0.5);
        }
        (lo, hi)
    }
}

/// Renders the figure into a PNG file.
pub fn save_plot(figure: &Figure, filename: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (x_min, x_max) = figure.x_range.unwrap_or_else(|| figure.data_range(true));
    let (y_min, y_max) = figure.y_range.unwrap_or_else(|| figure.data_range(false));

    let root_area = BitMapBackend::new(filename, figure.size).into_drawing_area();
    root_area.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root_area)
        .caption(&figure.title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(figure.x_label.as_str())
        .y_desc(figure.y_label.as_str());
    if !figure.grid {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    for s in &figure.series {
        let color = s.color;
        let points: Vec<(f64, f64)> = s
            .x
            .iter()
            .zip(s.y.iter())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(&x, &y)| (x, y))
            .collect();
        chart
            .draw_series(LineSeries::new(points, &color))?
            .label(s.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root_area.present()?;
    Ok(())
}
