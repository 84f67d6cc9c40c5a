use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::forecast::{AqiCategory, ForecastPoint};

/// Render a forecast as an SVG line chart over EPA category bands.
pub fn create_forecast_plot(points: &[ForecastPoint], path: &Path) -> Result<(), Box<dyn Error>> {
    let Some(start) = points.first().map(|p| p.timestamp) else {
        return Err("cannot plot an empty forecast".into());
    };

    let root = SVGBackend::new(path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_pm25 = points.iter().map(|p| p.pm25_predicted).fold(0.0, f64::max);
    let y_max = (max_pm25 * 1.2).max(60.0);
    let x_max = points.len() as u32;

    let mut chart = ChartBuilder::on(&root)
        .caption("PM2.5 forecast - next 24 hours", ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0u32..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Hour (UTC)")
        .y_desc("PM2.5 (µg/m³)")
        .x_label_formatter(&|h| {
            let ts = start + chrono::Duration::hours(*h as i64);
            ts.format("%H:00").to_string()
        })
        .draw()?;

    // Shade each category the chart's y range reaches into.
    for category in AqiCategory::ALL {
        let (lo, hi) = category.range();
        if lo >= y_max {
            break;
        }
        let (r, g, b) = category.color();
        chart.draw_series(std::iter::once(Rectangle::new(
            [(0, lo), (x_max, hi.min(y_max))],
            RGBColor(r, g, b).mix(0.12).filled(),
        )))?;
    }

    chart
        .draw_series(LineSeries::new(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| (i as u32, p.pm25_predicted)),
            &BLUE,
        ))?
        .label("Predicted PM2.5")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
