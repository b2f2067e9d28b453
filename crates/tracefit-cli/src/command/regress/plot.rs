//! Log-log comparison plots of empirical and fitted curves
//!
//! Each plot shows the empirical points of one regression column as a
//! scatter series labelled `original` and one line per fitted family. Both
//! axes are base-10 logarithmic, and tick labels show the power of ten at or
//! below the tick value.

use std::path::Path;

use plotters::prelude::*;
use tracefit_analysis::regression::PlotRequest;
use tracefit_stats::fit::RegressionTarget;

const PLOT_SIZE: (u32, u32) = (1200, 800);

/// ColorBrewer qualitative "Paired" palette with 7 classes
const PAIRED_7: [RGBColor; 7] = [
    RGBColor(0xA6, 0xCE, 0xE3),
    RGBColor(0x1F, 0x78, 0xB4),
    RGBColor(0xB2, 0xDF, 0x8A),
    RGBColor(0x33, 0xA0, 0x2C),
    RGBColor(0xFB, 0x9A, 0x99),
    RGBColor(0xE3, 0x1A, 0x1C),
    RGBColor(0xFD, 0xBF, 0x6F),
];

/// The first palette entry is reserved for the empirical series.
const ORIGINAL_COLOR: RGBColor = PAIRED_7[0];

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub(super) enum PlotError {
    #[display("failed to create drawing area: {_0}")]
    DrawingArea(#[error(not(source))] String),
    #[display("failed to configure chart: {_0}")]
    ChartConfig(#[error(not(source))] String),
    #[display("failed to draw chart elements: {_0}")]
    Drawing(#[error(not(source))] String),
    #[display("no positive empirical values to plot")]
    NoData,
}

/// Renders `request` as a PNG file at `path`.
pub(super) fn render_comparison(request: &PlotRequest<'_>, path: &Path) -> Result<(), PlotError> {
    let target = request.key.target;
    let empirical = request
        .empirical
        .points()
        .iter()
        .map(|p| (p.feature_value, p.value_of(target)))
        .filter(|&(x, y)| x > 0.0 && y > 0.0)
        .collect::<Vec<_>>();
    let (x_range, y_range) = axis_ranges(&empirical).ok_or(PlotError::NoData)?;

    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(85)
        .build_cartesian_2d(x_range.log_scale(), y_range.log_scale())
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc(request.labels.x.as_str())
        .y_desc(request.labels.y.as_str())
        .x_label_formatter(&|x| power_of_ten_label(*x))
        .y_label_formatter(&|y| power_of_ten_label(*y))
        .axis_desc_style(("sans-serif", 30))
        .label_style(("sans-serif", 25))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(
            empirical
                .iter()
                .map(|&point| Circle::new(point, 3, ORIGINAL_COLOR.filled())),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?
        .label("original")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, ORIGINAL_COLOR.filled()));

    for (fitted, &color) in request.fitted.iter().zip(PAIRED_7[1..].iter().cycle()) {
        chart
            .draw_series(LineSeries::new(
                fitted
                    .points()
                    .iter()
                    .map(|p| (p.variate, p.value_of(target))),
                color.stroke_width(2),
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?
            .label(fitted.family().id())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .position(legend_position(target))
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 20))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

/// X range over the points and Y range `[min y, 1]`.
///
/// Degenerate ranges are widened by a decade so the log axes stay valid.
fn axis_ranges(points: &[(f64, f64)]) -> Option<(std::ops::Range<f64>, std::ops::Range<f64>)> {
    if points.is_empty() {
        return None;
    }
    let x_min = points.iter().map(|&(x, _)| x).fold(f64::INFINITY, f64::min);
    let mut x_max = points
        .iter()
        .map(|&(x, _)| x)
        .fold(f64::NEG_INFINITY, f64::max);
    if x_min >= x_max {
        x_max = x_min * 10.0;
    }
    let mut y_min = points.iter().map(|&(_, y)| y).fold(f64::INFINITY, f64::min);
    if y_min >= 1.0 {
        y_min = 0.1;
    }
    Some((x_min..x_max, y_min..1.0))
}

/// `10^n` with `n = floor(log10(value))`, or `0` for zero.
fn power_of_ten_label(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    format!("10^{}", value.log10().floor())
}

fn legend_position(target: RegressionTarget) -> SeriesLabelPosition {
    match target {
        RegressionTarget::Pdf => SeriesLabelPosition::UpperRight,
        RegressionTarget::Survival => SeriesLabelPosition::LowerLeft,
    }
}

#[cfg(test)]
mod tests {
    use tracefit_analysis::{feature::FeatureKind, regression::RegressionKey};
    use tracefit_stats::{
        distribution::DistributionFamily,
        empirical::EmpiricalCurve,
        fit::{FitParameters, FittedCurve, Weighting},
    };

    use super::*;

    fn key(target: RegressionTarget) -> RegressionKey {
        RegressionKey {
            data_type: "google".to_owned(),
            feature: FeatureKind::Lifetime,
            target,
            weighting: Weighting::Unweighted,
        }
    }

    #[test]
    fn test_renders_png_with_fitted_family() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lifetime_survival_unweighted.png");
        let values = (1..=30).map(f64::from).collect::<Vec<_>>();
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let counts = values
            .iter()
            .map(|x| (500.0 * (-x / 6.0).exp()).round() as u64 + 1)
            .collect::<Vec<_>>();
        let empirical = EmpiricalCurve::from_counts(&values, &counts).unwrap();
        let fitted = [FittedCurve::evaluate(
            DistributionFamily::Exponential,
            FitParameters::new(vec![0.0, 6.0]),
            &empirical.feature_values(),
        )];
        let key = key(RegressionTarget::Survival);
        let labels = FeatureKind::Lifetime.axis_labels();

        render_comparison(
            &PlotRequest {
                key: &key,
                labels: &labels,
                empirical: &empirical,
                fitted: &fitted,
            },
            &path,
        )
        .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_no_positive_values_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lifetime_pdf_unweighted.png");
        // Every point after the first has zero count, so the pdf column is all zero
        let empirical = EmpiricalCurve::from_counts(&[1.0, 2.0, 3.0], &[4, 0, 0]).unwrap();
        let key = key(RegressionTarget::Pdf);
        let labels = FeatureKind::Lifetime.axis_labels();

        let result = render_comparison(
            &PlotRequest {
                key: &key,
                labels: &labels,
                empirical: &empirical,
                fitted: &[],
            },
            &path,
        );

        assert!(matches!(result, Err(PlotError::NoData)));
        assert!(!path.exists());
    }

    #[test]
    fn test_power_of_ten_label() {
        assert_eq!(power_of_ten_label(0.0), "0");
        assert_eq!(power_of_ten_label(1.0), "10^0");
        assert_eq!(power_of_ten_label(1000.0), "10^3");
        assert_eq!(power_of_ten_label(250.0), "10^2");
        assert_eq!(power_of_ten_label(0.01), "10^-2");
        assert_eq!(power_of_ten_label(0.05), "10^-2");
    }

    #[test]
    fn test_axis_ranges() {
        let (x, y) = axis_ranges(&[(2.0, 0.3), (50.0, 0.001), (10.0, 0.02)]).unwrap();
        assert_eq!(x, 2.0..50.0);
        assert_eq!(y, 0.001..1.0);
    }

    #[test]
    fn test_degenerate_axis_ranges_are_widened() {
        let (x, y) = axis_ranges(&[(5.0, 1.0)]).unwrap();
        assert_eq!(x, 5.0..50.0);
        assert_eq!(y, 0.1..1.0);
        assert!(axis_ranges(&[]).is_none());
    }

    #[test]
    fn test_legend_position_depends_on_target() {
        assert!(matches!(
            legend_position(RegressionTarget::Pdf),
            SeriesLabelPosition::UpperRight
        ));
        assert!(matches!(
            legend_position(RegressionTarget::Survival),
            SeriesLabelPosition::LowerLeft
        ));
    }
}
