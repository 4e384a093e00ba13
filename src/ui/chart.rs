use eframe::egui::{self, Color32};
use egui_plot::{Line, Plot, PlotPoints};

use crate::back::series::{x_to_date, PriceSeries};

const CHART_HEIGHT: f32 = 200.0;

fn axis_date(x: f64, format: &str) -> String {
    x_to_date(x)
        .map(|d| d.format(format).to_string())
        .unwrap_or_default()
}

/// Close price line; `index` keeps plot ids apart when a symbol is listed twice.
pub fn price_chart(ui: &mut egui::Ui, index: usize, series: &PriceSeries) {
    let points = PlotPoints::new(series.plot_points());
    Plot::new(("price_chart", index))
        .height(CHART_HEIGHT)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .x_axis_formatter(|mark, _range| axis_date(mark.value, "%m-%d"))
        .label_formatter(|_name, value| {
            format!("{}\n{:.2}", axis_date(value.x, "%Y-%m-%d"), value.y)
        })
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(points)
                    .color(Color32::LIGHT_BLUE)
                    .width(1.5),
            );
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::back::series::date_to_x;
    use chrono::NaiveDate;

    #[test]
    fn axis_labels_are_dates() {
        let x = date_to_x(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(axis_date(x, "%m-%d"), "03-09");
        assert_eq!(axis_date(x, "%Y-%m-%d"), "2024-03-09");
        assert_eq!(axis_date(f64::MAX, "%Y"), "");
    }
}
