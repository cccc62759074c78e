//! Chart generation and rendering for the dashboard.
//!
//! Each flow (income or expenses) gets two ECharts visualizations:
//! - **Category chart**: bar chart of the largest categories in the period
//! - **Daily chart**: line chart of the total per day in the period
//!
//! The charts are generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, ItemStyle, JsFunction, Tooltip, Trigger,
    },
    series::{Line, bar::Bar},
};
use maud::{Markup, PreEscaped, html};
use time::Date;

use crate::{
    dashboard::{aggregation::Flow, tables::format_date},
    html::HeadElement,
};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML container for a single chart.
pub(super) fn chart_container(chart: &DashboardChart) -> Markup {
    html!(
        div
            id=(chart.id)
            class="min-h-[380px] rounded dark:bg-gray-100"
        {}
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[&DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

fn flow_color(flow: Flow) -> &'static str {
    match flow {
        Flow::Income => "#16a34a",
        Flow::Expense => "#dc2626",
    }
}

/// A bar chart of category totals, largest first.
pub(super) fn category_chart(flow: Flow, breakdown: &[(String, f64)]) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = breakdown.iter().cloned().unzip();

    Chart::new()
        .title(
            Title::new()
                .text(format!("{} by category", flow.label()))
                .subtext("Top five categories"),
        )
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Bar::new()
                .name(flow.label())
                .item_style(ItemStyle::new().color(flow_color(flow)))
                .data(values),
        )
}

/// A line chart of daily totals in date order.
pub(super) fn daily_chart(flow: Flow, series: &[(Date, f64)]) -> Chart {
    let labels: Vec<String> = series.iter().map(|(date, _)| format_date(*date)).collect();
    let values: Vec<f64> = series.iter().map(|(_, total)| *total).collect();

    Chart::new()
        .title(Title::new().text(format!("Daily {}", flow.label().to_lowercase())))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Line::new()
                .name(flow.label())
                .item_style(ItemStyle::new().color(flow_color(flow)))
                .data(values),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{dashboard::aggregation::Flow, html::HeadElement};

    use super::{DashboardChart, category_chart, charts_script, daily_chart};

    #[test]
    fn category_chart_lists_categories_in_order() {
        let breakdown = vec![
            ("groceries".to_owned(), 1200.0),
            ("transport".to_owned(), 800.0),
        ];

        let options = category_chart(Flow::Expense, &breakdown).to_string();

        let groceries = options.find("groceries").expect("missing groceries label");
        let transport = options.find("transport").expect("missing transport label");
        assert!(groceries < transport);
        assert!(options.contains("Expense by category"));
    }

    #[test]
    fn daily_chart_labels_days_with_local_date_format() {
        let series = vec![(date!(2024 - 01 - 05), 50.0), (date!(2024 - 01 - 12), 20.0)];

        let options = daily_chart(Flow::Income, &series).to_string();

        assert!(options.contains("05.01.2024"), "{options}");
        assert!(options.contains("12.01.2024"), "{options}");
    }

    #[test]
    fn script_initializes_every_chart() {
        let first = DashboardChart {
            id: "first-chart",
            options: "{}".to_owned(),
        };
        let second = DashboardChart {
            id: "second-chart",
            options: "{}".to_owned(),
        };

        let HeadElement::ScriptSource(script) = charts_script(&[&first, &second]) else {
            panic!("expected an inline script");
        };

        assert!(script.0.contains("document.getElementById(\"first-chart\")"));
        assert!(script.0.contains("document.getElementById(\"second-chart\")"));
    }
}
