//! Dashboard HTTP handler and view rendering.
//!
//! This module contains:
//! - The route handler that loads, filters and summarizes the records
//! - HTML view functions for rendering the dashboard UI
//! - State and query types used by the handler

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    dashboard::{
        aggregation::{
            ExpenseChange, Flow, FlowTotals, RecordView, available_categories, available_periods,
            category_breakdown, daily_series, expense_change, filter_views, global_balance,
        },
        cache::RecordCache,
        cards::{balance_card, overview_cards},
        charts::{DashboardChart, category_chart, chart_container, charts_script, daily_chart},
        period::Period,
        tables::records_table,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, ECHARTS_SCRIPT, FORM_LABEL_STYLE,
        FORM_SELECT_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base,
    },
    store::RecordStore,
};

/// The state needed for displaying the dashboard page.
#[derive(Clone)]
pub struct DashboardState {
    /// Where the records are read from.
    pub store: Arc<dyn RecordStore>,
    /// The records from the last load, shared between requests.
    pub cache: Arc<Mutex<RecordCache>>,
}

impl DashboardState {
    /// Create the state for reading from `store`, caching records for the cache's TTL.
    pub fn new(store: Arc<dyn RecordStore>, cache: RecordCache) -> Self {
        Self {
            store,
            cache: Arc::new(Mutex::new(cache)),
        }
    }
}

/// The period and categories selected in the filter form.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// The period to show as `YYYY-MM`. Defaults to the most recent period.
    pub period: Option<String>,
    /// Categories to include. Empty means every category.
    #[serde(default)]
    pub category: Vec<String>,
}

/// The charts for one flow, `None` where the period has no records of that flow.
struct FlowCharts {
    flow: Flow,
    by_category: Option<DashboardChart>,
    daily: Option<DashboardChart>,
}

/// Everything the filter form needs to render the current selection.
struct FilterOptions<'a> {
    periods: &'a [Period],
    selected_period: Period,
    categories: &'a [String],
    selected_categories: &'a [String],
}

/// Display a page summarizing the records for the selected period and categories.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, Error> {
    let records = {
        let mut cache = state
            .cache
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire cache lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        match cache.get_or_load(Instant::now(), || state.store.load_all()) {
            Ok(records) => records,
            Err(error) => {
                tracing::error!("Could not load records for the dashboard: {error}");
                return Ok(dashboard_no_data_view().into_response());
            }
        }
    };

    let views: Vec<RecordView> = records.iter().map(RecordView::from).collect();
    let periods = available_periods(&views);

    let Some(&latest_period) = periods.first() else {
        return Ok(dashboard_no_data_view().into_response());
    };

    let selected_period = select_period(query.period.as_deref(), &periods).unwrap_or(latest_period);
    let categories = available_categories(&views);
    let filter_options = FilterOptions {
        periods: &periods,
        selected_period,
        categories: &categories,
        selected_categories: &query.category,
    };

    let balance = global_balance(&views);
    let filtered = filter_views(&views, selected_period, &query.category);

    if filtered.is_empty() {
        return Ok(dashboard_no_matches_view(balance, &filter_options).into_response());
    }

    let totals = FlowTotals::from_views(filtered.iter().copied());
    let change = expense_change(&views, selected_period, totals.expense);
    let flow_charts = [
        build_flow_charts(Flow::Income, &filtered),
        build_flow_charts(Flow::Expense, &filtered),
    ];

    Ok(dashboard_view(
        balance,
        &filter_options,
        totals,
        change,
        &flow_charts,
        records_table(&filtered),
    )
    .into_response())
}

/// The requested period if it parses and has records.
fn select_period(requested: Option<&str>, periods: &[Period]) -> Option<Period> {
    let requested = requested?;

    match requested.parse::<Period>() {
        Ok(period) if periods.contains(&period) => Some(period),
        Ok(period) => {
            tracing::debug!("No records in requested period {period}, showing the latest");
            None
        }
        Err(error) => {
            tracing::debug!("Ignoring requested period: {error}");
            None
        }
    }
}

fn build_flow_charts(flow: Flow, views: &[&RecordView]) -> FlowCharts {
    let (category_id, daily_id) = match flow {
        Flow::Income => ("income-category-chart", "income-daily-chart"),
        Flow::Expense => ("expense-category-chart", "expense-daily-chart"),
    };

    let by_category = category_breakdown(views, flow).map(|breakdown| DashboardChart {
        id: category_id,
        options: category_chart(flow, &breakdown).to_string(),
    });

    let series = daily_series(views, flow);
    let daily = (!series.is_empty()).then(|| DashboardChart {
        id: daily_id,
        options: daily_chart(flow, &series).to_string(),
    });

    FlowCharts {
        flow,
        by_category,
        daily,
    }
}

/// Renders the dashboard page when there are no records.
///
/// Explains how to add records with the bot.
fn dashboard_no_data_view() -> Markup {
    let content = html!(
        div class=(PAGE_CONTAINER_STYLE)
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "The dashboard will fill up once you add some records.
                Send the bot a message like "
                code { "groceries, 12.50" }
                " or "
                code { "salary, -5000, January" }
                ". Negative amounts are income."
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn dashboard_no_matches_view(balance: f64, filter_options: &FilterOptions) -> Markup {
    let content = html!(
        div class=(PAGE_CONTAINER_STYLE)
        {
            (dashboard_header(balance, filter_options))

            p id="no-records-notice" class="mt-8 text-gray-600 dark:text-gray-400"
            {
                "No records for the selected period and categories."
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn dashboard_view(
    balance: f64,
    filter_options: &FilterOptions,
    totals: FlowTotals,
    change: ExpenseChange,
    flow_charts: &[FlowCharts],
    records_table: Markup,
) -> Markup {
    let period_label = filter_options.selected_period.label();

    let content = html!(
        div class=(PAGE_CONTAINER_STYLE)
        {
            (dashboard_header(balance, filter_options))

            section id="overview" class="w-full mt-8"
            {
                h3 class="text-xl font-semibold mb-4" { "Overview for " (period_label) }
                (overview_cards(totals, change))
            }

            @for charts in flow_charts {
                (flow_section(charts))
            }

            section id="records" class="w-full mt-8"
            {
                h3 class="text-xl font-semibold mb-4" { "Records" }
                (records_table)
            }
        }
    );

    let charts: Vec<&DashboardChart> = flow_charts
        .iter()
        .flat_map(|charts| [charts.by_category.as_ref(), charts.daily.as_ref()])
        .flatten()
        .collect();

    let scripts = [
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        charts_script(&charts),
    ];

    base("Dashboard", &scripts, &content)
}

fn flow_section(charts: &FlowCharts) -> Markup {
    let (id, title) = match charts.flow {
        Flow::Income => ("income", "Income"),
        Flow::Expense => ("expenses", "Expenses"),
    };

    html!(
        section id=(id) class="w-full mt-8"
        {
            h3 class="text-xl font-semibold mb-4" { (title) }

            @if charts.by_category.is_none() && charts.daily.is_none() {
                p class="text-gray-600 dark:text-gray-400" { "No data for this period." }
            } @else {
                div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
                {
                    @if let Some(chart) = &charts.by_category {
                        (chart_container(chart))
                    }

                    @if let Some(chart) = &charts.daily {
                        (chart_container(chart))
                    }
                }
            }
        }
    )
}

/// The global balance and the filter form shown at the top of every page with data.
fn dashboard_header(balance: f64, filter_options: &FilterOptions) -> Markup {
    html!(
        div class="w-full grid grid-cols-1 md:grid-cols-3 gap-4"
        {
            (balance_card(balance))

            div class="md:col-span-2"
            {
                (filter_form(filter_options))
            }
        }
    )
}

fn filter_form(options: &FilterOptions) -> Markup {
    let all_selected = options.selected_categories.is_empty();

    html!(
        form
            id="filters"
            method="get"
            action=(endpoints::DASHBOARD_VIEW)
            class="bg-gray-50 dark:bg-gray-800 p-4 rounded-lg"
        {
            label for="period" class=(FORM_LABEL_STYLE) { "Period" }
            select id="period" name="period" class=(FORM_SELECT_STYLE)
            {
                @for period in options.periods {
                    option
                        value=(period.to_string())
                        selected[*period == options.selected_period]
                    {
                        (period.label())
                    }
                }
            }

            p class="text-sm text-gray-600 dark:text-gray-400 mt-4 mb-3"
            {
                "Categories (none selected shows all):"
            }

            div class="grid grid-cols-2 md:grid-cols-3 lg:grid-cols-4 gap-3 mb-4"
            {
                @for category in options.categories {
                    label class="flex items-center space-x-2"
                    {
                        input
                            type="checkbox"
                            name="category"
                            value=(category)
                            checked[all_selected || options.selected_categories.contains(category)]
                            class="rounded-sm border-gray-300
                                text-blue-600 shadow-xs
                                focus:border-blue-300 focus:ring-3
                                focus:ring-blue-200/50"
                        ;

                        span class=(CATEGORY_BADGE_STYLE)
                        {
                            @if category.is_empty() { "(none)" } @else { (category) }
                        }
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Apply" }
        }
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::State,
        http::{Response, StatusCode},
    };
    use axum_extra::extract::Query;
    use rusqlite::Connection;
    use scraper::{ElementRef, Html, Selector};
    use time::{Date, macros::date};

    use crate::{
        Error,
        dashboard::cache::RecordCache,
        record::NewRecord,
        store::{RecordStore, SqliteRecordStore, test_utils::FlakyStore},
    };

    use super::{DashboardQuery, DashboardState, get_dashboard_page};

    fn new_record(date: Date, amount: f64, category: &str) -> NewRecord {
        NewRecord {
            date,
            amount,
            category: category.to_owned(),
            comment: String::new(),
        }
    }

    fn get_test_state(records: &[NewRecord]) -> DashboardState {
        let store = SqliteRecordStore::new(Connection::open_in_memory().unwrap());
        for record in records {
            store.append(record).unwrap();
        }

        DashboardState::new(Arc::new(store), RecordCache::default())
    }

    fn sample_records() -> Vec<NewRecord> {
        vec![
            new_record(date!(2023 - 12 - 20), 1000.0, "groceries"),
            new_record(date!(2024 - 01 - 05), -50000.0, "salary"),
            new_record(date!(2024 - 01 - 10), 1200.0, "groceries"),
            new_record(date!(2024 - 01 - 12), 800.0, "transport"),
        ]
    }

    fn query(period: Option<&str>, categories: &[&str]) -> Query<DashboardQuery> {
        Query(DashboardQuery {
            period: period.map(str::to_owned),
            category: categories.iter().map(|&category| category.to_owned()).collect(),
        })
    }

    #[tokio::test]
    async fn dashboard_page_loads_successfully() {
        let state = get_test_state(&sample_records());

        let response = get_dashboard_page(State(state), query(None, &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);

        assert_element_exists(&html, "#income-category-chart");
        assert_element_exists(&html, "#income-daily-chart");
        assert_element_exists(&html, "#expense-category-chart");
        assert_element_exists(&html, "#expense-daily-chart");
        assert_element_exists(&html, "#records-table");
    }

    #[tokio::test]
    async fn shows_latest_period_totals_by_default() {
        let state = get_test_state(&sample_records());

        let response = get_dashboard_page(State(state), query(None, &[]))
            .await
            .unwrap();

        let html = parse_html(response).await;
        assert_eq!(selected_period(&html), "2024-01");
        assert_eq!(card_value(&html, "global-balance"), "$47,000.00");
        assert_eq!(card_value(&html, "total-income"), "$50,000.00");
        assert_eq!(card_value(&html, "total-expense"), "$2,000.00");
        assert_eq!(card_value(&html, "monthly-net"), "$48,000.00");
        assert_eq!(card_value(&html, "expense-change"), "+100.0%");
        assert_eq!(count(&html, "#records-table tbody tr"), 3);
    }

    #[tokio::test]
    async fn shows_requested_period() {
        let state = get_test_state(&sample_records());

        let response = get_dashboard_page(State(state), query(Some("2023-12"), &[]))
            .await
            .unwrap();

        let html = parse_html(response).await;
        assert_eq!(selected_period(&html), "2023-12");
        assert_eq!(card_value(&html, "total-expense"), "$1,000.00");
        assert_eq!(card_value(&html, "expense-change"), "n/a");
        // The balance ignores the filters.
        assert_eq!(card_value(&html, "global-balance"), "$47,000.00");
        assert!(
            html.select(&Selector::parse("#income").unwrap())
                .next()
                .unwrap()
                .text()
                .any(|text| text.contains("No data for this period."))
        );
    }

    #[tokio::test]
    async fn invalid_period_falls_back_to_latest() {
        for requested in ["not-a-period", "2022-06"] {
            let state = get_test_state(&sample_records());

            let response = get_dashboard_page(State(state), query(Some(requested), &[]))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let html = parse_html(response).await;
            assert_eq!(selected_period(&html), "2024-01", "requested {requested}");
        }
    }

    #[tokio::test]
    async fn filters_by_category() {
        let state = get_test_state(&sample_records());

        let response = get_dashboard_page(State(state), query(None, &["groceries"]))
            .await
            .unwrap();

        let html = parse_html(response).await;
        assert_eq!(card_value(&html, "total-income"), "$0.00");
        assert_eq!(card_value(&html, "total-expense"), "$1,200.00");
        // The previous month is compared without the category filter.
        assert_eq!(card_value(&html, "expense-change"), "+20.0%");
        assert_eq!(count(&html, "#records-table tbody tr"), 1);
        assert_eq!(
            checked_categories(&html),
            vec!["groceries".to_owned()],
            "only the selected category should be checked"
        );
    }

    #[tokio::test]
    async fn empty_category_selection_checks_every_category() {
        let state = get_test_state(&sample_records());

        let response = get_dashboard_page(State(state), query(None, &[]))
            .await
            .unwrap();

        let html = parse_html(response).await;
        assert_eq!(
            checked_categories(&html),
            vec!["groceries", "salary", "transport"]
        );
    }

    #[tokio::test]
    async fn shows_notice_when_filters_match_nothing() {
        let state = get_test_state(&sample_records());

        let response = get_dashboard_page(State(state), query(Some("2023-12"), &["salary"]))
            .await
            .unwrap();

        let html = parse_html(response).await;
        assert_valid_html(&html);
        assert_element_exists(&html, "#no-records-notice");
        assert_element_exists(&html, "#filters");
        assert_eq!(count(&html, "#records-table"), 0);
    }

    #[tokio::test]
    async fn displays_prompt_text_on_no_data() {
        let state = get_test_state(&[]);

        let response = get_dashboard_page(State(state), query(None, &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html(response).await;
        assert_no_data_prompt(&html);
    }

    #[tokio::test]
    async fn displays_prompt_text_when_load_fails() {
        let store = FlakyStore::failing_with(|| Error::SqlError(rusqlite::Error::InvalidQuery));
        let state = DashboardState::new(Arc::new(store), RecordCache::default());

        let response = get_dashboard_page(State(state), query(None, &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html(response).await;
        assert_no_data_prompt(&html);
    }

    #[test]
    fn dashboard_query_handles_multiple_categories() {
        let query: DashboardQuery =
            serde_html_form::from_str("period=2024-01&category=food&category=rent").unwrap();
        assert_eq!(query.period.as_deref(), Some("2024-01"));
        assert_eq!(query.category, vec!["food", "rent"]);

        let query: DashboardQuery = serde_html_form::from_str("category=food").unwrap();
        assert_eq!(query.period, None);
        assert_eq!(query.category, vec!["food"]);

        // No checkboxes selected
        let query: DashboardQuery = serde_html_form::from_str("period=2024-01").unwrap();
        assert_eq!(query.category, Vec::<String>::new());
    }

    async fn parse_html(response: Response<Body>) -> Html {
        let body = response.into_body();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&body).to_string();

        Html::parse_document(&text)
    }

    #[track_caller]
    fn assert_valid_html(html: &Html) {
        assert!(
            html.errors.is_empty(),
            "Got HTML parsing errors: {:?}",
            html.errors
        );
    }

    #[track_caller]
    fn assert_element_exists(html: &Html, selector: &str) {
        assert!(
            count(html, selector) > 0,
            "Element '{selector}' not found in {}",
            html.html()
        );
    }

    #[track_caller]
    fn assert_no_data_prompt(html: &Html) {
        let selector = Selector::parse("h2").unwrap();
        let heading: String = html
            .select(&selector)
            .next()
            .expect("no heading found")
            .text()
            .collect();
        assert_eq!(heading.trim(), "Nothing here yet...");
        assert_eq!(count(html, "#filters"), 0);
    }

    fn count(html: &Html, selector: &str) -> usize {
        html.select(&Selector::parse(selector).unwrap()).count()
    }

    #[track_caller]
    fn card_value(html: &Html, id: &str) -> String {
        let selector = Selector::parse(&format!("#{id} [data-value]")).unwrap();
        html.select(&selector)
            .next()
            .unwrap_or_else(|| panic!("card {id} not found"))
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[track_caller]
    fn selected_period(html: &Html) -> String {
        let selector = Selector::parse("select[name='period'] option[selected]").unwrap();
        let options: Vec<ElementRef> = html.select(&selector).collect();
        assert_eq!(options.len(), 1, "expected exactly one selected period");
        options[0].value().attr("value").unwrap().to_owned()
    }

    fn checked_categories(html: &Html) -> Vec<String> {
        let selector = Selector::parse("input[type='checkbox'][name='category'][checked]").unwrap();
        html.select(&selector)
            .map(|input| input.value().attr("value").unwrap().to_owned())
            .collect()
    }
}
