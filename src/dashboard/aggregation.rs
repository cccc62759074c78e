//! Record aggregation for the dashboard metrics, charts and tables.
//!
//! Provides functions to compute the overall balance, filter records by
//! month and category, total income and expenses, compare expenses with the
//! previous month, and group amounts by category or by day.

use std::collections::{BTreeMap, HashMap};

use time::Date;

use crate::{dashboard::period::Period, record::Record};

/// The label of the group that collects every category outside the top ones.
pub(super) const OTHER_LABEL: &str = "Other";

/// How many categories a breakdown shows before collapsing the rest.
pub(super) const TOP_CATEGORY_COUNT: usize = 5;

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Income,
    Expense,
}

impl Flow {
    pub(super) fn label(self) -> &'static str {
        match self {
            Flow::Income => "Income",
            Flow::Expense => "Expense",
        }
    }
}

/// A record with the fields derived for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RecordView {
    pub date: Date,
    pub amount: f64,
    pub category: String,
    pub comment: String,
    pub flow: Flow,
    /// The unsigned amount.
    pub amount_abs: f64,
    pub period: Period,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            date: record.date,
            amount: record.amount,
            category: record.category.clone(),
            comment: record.comment.clone(),
            flow: if record.is_income() {
                Flow::Income
            } else {
                Flow::Expense
            },
            amount_abs: record.amount.abs(),
            period: Period::from_date(record.date),
        }
    }
}

/// Income and expense totals for a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(super) struct FlowTotals {
    pub income: f64,
    pub expense: f64,
}

impl FlowTotals {
    pub(super) fn from_views<'a>(views: impl IntoIterator<Item = &'a RecordView>) -> Self {
        views
            .into_iter()
            .fold(FlowTotals::default(), |mut totals, view| {
                match view.flow {
                    Flow::Income => totals.income += view.amount_abs,
                    Flow::Expense => totals.expense += view.amount_abs,
                }
                totals
            })
    }

    /// Income minus expenses.
    pub(super) fn net(&self) -> f64 {
        self.income - self.expense
    }
}

/// The change in expenses compared to the previous month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum ExpenseChange {
    /// The previous month has no expenses to compare against.
    NotAvailable,
    /// The signed percentage change, rounded to one decimal place.
    Percent(f64),
}

impl ExpenseChange {
    pub(super) fn display(self) -> String {
        match self {
            ExpenseChange::NotAvailable => "n/a".to_owned(),
            ExpenseChange::Percent(percent) => format!("{percent:+.1}%"),
        }
    }
}

/// Income minus expenses across every record, regardless of any filter.
///
/// Because income is stored as negative amounts, this equals the negated sum
/// of all amounts.
pub(super) fn global_balance(views: &[RecordView]) -> f64 {
    FlowTotals::from_views(views).net()
}

/// The distinct periods in `views`, most recent first.
pub(super) fn available_periods(views: &[RecordView]) -> Vec<Period> {
    let mut periods: Vec<Period> = views.iter().map(|view| view.period).collect();
    periods.sort_unstable_by(|a, b| b.cmp(a));
    periods.dedup();
    periods
}

/// The distinct categories in `views`, sorted alphabetically.
pub(super) fn available_categories(views: &[RecordView]) -> Vec<String> {
    let mut categories: Vec<String> = views.iter().map(|view| view.category.clone()).collect();
    categories.sort_unstable();
    categories.dedup();
    categories
}

/// The records in `period` whose category is in `categories`.
///
/// An empty `categories` slice selects every category.
pub(super) fn filter_views<'a>(
    views: &'a [RecordView],
    period: Period,
    categories: &[String],
) -> Vec<&'a RecordView> {
    views
        .iter()
        .filter(|view| view.period == period)
        .filter(|view| categories.is_empty() || categories.contains(&view.category))
        .collect()
}

/// Compare `current_expense` with every expense of the month before `period`.
///
/// The previous month is not filtered by category. The comparison is not
/// available if the previous month has no expenses.
pub(super) fn expense_change(
    views: &[RecordView],
    period: Period,
    current_expense: f64,
) -> ExpenseChange {
    let previous_period = period.previous();
    let previous_expense =
        FlowTotals::from_views(views.iter().filter(|view| view.period == previous_period))
            .expense;

    if previous_expense <= 0.0 {
        return ExpenseChange::NotAvailable;
    }

    let percent = (current_expense - previous_expense) / previous_expense * 100.0;

    ExpenseChange::Percent((percent * 10.0).round() / 10.0)
}

/// Totals per category for one flow, largest first.
///
/// Only the [TOP_CATEGORY_COUNT] largest categories are kept, the rest are
/// summed into a single [OTHER_LABEL] group.
///
/// # Returns
/// `None` if there are no records of that flow.
pub(super) fn category_breakdown(views: &[&RecordView], flow: Flow) -> Option<Vec<(String, f64)>> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for view in views.iter().filter(|view| view.flow == flow) {
        *totals.entry(view.category.as_str()).or_insert(0.0) += view.amount_abs;
    }

    if totals.is_empty() {
        return None;
    }

    let mut sorted: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(category, total)| (category.to_owned(), total))
        .collect();
    sorted.sort_by(|(a_name, a_total), (b_name, b_total)| {
        b_total.total_cmp(a_total).then_with(|| a_name.cmp(b_name))
    });

    if sorted.len() > TOP_CATEGORY_COUNT {
        let other_total = sorted
            .drain(TOP_CATEGORY_COUNT..)
            .map(|(_, total)| total)
            .sum();
        sorted.push((OTHER_LABEL.to_owned(), other_total));
    }

    Some(sorted)
}

/// Totals per day for one flow, in date order.
pub(super) fn daily_series(views: &[&RecordView], flow: Flow) -> Vec<(Date, f64)> {
    let mut totals: BTreeMap<Date, f64> = BTreeMap::new();

    for view in views.iter().filter(|view| view.flow == flow) {
        *totals.entry(view.date).or_insert(0.0) += view.amount_abs;
    }

    totals.into_iter().collect()
}
