//! Metric cards for the balance and the selected period's totals.

use maud::{Markup, html};

use crate::{
    dashboard::aggregation::{ExpenseChange, FlowTotals},
    html::format_currency,
};

const CARD_STYLE: &str = "bg-white dark:bg-gray-800 border border-gray-200 \
    dark:border-gray-700 rounded-lg p-4 shadow-md";
const CARD_LABEL_STYLE: &str = "text-sm text-gray-600 dark:text-gray-400";
const CARD_VALUE_STYLE: &str = "text-2xl font-bold";
const POSITIVE_STYLE: &str = "text-green-600 dark:text-green-400";
const NEGATIVE_STYLE: &str = "text-red-600 dark:text-red-400";

fn signed_color_class(amount: f64) -> &'static str {
    if amount >= 0.0 {
        POSITIVE_STYLE
    } else {
        NEGATIVE_STYLE
    }
}

/// Spending more than last month is bad news, so increases are shown in red.
fn change_color_class(change: ExpenseChange) -> &'static str {
    match change {
        ExpenseChange::NotAvailable => "",
        ExpenseChange::Percent(percent) if percent > 0.0 => NEGATIVE_STYLE,
        ExpenseChange::Percent(_) => POSITIVE_STYLE,
    }
}

fn metric_card(id: &str, label: &str, value: &str, value_class: &str) -> Markup {
    html! {
        div id=(id) class=(CARD_STYLE) {
            p class=(CARD_LABEL_STYLE) { (label) }
            p class={(CARD_VALUE_STYLE) " " (value_class)} data-value { (value) }
        }
    }
}

/// The balance over every record, unaffected by the filters.
pub(super) fn balance_card(balance: f64) -> Markup {
    metric_card(
        "global-balance",
        "Balance",
        &format_currency(balance),
        signed_color_class(balance),
    )
}

/// Income, expenses, net and the expense change for the selected period.
pub(super) fn overview_cards(totals: FlowTotals, change: ExpenseChange) -> Markup {
    html! {
        div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4" {
            (metric_card("total-income", "Income", &format_currency(totals.income), POSITIVE_STYLE))
            (metric_card("total-expense", "Expenses", &format_currency(totals.expense), NEGATIVE_STYLE))
            (metric_card(
                "monthly-net",
                "Monthly net",
                &format_currency(totals.net()),
                signed_color_class(totals.net())
            ))
            (metric_card(
                "expense-change",
                "Expenses vs previous month",
                &change.display(),
                change_color_class(change)
            ))
        }
    }
}
