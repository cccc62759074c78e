//! The records detail table.

use maud::{Markup, html};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    dashboard::aggregation::{Flow, RecordView},
    html::{
        CATEGORY_BADGE_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        format_currency,
    },
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[day].[month].[year]");

const TABLE_CELL_GREEN_STYLE: &str = "text-green-600 dark:text-green-400";
const TABLE_CELL_RED_STYLE: &str = "text-red-600 dark:text-red-400";

/// Format `date` as `DD.MM.YYYY`.
pub(super) fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

fn flow_color_class(flow: Flow) -> &'static str {
    match flow {
        Flow::Income => TABLE_CELL_GREEN_STYLE,
        Flow::Expense => TABLE_CELL_RED_STYLE,
    }
}

/// Renders every record in `views`, newest first, with its signed amount and flow.
pub(super) fn records_table(views: &[&RecordView]) -> Markup {
    let mut rows: Vec<&RecordView> = views.to_vec();
    // Stable, so records on the same day keep their load order (newest id first).
    rows.sort_by(|a, b| b.date.cmp(&a.date));

    html! {
        div class="overflow-x-auto rounded-lg shadow" {
            table id="records-table" class="w-full text-sm text-left text-gray-500 dark:text-gray-400" {
                thead class=(TABLE_HEADER_STYLE) {
                    tr {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Comment" }
                    }
                }
                tbody {
                    @for view in rows {
                        tr class=(TABLE_ROW_STYLE) {
                            td class={(TABLE_CELL_STYLE) " whitespace-nowrap"} {
                                (format_date(view.date))
                            }
                            td class={(TABLE_CELL_STYLE) " text-right whitespace-nowrap"} {
                                (format_currency(view.amount))
                            }
                            td class=(TABLE_CELL_STYLE) {
                                @if !view.category.is_empty() {
                                    span class=(CATEGORY_BADGE_STYLE) { (view.category) }
                                }
                            }
                            td class={(TABLE_CELL_STYLE) " " (flow_color_class(view.flow))} {
                                (view.flow.label())
                            }
                            td class=(TABLE_CELL_STYLE) { (view.comment) }
                        }
                    }
                }
            }
        }
    }
}
