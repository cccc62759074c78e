use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use time::{Date, Duration};

use budget_bot::{NewRecord, RecordStore, SqliteRecordStore, local_today};

/// A utility for creating a test database for budget_bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many months of records to create, ending with the current month.
    #[arg(long, default_value_t = 4)]
    months: u32,
}

/// Expenses repeated every month: (day of month, amount, category, comment).
const MONTHLY_EXPENSES: [(u8, f64, &str, &str); 9] = [
    (1, 1800.0, "rent", "monthly rent"),
    (3, 145.2, "groceries", ""),
    (8, 60.0, "transport", "bus pass"),
    (10, 98.75, "groceries", ""),
    (12, 42.5, "eating out", "pizza night"),
    (15, 120.0, "utilities", "power"),
    (18, 15.99, "subscriptions", "music"),
    (21, 210.4, "groceries", "big shop"),
    (25, 35.0, "gifts", ""),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let store = SqliteRecordStore::open(output_path)?;
    store.ensure_schema()?;

    let today = local_today(None)?;
    let mut month_start = today.replace_day(1)?;
    let mut count = 0;

    println!("Creating records for {} months...", args.months);

    for month_index in 0..args.months {
        let salary = -(5000.0 + f64::from(month_index) * 100.0);
        let mut records = vec![NewRecord {
            date: month_start,
            amount: salary,
            category: "salary".to_owned(),
            comment: format!("{} pay", month_start.month()),
        }];

        for (day, amount, category, comment) in MONTHLY_EXPENSES {
            // Only create records up to today in the current month.
            let date = month_start.replace_day(day)?;
            if date > today {
                continue;
            }

            records.push(NewRecord {
                date,
                // Vary amounts between months.
                amount: amount * (1.0 + f64::from(month_index % 3) * 0.1),
                category: category.to_owned(),
                comment: comment.to_owned(),
            });
        }

        for record in &records {
            store.append(record)?;
        }
        count += records.len();

        month_start = previous_month_start(month_start)?;
    }

    println!("Created {count} records.");
    println!("Success!");

    Ok(())
}

fn previous_month_start(month_start: Date) -> Result<Date, time::error::ComponentRange> {
    let last_day_of_previous_month = month_start - Duration::days(1);

    Date::from_calendar_date(
        last_day_of_previous_month.year(),
        last_day_of_previous_month.month(),
        1,
    )
}
