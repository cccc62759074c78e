//! Parsing of `category, amount[, comment]` chat messages.

use crate::Error;

/// The character that separates the fields of a message.
pub const DELIMITER: char = ',';

/// The fields of a message, before a date has been attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub category: String,
    pub amount: f64,
    pub comment: String,
}

/// Parse a message of the form `category, amount` or `category, amount, comment`.
///
/// Surrounding whitespace is trimmed from every field. The category is taken
/// as-is, including the empty string.
///
/// # Errors
/// Returns an:
/// - [Error::InvalidFormat] if the message does not have two or three fields,
/// - [Error::InvalidAmount] if the amount is not a finite number.
pub fn parse_message(text: &str) -> Result<ParsedEntry, Error> {
    let fields: Vec<&str> = text.trim().split(DELIMITER).map(str::trim).collect();

    let (category, raw_amount, comment) = match fields.as_slice() {
        [category, amount] => (*category, *amount, ""),
        [category, amount, comment] => (*category, *amount, *comment),
        _ => return Err(Error::InvalidFormat(fields.len())),
    };

    let amount = raw_amount
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| Error::InvalidAmount(raw_amount.to_owned()))?;

    Ok(ParsedEntry {
        category: category.to_owned(),
        amount,
        comment: comment.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::{ParsedEntry, parse_message};

    #[test]
    fn parses_category_and_amount() {
        let entry = parse_message("groceries, 1200").unwrap();

        assert_eq!(
            entry,
            ParsedEntry {
                category: "groceries".to_owned(),
                amount: 1200.0,
                comment: String::new(),
            }
        );
    }

    #[test]
    fn parses_comment() {
        let entry = parse_message("transport, 800, taxi home").unwrap();

        assert_eq!(entry.category, "transport");
        assert_eq!(entry.amount, 800.0);
        assert_eq!(entry.comment, "taxi home");
    }

    #[test]
    fn negative_amount_is_kept_signed() {
        let entry = parse_message("salary, -50000").unwrap();

        assert_eq!(entry.amount, -50000.0);
    }

    #[test]
    fn trims_whitespace_around_fields() {
        let entry = parse_message("  coffee ,\t 4.50 ,  flat white  \n").unwrap();

        assert_eq!(entry.category, "coffee");
        assert_eq!(entry.amount, 4.5);
        assert_eq!(entry.comment, "flat white");
    }

    #[test]
    fn accepts_empty_category() {
        let entry = parse_message(", 10").unwrap();

        assert_eq!(entry.category, "");
        assert_eq!(entry.amount, 10.0);
    }

    #[test]
    fn rejects_wrong_field_counts() {
        let cases = [
            ("groceries", 1),
            ("groceries 1200", 1),
            ("a, 1, b, c", 4),
            ("a, 1, b, c, d", 5),
        ];

        for (text, want_count) in cases {
            assert_eq!(
                parse_message(text),
                Err(Error::InvalidFormat(want_count)),
                "input {text:?}"
            );
        }
    }

    #[test]
    fn rejects_non_numeric_amount() {
        assert_eq!(
            parse_message("groceries, lots"),
            Err(Error::InvalidAmount("lots".to_owned()))
        );
        assert_eq!(
            parse_message("groceries, "),
            Err(Error::InvalidAmount(String::new()))
        );
    }

    #[test]
    fn rejects_non_finite_amount() {
        for amount in ["NaN", "inf", "-infinity"] {
            let text = format!("groceries, {amount}");

            assert_eq!(
                parse_message(&text),
                Err(Error::InvalidAmount(amount.to_owned())),
                "input {text:?}"
            );
        }
    }

    #[test]
    fn decimal_comma_splits_into_extra_field() {
        // "12,50" is read as amount "12" and comment "50".
        let entry = parse_message("lunch, 12,50").unwrap();

        assert_eq!(entry.amount, 12.0);
        assert_eq!(entry.comment, "50");
    }
}
