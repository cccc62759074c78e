//! The texts the bot sends back to the user.

/// Sent for `/start` and `/help`.
pub const WELCOME: &str = "Hi! Send me a record in one of these formats:\n\
    • category, amount\n\
    • category, amount, comment\n\n\
    Write income with a minus sign, e.g. salary, -50000";

/// Sent when a message does not have two or three fields.
pub const USAGE: &str = "Invalid format. Use:\n\
    category, amount\n\
    or\n\
    category, amount, comment";

/// Sent when the amount is not a number.
pub const INVALID_AMOUNT: &str = "The amount must be a number.";

/// Sent after a record was saved.
pub const SAVED: &str = "✅ Record saved!";

/// Sent when the record could not be written, whatever the reason.
pub const SAVE_FAILED: &str = "❌ Could not save the record. Please try again later.";

/// Sent for failures that are not caused by the message or the database.
pub const UNEXPECTED: &str = "An unexpected error occurred.";
