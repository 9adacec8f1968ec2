//! Coarse read/write classification of raw SQL text.

use sqlroute_common::OperationKind;

/// Classifies `sql` as a read or a write.
///
/// A statement is a read iff, after trimming leading whitespace and
/// case-folding, it starts with `select` and contains `for update`
/// nowhere. Everything else is a write. This never fails.
///
/// This is a prefix heuristic, not a parser. Known misclassifications:
///
/// - `SELECT ... INTO OUTFILE` is a read, although it writes a file.
/// - `WITH cte AS (...) SELECT ...` is a write, so it always lands on the
///   manager.
/// - A multi-statement batch is judged by its first statement only.
/// - `for update` inside a string literal or comment makes a select a write.
/// - `LOCK IN SHARE MODE` selects are reads.
///
/// # Example
///
/// ```
/// use sqlroute_common::OperationKind;
/// use sqlroute_proxy::classify;
///
/// assert_eq!(classify("  select * from film"), OperationKind::Read);
/// assert_eq!(classify("SELECT id FROM film FOR UPDATE"), OperationKind::Write);
/// assert_eq!(classify("INSERT INTO actor VALUES (1)"), OperationKind::Write);
/// ```
pub fn classify(sql: &str) -> OperationKind {
    let normalized = sql.trim_start().to_lowercase();
    if normalized.starts_with("select") && !normalized.contains("for update") {
        OperationKind::Read
    } else {
        OperationKind::Write
    }
}
