//! SQL text helpers shared by the backend adapters.
//!
//! Builds parameterized multi-row INSERT statements and quoted identifiers
//! for both placeholder dialects (`?` for MySQL/SQLite, `$n` for
//! PostgreSQL). Chunks whose bind-parameter count would exceed the backend
//! limit are split into several statements; the adapter runs them all inside
//! one transaction so chunk atomicity is preserved.

/// Placeholder dialect used by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholders {
    /// Positional `?` placeholders (MySQL, SQLite).
    Question,
    /// Numbered `$1, $2, ...` placeholders (PostgreSQL).
    Numbered,
}

/// Identifier quoting style used by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// Backtick quoting (MySQL).
    Backtick,
    /// Double-quote quoting (PostgreSQL, SQLite).
    DoubleQuote,
}

/// Quotes an identifier, escaping embedded quote characters by doubling.
#[must_use]
pub fn quote_ident(ident: &str, style: QuoteStyle) -> String {
    match style {
        QuoteStyle::Backtick => format!("`{}`", ident.replace('`', "``")),
        QuoteStyle::DoubleQuote => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Builds one `INSERT INTO t (cols...) VALUES (...), (...)` statement for
/// `row_count` rows.
///
/// The caller binds `row_count * columns.len()` parameters in row-major
/// order.
#[must_use]
pub fn insert_statement(
    table: &str,
    columns: &[String],
    row_count: usize,
    placeholders: Placeholders,
    quotes: QuoteStyle,
) -> String {
    let col_list = columns
        .iter()
        .map(|c| quote_ident(c, quotes))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_ident(table, quotes),
        col_list
    );

    let width = columns.len();
    for row in 0..row_count {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..width {
            if col > 0 {
                sql.push_str(", ");
            }
            match placeholders {
                Placeholders::Question => sql.push('?'),
                Placeholders::Numbered => {
                    sql.push('$');
                    sql.push_str(&(row * width + col + 1).to_string());
                },
            }
        }
        sql.push(')');
    }

    sql
}

/// Maximum number of rows per INSERT statement for a given column count and
/// backend bind-parameter limit.
///
/// Always at least 1 so a single very wide row still produces a statement.
#[must_use]
pub fn rows_per_statement(column_count: usize, max_bind_params: usize) -> usize {
    if column_count == 0 {
        return 1;
    }
    (max_bind_params / column_count).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_styles() {
        assert_eq!(quote_ident("orders", QuoteStyle::Backtick), "`orders`");
        assert_eq!(quote_ident("orders", QuoteStyle::DoubleQuote), "\"orders\"");
        assert_eq!(quote_ident("we`ird", QuoteStyle::Backtick), "`we``ird`");
        assert_eq!(
            quote_ident("we\"ird", QuoteStyle::DoubleQuote),
            "\"we\"\"ird\""
        );
    }

    #[test]
    fn test_insert_statement_question() {
        let cols = vec!["id".to_string(), "name".to_string()];
        let sql = insert_statement(
            "people",
            &cols,
            2,
            Placeholders::Question,
            QuoteStyle::Backtick,
        );
        assert_eq!(
            sql,
            "INSERT INTO `people` (`id`, `name`) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_insert_statement_numbered() {
        let cols = vec!["id".to_string(), "name".to_string()];
        let sql = insert_statement(
            "people",
            &cols,
            2,
            Placeholders::Numbered,
            QuoteStyle::DoubleQuote,
        );
        assert_eq!(
            sql,
            "INSERT INTO \"people\" (\"id\", \"name\") VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn test_rows_per_statement() {
        assert_eq!(rows_per_statement(10, 65_535), 6553);
        assert_eq!(rows_per_statement(3, 999), 333);
        // a row wider than the limit still yields one row per statement
        assert_eq!(rows_per_statement(2000, 999), 1);
        assert_eq!(rows_per_statement(0, 999), 1);
    }
}
