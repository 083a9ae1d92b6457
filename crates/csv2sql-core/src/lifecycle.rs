//! Table lifecycle: applying an import plan's `if_exists` policy and
//! creating the destination table before any rows flow.
//!
//! All DDL happens here, strictly before the loader's first insert. The
//! append policy performs a per-column compatibility check against the
//! existing table instead of trusting the name alone.

use tracing::info;

use csv2sql_core_common::adapter::{DatabaseAdapter, ExistingColumn};
use csv2sql_core_common::types::SqlType;

use crate::error::{Result, TableLifecycleError};
use crate::plan::{IfExists, ImportPlan};

/// Renders the `CREATE TABLE` statement for a plan against one backend.
#[must_use]
pub fn create_table_sql(adapter: &dyn DatabaseAdapter, plan: &ImportPlan) -> String {
    let columns: Vec<String> = plan
        .columns
        .iter()
        .map(|col| {
            let mut def = format!(
                "{} {}",
                adapter.quote_ident(&col.name),
                adapter.column_type_sql(&col.sql_type)
            );
            if !col.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        adapter.quote_ident(&plan.table),
        columns.join(", ")
    )
}

/// Backend-native type names that can hold values of the given inferred type.
///
/// Introspected names are normalized (lowercased, parenthesized length
/// stripped) before matching, so `VARCHAR(40)` and `character varying`
/// both land on `varchar`-family entries.
fn acceptable_native_names(ty: &SqlType) -> &'static [&'static str] {
    match ty {
        SqlType::TinyInt => &[
            "tinyint", "smallint", "int", "integer", "bigint", "int2", "int4", "int8",
        ],
        SqlType::SmallInt => &[
            "smallint", "int", "integer", "bigint", "int2", "int4", "int8",
        ],
        SqlType::Int => &["int", "integer", "bigint", "int4", "int8"],
        SqlType::BigInt => &["bigint", "integer", "int8"],
        SqlType::Decimal { .. } => &["decimal", "numeric", "double", "double precision", "real"],
        SqlType::Boolean => &["boolean", "bool", "tinyint", "integer"],
        SqlType::Date => &["date", "datetime", "timestamp"],
        SqlType::DateTime => &["datetime", "timestamp", "timestamp without time zone"],
        SqlType::Varchar(_) => &["varchar", "character varying", "char", "text", "clob"],
        SqlType::Text => &["text", "varchar", "character varying", "clob"],
    }
}

/// Strips a parenthesized suffix and lowercases a native type name.
fn normalize_native_type(raw: &str) -> String {
    let base = raw.split('(').next().unwrap_or(raw);
    base.trim().to_ascii_lowercase()
}

/// Checks that an existing table can absorb the planned columns.
///
/// Every planned column must exist with a type wide enough to hold the
/// inferred values. Extra existing columns are allowed; appends simply
/// leave them to their defaults.
fn check_append_compat(
    table: &str,
    existing: &[ExistingColumn],
    plan: &ImportPlan,
) -> std::result::Result<(), TableLifecycleError> {
    for col in &plan.columns {
        let Some(found) = existing.iter().find(|e| e.name.eq_ignore_ascii_case(&col.name)) else {
            return Err(TableLifecycleError::SchemaMismatch {
                table: table.to_string(),
                reason: format!("column '{}' does not exist in the table", col.name),
            });
        };
        let native = normalize_native_type(&found.data_type);
        if !acceptable_native_names(&col.sql_type).contains(&native.as_str()) {
            return Err(TableLifecycleError::SchemaMismatch {
                table: table.to_string(),
                reason: format!(
                    "column '{}' has type '{}' which cannot hold inferred {}",
                    col.name, found.data_type, col.sql_type
                ),
            });
        }
    }
    Ok(())
}

/// Applies the plan's `if_exists` policy and ensures the table exists.
///
/// - `fail`: error out if the table already exists, otherwise create it.
/// - `replace`: drop any existing table, then create fresh.
/// - `append`: create if missing; if present, verify column compatibility
///   and insert into the existing table as-is.
///
/// # Errors
///
/// Returns [`TableLifecycleError::TableExists`] under the fail policy and
/// [`TableLifecycleError::SchemaMismatch`] when an append target cannot
/// absorb the planned columns. Adapter failures propagate.
pub async fn prepare_table(adapter: &dyn DatabaseAdapter, plan: &ImportPlan) -> Result<()> {
    let exists = adapter.table_exists(&plan.table).await?;
    match (plan.if_exists, exists) {
        (IfExists::Fail, true) => {
            return Err(TableLifecycleError::TableExists {
                table: plan.table.clone(),
            }
            .into());
        },
        (IfExists::Replace, true) => {
            info!(table = %plan.table, "dropping existing table");
            adapter
                .execute_ddl(&format!(
                    "DROP TABLE IF EXISTS {}",
                    adapter.quote_ident(&plan.table)
                ))
                .await?;
        },
        (IfExists::Append, true) => {
            let existing = adapter.table_columns(&plan.table).await?;
            check_append_compat(&plan.table, &existing, plan)?;
            info!(table = %plan.table, "appending to existing table");
            return Ok(());
        },
        _ => {},
    }

    let ddl = create_table_sql(adapter, plan);
    info!(table = %plan.table, "creating table");
    adapter.execute_ddl(&ddl).await?;
    Ok(())
}
