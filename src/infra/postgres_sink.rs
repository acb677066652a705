use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::cleaner::Dataset;
use crate::error::{LoaderError, Result};
use crate::normalize::FieldValue;
use crate::ports::{LoadSink, TableIdentifier, WriteMode};
use crate::schema::{Schema, SemanticType};

/// PostgreSQL load sink. The whole write runs in one transaction: either the
/// destination table ends up holding the full dataset or it is untouched.
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    /// Connects using a `DATABASE_URL`-style connection string supplied at
    /// construction time.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .map_err(|e| LoaderError::Database {
                message: format!("connecting to database: {e}"),
            })?;
        Ok(Self { pool })
    }

    fn create_table_sql(table: &TableIdentifier, schema: &Schema) -> String {
        let columns: Vec<String> = schema
            .columns()
            .iter()
            .map(|spec| {
                let sql_type = match spec.semantic_type {
                    SemanticType::Integer => "BIGINT",
                    _ => "TEXT",
                };
                format!("{} {}", quote_ident(spec.name), sql_type)
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quoted_table(table),
            columns.join(", ")
        )
    }

    fn insert_sql(table: &TableIdentifier, schema: &Schema) -> String {
        let columns: Vec<String> = schema
            .columns()
            .iter()
            .map(|spec| quote_ident(spec.name))
            .collect();
        let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted_table(table),
            columns.join(", "),
            placeholders.join(", ")
        )
    }
}

#[async_trait]
impl LoadSink for PostgresSink {
    async fn write(
        &self,
        dataset: &Dataset,
        table: &TableIdentifier,
        mode: WriteMode,
    ) -> Result<u64> {
        let sink_err = |e: sqlx::Error| LoaderError::SinkWriteFailure {
            message: format!("writing {}: {e}", table.qualified()),
        };

        let mut tx = self.pool.begin().await.map_err(sink_err)?;

        if let Some(db_schema) = &table.schema {
            let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(db_schema));
            sqlx::query(&sql).execute(&mut *tx).await.map_err(sink_err)?;
        }

        if mode == WriteMode::Overwrite {
            let sql = format!("DROP TABLE IF EXISTS {}", quoted_table(table));
            sqlx::query(&sql).execute(&mut *tx).await.map_err(sink_err)?;
        }
        let ddl = Self::create_table_sql(table, &dataset.schema);
        sqlx::query(&ddl).execute(&mut *tx).await.map_err(sink_err)?;

        let insert = Self::insert_sql(table, &dataset.schema);
        for row in &dataset.rows {
            let mut query = sqlx::query(&insert);
            for value in row.values() {
                query = match value {
                    FieldValue::Int(v) => query.bind(*v),
                    FieldValue::Null => query.bind(Option::<i64>::None),
                    FieldValue::Text(s) => query.bind(s.clone()),
                };
            }
            query.execute(&mut *tx).await.map_err(sink_err)?;
        }

        tx.commit().await.map_err(sink_err)?;

        info!(
            table = %table.qualified(),
            rows = dataset.len(),
            mode = ?mode,
            "bulk write committed"
        );
        Ok(dataset.len() as u64)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quoted_table(table: &TableIdentifier) -> String {
    match &table.schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&table.name)),
        None => quote_ident(&table.name),
    }
}
