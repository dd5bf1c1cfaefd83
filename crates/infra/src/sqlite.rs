//! SQLite-backed product store.
//!
//! ## Uniqueness
//!
//! `cod` is the table's primary key. `insert` relies on it instead of a
//! check-then-insert, so two concurrent creates for the same code cannot both
//! succeed: the loser gets [`StoreError::Duplicate`].
//!
//! ## In-memory databases
//!
//! Every SQLite connection to `:memory:` opens a private database, so for
//! in-memory URLs the pool is pinned to one connection that is never recycled.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Connection, Executor, Row, Sqlite, SqlitePool};
use tracing::instrument;

use estoque_core::ProductCode;
use estoque_products::{Product, ProductChanges, RejectedRow, SheetRecord};

use crate::repository::{ImportOutcome, Page, PageRequest, ProductRepository, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS produtos (
    cod             INTEGER PRIMARY KEY,
    nome_do_produto TEXT    NOT NULL DEFAULT '',
    marca           TEXT    NOT NULL DEFAULT '',
    ceara           INTEGER NOT NULL DEFAULT 0,
    santa_catarina  INTEGER NOT NULL DEFAULT 0,
    sao_paulo       INTEGER NOT NULL DEFAULT 0,
    total           INTEGER NOT NULL DEFAULT 0,
    reserva         INTEGER NOT NULL DEFAULT 0
)
"#;

const COLUMNS: &str =
    "cod, nome_do_produto, marca, ceara, santa_catarina, sao_paulo, total, reserva";

#[derive(Debug, Clone)]
pub struct SqliteProductStore {
    pool: SqlitePool,
}

enum Written {
    Inserted,
    Updated,
}

impl SqliteProductStore {
    /// Connect and create the `produtos` table if it does not exist.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::database("parse_database_url", e))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if is_in_memory(database_url) {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::database("connect", e))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database("create_schema", e))?;
        Ok(())
    }

    /// Insert or overwrite one imported product inside its row savepoint.
    async fn write_imported(
        conn: &mut sqlx::SqliteConnection,
        product: &Product,
    ) -> Result<Written, sqlx::Error> {
        match fetch_product(&mut *conn, product.code()).await? {
            Some(mut existing) => {
                existing.overwrite_from(product);
                update_product(&mut *conn, &existing).await?;
                Ok(Written::Updated)
            }
            None => {
                insert_product(&mut *conn, product).await?;
                Ok(Written::Inserted)
            }
        }
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqliteProductStore {
    #[instrument(skip(self))]
    async fn find_by_code(&self, code: ProductCode) -> Result<Option<Product>, StoreError> {
        fetch_product(&self.pool, code)
            .await
            .map_err(|e| StoreError::database("find_by_code", e))
    }

    #[instrument(skip(self))]
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StoreError> {
        let pattern = format!("%{}%", escape_like(fragment));
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM produtos WHERE nome_do_produto LIKE ?1 ESCAPE '\\' ORDER BY cod"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database("search_by_name", e))?;

        rows.iter()
            .map(product_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::database("search_by_name", e))
    }

    #[instrument(skip(self, product), fields(code = %product.code()))]
    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        insert_product(&self.pool, product).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(product.code())
            } else {
                StoreError::database("insert", e)
            }
        })
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, code: ProductCode, changes: &ProductChanges) -> Result<Product, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database("begin_update", e))?;

        let mut product = fetch_product(&mut *tx, code)
            .await
            .map_err(|e| StoreError::database("update", e))?
            .ok_or(StoreError::NotFound(code))?;

        product.apply_changes(changes);
        update_product(&mut *tx, &product)
            .await
            .map_err(|e| StoreError::database("update", e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::database("commit_update", e))?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list_page(&self, request: PageRequest) -> Result<Page<Product>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM produtos")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database("count_products", e))?;

        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM produtos ORDER BY cod LIMIT ?1 OFFSET ?2"
        ))
        .bind(i64::try_from(request.per_page).unwrap_or(i64::MAX))
        .bind(i64::try_from(request.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database("list_page", e))?;

        let items = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::database("list_page", e))?;

        Ok(Page::new(items, u64::try_from(total).unwrap_or_default(), request))
    }

    #[instrument(skip(self, records), fields(rows = records.len()))]
    async fn apply_import(&self, records: &[SheetRecord]) -> Result<ImportOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database("begin_import", e))?;

        let mut outcome = ImportOutcome::default();
        for record in records {
            // One savepoint per row. A savepoint that cannot be rolled back
            // means SQLite already discarded the whole transaction.
            let mut row_tx = Connection::begin(&mut *tx)
                .await
                .map_err(|e| StoreError::database("begin_import_row", e))?;

            match Self::write_imported(&mut row_tx, &record.product).await {
                Ok(written) => {
                    row_tx
                        .commit()
                        .await
                        .map_err(|e| StoreError::database("release_import_row", e))?;
                    match written {
                        Written::Inserted => outcome.inserted += 1,
                        Written::Updated => outcome.updated += 1,
                    }
                }
                Err(e) => {
                    row_tx
                        .rollback()
                        .await
                        .map_err(|e| StoreError::database("rollback_import_row", e))?;
                    let code = record.product.code();
                    tracing::warn!(line = record.line, %code, error = %e, "skipping imported row");
                    outcome.rejected.push(RejectedRow {
                        line: record.line,
                        raw_code: code.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::database("commit_import", e))?;
        Ok(outcome)
    }
}

async fn fetch_product<'e, E>(executor: E, code: ProductCode) -> Result<Option<Product>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM produtos WHERE cod = ?1"))
        .bind(code.get())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(product_from_row).transpose()
}

async fn insert_product<'e, E>(executor: E, p: &Product) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(&format!(
        "INSERT INTO produtos ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    ))
    .bind(p.code().get())
    .bind(&p.name)
    .bind(&p.brand)
    .bind(p.stock_ceara)
    .bind(p.stock_santa_catarina)
    .bind(p.stock_sao_paulo)
    .bind(p.total)
    .bind(p.reserved)
    .execute(executor)
    .await?;
    Ok(())
}

async fn update_product<'e, E>(executor: E, p: &Product) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE produtos SET
            nome_do_produto = ?2,
            marca = ?3,
            ceara = ?4,
            santa_catarina = ?5,
            sao_paulo = ?6,
            total = ?7,
            reserva = ?8
        WHERE cod = ?1
        "#,
    )
    .bind(p.code().get())
    .bind(&p.name)
    .bind(&p.brand)
    .bind(p.stock_ceara)
    .bind(p.stock_santa_catarina)
    .bind(p.stock_sao_paulo)
    .bind(p.total)
    .bind(p.reserved)
    .execute(executor)
    .await?;
    Ok(())
}

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    let mut p = Product::new(ProductCode::new(row.try_get("cod")?));
    p.name = row.try_get("nome_do_produto")?;
    p.brand = row.try_get("marca")?;
    p.stock_ceara = row.try_get("ceara")?;
    p.stock_santa_catarina = row.try_get("santa_catarina")?;
    p.stock_sao_paulo = row.try_get("sao_paulo")?;
    p.total = row.try_get("total")?;
    p.reserved = row.try_get("reserva")?;
    Ok(p)
}

/// Escape `LIKE` metacharacters so the fragment matches literally (`ESCAPE '\'`).
fn escape_like(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
