use sqlx::Row;

use sourcely_core::domain::supplier::{NewSupplier, Supplier, SupplierId, SupplierSearch};

use super::{Page, RepositoryError, SupplierRepository};
use crate::DbPool;

const SUPPLIER_COLUMNS: &str = "id, name, email, phone, address, categories_offered";

pub struct SqlSupplierRepository {
    pool: DbPool,
}

impl SqlSupplierRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_supplier(row: &sqlx::sqlite::SqliteRow) -> Result<Supplier, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let categories_json: String = row.try_get("categories_offered").map_err(decode)?;
    let categories_offered: Vec<String> = serde_json::from_str(&categories_json)
        .map_err(|e| RepositoryError::Decode(format!("categories_offered: {e}")))?;

    Ok(Supplier {
        id: SupplierId(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
        categories_offered,
    })
}

#[async_trait::async_trait]
impl SupplierRepository for SqlSupplierRepository {
    async fn find_by_id(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_supplier).transpose()
    }

    /// Matching runs on the fetched rows so name and category comparisons fold
    /// non-ASCII case, which SQLite `LIKE` and `lower()` do not.
    async fn search(&self, search: &SupplierSearch) -> Result<Vec<Supplier>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY id ASC"))
                .fetch_all(&self.pool)
                .await?;

        let mut suppliers = Vec::new();
        for row in &rows {
            let supplier = row_to_supplier(row)?;
            if search.matches(&supplier) {
                suppliers.push(supplier);
            }
        }
        Ok(suppliers)
    }

    async fn list(&self, page: Page) -> Result<Vec<Supplier>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY id ASC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.skip))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_supplier).collect()
    }

    async fn create(&self, supplier: NewSupplier) -> Result<Supplier, RepositoryError> {
        let categories_json = serde_json::to_string(&supplier.categories_offered)
            .map_err(|e| RepositoryError::Decode(format!("categories_offered: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO suppliers (name, email, phone, address, categories_offered)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&supplier.name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(categories_json)
        .execute(&self.pool)
        .await?;

        Ok(supplier.with_id(SupplierId(result.last_insert_rowid())))
    }
}
