use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Seeded suppliers and the number of products each one owns.
const SEED_SUPPLIERS: &[SeedSupplierContract] = &[
    SeedSupplierContract {
        id: 1,
        name: "TechMaster",
        product_count: 4,
        product_count_label: "TechMaster product count",
    },
    SeedSupplierContract {
        id: 2,
        name: "GameHub Wholesale",
        product_count: 3,
        product_count_label: "GameHub Wholesale product count",
    },
    SeedSupplierContract {
        id: 3,
        name: "OfficeLine Supply",
        product_count: 3,
        product_count_label: "OfficeLine Supply product count",
    },
    SeedSupplierContract {
        id: 4,
        name: "HomeNest Goods",
        product_count: 2,
        product_count_label: "HomeNest Goods product count",
    },
];

const SEED_PRODUCT_IDS: &[i64] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Demo catalog used by `sourcely seed` and pipeline smoke tests.
///
/// Rows carry fixed ids and are upserted, so the catalog is meant for fresh databases
/// and reloading it is idempotent.
pub struct DemoCatalog;

impl DemoCatalog {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        tracing::info!(
            event_name = "db.fixtures.demo_catalog_loaded",
            suppliers = SEED_SUPPLIERS.len(),
            products = SEED_PRODUCT_IDS.len(),
            "demo catalog loaded"
        );

        Ok(SeedResult {
            suppliers_seeded: SEED_SUPPLIERS.iter().map(|supplier| supplier.name).collect(),
            products_seeded: SEED_PRODUCT_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for supplier in SEED_SUPPLIERS {
            let name: Option<String> = sqlx::query_scalar("SELECT name FROM suppliers WHERE id = ?")
                .bind(supplier.id)
                .fetch_optional(pool)
                .await?;
            checks.push((supplier.name, name.as_deref() == Some(supplier.name)));

            let owned: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE supplier_id = ?")
                    .bind(supplier.id)
                    .fetch_one(pool)
                    .await?;
            checks.push((supplier.product_count_label, owned == supplier.product_count));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let product_ids = sql_array_from_ids(SEED_PRODUCT_IDS);
        let supplier_ids = sql_array_from_ids(
            &SEED_SUPPLIERS.iter().map(|supplier| supplier.id).collect::<Vec<_>>(),
        );

        sqlx::query(&format!("DELETE FROM products WHERE id IN {product_ids}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM suppliers WHERE id IN {supplier_ids}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedSupplierContract {
    id: i64,
    name: &'static str,
    product_count: i64,
    product_count_label: &'static str,
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub suppliers_seeded: Vec<&'static str>,
    pub products_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
