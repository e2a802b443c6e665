use sqlx::{QueryBuilder, Row, Sqlite};

use sourcely_core::domain::product::{NewProduct, Product, ProductFilter, ProductId, ProductSort};
use sourcely_core::domain::supplier::SupplierId;

use super::{Page, ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, name, brand, price, category, description, supplier_id";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    Ok(Product {
        id: ProductId(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        brand: row.try_get("brand").map_err(decode)?,
        price: row.try_get("price").map_err(decode)?,
        category: row.try_get("category").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        supplier_id: SupplierId(row.try_get("supplier_id").map_err(decode)?),
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    /// Equality and range predicates run in SQL. SQLite only folds ASCII case, so the
    /// case-insensitive text predicates are applied to the fetched rows.
    async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"
        ));

        if let Some(id) = filter.id {
            builder.push(" AND id = ");
            builder.push_bind(id.0);
        }
        if let Some(description) = &filter.description {
            builder.push(" AND description = ");
            builder.push_bind(description.clone());
        }
        if let Some(price) = filter.price {
            builder.push(" AND price = ");
            builder.push_bind(price);
        }
        if let Some(min_price) = filter.min_price {
            builder.push(" AND price >= ");
            builder.push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            builder.push(" AND price <= ");
            builder.push_bind(max_price);
        }
        if let Some(supplier_id) = filter.supplier_id {
            builder.push(" AND supplier_id = ");
            builder.push_bind(supplier_id.0);
        }

        builder.push(match filter.sort {
            Some(ProductSort::PriceAsc) => " ORDER BY price ASC, id ASC",
            Some(ProductSort::PriceDesc) => " ORDER BY price DESC, id ASC",
            None => " ORDER BY id ASC",
        });

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = row_to_product(row)?;
            if filter.matches_text(&product) {
                products.push(product);
            }
        }
        Ok(products)
    }

    async fn count_by_supplier(&self, supplier_id: SupplierId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE supplier_id = ?")
            .bind(supplier_id.0)
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count).map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    async fn list(&self, page: Page) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.skip))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO products (name, brand, price, category, description, supplier_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&product.name)
        .bind(&product.brand)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.supplier_id.0)
        .execute(&self.pool)
        .await?;

        Ok(product.with_id(ProductId(result.last_insert_rowid())))
    }

    async fn update(
        &self,
        id: ProductId,
        product: NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products
             SET name = ?, brand = ?, price = ?, category = ?, description = ?, supplier_id = ?
             WHERE id = ?",
        )
        .bind(&product.name)
        .bind(&product.brand)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.supplier_id.0)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(product.with_id(id)))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use sourcely_core::domain::product::{NewProduct, ProductFilter, ProductId, ProductSort};
    use sourcely_core::domain::supplier::{NewSupplier, SupplierId};

    use super::SqlProductRepository;
    use crate::connect_in_memory;
    use crate::repositories::{
        Page, ProductRepository, RepositoryError, SqlSupplierRepository, SupplierRepository,
    };

    async fn seeded() -> (SqlProductRepository, SupplierId) {
        let pool = connect_in_memory().await.expect("connect");
        let supplier = SqlSupplierRepository::new(pool.clone())
            .create(NewSupplier {
                name: "TechMaster".to_string(),
                email: "sales@techmaster.example".to_string(),
                phone: "555-0100".to_string(),
                address: "1 Main St".to_string(),
                categories_offered: vec!["Electronics".to_string()],
            })
            .await
            .expect("create supplier");

        let repo = SqlProductRepository::new(pool);
        for (name, brand, price, category) in [
            ("Gaming Monitor 27", "Acer", 349.0, "Gaming"),
            ("Gaming Monitor 32", "Samsung", 599.0, "Gaming"),
            ("Mechanical Keyboard", "Keychron", 99.0, "Accessories"),
            ("Office Monitor 24", "Dell", 179.0, "Electronics"),
        ] {
            repo.create(NewProduct {
                name: name.to_string(),
                brand: brand.to_string(),
                price,
                category: category.to_string(),
                description: format!("{brand} {name}"),
                supplier_id: supplier.id,
            })
            .await
            .expect("create product");
        }

        (repo, supplier.id)
    }

    #[tokio::test]
    async fn unconstrained_search_returns_whole_catalog() {
        let (repo, _) = seeded().await;
        let products = repo.search(&ProductFilter::default()).await.expect("search");
        assert_eq!(products.len(), 4);
    }

    #[tokio::test]
    async fn search_combines_substring_and_inclusive_price_bounds() {
        let (repo, _) = seeded().await;
        let filter = ProductFilter {
            category: Some("gaming".to_string()),
            name: Some("MONITOR".to_string()),
            max_price: Some(599.0),
            min_price: Some(349.0),
            ..ProductFilter::default()
        };

        let products = repo.search(&filter).await.expect("search");
        assert_eq!(products.len(), 2);

        let cheaper = ProductFilter { max_price: Some(500.0), ..filter };
        let products = repo.search(&cheaper).await.expect("search");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Gaming Monitor 27");
    }

    #[tokio::test]
    async fn free_text_matches_description() {
        let (repo, _) = seeded().await;
        let filter = ProductFilter { text: Some("keychron".to_string()), ..ProductFilter::default() };

        let products = repo.search(&filter).await.expect("search");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Mechanical Keyboard");
    }

    #[tokio::test]
    async fn search_honours_price_sort() {
        let (repo, _) = seeded().await;
        let filter = ProductFilter {
            name: Some("monitor".to_string()),
            sort: Some(ProductSort::PriceDesc),
            ..ProductFilter::default()
        };

        let prices: Vec<f64> =
            repo.search(&filter).await.expect("search").iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![599.0, 349.0, 179.0]);
    }

    #[tokio::test]
    async fn supplier_counts_and_filtering_agree() {
        let (repo, supplier_id) = seeded().await;
        let owned = ProductFilter { supplier_id: Some(supplier_id), ..ProductFilter::default() };

        assert_eq!(repo.count_by_supplier(supplier_id).await.expect("count"), 4);
        assert_eq!(repo.search(&owned).await.expect("search").len(), 4);
        assert_eq!(repo.count_by_supplier(SupplierId(999)).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let (repo, supplier_id) = seeded().await;
        let replacement = NewProduct {
            name: "Renamed".to_string(),
            brand: "Acer".to_string(),
            price: 10.0,
            category: "Gaming".to_string(),
            description: String::new(),
            supplier_id,
        };

        let updated = repo.update(ProductId(1), replacement.clone()).await.expect("update");
        assert_eq!(updated.map(|p| p.name), Some("Renamed".to_string()));
        assert!(repo.update(ProductId(404), replacement).await.expect("update").is_none());

        assert!(repo.delete(ProductId(1)).await.expect("delete"));
        assert!(!repo.delete(ProductId(1)).await.expect("delete twice"));
        assert_eq!(repo.list(Page::default()).await.expect("list").len(), 3);
    }

    #[tokio::test]
    async fn unknown_supplier_is_a_missing_reference() {
        let (repo, _) = seeded().await;
        let error = repo
            .create(NewProduct {
                name: "Orphan".to_string(),
                brand: "None".to_string(),
                price: 1.0,
                category: "Misc".to_string(),
                description: String::new(),
                supplier_id: SupplierId(77),
            })
            .await
            .expect_err("foreign key should fail");

        assert!(matches!(error, RepositoryError::MissingReference(_)));
    }

    #[tokio::test]
    async fn exact_attribute_filters_narrow_the_result() {
        let (repo, _) = seeded().await;

        let by_id = ProductFilter { id: Some(ProductId(3)), ..ProductFilter::default() };
        let found = repo.search(&by_id).await.expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Mechanical Keyboard");

        let by_price = ProductFilter { price: Some(599.0), ..ProductFilter::default() };
        assert_eq!(repo.search(&by_price).await.expect("search").len(), 1);

        let by_description = ProductFilter {
            description: Some("Dell Office Monitor 24".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(repo.search(&by_description).await.expect("search").len(), 1);

        let description_miss =
            ProductFilter { description: Some("Dell".to_string()), ..ProductFilter::default() };
        assert!(repo.search(&description_miss).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn text_filters_fold_non_ascii_case_and_keep_wildcards_literal() {
        let (repo, supplier_id) = seeded().await;
        repo.create(NewProduct {
            name: "Écran Incurvé 34".to_string(),
            brand: "Öko".to_string(),
            price: 429.0,
            category: "Électronique".to_string(),
            description: "100% recyclé".to_string(),
            supplier_id,
        })
        .await
        .expect("create product");

        let by_name = ProductFilter { name: Some("écran".to_string()), ..ProductFilter::default() };
        let by_category =
            ProductFilter { category: Some("ÉLECTRONIQUE".to_string()), ..ProductFilter::default() };
        let by_text = ProductFilter { text: Some("öko".to_string()), ..ProductFilter::default() };
        let wildcard = ProductFilter { text: Some("0%".to_string()), ..ProductFilter::default() };
        let underscore = ProductFilter { text: Some("_".to_string()), ..ProductFilter::default() };

        for filter in [by_name, by_category, by_text, wildcard] {
            let found = repo.search(&filter).await.expect("search");
            assert_eq!(found.len(), 1, "filter {filter:?}");
            assert_eq!(found[0].name, "Écran Incurvé 34");
        }
        assert!(repo.search(&underscore).await.expect("search").is_empty());
    }
}
