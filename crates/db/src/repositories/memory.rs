use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use sourcely_core::domain::chat::{ChatExchange, ChatId, NewChatExchange};
use sourcely_core::domain::product::{NewProduct, Product, ProductFilter, ProductId, ProductSort};
use sourcely_core::domain::supplier::{NewSupplier, Supplier, SupplierId, SupplierSearch};

use super::{
    ChatHistoryRepository, Page, ProductRepository, RepositoryError, SupplierRepository,
};

/// Rows keyed by id with an autoincrement counter, mirroring SQLite rowid assignment.
struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), last_id: 0 }
    }
}

impl<T: Clone> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn page(&self, page: Page) -> Vec<T> {
        self.rows.values().skip(page.skip as usize).take(page.limit as usize).cloned().collect()
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<Table<Product>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.rows.get(&id.0).cloned())
    }

    async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut matches: Vec<Product> =
            products.rows.values().filter(|product| filter.matches(product)).cloned().collect();

        // Stable sort keeps id order among equal prices.
        match filter.sort {
            Some(ProductSort::PriceAsc) => {
                matches.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal));
            }
            Some(ProductSort::PriceDesc) => {
                matches.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal));
            }
            None => {}
        }
        Ok(matches)
    }

    async fn count_by_supplier(&self, supplier_id: SupplierId) -> Result<u64, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.rows.values().filter(|p| p.supplier_id == supplier_id).count() as u64)
    }

    async fn list(&self, page: Page) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.read().await.page(page))
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut products = self.products.write().await;
        let product = product.with_id(ProductId(products.next_id()));
        products.rows.insert(product.id.0, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        product: NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut products = self.products.write().await;
        match products.rows.get_mut(&id.0) {
            Some(existing) => {
                *existing = product.with_id(id);
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().await;
        Ok(products.rows.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemorySupplierRepository {
    suppliers: RwLock<Table<Supplier>>,
}

#[async_trait::async_trait]
impl SupplierRepository for InMemorySupplierRepository {
    async fn find_by_id(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.rows.get(&id.0).cloned())
    }

    async fn search(&self, search: &SupplierSearch) -> Result<Vec<Supplier>, RepositoryError> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.rows.values().filter(|supplier| search.matches(supplier)).cloned().collect())
    }

    async fn list(&self, page: Page) -> Result<Vec<Supplier>, RepositoryError> {
        Ok(self.suppliers.read().await.page(page))
    }

    async fn create(&self, supplier: NewSupplier) -> Result<Supplier, RepositoryError> {
        let mut suppliers = self.suppliers.write().await;
        if suppliers.rows.values().any(|existing| existing.email == supplier.email) {
            return Err(RepositoryError::Conflict(format!(
                "supplier email `{}` already exists",
                supplier.email
            )));
        }

        let supplier = supplier.with_id(SupplierId(suppliers.next_id()));
        suppliers.rows.insert(supplier.id.0, supplier.clone());
        Ok(supplier)
    }
}

#[derive(Default)]
pub struct InMemoryChatHistoryRepository {
    exchanges: RwLock<Table<ChatExchange>>,
}

#[async_trait::async_trait]
impl ChatHistoryRepository for InMemoryChatHistoryRepository {
    async fn append(&self, exchange: NewChatExchange) -> Result<ChatExchange, RepositoryError> {
        let mut exchanges = self.exchanges.write().await;
        let exchange = ChatExchange {
            id: exchanges.next_id(),
            chat_id: exchange.chat_id,
            title: exchange.title,
            user_message: exchange.user_message,
            bot_response: exchange.bot_response,
            timestamp: exchange.timestamp,
        };
        exchanges.rows.insert(exchange.id, exchange.clone());
        Ok(exchange)
    }

    async fn latest_per_chat(&self) -> Result<Vec<ChatExchange>, RepositoryError> {
        let exchanges = self.exchanges.read().await;

        let mut titles: HashMap<&ChatId, &str> = HashMap::new();
        let mut latest: HashMap<&ChatId, &ChatExchange> = HashMap::new();
        for exchange in exchanges.rows.values() {
            if let Some(title) = exchange.title.as_deref() {
                titles.entry(&exchange.chat_id).or_insert(title);
            }
            let newer = latest.get(&exchange.chat_id).map_or(true, |current| {
                (exchange.timestamp, exchange.id) > (current.timestamp, current.id)
            });
            if newer {
                latest.insert(&exchange.chat_id, exchange);
            }
        }

        let mut result: Vec<ChatExchange> = latest
            .into_values()
            .map(|exchange| {
                let mut exchange = exchange.clone();
                if exchange.title.is_none() {
                    exchange.title = titles.get(&exchange.chat_id).map(|title| title.to_string());
                }
                exchange
            })
            .collect();
        result.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(result)
    }

    async fn list_for_chat(&self, chat_id: &ChatId) -> Result<Vec<ChatExchange>, RepositoryError> {
        let exchanges = self.exchanges.read().await;
        let mut conversation: Vec<ChatExchange> =
            exchanges.rows.values().filter(|e| &e.chat_id == chat_id).cloned().collect();
        conversation.sort_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id)));
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use sourcely_core::domain::chat::{ChatId, NewChatExchange};
    use sourcely_core::domain::product::{NewProduct, ProductFilter, ProductSort};
    use sourcely_core::domain::supplier::{NewSupplier, SupplierId, SupplierSearch};

    use crate::repositories::{
        ChatHistoryRepository, InMemoryChatHistoryRepository, InMemoryProductRepository,
        InMemorySupplierRepository, Page, ProductRepository, RepositoryError, SupplierRepository,
    };

    fn product(name: &str, price: f64, supplier: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            brand: "Acme".to_string(),
            price,
            category: "Electronics".to_string(),
            description: String::new(),
            supplier_id: SupplierId(supplier),
        }
    }

    #[tokio::test]
    async fn in_memory_product_repo_searches_and_sorts() {
        let repo = InMemoryProductRepository::default();
        for new_product in
            [product("Monitor A", 300.0, 1), product("Monitor B", 150.0, 2), product("Cable", 5.0, 1)]
        {
            repo.create(new_product).await.expect("create");
        }

        let filter = ProductFilter {
            name: Some("monitor".to_string()),
            sort: Some(ProductSort::PriceAsc),
            ..ProductFilter::default()
        };
        let names: Vec<String> =
            repo.search(&filter).await.expect("search").into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Monitor B", "Monitor A"]);

        assert_eq!(repo.count_by_supplier(SupplierId(1)).await.expect("count"), 2);
        assert_eq!(repo.list(Page::new(2, 10)).await.expect("page").len(), 1);
    }

    #[tokio::test]
    async fn in_memory_ids_are_not_reused_after_delete() {
        let repo = InMemoryProductRepository::default();
        let first = repo.create(product("One", 1.0, 1)).await.expect("create");
        assert!(repo.delete(first.id).await.expect("delete"));

        let second = repo.create(product("Two", 2.0, 1)).await.expect("create");
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn in_memory_supplier_repo_enforces_unique_email() {
        let repo = InMemorySupplierRepository::default();
        let new_supplier = NewSupplier {
            name: "TechMaster".to_string(),
            email: "sales@techmaster.example".to_string(),
            phone: String::new(),
            address: String::new(),
            categories_offered: vec!["Electronics".to_string()],
        };

        repo.create(new_supplier.clone()).await.expect("create");
        let error = repo.create(new_supplier).await.expect_err("duplicate email");
        assert!(matches!(error, RepositoryError::Conflict(_)));

        let found = repo.search(&SupplierSearch::by_name("tech")).await.expect("search");
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn in_memory_chat_history_groups_by_chat() {
        let repo = InMemoryChatHistoryRepository::default();
        let start = Utc::now();
        for (chat, title, offset) in [("a", Some("first"), 0), ("b", Some("other"), 1), ("a", None, 2)]
        {
            repo.append(NewChatExchange {
                chat_id: ChatId(chat.to_string()),
                title: title.map(str::to_string),
                user_message: format!("message {offset}"),
                bot_response: "{}".to_string(),
                timestamp: start + Duration::seconds(offset),
            })
            .await
            .expect("append");
        }

        let latest = repo.latest_per_chat().await.expect("latest");
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].user_message, "message 2");
        assert_eq!(latest[0].title.as_deref(), Some("first"));

        let conversation = repo.list_for_chat(&ChatId("a".to_string())).await.expect("list");
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].user_message, "message 0");
    }
}
