use async_trait::async_trait;
use thiserror::Error;

use sourcely_core::domain::chat::{ChatExchange, ChatId, NewChatExchange};
use sourcely_core::domain::product::{NewProduct, Product, ProductFilter, ProductId};
use sourcely_core::domain::supplier::{NewSupplier, Supplier, SupplierId, SupplierSearch};
use sourcely_core::errors::{ApplicationError, DomainError};

pub mod chat;
pub mod memory;
pub mod product;
pub mod supplier;

pub use chat::SqlChatHistoryRepository;
pub use memory::{
    InMemoryChatHistoryRepository, InMemoryProductRepository, InMemorySupplierRepository,
};
pub use product::SqlProductRepository;
pub use supplier::SqlSupplierRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("missing reference: {0}")]
    MissingReference(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(database_error) = &error {
            if database_error.is_unique_violation() {
                return Self::Conflict(database_error.message().to_string());
            }
            if database_error.is_foreign_key_violation() {
                return Self::MissingReference(database_error.message().to_string());
            }
        }
        Self::Database(error)
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::MissingReference(message) => {
                Self::Domain(DomainError::InvariantViolation(message))
            }
            error @ (RepositoryError::Database(_) | RepositoryError::Decode(_)) => {
                Self::Persistence(error.to_string())
            }
        }
    }
}

/// Offset pagination for list endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    pub const MAX_LIMIT: u32 = 500;

    pub fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit: limit.clamp(1, Self::MAX_LIMIT) }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Conjunctive search; an unconstrained filter returns the whole catalog.
    async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    async fn count_by_supplier(&self, supplier_id: SupplierId) -> Result<u64, RepositoryError>;

    async fn list(&self, page: Page) -> Result<Vec<Product>, RepositoryError>;

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn update(
        &self,
        id: ProductId,
        product: NewProduct,
    ) -> Result<Option<Product>, RepositoryError>;

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn find_by_id(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError>;

    /// Matches are returned in ascending id order.
    async fn search(&self, search: &SupplierSearch) -> Result<Vec<Supplier>, RepositoryError>;

    async fn list(&self, page: Page) -> Result<Vec<Supplier>, RepositoryError>;

    async fn create(&self, supplier: NewSupplier) -> Result<Supplier, RepositoryError>;
}

#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    async fn append(&self, exchange: NewChatExchange) -> Result<ChatExchange, RepositoryError>;

    /// Most recent exchange of every conversation, newest conversation first.
    async fn latest_per_chat(&self) -> Result<Vec<ChatExchange>, RepositoryError>;

    /// All exchanges of one conversation, oldest first.
    async fn list_for_chat(&self, chat_id: &ChatId) -> Result<Vec<ChatExchange>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use sourcely_core::errors::{ApplicationError, InterfaceError};

    use super::{Page, RepositoryError};

    #[test]
    fn page_limit_is_clamped() {
        assert_eq!(Page::new(3, 0), Page { skip: 3, limit: 1 });
        assert_eq!(Page::new(0, 10_000).limit, Page::MAX_LIMIT);
    }

    #[test]
    fn repository_errors_map_to_interface_errors() {
        let conflict = ApplicationError::from(RepositoryError::Conflict("email".to_string()))
            .into_interface("req-1");
        assert!(matches!(conflict, InterfaceError::Conflict { .. }));

        let missing =
            ApplicationError::from(RepositoryError::MissingReference("supplier".to_string()))
                .into_interface("req-2");
        assert!(matches!(missing, InterfaceError::BadRequest { .. }));

        let decode = ApplicationError::from(RepositoryError::Decode("price".to_string()))
            .into_interface("req-3");
        assert!(matches!(decode, InterfaceError::ServiceUnavailable { .. }));
    }
}
