pub mod config;
pub mod domain;
pub mod errors;

pub use domain::chat::{conversation_title, ChatExchange, ChatId, NewChatExchange};
pub use domain::product::{NewProduct, Product, ProductFilter, ProductId, ProductSort};
pub use domain::supplier::{NewSupplier, Supplier, SupplierId, SupplierSearch};
pub use errors::{ApplicationError, DomainError, InterfaceError};
