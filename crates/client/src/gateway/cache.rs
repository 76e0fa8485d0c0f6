//! Cache types for catalog responses.

use super::types::{Category, ProductDetail, ProductSummary};

/// Cached value types. Cart and checkout data are never cached.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    Products(Vec<ProductSummary>),
    Product(Box<ProductDetail>),
}
