//! Cache types for catalogue responses.

use super::types::{Product, ProductList};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductList),
}
