use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validate_not_blank;

/// A catalog product as stored and returned by the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Unique across the catalog, compared case-sensitively.
    pub code: String,
    pub price: f64,
    pub status: bool,
    pub stock: i64,
    pub category: String,
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(custom = "validate_not_blank")]
    pub title: String,
    #[validate(custom = "validate_not_blank")]
    pub description: String,
    #[validate(custom = "validate_not_blank")]
    pub code: String,
    #[validate(custom = "validate_price")]
    pub price: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "stock must be zero or greater"))]
    pub stock: i64,
    #[validate(custom = "validate_not_blank")]
    pub category: String,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    #[validate(custom = "validate_thumbnails")]
    pub thumbnails: Vec<String>,
}

impl NewProduct {
    pub fn into_product(self, id: Uuid) -> Product {
        Product {
            id,
            title: self.title,
            description: self.description,
            code: self.code,
            price: self.price,
            status: self.status.unwrap_or(true),
            stock: self.stock,
            category: self.category,
            thumbnails: self.thumbnails,
        }
    }
}

/// Partial update: only the fields present are applied.
///
/// `id` is accepted so that a body echoing the current id is harmless;
/// any other value is rejected by the catalog service.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductPatch {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(custom = "validate_not_blank")]
    pub title: Option<String>,
    #[validate(custom = "validate_not_blank")]
    pub description: Option<String>,
    #[validate(custom = "validate_not_blank")]
    pub code: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "stock must be zero or greater"))]
    pub stock: Option<i64>,
    #[validate(custom = "validate_not_blank")]
    pub category: Option<String>,
    pub status: Option<bool>,
    #[validate(custom = "validate_thumbnails")]
    pub thumbnails: Option<Vec<String>>,
}

impl ProductPatch {
    /// Applies the present fields onto `product`, leaving the rest untouched.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(code) = self.code {
            product.code = code;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(status) = self.status {
            product.status = status;
        }
        if let Some(thumbnails) = self.thumbnails {
            product.thumbnails = thumbnails;
        }
    }
}

fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price <= 0.0 {
        let mut err = ValidationError::new("price");
        err.message = Some("price must be a number greater than 0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_thumbnails(thumbnails: &[String]) -> Result<(), ValidationError> {
    if thumbnails.iter().any(|thumb| thumb.trim().is_empty()) {
        let mut err = ValidationError::new("thumbnails");
        err.message = Some("thumbnails must be non-blank image references".into());
        return Err(err);
    }
    Ok(())
}
