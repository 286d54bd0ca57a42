//! Data records owned by the catalog, cart and identity services.

pub mod cart;
pub mod page;
pub mod product;
pub mod user;

pub use cart::{Cart, CartLine};
pub use page::{Page, PageRequest};
pub use product::{NewProduct, Product, ProductPatch};
pub use user::{Credentials, Registration, Role, User, UserProfile};

use validator::ValidationError;

/// Rejects empty or whitespace-only text.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}
