use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `{productId, quantity}` pair within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// A shopping cart. Lines are unique by product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            lines: Vec::new(),
        }
    }

    pub fn line(&self, product_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn line_mut(&mut self, product_id: Uuid) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    /// Adds one unit of `product_id`, merging into an existing line.
    pub fn increment(&mut self, product_id: Uuid) {
        match self.line_mut(product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLine {
                product_id,
                quantity: 1,
            }),
        }
    }

    /// Removes the line for `product_id`, returning whether one existed.
    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    pub fn total_units(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_merges_lines() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.increment(product);
        cart.increment(product);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.line(product).map(|l| l.quantity), Some(2));
    }

    #[test]
    fn increment_saturates() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.lines.push(CartLine {
            product_id: product,
            quantity: u32::MAX,
        });
        cart.increment(product);
        assert_eq!(cart.line(product).map(|l| l.quantity), Some(u32::MAX));
    }

    #[test]
    fn lines_serialize_with_product_id_key() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.increment(product);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["lines"][0]["productId"], product.to_string());
        assert_eq!(json["lines"][0]["quantity"], 1);
    }
}
