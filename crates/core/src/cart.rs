//! Products and the visitor's cart.
//!
//! A [`CartState`] is owned by one visitor session. It is persisted after
//! every mutation and rehydrated on the next request, so it is a plain
//! serde value with no caches: `count()` and `total()` are recomputed on
//! every call.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// A catalog product (read-only reference data for the storefront).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    pub stock: u32,
    /// Short alt-text style hint for the primary image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hint: Option<String>,
}

impl Product {
    /// First image, used for thumbnails.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// One product-and-quantity pairing.
///
/// The product is snapshotted when added so the order placed later reflects
/// what the visitor saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// `price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// The lines a visitor intends to buy.
///
/// Invariants:
/// - at most one line per product id
/// - every line has `quantity >= 1`
/// - lines keep insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    #[serde(default)]
    lines: Vec<CartLine>,
}

impl CartState {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` of `product`, merging into an existing line.
    ///
    /// Adding zero is a no-op.
    pub fn add(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.position(&product.id) {
            Some(idx) => {
                if let Some(line) = self.lines.get_mut(idx) {
                    line.quantity = line.quantity.saturating_add(quantity);
                }
            }
            None => self.lines.push(CartLine { product, quantity }),
        }
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Unknown product ids are ignored.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| &l.product.id == product_id) {
            line.quantity = quantity;
        }
    }

    /// Remove a line. Removing a missing line does nothing.
    pub fn remove(&mut self, product_id: &ProductId) {
        self.lines.retain(|l| &l.product.id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product.id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities (the cart badge number).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Sum of `price × quantity` across all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Drop lines that break the invariants.
    ///
    /// Used after rehydrating state that may have been written by an older
    /// build: zero-quantity lines are dropped and duplicates are merged.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut cart = Self::new();
        for line in self.lines {
            cart.add(line.product, line.quantity);
        }
        cart
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|l| &l.product.id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: &str, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: "A thing".to_string(),
            price: Price::from_cents(cents),
            images: vec![format!("https://img.example.com/{id}.png")],
            category: "Watches".to_string(),
            stock: 10,
            image_hint: None,
        }
    }

    fn expected_total(cart: &CartState) -> Price {
        cart.lines()
            .iter()
            .filter(|l| l.quantity > 0)
            .map(|l| l.product.price * l.quantity)
            .sum()
    }

    #[test]
    fn test_add_then_zero_empties_cart() {
        let a = product("prod_a", 45000);
        let mut cart = CartState::new();

        cart.add(a.clone(), 2);
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.total(), Price::from_cents(90000));

        cart.update_quantity(&a.id, 0);
        assert!(cart.is_empty());
        assert_eq!(cart.count(), 0);
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_add_merges_lines() {
        let a = product("prod_a", 100);
        let mut cart = CartState::new();
        cart.add(a.clone(), 1);
        cart.add(a.clone(), 3);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(&a.id).unwrap().quantity, 4);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = CartState::new();
        cart.add(product("prod_a", 100), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let mut cart = CartState::new();
        cart.add(product("prod_a", 100), 1);
        cart.update_quantity(&ProductId::new("missing"), 5);
        assert_eq!(cart.count(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let a = product("prod_a", 100);
        let b = product("prod_b", 250);
        let mut once = CartState::new();
        once.add(a.clone(), 1);
        once.add(b, 2);
        let mut twice = once.clone();

        once.remove(&a.id);
        twice.remove(&a.id);
        twice.remove(&a.id);

        assert_eq!(once, twice);
        assert_eq!(once.count(), 2);
    }

    #[test]
    fn test_total_matches_lines_over_mixed_sequence() {
        let a = product("prod_a", 45000);
        let b = product("prod_b", 79999);
        let c = product("prod_c", 15000);
        let mut cart = CartState::new();

        cart.add(a.clone(), 1);
        cart.add(b.clone(), 3);
        cart.update_quantity(&a.id, 4);
        cart.add(c.clone(), 2);
        cart.remove(&b.id);
        cart.update_quantity(&c.id, 0);
        cart.add(b.clone(), 1);

        assert!(cart.lines().iter().all(|l| l.quantity > 0));
        assert_eq!(cart.total(), expected_total(&cart));
        assert_eq!(cart.total(), Price::from_cents(4 * 45000 + 79999));
        assert_eq!(cart.count(), 5);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cart = CartState::new();
        cart.add(product("prod_b", 1), 1);
        cart.add(product("prod_a", 1), 1);
        cart.add(product("prod_b", 1), 1);
        let ids: Vec<&str> = cart.lines().iter().map(|l| l.product.id.as_str()).collect();
        assert_eq!(ids, ["prod_b", "prod_a"]);
    }

    #[test]
    fn test_serialized_state_reloads_identically() {
        let mut cart = CartState::new();
        cart.add(product("prod_a", 45000), 2);
        cart.add(product("prod_b", 21050), 1);

        let stored = serde_json::to_value(&cart).unwrap();
        let reloaded: CartState = serde_json::from_value(stored).unwrap();

        assert_eq!(reloaded, cart);
        assert_eq!(reloaded.total(), cart.total());
    }

    #[test]
    fn test_normalized_repairs_stale_state() {
        let a = product("prod_a", 100);
        let stale: CartState = serde_json::from_value(serde_json::json!({
            "lines": [
                { "product": a, "quantity": 1 },
                { "product": product("prod_b", 100), "quantity": 0 },
                { "product": a, "quantity": 2 },
            ]
        }))
        .unwrap();

        let cart = stale.normalized();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.count(), 3);
    }

    mod properties {
        use std::collections::HashSet;

        use proptest::prelude::*;

        use super::*;

        const CATALOG: [(&str, i64); 4] = [
            ("prod_001", 45000),
            ("prod_002", 12000),
            ("prod_003", 3550),
            ("prod_004", 79999),
        ];

        #[derive(Debug, Clone)]
        enum Op {
            Add(usize, u32),
            Update(usize, u32),
            Remove(usize),
            Clear,
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            let idx = 0..CATALOG.len();
            prop_oneof![
                4 => (idx.clone(), 0_u32..6).prop_map(|(i, q)| Op::Add(i, q)),
                3 => (idx.clone(), 0_u32..6).prop_map(|(i, q)| Op::Update(i, q)),
                2 => idx.prop_map(Op::Remove),
                1 => Just(Op::Clear),
            ]
        }

        fn apply(cart: &mut CartState, op: &Op) {
            let catalog_product = |i: usize| {
                let (id, cents) = CATALOG[i];
                product(id, cents)
            };
            match *op {
                Op::Add(i, q) => cart.add(catalog_product(i), q),
                Op::Update(i, q) => cart.update_quantity(&catalog_product(i).id, q),
                Op::Remove(i) => cart.remove(&catalog_product(i).id),
                Op::Clear => cart.clear(),
            }
        }

        proptest! {
            #[test]
            fn prop_cart_invariants_hold(ops in prop::collection::vec(arb_op(), 0..40)) {
                let mut cart = CartState::new();
                for op in &ops {
                    apply(&mut cart, op);

                    let expected: Price = cart
                        .lines()
                        .iter()
                        .map(|l| l.product.price * l.quantity)
                        .sum();
                    prop_assert_eq!(cart.total(), expected);
                    prop_assert!(cart.lines().iter().all(|l| l.quantity > 0));

                    let ids: HashSet<&str> =
                        cart.lines().iter().map(|l| l.product.id.as_str()).collect();
                    prop_assert_eq!(ids.len(), cart.lines().len());

                    let stored = serde_json::to_string(&cart).unwrap();
                    let reloaded: CartState = serde_json::from_str(&stored).unwrap();
                    prop_assert_eq!(&reloaded, &cart);
                }
            }
        }
    }
}
