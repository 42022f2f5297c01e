//! String identifier <-> [`NodeKey`] mapping at the external boundary:
//! `"<product initial>_<task number>"`, QI tasks using `primary + 10000`.
//! The scheduling core never indexes by this string form; only the loader
//! and the reporting layer do.

use crate::model::{CoreInput, Id, NodeKey};

/// Builds and resolves boundary identifiers for one loaded input, using a
/// pair of lookups (product list plus `NodeKey`'s own product index) rather
/// than a single owned map for each direction.
#[derive(Debug, Default)]
pub struct Boundary {
    product_ids: Vec<Id>,
}

impl Boundary {
    pub fn from_input(input: &CoreInput) -> Self {
        Self {
            product_ids: input.products.iter().map(|p| p.product_id.clone()).collect(),
        }
    }

    /// Formats `key` as `"<product initial>_<task number>"`.
    pub fn format(&self, key: NodeKey) -> Id {
        let product = self
            .product_ids
            .get(key.product as usize)
            .map(String::as_str)
            .unwrap_or("?");
        format!("{product}_{}", key.task_num)
    }

    /// Parses a boundary identifier back to a [`NodeKey`], if the product
    /// initial is one of this input's known products.
    pub fn parse(&self, id: &str) -> Option<NodeKey> {
        let (product, task_num) = id.rsplit_once('_')?;
        let task_num: u32 = task_num.parse().ok()?;
        let product_index = self.product_ids.iter().position(|p| p == product)? as u32;
        Some(NodeKey::new(product_index, task_num))
    }

    pub fn product_ids(&self) -> &[Id] {
        &self.product_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn input_with_products(ids: &[&str]) -> CoreInput {
        let mut input = CoreInput::default();
        for id in ids {
            input.products.push(Product {
                product_id: (*id).to_string(),
                delivery_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
                incomplete_range: (1, 100),
                holidays: BTreeSet::new(),
            });
        }
        input
    }

    #[test]
    fn format_and_parse_round_trip() {
        let input = input_with_products(&["A", "B"]);
        let boundary = Boundary::from_input(&input);
        let key = NodeKey::new(1, 80);
        let id = boundary.format(key);
        assert_eq!(id, "B_80");
        assert_eq!(boundary.parse(&id), Some(key));
    }

    #[test]
    fn qi_offset_round_trips() {
        let input = input_with_products(&["A"]);
        let boundary = Boundary::from_input(&input);
        let qi = NodeKey::new(0, 80).qi_key();
        let id = boundary.format(qi);
        assert_eq!(id, "A_10080");
        assert_eq!(boundary.parse(&id), Some(qi));
    }
}
