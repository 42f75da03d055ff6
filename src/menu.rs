//! The menu: dish names and what the restaurant charges for them.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One priced dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: i32,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, price: i32) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// An ordered list of dishes. Menus handed to customers may be missing
/// dishes the kitchen has run out of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Default for Menu {
    fn default() -> Self {
        Menu::new(vec![
            MenuItem::new("steak", 16),
            MenuItem::new("chicken", 11),
            MenuItem::new("salad", 6),
            MenuItem::new("pizza", 9),
        ])
    }
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, dish: &str) -> bool {
        self.items.iter().any(|item| item.name == dish)
    }

    pub fn price(&self, dish: &str) -> Option<i32> {
        self.items
            .iter()
            .find(|item| item.name == dish)
            .map(|item| item.price)
    }

    /// `None` for an empty menu.
    pub fn lowest_price(&self) -> Option<i32> {
        self.items.iter().map(|item| item.price).min()
    }

    /// Whether `cash` covers at least one dish.
    pub fn affordable_with(&self, cash: i32) -> bool {
        self.lowest_price().is_some_and(|lowest| cash >= lowest)
    }

    /// A copy with every dish in `unavailable` removed.
    pub fn without<'a>(&self, unavailable: impl IntoIterator<Item = &'a String>) -> Menu {
        let unavailable: Vec<&String> = unavailable.into_iter().collect();
        Menu {
            items: self
                .items
                .iter()
                .filter(|item| !unavailable.contains(&&item.name))
                .cloned()
                .collect(),
        }
    }

    pub fn cheapest(&self) -> Option<&MenuItem> {
        self.items.iter().min_by_key(|item| item.price)
    }

    /// Any dish at all.
    pub fn random_item<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&MenuItem> {
        self.items.choose(rng)
    }

    /// A random dish costing at most `cash`, or the cheapest dish if none
    /// does.
    pub fn random_affordable<R: Rng + ?Sized>(&self, cash: i32, rng: &mut R) -> Option<&MenuItem> {
        let affordable: Vec<&MenuItem> =
            self.items.iter().filter(|item| item.price <= cash).collect();
        match affordable.choose(rng) {
            Some(item) => Some(*item),
            None => self.cheapest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_prices() {
        let menu = Menu::default();
        assert_eq!(menu.price("steak"), Some(16));
        assert_eq!(menu.price("chicken"), Some(11));
        assert_eq!(menu.price("salad"), Some(6));
        assert_eq!(menu.price("pizza"), Some(9));
        assert_eq!(menu.price("lobster"), None);
        assert_eq!(menu.lowest_price(), Some(6));
    }

    #[test]
    fn without_drops_unavailable_dishes() {
        let menu = Menu::default();
        let out = vec!["salad".to_string()];
        let reduced = menu.without(&out);
        assert!(!reduced.contains("salad"));
        assert_eq!(reduced.lowest_price(), Some(9));
        assert!(!reduced.affordable_with(7));
        assert!(menu.affordable_with(7));
    }

    #[test]
    fn random_affordable_stays_within_budget() {
        let menu = Menu::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let item = menu.random_affordable(10, &mut rng).unwrap();
            assert!(item.price <= 10, "{} costs {}", item.name, item.price);
        }
    }

    #[test]
    fn random_affordable_falls_back_to_cheapest() {
        let menu = Menu::default();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(menu.random_affordable(2, &mut rng).unwrap().name, "salad");
    }

    #[test]
    fn empty_menu_offers_nothing() {
        let menu = Menu::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(menu.lowest_price().is_none());
        assert!(!menu.affordable_with(1000));
        assert!(menu.random_affordable(1000, &mut rng).is_none());
    }
}
