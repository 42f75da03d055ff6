// src/config.rs

//! Defines the configuration structures for the restaurant simulation.
//!
//! Everything here can be deserialized from a JSON document. Missing fields
//! fall back to the classic defaults: four dishes, one cook with a small
//! pantry, three markets, a cashier with $200, two waiters and a handful of
//! customers with the well-known personas.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::menu::Menu;

/// Environment variable naming a config file when none is given on the
/// command line.
pub const CONFIG_ENV_VAR: &str = "RESTAURANT_CONFIG";

/// Process-wide configuration, loaded on first use.
///
/// Reads the file named by `RESTAURANT_CONFIG` if set, otherwise uses the
/// defaults. A file that cannot be read is reported and the defaults are
/// used; the binary loads explicitly and surfaces the error instead.
pub static CONFIG: Lazy<Config> = Lazy::new(|| match std::env::var(CONFIG_ENV_VAR) {
    Ok(path) => Config::load(&path).unwrap_or_else(|e| {
        warn!("Ignoring {}: {:#}", path, e);
        Config::default()
    }),
    Err(_) => Config::default(),
});

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dishes and the prices customers pay.
    pub menu: Menu,
    pub kitchen: KitchenConfig,
    pub markets: Vec<MarketConfig>,
    pub cashier: CashierConfig,
    pub host: HostConfig,
    pub waiters: Vec<String>,
    pub customers: Vec<CustomerConfig>,
    pub timing: TimingConfig,
    pub run: RunConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            menu: Menu::default(),
            kitchen: KitchenConfig::default(),
            markets: vec![
                MarketConfig::stocked("market1", [5, 5, 5, 5]),
                MarketConfig::stocked("market2", [2, 0, 3, 1]),
                MarketConfig::stocked("market3", [0, 2, 0, 4]),
            ],
            cashier: CashierConfig::default(),
            host: HostConfig::default(),
            waiters: vec!["alice".to_string(), "bob".to_string()],
            customers: ["steak", "chicken", "cheapskate", "poor", "enoughforsalad", "impatient", "carol"]
                .into_iter()
                .map(CustomerConfig::new)
                .collect(),
            timing: TimingConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

// --- Kitchen ---

/// The cook and the pantry they start with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KitchenConfig {
    pub cook: String,
    pub foods: Vec<FoodConfig>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        KitchenConfig {
            cook: "cook".to_string(),
            foods: vec![
                FoodConfig::new("steak", 15, 3, 1, 1),
                FoodConfig::new("chicken", 20, 3, 1, 1),
                FoodConfig::new("salad", 5, 3, 2, 1),
                FoodConfig::new("pizza", 10, 3, 3, 1),
            ],
        }
    }
}

/// One ingredient line in the cook's pantry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodConfig {
    pub name: String,
    /// In cooking units (see [`TimingConfig::cooking_unit_ms`]).
    pub cooking_time: u32,
    pub capacity: u32,
    pub amount: u32,
    /// At or below this the food is reordered.
    pub low: u32,
}

impl FoodConfig {
    pub fn new(name: &str, cooking_time: u32, capacity: u32, amount: u32, low: u32) -> Self {
        FoodConfig {
            name: name.to_string(),
            cooking_time,
            capacity,
            amount,
            low,
        }
    }
}

// --- Markets ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub name: String,
    pub cash: i32,
    pub stock: Vec<StockConfig>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig::stocked("market", [5, 5, 5, 5])
    }
}

impl MarketConfig {
    /// A market with the classic price list and the given steak, chicken,
    /// salad and pizza amounts.
    pub fn stocked(name: &str, amounts: [u32; 4]) -> Self {
        let [steak, chicken, salad, pizza] = amounts;
        MarketConfig {
            name: name.to_string(),
            cash: 1000,
            stock: vec![
                StockConfig::new("steak", steak, 10, 12),
                StockConfig::new("chicken", chicken, 10, 9),
                StockConfig::new("salad", salad, 10, 4),
                StockConfig::new("pizza", pizza, 10, 6),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConfig {
    pub food: String,
    pub amount: u32,
    /// In production units (see [`TimingConfig::production_unit_ms`]).
    pub time_to_produce: u32,
    /// What the market bills the cashier per unit.
    pub price: i32,
}

impl StockConfig {
    pub fn new(food: &str, amount: u32, time_to_produce: u32, price: i32) -> Self {
        StockConfig {
            food: food.to_string(),
            amount,
            time_to_produce,
            price,
        }
    }
}

// --- Front of house ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CashierConfig {
    pub name: String,
    pub cash: i32,
}

impl Default for CashierConfig {
    fn default() -> Self {
        CashierConfig {
            name: "cashier".to_string(),
            cash: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub name: String,
    pub tables: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            name: "host".to_string(),
            tables: 3,
        }
    }
}

/// A customer in the cast. The name selects the persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerConfig {
    pub name: String,
    #[serde(default = "default_hunger")]
    pub hunger: u32,
}

fn default_hunger() -> u32 {
    1
}

impl CustomerConfig {
    pub fn new(name: &str) -> Self {
        CustomerConfig {
            name: name.to_string(),
            hunger: default_hunger(),
        }
    }
}

// --- Timing ---

/// Wall-clock scaling for every simulated duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub cooking_unit_ms: u64,
    pub production_unit_ms: u64,
    /// Per hunger level, spent reading the menu.
    pub choose_unit_ms: u64,
    /// Per hunger level, spent eating.
    pub eat_unit_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            cooking_unit_ms: 1000,
            production_unit_ms: 400,
            choose_unit_ms: 500,
            eat_unit_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn cooking(&self, units: u32) -> Duration {
        Duration::from_millis(self.cooking_unit_ms * u64::from(units))
    }

    pub fn production(&self, units: u32) -> Duration {
        Duration::from_millis(self.production_unit_ms * u64::from(units))
    }

    pub fn choosing(&self, hunger: u32) -> Duration {
        Duration::from_millis(self.choose_unit_ms * u64::from(hunger))
    }

    pub fn eating(&self, hunger: u32) -> Duration {
        Duration::from_millis(self.eat_unit_ms * u64::from(hunger))
    }
}

// --- Run ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// How long the binary lets the simulation run before shutting down.
    pub duration_ms: u64,
    /// Seeds every customer's dish choice.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            duration_ms: 60_000,
            seed: 42,
        }
    }
}

impl RunConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}
