// src/restaurant.rs

//! Builds the cast from a [`Config`], wires every agent to its collaborators
//! and runs them all in one [`Troupe`].

use std::fmt;
use std::sync::Arc;

use actor_scheduler::{AgentPhase, TimerService, Troupe};
use anyhow::Context;
use log::{info, warn};

use crate::agents::cook::FoodSnapshot;
use crate::agents::customer::CustomerState;
use crate::agents::{
    CashierAgent, CookAgent, Customer, CustomerAgent, HostAgent, MarketAgent, WaiterAgent,
};
use crate::config::Config;
use crate::presentation::{CustomerStage, Headless, KitchenStage};

/// A running restaurant.
///
/// Dropping it stops every agent and the timer thread without waiting; use
/// [`Restaurant::shutdown`] for an orderly close.
pub struct Restaurant {
    host: Arc<HostAgent>,
    cook: Arc<CookAgent>,
    cashier: Arc<CashierAgent>,
    markets: Vec<Arc<MarketAgent>>,
    waiters: Vec<Arc<WaiterAgent>>,
    customers: Vec<Arc<CustomerAgent>>,
    troupe: Troupe,
    timers: TimerService,
}

impl Restaurant {
    /// Open with no renderer attached.
    pub fn open_headless(config: &Config) -> anyhow::Result<Self> {
        let stage = Arc::new(Headless);
        Self::open(config, stage.clone(), stage)
    }

    pub fn open(
        config: &Config,
        customer_stage: Arc<dyn CustomerStage>,
        kitchen_stage: Arc<dyn KitchenStage>,
    ) -> anyhow::Result<Self> {
        let timers = TimerService::start().context("Failed to start timer thread")?;
        let timing = config.timing;

        // --- Cast ---
        let host = HostAgent::new(&config.host.name, config.host.tables);
        let cashier = CashierAgent::new(&config.cashier.name, config.cashier.cash, config.menu.clone());
        let cook = CookAgent::new(
            &config.kitchen.cook,
            &config.kitchen.foods,
            timing,
            timers.handle(),
            kitchen_stage,
        );
        cook.set_host(host.clone());

        let markets: Vec<_> = config
            .markets
            .iter()
            .map(|market_config| {
                let market = MarketAgent::new(market_config, timing, timers.handle());
                market.set_cook(cook.clone());
                market.set_cashier(cashier.clone());
                cook.add_market(market.clone());
                market
            })
            .collect();
        if markets.is_empty() {
            warn!("No markets configured; the pantry will never be restocked");
        }

        let waiters: Vec<_> = config
            .waiters
            .iter()
            .map(|name| {
                let waiter = WaiterAgent::new(name, config.menu.clone());
                waiter.set_host(host.clone());
                waiter.set_cook(cook.clone());
                waiter.set_cashier(cashier.clone());
                host.add_waiter(waiter.clone());
                waiter
            })
            .collect();

        let customers: Vec<_> = config
            .customers
            .iter()
            .zip(0u64..)
            .map(|(customer_config, n)| {
                let customer = CustomerAgent::new(
                    customer_config,
                    config.run.seed.wrapping_add(n),
                    timing,
                    timers.handle(),
                    customer_stage.clone(),
                );
                customer.set_host(host.clone());
                customer.set_cashier(cashier.clone());
                customer
            })
            .collect();

        // --- Threads ---
        let mut troupe = Troupe::new();
        troupe
            .spawn(host.clone())
            .context("Failed to spawn host")?;
        troupe
            .spawn(cashier.clone())
            .context("Failed to spawn cashier")?;
        troupe.spawn(cook.clone()).context("Failed to spawn cook")?;
        for market in &markets {
            troupe
                .spawn(market.clone())
                .with_context(|| format!("Failed to spawn market {}", market.name()))?;
        }
        for waiter in &waiters {
            troupe
                .spawn(waiter.clone())
                .with_context(|| format!("Failed to spawn waiter {}", waiter.name()))?;
        }
        for customer in &customers {
            troupe
                .spawn(customer.clone())
                .with_context(|| format!("Failed to spawn customer {}", customer.name()))?;
        }
        info!(
            "Restaurant open: {} tables, {} waiters, {} markets, {} customers",
            config.host.tables,
            waiters.len(),
            markets.len(),
            customers.len()
        );

        Ok(Restaurant {
            host,
            cook,
            cashier,
            markets,
            waiters,
            customers,
            troupe,
            timers,
        })
    }

    pub fn host(&self) -> &Arc<HostAgent> {
        &self.host
    }

    pub fn cook(&self) -> &Arc<CookAgent> {
        &self.cook
    }

    pub fn cashier(&self) -> &Arc<CashierAgent> {
        &self.cashier
    }

    pub fn markets(&self) -> &[Arc<MarketAgent>] {
        &self.markets
    }

    pub fn waiters(&self) -> &[Arc<WaiterAgent>] {
        &self.waiters
    }

    pub fn customers(&self) -> &[Arc<CustomerAgent>] {
        &self.customers
    }

    pub fn customer(&self, name: &str) -> Option<&Arc<CustomerAgent>> {
        self.customers.iter().find(|c| c.name() == name)
    }

    /// Returns `false` if nobody by that name is in the cast.
    pub fn make_hungry(&self, name: &str) -> bool {
        match self.customer(name) {
            Some(customer) => {
                customer.got_hungry();
                true
            }
            None => {
                warn!("No customer named {}", name);
                false
            }
        }
    }

    pub fn make_all_hungry(&self) {
        for customer in &self.customers {
            customer.got_hungry();
        }
    }

    pub fn pause(&self) {
        self.troupe.pause_all();
    }

    pub fn resume(&self) {
        self.troupe.resume_all();
    }

    /// No agent is scanning or has a ring pending. Timers may still be due.
    pub fn is_idle(&self) -> bool {
        self.troupe.is_idle()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            cashier_cash: self.cashier.cash(),
            outstanding_bills: self.cashier.outstanding_bills(),
            pantry: self.cook.inventory(),
            markets: self
                .markets
                .iter()
                .map(|m| (m.name().to_string(), m.cash()))
                .collect(),
            customers: self
                .customers
                .iter()
                .map(|c| CustomerSummary {
                    name: c.name().to_string(),
                    state: c.state(),
                    cash: c.cash(),
                    owes: c.charge(),
                })
                .collect(),
        }
    }

    /// Stop every agent and the timer thread. Reports how each agent ended.
    pub fn shutdown(self) -> Vec<(String, AgentPhase)> {
        let Restaurant { troupe, timers, .. } = self;
        let report = troupe.shutdown();
        timers.shutdown();
        info!("Restaurant closed");
        report
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSummary {
    pub name: String,
    pub state: CustomerState,
    pub cash: i32,
    pub owes: i32,
}

/// End-of-day figures.
#[derive(Debug, Clone)]
pub struct Summary {
    pub cashier_cash: i32,
    pub outstanding_bills: usize,
    pub pantry: Vec<FoodSnapshot>,
    pub markets: Vec<(String, i32)>,
    pub customers: Vec<CustomerSummary>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Cashier: ${} ({} bills outstanding)",
            self.cashier_cash, self.outstanding_bills
        )?;
        for food in &self.pantry {
            writeln!(f, "  {:<8} {:>2} {:?}", food.name, food.amount, food.state)?;
        }
        for (name, cash) in &self.markets {
            writeln!(f, "  {}: ${}", name, cash)?;
        }
        for c in &self.customers {
            writeln!(
                f,
                "  {:<15} {:?}, cash ${}, owes ${}",
                c.name, c.state, c.cash, c.owes
            )?;
        }
        Ok(())
    }
}
