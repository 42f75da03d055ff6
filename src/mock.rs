// src/mock.rs

//! Stand-ins for every participant, for exercising one real agent at a time.
//!
//! Each mock records the messages it receives, in order, in an [`EventLog`]
//! and otherwise does nothing, so a test can drive a real agent's scheduler
//! by hand and inspect exactly what it said to whom.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use actor_scheduler::AgentId;

use crate::agents::{
    describe_items, Cashier, Cook, Customer, Host, ItemOrder, Market, Participant, Waiter,
};
use crate::menu::Menu;

/// Append-only record of received messages.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, event: impl Into<String>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.into());
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any logged event contains `text`.
    pub fn contains(&self, text: &str) -> bool {
        self.events().iter().any(|event| event.contains(text))
    }

    pub fn last(&self) -> Option<String> {
        self.events().last().cloned()
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Display for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in self.events() {
            writeln!(f, "{}", event)?;
        }
        Ok(())
    }
}

macro_rules! participant {
    ($mock:ident) => {
        impl $mock {
            pub fn new(name: &str) -> Arc<Self> {
                Arc::new(Self {
                    name: name.to_string(),
                    ..Default::default()
                })
            }
        }

        impl Participant for $mock {
            fn id(&self) -> AgentId {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

#[derive(Debug, Default)]
pub struct MockCustomer {
    id: AgentId,
    name: String,
    pub log: EventLog,
    charge: AtomicI32,
}

participant!(MockCustomer);

impl MockCustomer {
    pub fn set_charge(&self, charge: i32) {
        self.charge.store(charge, Ordering::SeqCst);
    }
}

impl Customer for MockCustomer {
    fn charge(&self) -> i32 {
        self.charge.load(Ordering::SeqCst)
    }

    fn msg_restaurant_is_full(&self) {
        self.log.add("Received msgRestaurantIsFull");
    }

    fn msg_follow_me(&self, waiter: Arc<dyn Waiter>, menu: Menu, table: usize) {
        self.log.add(format!(
            "Received msgFollowMe from {}. Table = {}. Menu = {} items",
            waiter.name(),
            table,
            menu.items().len()
        ));
    }

    fn msg_what_would_you_like(&self) {
        self.log.add("Received msgWhatWouldYouLike");
    }

    fn msg_want_something_else(&self, menu: Menu) {
        let dishes: Vec<&str> = menu.items().iter().map(|i| i.name.as_str()).collect();
        self.log.add(format!(
            "Received msgWantSomethingElse. Menu = {}",
            dishes.join(", ")
        ));
    }

    fn msg_here_is_food(&self, choice: &str) {
        self.log.add(format!("Received msgHereIsFood. Choice = {}", choice));
    }

    fn msg_here_is_check(&self, charge: i32) {
        self.log.add(format!("Received msgHereIsCheck. Charge = ${}", charge));
    }

    fn msg_change(&self, change: i32) {
        self.log
            .add(format!("Received msgChange from cashier. Change = ${}", change));
        self.set_charge(if change < 0 { -change } else { 0 });
    }
}

#[derive(Debug, Default)]
pub struct MockWaiter {
    id: AgentId,
    name: String,
    pub log: EventLog,
}

participant!(MockWaiter);

impl Waiter for MockWaiter {
    fn msg_sit_at_table(&self, customer: Arc<dyn Customer>, table: usize) {
        self.log.add(format!(
            "Received msgSitAtTable. Customer = {}. Table = {}",
            customer.name(),
            table
        ));
    }

    fn msg_ready_to_order(&self, customer: &dyn Customer) {
        self.log
            .add(format!("Received msgReadyToOrder from {}", customer.name()));
    }

    fn msg_here_is_choice(&self, customer: &dyn Customer, choice: &str) {
        self.log.add(format!(
            "Received msgHereIsChoice from {}. Choice = {}",
            customer.name(),
            choice
        ));
    }

    fn msg_out_of_food(&self, choice: &str, table: usize) {
        self.log.add(format!(
            "Received msgOutOfFood from cook. Choice = {}. Table = {}",
            choice, table
        ));
    }

    fn msg_order_done(&self, choice: &str, table: usize) {
        self.log.add(format!(
            "Received msgOrderDone from cook. Choice = {}. Table = {}",
            choice, table
        ));
    }

    fn msg_done_eating(&self, customer: &dyn Customer) {
        self.log
            .add(format!("Received msgDoneEating from {}", customer.name()));
    }

    fn msg_here_is_check(&self, customer: &dyn Customer, charge: i32) {
        self.log.add(format!(
            "Received msgHereIsCheck from cashier. Customer = {}. Charge = ${}",
            customer.name(),
            charge
        ));
    }

    fn msg_i_want_to_leave(&self, customer: &dyn Customer) {
        self.log
            .add(format!("Received msgIWantToLeave from {}", customer.name()));
    }

    fn msg_food_restocked(&self, food: &str) {
        self.log.add(format!("Received msgFoodRestocked. Food = {}", food));
    }
}

#[derive(Debug, Default)]
pub struct MockCook {
    id: AgentId,
    name: String,
    pub log: EventLog,
}

participant!(MockCook);

impl Cook for MockCook {
    fn msg_here_is_order(&self, waiter: Arc<dyn Waiter>, choice: &str, table: usize) {
        self.log.add(format!(
            "Received msgHereIsOrder from {}. Choice = {}. Table = {}",
            waiter.name(),
            choice,
            table
        ));
    }

    fn msg_here_is_what_i_can_fulfill(&self, market: &dyn Market, items: &[ItemOrder]) {
        self.log.add(format!(
            "Received msgHereIsWhatICanFulfill from {}. Items = {}",
            market.name(),
            describe_items(items)
        ));
    }

    fn msg_order_delivered(&self, items: &[ItemOrder]) {
        self.log.add(format!(
            "Received msgOrderDelivered. Items = {}",
            describe_items(items)
        ));
    }
}

#[derive(Debug, Default)]
pub struct MockCashier {
    id: AgentId,
    name: String,
    pub log: EventLog,
}

participant!(MockCashier);

impl Cashier for MockCashier {
    fn msg_produce_check(&self, waiter: Arc<dyn Waiter>, customer: Arc<dyn Customer>, choice: &str) {
        self.log.add(format!(
            "Received msgProduceCheck from {}. Customer = {}. Choice = {}",
            waiter.name(),
            customer.name(),
            choice
        ));
    }

    fn msg_payment(&self, customer: &dyn Customer, amount: i32) {
        self.log.add(format!(
            "Received msgPayment from {}. Amount = ${}",
            customer.name(),
            amount
        ));
    }

    fn msg_here_is_bill(&self, amount: i32, market: Arc<dyn Market>) {
        self.log.add(format!(
            "Received msgHereIsBill from {}. Amount = ${}",
            market.name(),
            amount
        ));
    }
}

#[derive(Debug, Default)]
pub struct MockMarket {
    id: AgentId,
    name: String,
    pub log: EventLog,
}

participant!(MockMarket);

impl Market for MockMarket {
    fn msg_here_is_order(&self, items: Vec<ItemOrder>) {
        self.log.add(format!(
            "Received msgHereIsOrder. Items = {}",
            describe_items(&items)
        ));
    }

    fn msg_payment(&self, amount: i32) {
        self.log.add(format!("Received msgPayment. Amount = ${}", amount));
    }
}

#[derive(Debug, Default)]
pub struct MockHost {
    id: AgentId,
    name: String,
    pub log: EventLog,
}

participant!(MockHost);

impl Host for MockHost {
    fn msg_i_want_food(&self, customer: Arc<dyn Customer>) {
        self.log
            .add(format!("Received msgIWantFood from {}", customer.name()));
    }

    fn msg_im_leaving(&self, customer: &dyn Customer) {
        self.log
            .add(format!("Received msgImLeaving from {}", customer.name()));
    }

    fn msg_table_is_free(&self, table: usize, waiter: &dyn Waiter) {
        self.log.add(format!(
            "Received msgTableIsFree from {}. Table = {}",
            waiter.name(),
            table
        ));
    }

    fn msg_received_order(&self, food: &str) {
        self.log.add(format!("Received msgReceivedOrder. Food = {}", food));
    }
}
