//! The restaurant's cast and the messages they accept.
//!
//! Every participant is addressed through one of the traits below, so a real
//! agent and a mock from [`crate::mock`] are interchangeable. Message methods
//! never block: a real agent records the fact in its mailbox and returns.

pub mod cashier;
pub mod cook;
pub mod customer;
pub mod host;
pub mod market;
pub mod waiter;

use std::fmt;
use std::sync::{Arc, Weak};

use actor_scheduler::{AgentId, HandlerError, HandlerResult};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::menu::Menu;

pub use cashier::CashierAgent;
pub use cook::CookAgent;
pub use customer::CustomerAgent;
pub use host::HostAgent;
pub use market::MarketAgent;
pub use waiter::WaiterAgent;

/// Identity shared by every participant.
pub trait Participant: Send + Sync {
    fn id(&self) -> AgentId;
    fn name(&self) -> &str;
}

pub trait Customer: Participant {
    /// Debt carried over from an underpaid check.
    fn charge(&self) -> i32;
    fn msg_restaurant_is_full(&self);
    fn msg_follow_me(&self, waiter: Arc<dyn Waiter>, menu: Menu, table: usize);
    fn msg_what_would_you_like(&self);
    fn msg_want_something_else(&self, menu: Menu);
    fn msg_here_is_food(&self, choice: &str);
    fn msg_here_is_check(&self, charge: i32);
    /// Negative change is debt for next time.
    fn msg_change(&self, change: i32);
}

pub trait Waiter: Participant {
    fn msg_sit_at_table(&self, customer: Arc<dyn Customer>, table: usize);
    fn msg_ready_to_order(&self, customer: &dyn Customer);
    fn msg_here_is_choice(&self, customer: &dyn Customer, choice: &str);
    fn msg_out_of_food(&self, choice: &str, table: usize);
    fn msg_order_done(&self, choice: &str, table: usize);
    fn msg_done_eating(&self, customer: &dyn Customer);
    fn msg_here_is_check(&self, customer: &dyn Customer, charge: i32);
    fn msg_i_want_to_leave(&self, customer: &dyn Customer);
    fn msg_food_restocked(&self, food: &str);
}

pub trait Cook: Participant {
    fn msg_here_is_order(&self, waiter: Arc<dyn Waiter>, choice: &str, table: usize);
    /// `market`'s answer to the request it holds from this cook.
    fn msg_here_is_what_i_can_fulfill(&self, market: &dyn Market, items: &[ItemOrder]);
    fn msg_order_delivered(&self, items: &[ItemOrder]);
}

pub trait Cashier: Participant {
    fn msg_produce_check(&self, waiter: Arc<dyn Waiter>, customer: Arc<dyn Customer>, choice: &str);
    fn msg_payment(&self, customer: &dyn Customer, amount: i32);
    fn msg_here_is_bill(&self, amount: i32, market: Arc<dyn Market>);
}

pub trait Market: Participant {
    fn msg_here_is_order(&self, items: Vec<ItemOrder>);
    fn msg_payment(&self, amount: i32);
}

pub trait Host: Participant {
    fn msg_i_want_food(&self, customer: Arc<dyn Customer>);
    fn msg_im_leaving(&self, customer: &dyn Customer);
    fn msg_table_is_free(&self, table: usize, waiter: &dyn Waiter);
    /// The cook has restocked `food`.
    fn msg_received_order(&self, food: &str);
}

/// One line of a cook's order to a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOrder {
    pub food: String,
    pub amount: u32,
}

impl ItemOrder {
    pub fn new(food: impl Into<String>, amount: u32) -> Self {
        Self {
            food: food.into(),
            amount,
        }
    }
}

impl fmt::Display for ItemOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.food)
    }
}

/// "2 steak, 1 salad"
pub fn describe_items(items: &[ItemOrder]) -> String {
    items
        .iter()
        .map(ItemOrder::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A collaborator wired in after construction.
///
/// Agents refer to each other cyclically, so links are set once the whole
/// cast exists. Using a link that was never set is a wiring bug.
pub struct Link<T: ?Sized> {
    role: &'static str,
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Link<T> {
    pub fn new(role: &'static str) -> Self {
        Self {
            role,
            cell: OnceCell::new(),
        }
    }

    /// Returns `false` if the link was already set.
    pub fn set(&self, target: Arc<T>) -> bool {
        self.cell.set(target).is_ok()
    }

    pub fn get(&self) -> HandlerResult<&Arc<T>> {
        self.cell
            .get()
            .ok_or_else(|| HandlerError::fatal(format!("no {} wired", self.role)))
    }
}

/// Upgrade an agent's handle on itself. Fails only during teardown.
pub(crate) fn upgrade<T>(me: &Weak<T>) -> HandlerResult<Arc<T>> {
    me.upgrade().ok_or(HandlerError::Stopped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwired_link_is_fatal() {
        let link: Link<dyn Host> = Link::new("host");
        match link.get() {
            Err(HandlerError::Fatal(msg)) => assert_eq!(msg, "no host wired"),
            other => panic!("expected fatal, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn item_lists_read_naturally() {
        let items = vec![ItemOrder::new("steak", 2), ItemOrder::new("salad", 1)];
        assert_eq!(describe_items(&items), "2 steak, 1 salad");
        assert_eq!(describe_items(&[]), "");
    }
}
