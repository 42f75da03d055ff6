//! Waiter: carries every customer from table to cashier.

use std::sync::{Arc, Weak};

use actor_scheduler::{
    matched, Agent, AgentId, HandlerError, HandlerResult, Mailbox, Outbox, RuleTable,
};
use log::{info, warn};

use super::{upgrade, Cashier, Cook, Customer, Host, Link, Participant, Waiter};
use crate::menu::Menu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Waiting,
    Seated,
    ReadyToOrder,
    Asked,
    Ordered,
    OrderSent,
    OutOfChoice,
    FoodReady,
    Eating,
    DoneEating,
    CheckRequested,
    CheckReady,
    Leaving,
}

struct MyCustomer {
    customer: Arc<dyn Customer>,
    table: usize,
    choice: Option<String>,
    charge: i32,
    state: TableState,
}

impl MyCustomer {
    /// The dish this customer ordered. Acting on a record without one is a
    /// protocol violation.
    fn dish(&self) -> HandlerResult<String> {
        self.choice
            .clone()
            .ok_or_else(|| HandlerError::fatal(format!("{} has no order", self.customer.name())))
    }
}

pub struct Floor {
    customers: Vec<MyCustomer>,
    menu: Menu,
    /// Dishes the cook has run out of.
    unavailable: Vec<String>,
}

impl Floor {
    fn find(&mut self, id: AgentId) -> Option<&mut MyCustomer> {
        self.customers.iter_mut().find(|c| c.customer.id() == id)
    }

    fn at_table(&mut self, table: usize) -> Option<&mut MyCustomer> {
        self.customers.iter_mut().find(|c| c.table == table)
    }

    fn first_in(&self, state: TableState) -> Option<usize> {
        self.customers.iter().position(|c| c.state == state)
    }

    fn available_menu(&self) -> Menu {
        self.menu.without(&self.unavailable)
    }

    /// Apply `f` to the record for `id`. Unknown customers are logged and
    /// ignored.
    fn update(&mut self, id: AgentId, what: &str, f: impl FnOnce(&mut MyCustomer)) {
        match self.find(id) {
            Some(record) => f(record),
            None => warn!("{} from customer {} I am not serving", what, id),
        }
    }
}

/// A served customer as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingSnapshot {
    pub customer: String,
    pub table: usize,
    pub state: TableState,
}

pub enum WaiterEffect {
    FreeTable {
        table: usize,
    },
    Serve {
        customer: Arc<dyn Customer>,
        choice: String,
    },
    OfferMenu {
        customer: Arc<dyn Customer>,
        menu: Menu,
    },
    GiveCheck {
        customer: Arc<dyn Customer>,
        charge: i32,
    },
    RequestCheck {
        customer: Arc<dyn Customer>,
        choice: String,
    },
    SendOrder {
        choice: String,
        table: usize,
    },
    TakeOrder {
        customer: Arc<dyn Customer>,
    },
    Seat {
        customer: Arc<dyn Customer>,
        menu: Menu,
        table: usize,
    },
}

pub struct WaiterAgent {
    id: AgentId,
    name: String,
    me: Weak<WaiterAgent>,
    host: Link<dyn Host>,
    cook: Link<dyn Cook>,
    cashier: Link<dyn Cashier>,
    mailbox: Mailbox<Floor>,
    rules: RuleTable<Floor, WaiterEffect>,
}

impl WaiterAgent {
    pub fn new(name: &str, menu: Menu) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id: AgentId::next(),
            name: name.to_string(),
            me: me.clone(),
            host: Link::new("host"),
            cook: Link::new("cook"),
            cashier: Link::new("cashier"),
            mailbox: Mailbox::new(Floor {
                customers: Vec::new(),
                menu,
                unavailable: Vec::new(),
            }),
            rules: RuleTable::new()
                .rule("free table", leaving, free_table)
                .rule("serve food", food_ready, serve)
                .rule("offer another dish", out_of_choice, offer_menu)
                .rule("give check", check_ready, give_check)
                .rule("request check", done_eating, request_check)
                .rule("send order to cook", ordered, send_order)
                .rule("take order", ready_to_order, take_order)
                .rule("seat customer", waiting, seat_customer),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_host(&self, host: Arc<dyn Host>) -> bool {
        self.host.set(host)
    }

    pub fn set_cook(&self, cook: Arc<dyn Cook>) -> bool {
        self.cook.set(cook)
    }

    pub fn set_cashier(&self, cashier: Arc<dyn Cashier>) -> bool {
        self.cashier.set(cashier)
    }

    pub fn serving(&self) -> Vec<ServingSnapshot> {
        self.mailbox.read(|floor| {
            floor
                .customers
                .iter()
                .map(|c| ServingSnapshot {
                    customer: c.customer.name().to_string(),
                    table: c.table,
                    state: c.state,
                })
                .collect()
        })
    }

    pub fn unavailable(&self) -> Vec<String> {
        self.mailbox.read(|floor| floor.unavailable.clone())
    }

    fn me(&self) -> HandlerResult<Arc<dyn Waiter>> {
        let me: Arc<dyn Waiter> = upgrade(&self.me)?;
        Ok(me)
    }
}

impl Participant for WaiterAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Messages

impl Waiter for WaiterAgent {
    fn msg_sit_at_table(&self, customer: Arc<dyn Customer>, table: usize) {
        self.mailbox.deliver(|floor| {
            floor.customers.push(MyCustomer {
                customer,
                table,
                choice: None,
                charge: 0,
                state: TableState::Waiting,
            })
        });
    }

    fn msg_ready_to_order(&self, customer: &dyn Customer) {
        let id = customer.id();
        self.mailbox.deliver(|floor| {
            floor.update(id, "ready to order", |c| c.state = TableState::ReadyToOrder)
        });
    }

    fn msg_here_is_choice(&self, customer: &dyn Customer, choice: &str) {
        let id = customer.id();
        self.mailbox.deliver(|floor| {
            floor.update(id, "choice", |c| {
                c.choice = Some(choice.to_string());
                c.state = TableState::Ordered;
            })
        });
    }

    fn msg_out_of_food(&self, choice: &str, table: usize) {
        self.mailbox.deliver(|floor| {
            if !floor.unavailable.iter().any(|dish| dish == choice) {
                floor.unavailable.push(choice.to_string());
            }
            match floor.at_table(table) {
                Some(c) => c.state = TableState::OutOfChoice,
                None => warn!("out of {} for empty table {}", choice, table),
            }
        });
    }

    fn msg_order_done(&self, choice: &str, table: usize) {
        self.mailbox.deliver(|floor| match floor.at_table(table) {
            Some(c) => c.state = TableState::FoodReady,
            None => warn!("{} is ready for empty table {}", choice, table),
        });
    }

    fn msg_done_eating(&self, customer: &dyn Customer) {
        let id = customer.id();
        self.mailbox.deliver(|floor| {
            floor.update(id, "done eating", |c| c.state = TableState::DoneEating)
        });
    }

    fn msg_here_is_check(&self, customer: &dyn Customer, charge: i32) {
        let id = customer.id();
        self.mailbox.deliver(|floor| {
            floor.update(id, "check", |c| {
                c.charge = charge;
                c.state = TableState::CheckReady;
            })
        });
    }

    fn msg_i_want_to_leave(&self, customer: &dyn Customer) {
        let id = customer.id();
        self.mailbox.deliver(|floor| {
            floor.update(id, "leaving", |c| c.state = TableState::Leaving)
        });
    }

    fn msg_food_restocked(&self, food: &str) {
        self.mailbox
            .deliver(|floor| floor.unavailable.retain(|dish| dish != food));
    }
}

// Rules

fn leaving(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::Leaving)
}

fn free_table(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    matched(&mut floor.customers, i, "customer")?;
    let record = floor.customers.remove(i);
    out.push(WaiterEffect::FreeTable {
        table: record.table,
    });
    Ok(())
}

fn food_ready(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::FoodReady)
}

fn serve(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    let c = matched(&mut floor.customers, i, "customer")?;
    let choice = c.dish()?;
    c.state = TableState::Eating;
    out.push(WaiterEffect::Serve {
        customer: Arc::clone(&c.customer),
        choice,
    });
    Ok(())
}

fn out_of_choice(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::OutOfChoice)
}

fn offer_menu(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    let menu = floor.available_menu();
    let c = matched(&mut floor.customers, i, "customer")?;
    c.state = TableState::Asked;
    c.choice = None;
    out.push(WaiterEffect::OfferMenu {
        customer: Arc::clone(&c.customer),
        menu,
    });
    Ok(())
}

fn check_ready(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::CheckReady)
}

fn give_check(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    let c = matched(&mut floor.customers, i, "customer")?;
    c.state = TableState::Leaving;
    out.push(WaiterEffect::GiveCheck {
        customer: Arc::clone(&c.customer),
        charge: c.charge,
    });
    Ok(())
}

fn done_eating(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::DoneEating)
}

fn request_check(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    let c = matched(&mut floor.customers, i, "customer")?;
    let choice = c.dish()?;
    c.state = TableState::CheckRequested;
    out.push(WaiterEffect::RequestCheck {
        customer: Arc::clone(&c.customer),
        choice,
    });
    Ok(())
}

fn ordered(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::Ordered)
}

fn send_order(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    let c = matched(&mut floor.customers, i, "customer")?;
    let choice = c.dish()?;
    c.state = TableState::OrderSent;
    out.push(WaiterEffect::SendOrder {
        choice,
        table: c.table,
    });
    Ok(())
}

fn ready_to_order(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::ReadyToOrder)
}

fn take_order(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    let c = matched(&mut floor.customers, i, "customer")?;
    c.state = TableState::Asked;
    out.push(WaiterEffect::TakeOrder {
        customer: Arc::clone(&c.customer),
    });
    Ok(())
}

fn waiting(floor: &Floor) -> Option<usize> {
    floor.first_in(TableState::Waiting)
}

fn seat_customer(floor: &mut Floor, i: usize, out: &mut Outbox<WaiterEffect>) -> HandlerResult {
    let menu = floor.available_menu();
    let c = matched(&mut floor.customers, i, "customer")?;
    c.state = TableState::Seated;
    out.push(WaiterEffect::Seat {
        customer: Arc::clone(&c.customer),
        menu,
        table: c.table,
    });
    Ok(())
}

impl Agent for WaiterAgent {
    type State = Floor;
    type Effect = WaiterEffect;

    fn name(&self) -> &str {
        &self.name
    }

    fn mailbox(&self) -> &Mailbox<Floor> {
        &self.mailbox
    }

    fn rules(&self) -> &RuleTable<Floor, WaiterEffect> {
        &self.rules
    }

    fn perform(&self, effect: WaiterEffect) -> HandlerResult {
        match effect {
            WaiterEffect::FreeTable { table } => self.host.get()?.msg_table_is_free(table, self),
            WaiterEffect::Serve { customer, choice } => {
                info!("{}, here is your {}", customer.name(), choice);
                customer.msg_here_is_food(&choice);
            }
            WaiterEffect::OfferMenu { customer, menu } => {
                info!("{}, please choose something else", customer.name());
                customer.msg_want_something_else(menu);
            }
            WaiterEffect::GiveCheck { customer, charge } => customer.msg_here_is_check(charge),
            WaiterEffect::RequestCheck { customer, choice } => {
                self.cashier
                    .get()?
                    .msg_produce_check(self.me()?, customer, &choice);
            }
            WaiterEffect::SendOrder { choice, table } => {
                self.cook.get()?.msg_here_is_order(self.me()?, &choice, table);
            }
            WaiterEffect::TakeOrder { customer } => customer.msg_what_would_you_like(),
            WaiterEffect::Seat {
                customer,
                menu,
                table,
            } => {
                info!("{}, follow me to table {}", customer.name(), table);
                customer.msg_follow_me(self.me()?, menu, table);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCashier, MockCook, MockCustomer, MockHost};
    use test_log::test;

    struct Fixture {
        waiter: Arc<WaiterAgent>,
        host: Arc<MockHost>,
        cook: Arc<MockCook>,
        cashier: Arc<MockCashier>,
    }

    fn floor() -> Fixture {
        let waiter = WaiterAgent::new("waiter", Menu::default());
        let host = MockHost::new("host");
        let cook = MockCook::new("cook");
        let cashier = MockCashier::new("cashier");
        waiter.set_host(host.clone());
        waiter.set_cook(cook.clone());
        waiter.set_cashier(cashier.clone());
        Fixture {
            waiter,
            host,
            cook,
            cashier,
        }
    }

    fn step(waiter: &WaiterAgent) -> bool {
        waiter.pick_and_execute_an_action().unwrap()
    }

    #[test]
    fn serves_one_customer_start_to_finish() {
        let fx = floor();
        let customer = MockCustomer::new("mockcustomer");

        fx.waiter.msg_sit_at_table(customer.clone(), 1);
        assert!(step(&fx.waiter));
        assert!(customer
            .log
            .contains("Received msgFollowMe from waiter. Table = 1. Menu = 4 items"));

        fx.waiter.msg_ready_to_order(customer.as_ref());
        assert!(step(&fx.waiter));
        assert_eq!(customer.log.last().as_deref(), Some("Received msgWhatWouldYouLike"));

        fx.waiter.msg_here_is_choice(customer.as_ref(), "steak");
        assert!(step(&fx.waiter));
        assert!(fx
            .cook
            .log
            .contains("Received msgHereIsOrder from waiter. Choice = steak. Table = 1"));

        fx.waiter.msg_order_done("steak", 1);
        assert!(step(&fx.waiter));
        assert!(customer.log.contains("Received msgHereIsFood. Choice = steak"));

        fx.waiter.msg_done_eating(customer.as_ref());
        assert!(step(&fx.waiter));
        assert!(fx.cashier.log.contains(
            "Received msgProduceCheck from waiter. Customer = mockcustomer. Choice = steak"
        ));

        fx.waiter.msg_here_is_check(customer.as_ref(), 16);
        assert!(step(&fx.waiter));
        assert!(customer.log.contains("Received msgHereIsCheck. Charge = $16"));

        assert!(step(&fx.waiter));
        assert!(fx
            .host
            .log
            .contains("Received msgTableIsFree from waiter. Table = 1"));
        assert!(fx.waiter.serving().is_empty());
        assert!(!step(&fx.waiter));
    }

    #[test]
    fn out_of_food_offers_reduced_menu_until_restocked() {
        let fx = floor();
        let first = MockCustomer::new("first");
        fx.waiter.msg_sit_at_table(first.clone(), 1);
        step(&fx.waiter);
        fx.waiter.msg_here_is_choice(first.as_ref(), "steak");
        step(&fx.waiter);

        fx.waiter.msg_out_of_food("steak", 1);
        assert_eq!(fx.waiter.unavailable(), vec!["steak".to_string()]);
        assert!(step(&fx.waiter));
        assert_eq!(
            first.log.last().as_deref(),
            Some("Received msgWantSomethingElse. Menu = chicken, salad, pizza")
        );

        let second = MockCustomer::new("second");
        fx.waiter.msg_sit_at_table(second.clone(), 2);
        step(&fx.waiter);
        assert!(second.log.contains("Menu = 3 items"));

        fx.waiter.msg_food_restocked("steak");
        assert!(fx.waiter.unavailable().is_empty());
        let third = MockCustomer::new("third");
        fx.waiter.msg_sit_at_table(third.clone(), 3);
        step(&fx.waiter);
        assert!(third.log.contains("Menu = 4 items"));
    }

    #[test]
    fn customer_who_cannot_afford_frees_the_table() {
        let fx = floor();
        let poor = MockCustomer::new("poor");
        fx.waiter.msg_sit_at_table(poor.clone(), 3);
        step(&fx.waiter);

        fx.waiter.msg_i_want_to_leave(poor.as_ref());
        assert!(step(&fx.waiter));
        assert!(fx
            .host
            .log
            .contains("Received msgTableIsFree from waiter. Table = 3"));
        assert!(fx.cook.log.is_empty());
    }

    #[test]
    fn leaving_customer_outranks_new_arrival() {
        let fx = floor();
        let old = MockCustomer::new("old");
        let new = MockCustomer::new("new");
        fx.waiter.msg_sit_at_table(old.clone(), 1);
        step(&fx.waiter);

        fx.waiter.msg_sit_at_table(new.clone(), 2);
        fx.waiter.msg_i_want_to_leave(old.as_ref());
        assert!(step(&fx.waiter));
        assert!(fx.host.log.contains("Table = 1"));
        assert!(new.log.is_empty());

        assert!(step(&fx.waiter));
        assert!(new.log.contains("Table = 2"));
    }

    #[test]
    fn messages_about_strangers_are_ignored() {
        let fx = floor();
        let stranger = MockCustomer::new("stranger");
        fx.waiter.msg_done_eating(stranger.as_ref());
        assert!(!step(&fx.waiter));
        assert!(fx.cashier.log.is_empty());
    }

    #[test]
    fn acting_on_a_customer_without_an_order_is_fatal() {
        let fx = floor();
        let customer = MockCustomer::new("undecided");
        fx.waiter.msg_sit_at_table(customer.clone(), 1);
        assert!(step(&fx.waiter));

        fx.waiter.msg_done_eating(customer.as_ref());
        match fx.waiter.pick_and_execute_an_action() {
            Err(HandlerError::Fatal(msg)) => assert_eq!(msg, "undecided has no order"),
            other => panic!("expected fatal, got {:?}", other),
        }
        assert!(fx.cashier.log.is_empty(), "no check for an empty dish");

        fx.waiter.msg_order_done("steak", 1);
        assert!(matches!(
            fx.waiter.pick_and_execute_an_action(),
            Err(HandlerError::Fatal(_))
        ));
        assert_eq!(customer.log.len(), 1, "only the invitation to follow");
    }
}
