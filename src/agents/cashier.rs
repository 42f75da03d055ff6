//! Cashier: writes checks, makes change and pays the markets' bills.
//!
//! Rules, highest priority first:
//!
//! 1. a `Created` check is handed to its waiter,
//! 2. a `Paid` check is settled and the customer gets their change,
//! 3. the oldest outstanding market bill is paid.

use std::sync::Arc;

use actor_scheduler::{matched, Agent, AgentId, HandlerResult, Mailbox, Outbox, RuleTable};
use log::{error, info};

use super::{Cashier, Customer, Market, Participant, Waiter};
use crate::menu::Menu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Created,
    GivenToWaiter,
    Paid,
    Done,
}

struct Check {
    customer: Arc<dyn Customer>,
    waiter: Arc<dyn Waiter>,
    choice: String,
    charge: i32,
    payment: i32,
    state: CheckState,
}

struct Bill {
    market: Arc<dyn Market>,
    amount: i32,
}

/// A check as seen from outside the cashier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSnapshot {
    pub customer: AgentId,
    pub waiter: AgentId,
    pub choice: String,
    pub charge: i32,
    pub payment: i32,
    pub state: CheckState,
}

pub struct Till {
    checks: Vec<Check>,
    bills: Vec<Bill>,
    cash: i32,
}

pub enum CashierEffect {
    HandOverCheck {
        waiter: Arc<dyn Waiter>,
        customer: Arc<dyn Customer>,
        charge: i32,
    },
    GiveChange {
        customer: Arc<dyn Customer>,
        change: i32,
    },
    PayBill {
        market: Arc<dyn Market>,
        amount: i32,
    },
}

/// `payment - charge`; negative means the customer still owes the difference.
pub fn change_due(payment: i32, charge: i32) -> i32 {
    payment - charge
}

pub struct CashierAgent {
    id: AgentId,
    name: String,
    prices: Menu,
    mailbox: Mailbox<Till>,
    rules: RuleTable<Till, CashierEffect>,
}

impl CashierAgent {
    pub fn new(name: &str, cash: i32, prices: Menu) -> Arc<Self> {
        Arc::new(Self {
            id: AgentId::next(),
            name: name.to_string(),
            prices,
            mailbox: Mailbox::new(Till {
                checks: Vec::new(),
                bills: Vec::new(),
                cash,
            }),
            rules: RuleTable::new()
                .rule("give check to waiter", created_check, give_to_waiter)
                .rule("give customer change", paid_check, give_change)
                .rule("pay market bill", oldest_bill, pay_bill),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cash(&self) -> i32 {
        self.mailbox.read(|till| till.cash)
    }

    pub fn outstanding_bills(&self) -> usize {
        self.mailbox.read(|till| till.bills.len())
    }

    pub fn checks(&self) -> Vec<CheckSnapshot> {
        self.mailbox.read(|till| {
            till.checks
                .iter()
                .map(|check| CheckSnapshot {
                    customer: check.customer.id(),
                    waiter: check.waiter.id(),
                    choice: check.choice.clone(),
                    charge: check.charge,
                    payment: check.payment,
                    state: check.state,
                })
                .collect()
        })
    }
}

impl Participant for CashierAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Messages

impl Cashier for CashierAgent {
    fn msg_produce_check(&self, waiter: Arc<dyn Waiter>, customer: Arc<dyn Customer>, choice: &str) {
        let Some(price) = self.prices.price(choice) else {
            error!(
                "{}: no price for '{}', no check written for {}",
                self.name,
                choice,
                customer.name()
            );
            return;
        };
        // Read before taking our own lock.
        let debt = customer.charge();

        self.mailbox.deliver(|till| {
            till.checks.push(Check {
                customer,
                waiter,
                choice: choice.to_string(),
                charge: price + debt,
                payment: 0,
                state: CheckState::Created,
            });
        });
    }

    fn msg_payment(&self, customer: &dyn Customer, amount: i32) {
        let id = customer.id();
        self.mailbox.deliver(|till| {
            for check in till
                .checks
                .iter_mut()
                .filter(|c| c.customer.id() == id && c.state == CheckState::GivenToWaiter)
            {
                check.payment = amount;
                check.state = CheckState::Paid;
            }
        });
    }

    fn msg_here_is_bill(&self, amount: i32, market: Arc<dyn Market>) {
        self.mailbox
            .deliver(|till| till.bills.push(Bill { market, amount }));
    }
}

// Rules

fn created_check(till: &Till) -> Option<usize> {
    till.checks
        .iter()
        .position(|c| c.state == CheckState::Created)
}

fn give_to_waiter(till: &mut Till, i: usize, out: &mut Outbox<CashierEffect>) -> HandlerResult {
    let check = matched(&mut till.checks, i, "check")?;
    info!(
        "{}, here is the check for {}",
        check.waiter.name(),
        check.customer.name()
    );
    check.state = CheckState::GivenToWaiter;
    out.push(CashierEffect::HandOverCheck {
        waiter: Arc::clone(&check.waiter),
        customer: Arc::clone(&check.customer),
        charge: check.charge,
    });
    Ok(())
}

fn paid_check(till: &Till) -> Option<usize> {
    till.checks.iter().position(|c| c.state == CheckState::Paid)
}

fn give_change(till: &mut Till, i: usize, out: &mut Outbox<CashierEffect>) -> HandlerResult {
    let check = matched(&mut till.checks, i, "check")?;
    let change = change_due(check.payment, check.charge);
    let received = if change >= 0 {
        info!(
            "{}, here is your change of ${}",
            check.customer.name(),
            change
        );
        check.charge
    } else {
        info!(
            "{}, thank you for eating at our restaurant. Please pay ${} next time.",
            check.customer.name(),
            -change
        );
        check.payment
    };
    check.state = CheckState::Done;
    let customer = Arc::clone(&check.customer);
    till.cash += received;
    out.push(CashierEffect::GiveChange { customer, change });
    Ok(())
}

fn oldest_bill(till: &Till) -> Option<usize> {
    (!till.bills.is_empty()).then_some(0)
}

fn pay_bill(till: &mut Till, i: usize, out: &mut Outbox<CashierEffect>) -> HandlerResult {
    matched(&mut till.bills, i, "bill")?;
    let bill = till.bills.remove(i);
    till.cash -= bill.amount;
    info!("Paying {} ${}. Cash = ${}", bill.market.name(), bill.amount, till.cash);
    out.push(CashierEffect::PayBill {
        market: bill.market,
        amount: bill.amount,
    });
    Ok(())
}

impl Agent for CashierAgent {
    type State = Till;
    type Effect = CashierEffect;

    fn name(&self) -> &str {
        &self.name
    }

    fn mailbox(&self) -> &Mailbox<Till> {
        &self.mailbox
    }

    fn rules(&self) -> &RuleTable<Till, CashierEffect> {
        &self.rules
    }

    fn perform(&self, effect: CashierEffect) -> HandlerResult {
        match effect {
            CashierEffect::HandOverCheck {
                waiter,
                customer,
                charge,
            } => waiter.msg_here_is_check(customer.as_ref(), charge),
            CashierEffect::GiveChange { customer, change } => customer.msg_change(change),
            CashierEffect::PayBill { market, amount } => market.msg_payment(amount),
        }
        Ok(())
    }
}
