//! Market: fills the cook's orders from stock and bills the cashier.

use std::sync::{Arc, Weak};
use std::time::Duration;

use actor_scheduler::{matched, Agent, AgentId, HandlerResult, Mailbox, Outbox, RuleTable, Timers};
use log::{debug, info};

use super::{describe_items, upgrade, Cashier, Cook, ItemOrder, Link, Market, Participant};
use crate::config::{MarketConfig, StockConfig, TimingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketOrderState {
    Received,
    ProducingOrder,
    Ready,
    Finished,
}

struct Stock {
    food: String,
    amount: u32,
    time_to_produce: u32,
    price: i32,
}

impl From<&StockConfig> for Stock {
    fn from(config: &StockConfig) -> Self {
        Stock {
            food: config.food.clone(),
            amount: config.amount,
            time_to_produce: config.time_to_produce,
            price: config.price,
        }
    }
}

struct MarketOrder {
    id: u64,
    items: Vec<ItemOrder>,
    state: MarketOrderState,
}

pub struct Stall {
    stock: Vec<Stock>,
    orders: Vec<MarketOrder>,
    cash: i32,
    next_order_id: u64,
    timing: TimingConfig,
}

impl Stall {
    fn stock_mut(&mut self, food: &str) -> Option<&mut Stock> {
        self.stock.iter_mut().find(|s| s.food == food)
    }

    fn price_of(&self, items: &[ItemOrder]) -> i32 {
        items
            .iter()
            .filter_map(|item| {
                let stock = self.stock.iter().find(|s| s.food == item.food)?;
                Some(stock.price * item.amount as i32)
            })
            .sum()
    }
}

pub enum MarketEffect {
    /// Tell the cook what this order will contain.
    Confirm { items: Vec<ItemOrder> },
    StartProducing { order_id: u64, duration: Duration },
    Deliver { items: Vec<ItemOrder> },
    Bill { amount: i32 },
}

pub struct MarketAgent {
    id: AgentId,
    name: String,
    me: Weak<MarketAgent>,
    cook: Link<dyn Cook>,
    cashier: Link<dyn Cashier>,
    timers: Timers,
    mailbox: Mailbox<Stall>,
    rules: RuleTable<Stall, MarketEffect>,
}

impl MarketAgent {
    pub fn new(config: &MarketConfig, timing: TimingConfig, timers: Timers) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id: AgentId::next(),
            name: config.name.clone(),
            me: me.clone(),
            cook: Link::new("cook"),
            cashier: Link::new("cashier"),
            timers,
            mailbox: Mailbox::new(Stall {
                stock: config.stock.iter().map(Stock::from).collect(),
                orders: Vec::new(),
                cash: config.cash,
                next_order_id: 1,
                timing,
            }),
            rules: RuleTable::new()
                .rule("deliver ready order", ready_order, deliver)
                .rule("produce received order", received_order, produce),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_cook(&self, cook: Arc<dyn Cook>) -> bool {
        self.cook.set(cook)
    }

    pub fn set_cashier(&self, cashier: Arc<dyn Cashier>) -> bool {
        self.cashier.set(cashier)
    }

    pub fn cash(&self) -> i32 {
        self.mailbox.read(|stall| stall.cash)
    }

    pub fn stock_of(&self, food: &str) -> Option<u32> {
        self.mailbox
            .read(|stall| stall.stock.iter().find(|s| s.food == food).map(|s| s.amount))
    }

    pub fn order_states(&self) -> Vec<MarketOrderState> {
        self.mailbox
            .read(|stall| stall.orders.iter().map(|o| o.state).collect())
    }
}

impl Participant for MarketAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Messages

impl Market for MarketAgent {
    fn msg_here_is_order(&self, items: Vec<ItemOrder>) {
        self.mailbox.deliver(|stall| {
            let id = stall.next_order_id;
            stall.next_order_id += 1;
            stall.orders.push(MarketOrder {
                id,
                items,
                state: MarketOrderState::Received,
            });
        });
    }

    fn msg_payment(&self, amount: i32) {
        info!("{}: received payment of ${}", self.name, amount);
        self.mailbox.deliver(|stall| stall.cash += amount);
    }
}

// Rules

fn ready_order(stall: &Stall) -> Option<usize> {
    stall
        .orders
        .iter()
        .position(|o| o.state == MarketOrderState::Ready)
}

fn deliver(stall: &mut Stall, i: usize, out: &mut Outbox<MarketEffect>) -> HandlerResult {
    let items = matched(&mut stall.orders, i, "order")?.items.clone();
    let amount = stall.price_of(&items);
    stall.orders[i].state = MarketOrderState::Finished;
    info!("Here is your order: {}. Bill = ${}", describe_items(&items), amount);
    out.push(MarketEffect::Deliver { items });
    out.push(MarketEffect::Bill { amount });
    Ok(())
}

fn received_order(stall: &Stall) -> Option<usize> {
    stall
        .orders
        .iter()
        .position(|o| o.state == MarketOrderState::Received)
}

fn produce(stall: &mut Stall, i: usize, out: &mut Outbox<MarketEffect>) -> HandlerResult {
    let requested = std::mem::take(&mut matched(&mut stall.orders, i, "order")?.items);

    // Whole lines only; stock is taken as each line is accepted.
    let mut fulfillable = Vec::new();
    let mut units = 0;
    for item in requested {
        match stall.stock_mut(&item.food) {
            Some(stock) if stock.amount >= item.amount => {
                stock.amount -= item.amount;
                units += stock.time_to_produce * item.amount;
                fulfillable.push(item);
            }
            _ => debug!("cannot fulfill {}", item),
        }
    }

    let id = stall.orders[i].id;
    out.push(MarketEffect::Confirm {
        items: fulfillable.clone(),
    });
    if fulfillable.is_empty() {
        info!("I can't fulfill this order");
        stall.orders[i].state = MarketOrderState::Finished;
        return Ok(());
    }

    info!("Here is what I can fulfill: {}", describe_items(&fulfillable));
    stall.orders[i].items = fulfillable;
    stall.orders[i].state = MarketOrderState::ProducingOrder;
    out.push(MarketEffect::StartProducing {
        order_id: id,
        duration: stall.timing.production(units),
    });
    Ok(())
}

impl Agent for MarketAgent {
    type State = Stall;
    type Effect = MarketEffect;

    fn name(&self) -> &str {
        &self.name
    }

    fn mailbox(&self) -> &Mailbox<Stall> {
        &self.mailbox
    }

    fn rules(&self) -> &RuleTable<Stall, MarketEffect> {
        &self.rules
    }

    fn perform(&self, effect: MarketEffect) -> HandlerResult {
        match effect {
            MarketEffect::Confirm { items } => {
                self.cook.get()?.msg_here_is_what_i_can_fulfill(self, &items)
            }
            MarketEffect::StartProducing { order_id, duration } => {
                let mailbox = self.mailbox.clone();
                self.timers.after(duration, move || {
                    mailbox.deliver(|stall| {
                        if let Some(order) = stall.orders.iter_mut().find(|o| o.id == order_id) {
                            order.state = MarketOrderState::Ready;
                        }
                    });
                })?;
            }
            MarketEffect::Deliver { items } => self.cook.get()?.msg_order_delivered(&items),
            MarketEffect::Bill { amount } => {
                let me: Arc<dyn Market> = upgrade(&self.me)?;
                self.cashier.get()?.msg_here_is_bill(amount, me);
            }
        }
        Ok(())
    }
}
