//! Cook: cooks orders against a finite pantry and keeps it stocked from the
//! markets.

use std::sync::Arc;
use std::time::Duration;

use actor_scheduler::{
    matched, Agent, AgentId, HandlerError, HandlerResult, Mailbox, Outbox, RuleTable, Timers,
};
use log::{debug, info, warn};

use super::{describe_items, Cook, Host, ItemOrder, Link, Market, Participant, Waiter};
use crate::config::{FoodConfig, TimingConfig};
use crate::presentation::KitchenStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodState {
    Enough,
    MustBeOrdered,
    /// Requested from a market, no answer yet.
    Ordered,
    /// A market has promised to deliver.
    WaitingForOrder,
    ReceivedOrder,
    /// Every market failed to supply it.
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Pending,
    Cooking,
    Done,
    Finished,
}

struct Food {
    name: String,
    cooking_time: u32,
    capacity: u32,
    amount: u32,
    low: u32,
    state: FoodState,
    /// Market holding our outstanding request for this food.
    on_order_from: Option<AgentId>,
    failed_attempts: usize,
}

impl Food {
    fn is_low(&self) -> bool {
        self.amount <= self.low
    }

    fn shortfall(&self) -> u32 {
        self.capacity.saturating_sub(self.amount)
    }
}

impl From<&FoodConfig> for Food {
    fn from(config: &FoodConfig) -> Self {
        Food {
            name: config.name.clone(),
            cooking_time: config.cooking_time,
            capacity: config.capacity,
            amount: config.amount,
            low: config.low,
            state: FoodState::Enough,
            on_order_from: None,
            failed_attempts: 0,
        }
    }
}

struct Order {
    id: u64,
    waiter: Arc<dyn Waiter>,
    choice: String,
    table: usize,
    state: OrderState,
}

struct Supplier {
    market: Arc<dyn Market>,
    ordered_from: usize,
}

pub struct Kitchen {
    foods: Vec<Food>,
    orders: Vec<Order>,
    suppliers: Vec<Supplier>,
    initial_order_sent: bool,
    next_order_id: u64,
    timing: TimingConfig,
}

impl Kitchen {
    fn food_mut(&mut self, name: &str) -> Option<&mut Food> {
        self.foods.iter_mut().find(|f| f.name == name)
    }

    /// Market with the fewest orders from us so far; ties go to the first.
    fn least_used_supplier(&mut self) -> Option<&mut Supplier> {
        self.suppliers
            .iter_mut()
            .enumerate()
            .min_by_key(|(index, supplier)| (supplier.ordered_from, *index))
            .map(|(_, supplier)| supplier)
    }

    /// Mark every listed food `Ordered` and address the request.
    fn place_order(&mut self, items: Vec<ItemOrder>, out: &mut Outbox<CookEffect>) {
        if items.is_empty() {
            return;
        }
        let Some(supplier) = self.least_used_supplier() else {
            warn!("No market to order {} from", describe_items(&items));
            for item in &items {
                if let Some(food) = self.food_mut(&item.food) {
                    food.state = FoodState::GaveUp;
                    food.on_order_from = None;
                }
            }
            return;
        };
        supplier.ordered_from += 1;
        let market = Arc::clone(&supplier.market);
        let market_id = market.id();
        for item in &items {
            if let Some(food) = self.food_mut(&item.food) {
                food.state = FoodState::Ordered;
                food.on_order_from = Some(market_id);
            }
        }
        out.push(CookEffect::OrderFrom { market, items });
    }
}

/// Read-only view of one pantry line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodSnapshot {
    pub name: String,
    pub amount: u32,
    pub state: FoodState,
}

pub enum CookEffect {
    OrderFrom {
        market: Arc<dyn Market>,
        items: Vec<ItemOrder>,
    },
    TellHost {
        food: String,
    },
    StartCooking {
        order_id: u64,
        choice: String,
        duration: Duration,
    },
    Plate {
        waiter: Arc<dyn Waiter>,
        choice: String,
        table: usize,
    },
    OutOfFood {
        waiter: Arc<dyn Waiter>,
        choice: String,
        table: usize,
    },
}

pub struct CookAgent {
    id: AgentId,
    name: String,
    host: Link<dyn Host>,
    timers: Timers,
    stage: Arc<dyn KitchenStage>,
    mailbox: Mailbox<Kitchen>,
    rules: RuleTable<Kitchen, CookEffect>,
}

impl CookAgent {
    pub fn new(
        name: &str,
        foods: &[FoodConfig],
        timing: TimingConfig,
        timers: Timers,
        stage: Arc<dyn KitchenStage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: AgentId::next(),
            name: name.to_string(),
            host: Link::new("host"),
            timers,
            stage,
            mailbox: Mailbox::new(Kitchen {
                foods: foods.iter().map(Food::from).collect(),
                orders: Vec::new(),
                suppliers: Vec::new(),
                initial_order_sent: false,
                next_order_id: 1,
                timing,
            }),
            rules: RuleTable::new()
                .rule("stock the pantry", initial_order_due, send_initial_order)
                .rule("tell host about delivery", received_food, acknowledge_delivery)
                .rule("reorder low foods", food_to_order, reorder)
                .rule("plate finished order", done_order, plate)
                .rule("start cooking", pending_order, start_cooking),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_host(&self, host: Arc<dyn Host>) -> bool {
        self.host.set(host)
    }

    pub fn add_market(&self, market: Arc<dyn Market>) {
        self.mailbox.deliver(|kitchen| {
            kitchen.suppliers.push(Supplier {
                market,
                ordered_from: 0,
            })
        });
    }

    pub fn inventory(&self) -> Vec<FoodSnapshot> {
        self.mailbox.read(|kitchen| {
            kitchen
                .foods
                .iter()
                .map(|f| FoodSnapshot {
                    name: f.name.clone(),
                    amount: f.amount,
                    state: f.state,
                })
                .collect()
        })
    }

    pub fn food(&self, name: &str) -> Option<FoodSnapshot> {
        self.inventory().into_iter().find(|f| f.name == name)
    }

    /// Orders from waiters not yet handed back.
    pub fn open_orders(&self) -> usize {
        self.mailbox.read(|kitchen| {
            kitchen
                .orders
                .iter()
                .filter(|o| o.state != OrderState::Finished)
                .count()
        })
    }

    /// How many requests went to each market, in the order they were added.
    pub fn market_orders(&self) -> Vec<usize> {
        self.mailbox
            .read(|kitchen| kitchen.suppliers.iter().map(|s| s.ordered_from).collect())
    }
}

impl Participant for CookAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Messages

impl Cook for CookAgent {
    fn msg_here_is_order(&self, waiter: Arc<dyn Waiter>, choice: &str, table: usize) {
        self.mailbox.deliver(|kitchen| {
            kitchen.orders.retain(|o| o.state != OrderState::Finished);
            let id = kitchen.next_order_id;
            kitchen.next_order_id += 1;
            kitchen.orders.push(Order {
                id,
                waiter,
                choice: choice.to_string(),
                table,
                state: OrderState::Pending,
            });
        });
    }

    fn msg_here_is_what_i_can_fulfill(&self, market: &dyn Market, items: &[ItemOrder]) {
        let from = market.id();
        self.mailbox.deliver(|kitchen| {
            let markets = kitchen.suppliers.len();
            // Only the foods this market was asked for.
            for food in kitchen
                .foods
                .iter_mut()
                .filter(|f| f.state == FoodState::Ordered && f.on_order_from == Some(from))
            {
                if items.iter().any(|item| item.food == food.name) {
                    food.state = FoodState::WaitingForOrder;
                    continue;
                }
                food.failed_attempts += 1;
                food.on_order_from = None;
                food.state = if food.failed_attempts >= markets {
                    warn!("No market can supply {}. Giving up.", food.name);
                    FoodState::GaveUp
                } else {
                    FoodState::MustBeOrdered
                };
            }
        });
    }

    fn msg_order_delivered(&self, items: &[ItemOrder]) {
        self.mailbox.deliver(|kitchen| {
            for item in items {
                match kitchen.food_mut(&item.food) {
                    Some(food) => {
                        food.amount += item.amount;
                        food.state = FoodState::ReceivedOrder;
                        food.on_order_from = None;
                        food.failed_attempts = 0;
                    }
                    None => warn!("Delivery of unknown food {}", item.food),
                }
            }
        });
    }
}

// Rules

fn initial_order_due(kitchen: &Kitchen) -> Option<usize> {
    (!kitchen.initial_order_sent).then_some(0)
}

fn send_initial_order(kitchen: &mut Kitchen, _: usize, out: &mut Outbox<CookEffect>) -> HandlerResult {
    kitchen.initial_order_sent = true;
    let items: Vec<ItemOrder> = kitchen
        .foods
        .iter()
        .filter(|f| f.shortfall() > 0)
        .map(|f| ItemOrder::new(f.name.clone(), f.shortfall()))
        .collect();
    kitchen.place_order(items, out);
    Ok(())
}

fn received_food(kitchen: &Kitchen) -> Option<usize> {
    kitchen
        .foods
        .iter()
        .position(|f| f.state == FoodState::ReceivedOrder)
}

fn acknowledge_delivery(kitchen: &mut Kitchen, i: usize, out: &mut Outbox<CookEffect>) -> HandlerResult {
    let food = matched(&mut kitchen.foods, i, "food")?;
    food.state = FoodState::Enough;
    info!("Restocked {}. Amount = {}", food.name, food.amount);
    out.push(CookEffect::TellHost {
        food: food.name.clone(),
    });
    Ok(())
}

fn food_to_order(kitchen: &Kitchen) -> Option<usize> {
    kitchen
        .foods
        .iter()
        .position(|f| f.state == FoodState::MustBeOrdered)
}

fn reorder(kitchen: &mut Kitchen, _: usize, out: &mut Outbox<CookEffect>) -> HandlerResult {
    let mut items = Vec::new();
    for food in &mut kitchen.foods {
        let eligible = matches!(food.state, FoodState::MustBeOrdered | FoodState::Enough);
        if eligible && food.is_low() && food.shortfall() > 0 {
            items.push(ItemOrder::new(food.name.clone(), food.shortfall()));
        } else if food.state == FoodState::MustBeOrdered {
            food.state = FoodState::Enough;
        }
    }
    kitchen.place_order(items, out);
    Ok(())
}

fn done_order(kitchen: &Kitchen) -> Option<usize> {
    kitchen
        .orders
        .iter()
        .position(|o| o.state == OrderState::Done)
}

fn plate(kitchen: &mut Kitchen, i: usize, out: &mut Outbox<CookEffect>) -> HandlerResult {
    let order = matched(&mut kitchen.orders, i, "order")?;
    order.state = OrderState::Finished;
    out.push(CookEffect::Plate {
        waiter: Arc::clone(&order.waiter),
        choice: order.choice.clone(),
        table: order.table,
    });
    Ok(())
}

fn pending_order(kitchen: &Kitchen) -> Option<usize> {
    kitchen
        .orders
        .iter()
        .position(|o| o.state == OrderState::Pending)
}

fn start_cooking(kitchen: &mut Kitchen, i: usize, out: &mut Outbox<CookEffect>) -> HandlerResult {
    let timing = kitchen.timing;
    let order = matched(&mut kitchen.orders, i, "order")?;
    let (id, choice, table, waiter) = (
        order.id,
        order.choice.clone(),
        order.table,
        Arc::clone(&order.waiter),
    );

    let food = kitchen
        .foods
        .iter_mut()
        .find(|f| f.name == choice)
        .ok_or_else(|| HandlerError::fatal(format!("kitchen has no recipe for '{}'", choice)))?;

    if food.amount == 0 {
        info!("Out of {}. Telling {}.", choice, waiter.name());
        kitchen.orders[i].state = OrderState::Finished;
        out.push(CookEffect::OutOfFood {
            waiter,
            choice,
            table,
        });
        return Ok(());
    }

    food.amount -= 1;
    if food.is_low() && food.state == FoodState::Enough {
        food.state = FoodState::MustBeOrdered;
    }
    let duration = timing.cooking(food.cooking_time);
    kitchen.orders[i].state = OrderState::Cooking;
    out.push(CookEffect::StartCooking {
        order_id: id,
        choice,
        duration,
    });
    Ok(())
}

impl Agent for CookAgent {
    type State = Kitchen;
    type Effect = CookEffect;

    fn name(&self) -> &str {
        &self.name
    }

    fn mailbox(&self) -> &Mailbox<Kitchen> {
        &self.mailbox
    }

    fn rules(&self) -> &RuleTable<Kitchen, CookEffect> {
        &self.rules
    }

    fn perform(&self, effect: CookEffect) -> HandlerResult {
        match effect {
            CookEffect::OrderFrom { market, items } => {
                info!("Ordering {} from {}", describe_items(&items), market.name());
                market.msg_here_is_order(items);
            }
            CookEffect::TellHost { food } => self.host.get()?.msg_received_order(&food),
            CookEffect::StartCooking {
                order_id,
                choice,
                duration,
            } => {
                self.stage.cooking(&choice);
                let mailbox = self.mailbox.clone();
                self.timers.after(duration, move || {
                    mailbox.deliver(|kitchen| {
                        match kitchen.orders.iter_mut().find(|o| o.id == order_id) {
                            Some(order) => order.state = OrderState::Done,
                            None => debug!("cooked order {} no longer exists", order_id),
                        }
                    });
                })?;
            }
            CookEffect::Plate {
                waiter,
                choice,
                table,
            } => {
                self.stage.plating(&choice);
                waiter.msg_order_done(&choice, table);
            }
            CookEffect::OutOfFood {
                waiter,
                choice,
                table,
            } => waiter.msg_out_of_food(&choice, table),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockHost, MockMarket, MockWaiter};
    use crate::presentation::Headless;
    use actor_scheduler::TimerService;
    use std::thread;
    use std::time::Instant;
    use test_log::test;

    fn fast() -> TimingConfig {
        TimingConfig {
            cooking_unit_ms: 1,
            ..TimingConfig::default()
        }
    }

    fn eventually(what: &str, mut check: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(2));
        }
    }

    struct Fixture {
        cook: Arc<CookAgent>,
        host: Arc<MockHost>,
        markets: Vec<Arc<MockMarket>>,
        _timers: TimerService,
    }

    /// A cook whose first activation has already been spent.
    fn kitchen(foods: &[FoodConfig], markets: usize) -> Fixture {
        let timers = TimerService::start().unwrap();
        let cook = CookAgent::new("cook", foods, fast(), timers.handle(), Arc::new(Headless));
        let host = MockHost::new("host");
        cook.set_host(host.clone());
        let markets: Vec<_> = (1..=markets)
            .map(|n| MockMarket::new(&format!("market{}", n)))
            .collect();
        for market in &markets {
            cook.add_market(market.clone());
        }
        Fixture {
            cook,
            host,
            markets,
            _timers: timers,
        }
    }

    fn drain(cook: &CookAgent) {
        while cook.pick_and_execute_an_action().unwrap() {}
    }

    #[test]
    fn first_activation_orders_everything_below_capacity_once() {
        let fx = kitchen(&crate::config::KitchenConfig::default().foods, 2);

        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert_eq!(fx.markets[0].log.len(), 1);
        assert!(fx.markets[0]
            .log
            .contains("Received msgHereIsOrder. Items = 2 steak, 2 chicken, 1 salad"));
        assert!(fx.markets[1].log.is_empty());
        assert_eq!(fx.cook.market_orders(), vec![1, 0]);
        assert_eq!(fx.cook.food("pizza").unwrap().state, FoodState::Enough);
        assert_eq!(fx.cook.food("steak").unwrap().state, FoodState::Ordered);

        assert!(!fx.cook.pick_and_execute_an_action().unwrap());
        assert_eq!(fx.markets[0].log.len(), 1);
    }

    #[test]
    fn cooks_order_and_notifies_waiter_when_done() {
        let fx = kitchen(&[FoodConfig::new("steak", 3, 5, 5, 1)], 1);
        let waiter = MockWaiter::new("waiter");
        drain(&fx.cook);

        fx.cook.msg_here_is_order(waiter.clone(), "steak", 2);
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert_eq!(fx.cook.food("steak").unwrap().amount, 4);
        assert!(waiter.log.is_empty(), "still cooking");

        eventually("cooking timer", || {
            fx.cook.pick_and_execute_an_action().unwrap();
            !waiter.log.is_empty()
        });
        assert_eq!(
            waiter.log.events(),
            vec!["Received msgOrderDone from cook. Choice = steak. Table = 2"]
        );
        assert_eq!(fx.cook.open_orders(), 0);
    }

    #[test]
    fn empty_pantry_tells_waiter_out_of_food() {
        let fx = kitchen(&[FoodConfig::new("steak", 3, 0, 0, 0)], 1);
        let waiter = MockWaiter::new("waiter");
        drain(&fx.cook);

        fx.cook.msg_here_is_order(waiter.clone(), "steak", 1);
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert!(waiter
            .log
            .contains("Received msgOutOfFood from cook. Choice = steak. Table = 1"));
        assert_eq!(fx.cook.food("steak").unwrap().amount, 0);
        assert_eq!(fx.cook.open_orders(), 0);
    }

    #[test]
    fn cooking_to_low_water_mark_triggers_reorder_at_next_market() {
        let fx = kitchen(
            &[
                FoodConfig::new("steak", 1, 3, 2, 1),
                FoodConfig::new("salad", 1, 3, 1, 1),
                // Slow enough that nothing is plated mid-test.
                FoodConfig::new("pizza", 10_000, 3, 3, 1),
            ],
            2,
        );
        // Initial order: steak 1, salad 2 to market1.
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        fx.cook.msg_here_is_what_i_can_fulfill(fx.markets[0].as_ref(), &[
            ItemOrder::new("steak", 1),
            ItemOrder::new("salad", 2),
        ]);
        fx.cook
            .msg_order_delivered(&[ItemOrder::new("steak", 1), ItemOrder::new("salad", 2)]);
        drain(&fx.cook);
        assert_eq!(fx.host.log.len(), 2);
        assert!(fx.host.log.contains("Received msgReceivedOrder. Food = steak"));

        let waiter = MockWaiter::new("waiter");
        fx.cook.msg_here_is_order(waiter.clone(), "pizza", 1);
        fx.cook.msg_here_is_order(waiter.clone(), "pizza", 2);
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert_eq!(fx.cook.food("pizza").unwrap().amount, 1);
        assert_eq!(
            fx.cook.food("pizza").unwrap().state,
            FoodState::MustBeOrdered
        );

        // Reorder goes to the less used market2.
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert!(fx.markets[1]
            .log
            .contains("Received msgHereIsOrder. Items = 2 pizza"));
        assert_eq!(fx.cook.market_orders(), vec![1, 1]);
        assert_eq!(fx.cook.food("pizza").unwrap().state, FoodState::Ordered);
    }

    #[test]
    fn unfulfilled_food_is_reordered_then_abandoned() {
        let fx = kitchen(&[FoodConfig::new("steak", 1, 3, 0, 1)], 2);
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert!(fx.markets[0].log.contains("3 steak"));

        fx.cook
            .msg_here_is_what_i_can_fulfill(fx.markets[0].as_ref(), &[]);
        assert_eq!(
            fx.cook.food("steak").unwrap().state,
            FoodState::MustBeOrdered
        );
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert!(fx.markets[1].log.contains("3 steak"));

        fx.cook
            .msg_here_is_what_i_can_fulfill(fx.markets[1].as_ref(), &[]);
        assert_eq!(fx.cook.food("steak").unwrap().state, FoodState::GaveUp);
        assert!(!fx.cook.pick_and_execute_an_action().unwrap());
    }

    #[test]
    fn market_reply_only_touches_foods_ordered_from_that_market() {
        let fx = kitchen(
            &[
                FoodConfig::new("steak", 1, 3, 1, 1),
                FoodConfig::new("pizza", 10_000, 3, 3, 1),
            ],
            2,
        );
        // Initial order: 2 steak to market1.
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert!(fx.markets[0].log.contains("Items = 2 steak"));

        // Two pizzas reach the low-water mark, so pizza goes to market2.
        let waiter = MockWaiter::new("waiter");
        fx.cook.msg_here_is_order(waiter.clone(), "pizza", 1);
        fx.cook.msg_here_is_order(waiter.clone(), "pizza", 2);
        drain(&fx.cook);
        assert!(fx.markets[1].log.contains("Items = 2 pizza"));
        assert_eq!(fx.cook.food("pizza").unwrap().state, FoodState::Ordered);

        // market1 answers for steak only; pizza is still on order at market2.
        fx.cook
            .msg_here_is_what_i_can_fulfill(fx.markets[0].as_ref(), &[ItemOrder::new("steak", 2)]);
        assert_eq!(
            fx.cook.food("steak").unwrap().state,
            FoodState::WaitingForOrder
        );
        assert_eq!(fx.cook.food("pizza").unwrap().state, FoodState::Ordered);
        assert!(!fx.cook.pick_and_execute_an_action().unwrap());
        assert_eq!(fx.markets[0].log.len(), 1, "pizza is not ordered twice");

        // market2 fails pizza; the retry goes back to market1.
        fx.cook
            .msg_here_is_what_i_can_fulfill(fx.markets[1].as_ref(), &[]);
        assert_eq!(
            fx.cook.food("steak").unwrap().state,
            FoodState::WaitingForOrder
        );
        assert_eq!(
            fx.cook.food("pizza").unwrap().state,
            FoodState::MustBeOrdered
        );
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert_eq!(
            fx.markets[0].log.last().as_deref(),
            Some("Received msgHereIsOrder. Items = 2 pizza")
        );
    }

    #[test]
    fn reply_from_one_market_does_not_abandon_food_ordered_elsewhere() {
        let fx = kitchen(&[FoodConfig::new("steak", 1, 3, 0, 1)], 1);
        let stranger = MockMarket::new("stranger");
        assert!(fx.cook.pick_and_execute_an_action().unwrap());

        fx.cook
            .msg_here_is_what_i_can_fulfill(stranger.as_ref(), &[]);
        assert_eq!(fx.cook.food("steak").unwrap().state, FoodState::Ordered);
    }

    #[test]
    fn partial_fulfillment_waits_for_delivery() {
        let fx = kitchen(
            &[
                FoodConfig::new("steak", 1, 3, 0, 1),
                FoodConfig::new("salad", 1, 3, 0, 1),
            ],
            1,
        );
        drain(&fx.cook);
        fx.cook
            .msg_here_is_what_i_can_fulfill(fx.markets[0].as_ref(), &[ItemOrder::new("salad", 3)]);
        assert_eq!(
            fx.cook.food("salad").unwrap().state,
            FoodState::WaitingForOrder
        );
        // Only market, so steak is given up straight away.
        assert_eq!(fx.cook.food("steak").unwrap().state, FoodState::GaveUp);

        fx.cook.msg_order_delivered(&[ItemOrder::new("salad", 3)]);
        assert_eq!(fx.cook.food("salad").unwrap().amount, 3);
        assert!(fx.cook.pick_and_execute_an_action().unwrap());
        assert_eq!(fx.cook.food("salad").unwrap().state, FoodState::Enough);
        assert!(fx.host.log.contains("Food = salad"));
    }

    #[test]
    fn unknown_dish_is_fatal() {
        let fx = kitchen(&[FoodConfig::new("steak", 1, 3, 3, 1)], 1);
        drain(&fx.cook);
        fx.cook
            .msg_here_is_order(MockWaiter::new("waiter"), "lobster", 1);
        match fx.cook.pick_and_execute_an_action() {
            Err(HandlerError::Fatal(msg)) => assert!(msg.contains("lobster")),
            other => panic!("expected fatal, got {:?}", other),
        }
    }
}
