//! Customer: a finite state machine driven by one latest event.
//!
//! The customer keeps a single `event` slot. Messages, timers and
//! presentation cues overwrite it and ring; the one rule consumes it through
//! [`transition`] and performs the resulting [`Step`].

use std::fmt;
use std::sync::{Arc, Weak};

use actor_scheduler::{
    Agent, AgentId, HandlerError, HandlerResult, Mailbox, Outbox, Rendezvous, RuleTable, Timers,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{upgrade, Cashier, Customer, Host, Link, Participant, Waiter};
use crate::config::{CustomerConfig, TimingConfig};
use crate::menu::Menu;
use crate::presentation::{Animation, Cue, CueSink, CustomerStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerState {
    DoingNothing,
    GoingToRestaurant,
    WaitingInRestaurant,
    BeingSeated,
    Seated,
    WantToLeave,
    ReadyToOrder,
    Ordered,
    Eating,
    WaitingForCheck,
    Paying,
    Leaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerEvent {
    Hunger,
    Arrival,
    Impatience,
    FollowWaiter,
    Seated,
    PriceTooHigh,
    ToldWaiter,
    MadeChoice,
    OrderRequested,
    FoodReceived,
    DoneEating,
    CheckReceived,
    ChangeReceived,
    DoneLeaving,
}

/// What the customer does on entering a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    WalkToRestaurant,
    AskForTable,
    WalkToTable,
    LeaveAndTellHost,
    TellWaiterTooExpensive,
    WalkOut,
    StartChoosing,
    CallWaiter,
    GiveOrder,
    StartEating,
    AskForCheck,
    PayAtCashier,
    Nothing,
}

/// The customer's whole protocol. `None` means the event is ignored in
/// this state.
pub fn transition(state: CustomerState, event: CustomerEvent) -> Option<(CustomerState, Step)> {
    use CustomerEvent as E;
    use CustomerState as S;

    let next = match (state, event) {
        (S::DoingNothing, E::Hunger) => (S::GoingToRestaurant, Step::WalkToRestaurant),
        (S::GoingToRestaurant, E::Arrival) => (S::WaitingInRestaurant, Step::AskForTable),
        (S::WaitingInRestaurant, E::FollowWaiter) => (S::BeingSeated, Step::WalkToTable),
        (S::WaitingInRestaurant, E::Impatience) => (S::Leaving, Step::LeaveAndTellHost),
        (S::BeingSeated, E::PriceTooHigh) => (S::WantToLeave, Step::TellWaiterTooExpensive),
        (S::WantToLeave, E::ToldWaiter) => (S::Leaving, Step::WalkOut),
        (S::BeingSeated, E::Seated) => (S::Seated, Step::StartChoosing),
        (S::Seated, E::MadeChoice) => (S::ReadyToOrder, Step::CallWaiter),
        (S::ReadyToOrder, E::OrderRequested) => (S::Ordered, Step::GiveOrder),
        (S::Ordered, E::FoodReceived) => (S::Eating, Step::StartEating),
        (S::Eating, E::DoneEating) => (S::WaitingForCheck, Step::AskForCheck),
        (S::WaitingForCheck, E::CheckReceived) => (S::Paying, Step::PayAtCashier),
        (S::Paying, E::ChangeReceived) => (S::Leaving, Step::WalkOut),
        (S::Leaving, E::DoneLeaving) => (S::DoingNothing, Step::Nothing),
        _ => return None,
    };
    Some(next)
}

/// Behaviour selected by the customer's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Regular,
    /// Orders whatever they like and never checks prices.
    Cheapskate,
    Poor,
    EnoughForSalad,
    /// Leaves when told the restaurant is full.
    Impatient,
}

impl Persona {
    pub fn from_name(name: &str) -> Self {
        match name {
            "cheapskate" => Persona::Cheapskate,
            "poor" => Persona::Poor,
            "enoughforsalad" => Persona::EnoughForSalad,
            "impatient" => Persona::Impatient,
            _ => Persona::Regular,
        }
    }

    pub fn starting_cash(self) -> i32 {
        match self {
            Persona::Cheapskate | Persona::Poor => 5,
            Persona::EnoughForSalad => 7,
            Persona::Regular | Persona::Impatient => 30,
        }
    }

    pub fn never_refuses(self) -> bool {
        self == Persona::Cheapskate
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Charge rounded up to the next ten, but never more than is on hand.
pub fn payment_for(charge: i32, cash: i32) -> i32 {
    (charge + 10 - charge % 10).min(cash)
}

pub struct Diner {
    state: CustomerState,
    event: Option<CustomerEvent>,
    cash: i32,
    charge: i32,
    menu: Option<Menu>,
    choice: Option<String>,
    table: usize,
    waiter: Option<Arc<dyn Waiter>>,
    rng: StdRng,
    name: String,
    persona: Persona,
    hunger: u32,
    timing: TimingConfig,
}

impl Diner {
    fn waiter(&self) -> HandlerResult<Arc<dyn Waiter>> {
        self.waiter
            .clone()
            .ok_or_else(|| HandlerError::fatal(format!("{} has no waiter", self.name)))
    }

    fn can_afford(&self, menu: &Menu) -> bool {
        self.persona.never_refuses() || menu.affordable_with(self.cash)
    }

    fn choose_dish(&mut self) -> Option<String> {
        let menu = self.menu.as_ref()?;
        if menu.contains(&self.name) {
            return Some(self.name.clone());
        }
        let item = if self.persona.never_refuses() {
            menu.random_item(&mut self.rng)
        } else {
            menu.random_affordable(self.cash, &mut self.rng)
        };
        item.map(|item| item.name.clone())
    }
}

pub enum CustomerEffect {
    Animate(Animation),
    AskForTable,
    LeaveAndTellHost,
    TellWaiterTooExpensive(Arc<dyn Waiter>),
    StartTimer {
        event: CustomerEvent,
        duration: std::time::Duration,
    },
    CallWaiter(Arc<dyn Waiter>),
    GiveOrder {
        waiter: Arc<dyn Waiter>,
        choice: String,
    },
    AskForCheck(Arc<dyn Waiter>),
    Pay,
}

pub struct CustomerAgent {
    id: AgentId,
    name: String,
    persona: Persona,
    me: Weak<CustomerAgent>,
    host: Link<dyn Host>,
    cashier: Link<dyn Cashier>,
    stage: Arc<dyn CustomerStage>,
    timers: Timers,
    done_ordering: Rendezvous,
    at_cashier: Rendezvous,
    mailbox: Mailbox<Diner>,
    rules: RuleTable<Diner, CustomerEffect>,
}

impl CustomerAgent {
    pub fn new(
        config: &CustomerConfig,
        seed: u64,
        timing: TimingConfig,
        timers: Timers,
        stage: Arc<dyn CustomerStage>,
    ) -> Arc<Self> {
        let persona = Persona::from_name(&config.name);
        Arc::new_cyclic(|me| Self {
            id: AgentId::next(),
            name: config.name.clone(),
            persona,
            me: me.clone(),
            host: Link::new("host"),
            cashier: Link::new("cashier"),
            stage,
            timers,
            done_ordering: Rendezvous::new("done ordering"),
            at_cashier: Rendezvous::new("at cashier"),
            mailbox: Mailbox::new(Diner {
                state: CustomerState::DoingNothing,
                event: None,
                cash: persona.starting_cash(),
                charge: 0,
                menu: None,
                choice: None,
                table: 0,
                waiter: None,
                rng: StdRng::seed_from_u64(seed),
                name: config.name.clone(),
                persona,
                hunger: config.hunger,
                timing,
            }),
            rules: RuleTable::new().rule("advance", pending_transition, advance),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn set_host(&self, host: Arc<dyn Host>) -> bool {
        self.host.set(host)
    }

    pub fn set_cashier(&self, cashier: Arc<dyn Cashier>) -> bool {
        self.cashier.set(cashier)
    }

    pub fn got_hungry(&self) {
        info!("{}: I'm hungry", self.name);
        self.mailbox.deliver(|d| d.event = Some(CustomerEvent::Hunger));
    }

    pub fn state(&self) -> CustomerState {
        self.mailbox.read(|d| d.state)
    }

    pub fn cash(&self) -> i32 {
        self.mailbox.read(|d| d.cash)
    }

    pub fn choice(&self) -> Option<String> {
        self.mailbox.read(|d| d.choice.clone())
    }

    fn as_sink(&self) -> HandlerResult<Arc<dyn CueSink>> {
        let me: Arc<dyn CueSink> = upgrade(&self.me)?;
        Ok(me)
    }

    fn animate(&self, animation: Animation) -> HandlerResult {
        self.stage.animate(self.as_sink()?, animation);
        Ok(())
    }

    fn deliver_event(&self, event: CustomerEvent) {
        self.mailbox.deliver(|d| d.event = Some(event));
    }
}

impl Participant for CustomerAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Messages

impl Customer for CustomerAgent {
    fn charge(&self) -> i32 {
        self.mailbox.read(|d| d.charge)
    }

    fn msg_restaurant_is_full(&self) {
        if self.persona == Persona::Impatient {
            self.deliver_event(CustomerEvent::Impatience);
        } else {
            info!("{}: I'll wait for a table to open", self.name);
            self.mailbox.ring();
        }
    }

    fn msg_follow_me(&self, waiter: Arc<dyn Waiter>, menu: Menu, table: usize) {
        self.mailbox.deliver(|d| {
            d.waiter = Some(waiter);
            d.menu = Some(menu);
            d.table = table;
            d.event = Some(CustomerEvent::FollowWaiter);
        });
    }

    fn msg_what_would_you_like(&self) {
        self.deliver_event(CustomerEvent::OrderRequested);
    }

    fn msg_want_something_else(&self, menu: Menu) {
        self.mailbox.deliver(|d| {
            if d.can_afford(&menu) {
                d.state = CustomerState::ReadyToOrder;
                d.event = Some(CustomerEvent::OrderRequested);
            } else {
                d.state = CustomerState::BeingSeated;
                d.event = Some(CustomerEvent::PriceTooHigh);
            }
            d.menu = Some(menu);
        });
    }

    fn msg_here_is_food(&self, choice: &str) {
        self.mailbox.deliver(|d| {
            if d.choice.as_deref() == Some(choice) {
                d.event = Some(CustomerEvent::FoodReceived);
            } else {
                warn!("{}: served {} but ordered {:?}", d.name, choice, d.choice);
            }
        });
    }

    fn msg_here_is_check(&self, charge: i32) {
        self.mailbox.deliver(|d| {
            d.charge = charge;
            d.event = Some(CustomerEvent::CheckReceived);
        });
    }

    fn msg_change(&self, change: i32) {
        self.mailbox.deliver(|d| {
            if change < 0 {
                d.charge = -change;
                // Goes home for more money.
                d.cash += 30;
            } else {
                d.cash += change;
                d.charge = 0;
            }
            d.event = Some(CustomerEvent::ChangeReceived);
        });
    }
}

impl CueSink for CustomerAgent {
    fn cue(&self, cue: Cue) {
        match cue {
            Cue::Arrived => self.deliver_event(CustomerEvent::Arrival),
            Cue::Seated => self.mailbox.deliver(|d| {
                let affordable = d.menu.as_ref().is_some_and(|menu| d.can_afford(menu));
                d.event = Some(if affordable {
                    CustomerEvent::Seated
                } else {
                    CustomerEvent::PriceTooHigh
                });
            }),
            Cue::DoneOrdering => {
                self.done_ordering.release();
                self.mailbox.ring();
            }
            Cue::AtCashier => {
                self.at_cashier.release();
                self.mailbox.ring();
            }
            Cue::DoneLeaving => self.deliver_event(CustomerEvent::DoneLeaving),
        }
    }
}

// Rules

fn pending_transition(d: &Diner) -> Option<usize> {
    d.event.and_then(|event| transition(d.state, event)).map(|_| 0)
}

fn advance(d: &mut Diner, _: usize, out: &mut Outbox<CustomerEffect>) -> HandlerResult {
    let Some(event) = d.event.take() else {
        return Err(HandlerError::transient("event consumed mid-scan"));
    };
    let Some((next, step)) = transition(d.state, event) else {
        return Err(HandlerError::transient("event no longer applies"));
    };
    debug!("{}: {:?} --{:?}--> {:?}", d.name, d.state, event, next);
    d.state = next;

    match step {
        Step::WalkToRestaurant => out.push(CustomerEffect::Animate(Animation::EnterRestaurant)),
        Step::AskForTable => out.push(CustomerEffect::AskForTable),
        Step::WalkToTable => {
            info!("{}: being seated. Going to table {}", d.name, d.table);
            out.push(CustomerEffect::Animate(Animation::GoToSeat { table: d.table }));
        }
        Step::LeaveAndTellHost => out.push(CustomerEffect::LeaveAndTellHost),
        Step::TellWaiterTooExpensive => {
            out.push(CustomerEffect::TellWaiterTooExpensive(d.waiter()?))
        }
        Step::WalkOut => {
            info!("{}: leaving restaurant", d.name);
            out.push(CustomerEffect::Animate(Animation::ExitRestaurant));
        }
        Step::StartChoosing => out.push(CustomerEffect::StartTimer {
            event: CustomerEvent::MadeChoice,
            duration: d.timing.choosing(d.hunger),
        }),
        Step::CallWaiter => out.push(CustomerEffect::CallWaiter(d.waiter()?)),
        Step::GiveOrder => match d.choose_dish() {
            Some(choice) => {
                info!("{}: I would like to order {}", d.name, choice);
                d.choice = Some(choice.clone());
                out.push(CustomerEffect::GiveOrder {
                    waiter: d.waiter()?,
                    choice,
                });
            }
            None => {
                d.state = CustomerState::BeingSeated;
                d.event = Some(CustomerEvent::PriceTooHigh);
            }
        },
        Step::StartEating => out.push(CustomerEffect::StartTimer {
            event: CustomerEvent::DoneEating,
            duration: d.timing.eating(d.hunger),
        }),
        Step::AskForCheck => out.push(CustomerEffect::AskForCheck(d.waiter()?)),
        Step::PayAtCashier => out.push(CustomerEffect::Pay),
        Step::Nothing => {}
    }
    Ok(())
}

impl Agent for CustomerAgent {
    type State = Diner;
    type Effect = CustomerEffect;

    fn name(&self) -> &str {
        &self.name
    }

    fn mailbox(&self) -> &Mailbox<Diner> {
        &self.mailbox
    }

    fn rules(&self) -> &RuleTable<Diner, CustomerEffect> {
        &self.rules
    }

    fn perform(&self, effect: CustomerEffect) -> HandlerResult {
        match effect {
            CustomerEffect::Animate(animation) => self.animate(animation)?,
            CustomerEffect::AskForTable => {
                info!("{}: table for 1", self.name);
                let me: Arc<dyn Customer> = upgrade(&self.me)?;
                self.host.get()?.msg_i_want_food(me);
            }
            CustomerEffect::LeaveAndTellHost => {
                info!("{}: I don't want to wait. Leaving restaurant", self.name);
                self.animate(Animation::ExitRestaurant)?;
                self.host.get()?.msg_im_leaving(self);
            }
            CustomerEffect::TellWaiterTooExpensive(waiter) => {
                info!("{}: this food is too expensive. I'm leaving.", self.name);
                waiter.msg_i_want_to_leave(self);
                self.deliver_event(CustomerEvent::ToldWaiter);
            }
            CustomerEffect::StartTimer { event, duration } => {
                let mailbox = self.mailbox.clone();
                self.timers
                    .after(duration, move || mailbox.deliver(|d| d.event = Some(event)))?;
            }
            CustomerEffect::CallWaiter(waiter) => {
                info!("{}: I'm ready to order", self.name);
                waiter.msg_ready_to_order(self);
            }
            CustomerEffect::GiveOrder { waiter, choice } => {
                self.animate(Animation::Order)?;
                self.done_ordering.acquire(self.mailbox.doorbell())?;
                waiter.msg_here_is_choice(self, &choice);
            }
            CustomerEffect::AskForCheck(waiter) => {
                info!("{}: check please", self.name);
                waiter.msg_done_eating(self);
            }
            CustomerEffect::Pay => {
                self.animate(Animation::GoToCashier)?;
                self.at_cashier.acquire(self.mailbox.doorbell())?;
                let payment = self.mailbox.scan(|d| {
                    let payment = payment_for(d.charge, d.cash);
                    d.cash -= payment;
                    payment
                });
                info!("{}: paying ${}", self.name, payment);
                self.cashier.get()?.msg_payment(self, payment);
            }
        }
        Ok(())
    }
}
