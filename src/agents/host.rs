//! Host: seats arriving customers and spreads them across the waiters.

use std::sync::Arc;

use actor_scheduler::{matched, Agent, AgentId, HandlerError, HandlerResult, Mailbox, Outbox, RuleTable};
use log::{info, warn};

use super::{Customer, Host, Participant, Waiter};

struct Guest {
    customer: Arc<dyn Customer>,
    told_full: bool,
}

struct Staff {
    waiter: Arc<dyn Waiter>,
    /// Customers currently assigned.
    load: usize,
}

pub struct Lobby {
    /// Occupant of each table. Table numbers start at 1.
    tables: Vec<Option<AgentId>>,
    waiting: Vec<Guest>,
    staff: Vec<Staff>,
    restocked: Vec<String>,
}

impl Lobby {
    fn free_table(&self) -> Option<usize> {
        self.tables.iter().position(Option::is_none)
    }

    fn least_loaded(&mut self) -> Option<&mut Staff> {
        self.staff
            .iter_mut()
            .enumerate()
            .min_by_key(|(index, staff)| (staff.load, *index))
            .map(|(_, staff)| staff)
    }
}

pub enum HostEffect {
    Seat {
        waiter: Arc<dyn Waiter>,
        customer: Arc<dyn Customer>,
        table: usize,
    },
    TellFull {
        customer: Arc<dyn Customer>,
    },
    Restocked {
        food: String,
        waiters: Vec<Arc<dyn Waiter>>,
    },
}

pub struct HostAgent {
    id: AgentId,
    name: String,
    mailbox: Mailbox<Lobby>,
    rules: RuleTable<Lobby, HostEffect>,
}

impl HostAgent {
    pub fn new(name: &str, tables: usize) -> Arc<Self> {
        Arc::new(Self {
            id: AgentId::next(),
            name: name.to_string(),
            mailbox: Mailbox::new(Lobby {
                tables: vec![None; tables],
                waiting: Vec::new(),
                staff: Vec::new(),
                restocked: Vec::new(),
            }),
            rules: RuleTable::new()
                .rule("seat customer", seatable_guest, seat)
                .rule("tell customer we are full", unwarned_guest, tell_full)
                .rule("pass on restock", restocked_food, pass_on_restock),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_waiter(&self, waiter: Arc<dyn Waiter>) {
        self.mailbox
            .deliver(|lobby| lobby.staff.push(Staff { waiter, load: 0 }));
    }

    pub fn free_tables(&self) -> usize {
        self.mailbox
            .read(|lobby| lobby.tables.iter().filter(|t| t.is_none()).count())
    }

    pub fn waiting(&self) -> usize {
        self.mailbox.read(|lobby| lobby.waiting.len())
    }

    /// Assigned customers per waiter, in the order waiters were added.
    pub fn waiter_loads(&self) -> Vec<usize> {
        self.mailbox
            .read(|lobby| lobby.staff.iter().map(|s| s.load).collect())
    }
}

impl Participant for HostAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// Messages

impl Host for HostAgent {
    fn msg_i_want_food(&self, customer: Arc<dyn Customer>) {
        self.mailbox.deliver(|lobby| {
            lobby.waiting.push(Guest {
                customer,
                told_full: false,
            })
        });
    }

    fn msg_im_leaving(&self, customer: &dyn Customer) {
        let id = customer.id();
        self.mailbox
            .deliver(|lobby| lobby.waiting.retain(|g| g.customer.id() != id));
    }

    fn msg_table_is_free(&self, table: usize, waiter: &dyn Waiter) {
        let id = waiter.id();
        self.mailbox.deliver(|lobby| {
            match table.checked_sub(1).and_then(|i| lobby.tables.get_mut(i)) {
                Some(slot) => *slot = None,
                None => warn!("{} freed unknown table {}", waiter.name(), table),
            }
            if let Some(staff) = lobby.staff.iter_mut().find(|s| s.waiter.id() == id) {
                staff.load = staff.load.saturating_sub(1);
            }
        });
    }

    fn msg_received_order(&self, food: &str) {
        self.mailbox
            .deliver(|lobby| lobby.restocked.push(food.to_string()));
    }
}

// Rules

fn seatable_guest(lobby: &Lobby) -> Option<usize> {
    let can_seat = lobby.free_table().is_some() && !lobby.staff.is_empty();
    (can_seat && !lobby.waiting.is_empty()).then_some(0)
}

fn seat(lobby: &mut Lobby, i: usize, out: &mut Outbox<HostEffect>) -> HandlerResult {
    matched(&mut lobby.waiting, i, "guest")?;
    let Some(index) = lobby.free_table() else {
        return Err(HandlerError::transient("no free table"));
    };
    let waiter = match lobby.least_loaded() {
        Some(staff) => {
            staff.load += 1;
            Arc::clone(&staff.waiter)
        }
        None => return Err(HandlerError::transient("no waiter on duty")),
    };
    let guest = lobby.waiting.remove(i);
    lobby.tables[index] = Some(guest.customer.id());
    info!(
        "Seating {} at table {} with {}",
        guest.customer.name(),
        index + 1,
        waiter.name()
    );
    out.push(HostEffect::Seat {
        waiter,
        customer: guest.customer,
        table: index + 1,
    });
    Ok(())
}

fn unwarned_guest(lobby: &Lobby) -> Option<usize> {
    if lobby.free_table().is_some() {
        return None;
    }
    lobby.waiting.iter().position(|g| !g.told_full)
}

fn tell_full(lobby: &mut Lobby, i: usize, out: &mut Outbox<HostEffect>) -> HandlerResult {
    let guest = matched(&mut lobby.waiting, i, "guest")?;
    guest.told_full = true;
    out.push(HostEffect::TellFull {
        customer: Arc::clone(&guest.customer),
    });
    Ok(())
}

fn restocked_food(lobby: &Lobby) -> Option<usize> {
    (!lobby.restocked.is_empty()).then_some(0)
}

fn pass_on_restock(lobby: &mut Lobby, i: usize, out: &mut Outbox<HostEffect>) -> HandlerResult {
    matched(&mut lobby.restocked, i, "restock")?;
    let food = lobby.restocked.remove(i);
    out.push(HostEffect::Restocked {
        food,
        waiters: lobby.staff.iter().map(|s| Arc::clone(&s.waiter)).collect(),
    });
    Ok(())
}

impl Agent for HostAgent {
    type State = Lobby;
    type Effect = HostEffect;

    fn name(&self) -> &str {
        &self.name
    }

    fn mailbox(&self) -> &Mailbox<Lobby> {
        &self.mailbox
    }

    fn rules(&self) -> &RuleTable<Lobby, HostEffect> {
        &self.rules
    }

    fn perform(&self, effect: HostEffect) -> HandlerResult {
        match effect {
            HostEffect::Seat {
                waiter,
                customer,
                table,
            } => waiter.msg_sit_at_table(customer, table),
            HostEffect::TellFull { customer } => {
                info!("Sorry {}, the restaurant is full", customer.name());
                customer.msg_restaurant_is_full();
            }
            HostEffect::Restocked { food, waiters } => {
                for waiter in waiters {
                    waiter.msg_food_restocked(&food);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCustomer, MockWaiter};
    use test_log::test;

    fn step(host: &HostAgent) -> bool {
        host.pick_and_execute_an_action().unwrap()
    }

    #[test]
    fn seats_with_least_loaded_waiter() {
        let host = HostAgent::new("host", 3);
        let alice = MockWaiter::new("alice");
        let bob = MockWaiter::new("bob");
        host.add_waiter(alice.clone());
        host.add_waiter(bob.clone());

        for name in ["a", "b", "c"] {
            host.msg_i_want_food(MockCustomer::new(name));
        }
        assert!(step(&host));
        assert!(step(&host));
        assert!(step(&host));
        assert!(!step(&host));

        assert_eq!(
            alice.log.events(),
            vec![
                "Received msgSitAtTable. Customer = a. Table = 1",
                "Received msgSitAtTable. Customer = c. Table = 3",
            ]
        );
        assert_eq!(
            bob.log.events(),
            vec!["Received msgSitAtTable. Customer = b. Table = 2"]
        );
        assert_eq!(host.waiter_loads(), vec![2, 1]);
        assert_eq!(host.free_tables(), 0);
    }

    #[test]
    fn full_restaurant_warns_each_guest_once_then_seats_on_free_table() {
        let host = HostAgent::new("host", 1);
        let waiter = MockWaiter::new("waiter");
        host.add_waiter(waiter.clone());
        let first = MockCustomer::new("first");
        let second = MockCustomer::new("second");

        host.msg_i_want_food(first.clone());
        host.msg_i_want_food(second.clone());
        assert!(step(&host));
        assert!(step(&host));
        assert_eq!(second.log.events(), vec!["Received msgRestaurantIsFull"]);
        assert!(!step(&host), "second is told only once");
        assert!(first.log.is_empty());

        host.msg_table_is_free(1, waiter.as_ref());
        assert_eq!(host.waiter_loads(), vec![0]);
        assert!(step(&host));
        assert!(waiter
            .log
            .contains("Received msgSitAtTable. Customer = second. Table = 1"));
        assert_eq!(host.waiting(), 0);
    }

    #[test]
    fn leaving_guest_is_forgotten() {
        let host = HostAgent::new("host", 0);
        let impatient = MockCustomer::new("impatient");
        host.msg_i_want_food(impatient.clone());
        assert!(step(&host));
        assert!(impatient.log.contains("Received msgRestaurantIsFull"));

        host.msg_im_leaving(impatient.as_ref());
        assert_eq!(host.waiting(), 0);
        assert!(!step(&host));
    }

    #[test]
    fn no_waiters_means_nobody_is_seated() {
        let host = HostAgent::new("host", 2);
        host.msg_i_want_food(MockCustomer::new("a"));
        assert!(!step(&host));
        assert_eq!(host.waiting(), 1);
    }

    #[test]
    fn restock_reaches_every_waiter() {
        let host = HostAgent::new("host", 1);
        let alice = MockWaiter::new("alice");
        let bob = MockWaiter::new("bob");
        host.add_waiter(alice.clone());
        host.add_waiter(bob.clone());

        host.msg_received_order("steak");
        assert!(step(&host));
        assert!(alice.log.contains("Received msgFoodRestocked. Food = steak"));
        assert!(bob.log.contains("Received msgFoodRestocked. Food = steak"));
    }
}
