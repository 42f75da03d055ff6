//! Ordered (condition, action) tables.
//!
//! A rule table is scanned top to bottom under the mailbox lock. The first
//! rule whose condition matches fires its action and the scan ends; the
//! scheduler comes back to the top of the table on its next iteration.
//!
//! Conditions return the position of the matched work item (or `0` for rules
//! over scalar state). Because the lock is held from condition to action, the
//! position is still valid when the action runs; actions nonetheless look the
//! item up with `get` and report [`HandlerError::Transient`] if it is missing.
//!
//! Actions must not talk to other agents directly. They push effects onto the
//! [`Outbox`]; the agent performs those after the lock is released.

use log::trace;

use crate::error::{HandlerError, HandlerResult};

/// Decides whether a rule applies, returning the matched item's position.
pub type Condition<S> = fn(&S) -> Option<usize>;

/// Mutates state for the matched item and queues effects.
pub type Action<S, E> = fn(&mut S, usize, &mut Outbox<E>) -> HandlerResult;

/// Effects queued by one rule action, performed after the scan releases
/// the mailbox lock.
#[derive(Debug)]
pub struct Outbox<E> {
    effects: Vec<E>,
}

impl<E> Default for Outbox<E> {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
        }
    }
}

impl<E> Outbox<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: E) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl<E> IntoIterator for Outbox<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.effects.into_iter()
    }
}

/// One named (condition, action) pair.
pub struct Rule<S, E> {
    name: &'static str,
    condition: Condition<S>,
    action: Action<S, E>,
}

impl<S, E> Rule<S, E> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A fixed-priority list of rules. Order of insertion is order of priority.
pub struct RuleTable<S, E> {
    rules: Vec<Rule<S, E>>,
}

impl<S, E> Default for RuleTable<S, E> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<S, E> RuleTable<S, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule with lower priority than every rule already present.
    #[must_use]
    pub fn rule(mut self, name: &'static str, condition: Condition<S>, action: Action<S, E>) -> Self {
        self.rules.push(Rule {
            name,
            condition,
            action,
        });
        self
    }

    /// Rule names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(Rule::name)
    }

    /// Name of the rule that would fire now, without firing it.
    pub fn peek(&self, state: &S) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| (rule.condition)(state).is_some())
            .map(Rule::name)
    }

    /// Fire the first matching rule. Returns its name, or `None` if no rule
    /// applies.
    ///
    /// # Errors
    ///
    /// Propagates the action's error. A transient error leaves the state as
    /// the action left it; the caller decides whether to rescan.
    pub fn fire(&self, state: &mut S, outbox: &mut Outbox<E>) -> HandlerResult<Option<&'static str>> {
        for rule in &self.rules {
            if let Some(position) = (rule.condition)(state) {
                trace!("rule '{}' fired on item {}", rule.name, position);
                (rule.action)(state, position, outbox)?;
                return Ok(Some(rule.name));
            }
        }
        Ok(None)
    }
}

/// Look up the matched item, turning a vanished one into a transient error.
pub fn matched<'a, T>(items: &'a mut [T], position: usize, what: &str) -> HandlerResult<&'a mut T> {
    items
        .get_mut(position)
        .ok_or_else(|| HandlerError::transient(format!("{} {} vanished mid-scan", what, position)))
}
