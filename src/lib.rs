//! A restaurant simulated as independent agents.
//!
//! Customers, waiters, a host, a cook, a cashier and a handful of markets
//! each run on their own scheduler thread (see the `actor-scheduler` crate)
//! and talk only through one-way messages. [`restaurant::Restaurant`] wires
//! the whole cast together from a [`config::Config`].

pub mod agents;
pub mod config;
pub mod menu;
pub mod mock;
pub mod presentation;
pub mod restaurant;
