//! The seam between the agents and whatever draws them.
//!
//! Customers ask for [`Animation`]s and are told when each one finishes with
//! a [`Cue`]. The kitchen only reports what it is doing. [`Headless`] stands
//! in for a renderer: it finishes every animation the moment it starts.

use std::sync::Arc;

use log::debug;

/// A walk or gesture a customer asks the renderer to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    EnterRestaurant,
    GoToSeat { table: usize },
    Order,
    GoToCashier,
    ExitRestaurant,
}

impl Animation {
    /// The cue the renderer sends back once this animation is over.
    pub fn finished_cue(self) -> Cue {
        match self {
            Animation::EnterRestaurant => Cue::Arrived,
            Animation::GoToSeat { .. } => Cue::Seated,
            Animation::Order => Cue::DoneOrdering,
            Animation::GoToCashier => Cue::AtCashier,
            Animation::ExitRestaurant => Cue::DoneLeaving,
        }
    }
}

/// "Animation finished" signals, the only input the renderer gives agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Arrived,
    Seated,
    DoneOrdering,
    AtCashier,
    DoneLeaving,
}

/// Receives cues. Implemented by customers.
pub trait CueSink: Send + Sync {
    fn cue(&self, cue: Cue);
}

/// Renderer surface for customers.
pub trait CustomerStage: Send + Sync {
    /// Start an animation for `actor`, who must eventually be cued.
    fn animate(&self, actor: Arc<dyn CueSink>, animation: Animation);
}

/// Renderer surface for the kitchen. Nothing is sent back.
pub trait KitchenStage: Send + Sync {
    fn cooking(&self, food: &str);
    fn plating(&self, food: &str);
}

/// Finishes every animation immediately, on the caller's thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl CustomerStage for Headless {
    fn animate(&self, actor: Arc<dyn CueSink>, animation: Animation) {
        debug!("animate {:?}", animation);
        actor.cue(animation.finished_cue());
    }
}

impl KitchenStage for Headless {
    fn cooking(&self, food: &str) {
        debug!("cooking {}", food);
    }

    fn plating(&self, food: &str) {
        debug!("plating {}", food);
    }
}
