// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

//! Business rules on top of any [`Controller`]: the average rating kept on
//! every reviewable parent and the daily quota on flashcard set creation.
//!
//! Nothing here caches store state between calls, every decision is taken
//! from what the store says inside the current transaction.

pub mod aggregator;
pub mod limiter;

#[cfg(test)]
mod faulty;

use config::{Config, EngineConfig, LimiterConfig};
use controller::Controller;

pub use aggregator::{Recompute, ReviewChange};
pub use limiter::{today, SetCreation};

pub struct Engine<'a, C>
where
    C: Controller,
{
    controller: &'a C,
    config: EngineConfig,
    limiter: LimiterConfig,
}

impl<'a, C> Engine<'a, C>
where
    C: Controller,
{
    pub fn with_controller(controller: &'a C) -> Self {
        Self::with_config(controller, &Config::default())
    }

    pub fn with_config(controller: &'a C, config: &Config) -> Self {
        Self {
            controller,
            config: config.engine.clone(),
            limiter: config.limiter.clone(),
        }
    }

    pub fn controller(&self) -> &'a C {
        self.controller
    }
}
