//! In-memory [`PhysicalPort`] for tests and dry runs.
//!
//! Records every call in order and keeps the last written level and
//! configured mode per pin. Input levels can be preset with
//! [`SimulatedPort::set_input`], and a configuration failure can be armed for
//! a pin with [`SimulatedPort::fail_configure`].

use crate::error::{Error, Result};
use crate::gpio::{GpioDirection, GpioLevel, GpioPull};
use crate::port::PhysicalPort;
use log::trace;
use std::collections::{HashMap, HashSet};

/// One call received by a [`SimulatedPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortCall {
    Configure {
        pin: u8,
        direction: GpioDirection,
        pull: GpioPull,
    },
    Write {
        pin: u8,
        level: GpioLevel,
    },
    Read {
        pin: u8,
    },
}

#[derive(Debug, Default)]
pub struct SimulatedPort {
    calls: Vec<PortCall>,
    levels: HashMap<u8, GpioLevel>,
    modes: HashMap<u8, (GpioDirection, GpioPull)>,
    failing: HashSet<u8>,
}

impl SimulatedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presets the level returned by subsequent reads of `pin`.
    pub fn set_input(&mut self, pin: u8, level: GpioLevel) {
        self.levels.insert(pin, level);
    }

    /// Makes every later `configure` of `pin` fail.
    pub fn fail_configure(&mut self, pin: u8) {
        self.failing.insert(pin);
    }

    /// Last level written to (or preset on) `pin`; `Low` if never touched.
    pub fn level(&self, pin: u8) -> GpioLevel {
        self.levels.get(&pin).copied().unwrap_or(GpioLevel::Low)
    }

    /// Last mode configured on `pin`.
    pub fn mode(&self, pin: u8) -> Option<(GpioDirection, GpioPull)> {
        self.modes.get(&pin).copied()
    }

    pub fn calls(&self) -> &[PortCall] {
        &self.calls
    }

    pub fn configure_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PortCall::Configure { .. }))
            .count()
    }

    /// Number of `configure` calls that targeted `pin`.
    pub fn configure_count_for(&self, pin: u8) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PortCall::Configure { pin: p, .. } if *p == pin))
            .count()
    }

    /// Forgets the recorded calls, keeping pin state.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl PhysicalPort for SimulatedPort {
    fn configure(&mut self, pin: u8, direction: GpioDirection, pull: GpioPull) -> Result<()> {
        if self.failing.contains(&pin) {
            return Err(Error::port(format!(
                "simulated failure configuring pin {}",
                pin
            )));
        }
        trace!("sim: configure pin {} as {} {}", pin, direction, pull);
        self.calls.push(PortCall::Configure {
            pin,
            direction,
            pull,
        });
        self.modes.insert(pin, (direction, pull));
        Ok(())
    }

    fn write(&mut self, pin: u8, level: GpioLevel) -> Result<()> {
        trace!("sim: write pin {} = {:?}", pin, level);
        self.calls.push(PortCall::Write { pin, level });
        self.levels.insert(pin, level);
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<GpioLevel> {
        self.calls.push(PortCall::Read { pin });
        let level = self.level(pin);
        trace!("sim: read pin {} -> {:?}", pin, level);
        Ok(level)
    }
}
