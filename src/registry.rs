//! The extended-GPIO facade.
//!
//! [`PinRegistry`] owns the physical port and up to two multiplexer banks.
//! Ids below the threshold go straight to the port; ids at or above it are
//! decoded to `(bank, channel)` with `channel = id - base` and routed through
//! the bank's multiplexer.

use crate::config::{BankConfig, RegistryConfig};
use crate::error::{invalid_config, Error, Result};
use crate::gpio::{GpioDirection, GpioLevel, GpioPull, IntoPinId, PinId};
use crate::multiplexer::{BankId, Multiplexer, PinDescriptor};
use crate::port::PhysicalPort;
use crate::selector::ChannelSelectLines;
use log::{debug, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::RangeInclusive;

/// Where an id resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// A physical pin, passed through unchanged.
    Physical(u8),
    /// A channel behind a multiplexer bank.
    Extended { bank: BankId, channel: u8 },
}

/// One entry of a batch [`PinRegistry::setup_many`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinSetup {
    pub pin: PinId,
    pub direction: GpioDirection,
    pub pull: GpioPull,
    /// Written after configuring, for outputs only.
    pub initial: Option<GpioLevel>,
}

impl PinSetup {
    pub fn input(pin: u8, pull: GpioPull) -> Self {
        PinSetup {
            pin: PinId::new(pin),
            direction: GpioDirection::Input,
            pull,
            initial: None,
        }
    }

    pub fn output(pin: u8, initial: Option<GpioLevel>) -> Self {
        PinSetup {
            pin: PinId::new(pin),
            direction: GpioDirection::Output,
            pull: GpioPull::None,
            initial,
        }
    }
}

#[derive(Debug)]
struct Bank {
    range: RangeInclusive<u8>,
    base: u8,
    lines: ChannelSelectLines,
    enabled: bool,
    mux: Option<Multiplexer>,
}

impl Bank {
    fn from_config(cfg: &BankConfig) -> Self {
        Bank {
            range: cfg.range.clone(),
            base: cfg.resolved_base(),
            lines: cfg.resolved_lines(),
            enabled: cfg.enabled,
            mux: None,
        }
    }
}

/// Threshold and bank ranges: everything needed to decode an id.
#[derive(Debug)]
struct Layout {
    threshold: u8,
    banks: [Option<Bank>; 2],
}

impl Layout {
    fn route(&self, id: PinId) -> Result<Route> {
        if !id.is_extended(self.threshold) {
            return Ok(Route::Physical(id.number()));
        }
        let pin = id.number();
        for bank in [BankId::One, BankId::Two] {
            let Some(slot) = self.banks[bank.index()].as_ref() else {
                continue;
            };
            if slot.range.contains(&pin) {
                let channel = pin - slot.base;
                let capacity = slot.lines.channel_count();
                // A disabled bank has no lines to address; let the caller
                // report it as unmapped.
                if slot.enabled && channel >= capacity {
                    return Err(Error::ChannelOutOfRange {
                        bank,
                        channel,
                        capacity,
                    });
                }
                return Ok(Route::Extended { bank, channel });
            }
        }
        Err(Error::PinOutOfRange { pin })
    }

    fn route_extended(&self, id: PinId) -> Result<(BankId, u8)> {
        match self.route(id)? {
            Route::Physical(pin) => Err(invalid_config(format!(
                "descriptor id {} is below the threshold {}",
                pin, self.threshold
            ))),
            Route::Extended { bank, channel } => Ok((bank, channel)),
        }
    }

    /// A multiplexed physical pin must be a real pin, not a select line, and
    /// must not already belong to the other bank.
    fn check_physical_pin(&self, bank: BankId, physical_pin: u8) -> Result<()> {
        if physical_pin >= self.threshold {
            return Err(invalid_config(format!(
                "gpio {} is not a physical pin (threshold {})",
                physical_pin, self.threshold
            )));
        }
        for other in [BankId::One, BankId::Two] {
            let Some(slot) = self.banks[other.index()].as_ref() else {
                continue;
            };
            if slot.enabled && slot.lines.contains(physical_pin) {
                return Err(invalid_config(format!(
                    "gpio {} is a select line of {}",
                    physical_pin, other
                )));
            }
            if other != bank {
                let shared = slot.mux.as_ref().is_some_and(|mux| {
                    mux.channels().any(|(_, d)| d.physical_pin == physical_pin)
                });
                if shared {
                    return Err(invalid_config(format!(
                        "gpio {} is wired to both {} and {}",
                        physical_pin, other, bank
                    )));
                }
            }
        }
        Ok(())
    }

    fn mux_mut(
        &mut self,
        strict: bool,
        id: PinId,
        bank: BankId,
    ) -> Result<Option<&mut Multiplexer>> {
        match self.banks[bank.index()].as_mut().and_then(|b| b.mux.as_mut()) {
            Some(mux) => Ok(Some(mux)),
            None if strict => Err(Error::UnmappedBank {
                pin: id.number(),
                bank,
            }),
            None => {
                warn!("Pin {} belongs to {} which has no multiplexer; ignoring", id, bank);
                Ok(None)
            }
        }
    }
}

/// Extended GPIO facade over a [`PhysicalPort`].
///
/// Build it once with [`PinRegistry::new`]; construction configures the
/// select lines and every multiplexed physical pin. All descriptors should be
/// final by then: the per-bank homogeneity decision is not revisited by later
/// [`setup`](PinRegistry::setup) calls.
///
/// **Note:** not internally synchronized. Wrap it in a mutex to share it
/// between threads.
#[derive(Debug)]
pub struct PinRegistry<P: PhysicalPort> {
    port: P,
    layout: Layout,
    strict_banks: bool,
}

impl<P: PhysicalPort> PinRegistry<P> {
    /// Validates `config`, builds the multiplexers and initializes hardware.
    pub fn new(mut port: P, config: RegistryConfig) -> Result<Self> {
        config.validate_layout()?;
        let mut layout = Layout {
            threshold: config.threshold,
            banks: [
                config.bank1.as_ref().map(Bank::from_config),
                config.bank2.as_ref().map(Bank::from_config),
            ],
        };

        let mut per_bank: [BTreeMap<u8, PinDescriptor>; 2] = Default::default();
        let mut pin_owner: HashMap<u8, BankId> = HashMap::new();
        for desc in &config.pins {
            let (bank, channel) = layout.route_extended(desc.extended_id)?;
            if !layout.banks[bank.index()].as_ref().is_some_and(|b| b.enabled) {
                return Err(Error::UnmappedBank {
                    pin: desc.extended_id.number(),
                    bank,
                });
            }
            layout.check_physical_pin(bank, desc.physical_pin)?;
            if let Some(owner) = pin_owner.insert(desc.physical_pin, bank) {
                if owner != bank {
                    return Err(invalid_config(format!(
                        "gpio {} is wired to both {} and {}",
                        desc.physical_pin, owner, bank
                    )));
                }
            }
            if per_bank[bank.index()].insert(channel, *desc).is_some() {
                return Err(Error::DuplicatePin {
                    pin: desc.extended_id.number(),
                });
            }
        }

        for bank in [BankId::One, BankId::Two] {
            let Some(slot) = layout.banks[bank.index()].as_mut() else {
                continue;
            };
            if !slot.enabled {
                debug!("{} reserved for ids {:?} without a multiplexer", bank, slot.range);
                continue;
            }
            let channels = std::mem::take(&mut per_bank[bank.index()]);
            let mux = Multiplexer::new(bank, slot.lines, channels)
                .with_settle_delay(config.settle_delay);
            mux.init(&mut port)?;
            slot.mux = Some(mux);
        }
        debug!(
            "Extended GPIO registry ready: threshold={}, strict_banks={}",
            layout.threshold, config.strict_banks
        );
        Ok(PinRegistry {
            port,
            layout,
            strict_banks: config.strict_banks,
        })
    }

    /// First extended id.
    pub fn threshold(&self) -> u8 {
        self.layout.threshold
    }

    /// Resolves an id without touching hardware.
    pub fn decode(&self, pin: impl IntoPinId) -> Result<Route> {
        self.layout.route(pin.into_pin_id()?)
    }

    /// Configures a pin. For extended ids this rewrites the channel's
    /// descriptor, selects the channel and applies the new mode.
    pub fn setup(
        &mut self,
        pin: impl IntoPinId,
        direction: GpioDirection,
        pull: GpioPull,
    ) -> Result<()> {
        let id = pin.into_pin_id()?;
        debug!("setup(pin={}, direction={}, pull={})", id, direction, pull);
        match self.layout.route(id)? {
            Route::Physical(pin) => self.port.configure(pin, direction, pull),
            Route::Extended { bank, channel } => {
                let Some(mux) = self.layout.mux_mut(self.strict_banks, id, bank)? else {
                    return Ok(());
                };
                let current = mux
                    .descriptor(channel)
                    .copied()
                    .ok_or(Error::UnmappedChannel { bank, channel })?;
                let desc = PinDescriptor {
                    direction,
                    pull,
                    ..current
                };
                apply_descriptor(mux, &mut self.port, channel, desc)
            }
        }
    }

    /// Like [`setup`](Self::setup), then drives `initial` if the pin is an output.
    pub fn setup_with_initial(
        &mut self,
        pin: impl IntoPinId,
        direction: GpioDirection,
        pull: GpioPull,
        initial: GpioLevel,
    ) -> Result<()> {
        let id = pin.into_pin_id()?;
        self.setup(id, direction, pull)?;
        if direction == GpioDirection::Output {
            self.write(id, initial)?;
        }
        Ok(())
    }

    /// Applies setups in order, stopping at the first failure.
    pub fn setup_many(&mut self, setups: &[PinSetup]) -> Result<()> {
        for setup in setups {
            match setup.initial {
                Some(initial) => {
                    self.setup_with_initial(setup.pin, setup.direction, setup.pull, initial)?
                }
                None => self.setup(setup.pin, setup.direction, setup.pull)?,
            }
        }
        Ok(())
    }

    /// Establishes or overwrites the descriptor for an extended id, including
    /// its physical pin, and applies its mode.
    pub fn setup_descriptor(&mut self, desc: PinDescriptor) -> Result<()> {
        let (bank, channel) = self.layout.route_extended(desc.extended_id)?;
        self.layout.check_physical_pin(bank, desc.physical_pin)?;
        let Some(mux) = self
            .layout
            .mux_mut(self.strict_banks, desc.extended_id, bank)?
        else {
            return Ok(());
        };
        apply_descriptor(mux, &mut self.port, channel, desc)
    }

    /// [`setup_descriptor`](Self::setup_descriptor) over an ordered sequence.
    pub fn setup_descriptors(
        &mut self,
        descs: impl IntoIterator<Item = PinDescriptor>,
    ) -> Result<()> {
        for desc in descs {
            self.setup_descriptor(desc)?;
        }
        Ok(())
    }

    /// Drives a pin, selecting its channel first if it is extended.
    pub fn write(&mut self, pin: impl IntoPinId, level: GpioLevel) -> Result<()> {
        let id = pin.into_pin_id()?;
        match self.layout.route(id)? {
            Route::Physical(pin) => {
                trace!("write(pin={}) = {:?} (physical)", pin, level);
                self.port.write(pin, level)
            }
            Route::Extended { bank, channel } => {
                match self.layout.mux_mut(self.strict_banks, id, bank)? {
                    Some(mux) => mux.write(&mut self.port, channel, level),
                    None => Ok(()),
                }
            }
        }
    }

    /// Samples a pin, selecting its channel first if it is extended.
    ///
    /// In lenient mode a pin in a bank without a multiplexer reads `Low`.
    pub fn read(&mut self, pin: impl IntoPinId) -> Result<GpioLevel> {
        let id = pin.into_pin_id()?;
        match self.layout.route(id)? {
            Route::Physical(pin) => {
                let level = self.port.read(pin)?;
                trace!("read(pin={}) -> {:?} (physical)", pin, level);
                Ok(level)
            }
            Route::Extended { bank, channel } => {
                match self.layout.mux_mut(self.strict_banks, id, bank)? {
                    Some(mux) => mux.read(&mut self.port, channel),
                    None => Ok(GpioLevel::Low),
                }
            }
        }
    }

    pub fn multiplexer(&self, bank: BankId) -> Option<&Multiplexer> {
        self.layout.banks[bank.index()].as_ref()?.mux.as_ref()
    }

    /// Descriptor behind an extended id, if one is mapped.
    pub fn descriptor(&self, pin: impl IntoPinId) -> Option<&PinDescriptor> {
        match self.decode(pin).ok()? {
            Route::Physical(_) => None,
            Route::Extended { bank, channel } => self.multiplexer(bank)?.descriptor(channel),
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Direct access to the port. Writing to pins owned by a multiplexer
    /// through this handle desynchronizes it.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }
}

fn apply_descriptor<P: PhysicalPort + ?Sized>(
    mux: &mut Multiplexer,
    port: &mut P,
    channel: u8,
    desc: PinDescriptor,
) -> Result<()> {
    mux.set_descriptor(channel, desc)?;
    mux.select_channel(port, channel)?;
    // Per-channel setup already applied the mode during selection.
    if !mux.requires_per_channel_setup() {
        port.configure(desc.physical_pin, desc.direction, desc.pull)?;
    }
    Ok(())
}

impl<P: PhysicalPort> fmt::Display for PinRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PinRegistry: threshold={}", self.layout.threshold)?;
        for slot in self.layout.banks.iter().flatten() {
            match &slot.mux {
                Some(mux) => write!(f, "{}", mux)?,
                None => writeln!(f, "ids {:?}: no multiplexer", slot.range)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankConfig;
    use crate::gpio::{HIGH, IN, LOW, OUT, PULL_DOWN, PULL_NONE, PULL_UP};
    use crate::sim::SimulatedPort;

    fn registry() -> PinRegistry<SimulatedPort> {
        PinRegistry::new(SimulatedPort::new(), RegistryConfig::default()).unwrap()
    }

    #[test]
    fn test_decode_boundaries() {
        let reg = registry();
        assert_eq!(reg.decode(39).unwrap(), Route::Physical(39));
        assert_eq!(
            reg.decode(40).unwrap(),
            Route::Extended {
                bank: BankId::One,
                channel: 0
            }
        );
        assert_eq!(
            reg.decode(83).unwrap(),
            Route::Extended {
                bank: BankId::Two,
                channel: 3
            }
        );
        // Bank 2 has two select lines: channel 4 is not addressable.
        assert!(matches!(
            reg.decode(84),
            Err(Error::ChannelOutOfRange {
                bank: BankId::Two,
                channel: 4,
                capacity: 4
            })
        ));
        assert!(matches!(reg.decode(200), Err(Error::PinOutOfRange { pin: 200 })));
        assert!(matches!(reg.decode(40.5), Err(Error::InvalidChannelType(_))));
    }

    #[test]
    fn test_explicit_base_offset() {
        let mut cfg = RegistryConfig::physical_only();
        cfg.bank1 = Some(BankConfig {
            base: Some(100),
            ..BankConfig::new(ChannelSelectLines::new(4, 17, 27), 102..=107)
        });
        let reg = PinRegistry::new(SimulatedPort::new(), cfg).unwrap();
        assert_eq!(
            reg.decode(105).unwrap(),
            Route::Extended {
                bank: BankId::One,
                channel: 5
            }
        );
    }

    #[test]
    fn test_construction_initializes_hardware() {
        let reg = registry();
        let port = reg.port();
        for line in [4, 17, 27, 22, 23] {
            assert_eq!(port.mode(line), Some((OUT, PULL_NONE)));
        }
        assert_eq!(port.mode(3), Some((IN, PULL_DOWN)));
        assert_eq!(port.mode(15), Some((IN, PULL_DOWN)));
        assert_eq!(port.mode(14), Some((OUT, PULL_NONE)));
        assert_eq!(port.configure_count(), 8);
        assert!(!reg.multiplexer(BankId::One).unwrap().requires_per_channel_setup());
        assert!(!reg.multiplexer(BankId::Two).unwrap().requires_per_channel_setup());
    }

    #[test]
    fn test_setup_overwrites_descriptor() {
        let mut reg = registry();
        reg.setup(42, IN, PULL_UP).unwrap();
        let desc = reg.descriptor(42).unwrap();
        assert_eq!(desc.physical_pin, 3);
        assert_eq!(desc.pull, PULL_UP);
        assert_eq!(reg.port().mode(3), Some((IN, PULL_UP)));
        // Compute-once: the flag is not re-derived.
        assert!(!reg.multiplexer(BankId::One).unwrap().requires_per_channel_setup());
    }

    #[test]
    fn test_setup_with_initial_drives_outputs_only() {
        let mut reg = registry();
        reg.setup_with_initial(83, OUT, PULL_NONE, HIGH).unwrap();
        assert_eq!(reg.port().level(14), HIGH);
        assert_eq!(reg.multiplexer(BankId::Two).unwrap().active_channel(), Some(3));

        reg.port_mut().clear_calls();
        reg.setup_with_initial(5, IN, PULL_DOWN, HIGH).unwrap();
        assert_eq!(reg.port().calls().len(), 1);
        assert_eq!(reg.port().level(5), LOW);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut cfg = RegistryConfig::default();
        cfg.pins.push(PinDescriptor::input(41, 3, PULL_DOWN));
        assert!(matches!(
            PinRegistry::new(SimulatedPort::new(), cfg),
            Err(Error::DuplicatePin { pin: 41 })
        ));
    }

    #[test]
    fn test_physical_pin_cannot_span_banks() {
        let mut cfg = RegistryConfig::default();
        cfg.pins.push(PinDescriptor::input(45, 15, PULL_DOWN));
        assert!(matches!(
            PinRegistry::new(SimulatedPort::new(), cfg),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_select_line_cannot_carry_data() {
        let cfg = RegistryConfig::with_pins(vec![PinDescriptor::input(40, 17, PULL_DOWN)]);
        assert!(matches!(
            PinRegistry::new(SimulatedPort::new(), cfg),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_display_lists_banks() {
        let reg = registry();
        let text = reg.to_string();
        assert!(text.starts_with("PinRegistry: threshold=40"));
        assert!(text.contains("bank 1: A=4, B=17, C=27"));
        assert!(text.contains("bank 2: A=22, B=23, C=unused"));
        assert!(text.contains("extended=83, gpio=14, mode=OUT, pull=PULL_NONE"));
    }
}
