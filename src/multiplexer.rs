//! A multiplexer bank: select lines plus the pins wired behind its channels.

use crate::error::{Error, Result};
use crate::gpio::{GpioDirection, GpioLevel, GpioPull, PinId};
use crate::port::PhysicalPort;
use crate::selector::{ChannelSelectLines, ChannelSelector};
use log::{debug, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Identifies one of the (at most two) multiplexer banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BankId {
    One,
    Two,
}

impl BankId {
    pub(crate) fn index(self) -> usize {
        match self {
            BankId::One => 0,
            BankId::Two => 1,
        }
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankId::One => f.write_str("bank 1"),
            BankId::Two => f.write_str("bank 2"),
        }
    }
}

/// A logical signal wired to one multiplexer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinDescriptor {
    /// Id in the extended address space.
    pub extended_id: PinId,
    /// Physical pin connected to the multiplexer's common I/O.
    pub physical_pin: u8,
    pub direction: GpioDirection,
    /// Only meaningful for inputs.
    pub pull: GpioPull,
}

impl PinDescriptor {
    pub fn new(
        extended_id: u8,
        physical_pin: u8,
        direction: GpioDirection,
        pull: GpioPull,
    ) -> Self {
        PinDescriptor {
            extended_id: PinId::new(extended_id),
            physical_pin,
            direction,
            pull,
        }
    }

    /// An input channel.
    pub fn input(extended_id: u8, physical_pin: u8, pull: GpioPull) -> Self {
        Self::new(extended_id, physical_pin, GpioDirection::Input, pull)
    }

    /// An output channel (no pull resistor).
    pub fn output(extended_id: u8, physical_pin: u8) -> Self {
        Self::new(extended_id, physical_pin, GpioDirection::Output, GpioPull::None)
    }

    /// True if both descriptors need the same port configuration.
    #[inline]
    pub fn same_mode(&self, other: &PinDescriptor) -> bool {
        self.direction == other.direction && self.pull == other.pull
    }
}

impl fmt::Display for PinDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extended={}, gpio={}, mode={}, pull={}",
            self.extended_id, self.physical_pin, self.direction, self.pull
        )
    }
}

/// True if some physical pin carries channels with differing direction or pull.
///
/// Evaluated per physical pin: a bank mixing an output port and an input port
/// is still homogeneous as long as each port is internally uniform.
pub fn requires_per_channel_setup<'a>(
    descriptors: impl IntoIterator<Item = &'a PinDescriptor>,
) -> bool {
    let mut first_by_pin: HashMap<u8, &PinDescriptor> = HashMap::new();
    for desc in descriptors {
        match first_by_pin.get(&desc.physical_pin) {
            Some(first) if !first.same_mode(desc) => return true,
            Some(_) => {}
            None => {
                first_by_pin.insert(desc.physical_pin, desc);
            }
        }
    }
    false
}

/// One multiplexer chip (or a set of chips sharing select lines).
///
/// The channel map is sparse; selecting an unmapped channel does nothing.
/// The homogeneity flag is derived once in [`Multiplexer::new`]. Changing a
/// descriptor later with [`Multiplexer::set_descriptor`] does not recompute
/// it, so all descriptors should be final before the first selection.
///
/// **Note:** select-then-access is not atomic. Callers sharing a multiplexer
/// across threads must serialize access themselves.
#[derive(Debug)]
pub struct Multiplexer {
    bank: BankId,
    selector: ChannelSelector,
    channels: BTreeMap<u8, PinDescriptor>,
    per_channel_setup: bool,
    settle_delay: Duration,
    active_channel: Option<u8>,
}

impl Multiplexer {
    /// Builds a multiplexer from `(channel, descriptor)` pairs.
    ///
    /// Does not touch hardware; see [`Multiplexer::init`].
    pub fn new(
        bank: BankId,
        lines: ChannelSelectLines,
        channels: impl IntoIterator<Item = (u8, PinDescriptor)>,
    ) -> Self {
        let channels: BTreeMap<u8, PinDescriptor> = channels.into_iter().collect();
        let per_channel_setup = requires_per_channel_setup(channels.values());
        debug!(
            "Multiplexer {} ({}): {} channels mapped, per-channel setup = {}",
            bank,
            lines,
            channels.len(),
            per_channel_setup
        );
        Multiplexer {
            bank,
            selector: ChannelSelector::new(lines),
            channels,
            per_channel_setup,
            settle_delay: Duration::ZERO,
            active_channel: None,
        }
    }

    /// Sets a delay slept after the select lines change, before any access.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn bank(&self) -> BankId {
        self.bank
    }

    pub fn lines(&self) -> ChannelSelectLines {
        self.selector.lines()
    }

    pub fn requires_per_channel_setup(&self) -> bool {
        self.per_channel_setup
    }

    /// Channel most recently selected through this multiplexer.
    pub fn active_channel(&self) -> Option<u8> {
        self.active_channel
    }

    pub fn descriptor(&self, channel: u8) -> Option<&PinDescriptor> {
        self.channels.get(&channel)
    }

    /// Mapped channels in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = (u8, &PinDescriptor)> {
        self.channels.iter().map(|(ch, desc)| (*ch, desc))
    }

    /// Configures the select lines as outputs and each shared physical pin once.
    ///
    /// A physical pin carrying several modes gets the mode of its
    /// lowest-numbered channel; per-channel setup fixes it up on selection.
    pub fn init<P: PhysicalPort + ?Sized>(&self, port: &mut P) -> Result<()> {
        self.selector.init(port)?;
        let mut configured: Vec<u8> = Vec::new();
        for desc in self.channels.values() {
            if configured.contains(&desc.physical_pin) {
                continue;
            }
            debug!(
                "{}: initial GPIO setup(port={}, mode={}, pull={})",
                self.bank, desc.physical_pin, desc.direction, desc.pull
            );
            port.configure(desc.physical_pin, desc.direction, desc.pull)?;
            configured.push(desc.physical_pin);
        }
        Ok(())
    }

    /// Routes `channel` to its physical pin.
    ///
    /// Returns the channel's descriptor, or `None` without touching hardware
    /// if the channel is unmapped.
    pub fn select_channel<P: PhysicalPort + ?Sized>(
        &mut self,
        port: &mut P,
        channel: u8,
    ) -> Result<Option<PinDescriptor>> {
        let desc = match self.channels.get(&channel) {
            Some(desc) => *desc,
            None => {
                trace!("{}: channel {} unmapped, skipping selection", self.bank, channel);
                return Ok(None);
            }
        };
        self.selector.select(port, channel)?;
        self.active_channel = Some(channel);
        if self.per_channel_setup {
            trace!("{}: per-channel setup for {}", self.bank, desc);
            port.configure(desc.physical_pin, desc.direction, desc.pull)?;
        }
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
        Ok(Some(desc))
    }

    /// Selects `channel` and samples its physical pin.
    pub fn read<P: PhysicalPort + ?Sized>(
        &mut self,
        port: &mut P,
        channel: u8,
    ) -> Result<GpioLevel> {
        let desc = self
            .select_channel(port, channel)?
            .ok_or(Error::UnmappedChannel {
                bank: self.bank,
                channel,
            })?;
        let level = port.read(desc.physical_pin)?;
        trace!(
            "{}: read channel {} (gpio {}) -> {:?}",
            self.bank,
            channel,
            desc.physical_pin,
            level
        );
        Ok(level)
    }

    /// Selects `channel` and drives its physical pin.
    pub fn write<P: PhysicalPort + ?Sized>(
        &mut self,
        port: &mut P,
        channel: u8,
        level: GpioLevel,
    ) -> Result<()> {
        let desc = self
            .select_channel(port, channel)?
            .ok_or(Error::UnmappedChannel {
                bank: self.bank,
                channel,
            })?;
        trace!(
            "{}: write channel {} (gpio {}) = {:?}",
            self.bank,
            channel,
            desc.physical_pin,
            level
        );
        port.write(desc.physical_pin, level)
    }

    /// Establishes or overwrites the descriptor on `channel`.
    ///
    /// The homogeneity flag is left as computed at construction. A warning is
    /// logged when the new descriptor contradicts it.
    pub fn set_descriptor(&mut self, channel: u8, desc: PinDescriptor) -> Result<()> {
        let capacity = self.selector.lines().channel_count();
        if channel >= capacity {
            return Err(Error::ChannelOutOfRange {
                bank: self.bank,
                channel,
                capacity,
            });
        }
        let previous = self.channels.insert(channel, desc);
        debug!(
            "{}: channel {} descriptor {} (was {:?})",
            self.bank, channel, desc, previous
        );
        if !self.per_channel_setup && requires_per_channel_setup(self.channels.values()) {
            warn!(
                "{}: channel {} now differs in mode from other channels on gpio {}, \
                 but per-channel setup was disabled at construction",
                self.bank, channel, desc.physical_pin
            );
        }
        Ok(())
    }
}

impl fmt::Display for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.bank, self.selector.lines())?;
        for (channel, desc) in &self.channels {
            writeln!(f, "  {}: {}", channel, desc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{IN, OUT, PULL_DOWN, PULL_NONE, PULL_UP};
    use crate::sim::{PortCall, SimulatedPort};

    fn rotary_switch() -> Multiplexer {
        Multiplexer::new(
            BankId::One,
            ChannelSelectLines::new(4, 17, 27),
            (0..3u8).map(|ch| (ch, PinDescriptor::input(40 + ch, 3, PULL_DOWN))),
        )
    }

    #[test]
    fn test_homogeneous_bank_selects_without_reconfiguring() {
        let mut mux = rotary_switch();
        assert!(!mux.requires_per_channel_setup());

        let mut port = SimulatedPort::new();
        mux.select_channel(&mut port, 2).unwrap();
        assert_eq!(port.level(4), GpioLevel::Low);
        assert_eq!(port.level(17), GpioLevel::High);
        assert_eq!(port.level(27), GpioLevel::Low);
        assert_eq!(port.configure_count(), 0);
        assert_eq!(mux.active_channel(), Some(2));
    }

    #[test]
    fn test_homogeneity_is_per_physical_pin() {
        let descs = [
            PinDescriptor::output(40, 14),
            PinDescriptor::input(41, 15, PULL_DOWN),
        ];
        assert!(!requires_per_channel_setup(&descs));

        let mixed_direction = [
            PinDescriptor::input(40, 3, PULL_DOWN),
            PinDescriptor::output(41, 3),
        ];
        assert!(requires_per_channel_setup(&mixed_direction));

        let mixed_pull = [
            PinDescriptor::input(40, 3, PULL_DOWN),
            PinDescriptor::input(41, 3, PULL_UP),
        ];
        assert!(requires_per_channel_setup(&mixed_pull));
        assert!(!requires_per_channel_setup(&[] as &[PinDescriptor]));
    }

    #[test]
    fn test_mixed_bank_reconfigures_on_every_selection() {
        let mut mux = Multiplexer::new(
            BankId::Two,
            ChannelSelectLines::two_line(22, 23),
            [
                (0, PinDescriptor::input(80, 15, PULL_DOWN)),
                (1, PinDescriptor::output(81, 15)),
            ],
        );
        assert!(mux.requires_per_channel_setup());

        let mut port = SimulatedPort::new();
        mux.select_channel(&mut port, 1).unwrap();
        assert_eq!(port.mode(15), Some((OUT, PULL_NONE)));
        mux.select_channel(&mut port, 0).unwrap();
        assert_eq!(port.mode(15), Some((IN, PULL_DOWN)));
        assert_eq!(port.configure_count_for(15), 2);
    }

    #[test]
    fn test_unmapped_channel_is_silent_noop() {
        let mut mux = rotary_switch();
        let mut port = SimulatedPort::new();
        assert_eq!(mux.select_channel(&mut port, 5).unwrap(), None);
        assert!(port.calls().is_empty());
        assert_eq!(mux.active_channel(), None);
    }

    #[test]
    fn test_read_write_on_unmapped_channel_is_error() {
        let mut mux = rotary_switch();
        let mut port = SimulatedPort::new();
        assert!(matches!(
            mux.read(&mut port, 6),
            Err(Error::UnmappedChannel {
                bank: BankId::One,
                channel: 6
            })
        ));
        assert!(matches!(
            mux.write(&mut port, 6, GpioLevel::High),
            Err(Error::UnmappedChannel { .. })
        ));
        assert!(port.calls().is_empty());
    }

    #[test]
    fn test_read_selects_before_sampling() {
        let mut mux = rotary_switch();
        let mut port = SimulatedPort::new();
        port.set_input(3, GpioLevel::High);
        assert_eq!(mux.read(&mut port, 1).unwrap(), GpioLevel::High);
        assert_eq!(
            port.calls(),
            &[
                PortCall::Write { pin: 4, level: GpioLevel::High },
                PortCall::Write { pin: 17, level: GpioLevel::Low },
                PortCall::Write { pin: 27, level: GpioLevel::Low },
                PortCall::Read { pin: 3 },
            ]
        );
    }

    #[test]
    fn test_init_configures_each_physical_pin_once() {
        let mux = rotary_switch();
        let mut port = SimulatedPort::new();
        mux.init(&mut port).unwrap();
        // Three select lines plus the shared data pin.
        assert_eq!(port.configure_count(), 4);
        assert_eq!(port.configure_count_for(3), 1);
        assert_eq!(port.mode(3), Some((IN, PULL_DOWN)));
    }

    #[test]
    fn test_late_descriptor_change_keeps_flag() {
        let mut mux = rotary_switch();
        mux.set_descriptor(1, PinDescriptor::output(41, 3)).unwrap();
        assert!(!mux.requires_per_channel_setup());

        let mut port = SimulatedPort::new();
        mux.select_channel(&mut port, 1).unwrap();
        assert_eq!(port.configure_count(), 0);

        assert!(matches!(
            mux.set_descriptor(8, PinDescriptor::output(48, 3)),
            Err(Error::ChannelOutOfRange { capacity: 8, .. })
        ));
    }
}
