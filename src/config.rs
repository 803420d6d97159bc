//! Registry configuration, resolved once by [`crate::PinRegistry::new`].

use crate::error::{invalid_config, Result};
use crate::gpio::GpioPull;
use crate::multiplexer::{BankId, PinDescriptor};
use crate::selector::ChannelSelectLines;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Extended ids start here unless configured otherwise (a 40-pin header).
pub const DEFAULT_THRESHOLD: u8 = 40;

/// Select lines of bank 1 on the reference board (8 channels).
pub const BANK1_DEFAULT_LINES: ChannelSelectLines = ChannelSelectLines::new(4, 17, 27);
/// Select lines of bank 2 on the reference board (4 channels, no C line).
pub const BANK2_DEFAULT_LINES: ChannelSelectLines = ChannelSelectLines::two_line(22, 23);

/// Configuration of one multiplexer bank.
///
/// Select lines can be given as a whole (`select_lines`) or line by line
/// (`select_a`, `select_b`, `select_c`). When `select_lines` is set the
/// individual fields are ignored; otherwise each individual field that is set
/// overrides the corresponding line of `default_lines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankConfig {
    /// When false the range is reserved but no multiplexer is built.
    pub enabled: bool,
    pub select_lines: Option<ChannelSelectLines>,
    pub select_a: Option<u8>,
    pub select_b: Option<u8>,
    /// `Some(None)` removes the C line from the defaults.
    pub select_c: Option<Option<u8>>,
    /// Lines used when neither `select_lines` nor an individual field is set.
    pub default_lines: ChannelSelectLines,
    /// Extended ids routed to this bank.
    pub range: RangeInclusive<u8>,
    /// Id that maps to channel 0; defaults to the start of `range`.
    pub base: Option<u8>,
}

impl BankConfig {
    /// Bank 1 of the reference board: ids 40-79 on lines 4/17/27.
    pub fn bank1_default() -> Self {
        BankConfig {
            enabled: true,
            select_lines: None,
            select_a: None,
            select_b: None,
            select_c: None,
            default_lines: BANK1_DEFAULT_LINES,
            range: 40..=79,
            base: None,
        }
    }

    /// Bank 2 of the reference board: ids 80-120 on lines 22/23.
    pub fn bank2_default() -> Self {
        BankConfig {
            default_lines: BANK2_DEFAULT_LINES,
            range: 80..=120,
            ..Self::bank1_default()
        }
    }

    /// A bank with explicit lines and range.
    pub fn new(lines: ChannelSelectLines, range: RangeInclusive<u8>) -> Self {
        BankConfig {
            select_lines: Some(lines),
            default_lines: lines,
            range,
            ..Self::bank1_default()
        }
    }

    /// Reserves the range without building a multiplexer.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Applies the list-over-individual precedence.
    pub fn resolved_lines(&self) -> ChannelSelectLines {
        if let Some(lines) = self.select_lines {
            return lines;
        }
        let mut lines = self.default_lines;
        if let Some(a) = self.select_a {
            lines.a = a;
        }
        if let Some(b) = self.select_b {
            lines.b = b;
        }
        if let Some(c) = self.select_c {
            lines.c = c;
        }
        lines
    }

    /// The id mapped to channel 0.
    pub fn resolved_base(&self) -> u8 {
        self.base.unwrap_or(*self.range.start())
    }
}

/// Everything needed to build a [`crate::PinRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// First extended id; lower ids are physical pins.
    pub threshold: u8,
    pub bank1: Option<BankConfig>,
    pub bank2: Option<BankConfig>,
    /// Initial descriptors; partitioned into banks by id range.
    pub pins: Vec<PinDescriptor>,
    /// When false, operations on a range without a multiplexer are silently
    /// skipped instead of failing with `UnmappedBank`.
    pub strict_banks: bool,
    /// Slept after every channel selection. Zero disables it.
    pub settle_delay: Duration,
}

impl Default for RegistryConfig {
    /// The reference wiring: a 5-position rotary switch on bank 1 (gpio 3)
    /// and two LED buttons on bank 2, switches on gpio 15 and LEDs on gpio 14.
    fn default() -> Self {
        let mut pins = Vec::new();
        for id in 40..45 {
            pins.push(PinDescriptor::input(id, 3, GpioPull::Down));
        }
        for id in 80..82 {
            pins.push(PinDescriptor::input(id, 15, GpioPull::Down));
        }
        for id in 82..84 {
            pins.push(PinDescriptor::output(id, 14));
        }
        RegistryConfig {
            threshold: DEFAULT_THRESHOLD,
            bank1: Some(BankConfig::bank1_default()),
            bank2: Some(BankConfig::bank2_default()),
            pins,
            strict_banks: true,
            settle_delay: Duration::ZERO,
        }
    }
}

impl RegistryConfig {
    /// No banks, no descriptors: every id is passed through to the port.
    pub fn physical_only() -> Self {
        RegistryConfig {
            bank1: None,
            bank2: None,
            pins: Vec::new(),
            ..Self::default()
        }
    }

    /// Default banks with a caller-supplied descriptor set.
    pub fn with_pins(pins: Vec<PinDescriptor>) -> Self {
        RegistryConfig {
            pins,
            ..Self::default()
        }
    }

    pub fn bank(&self, bank: BankId) -> Option<&BankConfig> {
        match bank {
            BankId::One => self.bank1.as_ref(),
            BankId::Two => self.bank2.as_ref(),
        }
    }

    /// Checks the bank layout; descriptor checks happen while partitioning.
    pub(crate) fn validate_layout(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(invalid_config("threshold must be at least 1"));
        }
        let mut seen: Vec<(BankId, &BankConfig)> = Vec::new();
        for bank in [BankId::One, BankId::Two] {
            let Some(cfg) = self.bank(bank) else {
                continue;
            };
            if cfg.range.is_empty() {
                return Err(invalid_config(format!("{} has an empty id range", bank)));
            }
            if *cfg.range.start() < self.threshold {
                return Err(invalid_config(format!(
                    "{} range starts at {}, below the threshold {}",
                    bank,
                    cfg.range.start(),
                    self.threshold
                )));
            }
            if cfg.resolved_base() > *cfg.range.start() {
                return Err(invalid_config(format!(
                    "{} base {} is above its range start {}",
                    bank,
                    cfg.resolved_base(),
                    cfg.range.start()
                )));
            }
            if cfg.enabled {
                let lines = cfg.resolved_lines();
                lines.validate()?;
                if let Some(pin) = lines.pins().find(|p| *p >= self.threshold) {
                    return Err(invalid_config(format!(
                        "{} select line {} is not a physical pin",
                        bank, pin
                    )));
                }
            }
            for (other, other_cfg) in &seen {
                if cfg.range.start() <= other_cfg.range.end()
                    && other_cfg.range.start() <= cfg.range.end()
                {
                    return Err(invalid_config(format!(
                        "{} range overlaps {} range",
                        bank, other
                    )));
                }
                if cfg.enabled && other_cfg.enabled {
                    let other_lines = other_cfg.resolved_lines();
                    let shared = cfg
                        .resolved_lines()
                        .pins()
                        .find(|p| other_lines.contains(*p));
                    if let Some(pin) = shared {
                        return Err(invalid_config(format!(
                            "select line {} is shared by {} and {}",
                            pin, other, bank
                        )));
                    }
                }
            }
            seen.push((bank, cfg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_precedence() {
        let mut cfg = BankConfig::bank1_default();
        assert_eq!(cfg.resolved_lines(), BANK1_DEFAULT_LINES);

        cfg.select_b = Some(18);
        cfg.select_c = Some(None);
        assert_eq!(cfg.resolved_lines(), ChannelSelectLines::two_line(4, 18));

        // The list form wins over individual fields.
        cfg.select_lines = Some(ChannelSelectLines::new(5, 6, 13));
        assert_eq!(cfg.resolved_lines(), ChannelSelectLines::new(5, 6, 13));
    }

    #[test]
    fn test_default_wiring() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.threshold, 40);
        assert_eq!(cfg.pins.len(), 9);
        assert_eq!(cfg.bank2.as_ref().unwrap().resolved_lines().channel_count(), 4);
        assert_eq!(cfg.bank1.as_ref().unwrap().resolved_base(), 40);
        assert!(cfg.validate_layout().is_ok());
    }

    #[test]
    fn test_layout_rejects_overlap_and_shared_lines() {
        let mut cfg = RegistryConfig::physical_only();
        cfg.bank1 = Some(BankConfig::new(ChannelSelectLines::new(4, 17, 27), 40..=79));
        cfg.bank2 = Some(BankConfig::new(ChannelSelectLines::two_line(22, 23), 70..=90));
        assert!(cfg.validate_layout().is_err());

        cfg.bank2 = Some(BankConfig::new(ChannelSelectLines::two_line(22, 27), 80..=90));
        assert!(cfg.validate_layout().is_err());

        // A disabled bank owns no lines.
        cfg.bank2 = Some(BankConfig::new(ChannelSelectLines::two_line(22, 27), 80..=90).disabled());
        assert!(cfg.validate_layout().is_ok());
    }

    #[test]
    fn test_layout_rejects_range_below_threshold() {
        let mut cfg = RegistryConfig::physical_only();
        cfg.bank1 = Some(BankConfig::new(ChannelSelectLines::new(4, 17, 27), 30..=39));
        assert!(cfg.validate_layout().is_err());

        cfg.bank1 = Some(BankConfig {
            base: Some(45),
            ..BankConfig::new(ChannelSelectLines::new(4, 17, 27), 40..=47)
        });
        assert!(cfg.validate_layout().is_err());
    }
}
