//! Bus Sampling
//!
//! Packs the counter's output lines into a [`BusReading`]. The reference
//! wiring exposes bits 3–9 and 11–13 of the 14-bit ripple counter; bits 0–2
//! are not wired and bit 10 is reconstructed in software (see
//! [`crate::tracker`]).

use crate::hal::DigitalInput;
use serde::{Deserialize, Serialize};

/// Width of the ripple counter in bits
pub const COUNTER_BITS: u8 = 14;

/// Pulses per full counter wrap (2^14)
pub const COUNTER_WRAP: u64 = 1 << COUNTER_BITS;

/// Most significant counter bit; its falling edge marks an overflow
pub const MSB_BIT: u8 = COUNTER_BITS - 1;

/// Mid bit whose falling edge toggles the reconstructed bit
pub const MID_BIT: u8 = 9;

/// Bit that is never wired and is inferred from [`MID_BIT`]
pub const RECONSTRUCTED_BIT: u8 = 10;

const VALUE_MASK: u16 = (1 << COUNTER_BITS) - 1;

/// One simultaneous snapshot of the counter bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusReading(u16);

impl BusReading {
    /// Reading with the given packed value (bits above 13 are dropped)
    pub const fn new(value: u16) -> Self {
        Self(value & VALUE_MASK)
    }

    /// Packed value
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Level of bit `k`
    pub const fn bit(self, k: u8) -> bool {
        (self.0 >> k) & 1 == 1
    }

    /// Copy of this reading with bit `k` forced to `level`
    pub const fn with_bit(self, k: u8, level: bool) -> Self {
        if level {
            Self::new(self.0 | (1 << k))
        } else {
            Self(self.0 & !(1 << k))
        }
    }

    /// Level of the most significant bit
    pub const fn msb(self) -> bool {
        self.bit(MSB_BIT)
    }

    /// Level of the mid bit that drives reconstruction
    pub const fn mid_bit(self) -> bool {
        self.bit(MID_BIT)
    }
}

impl From<BusReading> for u64 {
    fn from(reading: BusReading) -> Self {
        reading.0 as u64
    }
}

/// Which counter bits are physically wired to input lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusLayout {
    bits: Vec<u8>,
}

impl BusLayout {
    /// The reference wiring: bits 3–9 and 11–13
    pub fn reference() -> Self {
        Self {
            bits: (3..=9).chain(11..COUNTER_BITS).collect(),
        }
    }

    /// Every counter bit except the reconstructed one
    pub fn full() -> Self {
        Self {
            bits: (0..COUNTER_BITS)
                .filter(|&b| b != RECONSTRUCTED_BIT)
                .collect(),
        }
    }

    /// Wired bit positions, in read order
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Smallest step the sampled residue can resolve
    pub fn quantization_step(&self) -> u64 {
        self.bits.iter().min().map(|&b| 1u64 << b).unwrap_or(1)
    }
}

impl Default for BusLayout {
    fn default() -> Self {
        Self::reference()
    }
}

/// A named input line bound to a bit position
pub struct BusLine<I> {
    /// Line name, e.g. "Q4"
    pub name: String,
    /// Logical bit position
    pub bit: u8,
    input: I,
}

impl<I> BusLine<I> {
    /// Bind `input` to bit position `bit`
    pub fn new(name: impl Into<String>, bit: u8, input: I) -> Self {
        Self {
            name: name.into(),
            bit,
            input,
        }
    }
}

/// Reads a fixed, ordered set of lines into one [`BusReading`]
pub struct BusSampler<I> {
    lines: Vec<BusLine<I>>,
}

impl<I: DigitalInput> BusSampler<I> {
    /// Create a sampler over `lines`; positions outside the counter width are ignored
    pub fn new(lines: Vec<BusLine<I>>) -> Self {
        let lines = lines
            .into_iter()
            .filter(|l| l.bit < COUNTER_BITS && l.bit != RECONSTRUCTED_BIT)
            .collect();
        Self { lines }
    }

    /// Read every line back to back and pack the levels
    #[inline]
    pub fn sample(&mut self) -> BusReading {
        let mut packed = 0u16;
        for line in &mut self.lines {
            if line.input.read() {
                packed |= 1 << line.bit;
            }
        }
        BusReading::new(packed)
    }

    /// Read only the MSB and mid-bit lines (the per-edge read)
    #[inline]
    pub fn sample_tracked(&mut self) -> BusReading {
        let mut packed = 0u16;
        for line in &mut self.lines {
            if (line.bit == MSB_BIT || line.bit == MID_BIT) && line.input.read() {
                packed |= 1 << line.bit;
            }
        }
        BusReading::new(packed)
    }

    /// Names and positions of the wired lines
    pub fn lines(&self) -> impl Iterator<Item = (&str, u8)> {
        self.lines.iter().map(|l| (l.name.as_str(), l.bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    impl DigitalInput for Fixed {
        fn read(&mut self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_bit_accessors() {
        let r = BusReading::new(0b10_0010_0000_0000);
        assert!(r.msb());
        assert!(r.mid_bit());
        assert!(!r.bit(RECONSTRUCTED_BIT));
        assert_eq!(r.with_bit(RECONSTRUCTED_BIT, true).value(), 0b10_0110_0000_0000);
        assert_eq!(r.with_bit(MSB_BIT, false).value(), 1 << MID_BIT);
    }

    #[test]
    fn test_new_masks_to_counter_width() {
        assert_eq!(BusReading::new(0xFFFF).value(), 0x3FFF);
    }

    #[test]
    fn test_reference_layout() {
        let layout = BusLayout::reference();
        assert_eq!(layout.bits(), &[3, 4, 5, 6, 7, 8, 9, 11, 12, 13]);
        assert_eq!(layout.quantization_step(), 8);
        assert_eq!(BusLayout::full().bits().len(), 13);
        assert_eq!(BusLayout::full().quantization_step(), 1);
    }

    #[test]
    fn test_sample_packs_levels() {
        let lines = vec![
            BusLine::new("Q4", 3, Fixed(true)),
            BusLine::new("Q10", 9, Fixed(true)),
            BusLine::new("Q12", 11, Fixed(false)),
            BusLine::new("Q14", 13, Fixed(true)),
        ];
        let mut sampler = BusSampler::new(lines);
        assert_eq!(
            sampler.sample().value(),
            (1 << 3) | (1 << MID_BIT) | (1 << MSB_BIT)
        );
        // Restricted read leaves bit 3 out
        assert_eq!(
            sampler.sample_tracked().value(),
            (1 << MID_BIT) | (1 << MSB_BIT)
        );
    }

    #[test]
    fn test_reconstructed_bit_never_sampled() {
        let mut sampler = BusSampler::new(vec![BusLine::new(
            "Q11",
            RECONSTRUCTED_BIT,
            Fixed(true),
        )]);
        assert_eq!(sampler.lines().count(), 0);
        assert_eq!(sampler.sample().value(), 0);
    }
}
