use core::ops::BitOr;

use crate::lorawan::region::Channel;

/// Radio operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioMode {
    /// Lowest power, configuration retained
    Sleep,
    /// Oscillator running, ready to switch
    Standby,
    /// Transmit the FIFO content
    Tx,
    /// Receive a single packet or time out
    RxSingle,
    /// Receive until told otherwise
    RxContinuous,
}

/// Radio interrupt flags, laid out like the SX127x `RegIrqFlags` register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqFlags(u8);

impl IrqFlags {
    /// No interrupt
    pub const NONE: IrqFlags = IrqFlags(0x00);
    /// Transmission complete
    pub const TX_DONE: IrqFlags = IrqFlags(0x08);
    /// Payload CRC error
    pub const CRC_ERROR: IrqFlags = IrqFlags(0x20);
    /// Packet received
    pub const RX_DONE: IrqFlags = IrqFlags(0x40);
    /// Receive window timed out
    pub const RX_TIMEOUT: IrqFlags = IrqFlags(0x80);

    /// Flags from a raw register value
    pub const fn from_bits(bits: u8) -> Self {
        IrqFlags(bits)
    }

    /// Raw register value
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Whether every flag in `other` is set
    pub const fn contains(&self, other: IrqFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl BitOr for IrqFlags {
    type Output = IrqFlags;

    fn bitor(self, rhs: IrqFlags) -> IrqFlags {
        IrqFlags(self.0 | rhs.0)
    }
}

/// Radio interface consumed by the session
pub trait Radio {
    /// Error type for radio operations
    type Error;

    /// Switch the operating mode
    fn set_mode(&mut self, mode: RadioMode) -> Result<(), Self::Error>;

    /// Tune to a channel
    fn configure(&mut self, channel: &Channel) -> Result<(), Self::Error>;

    /// Read the received packet into `buf`, returning its length
    fn fifo_read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Load a packet to transmit
    fn fifo_write(&mut self, buf: &[u8]) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_irq_flags() {
        let flags = IrqFlags::from_bits(0x48);
        assert!(flags.contains(IrqFlags::TX_DONE));
        assert!(flags.contains(IrqFlags::RX_DONE));
        assert!(!flags.contains(IrqFlags::RX_TIMEOUT));
        assert!(!flags.contains(IrqFlags::NONE));
        assert_eq!((IrqFlags::TX_DONE | IrqFlags::RX_TIMEOUT).bits(), 0x88);
    }
}
