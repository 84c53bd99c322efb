//! LoRaWAN device stack in Rust
//!
//! This crate provides the device side of a LoRaWAN 1.0.x stack for
//! resource-constrained hardware. It drives the join / transmit / receive
//! window state machine from radio and timer interrupts, encodes and decodes
//! MAC frames into a fixed 255-byte buffer, and manages regional parameters.
//!
//! # Features
//! - Session state machine with two receive windows
//! - Order-enforcing, bounds-checked frame codec
//! - Lock-free event queue between interrupt and task context
//! - OTAA and ABP activation
//! - Dynamic (EU868-style) and fixed (US915/AU915-style) channel plans
//! - Hardware abstraction traits for radio, timers, crypto, random and storage
//! - `no_std`, no heap, no unsafe code
//!
//! # Example
//! ```no_run
//! use lorawan_stack::{
//!     config::{DeviceClass, SecurityConfig},
//!     event::EventLink,
//!     hal::{Board, IrqFlags},
//!     lorawan::region::{DynamicPlan, RegionId},
//!     session::Session,
//! };
//!
//! static LINK: EventLink = EventLink::with_irq_queue();
//!
//! # fn run<H: lorawan_stack::hal::Hal>(board: H) -> Result<(), lorawan_stack::Error> {
//! let mut session = Session::new(&LINK, board, DynamicPlan::new(), RegionId::EU868);
//! session.init(
//!     DeviceClass::A,
//!     SecurityConfig::new_otaa([0x01; 8], [0x02; 8], [0x03; 16]),
//! )?;
//! session.join()?;
//!
//! // From the radio interrupt:
//! LINK.radio_irq(IrqFlags::TX_DONE)?;
//!
//! // From the main loop:
//! session.task()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub(crate) mod fmt;

/// Device and network configuration
pub mod config;

/// Cryptographic functions
pub mod crypto;

/// Stack errors
pub mod error;

/// Interrupt to task event queue
pub mod event;

/// Hardware abstraction layer
pub mod hal;

/// LoRaWAN protocol implementation
pub mod lorawan;

/// Session state machine
pub mod session;

/// Version identifiers
pub mod version;

pub use error::{Error, Result};
pub use session::{Session, State};
pub use version::Version;

/// Version of this stack
pub fn version() -> Version {
    version::STACK_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_version() {
        let v = version();
        assert_eq!((v.major, v.minor, v.patch, v.revision), (1, 0, 4, 0));
    }
}
