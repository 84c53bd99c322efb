//! Hardware abstraction layer
//!
//! Collaborators the session drives but does not implement:
//! - [`Radio`]: mode control and FIFO access
//! - [`Timer`]: the two receive window timers
//! - [`Crypto`]: AES primitives
//! - [`Random`]: entropy source seeding
//! - [`NonceStorage`]: non-volatile join nonce
//!
//! [`Hal`] bundles them so the session carries a single type parameter.

/// Radio interface
pub mod radio;

/// Timer interface
pub mod timer;

pub use crate::crypto::Crypto;
pub use radio::{IrqFlags, Radio, RadioMode};
pub use timer::{Timer, TimerId};

/// Random number source
pub trait Random {
    /// Error type for random source operations
    type Error;

    /// Seed the generator
    fn init(&mut self) -> Result<(), Self::Error>;
}

/// Non-volatile storage of the join nonce
pub trait NonceStorage {
    /// Error type for storage operations
    type Error;

    /// Read the next device nonce to use
    fn read_join_nonce(&mut self) -> Result<u16, Self::Error>;

    /// Persist the next device nonce to use
    fn write_join_nonce(&mut self, nonce: u16) -> Result<(), Self::Error>;
}

/// Bundle of the collaborators a session needs
pub trait Hal {
    /// Radio
    type Radio: Radio;
    /// Timers
    type Timer: Timer;
    /// AES backend
    type Crypto: Crypto;
    /// Random source
    type Random: Random;
    /// Nonce storage
    type Storage: NonceStorage;

    /// Access the radio
    fn radio(&mut self) -> &mut Self::Radio;
    /// Access the timers
    fn timer(&mut self) -> &mut Self::Timer;
    /// Access the AES backend
    fn crypto(&mut self) -> &mut Self::Crypto;
    /// Access the random source
    fn random(&mut self) -> &mut Self::Random;
    /// Access the nonce storage
    fn storage(&mut self) -> &mut Self::Storage;
}

/// [`Hal`] built from individual collaborators
#[derive(Debug)]
pub struct Board<R, T, C, G, S> {
    /// Radio
    pub radio: R,
    /// Timers
    pub timer: T,
    /// AES backend
    pub crypto: C,
    /// Random source
    pub random: G,
    /// Nonce storage
    pub storage: S,
}

impl<R, T, C, G, S> Board<R, T, C, G, S> {
    /// Bundle the collaborators
    pub fn new(radio: R, timer: T, crypto: C, random: G, storage: S) -> Self {
        Self {
            radio,
            timer,
            crypto,
            random,
            storage,
        }
    }
}

impl<R, T, C, G, S> Hal for Board<R, T, C, G, S>
where
    R: Radio,
    T: Timer,
    C: Crypto,
    G: Random,
    S: NonceStorage,
{
    type Radio = R;
    type Timer = T;
    type Crypto = C;
    type Random = G;
    type Storage = S;

    fn radio(&mut self) -> &mut R {
        &mut self.radio
    }

    fn timer(&mut self) -> &mut T {
        &mut self.timer
    }

    fn crypto(&mut self) -> &mut C {
        &mut self.crypto
    }

    fn random(&mut self) -> &mut G {
        &mut self.random
    }

    fn storage(&mut self) -> &mut S {
        &mut self.storage
    }
}
