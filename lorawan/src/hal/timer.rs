/// Receive window timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TimerId {
    /// Opens the first receive window
    Rx1 = 0,
    /// Opens the second receive window
    Rx2 = 1,
}

/// One-shot timers consumed by the session.
///
/// Expiry is reported back through `timer_expired`, typically from the
/// timer interrupt.
pub trait Timer {
    /// Error type for timer operations
    type Error;

    /// Arm `id` to expire after `interval_ms`
    fn start(&mut self, id: TimerId, interval_ms: u32) -> Result<(), Self::Error>;

    /// Disarm `id`
    fn stop(&mut self, id: TimerId) -> Result<(), Self::Error>;
}
