use super::{Session, State};
use crate::error::{Error, Result};
use crate::event::EventQueue;
use crate::fmt::{debug, error};
use crate::hal::{Hal, IrqFlags, Radio, RadioMode, Timer, TimerId};
use crate::lorawan::region::Region;

impl<'a, H, R, Q> Session<'a, H, R, Q>
where
    H: Hal,
    R: Region,
    Q: EventQueue,
{
    /// Radio interrupt, dispatched from `task`
    pub(super) fn radio_irq_handler(&mut self, flags: IrqFlags) -> Result<()> {
        let state = self.state();
        debug!("radio irq {:?} in {:?}", flags, state);

        match state {
            State::Tx if flags.contains(IrqFlags::TX_DONE) => self.open_rx_windows(),
            State::Rx1 if flags.contains(IrqFlags::RX_TIMEOUT) => {
                self.set_state(State::Rx2);
                Ok(())
            }
            State::Rx1 if flags.contains(IrqFlags::RX_DONE) => {
                if self.hal.timer().stop(TimerId::Rx2).is_err() {
                    error!("failed to stop RX2 timer");
                    return Err(self.fault(Error::Timer));
                }
                self.downlink_handler()?;
                self.set_state(State::Idle);
                Ok(())
            }
            State::Rx2 if flags.contains(IrqFlags::RX_TIMEOUT) => {
                self.set_state(State::Idle);
                Ok(())
            }
            State::Rx2 if flags.contains(IrqFlags::RX_DONE) => {
                self.downlink_handler()?;
                self.set_state(State::Idle);
                Ok(())
            }
            _ => {
                error!("radio irq {:?} invalid in {:?}", flags, state);
                Err(Error::InvalidState)
            }
        }
    }

    /// Arm both receive window timers after an uplink
    fn open_rx_windows(&mut self) -> Result<()> {
        let params = match self.region_params {
            Some(params) => params,
            None => return Err(self.fault(Error::NotInitialized)),
        };

        let timer = self.hal.timer();
        let started = timer
            .start(TimerId::Rx1, params.rx1_delay_ms)
            .is_ok()
            && timer.start(TimerId::Rx2, params.rx2_delay_ms).is_ok();
        if !started {
            error!("failed to start receive window timers");
            return Err(self.fault(Error::Timer));
        }

        self.set_state(State::Rx1);
        Ok(())
    }

    /// Timer expiry, dispatched from `task`.
    ///
    /// Only the timer of the current window opens the receiver. Any other
    /// expiry is stale (its window already closed) and ignored.
    pub(super) fn timer_handler(&mut self, id: TimerId) -> Result<()> {
        let state = self.state();
        match (state, id) {
            (State::Rx1, TimerId::Rx1) => {
                debug!("RX1 window open");
                self.hal
                    .radio()
                    .set_mode(RadioMode::RxSingle)
                    .map_err(|_| Error::Radio)
            }
            (State::Rx2, TimerId::Rx2) => {
                debug!("RX2 window open");
                let channel = self.region.rx2_channel()?;
                let radio = self.hal.radio();
                let opened = radio.configure(&channel).is_ok() && radio.set_mode(RadioMode::RxSingle).is_ok();
                if !opened {
                    error!("failed to open RX2");
                    return Err(Error::Radio);
                }
                Ok(())
            }
            _ => {
                debug!("stale timer {:?} in {:?}", id, state);
                Ok(())
            }
        }
    }
}
