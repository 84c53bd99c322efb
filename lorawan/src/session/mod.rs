//! Session state machine
//!
//! A [`Session`] owns the HAL bundle, the region plan and the protocol state of
//! one device. State lives in the shared [`EventLink`] so interrupt producers
//! can check it, but only the session writes it.
//!
//! ```text
//! INIT -> IDLE -> TX -> RX1 -> RX2 -> IDLE
//!                        \----------> IDLE
//! any failure that breaks the radio/timer/queue contract -> FAULT
//! ```
//!
//! Application entry points: [`Session::init`], [`Session::join`],
//! [`Session::send_frame`] and [`Session::task`]. Interrupt entry points are
//! [`EventLink::radio_irq`] and [`EventLink::timer_expired`].

mod downlink;
mod irq;

use heapless::Vec;

use crate::config::device::{FrameCounters, SecurityConfig, SessionKeys};
use crate::config::DeviceClass;
use crate::crypto::{self, Direction};
use crate::error::{Error, Result};
use crate::event::{Event, EventLink, EventQueue, IrqQueue, EVENT_QUEUE_SIZE};
use crate::fmt::{debug, error, info};
use crate::hal::{Hal, IrqFlags, NonceStorage, Radio, RadioMode, Random, TimerId};
use crate::lorawan::mac::{
    FCtrl, Fhdr, FrameContext, FrameType, JoinRequest, Mhdr, FHDR_FIXED_SIZE, FOPTS_MAX_SIZE,
    MAX_FRAME_SIZE, MHDR_SIZE, MIC_SIZE,
};
use crate::lorawan::region::{Channel, Region, RegionId, RegionParams};
use crate::version::{Version, STACK_VERSION};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum State {
    /// Not initialized
    Init = 0,
    /// Ready for a join or an uplink
    Idle = 1,
    /// Transmitting
    Tx = 2,
    /// First receive window
    Rx1 = 3,
    /// Second receive window
    Rx2 = 4,
    /// Latched after an unrecoverable failure until the next `init`
    Fault = 5,
}

impl State {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => State::Init,
            1 => State::Idle,
            2 => State::Tx,
            3 => State::Rx1,
            4 => State::Rx2,
            _ => State::Fault,
        }
    }
}

/// Lowest application port
pub const FPORT_MIN: u8 = 1;
/// Highest application port
pub const FPORT_MAX: u8 = 223;

/// Application payload received in a downlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downlink {
    /// Application port
    pub port: u8,
    /// Decrypted payload
    pub payload: Vec<u8, MAX_FRAME_SIZE>,
    /// Whether the network asked for an acknowledgment
    pub confirmed: bool,
}

/// Device-side LoRaWAN session
pub struct Session<'a, H, R, Q = IrqQueue<EVENT_QUEUE_SIZE>> {
    link: &'a EventLink<Q>,
    hal: H,
    region: R,
    region_id: RegionId,
    device_class: DeviceClass,
    security: Option<SecurityConfig>,
    region_params: Option<RegionParams>,
    last_frame: FrameContext,
    keys: Option<SessionKeys>,
    counters: FrameCounters,
    /// Device nonce of the join request awaiting an accept
    dev_nonce: Option<u16>,
    /// Encoded MAC answers for the next uplink
    mac_answers: Vec<u8, FOPTS_MAX_SIZE>,
    ack_pending: bool,
    downlink: Option<Downlink>,
}

impl<'a, H, R, Q> Session<'a, H, R, Q>
where
    H: Hal,
    R: Region,
    Q: EventQueue,
{
    /// Create a session in state `INIT` for `region_id`
    pub fn new(link: &'a EventLink<Q>, hal: H, region: R, region_id: RegionId) -> Self {
        Self {
            link,
            hal,
            region,
            region_id,
            device_class: DeviceClass::A,
            security: None,
            region_params: None,
            last_frame: FrameContext::new(),
            keys: None,
            counters: FrameCounters::default(),
            dev_nonce: None,
            mac_answers: Vec::new(),
            ack_pending: false,
            downlink: None,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.link.state()
    }

    fn set_state(&self, state: State) {
        self.link.set_state(state);
    }

    /// Latch `FAULT` and hand the error back
    fn fault(&self, err: Error) -> Error {
        error!("entering FAULT: {:?}", err);
        self.set_state(State::Fault);
        err
    }

    /// Initialize the stack: event queue, random source, radio and region.
    ///
    /// Allowed from any state. Any failing step latches `FAULT`.
    pub fn init(&mut self, device_class: DeviceClass, security: SecurityConfig) -> Result<()> {
        debug!("init: class {:?}, {:?}", device_class, security.activation());

        self.device_class = device_class;
        self.keys = security.abp_keys();
        self.security = Some(security);
        self.region_params = None;
        self.counters = FrameCounters::default();
        self.dev_nonce = None;
        self.mac_answers.clear();
        self.ack_pending = false;
        self.downlink = None;

        if let Err(err) = self.link.queue().create() {
            return Err(self.fault(Error::Queue(err)));
        }
        if self.hal.random().init().is_err() {
            return Err(self.fault(Error::Random));
        }
        if self.hal.radio().set_mode(RadioMode::Sleep).is_err() {
            return Err(self.fault(Error::Radio));
        }
        let params = match self.region.init_params(self.region_id) {
            Ok(params) => params,
            Err(err) => return Err(self.fault(Error::Region(err))),
        };

        self.region_params = Some(params);
        self.set_state(State::Idle);
        info!("init done: region {:?}", params.region);
        Ok(())
    }

    /// Fail unless the session is `IDLE`
    fn expect_idle(&self) -> Result<()> {
        match self.state() {
            State::Init | State::Fault => Err(Error::NotInitialized),
            State::Idle => Ok(()),
            _ => Err(Error::InvalidState),
        }
    }

    /// Start an over-the-air activation by sending a join request
    pub fn join(&mut self) -> Result<()> {
        self.expect_idle()?;
        debug!("join");

        let (dev_eui, join_eui, app_key) = match self.security {
            Some(SecurityConfig::Otaa {
                dev_eui,
                join_eui,
                app_key,
            }) => (dev_eui, join_eui, app_key),
            _ => return Err(Error::ActivationMismatch),
        };

        let channel = self.region.get_channel()?;
        let dev_nonce = self.hal.storage().read_join_nonce().map_err(|_| {
            error!("join nonce read failed");
            Error::Storage
        })?;

        let mut frame = FrameContext::new();
        frame.write_mhdr(&Mhdr::new(FrameType::JoinRequest))?;
        frame.write_join_req(&JoinRequest {
            join_eui,
            dev_eui,
            dev_nonce,
        })?;
        let mic = crypto::join_request_mic(self.hal.crypto(), &app_key, frame.as_bytes())?;
        frame.write_mic(mic)?;

        self.hal
            .storage()
            .write_join_nonce(dev_nonce.wrapping_add(1))
            .map_err(|_| {
                error!("join nonce write failed");
                Error::Storage
            })?;
        self.transmit(&channel, frame)?;

        self.dev_nonce = Some(dev_nonce);
        self.set_state(State::Tx);
        info!("join request sent, dev nonce {}", dev_nonce);
        Ok(())
    }

    /// Send an application uplink on `port` (1-223).
    ///
    /// Needs an active session: ABP, or OTAA after a join accept. Pending MAC
    /// answers ride along in FOpts.
    pub fn send_frame(&mut self, port: u8, payload: &[u8], confirmed: bool) -> Result<()> {
        self.expect_idle()?;
        debug!("send_frame: port {}, {} bytes, confirmed {}", port, payload.len(), confirmed);

        if !(FPORT_MIN..=FPORT_MAX).contains(&port) {
            return Err(Error::InvalidParameters);
        }
        let overhead = MHDR_SIZE + FHDR_FIXED_SIZE + self.mac_answers.len() + 1 + MIC_SIZE;
        if overhead + payload.len() > MAX_FRAME_SIZE {
            return Err(Error::InvalidParameters);
        }
        let keys = self.keys.ok_or(Error::InvalidState)?;
        let channel = self.region.get_channel()?;

        let fcnt = self.counters.up;
        let ftype = if confirmed {
            FrameType::ConfirmedDataUp
        } else {
            FrameType::UnconfirmedDataUp
        };
        let fhdr = Fhdr::new(
            keys.dev_addr,
            FCtrl {
                ack: self.ack_pending,
                ..FCtrl::default()
            },
            fcnt as u16,
            &self.mac_answers,
        )?;

        let mut frm_payload: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        frm_payload
            .extend_from_slice(payload)
            .map_err(|_| Error::InvalidParameters)?;
        crypto::encrypt_frm_payload(
            self.hal.crypto(),
            &keys.app_s_key,
            keys.dev_addr,
            fcnt,
            Direction::Up,
            &mut frm_payload,
        )?;

        let mut frame = FrameContext::new();
        frame.write_mhdr(&Mhdr::new(ftype))?;
        frame.write_fhdr(&fhdr)?;
        frame.write_fport(port)?;
        frame.write_frmpayload(&frm_payload)?;
        let mic = crypto::data_mic(
            self.hal.crypto(),
            &keys.nwk_s_key,
            keys.dev_addr,
            fcnt,
            Direction::Up,
            frame.as_bytes(),
        )?;
        frame.write_mic(mic)?;

        self.transmit(&channel, frame)?;

        self.counters.increment_up();
        self.mac_answers.clear();
        self.ack_pending = false;
        self.set_state(State::Tx);
        info!("uplink {} sent", fcnt);
        Ok(())
    }

    /// Tune the radio, load the frame and start transmitting
    fn transmit(&mut self, channel: &Channel, frame: FrameContext) -> Result<()> {
        debug!("tx on {} Hz, {} bytes", channel.frequency, frame.len());
        if start_tx(self.hal.radio(), channel, frame.as_bytes()).is_err() {
            error!("radio transmit failed");
            return Err(Error::Radio);
        }
        self.last_frame = frame;
        Ok(())
    }

    /// Drain the event queue and run the state machine for each event.
    ///
    /// Returns the last error raised by a handler. A queue failure latches
    /// `FAULT`; once `FAULT` is entered, remaining events are left for `init`
    /// to discard.
    pub fn task(&mut self) -> Result<()> {
        if let State::Init | State::Fault = self.state() {
            return Err(Error::NotInitialized);
        }

        let mut result = Ok(());
        while !self.link.queue().is_empty() {
            let event = match self.link.queue().receive() {
                Ok(event) => event,
                Err(err) => return Err(self.fault(Error::Queue(err))),
            };
            debug!("dispatch {:?} in {:?}", event, self.state());

            let outcome = match event {
                Event::RadioIrq(flags) => self.radio_irq_handler(flags),
                Event::TimerExpired(id) => self.timer_handler(id),
            };
            if let Err(err) = outcome {
                result = Err(err);
            }
            if self.state() == State::Fault {
                break;
            }
        }
        result
    }

    /// Report a radio interrupt, see [`EventLink::radio_irq`]
    pub fn radio_irq(&self, flags: IrqFlags) -> Result<()> {
        self.link.radio_irq(flags)
    }

    /// Report a timer expiry, see [`EventLink::timer_expired`]
    pub fn timer_expired(&self, id: TimerId) -> Result<()> {
        self.link.timer_expired(id)
    }

    /// Take the last application downlink, if any
    pub fn take_downlink(&mut self) -> Option<Downlink> {
        self.downlink.take()
    }

    /// Whether session keys are available
    pub fn is_joined(&self) -> bool {
        self.keys.is_some()
    }

    /// Device class given to `init`
    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    /// Region timing loaded by `init`
    pub fn region_params(&self) -> Option<&RegionParams> {
        self.region_params.as_ref()
    }

    /// Active session keys
    pub fn session_keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    /// Frame counters of the active session
    pub fn frame_counters(&self) -> FrameCounters {
        self.counters
    }

    /// Most recently transmitted or received frame
    pub fn last_frame(&self) -> &[u8] {
        self.last_frame.as_bytes()
    }

    /// Region plan
    pub fn region(&self) -> &R {
        &self.region
    }

    /// Mutable region plan, e.g. to select a sub-band before `init`
    pub fn region_mut(&mut self) -> &mut R {
        &mut self.region
    }

    /// Region module version
    pub fn region_version(&self) -> Version {
        self.region.version()
    }

    /// HAL bundle
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Mutable HAL bundle
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Stack version
    pub fn version(&self) -> Version {
        STACK_VERSION
    }
}

fn start_tx<T: Radio>(radio: &mut T, channel: &Channel, frame: &[u8]) -> core::result::Result<(), T::Error> {
    radio.configure(channel)?;
    radio.fifo_write(frame)?;
    radio.set_mode(RadioMode::Tx)
}
