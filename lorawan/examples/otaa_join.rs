//! Over-the-air activation against a simulated network
//!
//! The radio below loops frames back through an in-process join server, so the
//! whole INIT -> TX -> RX1 -> IDLE cycle runs on a desktop:
//! - join request out, join accept back in the first receive window
//! - one unconfirmed uplink with the derived session keys
//!
//! Run with `cargo run --example otaa_join --features std`.

use aes::cipher::{BlockDecrypt, KeyInit};
use aes::Aes128;
use lorawan_stack::{
    config::{device::AesKey, DeviceClass, SecurityConfig},
    crypto::{Crypto, SoftCrypto},
    event::EventLink,
    hal::{Board, IrqFlags, NonceStorage, Radio, RadioMode, Random, Timer, TimerId},
    lorawan::{
        mac::{FrameType, Mhdr},
        region::{Channel, DynamicPlan, RegionId},
    },
    Error, Session,
};

const DEV_EUI: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
const JOIN_EUI: [u8; 8] = [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01];
const APP_KEY: AesKey = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10,
];
const DEV_ADDR: u32 = 0x2601_1BDA;

static LINK: EventLink = EventLink::with_irq_queue();

/// Radio wired to a join server instead of an antenna
#[derive(Default)]
struct LoopbackRadio {
    pending: Option<Vec<u8>>,
}

impl LoopbackRadio {
    fn join_accept(&self) -> Vec<u8> {
        let mut frame = vec![Mhdr::new(FrameType::JoinAccept).to_byte()];
        frame.extend_from_slice(&[0x01, 0x00, 0x00]); // JoinNonce
        frame.extend_from_slice(&[0x13, 0x00, 0x00]); // NetID
        frame.extend_from_slice(&DEV_ADDR.to_le_bytes());
        frame.extend_from_slice(&[0x00, 0x01]); // DLSettings, RxDelay
        let mic = SoftCrypto::new().aes_cmac(&APP_KEY, &frame).unwrap_or_default();
        frame.extend_from_slice(&mic.to_le_bytes());

        if let Ok(cipher) = Aes128::new_from_slice(&APP_KEY) {
            for block in frame[1..].chunks_exact_mut(16) {
                cipher.decrypt_block(block.into());
            }
        }
        frame
    }
}

impl Radio for LoopbackRadio {
    type Error = ();

    fn set_mode(&mut self, mode: RadioMode) -> Result<(), ()> {
        println!("radio: {:?}", mode);
        Ok(())
    }

    fn configure(&mut self, channel: &Channel) -> Result<(), ()> {
        println!("radio: {} Hz, SF{}", channel.frequency, channel.data_rate.spreading_factor);
        Ok(())
    }

    fn fifo_read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let frame = self.pending.take().ok_or(())?;
        buf[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    fn fifo_write(&mut self, buf: &[u8]) -> Result<(), ()> {
        println!("radio: tx {:02x?}", buf);
        if Mhdr::from_byte(buf[0]).ftype == FrameType::JoinRequest {
            self.pending = Some(self.join_accept());
        }
        Ok(())
    }
}

/// Timers that only log; expiry is simulated by the main loop
struct LogTimer;

impl Timer for LogTimer {
    type Error = ();

    fn start(&mut self, id: TimerId, interval_ms: u32) -> Result<(), ()> {
        println!("timer: {:?} in {} ms", id, interval_ms);
        Ok(())
    }

    fn stop(&mut self, id: TimerId) -> Result<(), ()> {
        println!("timer: {:?} stopped", id);
        Ok(())
    }
}

struct Seed;

impl Random for Seed {
    type Error = ();

    fn init(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

/// Nonce kept in RAM; a device would use flash or EEPROM
#[derive(Default)]
struct RamNonce(u16);

impl NonceStorage for RamNonce {
    type Error = ();

    fn read_join_nonce(&mut self) -> Result<u16, ()> {
        Ok(self.0)
    }

    fn write_join_nonce(&mut self, nonce: u16) -> Result<(), ()> {
        self.0 = nonce;
        Ok(())
    }
}

fn main() -> Result<(), Error> {
    let board = Board::new(
        LoopbackRadio::default(),
        LogTimer,
        SoftCrypto::new(),
        Seed,
        RamNonce::default(),
    );
    let mut session = Session::new(&LINK, board, DynamicPlan::new(), RegionId::EU868);

    session.init(
        DeviceClass::A,
        SecurityConfig::new_otaa(DEV_EUI, JOIN_EUI, APP_KEY),
    )?;
    session.join()?;

    // Interrupts as the hardware would raise them
    LINK.radio_irq(IrqFlags::TX_DONE)?;
    LINK.timer_expired(TimerId::Rx1)?;
    LINK.radio_irq(IrqFlags::RX_DONE)?;
    session.task()?;

    match session.session_keys() {
        Some(keys) => println!("joined as {:08x}", keys.dev_addr),
        None => println!("join failed"),
    }

    session.send_frame(1, b"Hello, LoRaWAN!", false)?;
    LINK.radio_irq(IrqFlags::TX_DONE)?;
    LINK.radio_irq(IrqFlags::RX_TIMEOUT)?;
    LINK.radio_irq(IrqFlags::RX_TIMEOUT)?;
    session.task()?;

    println!(
        "state {:?}, uplink counter {}",
        session.state(),
        session.frame_counters().up
    );
    Ok(())
}
