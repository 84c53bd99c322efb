//! MAC frame codec
//!
//! A [`FrameContext`] wraps the 255-byte frame buffer and a cursor (`eof`).
//! Fields are written and read strictly in protocol order:
//!
//! ```text
//! MHDR | FHDR (DevAddr FCtrl FCnt FOpts) | FPort | FRMPayload | MIC
//! MHDR | JoinEUI DevEUI DevNonce                              | MIC
//! ```
//!
//! Every operation checks the cursor against the offset its field must start
//! at and fails with [`CodecError::OrderViolation`] otherwise. Failed
//! operations leave both the buffer and the cursor untouched. Multi-byte
//! integers are packed little-endian byte by byte.

use core::fmt;

use heapless::Vec;

use crate::config::device::{DevAddr, Eui64};

/// Maximum size of a LoRaWAN frame
pub const MAX_FRAME_SIZE: usize = 255;
/// MAC header size
pub const MHDR_SIZE: usize = 1;
/// Size of the frame header without frame options
pub const FHDR_FIXED_SIZE: usize = 7;
/// Maximum size of the frame options field
pub const FOPTS_MAX_SIZE: usize = 15;
/// Message integrity code size
pub const MIC_SIZE: usize = 4;
/// Join request body size
pub const JOIN_REQUEST_SIZE: usize = 18;
/// Join accept body size without CFList
pub const JOIN_ACCEPT_SIZE: usize = 12;
/// CFList size
pub const CFLIST_SIZE: usize = 16;
/// LoRaWAN R1 major version
pub const LORAWAN_R1: u8 = 0x00;

const MTYPE_OFFSET: u8 = 5;

/// Codec error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// A field was accessed out of protocol order
    OrderViolation,
    /// The access would run past the frame capacity or the received data
    Overflow,
    /// A length field disagrees with the data it describes
    InvalidLength,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::OrderViolation => f.write_str("frame field accessed out of order"),
            CodecError::Overflow => f.write_str("frame buffer overflow"),
            CodecError::InvalidLength => f.write_str("invalid frame field length"),
        }
    }
}

/// MAC frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    JoinRequest = 0x00,
    JoinAccept = 0x01,
    UnconfirmedDataUp = 0x02,
    UnconfirmedDataDown = 0x03,
    ConfirmedDataUp = 0x04,
    ConfirmedDataDown = 0x05,
    Rfu = 0x06,
    Proprietary = 0x07,
}

impl FrameType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0x00 => FrameType::JoinRequest,
            0x01 => FrameType::JoinAccept,
            0x02 => FrameType::UnconfirmedDataUp,
            0x03 => FrameType::UnconfirmedDataDown,
            0x04 => FrameType::ConfirmedDataUp,
            0x05 => FrameType::ConfirmedDataDown,
            0x06 => FrameType::Rfu,
            _ => FrameType::Proprietary,
        }
    }
}

/// MAC header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mhdr {
    /// Frame type
    pub ftype: FrameType,
    /// Reserved bits
    pub rfu: u8,
    /// Major version of the frame format
    pub major: u8,
}

impl Mhdr {
    /// Create a LoRaWAN R1 header for the given frame type
    pub fn new(ftype: FrameType) -> Self {
        Self {
            ftype,
            rfu: 0,
            major: LORAWAN_R1,
        }
    }

    /// Pack into the wire byte
    pub fn to_byte(&self) -> u8 {
        ((self.ftype as u8) << MTYPE_OFFSET) | ((self.rfu & 0x07) << 2) | (self.major & 0x03)
    }

    /// Unpack from the wire byte
    pub fn from_byte(byte: u8) -> Self {
        Self {
            ftype: FrameType::from_bits(byte >> MTYPE_OFFSET),
            rfu: (byte >> 2) & 0x07,
            major: byte & 0x03,
        }
    }
}

/// Frame control field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FCtrl {
    /// Adaptive data rate
    pub adr: bool,
    /// ADR acknowledgment request
    pub adr_ack_req: bool,
    /// Acknowledgment of the last confirmed frame
    pub ack: bool,
    /// Frame pending (downlink) or Class B (uplink)
    pub fpending_classb: bool,
    /// Length of the frame options field
    pub fopts_len: u8,
}

impl FCtrl {
    /// Pack into the wire byte
    pub fn to_byte(&self) -> u8 {
        let mut byte = self.fopts_len & 0x0F;
        if self.adr {
            byte |= 0x80;
        }
        if self.adr_ack_req {
            byte |= 0x40;
        }
        if self.ack {
            byte |= 0x20;
        }
        if self.fpending_classb {
            byte |= 0x10;
        }
        byte
    }

    /// Unpack from the wire byte
    pub fn from_byte(byte: u8) -> Self {
        Self {
            adr: (byte & 0x80) != 0,
            adr_ack_req: (byte & 0x40) != 0,
            ack: (byte & 0x20) != 0,
            fpending_classb: (byte & 0x10) != 0,
            fopts_len: byte & 0x0F,
        }
    }
}

/// Frame header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fhdr {
    /// Device address
    pub dev_addr: DevAddr,
    /// Frame control
    pub fctrl: FCtrl,
    /// Frame counter (16 least significant bits)
    pub fcnt: u16,
    /// Frame options
    pub fopts: Vec<u8, FOPTS_MAX_SIZE>,
}

impl Fhdr {
    /// Create a frame header, deriving `fctrl.fopts_len` from `fopts`
    pub fn new(dev_addr: DevAddr, fctrl: FCtrl, fcnt: u16, fopts: &[u8]) -> Result<Self, CodecError> {
        let fopts = Vec::from_slice(fopts).map_err(|_| CodecError::InvalidLength)?;
        Ok(Self {
            dev_addr,
            fctrl: FCtrl {
                fopts_len: fopts.len() as u8,
                ..fctrl
            },
            fcnt,
            fopts,
        })
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        FHDR_FIXED_SIZE + self.fopts.len()
    }
}

/// Join request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRequest {
    /// Join server identifier
    pub join_eui: Eui64,
    /// End-device identifier
    pub dev_eui: Eui64,
    /// Device nonce
    pub dev_nonce: u16,
}

/// Decrypted join accept body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAccept {
    /// Join server nonce (24 bits)
    pub join_nonce: u32,
    /// Network identifier (24 bits)
    pub net_id: u32,
    /// Assigned device address
    pub dev_addr: DevAddr,
    /// Downlink settings (RX1 DR offset, RX2 data rate)
    pub dl_settings: u8,
    /// RX1 delay in seconds, 0 meaning 1
    pub rx_delay: u8,
    /// Optional channel frequency list
    pub cflist: Option<[u8; CFLIST_SIZE]>,
}

/// Sequential read/write context over a single MAC frame
#[derive(Clone)]
pub struct FrameContext {
    buf: [u8; MAX_FRAME_SIZE],
    eof: usize,
    len: usize,
    sealed: bool,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameContext {
    /// Create an empty context for encoding
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_FRAME_SIZE],
            eof: 0,
            len: 0,
            sealed: false,
        }
    }

    /// Create a context for decoding a received frame
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() > MAX_FRAME_SIZE {
            return Err(CodecError::Overflow);
        }
        let mut ctx = Self::new();
        ctx.buf[..data.len()].copy_from_slice(data);
        ctx.len = data.len();
        Ok(ctx)
    }

    /// The cursor: next offset to write or read
    pub fn eof(&self) -> usize {
        self.eof
    }

    /// Number of valid bytes in the frame
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the frame holds no bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.len - self.eof
    }

    /// The frame bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Move the cursor back to the start of the frame for reading
    pub fn rewind(&mut self) {
        self.eof = 0;
    }

    fn expect_at(&self, offset: usize) -> Result<(), CodecError> {
        if self.eof != offset {
            return Err(CodecError::OrderViolation);
        }
        Ok(())
    }

    fn expect_past(&self, offset: usize) -> Result<(), CodecError> {
        if self.eof < offset {
            return Err(CodecError::OrderViolation);
        }
        Ok(())
    }

    fn expect_writable(&self, n: usize) -> Result<(), CodecError> {
        if self.sealed {
            return Err(CodecError::OrderViolation);
        }
        if self.eof + n > MAX_FRAME_SIZE {
            return Err(CodecError::Overflow);
        }
        Ok(())
    }

    fn expect_readable(&self, n: usize) -> Result<(), CodecError> {
        if self.eof + n > self.len {
            return Err(CodecError::Overflow);
        }
        Ok(())
    }

    fn put(&mut self, byte: u8) {
        self.buf[self.eof] = byte;
        self.eof += 1;
        self.len = self.eof;
    }

    fn put_slice(&mut self, bytes: &[u8]) {
        self.buf[self.eof..self.eof + bytes.len()].copy_from_slice(bytes);
        self.eof += bytes.len();
        self.len = self.eof;
    }

    fn get(&mut self) -> u8 {
        let byte = self.buf[self.eof];
        self.eof += 1;
        byte
    }

    fn get_u16(&mut self) -> u16 {
        let mut value = self.get() as u16;
        value |= (self.get() as u16) << 8;
        value
    }

    fn get_u24(&mut self) -> u32 {
        let mut value = self.get() as u32;
        value |= (self.get() as u32) << 8;
        value |= (self.get() as u32) << 16;
        value
    }

    fn get_u32(&mut self) -> u32 {
        let mut value = self.get_u24();
        value |= (self.get() as u32) << 24;
        value
    }

    fn put_u16(&mut self, value: u16) {
        self.put(value as u8);
        self.put((value >> 8) as u8);
    }

    fn put_u32(&mut self, value: u32) {
        self.put(value as u8);
        self.put((value >> 8) as u8);
        self.put((value >> 16) as u8);
        self.put((value >> 24) as u8);
    }

    /// Write the MAC header. The cursor must be at the start of the frame.
    pub fn write_mhdr(&mut self, mhdr: &Mhdr) -> Result<(), CodecError> {
        self.expect_at(0)?;
        self.expect_writable(MHDR_SIZE)?;
        self.put(mhdr.to_byte());
        Ok(())
    }

    /// Read the MAC header. The cursor must be at the start of the frame.
    pub fn read_mhdr(&mut self) -> Result<Mhdr, CodecError> {
        self.expect_at(0)?;
        self.expect_readable(MHDR_SIZE)?;
        Ok(Mhdr::from_byte(self.get()))
    }

    /// Write the frame header directly after the MAC header
    pub fn write_fhdr(&mut self, fhdr: &Fhdr) -> Result<(), CodecError> {
        self.expect_at(MHDR_SIZE)?;
        if fhdr.fctrl.fopts_len as usize != fhdr.fopts.len() {
            return Err(CodecError::InvalidLength);
        }
        self.expect_writable(fhdr.len())?;

        self.put_u32(fhdr.dev_addr);
        self.put(fhdr.fctrl.to_byte());
        self.put_u16(fhdr.fcnt);
        self.put_slice(&fhdr.fopts);
        Ok(())
    }

    /// Read the frame header directly after the MAC header
    pub fn read_fhdr(&mut self) -> Result<Fhdr, CodecError> {
        self.expect_at(MHDR_SIZE)?;
        self.expect_readable(FHDR_FIXED_SIZE)?;
        let fctrl = FCtrl::from_byte(self.buf[self.eof + 4]);
        self.expect_readable(FHDR_FIXED_SIZE + fctrl.fopts_len as usize)?;

        let dev_addr = self.get_u32();
        self.get();
        let fcnt = self.get_u16();
        let mut fopts = Vec::new();
        for _ in 0..fctrl.fopts_len {
            // fopts_len is at most 15, the capacity of `fopts`
            let _ = fopts.push(self.get());
        }

        Ok(Fhdr {
            dev_addr,
            fctrl,
            fcnt,
            fopts,
        })
    }

    /// Write the frame port after the frame header
    pub fn write_fport(&mut self, fport: u8) -> Result<(), CodecError> {
        self.expect_past(MHDR_SIZE + FHDR_FIXED_SIZE)?;
        self.expect_writable(1)?;
        self.put(fport);
        Ok(())
    }

    /// Read the frame port after the frame header
    pub fn read_fport(&mut self) -> Result<u8, CodecError> {
        self.expect_past(MHDR_SIZE + FHDR_FIXED_SIZE)?;
        self.expect_readable(1)?;
        Ok(self.get())
    }

    /// Append `payload` at the cursor
    pub fn write_frmpayload(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        self.expect_writable(payload.len())?;
        self.put_slice(payload);
        Ok(())
    }

    /// Read `len` payload bytes at the cursor, which must be past the frame header
    pub fn read_frmpayload(&mut self, len: usize) -> Result<&[u8], CodecError> {
        self.expect_past(MHDR_SIZE + FHDR_FIXED_SIZE)?;
        self.expect_readable(len)?;
        let start = self.eof;
        self.eof += len;
        Ok(&self.buf[start..self.eof])
    }

    /// Write the join request body directly after the MAC header
    pub fn write_join_req(&mut self, req: &JoinRequest) -> Result<(), CodecError> {
        self.expect_at(MHDR_SIZE)?;
        self.expect_writable(JOIN_REQUEST_SIZE)?;
        self.put_slice(&req.join_eui);
        self.put_slice(&req.dev_eui);
        self.put_u16(req.dev_nonce);
        Ok(())
    }

    /// Read a decrypted join accept body directly after the MAC header.
    ///
    /// The body must be followed by exactly the MIC; a CFList is present when
    /// the frame is long enough to carry one.
    pub fn read_join_accept(&mut self) -> Result<JoinAccept, CodecError> {
        self.expect_at(MHDR_SIZE)?;
        let has_cflist = match self.remaining() {
            n if n == JOIN_ACCEPT_SIZE + MIC_SIZE => false,
            n if n == JOIN_ACCEPT_SIZE + CFLIST_SIZE + MIC_SIZE => true,
            _ => return Err(CodecError::InvalidLength),
        };

        let join_nonce = self.get_u24();
        let net_id = self.get_u24();
        let dev_addr = self.get_u32();
        let dl_settings = self.get();
        let rx_delay = self.get();
        let cflist = if has_cflist {
            let mut cflist = [0u8; CFLIST_SIZE];
            cflist.copy_from_slice(&self.buf[self.eof..self.eof + CFLIST_SIZE]);
            self.eof += CFLIST_SIZE;
            Some(cflist)
        } else {
            None
        };

        Ok(JoinAccept {
            join_nonce,
            net_id,
            dev_addr,
            dl_settings,
            rx_delay,
            cflist,
        })
    }

    /// Append the message integrity code and seal the frame.
    ///
    /// The MIC closes the frame: it needs at least a MAC header and a fixed
    /// frame header worth of bytes before it, and nothing may be written after it.
    pub fn write_mic(&mut self, mic: u32) -> Result<(), CodecError> {
        self.expect_past(MHDR_SIZE + FHDR_FIXED_SIZE)?;
        self.expect_writable(MIC_SIZE)?;
        self.put_u32(mic);
        self.sealed = true;
        Ok(())
    }

    /// Read the message integrity code, which must be the last 4 bytes
    pub fn read_mic(&mut self) -> Result<u32, CodecError> {
        self.expect_past(MHDR_SIZE)?;
        if self.remaining() != MIC_SIZE {
            return Err(CodecError::OrderViolation);
        }
        Ok(self.get_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fhdr() -> Fhdr {
        Fhdr::new(
            0xAA55_BEEF,
            FCtrl {
                fpending_classb: true,
                adr_ack_req: true,
                ..FCtrl::default()
            },
            0xFEED,
            &[0xDE, 0xAD, 0xBE, 0xEF, 0xAA],
        )
        .unwrap()
    }

    #[test]
    fn test_mhdr_pack() {
        let mhdr = Mhdr::new(FrameType::ConfirmedDataDown);
        assert_eq!(mhdr.to_byte(), 0xA0);
        assert_eq!(Mhdr::from_byte(0xA0), mhdr);
        assert_eq!(Mhdr::from_byte(0xAA).to_byte(), 0xAA);
    }

    #[test]
    fn test_fctrl_pack() {
        let fctrl = FCtrl::from_byte(0x55);
        assert_eq!(fctrl.fopts_len, 5);
        assert!(fctrl.fpending_classb);
        assert!(!fctrl.ack);
        assert!(fctrl.adr_ack_req);
        assert!(!fctrl.adr);
        assert_eq!(fctrl.to_byte(), 0x55);
    }

    #[test]
    fn test_write_mhdr() {
        let mut ctx = FrameContext::new();
        ctx.write_mhdr(&Mhdr::new(FrameType::ConfirmedDataDown)).unwrap();
        assert_eq!(ctx.eof(), 1);
        assert_eq!(ctx.as_bytes(), &[0xA0]);

        assert_eq!(
            ctx.write_mhdr(&Mhdr::new(FrameType::JoinRequest)),
            Err(CodecError::OrderViolation)
        );
        assert_eq!(ctx.as_bytes(), &[0xA0]);
    }

    #[test]
    fn test_write_fhdr_little_endian() {
        let mut ctx = FrameContext::new();
        ctx.write_mhdr(&Mhdr::new(FrameType::ConfirmedDataDown)).unwrap();
        ctx.write_fhdr(&sample_fhdr()).unwrap();

        assert_eq!(ctx.eof(), 0x0D);
        assert_eq!(
            ctx.as_bytes(),
            &[0xA0, 0xEF, 0xBE, 0x55, 0xAA, 0x55, 0xED, 0xFE, 0xDE, 0xAD, 0xBE, 0xEF, 0xAA]
        );
    }

    #[test]
    fn test_write_fhdr_out_of_order() {
        let mut ctx = FrameContext::new();
        assert_eq!(ctx.write_fhdr(&sample_fhdr()), Err(CodecError::OrderViolation));
        assert_eq!(ctx.eof(), 0);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_write_fhdr_fopts_len_mismatch() {
        let mut fhdr = sample_fhdr();
        fhdr.fctrl.fopts_len = 3;
        let mut ctx = FrameContext::new();
        ctx.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        assert_eq!(ctx.write_fhdr(&fhdr), Err(CodecError::InvalidLength));
        assert_eq!(ctx.eof(), 1);
    }

    #[test]
    fn test_fhdr_rejects_long_fopts() {
        assert_eq!(
            Fhdr::new(0, FCtrl::default(), 0, &[0u8; 16]),
            Err(CodecError::InvalidLength)
        );
    }

    #[test]
    fn test_read_fhdr() {
        let mut ctx = FrameContext::from_bytes(&[
            0xA0, 0xEF, 0xBE, 0x55, 0xAA, 0x55, 0xED, 0xFE, 0xDE, 0xAD, 0xBE, 0xEF, 0xAA,
        ])
        .unwrap();

        assert_eq!(ctx.read_fhdr(), Err(CodecError::OrderViolation));
        ctx.read_mhdr().unwrap();
        let fhdr = ctx.read_fhdr().unwrap();

        assert_eq!(ctx.eof(), 13);
        assert_eq!(fhdr.dev_addr, 0xAA55_BEEF);
        assert_eq!(fhdr.fcnt, 0xFEED);
        assert_eq!(fhdr.fctrl.to_byte(), 0x55);
        assert_eq!(&fhdr.fopts[..], &[0xDE, 0xAD, 0xBE, 0xEF, 0xAA]);
    }

    #[test]
    fn test_read_fhdr_truncated_fopts() {
        // FCtrl announces 5 option bytes but only 2 follow
        let mut ctx =
            FrameContext::from_bytes(&[0x60, 0x01, 0x02, 0x03, 0x04, 0x05, 0x00, 0x00, 0x11, 0x22])
                .unwrap();
        ctx.read_mhdr().unwrap();
        assert_eq!(ctx.read_fhdr(), Err(CodecError::Overflow));
        assert_eq!(ctx.eof(), 1);
    }

    #[test]
    fn test_fhdr_round_trip() {
        let fhdr = sample_fhdr();
        let mut ctx = FrameContext::new();
        ctx.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        ctx.write_fhdr(&fhdr).unwrap();

        ctx.rewind();
        assert_eq!(ctx.read_mhdr().unwrap().ftype, FrameType::UnconfirmedDataUp);
        assert_eq!(ctx.read_fhdr().unwrap(), fhdr);
    }

    #[test]
    fn test_fport() {
        let mut ctx = FrameContext::new();
        assert_eq!(ctx.write_fport(0x55), Err(CodecError::OrderViolation));

        ctx.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        ctx.write_fhdr(&Fhdr::new(1, FCtrl::default(), 1, &[]).unwrap()).unwrap();
        ctx.write_fport(0x55).unwrap();
        assert_eq!(ctx.eof(), 9);
        assert_eq!(ctx.as_bytes()[8], 0x55);

        ctx.rewind();
        assert_eq!(ctx.read_fport(), Err(CodecError::OrderViolation));
        ctx.read_mhdr().unwrap();
        ctx.read_fhdr().unwrap();
        assert_eq!(ctx.read_fport(), Ok(0x55));
    }

    #[test]
    fn test_frmpayload() {
        let mut ctx = FrameContext::new();
        ctx.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        ctx.write_fhdr(&Fhdr::new(1, FCtrl::default(), 1, &[]).unwrap()).unwrap();
        ctx.write_fport(2).unwrap();
        ctx.write_frmpayload(&[0x55, 0xAA]).unwrap();
        assert_eq!(ctx.eof(), 11);

        let mut rx = FrameContext::from_bytes(ctx.as_bytes()).unwrap();
        assert_eq!(rx.read_frmpayload(2), Err(CodecError::OrderViolation));
        rx.read_mhdr().unwrap();
        rx.read_fhdr().unwrap();
        rx.read_fport().unwrap();
        assert_eq!(rx.read_frmpayload(3), Err(CodecError::Overflow));
        assert_eq!(rx.read_frmpayload(2).unwrap(), &[0x55, 0xAA]);
        assert_eq!(rx.remaining(), 0);
    }

    #[test]
    fn test_write_overflow() {
        let mut ctx = FrameContext::new();
        ctx.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        ctx.write_fhdr(&Fhdr::new(1, FCtrl::default(), 1, &[]).unwrap()).unwrap();
        ctx.write_fport(1).unwrap();
        ctx.write_frmpayload(&[0u8; 240]).unwrap();
        assert_eq!(ctx.eof(), 249);

        assert_eq!(ctx.write_frmpayload(&[0u8; 7]), Err(CodecError::Overflow));
        assert_eq!(ctx.eof(), 249);

        ctx.write_frmpayload(&[0u8; 3]).unwrap();
        assert_eq!(ctx.write_mic(0xAA55_FEED), Err(CodecError::Overflow));
        assert_eq!(ctx.eof(), 252);

        let mut full = FrameContext::new();
        full.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        full.write_fhdr(&Fhdr::new(1, FCtrl::default(), 1, &[]).unwrap()).unwrap();
        full.write_frmpayload(&[0u8; 243]).unwrap();
        full.write_mic(0).unwrap();
        assert_eq!(full.len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_from_bytes_overflow() {
        assert!(FrameContext::from_bytes(&[0u8; 256]).is_err());
    }

    #[test]
    fn test_write_mic_little_endian() {
        let mut ctx = FrameContext::new();
        ctx.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        ctx.write_fhdr(&Fhdr::new(1, FCtrl::default(), 1, &[]).unwrap()).unwrap();
        ctx.write_mic(0xAA55_FEED).unwrap();

        assert_eq!(ctx.eof(), 12);
        assert_eq!(&ctx.as_bytes()[8..], &[0xED, 0xFE, 0x55, 0xAA]);
    }

    #[test]
    fn test_write_mic_seals_frame() {
        let mut ctx = FrameContext::new();
        assert_eq!(ctx.write_mic(1), Err(CodecError::OrderViolation));

        ctx.write_mhdr(&Mhdr::new(FrameType::UnconfirmedDataUp)).unwrap();
        ctx.write_fhdr(&Fhdr::new(1, FCtrl::default(), 1, &[]).unwrap()).unwrap();
        ctx.write_mic(1).unwrap();

        assert_eq!(ctx.write_frmpayload(&[1]), Err(CodecError::OrderViolation));
        assert_eq!(ctx.write_mic(2), Err(CodecError::OrderViolation));
        assert_eq!(ctx.len(), 12);
    }

    #[test]
    fn test_write_join_req() {
        let req = JoinRequest {
            join_eui: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
            dev_eui: [0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18],
            dev_nonce: 0xBEEF,
        };
        let mut ctx = FrameContext::new();
        assert_eq!(ctx.write_join_req(&req), Err(CodecError::OrderViolation));

        ctx.write_mhdr(&Mhdr::new(FrameType::JoinRequest)).unwrap();
        ctx.write_join_req(&req).unwrap();
        ctx.write_mic(0x0403_0201).unwrap();

        let bytes = ctx.as_bytes();
        assert_eq!(bytes.len(), MHDR_SIZE + JOIN_REQUEST_SIZE + MIC_SIZE);
        assert_eq!(bytes[0], 0x00);
        assert_eq!(&bytes[1..9], &req.join_eui);
        assert_eq!(&bytes[9..17], &req.dev_eui);
        assert_eq!(&bytes[17..19], &[0xEF, 0xBE]);
        assert_eq!(&bytes[19..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_read_join_accept() {
        let mut frame = [0u8; 1 + JOIN_ACCEPT_SIZE + CFLIST_SIZE + MIC_SIZE];
        frame[0] = 0x20;
        frame[1..4].copy_from_slice(&[0x01, 0x02, 0x03]);
        frame[4..7].copy_from_slice(&[0x13, 0x00, 0x00]);
        frame[7..11].copy_from_slice(&[0xEF, 0xBE, 0x55, 0xAA]);
        frame[11] = 0x12;
        frame[12] = 0x05;
        frame[13] = 0x18;
        frame[28] = 0x00;
        frame[29..].copy_from_slice(&[0xED, 0xFE, 0x55, 0xAA]);

        let mut ctx = FrameContext::from_bytes(&frame).unwrap();
        assert_eq!(ctx.read_mhdr().unwrap().ftype, FrameType::JoinAccept);
        let accept = ctx.read_join_accept().unwrap();
        assert_eq!(accept.join_nonce, 0x03_0201);
        assert_eq!(accept.net_id, 0x13);
        assert_eq!(accept.dev_addr, 0xAA55_BEEF);
        assert_eq!(accept.dl_settings, 0x12);
        assert_eq!(accept.rx_delay, 5);
        assert_eq!(accept.cflist.unwrap()[0], 0x18);
        assert_eq!(ctx.read_mic(), Ok(0xAA55_FEED));

        let mut short = FrameContext::from_bytes(&frame[..20]).unwrap();
        short.read_mhdr().unwrap();
        assert_eq!(short.read_join_accept(), Err(CodecError::InvalidLength));
    }

    #[test]
    fn test_read_mic_requires_tail() {
        let mut ctx = FrameContext::from_bytes(&[0x60, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5]).unwrap();
        ctx.read_mhdr().unwrap();
        assert_eq!(ctx.read_mic(), Err(CodecError::OrderViolation));
        ctx.read_fhdr().unwrap();
        assert_eq!(ctx.read_fport(), Ok(1));
        assert_eq!(ctx.read_mic(), Ok(0x0504_0302));
    }
}
