use heapless::Vec;

use super::{Downlink, Session};
use crate::config::device::{SecurityConfig, SessionKeys};
use crate::crypto::{self, Direction};
use crate::error::{Error, Result};
use crate::event::EventQueue;
use crate::fmt::{debug, error, info, warn};
use crate::hal::{Hal, Radio};
use crate::lorawan::commands::{DownlinkCommand, DownlinkCommands, UplinkCommand};
use crate::lorawan::mac::{FrameContext, FrameType, Mhdr, MAX_FRAME_SIZE, MHDR_SIZE, MIC_SIZE};
use crate::lorawan::region::{CfList, Channel, Region};

/// Extend a received 16-bit frame counter to 32 bits relative to the last
/// accepted one
fn extend_fcnt(last: Option<u32>, fcnt: u16) -> u32 {
    match last {
        None => fcnt as u32,
        Some(last) => {
            let mut full = (last & 0xFFFF_0000) | fcnt as u32;
            if (fcnt as u32) < (last & 0xFFFF) {
                full = full.wrapping_add(0x1_0000);
            }
            full
        }
    }
}

impl<'a, H, R, Q> Session<'a, H, R, Q>
where
    H: Hal,
    R: Region,
    Q: EventQueue,
{
    /// Read the received frame from the radio and process it
    pub(super) fn downlink_handler(&mut self) -> Result<()> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = self.hal.radio().fifo_read(&mut buf).map_err(|_| {
            error!("radio fifo read failed");
            Error::Radio
        })?;
        if !(MHDR_SIZE + MIC_SIZE..=MAX_FRAME_SIZE).contains(&len) {
            error!("downlink of {} bytes", len);
            return Err(Error::InvalidParameters);
        }
        self.last_frame = FrameContext::from_bytes(&buf[..len])?;

        let mhdr = Mhdr::from_byte(buf[0]);
        debug!("downlink {:?}, {} bytes", mhdr.ftype, len);
        match mhdr.ftype {
            FrameType::JoinAccept => self.handle_join_accept(&mut buf[..len]),
            FrameType::UnconfirmedDataDown => self.handle_data_down(&buf[..len], false),
            FrameType::ConfirmedDataDown => self.handle_data_down(&buf[..len], true),
            _ => {
                error!("unexpected downlink {:?}", mhdr.ftype);
                Err(Error::InvalidParameters)
            }
        }
    }

    fn handle_join_accept(&mut self, frame: &mut [u8]) -> Result<()> {
        let app_key = match self.security {
            Some(SecurityConfig::Otaa { app_key, .. }) => app_key,
            _ => return Err(Error::ActivationMismatch),
        };
        let dev_nonce = self.dev_nonce.ok_or_else(|| {
            error!("join accept without a pending join request");
            Error::InvalidParameters
        })?;

        crypto::decrypt_join_accept(self.hal.crypto(), &app_key, &mut frame[MHDR_SIZE..])?;

        let mut ctx = FrameContext::from_bytes(frame)?;
        ctx.read_mhdr()?;
        let accept = ctx.read_join_accept()?;
        let mic = ctx.read_mic()?;
        let expected = crypto::join_accept_mic(self.hal.crypto(), &app_key, &frame[..frame.len() - MIC_SIZE])?;
        if mic != expected {
            error!("join accept MIC mismatch");
            return Err(Error::Crypto);
        }

        let (nwk_s_key, app_s_key) = crypto::derive_session_keys(
            self.hal.crypto(),
            &app_key,
            accept.join_nonce,
            accept.net_id,
            dev_nonce,
        )?;

        if let Some(raw) = accept.cflist {
            match CfList::from_bytes(&raw).and_then(|cflist| self.region.update_channels(&cflist)) {
                Ok(()) => debug!("CFList applied"),
                Err(err) => warn!("CFList ignored: {:?}", err),
            }
        }
        if let Some(params) = self.region_params.as_mut() {
            params.set_rx_delay(accept.rx_delay);
        }

        self.keys = Some(SessionKeys {
            dev_addr: accept.dev_addr,
            nwk_s_key,
            app_s_key,
        });
        self.counters = Default::default();
        self.dev_nonce = None;
        self.mac_answers.clear();
        self.ack_pending = false;
        info!("joined, dev addr {:x}", accept.dev_addr);
        Ok(())
    }

    fn handle_data_down(&mut self, frame: &[u8], confirmed: bool) -> Result<()> {
        let keys = self.keys.ok_or_else(|| {
            error!("data downlink without a session");
            Error::InvalidParameters
        })?;

        let mut ctx = FrameContext::from_bytes(frame)?;
        ctx.read_mhdr()?;
        let fhdr = ctx.read_fhdr()?;
        if fhdr.dev_addr != keys.dev_addr {
            debug!("downlink for {:x} ignored", fhdr.dev_addr);
            return Ok(());
        }
        if ctx.remaining() < MIC_SIZE {
            return Err(Error::InvalidParameters);
        }

        let fcnt = extend_fcnt(self.counters.down, fhdr.fcnt);
        let expected = crypto::data_mic(
            self.hal.crypto(),
            &keys.nwk_s_key,
            keys.dev_addr,
            fcnt,
            Direction::Down,
            &frame[..frame.len() - MIC_SIZE],
        )?;

        let mut port = None;
        let mut payload: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        if ctx.remaining() > MIC_SIZE {
            port = Some(ctx.read_fport()?);
            let len = ctx.remaining() - MIC_SIZE;
            payload
                .extend_from_slice(ctx.read_frmpayload(len)?)
                .map_err(|_| Error::InvalidParameters)?;
        }
        if ctx.read_mic()? != expected {
            error!("downlink MIC mismatch");
            return Err(Error::Crypto);
        }
        if let Some(last) = self.counters.down {
            if fcnt <= last {
                error!("downlink counter {} replayed, last {}", fcnt, last);
                return Err(Error::InvalidParameters);
            }
        }
        self.counters.down = Some(fcnt);
        self.ack_pending = confirmed;

        match port {
            Some(0) => {
                if !fhdr.fopts.is_empty() {
                    error!("MAC commands in both FOpts and FRMPayload");
                    return Err(Error::InvalidParameters);
                }
                crypto::encrypt_frm_payload(
                    self.hal.crypto(),
                    &keys.nwk_s_key,
                    keys.dev_addr,
                    fcnt,
                    Direction::Down,
                    &mut payload,
                )?;
                self.apply_mac_commands(&payload);
            }
            Some(port) => {
                self.apply_mac_commands(&fhdr.fopts);
                crypto::encrypt_frm_payload(
                    self.hal.crypto(),
                    &keys.app_s_key,
                    keys.dev_addr,
                    fcnt,
                    Direction::Down,
                    &mut payload,
                )?;
                info!("downlink {} on port {}, {} bytes", fcnt, port, payload.len());
                self.downlink = Some(Downlink {
                    port,
                    payload,
                    confirmed,
                });
            }
            None => self.apply_mac_commands(&fhdr.fopts),
        }
        Ok(())
    }

    /// Apply the commands the device acts on and queue every answer owed
    fn apply_mac_commands(&mut self, data: &[u8]) {
        for command in DownlinkCommands::new(data) {
            debug!("mac command {:?}", command);
            if let Some(answer) = self.apply_mac_command(command) {
                if answer.encode(&mut self.mac_answers).is_err() {
                    warn!("no room for {:?}", answer);
                }
            }
        }
    }

    /// Apply one command and build its answer from what was actually applied.
    /// A rejected request leaves the region untouched.
    fn apply_mac_command(&mut self, command: DownlinkCommand) -> Option<UplinkCommand> {
        match command {
            DownlinkCommand::LinkCheckAns {
                margin,
                gateway_count,
            } => {
                info!("link check: margin {} dB, {} gateways", margin, gateway_count);
                None
            }
            DownlinkCommand::DeviceTimeAns { .. } => None,
            DownlinkCommand::LinkADRReq {
                data_rate,
                tx_power,
                ch_mask,
                ch_mask_cntl,
                ..
            } => {
                // 0xF keeps the current value; output power is not adjustable
                let power_ack = tx_power == 0 || tx_power == 0x0F;
                let new_rate = match data_rate {
                    0x0F => None,
                    index => self.region.uplink_data_rate(index),
                };
                let data_rate_ack = data_rate == 0x0F || new_rate.is_some();
                let channel_mask_ack = self
                    .region
                    .check_channel_mask(ch_mask, ch_mask_cntl)
                    .is_ok();

                if power_ack && data_rate_ack && channel_mask_ack {
                    let mut applied = self.region.set_channel_mask(ch_mask, ch_mask_cntl);
                    if let (Ok(()), Some(rate)) = (applied, new_rate) {
                        applied = self.region.set_data_rate(rate);
                    }
                    if let Err(err) = applied {
                        warn!("LinkADRReq not applied: {:?}", err);
                    }
                }
                Some(UplinkCommand::LinkADRAns {
                    power_ack,
                    data_rate_ack,
                    channel_mask_ack,
                })
            }
            DownlinkCommand::RXParamSetupReq {
                rx1_dr_offset,
                rx2_data_rate,
                freq,
            } => {
                // RX1 reuses the uplink channel and data rate
                let rx1_dr_offset_ack = rx1_dr_offset == 0;
                let rx2_rate = self.region.downlink_data_rate(rx2_data_rate);
                let channel_ack = freq != 0;

                let mut rx2_data_rate_ack = rx2_rate.is_some();
                if let Some(data_rate) = rx2_rate.filter(|_| rx1_dr_offset_ack && channel_ack) {
                    let channel = Channel {
                        frequency: freq,
                        data_rate,
                    };
                    if let Err(err) = self.region.set_rx2_channel(channel) {
                        warn!("RX2 channel rejected: {:?}", err);
                        rx2_data_rate_ack = false;
                    }
                }
                Some(UplinkCommand::RXParamSetupAns {
                    rx1_dr_offset_ack,
                    rx2_data_rate_ack,
                    channel_ack,
                })
            }
            DownlinkCommand::NewChannelReq {
                ch_index,
                freq,
                max_dr,
                min_dr,
            } => {
                let data_rate_ok = min_dr <= max_dr && self.region.uplink_data_rate(max_dr).is_some();
                let channel_freq_ok = data_rate_ok && self.region.set_channel(ch_index, freq).is_ok();
                Some(UplinkCommand::NewChannelAns {
                    data_rate_ok,
                    channel_freq_ok,
                })
            }
            DownlinkCommand::RXTimingSetupReq { delay } => {
                if let Some(params) = self.region_params.as_mut() {
                    params.set_rx_delay(delay);
                }
                Some(UplinkCommand::RXTimingSetupAns)
            }
            DownlinkCommand::DevStatusReq => Some(UplinkCommand::DevStatusAns {
                battery: 255,
                margin: 0,
            }),
            DownlinkCommand::DutyCycleReq { .. } => Some(UplinkCommand::DutyCycleAns),
            DownlinkCommand::TxParamSetupReq { .. } => Some(UplinkCommand::TxParamSetupAns),
            DownlinkCommand::DlChannelReq { .. } => Some(UplinkCommand::DlChannelAns {
                uplink_freq_exists: false,
                channel_freq_ok: false,
            }),
        }
    }
}
