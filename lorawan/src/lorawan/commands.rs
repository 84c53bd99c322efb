//! MAC command model
//!
//! Command identifiers overlap between directions (0x03 is `LinkADRReq` from
//! the network and `LinkADRAns` from the device), so each direction has its own
//! enum:
//! - [`UplinkCommand`]: device-originated, encoded into FOpts or a port 0 payload
//! - [`DownlinkCommand`]: network-originated, parsed from FOpts or a port 0 payload

use heapless::Vec;

use super::mac::CodecError;

/// MAC command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandIdentifier {
    LinkCheck = 0x02,
    LinkADR = 0x03,
    DutyCycle = 0x04,
    RXParamSetup = 0x05,
    DevStatus = 0x06,
    NewChannel = 0x07,
    RXTimingSetup = 0x08,
    TxParamSetup = 0x09,
    DlChannel = 0x0A,
    DeviceTime = 0x0D,
}

/// Commands sent by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UplinkCommand {
    /// Link check request
    LinkCheckReq,
    /// Link ADR answer
    LinkADRAns {
        /// Power ACK
        power_ack: bool,
        /// Data rate ACK
        data_rate_ack: bool,
        /// Channel mask ACK
        channel_mask_ack: bool,
    },
    /// Duty cycle answer
    DutyCycleAns,
    /// RX parameter setup answer
    RXParamSetupAns {
        /// RX1 data rate offset ACK
        rx1_dr_offset_ack: bool,
        /// RX2 data rate ACK
        rx2_data_rate_ack: bool,
        /// Channel ACK
        channel_ack: bool,
    },
    /// Device status answer
    DevStatusAns {
        /// Battery level (0 = external power, 1-254 = level, 255 = unknown)
        battery: u8,
        /// Demodulation margin in dB (6-bit signed)
        margin: i8,
    },
    /// New channel answer
    NewChannelAns {
        /// Data rate range OK
        data_rate_ok: bool,
        /// Channel frequency OK
        channel_freq_ok: bool,
    },
    /// RX timing setup answer
    RXTimingSetupAns,
    /// TX parameter setup answer
    TxParamSetupAns,
    /// Downlink channel answer
    DlChannelAns {
        /// Uplink frequency exists
        uplink_freq_exists: bool,
        /// Channel frequency OK
        channel_freq_ok: bool,
    },
    /// Device time request
    DeviceTimeReq,
}

impl UplinkCommand {
    /// Command identifier
    pub fn cid(&self) -> CommandIdentifier {
        match self {
            UplinkCommand::LinkCheckReq => CommandIdentifier::LinkCheck,
            UplinkCommand::LinkADRAns { .. } => CommandIdentifier::LinkADR,
            UplinkCommand::DutyCycleAns => CommandIdentifier::DutyCycle,
            UplinkCommand::RXParamSetupAns { .. } => CommandIdentifier::RXParamSetup,
            UplinkCommand::DevStatusAns { .. } => CommandIdentifier::DevStatus,
            UplinkCommand::NewChannelAns { .. } => CommandIdentifier::NewChannel,
            UplinkCommand::RXTimingSetupAns => CommandIdentifier::RXTimingSetup,
            UplinkCommand::TxParamSetupAns => CommandIdentifier::TxParamSetup,
            UplinkCommand::DlChannelAns { .. } => CommandIdentifier::DlChannel,
            UplinkCommand::DeviceTimeReq => CommandIdentifier::DeviceTime,
        }
    }

    /// Encoded length in bytes, CID included
    pub fn len(&self) -> usize {
        1 + match self {
            UplinkCommand::LinkADRAns { .. }
            | UplinkCommand::RXParamSetupAns { .. }
            | UplinkCommand::NewChannelAns { .. }
            | UplinkCommand::DlChannelAns { .. } => 1,
            UplinkCommand::DevStatusAns { .. } => 2,
            _ => 0,
        }
    }

    /// Append the encoded command to `out`. Nothing is written if it does not fit.
    pub fn encode<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), CodecError> {
        if out.len() + self.len() > N {
            return Err(CodecError::Overflow);
        }

        let mut bytes = [self.cid() as u8, 0, 0];
        match *self {
            UplinkCommand::LinkADRAns {
                power_ack,
                data_rate_ack,
                channel_mask_ack,
            } => {
                bytes[1] = (power_ack as u8) << 2 | (data_rate_ack as u8) << 1 | channel_mask_ack as u8;
            }
            UplinkCommand::RXParamSetupAns {
                rx1_dr_offset_ack,
                rx2_data_rate_ack,
                channel_ack,
            } => {
                bytes[1] = (rx1_dr_offset_ack as u8) << 2 | (rx2_data_rate_ack as u8) << 1 | channel_ack as u8;
            }
            UplinkCommand::DevStatusAns { battery, margin } => {
                bytes[1] = battery;
                bytes[2] = (margin as u8) & 0x3F;
            }
            UplinkCommand::NewChannelAns {
                data_rate_ok,
                channel_freq_ok,
            } => {
                bytes[1] = (data_rate_ok as u8) << 1 | channel_freq_ok as u8;
            }
            UplinkCommand::DlChannelAns {
                uplink_freq_exists,
                channel_freq_ok,
            } => {
                bytes[1] = (uplink_freq_exists as u8) << 1 | channel_freq_ok as u8;
            }
            _ => {}
        }

        out.extend_from_slice(&bytes[..self.len()])
            .map_err(|_| CodecError::Overflow)
    }
}

/// Commands sent by the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DownlinkCommand {
    /// Link check answer
    LinkCheckAns {
        /// Link margin in dB
        margin: u8,
        /// Number of gateways that received the request
        gateway_count: u8,
    },
    /// Link ADR request
    LinkADRReq {
        /// Data rate
        data_rate: u8,
        /// TX power
        tx_power: u8,
        /// Channel mask
        ch_mask: u16,
        /// Channel mask control
        ch_mask_cntl: u8,
        /// Number of transmissions
        nb_trans: u8,
    },
    /// Duty cycle request
    DutyCycleReq {
        /// Maximum duty cycle
        max_duty_cycle: u8,
    },
    /// RX parameter setup request
    RXParamSetupReq {
        /// RX1 data rate offset
        rx1_dr_offset: u8,
        /// RX2 data rate
        rx2_data_rate: u8,
        /// RX2 frequency in Hz
        freq: u32,
    },
    /// Device status request
    DevStatusReq,
    /// New channel request
    NewChannelReq {
        /// Channel index
        ch_index: u8,
        /// Frequency in Hz
        freq: u32,
        /// Maximum data rate
        max_dr: u8,
        /// Minimum data rate
        min_dr: u8,
    },
    /// RX timing setup request
    RXTimingSetupReq {
        /// Delay in seconds (0 means 1)
        delay: u8,
    },
    /// TX parameter setup request
    TxParamSetupReq {
        /// Downlink dwell time
        downlink_dwell_time: bool,
        /// Uplink dwell time
        uplink_dwell_time: bool,
        /// Maximum EIRP
        max_eirp: u8,
    },
    /// Downlink channel request
    DlChannelReq {
        /// Channel index
        ch_index: u8,
        /// Frequency in Hz
        freq: u32,
    },
    /// Device time answer
    DeviceTimeAns {
        /// Seconds since the GPS epoch
        seconds: u32,
        /// Fractional second in 1/256 s steps
        fraction: u8,
    },
}

/// Frequencies are carried as 24-bit multiples of 100 Hz
fn freq_from_bytes(bytes: &[u8]) -> u32 {
    (bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16) * 100
}

impl DownlinkCommand {
    /// Payload length of the command with identifier `cid`, CID excluded
    pub fn payload_len(cid: u8) -> Option<usize> {
        match cid {
            0x02 => Some(2),
            0x03 => Some(4),
            0x04 => Some(1),
            0x05 => Some(4),
            0x06 => Some(0),
            0x07 => Some(5),
            0x08 => Some(1),
            0x09 => Some(1),
            0x0A => Some(4),
            0x0D => Some(5),
            _ => None,
        }
    }

    /// Parse a command from its identifier and payload
    pub fn from_bytes(cid: u8, payload: &[u8]) -> Option<Self> {
        if payload.len() < Self::payload_len(cid)? {
            return None;
        }
        let command = match cid {
            0x02 => DownlinkCommand::LinkCheckAns {
                margin: payload[0],
                gateway_count: payload[1],
            },
            0x03 => DownlinkCommand::LinkADRReq {
                data_rate: payload[0] >> 4,
                tx_power: payload[0] & 0x0F,
                ch_mask: u16::from_le_bytes([payload[1], payload[2]]),
                ch_mask_cntl: (payload[3] >> 4) & 0x07,
                nb_trans: payload[3] & 0x0F,
            },
            0x04 => DownlinkCommand::DutyCycleReq {
                max_duty_cycle: payload[0] & 0x0F,
            },
            0x05 => DownlinkCommand::RXParamSetupReq {
                rx1_dr_offset: (payload[0] >> 4) & 0x07,
                rx2_data_rate: payload[0] & 0x0F,
                freq: freq_from_bytes(&payload[1..4]),
            },
            0x06 => DownlinkCommand::DevStatusReq,
            0x07 => DownlinkCommand::NewChannelReq {
                ch_index: payload[0],
                freq: freq_from_bytes(&payload[1..4]),
                max_dr: payload[4] >> 4,
                min_dr: payload[4] & 0x0F,
            },
            0x08 => DownlinkCommand::RXTimingSetupReq {
                delay: payload[0] & 0x0F,
            },
            0x09 => DownlinkCommand::TxParamSetupReq {
                downlink_dwell_time: (payload[0] & 0x20) != 0,
                uplink_dwell_time: (payload[0] & 0x10) != 0,
                max_eirp: payload[0] & 0x0F,
            },
            0x0A => DownlinkCommand::DlChannelReq {
                ch_index: payload[0],
                freq: freq_from_bytes(&payload[1..4]),
            },
            0x0D => DownlinkCommand::DeviceTimeAns {
                seconds: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
                fraction: payload[4],
            },
            _ => return None,
        };
        Some(command)
    }
}

/// Iterator over the downlink commands packed in a byte stream.
///
/// Stops at the first unknown CID or truncated command, since the length of
/// anything after it cannot be known.
#[derive(Debug, Clone)]
pub struct DownlinkCommands<'a> {
    data: &'a [u8],
}

impl<'a> DownlinkCommands<'a> {
    /// Iterate over the commands in `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for DownlinkCommands<'a> {
    type Item = DownlinkCommand;

    fn next(&mut self) -> Option<Self::Item> {
        let (&cid, rest) = self.data.split_first()?;
        let command = DownlinkCommand::payload_len(cid)
            .filter(|&len| len <= rest.len())
            .and_then(|len| DownlinkCommand::from_bytes(cid, &rest[..len]).map(|c| (c, len)));

        match command {
            Some((command, len)) => {
                self.data = &rest[len..];
                Some(command)
            }
            None => {
                self.data = &[];
                None
            }
        }
    }
}
