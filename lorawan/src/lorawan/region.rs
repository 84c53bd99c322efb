//! Regional parameters and channel plans
//!
//! - [`RegionParams`]: receive window timing for the selected region
//! - [`DynamicPlan`]: EU868-style plans with default channels and CFList frequencies
//! - [`FixedPlan`]: US915/AU915-style plans with 72 channels and sub-bands

use core::fmt;

use heapless::Vec;

use crate::version::{Version, REGION_VERSION};

/// Region identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionId {
    EU868,
    US915,
    CN779,
    EU433,
    AU915,
    CN470,
    AS923,
    KR920,
    IN865,
    RU864,
}

/// Region error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionError {
    /// The plan does not serve the requested region
    Unsupported,
    /// No channel is available for transmission
    NoChannel,
    /// The CFList is malformed or does not apply to this plan
    InvalidCfList,
    /// The channel, channel mask or data rate is not valid for this plan
    InvalidChannel,
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::Unsupported => f.write_str("unsupported region"),
            RegionError::NoChannel => f.write_str("no channel available"),
            RegionError::InvalidCfList => f.write_str("invalid CFList"),
            RegionError::InvalidChannel => f.write_str("invalid channel, mask or data rate"),
        }
    }
}

/// Default RX1 delay in milliseconds
pub const RECEIVE_DELAY1_MS: u32 = 1000;
/// Default RX2 delay in milliseconds
pub const RECEIVE_DELAY2_MS: u32 = 2000;

/// Receive window timing of the active region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegionParams {
    /// Active region
    pub region: RegionId,
    /// Delay from end of uplink to RX1 in milliseconds
    pub rx1_delay_ms: u32,
    /// Delay from end of uplink to RX2 in milliseconds
    pub rx2_delay_ms: u32,
}

impl RegionParams {
    /// Default timing for `region`
    pub fn for_region(region: RegionId) -> Self {
        Self {
            region,
            rx1_delay_ms: RECEIVE_DELAY1_MS,
            rx2_delay_ms: RECEIVE_DELAY2_MS,
        }
    }

    /// Apply an RX delay in seconds as carried by a join accept or
    /// `RXTimingSetupReq`. 0 means 1 s; RX2 opens one second after RX1.
    pub fn set_rx_delay(&mut self, delay_s: u8) {
        let delay_s = (delay_s & 0x0F).max(1) as u32;
        self.rx1_delay_ms = delay_s * 1000;
        self.rx2_delay_ms = self.rx1_delay_ms + 1000;
    }
}

/// LoRa data rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataRate {
    /// Spreading factor (7-12)
    pub spreading_factor: u8,
    /// Bandwidth in Hz
    pub bandwidth: u32,
}

impl DataRate {
    /// SF12 / 125 kHz
    pub const SF12BW125: DataRate = DataRate::new(12, 125_000);
    /// SF10 / 125 kHz
    pub const SF10BW125: DataRate = DataRate::new(10, 125_000);
    /// SF7 / 125 kHz
    pub const SF7BW125: DataRate = DataRate::new(7, 125_000);
    /// SF8 / 500 kHz
    pub const SF8BW500: DataRate = DataRate::new(8, 500_000);
    /// SF12 / 500 kHz
    pub const SF12BW500: DataRate = DataRate::new(12, 500_000);

    /// Create a LoRa data rate
    pub const fn new(spreading_factor: u8, bandwidth: u32) -> Self {
        Self {
            spreading_factor,
            bandwidth,
        }
    }
}

/// Radio channel: frequency and modulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel {
    /// Channel frequency in Hz
    pub frequency: u32,
    /// Data rate
    pub data_rate: DataRate,
}

/// Number of frequencies in a dynamic CFList
pub const CFLIST_FREQUENCIES: usize = 5;
/// Number of channel-mask groups in a fixed CFList
pub const CFLIST_MASKS: usize = 6;

/// Channel frequency list sent in a join accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CfList {
    /// Type 0: up to five additional frequencies in Hz, 0 for unused
    Frequencies([u32; CFLIST_FREQUENCIES]),
    /// Type 1: channel mask groups of 16 channels each
    ChannelMask([u16; CFLIST_MASKS]),
}

impl CfList {
    /// Parse the 16-byte wire form. The last byte is the list type.
    pub fn from_bytes(bytes: &[u8; 16]) -> Result<Self, RegionError> {
        match bytes[15] {
            0 => {
                let mut freqs = [0u32; CFLIST_FREQUENCIES];
                for (freq, raw) in freqs.iter_mut().zip(bytes[..15].chunks_exact(3)) {
                    *freq = (raw[0] as u32 | (raw[1] as u32) << 8 | (raw[2] as u32) << 16) * 100;
                }
                Ok(CfList::Frequencies(freqs))
            }
            1 => {
                let mut masks = [0u16; CFLIST_MASKS];
                for (mask, raw) in masks.iter_mut().zip(bytes[..12].chunks_exact(2)) {
                    *mask = u16::from_le_bytes([raw[0], raw[1]]);
                }
                Ok(CfList::ChannelMask(masks))
            }
            _ => Err(RegionError::InvalidCfList),
        }
    }
}

/// Channel plan of a region
pub trait Region {
    /// Load the default channel plan of `region` and return its timing
    fn init_params(&mut self, region: RegionId) -> Result<RegionParams, RegionError>;

    /// Next channel to transmit on
    fn get_channel(&mut self) -> Result<Channel, RegionError>;

    /// Apply a CFList received in a join accept
    fn update_channels(&mut self, cflist: &CfList) -> Result<(), RegionError>;

    /// Channel used by the second receive window
    fn rx2_channel(&self) -> Result<Channel, RegionError>;

    /// Uplink data rate with index `index`
    fn uplink_data_rate(&self, _index: u8) -> Option<DataRate> {
        None
    }

    /// Downlink data rate with index `index`
    fn downlink_data_rate(&self, _index: u8) -> Option<DataRate> {
        None
    }

    /// Transmit with `data_rate` from now on
    fn set_data_rate(&mut self, _data_rate: DataRate) -> Result<(), RegionError> {
        Err(RegionError::Unsupported)
    }

    /// Check a `LinkADRReq` channel mask against the plan without applying it
    fn check_channel_mask(&self, _mask: u16, _control: u8) -> Result<(), RegionError> {
        Err(RegionError::Unsupported)
    }

    /// Apply a `LinkADRReq` channel mask. Nothing changes on error.
    fn set_channel_mask(&mut self, _mask: u16, _control: u8) -> Result<(), RegionError> {
        Err(RegionError::Unsupported)
    }

    /// Create or replace the channel at `index`; frequency 0 removes it
    fn set_channel(&mut self, _index: u8, _frequency: u32) -> Result<(), RegionError> {
        Err(RegionError::Unsupported)
    }

    /// Move the second receive window
    fn set_rx2_channel(&mut self, _channel: Channel) -> Result<(), RegionError> {
        Err(RegionError::Unsupported)
    }

    /// Region module version
    fn version(&self) -> Version {
        REGION_VERSION
    }
}

/// Channel slots of a dynamic plan
pub const DYNAMIC_CHANNELS: usize = 16;
const DEFAULT_CHANNELS_MAX: usize = 3;

/// DR0-DR6 of dynamic plans
const DYNAMIC_DATA_RATES: [DataRate; 7] = [
    DataRate::SF12BW125,
    DataRate::new(11, 125_000),
    DataRate::SF10BW125,
    DataRate::new(9, 125_000),
    DataRate::new(8, 125_000),
    DataRate::SF7BW125,
    DataRate::new(7, 250_000),
];

struct DynamicDefaults {
    channels: &'static [u32],
    rx2: Channel,
}

fn dynamic_defaults(region: RegionId) -> Option<DynamicDefaults> {
    let (channels, rx2): (&'static [u32], Channel) = match region {
        RegionId::EU868 => (
            &[868_100_000, 868_300_000, 868_500_000],
            Channel { frequency: 869_525_000, data_rate: DataRate::SF12BW125 },
        ),
        RegionId::EU433 => (
            &[433_175_000, 433_375_000, 433_575_000],
            Channel { frequency: 434_665_000, data_rate: DataRate::SF12BW125 },
        ),
        RegionId::CN779 => (
            &[779_500_000, 779_700_000, 779_900_000],
            Channel { frequency: 786_000_000, data_rate: DataRate::SF12BW125 },
        ),
        RegionId::IN865 => (
            &[865_062_500, 865_402_500, 865_985_000],
            Channel { frequency: 866_550_000, data_rate: DataRate::SF10BW125 },
        ),
        RegionId::RU864 => (
            &[868_900_000, 869_100_000],
            Channel { frequency: 869_100_000, data_rate: DataRate::SF12BW125 },
        ),
        RegionId::KR920 => (
            &[922_100_000, 922_300_000, 922_500_000],
            Channel { frequency: 921_900_000, data_rate: DataRate::SF12BW125 },
        ),
        RegionId::AS923 => (
            &[923_200_000, 923_400_000],
            Channel { frequency: 923_200_000, data_rate: DataRate::SF10BW125 },
        ),
        RegionId::US915 | RegionId::AU915 | RegionId::CN470 => return None,
    };
    Some(DynamicDefaults { channels, rx2 })
}

/// EU868-style plan: a few default channels plus up to five CFList
/// frequencies, hopped round-robin
#[derive(Debug, Clone)]
pub struct DynamicPlan {
    region: Option<RegionId>,
    /// Frequency per slot, 0 for unused
    slots: [u32; DYNAMIC_CHANNELS],
    /// Slots the network left enabled
    mask: u16,
    /// Default channels, which the network cannot modify
    defaults: usize,
    next: usize,
    data_rate: DataRate,
    rx2: Option<Channel>,
}

impl Default for DynamicPlan {
    fn default() -> Self {
        Self {
            region: None,
            slots: [0; DYNAMIC_CHANNELS],
            mask: u16::MAX,
            defaults: 0,
            next: 0,
            data_rate: DataRate::SF7BW125,
            rx2: None,
        }
    }
}

impl DynamicPlan {
    /// Create an uninitialized plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current data rate
    pub fn data_rate(&self) -> DataRate {
        self.data_rate
    }

    /// Active frequencies
    pub fn enabled_channels(&self) -> impl Iterator<Item = u32> + '_ {
        (0..DYNAMIC_CHANNELS)
            .filter(|&i| self.is_enabled(i))
            .map(|i| self.slots[i])
    }

    fn is_enabled(&self, index: usize) -> bool {
        self.slots[index] != 0 && self.mask & (1 << index) != 0
    }

    /// Bit set of the slots holding a frequency
    fn defined(&self) -> u16 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, freq)| **freq != 0)
            .fold(0, |bits, (i, _)| bits | 1 << i)
    }

    fn masked(&self, mask: u16, control: u8) -> Result<u16, RegionError> {
        let defined = self.defined();
        let mask = match control {
            0 => mask,
            6 => defined,
            _ => return Err(RegionError::InvalidChannel),
        };
        if mask == 0 || mask & !defined != 0 {
            return Err(RegionError::InvalidChannel);
        }
        Ok(mask)
    }
}

impl Region for DynamicPlan {
    fn init_params(&mut self, region: RegionId) -> Result<RegionParams, RegionError> {
        let defaults = dynamic_defaults(region).ok_or(RegionError::Unsupported)?;

        self.slots = [0; DYNAMIC_CHANNELS];
        self.slots[..defaults.channels.len()].copy_from_slice(defaults.channels);
        self.mask = u16::MAX;
        self.defaults = defaults.channels.len();
        self.next = 0;
        self.data_rate = DataRate::SF7BW125;
        self.rx2 = Some(defaults.rx2);
        self.region = Some(region);
        Ok(RegionParams::for_region(region))
    }

    fn get_channel(&mut self) -> Result<Channel, RegionError> {
        if self.region.is_none() {
            return Err(RegionError::NoChannel);
        }
        for offset in 0..DYNAMIC_CHANNELS {
            let index = (self.next + offset) % DYNAMIC_CHANNELS;
            if self.is_enabled(index) {
                self.next = (index + 1) % DYNAMIC_CHANNELS;
                return Ok(Channel {
                    frequency: self.slots[index],
                    data_rate: self.data_rate,
                });
            }
        }
        Err(RegionError::NoChannel)
    }

    fn update_channels(&mut self, cflist: &CfList) -> Result<(), RegionError> {
        match cflist {
            CfList::Frequencies(freqs) => {
                let start = DEFAULT_CHANNELS_MAX;
                self.slots[start..start + CFLIST_FREQUENCIES].copy_from_slice(freqs);
                for i in start..start + CFLIST_FREQUENCIES {
                    self.mask |= 1 << i;
                }
                Ok(())
            }
            CfList::ChannelMask(_) => Err(RegionError::InvalidCfList),
        }
    }

    fn rx2_channel(&self) -> Result<Channel, RegionError> {
        self.rx2.ok_or(RegionError::NoChannel)
    }

    fn uplink_data_rate(&self, index: u8) -> Option<DataRate> {
        DYNAMIC_DATA_RATES.get(index as usize).copied()
    }

    fn downlink_data_rate(&self, index: u8) -> Option<DataRate> {
        DYNAMIC_DATA_RATES.get(index as usize).copied()
    }

    fn set_data_rate(&mut self, data_rate: DataRate) -> Result<(), RegionError> {
        if !DYNAMIC_DATA_RATES.contains(&data_rate) {
            return Err(RegionError::InvalidChannel);
        }
        self.data_rate = data_rate;
        Ok(())
    }

    fn check_channel_mask(&self, mask: u16, control: u8) -> Result<(), RegionError> {
        self.masked(mask, control).map(|_| ())
    }

    fn set_channel_mask(&mut self, mask: u16, control: u8) -> Result<(), RegionError> {
        self.mask = self.masked(mask, control)?;
        Ok(())
    }

    fn set_channel(&mut self, index: u8, frequency: u32) -> Result<(), RegionError> {
        let index = index as usize;
        if self.region.is_none() || index < self.defaults || index >= DYNAMIC_CHANNELS {
            return Err(RegionError::InvalidChannel);
        }
        self.slots[index] = frequency;
        if frequency == 0 {
            self.mask &= !(1 << index);
        } else {
            self.mask |= 1 << index;
        }
        Ok(())
    }

    fn set_rx2_channel(&mut self, channel: Channel) -> Result<(), RegionError> {
        if self.region.is_none() || channel.frequency == 0 {
            return Err(RegionError::InvalidChannel);
        }
        self.rx2 = Some(channel);
        Ok(())
    }
}

/// Channels of a fixed plan: 64 x 125 kHz followed by 8 x 500 kHz
pub const FIXED_CHANNELS: usize = 72;
const FIXED_125K_CHANNELS: usize = 64;

/// US915/AU915-style plan with fixed channels selected by sub-band or
/// channel mask
#[derive(Debug, Clone)]
pub struct FixedPlan {
    region: Option<RegionId>,
    /// Upstream channel frequencies (64 + 8 channels)
    channels: Vec<u32, FIXED_CHANNELS>,
    enabled: [bool; FIXED_CHANNELS],
    /// Selected sub-band (0-7), all channels when unset
    sub_band: Option<u8>,
    next: usize,
    data_rate: DataRate,
    /// RX2 channel set by the network
    rx2: Option<Channel>,
}

impl Default for FixedPlan {
    fn default() -> Self {
        Self {
            region: None,
            channels: Vec::new(),
            enabled: [false; FIXED_CHANNELS],
            sub_band: None,
            next: 0,
            data_rate: DataRate::SF10BW125,
            rx2: None,
        }
    }
}

impl FixedPlan {
    /// Create an uninitialized plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict transmission to one sub-band (0-7): its eight 125 kHz
    /// channels and its 500 kHz channel
    pub fn set_sub_band(&mut self, sub_band: u8) {
        self.sub_band = Some(sub_band.min(7));
        self.apply_sub_band();
    }

    fn apply_sub_band(&mut self) {
        let Some(sub_band) = self.sub_band else {
            self.enabled = [true; FIXED_CHANNELS];
            return;
        };
        for (i, enabled) in self.enabled.iter_mut().enumerate() {
            *enabled = if i < FIXED_125K_CHANNELS {
                (i / 8) as u8 == sub_band
            } else {
                (i - FIXED_125K_CHANNELS) as u8 == sub_band
            };
        }
    }

    /// Enabled channel frequencies
    pub fn enabled_channels(&self) -> impl Iterator<Item = u32> + '_ {
        self.channels
            .iter()
            .zip(self.enabled.iter())
            .filter(|(_, enabled)| **enabled)
            .map(|(&freq, _)| freq)
    }

    fn masked(&self, mask: u16, control: u8) -> Result<[bool; FIXED_CHANNELS], RegionError> {
        let mut enabled = self.enabled;
        match control {
            0..=4 => {
                let start = control as usize * 16;
                for (i, enabled) in enabled.iter_mut().enumerate().skip(start).take(16) {
                    *enabled = mask & (1 << (i - start)) != 0;
                }
            }
            // All 125 kHz channels on (6) or off (7), 500 kHz channels from the mask
            6 | 7 => {
                for (i, enabled) in enabled.iter_mut().enumerate() {
                    *enabled = if i < FIXED_125K_CHANNELS {
                        control == 6
                    } else {
                        mask & (1 << (i - FIXED_125K_CHANNELS)) != 0
                    };
                }
            }
            _ => return Err(RegionError::InvalidChannel),
        }
        if self.region.is_none() || !enabled.iter().any(|&e| e) {
            return Err(RegionError::InvalidChannel);
        }
        Ok(enabled)
    }
}

impl Region for FixedPlan {
    fn init_params(&mut self, region: RegionId) -> Result<RegionParams, RegionError> {
        let (base_125k, base_500k) = match region {
            RegionId::US915 => (902_300_000, 903_000_000),
            RegionId::AU915 => (915_200_000, 915_900_000),
            _ => return Err(RegionError::Unsupported),
        };

        self.channels.clear();
        for i in 0..FIXED_125K_CHANNELS as u32 {
            self.channels
                .push(base_125k + i * 200_000)
                .map_err(|_| RegionError::Unsupported)?;
        }
        for i in 0..(FIXED_CHANNELS - FIXED_125K_CHANNELS) as u32 {
            self.channels
                .push(base_500k + i * 1_600_000)
                .map_err(|_| RegionError::Unsupported)?;
        }
        self.apply_sub_band();
        self.next = 0;
        self.data_rate = DataRate::SF10BW125;
        self.rx2 = None;
        self.region = Some(region);
        Ok(RegionParams::for_region(region))
    }

    fn get_channel(&mut self) -> Result<Channel, RegionError> {
        if self.region.is_none() {
            return Err(RegionError::NoChannel);
        }
        for offset in 0..FIXED_CHANNELS {
            let index = (self.next + offset) % FIXED_CHANNELS;
            if self.enabled[index] {
                self.next = (index + 1) % FIXED_CHANNELS;
                let data_rate = if index < FIXED_125K_CHANNELS {
                    self.data_rate
                } else {
                    DataRate::SF8BW500
                };
                return Ok(Channel {
                    frequency: self.channels[index],
                    data_rate,
                });
            }
        }
        Err(RegionError::NoChannel)
    }

    fn update_channels(&mut self, cflist: &CfList) -> Result<(), RegionError> {
        match cflist {
            CfList::ChannelMask(masks) => {
                for (i, enabled) in self.enabled.iter_mut().enumerate() {
                    *enabled = masks[i / 16] & (1 << (i % 16)) != 0;
                }
                Ok(())
            }
            CfList::Frequencies(_) => Err(RegionError::InvalidCfList),
        }
    }

    fn rx2_channel(&self) -> Result<Channel, RegionError> {
        match (self.region, self.rx2) {
            (None, _) => Err(RegionError::NoChannel),
            (Some(_), Some(channel)) => Ok(channel),
            (Some(_), None) => Ok(Channel {
                frequency: 923_300_000,
                data_rate: DataRate::SF12BW500,
            }),
        }
    }

    /// 125 kHz rates only: US915 DR0-DR3 (SF10-SF7), AU915 DR0-DR5 (SF12-SF7)
    fn uplink_data_rate(&self, index: u8) -> Option<DataRate> {
        let slowest = match self.region? {
            RegionId::US915 => 10,
            _ => 12,
        };
        (index <= slowest - 7).then_some(DataRate::new(slowest.saturating_sub(index), 125_000))
    }

    /// DR8-DR13: SF12-SF7 at 500 kHz
    fn downlink_data_rate(&self, index: u8) -> Option<DataRate> {
        self.region?;
        (8..=13).contains(&index).then_some(DataRate::new(20u8.saturating_sub(index), 500_000))
    }

    fn set_data_rate(&mut self, data_rate: DataRate) -> Result<(), RegionError> {
        if data_rate.bandwidth != 125_000 {
            return Err(RegionError::InvalidChannel);
        }
        self.data_rate = data_rate;
        Ok(())
    }

    fn check_channel_mask(&self, mask: u16, control: u8) -> Result<(), RegionError> {
        self.masked(mask, control).map(|_| ())
    }

    fn set_channel_mask(&mut self, mask: u16, control: u8) -> Result<(), RegionError> {
        self.enabled = self.masked(mask, control)?;
        Ok(())
    }

    fn set_rx2_channel(&mut self, channel: Channel) -> Result<(), RegionError> {
        if self.region.is_none() || channel.frequency == 0 {
            return Err(RegionError::InvalidChannel);
        }
        self.rx2 = Some(channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rx_delay() {
        let mut params = RegionParams::for_region(RegionId::EU868);
        assert_eq!(params.rx1_delay_ms, 1000);
        assert_eq!(params.rx2_delay_ms, 2000);

        params.set_rx_delay(0);
        assert_eq!(params.rx1_delay_ms, 1000);
        params.set_rx_delay(5);
        assert_eq!(params.rx1_delay_ms, 5000);
        assert_eq!(params.rx2_delay_ms, 6000);
    }

    #[test]
    fn test_dynamic_plan_hopping() {
        let mut plan = DynamicPlan::new();
        assert_eq!(plan.get_channel(), Err(RegionError::NoChannel));

        let params = plan.init_params(RegionId::EU868).unwrap();
        assert_eq!(params.region, RegionId::EU868);

        let freqs: [u32; 4] = core::array::from_fn(|_| plan.get_channel().unwrap().frequency);
        assert_eq!(freqs, [868_100_000, 868_300_000, 868_500_000, 868_100_000]);
        assert_eq!(plan.rx2_channel().unwrap().frequency, 869_525_000);
    }

    #[test]
    fn test_dynamic_plan_unsupported() {
        let mut plan = DynamicPlan::new();
        assert_eq!(plan.init_params(RegionId::US915), Err(RegionError::Unsupported));
        assert_eq!(plan.rx2_channel(), Err(RegionError::NoChannel));
    }

    #[test]
    fn test_cflist_frequencies() {
        let mut raw = [0u8; 16];
        // 867.1 MHz and 867.3 MHz
        raw[0..3].copy_from_slice(&[0x18, 0x4F, 0x84]);
        raw[3..6].copy_from_slice(&[0xE8, 0x56, 0x84]);
        let cflist = CfList::from_bytes(&raw).unwrap();
        assert_eq!(
            cflist,
            CfList::Frequencies([867_100_000, 867_300_000, 0, 0, 0])
        );

        let mut plan = DynamicPlan::new();
        plan.init_params(RegionId::EU868).unwrap();
        plan.update_channels(&cflist).unwrap();
        assert_eq!(plan.enabled_channels().count(), 5);
        assert!(plan.enabled_channels().any(|f| f == 867_300_000));
        assert_eq!(
            plan.update_channels(&CfList::ChannelMask([0; 6])),
            Err(RegionError::InvalidCfList)
        );
    }

    #[test]
    fn test_cflist_invalid_type() {
        let mut raw = [0u8; 16];
        raw[15] = 7;
        assert_eq!(CfList::from_bytes(&raw), Err(RegionError::InvalidCfList));
    }

    #[test]
    fn test_fixed_plan_sub_band() {
        let mut plan = FixedPlan::new();
        plan.set_sub_band(1);
        plan.init_params(RegionId::US915).unwrap();

        assert_eq!(plan.enabled_channels().count(), 9);
        let first = plan.get_channel().unwrap();
        assert_eq!(first.frequency, 903_900_000);
        assert_eq!(first.data_rate, DataRate::SF10BW125);
        assert!(plan.enabled_channels().any(|f| f == 904_600_000));
    }

    #[test]
    fn test_fixed_plan_channel_mask() {
        let mut plan = FixedPlan::new();
        plan.init_params(RegionId::AU915).unwrap();
        assert_eq!(plan.enabled_channels().count(), FIXED_CHANNELS);

        let mut raw = [0u8; 16];
        raw[0] = 0x01;
        raw[8] = 0x02;
        raw[15] = 1;
        plan.update_channels(&CfList::from_bytes(&raw).unwrap()).unwrap();

        let enabled: Vec<u32, 4> = plan.enabled_channels().collect();
        assert_eq!(&enabled[..], &[915_200_000, 917_500_000]);
        assert_eq!(plan.get_channel().unwrap().frequency, 915_200_000);
        let second = plan.get_channel().unwrap();
        assert_eq!(second.frequency, 917_500_000);
        assert_eq!(second.data_rate, DataRate::SF8BW500);
    }

    #[test]
    fn test_fixed_plan_no_channel() {
        let mut plan = FixedPlan::new();
        assert_eq!(plan.init_params(RegionId::EU868), Err(RegionError::Unsupported));
        plan.init_params(RegionId::US915).unwrap();
        plan.update_channels(&CfList::ChannelMask([0; 6])).unwrap();
        assert_eq!(plan.get_channel(), Err(RegionError::NoChannel));
    }

    #[test]
    fn test_dynamic_plan_network_channels() {
        let mut plan = DynamicPlan::new();
        plan.init_params(RegionId::EU868).unwrap();
        assert_eq!(plan.set_channel(1, 867_100_000), Err(RegionError::InvalidChannel));
        assert_eq!(plan.set_channel(16, 867_100_000), Err(RegionError::InvalidChannel));

        plan.set_channel(3, 867_100_000).unwrap();
        assert_eq!(plan.enabled_channels().count(), 4);

        // Only the new channel left on
        assert_eq!(plan.check_channel_mask(0x0010, 0), Err(RegionError::InvalidChannel));
        assert_eq!(plan.set_channel_mask(0, 0), Err(RegionError::InvalidChannel));
        plan.set_channel_mask(0x0008, 0).unwrap();
        assert_eq!(plan.get_channel().unwrap().frequency, 867_100_000);
        assert_eq!(plan.get_channel().unwrap().frequency, 867_100_000);

        plan.set_channel_mask(0, 6).unwrap();
        assert_eq!(plan.enabled_channels().count(), 4);
        plan.set_channel(3, 0).unwrap();
        assert_eq!(plan.enabled_channels().count(), 3);
    }

    #[test]
    fn test_dynamic_plan_rx2_and_data_rate() {
        let mut plan = DynamicPlan::new();
        assert!(plan.set_rx2_channel(Channel { frequency: 869_000_000, data_rate: DataRate::SF7BW125 }).is_err());
        plan.init_params(RegionId::EU868).unwrap();

        let dr3 = plan.downlink_data_rate(3).unwrap();
        assert_eq!(dr3, DataRate::new(9, 125_000));
        plan.set_rx2_channel(Channel { frequency: 869_000_000, data_rate: dr3 }).unwrap();
        assert_eq!(plan.rx2_channel().unwrap().frequency, 869_000_000);

        assert_eq!(plan.uplink_data_rate(7), None);
        plan.set_data_rate(plan.uplink_data_rate(0).unwrap()).unwrap();
        assert_eq!(plan.get_channel().unwrap().data_rate, DataRate::SF12BW125);
        assert_eq!(plan.set_data_rate(DataRate::SF8BW500), Err(RegionError::InvalidChannel));

        // A new init restores the defaults
        plan.init_params(RegionId::EU868).unwrap();
        assert_eq!(plan.rx2_channel().unwrap().frequency, 869_525_000);
        assert_eq!(plan.data_rate(), DataRate::SF7BW125);
    }

    #[test]
    fn test_fixed_plan_link_adr_mask() {
        let mut plan = FixedPlan::new();
        plan.init_params(RegionId::US915).unwrap();

        // All 125 kHz channels off, 500 kHz channel 65 on
        plan.set_channel_mask(0x0002, 7).unwrap();
        let enabled: Vec<u32, 4> = plan.enabled_channels().collect();
        assert_eq!(&enabled[..], &[904_600_000]);

        // Second block of 125 kHz channels
        plan.set_channel_mask(0x00FF, 1).unwrap();
        assert_eq!(plan.enabled_channels().count(), 9);
        assert_eq!(plan.get_channel().unwrap().frequency, 905_500_000);

        assert_eq!(plan.set_channel_mask(0, 7), Err(RegionError::InvalidChannel));
        assert_eq!(plan.set_channel_mask(0xFFFF, 5), Err(RegionError::InvalidChannel));
        assert_eq!(plan.enabled_channels().count(), 9);
        assert_eq!(plan.set_channel(3, 905_000_000), Err(RegionError::Unsupported));
    }

    #[test]
    fn test_fixed_plan_data_rates() {
        let mut plan = FixedPlan::new();
        plan.init_params(RegionId::US915).unwrap();
        assert_eq!(plan.uplink_data_rate(0), Some(DataRate::SF10BW125));
        assert_eq!(plan.uplink_data_rate(3), Some(DataRate::SF7BW125));
        assert_eq!(plan.uplink_data_rate(4), None);
        assert_eq!(plan.downlink_data_rate(8), Some(DataRate::SF12BW500));
        assert_eq!(plan.downlink_data_rate(13), Some(DataRate::new(7, 500_000)));
        assert_eq!(plan.downlink_data_rate(3), None);
        assert_eq!(plan.set_data_rate(DataRate::SF8BW500), Err(RegionError::InvalidChannel));

        plan.init_params(RegionId::AU915).unwrap();
        assert_eq!(plan.uplink_data_rate(0), Some(DataRate::SF12BW125));
        assert_eq!(plan.uplink_data_rate(5), Some(DataRate::SF7BW125));
    }

    #[test]
    fn test_region_version() {
        assert_eq!(DynamicPlan::new().version().packed(), 0x0201_0004);
    }
}
