/// EUI-64 (8 bytes)
pub type Eui64 = [u8; 8];
/// AES-128 key (16 bytes)
pub type AesKey = [u8; 16];
/// Device address, held as the numeric value carried little-endian on the wire
pub type DevAddr = u32;

/// LoRaWAN device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceClass {
    /// Class A: Uplink followed by two receive windows
    A,
    /// Class B: Scheduled receive slots (beaconing)
    B,
    /// Class C: Continuously listening except when transmitting
    C,
}

/// Device activation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivationType {
    /// Activation by personalisation
    Abp,
    /// Over the air activation
    Otaa,
}

/// Device security configuration for OTAA or ABP activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityConfig {
    /// Over the air activation credentials
    Otaa {
        /// Globally unique end-device identifier
        dev_eui: Eui64,
        /// Join server identifier
        join_eui: Eui64,
        /// Root application key
        app_key: AesKey,
    },
    /// Activation by personalisation session
    Abp {
        /// End-device address
        dev_addr: DevAddr,
        /// Network session key
        nwk_s_key: AesKey,
        /// Application session key
        app_s_key: AesKey,
    },
}

impl SecurityConfig {
    /// Create a new OTAA security configuration
    pub fn new_otaa(dev_eui: Eui64, join_eui: Eui64, app_key: AesKey) -> Self {
        SecurityConfig::Otaa {
            dev_eui,
            join_eui,
            app_key,
        }
    }

    /// Create a new ABP security configuration
    pub fn new_abp(dev_addr: DevAddr, nwk_s_key: AesKey, app_s_key: AesKey) -> Self {
        SecurityConfig::Abp {
            dev_addr,
            nwk_s_key,
            app_s_key,
        }
    }

    /// The activation type of this configuration
    pub fn activation(&self) -> ActivationType {
        match self {
            SecurityConfig::Otaa { .. } => ActivationType::Otaa,
            SecurityConfig::Abp { .. } => ActivationType::Abp,
        }
    }

    /// Session keys available without a join exchange
    pub(crate) fn abp_keys(&self) -> Option<SessionKeys> {
        match *self {
            SecurityConfig::Abp {
                dev_addr,
                nwk_s_key,
                app_s_key,
            } => Some(SessionKeys {
                dev_addr,
                nwk_s_key,
                app_s_key,
            }),
            SecurityConfig::Otaa { .. } => None,
        }
    }
}

/// Keys and address of an active network session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKeys {
    /// Device address assigned by the network
    pub dev_addr: DevAddr,
    /// Network session key
    pub nwk_s_key: AesKey,
    /// Application session key
    pub app_s_key: AesKey,
}

/// Frame counters of an active network session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameCounters {
    /// Uplink frame counter
    pub up: u32,
    /// Last accepted downlink frame counter
    pub down: Option<u32>,
}

impl FrameCounters {
    /// Increment the uplink frame counter
    pub fn increment_up(&mut self) {
        self.up = self.up.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_type() {
        let otaa = SecurityConfig::new_otaa([0x01; 8], [0x02; 8], [0x03; 16]);
        assert_eq!(otaa.activation(), ActivationType::Otaa);
        assert!(otaa.abp_keys().is_none());

        let abp = SecurityConfig::new_abp(0x2601_1F00, [0x01; 16], [0x02; 16]);
        assert_eq!(abp.activation(), ActivationType::Abp);
        let keys = abp.abp_keys().unwrap();
        assert_eq!(keys.dev_addr, 0x2601_1F00);
        assert_eq!(keys.nwk_s_key, [0x01; 16]);
        assert_eq!(keys.app_s_key, [0x02; 16]);
    }
}
