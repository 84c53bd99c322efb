//! Device and network configuration
//!
//! This module contains types for configuring LoRaWAN devices:
//! - Device class
//! - Security configuration (DevEUI, JoinEUI, keys) for OTAA and ABP
//! - Session keys and frame counters

/// Device configuration and session keys
pub mod device;

pub use device::{ActivationType, DeviceClass, FrameCounters, SecurityConfig, SessionKeys};
