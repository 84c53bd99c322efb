//! LoRaWAN protocol implementation
//!
//! This module contains the wire-level protocol pieces, including:
//! - MAC frame codec
//! - MAC command model
//! - Regional parameters and channel plans

/// MAC command handling
pub mod commands;

/// MAC frame codec
pub mod mac;

/// Regional parameters and configurations
pub mod region;

pub use commands::{DownlinkCommand, DownlinkCommands, UplinkCommand};
pub use mac::{CodecError, FCtrl, Fhdr, FrameContext, FrameType, JoinAccept, JoinRequest, Mhdr};
pub use region::{CfList, Channel, DataRate, DynamicPlan, FixedPlan, Region, RegionId, RegionParams};
