//! LoRaWAN cryptographic operations
//!
//! This module provides the LoRaWAN 1.0.x security procedures on top of a
//! [`Crypto`] backend:
//! - Message Integrity Code (MIC) computation for join requests and data frames
//! - Payload encryption/decryption
//! - Join accept decryption
//! - Session key derivation
//!
//! [`SoftCrypto`] is a software backend built on the `aes` and `cmac` crates.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use cmac::{Cmac, Mac};

use crate::config::device::{AesKey, DevAddr};
use crate::error::{Error, Result};
use crate::fmt::error;
use crate::lorawan::mac::{MAX_FRAME_SIZE, MIC_SIZE};

/// Block size for AES-128
pub const BLOCK_SIZE: usize = 16;

/// AES primitives used by the security procedures
pub trait Crypto {
    /// Backend error
    type Error;

    /// AES-CMAC of `data` under `key`, truncated to the first four tag bytes
    /// read little-endian
    fn aes_cmac(&mut self, key: &AesKey, data: &[u8]) -> core::result::Result<u32, Self::Error>;

    /// Encrypt one block in place with AES-128
    fn aes_encrypt(&mut self, key: &AesKey, block: &mut [u8; BLOCK_SIZE]) -> core::result::Result<(), Self::Error>;
}

/// Software AES backend
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftCrypto;

impl SoftCrypto {
    /// Create a software backend
    pub fn new() -> Self {
        Self
    }
}

impl Crypto for SoftCrypto {
    type Error = cmac::digest::InvalidLength;

    fn aes_cmac(&mut self, key: &AesKey, data: &[u8]) -> core::result::Result<u32, Self::Error> {
        let mut mac = <Cmac<Aes128> as Mac>::new_from_slice(key)?;
        mac.update(data);
        let tag = mac.finalize().into_bytes();
        Ok(u32::from_le_bytes([tag[0], tag[1], tag[2], tag[3]]))
    }

    fn aes_encrypt(&mut self, key: &AesKey, block: &mut [u8; BLOCK_SIZE]) -> core::result::Result<(), Self::Error> {
        let cipher = <Aes128 as KeyInit>::new_from_slice(key)?;
        cipher.encrypt_block(block.into());
        Ok(())
    }
}

/// Direction identifiers for cryptographic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Uplink (device to network)
    Up = 0,
    /// Downlink (network to device)
    Down = 1,
}

fn crypto_err<E>(_err: E) -> Error {
    error!("crypto backend failure");
    Error::Crypto
}

/// B0 / A-block prefix shared by MIC and payload encryption
fn frame_block(tag: u8, dir: Direction, dev_addr: DevAddr, fcnt: u32) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    block[0] = tag;
    block[5] = dir as u8;
    block[6..10].copy_from_slice(&dev_addr.to_le_bytes());
    block[10..14].copy_from_slice(&fcnt.to_le_bytes());
    block
}

/// MIC of a join request: CMAC over `MHDR | JoinEUI | DevEUI | DevNonce`
pub fn join_request_mic<C: Crypto>(crypto: &mut C, app_key: &AesKey, msg: &[u8]) -> Result<u32> {
    crypto.aes_cmac(app_key, msg).map_err(crypto_err)
}

/// MIC of a decrypted join accept: CMAC over `MHDR | body`, MIC excluded
pub fn join_accept_mic<C: Crypto>(crypto: &mut C, app_key: &AesKey, msg: &[u8]) -> Result<u32> {
    crypto.aes_cmac(app_key, msg).map_err(crypto_err)
}

/// MIC of a data frame: CMAC over `B0 | msg`, with `msg` running from MHDR
/// up to the MIC
pub fn data_mic<C: Crypto>(
    crypto: &mut C,
    nwk_s_key: &AesKey,
    dev_addr: DevAddr,
    fcnt: u32,
    dir: Direction,
    msg: &[u8],
) -> Result<u32> {
    if msg.len() > MAX_FRAME_SIZE - MIC_SIZE {
        return Err(Error::InvalidParameters);
    }
    let mut buf = [0u8; BLOCK_SIZE + MAX_FRAME_SIZE];
    let mut b0 = frame_block(0x49, dir, dev_addr, fcnt);
    b0[15] = msg.len() as u8;
    buf[..BLOCK_SIZE].copy_from_slice(&b0);
    buf[BLOCK_SIZE..BLOCK_SIZE + msg.len()].copy_from_slice(msg);

    crypto
        .aes_cmac(nwk_s_key, &buf[..BLOCK_SIZE + msg.len()])
        .map_err(crypto_err)
}

/// Encrypt or decrypt a FRMPayload in place with the A-block key stream
pub fn encrypt_frm_payload<C: Crypto>(
    crypto: &mut C,
    key: &AesKey,
    dev_addr: DevAddr,
    fcnt: u32,
    dir: Direction,
    payload: &mut [u8],
) -> Result<()> {
    for (i, chunk) in payload.chunks_mut(BLOCK_SIZE).enumerate() {
        let mut s = frame_block(0x01, dir, dev_addr, fcnt);
        s[15] = (i + 1) as u8;
        crypto.aes_encrypt(key, &mut s).map_err(crypto_err)?;
        for (byte, k) in chunk.iter_mut().zip(s.iter()) {
            *byte ^= k;
        }
    }
    Ok(())
}

/// Decrypt a join accept body (MIC included) in place.
///
/// The network encrypts with AES decrypt, so the device decrypts with AES
/// encrypt. The body must be a whole number of blocks.
pub fn decrypt_join_accept<C: Crypto>(crypto: &mut C, app_key: &AesKey, body: &mut [u8]) -> Result<()> {
    if body.is_empty() || body.len() % BLOCK_SIZE != 0 {
        return Err(Error::InvalidParameters);
    }
    for chunk in body.chunks_exact_mut(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(chunk);
        crypto.aes_encrypt(app_key, &mut block).map_err(crypto_err)?;
        chunk.copy_from_slice(&block);
    }
    Ok(())
}

/// Derive the network and application session keys (LoRaWAN 1.0.x)
pub fn derive_session_keys<C: Crypto>(
    crypto: &mut C,
    app_key: &AesKey,
    join_nonce: u32,
    net_id: u32,
    dev_nonce: u16,
) -> Result<(AesKey, AesKey)> {
    let mut keys = [[0u8; BLOCK_SIZE]; 2];
    for (tag, key) in [0x01u8, 0x02].into_iter().zip(keys.iter_mut()) {
        key[0] = tag;
        key[1..4].copy_from_slice(&join_nonce.to_le_bytes()[..3]);
        key[4..7].copy_from_slice(&net_id.to_le_bytes()[..3]);
        key[7..9].copy_from_slice(&dev_nonce.to_le_bytes());
        crypto.aes_encrypt(app_key, key).map_err(crypto_err)?;
    }
    Ok((keys[0], keys[1]))
}
