// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
use core::time::Duration;

use mctp::Eid;

use crate::checksum;
use crate::smbus::Route;
use crate::{Error, Result};

/// Baseline MCTP transmission unit size
pub const DEFAULT_MTU: usize = mctp::MCTP_MIN_MTU;
/// Largest payload expressible in the 8-bit SMBus byte count
pub const MAX_MTU: usize = u8::MAX as usize - crate::smbus::BYTE_COUNT_OVERHEAD;

const DEFAULT_DEVICE_ADDR: u8 = 0x15;
const DEFAULT_HOST_ADDR: u8 = 0x16;
const DEFAULT_TAG: u8 = 3;

/// Treatment of the trailing packet error code.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PecMode {
    /// SMBus PEC over every byte of the packet
    #[default]
    Smbus,
    /// SMBus PEC exclusive-ORed with the first byte of the packet. Applies
    /// to transmitted packets only.
    Masked,
}

impl PecMode {
    /// Calculate the PEC for a packet split into its header and payload.
    pub fn code(&self, header: &[u8], payload: &[u8]) -> u8 {
        let mut digest = checksum::PEC.digest();
        digest.update(header);
        digest.update(payload);
        let code = digest.finalize();

        match self {
            PecMode::Smbus => code,
            PecMode::Masked => {
                let first = header.first().or(payload.first()).copied().unwrap_or(0);
                code ^ first
            }
        }
    }
}

/// Bounded retry for opening the bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `n * backoff`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn delay(&self, failed_attempts: u32) -> Duration {
        self.backoff.saturating_mul(failed_attempts)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(10))
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    mtu: usize,
    device_addr: u8,
    host_addr: u8,
    device_eid: Eid,
    host_eid: Eid,
    tag: u8,
    pec: PecMode,
    verify_pec: bool,
    verify_mic: bool,
    write_delay: Duration,
    response_delay: Duration,
    open_retry: RetryPolicy,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        Default::default()
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub(crate) fn set_mtu(&mut self, mtu: usize) -> Result<()> {
        validate_mtu(mtu)?;
        self.mtu = mtu;
        Ok(())
    }

    pub fn device_addr(&self) -> u8 {
        self.device_addr
    }

    pub fn host_addr(&self) -> u8 {
        self.host_addr
    }

    pub fn device_eid(&self) -> Eid {
        self.device_eid
    }

    pub fn host_eid(&self) -> Eid {
        self.host_eid
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn pec(&self) -> PecMode {
        self.pec
    }

    pub fn verify_pec(&self) -> bool {
        self.verify_pec
    }

    pub fn verify_mic(&self) -> bool {
        self.verify_mic
    }

    pub fn write_delay(&self) -> Duration {
        self.write_delay
    }

    pub fn response_delay(&self) -> Duration {
        self.response_delay
    }

    pub fn open_retry(&self) -> &RetryPolicy {
        &self.open_retry
    }

    /// Addressing for requests from the host to the management endpoint.
    pub fn route(&self) -> Route {
        Route {
            dest_addr: self.device_addr,
            src_addr: self.host_addr,
            dest_eid: self.device_eid,
            src_eid: self.host_eid,
            tag: self.tag,
            owner: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            device_addr: DEFAULT_DEVICE_ADDR,
            host_addr: DEFAULT_HOST_ADDR,
            device_eid: mctp::MCTP_ADDR_NULL,
            host_eid: mctp::MCTP_ADDR_NULL,
            tag: DEFAULT_TAG,
            pec: PecMode::Smbus,
            verify_pec: true,
            verify_mic: true,
            write_delay: Duration::from_micros(10),
            response_delay: Duration::from_secs(1),
            open_retry: RetryPolicy::default(),
        }
    }
}

fn validate_mtu(mtu: usize) -> Result<()> {
    if !(DEFAULT_MTU..=MAX_MTU).contains(&mtu) {
        return Err(Error::InvalidConfig("transmission unit size out of range"));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn mtu(&mut self, mtu: usize) -> &mut Self {
        self.config.mtu = mtu;
        self
    }

    /// 7-bit SMBus address of the management endpoint
    pub fn device_addr(&mut self, addr: u8) -> &mut Self {
        self.config.device_addr = addr;
        self
    }

    /// 7-bit SMBus address of this host
    pub fn host_addr(&mut self, addr: u8) -> &mut Self {
        self.config.host_addr = addr;
        self
    }

    pub fn device_eid(&mut self, eid: Eid) -> &mut Self {
        self.config.device_eid = eid;
        self
    }

    pub fn host_eid(&mut self, eid: Eid) -> &mut Self {
        self.config.host_eid = eid;
        self
    }

    pub fn tag(&mut self, tag: u8) -> &mut Self {
        self.config.tag = tag;
        self
    }

    pub fn pec(&mut self, pec: PecMode) -> &mut Self {
        self.config.pec = pec;
        self
    }

    pub fn verify_pec(&mut self, verify: bool) -> &mut Self {
        self.config.verify_pec = verify;
        self
    }

    pub fn verify_mic(&mut self, verify: bool) -> &mut Self {
        self.config.verify_mic = verify;
        self
    }

    pub fn write_delay(&mut self, delay: Duration) -> &mut Self {
        self.config.write_delay = delay;
        self
    }

    pub fn response_delay(&mut self, delay: Duration) -> &mut Self {
        self.config.response_delay = delay;
        self
    }

    pub fn open_retry(&mut self, policy: RetryPolicy) -> &mut Self {
        self.config.open_retry = policy;
        self
    }

    pub fn build(&self) -> Result<Config> {
        validate_mtu(self.config.mtu)?;

        if self.config.device_addr > 0x7f || self.config.host_addr > 0x7f {
            return Err(Error::InvalidConfig("SMBus addresses are 7 bits"));
        }

        if self.config.tag > mctp::MCTP_TAG_MAX {
            return Err(Error::InvalidConfig("message tag exceeds 3 bits"));
        }

        if self.config.open_retry.max_attempts == 0 {
            return Err(Error::InvalidConfig("open retry policy permits no attempts"));
        }

        Ok(self.config.clone())
    }
}
