// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! Byte-level access to the SMBus/I2C segment carrying the management
//! endpoint.

use std::io;
use std::thread;

use log::{debug, warn};

use crate::config::RetryPolicy;
use crate::{Error, Result};

pub mod emulated;
pub mod stream;

pub use emulated::EmulatedBus;
pub use stream::StreamBus;

/// A raw transport for MCTP-over-SMBus packets.
///
/// Writes take a complete packet beginning with the destination address
/// byte. Reads fill the provided buffer completely or fail.
pub trait Bus {
    fn open(&mut self) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

impl<B: Bus + ?Sized> Bus for Box<B> {
    fn open(&mut self) -> io::Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read(buf)
    }
}

/// Open `bus`, retrying according to `policy`.
///
/// Returns the number of attempts taken.
pub(crate) fn open_with_retry<B: Bus + ?Sized>(bus: &mut B, policy: &RetryPolicy) -> Result<u32> {
    for attempt in 1..=policy.max_attempts {
        match bus.open() {
            Ok(()) => {
                debug!("Bus opened after {attempt} attempt(s)");
                return Ok(attempt);
            }
            Err(err) => {
                warn!(
                    "Bus open attempt {attempt}/{} failed: {err}",
                    policy.max_attempts
                );
                if attempt < policy.max_attempts {
                    thread::sleep(policy.delay(attempt));
                }
            }
        }
    }

    Err(Error::TransportOpenFailure {
        attempts: policy.max_attempts,
    })
}
