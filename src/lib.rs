// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! Host-side NVMe Management Interface client over MCTP on SMBus/I2C.
//!
//! Commands are described by [`nvme::mi::Command`], serialised with a
//! trailing MIC, fragmented into MCTP packets by [`smbus`] and exchanged
//! through a [`Bus`] by a [`Session`]. The raw response stays in the
//! session's [`ReplyBuffer`] until the caller extracts it.

pub mod bus;
pub mod checksum;
pub mod config;
mod error;
pub mod nvme;
pub mod reply;
pub mod session;
pub mod smbus;
mod wire;

pub use bus::Bus;
pub use config::{Config, ConfigBuilder, PecMode, RetryPolicy};
pub use error::{Error, Result};
pub use reply::{REPLY_BUFFER_SIZE, ReplyBuffer};
pub use session::{Session, State};

extern crate deku;
extern crate num_derive;

use deku::{DekuError, DekuWriter, no_std_io::Cursor, writer::Writer};

/// # Safety
///
/// Must only be implemented for enums carrying a `#[repr(T)]` attribute.
pub unsafe trait Discriminant<T: Copy> {
    fn id(&self) -> T {
        // SAFETY: The trait contract guarantees a primitive representation,
        // which places the discriminant at the start of the value.
        unsafe { *(self as *const Self as *const T) }
    }
}

/// Serialise a fixed-layout wire object into a buffer of at most `S` bytes.
pub trait Encode<const S: usize>: DekuWriter<()> {
    fn encode(&self) -> core::result::Result<([u8; S], usize), DekuError> {
        let mut buf = [0u8; S];
        let len = {
            let mut cursor = Cursor::new(buf.as_mut_slice());
            let mut writer = Writer::new(&mut cursor);
            self.to_writer(&mut writer, ())?;
            writer.finalize()?;
            writer.bits_written / 8
        };
        Ok((buf, len))
    }
}
