// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! In-memory bus for exercising exchanges without hardware.

use std::collections::VecDeque;
use std::io;

use log::trace;

use super::Bus;
use crate::{Config, PecMode};
use crate::Result;
use crate::smbus::{BYTE_COUNT_OVERHEAD, Fragmenter, HEADER_LEN};

/// Records every written packet and serves reads from a queue of
/// pre-loaded response bytes. Failures can be injected at open, at a given
/// write, or on any read.
#[derive(Debug, Default)]
pub struct EmulatedBus {
    open: bool,
    opens: u32,
    open_failures: u32,
    write_failure: Option<usize>,
    read_failure: bool,
    close_failure: bool,
    written: Vec<Vec<u8>>,
    rx: VecDeque<u8>,
}

impl EmulatedBus {
    pub fn new() -> Self {
        Default::default()
    }

    /// Fail the next `count` open attempts.
    pub fn fail_opens(&mut self, count: u32) -> &mut Self {
        self.open_failures = count;
        self
    }

    /// Fail the write of the packet with zero-based index `index`.
    pub fn fail_write_at(&mut self, index: usize) -> &mut Self {
        self.write_failure = Some(index);
        self
    }

    pub fn fail_reads(&mut self) -> &mut Self {
        self.read_failure = true;
        self
    }

    pub fn fail_close(&mut self) -> &mut Self {
        self.close_failure = true;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open_attempts(&self) -> u32 {
        self.opens
    }

    /// Packets written so far, each starting with the destination address.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    /// Reassemble the message carried by the written packets.
    pub fn request_message(&self) -> Vec<u8> {
        self.written
            .iter()
            .filter(|p| p.len() > HEADER_LEN)
            .flat_map(|p| {
                let len = (p[2] as usize).saturating_sub(BYTE_COUNT_OVERHEAD);
                let end = (HEADER_LEN + len).min(p.len());
                p[HEADER_LEN..end].iter().copied()
            })
            .collect()
    }

    /// Bytes queued for reading and not yet consumed.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn queue_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.rx.extend(bytes);
        self
    }

    /// Queue `msg` as a response from the management endpoint described by
    /// `config`, fragmented and framed as it would arrive on the bus.
    pub fn queue_response(&mut self, config: &Config, msg: &[u8]) -> Result<&mut Self> {
        let route = config.route().reverse();
        for packet in Fragmenter::new(msg, &route, config.mtu(), PecMode::Smbus) {
            self.rx.extend(packet?.iter());
        }
        Ok(self)
    }
}

impl Bus for EmulatedBus {
    fn open(&mut self) -> io::Result<()> {
        self.opens += 1;
        if self.open_failures > 0 {
            self.open_failures -= 1;
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "emulated open failure",
            ));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        if self.close_failure {
            return Err(io::Error::other("emulated close failure"));
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(io::ErrorKind::NotConnected.into());
        }

        if self.write_failure == Some(self.written.len()) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "emulated write failure",
            ));
        }

        trace!("Emulated write: {bytes:02x?}");
        self.written.push(bytes.to_vec());
        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if !self.open {
            return Err(io::ErrorKind::NotConnected.into());
        }

        if self.read_failure {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "emulated read failure",
            ));
        }

        if self.rx.len() < buf.len() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..buf.len())) {
            *dst = src;
        }
        Ok(())
    }
}
