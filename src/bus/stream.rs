// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! Bus over a byte stream bridged to an SMBus segment, such as a QEMU
//! chardev or a socket to an emulated endpoint.
//!
//! The far end of the stream receives complete packets, destination
//! address byte included, and returns response packets in the same form.
//! A raw Linux `i2c-dev` node does not fit: the kernel supplies the address
//! byte itself once a target is selected.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;

use log::debug;

use super::Bus;

type Connector<S> = Box<dyn FnMut() -> io::Result<S> + Send>;

pub struct StreamBus<S: Read + Write> {
    connect: Connector<S>,
    stream: Option<S>,
}

impl<S: Read + Write> StreamBus<S> {
    /// Create a bus that obtains its stream from `connect` on each open.
    pub fn new<F>(connect: F) -> Self
    where
        F: FnMut() -> io::Result<S> + Send + 'static,
    {
        Self {
            connect: Box::new(connect),
            stream: None,
        }
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    fn connected(&mut self) -> io::Result<&mut S> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::ErrorKind::NotConnected.into())
    }
}

impl StreamBus<File> {
    /// Bus backed by the bridge endpoint at `path`, opened read-write.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(move || {
            debug!("Opening {}", path.display());
            OpenOptions::new().read(true).write(true).open(&path)
        })
    }
}

impl<S: Read + Write> Bus for StreamBus<S> {
    fn open(&mut self) -> io::Result<()> {
        if self.stream.is_none() {
            self.stream = Some((self.connect)()?);
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => stream.flush(),
            None => Ok(()),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let stream = self.connected()?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.connected()?.read_exact(buf)
    }
}
