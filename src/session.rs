// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! Request/response exchanges with a single management endpoint.

use std::thread;

use log::{debug, warn};

use crate::bus::{self, Bus};
use crate::nvme::mi::{Command, MessageType, NVME_MI_MCTP_TYPE_IC};
use crate::reply::ReplyBuffer;
use crate::{Config, Error, Result, smbus};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum State {
    #[default]
    Idle,
    InExchange,
}

/// Owns the bus handle and the reply buffer for exchanges with one
/// management endpoint.
///
/// Each call to [`Session::execute`] overwrites the reply buffer, so data
/// from an exchange must be extracted before the next is issued.
pub struct Session<B: Bus> {
    bus: B,
    config: Config,
    open: bool,
    state: State,
    reply: ReplyBuffer,
}

impl<B: Bus> Session<B> {
    pub fn new(bus: B, config: Config) -> Self {
        Self {
            bus,
            config,
            open: false,
            state: State::Idle,
            reply: ReplyBuffer::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Change the transmission unit used for both fragmentation and
    /// reassembly.
    pub fn set_mtu(&mut self, mtu: usize) -> Result<()> {
        self.config.set_mtu(mtu)?;
        debug!("Session MTU set to {mtu}");
        Ok(())
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Open the bus, retrying per the configured policy. Opening an open
    /// session does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }

        bus::open_with_retry(&mut self.bus, self.config.open_retry())?;
        self.open = true;
        Ok(())
    }

    /// Close the bus. Closing a closed session does nothing.
    ///
    /// The session is closed even if the bus reports an error.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }

        self.open = false;
        if let Err(err) = self.bus.close() {
            warn!("Bus close failed: {err}");
            return Err(Error::TransportIo(err));
        }
        debug!("Bus closed");
        Ok(())
    }

    /// The raw response of the last successful exchange.
    pub fn reply(&self) -> &ReplyBuffer {
        &self.reply
    }

    /// Copy command data from the last response into `out`. See
    /// [`ReplyBuffer::response_data`] for truncation behaviour.
    pub fn response_data(&self, out: &mut [u8], typ: MessageType) -> Result<usize> {
        self.reply.response_data(out, typ)
    }

    /// Copy the leading bytes of the last response message, from the
    /// NVMe-MI header onwards, into `out`.
    pub fn response_message(&self, out: &mut [u8]) -> Result<usize> {
        self.reply.message(out)
    }

    /// Transmit `cmd` and receive the complete response into the reply
    /// buffer, opening the bus first if required.
    ///
    /// On failure the reply buffer is emptied.
    pub fn execute(&mut self, cmd: &Command) -> Result<()> {
        self.open()?;

        self.state = State::InExchange;
        let res = self.exchange(cmd);
        self.state = State::Idle;

        if let Err(err) = &res {
            warn!("{:?} exchange failed: {err}", cmd.message_type());
            self.reply.clear();
        }
        res
    }

    fn exchange(&mut self, cmd: &Command) -> Result<()> {
        let msg = cmd.encode()?;
        let packets = smbus::send_message(&mut self.bus, &msg, &self.config)?;
        debug!("Sent {} byte request in {packets} packet(s)", msg.len());

        if !self.config.response_delay().is_zero() {
            thread::sleep(self.config.response_delay());
        }

        smbus::recv_message(&mut self.bus, &mut self.reply, &self.config)?;

        if self.config.verify_mic() {
            self.reply.verify_mic()?;
        }

        let mr = self.reply.management_response()?;
        if mr.header.typ != NVME_MI_MCTP_TYPE_IC {
            return Err(Error::Framing("response is not an NVMe-MI message"));
        }
        if !mr.header.ror() {
            return Err(Error::Framing("response message lacks ROR"));
        }
        if mr.header.nmimt() != Ok(cmd.message_type()) {
            debug!(
                "Expected {:?} response, found {:?}",
                cmd.message_type(),
                mr.header.nmimt()
            );
            return Err(Error::Framing("response message type mismatch"));
        }

        Ok(())
    }
}
