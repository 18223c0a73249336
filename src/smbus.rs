// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! MCTP packetisation for the SMBus/I2C binding (DSP0237).
//!
//! Every packet on the wire is laid out as:
//!
//! ```text
//! +------+------+-------+------+-----+------+------+-------+---------+-----+
//! | dest | 0x0f | count | src  | ver | deid | seid | flags | payload | PEC |
//! +------+------+-------+------+-----+------+------+-------+---------+-----+
//! ```
//!
//! `count` covers the source address, the four MCTP header bytes and the
//! payload. The PEC covers everything before it, starting with `dest`.

use std::io;
use std::thread;

use deku::prelude::*;
use log::{debug, trace};
use mctp::{Eid, MCTP_HEADER_VERSION_1, MCTP_SEQ_MASK, MCTP_TAG_MAX, MCTP_TAG_OWNER};

use crate::bus::Bus;
use crate::config::{Config, MAX_MTU, PecMode};
use crate::reply::ReplyBuffer;
use crate::{Encode, Error, Result};

pub const MCTP_SMBUS_COMMAND_CODE: u8 = 0x0f;
pub const HEADER_LEN: usize = 8;
/// Bytes counted by the SMBus byte count in addition to the payload
pub const BYTE_COUNT_OVERHEAD: usize = 5;
pub const PEC_LEN: usize = 1;
pub const MAX_PACKET: usize = HEADER_LEN + MAX_MTU + PEC_LEN;

const FLAG_SOM: u8 = 0x80;
const FLAG_EOM: u8 = 0x40;
const SEQ_SHIFT: u8 = 4;

pub type Packet = heapless::Vec<u8, MAX_PACKET>;

/// Addressing for one direction of an exchange.
#[derive(Clone, Copy, Debug)]
pub struct Route {
    pub dest_addr: u8,
    pub src_addr: u8,
    pub dest_eid: Eid,
    pub src_eid: Eid,
    pub tag: u8,
    pub owner: bool,
}

impl Route {
    /// The route taken by a response to a message sent along `self`.
    pub fn reverse(&self) -> Self {
        Self {
            dest_addr: self.src_addr,
            src_addr: self.dest_addr,
            dest_eid: self.src_eid,
            src_eid: self.dest_eid,
            tag: self.tag,
            owner: !self.owner,
        }
    }
}

// DSP0237 v1.2, 6.1, Figure 1
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct TransportHeader {
    pub dest_slave_addr: u8,
    pub command_code: u8,
    pub byte_count: u8,
    pub source_slave_addr: u8,
    pub version: u8,
    pub dest_eid: u8,
    pub src_eid: u8,
    pub flags: u8,
}
impl Encode<HEADER_LEN> for TransportHeader {}

impl TransportHeader {
    fn new(route: &Route, payload_len: usize, seq: u8, som: bool, eom: bool) -> Self {
        let mut flags = route.tag & MCTP_TAG_MAX;
        if route.owner {
            flags |= MCTP_TAG_OWNER;
        }
        flags |= (seq & MCTP_SEQ_MASK) << SEQ_SHIFT;
        if som {
            flags |= FLAG_SOM;
        }
        if eom {
            flags |= FLAG_EOM;
        }

        Self {
            dest_slave_addr: route.dest_addr << 1,
            command_code: MCTP_SMBUS_COMMAND_CODE,
            byte_count: (payload_len + BYTE_COUNT_OVERHEAD) as u8,
            source_slave_addr: (route.src_addr << 1) | 1,
            version: MCTP_HEADER_VERSION_1,
            dest_eid: route.dest_eid.0,
            src_eid: route.src_eid.0,
            flags,
        }
    }

    pub fn dest_addr(&self) -> u8 {
        self.dest_slave_addr >> 1
    }

    pub fn src_addr(&self) -> u8 {
        self.source_slave_addr >> 1
    }

    pub fn payload_len(&self) -> usize {
        (self.byte_count as usize).saturating_sub(BYTE_COUNT_OVERHEAD)
    }

    pub fn som(&self) -> bool {
        self.flags & FLAG_SOM != 0
    }

    pub fn eom(&self) -> bool {
        self.flags & FLAG_EOM != 0
    }

    pub fn seq(&self) -> u8 {
        (self.flags >> SEQ_SHIFT) & MCTP_SEQ_MASK
    }

    pub fn tag(&self) -> u8 {
        self.flags & MCTP_TAG_MAX
    }

    pub fn owner(&self) -> bool {
        self.flags & MCTP_TAG_OWNER != 0
    }
}

/// Frame `payload` behind `header` and append the PEC.
pub fn encode_packet(header: &TransportHeader, payload: &[u8], pec: PecMode) -> Result<Packet> {
    let (hdr, len) = header.encode()?;
    let hdr = &hdr[..len];

    let mut packet = Packet::new();
    packet
        .extend_from_slice(hdr)
        .and_then(|_| packet.extend_from_slice(payload))
        .map_err(|_| Error::Framing("payload exceeds maximum packet size"))?;
    packet
        .push(pec.code(hdr, payload))
        .map_err(|_| Error::Framing("payload exceeds maximum packet size"))?;

    Ok(packet)
}

/// Splits a message into MTU-sized packets.
///
/// An empty message still produces a single packet carrying both SOM and
/// EOM.
pub struct Fragmenter<'a> {
    msg: &'a [u8],
    route: Route,
    mtu: usize,
    pec: PecMode,
    offset: usize,
    seq: u8,
    done: bool,
}

impl<'a> Fragmenter<'a> {
    pub fn new(msg: &'a [u8], route: &Route, mtu: usize, pec: PecMode) -> Self {
        Self {
            msg,
            route: *route,
            mtu: mtu.clamp(1, MAX_MTU),
            pec,
            offset: 0,
            seq: 0,
            done: false,
        }
    }
}

impl Iterator for Fragmenter<'_> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let remaining = &self.msg[self.offset..];
        let len = remaining.len().min(self.mtu);
        let som = self.offset == 0;
        let eom = len == remaining.len();
        let header = TransportHeader::new(&self.route, len, self.seq, som, eom);

        self.offset += len;
        self.seq = (self.seq + 1) & MCTP_SEQ_MASK;
        self.done = eom;

        Some(encode_packet(&header, &remaining[..len], self.pec))
    }
}

/// Transmit `msg` to the management endpoint, returning the number of
/// packets written.
pub fn send_message<B: Bus + ?Sized>(bus: &mut B, msg: &[u8], config: &Config) -> Result<usize> {
    let route = config.route();
    let mut sent = 0;

    for packet in Fragmenter::new(msg, &route, config.mtu(), config.pec()) {
        let packet = packet?;
        let written = bus.write(&packet).map_err(Error::TransportIo)?;
        if written != packet.len() {
            debug!("Short write of packet {sent}: {written} of {}", packet.len());
            return Err(Error::TransportIo(io::Error::new(
                io::ErrorKind::WriteZero,
                "short packet write",
            )));
        }
        trace!("Sent packet {sent}: {:02x?}", packet.as_slice());
        sent += 1;

        if !config.write_delay().is_zero() {
            thread::sleep(config.write_delay());
        }
    }

    Ok(sent)
}

fn validate(header: &TransportHeader, config: &Config, received: usize, next_seq: u8) -> Result<()> {
    if header.command_code != MCTP_SMBUS_COMMAND_CODE {
        return Err(Error::Framing("unexpected SMBus command code"));
    }

    if (header.byte_count as usize) < BYTE_COUNT_OVERHEAD {
        return Err(Error::Framing("byte count shorter than MCTP header"));
    }

    if header.version & 0x0f != MCTP_HEADER_VERSION_1 {
        return Err(Error::Framing("unsupported MCTP header version"));
    }

    if header.payload_len() > config.mtu() {
        return Err(Error::Framing("packet payload exceeds transmission unit"));
    }

    if received == 0 && !header.som() {
        return Err(Error::Framing("first packet lacks start of message"));
    }

    if received > 0 && header.som() {
        return Err(Error::Framing("start of message within message"));
    }

    if received > 0 && header.seq() != next_seq {
        return Err(Error::Framing("packet sequence number out of order"));
    }

    if header.tag() != config.tag() {
        return Err(Error::Framing("message tag mismatch"));
    }

    Ok(())
}

/// Receive a complete response message into `reply`, returning the number
/// of packets consumed.
///
/// `reply` is cleared first. It is marked complete only once a packet
/// carrying EOM has been accepted.
pub fn recv_message<B: Bus + ?Sized, const N: usize>(
    bus: &mut B,
    reply: &mut ReplyBuffer<N>,
    config: &Config,
) -> Result<usize> {
    reply.clear();

    let mut received = 0;
    let mut next_seq = 0;
    let mut body = [0u8; MAX_MTU + PEC_LEN];

    loop {
        let mut raw = [0u8; HEADER_LEN];
        bus.read(&mut raw).map_err(Error::TransportIo)?;
        let (_, header) = TransportHeader::from_bytes((raw.as_slice(), 0))?;
        validate(&header, config, received, next_seq)?;

        let len = header.payload_len();
        let body = &mut body[..len + PEC_LEN];
        bus.read(body).map_err(Error::TransportIo)?;
        let (payload, pec) = body.split_at(len);

        // Endpoints send the unmodified SMBus PEC whatever our transmit mode
        if config.verify_pec() {
            let calculated = PecMode::Smbus.code(&raw, payload);
            if calculated != pec[0] {
                return Err(Error::PecMismatch {
                    calculated,
                    received: pec[0],
                });
            }
        }

        trace!("Received packet {received}: {raw:02x?} {payload:02x?}");
        reply.push_packet(&raw, payload)?;
        received += 1;
        next_seq = (header.seq() + 1) & MCTP_SEQ_MASK;

        if header.eom() {
            reply.finish();
            debug!(
                "Received {} byte response in {received} packet(s)",
                reply.len()
            );
            return Ok(received);
        }
    }
}
