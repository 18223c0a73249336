// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
#![allow(dead_code)]

extern crate simplelog;

use std::time::Duration;

use log::LevelFilter;
use nvme_mi_host::bus::EmulatedBus;
use nvme_mi_host::checksum::crc32;
use nvme_mi_host::{RetryPolicy, Session};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

pub fn setup() {
    if true {
        let _ = TermLogger::init(
            LevelFilter::Debug,
            simplelog::Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        );
    }
}

/// Default configuration without courtesy delays or open backoff.
pub fn config() -> nvme_mi_host::Config {
    nvme_mi_host::Config::builder()
        .write_delay(Duration::ZERO)
        .response_delay(Duration::ZERO)
        .open_retry(RetryPolicy::new(10, Duration::ZERO))
        .build()
        .unwrap()
}

/// A session whose device answers each exchange with the next of
/// `responses`.
pub fn session(responses: &[Vec<u8>]) -> Session<EmulatedBus> {
    let config = config();
    let mut bus = EmulatedBus::new();
    for resp in responses {
        bus.queue_response(&config, resp).unwrap();
    }
    Session::new(bus, config)
}

pub fn with_mic(mut msg: Vec<u8>) -> Vec<u8> {
    let mic = crc32(&msg);
    msg.extend_from_slice(&mic.to_le_bytes());
    msg
}

pub fn mi_response(status: u8, nmresp: [u8; 3], data: &[u8]) -> Vec<u8> {
    let mut msg = vec![0x84, 0x88, 0x00, 0x00, status];
    msg.extend_from_slice(&nmresp);
    msg.extend_from_slice(data);
    with_mic(msg)
}

/// A Read NVMe-MI Data Structure response with RDL matching `data`.
pub fn data_structure_response(data: &[u8]) -> Vec<u8> {
    let rdl = (data.len() as u16).to_le_bytes();
    mi_response(0x00, [rdl[0], rdl[1], 0x00], data)
}

pub fn admin_response(status: u8, cqedw0: u32, cqedw3: u32, data: &[u8]) -> Vec<u8> {
    let mut msg = vec![0x84, 0x90, 0x00, 0x00, status, 0x00, 0x00, 0x00];
    msg.extend_from_slice(&cqedw0.to_le_bytes());
    msg.extend_from_slice(&0u32.to_le_bytes());
    msg.extend_from_slice(&cqedw3.to_le_bytes());
    msg.extend_from_slice(data);
    with_mic(msg)
}

pub fn dword(msg: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        msg[offset],
        msg[offset + 1],
        msg[offset + 2],
        msg[offset + 3],
    ])
}

#[rustfmt::skip]
pub const RESP_INVALID_PARAMETER: [u8; 12] = [
    0x84, 0x88, 0x00, 0x00,
    0x04, 0x00, 0x00, 0x00,
    0xd7, 0x64, 0x55, 0x59,
];
