// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
use deku::DekuError;
use thiserror::Error;

use crate::nvme::CompletionStatus;

/// Failures surfaced by a management exchange.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The bus could not be opened within the retry budget.
    #[error("unable to open bus after {attempts} attempts")]
    TransportOpenFailure { attempts: u32 },

    /// A single bus read or write failed.
    #[error("bus I/O failure: {0}")]
    TransportIo(#[source] std::io::Error),

    /// Fewer bytes were received than the command requires.
    #[error("short response: expected {expected} bytes, received {received}")]
    ShortResponse { expected: usize, received: usize },

    /// A response buffer of the given size could not be allocated.
    #[error("unable to allocate {0} byte response buffer")]
    AllocationFailure(usize),

    #[error("packet error code mismatch: calculated {calculated:#04x}, received {received:#04x}")]
    PecMismatch { calculated: u8, received: u8 },

    #[error("message integrity check mismatch: calculated {calculated:#010x}, received {received:#010x}")]
    MicMismatch { calculated: u32, received: u32 },

    #[error("malformed packet: {0}")]
    Framing(&'static str),

    /// The reassembled response does not fit the reply buffer.
    #[error("response exceeds {0} byte reply buffer")]
    ReplyOverflow(usize),

    /// No completed exchange is held in the reply buffer.
    #[error("no response available")]
    NoResponse,

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("invalid command: {0}")]
    InvalidCommand(&'static str),

    #[error("codec failure: {0}")]
    Codec(String),

    /// The management endpoint answered with a non-success response status.
    #[error("management endpoint responded with status {0:#04x}")]
    Status(u8),

    /// The controller completed the tunnelled admin command with an error.
    #[error("admin command failed: {0:?}")]
    Completion(CompletionStatus),
}

impl From<DekuError> for Error {
    fn from(err: DekuError) -> Self {
        Self::Codec(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
