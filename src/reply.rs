// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! Reassembled response storage and logical payload extraction.
//!
//! The buffer holds each accepted packet verbatim (transport header then
//! payload, PEC stripped) so the logical message is interleaved with
//! 8-byte transport headers. Extraction walks the packets using each
//! header's byte count, which keeps the arithmetic correct for any MTU.

use crate::checksum::{MIC, MIC_LEN};
use crate::nvme::mi::{ManagementResponse, MessageType};
use crate::smbus::{BYTE_COUNT_OVERHEAD, HEADER_LEN};
use crate::{Error, Result};

pub const REPLY_BUFFER_SIZE: usize = 5120;

/// NVMe-MI message header, including the MCTP message type byte
pub const NVME_MI_HEADER_LEN: usize = 4;
/// Response status and the three bytes of management response
pub const STATUS_LEN: usize = 4;
/// Completion queue entry echo carried by MI-Admin responses
pub const CQE_LEN: usize = 12;

/// Offset of the command's data within a response message of type `typ`.
pub fn data_offset(typ: MessageType) -> Result<usize> {
    match typ {
        MessageType::NvmeMiCommand => Ok(NVME_MI_HEADER_LEN + STATUS_LEN),
        MessageType::NvmeAdminCommand => Ok(NVME_MI_HEADER_LEN + STATUS_LEN + CQE_LEN),
        _ => Err(Error::InvalidCommand("unsupported NVMe-MI message type")),
    }
}

#[derive(Debug)]
pub struct ReplyBuffer<const N: usize = REPLY_BUFFER_SIZE> {
    raw: heapless::Vec<u8, N>,
    length: usize,
    packets: usize,
    complete: bool,
}

impl<const N: usize> Default for ReplyBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ReplyBuffer<N> {
    pub const fn new() -> Self {
        Self {
            raw: heapless::Vec::new(),
            length: 0,
            packets: 0,
            complete: false,
        }
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.length = 0;
        self.packets = 0;
        self.complete = false;
    }

    /// Append an accepted packet.
    ///
    /// `header` must be the packet's 8-byte transport header and `payload`
    /// exactly the bytes described by its byte count.
    pub fn push_packet(&mut self, header: &[u8], payload: &[u8]) -> Result<()> {
        if header.len() != HEADER_LEN
            || header[2] as usize != payload.len() + BYTE_COUNT_OVERHEAD
        {
            return Err(Error::Framing("packet byte count disagrees with payload"));
        }

        if self.raw.len() + header.len() + payload.len() > N {
            return Err(Error::ReplyOverflow(N));
        }

        // Capacity is checked above
        let _ = self.raw.extend_from_slice(header);
        let _ = self.raw.extend_from_slice(payload);
        self.length += payload.len();
        self.packets += 1;
        Ok(())
    }

    /// Mark the message as complete after its EOM packet.
    pub fn finish(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Logical message length, excluding transport headers.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn packets(&self) -> usize {
        self.packets
    }

    /// The stored packets, transport headers included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Iterate over the payload of each stored packet.
    pub fn payloads(&self) -> impl Iterator<Item = &[u8]> {
        let mut rest = self.raw.as_slice();
        core::iter::from_fn(move || {
            if rest.len() < HEADER_LEN {
                return None;
            }
            let len = (rest[2] as usize).saturating_sub(BYTE_COUNT_OVERHEAD);
            let end = (HEADER_LEN + len).min(rest.len());
            let payload = &rest[HEADER_LEN..end];
            rest = &rest[end..];
            Some(payload)
        })
    }

    /// Copy logical message bytes starting at `skip` into `out`, stepping
    /// over the transport header of each packet. Returns the number of
    /// bytes copied.
    pub fn copy_logical(&self, skip: usize, out: &mut [u8]) -> usize {
        let mut skip = skip;
        let mut copied = 0;

        for payload in self.payloads() {
            if copied == out.len() {
                break;
            }

            if skip >= payload.len() {
                skip -= payload.len();
                continue;
            }

            let chunk = &payload[skip..];
            skip = 0;
            let n = chunk.len().min(out.len() - copied);
            out[copied..copied + n].copy_from_slice(&chunk[..n]);
            copied += n;
        }

        copied
    }

    fn require_complete(&self) -> Result<()> {
        if !self.complete {
            return Err(Error::NoResponse);
        }
        Ok(())
    }

    /// Length of the command data in a response of type `typ`, excluding
    /// the message header, status, any completion queue entry and the MIC.
    pub fn data_len(&self, typ: MessageType) -> Result<usize> {
        self.require_complete()?;
        let overhead = data_offset(typ)? + MIC_LEN;
        self.length
            .checked_sub(overhead)
            .ok_or(Error::ShortResponse {
                expected: overhead,
                received: self.length,
            })
    }

    /// Copy the command data of the response into `out`.
    ///
    /// If `out` is shorter than the data, only `out.len()` bytes are
    /// copied. If the data is shorter than `out`, only the available bytes
    /// are copied and the remainder of `out` is untouched. Returns the
    /// number of bytes copied.
    pub fn response_data(&self, out: &mut [u8], typ: MessageType) -> Result<usize> {
        if out.is_empty() {
            return Err(Error::InvalidCommand("empty response buffer"));
        }

        let len = self.data_len(typ)?;
        let n = len.min(out.len());
        Ok(self.copy_logical(data_offset(typ)?, &mut out[..n]))
    }

    /// Allocate and fill a buffer holding at most `size` bytes of command
    /// data.
    pub fn response_vec(&self, size: usize, typ: MessageType) -> Result<Vec<u8>> {
        let len = self.data_len(typ)?.min(size);

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| Error::AllocationFailure(len))?;
        data.resize(len, 0);
        self.copy_logical(data_offset(typ)?, &mut data);
        Ok(data)
    }

    /// Copy the start of the message, from the NVMe-MI header onwards, into
    /// `out`.
    pub fn message(&self, out: &mut [u8]) -> Result<usize> {
        self.require_complete()?;
        Ok(self.copy_logical(0, out))
    }

    /// Decode the message header, status and management response fields
    /// shared by every response.
    pub fn management_response(&self) -> Result<ManagementResponse> {
        let mut buf = [0u8; ManagementResponse::LEN];
        let len = self.message(&mut buf)?;
        ManagementResponse::decode(&buf[..len])
    }

    /// Check the trailing MIC against the preceding message bytes.
    pub fn verify_mic(&self) -> Result<()> {
        self.require_complete()?;
        let body_len = self
            .length
            .checked_sub(MIC_LEN)
            .ok_or(Error::ShortResponse {
                expected: MIC_LEN,
                received: self.length,
            })?;

        let mut tail = [0u8; MIC_LEN];
        self.copy_logical(body_len, &mut tail);
        let received = u32::from_le_bytes(tail);

        let mut digest = MIC.digest();
        let mut pos = 0;
        for payload in self.payloads() {
            let take = body_len.saturating_sub(pos).min(payload.len());
            digest.update(&payload[..take]);
            pos += take;
        }
        let calculated = digest.finalize();

        if calculated != received {
            return Err(Error::MicMismatch {
                calculated,
                received,
            });
        }
        Ok(())
    }
}
