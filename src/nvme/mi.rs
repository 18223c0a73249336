// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! NVMe-MI message encoding and management response decoding.

use deku::ctx::Endian;
use deku::prelude::*;
use flagset::{FlagSet, flags};
use log::debug;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::checksum::{self, MIC_LEN};
use crate::nvme::{AdminCommandRequestHeader, CriticalWarning};
use crate::wire::{WireFlagSet, WireVec};
use crate::{Discriminant, Encode, Error, Result};

pub mod host;

/// MCTP message type for NVMe-MI with the integrity check bit set
pub const NVME_MI_MCTP_TYPE_IC: u8 = mctp::MCTP_TYPE_NVME.0 | 0x80;

// MI v2.0, 3.1.1, Figure 20, NMIMT
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    ControlPrimitive = 0x00,
    NvmeMiCommand = 0x01,
    NvmeAdminCommand = 0x02,
    PcieCommand = 0x04,
    AsynchronousEvent = 0x05,
}
unsafe impl Discriminant<u8> for MessageType {}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> core::result::Result<Self, u8> {
        match value {
            0x00 => Ok(Self::ControlPrimitive),
            0x01 => Ok(Self::NvmeMiCommand),
            0x02 => Ok(Self::NvmeAdminCommand),
            0x04 => Ok(Self::PcieCommand),
            0x05 => Ok(Self::AsynchronousEvent),
            _ => Err(value),
        }
    }
}

// MI v2.0, 3.1.1, Figure 20
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct MessageHeader {
    pub typ: u8,
    #[deku(pad_bytes_after = "2")]
    pub nmimt: u8,
}
impl Encode<4> for MessageHeader {}

impl MessageHeader {
    pub fn request(nmimt: MessageType) -> Self {
        Self {
            typ: NVME_MI_MCTP_TYPE_IC,
            nmimt: (nmimt.id() & 0xf) << 3,
        }
    }

    pub fn ic(&self) -> bool {
        (self.typ & 0x80) != 0
    }

    pub fn nmimt(&self) -> core::result::Result<MessageType, u8> {
        ((self.nmimt >> 3) & 0xf).try_into()
    }

    pub fn csi(&self) -> bool {
        (self.nmimt & 0x01) != 0
    }

    pub fn ror(&self) -> bool {
        (self.nmimt & 0x80) != 0
    }
}

// MI v2.0, 4.1.2, Figure 29
#[derive(Clone, Copy, Debug, FromPrimitive, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseStatus {
    Success = 0x00,
    MoreProcessingRequired = 0x01,
    InternalError = 0x02,
    InvalidCommandOpcode = 0x03,
    InvalidParameter = 0x04,
    InvalidCommandSize = 0x05,
    InvalidCommandInputDataSize = 0x06,
    AccessDenied = 0x07,
    VpdUpdatesExceeded = 0x20,
    PcieInaccessible = 0x21,
    ManagementEndpointBufferCleared = 0x22,
    EnclosureServicesFailure = 0x23,
    EnclosureServicesTransferFailure = 0x24,
    EnclosureFailure = 0x25,
    EnclosureServicesTransferRefused = 0x26,
    UnsupportedEnclosureFunction = 0x27,
    EnclosureServicesUnavailable = 0x28,
    EnclosureDegraded = 0x29,
    SanitizeInProgress = 0x2a,
}
unsafe impl Discriminant<u8> for ResponseStatus {}

impl TryFrom<u8> for ResponseStatus {
    type Error = u8;

    fn try_from(value: u8) -> core::result::Result<Self, u8> {
        Self::from_u8(value).ok_or(value)
    }
}

// MI v2.0, 5, Figure 71
#[derive(Debug, DekuRead, DekuWrite)]
#[deku(endian = "little")]
struct NvmeManagementResponse {
    status: u8,
    nmresp: [u8; 3],
}
impl Encode<4> for NvmeManagementResponse {}

/// The leading eight bytes common to every response message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagementResponse {
    pub header: MessageHeader,
    pub status: u8,
    pub nvme_management_response: [u8; 3],
}

impl ManagementResponse {
    pub const LEN: usize = 8;

    pub fn decode(msg: &[u8]) -> Result<Self> {
        if msg.len() < Self::LEN {
            return Err(Error::ShortResponse {
                expected: Self::LEN,
                received: msg.len(),
            });
        }

        let (_, header) = MessageHeader::from_bytes((msg, 0))?;
        let (_, mr) = NvmeManagementResponse::from_bytes((&msg[4..], 0))?;
        Ok(Self {
            header,
            status: mr.status,
            nvme_management_response: mr.nmresp,
        })
    }

    pub fn status(&self) -> core::result::Result<ResponseStatus, u8> {
        self.status.try_into()
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success.id()
    }
}

// MI v2.0, 5, Figure 68
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NvmeMiOpcode {
    ReadNvmeMiDataStructure = 0x00,
    NvmSubsystemHealthStatusPoll = 0x01,
    ControllerHealthStatusPoll = 0x02,
    ConfigurationSet = 0x03,
    ConfigurationGet = 0x04,
    VpdRead = 0x05,
    VpdWrite = 0x06,
    Reset = 0x07,
    SesReceive = 0x08,
    SesSend = 0x09,
    ManagementEndpointBufferRead = 0x0a,
    ManagementEndpointBufferWrite = 0x0b,
    Shutdown = 0x0c,
}
unsafe impl Discriminant<u8> for NvmeMiOpcode {}

// MI v2.0, 5, Figure 67
#[derive(Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct NvmeMiCommandRequestHeader {
    #[deku(pad_bytes_after = "3")]
    pub opcode: u8,
    pub cdw0: u32,
    pub cdw1: u32,
}
impl Encode<12> for NvmeMiCommandRequestHeader {}

// MI v2.0, 5.7, Figure 109, DTYP
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DataStructureType {
    NvmSubsystemInformation = 0x00,
    PortInformation = 0x01,
    ControllerList = 0x02,
    ControllerInformation = 0x03,
    OptionallySupportedCommandList = 0x04,
    ManagementEndpointBufferCommandSupportList = 0x05,
}
unsafe impl Discriminant<u8> for DataStructureType {}

// MI v2.0, 5.1, Figure 74
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfigurationIdentifier {
    SmbusI2cFrequency = 0x01,
    HealthStatusChange = 0x02,
    MctpTransmissionUnitSize = 0x03,
}
unsafe impl Discriminant<u8> for ConfigurationIdentifier {}

// MI v2.0, Figure 116, MVPDFREQ
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum SmbusFrequency {
    FreqNotSupported = 0x00,
    Freq100Khz = 0x01,
    Freq400Khz = 0x02,
    Freq1Mhz = 0x03,
}
unsafe impl Discriminant<u8> for SmbusFrequency {}

// MI v2.0, 5.2.2, Figure 88
flags! {
    #[repr(u32)]
    pub enum HealthStatusChangeFlags: u32 {
        Rdy = 1 << 0,
        Cfs = 1 << 1,
        Shst = 1 << 2,
        Nssro = 1 << 4,
        Ceco = 1 << 5,
        Nac = 1 << 6,
        Fa = 1 << 7,
        Csts = 1 << 8,
        Ctemp = 1 << 9,
        Pldu = 1 << 10,
        Spare = 1 << 11,
        Cwarn = 1 << 12,
        Tcida = 1 << 13,
    }
}

/// Arguments to Configuration Set, one per configuration identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfigurationSet {
    // MI v2.0, 5.2.1, Figure 86
    SmbusI2cFrequency { port: u8, freq: SmbusFrequency } = 0x01,
    // MI v2.0, 5.2.2, Figure 87
    HealthStatusChange(FlagSet<HealthStatusChangeFlags>) = 0x02,
    // MI v2.0, 5.2.3, Figure 89
    MctpTransmissionUnitSize { port: u8, mtus: u16 } = 0x03,
}
unsafe impl Discriminant<u8> for ConfigurationSet {}

/// A value reported by Configuration Get.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigurationValue {
    SmbusI2cFrequency(SmbusFrequency),
    HealthStatusChange,
    MctpTransmissionUnitSize(u16),
}

impl ConfigurationValue {
    // MI v2.0, 5.1.1-5.1.3, Figures 77-79
    pub fn decode(id: ConfigurationIdentifier, nmresp: [u8; 3]) -> Result<Self> {
        match id {
            ConfigurationIdentifier::SmbusI2cFrequency => SmbusFrequency::from_u8(nmresp[0] & 0x0f)
                .map(Self::SmbusI2cFrequency)
                .ok_or_else(|| {
                    Error::Codec(format!("invalid SMBus frequency {:#x}", nmresp[0] & 0x0f))
                }),
            ConfigurationIdentifier::HealthStatusChange => Ok(Self::HealthStatusChange),
            ConfigurationIdentifier::MctpTransmissionUnitSize => Ok(Self::MctpTransmissionUnitSize(
                u16::from_le_bytes([nmresp[0], nmresp[1]]),
            )),
        }
    }
}

// MI v2.0, 5.3, Figure 94
flags! {
    pub enum ControllerFunctionAndReportingFlags: u8 {
        Incf = 1 << 0,
        Incpf = 1 << 1,
        Incvf = 1 << 2,
        All = 1 << 7,
    }
}

// MI v2.0, 5.3, Figure 95
flags! {
    pub enum ControllerPropertyFlags: u32 {
        Csts = 1 << 0,
        Ctemp = 1 << 1,
        Pldu = 1 << 2,
        Spare = 1 << 3,
        Cwarn = 1 << 4,
        Ccf = 1 << 31,
    }
}

/// A management command with its two command dwords and request data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MiCommand<'a> {
    pub opcode: NvmeMiOpcode,
    pub cdw0: u32,
    pub cdw1: u32,
    pub data: &'a [u8],
}

impl<'a> MiCommand<'a> {
    pub fn new(opcode: NvmeMiOpcode, cdw0: u32, cdw1: u32) -> Self {
        Self {
            opcode,
            cdw0,
            cdw1,
            data: &[],
        }
    }

    pub fn with_data(self, data: &'a [u8]) -> Self {
        Self { data, ..self }
    }

    // MI v2.0, 5.7, Figure 109
    pub fn read_data_structure(dtyp: DataStructureType, ctrlid: u16, portid: u8) -> Self {
        let cdw0 = ctrlid as u32 | (portid as u32) << 16 | (dtyp.id() as u32) << 24;
        Self::new(NvmeMiOpcode::ReadNvmeMiDataStructure, cdw0, 0)
    }

    // MI v2.0, 5.6, Figure 106
    pub fn nvm_subsystem_health_status_poll(clear: bool) -> Self {
        Self::new(
            NvmeMiOpcode::NvmSubsystemHealthStatusPoll,
            0,
            (clear as u32) << 31,
        )
    }

    // MI v2.0, 5.3, Figures 94, 95
    pub fn controller_health_status_poll(
        sctlid: u16,
        maxrent: u8,
        functions: FlagSet<ControllerFunctionAndReportingFlags>,
        properties: FlagSet<ControllerPropertyFlags>,
    ) -> Self {
        let cdw0 = sctlid as u32 | (maxrent as u32) << 16 | (functions.bits() as u32) << 24;
        Self::new(
            NvmeMiOpcode::ControllerHealthStatusPoll,
            cdw0,
            properties.bits(),
        )
    }

    // MI v2.0, 5.1, Figure 73
    pub fn configuration_get(id: ConfigurationIdentifier, portid: u8) -> Self {
        let cdw0 = id.id() as u32 | (portid as u32) << 24;
        Self::new(NvmeMiOpcode::ConfigurationGet, cdw0, 0)
    }

    // MI v2.0, 5.2, Figure 84
    pub fn configuration_set(set: ConfigurationSet) -> Self {
        let id = set.id() as u32;
        let (cdw0, cdw1) = match set {
            ConfigurationSet::SmbusI2cFrequency { port, freq } => {
                (id | (freq.id() as u32) << 8 | (port as u32) << 24, 0)
            }
            ConfigurationSet::HealthStatusChange(flags) => (id, flags.bits()),
            ConfigurationSet::MctpTransmissionUnitSize { port, mtus } => {
                (id | (port as u32) << 24, mtus as u32)
            }
        };
        Self::new(NvmeMiOpcode::ConfigurationSet, cdw0, cdw1)
    }

    // MI v2.0, 5.9, Figure 117
    pub fn vpd_read(dofst: u16, dlen: u16) -> Self {
        Self::new(NvmeMiOpcode::VpdRead, dofst as u32, dlen as u32)
    }

    // MI v2.0, 5.10, Figure 119
    pub fn vpd_write(dofst: u16, data: &'a [u8]) -> Result<Self> {
        let dlen = u16::try_from(data.len())
            .map_err(|_| Error::InvalidCommand("VPD write exceeds 65535 bytes"))?;
        Ok(Self::new(NvmeMiOpcode::VpdWrite, dofst as u32, dlen as u32).with_data(data))
    }
}

/// An NVMe Admin command tunnelled through NVMe-MI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminCommand<'a> {
    pub request: AdminCommandRequestHeader,
    pub data: &'a [u8],
}

impl From<AdminCommandRequestHeader> for AdminCommand<'_> {
    fn from(request: AdminCommandRequestHeader) -> Self {
        Self { request, data: &[] }
    }
}

/// A request ready for serialisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Mi(MiCommand<'a>),
    Admin(AdminCommand<'a>),
}

impl<'a> From<MiCommand<'a>> for Command<'a> {
    fn from(cmd: MiCommand<'a>) -> Self {
        Self::Mi(cmd)
    }
}

impl<'a> From<AdminCommand<'a>> for Command<'a> {
    fn from(cmd: AdminCommand<'a>) -> Self {
        Self::Admin(cmd)
    }
}

impl Command<'_> {
    pub fn message_type(&self) -> MessageType {
        match self {
            Command::Mi(_) => MessageType::NvmeMiCommand,
            Command::Admin(_) => MessageType::NvmeAdminCommand,
        }
    }

    fn data(&self) -> &[u8] {
        match self {
            Command::Mi(c) => c.data,
            Command::Admin(c) => c.data,
        }
    }

    /// Serialise the request message, including the trailing MIC.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (mh, mhlen) = MessageHeader::request(self.message_type()).encode()?;

        let mut body = [0u8; 64];
        let blen = match self {
            Command::Mi(c) => {
                let ch = NvmeMiCommandRequestHeader {
                    opcode: c.opcode.id(),
                    cdw0: c.cdw0,
                    cdw1: c.cdw1,
                };
                let (buf, len) = ch.encode()?;
                body[..len].copy_from_slice(&buf[..len]);
                len
            }
            Command::Admin(c) => {
                let (buf, len) = c.request.encode()?;
                body[..len].copy_from_slice(&buf[..len]);
                len
            }
        };

        let data = self.data();
        let total = mhlen + blen + data.len() + MIC_LEN;
        let mut msg = Vec::new();
        msg.try_reserve_exact(total)
            .map_err(|_| Error::AllocationFailure(total))?;
        msg.extend_from_slice(&mh[..mhlen]);
        msg.extend_from_slice(&body[..blen]);
        msg.extend_from_slice(data);

        let mic = checksum::crc32(&msg);
        msg.extend_from_slice(&mic.to_le_bytes());

        debug!(
            "Encoded {:?} request: {} bytes, MIC {mic:#010x}",
            self.message_type(),
            msg.len()
        );
        Ok(msg)
    }
}

// MI v2.0, 6, Figure 138
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct AdminCommandResponseHeader {
    #[deku(pad_bytes_after = "3")]
    pub status: u8,
    pub cqedw0: u32,
    pub cqedw1: u32,
    pub cqedw3: u32,
}
impl Encode<16> for AdminCommandResponseHeader {}

impl AdminCommandResponseHeader {
    pub const LEN: usize = 16;

    pub fn completion(&self) -> crate::nvme::CompletionStatus {
        self.cqedw3.into()
    }
}

/// Decode a fixed-layout structure from the start of `data`, reporting a
/// short response if fewer than `min` bytes are present.
pub(crate) fn decode_prefix<'a, T>(data: &'a [u8], min: usize) -> Result<T>
where
    T: DekuContainerRead<'a>,
{
    if data.len() < min {
        return Err(Error::ShortResponse {
            expected: min,
            received: data.len(),
        });
    }
    let (_, value) = T::from_bytes((data, 0))?;
    Ok(value)
}

// MI v2.0, 5.7.1, Figure 112
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct NvmSubsystemInformation {
    pub nump: u8,
    pub mjr: u8,
    pub mnr: u8,
    pub nnsc: u8,
}

impl NvmSubsystemInformation {
    pub const LEN: usize = 4;

    /// Number of ports, converted from the zero-based NUMP field.
    pub fn ports(&self) -> usize {
        self.nump as usize + 1
    }

    /// NVM Subsystem Report supported
    pub fn sre(&self) -> bool {
        self.nnsc & 0x01 != 0
    }
}

// MI v2.0, 5.7.2, Figure 115
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(ctx = "endian: Endian", endian = "endian")]
pub struct PciePortData {
    pub pciemps: u8,
    pub pcieslsv: u8,
    pub pciecls: u8,
    pub pciemlw: u8,
    pub pcienlw: u8,
    pub pciepn: u8,
}

// MI v2.0, 5.7.2, Figure 116
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(ctx = "endian: Endian", endian = "endian")]
pub struct TwoWirePortData {
    pub cvpdaddr: u8,
    pub mvpdfreq: u8,
    pub cmeaddr: u8,
    pub twprt: u8,
    pub nvmebm: u8,
}

impl TwoWirePortData {
    pub fn max_vpd_frequency(&self) -> Option<SmbusFrequency> {
        SmbusFrequency::from_u8(self.mvpdfreq & 0x0f)
    }
}

// MI v2.0, 5.7.2, Figure 114, PRTTYP
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(ctx = "endian: Endian, prttyp: u8", id = "prttyp", endian = "endian")]
#[repr(u8)]
pub enum PortData {
    Inactive = 0x00,
    #[deku(id = 0x01)]
    Pcie(PciePortData),
    #[deku(id = 0x02)]
    TwoWire(TwoWirePortData),
}

// MI v2.0, 5.7.2, Figure 114
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct PortInformation {
    pub prttyp: u8,
    pub prtcap: u8,
    pub mmtus: u16,
    pub mebs: u32,
    #[deku(ctx = "*prttyp")]
    pub data: PortData,
}

impl PortInformation {
    pub const LEN: usize = 8;
}

// MI v2.0, 5.7.3; Base v2.1, 5.1.13.2.12
#[derive(Debug, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct ControllerList {
    #[deku(update = "self.ids.len()")]
    numids: u16,
    #[deku(count = "numids")]
    ids: WireVec<u16, 2047>,
}

impl ControllerList {
    pub const MIN_LEN: usize = 2;

    pub fn ids(&self) -> &[u16] {
        self.ids.as_slice()
    }
}

// MI v2.0, 5.7.4, Figure 117
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct ControllerInformation {
    #[deku(pad_bytes_after = "4")]
    pub portid: u8,
    pub prii: u8,
    pub pri: u16,
    pub pcivid: u16,
    pub pcidid: u16,
    pub pcisvid: u16,
    pub pcisdid: u16,
    pub pciesn: u8,
}

impl ControllerInformation {
    pub const LEN: usize = 18;

    /// PCIe routing ID information is valid
    pub fn pri_valid(&self) -> bool {
        self.prii & 0x01 != 0
    }
}

// MI v2.0, 5.7.5, Figure 119
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(ctx = "endian: Endian", endian = "endian")]
pub struct OptionallySupportedCommand {
    pub cmdtyp: u8,
    pub opc: u8,
}

// MI v2.0, 5.7.5, Figure 118
#[derive(Debug, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct OptionallySupportedCommandList {
    #[deku(update = "self.cmds.len()")]
    numcmd: u16,
    #[deku(count = "numcmd")]
    cmds: WireVec<OptionallySupportedCommand, 2047>,
}

impl OptionallySupportedCommandList {
    pub const MIN_LEN: usize = 2;

    pub fn commands(&self) -> &[OptionallySupportedCommand] {
        self.cmds.as_slice()
    }
}

// MI v2.0, 5.6, Figure 108, NSS
flags! {
    pub enum NvmSubsystemStatusFlags: u8 {
        P1la = 1 << 2,
        P0la = 1 << 3,
        Rnr = 1 << 4,
        Df = 1 << 5,
        Sfm = 1 << 6,
        Atf = 1 << 7,
    }
}

// MI v2.0, 5.6, Figure 107
flags! {
    #[repr(u16)]
    pub enum CompositeControllerStatusFlags: u16 {
        Rdy = 1 << 0,
        Cfs = 1 << 1,
        Shst = 1 << 2,
        Nssro = 1 << 4,
        Ceco = 1 << 5,
        Nac = 1 << 6,
        Fa = 1 << 7,
        Csts = 1 << 8,
        Ctemp = 1 << 9,
        Pdlu = 1 << 10,
        Spare = 1 << 11,
        Cwarn = 1 << 12,
        Tcida = 1 << 13,
    }
}

// MI v2.0, 5.6, Figure 108
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct NvmSubsystemHealth {
    pub nss: WireFlagSet<NvmSubsystemStatusFlags>,
    pub sw: u8,
    pub ctemp: u8,
    pub pldu: u8,
    #[deku(pad_bytes_after = "2")]
    pub ccs: WireFlagSet<CompositeControllerStatusFlags>,
}

impl NvmSubsystemHealth {
    pub const LEN: usize = 8;

    /// Active SMART warnings. The SW field reports a warning as a cleared
    /// bit.
    pub fn warnings(&self) -> FlagSet<CriticalWarning> {
        FlagSet::new_truncated(!self.sw)
    }

    /// Composite temperature in degrees Celsius, if reported.
    pub fn composite_temperature(&self) -> Option<i8> {
        temperature(self.ctemp)
    }
}

// MI v2.0, 5.6, Figure 108, CTEMP
fn temperature(raw: u8) -> Option<i8> {
    match raw {
        0x80 => None,
        t => Some(t as i8),
    }
}

// MI v2.0, 5.3, Figure 97, CSTS
flags! {
    pub enum ControllerStatusFlags: u16 {
        Rdy = 1 << 0,
        Cfs = 1 << 1,
        ShstInProgress = 1 << 2,
        ShstComplete = 1 << 3,
        ShstReserved = (ControllerStatusFlags::ShstInProgress | ControllerStatusFlags::ShstComplete).bits(),
        Nssro = 1 << 4,
        Ceco = 1 << 5,
        Nac = 1 << 6,
        Fa = 1 << 7,
        Tcida = 1 << 8,
    }
}

// MI v2.0, 5.3, Figure 98
flags! {
    pub enum ControllerHealthStatusChangedFlags: u16 {
        Rdy = 1 << 0,
        Cfs = 1 << 1,
        Shst = 1 << 2,
        Nssro = 1 << 4,
        Ceco = 1 << 5,
        Nac = 1 << 6,
        Fa = 1 << 7,
        Csts = 1 << 8,
        Ctemp = 1 << 9,
        Pdlu = 1 << 10,
        Spare = 1 << 11,
        Cwarn = 1 << 12,
        Tcida = 1 << 13,
    }
}

// MI v2.0, 5.3, Figure 97
#[derive(Clone, Copy, Debug, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct ControllerHealth {
    pub ctlid: u16,
    pub csts: WireFlagSet<ControllerStatusFlags>,
    pub ctemp: u16,
    pub pdlu: u8,
    pub spare: u8,
    pub cwarn: WireFlagSet<CriticalWarning>,
    #[deku(pad_bytes_after = "5")]
    pub chsc: WireFlagSet<ControllerHealthStatusChangedFlags>,
}

impl ControllerHealth {
    pub const LEN: usize = 16;

    /// Composite temperature in degrees Celsius, converted from Kelvin.
    pub fn temperature(&self) -> i32 {
        self.ctemp as i32 - 273
    }
}
