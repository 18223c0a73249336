// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! NVMe Admin command set definitions for commands tunnelled over NVMe-MI.

pub mod mi;

use deku::{DekuRead, DekuWrite};
use flagset::{FlagSet, flags};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::wire::{WireFlagSet, WireString};
use crate::{Discriminant, Encode, Error, Result};

/// Identify data structures are a single 4 KiB page
pub const IDENTIFY_LEN: usize = 4096;

// MI v2.0, 6, Figure 136, CFLGS: DLEN and DOFST are valid
const CFLGS_DLEN_DOFST: u8 = 0x03;

// Base v2.1, 5.1, Figure 84
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[repr(u8)]
pub enum AdminOpcode {
    GetLogPage = 0x02,
    Identify = 0x06,
    SetFeatures = 0x09,
    GetFeatures = 0x0a,
}
unsafe impl Discriminant<u8> for AdminOpcode {}

// MI v2.0, 6, Figure 136
#[derive(Clone, Copy, Debug, Default, DekuRead, DekuWrite, PartialEq, Eq)]
#[deku(endian = "little")]
pub struct AdminCommandRequestHeader {
    pub opcode: u8,
    pub cflgs: u8,
    pub ctlid: u16,
    pub nsid: u32,
    pub cdw2: u32,
    pub cdw3: u32,
    pub cdw4: u32,
    pub cdw5: u32,
    pub dofst: u32,
    pub dlen: u32,
    pub cdw8: u32,
    pub cdw9: u32,
    pub cdw10: u32,
    pub cdw11: u32,
    pub cdw12: u32,
    pub cdw13: u32,
    pub cdw14: u32,
    pub cdw15: u32,
}
impl Encode<64> for AdminCommandRequestHeader {}

impl AdminCommandRequestHeader {
    // Base v2.1, 5.1.13.1, Figures 306-309
    pub fn identify(ctlid: u16, nsid: u32, cns: Cns, cntid: u16) -> Self {
        Self {
            opcode: AdminOpcode::Identify.id(),
            cflgs: CFLGS_DLEN_DOFST,
            ctlid,
            nsid,
            dlen: IDENTIFY_LEN as u32,
            cdw10: cns.id() as u32 | (cntid as u32) << 16,
            ..Default::default()
        }
    }

    // Base v2.1, 5.1.12, Figures 197-201
    pub fn get_log_page(ctlid: u16, req: &LogPageRequest) -> Result<Self> {
        if req.len == 0 || req.len % 4 != 0 {
            return Err(Error::InvalidCommand(
                "log page length must be a non-zero multiple of 4",
            ));
        }

        let numd = req.len / 4 - 1;
        Ok(Self {
            opcode: AdminOpcode::GetLogPage.id(),
            cflgs: CFLGS_DLEN_DOFST,
            ctlid,
            nsid: req.nsid,
            dlen: req.len,
            cdw10: req.lid as u32
                | ((req.lsp & 0x7f) as u32) << 8
                | (req.rae as u32) << 15
                | (numd & 0xffff) << 16,
            cdw11: numd >> 16 | (req.lsi as u32) << 16,
            cdw12: req.lpo as u32,
            cdw13: (req.lpo >> 32) as u32,
            cdw14: (req.uidx & 0x7f) as u32,
            ..Default::default()
        })
    }

    // Base v2.1, 5.1.11, Figures 191-193
    pub fn get_features(
        ctlid: u16,
        nsid: u32,
        fid: FeatureIdentifier,
        sel: FeatureSelect,
        cdw11: u32,
        dlen: u32,
    ) -> Self {
        Self {
            opcode: AdminOpcode::GetFeatures.id(),
            cflgs: CFLGS_DLEN_DOFST,
            ctlid,
            nsid,
            dlen,
            cdw10: fid.id() as u32 | (sel.id() as u32) << 8,
            cdw11,
            ..Default::default()
        }
    }
}

// Base v2.1, 5.1.13.1, Figure 310
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Cns {
    NvmIdentifyNamespace = 0x00,
    IdentifyController = 0x01,
    ActiveNamespaceIdList = 0x02,
    NamespaceIdentificationDescriptorList = 0x03,
    IoIdentifyNamespace = 0x05,
    IoIdentifyController = 0x06,
    IoActiveNamespaceIdList = 0x07,
    IdentifyNamespace = 0x08,
    AllocatedNamespaceIdList = 0x10,
    NvmSubsystemControllerList = 0x13,
    SecondaryControllerList = 0x15,
}
unsafe impl Discriminant<u8> for Cns {}

// Base v2.1, 5.1.12, Figure 202
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum LogPageIdentifier {
    SupportedLogPages = 0x00,
    ErrorInformation = 0x01,
    SmartHealthInformation = 0x02,
    FirmwareSlotInformation = 0x03,
    ChangedAttachedNamespaceList = 0x04,
    CommandsSupportedAndEffects = 0x05,
    DeviceSelfTest = 0x06,
    FeatureIdentifiersSupportedAndEffects = 0x12,
}
unsafe impl Discriminant<u8> for LogPageIdentifier {}

/// Get Log Page parameters.
///
/// `lid` is raw to admit vendor specific log pages.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LogPageRequest {
    pub lid: u8,
    pub nsid: u32,
    pub lsp: u8,
    pub rae: bool,
    pub lsi: u16,
    pub lpo: u64,
    pub uidx: u8,
    pub len: u32,
}

impl LogPageRequest {
    pub fn new(lid: LogPageIdentifier, len: u32) -> Self {
        Self {
            lid: lid.id(),
            nsid: 0xffff_ffff,
            lsp: 0,
            rae: false,
            lsi: 0,
            lpo: 0,
            uidx: 0,
            len,
        }
    }
}

// Base v2.1, 5.1.25, Figure 384
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum FeatureIdentifier {
    Arbitration = 0x01,
    PowerManagement = 0x02,
    LbaRangeType = 0x03,
    TemperatureThreshold = 0x04,
    ErrorRecovery = 0x05,
    VolatileWriteCache = 0x06,
    NumberOfQueues = 0x07,
    InterruptCoalescing = 0x08,
    InterruptVectorConfiguration = 0x09,
    WriteAtomicityNormal = 0x0a,
    AsynchronousEventConfiguration = 0x0b,
    AutonomousPowerStateTransition = 0x0c,
    HostMemoryBuffer = 0x0d,
    Timestamp = 0x0e,
    KeepAliveTimer = 0x0f,
}
unsafe impl Discriminant<u8> for FeatureIdentifier {}

// Base v2.1, 5.1.11, Figure 192, SEL
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum FeatureSelect {
    #[default]
    Current = 0x00,
    Default = 0x01,
    Saved = 0x02,
    SupportedCapabilities = 0x03,
}
unsafe impl Discriminant<u8> for FeatureSelect {}

// Base v2.1, 4.2.3, Figure 101
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[repr(u8)]
pub enum StatusCodeType {
    GenericCommandStatus = 0x00,
    CommandSpecificStatus = 0x01,
    MediaAndDataIntegrityErrors = 0x02,
    PathRelatedStatus = 0x03,
    VendorSpecific = 0x07,
}

// Base v2.1, 4.2.3.1, Figure 102
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[repr(u8)]
pub enum GenericCommandStatus {
    SuccessfulCompletion = 0x00,
    InvalidCommandOpcode = 0x01,
    InvalidFieldInCommand = 0x02,
    CommandIdConflict = 0x03,
    DataTransferError = 0x04,
    AbortedPowerLoss = 0x05,
    InternalError = 0x06,
    AbortRequested = 0x07,
    AbortedSqDeletion = 0x08,
    AbortedFailedFused = 0x09,
    AbortedMissingFused = 0x0a,
    InvalidNamespaceOrFormat = 0x0b,
    CommandSequenceError = 0x0c,
    NamespaceNotReady = 0x82,
}

// Base v2.1, 4.2.1, Figure 98; 4.2.3, Figure 100
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompletionStatus {
    pub cid: u16,
    pub p: bool,
    pub sc: u8,
    pub sct: u8,
    pub crd: u8,
    pub m: bool,
    pub dnr: bool,
}

impl CompletionStatus {
    pub fn is_success(&self) -> bool {
        self.sct == 0 && self.sc == 0
    }

    pub fn status_code_type(&self) -> Option<StatusCodeType> {
        StatusCodeType::from_u8(self.sct)
    }

    pub fn generic(&self) -> Option<GenericCommandStatus> {
        match self.status_code_type()? {
            StatusCodeType::GenericCommandStatus => GenericCommandStatus::from_u8(self.sc),
            _ => None,
        }
    }
}

impl From<u32> for CompletionStatus {
    fn from(dw3: u32) -> Self {
        Self {
            cid: dw3 as u16,
            p: (dw3 >> 16) & 1 != 0,
            sc: (dw3 >> 17) as u8,
            sct: ((dw3 >> 25) & 0x7) as u8,
            crd: ((dw3 >> 28) & 0x3) as u8,
            m: (dw3 >> 30) & 1 != 0,
            dnr: (dw3 >> 31) & 1 != 0,
        }
    }
}

impl From<CompletionStatus> for u32 {
    fn from(value: CompletionStatus) -> Self {
        let dnr: u32 = value.dnr.into();
        let m: u32 = value.m.into();
        let crd: u32 = (value.crd & 3).into();
        let sct: u32 = (value.sct & 7).into();
        let sc: u32 = value.sc.into();
        let p: u32 = value.p.into();
        let cid: u32 = value.cid.into();
        (dnr << 31) | (m << 30) | (crd << 28) | (sct << 25) | (sc << 17) | (p << 16) | cid
    }
}

// Base v2.1, 5.1.13.2.1, Figure 312, CNTRLTYPE
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[repr(u8)]
pub enum ControllerType {
    Reserved = 0x00,
    IoController = 0x01,
    DiscoveryController = 0x02,
    AdministrativeController = 0x03,
}

// Base v2.1, 5.1.13.2.1, Figure 312, LPA
flags! {
    #[repr(u8)]
    pub enum LogPageAttributes: u8 {
        Smarts,
        Cses,
        Lpeds,
        Ts,
        Pes,
        Mlps,
        Da4s,
    }
}

// Base v2.1, 5.1.13.2.1, Figure 312
#[derive(Debug, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct IdentifyController {
    pub vid: u16,
    pub ssvid: u16,
    pub sn: WireString<20>,
    pub mn: WireString<40>,
    pub fr: WireString<8>,
    pub rab: u8,
    pub ieee: [u8; 3],
    pub cmic: u8,
    pub mdts: u8,
    pub cntlid: u16,
    pub ver: u32,
    pub rtd3r: u32,
    pub rtd3e: u32,
    pub oaes: u32,
    pub ctratt: u32,
    #[deku(seek_from_start = "111")]
    pub cntrltype: u8,
    #[deku(seek_from_start = "253")]
    pub nvmsr: u8,
    pub vwci: u8,
    pub mec: u8,
    pub oacs: u16,
    pub acl: u8,
    pub aerl: u8,
    pub frmw: u8,
    pub lpa: WireFlagSet<LogPageAttributes>,
    pub elpe: u8,
    pub npss: u8,
    pub avscc: u8,
    #[deku(seek_from_start = "266")]
    pub wctemp: u16,
    pub cctemp: u16,
    #[deku(seek_from_start = "319")]
    pub fwug: u8,
    pub kas: u16,
    #[deku(seek_from_start = "512")]
    pub sqes: u8,
    pub cqes: u8,
    pub maxcmd: u16,
    pub nn: u32,
    pub oncs: u16,
    pub fuses: u16,
    pub fna: u8,
    pub vwc: u8,
    pub awun: u16,
    pub awupf: u16,
    pub icsvscc: u8,
    pub nwpc: u8,
    #[deku(seek_from_start = "540")]
    pub mnan: u32,
    #[deku(seek_from_start = "768")]
    pub subnqn: WireString<256>,
}

impl IdentifyController {
    pub fn serial_number(&self) -> &str {
        self.sn.trimmed()
    }

    pub fn model_number(&self) -> &str {
        self.mn.trimmed()
    }

    pub fn firmware_revision(&self) -> &str {
        self.fr.trimmed()
    }

    pub fn controller_type(&self) -> Option<ControllerType> {
        ControllerType::from_u8(self.cntrltype)
    }

    /// Version as (major, minor, tertiary)
    pub fn version(&self) -> (u16, u8, u8) {
        ((self.ver >> 16) as u16, (self.ver >> 8) as u8, self.ver as u8)
    }
}

// Base v2.1, 5.1.13.2.1; NVM Command Set v1.0c, 4.1.5.1, Figure 97
#[derive(Debug, Default, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct IdentifyNamespace {
    pub nsze: u64,
    pub ncap: u64,
    pub nuse: u64,
    pub nsfeat: u8,
    pub nlbaf: u8,
    pub flbas: u8,
    pub mc: u8,
    pub dpc: u8,
    pub dps: u8,
    #[deku(seek_from_start = "48")]
    pub nvmcap: u128,
    #[deku(seek_from_start = "128")]
    pub lbaf: [u32; 16],
}

impl IdentifyNamespace {
    /// Index of the LBA format in use
    pub fn formatted_lba_index(&self) -> usize {
        ((self.flbas & 0x0f) | ((self.flbas >> 1) & 0x30)) as usize
    }

    /// LBA data size in bytes for the format in use, if it is described.
    pub fn lba_size(&self) -> Option<u64> {
        let lbaf = self.lbaf.get(self.formatted_lba_index())?;
        let lbads = (lbaf >> 16) & 0xff;
        (lbads >= 9 && lbads < 64).then(|| 1u64 << lbads)
    }
}

// Base v2.1, 5.1.12.1.3, Figure 206, CW
flags! {
    pub enum CriticalWarning: u8 {
        Ascbt,
        Ttc,
        Ndr,
        Amro,
        Vmbf,
        Pmrro,
    }
}

// Base v2.1, 5.1.12.1.3, Figure 206, EGCWS
flags! {
    pub enum EnduranceGroupCriticalWarningSummary: u8 {
        Egascbt = 1 << 0,
        Egdr = 1 << 2,
        Egro = 1 << 3,
    }
}

// Base v2.1, 5.1.12.1.3, Figure 206
#[derive(Debug, Default, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct SmartHealthInformation {
    pub cw: WireFlagSet<CriticalWarning>,
    pub ctemp: u16,
    pub avsp: u8,
    pub avspt: u8,
    pub pused: u8,
    pub egcws: WireFlagSet<EnduranceGroupCriticalWarningSummary>,
    #[deku(seek_from_current = "25")]
    pub dur: u128,
    pub duw: u128,
    pub hrc: u128,
    pub hwc: u128,
    pub cbt: u128,
    pub pwrc: u128,
    pub poh: u128,
    pub upl: u128,
    pub mdie: u128,
    pub neile: u128,
    pub wctt: u32,
    pub cctt: u32,
    pub tsen: [u16; 8],
    pub tmttc: [u32; 2],
    #[deku(pad_bytes_after = "280")]
    pub tttmt: [u32; 2],
}

impl SmartHealthInformation {
    pub const LEN: usize = 512;

    pub fn critical_warnings(&self) -> FlagSet<CriticalWarning> {
        self.cw.0
    }

    /// Composite temperature in degrees Celsius, converted from Kelvin.
    pub fn temperature(&self) -> i32 {
        self.ctemp as i32 - 273
    }
}

// Base v2.1, 5.1.12.1.2, Figure 205
#[derive(Clone, Copy, Debug, Default, DekuRead, DekuWrite, Eq, PartialEq)]
#[deku(endian = "little")]
pub struct ErrorInformationLogEntry {
    pub errcnt: u64,
    pub sqid: u16,
    pub cid: u16,
    pub sts: u16,
    pub pel: u16,
    pub lba: u64,
    pub nsid: u32,
    pub vsia: u8,
    #[deku(pad_bytes_after = "2")]
    pub trtype: u8,
    pub csi: u64,
    #[deku(pad_bytes_after = "22")]
    pub ttsi: u16,
}
impl Encode<64> for ErrorInformationLogEntry {}

impl ErrorInformationLogEntry {
    pub const LEN: usize = 64;

    /// Status of the failed command. The phase tag is not meaningful.
    pub fn status(&self) -> CompletionStatus {
        CompletionStatus::from((self.sts as u32) << 16 | self.cid as u32)
    }
}

// Base v2.1, 5.1.25.1.4, Figure 397, THSEL
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[repr(u8)]
pub enum ThresholdType {
    OverTemperature = 0x00,
    UnderTemperature = 0x01,
}

// Base v2.1, 5.1.25.1.4, Figure 397
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TemperatureThreshold {
    /// Threshold in Kelvin
    pub tmpth: u16,
    pub tmpsel: u8,
    pub thsel: Option<ThresholdType>,
}

impl From<u32> for TemperatureThreshold {
    fn from(dw0: u32) -> Self {
        Self {
            tmpth: dw0 as u16,
            tmpsel: ((dw0 >> 16) & 0x0f) as u8,
            thsel: ThresholdType::from_u32((dw0 >> 20) & 0x03),
        }
    }
}

// Base v2.1, 5.1.25.1.7, Figure 401
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NumberOfQueues {
    pub submission: u32,
    pub completion: u32,
}

impl From<u32> for NumberOfQueues {
    fn from(dw0: u32) -> Self {
        // Both fields are zero-based
        Self {
            submission: (dw0 & 0xffff) + 1,
            completion: (dw0 >> 16) + 1,
        }
    }
}
