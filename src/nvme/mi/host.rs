// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! Typed NVMe-MI and tunnelled Admin commands over a [`Session`].

use flagset::FlagSet;
use log::debug;

use super::{
    AdminCommand, AdminCommandResponseHeader, Command, ConfigurationIdentifier, ConfigurationSet,
    ConfigurationValue, ControllerFunctionAndReportingFlags, ControllerHealth, ControllerInformation,
    ControllerList, ControllerPropertyFlags, DataStructureType, ManagementResponse, MessageType,
    MiCommand, NvmSubsystemHealth, NvmSubsystemInformation, OptionallySupportedCommandList,
    PortInformation, decode_prefix,
};
use crate::nvme::{
    AdminCommandRequestHeader, Cns, ErrorInformationLogEntry, FeatureIdentifier, FeatureSelect,
    IDENTIFY_LEN, IdentifyController, IdentifyNamespace, LogPageIdentifier, LogPageRequest,
    NumberOfQueues, SmartHealthInformation, TemperatureThreshold, ThresholdType,
};
use crate::reply::NVME_MI_HEADER_LEN;
use crate::{Bus, Error, Result, Session};

// MI v2.0, 5.7, Figure 110: RDL is the low word of the management response
fn response_data_length(mr: &ManagementResponse) -> usize {
    let nmresp = mr.nvme_management_response;
    u16::from_le_bytes([nmresp[0], nmresp[1]]) as usize
}

impl<B: Bus> Session<B> {
    fn mi_exchange(&mut self, cmd: MiCommand) -> Result<ManagementResponse> {
        self.execute(&Command::Mi(cmd))?;

        let mr = self.reply().management_response()?;
        if !mr.is_success() {
            debug!("{:?} failed with status {:?}", cmd.opcode, mr.status());
            return Err(Error::Status(mr.status));
        }
        Ok(mr)
    }

    fn mi_data(&self, max: usize) -> Result<Vec<u8>> {
        self.reply().response_vec(max, MessageType::NvmeMiCommand)
    }

    fn admin_exchange(&mut self, cmd: AdminCommand) -> Result<AdminCommandResponseHeader> {
        self.execute(&Command::Admin(cmd))?;

        let mr = self.reply().management_response()?;
        if !mr.is_success() {
            debug!(
                "Admin opcode {:#04x} failed with status {:?}",
                cmd.request.opcode,
                mr.status()
            );
            return Err(Error::Status(mr.status));
        }

        let mut msg = [0u8; NVME_MI_HEADER_LEN + AdminCommandResponseHeader::LEN];
        let len = self.response_message(&mut msg)?;
        let resp: AdminCommandResponseHeader = decode_prefix(
            &msg[NVME_MI_HEADER_LEN..len],
            AdminCommandResponseHeader::LEN,
        )?;

        let cs = resp.completion();
        if !cs.is_success() {
            debug!(
                "Admin opcode {:#04x} completed with {cs:?}",
                cmd.request.opcode
            );
            return Err(Error::Completion(cs));
        }
        Ok(resp)
    }

    fn admin_data(&self, max: usize) -> Result<Vec<u8>> {
        self.reply().response_vec(max, MessageType::NvmeAdminCommand)
    }

    /// Read an NVMe-MI data structure, returning its raw content.
    pub fn read_nvme_mi_data_structure(
        &mut self,
        dtyp: DataStructureType,
        ctrlid: u16,
        portid: u8,
    ) -> Result<Vec<u8>> {
        let mr = self.mi_exchange(MiCommand::read_data_structure(dtyp, ctrlid, portid))?;
        self.mi_data(response_data_length(&mr))
    }

    pub fn nvm_subsystem_information(&mut self) -> Result<NvmSubsystemInformation> {
        let data =
            self.read_nvme_mi_data_structure(DataStructureType::NvmSubsystemInformation, 0, 0)?;
        decode_prefix(&data, NvmSubsystemInformation::LEN)
    }

    pub fn port_information(&mut self, portid: u8) -> Result<PortInformation> {
        let data = self.read_nvme_mi_data_structure(DataStructureType::PortInformation, 0, portid)?;
        decode_prefix(&data, PortInformation::LEN)
    }

    /// Controllers in the subsystem with an identifier of at least
    /// `ctrlid`.
    pub fn controller_list(&mut self, ctrlid: u16) -> Result<ControllerList> {
        let data = self.read_nvme_mi_data_structure(DataStructureType::ControllerList, ctrlid, 0)?;
        decode_prefix(&data, ControllerList::MIN_LEN)
    }

    pub fn controller_information(&mut self, ctrlid: u16) -> Result<ControllerInformation> {
        let data =
            self.read_nvme_mi_data_structure(DataStructureType::ControllerInformation, ctrlid, 0)?;
        decode_prefix(&data, ControllerInformation::LEN)
    }

    pub fn optionally_supported_commands(&mut self) -> Result<OptionallySupportedCommandList> {
        let data = self.read_nvme_mi_data_structure(
            DataStructureType::OptionallySupportedCommandList,
            0,
            0,
        )?;
        decode_prefix(&data, OptionallySupportedCommandList::MIN_LEN)
    }

    /// Poll subsystem health. With `clear` set, the composite controller
    /// status flags are cleared after being reported.
    pub fn nvm_subsystem_health_status_poll(&mut self, clear: bool) -> Result<NvmSubsystemHealth> {
        self.mi_exchange(MiCommand::nvm_subsystem_health_status_poll(clear))?;
        let data = self.mi_data(NvmSubsystemHealth::LEN)?;
        decode_prefix(&data, NvmSubsystemHealth::LEN)
    }

    /// Poll health of controllers from `sctlid` onwards, returning at most
    /// `maxrent + 1` entries.
    pub fn controller_health_status_poll(
        &mut self,
        sctlid: u16,
        maxrent: u8,
        functions: FlagSet<ControllerFunctionAndReportingFlags>,
        properties: FlagSet<ControllerPropertyFlags>,
    ) -> Result<Vec<ControllerHealth>> {
        let mr = self.mi_exchange(MiCommand::controller_health_status_poll(
            sctlid, maxrent, functions, properties,
        ))?;

        // MI v2.0, 5.3, Figure 96: RENT
        let rent = mr.nvme_management_response[2] as usize;
        let data = self.mi_data(rent * ControllerHealth::LEN)?;
        if data.len() < rent * ControllerHealth::LEN {
            return Err(Error::ShortResponse {
                expected: rent * ControllerHealth::LEN,
                received: data.len(),
            });
        }

        data.chunks_exact(ControllerHealth::LEN)
            .map(|entry| decode_prefix(entry, ControllerHealth::LEN))
            .collect()
    }

    pub fn configuration_get(
        &mut self,
        id: ConfigurationIdentifier,
        portid: u8,
    ) -> Result<ConfigurationValue> {
        let mr = self.mi_exchange(MiCommand::configuration_get(id, portid))?;
        ConfigurationValue::decode(id, mr.nvme_management_response)
    }

    /// Apply a configuration to the management endpoint.
    ///
    /// A new MCTP transmission unit size only takes effect on the session
    /// once the caller also applies it with [`Session::set_mtu`].
    pub fn configuration_set(&mut self, set: ConfigurationSet) -> Result<()> {
        self.mi_exchange(MiCommand::configuration_set(set))?;
        Ok(())
    }

    pub fn vpd_read(&mut self, dofst: u16, dlen: u16) -> Result<Vec<u8>> {
        self.mi_exchange(MiCommand::vpd_read(dofst, dlen))?;
        self.mi_data(dlen as usize)
    }

    pub fn vpd_write(&mut self, dofst: u16, data: &[u8]) -> Result<()> {
        self.mi_exchange(MiCommand::vpd_write(dofst, data)?)?;
        Ok(())
    }

    /// Issue Identify, returning the raw data structure.
    pub fn identify(&mut self, ctlid: u16, nsid: u32, cns: Cns, cntid: u16) -> Result<Vec<u8>> {
        let req = AdminCommandRequestHeader::identify(ctlid, nsid, cns, cntid);
        self.admin_exchange(req.into())?;
        self.admin_data(IDENTIFY_LEN)
    }

    pub fn identify_controller(&mut self, ctlid: u16) -> Result<IdentifyController> {
        let data = self.identify(ctlid, 0, Cns::IdentifyController, 0)?;
        decode_prefix(&data, IDENTIFY_LEN)
    }

    pub fn identify_namespace(&mut self, ctlid: u16, nsid: u32) -> Result<IdentifyNamespace> {
        let data = self.identify(ctlid, nsid, Cns::NvmIdentifyNamespace, 0)?;
        decode_prefix(&data, IDENTIFY_LEN)
    }

    /// Issue Get Log Page, returning the raw log data.
    pub fn get_log_page(&mut self, ctlid: u16, req: &LogPageRequest) -> Result<Vec<u8>> {
        let cmd = AdminCommandRequestHeader::get_log_page(ctlid, req)?;
        self.admin_exchange(cmd.into())?;
        self.admin_data(req.len as usize)
    }

    /// Read the first `entries` entries of the Error Information log.
    pub fn error_information_log(
        &mut self,
        ctlid: u16,
        entries: usize,
    ) -> Result<Vec<ErrorInformationLogEntry>> {
        let len = entries
            .checked_mul(ErrorInformationLogEntry::LEN)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or(Error::InvalidCommand("too many error log entries"))?;
        let req = LogPageRequest::new(LogPageIdentifier::ErrorInformation, len);
        let data = self.get_log_page(ctlid, &req)?;

        data.chunks_exact(ErrorInformationLogEntry::LEN)
            .map(|entry| decode_prefix(entry, ErrorInformationLogEntry::LEN))
            .collect()
    }

    /// Read the SMART / Health Information log for `nsid`, or for the
    /// controller as a whole with the broadcast namespace.
    pub fn smart_health_information(
        &mut self,
        ctlid: u16,
        nsid: u32,
    ) -> Result<SmartHealthInformation> {
        let req = LogPageRequest {
            nsid,
            ..LogPageRequest::new(
                LogPageIdentifier::SmartHealthInformation,
                SmartHealthInformation::LEN as u32,
            )
        };
        let data = self.get_log_page(ctlid, &req)?;
        decode_prefix(&data, SmartHealthInformation::LEN)
    }

    /// Issue Get Features, returning completion dword 0 and up to `dlen`
    /// bytes of feature data.
    pub fn get_features(
        &mut self,
        ctlid: u16,
        nsid: u32,
        fid: FeatureIdentifier,
        sel: FeatureSelect,
        cdw11: u32,
        dlen: u32,
    ) -> Result<(u32, Vec<u8>)> {
        let req = AdminCommandRequestHeader::get_features(ctlid, nsid, fid, sel, cdw11, dlen);
        let resp = self.admin_exchange(req.into())?;
        let data = if dlen > 0 {
            self.admin_data(dlen as usize)?
        } else {
            Vec::new()
        };
        Ok((resp.cqedw0, data))
    }

    pub fn temperature_threshold(
        &mut self,
        ctlid: u16,
        tmpsel: u8,
        thsel: ThresholdType,
    ) -> Result<TemperatureThreshold> {
        // Base v2.1, 5.1.25.1.4, Figure 397
        let cdw11 = ((tmpsel & 0x0f) as u32) << 16 | (thsel as u32) << 20;
        let (dw0, _) = self.get_features(
            ctlid,
            0,
            FeatureIdentifier::TemperatureThreshold,
            FeatureSelect::Current,
            cdw11,
            0,
        )?;
        Ok(dw0.into())
    }

    pub fn number_of_queues(&mut self, ctlid: u16) -> Result<NumberOfQueues> {
        let (dw0, _) = self.get_features(
            ctlid,
            0,
            FeatureIdentifier::NumberOfQueues,
            FeatureSelect::Current,
            0,
            0,
        )?;
        Ok(dw0.into())
    }
}
