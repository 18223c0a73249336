// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
mod common;

use common::{RESP_INVALID_PARAMETER, data_structure_response, session, setup};
use nvme_mi_host::Error;

#[test]
fn error_status() {
    setup();

    let mut session = session(&[RESP_INVALID_PARAMETER.to_vec()]);
    assert!(matches!(
        session.nvm_subsystem_health_status_poll(false),
        Err(Error::Status(0x04))
    ));
}

mod read_nvme_mi_data_structure {
    use nvme_mi_host::Error;
    use nvme_mi_host::nvme::mi::{DataStructureType, PortData, SmbusFrequency};

    use crate::common::{data_structure_response, dword, session, setup};

    #[test]
    fn nvm_subsystem_information() {
        setup();

        let mut session = session(&[data_structure_response(&[0x01, 0x02, 0x00, 0x01])]);
        let info = session.nvm_subsystem_information().unwrap();
        assert_eq!(info.ports(), 2);
        assert_eq!(info.mjr, 2);
        assert_eq!(info.mnr, 0);
        assert!(info.sre());

        let req = session.bus().request_message();
        assert_eq!(req.len(), 20);
        assert_eq!(req[4], 0x00);
        assert_eq!(dword(&req, 8), 0x0000_0000);
    }

    #[test]
    fn port_information() {
        setup();

        #[rustfmt::skip]
        const DATA: [u8; 13] = [
            0x02, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x53, 0x02, 0x1d, 0x01, 0x01,
        ];

        let mut session = session(&[data_structure_response(&DATA)]);
        let port = session.port_information(1).unwrap();
        assert_eq!(port.mmtus, 64);
        let PortData::TwoWire(tw) = port.data else {
            panic!("unexpected port data: {:?}", port.data);
        };
        assert_eq!(tw.cvpdaddr, 0x53);
        assert_eq!(tw.max_vpd_frequency(), Some(SmbusFrequency::Freq400Khz));
        assert_eq!(tw.cmeaddr, 0x1d);

        let req = session.bus().request_message();
        assert_eq!(dword(&req, 8), 0x0101_0000);
    }

    #[test]
    fn pcie_port_information() {
        setup();

        #[rustfmt::skip]
        const DATA: [u8; 14] = [
            0x01, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x07, 0x04, 0x10, 0x04, 0x00,
        ];

        let mut session = session(&[data_structure_response(&DATA)]);
        let port = session.port_information(0).unwrap();
        let PortData::Pcie(pcie) = port.data else {
            panic!("unexpected port data: {:?}", port.data);
        };
        assert_eq!(pcie.pciemlw, 0x10);
        assert_eq!(pcie.pcienlw, 0x04);
    }

    #[test]
    fn controller_list() {
        setup();

        let mut session = session(&[data_structure_response(&[
            0x02, 0x00, 0x01, 0x00, 0x02, 0x00,
        ])]);
        let list = session.controller_list(1).unwrap();
        assert_eq!(list.ids(), [1, 2]);

        let req = session.bus().request_message();
        assert_eq!(dword(&req, 8), 0x0200_0001);
    }

    #[test]
    fn controller_information() {
        setup();

        #[rustfmt::skip]
        const DATA: [u8; 32] = [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x08, 0x00,
            0x36, 0x1b, 0x10, 0x00, 0xf4, 0x1a, 0x00, 0x11,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let mut session = session(&[data_structure_response(&DATA)]);
        let info = session.controller_information(0).unwrap();
        assert!(info.pri_valid());
        assert_eq!(info.pri, 0x0008);
        assert_eq!(info.pcivid, 0x1b36);
        assert_eq!(info.pcidid, 0x0010);
        assert_eq!(info.pcisvid, 0x1af4);
        assert_eq!(info.pcisdid, 0x1100);

        let req = session.bus().request_message();
        assert_eq!(dword(&req, 8), 0x0300_0000);
    }

    #[test]
    fn optionally_supported_commands() {
        setup();

        let mut session = session(&[data_structure_response(&[
            0x02, 0x00, 0x00, 0x05, 0x01, 0x06,
        ])]);
        let list = session.optionally_supported_commands().unwrap();
        let cmds = list.commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!((cmds[0].cmdtyp, cmds[0].opc), (0x00, 0x05));
        assert_eq!((cmds[1].cmdtyp, cmds[1].opc), (0x01, 0x06));
    }

    #[test]
    fn raw() {
        setup();

        let mut session = session(&[data_structure_response(&[0xaa; 40])]);
        let data = session
            .read_nvme_mi_data_structure(
                DataStructureType::ManagementEndpointBufferCommandSupportList,
                0,
                0,
            )
            .unwrap();
        assert_eq!(data, [0xaa; 40]);
    }

    #[test]
    fn short_structure() {
        setup();

        let mut session = session(&[data_structure_response(&[0x01, 0x02])]);
        assert!(matches!(
            session.nvm_subsystem_information(),
            Err(Error::ShortResponse {
                expected: 4,
                received: 2
            })
        ));
    }
}

mod health_status_poll {
    use flagset::FlagSet;
    use nvme_mi_host::nvme::CriticalWarning;
    use nvme_mi_host::nvme::mi::{
        ControllerFunctionAndReportingFlags, ControllerPropertyFlags, NvmSubsystemStatusFlags,
    };

    use crate::common::{dword, mi_response, session, setup};

    #[test]
    fn subsystem() {
        setup();

        #[rustfmt::skip]
        const DATA: [u8; 8] = [
            0x0c, 0xfe, 0x29, 0x0a, 0x00, 0x00, 0x00, 0x00,
        ];

        let mut session = session(&[mi_response(0x00, [0; 3], &DATA)]);
        let health = session.nvm_subsystem_health_status_poll(false).unwrap();
        assert_eq!(
            health.nss.0,
            NvmSubsystemStatusFlags::P1la | NvmSubsystemStatusFlags::P0la
        );
        assert_eq!(
            health.warnings(),
            FlagSet::<CriticalWarning>::from(CriticalWarning::Ascbt)
        );
        assert_eq!(health.composite_temperature(), Some(41));
        assert_eq!(health.pldu, 10);

        let req = session.bus().request_message();
        assert_eq!(req[4], 0x01);
        assert_eq!(dword(&req, 12), 0);
    }

    #[test]
    fn subsystem_clear() {
        setup();

        let mut session = session(&[mi_response(0x00, [0; 3], &[0x00, 0xff, 0x80, 0, 0, 0, 0, 0])]);
        let health = session.nvm_subsystem_health_status_poll(true).unwrap();
        assert_eq!(health.composite_temperature(), None);
        assert!(health.warnings().is_empty());

        let req = session.bus().request_message();
        assert_eq!(dword(&req, 8), 0);
        assert_eq!(dword(&req, 12), 0x8000_0000);
    }

    #[test]
    fn controllers() {
        setup();

        #[rustfmt::skip]
        const DATA: [u8; 32] = [
            0x00, 0x00, 0x01, 0x00, 0x3e, 0x01, 0x00, 0x64,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x01, 0x00, 0x48, 0x01, 0x03, 0x50,
            0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let mut session = session(&[mi_response(0x00, [0x00, 0x00, 0x02], &DATA)]);
        let entries = session
            .controller_health_status_poll(
                0,
                1,
                ControllerFunctionAndReportingFlags::All.into(),
                ControllerPropertyFlags::Ctemp | ControllerPropertyFlags::Cwarn,
            )
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ctlid, 0);
        assert_eq!(entries[0].temperature(), 45);
        assert_eq!(entries[1].ctlid, 1);
        assert_eq!(entries[1].temperature(), 55);
        assert_eq!(entries[1].pdlu, 3);
        assert_eq!(
            entries[1].cwarn.0,
            FlagSet::<CriticalWarning>::from(CriticalWarning::Ttc)
        );

        let req = session.bus().request_message();
        assert_eq!(req[4], 0x02);
        assert_eq!(dword(&req, 8), 0x8001_0000);
        assert_eq!(dword(&req, 12), 0x0000_0012);
    }

    #[test]
    fn controllers_truncated() {
        setup();

        let mut session = session(&[mi_response(0x00, [0x00, 0x00, 0x02], &[0u8; 16])]);
        assert!(
            session
                .controller_health_status_poll(0, 1, FlagSet::empty(), FlagSet::empty())
                .is_err()
        );
    }
}

mod configuration {
    use flagset::FlagSet;
    use nvme_mi_host::nvme::mi::{
        ConfigurationIdentifier, ConfigurationSet, ConfigurationValue, HealthStatusChangeFlags,
        SmbusFrequency,
    };

    use crate::common::{dword, mi_response, session, setup};

    #[test]
    fn get_frequency() {
        setup();

        let mut session = session(&[mi_response(0x00, [0x02, 0x00, 0x00], &[])]);
        let value = session
            .configuration_get(ConfigurationIdentifier::SmbusI2cFrequency, 1)
            .unwrap();
        assert_eq!(
            value,
            ConfigurationValue::SmbusI2cFrequency(SmbusFrequency::Freq400Khz)
        );

        let req = session.bus().request_message();
        assert_eq!(req[4], 0x04);
        assert_eq!(dword(&req, 8), 0x0100_0001);
    }

    #[test]
    fn get_mtu() {
        setup();

        let mut session = session(&[mi_response(0x00, [0x80, 0x00, 0x00], &[])]);
        let value = session
            .configuration_get(ConfigurationIdentifier::MctpTransmissionUnitSize, 0)
            .unwrap();
        assert_eq!(value, ConfigurationValue::MctpTransmissionUnitSize(128));
    }

    #[test]
    fn set_mtu() {
        setup();

        let mut session = session(&[mi_response(0x00, [0; 3], &[])]);
        session
            .configuration_set(ConfigurationSet::MctpTransmissionUnitSize { port: 1, mtus: 128 })
            .unwrap();
        assert_eq!(session.config().mtu(), 64);
        session.set_mtu(128).unwrap();
        assert_eq!(session.config().mtu(), 128);

        let req = session.bus().request_message();
        assert_eq!(req[4], 0x03);
        assert_eq!(dword(&req, 8), 0x0100_0003);
        assert_eq!(dword(&req, 12), 128);
    }

    #[test]
    fn set_health_status_change() {
        setup();

        let mut session = session(&[mi_response(0x00, [0; 3], &[])]);
        let flags: FlagSet<HealthStatusChangeFlags> =
            HealthStatusChangeFlags::Ctemp | HealthStatusChangeFlags::Spare;
        session
            .configuration_set(ConfigurationSet::HealthStatusChange(flags))
            .unwrap();

        let req = session.bus().request_message();
        assert_eq!(dword(&req, 8), 0x02);
        assert_eq!(dword(&req, 12), 0x0a00);
    }
}

mod vpd {
    use crate::common::{dword, mi_response, session, setup};

    #[test]
    fn read() {
        setup();

        let vpd: Vec<u8> = (0..256u16).map(|v| (v * 7) as u8).collect();
        let mut session = session(&[mi_response(0x00, [0; 3], &vpd)]);
        let data = session.vpd_read(0x20, 256).unwrap();
        assert_eq!(data, vpd);

        let req = session.bus().request_message();
        assert_eq!(req[4], 0x05);
        assert_eq!(dword(&req, 8), 0x20);
        assert_eq!(dword(&req, 12), 256);
    }

    #[test]
    fn read_short() {
        setup();

        let mut session = session(&[mi_response(0x00, [0; 3], &[0x01, 0x02])]);
        assert_eq!(session.vpd_read(0, 16).unwrap(), [0x01, 0x02]);
    }

    #[test]
    fn write() {
        setup();

        let vpd = [0x5au8; 100];
        let mut session = session(&[mi_response(0x00, [0; 3], &[])]);
        session.vpd_write(0x10, &vpd).unwrap();

        let written = session.bus().written();
        assert_eq!(written.len(), 2);

        let req = session.bus().request_message();
        assert_eq!(req.len(), 4 + 12 + 100 + 4);
        assert_eq!(req[4], 0x06);
        assert_eq!(dword(&req, 8), 0x10);
        assert_eq!(dword(&req, 12), 100);
        assert_eq!(req[16..116], vpd);
    }
}

#[test]
fn data_structure_after_failure() {
    setup();

    let mut session = session(&[
        RESP_INVALID_PARAMETER.to_vec(),
        data_structure_response(&[0x00, 0x02, 0x01, 0x00]),
    ]);
    assert!(session.nvm_subsystem_information().is_err());
    let info = session.nvm_subsystem_information().unwrap();
    assert_eq!(info.ports(), 1);
    assert_eq!(info.mnr, 1);
}
