// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
mod common;

use common::{admin_response, dword, session, setup};
use flagset::FlagSet;
use nvme_mi_host::Error;
use nvme_mi_host::nvme::{
    Cns, ControllerType, CriticalWarning, FeatureIdentifier, FeatureSelect, GenericCommandStatus,
    LogPageIdentifier, LogPageRequest, StatusCodeType, ThresholdType,
};

// Offsets into the request message: NVMe-MI header, then the Admin command
const OPCODE: usize = 4;
const CTLID: usize = 6;
const NSID: usize = 8;
const DLEN: usize = 32;
const CDW10: usize = 44;
const CDW11: usize = 48;
const CDW12: usize = 52;
const CDW13: usize = 56;

fn identify_controller_data() -> Vec<u8> {
    let mut data = vec![0u8; 4096];
    data[0..2].copy_from_slice(&0x1b36u16.to_le_bytes());
    data[2..4].copy_from_slice(&0x1af4u16.to_le_bytes());
    data[4..24].copy_from_slice(b"deadbeef            ");
    data[24..64].copy_from_slice(b"Emulated NVMe Controller                ");
    data[64..72].copy_from_slice(b"0.1.0   ");
    data[78..80].copy_from_slice(&1u16.to_le_bytes());
    data[80..84].copy_from_slice(&0x0002_0000u32.to_le_bytes());
    data[111] = 0x03;
    data[516..520].copy_from_slice(&4u32.to_le_bytes());
    data
}

#[test]
fn identify_controller() {
    setup();

    let mut session = session(&[admin_response(0x00, 0, 0, &identify_controller_data())]);
    let id = session.identify_controller(1).unwrap();
    assert_eq!(id.vid, 0x1b36);
    assert_eq!(id.ssvid, 0x1af4);
    assert_eq!(id.serial_number(), "deadbeef");
    assert_eq!(id.model_number(), "Emulated NVMe Controller");
    assert_eq!(id.firmware_revision(), "0.1.0");
    assert_eq!(id.cntlid, 1);
    assert_eq!(id.version(), (2, 0, 0));
    assert_eq!(
        id.controller_type(),
        Some(ControllerType::AdministrativeController)
    );
    assert_eq!(id.nn, 4);

    let req = session.bus().request_message();
    assert_eq!(req.len(), 4 + 64 + 4);
    assert_eq!(req[1], 0x10);
    assert_eq!(req[OPCODE], 0x06);
    assert_eq!(req[CTLID], 0x01);
    assert_eq!(dword(&req, DLEN), 4096);
    assert_eq!(dword(&req, CDW10), 0x01);
}

#[test]
fn identify_raw() {
    setup();

    let mut session = session(&[admin_response(0x00, 0, 0, &[0x11; 4096])]);
    let data = session
        .identify(0, 0, Cns::ActiveNamespaceIdList, 0)
        .unwrap();
    assert_eq!(data.len(), 4096);
    assert!(data.iter().all(|b| *b == 0x11));

    let req = session.bus().request_message();
    assert_eq!(dword(&req, CDW10), 0x02);
}

#[test]
fn identify_namespace() {
    setup();

    let mut data = vec![0u8; 4096];
    data[0..8].copy_from_slice(&0x0010_0000u64.to_le_bytes());
    data[8..16].copy_from_slice(&0x0010_0000u64.to_le_bytes());
    data[16..24].copy_from_slice(&0x0000_8000u64.to_le_bytes());
    data[25] = 0x01;
    data[128..132].copy_from_slice(&0x0009_0000u32.to_le_bytes());

    let mut session = session(&[admin_response(0x00, 0, 0, &data)]);
    let ns = session.identify_namespace(0, 1).unwrap();
    assert_eq!(ns.nsze, 0x0010_0000);
    assert_eq!(ns.nuse, 0x8000);
    assert_eq!(ns.nlbaf, 1);
    assert_eq!(ns.lba_size(), Some(512));

    let req = session.bus().request_message();
    assert_eq!(dword(&req, NSID), 1);
    assert_eq!(dword(&req, CDW10), 0x00);
}

#[test]
fn identify_short() {
    setup();

    let mut session = session(&[admin_response(0x00, 0, 0, &[0u8; 512])]);
    assert!(matches!(
        session.identify_controller(0),
        Err(Error::ShortResponse {
            expected: 4096,
            received: 512
        })
    ));
}

#[test]
fn completion_error() {
    setup();

    // Invalid Namespace or Format, DNR
    let dw3: u32 = 1 << 31 | 0x0b << 17;
    let mut session = session(&[admin_response(0x00, 0, dw3, &[])]);
    let res = session.identify_namespace(0, 0xffff);

    let Err(Error::Completion(cs)) = &res else {
        panic!("unexpected result: {res:?}");
    };
    assert!(cs.dnr);
    assert_eq!(cs.status_code_type(), Some(StatusCodeType::GenericCommandStatus));
    assert_eq!(cs.generic(), Some(GenericCommandStatus::InvalidNamespaceOrFormat));
}

#[test]
fn management_error() {
    setup();

    let resp = common::with_mic(vec![0x84, 0x90, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00]);
    let mut session = session(&[resp]);
    assert!(matches!(
        session.identify_controller(0),
        Err(Error::Status(0x04))
    ));
}

#[test]
fn get_log_page_raw() {
    setup();

    let mut session = session(&[admin_response(0x00, 0, 0, &[0x42; 96])]);
    let req = LogPageRequest {
        lpo: 0x1_0000_0040,
        ..LogPageRequest::new(LogPageIdentifier::CommandsSupportedAndEffects, 96)
    };
    let data = session.get_log_page(2, &req).unwrap();
    assert_eq!(data, [0x42; 96]);

    let req = session.bus().request_message();
    assert_eq!(req[OPCODE], 0x02);
    assert_eq!(req[CTLID], 0x02);
    assert_eq!(dword(&req, NSID), 0xffff_ffff);
    assert_eq!(dword(&req, DLEN), 96);
    assert_eq!(dword(&req, CDW10), 0x0017_0005);
    assert_eq!(dword(&req, CDW11), 0);
    assert_eq!(dword(&req, CDW12), 0x40);
    assert_eq!(dword(&req, CDW13), 0x01);
}

#[test]
fn get_log_page_length() {
    setup();

    let mut session = session(&[]);
    let req = LogPageRequest::new(LogPageIdentifier::ErrorInformation, 66);
    assert!(matches!(
        session.get_log_page(0, &req),
        Err(Error::InvalidCommand(_))
    ));
    assert!(session.bus().written().is_empty());
}

#[test]
fn error_information_log() {
    setup();

    let mut data = vec![0u8; 128];
    data[0..8].copy_from_slice(&3u64.to_le_bytes());
    data[10..12].copy_from_slice(&0x0020u16.to_le_bytes());
    data[12..14].copy_from_slice(&((0x02u16) << 1).to_le_bytes());
    data[24..28].copy_from_slice(&1u32.to_le_bytes());
    data[64..72].copy_from_slice(&2u64.to_le_bytes());

    let mut session = session(&[admin_response(0x00, 0, 0, &data)]);
    let entries = session.error_information_log(0, 2).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].errcnt, 3);
    assert_eq!(entries[0].nsid, 1);
    assert_eq!(entries[0].status().cid, 0x20);
    assert_eq!(
        entries[0].status().generic(),
        Some(GenericCommandStatus::InvalidFieldInCommand)
    );
    assert_eq!(entries[1].errcnt, 2);

    let req = session.bus().request_message();
    assert_eq!(dword(&req, CDW10), 0x001f_0001);
}

#[test]
fn error_information_log_too_long() {
    setup();

    let mut session = session(&[]);
    for entries in [usize::MAX, usize::MAX / 64 + 1] {
        assert!(matches!(
            session.error_information_log(0, entries),
            Err(Error::InvalidCommand(_))
        ));
    }
    assert!(session.bus().written().is_empty());
}

#[test]
fn smart_health_information() {
    setup();

    let mut data = vec![0u8; 512];
    data[0] = 0x04;
    data[1..3].copy_from_slice(&300u16.to_le_bytes());
    data[3] = 95;
    data[4] = 10;
    data[5] = 3;
    data[112..128].copy_from_slice(&42u128.to_le_bytes());

    let mut session = session(&[admin_response(0x00, 0, 0, &data)]);
    let smart = session.smart_health_information(0, 0xffff_ffff).unwrap();
    assert_eq!(
        smart.critical_warnings(),
        FlagSet::<CriticalWarning>::from(CriticalWarning::Ndr)
    );
    assert_eq!(smart.temperature(), 27);
    assert_eq!(smart.avsp, 95);
    assert_eq!(smart.pused, 3);
    assert_eq!(smart.pwrc, 42);

    let req = session.bus().request_message();
    assert_eq!(dword(&req, CDW10), 0x007f_0002);
}

#[test]
fn get_features() {
    setup();

    let mut session = session(&[admin_response(0x00, 0x0000_0001, 0, &[0x10; 16])]);
    let (dw0, data) = session
        .get_features(
            0,
            0,
            FeatureIdentifier::LbaRangeType,
            FeatureSelect::Default,
            0,
            16,
        )
        .unwrap();
    assert_eq!(dw0, 1);
    assert_eq!(data, [0x10; 16]);

    let req = session.bus().request_message();
    assert_eq!(req[OPCODE], 0x0a);
    assert_eq!(dword(&req, DLEN), 16);
    assert_eq!(dword(&req, CDW10), 0x0103);
}

#[test]
fn temperature_threshold() {
    setup();

    let mut session = session(&[admin_response(0x00, 0x0000_0157, 0, &[])]);
    let tt = session
        .temperature_threshold(0, 1, ThresholdType::OverTemperature)
        .unwrap();
    assert_eq!(tt.tmpth, 343);

    let req = session.bus().request_message();
    assert_eq!(dword(&req, CDW10), 0x04);
    assert_eq!(dword(&req, CDW11), 0x0001_0000);
}

#[test]
fn number_of_queues() {
    setup();

    let mut session = session(&[admin_response(0x00, 0x0007_0003, 0, &[])]);
    let nq = session.number_of_queues(0).unwrap();
    assert_eq!(nq.submission, 4);
    assert_eq!(nq.completion, 8);

    let req = session.bus().request_message();
    assert_eq!(dword(&req, CDW10), 0x07);
}
