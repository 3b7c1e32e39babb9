// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

mod device;

use device::{ascii_frame, attach, rtu_frame, session, Device};
use serial_modbus::{
    client::{Client as _, Reader as _},
    ChecksumStatus, Config, ExceptionCode, Mode, Parity, Request, Response,
    SessionContext as _, Slave,
};

const READ_REQUEST: &[u8] = b":1103006B00037E\r\n";

const READ_RESPONSE_PDU: &[u8] = &[0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64];

#[tokio::test]
async fn read_holding_registers() -> anyhow::Result<()> {
    let (device, sent) = Device::responder(Mode::Ascii, |_, _| Some(READ_RESPONSE_PDU.to_vec()));
    let mut ctx = attach(device, 0x11, Config::ascii());

    let registers = ctx.read_holding_registers(0x006B, 3).await??;

    assert_eq!(registers, [0x022B, 0x0000, 0x0064]);
    assert_eq!(sent.lock().unwrap()[..], [READ_REQUEST.to_vec()]);
    Ok(())
}

#[tokio::test]
async fn lower_case_response_after_noise() -> anyhow::Result<()> {
    let mut reply = b"\x00\r\n".to_vec();
    reply.extend(ascii_frame(0x11, READ_RESPONSE_PDU).to_ascii_lowercase());
    let (device, _) = Device::scripted([reply]);
    let mut ctx = attach(device, 0x11, Config::ascii());

    let registers = ctx.read_holding_registers(0x006B, 3).await??;

    assert_eq!(registers, [0x022B, 0x0000, 0x0064]);
    Ok(())
}

#[tokio::test]
async fn exception_response() -> anyhow::Result<()> {
    let (device, _) = Device::scripted([ascii_frame(0x11, &[0x83, 0x02])]);
    let mut ctx = session(device, 0x11, Config::ascii());

    let reply = ctx
        .exchange(Request::ReadHoldingRegisters(0x006B, 3))
        .await?;

    assert!(reply.checksum.is_valid());
    assert_eq!(reply.response, Err(ExceptionCode::IllegalDataAddress));
    Ok(())
}

#[tokio::test]
async fn lrc_mismatch_is_reported() -> anyhow::Result<()> {
    let (device, _) = Device::scripted([b":010302002AD1\r\n".to_vec()]);
    let mut ctx = session(device, 0x01, Config::ascii());

    let reply = ctx
        .exchange(Request::ReadHoldingRegisters(0x0000, 1))
        .await?;

    assert_eq!(
        reply.checksum,
        ChecksumStatus::Mismatch {
            computed: 0xD0,
            received: 0xD1,
        }
    );
    assert_eq!(
        reply.response,
        Ok(Response::ReadHoldingRegisters(vec![0x002A]))
    );
    Ok(())
}

#[tokio::test]
async fn switch_mode_between_calls() -> anyhow::Result<()> {
    let (device, sent) = Device::new(Box::new(|frame| {
        if frame.starts_with(b":") {
            ascii_frame(0x11, READ_RESPONSE_PDU)
        } else {
            rtu_frame(0x11, READ_RESPONSE_PDU)
        }
    }));
    let mut ctx = session(device, 0x11, Config::ascii());
    assert!(!ctx.is_rtu());

    let ascii_reply = ctx
        .exchange(Request::ReadHoldingRegisters(0x006B, 3))
        .await?;
    ctx.set_mode(Mode::Rtu);
    assert!(ctx.is_rtu());
    let rtu_reply = ctx
        .exchange(Request::ReadHoldingRegisters(0x006B, 3))
        .await?;

    assert_eq!(ascii_reply, rtu_reply);
    assert_eq!(ascii_reply.slave, Slave(0x11));
    let sent = sent.lock().unwrap();
    assert_eq!(sent[0], READ_REQUEST);
    assert_eq!(
        sent[1],
        rtu_frame(0x11, &[0x03, 0x00, 0x6B, 0x00, 0x03])
    );
    Ok(())
}

#[tokio::test]
async fn mark_parity_is_emulated() -> anyhow::Result<()> {
    let reply = ascii_frame(0x11, READ_RESPONSE_PDU)
        .into_iter()
        .map(|c| c | 0x80)
        .collect();
    let (device, sent) = Device::scripted([reply]);
    let config = Config {
        parity: Parity::Mark,
        ..Config::ascii()
    };
    let mut ctx = attach(device, 0x11, config);

    let registers = ctx.read_holding_registers(0x006B, 3).await??;

    assert_eq!(registers, [0x022B, 0x0000, 0x0064]);
    let sent = sent.lock().unwrap();
    assert!(sent[0].iter().all(|c| c & 0x80 != 0));
    let unmarked: Vec<u8> = sent[0].iter().map(|c| c & 0x7F).collect();
    assert_eq!(unmarked, READ_REQUEST);
    Ok(())
}

#[tokio::test]
async fn session_settings_of_attached_context() -> anyhow::Result<()> {
    let (device, sent) = Device::new(Box::new(|frame| {
        if frame.starts_with(b":") {
            ascii_frame(0x11, READ_RESPONSE_PDU)
        } else {
            rtu_frame(0x11, READ_RESPONSE_PDU)
        }
    }));
    let mut ctx = attach(device, 0x11, Config::ascii());

    ctx.set_mode(Mode::Rtu);
    ctx.set_verbose(true);
    assert!(ctx.is_rtu());
    assert!(ctx.config().verbose);
    let reply = ctx
        .exchange(Request::ReadHoldingRegisters(0x006B, 3))
        .await?;

    assert!(reply.checksum.is_valid());
    assert_eq!(
        reply.response,
        Ok(Response::ReadHoldingRegisters(vec![0x022B, 0x0000, 0x0064]))
    );
    assert_eq!(
        sent.lock().unwrap()[0],
        rtu_frame(0x11, &[0x03, 0x00, 0x6B, 0x00, 0x03])
    );
    Ok(())
}
