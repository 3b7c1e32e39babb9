// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

mod device;

use device::{attach, Device};
use serial_modbus::{
    client::{Context, Reader as _, SerialLine as _, Writer as _},
    Config, ExceptionCode, FileRecordRequest, Mode, ReadCode,
};

// Every function is answered with a different exception.
fn exception_device(mode: Mode) -> Device {
    let (device, _) = Device::responder(mode, |_, pdu| {
        let exception = match pdu[0] {
            0x01 => 0x05,
            0x02 => 0x0A,
            0x05 => 0x0B,
            0x0F => 0x02,
            0x04 => 0x03,
            0x03 => 0x01,
            0x06 => 0x08,
            0x10 => 0x06,
            0x16 => 0x04,
            0x07 => 0x07,
            0x08 => 0x09,
            _ => 0x01,
        };
        Some(vec![pdu[0] | 0x80, exception])
    });
    device
}

async fn check_client_context(mut ctx: Context) {
    let response = ctx.read_coils(0x00, 2).await.unwrap();
    assert!(matches!(response, Err(ExceptionCode::Acknowledge)));

    let response = ctx
        .read_discrete_inputs(0x00, 2)
        .await
        .expect("communication failed");
    assert!(matches!(
        response,
        Err(ExceptionCode::GatewayPathUnavailable)
    ));

    let response = ctx
        .write_single_coil(0x00, true)
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::GatewayTargetDevice)));

    let response = ctx
        .write_multiple_coils(0x00, &[true])
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::IllegalDataAddress)));

    let response = ctx
        .read_input_registers(0x00, 2)
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::IllegalDataValue)));

    let response = ctx
        .read_holding_registers(0x00, 2)
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::IllegalFunction)));

    let response = ctx
        .write_single_register(0x00, 42)
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::MemoryParityError)));

    let response = ctx
        .write_multiple_registers(0x00, &[42])
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::ServerDeviceBusy)));

    let response = ctx
        .masked_write_register(0x00, 0, 0)
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::ServerDeviceFailure)));

    // Unassigned codes
    let response = ctx
        .read_exception_status()
        .await
        .expect("communication failed");
    assert_eq!(response, Err(ExceptionCode::Unknown(0x07)));

    let response = ctx
        .return_query_data(&[0x12, 0x34])
        .await
        .expect("communication failed");
    assert_eq!(response, Err(ExceptionCode::Unknown(0x09)));
    assert_eq!(
        ExceptionCode::Unknown(0x09).to_string(),
        "Unknown exception (0x09)"
    );

    let response = ctx
        .read_file_record(&[FileRecordRequest {
            file_number: 1,
            record_number: 0,
            record_length: 1,
        }])
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::IllegalFunction)));

    let response = ctx
        .read_device_identification(ReadCode::Basic, 0x00)
        .await
        .expect("communication failed");
    assert!(matches!(response, Err(ExceptionCode::IllegalFunction)));
}

#[tokio::test]
async fn all_exceptions_rtu() {
    check_client_context(attach(exception_device(Mode::Rtu), 0x01, Config::rtu())).await;
}

#[tokio::test]
async fn all_exceptions_ascii() {
    check_client_context(attach(exception_device(Mode::Ascii), 0x01, Config::ascii())).await;
}
