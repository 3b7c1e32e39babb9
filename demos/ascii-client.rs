// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asynchronous ASCII client example

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::time::Duration;

    use serial_modbus::prelude::*;

    env_logger::init();

    let tty_path = "/dev/ttyUSB0";
    let slave = Slave(0x11);

    let config = Config {
        parity: Parity::Mark,
        timeout: Some(Duration::from_millis(500)),
        verbose: true,
        ..Config::ascii()
    };
    let mut ctx = serial::connect_slave(tty_path, slave, config)?;

    println!("Reading device identification");
    let rsp = ctx.read_device_identification(ReadCode::Basic, 0x00).await?;
    match rsp {
        Ok(rsp) => {
            for object in &rsp.device_id_objects {
                println!("Object 0x{:02X}: {:?}", object.id, object.value_as_str());
            }
        }
        Err(exception) => println!("The device responded with an exception: {exception}"),
    }

    println!("Echoing some data");
    let data = ctx.return_query_data(b"hello").await??;
    println!("Echo: {data:?}");

    ctx.disconnect().await?;

    Ok(())
}
