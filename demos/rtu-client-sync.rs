// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous RTU client example

fn main() -> Result<(), Box<dyn std::error::Error>> {
    use serial_modbus::prelude::*;

    env_logger::init();

    let tty_path = "/dev/ttyUSB0";
    let slave = Slave(0x17);

    let mut ctx = sync::serial::connect_slave(tty_path, slave, Config::rtu())?;
    println!("Reading a sensor value");
    let rsp = ctx.read_holding_registers(0x082B, 2)??;
    println!("Sensor value is: {rsp:?}");

    println!("Reading the event counter");
    let counter = ctx.get_comm_event_counter()??;
    println!("Event counter: {counter:?}");

    ctx.disconnect()?;

    Ok(())
}
