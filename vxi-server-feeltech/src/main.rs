//! # VXI-11 Server for FeelTech AWGs
//!
//! Network front end that lets a Siglent oscilloscope's Bode-plot sweep
//! drive a cheap FeelTech-style arbitrary waveform generator. The bridge
//! impersonates a Siglent AWG at the RPC/VXI-11 layer and relays waveform
//! settings to the real instrument over its serial port.
pub mod awg;

use std::error::Error;
use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use vxi_server::server::Builder;

use crate::awg::engine::FeelTech;
use crate::awg::models::FyModel;
use crate::awg::serial::SerialLine;

#[derive(Parser)]
#[command(about = "Siglent-compatible VXI-11 network front end for FeelTech AWGs", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: IpAddr,

    /// Port of the RPC bind (portmap) service
    #[arg(long, default_value = "111")]
    bind_port: u16,

    /// First port of the VXI-11 session range
    #[arg(long, default_value = "9010")]
    first_port: u16,

    /// Last port of the VXI-11 session range
    #[arg(long, default_value = "9019")]
    last_port: u16,

    /// Serial device the AWG is attached to
    #[arg(short, long)]
    serial: String,

    /// Baud rate of the serial link
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// Verify each setting by reading it back, retrying this many times
    #[arg(short, long, default_value = "0")]
    retries: u32,

    /// Disconnect a silent client after this many seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Serial read timeout in milliseconds
    #[arg(long, default_value = "1000")]
    serial_timeout_ms: u64,

    /// AWG model attached to the serial port
    #[arg(long, value_enum, default_value = "fy6900")]
    model: FyModel,

    /// Answer BSWV? queries with live readings instead of the id string
    #[arg(long)]
    parameter_echo: bool,

    /// Translate all Siglent waveforms instead of pinning sine
    #[arg(long)]
    full_wave_translation: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("starting AWG bridge");

    let args = Args::parse();
    log::debug!(
        "opening {} at {} baud for a {:?}",
        args.serial,
        args.baud,
        args.model
    );

    let link = SerialLine::open(
        &args.serial,
        args.baud,
        Duration::from_millis(args.serial_timeout_ms),
    )?;
    let device = FeelTech::new(link, args.model, args.retries)
        .full_wave_translation(args.full_wave_translation);

    let server = Builder::new()
        .ip(args.ip)
        .bind_port(args.bind_port)
        .port_range(args.first_port, args.last_port)
        .inactivity_timeout(Duration::from_secs(args.timeout))
        .parameter_echo(args.parameter_echo)
        .build(device)?;
    server.run();
    Ok(())
}
