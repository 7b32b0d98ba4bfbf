/*
 * If not stated otherwise in this file or this component's LICENSE file the
 * following copyright and licenses apply:
 *
 * Copyright 2025 RDK Management
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
*/

#![deny(warnings)]

mod logger;

use clap::Parser;
use nlframe::frame_codec::DEFAULT_DESTINATION;
use nlframe::frame_sender::{DEFAULT_BUFFER_CAPACITY, DEFAULT_FREQUENCY, DEFAULT_INTERFACE};
use nlframe::nl80211_socket::DEFAULT_SOCKET_BUFFER_SIZE;
use nlframe::{
    send_action_frame, CallbackRegistry, FrameSenderConfig, FrameTxObserver,
    LinuxInterfaceResolver, Nl80211Connector,
};
use pnet::datalink::MacAddr;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about = "Send one 802.11 action frame through nl80211", long_about = None)]
struct CliArgs {
    /// Wireless interface to transmit on
    #[arg(long, short, default_value_t = String::from(DEFAULT_INTERFACE))]
    interface: String,
    /// Destination MAC address
    #[arg(long, short, default_value_t = DEFAULT_DESTINATION, value_parser = parse_mac)]
    destination: MacAddr,
    /// Channel frequency in MHz
    #[arg(long, default_value_t = DEFAULT_FREQUENCY)]
    freq: u32,
    /// Do not send a channel frequency (kernels without NL80211_ATTR_WIPHY_FREQ on CMD_FRAME)
    #[arg(long)]
    no_freq: bool,
    /// Capacity of the frame buffer in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_CAPACITY)]
    buffer_size: usize,
    /// Netlink socket send and receive buffer size in bytes
    #[arg(long, default_value_t = DEFAULT_SOCKET_BUFFER_SIZE)]
    socket_buffer_size: usize,
    /// Tracing filter
    #[arg(long,short,default_value_t=String::from("info"))]
    filter: String,
    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
    /// Disable stdout appender for logs
    #[arg(long)]
    no_stdout_appender: bool,
}

fn parse_mac(value: &str) -> Result<MacAddr, String> {
    value
        .parse::<MacAddr>()
        .map_err(|e| format!("invalid MAC address {value:?}: {e}"))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = CliArgs::parse();

    let _guard = logger::init_logger(&cli)?;
    tracing::debug!("Tracing initialized!");

    let config = FrameSenderConfig {
        interface: cli.interface.clone(),
        destination: cli.destination,
        frequency: (!cli.no_freq).then_some(cli.freq),
        buffer_capacity: cli.buffer_size,
    };
    let connector = Nl80211Connector::new(cli.socket_buffer_size);

    let mut registry = CallbackRegistry::new();
    registry.register(FrameTxObserver);

    match send_action_frame(&config, &LinuxInterfaceResolver, &connector, &mut registry) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{e}");
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
