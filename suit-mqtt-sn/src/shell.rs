// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! `con` and `sub` shell commands.
//!
//! ```text
//! con <ipv6 addr> [port]
//! sub <topic>
//! ```
//!
//! A successful `con` also subscribes the configured trigger topic and publishes the device
//! status.

use crate::backend::BootSlots;
use crate::config::UpdaterConfig;
use crate::gateway::GatewaySession;
use crate::status::publish_device_status;
use crate::transport::{GatewayEndpoint, PublishHandler, Transport};
use core::net::Ipv6Addr;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use log::{error, warn};
use suit_mqtt_sn_messages::Topic;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand<'a> {
    Connect(GatewayEndpoint),
    Subscribe(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsageError {
    /// Wrong number of arguments, carries the usage line
    Usage(&'static str),
    InvalidAddress,
    InvalidPort,
    UnknownCommand,
}

const CON_USAGE: &str = "usage: con <ipv6 addr> [port]";
const SUB_USAGE: &str = "usage: sub <topic name>";

impl<'a> ShellCommand<'a> {
    /// Parses `argv` style arguments, the command name first.
    pub fn parse(args: &[&'a str]) -> Result<Self, UsageError> {
        match args {
            ["con", addr] => Ok(ShellCommand::Connect(GatewayEndpoint::with_default_port(
                parse_addr(addr)?,
            ))),
            ["con", addr, port] => {
                let port = port.parse::<u16>().map_err(|_| UsageError::InvalidPort)?;
                Ok(ShellCommand::Connect(GatewayEndpoint::new(parse_addr(addr)?, port)))
            }
            ["con", ..] => Err(UsageError::Usage(CON_USAGE)),
            ["sub", topic] => Ok(ShellCommand::Subscribe(*topic)),
            ["sub", ..] => Err(UsageError::Usage(SUB_USAGE)),
            _ => Err(UsageError::UnknownCommand),
        }
    }

    pub async fn execute<M: RawMutex, T: Transport, B: BootSlots>(
        &self,
        gateway: &Mutex<M, GatewaySession<T>>,
        boot: &B,
        config: &UpdaterConfig,
    ) -> i32 {
        let mut gateway = gateway.lock().await;
        match *self {
            ShellCommand::Connect(endpoint) => {
                if gateway.connect(endpoint).await.is_err() {
                    return EXIT_FAILURE;
                }
                let subscribed = subscribe_trigger(&mut gateway, config).await;
                publish_device_status(&mut gateway, boot, config).await;
                if subscribed { EXIT_SUCCESS } else { EXIT_FAILURE }
            }
            ShellCommand::Subscribe(name) => {
                let topic = match Topic::try_from_str(name) {
                    Ok(topic) => topic,
                    Err(e) => {
                        error!("Unable to subscribe to {}: {:?}", name, e);
                        return EXIT_FAILURE;
                    }
                };
                match gateway
                    .subscribe_with_recovery(&topic, PublishHandler::Trigger)
                    .await
                {
                    Ok(()) => EXIT_SUCCESS,
                    Err(_) => EXIT_FAILURE,
                }
            }
        }
    }
}

/// Subscribes the configured trigger topic, returning whether it succeeded.
async fn subscribe_trigger<T: Transport>(
    gateway: &mut GatewaySession<T>,
    config: &UpdaterConfig,
) -> bool {
    let topic = match Topic::try_from_str(config.trigger_topic) {
        Ok(topic) => topic,
        Err(e) => {
            error!("Invalid trigger topic {}: {:?}", config.trigger_topic, e);
            return false;
        }
    };
    gateway
        .subscribe_with_recovery(&topic, PublishHandler::Trigger)
        .await
        .is_ok()
}

fn parse_addr(addr: &str) -> Result<Ipv6Addr, UsageError> {
    addr.parse().map_err(|_| UsageError::InvalidAddress)
}

/// Parses and runs one shell command, returning its exit code.
pub async fn run_command<M: RawMutex, T: Transport, B: BootSlots>(
    args: &[&str],
    gateway: &Mutex<M, GatewaySession<T>>,
    boot: &B,
    config: &UpdaterConfig,
) -> i32 {
    match ShellCommand::parse(args) {
        Ok(command) => command.execute(gateway, boot, config).await,
        Err(UsageError::Usage(usage)) => {
            warn!("{}", usage);
            EXIT_FAILURE
        }
        Err(e) => {
            warn!("Invalid command: {:?}", e);
            EXIT_FAILURE
        }
    }
}
