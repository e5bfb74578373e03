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

use crate::error::TransportError;
use core::fmt;
use core::net::Ipv6Addr;
use suit_mqtt_sn_messages::Topic;
use suit_mqtt_sn_messages::config::GATEWAY_PORT;

/// Which receive handler a subscription delivers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishHandler {
    Trigger,
    Manifest,
    Firmware,
}

/// Topic id handed out by the gateway on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TopicId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayEndpoint {
    pub addr: Ipv6Addr,
    pub port: u16,
}

impl GatewayEndpoint {
    pub const fn new(addr: Ipv6Addr, port: u16) -> Self {
        Self { addr, port }
    }

    pub const fn with_default_port(addr: Ipv6Addr) -> Self {
        Self::new(addr, GATEWAY_PORT)
    }
}

impl fmt::Display for GatewayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]:{}", self.addr, self.port)
    }
}

/// MQTT-SN client used by the updater.
///
/// Implementations remember the `PublishHandler` of every subscription and hand each
/// incoming PUBLISH to `UpdateSession::on_publish` together with that handler. Delivery may
/// happen from the transport's own receive context, including from inside `subscribe` when
/// the gateway answers with a retained message straight away.
pub trait Transport {
    async fn connect(&mut self, gateway: &GatewayEndpoint) -> Result<(), TransportError>;

    async fn subscribe(&mut self, topic: &Topic, handler: PublishHandler) -> Result<(), TransportError>;

    async fn unsubscribe(&mut self, topic: &Topic) -> Result<(), TransportError>;

    async fn register_topic(&mut self, name: &str) -> Result<TopicId, TransportError>;

    async fn publish(&mut self, topic: TopicId, payload: &[u8]) -> Result<(), TransportError>;
}
