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

use crate::error::{ConnectError, SubscribeError, TransportError};
use crate::transport::{GatewayEndpoint, PublishHandler, Transport};
use log::{debug, error, info, warn};
use suit_mqtt_sn_messages::Topic;

/// The connection to the MQTT-SN gateway.
///
/// Remembers the last gateway that accepted a connection so a dropped session can be
/// re-established once when a subscription fails.
pub struct GatewaySession<T: Transport> {
    transport: T,
    last_known_good: Option<GatewayEndpoint>,
}

impl<T: Transport> GatewaySession<T> {
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            last_known_good: None,
        }
    }

    pub fn last_known_good(&self) -> Option<GatewayEndpoint> {
        self.last_known_good
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub async fn connect(&mut self, gateway: GatewayEndpoint) -> Result<(), ConnectError> {
        self.transport.connect(&gateway).await.map_err(|e| {
            error!("Unable to connect to gateway at {}: {:?}", gateway, e);
            ConnectError::from(e)
        })?;

        info!("Connected to gateway at {}", gateway);
        self.last_known_good = Some(gateway);
        Ok(())
    }

    /// Subscribes `topic`, reconnecting once to the last good gateway if the session dropped.
    pub async fn subscribe_with_recovery(
        &mut self,
        topic: &Topic,
        handler: PublishHandler,
    ) -> Result<(), SubscribeError> {
        for attempt in 0..=1 {
            match self.transport.subscribe(topic, handler).await {
                Ok(()) => {
                    info!("Now subscribed to {}", topic);
                    return Ok(());
                }
                Err(TransportError::GatewayDisconnected) if attempt == 0 => {
                    warn!("Gateway disconnected while subscribing to {}", topic);
                    self.reconnect().await?;
                }
                Err(e) => {
                    error!("Unable to subscribe to {}: {:?}", topic, e);
                    return Err(e.into());
                }
            }
        }
        Err(SubscribeError::GatewayDisconnected)
    }

    /// Drops the subscription to `topic`. Failures are logged and otherwise ignored.
    pub async fn unsubscribe(&mut self, topic: &Topic) {
        match self.transport.unsubscribe(topic).await {
            Ok(()) => debug!("Unsubscribed from {}", topic),
            Err(e) => warn!("Unable to unsubscribe from {}: {:?}", topic, e),
        }
    }

    async fn reconnect(&mut self) -> Result<(), SubscribeError> {
        let Some(gateway) = self.last_known_good else {
            error!("No known gateway to reconnect to");
            return Err(SubscribeError::GatewayDisconnected);
        };

        info!("Trying to reconnect to {}", gateway);
        self.transport.connect(&gateway).await.map_err(|e| {
            error!("Reconnect to {} failed: {:?}", gateway, e);
            SubscribeError::GatewayDisconnected
        })?;
        info!("Successfully reconnected to {}", gateway);
        Ok(())
    }

    /// Registers `name` and publishes `payload` on it.
    pub async fn publish_to(&mut self, name: &str, payload: &[u8]) -> Result<(), TransportError> {
        let id = self.transport.register_topic(name).await.map_err(|e| {
            error!("Unable to register topic id for {}: {:?}", name, e);
            e
        })?;
        self.transport.publish(id, payload).await.map_err(|e| {
            error!("Unable to publish to {}: {:?}", name, e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BrokerTransport, gateway_endpoint};
    use embassy_futures::block_on;

    fn topic(name: &str) -> Topic {
        Topic::try_from_str(name).unwrap()
    }

    #[test]
    fn successful_connect_is_remembered() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        assert_eq!(gateway.last_known_good(), None);

        block_on(gateway.connect(gateway_endpoint())).unwrap();
        assert_eq!(gateway.last_known_good(), Some(gateway_endpoint()));
    }

    #[test]
    fn failed_connect_keeps_the_previous_gateway() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        block_on(gateway.connect(gateway_endpoint())).unwrap();

        gateway.transport_mut().fail_next_connect(TransportError::Timeout);
        let other = GatewayEndpoint::with_default_port("fe80::2".parse().unwrap());
        assert_eq!(
            block_on(gateway.connect(other)),
            Err(ConnectError::Transport(TransportError::Timeout))
        );
        assert_eq!(gateway.last_known_good(), Some(gateway_endpoint()));
    }

    #[test]
    fn dropped_session_is_recovered_once() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        block_on(gateway.connect(gateway_endpoint())).unwrap();

        gateway
            .transport_mut()
            .fail_next_subscribe(TransportError::GatewayDisconnected);
        block_on(gateway.subscribe_with_recovery(&topic("suit/trigger"), PublishHandler::Trigger))
            .unwrap();

        let broker = gateway.transport();
        assert_eq!(broker.connects(), 2);
        assert!(broker.is_subscribed("suit/trigger"));
    }

    #[test]
    fn failed_reconnect_reports_the_disconnect() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        block_on(gateway.connect(gateway_endpoint())).unwrap();

        gateway
            .transport_mut()
            .fail_next_subscribe(TransportError::GatewayDisconnected);
        gateway.transport_mut().fail_next_connect(TransportError::Timeout);
        assert_eq!(
            block_on(gateway.subscribe_with_recovery(&topic("suit/trigger"), PublishHandler::Trigger)),
            Err(SubscribeError::GatewayDisconnected)
        );
    }

    #[test]
    fn second_disconnect_after_reconnect_is_reported() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        block_on(gateway.connect(gateway_endpoint())).unwrap();

        let broker = gateway.transport_mut();
        broker.fail_next_subscribe(TransportError::GatewayDisconnected);
        broker.fail_next_subscribe(TransportError::GatewayDisconnected);
        assert_eq!(
            block_on(gateway.subscribe_with_recovery(&topic("suit/trigger"), PublishHandler::Trigger)),
            Err(SubscribeError::GatewayDisconnected)
        );

        let broker = gateway.transport();
        assert_eq!(broker.connects(), 2);
        assert!(!broker.is_subscribed("suit/trigger"));
    }

    #[test]
    fn no_reconnect_without_a_known_gateway() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        gateway
            .transport_mut()
            .fail_next_subscribe(TransportError::GatewayDisconnected);

        assert_eq!(
            block_on(gateway.subscribe_with_recovery(&topic("suit/trigger"), PublishHandler::Trigger)),
            Err(SubscribeError::GatewayDisconnected)
        );
        assert_eq!(gateway.transport().connects(), 0);
    }

    #[test]
    fn other_subscribe_failures_are_not_retried() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        block_on(gateway.connect(gateway_endpoint())).unwrap();

        gateway.transport_mut().fail_next_subscribe(TransportError::Rejected);
        assert_eq!(
            block_on(gateway.subscribe_with_recovery(&topic("suit/trigger"), PublishHandler::Trigger)),
            Err(SubscribeError::SubscribeFailed(TransportError::Rejected))
        );
        assert_eq!(gateway.transport().connects(), 1);
    }

    #[test]
    fn publish_registers_the_topic_first() {
        let mut gateway = GatewaySession::new(BrokerTransport::new());
        block_on(gateway.connect(gateway_endpoint())).unwrap();
        block_on(gateway.publish_to("device/version", b"7")).unwrap();

        assert_eq!(
            gateway.transport().published(),
            std::vec![("device/version".to_string(), b"7".to_vec())]
        );
    }
}
