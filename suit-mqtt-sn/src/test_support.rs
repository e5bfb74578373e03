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

//! In-memory stand-ins for the broker, the manifest parser, storage and boot slots.

use crate::backend::{
    BootSlots, FirmwareStorage, Manifest, ManifestComponent, ManifestParser, SlotHeader,
};
use crate::error::TransportError;
use crate::session::UpdateSession;
use crate::transport::{GatewayEndpoint, PublishHandler, TopicId, Transport};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use suit_mqtt_sn_messages::Topic;
use suit_mqtt_sn_messages::publication::BlockwisePublication;

pub const TRIGGER_TOPIC: &str = "suit/trigger";

pub fn gateway_endpoint() -> GatewayEndpoint {
    GatewayEndpoint::with_default_port("fe80::1".parse().unwrap())
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Broker holding retained messages, delivering them on subscribe like an MQTT-SN gateway.
#[derive(Default)]
pub struct BrokerTransport<'a> {
    session: Option<&'a UpdateSession<NoopRawMutex>>,
    retained: Vec<(String, Vec<u8>)>,
    triggers_on_subscribe: Vec<(String, Vec<u8>)>,
    /// Every subscribe in order, including ones since dropped
    subscriptions: Vec<(String, PublishHandler)>,
    live: Vec<(String, PublishHandler)>,
    peak_live: usize,
    unsubscriptions: Vec<String>,
    redeliver_live: bool,
    registered: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
    connect_failures: VecDeque<TransportError>,
    subscribe_failures: VecDeque<TransportError>,
    publish_failures: VecDeque<TransportError>,
    connects: usize,
}

impl<'a> BrokerTransport<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: &'a UpdateSession<NoopRawMutex>) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    pub fn retain(&mut self, topic: &str, payload: &[u8]) {
        self.retained.retain(|(t, _)| t != topic);
        self.retained.push((topic.to_string(), payload.to_vec()));
    }

    /// Retains the size message and every block of `payload` below `parent`.
    pub fn retain_blockwise(&mut self, parent: &str, payload: &[u8]) {
        for publication in BlockwisePublication::new(parent, payload).unwrap() {
            self.retain(publication.topic().as_str(), publication.payload());
        }
    }

    /// Publishes `url` on the trigger topic as soon as `topic` is subscribed.
    pub fn on_subscribe_trigger(&mut self, topic: &str, url: &[u8]) {
        self.triggers_on_subscribe
            .push((topic.to_string(), url.to_vec()));
    }

    /// Resends the retained message of every other live subscription on each subscribe,
    /// the way a gateway may repeat a publish it has not seen acknowledged.
    pub fn redeliver_live_subscriptions(&mut self) {
        self.redeliver_live = true;
    }

    pub fn fail_next_connect(&mut self, err: TransportError) {
        self.connect_failures.push_back(err);
    }

    pub fn fail_next_subscribe(&mut self, err: TransportError) {
        self.subscribe_failures.push_back(err);
    }

    pub fn fail_next_publish(&mut self, err: TransportError) {
        self.publish_failures.push_back(err);
    }

    pub fn connects(&self) -> usize {
        self.connects
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn live_subscriptions(&self) -> Vec<String> {
        self.live.iter().map(|(t, _)| t.clone()).collect()
    }

    /// Most subscriptions that were live at the same time.
    pub fn peak_live_subscriptions(&self) -> usize {
        self.peak_live
    }

    pub fn unsubscriptions(&self) -> Vec<String> {
        self.unsubscriptions.clone()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.live.iter().any(|(t, _)| t == topic)
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.clone()
    }
}

impl Transport for BrokerTransport<'_> {
    async fn connect(&mut self, _gateway: &GatewayEndpoint) -> Result<(), TransportError> {
        if let Some(err) = self.connect_failures.pop_front() {
            return Err(err);
        }
        self.connects += 1;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &Topic, handler: PublishHandler) -> Result<(), TransportError> {
        if let Some(err) = self.subscribe_failures.pop_front() {
            return Err(err);
        }
        self.subscriptions.push((topic.to_string(), handler));
        self.live.retain(|(t, _)| t != topic.as_str());
        self.live.push((topic.to_string(), handler));
        self.peak_live = self.peak_live.max(self.live.len());

        let Some(session) = self.session else {
            return Ok(());
        };
        if self.redeliver_live {
            for (live, live_handler) in self.live.iter().filter(|(t, _)| t != topic.as_str()) {
                if let Some((_, payload)) = self.retained.iter().find(|(t, _)| t == live) {
                    session.on_publish(*live_handler, live, payload);
                }
            }
        }
        if let Some((_, payload)) = self.retained.iter().find(|(t, _)| t == topic.as_str()) {
            session.on_publish(handler, topic, payload);
        }
        if let Some(pos) = self
            .triggers_on_subscribe
            .iter()
            .position(|(t, _)| t == topic.as_str())
        {
            let (_, url) = self.triggers_on_subscribe.remove(pos);
            session.on_publish(PublishHandler::Trigger, TRIGGER_TOPIC, &url);
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &Topic) -> Result<(), TransportError> {
        self.live.retain(|(t, _)| t != topic.as_str());
        self.unsubscriptions.push(topic.to_string());
        Ok(())
    }

    async fn register_topic(&mut self, name: &str) -> Result<TopicId, TransportError> {
        let id = match self.registered.iter().position(|t| t == name) {
            Some(id) => id,
            None => {
                self.registered.push(name.to_string());
                self.registered.len() - 1
            }
        };
        Ok(TopicId(id as u16))
    }

    async fn publish(&mut self, topic: TopicId, payload: &[u8]) -> Result<(), TransportError> {
        if let Some(err) = self.publish_failures.pop_front() {
            return Err(err);
        }
        let name = self
            .registered
            .get(topic.0 as usize)
            .ok_or(TransportError::Rejected)?;
        self.published.push((name.clone(), payload.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockComponent {
    uri: Option<String>,
    image_size: Option<Vec<u8>>,
}

impl ManifestComponent for MockComponent {
    fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn image_size_param(&self) -> Option<&[u8]> {
        self.image_size.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct MockManifest {
    component: Option<MockComponent>,
}

impl MockManifest {
    pub fn new(uri: &str, image_size: Option<u32>) -> Self {
        let image_size = image_size.map(|size| {
            let mut param = [0u8; 9];
            minicbor::encode(size, &mut param[..]).unwrap();
            param.to_vec()
        });
        Self {
            component: Some(MockComponent {
                uri: Some(uri.to_string()),
                image_size,
            }),
        }
    }

    pub fn without_component() -> Self {
        Self { component: None }
    }
}

impl Manifest for MockManifest {
    type Component = MockComponent;

    fn current_component(&self) -> Option<&MockComponent> {
        self.component.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockParseError;

/// Hands out a fixed manifest and records what it was asked to parse.
#[derive(Clone, Default)]
pub struct MockParser {
    manifest: Option<MockManifest>,
    parsed: Rc<RefCell<Vec<(Vec<u8>, String)>>>,
}

impl MockParser {
    pub fn accepting(manifest: MockManifest) -> Self {
        Self {
            manifest: Some(manifest),
            ..Self::default()
        }
    }

    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn parsed(&self) -> Vec<(Vec<u8>, String)> {
        self.parsed.borrow().clone()
    }
}

impl ManifestParser for MockParser {
    type Manifest = MockManifest;
    type Error = MockParseError;

    fn parse(&mut self, manifest: &[u8], url: &str) -> Result<MockManifest, MockParseError> {
        self.parsed
            .borrow_mut()
            .push((manifest.to_vec(), url.to_string()));
        self.manifest.clone().ok_or(MockParseError)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageRecord {
    /// `(offset, len)` of every write
    pub writes: Vec<(usize, usize)>,
    pub finished: usize,
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageFailure;

#[derive(Clone, Default)]
pub struct RamStorage {
    record: Rc<RefCell<StorageRecord>>,
    failing: bool,
}

impl RamStorage {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn record(&self) -> StorageRecord {
        self.record.borrow().clone()
    }
}

impl FirmwareStorage<MockManifest> for RamStorage {
    type Error = StorageFailure;

    async fn write(
        &mut self,
        _component: &MockComponent,
        _manifest: &MockManifest,
        data: &[u8],
        offset: usize,
    ) -> Result<(), StorageFailure> {
        if self.failing {
            return Err(StorageFailure);
        }
        let mut record = self.record.borrow_mut();
        record.writes.push((offset, data.len()));
        if record.image.len() < offset + data.len() {
            record.image.resize(offset + data.len(), 0);
        }
        record.image[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    async fn finish(&mut self, _component: &MockComponent, _manifest: &MockManifest) -> Result<(), StorageFailure> {
        if self.failing {
            return Err(StorageFailure);
        }
        self.record.borrow_mut().finished += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockHeader {
    pub version: u32,
    pub valid: bool,
}

impl SlotHeader for MockHeader {
    fn version(&self) -> u32 {
        self.version
    }
}

#[derive(Clone)]
pub struct MockBoot {
    pub current: u8,
    pub headers: [Option<MockHeader>; 2],
    reboots: Rc<Cell<usize>>,
}

impl MockBoot {
    pub fn new(current: u8, headers: [Option<MockHeader>; 2]) -> Self {
        Self {
            current,
            headers,
            reboots: Rc::new(Cell::new(0)),
        }
    }

    pub fn reboots(&self) -> usize {
        self.reboots.get()
    }
}

impl BootSlots for MockBoot {
    type Header = MockHeader;

    fn current_slot(&self) -> u8 {
        self.current
    }

    fn other_slot(&self) -> u8 {
        1 - self.current
    }

    fn header(&self, slot: u8) -> Option<MockHeader> {
        self.headers.get(slot as usize).copied().flatten()
    }

    fn validate_header(&self, header: &MockHeader) -> bool {
        header.valid
    }

    fn reboot(&mut self) {
        self.reboots.set(self.reboots.get() + 1);
    }
}
