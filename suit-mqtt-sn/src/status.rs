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

use crate::backend::{BootSlots, SlotHeader};
use crate::config::UpdaterConfig;
use crate::gateway::GatewaySession;
use crate::transport::Transport;
use log::{info, warn};
use suit_mqtt_sn_messages::status::{slot_payload, version_payload};

/// Publishes the active slot, the inactive slot and the running version.
///
/// Fire and forget: failures are logged and the remaining topics are still published.
/// Returns the number of topics that were published.
pub async fn publish_device_status<T: Transport, B: BootSlots>(
    gateway: &mut GatewaySession<T>,
    boot: &B,
    config: &UpdaterConfig,
) -> usize {
    let mut published = 0;

    let slots = [
        (config.slot_active_topic, boot.current_slot()),
        (config.slot_inactive_topic, boot.other_slot()),
    ];
    for (topic, slot) in slots {
        let Some(payload) = slot_payload(slot) else {
            warn!("Slot {} has no single digit status form", slot);
            continue;
        };
        if gateway.publish_to(topic, &payload).await.is_ok() {
            published += 1;
        }
    }

    match boot.header(boot.current_slot()) {
        Some(header) => {
            let version = version_payload(header.version());
            if gateway
                .publish_to(config.version_topic, version.as_bytes())
                .await
                .is_ok()
            {
                published += 1;
            }
        }
        None => warn!("No header for the running slot, version not published"),
    }

    info!("Published {} device status topics", published);
    published
}
