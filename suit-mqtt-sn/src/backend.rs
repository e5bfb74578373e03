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

//! Interfaces to the manifest parser, the image storage and the boot slots.

use core::fmt::Debug;

pub trait ManifestComponent {
    /// URL the component image is fetched from
    fn uri(&self) -> Option<&str>;

    /// The CBOR encoded image size parameter, if the manifest sets one
    fn image_size_param(&self) -> Option<&[u8]>;
}

pub trait Manifest {
    type Component: ManifestComponent;

    /// The component the manifest is currently installing
    fn current_component(&self) -> Option<&Self::Component>;
}

/// Decodes and validates a manifest, signature and policy checks included.
pub trait ManifestParser {
    type Manifest: Manifest;
    type Error: Debug;

    fn parse(&mut self, manifest: &[u8], url: &str) -> Result<Self::Manifest, Self::Error>;
}

/// Storage for the image being installed, normally the inactive slot.
pub trait FirmwareStorage<Mf: Manifest> {
    type Error: Debug;

    async fn write(
        &mut self,
        component: &Mf::Component,
        manifest: &Mf,
        data: &[u8],
        offset: usize,
    ) -> Result<(), Self::Error>;

    async fn finish(&mut self, component: &Mf::Component, manifest: &Mf) -> Result<(), Self::Error>;
}

pub trait SlotHeader {
    fn version(&self) -> u32;
}

pub trait BootSlots {
    type Header: SlotHeader + Debug;

    fn current_slot(&self) -> u8;

    fn other_slot(&self) -> u8;

    fn header(&self, slot: u8) -> Option<Self::Header>;

    fn validate_header(&self, header: &Self::Header) -> bool;

    /// Restarts into the other slot. Only returns on platforms that cannot reset.
    fn reboot(&mut self);
}
