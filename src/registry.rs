// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{slice, time::Duration};

use tracing::{info, span, Level};

use crate::{
    config::{self, ConfigError},
    device::{Channel, ChannelSettings, Connector},
};

/// The fixed, ordered set of channels opened at startup. Index 0 is the left device and index 1
/// the right device.
pub struct Registry {
    channels: Vec<Channel>,
}

impl Registry {
    /// Opens a channel for every enabled device, in configuration order. Disabled devices are
    /// skipped without touching their ports.
    pub fn new(
        devices: &[config::Device],
        settings: &ChannelSettings,
        connector: &dyn Connector,
    ) -> Registry {
        let span = span!(Level::INFO, "registry");
        let _enter = span.enter();

        let channels: Vec<Channel> = devices
            .iter()
            .filter(|device| {
                if !device.enabled() {
                    info!(device = device.name(), "Device disabled in config, skipping.");
                }
                device.enabled()
            })
            .map(|device| Channel::connect(device, settings.clone(), connector))
            .collect();

        info!(
            channels = channels.len(),
            enabled = channels.iter().filter(|c| c.is_enabled()).count(),
            "Registry ready."
        );
        Registry { channels }
    }

    /// Opens the channels described by the player configuration.
    pub fn from_config(
        config: &config::Player,
        connector: &dyn Connector,
    ) -> Result<Registry, ConfigError> {
        Ok(Registry::new(
            config.devices(),
            &ChannelSettings::from_config(config)?,
            connector,
        ))
    }

    /// Gets the channel at the given position.
    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    /// The longest command interval of any channel. Waiting this long after a command
    /// guarantees every channel accepts the next one.
    pub fn command_interval(&self) -> Duration {
        self.iter()
            .map(Channel::command_interval)
            .max()
            .unwrap_or_default()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Channel;
    type IntoIter = slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}
