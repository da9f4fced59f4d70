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
use std::net::{AddrParseError, SocketAddr};

use serde::Deserialize;

const DEFAULT_HTTP_ADDRESS: &str = "0.0.0.0:5000";

/// Allows users to specify various controllers.
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Controller {
    Http(HttpController),
    Keyboard,
}

/// The configuration for the HTTP control surface.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct HttpController {
    /// The address to listen on.
    address: Option<String>,
}

impl HttpController {
    /// Creates a new HTTP controller configuration.
    pub fn new(address: &str) -> HttpController {
        HttpController {
            address: Some(address.to_string()),
        }
    }

    /// Gets the address to listen on.
    pub fn address(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or(DEFAULT_HTTP_ADDRESS)
            .parse()
    }
}
