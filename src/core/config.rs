// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime configuration for the block cache and dispatcher.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{EmulatorError, Result};

/// Page geometry and execution toggles for the translation core.
///
/// The defaults match the PSX's 2 MiB RAM region divided into 4 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Size of one RAM page in bytes. Must be a power of two.
    pub page_size: u32,
    /// Number of RAM pages covered by the page map.
    pub page_count: usize,
    /// Whether the dispatcher should prefer native code over the cached interpreter.
    pub use_recompiler: bool,
    /// Whether to log each block compilation at debug level.
    pub trace_compilation: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_size: 0x1000,
            page_count: 512,
            use_recompiler: false,
            trace_compilation: false,
        }
    }
}

impl CacheConfig {
    /// Total RAM size implied by `page_size * page_count`.
    pub fn ram_size(&self) -> usize {
        self.page_size as usize * self.page_count
    }

    /// Load configuration overrides from a TOML file, falling back to defaults
    /// for any field the file omits.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| EmulatorError::InvalidConfig(e.to_string()))
    }
}
