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

//! Crate-wide error type.
//!
//! Empty block decodes and host-code emitter failures are *not* represented
//! here: per the error handling design, both are ordinary recoverable control
//! flow (an `Option` and a logged fallback, respectively), not exceptional.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors surfaced by the translation core and its supporting bus/config layers.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// A bus memory access landed outside of any mapped region.
    #[error("invalid memory access at address 0x{address:08X}")]
    InvalidMemoryAccess { address: u32 },

    /// A memory access was not aligned to its access size.
    #[error("unaligned {size}-byte access at address 0x{address:08X}")]
    UnalignedAccess { address: u32, size: u8 },

    /// A BIOS image could not be found on disk.
    #[error("BIOS image not found: {0}")]
    BiosNotFound(String),

    /// A BIOS image was the wrong size.
    #[error("invalid BIOS size: expected {expected} bytes, got {got} bytes")]
    InvalidBiosSize { expected: usize, got: usize },

    /// A general-purpose register index was out of range.
    #[error("invalid register index: {index}")]
    InvalidRegister { index: u8 },

    /// A configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Propagated I/O failure (loading a BIOS image, a config file, etc).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
