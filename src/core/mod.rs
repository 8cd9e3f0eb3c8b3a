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

//! Core emulation components: CPU architectural state, the memory bus
//! adapter, and the dynamic binary translation ([`jit`]) subsystem built
//! on top of them.

pub mod config;
pub mod cpu;
pub mod error;
pub mod jit;
pub mod memory;

/// Initialize `.env`-based log level overrides and the `env_logger`
/// subscriber once per test binary, mirroring how a consuming application
/// would set up logging at `main()`.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = dotenvy::dotenv();
    let _ = env_logger::try_init();
}
