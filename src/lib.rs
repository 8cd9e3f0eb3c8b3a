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

//! psx-dbt-core: the guest-code fetch/decode/cache/dispatch core of a PSX
//! dynamic binary translator.
//!
//! This crate implements basic-block discovery and caching for a MIPS
//! R3000A guest, the page-indexed reverse map that invalidates cached
//! blocks when guest code is overwritten, and the dispatcher loop that
//! drives cached and uncached execution fallbacks. [`core::cpu::interpreter::ReferenceInterpreter`]
//! provides enough real instruction semantics to exercise that machinery
//! end to end, but it is not a complete, cycle-accurate R3000A; a
//! host-code emitter backend, and anything above the CPU (GPU, SPU, DMA,
//! peripherals), remain separate concerns reachable only through the
//! [`core::cpu::interpreter::Interpreter`] and [`core::jit::emitter::Emitter`]
//! seams.
//!
//! # Architecture
//!
//! - [`core::cpu`]: MIPS R3000A architectural state (registers, COP0,
//!   load-delay and branch-delay bookkeeping) plus
//!   [`core::cpu::interpreter::ReferenceInterpreter`]'s instruction semantics.
//! - [`core::memory`]: the [`core::memory::Bus`] adapter trait and a
//!   minimal [`core::memory::SimpleBus`] implementation.
//! - [`core::jit`]: block identity, the decoder, the block cache, and the
//!   dispatcher.
//!
//! # Example
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use psx_dbt_core::core::cpu::interpreter::NullInterpreter;
//! use psx_dbt_core::core::cpu::CpuCore;
//! use psx_dbt_core::core::jit::{BlockCache, Dispatcher, NullEmitter};
//! use psx_dbt_core::core::memory::SimpleBus;
//!
//! let mut core = CpuCore::new();
//! let mut bus = SimpleBus::with_ram_size(2 * 1024 * 1024);
//! let cache = Rc::new(RefCell::new(BlockCache::new(0x1000, 512, Box::new(NullEmitter))));
//! let dispatcher = Dispatcher::new(cache, &mut bus);
//! let mut interpreter = NullInterpreter;
//!
//! core.downcount = 0;
//! dispatcher.run(&mut core, &mut bus, &mut interpreter);
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`], an alias for
//! `Result<T, EmulatorError>`. Empty block decodes and emitter declines are
//! ordinary control flow, not errors.

pub mod core;

pub use core::error::{EmulatorError, Result};
