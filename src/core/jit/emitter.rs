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

//! Seam for a host-code emitter. The emitter's own internals (instruction
//! selection, register allocation, the assembler) are out of scope here;
//! the cache only needs something it can ask "can you translate this
//! block?" and get back either native code or a polite decline.

use std::rc::Rc;

use crate::core::cpu::CpuCore;
use crate::core::memory::Bus;

use super::block::CodeBlockInstruction;

/// Translates a decoded instruction stream into native code, or declines.
pub trait Emitter {
    /// Attempt to emit native code for `instructions`. Returning `None`
    /// means the cache should fall back to the cached interpreter for this
    /// block; this is an ordinary, expected outcome, not a failure.
    fn emit(
        &mut self,
        instructions: &[CodeBlockInstruction],
    ) -> Option<Rc<dyn Fn(&mut CpuCore, &mut dyn Bus)>>;
}

/// An emitter that never translates anything. Every block falls back to
/// the cached interpreter; useful as the default until a real backend is
/// plugged in, and in tests that only care about cache/dispatcher behavior.
#[derive(Debug, Default)]
pub struct NullEmitter;

impl Emitter for NullEmitter {
    fn emit(
        &mut self,
        _instructions: &[CodeBlockInstruction],
    ) -> Option<Rc<dyn Fn(&mut CpuCore, &mut dyn Bus)>> {
        None
    }
}
