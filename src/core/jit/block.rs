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

//! Block identity and the decoded record the cache stores per block.

use std::rc::Rc;

use crate::core::cpu::CpuCore;
use crate::core::memory::Bus;

/// Default RAM page size the block map indexes by (matches
/// [`crate::core::config::CacheConfig::page_size`]'s default).
pub const PAGE_SIZE: u32 = 0x1000;

/// One decoded instruction within a block, carrying the classification bits
/// the interpretation loops and decoder need without re-deriving them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlockInstruction {
    pub instruction: u32,
    pub pc: u32,
    pub is_branch_delay_slot: bool,
    pub is_load_delay_slot: bool,
    pub can_trap: bool,
}

/// Identity of a block: the aligned guest PC it starts at, plus the
/// privilege mode it was compiled under (kernel- and user-mode code at the
/// same address are different blocks, since `can_trap` classification for
/// coprocessor instructions depends on mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeBlockKey {
    bits: u32,
}

impl CodeBlockKey {
    /// Build a key from an already-unmirrored, word-aligned PC and the mode
    /// active at compile time.
    pub fn new(aligned_pc: u32, user_mode: bool) -> Self {
        let bits = (aligned_pc & !0x3) | (user_mode as u32);
        Self { bits }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn user_mode(&self) -> bool {
        self.bits & 1 != 0
    }

    /// Recover the guest PC this key addresses.
    pub fn pc(&self) -> u32 {
        self.bits & !0x3
    }
}

/// A compiled block: its identity, the decoded instruction stream, and
/// optionally a piece of emitted native code. `native_code` is `None` for
/// blocks the emitter declined to translate, which fall back to the cached
/// interpreter.
pub struct CodeBlock {
    pub key: CodeBlockKey,
    pub instructions: Vec<CodeBlockInstruction>,
    pub native_code: Option<Rc<dyn Fn(&mut CpuCore, &mut dyn Bus)>>,
}

impl CodeBlock {
    pub fn pc(&self) -> u32 {
        self.key.pc()
    }

    pub fn size_in_bytes(&self) -> u32 {
        self.instructions.len() as u32 * 4
    }

    pub fn start_page_index(&self, page_size: u32) -> usize {
        (self.pc() / page_size) as usize
    }

    /// Last page this block's bytes touch, inclusive, using ceiling
    /// division so a block ending mid-page still flags that page.
    pub fn end_page_index(&self, page_size: u32) -> usize {
        if self.instructions.is_empty() {
            return self.start_page_index(page_size);
        }
        let last_byte = self.pc() + self.size_in_bytes() - 1;
        (last_byte / page_size) as usize
    }
}

/// An owned snapshot of a [`CodeBlock`] returned from the cache to the
/// dispatcher. Decoupling execution from a borrow of the cache lets a block
/// keep running safely even if a concurrent bus write invalidates and
/// unlinks its backing `CodeBlock` mid-execution: the instruction stream is
/// cloned, and native code is shared via `Rc` rather than borrowed.
#[derive(Clone)]
pub struct ExecutableBlock {
    pub key: CodeBlockKey,
    pub instructions: Rc<[CodeBlockInstruction]>,
    pub native_code: Option<Rc<dyn Fn(&mut CpuCore, &mut dyn Bus)>>,
}

impl From<&CodeBlock> for ExecutableBlock {
    fn from(block: &CodeBlock) -> Self {
        Self {
            key: block.key,
            instructions: Rc::from(block.instructions.as_slice()),
            native_code: block.native_code.clone(),
        }
    }
}
