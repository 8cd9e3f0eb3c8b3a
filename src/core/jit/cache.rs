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

//! The block cache: sole owner of compiled blocks, the page-indexed reverse
//! map used for self-modifying-code invalidation, and the bookkeeping that
//! lets a block be flushed safely while it is still executing.

use std::collections::HashMap;

use crate::core::memory::Bus;

use super::block::{CodeBlock, CodeBlockKey, ExecutableBlock};
use super::decoder;
use super::emitter::Emitter;

/// Compiled-block store plus the reverse page map and self-flush tracking
/// that back self-modifying-code invalidation.
///
/// `m_blocks`/`m_ram_block_map` naming in the original dynarec this is
/// modeled on; `current_block`/`current_block_flushed` mirror its
/// mid-execution self-flush bookkeeping exactly: when a block currently
/// being executed is flushed (typically because executing it writes to its
/// own page), the cache cannot drop it out from under the dispatcher, so it
/// only raises a flag the dispatcher checks after the block finishes.
pub struct BlockCache {
    blocks: HashMap<u32, CodeBlock>,
    ram_block_map: Vec<Vec<u32>>,
    page_size: u32,
    current_block: Option<CodeBlockKey>,
    current_block_flushed: bool,
    emitter: Box<dyn Emitter>,
    trace_compilation: bool,
}

impl BlockCache {
    pub fn new(page_size: u32, page_count: usize, emitter: Box<dyn Emitter>) -> Self {
        Self {
            blocks: HashMap::new(),
            ram_block_map: vec![Vec::new(); page_count],
            page_size,
            current_block: None,
            current_block_flushed: false,
            emitter,
            trace_compilation: false,
        }
    }

    pub fn set_trace_compilation(&mut self, trace: bool) {
        self.trace_compilation = trace;
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of back-references registered on `page_index`, for invariant
    /// checks (I1/P1). Out-of-range pages report zero.
    pub fn page_block_count(&self, page_index: usize) -> usize {
        self.ram_block_map
            .get(page_index)
            .map_or(0, |blocks| blocks.len())
    }

    /// Fetch the block at `pc` (compiling and inserting it on a miss) and
    /// hand back an owned, execution-ready snapshot of it.
    pub fn get_or_compile(
        &mut self,
        bus: &mut dyn Bus,
        pc: u32,
        user_mode: bool,
    ) -> ExecutableBlock {
        let phys_pc = bus.unmirror(pc);
        let key = CodeBlockKey::new(phys_pc, user_mode);

        if let Some(block) = self.blocks.get(&key.bits()) {
            return ExecutableBlock::from(block);
        }

        let mut block = decoder::compile_block(bus, key);
        if block.instructions.is_empty() {
            log::warn!("empty block compiled at 0x{:08X}", key.pc());
            return ExecutableBlock::from(&block);
        }

        block.native_code = self.emitter.emit(&block.instructions);
        if self.trace_compilation {
            log::debug!(
                "compiled block at 0x{:08X} ({} instructions, native={})",
                key.pc(),
                block.instructions.len(),
                block.native_code.is_some()
            );
        }

        if bus.is_ram(phys_pc) {
            let start = block.start_page_index(self.page_size);
            let end = block.end_page_index(self.page_size);
            for page in start..=end {
                if page < self.ram_block_map.len() {
                    self.ram_block_map[page].push(key.bits());
                    bus.set_code_page((page as u32) * self.page_size);
                }
            }
        }

        let executable = ExecutableBlock::from(&block);
        self.blocks.insert(key.bits(), block);
        executable
    }

    /// Record which block the dispatcher is about to execute, so a flush
    /// triggered from inside that execution can be deferred instead of
    /// dropping the block out from under it.
    pub fn set_current_block(&mut self, key: CodeBlockKey) {
        self.current_block = Some(key);
        self.current_block_flushed = false;
    }

    /// Whether the block marked via [`Self::set_current_block`] was flushed
    /// while it was executing. The dispatcher checks this after finishing a
    /// block and must re-fetch rather than trust any cached pointer to it.
    pub fn take_current_block_flushed(&mut self) -> bool {
        std::mem::replace(&mut self.current_block_flushed, false)
    }

    /// Flush every block whose range covers `page_index`, newest first, as
    /// triggered by a guest store landing on a page flagged as holding code.
    pub fn flush_page(&mut self, page_index: usize) {
        if page_index >= self.ram_block_map.len() {
            return;
        }
        while let Some(key_bits) = self.ram_block_map[page_index].pop() {
            self.flush_block_by_bits(key_bits);
        }
    }

    /// Flush a single block by key, removing its page-map back-pointers.
    pub fn flush_block(&mut self, key: CodeBlockKey) {
        self.flush_block_by_bits(key.bits());
    }

    fn flush_block_by_bits(&mut self, key_bits: u32) {
        let Some(block) = self.blocks.remove(&key_bits) else {
            return;
        };
        let start = block.start_page_index(self.page_size);
        let end = block.end_page_index(self.page_size);
        for page in start..=end {
            if let Some(page_blocks) = self.ram_block_map.get_mut(page) {
                page_blocks.retain(|&bits| bits != key_bits);
            }
        }
        if self.current_block == Some(block.key) {
            self.current_block_flushed = true;
        }
    }

    /// Drop every compiled block and clear the page map, e.g. on a cold
    /// reset or a BIOS/disc swap.
    pub fn reset(&mut self, bus: &mut dyn Bus) {
        bus.clear_code_page_flags();
        for page_blocks in self.ram_block_map.iter_mut() {
            page_blocks.clear();
        }
        self.blocks.clear();
        self.current_block = None;
        self.current_block_flushed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::jit::emitter::NullEmitter;
    use crate::core::memory::SimpleBus;

    fn encode_i(op: u32, rs: u32, rt: u32, imm: u32) -> u32 {
        (op << 26) | (rs << 21) | (rt << 16) | (imm & 0xFFFF)
    }

    const OP_ADDIU: u32 = 0x09;
    const FUNCT_SYSCALL: u32 = 0x0C;

    fn syscall_word() -> u32 {
        FUNCT_SYSCALL
    }

    fn program(bus: &mut SimpleBus) {
        bus.write_ram_slice(0, &encode_i(OP_ADDIU, 0, 1, 5).to_le_bytes())
            .unwrap();
        bus.write_ram_slice(4, &syscall_word().to_le_bytes())
            .unwrap();
    }

    #[test]
    fn second_lookup_at_same_pc_hits_cache_without_recompiling() {
        let mut bus = SimpleBus::with_ram_size(0x2000);
        program(&mut bus);
        let mut cache = BlockCache::new(0x1000, 2, Box::new(NullEmitter));

        let first = cache.get_or_compile(&mut bus, 0x8000_0000, false);
        assert_eq!(cache.block_count(), 1);
        let second = cache.get_or_compile(&mut bus, 0x8000_0000, false);
        assert_eq!(cache.block_count(), 1);
        assert_eq!(first.instructions.len(), second.instructions.len());
    }

    #[test]
    fn flush_page_evicts_every_block_touching_it() {
        let mut bus = SimpleBus::with_ram_size(0x2000);
        program(&mut bus);
        let mut cache = BlockCache::new(0x1000, 2, Box::new(NullEmitter));
        cache.get_or_compile(&mut bus, 0x8000_0000, false);
        assert_eq!(cache.block_count(), 1);

        cache.flush_page(0);
        assert_eq!(cache.block_count(), 0);

        // Recompiling after the flush should work and reinsert.
        cache.get_or_compile(&mut bus, 0x8000_0000, false);
        assert_eq!(cache.block_count(), 1);
    }

    #[test]
    fn flushing_the_currently_executing_block_only_sets_a_flag() {
        let mut bus = SimpleBus::with_ram_size(0x2000);
        program(&mut bus);
        let mut cache = BlockCache::new(0x1000, 2, Box::new(NullEmitter));
        let block = cache.get_or_compile(&mut bus, 0x8000_0000, false);
        cache.set_current_block(block.key);

        cache.flush_page(0);
        assert!(cache.take_current_block_flushed());
        // The flag self-clears once read.
        assert!(!cache.take_current_block_flushed());
    }

    #[test]
    fn empty_decode_is_not_inserted_into_the_cache() {
        let mut bus = SimpleBus::with_ram_size(0x1000);
        let mut cache = BlockCache::new(0x1000, 1, Box::new(NullEmitter));
        let block = cache.get_or_compile(&mut bus, 0x7000_0000, false);
        assert!(block.instructions.is_empty());
        assert_eq!(cache.block_count(), 0);
    }

    #[test]
    fn reset_clears_blocks_and_page_map() {
        let mut bus = SimpleBus::with_ram_size(0x2000);
        program(&mut bus);
        let mut cache = BlockCache::new(0x1000, 2, Box::new(NullEmitter));
        cache.get_or_compile(&mut bus, 0x8000_0000, false);
        assert_eq!(cache.block_count(), 1);

        cache.reset(&mut bus);
        assert_eq!(cache.block_count(), 0);
        cache.flush_page(0); // must not panic on an empty map
    }
}
