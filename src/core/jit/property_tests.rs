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

//! Property-based tests over randomly generated straight-line basic blocks:
//! page-map/block-map consistency, decode-sequence consistency, and
//! write-invalidate behavior.

#![cfg(test)]

use proptest::prelude::*;

use super::cache::BlockCache;
use super::classify;
use super::emitter::NullEmitter;
use crate::core::memory::{Bus, SimpleBus};

const OP_ADDIU: u32 = 0x09;
const OP_ORI: u32 = 0x0D;
const FUNCT_SYSCALL: u32 = 0x0C;

fn encode_i(op: u32, rs: u32, rt: u32, imm: u32) -> u32 {
    (op << 26) | (rs << 21) | (rt << 16) | (imm & 0xFFFF)
}

fn syscall() -> u32 {
    FUNCT_SYSCALL
}

/// A non-branching, non-load-delaying ALU instruction, chosen so the
/// decoder never truncates early and `can_trap`/`is_load_delaying`
/// classification stays predictable for the consistency checks below.
fn alu_instruction(seed: u32) -> u32 {
    if seed % 2 == 0 {
        encode_i(OP_ADDIU, 1, 2, seed)
    } else {
        encode_i(OP_ORI, 1, 2, seed)
    }
}

fn ram_page_count() -> usize {
    4
}

fn ram_size() -> usize {
    ram_page_count() * 0x1000
}

fn write_program(bus: &mut SimpleBus, base: u32, body_len: usize, seed: u32) -> u32 {
    let mut pc = base;
    for i in 0..body_len {
        bus.write_ram_slice(pc as usize, &alu_instruction(seed.wrapping_add(i as u32)).to_le_bytes())
            .unwrap();
        pc += 4;
    }
    bus.write_ram_slice(pc as usize, &syscall().to_le_bytes())
        .unwrap();
    pc + 4
}

fn page_map_reference_count(cache: &BlockCache, page_count: usize) -> usize {
    (0..page_count)
        .map(|p| cache.page_block_count(p))
        .sum()
}

proptest! {
    /// P1: every page a block overlaps carries exactly one back-reference to
    /// it, and the total reference count equals the sum of each block's page
    /// span.
    #[test]
    fn p1_page_map_matches_block_spans(body_len in 0usize..20, seed in any::<u32>(), base_words in 0u32..1024) {
        let mut bus = SimpleBus::with_geometry(ram_size(), 0x1000);
        let base = base_words * 4;
        write_program(&mut bus, base, body_len, seed);

        let mut cache = BlockCache::new(0x1000, ram_page_count(), Box::new(NullEmitter));
        let block = cache.get_or_compile(&mut bus, base, false);
        prop_assume!(!block.instructions.is_empty());

        let start = (base / 0x1000) as usize;
        let span = block.instructions.len() as u32 * 4;
        let last_byte = base + span - 1;
        let end = (last_byte / 0x1000) as usize;

        for page in start..=end {
            prop_assert_eq!(cache.page_block_count(page), 1);
        }
        let total_span: usize = (start..=end).count();
        prop_assert_eq!(page_map_reference_count(&cache, ram_page_count()), total_span);
    }

    /// P2: decoded instructions are contiguous, and each instruction's
    /// load-delay flag matches whether the previous instruction was a
    /// narrow load.
    #[test]
    fn p2_decoded_sequence_is_internally_consistent(body_len in 0usize..20, seed in any::<u32>(), base_words in 0u32..1024) {
        let mut bus = SimpleBus::with_geometry(ram_size(), 0x1000);
        let base = base_words * 4;
        write_program(&mut bus, base, body_len, seed);

        let mut cache = BlockCache::new(0x1000, ram_page_count(), Box::new(NullEmitter));
        let block = cache.get_or_compile(&mut bus, base, false);
        prop_assume!(!block.instructions.is_empty());

        for (i, cbi) in block.instructions.iter().enumerate() {
            prop_assert_eq!(cbi.pc, base + 4 * i as u32);
            if i == 0 {
                prop_assert!(!cbi.is_load_delay_slot);
            } else {
                let prev = block.instructions[i - 1].instruction;
                prop_assert_eq!(cbi.is_load_delay_slot, classify::is_load_delaying_instruction(prev));
            }
        }
        let last = block.instructions.last().unwrap();
        let (is_exit, has_delay_slot) = classify::is_exit_block_instruction(last.instruction);
        prop_assert!(is_exit && !has_delay_slot || last.is_branch_delay_slot);
    }

    /// P3: a write through the bus to a flagged RAM page removes every
    /// block overlapping that page from the cache by the time the store
    /// returns.
    #[test]
    fn p3_write_invalidate_flushes_overlapping_blocks(body_len in 0usize..20, seed in any::<u32>()) {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut bus = SimpleBus::with_geometry(ram_size(), 0x1000);
        let base = 0u32;
        write_program(&mut bus, base, body_len, seed);

        let cache = Rc::new(RefCell::new(BlockCache::new(0x1000, ram_page_count(), Box::new(NullEmitter))));
        {
            let mut guard = cache.borrow_mut();
            let block = guard.get_or_compile(&mut bus, base, false);
            prop_assume!(!block.instructions.is_empty());
        }

        let flush_cache = cache.clone();
        bus.register_invalidate_callback(Box::new(move |page| {
            flush_cache.borrow_mut().flush_page(page);
        }));

        prop_assert!(cache.borrow().block_count() > 0);
        bus.store_word(base, 0).unwrap();
        prop_assert_eq!(cache.borrow().block_count(), 0);
        prop_assert_eq!(cache.borrow().page_block_count(0), 0);
    }

    /// P4: reset leaves the block map and page map empty.
    #[test]
    fn p4_reset_clears_all_state(body_len in 0usize..20, seed in any::<u32>()) {
        let mut bus = SimpleBus::with_geometry(ram_size(), 0x1000);
        let base = 0u32;
        write_program(&mut bus, base, body_len, seed);

        let mut cache = BlockCache::new(0x1000, ram_page_count(), Box::new(NullEmitter));
        cache.get_or_compile(&mut bus, base, false);

        cache.reset(&mut bus);
        prop_assert_eq!(cache.block_count(), 0);
        prop_assert_eq!(page_map_reference_count(&cache, ram_page_count()), 0);
    }
}
