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

//! Basic-block discovery: walk guest code from a block's entry PC until an
//! exit-block instruction (and, for branches/jumps, its delay slot) has
//! been decoded.

use crate::core::memory::Bus;

use super::block::{CodeBlock, CodeBlockInstruction, CodeBlockKey};
use super::classify;

/// Decode a basic block starting at `key`'s PC. Always returns a
/// `CodeBlock`, possibly with an empty `instructions` vector if the very
/// first fetch faults; the caller (the cache) decides whether an empty
/// block is worth keeping.
pub fn compile_block(bus: &dyn Bus, key: CodeBlockKey) -> CodeBlock {
    let mut instructions = Vec::new();
    let mut pc = key.pc();
    let mut pending_branch_delay_slot = false;
    let mut pending_load_delay_slot = false;

    loop {
        if !bus.is_cacheable(pc) {
            break;
        }
        let instruction = match bus.read_word(pc) {
            Ok(word) => word,
            Err(_) => break,
        };
        if !classify::is_valid_encoding(instruction) {
            break;
        }

        let was_in_branch_delay_slot = pending_branch_delay_slot;
        let can_trap = classify::can_instruction_trap(instruction, key.user_mode());
        instructions.push(CodeBlockInstruction {
            instruction,
            pc,
            is_branch_delay_slot: was_in_branch_delay_slot,
            is_load_delay_slot: pending_load_delay_slot,
            can_trap,
        });

        pending_load_delay_slot = classify::is_load_delaying_instruction(instruction);
        pc = pc.wrapping_add(4);

        if was_in_branch_delay_slot {
            // The delay slot of an exit instruction always ends the block.
            break;
        }

        let (is_exit, has_delay_slot) = classify::is_exit_block_instruction(instruction);
        if is_exit {
            if has_delay_slot {
                pending_branch_delay_slot = true;
                continue;
            }
            break;
        }
    }

    CodeBlock {
        key,
        instructions,
        native_code: None,
    }
}
