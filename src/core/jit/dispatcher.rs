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

//! Outer fetch/dispatch loop: discover or compile the block at the current
//! PC and interpret it, falling back to uncached single-instruction
//! interpretation when a block could not be compiled at all.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::cpu::interpreter::Interpreter;
use crate::core::cpu::{CpuCore, ExceptionCause};
use crate::core::memory::Bus;

use super::block::ExecutableBlock;
use super::cache::BlockCache;
use super::classify;

/// Drives the block cache and the two interpretation fallbacks.
pub struct Dispatcher {
    cache: Rc<RefCell<BlockCache>>,
}

impl Dispatcher {
    /// Build a dispatcher around `cache`, wiring the bus's invalidate
    /// callback so a guest write to a code page flushes the blocks it
    /// covers. `cache` is `Rc<RefCell<_>>` because both the dispatcher and
    /// the callback closure captured by `bus` need a handle to it; this is
    /// single-threaded sharing, not a concurrency primitive.
    pub fn new(cache: Rc<RefCell<BlockCache>>, bus: &mut dyn Bus) -> Self {
        let callback_cache = cache.clone();
        bus.register_invalidate_callback(Box::new(move |page_index| {
            callback_cache.borrow_mut().flush_page(page_index);
        }));
        Self { cache }
    }

    pub fn cache(&self) -> &Rc<RefCell<BlockCache>> {
        &self.cache
    }

    /// Run until the core's downcount goes negative, dispatching one block
    /// (cached or, on a compile failure, a single uncached instruction) per
    /// iteration and checking for interrupts between blocks.
    pub fn run(&self, core: &mut CpuCore, bus: &mut dyn Bus, interpreter: &mut dyn Interpreter) {
        while core.downcount >= 0 {
            if core.has_pending_interrupt(bus) {
                core.dispatch_interrupt();
            }

            let pc = core.pc;
            let user_mode = core.in_user_mode();
            let block = self.cache.borrow_mut().get_or_compile(bus, pc, user_mode);

            if block.instructions.is_empty() {
                log::warn!("falling back to uncached interpreter at 0x{:08X}", pc);
                interpret_uncached_block(core, bus, interpreter);
                continue;
            }

            self.cache.borrow_mut().set_current_block(block.key);
            interpret_cached_block(core, bus, interpreter, &block);
            self.cache.borrow_mut().take_current_block_flushed();
        }
    }
}

/// Run a compiled block's instructions against `core`/`bus`. If the block
/// carries native code, that is invoked directly and the instruction-level
/// bookkeeping below is skipped entirely (the native path is responsible
/// for equivalent side effects).
pub fn interpret_cached_block(
    core: &mut CpuCore,
    bus: &mut dyn Bus,
    interpreter: &mut dyn Interpreter,
    block: &ExecutableBlock,
) {
    if let Some(native) = &block.native_code {
        native(core, bus);
        return;
    }

    for cbi in block.instructions.iter() {
        core.pending_ticks += 1;
        core.downcount -= 1;

        core.current_instruction = cbi.instruction;
        core.current_instruction_pc = cbi.pc;
        core.current_instruction_in_branch_delay_slot = cbi.is_branch_delay_slot;
        core.current_instruction_was_branch_taken = core.branch_was_taken;
        core.branch_was_taken = false;
        core.exception_raised = false;

        core.pc = core.npc;
        core.npc = core.npc.wrapping_add(4);

        interpreter.execute(core, bus);
        core.advance_load_delay();

        if core.exception_raised {
            break;
        }
    }
    core.next_instruction_is_branch_delay_slot = false;
}

/// Interpret one basic block's worth of instructions directly from the bus,
/// one at a time, with no compiled record kept afterward. Used when the
/// block at the current PC could not be decoded at all (e.g. the first
/// fetch faults).
pub fn interpret_uncached_block(
    core: &mut CpuCore,
    bus: &mut dyn Bus,
    interpreter: &mut dyn Interpreter,
) {
    // Prime the pipeline with the block's first instruction. A fault here
    // (fetching from entirely unmapped memory) is a genuine bus error, not
    // an empty-block condition, since the dispatcher only reaches this
    // fallback when nothing could be decoded at all: still charge a tick so
    // the caller's downcount makes forward progress, then let the exception
    // redirect control to the BIOS handler.
    if !core.fetch_instruction(bus) {
        core.current_instruction_pc = core.pc;
        core.pending_ticks += 1;
        core.downcount -= 1;
        core.raise_exception(ExceptionCause::BusErrorInstruction);
        return;
    }

    loop {
        core.pending_ticks += 1;
        core.downcount -= 1;

        core.current_instruction = core.next_instruction;
        core.current_instruction_pc = core.next_instruction_pc;
        core.current_instruction_in_branch_delay_slot = core.next_instruction_is_branch_delay_slot;
        core.current_instruction_was_branch_taken = false;
        core.next_instruction_is_branch_delay_slot = false;
        core.branch_was_taken = false;
        core.exception_raised = false;

        let (current_is_exit, has_delay_slot) =
            classify::is_exit_block_instruction(core.current_instruction);
        if current_is_exit && has_delay_slot {
            core.next_instruction_is_branch_delay_slot = true;
        }

        // Prefetch the instruction after this one for the next iteration.
        // If that prefetch faults, still execute the instruction already
        // shadowed here before stopping, so a charged tick always
        // corresponds to one instruction actually running.
        let fetched_next = core.fetch_instruction(bus);

        interpreter.execute(core, bus);
        core.advance_load_delay();

        let ends_here = core.exception_raised
            || core.current_instruction_in_branch_delay_slot
            || (current_is_exit && !has_delay_slot)
            || !fetched_next;

        if ends_here {
            break;
        }
    }
}
