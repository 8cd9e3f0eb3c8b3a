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

//! MIPS R3000A architectural state.
//!
//! [`CpuCore`] owns the registers, program counter pair, COP0, and the
//! shadow "current/next instruction" bookkeeping that the dispatcher and
//! the semantic interpreter collaborate through (see
//! [`crate::core::jit::dispatcher`]). Full per-opcode semantics live behind
//! the [`interpreter::Interpreter`] trait; `CpuCore` itself only knows how
//! to hold state, detect pending interrupts, and enter an exception.

mod cop0;
mod decode;
pub mod interpreter;

pub use cop0::ExceptionCause;
use cop0::COP0;

use crate::core::memory::Bus;

/// PSX segment folding mask: collapses KUSEG/KSEG0/KSEG1 to physical space.
pub const PHYS_MASK: u32 = 0x1FFF_FFFF;

const RESET_VECTOR: u32 = 0xBFC0_0000;

/// Architectural state of the MIPS R3000A core.
///
/// `regs`/`pc`/`npc` are the committed state; the `current_instruction*`
/// and `next_instruction*` fields are a one-step lookahead/lookbehind shadow
/// that the cached and uncached interpretation loops populate before calling
/// into the semantic interpreter, so it can see branch- and load-delay-slot
/// context without the dispatcher threading extra parameters through every
/// call.
pub struct CpuCore {
    regs: [u32; 32],
    pub pc: u32,
    pub npc: u32,
    pub hi: u32,
    pub lo: u32,
    cop0: COP0,

    /// Signed tick budget; the dispatcher yields when this goes negative.
    pub downcount: i32,
    pub pending_ticks: u64,

    pub current_instruction: u32,
    pub current_instruction_pc: u32,
    pub current_instruction_in_branch_delay_slot: bool,
    pub current_instruction_was_branch_taken: bool,

    pub next_instruction: u32,
    pub next_instruction_pc: u32,
    pub next_instruction_is_branch_delay_slot: bool,

    pub branch_was_taken: bool,
    pub exception_raised: bool,

    pub load_delay_reg: Option<u8>,
    pub load_delay_old_value: u32,
    pub next_load_delay_reg: Option<u8>,
    pub next_load_delay_old_value: u32,
}

impl CpuCore {
    pub fn new() -> Self {
        let mut core = Self {
            regs: [0; 32],
            pc: RESET_VECTOR,
            npc: RESET_VECTOR.wrapping_add(4),
            hi: 0,
            lo: 0,
            cop0: COP0::new(),
            downcount: 0,
            pending_ticks: 0,
            current_instruction: 0,
            current_instruction_pc: 0,
            current_instruction_in_branch_delay_slot: false,
            current_instruction_was_branch_taken: false,
            next_instruction: 0,
            next_instruction_pc: 0,
            next_instruction_is_branch_delay_slot: false,
            branch_was_taken: false,
            exception_raised: false,
            load_delay_reg: None,
            load_delay_old_value: 0,
            next_load_delay_reg: None,
            next_load_delay_old_value: 0,
        };
        core.reset();
        core
    }

    pub fn reset(&mut self) {
        self.regs = [0; 32];
        self.pc = RESET_VECTOR;
        self.npc = RESET_VECTOR.wrapping_add(4);
        self.hi = 0;
        self.lo = 0;
        self.cop0.reset();
        self.downcount = 0;
        self.pending_ticks = 0;
        self.current_instruction = 0;
        self.current_instruction_pc = 0;
        self.current_instruction_in_branch_delay_slot = false;
        self.current_instruction_was_branch_taken = false;
        self.next_instruction = 0;
        self.next_instruction_pc = 0;
        self.next_instruction_is_branch_delay_slot = false;
        self.branch_was_taken = false;
        self.exception_raised = false;
        self.load_delay_reg = None;
        self.load_delay_old_value = 0;
        self.next_load_delay_reg = None;
        self.next_load_delay_old_value = 0;
    }

    /// Read a general-purpose register, honoring a pending load-delay hazard:
    /// if `index` is the register a load committed into last step, the value
    /// visible here is the *old* one, exactly for this one read window.
    pub fn reg(&self, index: u8) -> u32 {
        if index == 0 {
            return 0;
        }
        if self.load_delay_reg == Some(index) {
            self.load_delay_old_value
        } else {
            self.regs[index as usize]
        }
    }

    /// Write a general-purpose register with ordinary (non-delayed) semantics.
    /// `$zero` writes are discarded.
    pub fn set_reg(&mut self, index: u8, value: u32) {
        if index != 0 {
            self.regs[index as usize] = value;
        }
    }

    /// Write a register as the result of a load instruction: the new value
    /// commits to the register file immediately, but the instruction in the
    /// load-delay slot must still observe the old value, so the old value is
    /// latched into the one-slot `next_load_delay_*` pipeline for the
    /// dispatcher to promote after this instruction finishes.
    pub fn set_reg_load_delayed(&mut self, index: u8, value: u32) {
        if index == 0 {
            return;
        }
        let old_value = self.reg(index);
        self.regs[index as usize] = value;
        self.next_load_delay_reg = Some(index);
        self.next_load_delay_old_value = old_value;
    }

    /// Promote the one-slot load-delay pipeline. Called by the dispatcher
    /// after every instruction, cached or uncached.
    pub fn advance_load_delay(&mut self) {
        self.load_delay_reg = self.next_load_delay_reg.take();
        self.load_delay_old_value = self.next_load_delay_old_value;
        self.next_load_delay_old_value = 0;
    }

    pub fn cop0(&self) -> &COP0 {
        &self.cop0
    }

    pub fn cop0_mut(&mut self) -> &mut COP0 {
        &mut self.cop0
    }

    /// `KUc` (bit 1) of the status register selects user vs kernel mode.
    pub fn in_user_mode(&self) -> bool {
        self.cop0.regs[COP0::SR] & 0b10 != 0
    }

    /// Commit a branch/jump target: `npc` is redirected so the branch-delay
    /// slot instruction (already fetched with the old `npc`) still executes.
    pub fn set_branch_target(&mut self, target: u32) {
        self.npc = target;
        self.branch_was_taken = true;
    }

    /// Whether an enabled, unmasked interrupt is currently pending.
    pub fn has_pending_interrupt(&self, bus: &dyn Bus) -> bool {
        let sr = self.cop0.regs[COP0::SR];
        let interrupts_enabled = sr & 1 != 0;
        if !interrupts_enabled {
            return false;
        }
        let mask = (sr >> 8) & 0xFF;
        let pending = (self.cop0.regs[COP0::CAUSE] >> 8) & 0xFF;
        (mask & pending) != 0 && bus.has_interrupt_line_asserted()
    }

    /// Enter the interrupt handler. Thin wrapper so the dispatcher's outer
    /// loop reads naturally; the real work is exception dispatch.
    pub fn dispatch_interrupt(&mut self) {
        self.raise_exception(ExceptionCause::Interrupt);
    }

    /// Push the exception/interrupt state into COP0 and redirect control to
    /// the handler vector, mirroring the R3000A's hardware exception entry:
    /// the mode stack shifts left by two bits in SR, `EPC` captures the
    /// faulting instruction's address (adjusted back one instruction if it
    /// was in a branch-delay slot, with the BD bit in `CAUSE` set to match),
    /// and control transfers to the BEV-selected vector.
    pub fn raise_exception(&mut self, cause: ExceptionCause) {
        let sr = self.cop0.regs[COP0::SR];
        let mode = sr & 0x3F;
        let mut new_sr = (sr & !0x3F) | ((mode << 2) & 0x3F);
        new_sr &= !0b11;
        self.cop0.regs[COP0::SR] = new_sr;

        let cause_reg = self.cop0.regs[COP0::CAUSE];
        self.cop0.regs[COP0::CAUSE] = (cause_reg & !0x7C) | ((cause as u32) << 2);

        let epc = if self.current_instruction_in_branch_delay_slot {
            self.cop0.regs[COP0::CAUSE] |= 1 << 31;
            self.current_instruction_pc.wrapping_sub(4)
        } else {
            self.cop0.regs[COP0::CAUSE] &= !(1 << 31);
            self.current_instruction_pc
        };
        self.cop0.regs[COP0::EPC] = epc;

        let handler = if sr & (1 << 22) != 0 {
            0xBFC0_0180
        } else {
            0x8000_0080
        };
        log::debug!(
            "exception {:?} at pc=0x{:08X} epc=0x{:08X} -> handler=0x{:08X}",
            cause,
            self.current_instruction_pc,
            epc,
            handler
        );

        self.pc = handler;
        self.npc = handler.wrapping_add(4);
        self.exception_raised = true;
        self.next_instruction_is_branch_delay_slot = false;
        self.load_delay_reg = None;
        self.next_load_delay_reg = None;
    }

    /// Used only by uncached interpretation: fetch the instruction at `pc`
    /// into `next_instruction`, then advance `pc`/`npc`. Returns `false` on
    /// a bus fault, in which case the uncached loop stops without having
    /// executed anything for this step.
    pub fn fetch_instruction(&mut self, bus: &mut dyn Bus) -> bool {
        match bus.read_word(self.pc) {
            Ok(word) => {
                self.next_instruction = word;
                self.next_instruction_pc = self.pc;
                self.pc = self.npc;
                self.npc = self.npc.wrapping_add(4);
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for CpuCore {
    fn default() -> Self {
        Self::new()
    }
}
