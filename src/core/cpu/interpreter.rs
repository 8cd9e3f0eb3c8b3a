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

//! Per-instruction semantic execution.
//!
//! The dispatcher drives control flow (fetch, delay slots, exceptions) but
//! does not itself know what `add` or `lw` do; it hands the already-shadowed
//! `current_instruction` to an [`Interpreter`] and reacts to the core state
//! the interpreter mutated (`branch_was_taken`, `exception_raised`, the
//! load-delay pipeline).

use super::cop0::{ExceptionCause, COP0};
use super::decode::{decode_i_type, decode_j_type, decode_r_type};
use super::CpuCore;
use crate::core::memory::Bus;

/// Executes the instruction currently shadowed in `core.current_instruction`
/// against `core`/`bus`, mutating register and control-flow state as a side
/// effect.
pub trait Interpreter {
    fn execute(&mut self, core: &mut CpuCore, bus: &mut dyn Bus);
}

/// An interpreter that fetches nothing and executes nothing beyond the
/// trivial program-counter bookkeeping already performed by the dispatcher.
/// Useful for exercising the dispatcher/cache/invalidation machinery in
/// isolation from instruction semantics.
#[derive(Debug, Default)]
pub struct NullInterpreter;

impl Interpreter for NullInterpreter {
    fn execute(&mut self, _core: &mut CpuCore, _bus: &mut dyn Bus) {}
}

const OP_SPECIAL: u8 = 0x00;
const OP_J: u8 = 0x02;
const OP_JAL: u8 = 0x03;
const OP_BEQ: u8 = 0x04;
const OP_BNE: u8 = 0x05;
const OP_BLEZ: u8 = 0x06;
const OP_BGTZ: u8 = 0x07;
const OP_ADDI: u8 = 0x08;
const OP_ADDIU: u8 = 0x09;
const OP_SLTI: u8 = 0x0A;
const OP_SLTIU: u8 = 0x0B;
const OP_ANDI: u8 = 0x0C;
const OP_ORI: u8 = 0x0D;
const OP_XORI: u8 = 0x0E;
const OP_LUI: u8 = 0x0F;
const OP_LW: u8 = 0x23;

const FUNCT_SLL: u8 = 0x00;
const FUNCT_SRL: u8 = 0x02;
const FUNCT_SRA: u8 = 0x03;
const FUNCT_JR: u8 = 0x08;
const FUNCT_JALR: u8 = 0x09;
const FUNCT_SYSCALL: u8 = 0x0C;
const FUNCT_BREAK: u8 = 0x0D;
const FUNCT_MFHI: u8 = 0x10;
const FUNCT_MTHI: u8 = 0x11;
const FUNCT_MFLO: u8 = 0x12;
const FUNCT_MTLO: u8 = 0x13;
const FUNCT_ADD: u8 = 0x20;
const FUNCT_ADDU: u8 = 0x21;
const FUNCT_SUB: u8 = 0x22;
const FUNCT_SUBU: u8 = 0x23;
const FUNCT_AND: u8 = 0x24;
const FUNCT_OR: u8 = 0x25;
const FUNCT_XOR: u8 = 0x26;
const FUNCT_NOR: u8 = 0x27;
const FUNCT_SLT: u8 = 0x2A;
const FUNCT_SLTU: u8 = 0x2B;

/// Minimal reference MIPS interpreter covering enough of the ISA to exercise
/// the dispatcher's delay-slot, exception, and load-delay bookkeeping against
/// real semantics: integer ALU ops, `lui`/immediate ALU ops, `lw`,
/// unconditional and conditional branches/jumps, and `syscall`/`break`.
///
/// This is not a complete R3000A implementation. Instructions this
/// interpreter does not recognize (stores, byte/halfword loads, multiply and
/// divide, coprocessor instructions) execute as a no-op; the bus adapter
/// this core depends on only exposes aligned word reads
/// ([`Bus::read_word`]), so byte/halfword loads and any store are out of
/// reach without inventing a wider bus contract than [`crate::core::memory::Bus`]
/// defines.
#[derive(Debug, Default)]
pub struct ReferenceInterpreter;

impl ReferenceInterpreter {
    fn execute_special(core: &mut CpuCore, instr: u32) {
        let (rs, rt, rd, shamt, funct) = decode_r_type(instr);
        match funct {
            FUNCT_SLL => core.set_reg(rd, core.reg(rt) << shamt),
            FUNCT_SRL => core.set_reg(rd, core.reg(rt) >> shamt),
            FUNCT_SRA => core.set_reg(rd, ((core.reg(rt) as i32) >> shamt) as u32),
            FUNCT_JR => core.set_branch_target(core.reg(rs)),
            FUNCT_JALR => {
                let target = core.reg(rs);
                let link = if rd == 0 { 31 } else { rd };
                core.set_reg(link, core.current_instruction_pc.wrapping_add(8));
                core.set_branch_target(target);
            }
            FUNCT_SYSCALL => core.raise_exception(ExceptionCause::Syscall),
            FUNCT_BREAK => core.raise_exception(ExceptionCause::Breakpoint),
            FUNCT_MFHI => core.set_reg(rd, core.hi),
            FUNCT_MTHI => core.hi = core.reg(rs),
            FUNCT_MFLO => core.set_reg(rd, core.lo),
            FUNCT_MTLO => core.lo = core.reg(rs),
            FUNCT_ADD => match (core.reg(rs) as i32).checked_add(core.reg(rt) as i32) {
                Some(sum) => core.set_reg(rd, sum as u32),
                None => core.raise_exception(ExceptionCause::Overflow),
            },
            FUNCT_ADDU => core.set_reg(rd, core.reg(rs).wrapping_add(core.reg(rt))),
            FUNCT_SUB => match (core.reg(rs) as i32).checked_sub(core.reg(rt) as i32) {
                Some(diff) => core.set_reg(rd, diff as u32),
                None => core.raise_exception(ExceptionCause::Overflow),
            },
            FUNCT_SUBU => core.set_reg(rd, core.reg(rs).wrapping_sub(core.reg(rt))),
            FUNCT_AND => core.set_reg(rd, core.reg(rs) & core.reg(rt)),
            FUNCT_OR => core.set_reg(rd, core.reg(rs) | core.reg(rt)),
            FUNCT_XOR => core.set_reg(rd, core.reg(rs) ^ core.reg(rt)),
            FUNCT_NOR => core.set_reg(rd, !(core.reg(rs) | core.reg(rt))),
            FUNCT_SLT => core.set_reg(rd, ((core.reg(rs) as i32) < (core.reg(rt) as i32)) as u32),
            FUNCT_SLTU => core.set_reg(rd, (core.reg(rs) < core.reg(rt)) as u32),
            _ => log::trace!("unimplemented SPECIAL funct 0x{:02X}", funct),
        }
    }

    fn execute_immediate(core: &mut CpuCore, bus: &mut dyn Bus, instr: u32) {
        let (op, rs, rt, imm) = decode_i_type(instr);
        let simm = imm as i16 as i32 as u32;
        match op {
            OP_ADDI => match (core.reg(rs) as i32).checked_add(imm as i16 as i32) {
                Some(sum) => core.set_reg(rt, sum as u32),
                None => core.raise_exception(ExceptionCause::Overflow),
            },
            OP_ADDIU => core.set_reg(rt, core.reg(rs).wrapping_add(simm)),
            OP_SLTI => core.set_reg(rt, ((core.reg(rs) as i32) < (imm as i16 as i32)) as u32),
            OP_SLTIU => core.set_reg(rt, (core.reg(rs) < simm) as u32),
            OP_ANDI => core.set_reg(rt, core.reg(rs) & imm as u32),
            OP_ORI => core.set_reg(rt, core.reg(rs) | imm as u32),
            OP_XORI => core.set_reg(rt, core.reg(rs) ^ imm as u32),
            OP_LUI => core.set_reg(rt, (imm as u32) << 16),
            OP_LW => {
                let address = core.reg(rs).wrapping_add(simm);
                match bus.read_word(address) {
                    Ok(value) => core.set_reg_load_delayed(rt, value),
                    Err(_) => core.raise_exception(ExceptionCause::AddressErrorLoad),
                }
            }
            OP_BEQ => {
                if core.reg(rs) == core.reg(rt) {
                    Self::branch(core, imm);
                }
            }
            OP_BNE => {
                if core.reg(rs) != core.reg(rt) {
                    Self::branch(core, imm);
                }
            }
            OP_BLEZ => {
                if (core.reg(rs) as i32) <= 0 {
                    Self::branch(core, imm);
                }
            }
            OP_BGTZ => {
                if (core.reg(rs) as i32) > 0 {
                    Self::branch(core, imm);
                }
            }
            _ => log::trace!("unimplemented opcode 0x{:02X}", op),
        }
    }

    /// Redirect `npc` to `current_instruction_pc + 4 + sign_extend(offset) * 4`,
    /// the standard MIPS PC-relative branch target (relative to the delay
    /// slot, not the branch itself).
    fn branch(core: &mut CpuCore, offset: u16) {
        let delta = (offset as i16 as i32) << 2;
        let target = core
            .current_instruction_pc
            .wrapping_add(4)
            .wrapping_add(delta as u32);
        core.set_branch_target(target);
    }
}

impl Interpreter for ReferenceInterpreter {
    fn execute(&mut self, core: &mut CpuCore, bus: &mut dyn Bus) {
        let instr = core.current_instruction;
        let op = (instr >> 26) as u8 & 0x3F;
        match op {
            OP_SPECIAL => Self::execute_special(core, instr),
            OP_J => {
                let (_, target) = decode_j_type(instr);
                let pc_segment = core.current_instruction_pc & 0xF000_0000;
                core.set_branch_target(pc_segment | (target << 2));
            }
            OP_JAL => {
                let (_, target) = decode_j_type(instr);
                let pc_segment = core.current_instruction_pc & 0xF000_0000;
                core.set_reg(31, core.current_instruction_pc.wrapping_add(8));
                core.set_branch_target(pc_segment | (target << 2));
            }
            _ => Self::execute_immediate(core, bus, instr),
        }
    }
}
