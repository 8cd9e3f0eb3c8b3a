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

//! Per-instruction classification the decoder consults while walking a
//! basic block: does this instruction end the block, can it fault at
//! runtime, does it carry a load-delay hazard, and is its encoding one the
//! decoder should even admit.

#[inline(always)]
fn opcode(instr: u32) -> u32 {
    (instr >> 26) & 0x3F
}

#[inline(always)]
fn funct(instr: u32) -> u32 {
    instr & 0x3F
}

#[inline(always)]
fn rt(instr: u32) -> u32 {
    (instr >> 16) & 0x1F
}

const OP_SPECIAL: u32 = 0x00;
const OP_REGIMM: u32 = 0x01;
const OP_J: u32 = 0x02;
const OP_JAL: u32 = 0x03;
const OP_BEQ: u32 = 0x04;
const OP_BNE: u32 = 0x05;
const OP_BLEZ: u32 = 0x06;
const OP_BGTZ: u32 = 0x07;
const OP_ADDI: u32 = 0x08;
const OP_ADDIU: u32 = 0x09;
const OP_SLTI: u32 = 0x0A;
const OP_SLTIU: u32 = 0x0B;
const OP_ANDI: u32 = 0x0C;
const OP_ORI: u32 = 0x0D;
const OP_XORI: u32 = 0x0E;
const OP_LUI: u32 = 0x0F;
const OP_COP0: u32 = 0x10;
const OP_COP1: u32 = 0x11;
const OP_COP2: u32 = 0x12;
const OP_COP3: u32 = 0x13;
const OP_LB: u32 = 0x20;
const OP_LH: u32 = 0x21;
const OP_LWL: u32 = 0x22;
const OP_LW: u32 = 0x23;
const OP_LBU: u32 = 0x24;
const OP_LHU: u32 = 0x25;
const OP_LWR: u32 = 0x26;
const OP_SB: u32 = 0x28;
const OP_SH: u32 = 0x29;
const OP_SWL: u32 = 0x2A;
const OP_SW: u32 = 0x2B;
const OP_SWR: u32 = 0x2E;
const OP_LWC0: u32 = 0x30;
const OP_LWC1: u32 = 0x31;
const OP_LWC2: u32 = 0x32;
const OP_LWC3: u32 = 0x33;
const OP_SWC0: u32 = 0x38;
const OP_SWC1: u32 = 0x39;
const OP_SWC2: u32 = 0x3A;
const OP_SWC3: u32 = 0x3B;

const FUNCT_SLL: u32 = 0x00;
const FUNCT_SRL: u32 = 0x02;
const FUNCT_SRA: u32 = 0x03;
const FUNCT_SLLV: u32 = 0x04;
const FUNCT_SRLV: u32 = 0x06;
const FUNCT_SRAV: u32 = 0x07;
const FUNCT_JR: u32 = 0x08;
const FUNCT_JALR: u32 = 0x09;
const FUNCT_SYSCALL: u32 = 0x0C;
const FUNCT_BREAK: u32 = 0x0D;
const FUNCT_MFHI: u32 = 0x10;
const FUNCT_MTHI: u32 = 0x11;
const FUNCT_MFLO: u32 = 0x12;
const FUNCT_MTLO: u32 = 0x13;
const FUNCT_MULT: u32 = 0x18;
const FUNCT_MULTU: u32 = 0x19;
const FUNCT_DIV: u32 = 0x1A;
const FUNCT_DIVU: u32 = 0x1B;
const FUNCT_ADD: u32 = 0x20;
const FUNCT_ADDU: u32 = 0x21;
const FUNCT_SUB: u32 = 0x22;
const FUNCT_SUBU: u32 = 0x23;
const FUNCT_AND: u32 = 0x24;
const FUNCT_OR: u32 = 0x25;
const FUNCT_XOR: u32 = 0x26;
const FUNCT_NOR: u32 = 0x27;
const FUNCT_SLT: u32 = 0x2A;
const FUNCT_SLTU: u32 = 0x2B;

/// Whether `instr` ends a basic block, and if so, whether it does so through
/// a branch/jump-delay slot (`true`) or unconditionally/immediately (e.g.
/// `syscall`/`break`, `false`).
pub fn is_exit_block_instruction(instr: u32) -> (bool, bool) {
    match opcode(instr) {
        OP_J | OP_JAL | OP_REGIMM | OP_BEQ | OP_BNE | OP_BLEZ | OP_BGTZ => (true, true),
        OP_SPECIAL => match funct(instr) {
            FUNCT_JR | FUNCT_JALR => (true, true),
            FUNCT_SYSCALL | FUNCT_BREAK => (true, false),
            _ => (false, false),
        },
        _ => (false, false),
    }
}

/// Whether `instr` can raise a CPU exception at runtime. `user_mode` gates
/// the coprocessor-access instructions, which only trap (coprocessor
/// unusable) when executed outside kernel mode.
pub fn can_instruction_trap(instr: u32, user_mode: bool) -> bool {
    match opcode(instr) {
        OP_LUI | OP_ANDI | OP_ORI | OP_XORI | OP_ADDIU | OP_SLTI | OP_SLTIU | OP_J | OP_JAL
        | OP_BEQ | OP_BNE | OP_BGTZ | OP_BLEZ | OP_REGIMM => false,
        OP_COP1 | OP_COP3 | OP_LWC0 | OP_LWC1 | OP_LWC3 | OP_SWC0 | OP_SWC1 | OP_SWC3 => false,
        OP_COP0 | OP_COP2 | OP_LWC2 | OP_SWC2 => user_mode,
        OP_ADDI | OP_LB | OP_LH | OP_LW | OP_LBU | OP_LHU | OP_LWL | OP_LWR | OP_SB | OP_SH
        | OP_SW | OP_SWL | OP_SWR => true,
        OP_SPECIAL => match funct(instr) {
            FUNCT_SLL | FUNCT_SRL | FUNCT_SRA | FUNCT_SLLV | FUNCT_SRLV | FUNCT_SRAV
            | FUNCT_AND | FUNCT_OR | FUNCT_XOR | FUNCT_NOR | FUNCT_ADDU | FUNCT_SUBU
            | FUNCT_SLT | FUNCT_SLTU | FUNCT_MFHI | FUNCT_MTHI | FUNCT_MFLO | FUNCT_MTLO
            | FUNCT_MULT | FUNCT_MULTU | FUNCT_DIV | FUNCT_DIVU | FUNCT_JR | FUNCT_JALR => false,
            FUNCT_ADD | FUNCT_SUB | FUNCT_SYSCALL | FUNCT_BREAK => true,
            _ => true,
        },
        _ => true,
    }
}

/// Whether `instr` is a load whose destination register is only visible
/// after a one-instruction delay. `LWL`/`LWR` read-modify-write the
/// register and are not delaying.
pub fn is_load_delaying_instruction(instr: u32) -> bool {
    matches!(opcode(instr), OP_LB | OP_LH | OP_LW | OP_LBU | OP_LHU)
}

/// Whether the decoder should admit this encoding at all. The classifier
/// does not attempt full illegal-opcode detection (that is a runtime
/// reserved-instruction exception, not a block-compile-time concern), so
/// this always admits.
pub fn is_valid_encoding(_instr: u32) -> bool {
    true
}

/// Register destination a load-delaying instruction writes, for building
/// [`super::block::CodeBlockInstruction::is_load_delay_slot`] bookkeeping
/// in the instruction *after* a load.
pub fn load_delay_target(instr: u32) -> u8 {
    rt(instr) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_i(op: u32, rs: u32, rt_: u32, imm: u32) -> u32 {
        (op << 26) | (rs << 21) | (rt_ << 16) | (imm & 0xFFFF)
    }

    fn encode_r(rs: u32, rt_: u32, rd: u32, shamt: u32, funct_: u32) -> u32 {
        (rs << 21) | (rt_ << 16) | (rd << 11) | (shamt << 6) | funct_
    }

    fn encode_j(op: u32, target: u32) -> u32 {
        (op << 26) | (target & 0x03FF_FFFF)
    }

    #[test]
    fn exit_block_branches_and_jumps_carry_delay_slot() {
        assert_eq!(is_exit_block_instruction(encode_j(OP_J, 0)), (true, true));
        assert_eq!(is_exit_block_instruction(encode_j(OP_JAL, 0)), (true, true));
        assert_eq!(
            is_exit_block_instruction(encode_i(OP_BEQ, 0, 0, 0)),
            (true, true)
        );
        assert_eq!(
            is_exit_block_instruction(encode_i(OP_REGIMM, 0, 0, 0)),
            (true, true)
        );
        assert_eq!(
            is_exit_block_instruction(encode_r(0, 0, 0, 0, FUNCT_JR)),
            (true, true)
        );
    }

    #[test]
    fn exit_block_syscall_and_break_have_no_delay_slot() {
        assert_eq!(
            is_exit_block_instruction(encode_r(0, 0, 0, 0, FUNCT_SYSCALL)),
            (true, false)
        );
        assert_eq!(
            is_exit_block_instruction(encode_r(0, 0, 0, 0, FUNCT_BREAK)),
            (true, false)
        );
    }

    #[test]
    fn ordinary_alu_instruction_does_not_exit_block() {
        assert_eq!(
            is_exit_block_instruction(encode_r(1, 2, 3, 0, FUNCT_ADDU)),
            (false, false)
        );
    }

    #[test]
    fn immediate_alu_ops_cannot_trap() {
        for op in [OP_LUI, OP_ANDI, OP_ORI, OP_XORI, OP_ADDIU, OP_SLTI, OP_SLTIU] {
            assert!(!can_instruction_trap(encode_i(op, 0, 0, 0), false));
        }
    }

    #[test]
    fn memory_access_instructions_can_trap() {
        for op in [OP_ADDI, OP_LB, OP_LH, OP_LW, OP_LBU, OP_LHU, OP_LWL, OP_LWR, OP_SB, OP_SH, OP_SW, OP_SWL, OP_SWR] {
            assert!(can_instruction_trap(encode_i(op, 0, 0, 0), false));
        }
    }

    #[test]
    fn cop0_and_cop2_trap_only_in_user_mode() {
        let cop0_instr = encode_i(OP_COP0, 0, 0, 0);
        assert!(!can_instruction_trap(cop0_instr, false));
        assert!(can_instruction_trap(cop0_instr, true));

        let cop2_instr = encode_i(OP_COP2, 0, 0, 0);
        assert!(!can_instruction_trap(cop2_instr, false));
        assert!(can_instruction_trap(cop2_instr, true));
    }

    #[test]
    fn cop1_and_cop3_never_trap_regardless_of_mode() {
        assert!(!can_instruction_trap(encode_i(OP_COP1, 0, 0, 0), true));
        assert!(!can_instruction_trap(encode_i(OP_COP3, 0, 0, 0), true));
    }

    #[test]
    fn add_and_sub_can_trap_on_overflow_but_addu_subu_cannot() {
        assert!(can_instruction_trap(
            encode_r(1, 2, 3, 0, FUNCT_ADD),
            false
        ));
        assert!(can_instruction_trap(
            encode_r(1, 2, 3, 0, FUNCT_SUB),
            false
        ));
        assert!(!can_instruction_trap(
            encode_r(1, 2, 3, 0, FUNCT_ADDU),
            false
        ));
        assert!(!can_instruction_trap(
            encode_r(1, 2, 3, 0, FUNCT_SUBU),
            false
        ));
    }

    #[test]
    fn unlisted_special_funct_defaults_to_trapping() {
        assert!(can_instruction_trap(encode_r(0, 0, 0, 0, 0x3F), false));
    }

    #[test]
    fn only_narrow_loads_are_load_delaying() {
        for op in [OP_LB, OP_LH, OP_LW, OP_LBU, OP_LHU] {
            assert!(is_load_delaying_instruction(encode_i(op, 0, 0, 0)));
        }
        assert!(!is_load_delaying_instruction(encode_i(OP_LWL, 0, 0, 0)));
        assert!(!is_load_delaying_instruction(encode_i(OP_LWR, 0, 0, 0)));
        assert!(!is_load_delaying_instruction(encode_i(OP_SW, 0, 0, 0)));
    }

    #[test]
    fn all_encodings_are_admitted() {
        assert!(is_valid_encoding(0xFFFF_FFFF));
        assert!(is_valid_encoding(0));
    }

    #[test]
    fn load_delay_target_reads_rt_field() {
        assert_eq!(load_delay_target(encode_i(OP_LW, 4, 17, 0)), 17);
    }
}
