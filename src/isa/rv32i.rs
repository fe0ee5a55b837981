use crate::decoder::IsaExtension;
use crate::format::{self, opcodes};
use crate::instructions::{FenceSet, Instruction};

/// Base integer ISA decoder (RV32I plus Zifencei).
///
/// Claims only the encodings of the base set; anything else is declined so
/// a later-registered extension can pick it up. Shift-immediates are
/// accepted with 5-bit shamts only; the 6-bit forms belong to the 64-bit
/// decoder.
pub struct Rv32I;

impl IsaExtension for Rv32I {
    fn name(&self) -> &'static str {
        "rv32i"
    }

    fn decode_r(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        if opcode != opcodes::OP {
            return None;
        }
        let rd = format::rd(raw);
        let rs1 = format::rs1(raw);
        let rs2 = format::rs2(raw);
        let insn = match format::funct3(raw) {
            0b000 => match format::funct7(raw) {
                0b0000000 => Instruction::Add { rd, rs1, rs2 },
                0b0100000 => Instruction::Sub { rd, rs1, rs2 },
                _ => return None,
            },
            0b001 => Instruction::Sll { rd, rs1, rs2 },
            0b010 => Instruction::Slt { rd, rs1, rs2 },
            0b011 => Instruction::Sltu { rd, rs1, rs2 },
            0b100 => Instruction::Xor { rd, rs1, rs2 },
            0b101 => match format::funct7(raw) {
                0b0000000 => Instruction::Srl { rd, rs1, rs2 },
                0b0100000 => Instruction::Sra { rd, rs1, rs2 },
                _ => return None,
            },
            0b110 => Instruction::Or { rd, rs1, rs2 },
            0b111 => Instruction::And { rd, rs1, rs2 },
            _ => unreachable!("funct3 is 3 bits"),
        };
        Some(insn)
    }

    fn decode_i(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let rd = format::rd(raw);
        let rs1 = format::rs1(raw);
        let imm = format::imm_i(raw);
        match opcode {
            // funct3 is not inspected for JALR; only funct3=0 is
            // architecturally defined, and rejecting the rest is left to
            // downstream validation.
            opcodes::JALR => Some(Instruction::Jalr { rd, rs1, imm }),
            opcodes::LOAD => match format::funct3(raw) {
                0b000 => Some(Instruction::Lb { rd, rs1, imm }),
                0b001 => Some(Instruction::Lh { rd, rs1, imm }),
                0b010 => Some(Instruction::Lw { rd, rs1, imm }),
                0b100 => Some(Instruction::Lbu { rd, rs1, imm }),
                0b101 => Some(Instruction::Lhu { rd, rs1, imm }),
                _ => None,
            },
            opcodes::OP_IMM => {
                // shamt sits in the rs2 slot for the shift-immediates
                let shamt = format::rs2(raw);
                match format::funct3(raw) {
                    0b000 => Some(Instruction::Addi { rd, rs1, imm }),
                    0b001 => match format::funct7(raw) {
                        0b0000000 => Some(Instruction::Slli { rd, rs1, shamt }),
                        _ => None,
                    },
                    0b010 => Some(Instruction::Slti { rd, rs1, imm }),
                    0b011 => Some(Instruction::Sltiu { rd, rs1, imm }),
                    0b100 => Some(Instruction::Xori { rd, rs1, imm }),
                    0b101 => match format::funct7(raw) {
                        0b0000000 => Some(Instruction::Srli { rd, rs1, shamt }),
                        0b0100000 => Some(Instruction::Srai { rd, rs1, shamt }),
                        _ => None,
                    },
                    0b110 => Some(Instruction::Ori { rd, rs1, imm }),
                    0b111 => Some(Instruction::Andi { rd, rs1, imm }),
                    _ => unreachable!("funct3 is 3 bits"),
                }
            }
            opcodes::MISC_MEM => match format::funct3(raw) {
                0b000 => Some(Instruction::Fence {
                    rd,
                    rs1,
                    fm: ((raw >> 28) & 0xF) as u8,
                    pred: FenceSet::from_bits_truncate(((raw >> 24) & 0xF) as u8),
                    succ: FenceSet::from_bits_truncate(((raw >> 20) & 0xF) as u8),
                }),
                0b001 => Some(Instruction::FenceI { rd, rs1 }),
                _ => None,
            },
            // ECALL when the immediate field is zero, EBREAK otherwise.
            // Coarser than the architectural encoding, which pins one
            // constant per instruction; see DESIGN.md.
            opcodes::SYSTEM => {
                if (raw >> 20) & 0xFFF == 0 {
                    Some(Instruction::Ecall)
                } else {
                    Some(Instruction::Ebreak)
                }
            }
            _ => None,
        }
    }

    fn decode_s(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        if opcode != opcodes::STORE {
            return None;
        }
        let rs1 = format::rs1(raw);
        let rs2 = format::rs2(raw);
        let imm = format::imm_s(raw);
        match format::funct3(raw) {
            0b000 => Some(Instruction::Sb { rs1, rs2, imm }),
            0b001 => Some(Instruction::Sh { rs1, rs2, imm }),
            0b010 => Some(Instruction::Sw { rs1, rs2, imm }),
            _ => None,
        }
    }

    fn decode_b(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        if opcode != opcodes::BRANCH {
            return None;
        }
        let rs1 = format::rs1(raw);
        let rs2 = format::rs2(raw);
        let imm = format::imm_b(raw);
        match format::funct3(raw) {
            0b000 => Some(Instruction::Beq { rs1, rs2, imm }),
            0b001 => Some(Instruction::Bne { rs1, rs2, imm }),
            0b100 => Some(Instruction::Blt { rs1, rs2, imm }),
            0b101 => Some(Instruction::Bge { rs1, rs2, imm }),
            0b110 => Some(Instruction::Bltu { rs1, rs2, imm }),
            0b111 => Some(Instruction::Bgeu { rs1, rs2, imm }),
            _ => None,
        }
    }

    fn decode_u(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let rd = format::rd(raw);
        let imm = format::imm_u(raw);
        match opcode {
            opcodes::LUI => Some(Instruction::Lui { rd, imm }),
            opcodes::AUIPC => Some(Instruction::Auipc { rd, imm }),
            _ => None,
        }
    }

    fn decode_j(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        if opcode != opcodes::JAL {
            return None;
        }
        Some(Instruction::Jal { rd: format::rd(raw), imm: format::imm_j(raw) })
    }
}
