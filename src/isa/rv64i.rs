use crate::decoder::IsaExtension;
use crate::format::{self, opcodes};
use crate::instructions::Instruction;

/// 64-bit widening extension (RV64I additions over the base set).
///
/// Covers OP-32 and OP-IMM-32, the doubleword memory accesses, and the
/// 6-bit-shamt shift-immediates. B, U and J carry nothing new in RV64I, so
/// those formats keep the trait's declining defaults.
pub struct Rv64I;

impl IsaExtension for Rv64I {
    fn name(&self) -> &'static str {
        "rv64i"
    }

    fn decode_r(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        if opcode != opcodes::OP_32 {
            return None;
        }
        let rd = format::rd(raw);
        let rs1 = format::rs1(raw);
        let rs2 = format::rs2(raw);
        match (format::funct3(raw), format::funct7(raw)) {
            (0b000, 0b0000000) => Some(Instruction::Addw { rd, rs1, rs2 }),
            (0b000, 0b0100000) => Some(Instruction::Subw { rd, rs1, rs2 }),
            (0b001, 0b0000000) => Some(Instruction::Sllw { rd, rs1, rs2 }),
            (0b101, 0b0000000) => Some(Instruction::Srlw { rd, rs1, rs2 }),
            (0b101, 0b0100000) => Some(Instruction::Sraw { rd, rs1, rs2 }),
            _ => None,
        }
    }

    fn decode_i(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let rd = format::rd(raw);
        let rs1 = format::rs1(raw);
        let imm = format::imm_i(raw);
        match opcode {
            opcodes::LOAD => match format::funct3(raw) {
                0b011 => Some(Instruction::Ld { rd, rs1, imm }),
                0b110 => Some(Instruction::Lwu { rd, rs1, imm }),
                _ => None,
            },
            opcodes::OP_IMM_32 => {
                let shamt = format::rs2(raw);
                match (format::funct3(raw), format::funct7(raw)) {
                    (0b000, _) => Some(Instruction::Addiw { rd, rs1, imm }),
                    (0b001, 0b0000000) => Some(Instruction::Slliw { rd, rs1, shamt }),
                    (0b101, 0b0000000) => Some(Instruction::Srliw { rd, rs1, shamt }),
                    (0b101, 0b0100000) => Some(Instruction::Sraiw { rd, rs1, shamt }),
                    _ => None,
                }
            }
            // 6-bit shamt forms: bits 31:26 select the operation, bit 25 is
            // shamt[5]. With the base decoder registered first this only
            // ever sees the bit-25-set encodings the base declines.
            opcodes::OP_IMM => {
                let shamt = ((raw >> 20) & 0x3F) as u8;
                match (format::funct3(raw), (raw >> 26) & 0x3F) {
                    (0b001, 0b000000) => Some(Instruction::Slli { rd, rs1, shamt }),
                    (0b101, 0b000000) => Some(Instruction::Srli { rd, rs1, shamt }),
                    (0b101, 0b010000) => Some(Instruction::Srai { rd, rs1, shamt }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn decode_s(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        if opcode != opcodes::STORE || format::funct3(raw) != 0b011 {
            return None;
        }
        Some(Instruction::Sd {
            rs1: format::rs1(raw),
            rs2: format::rs2(raw),
            imm: format::imm_s(raw),
        })
    }
}
