use riscv_rs::{DecoderRegistry, Instruction, IsaExtension};

/// Claims every R-format word, tagging its result with a fixed rd so tests
/// can tell which decoder won.
struct ClaimR(u8);

impl IsaExtension for ClaimR {
    fn name(&self) -> &'static str {
        "claim-r"
    }
    fn decode_r(&self, _raw: u32, _opcode: u8) -> Option<Instruction> {
        Some(Instruction::Add { rd: self.0, rs1: 0, rs2: 0 })
    }
}

#[test]
fn registration_order_is_priority() {
    let word = 0x00A58633; // R-format
    let ab = DecoderRegistry::new().with_extension(ClaimR(1)).with_extension(ClaimR(2));
    let ba = DecoderRegistry::new().with_extension(ClaimR(2)).with_extension(ClaimR(1));
    assert_eq!(ab.decode(word), Instruction::Add { rd: 1, rs1: 0, rs2: 0 });
    assert_eq!(ba.decode(word), Instruction::Add { rd: 2, rs1: 0, rs2: 0 });
}

#[test]
fn custom_extension_can_shadow_the_base_set() {
    let word = 0x00A58633;
    let shadowed = DecoderRegistry::new()
        .with_extension(ClaimR(31))
        .with_extension(riscv_rs::isa::rv32i::Rv32I);
    assert_eq!(shadowed.decode(word), Instruction::Add { rd: 31, rs1: 0, rs2: 0 });
    // registered the other way round, the base set wins
    let base_first = DecoderRegistry::new()
        .with_extension(riscv_rs::isa::rv32i::Rv32I)
        .with_extension(ClaimR(31));
    assert_eq!(base_first.decode(word), Instruction::Add { rd: 12, rs1: 11, rs2: 10 });
}

#[test]
fn undefined_opcode_is_illegal_regardless_of_upper_bits() {
    let reg = DecoderRegistry::rv64i();
    for upper in [0u32, 0xFFFF_FF80, 0x1234_5600, 0xDEAD_BE00] {
        assert_eq!(reg.decode(upper), Instruction::Illegal);
        // opcode 0b1111111 is unassigned too
        assert_eq!(reg.decode(upper | 0x7F), Instruction::Illegal);
    }
}

#[test]
fn illegal_decodes_are_reproducible() {
    let reg = DecoderRegistry::rv32i();
    let word = 0x0000_0707; // undefined opcode
    assert_eq!(reg.decode(word), reg.decode(word));
    assert!(!reg.decode(word).is_valid());
}

#[test]
fn decode_is_total_over_opcode_and_funct_space() {
    let reg = DecoderRegistry::rv64i();
    for op in 0u32..128 {
        for f3 in 0u32..8 {
            for f7 in [0u32, 0b0000001, 0b0100000, 0b0100001, 0b1111111] {
                let raw = (f7 << 25) | (9 << 20) | (10 << 15) | (f3 << 12) | (11 << 7) | op;
                let insn = reg.decode(raw);
                assert_eq!(insn.is_valid(), insn != Instruction::Illegal);
            }
        }
    }
}

#[test]
fn decode_is_total_over_sampled_words() {
    let reg = DecoderRegistry::rv64i();
    // Deterministic LCG sweep; decode must return a value for every word.
    let mut state = 0x2545_F491u32;
    for _ in 0..50_000 {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let insn = reg.decode(state);
        assert_eq!(insn.is_valid(), insn != Instruction::Illegal);
    }
}

#[test]
fn shared_registry_decodes_from_many_threads() {
    let reg = DecoderRegistry::rv64i();
    let expected = reg.decode(0x00A58633);
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..1000 {
                    assert_eq!(reg.decode(0x00A58633), expected);
                }
            });
        }
    });
}
