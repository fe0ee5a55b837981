use riscv_rs::disasm::fmt_instruction;
use riscv_rs::DecoderRegistry;

#[test]
fn disasm_basic_forms() {
    let reg = DecoderRegistry::rv64i();
    let cases = [
        (0x00A58633u32, "add x12, x11, x10"),
        (0x3E800093, "addi x1, x0, 1000"),
        (0xFFC62883, "lw x17, -4(x12)"),
        (0x00112023, "sw x1, 0(x2)"),
        (0x00000073, "ecall"),
        (0x00100073, "ebreak"),
        (0x00000007, "illegal"), // undefined opcode
    ];
    for (raw, expected) in cases {
        assert_eq!(fmt_instruction(&reg.decode(raw)), expected, "word {raw:#010x}");
    }
}

#[test]
fn disasm_branches_and_jumps_show_signed_offsets() {
    let reg = DecoderRegistry::rv32i();
    // beq x1, x2, -4: imm[12|10:5]=1111111 -> 0xFE, imm[4:1|11]=1110|1
    let beq = 0xFE208EE3u32;
    assert_eq!(fmt_instruction(&reg.decode(beq)), "beq x1, x2, -4");
    // jal x1, +8
    let jal = 0x008000EFu32;
    assert_eq!(fmt_instruction(&reg.decode(jal)), "jal x1, +8");
}

#[test]
fn disasm_upper_immediates_and_fence() {
    let reg = DecoderRegistry::rv32i();
    let lui = 0x12345437u32; // lui x8, 0x12345
    assert_eq!(fmt_instruction(&reg.decode(lui)), "lui x8, 0x12345");
    let fence_rw_w = (0b0011u32 << 24) | (0b0001 << 20) | 0b0001111;
    assert_eq!(fmt_instruction(&reg.decode(fence_rw_w)), "fence rw, w");
}
