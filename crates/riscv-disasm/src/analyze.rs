use serde::Serialize;
use std::collections::{HashSet, VecDeque};

use riscv_rs::{DecoderRegistry, Instruction};

use crate::model::{is_mapped, read_u32, Image};

#[derive(Debug, Clone, Copy)]
pub enum EdgeKind {
    Fallthrough,
    Jump,
    CondBranch,
    Call,
}

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: u32,
    pub to: u32,
    pub kind: EdgeKind,
}

/// Worklist sweep over reachable code. Branch and jump targets come out of
/// the decoded pc-relative immediates; indirect jumps (JALR) terminate a
/// path since their targets are runtime values.
pub fn analyze_entries(
    img: &Image,
    reg: &DecoderRegistry,
    entries: &[u32],
    max_instr: usize,
) -> (HashSet<u32>, Vec<Edge>, HashSet<u32>) {
    let mut queue: VecDeque<u32> = VecDeque::new();
    let mut visited: HashSet<u32> = HashSet::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut rets: HashSet<u32> = HashSet::new();
    for &e in entries {
        if is_mapped(img, e) {
            queue.push_back(e);
        }
    }
    let mut steps = 0usize;
    while let Some(pc) = queue.pop_front() {
        if steps >= max_instr {
            break;
        }
        if !visited.insert(pc) {
            continue;
        }
        let Some(raw) = read_u32(img, pc) else { continue };
        let insn = reg.decode(raw);
        if !insn.is_valid() {
            continue;
        }
        steps += 1;
        let ft = pc.wrapping_add(4);
        match insn {
            Instruction::Jal { rd, imm } => {
                let tgt = pc.wrapping_add(imm as u32);
                // rd=x0 is a plain goto; anything else links a return address
                let kind = if rd == 0 { EdgeKind::Jump } else { EdgeKind::Call };
                edges.push(Edge { from: pc, to: tgt, kind });
                if is_mapped(img, tgt) && !visited.contains(&tgt) {
                    queue.push_back(tgt);
                }
                if rd != 0 && is_mapped(img, ft) {
                    edges.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
                    queue.push_back(ft);
                }
            }
            Instruction::Beq { imm, .. }
            | Instruction::Bne { imm, .. }
            | Instruction::Blt { imm, .. }
            | Instruction::Bge { imm, .. }
            | Instruction::Bltu { imm, .. }
            | Instruction::Bgeu { imm, .. } => {
                let tgt = pc.wrapping_add(imm as u32);
                edges.push(Edge { from: pc, to: tgt, kind: EdgeKind::CondBranch });
                if is_mapped(img, tgt) && !visited.contains(&tgt) {
                    queue.push_back(tgt);
                }
                if is_mapped(img, ft) && !visited.contains(&ft) {
                    edges.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
                    queue.push_back(ft);
                }
            }
            Instruction::Jalr { rd, rs1, .. } => {
                if rd == 0 && rs1 == 1 {
                    // jalr x0, 0(x1): function return
                    rets.insert(pc);
                } else if rd != 0 {
                    // indirect call; execution resumes after it
                    if is_mapped(img, ft) {
                        edges.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
                        queue.push_back(ft);
                    }
                }
                // rd=x0 with an unknown base is an indirect jump: path ends
            }
            _ => {
                if is_mapped(img, ft) && !visited.contains(&ft) {
                    edges.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
                    queue.push_back(ft);
                }
            }
        }
    }
    (visited, edges, rets)
}

#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeOut {
    pub from: u32,
    pub to: u32,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionOut {
    pub entry: u32,
    pub blocks: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report<Blk = Block> {
    pub entries: Vec<u32>,
    pub blocks: Vec<Blk>,
    pub edges: Vec<EdgeOut>,
    pub functions: Vec<FunctionOut>,
}
