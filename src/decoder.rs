use tracing::trace;

use crate::format::{classify, opcode, InstructionFormat};
use crate::instructions::Instruction;

/// Decode rules for one instruction-set extension.
///
/// The registry calls the method matching the word's format; an extension
/// returns `None` to decline a word it does not recognize (an expected
/// outcome, not an error). Implementations are stateless and must be safe to
/// call concurrently, hence `Send + Sync`. Formats an extension does not
/// cover keep the default body, which declines everything.
pub trait IsaExtension: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode_r(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let _ = (raw, opcode);
        None
    }
    fn decode_i(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let _ = (raw, opcode);
        None
    }
    fn decode_s(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let _ = (raw, opcode);
        None
    }
    fn decode_b(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let _ = (raw, opcode);
        None
    }
    fn decode_u(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let _ = (raw, opcode);
        None
    }
    fn decode_j(&self, raw: u32, opcode: u8) -> Option<Instruction> {
        let _ = (raw, opcode);
        None
    }
}

/// Raised by [`DecoderRegistry::decode_all`] when a byte stream does not
/// divide into whole instruction words. Individual words never fail to
/// decode; unrecognized ones come back as [`Instruction::Illegal`].
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("{0} trailing bytes at end of stream, words are 4 bytes")]
    TrailingBytes(usize),
}

/// An ordered set of extension decoders.
///
/// Registration order is priority: when two extensions would both claim a
/// word, the earlier-registered one wins. Register custom extensions ahead
/// of the base ISA only when shadowing its opcodes is intended. The list is
/// fixed after construction, so a shared registry can serve concurrent
/// `decode` calls without synchronization.
pub struct DecoderRegistry {
    extensions: Vec<Box<dyn IsaExtension>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self { extensions: Vec::new() }
    }

    /// Append `ext` behind everything already registered.
    pub fn with_extension(mut self, ext: impl IsaExtension + 'static) -> Self {
        self.extensions.push(Box::new(ext));
        self
    }

    /// Base integer ISA only.
    pub fn rv32i() -> Self {
        Self::new().with_extension(crate::isa::rv32i::Rv32I)
    }

    /// Base ISA plus the 64-bit widening extension. The base decoder is
    /// registered first, so it keeps claiming every encoding it knows; the
    /// widening decoder only picks up combinations the base declines.
    pub fn rv64i() -> Self {
        Self::rv32i().with_extension(crate::isa::rv64i::Rv64I)
    }

    /// Decode one instruction word. Total: every input yields a value, with
    /// [`Instruction::Illegal`] covering undefined opcodes and words every
    /// registered extension declines.
    pub fn decode(&self, raw: u32) -> Instruction {
        let op = opcode(raw);
        let format = classify(op);
        let claimed = match format {
            InstructionFormat::R => self.try_each(|ext| ext.decode_r(raw, op)),
            InstructionFormat::I => self.try_each(|ext| ext.decode_i(raw, op)),
            InstructionFormat::S => self.try_each(|ext| ext.decode_s(raw, op)),
            InstructionFormat::B => self.try_each(|ext| ext.decode_b(raw, op)),
            InstructionFormat::U => self.try_each(|ext| ext.decode_u(raw, op)),
            InstructionFormat::J => self.try_each(|ext| ext.decode_j(raw, op)),
            InstructionFormat::Undefined => None,
        };
        claimed.unwrap_or_else(|| {
            trace!("no extension claimed {raw:#010x} (format {format:?})");
            Instruction::Illegal
        })
    }

    /// Decode a little-endian byte stream of whole words, in order.
    pub fn decode_all(&self, bytes: &[u8]) -> Result<Vec<Instruction>, FetchError> {
        let rem = bytes.len() % 4;
        if rem != 0 {
            return Err(FetchError::TrailingBytes(rem));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|w| self.decode(u32::from_le_bytes([w[0], w[1], w[2], w[3]])))
            .collect())
    }

    fn try_each(
        &self,
        try_decode: impl Fn(&dyn IsaExtension) -> Option<Instruction>,
    ) -> Option<Instruction> {
        self.extensions.iter().find_map(|ext| try_decode(ext.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_decodes_everything_as_illegal() {
        let reg = DecoderRegistry::new();
        assert_eq!(reg.decode(0x00A58633), Instruction::Illegal);
        assert_eq!(reg.decode(0), Instruction::Illegal);
    }

    #[test]
    fn decode_all_rejects_ragged_streams() {
        let reg = DecoderRegistry::rv32i();
        assert!(reg.decode_all(&[0x33, 0x86]).is_err());
        let words = reg.decode_all(&0x00A58633u32.to_le_bytes()).unwrap();
        assert_eq!(words.len(), 1);
        assert!(words[0].is_valid());
    }
}
