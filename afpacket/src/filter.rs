//! Classic BPF programs for `SO_ATTACH_FILTER`.
//!
//! Only the handful of instructions needed to select frames by a header field
//! are supported: absolute loads, jump-if-equal against a constant, and return.

use std::fmt;
use thiserror::Error;

// Instruction classes
const BPF_LD: u16 = 0x00;
const BPF_JMP: u16 = 0x05;
const BPF_RET: u16 = 0x06;

// LD sizes
const BPF_W: u16 = 0x00;
const BPF_H: u16 = 0x08;
const BPF_B: u16 = 0x10;

// LD modes
const BPF_ABS: u16 = 0x20;

// JMP operations
const BPF_JEQ: u16 = 0x10;

// Operand source
const BPF_K: u16 = 0x00;

/// Snap length handed back by the accept verdict of [`FilterProgram::arp`].
pub const ARP_SNAP_LEN: u32 = 0x0004_0000;

/// Returned by [`FilterProgram::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unsupported BPF opcode {code:#06x}")]
    InvalidTerm { code: u16 },
}

/// The instructions a [`FilterProgram`] may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `ld [k]`: load the 32 bit word at absolute offset `k`.
    LoadWord,
    /// `ldh [k]`: load the 16 bit half-word at absolute offset `k`.
    LoadHalf,
    /// `ldb [k]`: load the byte at absolute offset `k`.
    LoadByte,
    /// `jeq #k, jt, jf`
    JumpEqual,
    /// `ret #k`
    Return,
}

impl Opcode {
    pub fn code(self) -> u16 {
        match self {
            Opcode::LoadWord => BPF_LD | BPF_W | BPF_ABS,
            Opcode::LoadHalf => BPF_LD | BPF_H | BPF_ABS,
            Opcode::LoadByte => BPF_LD | BPF_B | BPF_ABS,
            Opcode::JumpEqual => BPF_JMP | BPF_JEQ | BPF_K,
            Opcode::Return => BPF_RET | BPF_K,
        }
    }

    pub fn from_code(code: u16) -> Option<Opcode> {
        [
            Opcode::LoadWord,
            Opcode::LoadHalf,
            Opcode::LoadByte,
            Opcode::JumpEqual,
            Opcode::Return,
        ]
        .iter()
        .copied()
        .find(|op| op.code() == code)
    }
}

/// One instruction, laid out exactly like the kernel's `struct sock_filter`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterTerm {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

const _: () = assert!(std::mem::size_of::<FilterTerm>() == 8);

impl FilterTerm {
    pub fn new(op: Opcode, jt: u8, jf: u8, k: u32) -> Self {
        FilterTerm {
            code: op.code(),
            jt,
            jf,
            k,
        }
    }
}

impl fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ {:#x}, {}, {}, {:#010x} }}",
            self.code, self.jt, self.jf, self.k
        )
    }
}

/// An ordered list of [`FilterTerm`]s. Jump offsets are relative to the position of the
/// instruction that follows the jump, so order matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterProgram {
    terms: Vec<FilterTerm>,
}

impl FilterProgram {
    pub fn new() -> Self {
        FilterProgram { terms: Vec::new() }
    }

    /// Selects Ethernet II frames whose EtherType is ARP. Same program as
    /// `tcpdump -dd arp`:
    ///
    /// ```text
    ///   [0] ldh [12]
    ///   [1] jeq #0x0806  jt=0 jf=1
    ///   [2] ret #0x40000
    ///   [3] ret #0
    /// ```
    pub fn arp() -> Self {
        FilterProgram {
            terms: vec![
                FilterTerm::new(Opcode::LoadHalf, 0, 0, 12),
                FilterTerm::new(Opcode::JumpEqual, 0, 1, 0x0806),
                FilterTerm::new(Opcode::Return, 0, 0, ARP_SNAP_LEN),
                FilterTerm::new(Opcode::Return, 0, 0, 0),
            ],
        }
    }

    pub fn append(&mut self, term: FilterTerm) -> Result<(), FilterError> {
        if Opcode::from_code(term.code).is_none() {
            return Err(FilterError::InvalidTerm { code: term.code });
        }
        self.terms.push(term);
        Ok(())
    }

    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Runs the program over `frame` the way the kernel would and returns the verdict:
    /// 0 drops the frame, anything else is the number of bytes to deliver.
    pub fn accepts(&self, frame: &[u8]) -> u32 {
        let mut acc: u32 = 0;
        let mut pc = 0usize;

        while let Some(term) = self.terms.get(pc) {
            let k = term.k as usize;
            match Opcode::from_code(term.code) {
                Some(Opcode::LoadWord) => match frame.get(k..k + 4) {
                    Some(b) => acc = u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
                    None => return 0,
                },
                Some(Opcode::LoadHalf) => match frame.get(k..k + 2) {
                    Some(b) => acc = u32::from(u16::from_be_bytes([b[0], b[1]])),
                    None => return 0,
                },
                Some(Opcode::LoadByte) => match frame.get(k) {
                    Some(b) => acc = u32::from(*b),
                    None => return 0,
                },
                Some(Opcode::JumpEqual) => {
                    let offset = if acc == term.k { term.jt } else { term.jf };
                    pc += offset as usize;
                }
                Some(Opcode::Return) => return term.k,
                None => return 0,
            }
            pc += 1;
        }

        // Falling off the end is rejected by the kernel verifier; treat it as a drop.
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_ether_type(ether_type: u16) -> Vec<u8> {
        let mut frame = vec![0xff; 12];
        frame.extend_from_slice(&ether_type.to_be_bytes());
        frame.resize(42, 0);
        frame
    }

    #[test]
    fn arp_program_literals() {
        let program = FilterProgram::arp();
        assert_eq!(program.len(), 4);
        assert_eq!(
            program.terms(),
            &[
                FilterTerm { code: 0x28, jt: 0, jf: 0, k: 0x0000_000c },
                FilterTerm { code: 0x15, jt: 0, jf: 1, k: 0x0000_0806 },
                FilterTerm { code: 0x06, jt: 0, jf: 0, k: 0x0004_0000 },
                FilterTerm { code: 0x06, jt: 0, jf: 0, k: 0x0000_0000 },
            ]
        );
    }

    #[test]
    fn term_display_matches_tcpdump_dd() {
        let rendered: Vec<String> = FilterProgram::arp()
            .terms()
            .iter()
            .map(|term| term.to_string())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "{ 0x28, 0, 0, 0x0000000c }",
                "{ 0x15, 0, 1, 0x00000806 }",
                "{ 0x6, 0, 0, 0x00040000 }",
                "{ 0x6, 0, 0, 0x00000000 }",
            ]
        );
    }

    #[test]
    fn append_builds_same_program() {
        let mut program = FilterProgram::new();
        assert!(program.is_empty());
        for term in FilterProgram::arp().terms() {
            program.append(*term).unwrap();
        }
        assert_eq!(program, FilterProgram::arp());
    }

    #[test]
    fn append_rejects_unknown_opcode() {
        let mut program = FilterProgram::new();
        // ldx 4*([14]&0xf) is valid BPF but outside the supported set
        let msh = FilterTerm { code: 0xb1, jt: 0, jf: 0, k: 14 };
        assert_eq!(
            program.append(msh),
            Err(FilterError::InvalidTerm { code: 0xb1 })
        );
        assert!(program.is_empty());
    }

    #[test]
    fn opcode_codes() {
        assert_eq!(Opcode::LoadWord.code(), 0x20);
        assert_eq!(Opcode::LoadHalf.code(), 0x28);
        assert_eq!(Opcode::LoadByte.code(), 0x30);
        assert_eq!(Opcode::JumpEqual.code(), 0x15);
        assert_eq!(Opcode::Return.code(), 0x06);
        assert_eq!(Opcode::from_code(0x15), Some(Opcode::JumpEqual));
        assert_eq!(Opcode::from_code(0x07), None);
    }

    #[test]
    fn arp_program_selects_arp() {
        let program = FilterProgram::arp();
        assert_eq!(program.accepts(&frame_with_ether_type(0x0806)), ARP_SNAP_LEN);
        assert_eq!(program.accepts(&frame_with_ether_type(0x0800)), 0);
        assert_eq!(program.accepts(&frame_with_ether_type(0x86dd)), 0);
        assert_eq!(program.accepts(&[0u8; 13]), 0);
    }

    #[test]
    fn empty_program_drops() {
        assert_eq!(FilterProgram::new().accepts(&frame_with_ether_type(0x0806)), 0);
    }

    #[test]
    fn load_word_and_byte() {
        let mut program = FilterProgram::new();
        program.append(FilterTerm::new(Opcode::LoadWord, 0, 0, 0)).unwrap();
        program.append(FilterTerm::new(Opcode::JumpEqual, 0, 3, 0xffff_ffff)).unwrap();
        program.append(FilterTerm::new(Opcode::LoadByte, 0, 0, 13)).unwrap();
        program.append(FilterTerm::new(Opcode::JumpEqual, 0, 1, 0x06)).unwrap();
        program.append(FilterTerm::new(Opcode::Return, 0, 0, 64)).unwrap();
        program.append(FilterTerm::new(Opcode::Return, 0, 0, 0)).unwrap();

        assert_eq!(program.accepts(&frame_with_ether_type(0x0806)), 64);
        assert_eq!(program.accepts(&frame_with_ether_type(0x0800)), 0);
    }
}
