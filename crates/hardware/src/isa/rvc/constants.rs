//! RVC quadrant and funct3 constants.
//!
//! Compressed instructions are grouped into three quadrants by their low two
//! bits; within a quadrant the top three bits select the operation.

/// Quadrant 0 (bits 1:0 = 00): stack-pointer-relative and register loads/stores.
pub const QUADRANT_0: u16 = 0b00;
/// Quadrant 1 (bits 1:0 = 01): immediate arithmetic and control flow.
pub const QUADRANT_1: u16 = 0b01;
/// Quadrant 2 (bits 1:0 = 10): shifts and stack-pointer loads/stores.
pub const QUADRANT_2: u16 = 0b10;

/// Quadrant 0 funct3 values.
pub mod q0 {
    /// C.ADDI4SPN — add scaled immediate to stack pointer.
    pub const C_ADDI4SPN: u16 = 0b000;
    /// C.FLD — not implemented (no D extension); reserved here.
    pub const C_FLD: u16 = 0b001;
    /// C.LW.
    pub const C_LW: u16 = 0b010;
    /// C.LD.
    pub const C_LD: u16 = 0b011;
    /// Reserved.
    pub const C_RESERVED: u16 = 0b100;
    /// C.FSD — not implemented (no D extension); reserved here.
    pub const C_FSD: u16 = 0b101;
    /// C.SW.
    pub const C_SW: u16 = 0b110;
    /// C.SD.
    pub const C_SD: u16 = 0b111;
}

/// Quadrant 1 funct3 values.
pub mod q1 {
    /// C.ADDI.
    pub const C_ADDI: u16 = 0b000;
    /// C.ADDIW.
    pub const C_ADDIW: u16 = 0b001;
    /// C.LI.
    pub const C_LI: u16 = 0b010;
    /// C.LUI, or C.ADDI16SP when rd is the stack pointer.
    pub const C_LUI_ADDI16SP: u16 = 0b011;
    /// C.SRLI/C.SRAI/C.ANDI/C.SUB/C.XOR/C.OR/C.AND/C.SUBW/C.ADDW.
    pub const C_MISC_ALU: u16 = 0b100;
    /// C.J.
    pub const C_J: u16 = 0b101;
    /// C.BEQZ.
    pub const C_BEQZ: u16 = 0b110;
    /// C.BNEZ.
    pub const C_BNEZ: u16 = 0b111;
}

/// Quadrant 2 funct3 values.
pub mod q2 {
    /// C.SLLI.
    pub const C_SLLI: u16 = 0b000;
    /// C.FLDSP — not implemented (no D extension); reserved here.
    pub const C_FLDSP: u16 = 0b001;
    /// C.LWSP.
    pub const C_LWSP: u16 = 0b010;
    /// C.LDSP.
    pub const C_LDSP: u16 = 0b011;
    /// C.JR/C.MV/C.EBREAK/C.JALR/C.ADD.
    pub const C_JR_MV_ADD: u16 = 0b100;
    /// C.FSDSP — not implemented (no D extension); reserved here.
    pub const C_FSDSP: u16 = 0b101;
    /// C.SWSP.
    pub const C_SWSP: u16 = 0b110;
    /// C.SDSP.
    pub const C_SDSP: u16 = 0b111;
}
