//! Errors the VM can produce at dispatch time, distinct from `raise`'d
//! Inox-level errors which travel as `Value::Error` on the stack, not as
//! a Rust `Result::Err` (§4.5, §7).

use inox_value::ValueError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    StackUnderflow,
    UnknownOpcode(u8),
    UnknownConstant(u32),
    UnknownGlobal(String),
    UnknownFunction(u32),
    ArityMismatch { expected: usize, got: usize },
    /// An opcode was applied to operands of a kind it cannot handle.
    TypeError(ValueError),
    /// An uncaught `raise` propagated out of the running chunk entirely.
    Unhandled(inox_value::ErrorData),
    Context(inox_context::ContextError),
    Cancelled,
    /// The chunk executed an explicit `Halt` instruction.
    Halted,
}

impl From<ValueError> for VmError {
    fn from(e: ValueError) -> Self {
        VmError::TypeError(e)
    }
}

impl From<inox_context::ContextError> for VmError {
    fn from(e: inox_context::ContextError) -> Self {
        match e {
            inox_context::ContextError::Cancelled => VmError::Cancelled,
            other => VmError::Context(other),
        }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackUnderflow => write!(f, "stack underflow"),
            VmError::UnknownOpcode(b) => write!(f, "unknown opcode byte 0x{b:02X}"),
            VmError::UnknownConstant(i) => write!(f, "no constant at index {i}"),
            VmError::UnknownGlobal(name) => write!(f, "undefined global {name:?}"),
            VmError::UnknownFunction(id) => write!(f, "no compiled function with id {id}"),
            VmError::ArityMismatch { expected, got } => {
                write!(f, "expected {expected} arguments, got {got}")
            }
            VmError::TypeError(e) => write!(f, "{e}"),
            VmError::Unhandled(e) => write!(f, "unhandled error: {}", e.message),
            VmError::Context(e) => write!(f, "{e}"),
            VmError::Cancelled => write!(f, "execution cancelled"),
            VmError::Halted => write!(f, "halted"),
        }
    }
}

impl std::error::Error for VmError {}

pub type VmResult<T> = Result<T, VmError>;
