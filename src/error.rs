use serde::{Deserialize, Serialize};

/// Every failure the engine can report for one line or one instruction.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[error("unknown instruction")]
    UnknownInstruction,
    #[error("unknown operand")]
    UnknownOperand,
    #[error("operand not allowed")]
    OperandNotAllowed,
    #[error("illegal operand mode")]
    IllegalOperandMode,
    #[error("register not allowed")]
    RegisterNotAllowed,
    #[error("duplicate register")]
    DuplicateRegister,
    #[error("opcode has no effect")]
    OpcodeHasNoEffect,
    #[error("overflow range")]
    OverflowRange,
    #[error("illegal constant")]
    IllegalConstant,
    #[error("missing operand")]
    MissingOperand,
    #[error("missing closing paren")]
    MissingClosingParen,
    #[error("missing closing bracket")]
    MissingClosingBracket,
    #[error("missing closing quote")]
    MissingClosingQuote,
    #[error("garbage at end")]
    GarbageAtEnd,
    #[error("not an expression")]
    NotAnExpression,
    #[error("undefined symbol")]
    UndefinedSymbol,
    #[error("not a floating point number")]
    NotAFloat,
    #[error("no memory")]
    NoMemory,
    #[error("internal error")]
    InternalError,
    #[error("unsupported cpu")]
    UnsupportedCpu,
    #[error("unknown option")]
    UnknownOption,
    #[error("illegal alignment")]
    IllegalAlignment,
}

impl ErrorKind {
    /// Advisories are reported but never make an instruction fail.
    pub fn is_warning(self) -> bool {
        matches!(self, ErrorKind::OpcodeHasNoEffect)
    }
}

/// A fatal error bound to the offset it was detected at.
///
/// For encoding `at` is a byte offset into the source line; for decoding it is
/// the offset from the first byte of the instruction.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} at offset {at}")]
pub struct AsmError {
    pub kind: ErrorKind,
    pub at: usize,
}

/// Sticky first-error accumulator.
///
/// Once a fatal error is recorded every later `set_error` is dropped until
/// [`ErrorAt::clear`]. An advisory may still be replaced by a fatal error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorAt {
    error: Option<AsmError>,
}

impl ErrorAt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True while no fatal error has been recorded.
    pub fn is_usable(&self) -> bool {
        self.error.map_or(true, |e| e.kind.is_warning())
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.map(|e| e.kind)
    }

    pub fn at(&self) -> Option<usize> {
        self.error.map(|e| e.at)
    }

    pub fn get(&self) -> Option<AsmError> {
        self.error
    }

    pub fn set_error(&mut self, at: usize, kind: ErrorKind) -> &mut Self {
        let replace = match self.error {
            None => true,
            Some(prev) => prev.kind.is_warning() && !kind.is_warning(),
        };
        if replace {
            self.error = Some(AsmError { kind, at });
        }
        self
    }

    /// Records the error of `result`, if any, and hands back its value.
    pub fn set_error_if<T>(&mut self, at: usize, result: Result<T, ErrorKind>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(kind) => {
                self.set_error(at, kind);
                None
            }
        }
    }

    /// Folds another accumulator into this one under the same first-error rule.
    pub fn merge(&mut self, other: &ErrorAt) -> &mut Self {
        if let Some(e) = other.error {
            self.set_error(e.at, e.kind);
        }
        self
    }

    pub fn clear(&mut self) {
        self.error = None;
    }

    /// `Err` only for fatal errors; advisories stay readable through [`ErrorAt::kind`].
    pub fn check(&self) -> Result<(), AsmError> {
        match self.error {
            Some(e) if !e.kind.is_warning() => Err(e),
            _ => Ok(()),
        }
    }
}
