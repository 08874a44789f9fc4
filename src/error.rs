//! Runtime errors
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadStackFrame,
    CallToIllegalAddress,
    CallToNonRoutine,
    ConfigError,
    DivisionByZero,
    IllegalAttribute,
    IllegalDictionaryWordLength,
    IllegalObject,
    IllegalOpcode,
    IllegalWindow,
    IllegalWindowProperty,
    Interpreter,
    InvalidAbbreviation,
    InvalidFile,
    InvalidInput,
    InvalidOutputStream,
    JumpToIllegalAddress,
    NoSuchProperty,
    PrintAtIllegalAddress,
    Restore,
    Save,
    SaveDuringInterrupt,
    StackOverflow,
    StackUnderflow,
    StoreOutOfDynamicMemory,
    Stream3NestingTooDeep,
    TextBufferOverflow,
    Transcript,
    UnsupportedVersion,
    // Object opcodes called with the null object
    ClearAttrObject0,
    GetChildObject0,
    GetNextPropObject0,
    GetParentObject0,
    GetPropAddrObject0,
    GetPropObject0,
    GetSiblingObject0,
    JinObject0,
    MoveObject0,
    MoveToObject0,
    PutPropObject0,
    RemoveObject0,
    SetAttrObject0,
    TestAttrObject0,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            ErrorCode::BadStackFrame => "Bad stack frame",
            ErrorCode::CallToIllegalAddress => "Call to illegal address",
            ErrorCode::CallToNonRoutine => "Call to non-routine",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::DivisionByZero => "Division by zero",
            ErrorCode::IllegalAttribute => "Illegal attribute",
            ErrorCode::IllegalDictionaryWordLength => "Illegal dictionary word length",
            ErrorCode::IllegalObject => "Illegal object",
            ErrorCode::IllegalOpcode => "Illegal opcode",
            ErrorCode::IllegalWindow => "Illegal window",
            ErrorCode::IllegalWindowProperty => "Illegal window property",
            ErrorCode::Interpreter => "Internal interpreter error",
            ErrorCode::InvalidAbbreviation => "Invalid abbreviation",
            ErrorCode::InvalidFile => "Invalid story file",
            ErrorCode::InvalidInput => "Invalid input",
            ErrorCode::InvalidOutputStream => "Invalid output stream",
            ErrorCode::JumpToIllegalAddress => "Jump to illegal address",
            ErrorCode::NoSuchProperty => "No such property",
            ErrorCode::PrintAtIllegalAddress => "Print at illegal address",
            ErrorCode::Restore => "Error restoring state",
            ErrorCode::Save => "Error saving state",
            ErrorCode::SaveDuringInterrupt => "Can't save while in interrupt",
            ErrorCode::StackOverflow => "Stack overflow",
            ErrorCode::StackUnderflow => "Stack underflow",
            ErrorCode::StoreOutOfDynamicMemory => "Store out of dynamic memory",
            ErrorCode::Stream3NestingTooDeep => "Nesting stream #3 too deep",
            ErrorCode::TextBufferOverflow => "Text buffer overflow",
            ErrorCode::Transcript => "Transcript error",
            ErrorCode::UnsupportedVersion => "Unsupported story file version",
            ErrorCode::ClearAttrObject0 => "@clear_attr called with object 0",
            ErrorCode::GetChildObject0 => "@get_child called with object 0",
            ErrorCode::GetNextPropObject0 => "@get_next_prop called with object 0",
            ErrorCode::GetParentObject0 => "@get_parent called with object 0",
            ErrorCode::GetPropAddrObject0 => "@get_prop_addr called with object 0",
            ErrorCode::GetPropObject0 => "@get_prop called with object 0",
            ErrorCode::GetSiblingObject0 => "@get_sibling called with object 0",
            ErrorCode::JinObject0 => "@jin called with object 0",
            ErrorCode::MoveObject0 => "@move_object called moving object 0",
            ErrorCode::MoveToObject0 => "@move_object called moving into object 0",
            ErrorCode::PutPropObject0 => "@put_prop called with object 0",
            ErrorCode::RemoveObject0 => "@remove_object called with object 0",
            ErrorCode::SetAttrObject0 => "@set_attr called with object 0",
            ErrorCode::TestAttrObject0 => "@test_attr called with object 0",
        };
        write!(f, "{}", text)
    }
}

/// A runtime error
pub struct RuntimeError {
    /// Is the error recoverable (in theory, at least)?
    recoverable: bool,
    /// Error code
    code: ErrorCode,
    /// Error message
    message: String,
}

impl RuntimeError {
    /// Recoverable error constructor
    ///
    /// # Arguments
    /// * `code` - Error code
    /// * `message` - Error message
    pub fn recoverable(code: ErrorCode, message: String) -> RuntimeError {
        RuntimeError {
            recoverable: true,
            code,
            message,
        }
    }

    /// Fatal error constructor
    ///
    /// # Arguments
    /// * `code` - Error code
    /// * `message` - Error message
    pub fn fatal(code: ErrorCode, message: String) -> RuntimeError {
        RuntimeError {
            recoverable: false,
            code,
            message,
        }
    }

    /// Get the error code
    ///
    /// # Returns
    /// Error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the error message
    ///
    /// # Returns
    /// Error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Is the error recoverable?
    ///
    /// # Returns
    /// `true` if the error is _potentially_ recoverable, `false` if not
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

#[macro_export]
macro_rules! fatal_error {
    ($code:expr, $($arg:tt)*) => {
        Err(RuntimeError::fatal($code, format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! recoverable_error {
    ($code:expr, $($arg:tt)*) => {
        Err(RuntimeError::recoverable($code, format!($($arg)*)))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} error - [{:?}]: {}",
            if self.recoverable {
                "Recoverable"
            } else {
                "Fatal"
            },
            self.code,
            self.message
        )
    }
}

impl fmt::Debug for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} error - [{:?}]: {}",
            if self.recoverable {
                "Recoverable"
            } else {
                "Fatal"
            },
            self.code,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable() {
        let e = RuntimeError::recoverable(ErrorCode::DivisionByZero, "div 0".to_string());
        assert!(e.is_recoverable());
        assert_eq!(e.code(), ErrorCode::DivisionByZero);
        assert_eq!(e.message(), "div 0");
    }

    #[test]
    fn test_fatal() {
        let e = RuntimeError::fatal(ErrorCode::InvalidFile, "truncated".to_string());
        assert!(!e.is_recoverable());
        assert_eq!(e.code(), ErrorCode::InvalidFile);
        assert_eq!(e.message(), "truncated");
    }

    #[test]
    fn test_macros() {
        fn r() -> Result<(), RuntimeError> {
            recoverable_error!(ErrorCode::IllegalObject, "object {}", 105)
        }
        fn f() -> Result<(), RuntimeError> {
            fatal_error!(ErrorCode::StackUnderflow, "no frame")
        }
        let e = r().unwrap_err();
        assert!(e.is_recoverable());
        assert_eq!(e.message(), "object 105");
        let e = f().unwrap_err();
        assert!(!e.is_recoverable());
    }
}
