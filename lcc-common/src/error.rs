//! Error handling for the LittleC compiler
//!
//! The backend trusts its input: anything that goes wrong past the parser
//! is a bug in an earlier pass and is reported as an internal error.

use thiserror::Error;

/// Main compiler error type shared by every crate in the workspace
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    #[error("Parse error at line {line}: {message}")]
    ParseError {
        line: usize,
        message: String,
    },

    #[error("Code generation error in {function}: {message}")]
    CodegenError {
        function: String,
        message: String,
    },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompilerError {
    /// Create a parse error for a 1-based IR text line
    pub fn parse_error(line: usize, message: impl Into<String>) -> Self {
        CompilerError::ParseError { line, message: message.into() }
    }

    /// Create a codegen error tagged with the function being lowered
    pub fn codegen_error(function: impl Into<String>, message: impl Into<String>) -> Self {
        CompilerError::CodegenError {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create an internal (fatal) error
    pub fn internal(message: impl Into<String>) -> Self {
        CompilerError::InternalError { message: message.into() }
    }

    /// Attach the enclosing function name to an internal error.
    /// Other variants already carry enough context and pass through unchanged.
    pub fn in_function(self, function: &str) -> Self {
        match self {
            CompilerError::InternalError { message } => CompilerError::CodegenError {
                function: function.to_string(),
                message,
            },
            other => other,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, CompilerError::InternalError { .. } | CompilerError::CodegenError { .. })
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}

/// Convert from String (for simple error cases)
impl From<String> for CompilerError {
    fn from(message: String) -> Self {
        CompilerError::InternalError { message }
    }
}
