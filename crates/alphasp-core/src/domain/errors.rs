use crate::common::ConfigError;
use crate::numerics::cross_section::TableError;
use crate::rates::{DatasetError, RecombinationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaSpErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
}

impl AlphaSpErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Process-level error carrying a stable category and a short dotted tag
/// (`INPUT.TABLE`, `IO.CONFIG`, ...) that scripts can match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaSpError {
    category: AlphaSpErrorCategory,
    tag: &'static str,
    message: String,
}

impl AlphaSpError {
    pub fn new(category: AlphaSpErrorCategory, tag: &'static str, message: impl Into<String>) -> Self {
        Self {
            category,
            tag,
            message: message.into(),
        }
    }

    pub fn input_validation(tag: &'static str, message: impl Into<String>) -> Self {
        Self::new(AlphaSpErrorCategory::InputValidationError, tag, message)
    }

    pub fn io_system(tag: &'static str, message: impl Into<String>) -> Self {
        Self::new(AlphaSpErrorCategory::IoSystemError, tag, message)
    }

    pub const fn category(&self) -> AlphaSpErrorCategory {
        self.category
    }

    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.tag, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for AlphaSpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.category.as_str(), self.tag, self.message)
    }
}

impl Error for AlphaSpError {}

impl From<TableError> for AlphaSpError {
    fn from(error: TableError) -> Self {
        Self::input_validation("INPUT.TABLE", error.to_string())
    }
}

impl From<RecombinationError> for AlphaSpError {
    fn from(error: RecombinationError) -> Self {
        Self::input_validation("INPUT.RECOMBINATION", error.to_string())
    }
}

impl From<DatasetError> for AlphaSpError {
    fn from(error: DatasetError) -> Self {
        match error {
            DatasetError::Read { .. } => Self::io_system("IO.DATASET", error.to_string()),
            DatasetError::Parse { .. } => Self::input_validation("INPUT.DATASET", error.to_string()),
            DatasetError::Table { .. } => Self::input_validation("INPUT.TABLE", error.to_string()),
            DatasetError::Recombination { .. } => {
                Self::input_validation("INPUT.RECOMBINATION", error.to_string())
            }
        }
    }
}

impl From<ConfigError> for AlphaSpError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Read { .. } => Self::io_system("IO.CONFIG", error.to_string()),
            ConfigError::Parse { .. } | ConfigError::InvalidConstant { .. } => {
                Self::input_validation("INPUT.CONFIG", error.to_string())
            }
        }
    }
}
