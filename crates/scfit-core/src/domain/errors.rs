use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ScfitResult<T> = Result<T, ScfitError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScfitErrorCategory {
    MalformedInput,
    InconsistentInputSet,
    InsufficientInput,
    InvalidInput,
    IoSystem,
    Computation,
    Internal,
}

impl ScfitErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedInput => "MalformedInput",
            Self::InconsistentInputSet => "InconsistentInputSet",
            Self::InsufficientInput => "InsufficientInput",
            Self::InvalidInput => "InvalidInput",
            Self::IoSystem => "IoSystemError",
            Self::Computation => "ComputationError",
            Self::Internal => "InternalError",
        }
    }

    pub const fn exit_code(self) -> i32 {
        match self {
            Self::MalformedInput
            | Self::InconsistentInputSet
            | Self::InsufficientInput
            | Self::InvalidInput => 2,
            Self::IoSystem => 3,
            Self::Computation => 4,
            Self::Internal => 5,
        }
    }

    pub const fn is_input_error(self) -> bool {
        self.exit_code() == 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScfitError {
    category: ScfitErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl ScfitError {
    pub fn new(
        category: ScfitErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn malformed_input(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ScfitErrorCategory::MalformedInput, placeholder, message)
    }

    pub fn inconsistent_input_set(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ScfitErrorCategory::InconsistentInputSet, placeholder, message)
    }

    pub fn insufficient_input(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ScfitErrorCategory::InsufficientInput, placeholder, message)
    }

    pub fn invalid_input(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ScfitErrorCategory::InvalidInput, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ScfitErrorCategory::IoSystem, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ScfitErrorCategory::Computation, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ScfitErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> ScfitErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for ScfitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for ScfitError {}
