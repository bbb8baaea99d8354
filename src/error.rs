use thiserror::Error;

/// Boundary status codes. `Ok` is zero, every failure is a distinct small negative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    NullPointer = -1,
    BadShape = -2,
    BadQuant = -3,
    NotImplemented = -4,
}

impl Status {
    pub fn code(self) -> i32 { self as i32 }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            -1 => Some(Self::NullPointer),
            -2 => Some(Self::BadShape),
            -3 => Some(Self::BadQuant),
            -4 => Some(Self::NotImplemented),
            _ => None,
        }
    }
}

/// Argument and configuration failures detected before any output element is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// A required buffer is absent or shorter than the declared shape needs.
    #[error("missing buffer: {what} needs {needed} elements, got {got}")]
    MissingBuffer { what: &'static str, needed: usize, got: usize },

    #[error("bad shape: {0}")]
    BadShape(String),

    #[error("bad quantization parameter: {0}")]
    BadQuant(String),

    /// The call asks for a precision or rescale combination this engine does not ship.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl KernelError {
    pub fn status(&self) -> Status {
        match self {
            KernelError::MissingBuffer { .. } => Status::NullPointer,
            KernelError::BadShape(_) => Status::BadShape,
            KernelError::BadQuant(_) => Status::BadQuant,
            KernelError::NotImplemented(_) => Status::NotImplemented,
        }
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self { KernelError::BadShape(msg.into()) }

    pub(crate) fn quant(msg: impl Into<String>) -> Self { KernelError::BadQuant(msg.into()) }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Collapse a typed result into the integer status handed across the call boundary.
pub fn status_of<T>(r: &KernelResult<T>) -> i32 {
    match r {
        Ok(_) => Status::Ok.code(),
        Err(e) => e.status().code(),
    }
}
