use std::fmt;

/// Convenience alias used across the core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// iNES magic mismatch, short header, or impossible size fields.
    InvalidHeader(&'static str),
    /// Unsupported mapper or internally inconsistent chip sizing.
    InvalidRom(String),
    /// Bus access that no registered bank claims. Indicates a core defect
    /// for valid cartridges; surfaced out of the tick driver.
    InvalidAddress { addr: u16 },
    /// Reserved for strict decode modes; the default decoder treats unknown
    /// opcodes as no-ops with their canonical timing.
    InvalidOpcode { opcode: u8 },
    /// Synthetic banks (forwarding, adapters) cannot expose raw data.
    NotImplemented(&'static str),
    /// Wrapper for I/O errors raised while reading ROMs from disk.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader(reason) => write!(f, "invalid iNES header: {reason}"),
            Self::InvalidRom(reason) => write!(f, "invalid ROM: {reason}"),
            Self::InvalidAddress { addr } => {
                write!(f, "no memory bank claims address {addr:#06X}")
            }
            Self::InvalidOpcode { opcode } => write!(f, "invalid opcode {opcode:#04X}"),
            Self::NotImplemented(what) => write!(f, "not implemented: {what}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
