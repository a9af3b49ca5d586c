use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Transport failure. Disconnected sensors are not errors, see the crate docs.
#[derive(Debug)]
pub enum Error<E: Sized + Debug> {
    /// Wire not high
    WireFault,
    PortError(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}

impl<E: Sized + Debug> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Error::WireFault => write!(f, "1-Wire line stuck low"),
            Error::PortError(e) => write!(f, "port error: {:?}", e),
        }
    }
}
