//! MPI message status information.

use crate::datatype::MpiDatatype;

/// Wildcard source rank for receives and probes (`MPI_ANY_SOURCE`).
pub const ANY_SOURCE: i32 = -1;

/// Wildcard message tag for receives and probes (`MPI_ANY_TAG`).
pub const ANY_TAG: i32 = -1;

/// Metadata of a received or probed message.
///
/// Returned by [`Communicator::recv`](crate::Communicator::recv) and
/// [`Communicator::mprobe`](crate::Communicator::mprobe).
///
/// # Example
///
/// ```no_run
/// # use infermpi::{Mpi, ANY_SOURCE, ANY_TAG};
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// let (message, status) = world.mprobe(ANY_SOURCE, ANY_TAG);
/// println!("{} f32 values from rank {} (tag {})",
///          status.count::<f32>().unwrap_or(0), status.source, status.tag);
/// let mut data = vec![0.0f32; status.count::<f32>().unwrap_or(0)];
/// message.recv(&mut data);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Rank the message came from.
    pub source: i32,
    /// Tag the message was sent with.
    pub tag: i32,
    /// `MPI_ERROR` field of the native status.
    pub error: i32,
    /// Payload size in bytes, `-1` if the runtime could not express it.
    pub bytes: i64,
}

impl Status {
    /// Number of whole `T` elements in the payload.
    ///
    /// `None` if the size is unknown or not a multiple of the element size.
    pub fn count<T: MpiDatatype>(&self) -> Option<usize> {
        let elem = T::TAG.size_in_bytes() as i64;
        if self.bytes < 0 || self.bytes % elem != 0 {
            return None;
        }
        Some((self.bytes / elem) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(bytes: i64) -> Status {
        Status {
            source: 2,
            tag: 7,
            error: 0,
            bytes,
        }
    }

    #[test]
    fn count_divides_by_element_size() {
        assert_eq!(status(32).count::<f64>(), Some(4));
        assert_eq!(status(32).count::<f32>(), Some(8));
        assert_eq!(status(32).count::<u8>(), Some(32));
        assert_eq!(status(0).count::<i64>(), Some(0));
    }

    #[test]
    fn count_rejects_partial_and_unknown() {
        assert_eq!(status(6).count::<f32>(), None);
        assert_eq!(status(-1).count::<u8>(), None);
    }
}
