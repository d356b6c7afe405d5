//! Matched messages claimed by [`Communicator::mprobe`](crate::Communicator::mprobe).

use crate::buffer::Buffer;
use crate::datatype::{DatatypeTag, MpiDatatype};
use crate::ffi;
use crate::status::Status;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;

/// An incoming message that has been matched but not yet received.
///
/// Only this handle can receive the payload; consuming it with one of the
/// `recv*` methods completes the exchange. Typical use is sizing the
/// destination from the probed [`Status`] before receiving:
///
/// ```no_run
/// use infermpi::{Mpi, ANY_SOURCE};
///
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// let (message, _) = world.mprobe(ANY_SOURCE, 3);
/// let (tokens, status) = message.recv_vec::<i32>();
/// println!("{} tokens from rank {}", tokens.len(), status.source);
/// ```
#[must_use = "a probed message is discarded unless it is received"]
pub struct Message {
    handle: i64,
    status: Status,
    _marker: PhantomData<*const ()>,
}

impl Message {
    pub(crate) fn new(handle: i64, status: Status) -> Self {
        Message {
            handle,
            status,
            _marker: PhantomData,
        }
    }

    /// Status reported by the probe.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Receive the payload into `count` elements of `dtype`.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for writes of `count * dtype.size_in_bytes()` host bytes.
    pub unsafe fn recv_raw(self, buf: *mut c_void, count: usize, dtype: DatatypeTag) -> Status {
        precondition!(
            count <= i32::MAX as usize,
            "element count {count} exceeds the MPI count limit"
        );
        let this = ManuallyDrop::new(self);
        let mut status = this.status;
        tracing::trace!(message = this.handle, count, ?dtype, "mrecv");
        mpi_check!(ffi::infermpi_mrecv(
            buf,
            count as i64,
            dtype as i32,
            this.handle,
            &mut status.source,
            &mut status.tag,
            &mut status.error,
            &mut status.bytes
        ));
        status
    }

    /// Receive into a slice large enough for the payload.
    pub fn recv<T: MpiDatatype>(self, data: &mut [T]) -> Status {
        unsafe { self.recv_raw(data.as_mut_ptr().cast(), data.len(), T::TAG) }
    }

    /// Receive into a freshly allocated vector sized from the probe.
    pub fn recv_vec<T: MpiDatatype>(self) -> (Vec<T>, Status) {
        let probed = self.status;
        let len = match probed.count::<T>() {
            Some(len) => len,
            None => crate::fatal::precondition_failure(
                file!(),
                line!(),
                format_args!(
                    "probed message of {} bytes is not a whole number of {:?} elements",
                    probed.bytes,
                    T::TAG
                ),
            ),
        };
        let mut data = vec![T::default(); len];
        let status = self.recv(&mut data);
        (data, status)
    }

    /// Receive into a host buffer as bytes.
    pub fn recv_buffer<B: Buffer + ?Sized>(self, buf: &mut B) -> Status {
        precondition!(
            !buf.memory_type().is_device_resident(),
            "device-resident buffer ({} bytes) passed to host-only mrecv",
            buf.size_in_bytes()
        );
        let size = buf.size_in_bytes();
        unsafe { self.recv_raw(buf.data_mut().cast(), size, DatatypeTag::Byte) }
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        // A matched message cannot be put back; receive and discard it so
        // the sender's request completes and the shim slot is released.
        tracing::warn!(
            message = self.handle,
            source = self.status.source,
            tag = self.status.tag,
            bytes = self.status.bytes,
            "discarding probed message that was never received"
        );
        let mut sink = vec![0u8; self.status.bytes.max(0) as usize];
        let mut status = self.status;
        mpi_check!(unsafe {
            ffi::infermpi_mrecv(
                sink.as_mut_ptr().cast(),
                sink.len() as i64,
                DatatypeTag::Byte as i32,
                self.handle,
                &mut status.source,
                &mut status.tag,
                &mut status.error,
                &mut status.bytes,
            )
        });
    }
}
