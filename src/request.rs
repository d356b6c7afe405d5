//! Request handles for nonblocking MPI operations.

use crate::ffi;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr;

/// A pending nonblocking operation.
///
/// The request owns the buffer the operation reads or writes and hands it
/// back from [`wait`](Self::wait), so the buffer cannot be touched, freed
/// or reused while the transport still uses it. Leaking the request leaks
/// the buffer with it. Dropping an unresolved request waits for it.
///
/// Completion status is not reported: `wait` checks the return code (a
/// failure aborts the job like any other transport error) and discards the
/// native `MPI_Status`. There is no timeout or cancellation.
///
/// # Example
///
/// ```no_run
/// use infermpi::Mpi;
///
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// let request = world.ibcast(vec![0.0f32; 4096], 0);
///
/// // ... overlap with other work ...
///
/// let hidden = request.wait();
/// assert_eq!(hidden.len(), 4096);
/// ```
#[must_use = "dropping a Request blocks until the operation completes"]
pub struct Request<B = ()> {
    handle: i64,
    completed: bool,
    buffer: B,
    /// Keeps the request on the issuing thread
    _marker: PhantomData<*const ()>,
}

impl<B> Request<B> {
    pub(crate) fn new(handle: i64, buffer: B) -> Self {
        Request {
            handle,
            completed: false,
            buffer,
            _marker: PhantomData,
        }
    }

    /// Get the raw request handle (for advanced use).
    pub fn raw_handle(&self) -> i64 {
        self.handle
    }

    /// Release the native handle to another request without waiting.
    pub(crate) fn into_raw_handle(self) -> i64 {
        let this = ManuallyDrop::new(self);
        // SAFETY: the buffer is dropped here exactly once; the handle moves on.
        unsafe { ptr::read(&this.buffer) };
        this.handle
    }

    /// Check if this request has been completed.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Block until the operation completes and return the buffer.
    pub fn wait(self) -> B {
        let mut this = ManuallyDrop::new(self);
        this.complete();
        // SAFETY: `this` is never dropped, so the buffer is moved out exactly once.
        unsafe { ptr::read(&this.buffer) }
    }

    /// Check for completion without blocking.
    ///
    /// Once this returns `true` the request is resolved and
    /// [`wait`](Self::wait) returns immediately.
    pub fn test(&mut self) -> bool {
        if self.completed {
            return true;
        }
        let mut flag: i32 = 0;
        mpi_check!(unsafe { ffi::infermpi_test(self.handle, &mut flag) });
        if flag != 0 {
            self.completed = true;
        }
        self.completed
    }

    /// Wait for every request in the collection, returning the buffers in order.
    pub fn wait_all(mut requests: Vec<Request<B>>) -> Vec<B> {
        let mut handles: Vec<i64> = requests
            .iter()
            .filter(|r| !r.completed)
            .map(|r| r.handle)
            .collect();
        if !handles.is_empty() {
            mpi_check!(unsafe {
                ffi::infermpi_waitall(handles.len() as i64, handles.as_mut_ptr())
            });
        }
        for request in &mut requests {
            request.completed = true;
        }
        requests.into_iter().map(Request::wait).collect()
    }

    fn complete(&mut self) {
        if self.completed {
            return;
        }
        mpi_check!(unsafe { ffi::infermpi_wait(self.handle) });
        self.completed = true;
    }
}

impl<B> Drop for Request<B> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::trace!(handle = self.handle, "waiting on dropped request");
            self.complete();
        }
    }
}
