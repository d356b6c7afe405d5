//! Safe wrappers for MPI communicator operations.

use crate::buffer::Buffer;
use crate::datatype::{DatatypeTag, MpiDatatype};
use crate::error::{Error, Result};
use crate::ffi;
use crate::message::Message;
use crate::op::ReduceOp;
use crate::request::Request;
use crate::status::Status;
use bytemuck::Pod;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;

/// Handle value the shim uses for `MPI_COMM_NULL`.
const COMM_NULL: i32 = -1;

/// Color value the shim maps to `MPI_UNDEFINED`.
const UNDEFINED_COLOR: i32 = -1;

/// Element count as passed to the shim; MPI counts are C `int`.
fn wire_count(len: usize) -> i64 {
    precondition!(
        len <= i32::MAX as usize,
        "element count {len} exceeds the MPI count limit"
    );
    len as i64
}

fn host_only<B: Buffer + ?Sized>(buf: &B, operation: &str) {
    precondition!(
        !buf.memory_type().is_device_resident(),
        "device-resident buffer ({} bytes) passed to host-only {operation}",
        buf.size_in_bytes()
    );
}

/// An MPI communicator.
///
/// A communicator either owns its native handle (it was created by
/// [`split`](Self::split)) and frees it exactly once on drop, or borrows it
/// (the world communicator) and leaves it alone. It is move-only: there is
/// no `Clone`, so at most one value is ever responsible for a handle.
///
/// All typed operations are generic over [`MpiDatatype`]. The `*_raw`
/// variants take untyped pointers plus an explicit [`DatatypeTag`] and are
/// `unsafe`.
///
/// Transport errors abort the job; see the crate-level failure policy.
///
/// # Example
///
/// ```no_run
/// use infermpi::{Mpi, ReduceOp};
///
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// // One tensor-parallel group per node of four ranks.
/// let tp = world.split(world.rank() / 4, world.rank());
/// let partial = vec![1.0f32; 1024];
/// let mut summed = vec![0.0f32; 1024];
/// tp.allreduce(&partial, &mut summed, ReduceOp::Sum);
/// ```
pub struct Communicator {
    handle: i32,
    owned: bool,
    /// Marker to prevent Send/Sync (calls must come from the initializing thread)
    _marker: PhantomData<*mut ()>,
}

impl Communicator {
    /// Borrowed handle to `MPI_COMM_WORLD`.
    pub(crate) fn world() -> Self {
        Communicator {
            handle: unsafe { ffi::infermpi_comm_world() },
            owned: false,
            _marker: PhantomData,
        }
    }

    /// Wrap a shim communicator handle.
    ///
    /// # Safety
    ///
    /// `handle` must be a live shim handle. If `owned` is true, no other
    /// value may free it.
    pub unsafe fn from_raw(handle: i32, owned: bool) -> Self {
        Communicator {
            handle,
            owned,
            _marker: PhantomData,
        }
    }

    /// Get the raw communicator handle (for advanced use).
    pub fn raw_handle(&self) -> i32 {
        self.handle
    }

    /// Whether dropping this value frees the native communicator.
    pub fn owns_handle(&self) -> bool {
        self.owned
    }

    /// Give up the handle without freeing it.
    ///
    /// The caller becomes responsible for the communicator if it was owned.
    pub fn into_raw(self) -> i32 {
        let this = ManuallyDrop::new(self);
        this.handle
    }

    /// Get the rank of the calling process in this communicator.
    pub fn rank(&self) -> i32 {
        let mut rank: i32 = 0;
        mpi_check!(unsafe { ffi::infermpi_comm_rank(self.handle, &mut rank) });
        rank
    }

    /// Get the number of processes in this communicator.
    pub fn size(&self) -> i32 {
        let mut size: i32 = 0;
        mpi_check!(unsafe { ffi::infermpi_comm_size(self.handle, &mut size) });
        size
    }

    /// Name of the host this process runs on.
    pub fn processor_name(&self) -> Result<String> {
        ffi::read_string(|buf, len| unsafe { ffi::infermpi_get_processor_name(buf, len) })
            .ok_or_else(|| Error::Internal("could not read processor name".into()))
    }

    /// Whether MPI hands failures on this communicator back as return codes.
    ///
    /// True for the world communicator when this crate initialized MPI and
    /// for every communicator created by [`split`](Self::split); only then
    /// do transport failures produce the located `Failed: MPI error`
    /// diagnostic before the job is aborted. A runtime adopted from the
    /// embedding application keeps its own handler on world.
    pub fn returns_error_codes(&self) -> bool {
        let mut flag: i32 = 0;
        mpi_check!(unsafe { ffi::infermpi_comm_errors_return(self.handle, &mut flag) });
        flag != 0
    }

    /// Partition this communicator into disjoint groups.
    ///
    /// Processes passing the same `color` end up in the same new
    /// communicator, ranked by `key` (ties broken by rank in `self`).
    /// Collective over `self`.
    pub fn split(&self, color: i32, key: i32) -> Communicator {
        precondition!(
            color >= 0,
            "split color must be non-negative, got {color} (use split_optional to opt out)"
        );
        match self.split_optional(Some(color), key) {
            Some(comm) => comm,
            None => crate::fatal::precondition_failure(
                file!(),
                line!(),
                format_args!("split with color {color} returned MPI_COMM_NULL"),
            ),
        }
    }

    /// Like [`split`](Self::split), but `None` as color opts this process
    /// out (`MPI_UNDEFINED`) and yields no communicator.
    pub fn split_optional(&self, color: Option<i32>, key: i32) -> Option<Communicator> {
        let native_color = match color {
            Some(c) => {
                precondition!(c >= 0, "split color must be non-negative, got {c}");
                c
            }
            None => UNDEFINED_COLOR,
        };
        let mut new_handle: i32 = COMM_NULL;
        mpi_check!(unsafe {
            ffi::infermpi_comm_split(self.handle, native_color, key, &mut new_handle)
        });
        tracing::debug!(
            parent = self.handle,
            ?color,
            key,
            handle = new_handle,
            "split communicator"
        );
        if new_handle == COMM_NULL {
            return None;
        }
        Some(Communicator {
            handle: new_handle,
            owned: true,
            _marker: PhantomData,
        })
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Barrier synchronization.
    ///
    /// All processes in the communicator must call this function. No process
    /// will return until all processes have entered the barrier.
    pub fn barrier(&self) {
        tracing::trace!(comm = self.handle, "barrier");
        mpi_check!(unsafe { ffi::infermpi_barrier(self.handle) });
    }

    // ========================================================================
    // Broadcast
    // ========================================================================

    /// Broadcast `count` elements of `dtype` from `root`.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for reads and writes of
    /// `count * dtype.size_in_bytes()` host bytes.
    pub unsafe fn bcast_raw(&self, buf: *mut c_void, count: usize, dtype: DatatypeTag, root: i32) {
        let count = wire_count(count);
        tracing::trace!(comm = self.handle, count, ?dtype, root, "bcast");
        mpi_check!(ffi::infermpi_bcast(buf, count, dtype as i32, root, self.handle));
    }

    /// Broadcast a slice from `root` to all processes.
    ///
    /// Every process must pass a slice of the same length.
    pub fn bcast<T: MpiDatatype>(&self, data: &mut [T], root: i32) {
        unsafe { self.bcast_raw(data.as_mut_ptr().cast(), data.len(), T::TAG, root) }
    }

    /// Broadcast the whole contents of a host buffer as bytes.
    pub fn bcast_buffer<B: Buffer + ?Sized>(&self, buf: &mut B, root: i32) {
        host_only(&*buf, "bcast");
        let size = buf.size_in_bytes();
        unsafe { self.bcast_raw(buf.data_mut().cast(), size, DatatypeTag::Byte, root) }
    }

    /// Broadcast a single value using its datatype tag.
    pub fn bcast_value<T: MpiDatatype>(&self, value: &mut T, root: i32) {
        self.bcast(std::slice::from_mut(value), root);
    }

    /// Broadcast a plain-old-data value that has no datatype tag, as bytes.
    pub fn bcast_pod<T: Pod>(&self, value: &mut T, root: i32) {
        let bytes = bytemuck::bytes_of_mut(value);
        unsafe { self.bcast_raw(bytes.as_mut_ptr().cast(), bytes.len(), DatatypeTag::Byte, root) }
    }

    /// Broadcast a vector whose length only `root` knows.
    ///
    /// The root first broadcasts the length, the other processes resize
    /// their vector to match (new slots are `T::default()`), then the
    /// contents follow.
    pub fn bcast_vec<T: MpiDatatype>(&self, vec: &mut Vec<T>, root: i32) {
        let len = self.bcast_len(vec.len(), root);
        vec.resize(len, T::default());
        self.bcast(vec.as_mut_slice(), root);
    }

    /// Broadcast a vector of plain-old-data values, as bytes.
    ///
    /// Same length protocol as [`bcast_vec`](Self::bcast_vec); new slots are
    /// zeroed.
    pub fn bcast_pod_vec<T: Pod>(&self, vec: &mut Vec<T>, root: i32) {
        let len = self.bcast_len(vec.len(), root);
        vec.resize(len, T::zeroed());
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(vec.as_mut_slice());
        unsafe { self.bcast_raw(bytes.as_mut_ptr().cast(), bytes.len(), DatatypeTag::Byte, root) }
    }

    fn bcast_len(&self, local_len: usize, root: i32) -> usize {
        let mut len: i64 = if self.rank() == root {
            local_len as i64
        } else {
            0
        };
        self.bcast_value(&mut len, root);
        precondition!(len >= 0, "root broadcast a negative length {len}");
        len as usize
    }

    /// Start a nonblocking broadcast of `count` elements of `dtype`.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for reads and writes of
    /// `count * dtype.size_in_bytes()` host bytes until the returned request
    /// completes, and must not be accessed in the meantime.
    pub unsafe fn ibcast_raw(
        &self,
        buf: *mut c_void,
        count: usize,
        dtype: DatatypeTag,
        root: i32,
    ) -> Request {
        let count = wire_count(count);
        let mut request: i64 = 0;
        tracing::trace!(comm = self.handle, count, ?dtype, root, "ibcast");
        mpi_check!(ffi::infermpi_ibcast(
            buf,
            count,
            dtype as i32,
            root,
            self.handle,
            &mut request
        ));
        Request::new(request, ())
    }

    /// Start a nonblocking broadcast of a vector.
    ///
    /// The vector is held by the returned request and handed back by
    /// [`Request::wait`]. Lengths must already agree on every process.
    pub fn ibcast<T: MpiDatatype>(&self, mut data: Vec<T>, root: i32) -> Request<Vec<T>> {
        let request =
            unsafe { self.ibcast_raw(data.as_mut_ptr().cast(), data.len(), T::TAG, root) };
        Request::new(request.into_raw_handle(), data)
    }

    /// Start a nonblocking byte broadcast of a host buffer.
    pub fn ibcast_buffer<B: Buffer>(&self, mut buf: B, root: i32) -> Request<B> {
        host_only(&buf, "ibcast");
        let size = buf.size_in_bytes();
        let request =
            unsafe { self.ibcast_raw(buf.data_mut().cast(), size, DatatypeTag::Byte, root) };
        Request::new(request.into_raw_handle(), buf)
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Blocking send of `count` elements of `dtype` to `dest`.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for reads of `count * dtype.size_in_bytes()` host bytes.
    pub unsafe fn send_raw(
        &self,
        buf: *const c_void,
        count: usize,
        dtype: DatatypeTag,
        dest: i32,
        tag: i32,
    ) {
        let count = wire_count(count);
        tracing::trace!(comm = self.handle, count, ?dtype, dest, tag, "send");
        mpi_check!(ffi::infermpi_send(buf, count, dtype as i32, dest, tag, self.handle));
    }

    /// Send a slice to `dest`; `tag` separates logical channels between the
    /// same pair of ranks.
    pub fn send<T: MpiDatatype>(&self, data: &[T], dest: i32, tag: i32) {
        unsafe { self.send_raw(data.as_ptr().cast(), data.len(), T::TAG, dest, tag) }
    }

    /// Send a single value using its datatype tag.
    pub fn send_value<T: MpiDatatype>(&self, value: &T, dest: i32, tag: i32) {
        self.send(std::slice::from_ref(value), dest, tag);
    }

    /// Send a plain-old-data value that has no datatype tag, as bytes.
    pub fn send_pod<T: Pod>(&self, value: &T, dest: i32, tag: i32) {
        let bytes = bytemuck::bytes_of(value);
        unsafe { self.send_raw(bytes.as_ptr().cast(), bytes.len(), DatatypeTag::Byte, dest, tag) }
    }

    /// Send the whole contents of a host buffer as bytes.
    pub fn send_buffer<B: Buffer + ?Sized>(&self, buf: &B, dest: i32, tag: i32) {
        host_only(buf, "send");
        unsafe {
            self.send_raw(
                buf.data().cast(),
                buf.size_in_bytes(),
                DatatypeTag::Byte,
                dest,
                tag,
            )
        }
    }

    /// Blocking receive of up to `count` elements of `dtype`.
    ///
    /// Use [`ANY_SOURCE`](crate::ANY_SOURCE) / [`ANY_TAG`](crate::ANY_TAG)
    /// as wildcards.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for writes of `count * dtype.size_in_bytes()` host bytes.
    pub unsafe fn recv_raw(
        &self,
        buf: *mut c_void,
        count: usize,
        dtype: DatatypeTag,
        source: i32,
        tag: i32,
    ) -> Status {
        let count = wire_count(count);
        let mut status = Status {
            source: 0,
            tag: 0,
            error: 0,
            bytes: 0,
        };
        tracing::trace!(comm = self.handle, count, ?dtype, source, tag, "recv");
        mpi_check!(ffi::infermpi_recv(
            buf,
            count,
            dtype as i32,
            source,
            tag,
            self.handle,
            &mut status.source,
            &mut status.tag,
            &mut status.error,
            &mut status.bytes
        ));
        status
    }

    /// Receive into a slice. The message may be shorter than the slice; see
    /// [`Status::count`].
    pub fn recv<T: MpiDatatype>(&self, data: &mut [T], source: i32, tag: i32) -> Status {
        unsafe { self.recv_raw(data.as_mut_ptr().cast(), data.len(), T::TAG, source, tag) }
    }

    /// Receive a single value using its datatype tag.
    pub fn recv_value<T: MpiDatatype>(&self, value: &mut T, source: i32, tag: i32) -> Status {
        self.recv(std::slice::from_mut(value), source, tag)
    }

    /// Receive a plain-old-data value that has no datatype tag, as bytes.
    pub fn recv_pod<T: Pod>(&self, value: &mut T, source: i32, tag: i32) -> Status {
        let bytes = bytemuck::bytes_of_mut(value);
        unsafe {
            self.recv_raw(
                bytes.as_mut_ptr().cast(),
                bytes.len(),
                DatatypeTag::Byte,
                source,
                tag,
            )
        }
    }

    /// Receive into a host buffer as bytes.
    pub fn recv_buffer<B: Buffer + ?Sized>(&self, buf: &mut B, source: i32, tag: i32) -> Status {
        host_only(&*buf, "recv");
        let size = buf.size_in_bytes();
        unsafe { self.recv_raw(buf.data_mut().cast(), size, DatatypeTag::Byte, source, tag) }
    }

    /// Block until a matching message arrives and claim it without
    /// receiving the payload.
    ///
    /// The returned [`Message`] can only be received through itself, so no
    /// other receive on this communicator can steal it in between.
    pub fn mprobe(&self, source: i32, tag: i32) -> (Message, Status) {
        let mut handle: i64 = 0;
        let mut status = Status {
            source: 0,
            tag: 0,
            error: 0,
            bytes: 0,
        };
        tracing::trace!(comm = self.handle, source, tag, "mprobe");
        mpi_check!(unsafe {
            ffi::infermpi_mprobe(
                source,
                tag,
                self.handle,
                &mut handle,
                &mut status.source,
                &mut status.tag,
                &mut status.error,
                &mut status.bytes,
            )
        });
        (Message::new(handle, status), status)
    }

    // ========================================================================
    // Reductions and gathers
    // ========================================================================

    /// Element-wise reduction of `count` elements across all processes,
    /// result on every process.
    ///
    /// # Safety
    ///
    /// `send` must be valid for reads and `recv` for writes of
    /// `count * dtype.size_in_bytes()` host bytes; they must not overlap.
    pub unsafe fn allreduce_raw(
        &self,
        send: *const c_void,
        recv: *mut c_void,
        count: usize,
        dtype: DatatypeTag,
        op: ReduceOp,
    ) {
        let count = wire_count(count);
        tracing::trace!(comm = self.handle, count, ?dtype, ?op, "allreduce");
        mpi_check!(ffi::infermpi_allreduce(
            send,
            recv,
            count,
            dtype as i32,
            op as i32,
            self.handle
        ));
    }

    /// All-reduce `send` into `recv`. Both slices must have the same length.
    pub fn allreduce<T: MpiDatatype>(&self, send: &[T], recv: &mut [T], op: ReduceOp) {
        precondition!(
            send.len() == recv.len(),
            "allreduce send has {} elements, recv has {}",
            send.len(),
            recv.len()
        );
        unsafe {
            self.allreduce_raw(
                send.as_ptr().cast(),
                recv.as_mut_ptr().cast(),
                send.len(),
                T::TAG,
                op,
            )
        }
    }

    /// All-reduce a slice in place.
    pub fn allreduce_in_place<T: MpiDatatype>(&self, data: &mut [T], op: ReduceOp) {
        let count = wire_count(data.len());
        tracing::trace!(comm = self.handle, count, dtype = ?T::TAG, ?op, "allreduce in place");
        mpi_check!(unsafe {
            ffi::infermpi_allreduce_inplace(
                data.as_mut_ptr().cast(),
                count,
                T::TAG as i32,
                op as i32,
                self.handle,
            )
        });
    }

    /// All-reduce a single value.
    pub fn allreduce_value<T: MpiDatatype>(&self, value: T, op: ReduceOp) -> T {
        let mut result = T::default();
        self.allreduce(
            std::slice::from_ref(&value),
            std::slice::from_mut(&mut result),
            op,
        );
        result
    }

    /// Concatenate `count` elements from every process, in rank order, into
    /// every process's receive buffer.
    ///
    /// # Safety
    ///
    /// `send` must be valid for reads of `count` elements and `recv` for
    /// writes of `count * size()` elements of `dtype`.
    pub unsafe fn allgather_raw(
        &self,
        send: *const c_void,
        recv: *mut c_void,
        count: usize,
        dtype: DatatypeTag,
    ) {
        let count = wire_count(count);
        tracing::trace!(comm = self.handle, count, ?dtype, "allgather");
        mpi_check!(ffi::infermpi_allgather(
            send,
            recv,
            count,
            dtype as i32,
            self.handle
        ));
    }

    /// All-gather: `recv` must hold `send.len() * size()` elements.
    pub fn allgather<T: MpiDatatype>(&self, send: &[T], recv: &mut [T]) {
        let size = self.size() as usize;
        precondition!(
            recv.len() == send.len() * size,
            "allgather recv has {} elements, expected {} ({} x {size} ranks)",
            recv.len(),
            send.len() * size,
            send.len()
        );
        unsafe {
            self.allgather_raw(
                send.as_ptr().cast(),
                recv.as_mut_ptr().cast(),
                send.len(),
                T::TAG,
            )
        }
    }

    /// Gather one value from every process, indexed by rank.
    pub fn allgather_value<T: MpiDatatype>(&self, value: T) -> Vec<T> {
        let mut all = vec![T::default(); self.size() as usize];
        self.allgather(std::slice::from_ref(&value), &mut all);
        all
    }
}

impl PartialEq for Communicator {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Communicator {}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("handle", &self.handle)
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for Communicator {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if ffi::finalized() {
            tracing::debug!(handle = self.handle, "MPI finalized, not freeing communicator");
            return;
        }
        let ret = unsafe { ffi::infermpi_comm_free(self.handle) };
        if ret == 0 {
            tracing::debug!(handle = self.handle, "freed communicator");
        } else {
            tracing::warn!(
                handle = self.handle,
                code = ret,
                error = %Error::from_code(ret),
                "MPI_Comm_free failed"
            );
        }
    }
}

// Communicators are not Send or Sync
// (MPI calls must come from the thread that initialized MPI)

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{HostBuffer, MemoryType};

    /// Stand-in for a device allocation; its pointers must never be used.
    struct DeviceBuffer {
        size: usize,
    }

    unsafe impl Buffer for DeviceBuffer {
        fn memory_type(&self) -> MemoryType {
            MemoryType::Gpu
        }

        fn size_in_bytes(&self) -> usize {
            self.size
        }

        fn data(&self) -> *const u8 {
            std::ptr::null()
        }

        fn data_mut(&mut self) -> *mut u8 {
            std::ptr::null_mut()
        }
    }

    /// A borrowed handle; dropping it never reaches the runtime.
    fn borrowed(handle: i32) -> Communicator {
        unsafe { Communicator::from_raw(handle, false) }
    }

    #[test]
    #[should_panic(expected = "device-resident buffer (64 bytes) passed to host-only send")]
    fn send_rejects_device_buffer() {
        borrowed(0).send_buffer(&DeviceBuffer { size: 64 }, 1, 0);
    }

    #[test]
    #[should_panic(expected = "passed to host-only recv")]
    fn recv_rejects_device_buffer() {
        borrowed(0).recv_buffer(&mut DeviceBuffer { size: 8 }, 0, 0);
    }

    #[test]
    #[should_panic(expected = "passed to host-only bcast")]
    fn bcast_rejects_device_buffer() {
        borrowed(0).bcast_buffer(&mut DeviceBuffer { size: 8 }, 0);
    }

    #[test]
    #[should_panic(expected = "passed to host-only ibcast")]
    fn ibcast_rejects_device_buffer() {
        let _request = borrowed(0).ibcast_buffer(DeviceBuffer { size: 8 }, 0);
    }

    #[test]
    #[should_panic(expected = "allreduce send has 3 elements, recv has 2")]
    fn allreduce_rejects_mismatched_lengths() {
        let mut recv = [0i32; 2];
        borrowed(0).allreduce(&[1, 2, 3], &mut recv, ReduceOp::Sum);
    }

    #[test]
    #[should_panic(expected = "split color must be non-negative")]
    fn split_rejects_negative_color() {
        let _ = borrowed(0).split(-3, 0);
    }

    #[test]
    fn host_buffer_passes_host_check() {
        host_only(&HostBuffer::zeroed(4), "send");
        host_only(&HostBuffer::pinned(vec![0; 4]), "send");
    }

    #[test]
    fn move_transfers_ownership() {
        // `into_raw` at the end keeps Drop from reaching the runtime.
        let first = unsafe { Communicator::from_raw(11, true) };
        assert!(first.owns_handle());

        let second = first; // `first` can no longer release the handle
        let mut slot = Some(second);
        let mut held: Vec<Communicator> = Vec::new();
        held.push(slot.take().unwrap());
        assert!(slot.is_none());

        let last = held.pop().unwrap();
        assert!(held.is_empty());
        assert!(last.owns_handle(), "ownership must travel with the value");
        assert_eq!(last.raw_handle(), 11);
        assert_eq!(last.into_raw(), 11);
    }

    #[test]
    fn borrowed_handle_stays_borrowed_when_moved() {
        let world = borrowed(0);
        let moved = world;
        assert!(!moved.owns_handle());
        assert_eq!(moved.raw_handle(), 0);
    }

    #[test]
    fn into_raw_releases_ownership() {
        // An owned handle that is never freed: `into_raw` skips Drop.
        let owned = unsafe { Communicator::from_raw(42, true) };
        assert!(owned.owns_handle());
        assert_eq!(owned.into_raw(), 42);
    }

    #[test]
    fn equality_compares_handles() {
        assert_eq!(borrowed(0), borrowed(0));
        assert_ne!(borrowed(0), borrowed(3));
        let owned = unsafe { Communicator::from_raw(3, true) };
        assert_eq!(borrowed(3), owned);
        let _ = owned.into_raw();
    }

    #[test]
    fn wire_count_accepts_int_range() {
        assert_eq!(wire_count(0), 0);
        assert_eq!(wire_count(i32::MAX as usize), i32::MAX as i64);
    }

    #[test]
    #[should_panic(expected = "exceeds the MPI count limit")]
    fn wire_count_rejects_overflow() {
        wire_count(i32::MAX as usize + 1);
    }
}
