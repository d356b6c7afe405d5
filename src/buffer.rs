//! Memory buffers handed to the byte-level transport calls.
//!
//! Runtimes that own tensors (host arrays, pinned staging areas, device
//! allocations) implement [`Buffer`] so a whole allocation can be sent or
//! broadcast as raw bytes. The transport only ever reads and writes through
//! host pointers: no device-to-host staging happens in this crate, so
//! device-resident buffers are rejected at the call boundary.

/// Where a buffer's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    /// Device (GPU) memory, not addressable by the host.
    Gpu,
    /// Pageable host memory.
    Cpu,
    /// Page-locked host memory.
    Pinned,
    /// Unified memory, addressable from host and device.
    Uvm,
}

impl MemoryType {
    /// Whether the host cannot dereference this storage.
    pub const fn is_device_resident(self) -> bool {
        matches!(self, MemoryType::Gpu)
    }
}

/// A contiguous allocation that reports its location and size.
///
/// # Safety
///
/// `data()` must be valid for reads of `size_in_bytes()` bytes and
/// `data_mut()` valid for reads and writes of `size_in_bytes()` bytes for as
/// long as the borrow used to obtain them lives. The storage must not move
/// when the implementing value itself is moved (heap or device allocations
/// satisfy this; inline arrays do not), because nonblocking operations keep
/// using the pointer after taking ownership of the buffer. For
/// [`MemoryType::Gpu`] the pointers are never dereferenced by this crate.
pub unsafe trait Buffer {
    /// Storage location.
    fn memory_type(&self) -> MemoryType;

    /// Allocation size in bytes.
    fn size_in_bytes(&self) -> usize;

    /// Start of the allocation.
    fn data(&self) -> *const u8;

    /// Start of the allocation, writable.
    fn data_mut(&mut self) -> *mut u8;
}

/// An owned host allocation.
///
/// # Example
///
/// ```no_run
/// use infermpi::{HostBuffer, Mpi};
///
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// let mut weights = HostBuffer::zeroed(4096);
/// if world.rank() == 0 {
///     weights.as_mut_slice().fill(0x5a);
/// }
/// world.bcast_buffer(&mut weights, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBuffer {
    bytes: Vec<u8>,
    memory_type: MemoryType,
}

impl HostBuffer {
    /// A zero-filled pageable buffer.
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Wrap existing pageable bytes.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        HostBuffer {
            bytes,
            memory_type: MemoryType::Cpu,
        }
    }

    /// Wrap bytes that the caller has page-locked.
    pub fn pinned(bytes: Vec<u8>) -> Self {
        HostBuffer {
            bytes,
            memory_type: MemoryType::Pinned,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// View the contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable view of the contents.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Unwrap into the underlying bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

unsafe impl Buffer for HostBuffer {
    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    fn data(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    fn data_mut(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gpu_is_device_resident() {
        assert!(MemoryType::Gpu.is_device_resident());
        assert!(!MemoryType::Cpu.is_device_resident());
        assert!(!MemoryType::Pinned.is_device_resident());
        assert!(!MemoryType::Uvm.is_device_resident());
    }

    #[test]
    fn host_buffer_reports_size_and_location() {
        let mut buf = HostBuffer::zeroed(16);
        assert_eq!(buf.size_in_bytes(), 16);
        assert_eq!(buf.memory_type(), MemoryType::Cpu);
        buf.as_mut_slice()[3] = 9;
        assert_eq!(buf.as_slice()[3], 9);
        assert_eq!(buf.data(), buf.as_slice().as_ptr());

        let pinned = HostBuffer::pinned(vec![1, 2, 3]);
        assert_eq!(pinned.memory_type(), MemoryType::Pinned);
        assert_eq!(pinned.into_vec(), vec![1, 2, 3]);
    }
}
