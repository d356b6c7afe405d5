//! Raw FFI bindings to the C shim in `csrc/infermpi.c`.
//!
//! These are low-level unsafe functions. Use the safe wrappers in the parent module.

#![allow(dead_code)]

use std::os::raw::{c_char, c_double, c_int, c_void};

/// Upper bound of `MPI_MAX_ERROR_STRING` / `MPI_MAX_PROCESSOR_NAME` /
/// `MPI_MAX_LIBRARY_VERSION_STRING` across MPICH and Open MPI.
pub(crate) const STRING_BUF_LEN: usize = 8192;

extern "C" {
    // ============================================================
    // Environment
    // ============================================================

    pub fn infermpi_init_thread(required: c_int, provided: *mut c_int) -> c_int;
    pub fn infermpi_query_thread(provided: *mut c_int) -> c_int;
    pub fn infermpi_finalize() -> c_int;
    pub fn infermpi_initialized(flag: *mut c_int) -> c_int;
    pub fn infermpi_finalized(flag: *mut c_int) -> c_int;
    pub fn infermpi_get_version(version: *mut c_char, len: *mut i32) -> c_int;
    pub fn infermpi_get_processor_name(name: *mut c_char, len: *mut i32) -> c_int;
    pub fn infermpi_wtime() -> c_double;
    pub fn infermpi_abort(comm: i32, errorcode: i32) -> c_int;
    pub fn infermpi_error_string(code: c_int, message: *mut c_char, len: *mut i32) -> c_int;

    // ============================================================
    // Communicators
    // ============================================================

    pub fn infermpi_comm_world() -> i32;
    pub fn infermpi_comm_rank(comm: i32, rank: *mut i32) -> c_int;
    pub fn infermpi_comm_size(comm: i32, size: *mut i32) -> c_int;
    pub fn infermpi_comm_split(comm: i32, color: i32, key: i32, newcomm: *mut i32) -> c_int;
    pub fn infermpi_comm_free(comm: i32) -> c_int;
    pub fn infermpi_comm_errors_return(comm: i32, flag: *mut i32) -> c_int;

    // ============================================================
    // Synchronization
    // ============================================================

    pub fn infermpi_barrier(comm: i32) -> c_int;

    // ============================================================
    // Point-to-Point
    // ============================================================

    pub fn infermpi_send(
        buf: *const c_void,
        count: i64,
        datatype: i32,
        dest: i32,
        tag: i32,
        comm: i32,
    ) -> c_int;

    pub fn infermpi_recv(
        buf: *mut c_void,
        count: i64,
        datatype: i32,
        source: i32,
        tag: i32,
        comm: i32,
        actual_source: *mut i32,
        actual_tag: *mut i32,
        actual_error: *mut i32,
        actual_bytes: *mut i64,
    ) -> c_int;

    pub fn infermpi_mprobe(
        source: i32,
        tag: i32,
        comm: i32,
        message: *mut i64,
        actual_source: *mut i32,
        actual_tag: *mut i32,
        actual_error: *mut i32,
        actual_bytes: *mut i64,
    ) -> c_int;

    pub fn infermpi_mrecv(
        buf: *mut c_void,
        count: i64,
        datatype: i32,
        message: i64,
        actual_source: *mut i32,
        actual_tag: *mut i32,
        actual_error: *mut i32,
        actual_bytes: *mut i64,
    ) -> c_int;

    // ============================================================
    // Collectives
    // ============================================================

    pub fn infermpi_bcast(
        buf: *mut c_void,
        count: i64,
        datatype: i32,
        root: i32,
        comm: i32,
    ) -> c_int;

    pub fn infermpi_ibcast(
        buf: *mut c_void,
        count: i64,
        datatype: i32,
        root: i32,
        comm: i32,
        request: *mut i64,
    ) -> c_int;

    pub fn infermpi_allreduce(
        sendbuf: *const c_void,
        recvbuf: *mut c_void,
        count: i64,
        datatype: i32,
        op: i32,
        comm: i32,
    ) -> c_int;

    pub fn infermpi_allreduce_inplace(
        buf: *mut c_void,
        count: i64,
        datatype: i32,
        op: i32,
        comm: i32,
    ) -> c_int;

    pub fn infermpi_allgather(
        sendbuf: *const c_void,
        recvbuf: *mut c_void,
        count: i64,
        datatype: i32,
        comm: i32,
    ) -> c_int;

    // ============================================================
    // Requests
    // ============================================================

    pub fn infermpi_wait(request: i64) -> c_int;
    pub fn infermpi_test(request: i64, flag: *mut i32) -> c_int;
    pub fn infermpi_waitall(count: i64, requests: *mut i64) -> c_int;
}

/// Read a string the runtime writes into a caller-provided buffer.
///
/// `fill` receives the buffer and a length out-parameter and returns an MPI
/// code. Returns `None` on failure or if the bytes are not UTF-8.
pub(crate) fn read_string(fill: impl FnOnce(*mut c_char, *mut i32) -> c_int) -> Option<String> {
    let mut buf = vec![0u8; STRING_BUF_LEN];
    let mut len: i32 = 0;
    if fill(buf.as_mut_ptr().cast::<c_char>(), &mut len) != 0 {
        return None;
    }
    let len = (len.max(0) as usize).min(buf.len());
    std::str::from_utf8(&buf[..len])
        .ok()
        .map(|s| s.trim_end_matches('\0').trim_end().to_string())
}

/// Text for an MPI or shim error code.
pub(crate) fn error_string(code: i32) -> Option<String> {
    read_string(|buf, len| unsafe { infermpi_error_string(code, buf, len) })
}

/// Whether `MPI_Finalize` has already run.
pub(crate) fn finalized() -> bool {
    let mut flag: c_int = 0;
    unsafe { infermpi_finalized(&mut flag) };
    flag != 0
}
