//! Fatal check-and-abort path.
//!
//! Transport failures and precondition violations are not recoverable in a
//! multi-process run: a rank that gives up while its peers sit in a
//! collective leaves the job hung. Both are reported with the call site and
//! then terminate the process.
//!
//! - [`mpi_check!`] wraps a shim call. A non-success code is logged as
//!   `Failed: MPI error <file>:<line> '<code>'` together with the runtime's
//!   message, then `MPI_Abort` brings the whole job down.
//! - [`precondition!`] guards caller-supplied arguments (device-resident
//!   buffers, mismatched lengths) and panics with the call site. Binaries
//!   built with `panic = "abort"`, or with an aborting panic hook, turn this
//!   into a process abort as well.

use crate::error::Error;
use crate::ffi;

/// Check the return code of a shim call; abort the job on failure.
macro_rules! mpi_check {
    ($call:expr) => {{
        let code: i32 = $call;
        if code != 0 {
            $crate::fatal::transport_failure(file!(), line!(), code);
        }
    }};
}

/// Assert a caller-side precondition, reporting the call site on failure.
macro_rules! precondition {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::fatal::precondition_failure(file!(), line!(), format_args!($($arg)+));
        }
    };
}

#[cold]
#[inline(never)]
pub(crate) fn transport_failure(file: &'static str, line: u32, code: i32) -> ! {
    let err = Error::from_code(code);
    tracing::error!(file, line, code, error = %err, "MPI call failed, aborting");
    eprintln!("Failed: MPI error {file}:{line} '{code}' ({err})");
    unsafe {
        ffi::infermpi_abort(ffi::infermpi_comm_world(), code);
    }
    // MPI_Abort is not required to terminate the caller.
    std::process::abort()
}

#[cold]
#[inline(never)]
pub(crate) fn precondition_failure(
    file: &'static str,
    line: u32,
    message: std::fmt::Arguments<'_>,
) -> ! {
    tracing::error!(file, line, "precondition violated: {message}");
    panic!("Failed: precondition {file}:{line}: {message}")
}

#[cfg(test)]
mod tests {
    #[test]
    #[should_panic(expected = "Failed: precondition")]
    fn precondition_reports_call_site() {
        let len = 3;
        precondition!(len == 4, "expected 4 elements, got {len}");
    }

    #[test]
    fn precondition_passes_silently() {
        precondition!(1 + 1 == 2, "arithmetic");
    }
}
