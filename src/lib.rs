//! # infermpi
//!
//! Typed MPI communicators for multi-process inference (tensor- and
//! pipeline-parallel execution across ranks and machines).
//!
//! This crate wraps MPI through a thin C layer, providing:
//! - A compile-time mapping from element types to MPI datatypes ([`MpiDatatype`]),
//!   including `f16`, `bf16` and 8-bit floats
//! - Broadcast (blocking, nonblocking, and length-prefixed vectors),
//!   send/receive, matched probe, allreduce, allgather and barrier
//! - Owned or borrowed [`Communicator`] handles with split
//! - A process-wide [`Mpi`] handle carrying the world communicator and a
//!   replaceable session communicator
//!
//! ## Quick Start
//!
//! ```no_run
//! use infermpi::{Mpi, ReduceOp};
//!
//! fn main() -> Result<(), infermpi::Error> {
//!     let mpi = Mpi::init()?;
//!     let comm = mpi.session();
//!
//!     let rank = comm.rank();
//!     let size = comm.size();
//!     println!("rank {rank} of {size}");
//!
//!     // Root decides the prompt; everyone learns its length and contents.
//!     let mut prompt: Vec<i32> = if rank == 0 { vec![101, 7592, 102] } else { Vec::new() };
//!     comm.bcast_vec(&mut prompt, 0);
//!
//!     let ready = comm.allreduce_value(1i32, ReduceOp::Sum);
//!     assert_eq!(ready, size);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! A multi-process run cannot continue once one participant's transport
//! state is broken, so communication calls do not return `Result`:
//!
//! - a non-success return code from MPI is logged with file, line and code
//!   and the job is brought down with `MPI_Abort`;
//! - a precondition violation (device-resident buffer on a host-only path,
//!   mismatched slice lengths) panics with file and line. Run distributed
//!   binaries with `panic = "abort"` or an aborting panic hook so the other
//!   ranks do not hang.
//!
//! [`Error`] is returned only where a caller can react: initialization,
//! configuration and environment queries.
//!
//! ## Logging
//!
//! Events are emitted through [`tracing`]: `debug` for lifecycle changes,
//! `trace` for every call into MPI, `error` before aborting. Install any
//! subscriber to see them.
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `bf16`  | `half::bf16` elements | yes |
//! | `fp8`   | [`Fp8E4M3`] elements | yes |
//! | `debug` | Diagnostics from the C layer on stderr | no |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

#[macro_use]
mod fatal;

mod buffer;
mod comm;
mod config;
mod datatype;
mod error;
mod ffi;
mod message;
mod op;
mod request;
mod status;

pub use buffer::{Buffer, HostBuffer, MemoryType};
pub use comm::Communicator;
pub use config::{Config, THREAD_LEVEL_ENV};
#[cfg(feature = "fp8")]
pub use datatype::Fp8E4M3;
pub use datatype::{Byte, DatatypeTag, MpiChar, MpiDatatype};
pub use error::{Error, Result};
pub use message::Message;
pub use op::ReduceOp;
pub use request::Request;
pub use status::{Status, ANY_SOURCE, ANY_TAG};

use std::marker::PhantomData;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag tracking whether an [`Mpi`] handle is alive
static MPI_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// MPI thread support levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i32)]
pub enum ThreadLevel {
    /// Only single-threaded execution
    Single = 0,
    /// Multi-threaded, but MPI calls only from the initializing thread
    #[default]
    Funneled = 1,
    /// Multi-threaded, but MPI calls serialized by user
    Serialized = 2,
    /// Full multi-threaded support
    Multiple = 3,
}

impl ThreadLevel {
    fn from_index(index: c_int) -> Self {
        match index {
            0 => ThreadLevel::Single,
            1 => ThreadLevel::Funneled,
            2 => ThreadLevel::Serialized,
            _ => ThreadLevel::Multiple,
        }
    }
}

/// MPI environment handle.
///
/// Only one instance can exist at a time. It owns the process-wide state:
/// the world communicator and the session communicator, which defaults to
/// world and can be replaced to confine this process to a sub-group (for
/// example one pipeline stage, or an isolated group in tests). Components
/// that need distributed coordination take `&Mpi` or a `&Communicator`
/// from it; replacing the session requires `&mut Mpi`, so it can never
/// change underneath an outstanding borrow.
///
/// When dropped, the session override is freed and MPI is finalized if this
/// handle initialized it.
///
/// # Example
///
/// ```no_run
/// use infermpi::Mpi;
///
/// let mut mpi = Mpi::init().expect("Failed to initialize MPI");
/// let world_rank = mpi.world().rank();
///
/// // Two independent inference replicas, each with its own session.
/// mpi.split_session(world_rank % 2, world_rank);
/// println!("session rank {} of {}", mpi.session().rank(), mpi.session().size());
/// ```
pub struct Mpi {
    thread_level: ThreadLevel,
    /// Whether this handle called `MPI_Init_thread` (and must finalize)
    owns_runtime: bool,
    world: Communicator,
    session: Option<Communicator>,
    /// Marker to make Mpi !Send and !Sync
    _marker: PhantomData<*const ()>,
}

impl Mpi {
    /// Initialize MPI with [`ThreadLevel::Funneled`].
    ///
    /// # Errors
    ///
    /// Returns an error if MPI is already initialized or if initialization fails.
    pub fn init() -> Result<Self> {
        Self::init_thread(ThreadLevel::default())
    }

    /// Initialize MPI from a [`Config`] (see [`Config::from_env`]).
    pub fn init_with(config: &Config) -> Result<Self> {
        Self::init_thread(config.thread_level)
    }

    /// Initialize MPI requiring at least the `required` thread level.
    ///
    /// If the embedding application already initialized MPI, the running
    /// runtime is adopted and will not be finalized by this handle.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInitialized`] if another `Mpi` handle is alive
    /// - [`Error::Finalized`] if MPI was finalized earlier in this process
    /// - [`Error::ThreadLevelUnavailable`] if the runtime grants less than `required`
    /// - [`Error::Mpi`] if `MPI_Init_thread` fails
    pub fn init_thread(required: ThreadLevel) -> Result<Self> {
        if MPI_INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        match Self::start_runtime(required) {
            Ok((provided, owns_runtime)) => {
                tracing::debug!(?required, ?provided, owns_runtime, "MPI initialized");
                Ok(Mpi {
                    thread_level: provided,
                    owns_runtime,
                    world: Communicator::world(),
                    session: None,
                    _marker: PhantomData,
                })
            }
            Err(err) => {
                MPI_INITIALIZED.store(false, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    fn start_runtime(required: ThreadLevel) -> Result<(ThreadLevel, bool)> {
        // MPI_Initialized stays true after MPI_Finalize, and no other MPI
        // call is allowed once finalized.
        if ffi::finalized() {
            return Err(Error::Finalized);
        }

        let mut provided: c_int = 0;
        let owns_runtime = !Self::is_initialized();
        if owns_runtime {
            let ret = unsafe { ffi::infermpi_init_thread(required as c_int, &mut provided) };
            if ret != 0 && Self::is_initialized() {
                // Initialized, but the world error handler could not be installed.
                unsafe { ffi::infermpi_finalize() };
            }
            Error::check(ret)?;
        } else {
            let ret = unsafe { ffi::infermpi_query_thread(&mut provided) };
            Error::check(ret)?;
        }

        let provided = ThreadLevel::from_index(provided);
        if provided < required {
            if owns_runtime {
                unsafe { ffi::infermpi_finalize() };
            }
            return Err(Error::ThreadLevelUnavailable { required, provided });
        }
        Ok((provided, owns_runtime))
    }

    /// Get the thread support level that was provided.
    pub fn thread_level(&self) -> ThreadLevel {
        self.thread_level
    }

    /// Whether this handle initialized MPI (rather than adopting it).
    pub fn owns_runtime(&self) -> bool {
        self.owns_runtime
    }

    /// The communicator spanning every process (`MPI_COMM_WORLD`).
    pub fn world(&self) -> &Communicator {
        &self.world
    }

    /// The communicator this process works in: the override installed with
    /// [`set_session`](Self::set_session), or [`world`](Self::world).
    pub fn session(&self) -> &Communicator {
        self.session.as_ref().unwrap_or(&self.world)
    }

    /// Whether a session override is installed.
    pub fn has_session_override(&self) -> bool {
        self.session.is_some()
    }

    /// Make `comm` the session communicator, returning the previous override.
    pub fn set_session(&mut self, comm: Communicator) -> Option<Communicator> {
        tracing::debug!(handle = comm.raw_handle(), "session communicator replaced");
        self.session.replace(comm)
    }

    /// Restore the world communicator as the session, returning the override.
    pub fn reset_session(&mut self) -> Option<Communicator> {
        tracing::debug!("session communicator reset to world");
        self.session.take()
    }

    /// Split the current session and install this process's group as the
    /// new session. Collective over the current session.
    ///
    /// Returns the previous override, if any.
    pub fn split_session(&mut self, color: i32, key: i32) -> Option<Communicator> {
        let group = self.session().split(color, key);
        self.set_session(group)
    }

    /// Get the current wall-clock time.
    ///
    /// This is a high-resolution timer suitable for benchmarking.
    pub fn wtime() -> f64 {
        unsafe { ffi::infermpi_wtime() }
    }

    /// Get the MPI library version string.
    pub fn version() -> Result<String> {
        ffi::read_string(|buf, len| unsafe { ffi::infermpi_get_version(buf, len) })
            .ok_or_else(|| Error::Internal("could not read MPI library version".into()))
    }

    /// Version of the MPI package found at build time, if pkg-config reported one.
    pub fn build_version() -> Option<&'static str> {
        option_env!("MPI_VERSION")
    }

    /// Check if MPI has been initialized.
    pub fn is_initialized() -> bool {
        let mut flag: c_int = 0;
        unsafe { ffi::infermpi_initialized(&mut flag) };
        flag != 0
    }

    /// Check if MPI has been finalized.
    pub fn is_finalized() -> bool {
        ffi::finalized()
    }
}

impl Drop for Mpi {
    fn drop(&mut self) {
        // Communicators must be freed before MPI_Finalize.
        drop(self.session.take());
        if self.owns_runtime && !ffi::finalized() {
            let ret = unsafe { ffi::infermpi_finalize() };
            if ret == 0 {
                tracing::debug!("MPI finalized");
            } else {
                tracing::warn!(code = ret, "MPI_Finalize failed");
            }
        }
        MPI_INITIALIZED.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    // Anything touching the runtime runs under mpiexec via the demos/ binaries:
    // cargo build --examples && mpiexec -n 4 ./target/debug/examples/test_collectives
    use super::*;

    #[test]
    fn thread_levels_are_ordered() {
        assert!(ThreadLevel::Single < ThreadLevel::Funneled);
        assert!(ThreadLevel::Funneled < ThreadLevel::Serialized);
        assert!(ThreadLevel::Serialized < ThreadLevel::Multiple);
        assert_eq!(ThreadLevel::default(), ThreadLevel::Funneled);
    }

    #[test]
    fn thread_level_index_round_trips() {
        for level in [
            ThreadLevel::Single,
            ThreadLevel::Funneled,
            ThreadLevel::Serialized,
            ThreadLevel::Multiple,
        ] {
            assert_eq!(ThreadLevel::from_index(level as c_int), level);
        }
    }
}
