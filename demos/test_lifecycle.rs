//! Integration test for the MPI environment handle.
//!
//! Exercises Mpi::init_with, version, wtime, is_initialized, is_finalized,
//! thread_level, world, error-handler installation, the session override
//! (set, split, reset), moving owned communicators, and the refusal to
//! initialize again after finalize.
//!
//! Run with: mpiexec -n 2 ./target/debug/examples/test_lifecycle

use infermpi::{Config, Error, Mpi, ReduceOp, ThreadLevel};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut mpi = Mpi::init_with(&Config::new(ThreadLevel::Funneled)).expect("MPI init failed");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        std::process::abort();
    }));

    // Test is_initialized / is_finalized
    assert!(Mpi::is_initialized(), "is_initialized should be true after init");
    assert!(!Mpi::is_finalized(), "is_finalized should be false before drop");
    assert!(mpi.owns_runtime(), "this handle initialized MPI");
    println!("PASS: is_initialized / is_finalized");

    // A second handle is refused while the first is alive
    match Mpi::init() {
        Err(Error::AlreadyInitialized) => println!("PASS: second init refused"),
        Err(other) => panic!("unexpected error from second init: {other}"),
        Ok(_) => panic!("second init must fail"),
    }

    // Test thread_level
    let level = mpi.thread_level();
    assert!(level >= ThreadLevel::Funneled, "thread_level should be >= Funneled");
    println!("PASS: thread_level = {:?}", level);

    // Test version
    let version = Mpi::version().expect("version() failed");
    assert!(!version.is_empty(), "version string should not be empty");
    println!("PASS: version = {}", version.lines().next().unwrap_or_default());
    if let Some(build) = Mpi::build_version() {
        println!("PASS: built against MPI {build}");
    }

    // Test wtime
    let t1 = Mpi::wtime();
    assert!(t1 > 0.0, "wtime should return positive value");
    let t2 = Mpi::wtime();
    assert!(t2 >= t1, "wtime should be monotonic");
    println!("PASS: wtime = {}", t1);

    // Test world
    let rank = mpi.world().rank();
    let size = mpi.world().size();
    assert!(rank >= 0 && rank < size, "rank should be in [0, size)");
    assert!(!mpi.world().owns_handle(), "world is never freed");
    println!("PASS: world rank={} size={}", rank, size);

    // Failures come back as codes so they are reported with the call site
    assert!(mpi.world().returns_error_codes(), "world must return error codes");
    assert!(
        mpi.world().split(0, rank).returns_error_codes(),
        "split communicators must return error codes"
    );
    println!("PASS: error handler returns codes");

    // Session defaults to world
    assert!(!mpi.has_session_override());
    assert_eq!(mpi.session(), mpi.world());
    println!("PASS: session defaults to world");

    // Install a singleton session; collectives on it only involve this rank
    let alone = mpi.world().split(rank, 0);
    let previous = mpi.set_session(alone);
    assert!(previous.is_none());
    assert!(mpi.has_session_override());
    assert_eq!(mpi.session().size(), 1);
    assert_eq!(mpi.session().allreduce_value(rank, ReduceOp::Sum), rank);
    println!("PASS: set_session");

    // split_session replaces the override and hands back the old one
    let replaced = mpi.split_session(0, 0);
    assert!(replaced.is_some(), "split_session must return the old override");
    drop(replaced);
    assert_eq!(mpi.session().size(), 1);
    println!("PASS: split_session");

    // reset_session restores world and returns the override, still owned
    let taken = mpi.reset_session().expect("override was installed");
    assert!(taken.owns_handle());
    assert_eq!(mpi.session(), mpi.world());
    assert_eq!(mpi.session().size(), size);
    println!("PASS: reset_session");

    // Moving an owned communicator transfers the handle; it is freed once
    let moved = vec![taken];
    let handle = moved[0].raw_handle();
    let back = moved.into_iter().next().expect("one communicator");
    assert_eq!(back.raw_handle(), handle);
    drop(back);
    println!("PASS: owned communicator moved and freed");

    // Leave a session installed; Mpi frees it before finalizing
    mpi.split_session(rank % 2, rank);
    mpi.world().barrier();

    if rank == 0 {
        println!("\n========================================");
        println!("All lifecycle tests passed!");
        println!("========================================");
    }

    drop(mpi);
    assert!(Mpi::is_finalized(), "is_finalized should be true after drop");

    // MPI cannot be restarted once finalized
    match Mpi::init() {
        Err(Error::Finalized) => {}
        Err(other) => panic!("unexpected error from init after finalize: {other}"),
        Ok(_) => panic!("init after finalize must fail"),
    }
    // A refused init clears the handle flag, so the answer is the same again
    assert!(
        matches!(Mpi::init(), Err(Error::Finalized)),
        "second init after finalize must also report Finalized"
    );
    if rank == 0 {
        println!("PASS: init after finalize refused");
    }
}
