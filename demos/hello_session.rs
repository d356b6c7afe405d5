//! Hello session - initialize MPI, report in, and work inside a session group.
//!
//! Run with: mpiexec -n 4 cargo run --example hello_session
//!
//! Set `RUST_LOG=infermpi=debug` to see lifecycle events and
//! `INFERMPI_THREAD_LEVEL=multiple` to request a different thread level.

use infermpi::{Config, Mpi, ReduceOp};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), infermpi::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let mut mpi = Mpi::init_with(&config)?;

    let world_rank = mpi.world().rank();
    let world_size = mpi.world().size();
    let processor_name = mpi.world().processor_name()?;
    let version = Mpi::version()?;

    println!(
        "Hello from rank {} of {} on {} ({:?}, {})",
        world_rank,
        world_size,
        processor_name,
        mpi.thread_level(),
        version.lines().next().unwrap_or_default()
    );

    // Split the job into two replicas; each rank now sees only its own group.
    mpi.split_session(world_rank % 2, world_rank);
    let session = mpi.session();
    let replica_ranks = session.allreduce_value(1i32, ReduceOp::Sum);
    assert_eq!(replica_ranks, session.size());

    println!(
        "rank {} serves replica {} as member {} of {}",
        world_rank,
        world_rank % 2,
        session.rank(),
        session.size()
    );

    mpi.reset_session();
    mpi.world().barrier();

    if world_rank == 0 {
        println!("\nAll processes reported in. Test passed!");
    }

    // The session group is freed and MPI finalized when `mpi` is dropped
    Ok(())
}
