//! Integration test for communicator splitting.
//!
//! Exercises split (color/key semantics, size accounting, key ordering),
//! split_optional (ranks opting out), nested splits and ownership of the
//! resulting handles.
//!
//! Run with: mpiexec -n 4 ./target/debug/examples/test_comm_split

use infermpi::{Mpi, ReduceOp};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mpi = Mpi::init().expect("MPI init failed");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        std::process::abort();
    }));

    let world = mpi.world();
    let rank = world.rank();
    let size = world.size();

    assert!(size >= 2, "test_comm_split requires at least 2 processes");

    // ========================================================================
    // Test 1: split by parity; group sizes add up to the world size
    // ========================================================================
    {
        let color = rank % 2;
        let group = world.split(color, rank);
        assert!(group.owns_handle(), "split result must own its handle");

        let expected_size = (0..size).filter(|r| r % 2 == color).count() as i32;
        assert_eq!(group.size(), expected_size, "rank {rank}: group size");
        assert_eq!(group.rank(), rank / 2, "rank {rank}: group rank");

        // One leader per group reports its size; the totals must cover world.
        let leader_size = if group.rank() == 0 { group.size() } else { 0 };
        let covered = world.allreduce_value(leader_size, ReduceOp::Sum);
        assert_eq!(covered, size, "rank {rank}: groups must partition world");

        let group_sum = group.allreduce_value(rank, ReduceOp::Sum);
        let expected_sum: i32 = (0..size).filter(|r| r % 2 == color).sum();
        assert_eq!(group_sum, expected_sum, "rank {rank}: group allreduce");

        if rank == 0 {
            println!("PASS: split by parity");
        }
    }

    // ========================================================================
    // Test 2: key orders ranks within the new group
    // ========================================================================
    {
        let reversed = world.split(0, size - rank);
        assert_eq!(reversed.size(), size);
        assert_eq!(
            reversed.rank(),
            size - 1 - rank,
            "rank {rank}: descending key must reverse the order"
        );

        // Equal keys fall back to the order in the parent.
        let tied = world.split(0, 0);
        assert_eq!(tied.rank(), rank, "rank {rank}: tied keys keep parent order");

        if rank == 0 {
            println!("PASS: split key ordering");
        }
    }

    // ========================================================================
    // Test 3: split_optional lets ranks stay out of the new group
    // ========================================================================
    {
        let color = (rank % 2 == 0).then_some(0);
        let evens = world.split_optional(color, rank);
        match evens {
            Some(comm) => {
                assert_eq!(rank % 2, 0, "rank {rank}: odd rank joined evens");
                assert_eq!(comm.size(), (size + 1) / 2);
                assert_eq!(comm.rank(), rank / 2);
            }
            None => assert_eq!(rank % 2, 1, "rank {rank}: even rank left out"),
        }
        if rank == 0 {
            println!("PASS: split_optional");
        }
    }

    // ========================================================================
    // Test 4: nested split and singleton groups
    // ========================================================================
    {
        let halves = world.split(rank / 2, rank);
        let single = halves.split(halves.rank(), 0);
        assert_eq!(single.size(), 1, "rank {rank}: singleton size");
        assert_eq!(single.rank(), 0, "rank {rank}: singleton rank");

        let mut value = rank * 3;
        single.bcast_value(&mut value, 0);
        assert_eq!(value, rank * 3, "rank {rank}: singleton bcast");

        // Inner communicator dropped before the outer one; both are freed once.
        drop(single);
        drop(halves);

        if rank == 0 {
            println!("PASS: nested split");
        }
    }

    world.barrier();
    if rank == 0 {
        println!("\n========================================");
        println!("All comm_split tests passed!");
        println!("========================================");
    }
}
