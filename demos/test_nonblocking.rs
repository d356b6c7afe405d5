//! Integration test for nonblocking broadcast and request handling.
//!
//! Exercises ibcast over owned vectors and host buffers, Request::wait,
//! Request::test, Request::wait_all, and dropping an unfinished request.
//!
//! Run with: mpiexec -n 4 ./target/debug/examples/test_nonblocking

use infermpi::{HostBuffer, Mpi, Request};
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

    assert!(size >= 2, "test_nonblocking requires at least 2 processes");

    // ========================================================================
    // Test 1: ibcast + wait hands the buffer back
    // ========================================================================
    {
        let data = if rank == 0 {
            (0..1024).map(|i| i as f32).collect()
        } else {
            vec![0.0f32; 1024]
        };
        let request = world.ibcast(data, 0);
        assert!(!request.is_completed());
        let data = request.wait();
        for (i, &v) in data.iter().enumerate() {
            assert!((v - i as f32).abs() < f32::EPSILON, "rank {rank}: ibcast[{i}]");
        }
        if rank == 0 {
            println!("PASS: ibcast/wait");
        }
    }

    // ========================================================================
    // Test 2: test() polls until completion
    // ========================================================================
    {
        let root = size - 1;
        let data = if rank == root { vec![7u64; 32] } else { vec![0u64; 32] };
        let mut request = world.ibcast(data, root);
        let mut polls = 0u64;
        while !request.test() {
            polls += 1;
            std::hint::spin_loop();
        }
        assert!(request.is_completed());
        let data = request.wait();
        assert!(data.iter().all(|&v| v == 7), "rank {rank}: ibcast after test");
        tracing::debug!(rank, polls, "ibcast completed");
        if rank == 0 {
            println!("PASS: test");
        }
    }

    // ========================================================================
    // Test 3: several ibcasts in flight, completed with wait_all
    // ========================================================================
    {
        let requests: Vec<Request<Vec<i32>>> = (0..size)
            .map(|root| {
                let data = if rank == root {
                    vec![root * 10; 8]
                } else {
                    vec![-1; 8]
                };
                world.ibcast(data, root)
            })
            .collect();
        let results = Request::wait_all(requests);
        assert_eq!(results.len(), size as usize);
        for (root, data) in results.iter().enumerate() {
            assert!(
                data.iter().all(|&v| v == root as i32 * 10),
                "rank {rank}: wait_all result from root {root}"
            );
        }
        if rank == 0 {
            println!("PASS: wait_all");
        }
    }

    // ========================================================================
    // Test 4: ibcast of a host buffer
    // ========================================================================
    {
        let buf = if rank == 0 {
            HostBuffer::pinned((0..=255).collect())
        } else {
            HostBuffer::zeroed(256)
        };
        let buf = world.ibcast_buffer(buf, 0).wait();
        let expected: Vec<u8> = (0..=255).collect();
        assert_eq!(buf.as_slice(), expected.as_slice(), "rank {rank}: ibcast_buffer");
        if rank == 0 {
            println!("PASS: ibcast_buffer");
        }
    }

    // ========================================================================
    // Test 5: dropping an unfinished request completes it
    // ========================================================================
    {
        let data = if rank == 0 { vec![1u8; 64] } else { vec![0u8; 64] };
        let request = world.ibcast(data, 0);
        drop(request);
        // Subsequent collectives must still match up on every rank.
        let mut value = if rank == 0 { 99i32 } else { 0 };
        world.bcast_value(&mut value, 0);
        assert_eq!(value, 99, "rank {rank}: bcast after dropped request");
        if rank == 0 {
            println!("PASS: drop completes request");
        }
    }

    world.barrier();
    if rank == 0 {
        println!("\n========================================");
        println!("All nonblocking tests passed!");
        println!("========================================");
    }
}
