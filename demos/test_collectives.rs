//! Integration test for the blocking collectives.
//!
//! Exercises bcast, bcast_value, bcast_vec, bcast_pod, bcast_pod_vec,
//! bcast_buffer, allreduce (copy, in-place and scalar), allgather and barrier.
//!
//! A custom panic hook calls `std::process::abort()` to prevent MPI hangs.
//!
//! Run with: mpiexec -n 4 ./target/debug/examples/test_collectives

use bytemuck::{Pod, Zeroable};
use half::{bf16, f16};
use infermpi::{Byte, Fp8E4M3, HostBuffer, Mpi, MpiChar, ReduceOp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Sampling parameters chosen on the root and shared with every rank.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
struct SamplingParams {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    seed: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mpi = Mpi::init().expect("MPI init failed");

    // Install a panic hook that aborts the process to prevent MPI deadlocks.
    // NOTE: Must be installed AFTER Mpi::init() to avoid interfering with
    // MPI runtime initialization on some implementations.
    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        std::process::abort();
    }));

    let world = mpi.world();
    let rank = world.rank();
    let size = world.size();

    assert!(size >= 2, "test_collectives requires at least 2 processes");

    // ========================================================================
    // Test 1: bcast of a fixed-length slice
    // ========================================================================
    {
        let mut data = vec![0.0f64; 10];
        if rank == 0 {
            for (i, x) in data.iter_mut().enumerate() {
                *x = (i + 1) as f64;
            }
        }
        world.bcast(&mut data, 0);
        for (i, &x) in data.iter().enumerate() {
            assert!(
                (x - (i + 1) as f64).abs() < f64::EPSILON,
                "rank {rank}: bcast data[{i}] = {x}"
            );
        }
        if rank == 0 {
            println!("PASS: bcast");
        }
    }

    // ========================================================================
    // Test 2: bcast_value from a non-zero root
    // ========================================================================
    {
        let root = size - 1;
        let mut value = if rank == root { 0xDEAD_BEEF_u64 } else { 0 };
        world.bcast_value(&mut value, root);
        assert_eq!(value, 0xDEAD_BEEF, "rank {rank}: bcast_value");

        let mut flag = rank == root;
        world.bcast_value(&mut flag, root);
        assert!(flag, "rank {rank}: bcast_value(bool)");

        if rank == 0 {
            println!("PASS: bcast_value");
        }
    }

    // ========================================================================
    // Test 3: bcast_vec round-trip for every element family
    // ========================================================================
    {
        let tokens: Vec<i32> = vec![101, 7592, 1010, 2088, 102];
        let mut got: Vec<i32> = if rank == 0 { tokens.clone() } else { vec![-1; 3] };
        world.bcast_vec(&mut got, 0);
        assert_eq!(got, tokens, "rank {rank}: bcast_vec(i32)");

        let halves: Vec<f16> = (0..7).map(|i| f16::from_f32(i as f32 * 0.5)).collect();
        let mut got = if rank == 0 { halves.clone() } else { Vec::new() };
        world.bcast_vec(&mut got, 0);
        assert_eq!(got, halves, "rank {rank}: bcast_vec(f16)");

        let brains: Vec<bf16> = (0..5).map(|i| bf16::from_f32(-(i as f32))).collect();
        let mut got = if rank == 0 { brains.clone() } else { Vec::new() };
        world.bcast_vec(&mut got, 0);
        assert_eq!(got, brains, "rank {rank}: bcast_vec(bf16)");

        let prompt: Vec<MpiChar> = b"Once upon a time"
            .iter()
            .map(|&b| MpiChar::from_ascii(b))
            .collect();
        let mut got = if rank == 0 { prompt.clone() } else { Vec::new() };
        world.bcast_vec(&mut got, 0);
        assert_eq!(got, prompt, "rank {rank}: bcast_vec(char)");

        let raw: Vec<Byte> = (0u8..=255).map(Byte).collect();
        let mut got = if rank == 0 { raw.clone() } else { Vec::new() };
        world.bcast_vec(&mut got, 0);
        assert_eq!(got, raw, "rank {rank}: bcast_vec(byte)");

        let fp8: Vec<Fp8E4M3> = (0u8..16).map(|b| Fp8E4M3::from_bits(b * 7)).collect();
        let mut got = if rank == 0 { fp8.clone() } else { Vec::new() };
        world.bcast_vec(&mut got, 0);
        assert_eq!(got, fp8, "rank {rank}: bcast_vec(fp8)");

        // Same seed everywhere so each rank can check what the root sent.
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let len = rng.gen_range(1..4096);
        let sampled: Vec<u32> = (0..len).map(|_| rng.gen()).collect();
        let mut got = if rank == 0 { sampled.clone() } else { Vec::new() };
        world.bcast_vec(&mut got, 0);
        assert_eq!(got, sampled, "rank {rank}: bcast_vec(random)");

        // Empty vectors stay empty everywhere.
        let mut empty: Vec<u64> = if rank == 0 { Vec::new() } else { vec![9; 4] };
        world.bcast_vec(&mut empty, 0);
        assert!(empty.is_empty(), "rank {rank}: bcast_vec(empty)");

        if rank == 0 {
            println!("PASS: bcast_vec");
        }
    }

    // ========================================================================
    // Test 4: bcast_pod and bcast_pod_vec for types without a datatype tag
    // ========================================================================
    {
        let params = SamplingParams {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            seed: 1234,
        };
        let mut got = if rank == 0 { params } else { SamplingParams::default() };
        world.bcast_pod(&mut got, 0);
        assert_eq!(got, params, "rank {rank}: bcast_pod");

        let batch: Vec<SamplingParams> = (0..3)
            .map(|i| SamplingParams {
                seed: i,
                ..params
            })
            .collect();
        let mut got = if rank == 0 { batch.clone() } else { Vec::new() };
        world.bcast_pod_vec(&mut got, 0);
        assert_eq!(got, batch, "rank {rank}: bcast_pod_vec");

        if rank == 0 {
            println!("PASS: bcast_pod");
        }
    }

    // ========================================================================
    // Test 5: bcast_buffer of host memory
    // ========================================================================
    {
        let mut buf = if rank == 0 {
            HostBuffer::from_vec((0..64).collect())
        } else {
            HostBuffer::zeroed(64)
        };
        world.bcast_buffer(&mut buf, 0);
        let expected: Vec<u8> = (0..64).collect();
        assert_eq!(buf.as_slice(), expected.as_slice(), "rank {rank}: bcast_buffer");
        if rank == 0 {
            println!("PASS: bcast_buffer");
        }
    }

    // ========================================================================
    // Test 6: allreduce (Sum of ones equals size; Max; in-place; scalar)
    // ========================================================================
    {
        let ones = vec![1i32; 8];
        let mut recv = vec![0i32; 8];
        world.allreduce(&ones, &mut recv, ReduceOp::Sum);
        assert!(recv.iter().all(|&v| v == size), "rank {rank}: allreduce ones");

        let mine = vec![rank as f32; 3];
        let mut max = vec![0.0f32; 3];
        world.allreduce(&mine, &mut max, ReduceOp::Max);
        assert!(
            max.iter().all(|&v| (v - (size - 1) as f32).abs() < f32::EPSILON),
            "rank {rank}: allreduce max"
        );

        let mut partial = vec![rank as f64, 1.0];
        world.allreduce_in_place(&mut partial, ReduceOp::Sum);
        let expected = (size * (size - 1) / 2) as f64;
        assert!((partial[0] - expected).abs() < 1e-10, "rank {rank}: in-place sum");
        assert!((partial[1] - size as f64).abs() < 1e-10, "rank {rank}: in-place ones");

        let min = world.allreduce_value(rank as i64 + 10, ReduceOp::Min);
        assert_eq!(min, 10, "rank {rank}: allreduce_value min");

        let all_ready = world.allreduce_value(true, ReduceOp::Land);
        assert!(all_ready, "rank {rank}: allreduce_value land");

        if rank == 0 {
            println!("PASS: allreduce");
        }
    }

    // ========================================================================
    // Test 7: allgather
    // ========================================================================
    {
        let send = [rank as u32, (rank * 10) as u32];
        let mut recv = vec![0u32; 2 * size as usize];
        world.allgather(&send, &mut recv);
        for r in 0..size as usize {
            assert_eq!(recv[2 * r], r as u32, "rank {rank}: allgather[{r}].0");
            assert_eq!(recv[2 * r + 1], (r * 10) as u32, "rank {rank}: allgather[{r}].1");
        }

        let gathered = world.allgather_value(rank as u8);
        let expected: Vec<u8> = (0..size as u8).collect();
        assert_eq!(gathered, expected, "rank {rank}: allgather_value");

        if rank == 0 {
            println!("PASS: allgather");
        }
    }

    // ========================================================================
    // Test 8: barrier
    // ========================================================================
    {
        world.barrier();
        world.barrier();
        if rank == 0 {
            println!("PASS: barrier");
        }
    }

    world.barrier();
    if rank == 0 {
        println!("\n========================================");
        println!("All collective tests passed!");
        println!("========================================");
    }
}
