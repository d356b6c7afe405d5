//! Integration test for point-to-point messaging.
//!
//! Exercises send/recv with tags and status, send_value/recv_value,
//! send_pod/recv_pod, send_buffer/recv_buffer, wildcards, and matched probe
//! (mprobe) followed by recv_vec.
//!
//! Ranks are paired (0,1), (2,3), ...; with an odd world size the last rank
//! only takes part in the barriers.
//!
//! Run with: mpiexec -n 4 ./target/debug/examples/test_p2p

use bytemuck::{Pod, Zeroable};
use half::f16;
use infermpi::{HostBuffer, Mpi, ANY_SOURCE, ANY_TAG};
use tracing_subscriber::EnvFilter;

const TAG_TOKENS: i32 = 10;
const TAG_LOGITS: i32 = 11;
const TAG_HEADER: i32 = 12;
const TAG_KV: i32 = 13;
const TAG_PROBE: i32 = 14;

/// Header of a pipeline-stage activation handoff.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
struct StageHeader {
    step: u64,
    batch: u32,
    hidden: u32,
}

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

    assert!(size >= 2, "test_p2p requires at least 2 processes");

    let partner = rank ^ 1;
    let active = partner < size;
    let sender = rank % 2 == 0;

    // ========================================================================
    // Test 1: typed send/recv with tags and status
    // ========================================================================
    if active {
        let tokens: Vec<i64> = (0..16).map(|i| i * 100 + rank as i64).collect();
        if sender {
            world.send(&tokens, partner, TAG_TOKENS);
        } else {
            let mut got = vec![0i64; 16];
            let status = world.recv(&mut got, partner, TAG_TOKENS);
            assert_eq!(status.source, partner, "rank {rank}: status source");
            assert_eq!(status.tag, TAG_TOKENS, "rank {rank}: status tag");
            assert_eq!(status.count::<i64>(), Some(16), "rank {rank}: status count");
            let expected: Vec<i64> = (0..16).map(|i| i * 100 + partner as i64).collect();
            assert_eq!(got, expected, "rank {rank}: recv payload");
        }
    }
    world.barrier();
    if rank == 0 {
        println!("PASS: send/recv");
    }

    // ========================================================================
    // Test 2: replies flow back, received through wildcards
    // ========================================================================
    if active {
        if sender {
            let mut logits = vec![f16::ZERO; 4];
            let status = world.recv(&mut logits, ANY_SOURCE, ANY_TAG);
            assert_eq!(status.source, partner, "rank {rank}: wildcard source");
            assert_eq!(status.tag, TAG_LOGITS, "rank {rank}: wildcard tag");
            for (i, v) in logits.iter().enumerate() {
                assert_eq!(v.to_f32(), i as f32 + 0.5, "rank {rank}: logits[{i}]");
            }
        } else {
            let logits: Vec<f16> = (0..4).map(|i| f16::from_f32(i as f32 + 0.5)).collect();
            world.send(&logits, partner, TAG_LOGITS);
        }
    }
    world.barrier();
    if rank == 0 {
        println!("PASS: wildcard recv");
    }

    // ========================================================================
    // Test 3: send_value / send_pod / send_buffer
    // ========================================================================
    if active {
        let header = StageHeader {
            step: 42,
            batch: 8,
            hidden: 4096,
        };
        if sender {
            world.send_value(&(rank as u32 + 7), partner, TAG_HEADER);
            world.send_pod(&header, partner, TAG_HEADER);
            world.send_buffer(&HostBuffer::from_vec(vec![0xAB; 256]), partner, TAG_KV);
        } else {
            let mut value = 0u32;
            world.recv_value(&mut value, partner, TAG_HEADER);
            assert_eq!(value, partner as u32 + 7, "rank {rank}: recv_value");

            let mut got = StageHeader::default();
            let status = world.recv_pod(&mut got, partner, TAG_HEADER);
            assert_eq!(got, header, "rank {rank}: recv_pod");
            assert_eq!(status.bytes, std::mem::size_of::<StageHeader>() as i64);

            let mut kv = HostBuffer::zeroed(256);
            world.recv_buffer(&mut kv, partner, TAG_KV);
            assert!(kv.as_slice().iter().all(|&b| b == 0xAB), "rank {rank}: recv_buffer");
        }
    }
    world.barrier();
    if rank == 0 {
        println!("PASS: send_value/send_pod/send_buffer");
    }

    // ========================================================================
    // Test 4: mprobe sizes the receive from the matched message
    // ========================================================================
    if active {
        if sender {
            let len = 5 + rank as usize;
            let payload: Vec<f32> = (0..len).map(|i| i as f32 * 0.25).collect();
            world.send(&payload, partner, TAG_PROBE);
        } else {
            let (message, status) = world.mprobe(partner, TAG_PROBE);
            assert_eq!(status.source, partner);
            assert_eq!(status.tag, TAG_PROBE);
            assert_eq!(message.status(), status);

            let expected_len = 5 + partner as usize;
            assert_eq!(status.count::<f32>(), Some(expected_len));

            let (got, recv_status) = message.recv_vec::<f32>();
            assert_eq!(got.len(), expected_len, "rank {rank}: recv_vec length");
            for (i, &v) in got.iter().enumerate() {
                assert!((v - i as f32 * 0.25).abs() < f32::EPSILON);
            }
            assert_eq!(recv_status.bytes, (expected_len * 4) as i64);
        }
    }
    world.barrier();
    if rank == 0 {
        println!("PASS: mprobe/recv_vec");
    }

    world.barrier();
    if rank == 0 {
        println!("\n========================================");
        println!("All point-to-point tests passed!");
        println!("========================================");
    }
}
