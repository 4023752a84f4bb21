use criterion::{criterion_group, criterion_main, Criterion};
use mrlite_sorted::{GroupedMergeIter, SortedBuffer};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tempfile::tempdir;

fn spill_and_merge_throughput(c: &mut Criterion) {
    c.bench_function("sorted_buffer_spill_and_merge_10k", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let filebase = dir.path().join("bench-run");
            let mut rng = StdRng::seed_from_u64(42);
            let mut buf = SortedBuffer::new(&filebase, 1 << 16);

            for _ in 0..10_000 {
                let key: u32 = rng.gen_range(0..2_000);
                let value: u64 = rng.gen();
                buf.insert(&key.to_le_bytes(), &value.to_le_bytes()).unwrap();
            }
            let runs = buf.close().unwrap();

            let mut it = GroupedMergeIter::open(&filebase, runs).unwrap();
            let mut count = 0u64;
            while !it.finished_all() {
                while !it.done() {
                    count += 1;
                    it.next().unwrap();
                }
                it.next_key().unwrap();
            }
            count
        });
    });
}

criterion_group!(benches, spill_and_merge_throughput);
criterion_main!(benches);
