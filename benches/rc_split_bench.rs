use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rc_split::Strong;
use std::rc::Rc;

fn bench_clone_drop(c: &mut Criterion) {
    c.bench_function("strong_clone_drop_10k", |b| {
        let s = Strong::new(0u64);
        b.iter(|| {
            for _ in 0..10_000 {
                black_box(s.clone());
            }
        })
    });

    c.bench_function("std_rc_clone_drop_10k", |b| {
        let s = Rc::new(0u64);
        b.iter(|| {
            for _ in 0..10_000 {
                black_box(s.clone());
            }
        })
    });
}

fn bench_upgrade(c: &mut Criterion) {
    c.bench_function("weak_upgrade_hit", |b| {
        let s = Strong::new(7u64);
        let w = Strong::downgrade(&s);
        b.iter(|| black_box(w.upgrade()))
    });

    c.bench_function("weak_upgrade_miss", |b| {
        let s = Strong::new(7u64);
        let w = Strong::downgrade(&s);
        drop(s);
        b.iter(|| black_box(w.upgrade()))
    });
}

fn bench_construction(c: &mut Criterion) {
    // In-place factory: one allocation per handle.
    c.bench_function("strong_new_1k", |b| {
        b.iter_batched(
            || (),
            |()| {
                let mut held = Vec::with_capacity(1_000);
                for i in 0..1_000u64 {
                    held.push(Strong::new(i));
                }
                black_box(held)
            },
            BatchSize::SmallInput,
        )
    });

    // Adoption: payload and block are separate allocations.
    c.bench_function("strong_adopt_1k", |b| {
        b.iter_batched(
            || (),
            |()| {
                let mut held = Vec::with_capacity(1_000);
                for i in 0..1_000u64 {
                    held.push(Strong::adopt(Box::new(i)));
                }
                black_box(held)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_clone_drop, bench_upgrade, bench_construction);
criterion_main!(benches);
