#![allow(dead_code)]
use shared::*;

use criterion::{criterion_group, Criterion};
use kdrift::tree::KdTree;
use std::hint::black_box;

fn bench_insert_one(_c: &mut Criterion) {
    let points = generate_points(BENCH_NUM_POINTS);
    let to_insert = points[points.len() - 1].clone();
    let mut cc = configure_criterion();
    cc.bench_function("insert_one", |b| {
        b.iter_with_setup(
            || {
                let mut tree = KdTree::new(BENCH_DIMENSIONS, BENCH_BUCKET_CAPACITY).unwrap();
                for (payload, point) in points[..points.len() - 1].iter().enumerate() {
                    tree.add(point, payload).unwrap();
                }
                tree
            },
            |mut tree| {
                black_box(tree.add(&to_insert, BENCH_NUM_POINTS).unwrap());
            },
        )
    });
}

fn bench_insert_bulk(_c: &mut Criterion) {
    let points = generate_points(BENCH_NUM_POINTS);
    let mut cc = configure_criterion();
    cc.bench_function("insert_bulk", |b| {
        b.iter(|| {
            let mut tree = KdTree::new(BENCH_DIMENSIONS, BENCH_BUCKET_CAPACITY).unwrap();
            for (payload, point) in points.iter().enumerate() {
                tree.add(black_box(point), payload).unwrap();
            }
            tree
        })
    });
}

criterion_group!(benches, bench_insert_one, bench_insert_bulk);
