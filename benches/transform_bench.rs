use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::Vec3;
use strata::core::{CoreFactory, CoreKey, NodeKind};
use strata::transform::{TransformParams, TransformStack};

fn build_chain(factory: &mut CoreFactory, depth: usize) -> Vec<CoreKey> {
    (0..depth)
        .map(|i| {
            let key = factory.get_core(NodeKind::Rotate, None);
            let params = TransformParams::Rotate {
                angle: i as f32,
                axis: Vec3::new(0.3, 1.0, 0.1),
            };
            factory.set_transform(key, params).unwrap();
            key
        })
        .collect()
}

fn compile_chain(stack: &mut TransformStack, factory: &mut CoreFactory, chain: &[CoreKey], pass: u64) {
    stack.reset();
    for &key in chain {
        stack.push(factory, key, pass).unwrap();
        black_box(stack.current());
    }
    for _ in chain {
        stack.pop();
    }
}

fn transform_chain_benchmark(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut group = c.benchmark_group("transform_chain");

    for depth in [8, 32, 128] {
        for memoize in [true, false] {
            let mut factory = CoreFactory::new();
            let chain = build_chain(&mut factory, depth);
            let mut stack = TransformStack::new(memoize, depth);
            let mut pass = 0;

            let label = if memoize { "memoized" } else { "dynamic" };
            group.bench_function(format!("{depth}_deep_{label}"), |b| {
                b.iter(|| {
                    pass += 1;
                    compile_chain(&mut stack, &mut factory, &chain, pass);
                });
            });
        }
    }
    group.finish();
}

fn leaf_mutation_benchmark(c: &mut Criterion) {
    let mut factory = CoreFactory::new();
    let chain = build_chain(&mut factory, 64);
    let mut stack = TransformStack::new(true, 64);
    let leaf = chain[chain.len() - 1];
    let mut pass = 0;

    c.bench_function("leaf_mutation_64_deep", |b| {
        b.iter(|| {
            pass += 1;
            factory
                .set_transform(leaf, TransformParams::Translate(Vec3::splat(pass as f32)))
                .unwrap();
            compile_chain(&mut stack, &mut factory, &chain, pass);
        });
    });
}

criterion_group!(benches, transform_chain_benchmark, leaf_mutation_benchmark);
criterion_main!(benches);
