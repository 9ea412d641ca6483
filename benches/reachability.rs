//! Benchmarks for the reachability fixpoint.
//!
//! Builds a synthetic program with a deep override chain and a set of interface
//! implementers, then measures root selection plus propagation:
//! - Serial propagation
//! - Parallel propagation on the rayon pool

extern crate dotdex;

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use dotdex::prelude::*;
use std::hint::black_box;

const DEPTH: usize = 64;
const IMPLEMENTERS: usize = 256;

fn void() -> TypeReference {
    TypeReference::primitive(PrimitiveKind::Void)
}

/// `Node0 <- Node1 <- ...` each overriding `Visit`, plus `IMPLEMENTERS` classes implementing
/// `IHandler.Handle`. `Program.Main` constructs the deepest node and calls through the base
/// and the interface.
fn build_module() -> Arc<Module> {
    let module = Arc::new(Module::new());

    let handler = TypeBuilder::native("Bench", "Bench", "IHandler")
        .with_flags(TypeFlags::INTERFACE | TypeFlags::ABSTRACT)
        .with_method(
            MethodBuilder::new("Handle")
                .with_flags(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT | MethodFlags::NEW_SLOT),
        )
        .register(&module)
        .unwrap();

    let mut base = TypeBuilder::native("Bench", "Bench", "Node0")
        .with_method(MethodBuilder::constructor())
        .with_method(MethodBuilder::new("Visit").with_flags(MethodFlags::VIRTUAL | MethodFlags::NEW_SLOT))
        .register(&module)
        .unwrap();
    let root = base.clone();
    for i in 1..DEPTH {
        base = TypeBuilder::native("Bench", "Bench", format!("Node{i}"))
            .with_base(base.reference())
            .with_method(MethodBuilder::constructor())
            .with_method(MethodBuilder::new("Visit").with_flags(MethodFlags::VIRTUAL))
            .register(&module)
            .unwrap();
    }

    for i in 0..IMPLEMENTERS {
        TypeBuilder::native("Bench", "Bench", format!("Handler{i}"))
            .with_interface(handler.reference())
            .with_method(MethodBuilder::constructor())
            .with_method(MethodBuilder::new("Handle").with_flags(MethodFlags::VIRTUAL))
            .with_method(MethodBuilder::new("Unused"))
            .register(&module)
            .unwrap();
    }

    let mut main = MethodBuilder::new("Main")
        .with_flags(MethodFlags::STATIC)
        .with_reference(MethodReference::new(base.reference(), ".ctor", vec![], void()))
        .with_reference(MethodReference::new(root.reference(), "Visit", vec![], void()))
        .with_reference(MethodReference::new(handler.reference(), "Handle", vec![], void()));
    for i in (0..IMPLEMENTERS).step_by(2) {
        let implementer = TypeReference::named("Bench", format!("Handler{i}"), TypeOrigin::Native);
        main = main.with_reference(MethodReference::new(implementer, ".ctor", vec![], void()));
    }
    TypeBuilder::native("Bench", "Bench", "Program")
        .with_method(main)
        .register(&module)
        .unwrap();

    module
}

fn config(parallel: bool) -> ReachableConfig {
    ReachableConfig::application()
        .with_root("Bench.Program")
        .with_target(TargetInclude::new("Bench.Program::Main"))
        .with_parallel(parallel)
}

/// Benchmark a full run with serial propagation.
fn bench_fixpoint_serial(c: &mut Criterion) {
    let module = build_module();

    c.bench_function("reachability_fixpoint_serial", |b| {
        b.iter(|| {
            let context = ReachableContext::run(module.clone(), config(false));
            black_box(context.stats())
        });
    });
}

/// Benchmark a full run with parallel propagation.
fn bench_fixpoint_parallel(c: &mut Criterion) {
    let module = build_module();

    c.bench_function("reachability_fixpoint_parallel", |b| {
        b.iter(|| {
            let context = ReachableContext::run(module.clone(), config(true));
            black_box(context.stats())
        });
    });
}

criterion_group!(benches, bench_fixpoint_serial, bench_fixpoint_parallel);
criterion_main!(benches);
