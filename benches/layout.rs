//! Benchmarks for bytecode layout and encoding.
//!
//! Measures the per-method back end work:
//! - Offset computation over straight-line and branch-heavy bodies
//! - Payload sizing for switch tables and array data
//! - Full encoding through the instruction writer

extern crate dotdex;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use dotdex::dex::{
    ArrayData, IndexPool, InstructionWriter, MethodBody, OpCode, Operand, PackedSwitchData,
    Register,
};
use std::hint::black_box;

/// A body of `blocks` repetitions of const / add / conditional branch, ending in return.
fn branchy_body(blocks: usize) -> MethodBody {
    let mut body = MethodBody::new(4);
    let ret = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();
    for i in 0..blocks {
        body.insert_before(
            ret,
            OpCode::Const16,
            vec![Register::new(0)],
            Operand::Literal(i as i64),
        )
        .unwrap();
        body.insert_before(
            ret,
            OpCode::AddInt2Addr,
            vec![Register::new(1), Register::new(0)],
            Operand::None,
        )
        .unwrap();
        body.insert_before(ret, OpCode::IfEqz, vec![Register::new(1)], Operand::Target(ret))
            .unwrap();
    }
    body
}

/// A body dispatching through a packed switch and filling an array.
fn payload_body(cases: usize) -> MethodBody {
    let mut body = MethodBody::new(4);
    let ret = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();
    body.insert_before(
        ret,
        OpCode::PackedSwitch,
        vec![Register::new(0)],
        Operand::PackedSwitch(PackedSwitchData::new(0, vec![ret; cases])),
    )
    .unwrap();
    body.insert_before(
        ret,
        OpCode::FillArrayData,
        vec![Register::new(1)],
        Operand::ArrayData(ArrayData::ints(&(0..cases as i32).collect::<Vec<_>>())),
    )
    .unwrap();
    body
}

/// Benchmark offset computation for a 3000 instruction body.
fn bench_offsets_branchy(c: &mut Criterion) {
    c.bench_function("layout_offsets_branchy_1000", |b| {
        b.iter_batched(
            || branchy_body(1000),
            |mut body| black_box(body.update_instruction_offsets().unwrap()),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark offset computation dominated by payload sizing.
fn bench_offsets_payloads(c: &mut Criterion) {
    c.bench_function("layout_offsets_payloads_512", |b| {
        b.iter_batched(
            || payload_body(512),
            |mut body| black_box(body.update_instruction_offsets().unwrap()),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark the full writer, including validation and payload emission.
fn bench_encode(c: &mut Criterion) {
    let pool = IndexPool::new();

    c.bench_function("layout_encode_branchy_1000", |b| {
        b.iter_batched(
            || branchy_body(1000),
            |mut body| black_box(InstructionWriter::new(&pool).write(&mut body).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_offsets_branchy,
    bench_offsets_payloads,
    bench_encode
);
criterion_main!(benches);
