use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rook_compiler::compile;
use rook_core::vm::Vm;

fn bench_compile_expression(c: &mut Criterion) {
    let src = b"var x = 1 + 2 * 3 - 4 / 5";
    c.bench_function("compile_expression", |b| {
        b.iter(|| {
            let mut vm = Vm::new();
            compile(&mut vm, black_box(src)).unwrap()
        });
    });
}

fn bench_compile_class(c: &mut Criterion) {
    let src = br#"class Point {
  x { this }
  y { this }
  add(other) { this }
  == other { other }
}
var p = Point.new()
p.add(p) == p
"#;
    c.bench_function("compile_class", |b| {
        b.iter(|| {
            let mut vm = Vm::new();
            compile(&mut vm, black_box(src)).unwrap()
        });
    });
}

fn bench_compile_many_globals(c: &mut Criterion) {
    let mut src = String::new();
    for i in 0..200 {
        src.push_str(&format!("var x{i} = {i}\n"));
    }
    let bytes = src.into_bytes();
    c.bench_function("compile_200_globals", |b| {
        b.iter(|| {
            let mut vm = Vm::new();
            compile(&mut vm, black_box(&bytes)).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_compile_expression,
    bench_compile_class,
    bench_compile_many_globals
);
criterion_main!(benches);
