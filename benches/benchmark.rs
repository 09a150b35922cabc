use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use beanbag::engine::Engine;

fn bench_set(c: &mut Criterion) {
    let mut engine = Engine::open_in_memory().expect("engine");
    engine.set_locking(false);
    c.bench_function("set new bean", |b| {
        b.iter(|| {
            let mut user = engine.dispense("user");
            user.set_prop("name", "Ann");
            user.set_prop("age", 30i64);
            black_box(engine.set(&mut user).expect("set"));
        })
    });
}

fn bench_get(c: &mut Criterion) {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    user.set_prop("age", 30i64);
    let id = engine.set(&mut user).expect("set").id;
    c.bench_function("get existing bean", |b| {
        b.iter(|| black_box(engine.get("user", id).expect("get")))
    });
}

fn bench_link(c: &mut Criterion) {
    let mut engine = Engine::open_in_memory().expect("engine");
    engine.set_locking(false);
    let mut group = engine.dispense("group");
    engine.set(&mut group).expect("set");
    c.bench_function("link fresh pair", |b| {
        b.iter(|| {
            let mut user = engine.dispense("user");
            engine.link(&mut group, &mut user).expect("link");
        })
    });
}

criterion_group!(benches, bench_set, bench_get, bench_link);
criterion_main!(benches);
