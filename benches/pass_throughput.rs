//! Benchmarks for chain passes and data cells
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sensorchain::process::processes::{
    CollectorProcess, CompareProcess, DataSourceProcess, LinearTransformProcess, ScriptProcess,
};
use sensorchain::process::DataCell;
use sensorchain::{quantity_schema, ChainBuilder, CompositeProcess, Record};

/// Source followed by `stages` linear transforms.
fn linear_chain(stages: usize) -> CompositeProcess {
    let mut builder = ChainBuilder::new("bench")
        .component("source", DataSourceProcess::new(quantity_schema("value")));
    let mut previous = "source".to_string();
    for i in 0..stages {
        let name = format!("stage{}", i);
        builder = builder
            .component(&name, LinearTransformProcess::with_coefficients(1.0001, 0.5))
            .connect(&format!("{}/value", previous), &format!("{}/value", name));
        previous = name;
    }
    builder.build().expect("bench chain")
}

fn bench_linear_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_pass");

    for stages in [1, 8, 64].iter() {
        group.throughput(Throughput::Elements(*stages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stages), stages, |b, &stages| {
            let mut chain = linear_chain(stages);
            let feed = chain.feed("source").expect("feed");
            let mut x = 0.0;
            b.iter(|| {
                x += 1.0;
                feed.push(Record::quantity(x)).expect("push");
                chain.execute().expect("pass");
            });
        });
    }

    group.finish();
}

fn bench_alarm_pass(c: &mut Criterion) {
    let mut chain = ChainBuilder::new("alarm")
        .component("source", DataSourceProcess::new(quantity_schema("value")))
        .component("threshold", CompareProcess::new().with_operator(">"))
        .component("alarms", CollectorProcess::new(quantity_schema("value")))
        .connect("source/value", "threshold/value")
        .connect("threshold/outputIfTrue", "alarms/value")
        .constant("threshold/threshold", Record::quantity(50.0))
        .build()
        .expect("alarm chain");
    let feed = chain.feed("source").expect("feed");
    let alarms = chain.collector("alarms").expect("collector");

    let mut i = 0u64;
    c.bench_function("alarm_pass", |b| {
        b.iter(|| {
            i += 1;
            feed.push(Record::quantity((i % 100) as f64)).expect("push");
            chain.execute().expect("pass");
            if alarms.len() > 10_000 {
                alarms.clear();
            }
        })
    });
}

fn bench_script_pass(c: &mut Criterion) {
    let mut chain = ChainBuilder::new("script")
        .component("source", DataSourceProcess::new(quantity_schema("value")))
        .component("filter", ScriptProcess::new().with_expression("smooth(value, 0.2)"))
        .connect("source/value", "filter/value")
        .build()
        .expect("script chain");
    let feed = chain.feed("source").expect("feed");

    let mut x: f64 = 0.0;
    c.bench_function("script_pass", |b| {
        b.iter(|| {
            x += 0.1;
            feed.push(Record::quantity(x.sin())).expect("push");
            chain.execute().expect("pass");
        })
    });
}

fn bench_cell_publish(c: &mut Criterion) {
    let cell = DataCell::new();
    let record = Record::quantity(21.5);

    c.bench_function("cell_publish", |b| {
        b.iter(|| {
            cell.publish(black_box(record.clone()), black_box(1_000));
        })
    });

    c.bench_function("cell_snapshot", |b| b.iter(|| black_box(cell.snapshot())));
}

criterion_group!(
    benches,
    bench_linear_pass,
    bench_alarm_pass,
    bench_script_pass,
    bench_cell_publish,
);
criterion_main!(benches);
