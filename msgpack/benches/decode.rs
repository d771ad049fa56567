use commonware_msgpack::{decode, reflect_struct, Reader, ReflectCfg};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

reflect_struct! {
    #[allow(dead_code)]
    struct Record {
        id: u64,
        score: f64,
        name: String,
        tags: Vec<String>,
    }
}

/// Encodes `n` records as a map-style array.
fn records(n: usize) -> Vec<u8> {
    let mut out = vec![0xdd];
    out.extend_from_slice(&(n as u32).to_be_bytes());
    for i in 0..n {
        out.push(0x84);
        out.extend_from_slice(b"\xa2id\xcf");
        out.extend_from_slice(&(i as u64).to_be_bytes());
        out.extend_from_slice(b"\xa5score\xcb");
        out.extend_from_slice(&(i as f64 / 3.0).to_be_bytes());
        out.extend_from_slice(b"\xa4name\xa8record__");
        out.extend_from_slice(b"\xa4tags\x92\xa3red\xa4blue");
    }
    out
}

/// Encodes `n` nested single-element arrays around a nil.
fn nested(n: usize) -> Vec<u8> {
    let mut out = vec![0x91; n];
    out.push(0xc0);
    out
}

fn bench_reflect(c: &mut Criterion) {
    let mut group = c.benchmark_group("reflect");
    let cfg = ReflectCfg::default();
    for n in [1, 100, 10_000] {
        let data = records(n);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("records", n), &data, |b, data| {
            b.iter(|| {
                let records: Vec<Record> = decode(&data[..], &cfg).unwrap();
                black_box(records);
            });
        });
    }
    group.finish();
}

fn bench_discard(c: &mut Criterion) {
    let mut group = c.benchmark_group("discard");
    for n in [100, 10_000] {
        let data = records(n);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("records", n), &data, |b, data| {
            b.iter(|| {
                let mut reader = Reader::new(&data[..]);
                reader.discard().unwrap();
                reader.destroy().unwrap();
            });
        });
    }
    for depth in [1_000, 100_000] {
        let data = nested(depth);
        group.bench_with_input(BenchmarkId::new("nested", depth), &data, |b, data| {
            b.iter(|| {
                let mut reader = Reader::new(&data[..]);
                reader.discard().unwrap();
                reader.destroy().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_reflect, bench_discard
}
criterion_main!(benches);
