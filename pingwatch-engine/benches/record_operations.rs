use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pingwatch_engine::{HostId, HostStats, ProbeResult};

/// Benchmark folding a successful probe into stats
fn bench_record_success(c: &mut Criterion) {
    let mut stats = HostStats::new(HostId::parse("10.0.0.1").unwrap());
    let result = ProbeResult::success(12.5, "64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=12.5 ms");
    let mut ts = 0u64;

    c.bench_function("record_success", |b| {
        b.iter(|| {
            ts += 1000;
            stats.record(black_box(ts), black_box(&result));
        });
    });
}

/// Benchmark folding a failed probe into stats
fn bench_record_failure(c: &mut Criterion) {
    let mut stats = HostStats::new(HostId::parse("10.0.0.1").unwrap());
    let result = ProbeResult::timeout(std::time::Duration::from_secs(1));
    let mut ts = 0u64;

    c.bench_function("record_failure", |b| {
        b.iter(|| {
            ts += 1000;
            stats.record(black_box(ts), black_box(&result));
        });
    });
}

/// Benchmark record-then-copy, what a monitor does per probe, across
/// history sizes
fn bench_record_and_copy_varying_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_and_copy");
    group.throughput(Throughput::Elements(1));

    for capacity in [10, 120, 1_000, 10_000].iter() {
        let mut stats =
            HostStats::with_history_capacity(HostId::parse("example.com").unwrap(), *capacity);
        // Fill the history so copies are full size
        for i in 0..*capacity as u64 {
            stats.record_success(i, Some(i as f64 % 50.0), "ok");
        }
        let result = ProbeResult::success(7.0, "ok");
        let mut ts = *capacity as u64;

        group.bench_with_input(BenchmarkId::from_parameter(capacity), capacity, |b, _| {
            b.iter(|| {
                ts += 1;
                stats.record(ts, &result);
                black_box(stats.clone());
            });
        });
    }
    group.finish();
}

/// Benchmark normalizing host input
fn bench_host_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_parse");

    for input in ["192.168.1.1", "Example.COM", "https://example.com:8443/health", "[::1]"].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| black_box(HostId::parse(black_box(input))));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_record_success,
    bench_record_failure,
    bench_record_and_copy_varying_history,
    bench_host_parse,
);
criterion_main!(benches);
