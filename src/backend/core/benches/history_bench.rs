//! Benchmarks for execution history and key parsing.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cadence_core::scheduler::{
    ExecutionHistoryRecorder, JobExecutionContext, JobExecutionError, JobKey, JobListener,
    TriggerKey,
};

fn context(i: usize) -> JobExecutionContext {
    JobExecutionContext::new(
        JobKey::new(format!("job-{i}"), "bench"),
        "BenchJob",
        TriggerKey::new(format!("job-{i}-trigger"), "bench"),
    )
}

fn bench_key_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_parsing");
    group.bench_function("qualified", |b| { b.iter(|| black_box(JobKey::parse("reports.NightlyRollup"))); });
    group.bench_function("bare", |b| { b.iter(|| black_box(JobKey::parse("NightlyRollup"))); });
    group.bench_function("display", |b| { let key = JobKey::new("NightlyRollup", "reports"); b.iter(|| black_box(key.to_string())); });
    group.finish();
}

fn bench_history_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_record");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let failure = JobExecutionError::new("bench failure");
    for capacity in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            let history = ExecutionHistoryRecorder::new(cap);
            let ctx = context(0);
            b.iter(|| rt.block_on(history.job_was_executed(&ctx, Some(&failure))));
        });
    }
    group.finish();
}

fn bench_history_get_recent(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_get_recent");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let history = ExecutionHistoryRecorder::new(1_000);
    rt.block_on(async { for i in 0..1_000 { history.job_was_executed(&context(i), None).await; } });
    for count in [10, 50, 500] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| { b.iter(|| black_box(history.get_recent(n))); });
    }
    group.finish();
}

criterion_group!(benches, bench_key_parsing, bench_history_record, bench_history_get_recent);
criterion_main!(benches);
