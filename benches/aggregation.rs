use chrono::NaiveDate;
use costtree::{
    aggregation::Aggregator,
    types::{CostRow, DailyTotals, UsageDate},
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn create_test_rows(count: usize) -> Vec<CostRow> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut rows = Vec::with_capacity(count);

    for i in 0..count {
        let date = UsageDate::new(base + chrono::Duration::days((i % 45) as i64));
        rows.push(CostRow {
            usage_date: Some(date),
            project_id: Some(format!("project-{}", i % 5)),
            project_name: Some(format!("Project {}", i % 5)),
            service_name: Some(
                ["Compute Engine", "Cloud Storage", "BigQuery"][i % 3].to_string(),
            ),
            resource_name: Some(format!("resource-{}", i % 100)),
            net_cost: (i as f64) * 0.01 + 0.01,
            currency: Some("USD".to_string()),
        });
    }

    rows
}

fn create_test_totals(rows: &[CostRow]) -> DailyTotals {
    let mut totals = DailyTotals::new();
    for row in rows {
        if let Some(date) = row.usage_date {
            // A small offset per date so reconciliation has work to do
            *totals.entry(date).or_insert(0.5) += row.net_cost;
        }
    }
    totals
}

fn benchmark_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    group.sample_size(20);

    for count in [100usize, 1_000, 10_000] {
        let rows = create_test_rows(count);
        let totals = create_test_totals(&rows);
        let aggregator = Aggregator::new();

        group.bench_function(format!("aggregate_{count}_rows"), |b| {
            b.iter(|| {
                let report = aggregator.aggregate(black_box(&rows), Some(black_box(&totals)));
                black_box(report);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_aggregation);
criterion_main!(benches);
