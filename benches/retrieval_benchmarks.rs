use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::runtime::Runtime;

use schemarag::db::Database;
use schemarag::graph::{assemble, InMemoryGraphStore};
use schemarag::retrieval::expand;
use schemarag::seed::{ForeignKeySpec, SchemaSeeder, SchemaSpec, TableSpec};
use schemarag::{render_relationships, render_schema, RetrievalOptions, SchemaRetriever};

/// A schema of `tables` tables with 8 columns each, every table referencing
/// its predecessor
fn synthetic_schema(tables: usize) -> SchemaSeeder {
    let tables_spec: Vec<TableSpec> = (0..tables)
        .map(|i| TableSpec {
            name: format!("table_{}", i),
            columns: std::iter::once("id".to_string())
                .chain(std::iter::once("parent_id".to_string()))
                .chain((0..6).map(|c| format!("attr_{}", c)))
                .collect(),
        })
        .collect();

    let foreign_keys = (1..tables)
        .map(|i| ForeignKeySpec {
            from_table: format!("table_{}", i),
            from_column: "parent_id".to_string(),
            to_table: format!("table_{}", i - 1),
            to_column: "id".to_string(),
        })
        .collect();

    SchemaSeeder::new(SchemaSpec {
        partition_key: "bench".to_string(),
        tables: tables_spec,
        foreign_keys,
    })
}

fn tokens(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Benchmark neighbor expansion over the in-memory store
pub fn bench_expansion(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to create runtime");
    let seeder = synthetic_schema(200);
    let store = InMemoryGraphStore::new(seeder.nodes(), seeder.edges());
    let seeds: Vec<_> = seeder
        .nodes()
        .into_iter()
        .filter(|n| n.name == "bench.table_100")
        .collect();

    let mut group = c.benchmark_group("expansion");
    for hops in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("in_memory", hops), &hops, |b, &hops| {
            b.to_async(&rt)
                .iter(|| expand(&store, seeds.clone(), hops, None));
        });
    }
    group.finish();
}

/// Benchmark end-to-end retrieval against SQLite
pub fn bench_sqlite_retrieval(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to create runtime");
    let dir = tempdir().expect("Failed to create temp dir");
    let db = Database::new(dir.path().join("bench.db")).expect("Failed to create database");
    synthetic_schema(200).seed(&db).expect("Failed to seed");
    let retriever = SchemaRetriever::new(Arc::new(db));

    let mut group = c.benchmark_group("sqlite_retrieval");
    for top_k in [5usize, 30] {
        let options = RetrievalOptions {
            top_k,
            max_hops: 2,
            timeout: None,
        };
        let query = tokens(&["table_1", "parent_id"]);
        group.bench_with_input(BenchmarkId::new("top_k", top_k), &top_k, |b, _| {
            b.to_async(&rt)
                .iter(|| retriever.retrieve_with_tokens(&query, &options, None));
        });
    }
    group.finish();
}

/// Benchmark schema and relationship rendering
pub fn bench_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering");
    for tables in [10usize, 100] {
        let seeder = synthetic_schema(tables);
        let ctx = assemble(seeder.nodes(), seeder.edges());

        group.bench_with_input(BenchmarkId::new("schema", tables), &ctx, |b, ctx| {
            b.iter(|| render_schema(ctx));
        });
        group.bench_with_input(BenchmarkId::new("relationships", tables), &ctx, |b, ctx| {
            b.iter(|| render_relationships(ctx));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_expansion, bench_sqlite_retrieval, bench_rendering);
criterion_main!(benches);
