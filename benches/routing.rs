// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for routing-decision parsing and source response formatting.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use repo_scout::information::RoutingDecision;
use repo_scout::response::format_source_response;
use repo_scout::session::AgentKind;

/// Benchmark parsing supervisor output of different shapes.
fn bench_routing_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing/parse");

    let inputs = [
        ("object", r#"{"source_code": "PASS", "git": "log --since=1.week", "github": "PASS", "docs": "PASS"}"#.to_string()),
        (
            "prose_wrapped",
            format!(
                "Sure! Here is the routing:\n{}\nLet me know if you need more.",
                r#"{"git": "Who changed the parser?", "docs": "parser configuration"}"#
            ),
        ),
        ("list", r#"[{"github": "open issues about login"}, {"git": "ignored"}]"#.to_string()),
        ("no_json", "I would ask the git agent about recent commits.".repeat(20)),
    ];

    for (name, text) in &inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| RoutingDecision::parse(black_box(text)));
        });
    }

    let decision = RoutingDecision::parse(&inputs[0].1);
    group.bench_function("route_all_agents", |b| {
        b.iter(|| {
            for kind in [AgentKind::SourceCode, AgentKind::Git, AgentKind::GitHub, AgentKind::Docs] {
                black_box(decision.route(kind));
            }
        });
    });

    group.finish();
}

/// Benchmark turning source rows into an entity list.
fn bench_source_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing/source_format");

    for rows in [10, 100, 200] {
        let literal = format!(
            "[{}]",
            (0..rows)
                .map(|i| format!("('Class{}', {i}, None)", rows - i))
                .collect::<Vec<_>>()
                .join(", ")
        );
        group.bench_with_input(BenchmarkId::new("rows", rows), &literal, |b, literal| {
            b.iter(|| format_source_response(black_box(literal)));
        });
    }

    group.bench_function("parse_failure", |b| {
        b.iter(|| format_source_response(black_box("Error: Query returned no rows.")));
    });

    group.finish();
}

criterion_group!(benches, bench_routing_parse, bench_source_formatting);
criterion_main!(benches);
