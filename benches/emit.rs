//! Benchmarks for the producer side of the pipeline.

use std::{hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use netlogging::{Channel, ChannelBackend, LogLine, NetLogRouter, Registry, TransportKind};

fn bench_render(c: &mut Criterion) {
    c.bench_function("render_short_line", |b| {
        b.iter(|| LogLine::render(format_args!("I ({}) relays: relay {} on\n", black_box(1234), 3)))
    });
    let long = "x".repeat(1024);
    c.bench_function("render_truncated_line", |b| {
        b.iter(|| LogLine::render(format_args!("{}", black_box(&long))))
    });
}

fn bench_push_pop(c: &mut Criterion) {
    for (name, backend) in [
        ("push_pop_ring", ChannelBackend::Ring),
        ("push_pop_message", ChannelBackend::Message),
    ] {
        let channel = Channel::new(32, backend);
        let line = LogLine::from_bytes(b"I (1) bench: payload");
        c.bench_function(name, |b| {
            b.iter(|| {
                channel.push(black_box(&line));
                black_box(channel.pop_timeout(std::time::Duration::ZERO))
            })
        });
    }
}

fn bench_emit_full_channels(c: &mut Criterion) {
    let registry = Registry::new();
    for kind in TransportKind::ALL {
        let _ = registry.register(kind, Arc::new(Channel::new(4, ChannelBackend::Ring)));
    }
    let router = NetLogRouter::new(&registry, false);
    for _ in 0..4 {
        router.emit(format_args!("fill"));
    }
    c.bench_function("emit_into_full_channels", |b| {
        b.iter(|| router.emit(format_args!("dropped {}", black_box(7))))
    });
}

criterion_group!(benches, bench_render, bench_push_pop, bench_emit_full_channels);
criterion_main!(benches);
