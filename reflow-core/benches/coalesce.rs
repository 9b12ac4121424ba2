use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflow_core::dom::Document;
use reflow_core::reactive::Observable;
use reflow_core::render::BuildScope;
use reflow_core::RenderConfig;

/// One idle change: erase, rebuild a small list, settle.
fn rerender(c: &mut Criterion) {
    let doc = Arc::new(Document::new());
    let root = BuildScope::root(doc.clone(), doc.root(), RenderConfig::default());
    let value = Observable::new(0u64);
    root.render(&value, |v, scope| {
        let list = scope.element_scope("ul")?;
        for i in 0..16 {
            list.element_scope("li")?.text(&(v + i).to_string())?;
        }
        Ok(())
    })
    .unwrap();

    let mut next = 0u64;
    c.bench_function("rerender_16_items", |b| {
        b.iter(|| {
            next += 1;
            value.set(black_box(next)).unwrap();
            doc.take_batches();
        })
    });
}

/// A burst of changes issued from inside a pass collapses into one catch-up.
fn burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("burst_during_pass");
    for size in [1u64, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let doc = Arc::new(Document::new());
            let root = BuildScope::root(doc.clone(), doc.root(), RenderConfig::default());
            let value = Observable::new(0u64);
            let writer = value.clone();
            root.render(&value, move |v, scope| {
                if v % (size + 1) == 0 {
                    for i in 1..=size {
                        writer.set(v + i)?;
                    }
                }
                scope.text(&v.to_string())?;
                Ok(())
            })
            .unwrap();

            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                value.set(black_box(next * (size + 1))).unwrap();
                doc.take_batches();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, rerender, burst);
criterion_main!(benches);
