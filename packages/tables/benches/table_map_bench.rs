use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tabula_model::builders::*;
use tabula_model::Node;
use tabula_tables::{map_cache, CacheStrategy, CellSelection, TableMap};

fn grid(rows: usize, cols: usize) -> Node {
    table((0..rows).map(|r| {
        tr((0..cols).map(move |c| td(&format!("{r}:{c}"))))
    }))
}

fn spanning_grid(rows: usize) -> Node {
    table((0..rows).map(|r| {
        if r % 2 == 0 {
            tr([td_with(2, 2, "span"), td("x"), td("y")])
        } else {
            tr([td("x"), td("y")])
        }
    }))
}

fn compute_maps(c: &mut Criterion) {
    let small = grid(10, 5);
    let large = grid(200, 20);
    let spans = spanning_grid(100);

    c.bench_function("compute_map_10x5", |b| b.iter(|| TableMap::compute(black_box(&small))));
    c.bench_function("compute_map_200x20", |b| b.iter(|| TableMap::compute(black_box(&large))));
    c.bench_function("compute_map_spanning_100", |b| b.iter(|| TableMap::compute(black_box(&spans))));
}

fn cached_lookup(c: &mut Criterion) {
    let large = grid(200, 20);

    map_cache::configure(CacheStrategy::Weak);
    c.bench_function("cached_map_weak", |b| b.iter(|| TableMap::get(black_box(&large))));

    map_cache::configure(CacheStrategy::Ring { capacity: 10 });
    c.bench_function("cached_map_ring", |b| b.iter(|| TableMap::get(black_box(&large))));
    map_cache::configure(CacheStrategy::default());
}

fn select_rectangle(c: &mut Criterion) {
    let d = doc([grid(50, 10)]);
    let map = TableMap::get(d.child(0)).unwrap();
    let anchor = map.slots[0] + 1;
    let head = map.slots[map.slots.len() - 1] + 1;

    c.bench_function("cell_selection_50x10", |b| {
        b.iter(|| CellSelection::create(black_box(&d), anchor, head))
    });
}

criterion_group!(benches, compute_maps, cached_lookup, select_rectangle);
criterion_main!(benches);
