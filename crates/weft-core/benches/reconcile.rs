use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weft_core::{Children, Element, FunctionComponent, Props, RootHandle};
use weft_testing::TestRenderer;

const ITEM_COUNT_SAMPLES: &[usize] = &[100, 1_000];

fn keyed_list(count: usize, reversed: bool) -> Children {
    let items = (0..count).map(|index| -> Children {
        let index = if reversed { count - 1 - index } else { index };
        Element::host("li", Props::with_children(index))
            .with_key(index.to_string())
            .into()
    });
    Element::host("ul", Props::with_children(Children::List(items.collect()))).into()
}

struct ListFixture {
    renderer: TestRenderer,
    root: RootHandle,
    count: usize,
    reversed: bool,
}

impl ListFixture {
    fn new(count: usize) -> Self {
        let renderer = TestRenderer::new();
        let root = renderer.mount(keyed_list(count, false));
        renderer.run_until_idle();
        Self {
            renderer,
            root,
            count,
            reversed: false,
        }
    }

    fn flip(&mut self) {
        self.reversed = !self.reversed;
        let reconciler = self.renderer.reconciler();
        reconciler
            .render(&self.root, keyed_list(self.count, self.reversed))
            .expect("render");
        reconciler.flush_sync(&self.root).expect("flush");
        black_box(self.renderer.take_ops());
    }
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("mount_keyed_list");
    for &count in ITEM_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::new("items", count), &count, |b, &count| {
            b.iter(|| {
                let fixture = ListFixture::new(count);
                black_box(fixture.renderer.reconciler().node_count());
            });
        });
    }
    group.finish();
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_keyed_list");
    for &count in ITEM_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::new("items", count), &count, |b, &count| {
            let mut fixture = ListFixture::new(count);
            // Allocate the second buffer so steady-state reuse is measured.
            fixture.flip();

            b.iter(|| fixture.flip());
        });
    }
    group.finish();
}

fn bench_state_update(c: &mut Criterion) {
    let counter = FunctionComponent::new("Counter", |hooks, _props| {
        let (count, dispatch) = hooks.use_reducer(|count: &u64, delta: u64| count + delta, 0);
        Element::host(
            "button",
            Props::with_children(count).listener("onClick", move || dispatch.dispatch(1)),
        )
        .into()
    });
    let renderer = TestRenderer::new();
    let root = renderer.mount(counter.element(Props::new()));
    renderer.run_until_idle();
    let button = renderer.children_of(root.container())[0];

    c.bench_function("dispatch_and_render", |b| {
        b.iter(|| {
            renderer.dispatch_event(button, "onClick");
            renderer.run_until_idle();
            black_box(renderer.take_ops());
        });
    });
}

criterion_group!(reconcile, bench_mount, bench_reorder, bench_state_update);
criterion_main!(reconcile);
