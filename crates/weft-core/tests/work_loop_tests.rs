use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use weft_core::{
    Children, Element, FunctionComponent, Phase, Props, ReconcilerConfig, RenderError,
};
use weft_core::scheduler::Priority;
use weft_testing::{ManualClock, TestRenderer};

fn counter() -> FunctionComponent {
    FunctionComponent::new("Counter", |hooks, _props| {
        let (count, dispatch) = hooks.use_reducer(|count: &i32, delta: i32| count + delta, 0);
        Element::host(
            "span",
            Props::with_children(count).listener("onClick", move || dispatch.dispatch(1)),
        )
        .into()
    })
}

/// A component that takes `cost` milliseconds of manual time to render.
fn slow(clock: &Arc<ManualClock>, cost: u64) -> FunctionComponent {
    let clock = Arc::clone(clock);
    FunctionComponent::new("Slow", move |_hooks, props| {
        clock.advance(cost);
        let label = props.get("label").map(|value| value.to_string()).unwrap_or_default();
        Element::host("i", Props::with_children(label)).into()
    })
}

fn slow_list(component: &FunctionComponent, labels: &[&str]) -> Children {
    Children::list(labels.iter().map(|label| {
        component
            .element(Props::new().attr("label", *label))
            .with_key(*label)
    }))
}

#[test]
fn dispatch_from_a_listener_schedules_and_renders_the_new_state() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler();
    let root = renderer.mount(counter().element(Props::new()));
    renderer.run_until_idle();
    assert_eq!(renderer.markup(&root), "<span>0</span>");

    let span = renderer.children_of(root.container())[0];
    assert!(renderer.dispatch_event(span, "onClick"));
    assert_eq!(renderer.scheduler().ready_len(), 1);
    assert_eq!(renderer.markup(&root), "<span>0</span>");

    renderer.run_until_idle();

    let node = reconciler.committed_root_child(&root).unwrap();
    assert_eq!(reconciler.hook_state::<i32>(node, 0), Some(1));
    assert_eq!(renderer.markup(&root), "<span>1</span>");
    assert!(reconciler.is_settled(&root));
}

#[test]
fn repeated_dispatches_keep_reusing_the_component_node() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler();
    let root = renderer.mount(counter().element(Props::new()));
    renderer.run_until_idle();
    let span = renderer.children_of(root.container())[0];

    let mut seen = Vec::new();
    for _ in 0..4 {
        renderer.dispatch_event(span, "onClick");
        renderer.run_until_idle();
        seen.push(reconciler.committed_root_child(&root).unwrap());
    }

    assert_eq!(renderer.markup(&root), "<span>4</span>");
    assert_eq!(renderer.children_of(root.container()), vec![span]);
    assert_eq!(seen[0], seen[2]);
    assert_eq!(seen[1], seen[3]);
    assert_ne!(seen[0], seen[1]);
}

#[test]
fn several_dispatches_before_a_render_settle_in_one_pass() {
    let renderer = TestRenderer::new();
    let root = renderer.mount(counter().element(Props::new()));
    renderer.run_until_idle();
    let span = renderer.children_of(root.container())[0];

    renderer.dispatch_event(span, "onClick");
    renderer.dispatch_event(span, "onClick");
    renderer.dispatch_event(span, "onClick");
    renderer.reconciler().flush_sync(&root).unwrap();

    assert_eq!(renderer.markup(&root), "<span>3</span>");
    renderer.take_ops();
    renderer.run_until_idle();
    assert!(renderer.take_ops().is_empty());
}

#[test]
fn long_renders_yield_between_units_of_work() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler();
    let component = slow(renderer.clock(), 3);
    let root = renderer.mount(slow_list(&component, &["a", "b", "c", "d"]));

    assert!(renderer.run_slice());
    assert_eq!(reconciler.phase(), Phase::Rendering);
    assert_eq!(renderer.markup(&root), "");
    assert!(!reconciler.is_settled(&root));

    renderer.run_until_idle();

    assert_eq!(reconciler.phase(), Phase::Idle);
    assert_eq!(
        renderer.markup(&root),
        "<i>a</i><i>b</i><i>c</i><i>d</i>"
    );
}

#[test]
fn update_during_a_yielded_pass_is_rendered_afterwards() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler();
    let component = slow(renderer.clock(), 3);
    let root = renderer.mount(slow_list(&component, &["a", "b", "c"]));

    renderer.run_slice();
    assert_eq!(reconciler.phase(), Phase::Rendering);
    reconciler
        .render(&root, slow_list(&component, &["c", "b"]))
        .unwrap();

    renderer.run_until_idle();

    assert_eq!(renderer.markup(&root), "<i>c</i><i>b</i>");
    assert!(reconciler.take_errors(&root).is_empty());
}

#[test]
fn flush_sync_finishes_a_yielded_pass_without_yielding() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler();
    let component = slow(renderer.clock(), 4);
    let root = renderer.mount(slow_list(&component, &["a", "b", "c"]));

    renderer.run_slice();
    assert_eq!(reconciler.phase(), Phase::Rendering);

    reconciler.flush_sync(&root).unwrap();

    assert_eq!(reconciler.phase(), Phase::Idle);
    assert_eq!(renderer.markup(&root), "<i>a</i><i>b</i><i>c</i>");
}

#[test]
fn changing_the_hook_count_fails_the_pass_and_keeps_the_committed_tree() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler();
    let unstable = FunctionComponent::new("Unstable", |hooks, _props| {
        let (step, set_step) = hooks.use_state(0i32);
        if step > 0 {
            let _ = hooks.use_state("extra");
        }
        Element::host("p", Props::with_children(step).listener("onClick", move || set_step.dispatch(1)))
            .into()
    });
    let root = renderer.mount(unstable.element(Props::new()));
    renderer.run_until_idle();
    let node = reconciler.committed_root_child(&root).unwrap();
    let p = renderer.children_of(root.container())[0];

    renderer.dispatch_event(p, "onClick");
    let error = reconciler.flush_sync(&root).unwrap_err();

    match error {
        RenderError::HookCountMismatch {
            node: failed,
            expected,
            found,
        } => {
            assert_eq!((expected, found), (1, 2));
            assert!(failed == node || reconciler.node(node).unwrap().alternate == Some(failed));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(reconciler.phase(), Phase::Idle);
    assert_eq!(renderer.markup(&root), "<p>0</p>");

    renderer.run_until_idle();
    let recorded = reconciler.take_errors(&root);
    assert!(!recorded.is_empty());
    assert!(recorded
        .iter()
        .all(|error| matches!(error, RenderError::HookCountMismatch { expected: 1, found: 2, .. })));
    assert_eq!(renderer.markup(&root), "<p>0</p>");
}

#[test]
fn flush_sync_from_inside_a_render_is_rejected() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler().clone();
    let container = reconciler.with_host(|host| host.container());
    let root = reconciler.create_root(container);
    let outcome: Rc<RefCell<Option<Result<(), RenderError>>>> = Rc::default();

    let probe = {
        let reconciler = reconciler.clone();
        let outcome = Rc::clone(&outcome);
        FunctionComponent::new("Probe", move |_hooks, _props| {
            *outcome.borrow_mut() = Some(reconciler.flush_sync(&root));
            Children::text("probed")
        })
    };
    reconciler.render(&root, probe.element(Props::new())).unwrap();
    reconciler.flush_sync(&root).unwrap();

    assert_eq!(*outcome.borrow(), Some(Err(RenderError::Reentrant)));
    assert_eq!(renderer.markup(&root), "probed");
}

#[test]
fn dispatch_during_render_is_settled_by_flush_sync() {
    let renderer = TestRenderer::new();
    let reconciler = renderer.reconciler();
    let eager = FunctionComponent::new("Eager", |hooks, _props| {
        let (ready, set_ready) = hooks.use_state(false);
        if !ready {
            set_ready.dispatch(true);
        }
        Element::host("b", Props::with_children(if ready { "ready" } else { "pending" })).into()
    });
    let container = reconciler.with_host(|host| host.container());
    let root = reconciler.create_root(container);

    reconciler.render(&root, eager.element(Props::new())).unwrap();
    reconciler.flush_sync(&root).unwrap();

    assert_eq!(renderer.markup(&root), "<b>ready</b>");
    assert!(reconciler.is_settled(&root));
}

#[test]
fn updates_use_the_configured_priority() {
    let renderer = TestRenderer::with_config(ReconcilerConfig {
        update_priority: Priority::UserBlocking,
    });
    let seen = Rc::new(RefCell::new(Vec::new()));
    let probe = {
        let seen = Rc::clone(&seen);
        let scheduler = renderer.scheduler().clone();
        FunctionComponent::new("Probe", move |_hooks, _props| {
            seen.borrow_mut().push(scheduler.current_priority_level());
            Children::Empty
        })
    };

    renderer.mount(probe.element(Props::new()));
    renderer.run_until_idle();

    assert_eq!(*seen.borrow(), vec![Priority::UserBlocking]);
}
