//! End-to-end host behaviour against the in-memory surface.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use spark_dom::{
    component, Boundary, Def, Delay, DomNode, Host, MemorySurface, Phase, SettingsUpdate, SurfaceOp,
    UnmountReason, Value,
};

fn setup(content: Option<Def>, container: Option<DomNode>, settings: Option<SettingsUpdate>) -> (Host, Rc<MemorySurface>) {
    let surface = Rc::new(MemorySurface::new());
    let host = Host::with_applier(content, container, settings, surface.clone());
    (host, surface)
}

fn block(tag: &str, text: &str) -> Def {
    Def::element(tag, Value::Null).with_child(Def::text(text))
}

#[test]
fn test_update_then_move_into_container() {
    let (host, surface) = setup(Some(block("h1", "A")), None, None);
    assert!(!host.is_disabled());
    assert_eq!(host.root_dom_node().and_then(|n| n.tag().map(str::to_string)).as_deref(), Some("h1"));

    host.update(Some(block("h2", "B")), Some(Delay::Sync), Some(Delay::Sync));
    let first = host.root_dom_node().expect("rendered root");
    assert_eq!(first.tag(), Some("h2"));
    assert!(first.parent().is_none());

    surface.take_ops();
    let body = DomNode::element("body");
    host.move_into(Some(body.clone()), Some(Delay::Sync));

    let ops = surface.take_ops();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], SurfaceOp::Move(node) if *node == first));
    assert_eq!(body.outer_html(), "<body><h2>B</h2></body>");

    // Same container again: nothing to do.
    host.move_into(Some(body.clone()), Some(Delay::Sync));
    assert!(surface.take_ops().is_empty());
}

#[test]
fn test_container_policy() {
    let only_in_container = SettingsUpdate {
        only_run_in_container: Some(true),
        ..Default::default()
    };
    let (host, _surface) = setup(Some(block("p", "x")), None, Some(only_in_container));
    assert!(host.is_disabled());
    assert!(host.root_dom_nodes(true).is_empty());

    // Turning the policy off while detached keeps the host waiting for a container.
    host.modify_settings(&SettingsUpdate {
        only_run_in_container: Some(false),
        ..Default::default()
    });
    assert!(host.is_disabled());

    let body = DomNode::element("body");
    host.move_into(Some(body.clone()), Some(Delay::Sync));
    assert!(!host.is_disabled());
    host.flush();
    assert_eq!(body.outer_html(), "<body><p>x</p></body>");

    // Detaching with the policy off keeps the content alive off-surface.
    host.move_into(None, None);
    host.flush();
    assert!(!host.is_disabled());
    assert_eq!(body.outer_html(), "<body></body>");
    assert!(host.root_dom_node().is_some());
}

#[test]
fn test_policy_turned_on_after_detach() {
    let body = DomNode::element("body");
    let (host, surface) = setup(Some(block("p", "x")), Some(body.clone()), None);
    let p = host.root_dom_node().expect("rendered root");

    host.move_into(None, Some(Delay::Sync));
    assert!(!host.is_disabled());
    assert_eq!(body.outer_html(), "<body></body>");
    surface.take_ops();

    let passes = Rc::new(Cell::new(0));
    let seen = passes.clone();
    host.add_listener(Phase::Update, Rc::new(move || seen.set(seen.get() + 1)));

    host.modify_settings(&SettingsUpdate {
        only_run_in_container: Some(true),
        ..Default::default()
    });
    assert!(host.is_disabled());
    assert_eq!(passes.get(), 1);
    let ops = surface.take_ops();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], SurfaceOp::Remove(node) if *node == p));

    // Still detached: switching the policy back off does not wake it up.
    host.modify_settings(&SettingsUpdate {
        only_run_in_container: Some(false),
        ..Default::default()
    });
    assert!(host.is_disabled());

    host.move_into(Some(body.clone()), Some(Delay::Sync));
    host.flush();
    assert!(!host.is_disabled());
    assert_eq!(body.outer_html(), "<body><p>x</p></body>");
}

#[test]
fn test_state_updates_coalesce() {
    let handle: Rc<RefCell<Option<Boundary>>> = Rc::new(RefCell::new(None));
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let counter = {
        let handle = handle.clone();
        let log = log.clone();
        component(move |ctx| {
            handle.replace(Some(ctx.boundary().clone()));
            let count = ctx.state().as_f64().unwrap_or(0.0);
            let log = log.clone();
            ctx.use_effect(ctx.state(), move |next, _prev| {
                log.borrow_mut().push(format!("mount {:?}", next.as_f64()));
                let log = log.clone();
                Some(Box::new(move |_prev: &Value, _next: &Value, reason: UnmountReason| {
                    log.borrow_mut().push(format!("unmount {reason:?}"));
                }))
            });
            Some(block("p", &count.to_string()))
        })
    };

    let body = DomNode::element("body");
    let (host, _surface) = setup(Some(Def::boundary(&counter, Value::Null)), Some(body.clone()), None);
    assert_eq!(body.outer_html(), "<body><p>0</p></body>");

    let updates = Rc::new(Cell::new(0));
    let seen = updates.clone();
    host.add_listener(Phase::Update, Rc::new(move || seen.set(seen.get() + 1)));

    let boundary = handle.borrow().clone().expect("rendered boundary");
    for n in 1..=3i32 {
        boundary.set_state(Value::from(n), None, None);
    }
    assert_eq!(body.outer_html(), "<body><p>0</p></body>");

    host.tick(Duration::ZERO);
    assert_eq!(updates.get(), 1);
    assert_eq!(body.outer_html(), "<body><p>3</p></body>");

    host.clear(true, Some(Delay::Sync), Some(Delay::Sync));
    assert!(boundary.is_destroyed());
    assert_eq!(body.outer_html(), "<body></body>");
    assert_eq!(
        *log.borrow(),
        vec![
            "mount None".to_string(),
            format!("unmount {:?}", UnmountReason::Use),
            "mount Some(3.0)".to_string(),
            format!("unmount {:?}", UnmountReason::Cancel),
        ]
    );
}

#[test]
fn test_nested_host_receives_contexts() {
    let reader = component(|ctx| {
        let theme = ctx.contexts().get("theme").and_then(Value::as_str).unwrap_or("none").to_string();
        Some(block("span", &theme))
    });
    let child = Host::new(Some(Def::boundary(&reader, Value::Null)), None, None);

    let body = DomNode::element("body");
    let (parent, _surface) = setup(
        Some(Def::element("div", Value::Null).with_child(Def::host(&child))),
        Some(body.clone()),
        None,
    );
    assert_eq!(body.outer_html(), "<body><div><span>none</span></div></body>");
    assert!(child.parent_host().is_some_and(|p| p.ptr_eq(&parent)));

    parent.provide_contexts(Value::mapping([("theme", Value::from("dark"))]));
    parent.flush();
    child.flush();
    assert_eq!(body.outer_html(), "<body><div><span>dark</span></div></body>");

    // Without welcoming contexts the child falls back to an empty mapping.
    child.modify_settings(&SettingsUpdate {
        welcome_contexts_up_root: Some(false),
        ..Default::default()
    });
    child.flush();
    assert_eq!(body.outer_html(), "<body><div><span>none</span></div></body>");
}
