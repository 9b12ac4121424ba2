//! Integration Tests for the Render Scheduler
//!
//! These tests drive observables, scopes and the in-memory document together
//! through the public API.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use reflow_core::dom::{Command, CommandBatch, Document};
use reflow_core::reactive::Observable;
use reflow_core::render::{BuildScope, RenderFragment};
use reflow_core::{CloseReason, RenderConfig};

fn setup() -> (Arc<Document>, BuildScope) {
    let doc = Arc::new(Document::new());
    let root = BuildScope::root(doc.clone(), doc.root(), RenderConfig::default());
    (doc, root)
}

fn region(doc: &Document, fragment: &RenderFragment) -> String {
    doc.text_between(doc.root(), fragment.start_id(), fragment.end_id())
        .unwrap()
}

/// A value rendered as text converges to every new value, with no frame
/// showing both the old and the new content.
#[test]
fn dog_then_cat() {
    let (doc, root) = setup();
    let animal = Observable::new("dog".to_string());

    let frames = Arc::new(Mutex::new(Vec::new()));
    let frames_clone = frames.clone();
    let observer_doc = doc.clone();
    let fragment_slot: Arc<Mutex<Option<RenderFragment>>> = Arc::new(Mutex::new(None));
    let slot_clone = fragment_slot.clone();

    let fragment = root
        .render(&animal, |value, scope| {
            scope.text(value)?;
            Ok(())
        })
        .unwrap();
    *fragment_slot.lock() = Some(fragment.clone());

    // A second listener, subscribed after the render, sees the settled region.
    animal
        .subscribe(move |_, _| {
            if let Some(fragment) = slot_clone.lock().clone() {
                frames_clone.lock().push(region(&observer_doc, &fragment));
            }
        })
        .unwrap();

    assert_eq!(region(&doc, &fragment), "dog");

    animal.set("cat".to_string()).unwrap();
    assert_eq!(region(&doc, &fragment), "cat");
    assert_eq!(*frames.lock(), vec!["cat"]);
}

/// B and C both arrive while A is rendering: A is rendered, B is skipped,
/// C is rendered once.
#[test]
fn a_b_c_renders_twice() {
    let (doc, root) = setup();
    let value = Observable::new("A".to_string());
    let passes = Arc::new(Mutex::new(Vec::new()));

    let passes_clone = passes.clone();
    let writer = value.clone();
    let fragment = root
        .render(&value, move |v, scope| {
            passes_clone.lock().push(v.clone());
            if v == "A" {
                writer.set("B".to_string())?;
                writer.set("C".to_string())?;
            }
            scope.text(v)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(*passes.lock(), vec!["A", "C"]);
    assert_eq!(region(&doc, &fragment), "C");
}

/// Writing a field through a projection re-renders a region bound to the
/// whole value, exactly like a direct write.
#[test]
fn projection_write_triggers_rerender() {
    #[derive(Debug, Clone, PartialEq)]
    struct Foo {
        bar: String,
    }

    let (doc, root) = setup();
    let foo = Observable::new(Foo { bar: "dog".into() });
    let bar = foo.property(|f| f.bar.clone(), |f, bar| f.bar = bar);
    assert_eq!(bar.read(), "dog");

    let renders = Arc::new(AtomicI32::new(0));
    let renders_clone = renders.clone();
    let fragment = root
        .render(&foo, move |f, scope| {
            renders_clone.fetch_add(1, Ordering::SeqCst);
            scope.text(&f.bar)?;
            Ok(())
        })
        .unwrap();

    bar.set("cat".into()).unwrap();

    assert_eq!(foo.read().bar, "cat");
    assert_eq!(region(&doc, &fragment), "cat");
    assert_eq!(renders.load(Ordering::SeqCst), 2);

    // A direct write behaves identically.
    foo.set(Foo { bar: "cow".into() }).unwrap();
    assert_eq!(region(&doc, &fragment), "cow");
    assert_eq!(bar.read(), "cow");
    assert_eq!(renders.load(Ordering::SeqCst), 3);
}

/// Tearing down the enclosing scope removes exactly the render's listener.
#[test]
fn enclosing_teardown_drops_one_subscriber() {
    let (_doc, root) = setup();
    let region_scope = root.element_scope("section").unwrap();
    let value = Observable::new(0);
    value.subscribe(|_, _| {}).unwrap();

    region_scope
        .render(&value, |v, scope| {
            scope.text(&v.to_string())?;
            Ok(())
        })
        .unwrap();
    assert_eq!(value.subscriber_count(), 2);

    root.cleanup();
    assert!(region_scope.is_released());
    assert_eq!(value.subscriber_count(), 1);
}

/// An observable owned by a scope is closed with it, and the close cascades
/// into projections rendered elsewhere.
#[test]
fn scope_owned_value_closes_with_scope() {
    let (doc, root) = setup();
    let owner = root.element_scope("div").unwrap();
    let value = Observable::new((1, "one".to_string()));
    owner.close_on_cleanup(&value);
    let label = value.map(|(_, label)| label.clone());

    let fragment = root
        .render(&label, |label, scope| {
            scope.text(label)?;
            Ok(())
        })
        .unwrap();
    assert_eq!(region(&doc, &fragment), "one");

    owner.cleanup();
    assert!(value.is_closed());
    assert!(label.is_closed());
    assert_eq!(
        label.close_reason(),
        Some(CloseReason::new(
            "Closed because a parent scope was cleaned up"
        ))
    );
}

/// The batches recorded for a pass survive transport encoding in order.
#[test]
fn recorded_pass_survives_transport() {
    let (doc, root) = setup();
    let value = Observable::new(1);
    root.render(&value, |v, scope| {
        let li = scope.element_scope("li")?;
        li.attribute(li.container(), "data-n", &v.to_string())?;
        li.text(&v.to_string())?;
        Ok(())
    })
    .unwrap();
    doc.take_batches();

    value.set(2).unwrap();
    let batch = doc.take_batches().pop().unwrap();
    let decoded = CommandBatch::decode(&batch.encode().unwrap()).unwrap();

    assert_eq!(decoded, batch);
    let ops: Vec<&str> = decoded
        .commands()
        .iter()
        .map(|c| match c {
            Command::RemoveBetween { .. } => "remove_between",
            Command::CreateElement { .. } => "create_element",
            Command::SetAttribute { .. } => "set_attribute",
            Command::CreateText { .. } => "create_text",
            Command::CreateMarker { .. } => "create_marker",
        })
        .collect();
    assert_eq!(
        ops,
        vec!["remove_between", "create_element", "set_attribute", "create_text"]
    );
}

/// Independent render instances over the same value do not share state.
#[test]
fn independent_instances() {
    let (doc, root) = setup();
    let value = Observable::new(1);

    let first = root
        .render(&value, |v, scope| {
            scope.text(&format!("a{v}"))?;
            Ok(())
        })
        .unwrap();
    let second = root
        .render(&value, |v, scope| {
            scope.text(&format!("b{v}"))?;
            Ok(())
        })
        .unwrap();

    first.delete();
    value.set(2).unwrap();

    assert_eq!(region(&doc, &first), "a1");
    assert_eq!(region(&doc, &second), "b2");
    assert_eq!(doc.text_content(doc.root()), "a1b2");
}
