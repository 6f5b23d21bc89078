use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use display_model::undo::{
    AddWidgetAction, CompoundAction, RemoveWidgetAction, SetPropertyAction, UndoableActionManager,
};
use display_model::{keys, Value, Widget, WidgetKind};

fn set_x(widget: &Widget, x: i32) -> SetPropertyAction {
    let property = widget.property_by_name(keys::X.name()).expect("x");
    SetPropertyAction::new(property, Value::Int(x)).expect("int")
}

#[test]
fn execute_undo_redo_round_trip() {
    let widget = Widget::new(WidgetKind::Label);
    let mut manager = UndoableActionManager::new(10, Duration::ZERO);

    manager.execute(set_x(&widget, 10));
    manager.execute(set_x(&widget, 20));
    assert_eq!(widget.property_value(keys::X).expect("x"), 20);
    assert_eq!(manager.undo_description().as_deref(), Some("Set x"));

    assert!(manager.undo());
    assert_eq!(widget.property_value(keys::X).expect("x"), 10);
    assert!(manager.undo());
    assert_eq!(widget.property_value(keys::X).expect("x"), 0);
    assert!(!manager.undo());

    assert!(manager.redo());
    assert_eq!(widget.property_value(keys::X).expect("x"), 10);
    assert_eq!(manager.redo_count(), 1);

    manager.execute(set_x(&widget, 50));
    assert!(!manager.can_redo());
    assert!(!manager.redo());
}

#[test]
fn mergeable_changes_collapse_into_one_step() {
    let widget = Widget::new(WidgetKind::Label);
    let mut manager = UndoableActionManager::new(10, Duration::from_secs(60));

    for x in [5, 6, 7, 8] {
        manager.execute(set_x(&widget, x).mergeable());
    }
    assert_eq!(manager.undo_count(), 1);

    manager.execute(set_x(&widget, 9));
    assert_eq!(manager.undo_count(), 2);

    assert!(manager.undo());
    assert!(manager.undo());
    assert_eq!(widget.property_value(keys::X).expect("x"), 0);
}

#[test]
fn changes_on_different_properties_do_not_merge() {
    let widget = Widget::new(WidgetKind::Label);
    let mut manager = UndoableActionManager::new(10, Duration::from_secs(60));
    manager.execute(set_x(&widget, 5).mergeable());
    let y = widget.property_by_name(keys::Y.name()).expect("y");
    manager.execute(
        SetPropertyAction::new(y, Value::Int(5))
            .expect("int")
            .mergeable(),
    );
    assert_eq!(manager.undo_count(), 2);
}

#[test]
fn limit_drops_oldest_entries() {
    let widget = Widget::new(WidgetKind::Label);
    let mut manager = UndoableActionManager::new(3, Duration::ZERO);
    for x in 1..=5 {
        manager.execute(set_x(&widget, x));
    }
    assert_eq!(manager.undo_count(), 3);
    while manager.undo() {}
    assert_eq!(widget.property_value(keys::X).expect("x"), 2);
}

#[test]
fn macroized_undo_restores_specification() {
    let widget = Widget::new(WidgetKind::Label);
    let text = widget.property(keys::TEXT).expect("text");
    text.set_specification("$(OLD)").expect("spec");
    let mut manager = UndoableActionManager::default();

    let action = SetPropertyAction::new(Arc::clone(text.untyped()), Value::Text("$(NEW)".into()))
        .expect("text");
    manager.execute(action);
    assert_eq!(text.specification(), "$(NEW)");

    manager.undo();
    assert_eq!(text.specification(), "$(OLD)");
}

#[test]
fn widget_add_and_remove_are_undoable() {
    let display = Widget::new(WidgetKind::Display);
    let first = Widget::new(WidgetKind::Label);
    let second = Widget::new(WidgetKind::Led);
    display.add_child(first.clone()).expect("first");
    display.add_child(second.clone()).expect("second");
    let mut manager = UndoableActionManager::default();

    manager.execute(RemoveWidgetAction::new(display.clone(), first.clone()));
    assert_eq!(display.children().len(), 1);
    manager.undo();
    assert!(display.children()[0].ptr_eq(&first));

    let added = Widget::new(WidgetKind::Group);
    manager.execute(AddWidgetAction::new(display.clone(), added.clone(), 1));
    assert!(display.children()[1].ptr_eq(&added));
    manager.undo();
    assert_eq!(display.children().len(), 2);
    assert!(added.parent().is_none());
}

#[test]
fn compound_action_undoes_in_reverse() {
    let widget = Widget::new(WidgetKind::Label);
    let width = widget.property_by_name(keys::WIDTH.name()).expect("width");
    let mut manager = UndoableActionManager::default();
    let compound = CompoundAction::new("Move and resize")
        .with(set_x(&widget, 40))
        .with(SetPropertyAction::new(width, Value::Int(300)).expect("int"));
    manager.execute(compound);

    assert_eq!(manager.undo_count(), 1);
    assert_eq!(widget.property_value(keys::WIDTH).expect("width"), 300);
    manager.undo();
    assert_eq!(widget.property_value(keys::X).expect("x"), 0);
    assert_eq!(widget.property_value(keys::WIDTH).expect("width"), 100);
}

#[test]
fn listeners_track_availability() {
    let widget = Widget::new(WidgetKind::Label);
    let mut manager = UndoableActionManager::default();
    let states = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&states);
    manager.add_listener(move |can_undo, can_redo| log.lock().push((can_undo, can_redo)));

    manager.execute(set_x(&widget, 3));
    manager.undo();
    manager.redo();
    manager.clear();

    assert_eq!(
        *states.lock(),
        [(true, false), (false, true), (true, false), (false, false)]
    );
}
