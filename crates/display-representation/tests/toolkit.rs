use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use expect_test::expect;
use parking_lot::Mutex;

use display_model::value::ActionInfo;
use display_model::{keys, VType, Widget, WidgetKind};
use display_representation::{
    console_registry, console_toolkit, ConsoleOutput, ConsoleParent, InlineExecutor,
    RegistryCell, RepresentationError, RepresentationRegistry, ToolkitListener,
    ToolkitRepresentation,
};

const INTERVAL: Duration = Duration::from_millis(50);

fn named(kind: WidgetKind, name: &str) -> Widget {
    let widget = Widget::new(kind);
    widget
        .set_property_value(keys::NAME, name.to_string())
        .expect("name");
    widget
}

fn sample_display() -> (Widget, Widget) {
    let display = Widget::new(WidgetKind::Display);
    let title = named(WidgetKind::Label, "title");
    title
        .set_property_value(keys::TEXT, "Hello".to_string())
        .expect("text");
    let group = named(WidgetKind::Group, "g");
    let temp = named(WidgetKind::TextUpdate, "t");
    temp.set_property_value(keys::PV_NAME, "temp".to_string())
        .expect("pv");
    group.add_child(temp.clone()).expect("add");
    display.add_child(title).expect("add");
    display.add_child(group).expect("add");
    (display, temp)
}

fn wait_for_lines(output: &ConsoleOutput, count: usize) -> Vec<String> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while output.lines().len() < count && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    let mut lines = output.take_lines();
    lines.sort();
    lines
}

#[test]
fn console_prints_initial_state_and_coalesced_changes() {
    let toolkit = console_toolkit(Arc::new(InlineExecutor), INTERVAL).expect("toolkit");
    let output = ConsoleOutput::capture();
    let (display, temp) = sample_display();

    let represented = toolkit.represent_model(&ConsoleParent::root(output.clone()), &display);

    assert_eq!(represented, 3);
    expect![[r#"
/g/t: textupdate temp <disconnected>
/g: group
/title: label 'Hello'"#]]
    .assert_eq(&wait_for_lines(&output, 3).join("\n"));

    temp.set_property_value(keys::PV_VALUE, Some(VType::Double(3.14159)))
        .expect("value");
    temp.set_property_value(keys::CONNECTED, true)
        .expect("connected");
    assert_eq!(
        wait_for_lines(&output, 1),
        vec!["/g/t: textupdate temp = 3.14".to_string()]
    );

    toolkit.dispose_representation();
    temp.set_property_value(keys::CONNECTED, false)
        .expect("connected");
    thread::sleep(INTERVAL * 3);
    assert!(output.lines().is_empty());
    toolkit.shutdown();
}

#[test]
fn failing_widget_is_skipped_with_its_children() {
    let mut registry = RepresentationRegistry::new();
    let label_factory = console_registry()
        .factory(WidgetKind::Label)
        .expect("label factory");
    registry.register(WidgetKind::Label, label_factory);
    let toolkit =
        ToolkitRepresentation::new(Arc::new(registry), Arc::new(InlineExecutor), INTERVAL)
            .expect("toolkit");

    let display = Widget::new(WidgetKind::Display);
    let group = named(WidgetKind::Group, "g");
    group
        .add_child(named(WidgetKind::Label, "inner"))
        .expect("add");
    display.add_child(group).expect("add");
    display
        .add_child(named(WidgetKind::Label, "a/b"))
        .expect("add");
    display
        .add_child(named(WidgetKind::Label, "ok"))
        .expect("add");

    let output = ConsoleOutput::capture();
    assert_eq!(
        toolkit.represent_model(&ConsoleParent::root(output.clone()), &display),
        1
    );
    assert_eq!(toolkit.representation_count(), 1);
    assert_eq!(wait_for_lines(&output, 1), vec!["/ok: label 'Label'".to_string()]);
}

#[test]
fn registry_cell_initializes_once() {
    static CELL: RegistryCell<ConsoleParent> = RegistryCell::new();

    let first = CELL.initialize(|_| {}).expect("first");
    assert!(first.is_empty());
    assert!(matches!(
        CELL.initialize(|_| {}),
        Err(RepresentationError::AlreadyInitialized)
    ));
    let same = CELL.get_or_initialize(|_| unreachable!("already initialized"));
    assert!(Arc::ptr_eq(&first, &same));

    assert!(CELL.teardown());
    assert!(!CELL.teardown());
    assert!(CELL.get().is_none());

    let console = console_registry();
    assert!(Arc::ptr_eq(&console, &console_registry()));
    assert_eq!(console.len(), WidgetKind::ALL.len());
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ToolkitListener for Recorder {
    fn handle_action(&self, widget: &Widget, action: &ActionInfo) {
        self.events
            .lock()
            .push(format!("action {} {}", widget.name(), action.description()));
    }

    fn handle_click(&self, widget: &Widget) {
        self.events.lock().push(format!("click {}", widget.name()));
    }

    fn handle_write(&self, widget: &Widget, value: &str) {
        self.events
            .lock()
            .push(format!("write {} {value}", widget.name()));
    }
}

struct Broken;

impl ToolkitListener for Broken {
    fn handle_write(&self, _widget: &Widget, _value: &str) {
        panic!("listener failed");
    }
}

#[test]
fn toolkit_listeners_are_isolated() {
    let toolkit = console_toolkit(Arc::new(InlineExecutor), INTERVAL).expect("toolkit");
    let recorder = Arc::new(Recorder::default());
    toolkit.add_listener(Arc::new(Broken));
    let id = toolkit.add_listener(recorder.clone());
    let button = named(WidgetKind::ActionButton, "go");
    let action = ActionInfo::WritePv {
        description: "Start".to_string(),
        pv_name: "run".to_string(),
        value: "1".to_string(),
    };

    toolkit.fire_write(&button, "5");
    toolkit.fire_click(&button);
    toolkit.fire_action(&button, &action);
    assert!(toolkit.remove_listener(id));
    toolkit.fire_click(&button);

    assert_eq!(
        *recorder.events.lock(),
        vec![
            "write go 5".to_string(),
            "click go".to_string(),
            "action go Start".to_string(),
        ]
    );
}
