use std::sync::Arc;

use parking_lot::Mutex;
use smol_str::SmolStr;

use display_model::value::{ActionInfo, OpenTarget};
use display_model::{keys, Macros, VType, Widget, WidgetKind};
use display_runtime::{
    DisplayOpener, DisplayRuntime, LocalPvConnector, PvPool, RuntimeContext, RuntimeError,
    RuntimeState, WidgetRuntime,
};

fn context(connector: &LocalPvConnector) -> (RuntimeContext, Arc<PvPool>) {
    let pool = Arc::new(PvPool::new(Arc::new(connector.clone())));
    (RuntimeContext::new(Arc::clone(&pool)), pool)
}

fn text_update(pv: &str) -> Widget {
    let widget = Widget::new(WidgetKind::TextUpdate);
    widget
        .set_property_value(keys::NAME, pv.to_string())
        .expect("name");
    widget
        .set_property_value(keys::PV_NAME, pv.to_string())
        .expect("pv");
    widget
}

fn display_with(children: &[&Widget]) -> Widget {
    let display = Widget::new(WidgetKind::Display);
    for child in children {
        display.add_child((*child).clone()).expect("add");
    }
    display
}

#[test]
fn pv_value_follows_pv_until_stopped() {
    let connector = LocalPvConnector::new().with_value("temp", VType::Double(1.5));
    let (context, pool) = context(&connector);
    let widget = text_update("temp");
    let runtime = DisplayRuntime::new(display_with(&[&widget]), context);

    assert_eq!(runtime.start(), 2);
    assert_eq!(
        widget.property_value(keys::PV_VALUE).expect("value"),
        Some(VType::Double(1.5))
    );
    assert!(widget.property_value(keys::CONNECTED).expect("connected"));

    connector.set("temp", VType::Double(2.0));
    assert_eq!(
        widget.property_value(keys::PV_VALUE).expect("value"),
        Some(VType::Double(2.0))
    );
    assert_eq!(pool.references("temp"), 1);
    assert_eq!(runtime.state_of(&widget), Some(RuntimeState::Started));

    runtime.stop();
    runtime.stop();
    assert!(!runtime.is_running());
    assert!(pool.is_empty());
    assert_eq!(connector.subscriber_count("temp"), 0);
    assert!(!widget.property_value(keys::CONNECTED).expect("connected"));

    connector.set("temp", VType::Double(3.0));
    assert_eq!(
        widget.property_value(keys::PV_VALUE).expect("value"),
        Some(VType::Double(2.0))
    );
}

#[test]
fn lifecycle_rejects_out_of_order_calls() {
    let connector = LocalPvConnector::new();
    let (context, _pool) = context(&connector);
    let runtime = WidgetRuntime::new(Widget::new(WidgetKind::Label), context);

    assert_eq!(
        runtime.start(),
        Err(RuntimeError::InvalidTransition {
            widget: "".into(),
            from: "created",
            to: "started",
        })
    );
    runtime.stop();
    assert_eq!(runtime.state(), RuntimeState::Created);

    runtime.initialize().expect("initialize");
    assert!(runtime.initialize().is_err());
    runtime.start().expect("start");
    runtime.stop();
    runtime.stop();
    assert_eq!(runtime.state(), RuntimeState::Stopped);
    assert!(matches!(
        runtime.start(),
        Err(RuntimeError::InvalidTransition { from: "stopped", .. })
    ));

    runtime.dispose();
    runtime.dispose();
    assert_eq!(runtime.state(), RuntimeState::Disposed);
}

#[test]
fn failed_connection_leaves_other_widgets_running() {
    let connector = LocalPvConnector::new().with_value("ok", VType::Long(1));
    connector.fail_connect("broken");
    let (context, pool) = context(&connector);
    let broken = text_update("broken");
    let ok = text_update("ok");
    let runtime = DisplayRuntime::new(display_with(&[&broken, &ok]), context);

    assert_eq!(runtime.start(), 3);

    assert!(ok.property_value(keys::CONNECTED).expect("connected"));
    assert!(!broken.property_value(keys::CONNECTED).expect("connected"));
    assert_eq!(pool.names(), vec!["ok"]);
    assert_eq!(
        runtime.write_primary_pv(&broken, "1"),
        Err(RuntimeError::NoPv("broken".into()))
    );

    runtime.stop();
    assert!(pool.is_empty());
}

#[test]
fn shared_pv_is_counted_per_widget() {
    let connector = LocalPvConnector::new();
    let (context, pool) = context(&connector);
    let first = text_update("shared");
    let second = text_update("shared");
    let runtime = DisplayRuntime::new(display_with(&[&first, &second]), context);

    runtime.start();
    assert_eq!(pool.references("shared"), 2);
    assert_eq!(connector.subscriber_count("shared"), 1);

    runtime.stop();
    assert_eq!(pool.references("shared"), 0);
    assert_eq!(connector.subscriber_count("shared"), 0);
}

#[test]
fn pv_name_resolves_display_macros() {
    let connector = LocalPvConnector::new().with_value("dev:temp", VType::Long(7));
    let (context, pool) = context(&connector);
    let widget = Widget::new(WidgetKind::TextUpdate);
    widget
        .property(keys::PV_NAME)
        .expect("pv")
        .set_specification("$(P):temp")
        .expect("macroized");
    let display = display_with(&[&widget]);
    display
        .set_property_value(
            keys::MACROS,
            Macros::from_pairs([("P", "dev")]).expect("macros"),
        )
        .expect("macros");
    let runtime = DisplayRuntime::new(display, context);

    runtime.start();

    assert_eq!(pool.names(), vec!["dev:temp"]);
    assert_eq!(
        widget.property_value(keys::PV_VALUE).expect("value"),
        Some(VType::Long(7))
    );
}

#[test]
fn user_input_is_parsed_and_written() {
    let connector = LocalPvConnector::new();
    let (context, _pool) = context(&connector);
    let widget = text_update("setpoint");
    let label = Widget::new(WidgetKind::Label);
    let runtime = DisplayRuntime::new(display_with(&[&widget, &label]), context);
    runtime.start();

    runtime.write_primary_pv(&widget, " 42 ").expect("write");
    runtime.write_primary_pv(&widget, "on").expect("write");

    assert_eq!(
        connector.writes(),
        vec![
            (SmolStr::from("setpoint"), VType::Long(42)),
            (SmolStr::from("setpoint"), VType::Text("on".to_string())),
        ]
    );
    assert_eq!(
        widget.property_value(keys::PV_VALUE).expect("value"),
        Some(VType::Text("on".to_string()))
    );
    assert_eq!(
        runtime.write_primary_pv(&label, "1"),
        Err(RuntimeError::NoPv("".into()))
    );
    let stranger = text_update("other");
    assert_eq!(
        runtime.write_primary_pv(&stranger, "1"),
        Err(RuntimeError::NotRunning("other".into()))
    );
}

#[test]
fn write_pv_action_resolves_macros_and_releases() {
    let connector = LocalPvConnector::new();
    let (context, pool) = context(&connector);
    let button = Widget::new(WidgetKind::ActionButton);
    let reset = ActionInfo::WritePv {
        description: "Reset".to_string(),
        pv_name: "$(P):reset".to_string(),
        value: "$(V)".to_string(),
    };
    button
        .set_property_value(keys::ACTIONS, vec![reset.clone()])
        .expect("actions");
    let display = display_with(&[&button]);
    display
        .set_property_value(
            keys::MACROS,
            Macros::from_pairs([("P", "dev"), ("V", "1")]).expect("macros"),
        )
        .expect("macros");
    let runtime = DisplayRuntime::new(display, context);
    runtime.start();

    runtime.execute_action(&button, &reset).expect("action");

    assert_eq!(connector.writes(), vec![(SmolStr::from("dev:reset"), VType::Long(1))]);
    assert!(pool.is_empty());
}

#[derive(Default)]
struct RecordingOpener {
    opened: Mutex<Vec<(String, OpenTarget, Option<String>)>>,
}

impl DisplayOpener for RecordingOpener {
    fn open_display(
        &self,
        _widget: &Widget,
        file: &str,
        target: OpenTarget,
        macros: &Macros,
    ) -> Result<(), RuntimeError> {
        self.opened.lock().push((
            file.to_string(),
            target,
            macros.get("P").map(str::to_string),
        ));
        Ok(())
    }
}

#[test]
fn open_display_goes_through_the_opener() {
    let connector = LocalPvConnector::new();
    let (context, _pool) = context(&connector);
    let button = Widget::new(WidgetKind::ActionButton);
    button
        .set_property_value(keys::NAME, "nav".to_string())
        .expect("name");
    let open = ActionInfo::OpenDisplay {
        description: "Details".to_string(),
        file: "$(F).bob".to_string(),
        target: OpenTarget::Tab,
        macros: Macros::from_pairs([("F", "details")]).expect("macros"),
    };
    let display = display_with(&[&button]);
    display
        .set_property_value(keys::MACROS, Macros::from_pairs([("P", "dev")]).expect("macros"))
        .expect("macros");

    let without = WidgetRuntime::new(button.clone(), context.clone());
    assert_eq!(
        without.execute_action(&open),
        Err(RuntimeError::NoDisplayOpener("nav".into()))
    );

    let opener = Arc::new(RecordingOpener::default());
    let runtime = WidgetRuntime::new(button, context.with_opener(opener.clone()));
    runtime.execute_action(&open).expect("open");
    assert_eq!(
        *opener.opened.lock(),
        vec![(
            "details.bob".to_string(),
            OpenTarget::Tab,
            Some("dev".to_string())
        )]
    );
}

#[test]
fn image_offers_toolbar_toggle() {
    let connector = LocalPvConnector::new();
    let (context, _pool) = context(&connector);
    let image = Widget::new(WidgetKind::Image);
    let runtime = WidgetRuntime::new(image.clone(), context.clone());
    runtime.initialize().expect("initialize");

    let actions = runtime.runtime_actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].description(), "Toggle Toolbar");
    assert!(!image.property_value(keys::SHOW_TOOLBAR).expect("toolbar"));
    actions[0].run(&image).expect("toggle");
    assert!(image.property_value(keys::SHOW_TOOLBAR).expect("toolbar"));
    actions[0].run(&image).expect("toggle");
    assert!(!image.property_value(keys::SHOW_TOOLBAR).expect("toolbar"));

    let label = WidgetRuntime::new(Widget::new(WidgetKind::Label), context);
    label.initialize().expect("initialize");
    assert!(label.runtime_actions().is_empty());
}
