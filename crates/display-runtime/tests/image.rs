use std::sync::Arc;

use display_model::value::RoiInfo;
use display_model::{keys, VType, Widget, WidgetKind};
use display_runtime::{DisplayRuntime, LocalPvConnector, PvPool, RuntimeContext};

fn start(connector: &LocalPvConnector, image: &Widget) -> (DisplayRuntime, Arc<PvPool>) {
    let pool = Arc::new(PvPool::new(Arc::new(connector.clone())));
    let display = Widget::new(WidgetKind::Display);
    display.add_child(image.clone()).expect("add");
    let runtime = DisplayRuntime::new(display, RuntimeContext::new(Arc::clone(&pool)));
    runtime.start();
    (runtime, pool)
}

fn image_with_cursor_pvs() -> Widget {
    let image = Widget::new(WidgetKind::Image);
    for (key, name) in [
        (keys::CURSOR_INFO_PV, "cursor"),
        (keys::CURSOR_X_PV, "cx"),
        (keys::CURSOR_Y_PV, "cy"),
    ] {
        image.set_property_value(key, name.to_string()).expect("pv");
    }
    image
}

#[test]
fn cursor_info_is_written_and_crosshair_follows_pvs() {
    let connector = LocalPvConnector::new();
    let image = image_with_cursor_pvs();
    let (runtime, pool) = start(&connector, &image);
    let cursor = image.property(keys::CURSOR_INFO).expect("cursor");

    cursor.set_value(Some(VType::DoubleArray(vec![3.0, 4.0])));

    assert_eq!(
        connector.value("cursor"),
        Some(VType::DoubleArray(vec![3.0, 4.0]))
    );
    assert_eq!(connector.value("cx"), Some(VType::Double(3.0)));
    assert_eq!(connector.value("cy"), Some(VType::Double(4.0)));
    assert_eq!(
        image.property_value(keys::CURSOR_CROSSHAIR).expect("crosshair"),
        vec![3.0, 4.0]
    );

    cursor.set_value(Some(VType::DoubleArray(vec![3.0, 5.0])));
    assert_eq!(connector.write_count("cursor"), 2);
    assert_eq!(connector.write_count("cx"), 1);
    assert_eq!(connector.write_count("cy"), 2);

    connector.set("cx", VType::Double(7.0));
    assert_eq!(
        image.property_value(keys::CURSOR_CROSSHAIR).expect("crosshair"),
        vec![7.0, 5.0]
    );
    assert_eq!(connector.write_count("cx"), 1);

    runtime.stop();
    assert!(pool.is_empty());
    for name in ["cursor", "cx", "cy"] {
        assert_eq!(connector.subscriber_count(name), 0, "{name}");
    }
}

#[test]
fn single_cursor_pv_is_released_on_stop() {
    let connector = LocalPvConnector::new();
    let image = Widget::new(WidgetKind::Image);
    image
        .set_property_value(keys::CURSOR_Y_PV, "cy".to_string())
        .expect("pv");
    let (runtime, pool) = start(&connector, &image);
    assert_eq!(pool.names(), vec!["cy"]);

    image
        .property(keys::CURSOR_INFO)
        .expect("cursor")
        .set_value(Some(VType::DoubleArray(vec![1.0, 2.0])));
    assert_eq!(connector.value("cy"), Some(VType::Double(2.0)));
    assert!(image
        .property_value(keys::CURSOR_CROSSHAIR)
        .expect("crosshair")
        .is_empty());

    runtime.stop();
    assert!(pool.is_empty());
}

#[test]
fn roi_binding_does_not_echo() {
    let connector = LocalPvConnector::new().with_value("roi:x", VType::Double(5.0));
    let image = Widget::new(WidgetKind::Image);
    let mut roi = RoiInfo::new("beam");
    roi.x_pv = "roi:x".to_string();
    image
        .set_property_value(keys::ROIS, vec![roi])
        .expect("rois");
    let rois = image.property(keys::ROIS).expect("rois");
    let (runtime, pool) = start(&connector, &image);

    assert_eq!(rois.value()[0].x, 5.0);
    assert!(connector.writes().is_empty());

    let mut edited = rois.value();
    edited[0].x = 8.0;
    rois.set_value(edited);
    assert_eq!(connector.value("roi:x"), Some(VType::Double(8.0)));
    assert_eq!(rois.value()[0].x, 8.0);
    assert_eq!(connector.write_count("roi:x"), 1);

    connector.set("roi:x", VType::Double(9.0));
    assert_eq!(rois.value()[0].x, 9.0);
    assert_eq!(connector.write_count("roi:x"), 1);

    let mut edited = rois.value();
    edited[0].width = 42.0;
    rois.set_value(edited);
    assert_eq!(connector.write_count("roi:x"), 1);

    runtime.stop();
    assert!(pool.is_empty());
    edited = rois.value();
    edited[0].x = 1.0;
    rois.set_value(edited);
    assert_eq!(connector.write_count("roi:x"), 1);
}

#[test]
fn concurrent_roi_updates_keep_both_coordinates_without_writes() {
    let connector = LocalPvConnector::new()
        .with_value("roi:x", VType::Double(0.0))
        .with_value("roi:y", VType::Double(0.0));
    let image = Widget::new(WidgetKind::Image);
    let mut roi = RoiInfo::new("beam");
    roi.x_pv = "roi:x".to_string();
    roi.y_pv = "roi:y".to_string();
    image
        .set_property_value(keys::ROIS, vec![roi])
        .expect("rois");
    let rois = image.property(keys::ROIS).expect("rois");
    let (runtime, pool) = start(&connector, &image);

    const LAST: u32 = 20_000;
    std::thread::scope(|scope| {
        for name in ["roi:x", "roi:y"] {
            let connector = &connector;
            scope.spawn(move || {
                for i in 1..=LAST {
                    connector.set(name, VType::Double(f64::from(i)));
                }
            });
        }
    });

    assert!(connector.writes().is_empty());
    let roi = &rois.value()[0];
    assert_eq!((roi.x, roi.y), (f64::from(LAST), f64::from(LAST)));

    runtime.stop();
    assert!(pool.is_empty());
}
