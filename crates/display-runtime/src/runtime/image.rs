//! Cursor and region-of-interest PVs of image widgets.
//!
//! Both directions are bound: PV updates move the crosshair or an ROI, and
//! user edits of `cursor_info` or `rois` are written out. A write happens
//! only when the value actually changed and differs from what the PV last
//! reported, so a PV echoing a write does not start a loop.
//!
//! ROI updates are applied under one lock per widget, and an update from a
//! PV never causes a write. The lock is reentrant because writing an edit to
//! a local PV delivers the echo on the same thread.

#![allow(clippy::float_cmp)]

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use display_model::value::{RoiCoordinate, RoiInfo};
use display_model::{keys, PropertyKey, VType, WeakWidget, Widget};
use parking_lot::ReentrantMutex;
use tracing::{trace, warn};

use super::behavior::RuntimeBehavior;
use super::{
    connect_logged, write_logged, PropertySubscription, PvSubscription, RuntimeContext,
};
use crate::pv::RuntimePv;

#[derive(Default)]
pub(crate) struct ImageBindings {
    active: Arc<AtomicBool>,
    cursor: Option<PvSubscription>,
    x: Option<PvSubscription>,
    y: Option<PvSubscription>,
    cursor_listener: Option<PropertySubscription>,
    rois: Vec<PvSubscription>,
    rois_listener: Option<PropertySubscription>,
    roi_lock: RoiLock,
}

/// Serializes ROI updates. Set while a PV update is being applied.
type RoiLock = Arc<ReentrantMutex<Cell<bool>>>;

struct RoiTarget {
    index: usize,
    coordinate: RoiCoordinate,
    pv: RuntimePv,
}

impl ImageBindings {
    fn bind_cursor(&mut self, widget: &Widget, context: &RuntimeContext) {
        let connect = |key: PropertyKey<String>| {
            let name = widget.property_value(key).ok()?;
            connect_logged(widget, context.pool(), &name)
        };
        self.cursor = connect(keys::CURSOR_INFO_PV).map(|pv| PvSubscription::new(pv, None));
        self.x = connect(keys::CURSOR_X_PV).map(|pv| PvSubscription::new(pv, None));
        self.y = connect(keys::CURSOR_Y_PV).map(|pv| PvSubscription::new(pv, None));

        let pv_of = |slot: &Option<PvSubscription>| slot.as_ref().map(|sub| sub.pv().clone());
        let (cursor_pv, x_pv, y_pv) = (pv_of(&self.cursor), pv_of(&self.x), pv_of(&self.y));

        if let (Some(x_pv), Some(y_pv)) = (&x_pv, &y_pv) {
            let x_listener = x_pv.add_listener(self.crosshair_listener(widget, x_pv, y_pv));
            let y_listener = y_pv.add_listener(self.crosshair_listener(widget, x_pv, y_pv));
            if let Some(sub) = self.x.as_mut() {
                sub.set_listener(x_listener);
            }
            if let Some(sub) = self.y.as_mut() {
                sub.set_listener(y_listener);
            }
        }

        if cursor_pv.is_none() && x_pv.is_none() && y_pv.is_none() {
            return;
        }
        let Some(property) = widget.checked_property(keys::CURSOR_INFO) else {
            return;
        };
        let active = Arc::clone(&self.active);
        let listener = property.add_listener(move |_, _, new| {
            if !active.load(Ordering::SeqCst) {
                return;
            }
            let Some(Some(info)) = new else {
                return;
            };
            if let Some(pv) = &cursor_pv {
                write_logged(pv, &info);
            }
            for (pv, index) in [(&x_pv, 0), (&y_pv, 1)] {
                let (Some(pv), Some(position)) = (pv, cursor_cell(&info, index)) else {
                    continue;
                };
                let position = VType::Double(position);
                if pv.read().as_ref() != Some(&position) {
                    write_logged(pv, &position);
                }
            }
        });
        self.cursor_listener = Some(PropertySubscription::new(
            Arc::clone(property.untyped()),
            listener,
        ));
    }

    fn crosshair_listener(
        &self,
        widget: &Widget,
        x_pv: &RuntimePv,
        y_pv: &RuntimePv,
    ) -> impl Fn(&RuntimePv, &VType) + Send + Sync + 'static {
        let active = Arc::clone(&self.active);
        let weak = widget.downgrade();
        let (x_pv, y_pv) = (x_pv.clone(), y_pv.clone());
        move |_, _| {
            if !active.load(Ordering::SeqCst) {
                return;
            }
            let x = x_pv.read().and_then(|value| value.as_f64());
            let y = y_pv.read().and_then(|value| value.as_f64());
            let (Some(x), Some(y), Some(widget)) = (x, y, weak.upgrade()) else {
                return;
            };
            if let Some(property) = widget.checked_property(keys::CURSOR_CROSSHAIR) {
                property.set_value(vec![x, y]);
            }
        }
    }

    fn bind_rois(&mut self, widget: &Widget, context: &RuntimeContext) {
        let Some(property) = widget.checked_property(keys::ROIS) else {
            return;
        };
        let macros = widget.effective_macros();
        let mut targets = Vec::new();
        for (index, roi) in property.value().iter().enumerate() {
            for coordinate in RoiCoordinate::ALL {
                let name = macros.resolve(roi.pv_name(coordinate));
                let Some(pv) = connect_logged(widget, context.pool(), &name) else {
                    continue;
                };
                let listener = pv.add_listener(roi_listener(
                    Arc::clone(&self.active),
                    Arc::clone(&self.roi_lock),
                    widget.downgrade(),
                    index,
                    coordinate,
                ));
                targets.push(RoiTarget {
                    index,
                    coordinate,
                    pv: pv.clone(),
                });
                self.rois.push(PvSubscription::new(pv, Some(listener)));
            }
        }
        if targets.is_empty() {
            return;
        }
        let active = Arc::clone(&self.active);
        let lock = Arc::clone(&self.roi_lock);
        let listener = property.add_listener(move |_, old, new| {
            if !active.load(Ordering::SeqCst) {
                return;
            }
            let (Some(old), Some(new)) = (old, new) else {
                return;
            };
            let applying = lock.lock();
            if applying.get() {
                return;
            }
            for target in &targets {
                write_roi_change(target, &old, &new);
            }
        });
        self.rois_listener = Some(PropertySubscription::new(
            Arc::clone(property.untyped()),
            listener,
        ));
    }
}

fn cursor_cell(info: &VType, index: usize) -> Option<f64> {
    match info {
        VType::DoubleArray(values) => values.get(index).copied(),
        _ => None,
    }
}

/// PV update to ROI coordinate, skipped when the ROI already has the value
/// or the PV has since reported another one.
fn roi_listener(
    active: Arc<AtomicBool>,
    lock: RoiLock,
    widget: WeakWidget,
    index: usize,
    coordinate: RoiCoordinate,
) -> impl Fn(&RuntimePv, &VType) + Send + Sync + 'static {
    move |pv, value| {
        if !active.load(Ordering::SeqCst) {
            return;
        }
        let Some(number) = value.as_f64() else {
            warn!("ROI PV {pv} has non-numeric value {value}");
            return;
        };
        let Some(property) = widget
            .upgrade()
            .and_then(|widget| widget.checked_property(keys::ROIS))
        else {
            return;
        };
        let applying = lock.lock();
        if pv.read().as_ref() != Some(value) {
            trace!("ROI PV {pv} moved on from {value}");
            return;
        }
        let mut rois = property.value();
        let Some(roi) = rois.get_mut(index) else {
            return;
        };
        if roi.coordinate(coordinate) == number {
            return;
        }
        roi.set_coordinate(coordinate, number);
        let nested = applying.replace(true);
        property.set_value(rois);
        applying.set(nested);
    }
}

/// ROI edit to PV, skipped when the coordinate did not change or the PV
/// already holds the value.
fn write_roi_change(target: &RoiTarget, old: &[RoiInfo], new: &[RoiInfo]) {
    let (Some(before), Some(after)) = (old.get(target.index), new.get(target.index)) else {
        return;
    };
    let value = after.coordinate(target.coordinate);
    if before.coordinate(target.coordinate) == value {
        return;
    }
    if target.pv.read().and_then(|current| current.as_f64()) == Some(value) {
        return;
    }
    write_logged(&target.pv, &VType::Double(value));
}

impl RuntimeBehavior for ImageBindings {
    fn start(&mut self, widget: &Widget, context: &RuntimeContext) {
        self.active.store(true, Ordering::SeqCst);
        self.bind_cursor(widget, context);
        self.bind_rois(widget, context);
    }

    fn stop(&mut self, _widget: &Widget, context: &RuntimeContext) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(listener) = self.rois_listener.take() {
            listener.release();
        }
        for subscription in self.rois.drain(..) {
            subscription.release(context.pool());
        }
        if let Some(listener) = self.cursor_listener.take() {
            listener.release();
        }
        // Each slot is released on its own; one missing PV must not keep
        // the others bound.
        for subscription in [self.y.take(), self.x.take(), self.cursor.take()]
            .into_iter()
            .flatten()
        {
            subscription.release(context.pool());
        }
    }
}
