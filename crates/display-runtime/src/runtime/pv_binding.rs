//! Primary PV of PV-based widgets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use display_model::{keys, Widget};
use tracing::warn;

use super::behavior::RuntimeBehavior;
use super::{connect_logged, PvSubscription, RuntimeContext};
use crate::pv::RuntimePv;

/// Mirrors `pv_name` into the `pv_value` and `connected` runtime properties.
#[derive(Default)]
pub(crate) struct PvBinding {
    subscription: Option<PvSubscription>,
    active: Arc<AtomicBool>,
}

impl RuntimeBehavior for PvBinding {
    fn start(&mut self, widget: &Widget, context: &RuntimeContext) {
        let name = match widget.property_value(keys::PV_NAME) {
            Ok(name) => name,
            Err(err) => {
                warn!("{widget:?}: {err}");
                return;
            }
        };
        let Some(pv) = connect_logged(widget, context.pool(), &name) else {
            return;
        };
        self.active.store(true, Ordering::SeqCst);
        let active = Arc::clone(&self.active);
        let weak = widget.downgrade();
        let listener = pv.add_listener(move |_, value| {
            if !active.load(Ordering::SeqCst) {
                return;
            }
            let Some(widget) = weak.upgrade() else {
                return;
            };
            if let Some(property) = widget.checked_property(keys::PV_VALUE) {
                property.set_value(Some(value.clone()));
            }
            if let Some(property) = widget.checked_property(keys::CONNECTED) {
                property.set_value(true);
            }
        });
        self.subscription = Some(PvSubscription::new(pv, Some(listener)));
    }

    fn stop(&mut self, widget: &Widget, context: &RuntimeContext) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.take() {
            subscription.release(context.pool());
        }
        if let Some(property) = widget.checked_property(keys::CONNECTED) {
            property.set_value(false);
        }
    }

    fn primary_pv(&self) -> Option<RuntimePv> {
        self.subscription
            .as_ref()
            .map(|subscription| subscription.pv().clone())
    }
}
