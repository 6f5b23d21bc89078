//! Widget scripts triggered by PV updates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use display_model::value::ScriptInfo;
use display_model::{keys, VType, Widget};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::behavior::RuntimeBehavior;
use super::{connect_logged, PvSubscription, RuntimeContext};
use crate::pv::RuntimePv;
use crate::script::{Script, ScriptFuture};

/// Runs each configured script whenever one of its trigger PVs updates,
/// once all of its PVs have a value.
#[derive(Default)]
pub(crate) struct ScriptBindings {
    active: Arc<AtomicBool>,
    subscriptions: Vec<PvSubscription>,
    futures: Arc<Mutex<Vec<ScriptFuture>>>,
}

impl ScriptBindings {
    fn bind(&mut self, widget: &Widget, context: &RuntimeContext, info: &ScriptInfo) {
        let Some(support) = context.scripts() else {
            return;
        };
        let script = match support.compile(info) {
            Ok(script) => script,
            Err(err) => {
                warn!("{widget:?}: {err}");
                return;
            }
        };
        let macros = widget.effective_macros();
        let mut pvs = Vec::with_capacity(info.pvs.len());
        for pv_info in &info.pvs {
            let name = macros.resolve(&pv_info.name);
            match connect_logged(widget, context.pool(), &name) {
                Some(pv) => pvs.push((pv, pv_info.trigger)),
                None => {
                    warn!("{widget:?}: script {} not started", script.name());
                    for (pv, _) in pvs {
                        PvSubscription::new(pv, None).release(context.pool());
                    }
                    return;
                }
            }
        }
        let all: Arc<[RuntimePv]> = pvs.iter().map(|(pv, _)| pv.clone()).collect();
        if all.is_empty() {
            self.submit(&script, widget, &all);
            return;
        }
        for (pv, trigger) in pvs {
            let listener = trigger.then(|| {
                pv.add_listener(trigger_listener(
                    Arc::clone(&self.active),
                    Arc::clone(&self.futures),
                    widget,
                    Arc::clone(&script),
                    Arc::clone(&all),
                ))
            });
            self.subscriptions.push(PvSubscription::new(pv, listener));
        }
    }

    fn submit(&self, script: &Arc<dyn Script>, widget: &Widget, pvs: &[RuntimePv]) {
        debug!("{widget:?}: submit {}", script.name());
        track(&self.futures, script.submit(widget, pvs));
    }
}

fn track(futures: &Mutex<Vec<ScriptFuture>>, future: ScriptFuture) {
    let mut futures = futures.lock();
    futures.retain(|pending| !pending.is_done());
    futures.push(future);
}

fn trigger_listener(
    active: Arc<AtomicBool>,
    futures: Arc<Mutex<Vec<ScriptFuture>>>,
    widget: &Widget,
    script: Arc<dyn Script>,
    pvs: Arc<[RuntimePv]>,
) -> impl Fn(&RuntimePv, &VType) + Send + Sync + 'static {
    let weak = widget.downgrade();
    move |_, _| {
        if !active.load(Ordering::SeqCst) {
            return;
        }
        if pvs.iter().any(|pv| pv.read().is_none()) {
            return;
        }
        let Some(widget) = weak.upgrade() else {
            return;
        };
        track(&futures, script.submit(&widget, &pvs));
    }
}

impl RuntimeBehavior for ScriptBindings {
    fn start(&mut self, widget: &Widget, context: &RuntimeContext) {
        let scripts = widget.property_value(keys::SCRIPTS).unwrap_or_default();
        if scripts.is_empty() {
            return;
        }
        if context.scripts().is_none() {
            warn!(
                "{widget:?}: no script support, {} script(s) not started",
                scripts.len()
            );
            return;
        }
        self.active.store(true, Ordering::SeqCst);
        for info in &scripts {
            self.bind(widget, context, info);
        }
    }

    fn stop(&mut self, _widget: &Widget, context: &RuntimeContext) {
        self.active.store(false, Ordering::SeqCst);
        for future in self.futures.lock().drain(..) {
            future.cancel();
        }
        for subscription in self.subscriptions.drain(..) {
            subscription.release(context.pool());
        }
    }
}
