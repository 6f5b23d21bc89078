//! Behaviors a runtime runs while started, chosen by widget kind.

use display_model::{Widget, WidgetKind};

use super::image::ImageBindings;
use super::pv_binding::PvBinding;
use super::scripts::ScriptBindings;
use super::RuntimeContext;
use crate::pv::RuntimePv;

/// One concern of a started widget. `stop` releases exactly what `start`
/// acquired, including after a partial start.
pub(crate) trait RuntimeBehavior: Send {
    fn start(&mut self, widget: &Widget, context: &RuntimeContext);

    fn stop(&mut self, widget: &Widget, context: &RuntimeContext);

    /// PV user input is written to, if this behavior owns it.
    fn primary_pv(&self) -> Option<RuntimePv> {
        None
    }
}

pub(crate) fn behaviors_for(kind: WidgetKind) -> Vec<Box<dyn RuntimeBehavior>> {
    let mut behaviors: Vec<Box<dyn RuntimeBehavior>> = Vec::new();
    if kind.is_pv_based() {
        behaviors.push(Box::new(PvBinding::default()));
    }
    if kind == WidgetKind::Image {
        behaviors.push(Box::new(ImageBindings::default()));
    }
    behaviors.push(Box::new(ScriptBindings::default()));
    behaviors
}
