//! Configured widget actions and the runtime context actions.

use display_model::value::{ActionInfo, ScriptInfo};
use display_model::{keys, Macros, VType, Widget, WidgetKind};
use tracing::{debug, info, warn};

use super::RuntimeContext;
use crate::error::RuntimeError;
use crate::script::ScriptFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeActionKind {
    ToggleToolbar,
}

/// Context-menu entry contributed by a widget runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeAction {
    kind: RuntimeActionKind,
    description: &'static str,
    icon: &'static str,
}

impl RuntimeAction {
    #[must_use]
    pub fn toggle_toolbar() -> Self {
        Self {
            kind: RuntimeActionKind::ToggleToolbar,
            description: "Toggle Toolbar",
            icon: "toolbar",
        }
    }

    #[must_use]
    pub fn kind(&self) -> RuntimeActionKind {
        self.kind
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        self.description
    }

    #[must_use]
    pub fn icon(&self) -> &'static str {
        self.icon
    }

    pub fn run(&self, widget: &Widget) -> Result<(), RuntimeError> {
        match self.kind {
            RuntimeActionKind::ToggleToolbar => {
                let property = widget.property(keys::SHOW_TOOLBAR)?;
                property.set_value(!property.value());
            }
        }
        Ok(())
    }
}

pub(crate) fn runtime_actions_for(kind: WidgetKind) -> Vec<RuntimeAction> {
    match kind {
        WidgetKind::Image => vec![RuntimeAction::toggle_toolbar()],
        _ => Vec::new(),
    }
}

/// Run `action` for `widget`. Script actions return their future.
pub(crate) fn execute(
    widget: &Widget,
    context: &RuntimeContext,
    action: &ActionInfo,
) -> Result<Option<ScriptFuture>, RuntimeError> {
    let macros = widget.effective_macros();
    match action {
        ActionInfo::WritePv { pv_name, value, .. } => {
            let name = macros.resolve(pv_name);
            let value = VType::parse(&macros.resolve(value));
            info!("{widget:?}: write {name} = {value}");
            let pv = context.pool().get_pv(&name)?;
            let written = pv.write(&value);
            if let Err(err) = context.pool().release_pv(&pv) {
                warn!("{err}");
            }
            written?;
            Ok(None)
        }
        ActionInfo::OpenDisplay {
            file,
            target,
            macros: action_macros,
            ..
        } => {
            let opener = context
                .opener()
                .ok_or_else(|| RuntimeError::NoDisplayOpener(widget.name().into()))?;
            let macros = Macros::merge(&macros, action_macros);
            let file = macros.resolve(file);
            debug!("{widget:?}: open {file} in {}", target.as_str());
            opener.open_display(widget, &file, *target, &macros)?;
            Ok(None)
        }
        ActionInfo::ExecuteScript { file, .. } => {
            let support = context
                .scripts()
                .ok_or_else(|| RuntimeError::NoScriptSupport(widget.name().into()))?;
            let script = support.compile(&ScriptInfo::new(macros.resolve(file), Vec::new()))?;
            debug!("{widget:?}: execute {}", script.name());
            Ok(Some(script.submit(widget, &[])))
        }
    }
}
