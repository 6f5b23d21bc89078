//! Headless toolkit that renders widget state as text lines.
//!
//! Each represented widget prints `path: summary` whenever one of its
//! properties changed since the last update. Output goes to stdout or is
//! captured for inspection.

#![allow(missing_docs)]

use std::fmt::Write as _;
use std::sync::{Arc, Weak};
use std::time::Duration;

use display_model::{keys, ListenerId, VType, Widget, WidgetKind};
use parking_lot::Mutex;
use tracing::trace;

use crate::dirty::DirtyFlag;
use crate::error::RepresentationError;
use crate::executor::UiExecutor;
use crate::registry::{RegistryCell, RepresentationRegistry};
use crate::representation::{ToolkitRepresentation, WidgetRepresentation};
use crate::throttle::{UpdateScheduler, UpdateTarget};

static REGISTRY: RegistryCell<ConsoleParent> = RegistryCell::new();

/// Where console lines go.
#[derive(Debug, Default)]
pub struct ConsoleOutput {
    echo: bool,
    lines: Mutex<Vec<String>>,
}

impl ConsoleOutput {
    /// Print lines to stdout as they are produced.
    #[must_use]
    pub fn stdout() -> Arc<Self> {
        Arc::new(Self {
            echo: true,
            lines: Mutex::new(Vec::new()),
        })
    }

    /// Keep lines in memory only.
    #[must_use]
    pub fn capture() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emit(&self, line: String) {
        if self.echo {
            println!("{line}");
        }
        self.lines.lock().push(line);
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Remove and return the lines produced so far.
    pub fn take_lines(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

/// Parent handle: the slash-separated path of the enclosing container.
#[derive(Debug, Clone)]
pub struct ConsoleParent {
    path: String,
    output: Arc<ConsoleOutput>,
}

impl ConsoleParent {
    #[must_use]
    pub fn root(output: Arc<ConsoleOutput>) -> Self {
        Self {
            path: String::new(),
            output,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn child(&self, segment: &str) -> Self {
        Self {
            path: format!("{}/{segment}", self.path),
            output: Arc::clone(&self.output),
        }
    }
}

struct Attached {
    path: String,
    output: Arc<ConsoleOutput>,
    listener: ListenerId,
}

/// Console item for any widget kind.
pub struct ConsoleRepresentation {
    widget: Widget,
    this: Weak<ConsoleRepresentation>,
    scheduler: UpdateScheduler,
    dirty: DirtyFlag,
    attached: Mutex<Option<Attached>>,
}

impl ConsoleRepresentation {
    fn create(widget: &Widget, scheduler: UpdateScheduler) -> Arc<dyn WidgetRepresentation<ConsoleParent>> {
        Arc::new_cyclic(|this| Self {
            widget: widget.clone(),
            this: this.clone(),
            scheduler,
            dirty: DirtyFlag::new(),
            attached: Mutex::new(None),
        })
    }

    fn request_update(&self) {
        if let Some(this) = self.this.upgrade() {
            self.scheduler.schedule_update(this);
        }
    }
}

impl UpdateTarget for ConsoleRepresentation {
    fn update_changes(&self) {
        if !self.dirty.check_and_clear() {
            return;
        }
        let attached = self.attached.lock();
        let Some(attached) = attached.as_ref() else {
            return;
        };
        trace!("update {}", attached.path);
        attached
            .output
            .emit(format!("{}: {}", attached.path, summarize(&self.widget)));
    }
}

impl WidgetRepresentation<ConsoleParent> for ConsoleRepresentation {
    fn widget(&self) -> &Widget {
        &self.widget
    }

    fn init(&self, parent: &ConsoleParent) -> Result<ConsoleParent, RepresentationError> {
        let name = self.widget.name();
        let segment = if name.is_empty() {
            self.widget.type_name().to_string()
        } else {
            name
        };
        if segment.contains('/') {
            return Err(RepresentationError::Init {
                widget: segment.into(),
                reason: "name contains '/'".into(),
            });
        }
        let own = parent.child(&segment);
        let this = self.this.clone();
        let listener = self.widget.add_property_listener(move |_, _, _| {
            if let Some(this) = this.upgrade() {
                if this.dirty.mark() {
                    this.request_update();
                }
            }
        });
        *self.attached.lock() = Some(Attached {
            path: own.path.clone(),
            output: Arc::clone(&parent.output),
            listener,
        });
        self.dirty.mark();
        self.request_update();
        Ok(if self.widget.is_container() {
            own
        } else {
            parent.clone()
        })
    }

    fn dispose(&self) {
        if let Some(attached) = self.attached.lock().take() {
            self.widget.remove_property_listener(attached.listener);
        }
    }
}

/// One-line rendering of the widget's current state.
fn summarize(widget: &Widget) -> String {
    let mut line = widget.type_name().to_string();
    match widget.kind() {
        WidgetKind::Label => {
            let text = widget.property_value(keys::TEXT).unwrap_or_default();
            let _ = write!(line, " '{text}'");
        }
        WidgetKind::Image => {
            let crosshair = widget
                .property_value(keys::CURSOR_CROSSHAIR)
                .unwrap_or_default();
            if let [x, y] = crosshair.as_slice() {
                let _ = write!(line, " crosshair ({x}, {y})");
            }
        }
        WidgetKind::Embedded => {
            let file = widget.property_value(keys::FILE).unwrap_or_default();
            let _ = write!(line, " {file}");
        }
        _ => {}
    }
    if widget.kind().is_pv_based() {
        let pv = widget.property_value(keys::PV_NAME).unwrap_or_default();
        let connected = widget.property_value(keys::CONNECTED).unwrap_or_default();
        let value = widget.property_value(keys::PV_VALUE).ok().flatten();
        match (pv.is_empty(), connected, value) {
            (true, _, _) => {}
            (false, true, Some(value)) => {
                let _ = write!(line, " {pv} = {}", format_value(widget, &value));
            }
            (false, _, _) => {
                let _ = write!(line, " {pv} <disconnected>");
            }
        }
    }
    line
}

fn format_value(widget: &Widget, value: &VType) -> String {
    let precision = widget
        .property_value(keys::PRECISION)
        .ok()
        .and_then(|precision| usize::try_from(precision).ok());
    match (value, precision) {
        (VType::Double(number), Some(precision)) => format!("{number:.precision$}"),
        _ => value.to_string(),
    }
}

fn register_all(registry: &mut RepresentationRegistry<ConsoleParent>) {
    for kind in WidgetKind::ALL {
        registry.register(kind, ConsoleRepresentation::create);
    }
}

/// Console registry, created on first use.
#[must_use]
pub fn console_registry() -> Arc<RepresentationRegistry<ConsoleParent>> {
    REGISTRY.get_or_initialize(register_all)
}

/// Drop the console registry. Returns `false` if it was never created.
pub fn teardown_console_registry() -> bool {
    REGISTRY.teardown()
}

/// Console toolkit with its update throttle running.
pub fn console_toolkit(
    executor: Arc<dyn UiExecutor>,
    update_interval: Duration,
) -> Result<ToolkitRepresentation<ConsoleParent>, RepresentationError> {
    ToolkitRepresentation::new(console_registry(), executor, update_interval)
}
