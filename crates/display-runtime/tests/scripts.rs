use std::sync::Arc;

use parking_lot::Mutex;

use display_model::value::{ActionInfo, ScriptInfo, ScriptPv};
use display_model::{keys, Macros, VType, Widget, WidgetKind};
use display_runtime::{
    DisplayRuntime, LocalPvConnector, PvPool, RuntimeContext, RuntimeError, RuntimePv, Script,
    ScriptCompletion, ScriptFuture, ScriptSupport,
};

/// Records compilations and runs; runs stay pending until the test
/// completes them.
#[derive(Clone, Default)]
struct Recorder {
    compiled: Arc<Mutex<Vec<String>>>,
    runs: Arc<Mutex<Vec<Vec<Option<VType>>>>>,
    pending: Arc<Mutex<Vec<ScriptCompletion>>>,
}

struct RecordedScript {
    name: String,
    recorder: Recorder,
}

impl ScriptSupport for Recorder {
    fn compile(&self, info: &ScriptInfo) -> Result<Arc<dyn Script>, RuntimeError> {
        self.compiled.lock().push(info.file.clone());
        Ok(Arc::new(RecordedScript {
            name: info.file.clone(),
            recorder: self.clone(),
        }))
    }
}

impl Script for RecordedScript {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, _widget: &Widget, pvs: &[RuntimePv]) -> ScriptFuture {
        self.recorder
            .runs
            .lock()
            .push(pvs.iter().map(RuntimePv::read).collect());
        let (future, completion) = ScriptFuture::pending();
        self.recorder.pending.lock().push(completion);
        future
    }
}

fn runtime_for(
    connector: &LocalPvConnector,
    widget: &Widget,
    recorder: Option<&Recorder>,
) -> (DisplayRuntime, Arc<PvPool>) {
    let pool = Arc::new(PvPool::new(Arc::new(connector.clone())));
    let mut context = RuntimeContext::new(Arc::clone(&pool));
    if let Some(recorder) = recorder {
        context = context.with_scripts(Arc::new(recorder.clone()));
    }
    let display = Widget::new(WidgetKind::Display);
    display
        .set_property_value(keys::MACROS, Macros::from_pairs([("S", "init")]).expect("macros"))
        .expect("macros");
    display.add_child(widget.clone()).expect("add");
    (DisplayRuntime::new(display, context), pool)
}

fn label_with_script(pvs: Vec<ScriptPv>) -> Widget {
    let label = Widget::new(WidgetKind::Label);
    label
        .set_property_value(keys::SCRIPTS, vec![ScriptInfo::new("update.py", pvs)])
        .expect("scripts");
    label
}

#[test]
fn script_waits_for_every_pv_and_runs_on_triggers() {
    let connector = LocalPvConnector::new().with_value("b", VType::Long(1));
    let recorder = Recorder::default();
    let label = label_with_script(vec![ScriptPv::new("a"), ScriptPv::passive("b")]);
    let (runtime, pool) = runtime_for(&connector, &label, Some(&recorder));

    runtime.start();
    assert_eq!(*recorder.compiled.lock(), vec!["update.py".to_string()]);
    assert!(recorder.runs.lock().is_empty());

    connector.set("a", VType::Long(2));
    assert_eq!(
        *recorder.runs.lock(),
        vec![vec![Some(VType::Long(2)), Some(VType::Long(1))]]
    );

    connector.set("b", VType::Long(5));
    assert_eq!(recorder.runs.lock().len(), 1);

    runtime.stop();
    assert!(pool.is_empty());
    assert!(recorder.pending.lock().iter().all(ScriptCompletion::is_cancelled));

    connector.set("a", VType::Long(3));
    assert_eq!(recorder.runs.lock().len(), 1);
}

#[test]
fn script_pv_names_use_widget_macros() {
    let connector = LocalPvConnector::new().with_value("init:go", VType::Long(1));
    let recorder = Recorder::default();
    let label = label_with_script(vec![ScriptPv::new("$(S):go")]);
    let (runtime, pool) = runtime_for(&connector, &label, Some(&recorder));

    runtime.start();

    assert_eq!(pool.names(), vec!["init:go"]);
    assert_eq!(recorder.runs.lock().len(), 1);
}

#[test]
fn script_with_unreachable_pv_is_not_started() {
    let connector = LocalPvConnector::new().with_value("a", VType::Long(1));
    connector.fail_connect("broken");
    let recorder = Recorder::default();
    let label = label_with_script(vec![ScriptPv::new("a"), ScriptPv::new("broken")]);
    let (runtime, pool) = runtime_for(&connector, &label, Some(&recorder));

    assert_eq!(runtime.start(), 2);

    assert!(pool.is_empty());
    assert!(recorder.runs.lock().is_empty());
}

#[test]
fn scripts_are_skipped_without_support() {
    let connector = LocalPvConnector::new();
    let label = label_with_script(vec![ScriptPv::new("a")]);
    let (runtime, pool) = runtime_for(&connector, &label, None);

    assert_eq!(runtime.start(), 2);
    assert!(pool.is_empty());

    let action = ActionInfo::ExecuteScript {
        description: "Run".to_string(),
        file: "run.py".to_string(),
    };
    assert_eq!(
        runtime.execute_action(&label, &action),
        Err(RuntimeError::NoScriptSupport("".into()))
    );
}

#[test]
fn script_action_is_cancelled_on_stop() {
    let connector = LocalPvConnector::new();
    let recorder = Recorder::default();
    let button = Widget::new(WidgetKind::ActionButton);
    let (runtime, _pool) = runtime_for(&connector, &button, Some(&recorder));
    runtime.start();

    let action = ActionInfo::ExecuteScript {
        description: "Run".to_string(),
        file: "$(S).py".to_string(),
    };
    runtime.execute_action(&button, &action).expect("execute");
    assert_eq!(*recorder.compiled.lock(), vec!["init.py".to_string()]);
    assert!(!recorder.pending.lock()[0].is_cancelled());

    runtime.stop();
    assert!(recorder.pending.lock()[0].is_cancelled());
}
