//! `run`: execute a display against in-process PVs on the console toolkit.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use crossbeam_channel::{select, Receiver};
use display_model::value::{ActionInfo, OpenTarget};
use display_model::{keys, DisplayConfig, Macros, VType, Widget};
use display_representation::{
    console_toolkit, teardown_console_registry, ConsoleOutput, ConsoleParent, ToolkitListener,
    ToolkitRepresentation, UiExecutor, UiThread,
};
use display_runtime::{
    install_pool, teardown_pool, DisplayOpener, DisplayRuntime, LocalPvConnector, PvPool,
    RuntimeContext, RuntimeError,
};
use tracing::{debug, info, warn};

use crate::cli::split_assignment;
use crate::inspect;

pub struct RunOptions {
    pub file: PathBuf,
    pub seeds: Vec<String>,
    pub writes: Vec<String>,
    pub duration: Option<Duration>,
}

pub fn run(config: &DisplayConfig, options: &RunOptions) -> anyhow::Result<()> {
    let loaded = inspect::load(&options.file, config)?;
    let connector = seeded_connector(&options.seeds)?;
    let pool = install_pool(Arc::new(connector.clone())).context("install PV pool")?;
    let ui = Arc::new(UiThread::spawn("display-ui").context("start UI thread")?);
    let result = Session::start(
        loaded.display,
        connector,
        pool,
        ui.clone(),
        config.representation.update_throttle,
        ConsoleOutput::stdout(),
    )
    .and_then(|session| {
        let outcome = drive(&session, options);
        session.shutdown();
        outcome
    });
    ui.shutdown();
    teardown_pool();
    teardown_console_registry();
    result
}

fn seeded_connector(seeds: &[String]) -> anyhow::Result<LocalPvConnector> {
    seeds.iter().try_fold(LocalPvConnector::new(), |connector, seed| {
        let (name, value) =
            split_assignment(seed).ok_or_else(|| anyhow!("expected NAME=VALUE, got '{seed}'"))?;
        Ok(connector.with_value(name, VType::parse(value)))
    })
}

fn drive(session: &Session, options: &RunOptions) -> anyhow::Result<()> {
    for write in &options.writes {
        let (widget, value) =
            split_assignment(write).ok_or_else(|| anyhow!("expected WIDGET=VALUE, got '{write}'"))?;
        session.apply(&Input::Write { widget, value })?;
    }
    let lines = stdin_lines()?;
    let deadline = options
        .duration
        .map_or_else(crossbeam_channel::never, crossbeam_channel::after);
    loop {
        select! {
            recv(lines) -> line => {
                let Ok(line) = line else {
                    // End of input: keep running until the deadline, if any.
                    if options.duration.is_some() {
                        let _ = deadline.recv();
                    }
                    return Ok(());
                };
                match Input::parse(&line) {
                    Ok(Input::Quit) => return Ok(()),
                    Ok(input) => {
                        if let Err(err) = session.apply(&input) {
                            eprintln!("{err:#}");
                        }
                    }
                    Err(err) => eprintln!("{err}"),
                }
            }
            recv(deadline) -> _ => return Ok(()),
        }
    }
}

fn stdin_lines() -> anyhow::Result<Receiver<String>> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        })
        .context("start stdin reader")?;
    Ok(receiver)
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    Empty,
    Quit,
    Write { widget: &'a str, value: &'a str },
    SetPv { name: &'a str, value: &'a str },
    Action { widget: &'a str, index: usize },
    Click { widget: &'a str },
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        if matches!(line, "quit" | "exit") {
            return Ok(Self::Quit);
        }
        if let Some(rest) = line.strip_prefix("set ") {
            let (name, value) =
                split_assignment(rest).ok_or_else(|| format!("expected 'set PV=VALUE', got '{line}'"))?;
            return Ok(Self::SetPv { name, value });
        }
        if let Some(rest) = line.strip_prefix("action ") {
            let mut words = rest.split_whitespace();
            let widget = words.next().ok_or("expected 'action WIDGET [N]'")?;
            let index = match words.next() {
                Some(index) => index
                    .parse()
                    .map_err(|_| format!("invalid action index '{index}'"))?,
                None => 0,
            };
            return Ok(Self::Action { widget, index });
        }
        if let Some(rest) = line.strip_prefix("click ") {
            return Ok(Self::Click {
                widget: rest.trim(),
            });
        }
        split_assignment(line)
            .map(|(widget, value)| Self::Write { widget, value })
            .ok_or_else(|| format!("unrecognized input '{line}'"))
    }
}

/// Running display: runtime bindings plus console representation.
pub struct Session {
    display: Widget,
    connector: LocalPvConnector,
    runtime: Arc<DisplayRuntime>,
    toolkit: ToolkitRepresentation<ConsoleParent>,
}

impl Session {
    pub fn start(
        display: Widget,
        connector: LocalPvConnector,
        pool: Arc<PvPool>,
        executor: Arc<dyn UiExecutor>,
        update_interval: Duration,
        output: Arc<ConsoleOutput>,
    ) -> anyhow::Result<Self> {
        let context = RuntimeContext::new(pool).with_opener(Arc::new(LoggingOpener));
        let runtime = Arc::new(DisplayRuntime::new(display.clone(), context));
        let toolkit =
            console_toolkit(executor, update_interval).context("start console toolkit")?;
        toolkit.add_listener(Arc::new(RuntimeForwarder {
            runtime: Arc::clone(&runtime),
        }));
        let represented = toolkit.represent_model(&ConsoleParent::root(output), &display);
        let started = runtime.start();
        let name = &display;
        info!("running {name}: {represented} represented, {started} started");
        Ok(Self {
            display,
            connector,
            runtime,
            toolkit,
        })
    }

    pub fn apply(&self, input: &Input<'_>) -> anyhow::Result<()> {
        match *input {
            Input::Empty | Input::Quit => {}
            Input::Write { widget, value } => self.toolkit.fire_write(&self.widget(widget)?, value),
            Input::SetPv { name, value } => self.connector.set(name, VType::parse(value)),
            Input::Action { widget, index } => {
                let widget = self.widget(widget)?;
                let actions = widget.property_value(keys::ACTIONS)?;
                let Some(action) = actions.get(index) else {
                    bail!("{widget} has {} action(s), no action {index}", actions.len());
                };
                self.toolkit.fire_action(&widget, action);
            }
            Input::Click { widget } => self.toolkit.fire_click(&self.widget(widget)?),
        }
        Ok(())
    }

    fn widget(&self, name: &str) -> anyhow::Result<Widget> {
        self.display
            .find_widget_by_name(name)
            .ok_or_else(|| anyhow!("no widget named '{name}'"))
    }

    pub fn shutdown(&self) {
        self.toolkit.shutdown();
        self.runtime.stop();
    }
}

/// Routes toolkit interaction into the display runtime.
struct RuntimeForwarder {
    runtime: Arc<DisplayRuntime>,
}

impl ToolkitListener for RuntimeForwarder {
    fn handle_action(&self, widget: &Widget, action: &ActionInfo) {
        if let Err(err) = self.runtime.execute_action(widget, action) {
            warn!("{widget}: action '{}' failed: {err}", action.description());
        }
    }

    fn handle_click(&self, widget: &Widget) {
        debug!("click on {widget}");
    }

    fn handle_write(&self, widget: &Widget, value: &str) {
        if let Err(err) = self.runtime.write_primary_pv(widget, value) {
            warn!("{widget}: cannot write '{value}': {err}");
        }
    }
}

/// The console toolkit has no windows; opening a display is only reported.
struct LoggingOpener;

impl DisplayOpener for LoggingOpener {
    fn open_display(
        &self,
        widget: &Widget,
        file: &str,
        target: OpenTarget,
        macros: &Macros,
    ) -> Result<(), RuntimeError> {
        info!(
            "{widget}: open {file} in {} with macros {macros}",
            target.as_str()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use display_model::WidgetKind;
    use display_representation::InlineExecutor;

    use super::*;

    #[test]
    fn parses_interactive_input() {
        assert_eq!(Input::parse("  "), Ok(Input::Empty));
        assert_eq!(Input::parse("quit"), Ok(Input::Quit));
        assert_eq!(
            Input::parse("setpoint=3"),
            Ok(Input::Write {
                widget: "setpoint",
                value: "3"
            })
        );
        assert_eq!(
            Input::parse("set temp=21.5"),
            Ok(Input::SetPv {
                name: "temp",
                value: "21.5"
            })
        );
        assert_eq!(
            Input::parse("action go 2"),
            Ok(Input::Action {
                widget: "go",
                index: 2
            })
        );
        assert_eq!(
            Input::parse("action go"),
            Ok(Input::Action {
                widget: "go",
                index: 0
            })
        );
        assert_eq!(Input::parse("click go"), Ok(Input::Click { widget: "go" }));
        assert!(Input::parse("action go x").is_err());
        assert!(Input::parse("hello").is_err());
    }

    #[test]
    fn seeds_parse_values() {
        let connector =
            seeded_connector(&["temp=21.5".to_string(), "mode=auto".to_string()]).expect("seeds");
        assert_eq!(connector.value("temp"), Some(VType::Double(21.5)));
        assert_eq!(connector.value("mode"), Some(VType::Text("auto".to_string())));
        assert!(seeded_connector(&["temp".to_string()]).is_err());
    }

    fn named(kind: WidgetKind, name: &str) -> Widget {
        let widget = Widget::new(kind);
        widget
            .set_property_value(keys::NAME, name.to_string())
            .expect("name");
        widget
    }

    fn wait_for_line(output: &ConsoleOutput, expected: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if output.lines().iter().any(|line| line == expected) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn session_routes_input_to_pvs() {
        let display = Widget::new(WidgetKind::Display);
        let temp = named(WidgetKind::TextUpdate, "t");
        temp.set_property_value(keys::PV_NAME, "temp".to_string())
            .expect("pv");
        let button = named(WidgetKind::ActionButton, "go");
        button
            .set_property_value(
                keys::ACTIONS,
                vec![ActionInfo::WritePv {
                    description: "Reset".to_string(),
                    pv_name: "temp".to_string(),
                    value: "7".to_string(),
                }],
            )
            .expect("actions");
        display.add_child(temp).expect("add");
        display.add_child(button).expect("add");

        let connector = LocalPvConnector::new().with_value("temp", VType::Double(1.5));
        let pool = Arc::new(PvPool::new(Arc::new(connector.clone())));
        let output = ConsoleOutput::capture();
        let session = Session::start(
            display,
            connector.clone(),
            pool,
            Arc::new(InlineExecutor),
            Duration::from_millis(20),
            output.clone(),
        )
        .expect("session");
        assert!(wait_for_line(&output, "/t: textupdate temp = 1.50"));

        session
            .apply(&Input::Write {
                widget: "t",
                value: "3",
            })
            .expect("write");
        assert_eq!(connector.value("temp"), Some(VType::Long(3)));

        session
            .apply(&Input::Action {
                widget: "go",
                index: 0,
            })
            .expect("action");
        assert_eq!(connector.value("temp"), Some(VType::Long(7)));
        assert_eq!(connector.write_count("temp"), 2);

        session
            .apply(&Input::SetPv {
                name: "temp",
                value: "9.25",
            })
            .expect("set");
        assert!(wait_for_line(&output, "/t: textupdate temp = 9.25"));

        assert!(session
            .apply(&Input::Action {
                widget: "go",
                index: 1
            })
            .is_err());
        assert!(session.apply(&Input::Click { widget: "nope" }).is_err());
        session.shutdown();
    }
}
