// src/main.rs
//! ax-probe: inspect and drive other applications through the accessibility API
//!
//! Targets one application (`--pid` or `--app`) or, without a target, the
//! system-wide root, and runs a single command against it.

#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, warn};

use ax_bridge::{
    AttributeValue, AxResult, AxStatus, AxStruct, BoxedValue, ErrorContext, ErrorHandler, KeyEvent,
};

#[derive(Debug, Parser)]
#[command(
    name = "ax-probe",
    version,
    about = "Inspect and drive macOS applications through the accessibility API"
)]
struct Args {
    /// Process id of the target application
    #[arg(long, conflicts_with = "app")]
    pid: Option<i32>,

    /// Name of the target application's process (first match wins)
    #[arg(long)]
    app: Option<String>,

    /// Output format
    #[arg(long, default_value = "human", value_enum)]
    format: OutputFormat,

    /// Messaging timeout in seconds applied to the target before the command
    #[arg(long)]
    timeout: Option<f32>,

    /// Verbosity level for logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    /// One line per item
    Human,
    /// A single JSON document
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every attribute with its current value
    Attrs,
    /// Read one attribute
    Get { attribute: String },
    /// Write one attribute. The value is parsed as JSON when possible;
    /// `{"type":"point","x":..,"y":..}` style objects are boxed first.
    Set { attribute: String, value: String },
    /// List action names
    Actions,
    /// Perform an action
    Perform { action: String },
    /// List parameterized attribute names
    Params,
    /// Find the element at a screen position
    At { x: f32, y: f32 },
    /// Post key events, written as `code:down` or `code:up`
    Keys {
        #[arg(required = true)]
        events: Vec<KeyEvent>,
    },
    /// Report whether this process may use the accessibility API
    Check,
}

/// Logs failures and reports them as "no value", so one unreadable
/// attribute does not abort a listing.
struct WarnAndSkip;

impl ErrorHandler for WarnAndSkip {
    fn handle_error(
        &self,
        status: AxStatus,
        context: &ErrorContext<'_>,
    ) -> AxResult<Option<AttributeValue>> {
        warn!("{} while {}", status, context);
        Ok(None)
    }
}

fn setup_logging(config: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match config.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbose > 2)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

/// Resolve `--pid`/`--app` to a process id. `None` means system-wide.
fn resolve_pid(args: &Args) -> Result<Option<i32>> {
    use sysinfo::{ProcessesToUpdate, System};

    if let Some(pid) = args.pid {
        return Ok(Some(pid));
    }
    let Some(name) = args.app.as_deref() else {
        return Ok(None);
    };

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    let wanted = name.to_lowercase();
    let mut matches: Vec<u32> = sys
        .processes()
        .iter()
        .filter(|(_, process)| process.name().to_string_lossy().to_lowercase() == wanted)
        .map(|(pid, _)| pid.as_u32())
        .collect();
    matches.sort_unstable();

    let pid = matches
        .first()
        .with_context(|| format!("no running process named {name:?}"))?;
    if matches.len() > 1 {
        info!("{} processes named {:?}, using pid {}", matches.len(), name, pid);
    }
    Ok(Some(i32::try_from(*pid).context("pid out of range")?))
}

/// A value given on the command line.
#[derive(Debug, PartialEq)]
enum Input {
    Value(AttributeValue),
    Struct(AxStruct),
}

fn parse_input(raw: &str) -> Result<Input> {
    let Ok(json) = serde_json::from_str::<Value>(raw) else {
        return Ok(Input::Value(AttributeValue::from(raw)));
    };
    if let Ok(boxed) = serde_json::from_value::<AxStruct>(json.clone()) {
        return Ok(Input::Struct(boxed));
    }
    Ok(Input::Value(from_json(json)?))
}

fn from_json(json: Value) -> Result<AttributeValue> {
    Ok(match json {
        Value::Bool(b) => AttributeValue::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Integer(i),
            None => AttributeValue::Float(n.as_f64().context("number out of range")?),
        },
        Value::String(s) => AttributeValue::String(s),
        Value::Array(items) => AttributeValue::Array(
            items
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Null => bail!("null cannot be written to an attribute"),
        Value::Object(_) => bail!("objects must be a point, size, rect or range"),
    })
}

fn to_json(value: &AttributeValue, unbox: &dyn Fn(&BoxedValue) -> Option<AxStruct>) -> Value {
    match value {
        AttributeValue::Boolean(b) => json!(b),
        AttributeValue::Integer(n) => json!(n),
        AttributeValue::Float(n) => json!(n),
        AttributeValue::String(s) => json!(s),
        AttributeValue::Url(s) => json!({ "url": s }),
        AttributeValue::Array(items) => {
            Value::Array(items.iter().map(|item| to_json(item, unbox)).collect())
        }
        AttributeValue::Element(e) => json!({ "element": format!("{e:?}") }),
        AttributeValue::Boxed(b) => match unbox(b) {
            Some(s) => serde_json::to_value(s).unwrap_or(Value::Null),
            None => json!({ "boxed": format!("{b:?}") }),
        },
        AttributeValue::Other(description) => json!({ "other": description }),
    }
}

fn to_human(value: &AttributeValue, unbox: &dyn Fn(&BoxedValue) -> Option<AxStruct>) -> String {
    match value {
        AttributeValue::Boolean(b) => b.to_string(),
        AttributeValue::Integer(n) => n.to_string(),
        AttributeValue::Float(n) => n.to_string(),
        AttributeValue::String(s) => format!("{s:?}"),
        AttributeValue::Url(s) => s.clone(),
        AttributeValue::Array(items) if items.len() > 8 => format!("[{} items]", items.len()),
        AttributeValue::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| to_human(item, unbox))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        AttributeValue::Element(e) => format!("{e:?}"),
        AttributeValue::Boxed(b) => match unbox(b) {
            Some(AxStruct::Point(p)) => format!("({}, {})", p.x, p.y),
            Some(AxStruct::Size(s)) => format!("{} x {}", s.width, s.height),
            Some(AxStruct::Rect(r)) => format!(
                "({}, {}) {} x {}",
                r.origin.x, r.origin.y, r.size.width, r.size.height
            ),
            Some(AxStruct::Range(r)) => format!("{}+{}", r.location, r.length),
            None => format!("{b:?}"),
        },
        AttributeValue::Other(description) => format!("<{description}>"),
    }
}

#[cfg(target_os = "macos")]
mod probe {
    use super::*;

    use ax_bridge::{names, Accessibility, Element, SystemBackend};

    struct Probe {
        ax: Accessibility<SystemBackend>,
        lenient: Accessibility<SystemBackend, WarnAndSkip>,
        format: OutputFormat,
    }

    impl Probe {
        fn new(format: OutputFormat) -> Self {
            Self {
                ax: Accessibility::new(SystemBackend::new()),
                lenient: Accessibility::with_handler(SystemBackend::new(), WarnAndSkip),
                format,
            }
        }

        fn unbox(&self, boxed: &BoxedValue) -> Option<AxStruct> {
            self.ax.unbox(boxed).ok()
        }

        fn render(&self, value: Option<&AttributeValue>) -> Value {
            value.map_or(Value::Null, |v| to_json(v, &|b| self.unbox(b)))
        }

        fn render_human(&self, value: Option<&AttributeValue>) -> String {
            value.map_or_else(|| "(no value)".to_string(), |v| to_human(v, &|b| self.unbox(b)))
        }

        fn emit(&self, json: Value, human: impl FnOnce() -> String) -> Result<()> {
            match self.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json)?),
                OutputFormat::Human => println!("{}", human()),
            }
            Ok(())
        }

        fn emit_names(&self, names: &[String]) -> Result<()> {
            self.emit(json!(names), || names.join("\n"))
        }

        fn target(&self, pid: Option<i32>) -> Result<Element> {
            Ok(match pid {
                Some(pid) => self
                    .ax
                    .application_for(pid)
                    .with_context(|| format!("cannot target pid {pid}"))?,
                None => self.ax.system_wide()?,
            })
        }

        fn check(&self) -> Result<()> {
            let trusted = self.ax.is_trusted();
            self.emit(json!({ "trusted": trusted }), || {
                if trusted {
                    "accessibility: granted".to_string()
                } else {
                    "accessibility: not granted (System Settings > Privacy & Security > Accessibility)"
                        .to_string()
                }
            })
        }

        fn run(&self, args: &Args) -> Result<()> {
            if let Command::Check = args.command {
                return self.check();
            }

            if !self.ax.is_trusted() {
                warn!("this process is not trusted for accessibility; most calls will fail");
            }

            let target = self.target(resolve_pid(args)?)?;
            if let Some(seconds) = args.timeout {
                self.ax.set_timeout(&target, seconds)?;
            }

            match &args.command {
                Command::Attrs => {
                    let names = self.ax.attribute_names(&target)?;
                    let values = names
                        .iter()
                        .map(|name| Ok((name, self.lenient.attribute(&target, name)?)))
                        .collect::<AxResult<Vec<_>>>()?;
                    let json = values
                        .iter()
                        .map(|(name, value)| ((*name).clone(), self.render(value.as_ref())))
                        .collect::<serde_json::Map<_, _>>();
                    self.emit(Value::Object(json), || {
                        values
                            .iter()
                            .map(|(name, value)| {
                                format!("{name}: {}", self.render_human(value.as_ref()))
                            })
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                }
                Command::Get { attribute } => {
                    let value = self.ax.attribute(&target, attribute)?;
                    self.emit(self.render(value.as_ref()), || {
                        self.render_human(value.as_ref())
                    })
                }
                Command::Set { attribute, value } => {
                    let value = match parse_input(value)? {
                        Input::Value(value) => value,
                        Input::Struct(s) => AttributeValue::Boxed(self.ax.box_struct(&s)?),
                    };
                    let written = self.ax.set_attribute(&target, attribute, value)?;
                    self.emit(self.render(Some(&written)), || {
                        format!("{attribute} = {}", self.render_human(Some(&written)))
                    })
                }
                Command::Actions => self.emit_names(&self.ax.action_names(&target)?),
                Command::Perform { action } => {
                    let done = self.ax.perform_action(&target, action)?;
                    self.emit(json!({ "performed": done }), || format!("{action}: {done}"))
                }
                Command::Params => {
                    self.emit_names(&self.ax.parameterized_attribute_names(&target)?)
                }
                Command::At { x, y } => {
                    let hit = self.ax.element_at_point(&target, *x, *y)?;
                    let Some(element) = hit else {
                        return self.emit(Value::Null, || format!("nothing at ({x}, {y})"));
                    };
                    let role = self.lenient.attribute(&element, names::ROLE)?;
                    let subrole = self.lenient.attribute(&element, names::SUBROLE)?;
                    let title = self.lenient.attribute(&element, names::TITLE)?;
                    let pid = self.lenient.pid_for(&element).ok();
                    self.emit(
                        json!({
                            "role": self.render(role.as_ref()),
                            "subrole": self.render(subrole.as_ref()),
                            "title": self.render(title.as_ref()),
                            "pid": pid,
                        }),
                        || {
                            let mut line = self.render_human(role.as_ref());
                            for extra in [&subrole, &title].into_iter().flatten() {
                                line.push(' ');
                                line.push_str(&to_human(extra, &|b| self.unbox(b)));
                            }
                            if let Some(pid) = pid {
                                line.push_str(&format!(" pid={pid}"));
                            }
                            line
                        },
                    )
                }
                Command::Keys { events } => {
                    self.ax.post_events(&target, events)?;
                    self.emit(json!({ "posted": events.len() }), || {
                        format!("posted {} events", events.len())
                    })
                }
                Command::Check => self.check(),
            }
        }
    }

    pub fn main(args: Args) -> Result<()> {
        Probe::new(args.format.clone()).run(&args)
    }
}

#[cfg(target_os = "macos")]
fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args)?;
    probe::main(args)
}

#[cfg(not(target_os = "macos"))]
fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args)?;
    bail!("ax-probe only runs on macOS")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ax_bridge::{Point, Rect};
    use pretty_assertions::assert_eq;

    fn no_unbox(_: &BoxedValue) -> Option<AxStruct> {
        None
    }

    #[test]
    fn test_plain_text_is_a_string() {
        assert_eq!(
            parse_input("hello world").unwrap(),
            Input::Value(AttributeValue::from("hello world"))
        );
    }

    #[test]
    fn test_json_scalars_and_arrays() {
        assert_eq!(parse_input("true").unwrap(), Input::Value(true.into()));
        assert_eq!(parse_input("42").unwrap(), Input::Value(42.into()));
        assert_eq!(parse_input("0.5").unwrap(), Input::Value(0.5.into()));
        assert_eq!(
            parse_input(r#"["a", 1]"#).unwrap(),
            Input::Value(AttributeValue::Array(vec!["a".into(), 1.into()]))
        );
    }

    #[test]
    fn test_tagged_objects_become_structs() {
        assert_eq!(
            parse_input(r#"{"type":"point","x":10,"y":20.5}"#).unwrap(),
            Input::Struct(Point::new(10.0, 20.5).into())
        );
        assert_eq!(
            parse_input(
                r#"{"type":"rect","origin":{"x":0,"y":0},"size":{"width":5,"height":6}}"#
            )
            .unwrap(),
            Input::Struct(Rect::new(0.0, 0.0, 5.0, 6.0).into())
        );
        assert!(parse_input(r#"{"type":"circle"}"#).is_err());
        assert!(parse_input("null").is_err());
    }

    #[test]
    fn test_rendering() {
        let value = AttributeValue::Array(vec!["AXButton".into(), 3.into(), true.into()]);
        assert_eq!(to_json(&value, &no_unbox), json!(["AXButton", 3, true]));
        assert_eq!(to_human(&value, &no_unbox), r#"["AXButton", 3, true]"#);
        assert_eq!(
            to_json(&AttributeValue::Url("file:///tmp/".into()), &no_unbox),
            json!({ "url": "file:///tmp/" })
        );
    }

    #[test]
    fn test_cli_parses_key_events() {
        let args = Args::try_parse_from(["ax-probe", "--pid", "42", "keys", "0:down", "0:up"])
            .unwrap();
        assert_eq!(args.pid, Some(42));
        match args.command {
            Command::Keys { events } => {
                assert_eq!(events, vec![KeyEvent::down(0), KeyEvent::up(0)])
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Args::try_parse_from(["ax-probe", "keys", "0:sideways"]).is_err());
        assert!(Args::try_parse_from(["ax-probe", "--pid", "1", "--app", "x", "check"]).is_err());
    }
}
