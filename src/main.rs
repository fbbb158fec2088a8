//! Native entry point: a line-oriented labeling console.
//!
//! Usage: `posetag-native [--schema FILE] [--no-dialogs] [WORKSPACE_OR_IMAGE]`

use std::io::{BufRead, Write};
use std::path::PathBuf;

use posetag::config::AppConfig;
use posetag::keybindings::Key;
use posetag::message::Message;
use posetag::model::{Properties, PropertyType, PropertyValue, Schema};
use posetag::shell::NativeShell;
use posetag::state::{PointerButton, Session, ToolMode};

const HELP: &str = "\
commands:
  click X Y | rclick X Y        viewport click (left / right)
  key NAME | hold NAME | release NAME
  mode insert|edit              switch tool mode
  next-graph | pop | graph G | delete G
  select G K | deselect | move G K X Y
  set G K PROP VALUE            edit a placed keypoint's property
  pending PROP VALUE            edit the next keypoint's property
  open PATH | workspace | config | next | prev
  save | autosave on|off | show | help | quit";

struct Args {
    schema: Option<PathBuf>,
    dialogs: bool,
    target: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        schema: None,
        dialogs: true,
        target: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--schema" => {
                let path = iter.next().ok_or("--schema needs a file")?;
                args.schema = Some(PathBuf::from(path));
            }
            "--no-dialogs" => args.dialogs = false,
            "-h" | "--help" => {
                return Err(
                    "usage: posetag-native [--schema FILE] [--no-dialogs] [WORKSPACE_OR_IMAGE]"
                        .into(),
                );
            }
            other if args.target.is_none() => args.target = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument '{}'", other)),
        }
    }
    Ok(args)
}

fn parse_value(kind: PropertyType, raw: &str) -> Result<PropertyValue, String> {
    match kind {
        PropertyType::Boolean => raw
            .parse()
            .map(PropertyValue::Boolean)
            .map_err(|_| format!("'{}' is not true or false", raw)),
        PropertyType::Number => raw
            .parse()
            .map(PropertyValue::Number)
            .map_err(|_| format!("'{}' is not a number", raw)),
        PropertyType::String => Ok(PropertyValue::String(raw.to_string())),
    }
}

fn property_value(properties: &Properties, key: &str, raw: &str) -> Result<PropertyValue, String> {
    let property = properties
        .get(key)
        .ok_or_else(|| format!("unknown property '{}'", key))?;
    parse_value(property.kind, raw)
}

fn number<T: std::str::FromStr>(word: Option<&str>) -> Result<T, String> {
    let word = word.ok_or("missing argument")?;
    word.parse()
        .map_err(|_| format!("'{}' is not a valid number", word))
}

fn key(word: Option<&str>) -> Result<Key, String> {
    let word = word.ok_or("missing key name")?;
    Key::from_label(word).ok_or_else(|| format!("unknown key '{}'", word))
}

/// Translate one console line into messages.
fn parse_command(line: &str, session: &Session) -> Result<Vec<Message>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Vec::new());
    };

    let message = match command {
        "click" | "rclick" => Message::ViewportClicked {
            button: if command == "click" {
                PointerButton::Primary
            } else {
                PointerButton::Secondary
            },
            x: number(words.next())?,
            y: number(words.next())?,
        },
        "key" => {
            let key = key(words.next())?;
            return Ok(vec![
                Message::KeyPressed { key, repeat: false },
                Message::KeyReleased { key, repeat: false },
            ]);
        }
        "hold" => Message::KeyPressed {
            key: key(words.next())?,
            repeat: false,
        },
        "release" => Message::KeyReleased {
            key: key(words.next())?,
            repeat: false,
        },
        "mode" => match words.next() {
            Some("insert") => Message::ToolModeSelected(ToolMode::Insert),
            Some("edit") => Message::ToolModeSelected(ToolMode::Edit),
            _ => return Err("mode is insert or edit".into()),
        },
        "next-graph" => Message::StartNextGraph,
        "pop" => Message::PopPoint,
        "graph" => Message::SelectGraph(number(words.next())?),
        "delete" => Message::DeleteGraph(number(words.next())?),
        "select" => Message::KeypointPressed {
            graph: number(words.next())?,
            keypoint: number(words.next())?,
        },
        "deselect" => Message::DeselectPoint,
        "move" => Message::SetPointPosition {
            graph: number(words.next())?,
            keypoint: number(words.next())?,
            x: number(words.next())?,
            y: number(words.next())?,
        },
        "set" => {
            let graph = number(words.next())?;
            let keypoint = number(words.next())?;
            let prop = words.next().ok_or("missing property")?;
            let raw = words.next().ok_or("missing value")?;
            let point = session
                .label()
                .keypoint(graph, keypoint)
                .ok_or_else(|| format!("no keypoint {} in graph {}", keypoint, graph))?;
            Message::SetPointProperty {
                graph,
                keypoint,
                key: prop.to_string(),
                value: property_value(&point.properties, prop, raw)?,
            }
        }
        "pending" => {
            let prop = words.next().ok_or("missing property")?;
            let raw = words.next().ok_or("missing value")?;
            Message::SetPendingProperty {
                key: prop.to_string(),
                value: property_value(&session.label().pending().properties, prop, raw)?,
            }
        }
        "open" => Message::OpenImage(PathBuf::from(words.next().ok_or("missing path")?)),
        "workspace" => Message::SelectWorkspace,
        "config" => Message::OpenConfig,
        "next" => Message::NextImage,
        "prev" => Message::PrevImage,
        "save" => Message::Save,
        "autosave" => match words.next() {
            Some("on") => Message::SetAutoSave(true),
            Some("off") => Message::SetAutoSave(false),
            _ => return Err("autosave is on or off".into()),
        },
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(vec![message])
}

fn print_status(session: &Session) {
    let schema = session.schema();
    let label = session.label();

    println!(
        "config: {} ({} keypoints){}",
        schema.config_version(),
        schema.len(),
        session
            .config_error()
            .map(|e| format!(" [error: {}]", e))
            .unwrap_or_default()
    );
    match session.image() {
        Some(image) => {
            let size = session
                .image_size()
                .map(|(w, h)| format!("{}x{}", w, h))
                .unwrap_or_else(|| "not loaded".to_string());
            let progress = session
                .workspace()
                .map(|ws| format!(" [{}]", ws.progress()))
                .unwrap_or_default();
            let unsaved = if session.auto_save().is_dirty() {
                " *unsaved*"
            } else {
                ""
            };
            println!("image: {:?} ({}){}{}", image, size, progress, unsaved);
        }
        None => println!("image: none"),
    }
    println!(
        "mode: {}{}",
        session.control().tool_mode.name(),
        if session.control().pan_mode { " (panning)" } else { "" }
    );

    for summary in label.summaries(schema) {
        println!(
            "{} {}: {}/{}{}",
            if summary.current { ">" } else { " " },
            summary.title(),
            summary.points,
            schema.len(),
            if summary.full { " FULL" } else { "" }
        );
    }
    if let Some((graph, keypoint)) = label.selection() {
        if let Some(point) = label.keypoint(graph, keypoint) {
            println!(
                "selected: {} at ({:.1}, {:.1}) {:?}",
                point.name, point.x, point.y, point.properties
            );
        }
    }
    if !label.is_current_full(schema) {
        println!("next: {}", schema.insertion_hint(label.next_index()));
    }
    println!("{}", session.control_tips());
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let mut config = AppConfig::load_from_default_path().unwrap_or_default();

    // RUST_LOG overrides the configured level
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let mut session = Session::new(Schema::bundled(), &config);
    let mut shell = if args.dialogs {
        NativeShell::new()
    } else {
        NativeShell::headless()
    };

    let schema_path = args
        .schema
        .clone()
        .or_else(|| config.preferences.last_schema_path.clone());
    if let Some(path) = schema_path {
        // Read errors are raised as session notices
        shell = shell.with_config_path(path);
        session.open_config();
        session.pump(&mut shell);
    }

    let target = args
        .target
        .clone()
        .or_else(|| config.preferences.last_workspace.clone());
    if let Some(target) = target {
        if target.is_dir() {
            shell.preset_workspace_path(target);
            session.select_workspace();
        } else {
            session.open_image(target);
        }
    }
    session.pump(&mut shell);

    println!("{}", HELP);
    print_notices(&mut session);
    print_status(&session);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(Ok(line)) = lines.next() else {
            break;
        };
        match line.trim() {
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "show" => print_status(&session),
            line => match parse_command(line, &session) {
                Ok(messages) => {
                    for message in messages {
                        session.update(message);
                    }
                    session.tick();
                    session.pump(&mut shell);
                    print_notices(&mut session);
                    print_status(&session);
                }
                Err(e) => println!("error: {}", e),
            },
        }
    }

    if session.auto_save().should_save_on_switch() {
        session.save();
        session.pump(&mut shell);
        print_notices(&mut session);
    }

    config.preferences.auto_save = session.auto_save().is_enabled();
    config.preferences.last_schema_path = session.schema_source().map(PathBuf::from);
    config.preferences.last_workspace = session.workspace().map(|ws| ws.folder.clone());
    if let Err(e) = config.save_to_default_path() {
        log::warn!("Failed to save configuration: {}", e);
    }
}

fn print_notices(session: &mut Session) {
    for notice in session.take_notices() {
        println!("{}", notice);
    }
}
