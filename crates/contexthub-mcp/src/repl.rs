//! Interactive REPL for poking at the backing ContextHub project.
//!
//! Launch with `contexthub-mcp repl` to enter interactive mode.
//! Type `/help` for available commands, Tab for completion.

use std::sync::{Arc, Mutex, PoisonError};

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use tokio::runtime::Handle;
use uuid::Uuid;

use contexthub::{ContextClient, ContextFile, ContextFileUpdate, CreateOutcome, NewContextFile};

use crate::tools::ToolRegistry;
use crate::types::{SERVER_NAME, SERVER_VERSION, SUPPORTED_PROTOCOL_VERSIONS};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/ls", "List context files in the project"),
    ("/show", "Show one file by id or filename"),
    ("/add", "Add a file: /add <filename> <content>"),
    ("/update", "Update a file: /update <id> <filename> <content>"),
    ("/rm", "Delete a file by id"),
    ("/raw", "Toggle raw JSON output"),
    ("/info", "Show server identity and protocol versions"),
    ("/tools", "List available MCP tools"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// Filenames seen in the last listing, shared with the completer.
type FileCache = Arc<Mutex<Vec<String>>>;

/// REPL helper for tab completion.
struct HubHelper {
    files: FileCache,
}

impl Completer for HubHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<10} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // Filename completion from the last /ls.
        let parts: Vec<&str> = input.splitn(2, ' ').collect();
        let cmd = parts[0];
        let args = if parts.len() > 1 { parts[1] } else { "" };

        if cmd == "/show" {
            let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
            let prefix_start = input.len() - args.len();
            let matches: Vec<Pair> = files
                .iter()
                .filter(|f| f.starts_with(args.trim()))
                .map(|f| Pair {
                    display: f.clone(),
                    replacement: f.clone(),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for HubHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for HubHelper {}
impl Validator for HubHelper {}
impl Helper for HubHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Session state.
struct ReplState {
    client: Arc<ContextClient>,
    handle: Handle,
    raw: bool,
    files: FileCache,
}

impl ReplState {
    /// Run a backend call to completion on the runtime. The REPL thread
    /// lives on the blocking pool, so parking it here is fine.
    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.handle.block_on(fut)
    }
}

/// Run the interactive REPL. Must be called from a blocking-pool thread of
/// the runtime behind `handle`.
pub fn run(client: Arc<ContextClient>, handle: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mcontexthub-mcp v{}\x1b[0m \x1b[90m\u{2014} Project Context over MCP\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let files: FileCache = Arc::new(Mutex::new(Vec::new()));

    let mut rl: Editor<HubHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(HubHelper {
        files: Arc::clone(&files),
    }));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".contexthub_mcp_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let mut state = ReplState {
        client,
        handle,
        raw: false,
        files,
    };
    let prompt = " \x1b[36mhub>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(&state),
                    "tools" => cmd_tools(),
                    "raw" => {
                        state.raw = !state.raw;
                        eprintln!(
                            "  Raw JSON output {}",
                            if state.raw { "on" } else { "off" }
                        );
                    }
                    "ls" => cmd_ls(&state),
                    "show" => cmd_show(args, &state),
                    "add" => cmd_add(args, &state),
                    "update" => cmd_update(args, &state),
                    "rm" => cmd_rm(args, &state),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(std::path::Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<10} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completion works for commands and listed filenames.");
    eprintln!();
}

fn cmd_info(state: &ReplState) {
    eprintln!();
    eprintln!("  Server:    {SERVER_NAME} v{SERVER_VERSION}");
    eprintln!("  Protocols: {}", SUPPORTED_PROTOCOL_VERSIONS.join(", "));
    eprintln!("  Project:   {}", state.client.project_id());
    eprintln!("  Tools:     {}", ToolRegistry::list_tools().len());
    eprintln!();
}

fn cmd_tools() {
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!("  {} MCP tools available:", tools.len());
    eprintln!();
    for tool in &tools {
        eprintln!(
            "    {:<26} {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }
    eprintln!();
}

fn cmd_ls(state: &ReplState) {
    match state.block_on(state.client.list_context()) {
        Ok(context) => {
            let mut names: Vec<String> =
                context.files.iter().map(|f| f.filename.clone()).collect();
            names.sort();
            *state.files.lock().unwrap_or_else(PoisonError::into_inner) = names;

            if state.raw {
                print_json(&context);
                return;
            }
            eprintln!();
            eprintln!("  {} files in project {}", context.files.len(), context.project_id);
            eprintln!();
            for file in &context.files {
                eprintln!(
                    "    {}  {:<28} {}",
                    file.id,
                    file.filename,
                    file.file_type.as_deref().unwrap_or("-")
                );
            }
            eprintln!();
        }
        Err(e) => eprintln!("  Listing failed: {e}"),
    }
}

fn cmd_show(args: &str, state: &ReplState) {
    if args.is_empty() {
        eprintln!("  Usage: /show <file-id-or-filename>");
        return;
    }

    let fetched = match Uuid::parse_str(args) {
        Ok(id) => state.block_on(state.client.get_file(id)),
        // Not a UUID: resolve the filename through a listing first.
        Err(_) => state.block_on(resolve_by_name(&state.client, args)),
    };

    match fetched {
        Ok(file) => {
            if state.raw {
                print_json(&file);
                return;
            }
            eprintln!();
            eprintln!("  {} ({})", file.filename, file.id);
            if let Some(updated) = file.updated_at {
                eprintln!("  Updated: {updated}");
            }
            eprintln!();
            println!("{}", file.content);
        }
        Err(e) => eprintln!("  Fetch failed: {e}"),
    }
}

async fn resolve_by_name(
    client: &ContextClient,
    filename: &str,
) -> contexthub::HubResult<ContextFile> {
    let context = client.list_context().await?;
    match context.find_file(filename) {
        Some(file) => client.get_file(file.id).await,
        None => Err(contexthub::HubError::NotFound),
    }
}

fn cmd_add(args: &str, state: &ReplState) {
    let Some((filename, content)) = args.split_once(' ') else {
        eprintln!("  Usage: /add <filename> <content>");
        return;
    };

    let file = NewContextFile {
        filename: filename.to_string(),
        content: content.to_string(),
        file_type: None,
    };
    match state.block_on(state.client.add_file(file)) {
        Ok(CreateOutcome::Created(file)) => eprintln!("  Added {} ({})", file.filename, file.id),
        Ok(CreateOutcome::AlreadyExists(file)) => {
            eprintln!("  Already exists: {} ({})", file.filename, file.id)
        }
        Err(e) => eprintln!("  Add failed: {e}"),
    }
}

fn cmd_update(args: &str, state: &ReplState) {
    let mut parts = args.splitn(3, ' ');
    let (Some(raw_id), Some(filename), Some(content)) =
        (parts.next(), parts.next(), parts.next())
    else {
        eprintln!("  Usage: /update <id> <filename> <content>");
        return;
    };

    let id = match Uuid::parse_str(raw_id) {
        Ok(id) => id,
        Err(_) => {
            eprintln!("  Not a file id: {raw_id}");
            return;
        }
    };

    let update = ContextFileUpdate {
        filename: filename.to_string(),
        content: content.to_string(),
    };
    match state.block_on(state.client.update_file(id, &update)) {
        Ok(file) => eprintln!("  Updated {} ({})", file.filename, file.id),
        Err(e) => eprintln!("  Update failed: {e}"),
    }
}

fn cmd_rm(args: &str, state: &ReplState) {
    let id = match Uuid::parse_str(args) {
        Ok(id) => id,
        Err(_) => {
            eprintln!("  Usage: /rm <file-id>");
            return;
        }
    };

    match state.block_on(state.client.delete_file(id)) {
        Ok(()) => eprintln!("  Deleted {id}"),
        Err(e) => eprintln!("  Delete failed: {e}"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("  Serialization failed: {e}"),
    }
}
