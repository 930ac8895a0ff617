mod demo_plugin;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use smartcomposer_app::{App, FileStorage};
use smartcomposer_core::dom::Element;
use smartcomposer_vault::{AbstractFile, TFolder, Vault};
use smartcomposer_workspace::{EditorError, WorkspaceLeaf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::demo_plugin::{ComposerPlugin, PLUGIN_ID};

const WELCOME_PATH: &str = "Welcome.md";
const WELCOME_CONTENT: &str = "# Welcome to your new vault!";

#[derive(Parser)]
#[command(
    name = "smartcomposer-poc",
    about = "Host API proof-of-concept shell for the Smart Composer plugin",
    author,
    version
)]
struct Cli {
    /// 以實際目錄的 Markdown 檔案填入保存庫。 / Seed the vault from the markdown files under this directory.
    #[arg(long, global = true, value_name = "PATH")]
    vault_dir: Option<PathBuf>,
    /// 外掛資料目錄；略過時僅存於記憶體。 / Plugin data directory; data stays in memory when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出保存庫樹狀結構。 / Print the vault tree, folders first.
    Tree,
    /// 透過工作區開啟檔案。 / Open a file through the workspace and print the leaf.
    Open(OpenArgs),
    /// 列出已註冊的命令。 / List registered commands.
    Commands(CommandsArgs),
    /// 執行命令。 / Execute a command by id.
    Run(RunArgs),
    /// 繪製外掛設定頁。 / Render the plugin settings tab.
    Settings(SettingsArgs),
}

#[derive(Args)]
struct OpenArgs {
    /// 連結文字或保存庫路徑。 / Link text or vault path.
    link: String,
    /// 在新分頁開啟。 / Open in a new leaf.
    #[arg(long)]
    new_leaf: bool,
    /// 附加到檔案後儲存。 / Text appended through the editor before saving.
    #[arg(long, value_name = "TEXT")]
    append: Option<String>,
    /// 同時輸出版面快照。 / Also print the layout snapshot as JSON.
    #[arg(long)]
    layout: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct CommandsArgs {
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args)]
struct RunArgs {
    /// 命令識別碼，例如 `smart-composer:open-new-chat`。 / Command id, e.g. `smart-composer:open-new-chat`.
    command_id: String,
    /// 執行前先開啟的檔案。 / File opened (and made active) before running.
    #[arg(long, value_name = "PATH")]
    open: Option<String>,
    /// 執行前全選編輯器內容。 / Select the whole editor before running.
    #[arg(long, requires = "open")]
    select_all: bool,
}

#[derive(Args)]
struct SettingsArgs {
    /// 選擇聊天模型。 / Pick the chat model through the dropdown.
    #[arg(long, value_name = "MODEL")]
    chat_model: Option<String>,
    /// 設定系統提示。 / Type a system prompt into the text area.
    #[arg(long, value_name = "TEXT")]
    system_prompt: Option<String>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<()> {
    let Cli {
        vault_dir,
        data_dir,
        command,
    } = Cli::parse();
    let app = boot(vault_dir.as_deref(), data_dir)?;
    match command {
        Commands::Tree => {
            print_tree(&app.vault().get_root(), 0);
            Ok(())
        }
        Commands::Open(args) => execute_open(&app, args),
        Commands::Commands(args) => execute_commands(&app, args),
        Commands::Run(args) => execute_run(&app, args),
        Commands::Settings(args) => execute_settings(&app, args),
    }
}

/// 建立應用程式、填入保存庫並載入示範外掛。 / Builds the app, seeds the vault and loads the demo plugin.
fn boot(vault_dir: Option<&Path>, data_dir: Option<PathBuf>) -> Result<App> {
    let app = match data_dir {
        Some(dir) => App::new(FileStorage::new(dir)),
        None => App::in_memory(),
    };
    match vault_dir {
        Some(dir) => seed_from_dir(app.vault(), dir)?,
        None => {
            app.vault()
                .create(WELCOME_PATH, WELCOME_CONTENT)
                .context("failed to seed the default vault")?;
        }
    }
    app.load_plugin(Box::new(ComposerPlugin::new()))
        .context("failed to load the demo plugin")?;
    Ok(app)
}

fn seed_from_dir(vault: &Vault, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("vault directory {} does not exist", dir.display());
    }
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
            continue;
        }
        let relative = path
            .strip_prefix(dir)
            .with_context(|| format!("{} is outside the vault directory", path.display()))?;
        let vault_path = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping non-UTF-8 file");
                continue;
            }
        };
        vault
            .create(&vault_path, &content)
            .with_context(|| format!("failed to add {vault_path} to the vault"))?;
        debug!(path = %vault_path, "seeded");
    }
    Ok(())
}

fn print_tree(folder: &TFolder, depth: usize) {
    let mut folders: Vec<&TFolder> = folder.folders().collect();
    folders.sort_by(|a, b| a.name.cmp(&b.name));
    let mut files: Vec<&AbstractFile> = folder.children.iter().filter(|child| child.is_file()).collect();
    files.sort_by(|a, b| a.name().cmp(b.name()));

    let indent = "  ".repeat(depth);
    for child in folders {
        println!("{indent}{}/", child.name);
        print_tree(child, depth + 1);
    }
    for file in files {
        println!("{indent}{}", file.name());
    }
}

fn describe_leaf(leaf: &WorkspaceLeaf) -> String {
    format!(
        "{} [{}] {} \"{}\"",
        leaf.id(),
        leaf.mount().as_str(),
        leaf.view_type().unwrap_or_else(|| "empty".to_string()),
        leaf.display_text().unwrap_or_default()
    )
}

fn execute_open(app: &App, args: OpenArgs) -> Result<()> {
    let workspace = app.workspace();
    let leaf = workspace
        .open_link_text(&args.link, "", args.new_leaf)
        .ok_or_else(|| anyhow!("no file matches '{}'", args.link))?;

    if let Some(text) = &args.append {
        workspace
            .with_active_editor(|editor, _| {
                editor.set_cursor(editor.get_value().len())?;
                editor.replace_selection(text);
                Ok::<_, EditorError>(())
            })
            .ok_or_else(|| anyhow!("the opened leaf has no editor"))??;
        leaf.with_view_mut(|view| view.save())
            .transpose()
            .context("failed to save the file")?;
    }

    println!("{}", describe_leaf(&leaf));
    if let Some(file) = leaf.file() {
        println!("{}", app.vault().read(&file)?);
    }
    if args.layout {
        println!("{}", workspace.get_layout().to_json()?);
    }
    Ok(())
}

fn execute_commands(app: &App, args: CommandsArgs) -> Result<()> {
    let commands = app.list_commands();
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&commands)?),
        OutputFormat::Text => {
            for command in commands {
                let scope = if command.editor { " (editor)" } else { "" };
                println!("{}\t{}{scope}", command.id, command.name);
            }
        }
    }
    Ok(())
}

fn execute_run(app: &App, args: RunArgs) -> Result<()> {
    let workspace = app.workspace();
    if let Some(link) = &args.open {
        workspace
            .open_link_text(link, "", false)
            .ok_or_else(|| anyhow!("no file matches '{link}'"))?;
        if args.select_all {
            workspace.with_active_editor(|editor, _| editor.select_all());
        }
    }
    app.execute_command(&args.command_id)
        .with_context(|| format!("failed to run '{}'", args.command_id))?;

    workspace.iterate_all_leaves(|leaf| println!("{}", describe_leaf(leaf)));
    if let Some(active) = workspace.active_leaf() {
        println!("active: {}", active.id());
    }
    for notice in app.notices().notices() {
        println!("notice: {}", notice.message);
    }
    Ok(())
}

fn execute_settings(app: &App, args: SettingsArgs) -> Result<()> {
    let mut modal = app.settings_modal();
    modal.open();
    if !modal.select(PLUGIN_ID) {
        bail!("the demo plugin has no settings tab");
    }
    let content = modal
        .content_el()
        .ok_or_else(|| anyhow!("settings tab was not mounted"))?;

    if let Some(model) = &args.chat_model {
        let select = find_control(&content, "select")?;
        let known = select
            .children()
            .iter()
            .any(|option| option.get_attribute("value").as_deref() == Some(model.as_str()));
        if !known {
            bail!("unknown chat model '{model}'");
        }
        select.set_attribute("value", model.as_str());
        select.dispatch_event("change", Some(model.clone()));
    }
    if let Some(prompt) = &args.system_prompt {
        let textarea = find_control(&content, "textarea")?;
        textarea.set_attribute("value", prompt.as_str());
        textarea.dispatch_event("input", Some(prompt.clone()));
    }

    println!("{}", modal.root_el().outer_html());
    if let Some(saved) = app.load_data(PLUGIN_ID)? {
        println!("{}", serde_json::to_string_pretty(&saved)?);
    }
    modal.close();
    Ok(())
}

fn find_control(content: &Element, tag: &str) -> Result<Element> {
    content
        .find_by_tag(tag)
        .ok_or_else(|| anyhow!("settings tab has no <{tag}> control"))
}
