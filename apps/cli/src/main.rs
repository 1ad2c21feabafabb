use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use camlpad_project::{
    ConfigStore, FsResourceTree, PathListResolver, Project, ProjectDescriptor,
};
use clap::{Args, Parser, Subcommand};

const CONFIG_DIR: &str = ".camlpad";
const CONFIG_FILE: &str = "config.json";

#[derive(Parser)]
#[command(
    name = "camlpad-cli",
    about = "Manage source search paths of camlpad projects",
    author,
    version
)]
struct Cli {
    /// 工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,

    /// 設定檔路徑。 / Config file (defaults to <workspace>/.camlpad/config.json).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 輸出除錯記錄。 / Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// 只輸出錯誤記錄。 / Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 管理專案搜尋路徑。 / Manage a project's search paths.
    #[command(subcommand)]
    Paths(PathsCommand),
    /// 檢視或修改工作區設定。 / Inspect or change the workspace config.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum PathsCommand {
    /// 列出路徑（含參照專案）。 / Print the resolved path list.
    Show(ProjectArgs),
    /// 以指定清單取代路徑。 / Replace the path list.
    Set(SetArgs),
    /// 還原預設路徑。 / Restore the default path list.
    Restore(ProjectArgs),
    /// 在清單前加入路徑。 / Put paths in front of the list.
    Add(AddArgs),
    /// 檢查路徑是否有效。 / Check whether a path is valid for the project.
    Check(CheckArgs),
    /// 建立專案描述檔。 / Write the project descriptor.
    Init(InitArgs),
}

#[derive(Args)]
struct ProjectArgs {
    /// 專案名稱（工作區下的資料夾）。 / Project name (directory under the workspace).
    project: String,
}

#[derive(Args)]
struct SetArgs {
    project: String,
    /// 依優先順序排列的路徑。 / Paths in priority order.
    #[arg(required = true)]
    paths: Vec<String>,
}

#[derive(Args)]
struct AddArgs {
    project: String,
    /// 絕對路徑或相對於專案的資料夾。 / Absolute paths or project-relative folders.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    project: String,
    path: String,
}

#[derive(Args)]
struct InitArgs {
    project: String,
    /// 參照的專案名稱。 / Name of a referenced project (repeatable).
    #[arg(long = "reference", value_name = "NAME")]
    references: Vec<String>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// 顯示目前設定。 / Print the effective config as JSON.
    Show,
    /// 設定共用函式庫位置。 / Set the shared library location.
    SetLibrary(SetLibraryArgs),
}

#[derive(Args)]
struct SetLibraryArgs {
    #[arg(value_name = "PATH")]
    path: PathBuf,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let workspace_root = resolve_workspace(cli.workspace)?;
    let config_path = match cli.config {
        Some(path) => resolve_input_path(&path)?,
        None => workspace_root.join(CONFIG_DIR).join(CONFIG_FILE),
    };

    match cli.command {
        Commands::Paths(command) => execute_paths_command(command, &workspace_root, &config_path),
        Commands::Config(command) => execute_config_command(command, &config_path),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn execute_paths_command(
    command: PathsCommand,
    workspace_root: &Path,
    config_path: &Path,
) -> Result<()> {
    let store = ConfigStore::load(config_path)?;
    let config = store.config();
    let tree = FsResourceTree::new(workspace_root);
    let library = config.library_locator();
    let resolver = PathListResolver::new(&tree, library.as_ref(), config.layout.clone());

    match command {
        PathsCommand::Show(args) => {
            let project = open_project(&tree, &args.project)?;
            for entry in resolver.paths(&project) {
                println!("{entry}");
            }
        }
        PathsCommand::Set(args) => {
            let project = open_project(&tree, &args.project)?;
            resolver
                .set_paths(&project, &args.paths)
                .with_context(|| format!("failed to set paths of {}", project.name()))?;
            println!("Saved {} path(s) for '{}'", args.paths.len(), project.name());
        }
        PathsCommand::Restore(args) => {
            let project = open_project(&tree, &args.project)?;
            resolver
                .restore_defaults(&project)
                .with_context(|| format!("failed to restore paths of {}", project.name()))?;
            println!("Restored default paths for '{}'", project.name());
        }
        PathsCommand::Add(args) => {
            let project = open_project(&tree, &args.project)?;
            resolver
                .add_to_paths(&project, &args.paths)
                .with_context(|| format!("failed to add paths to {}", project.name()))?;
            println!("Updated paths for '{}'", project.name());
        }
        PathsCommand::Check(args) => {
            let project = open_project(&tree, &args.project)?;
            if !resolver.is_valid_path(&project, &args.path) {
                bail!(
                    "'{}' is not a valid path for project '{}'",
                    args.path,
                    project.name()
                );
            }
            let kind = if resolver.is_relative_path(&project, &args.path) {
                "relative"
            } else {
                "external"
            };
            println!("{}: valid ({kind})", args.path);
        }
        PathsCommand::Init(args) => {
            let project = open_project(&tree, &args.project)?;
            for reference in &args.references {
                open_project(&tree, reference)?;
            }
            ProjectDescriptor {
                references: args.references,
            }
            .save(project.location())?;
            println!("Initialised project '{}'", project.name());
        }
    }
    Ok(())
}

fn execute_config_command(command: ConfigCommand, config_path: &Path) -> Result<()> {
    let mut store = ConfigStore::load(config_path)?;
    match command {
        ConfigCommand::Show => {
            let json = serde_json::to_string_pretty(store.config())
                .context("failed to render config")?;
            println!("{json}");
        }
        ConfigCommand::SetLibrary(args) => {
            let path = resolve_input_path(&args.path)?;
            store.update(|config| config.library.path = Some(path.clone()))?;
            println!("Library path set to {}", path.display());
        }
    }
    Ok(())
}

fn open_project(tree: &FsResourceTree, name: &str) -> Result<Project> {
    tree.project(name)
        .with_context(|| format!("cannot open project in {}", tree.root().display()))
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => resolve_input_path(&path),
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
