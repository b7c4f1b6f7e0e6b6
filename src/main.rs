use clap::Parser;
use jirust::command::cl::{self, ClCommand, ClCommandError};
use jirust::command::import::{self, ImportArgs, ImportCommandError};
use jirust::command::project::{self, ProjectCommand, ProjectCommandError};
use jirust::command::snapshot::{self, SnapshotCommand, SnapshotCommandError};
use jirust::command::update::{self, UpdateArgs, UpdateError};
use jirust::command::Command;
use jirust::executor::ExecutionReport;
use miette::Diagnostic;
use thiserror::Error;

/// Workspace reconciliation and change-review engine for multi-repo checkouts
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Error, Diagnostic)]
#[diagnostic(code(jirust::main))]
enum RunError {
    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotCommandError),

    #[error(transparent)]
    Cl(#[from] ClCommandError),

    #[error(transparent)]
    Project(#[from] ProjectCommandError),

    #[error(transparent)]
    Import(#[from] ImportCommandError),

    #[error("{failed} of {total} operations failed")]
    OperationsFailed { failed: usize, total: usize },
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    run(cli.command)?;
    Ok(())
}

fn run(command: Command) -> Result<(), RunError> {
    match command {
        Command::Update(args) => run_update(args),
        Command::Snapshot(sub) => run_snapshot(sub),
        Command::Cl(sub) => run_cl(sub),
        Command::Project(sub) => run_project(sub),
        Command::Import(args) => run_import(args),
    }
}

fn run_update(args: UpdateArgs) -> Result<(), RunError> {
    report_execution(update::run_update(args)?)
}

fn run_snapshot(sub: SnapshotCommand) -> Result<(), RunError> {
    match sub {
        SnapshotCommand::Create(args) => {
            let file = snapshot::run_create(args)?;
            println!("{}", file.display());
            Ok(())
        }
        SnapshotCommand::Checkout(args) => report_execution(snapshot::run_checkout(args)?),
    }
}

/// Logs each failed operation, then surfaces a composite diagnostic if any
/// operation in the report failed (§7: "Executor returns a composite error
/// enumerating per-op failures").
fn report_execution(report: ExecutionReport) -> Result<(), RunError> {
    let total = report.outcomes.len();
    let failed = report.failures().count();
    for outcome in report.failures() {
        eprintln!(
            "jirust: {} {} failed: {}",
            outcome.op_kind,
            outcome.project_name,
            outcome.result.as_ref().unwrap_err()
        );
    }
    if failed > 0 {
        Err(RunError::OperationsFailed { failed, total })
    } else {
        Ok(())
    }
}

fn run_cl(sub: ClCommand) -> Result<(), RunError> {
    match sub {
        ClCommand::New(args) => cl::run_new(args)?,
        ClCommand::Sync => cl::run_sync()?,
        ClCommand::Mail(args) => cl::run_mail(args)?,
        ClCommand::Cleanup(args) => cl::run_cleanup(args)?,
    };
    Ok(())
}

fn run_project(sub: ProjectCommand) -> Result<(), RunError> {
    match sub {
        ProjectCommand::List => {
            let projects = project::run_list()?;
            for project in projects {
                println!(
                    "{}\t{}\t{}",
                    project.name,
                    project.path.display(),
                    project.remote_branch
                );
            }
            Ok(())
        }
    }
}

fn run_import(args: ImportArgs) -> Result<(), RunError> {
    let universe = import::run_import(args)?;
    for project in universe.projects.values() {
        println!(
            "{}\t{}\t{}",
            project.name,
            project.path.display(),
            project.revision
        );
    }
    for tool in universe.tools.values() {
        println!("tool\t{}\t{}", tool.name, tool.package);
    }
    Ok(())
}
