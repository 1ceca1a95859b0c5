//! CLI argument parsing for the stack deployer.
//!
//! The CLI is intentionally thin: one verb per lifecycle action, each mapping
//! to exactly one remote call, so nothing here embeds provisioning policy.
use crate::stack::Region;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for stack lifecycle commands.
#[derive(Parser, Debug)]
#[command(
    name = "stackctl",
    version,
    about = "Deploy declarative stacks through a remote provisioning API",
    after_help = "Commands:\n  create --stack-name <NAME> --template <PATH>   Create a new stack\n  update --stack-name <NAME> --template <PATH>   Update an existing stack\n  delete --stack-name <NAME>                     Delete an existing stack\n  status --stack-name <NAME>                     Resolve a stack and print its state\n  config init                                    Write a config stub\n\nExamples:\n  stackctl create --stack-name edge --region us-east-1 --template vpc.json\n  stackctl update --stack-name edge --template vpc.json --parameters params.json\n  stackctl create --stack-name ops --template roles.json --allow-iam\n  stackctl status --stack-name edge --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level lifecycle commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Create(DeployArgs),
    Update(DeployArgs),
    Delete(TargetArgs),
    Status(TargetArgs),
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Inputs for create and update: both send a full template and parameters.
#[derive(Parser, Debug)]
#[command(about = "Submit a stack template to the provisioning service")]
pub struct DeployArgs {
    /// Stack name, unique per region
    #[arg(long, value_name = "NAME")]
    pub stack_name: String,

    /// Target region (falls back to STACKCTL_REGION, then the config file)
    #[arg(long, value_name = "REGION", value_enum)]
    pub region: Option<Region>,

    /// Path to the template document (JSON resource graph)
    #[arg(long, value_name = "PATH")]
    pub template: PathBuf,

    /// Path to the parameter document (JSON array of key/value pairs)
    #[arg(long, value_name = "PATH")]
    pub parameters: Option<PathBuf>,

    /// Acknowledge identity/role resources in the template
    #[arg(long)]
    pub allow_iam: bool,

    /// Provisioning API endpoint (falls back to STACKCTL_ENDPOINT, then the config file)
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Log request dispatch and response status to stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Inputs for delete and status: name and region only.
#[derive(Parser, Debug)]
#[command(about = "Address an existing stack by name and region")]
pub struct TargetArgs {
    /// Stack name, unique per region
    #[arg(long, value_name = "NAME")]
    pub stack_name: String,

    /// Target region (falls back to STACKCTL_REGION, then the config file)
    #[arg(long, value_name = "REGION", value_enum)]
    pub region: Option<Region>,

    /// Provisioning API endpoint (falls back to STACKCTL_ENDPOINT, then the config file)
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Log request dispatch and response status to stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Config file management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Init(ConfigInitArgs),
}

/// Inputs for `config init`.
#[derive(Parser, Debug)]
#[command(about = "Write a config stub with endpoint and default region")]
pub struct ConfigInitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,
}

impl Command {
    /// Whether the selected verb asked for verbose logging.
    pub fn verbose(&self) -> bool {
        match self {
            Command::Create(args) | Command::Update(args) => args.verbose,
            Command::Delete(args) | Command::Status(args) => args.verbose,
            Command::Config(_) => false,
        }
    }
}
