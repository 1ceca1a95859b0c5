use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeSet;

mod cli;
mod client;
mod config;
mod error;
mod stack;
mod template;

use cli::{Command, ConfigCommand, ConfigInitArgs, DeployArgs, RootArgs, TargetArgs};
use client::{HttpBackend, StackBackend};
use stack::{Capability, Region, StackId, StackRequest, StackStatus};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    match args.command {
        Command::Create(args) => cmd_create(args),
        Command::Update(args) => cmd_update(args),
        Command::Delete(args) => cmd_delete(args),
        Command::Status(args) => cmd_status(args),
        Command::Config(ConfigCommand::Init(args)) => cmd_config_init(args),
    }
}

/// Stderr logging so stdout stays parseable under --json.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Endpoint and region for one invocation, resolved flag > env > config file.
struct Target {
    endpoint: String,
    region: Region,
}

fn resolve_target(endpoint_flag: Option<&str>, region_flag: Option<Region>) -> Result<Target> {
    let file = config::load_default_config()?;
    let endpoint_env = std::env::var(config::ENDPOINT_ENV).ok();
    let region_env = std::env::var(config::REGION_ENV).ok();
    let endpoint = config::resolve_endpoint(endpoint_flag, endpoint_env.as_deref(), file.as_ref())?;
    let region = config::resolve_region(region_flag, region_env.as_deref(), file.as_ref())?;
    Ok(Target { endpoint, region })
}

/// Load documents and run every local check that must precede a remote call.
fn build_request(args: &DeployArgs, region: Region) -> Result<StackRequest> {
    let template_body = template::load_template(&args.template)?;
    let parameters = match &args.parameters {
        Some(path) => template::load_parameters(path)?,
        None => Vec::new(),
    };
    let mut capabilities = BTreeSet::new();
    if args.allow_iam {
        capabilities.insert(Capability::NamedIam);
    }
    let required = template::required_capabilities(&template_body)?;
    template::check_capabilities(&required, &capabilities)?;
    Ok(StackRequest {
        stack_name: args.stack_name.clone(),
        region,
        template_body,
        parameters,
        capabilities,
    })
}

#[derive(Serialize)]
struct DeployReport<'a> {
    action: &'static str,
    stack_name: &'a str,
    region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack_id: Option<&'a StackId>,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    stack_name: &'a str,
    region: Region,
    stack_id: &'a StackId,
    status: StackStatus,
}

fn cmd_create(args: DeployArgs) -> Result<()> {
    let target = resolve_target(args.endpoint.as_deref(), args.region)?;
    let request = build_request(&args, target.region)?;
    let backend = HttpBackend::new(&target.endpoint);
    let stack_id = backend.create(&request).context("create stack")?;

    let report = DeployReport {
        action: "create",
        stack_name: &request.stack_name,
        region: request.region,
        stack_id: Some(&stack_id),
    };
    if args.json {
        print_json(&report)?;
    } else {
        println!(
            "Created stack {} in {}: {}",
            request.stack_name, request.region, stack_id
        );
    }
    Ok(())
}

fn cmd_update(args: DeployArgs) -> Result<()> {
    let target = resolve_target(args.endpoint.as_deref(), args.region)?;
    let request = build_request(&args, target.region)?;
    let backend = HttpBackend::new(&target.endpoint);
    backend.update(&request).context("update stack")?;

    let report = DeployReport {
        action: "update",
        stack_name: &request.stack_name,
        region: request.region,
        stack_id: None,
    };
    if args.json {
        print_json(&report)?;
    } else {
        println!(
            "Submitted update for stack {} in {}",
            request.stack_name, request.region
        );
    }
    Ok(())
}

fn cmd_delete(args: TargetArgs) -> Result<()> {
    let target = resolve_target(args.endpoint.as_deref(), args.region)?;
    let backend = HttpBackend::new(&target.endpoint);
    backend
        .delete(target.region, &args.stack_name)
        .context("delete stack")?;

    let report = DeployReport {
        action: "delete",
        stack_name: &args.stack_name,
        region: target.region,
        stack_id: None,
    };
    if args.json {
        print_json(&report)?;
    } else {
        println!(
            "Submitted delete for stack {} in {}",
            args.stack_name, target.region
        );
    }
    Ok(())
}

fn cmd_status(args: TargetArgs) -> Result<()> {
    let target = resolve_target(args.endpoint.as_deref(), args.region)?;
    let backend = HttpBackend::new(&target.endpoint);
    let description = backend
        .describe(target.region, &args.stack_name)
        .context("describe stack")?
        .ok_or_else(|| {
            anyhow!(
                "stack {} does not exist in {}",
                args.stack_name,
                target.region
            )
        })?;

    let report = StatusReport {
        stack_name: &description.stack_name,
        region: target.region,
        stack_id: &description.stack_id,
        status: description.status,
    };
    if args.json {
        print_json(&report)?;
    } else {
        println!(
            "Stack {} in {}: {} ({})",
            description.stack_name, target.region, description.status, description.stack_id
        );
    }
    Ok(())
}

fn cmd_config_init(args: ConfigInitArgs) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    if path.exists() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (pass --force to overwrite)",
            path.display()
        ));
    }
    config::write_config(&path, &config::config_stub_value())?;
    println!("Wrote config stub to {}", path.display());
    println!("Edit endpoint and default_region before the first deploy.");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize report")?;
    println!("{json}");
    Ok(())
}
