//! `local-models` entry point.
//!
//! Operator tool for the local models component: inspect the component
//! descriptor, verify a bundle directory, install a bundle, report the active
//! version, or delete everything installed.
//!
//! ## CLI Subcommands
//!
//! - `local-models info` - Print the component descriptor
//! - `local-models verify <dir>` - Verify a bundle directory (exit 0/1)
//! - `local-models install <dir>` - Install an unpacked bundle
//! - `local-models status` - Show the active version and model paths
//! - `local-models delete` - Remove all installed versions

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use local_models_updater::component::{ComponentInstaller, ComponentInstallerPolicy};
use local_models_updater::config::{self as lm_config, EnvConfig};
use local_models_updater::models::{
    BundleManifest, LocalModelsInstallerPolicy, NamedModel, UpdaterState,
};
use local_models_updater::telemetry::init_logging;

const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    let config = lm_config::load();
    if let Err(e) = init_logging(&config.log) {
        eprintln!("Logging setup failed: {}", e);
        return ExitCode::from(EXIT_USAGE);
    }

    match command {
        "info" => {
            run_info();
            ExitCode::SUCCESS
        }
        "verify" => match args.get(2) {
            Some(dir) => run_verify(Path::new(dir)),
            None => usage_error("verify requires a bundle directory"),
        },
        "install" => match args.get(2) {
            Some(dir) => run_install(&config, Path::new(dir)).await,
            None => usage_error("install requires a bundle directory"),
        },
        "status" => run_status(&config).await,
        "delete" => run_delete(&config).await,
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("local-models {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn usage_error(message: &str) -> ExitCode {
    eprintln!("{}", message);
    print_usage();
    ExitCode::from(EXIT_USAGE)
}

fn installer(config: &EnvConfig) -> ComponentInstaller {
    let policy: Arc<dyn ComponentInstallerPolicy> = Arc::new(LocalModelsInstallerPolicy::new());
    ComponentInstaller::new(policy, &config.components_dir).with_keep_versions(config.keep_versions)
}

fn run_info() {
    let policy = LocalModelsInstallerPolicy::new();
    println!("name:                 {}", policy.name());
    println!("id:                   {}", policy.component_id());
    println!("public key sha256:    {}", hex::encode(policy.hash()));
    println!("relative install dir: {}", policy.relative_install_dir().display());
    println!(
        "group policy updates: {}",
        policy.supports_group_policy_enabled_component_updates()
    );
    println!("network encryption:   {}", policy.requires_network_encryption());
    println!("brave component:      {}", policy.is_brave_component());
    for (key, value) in policy.installer_attributes() {
        println!("attribute:            {}={}", key, value);
    }
}

fn run_verify(dir: &Path) -> ExitCode {
    let manifest = match BundleManifest::from_dir(dir) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("FAIL: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match local_models_updater::models::verify_bundle(&manifest, dir) {
        Ok(()) => {
            println!("OK: {}", dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("FAIL: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_install(config: &EnvConfig, dir: &Path) -> ExitCode {
    let installer = installer(config);
    if let Err(e) = installer.load_installed().await {
        eprintln!("Failed to read installed versions: {}", e);
        return ExitCode::FAILURE;
    }
    match installer.install(dir).await {
        Ok(installed) => {
            println!("installed {} at {}", installed.version, installed.install_dir.display());
            print_model_paths();
            ExitCode::SUCCESS
        }
        Err(e) if e.is_rejection() => {
            eprintln!("Rejected: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Install failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_status(config: &EnvConfig) -> ExitCode {
    let installer = installer(config);
    // Read-only: status must not activate or clean up anything.
    match installer.inspect_installed().await {
        Ok(Some(installed)) => {
            println!("active version: {}", installed.version);
            println!("install dir:    {}", installed.install_dir.display());
            for &model in NamedModel::ALL {
                let path = model.resolve(&installed.install_dir);
                println!("{:<15} {}", model.as_str(), path.display());
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!(
                "no verified bundle installed under {}",
                installer.install_root().display()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Status failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_delete(config: &EnvConfig) -> ExitCode {
    match LocalModelsInstallerPolicy::delete_component(&config.components_dir).await {
        Ok(true) => {
            let dir = LocalModelsInstallerPolicy::component_dir(&config.components_dir);
            println!("deleted {}", dir.display());
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("nothing installed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Delete failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_model_paths() {
    let state = UpdaterState::instance();
    for &model in NamedModel::ALL {
        let path = state.model_path(model).unwrap_or_default();
        println!("{:<15} {}", model.as_str(), path.display());
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "local-models - Local model bundle updater v{}

USAGE:
    local-models [COMMAND] [ARGS]

COMMANDS:
    info           Print the component descriptor
    verify <dir>   Verify an unpacked bundle (exit 0 if valid, 1 if not)
    install <dir>  Install an unpacked bundle; its version comes from manifest.json
    status         Show the active version and model paths
    delete         Remove every installed version
    version        Show version information
    help           Show this help message

ENVIRONMENT:
    LOCAL_MODELS_COMPONENTS_DIR  Components root (default: ./components)
    LOCAL_MODELS_ENABLED         Register the component (default: true)
    LOCAL_MODELS_KEEP_VERSIONS   Installed versions kept by cleanup (default: 1)
    LOCAL_MODELS_LOG_LEVEL       Log filter (default: info)
    LOCAL_MODELS_LOG_FORMAT      json or pretty (default: json)
    LOCAL_MODELS_LOG_FILE        Write logs to this file instead of stderr

EXIT CODES:
    0  Success
    1  Failure (verification failed, rejected bundle, IO error)
    2  Usage or configuration error
",
        version
    );
}
