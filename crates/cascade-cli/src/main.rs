//! Plugin console tooling.
//!
//! Provides the `cascade` binary with subcommands to inspect node
//! identifiers, resolve service/tool roots against a node catalog, and
//! require plugin fragments from a webapp directory.
//!
//! Reads configuration from environment variables, overridden by flags:
//! - `CASCADE_WEBAPP_ROOT`: webapp directory (default: ".")
//! - `CASCADE_PLUGIN_BASE`: plugin directory inside the webapp (default: "main/plugin")

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use cascade_core::{NodeIdentifier, NodeRecord, NodeTree, PLUGIN_BASE};
use cascade_loader::{
    CascadeLoader, DependencyResolver, DirectorySource, RequestContext, ResolverConfig,
    TransactionGuard,
};

/// Plugin console tools.
#[derive(Parser)]
#[command(name = "cascade", about = "Plugin node and fragment tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the names and identifiers derived from a node identifier.
    Ids {
        /// Node identifier, e.g. service:bt:jira:6.
        id: String,
    },

    /// Resolve the service and tool roots of a node in a catalog.
    Roots {
        /// JSON file holding an array of node records.
        #[arg(short, long)]
        catalog: PathBuf,

        /// Node identifier to resolve.
        id: String,
    },

    /// Load the fragments a node depends on and print the controllers.
    Require {
        /// Webapp directory (default: $CASCADE_WEBAPP_ROOT or ".").
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Plugin directory inside the webapp (default: $CASCADE_PLUGIN_BASE or "main/plugin").
        #[arg(short, long)]
        base: Option<String>,

        /// Only load the service fragment.
        #[arg(long)]
        service_only: bool,

        /// Node identifier to require.
        id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Ids { id } => run_ids(&NodeIdentifier::from(id)),
        Commands::Roots { catalog, id } => run_roots(&catalog, &NodeIdentifier::from(id)),
        Commands::Require {
            root,
            base,
            service_only,
            id,
        } => {
            let root = root.unwrap_or_else(|| {
                std::env::var("CASCADE_WEBAPP_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("."))
            });
            let base = base.unwrap_or_else(|| {
                std::env::var("CASCADE_PLUGIN_BASE").unwrap_or_else(|_| PLUGIN_BASE.to_string())
            });
            run_require(root, base, service_only, &NodeIdentifier::from(id)).await
        }
    };
    process::exit(exit_code);
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

/// Execute the ids subcommand.
///
/// Returns exit code: 0 = success, 1 = malformed identifier.
fn run_ids(id: &NodeIdentifier) -> i32 {
    let service = match id.service_name() {
        Ok(name) => name,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let hierarchy: Vec<String> = id
        .hierarchy_ids()
        .map(|level| level.trim_start().to_string())
        .collect();
    print_json(&json!({
        "id": id,
        "service": service,
        "service_id": id.service_id().ok(),
        "tool": id.tool_name(),
        "tool_id": id.tool_id(),
        "hierarchy": hierarchy,
        "tool_level": id.is_tool_level(),
        "icon": id.tool_icon_base().ok(),
    }));
    0
}

/// Execute the roots subcommand.
///
/// Returns exit code: 0 = success, 1 = catalog or resolution error,
/// 3 = I/O error.
fn run_roots(catalog: &Path, id: &NodeIdentifier) -> i32 {
    let text = match std::fs::read_to_string(catalog) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read catalog '{}': {}", catalog.display(), e);
            return 3;
        }
    };
    let records: Vec<NodeRecord> = match serde_json::from_str(&text) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: invalid catalog '{}': {}", catalog.display(), e);
            return 1;
        }
    };
    let tree = match NodeTree::from_records(records) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let resolved = tree.service_of(id).and_then(|service| {
        let tool = tree.tool_of(id)?;
        Ok((service, tool))
    });
    let (service, tool) = match resolved {
        Ok(found) => found,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let modes = tree
        .key_of(id)
        .and_then(|key| tree.available_modes(key).ok())
        .unwrap_or_default();

    print_json(&json!({
        "id": id,
        "service": service.id,
        "tool": tool.map(|node| &node.id),
        "child_modes": modes,
    }));
    0
}

/// Execute the require subcommand.
///
/// Returns exit code: 0 = success, 1 = malformed identifier,
/// 3 = fragment load failure.
async fn run_require(root: PathBuf, base: String, service_only: bool, id: &NodeIdentifier) -> i32 {
    tracing::info!("loading fragments of {} from {}", id, root.display());

    let loader = Arc::new(CascadeLoader::new(DirectorySource::new(root)));
    let config = ResolverConfig {
        plugin_base: base,
        ..ResolverConfig::default()
    };
    let resolver = DependencyResolver::with_config(Arc::clone(&loader), config);
    let transactions = TransactionGuard::new();
    let ctx = RequestContext::new("cli", transactions.begin());

    let result = if service_only {
        resolver.require_service(&ctx, id).await
    } else {
        resolver.require_tool(&ctx, id).await
    };

    match result {
        Ok(controller) => {
            print_json(&json!({
                "controller": &*controller,
                "fragments_loaded": loader.load_count(),
            }));
            0
        }
        Err(e) if e.is_malformed_id() => {
            eprintln!("Error: {}", e);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            3
        }
    }
}
