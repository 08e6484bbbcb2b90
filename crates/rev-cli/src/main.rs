use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rev_billingplatform_connector::BillingPlatformConnectorFactory;
use rev_chuck_connector::ChuckConnectorFactory;
use rev_config::AppConfig;
use rev_core::{
    Connector, QueryMethod, Registry, Table, WriteMode, WriteOptions, WriteRequest,
};
use rev_salesforce_connector::SalesforceConnectorFactory;
use rev_stripe_connector::StripeConnectorFactory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "rev-cli")]
#[command(about = "Move tables between CSV files and SaaS APIs", long_about = None)]
struct Cli {
    /// Path to configuration directory
    #[arg(short, long, default_value = "config", global = true)]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered connector types
    Connectors,

    /// Validate configuration files
    Validate,

    /// Run a query and print the result as CSV
    Read {
        /// Configured connector name
        #[arg(long)]
        connector: String,

        #[arg(short, long)]
        query: String,

        /// rest or bulk
        #[arg(short, long, default_value = "rest")]
        method: String,

        /// Write CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create records from a CSV file
    Create(WriteArgs),

    /// Update records from a CSV file
    Update(WriteArgs),

    /// Upsert records from a CSV file
    Upsert(WriteArgs),

    /// Delete the records listed in a CSV file
    Delete(WriteArgs),
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Configured connector name
    #[arg(long)]
    connector: String,

    /// Target entity / object name
    #[arg(short, long)]
    entity: String,

    /// CSV file with a header row
    #[arg(short, long)]
    input: PathBuf,

    #[arg(long, default_value_t = 200)]
    batch_size: usize,

    /// External id field matched by upsert
    #[arg(long)]
    upsert_key: Option<String>,

    /// Roll back a whole batch when one record fails
    #[arg(long)]
    all_or_none: bool,

    /// Submit one bulk job instead of batched REST calls
    #[arg(long)]
    bulk: bool,

    /// Write the result CSV here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl WriteArgs {
    fn options(&self) -> WriteOptions {
        WriteOptions {
            batch_size: self.batch_size,
            upsert_key: self.upsert_key.clone(),
            all_or_none: self.all_or_none,
            mode: if self.bulk {
                WriteMode::Bulk
            } else {
                WriteMode::Rest
            },
        }
    }

    fn request(&self) -> anyhow::Result<WriteRequest> {
        let records = Table::from_csv_path(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        info!("Loaded {} records from {}", records.len(), self.input.display());
        Ok(WriteRequest::new(self.entity.clone(), records).with_options(self.options()))
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteCommand {
    Create,
    Update,
    Upsert,
    Delete,
}

fn build_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_connector(Arc::new(SalesforceConnectorFactory));
    registry.register_connector(Arc::new(BillingPlatformConnectorFactory));
    registry.register_connector(Arc::new(StripeConnectorFactory));
    registry.register_connector(Arc::new(ChuckConnectorFactory));
    registry
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let level = match config.logging.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries CSV output
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if config.logging.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Build the connector configured under `name`
async fn connect(
    config: &AppConfig,
    registry: &Registry,
    name: &str,
) -> anyhow::Result<Box<dyn Connector>> {
    let entry = config
        .connector(name)
        .ok_or_else(|| anyhow::anyhow!("Connector '{}' is not configured", name))?;
    let connector = registry
        .create_connector(&entry.kind, entry.config.clone())
        .await
        .with_context(|| format!("Failed to create connector '{}'", name))?;
    info!("Connected '{}' ({})", name, entry.kind);
    Ok(connector)
}

fn emit(table: &Table, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            table
                .write_csv_path(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} rows to {}", table.len(), path.display());
        }
        None => table.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}

async fn run_write(
    config: &AppConfig,
    registry: &Registry,
    command: WriteCommand,
    args: WriteArgs,
) -> anyhow::Result<()> {
    let connector = connect(config, registry, &args.connector).await?;
    let request = args.request()?;

    let result = match command {
        WriteCommand::Create => connector.create(request).await?,
        WriteCommand::Update => connector.update(request).await?,
        WriteCommand::Upsert => connector.upsert(request).await?,
        WriteCommand::Delete => connector.delete(request).await?,
    };
    emit(&result, args.output.as_deref())
}

fn validate(config: &AppConfig, registry: &Registry) -> anyhow::Result<()> {
    let mut unknown = Vec::new();

    println!("Connectors: {}", config.connectors.len());
    for entry in &config.connectors {
        if registry.contains(&entry.kind) {
            println!("  ✓ {} ({})", entry.name, entry.kind);
        } else {
            println!("  ✗ {} ({}): unknown connector type", entry.name, entry.kind);
            unknown.push(entry.name.as_str());
        }
    }

    if !unknown.is_empty() {
        anyhow::bail!("Unknown connector type for: {}", unknown.join(", "));
    }
    println!("✓ Configuration is valid");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let app_config = AppConfig::load(&cli.config_dir)?;
    init_tracing(&app_config)?;

    let registry = build_registry();

    match cli.command {
        Commands::Connectors => {
            for name in registry.list_connectors() {
                println!("{}", name);
            }
        }

        Commands::Validate => {
            info!("Validating configuration in: {}", cli.config_dir);
            validate(&app_config, &registry)?;
        }

        Commands::Read {
            connector,
            query,
            method,
            output,
        } => {
            let method: QueryMethod = method.parse()?;
            let connector = connect(&app_config, &registry, &connector).await?;
            let table = connector.read(&query, method).await?;
            info!("Query returned {} rows", table.len());
            emit(&table, output.as_deref())?;
        }

        Commands::Create(args) => {
            run_write(&app_config, &registry, WriteCommand::Create, args).await?
        }
        Commands::Update(args) => {
            run_write(&app_config, &registry, WriteCommand::Update, args).await?
        }
        Commands::Upsert(args) => {
            run_write(&app_config, &registry, WriteCommand::Upsert, args).await?
        }
        Commands::Delete(args) => {
            run_write(&app_config, &registry, WriteCommand::Delete, args).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rev_config::ConnectorEntry;
    use serde_json::Value;

    #[test]
    fn test_registry_has_every_connector() {
        assert_eq!(
            build_registry().list_connectors(),
            vec!["billingplatform", "chuck", "salesforce", "stripe"]
        );
    }

    #[test]
    fn test_parse_write_args() {
        let cli = Cli::try_parse_from([
            "rev-cli",
            "upsert",
            "--connector",
            "crm",
            "--entity",
            "Contact",
            "--input",
            "contacts.csv",
            "--batch-size",
            "50",
            "--upsert-key",
            "Email",
            "--bulk",
        ])
        .unwrap();

        let Commands::Upsert(args) = cli.command else {
            panic!("expected upsert");
        };
        let options = args.options();
        assert_eq!(options.batch_size, 50);
        assert_eq!(options.upsert_key.as_deref(), Some("Email"));
        assert_eq!(options.mode, WriteMode::Bulk);
        assert!(!options.all_or_none);
        assert_eq!(cli.config_dir, "config");
    }

    #[test]
    fn test_parse_read_defaults_to_rest() {
        let cli = Cli::try_parse_from([
            "rev-cli",
            "--config-dir",
            "/etc/rev",
            "read",
            "--connector",
            "jokes",
            "--query",
            "categories",
        ])
        .unwrap();

        assert_eq!(cli.config_dir, "/etc/rev");
        match cli.command {
            Commands::Read { method, output, .. } => {
                assert_eq!(method.parse::<QueryMethod>().unwrap(), QueryMethod::Rest);
                assert!(output.is_none());
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_write_request_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(&input, "LastName,Email\nLovelace,ada@example.com\nHopper,\n").unwrap();

        let args = WriteArgs {
            connector: "crm".to_string(),
            entity: "Contact".to_string(),
            input,
            batch_size: 200,
            upsert_key: None,
            all_or_none: true,
            bulk: false,
            output: None,
        };
        let request = args.request().unwrap();
        assert_eq!(request.records.len(), 2);
        assert_eq!(request.records.get(1, "Email"), Some(Value::Null));
        assert!(request.options.all_or_none);
        assert_eq!(request.options.mode, WriteMode::Rest);
    }

    #[test]
    fn test_validate_flags_unknown_types() {
        let registry = build_registry();
        let mut config = AppConfig::default();
        config.connectors.push(ConnectorEntry {
            name: "jokes".to_string(),
            kind: "chuck".to_string(),
            config: Value::Null,
        });
        assert!(validate(&config, &registry).is_ok());

        config.connectors.push(ConnectorEntry {
            name: "erp".to_string(),
            kind: "netsuite".to_string(),
            config: Value::Null,
        });
        assert!(validate(&config, &registry).is_err());
    }

    #[tokio::test]
    async fn test_connect_unconfigured_name() {
        let result = connect(&AppConfig::default(), &build_registry(), "crm").await;
        let err = result.err().unwrap();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = Table::from_csv_str("Id,status\n1,success\n").unwrap();
        emit(&table, Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Id,status\n1,success\n");
    }
}
