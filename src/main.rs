use anyhow::Context;
use clap::Parser;
use openstack_integration::utils::{logger, validation::Validate};
use openstack_integration::{
    CliConfig, Command, Databag, IntegrationError, IntegrationRequirer, IntegrationService,
    MemoryRelation, ProviderConfig, RelationBus,
};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting openstack-integration CLI");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let result = match &config.command {
        Command::Fulfill {
            config: provider,
            relation,
            output,
        } => fulfill(provider, relation, output.as_deref().unwrap_or(relation)),
        Command::Render {
            databag,
            endpoint,
            base64: encoded,
        } => render(databag, endpoint, *encoded),
    };

    if let Err(e) = result {
        tracing::error!("❌ {:#}", e);
        eprintln!("❌ {:#}", e);
        if let Some(err) = e.downcast_ref::<IntegrationError>() {
            eprintln!("💡 {}", err.recovery_suggestion());
        }
        std::process::exit(1);
    }

    Ok(())
}

fn fulfill(provider: &Path, relation_path: &Path, output: &Path) -> anyhow::Result<()> {
    let provider_config = ProviderConfig::from_file(provider)
        .with_context(|| format!("loading {}", provider.display()))?;
    provider_config.validate()?;

    let relation = MemoryRelation::from_file(relation_path)
        .with_context(|| format!("loading {}", relation_path.display()))?;
    if relation.endpoint_name() != provider_config.endpoint_name() {
        return Err(IntegrationError::ConfigError {
            message: format!(
                "relation snapshot is for endpoint {}, provider serves {}",
                relation.endpoint_name(),
                provider_config.endpoint_name()
            ),
        }
        .into());
    }

    let service = IntegrationService::new(provider_config.fulfillment());
    let report = service.run(&relation)?;

    relation
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    if report.fulfilled.is_empty() {
        println!("✅ No pending requests on {}", relation.endpoint_name());
    } else {
        println!(
            "✅ Answered {} request(s): {}",
            report.fulfilled.len(),
            report.fulfilled.join(", ")
        );
    }
    println!("📁 Relation saved to: {}", output.display());
    Ok(())
}

fn render(databag_path: &Path, endpoint: &str, encoded: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(databag_path)
        .with_context(|| format!("reading {}", databag_path.display()))?;
    let databag: Databag = serde_json::from_str(&content).map_err(IntegrationError::from)?;

    let requirer = IntegrationRequirer::new(endpoint, Some(&databag));
    let conf = if encoded {
        requirer.cloud_conf_b64()
    } else {
        requirer.cloud_conf()
    };

    match conf {
        Some(conf) => {
            print!("{}", conf);
            Ok(())
        }
        None => Err(IntegrationError::InvalidRelationData {
            message: requirer
                .evaluate_relation(false)
                .unwrap_or_else(|| format!("Waiting for {}", endpoint)),
        }
        .into()),
    }
}
