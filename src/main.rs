use clap::Parser;
use kube::CustomResourceExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use container_operator::{ContainerApp, Operator, OperatorConfig};

/// Converges `Container` declarations into a Deployment, Service and Ingress
#[derive(Parser, Debug)]
#[command(name = "container-operator", version, about, long_about = None)]
struct Cli {
    /// Print the CRD manifest and exit
    #[arg(long)]
    crd: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        print!("{}", serde_yaml::to_string(&ContainerApp::crd())?);
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = OperatorConfig::from_env()?;
    Operator::new(config).run().await?;
    Ok(())
}
