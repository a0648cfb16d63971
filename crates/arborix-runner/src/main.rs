//! Arborix — gene-regulatory network inference from expression data.
//! Entry point for the command-line runner.

mod config;

use std::io::Write;

use anyhow::Context;
use arborix_expression::ExpressionMatrix;
use arborix_infer::infer_network;
use arborix_ranker::{rank, LinkList};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn write_links<W: Write>(links: &LinkList, out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for link in links {
        writer.serialize(link)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a clean link list
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("arborix=info,warn")),
        )
        .init();

    info!("Arborix {}", env!("CARGO_PKG_VERSION"));

    let explicit = std::env::args().nth(1);
    let config = config::Config::load(explicit.as_deref())?;
    info!(
        "Configuration loaded. Method: {}, trees: {}, workers: {}",
        config.inference.tree_method, config.inference.num_trees, config.inference.parallelism
    );

    let options = config.expression.csv_options()?;
    let matrix = ExpressionMatrix::from_path(&config.expression.path, &options)
        .with_context(|| format!("loading {}", config.expression.path.display()))?;

    let result = infer_network(&matrix, &config.inference)?;
    let links = rank(&result.matrix, &config.ranking)?;
    info!("{} links ranked", links.len());

    match &config.output.links {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_links(&links, file)?;
            info!("Links written to {}", path.display());
        }
        None => write_links(&links, std::io::stdout().lock())?,
    }

    if let Some(path) = &config.output.report {
        let json = serde_json::to_string_pretty(&result.report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    Ok(())
}
