use clap::Parser;
use ferrous_doq_domain::CliOverrides;
use ferrous_doq_infrastructure::dns::transport::create_doq_upstream;
use ferrous_doq_infrastructure::dns::Upstream;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info};

mod bootstrap;

#[derive(Parser)]
#[command(name = "ferrous-doq")]
#[command(version)]
#[command(about = "Ferrous DoQ - DNS-over-QUIC client")]
struct Cli {
    /// Domain name to resolve
    name: String,

    /// Record type (A, AAAA, MX, TXT, ...)
    #[arg(short = 't', long = "type", default_value = "A")]
    record_type: String,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Upstream URL (quic://HOST[:PORT] or doq://HOST[:PORT])
    #[arg(short = 'u', long)]
    upstream: Option<String>,

    /// Timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of times to send the query over the same connection
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        upstream: cli.upstream.clone(),
        timeout_ms: cli.timeout_ms,
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Ferrous DoQ v{}", env!("CARGO_PKG_VERSION"));

    let record_type = RecordType::from_str(&cli.record_type.to_uppercase())
        .map_err(|e| anyhow::anyhow!("Invalid record type {}: {}", cli.record_type, e))?;
    let name = Name::from_str(&cli.name)
        .map_err(|e| anyhow::anyhow!("Invalid domain name {}: {}", cli.name, e))?;

    let upstream = create_doq_upstream(&config.upstream)?;

    for id in 1..=cli.count {
        let query = build_query(id, name.clone(), record_type);
        let start = Instant::now();

        match upstream.exchange(&query).await {
            Ok(response) => {
                info!(
                    upstream = %upstream.address(),
                    answers = response.answers().len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Query answered"
                );
                for record in response.answers() {
                    println!("{}", record);
                }
            }
            Err(e) => {
                error!(upstream = %upstream.address(), error = %e, "Query failed");
                upstream.close().await;
                return Err(e.into());
            }
        }
    }

    upstream.close().await;
    Ok(())
}

fn build_query(id: u16, name: Name, record_type: RecordType) -> Message {
    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(id, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);
    message
}
