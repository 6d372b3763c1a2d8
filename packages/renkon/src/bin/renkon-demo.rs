//! Renkon demo driver.
//!
//! Serves a small bank-accounts mock with three scenarios. Select one per
//! request with the `x-renkon-scenario` header and keep a stable cursor
//! with `x-renkon-session`.

use anyhow::{Context, Result};
use axum::http::Method;
use clap::Parser;
use renkon::prelude::*;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "renkon-demo", version, about = "Scenario-driven mock API server demo")]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn account(balance: i64) -> serde_json::Value {
    json!([{
        "name": "Annabelle Citizen",
        "bsb": "000123",
        "number": "123456789",
        "balance": balance,
    }])
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,renkon=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let args = Args::parse();

    let server = Renkon::new(
        ServerConfig::builder()
            .hostname(args.hostname)
            .port(args.port)
            .build(),
    );

    server
        .add_endpoint(
            Endpoint::json(Method::GET, "/accounts")
                .with_description("List the customer's bank accounts")
                .with_response(MockResponse::json("zero-balance", account(0)))
                .with_response(MockResponse::json("millionaire", account(1_000_000))),
        )
        .context("failed to register the accounts endpoint")?;

    server
        .add_scenarios(
            ScenariosBuilder::new()
                .add(
                    Scenario::new("flat-broke")
                        .with_display_name("Flat broke")
                        .with_description("Every account is empty")
                        .with_actions(
                            "GET-/accounts",
                            vec![ReturnResponse::configuration("zero-balance")],
                        ),
                )
                .add(
                    Scenario::new("millionaires-row")
                        .with_display_name("Millionaire's row")
                        .with_description("Broke and rich on alternating calls")
                        .with_actions(
                            "GET-/accounts",
                            vec![
                                ReturnResponse::configuration("zero-balance"),
                                ReturnResponse::configuration("millionaire"),
                            ],
                        ),
                )
                .add(
                    Scenario::new("super-rich")
                        .with_display_name("Super rich")
                        .with_description("A rich response that takes its time")
                        .with_actions(
                            "GET-/accounts",
                            vec![
                                Wait::configuration(Delay::from_secs(2)),
                                ReturnResponse::configuration("millionaire"),
                            ],
                        ),
                ),
        )
        .await;

    // Ctrl-C drains the transport and exits cleanly.
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            shutdown.shutdown();
        }
    });

    server.run().await.context("server failed to start")?;
    Ok(())
}
