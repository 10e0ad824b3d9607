//! seriesgate command-line client.
//!
//! Provides the `seriesgate` binary. `query` runs a batch file through the
//! same `QueryEngine` the HTTP server uses and prints the per-refId
//! responses as JSON. `check` runs a single connection test.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use seriesgate_core::model::CONNECTION_TEST_MARKER;
use seriesgate_core::{DataQuery, DatasourceSettings, QueryDataRequest, QueryDataResponse, TimeRange};
use seriesgate_engine::credentials::{API_KEY_VAR, BASE_URL_VAR};
use seriesgate_engine::{CancellationToken, EngineConfig, HttpComputeClient, LayeredCredentials, QueryEngine};

/// Exit code when every query succeeded.
const EXIT_OK: i32 = 0;
/// Exit code when at least one query failed.
const EXIT_QUERY_FAILED: i32 = 1;
/// Exit code for unreadable input or bad configuration.
const EXIT_USAGE: i32 = 2;

/// Run time-series queries against a remote compute API.
#[derive(Parser)]
#[command(name = "seriesgate", about = "Run time-series queries against a remote compute API")]
struct Cli {
    /// API base URL (overrides SERIESGATE_BASE_URL and the batch file).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API token (overrides SERIESGATE_API_KEY and the batch file).
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a batch of queries read from a JSON file.
    Query {
        /// Path to a query batch (`{"queries": [...]}`).
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Verify that the configured credentials reach the remote service.
    Check,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = DatasourceSettings {
        base_url: cli.base_url,
        api_key: cli.api_key,
    };

    let exit_code = match cli.command {
        Commands::Query { file } => run_query(&file, overrides).await,
        Commands::Check => run_check(overrides).await,
    };
    process::exit(exit_code);
}

/// Execute the query subcommand.
async fn run_query(path: &Path, overrides: DatasourceSettings) -> i32 {
    let mut request = match read_batch(path) {
        Ok(request) => request,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return EXIT_USAGE;
        }
    };
    request.datasource = Some(apply_overrides(request.datasource.take(), overrides));

    execute(&request).await
}

/// Execute the check subcommand as a one-query batch.
async fn run_check(overrides: DatasourceSettings) -> i32 {
    let now = Utc::now();
    let request = QueryDataRequest {
        datasource: Some(overrides),
        queries: vec![DataQuery {
            ref_id: "check".to_string(),
            query_type: CONNECTION_TEST_MARKER.to_string(),
            time_range: TimeRange {
                from: now - Duration::hours(1),
                to: now,
            },
            json: serde_json::Value::Null,
        }],
    };

    execute(&request).await
}

async fn execute(request: &QueryDataRequest) -> i32 {
    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };
    let client = match HttpComputeClient::new(config.http_timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: failed to build HTTP client: {}", e);
            return EXIT_USAGE;
        }
    };
    let engine = QueryEngine::new(config, Arc::new(client));

    let defaults = env_settings();
    let credentials = LayeredCredentials {
        inline: request.datasource.as_ref(),
        defaults: &defaults,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let response = engine.execute(&credentials, request, &cancel).await;
    report(&response)
}

/// Prints the response as JSON and derives the exit code from it.
fn report(response: &QueryDataResponse) -> i32 {
    let json = serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize response: {}\"}}", e));
    println!("{}", json);

    let failed = response.error_count();
    if failed == 0 {
        EXIT_OK
    } else {
        eprintln!("{} of {} queries failed", failed, response.len());
        EXIT_QUERY_FAILED
    }
}

fn read_batch(path: &Path) -> Result<QueryDataRequest, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid batch file '{}': {}", path.display(), e))
}

fn env_settings() -> DatasourceSettings {
    DatasourceSettings {
        base_url: std::env::var(BASE_URL_VAR).ok(),
        api_key: std::env::var(API_KEY_VAR).ok(),
    }
}

/// Flag values replace the matching fields of the batch file's settings.
fn apply_overrides(
    from_file: Option<DatasourceSettings>,
    overrides: DatasourceSettings,
) -> DatasourceSettings {
    let from_file = from_file.unwrap_or_default();
    DatasourceSettings {
        base_url: overrides.base_url.or(from_file.base_url),
        api_key: overrides.api_key.or(from_file.api_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seriesgate_core::QueryResponse;
    use seriesgate_core::{QueryError, TimeSeries};

    #[test]
    fn flags_override_file_settings_field_by_field() {
        let from_file = DatasourceSettings {
            base_url: Some("https://file.example.com".to_string()),
            api_key: Some("file-token".to_string()),
        };
        let overrides = DatasourceSettings {
            base_url: None,
            api_key: Some("flag-token".to_string()),
        };

        let merged = apply_overrides(Some(from_file), overrides);

        assert_eq!(merged.base_url.as_deref(), Some("https://file.example.com"));
        assert_eq!(merged.api_key.as_deref(), Some("flag-token"));
    }

    #[test]
    fn exit_code_reflects_query_failures() {
        let mut response = QueryDataResponse::default();
        response
            .responses
            .insert("A".to_string(), QueryResponse::series(TimeSeries::empty("a")));
        assert_eq!(report(&response), EXIT_OK);

        response
            .responses
            .insert("B".to_string(), QueryResponse::from(QueryError::Cancelled));
        assert_eq!(report(&response), EXIT_QUERY_FAILED);
    }

    #[test]
    fn unreadable_batch_file_is_reported() {
        let err = read_batch(Path::new("/nonexistent/batch.json")).unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
