use std::env;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

use dc_loadtest::app::AppType;
use dc_loadtest::config::AppSettings;
use dc_loadtest::data_source::Dataset;
use dc_loadtest::logging::init_logging;
use dc_loadtest::metrics::{
    gather_metrics_string, register_metrics, start_metrics_server, PrometheusSink,
};
use dc_loadtest::runner::run_load;
use tracing::{error, info};

/// Prints helpful configuration documentation.
fn print_config_help() {
    eprintln!("Required environment variables:");
    eprintln!("  APP_TYPE                - Application under test: jira or confluence");
    eprintln!("  CONFIG_PATH             - Path to the application's YAML settings file");
    eprintln!();
    eprintln!("Optional environment variables:");
    eprintln!("  USERS_CSV               - Headerless username,password CSV (default: admin user)");
    eprintln!("  LOG_DIR                 - Directory for loadtest.log (default: results)");
    eprintln!("  METRICS_PORT            - Prometheus metrics port (default: 9090)");
    eprintln!("  METRIC_NAMESPACE        - Prometheus metric namespace (default: dc_loadtest)");
    eprintln!("  RUST_LOG                - Log filter (default: info)");
    eprintln!();
    eprintln!("Settings overrides (prefix JIRA_ or CONFLUENCE_):");
    eprintln!("  <APP>_CONCURRENCY            - Number of virtual users");
    eprintln!("  <APP>_TOTAL_ACTIONS_PER_HOUR - Target actions per hour across all users");
    eprintln!("  <APP>_TEST_DURATION          - Test duration: 30s, 45m, 1h");
    eprintln!("  <APP>_VERBOSE                - Log every action: true or false");
}

fn fail(message: String) -> ! {
    eprintln!("Configuration error: {}\n", message);
    print_config_help();
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_type: AppType = match env::var("APP_TYPE") {
        Ok(value) => value.parse().unwrap_or_else(|e: String| fail(e)),
        Err(_) => fail("APP_TYPE is not set".to_string()),
    };
    let config_path = env::var("CONFIG_PATH")
        .unwrap_or_else(|_| fail("CONFIG_PATH is not set".to_string()));

    let settings = AppSettings::load(&config_path, app_type)
        .unwrap_or_else(|e| fail(format!("{}: {}", config_path, e)));

    let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "results".to_string());
    let log_path = init_logging(&log_dir)?;

    // Register Prometheus metrics
    register_metrics()?;

    let users = match env::var("USERS_CSV") {
        Ok(path) => Some(Dataset::from_file(&path)?),
        Err(_) => None,
    };

    info!(
        app = %app_type,
        url = %settings.server_url(),
        concurrency = settings.concurrency,
        total_actions_per_hour = settings.total_actions_per_hour,
        test_duration = %settings.test_duration,
        log_file = ?log_path,
        "Configuration loaded"
    );

    // Start the Prometheus metrics HTTP server
    let metrics_port = env::var("METRICS_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(9090);
    let registry_arc = Arc::new(Mutex::new(prometheus::default_registry().clone()));

    {
        let registry = registry_arc.clone();
        tokio::spawn(async move {
            start_metrics_server(metrics_port, registry).await;
        });
    }

    let summary = match run_load(app_type, &settings, Arc::new(PrometheusSink), users).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Load run failed");
            return Err(e.into());
        }
    };

    // Brief pause to allow in-flight metrics to be updated
    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("Collecting and printing final metrics...");

    let final_metrics_output = gather_metrics_string(&registry_arc);
    println!("\n--- FINAL METRICS ---\n{}", final_metrics_output);
    println!("--- END OF FINAL METRICS ---\n");

    println!(
        "Users started: {}, stopped early: {}",
        summary.users_started, summary.users_stopped_early
    );

    Ok(())
}
