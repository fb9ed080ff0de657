// Build script to resolve the default Prometheus base URL for the target
// environment and capture build timestamp

const PRODUCTION_API_BASE_URL: &str = "https://URL_PRODUCTION";
const STAGING_API_BASE_URL: &str = "https://URL_STAGING";
const DEFAULT_API_BASE_URL: &str = "https://docker-exporter-api.srelab.xyz";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-env-changed=DOCKMON_API_BASE_URL");
    println!("cargo:rerun-if-env-changed=DOCKMON_BUILD_MODE");

    let mode = std::env::var("DOCKMON_BUILD_MODE").unwrap_or_else(|_| "development".to_string());

    // An explicit URL wins over the per-environment default
    let api_base_url = match std::env::var("DOCKMON_API_BASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => match mode.as_str() {
            "production" => PRODUCTION_API_BASE_URL.to_string(),
            "staging" => STAGING_API_BASE_URL.to_string(),
            _ => DEFAULT_API_BASE_URL.to_string(),
        },
    };

    println!("cargo:rustc-env=DOCKMON_BUILD_MODE={}", mode);
    println!("cargo:rustc-env=DOCKMON_DEFAULT_API_BASE_URL={}", api_base_url);

    // Capture build timestamp. The rerun-if directives above mean this is the
    // time of the last build that changed the environment, not of every build.
    let build_time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_time);

    Ok(())
}
