//! `clerk config`: show the effective configuration.

use clerk_config::AppConfig;

pub fn show(config: &AppConfig) {
    print!("{}", config.redacted_toml());

    if !config.has_api_key() {
        eprintln!();
        eprintln!("warning: no API key set (set OPENAI_API_KEY or CLERK_API_KEY)");
    }
}
