//! `bravomind config`: Configuration management commands.

use bravomind_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    // `load` already rejects invalid values; what remains are soft warnings.
    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed and validated");

            let warnings = soft_warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:   {} ({})", config.provider.name, config.provider.api_url);
            println!("   Model:      {}", config.generation.model);
            println!(
                "   Rate limit: {} / {} ms, {:?}",
                config.rate_limit.max_requests, config.rate_limit.time_window, config.rate_limit.scope
            );
            println!("   History:    last {} messages", config.max_history_messages);
            println!(
                "   Gateway:    {}:{}",
                config.gateway.host, config.gateway.port
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

fn soft_warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if config.api_key.is_none() {
        warnings.push("No API key set (BRAVOMIND_API_KEY or NVIDIA_API_KEY); chat will use offline replies");
    }

    if config.templates.encouragement.is_empty() {
        warnings.push("templates.encouragement is empty; the generic support message will be used");
    }

    if config.keywords.relevant.is_empty() && config.keywords.general.is_empty() {
        warnings.push("No relevant or general keywords; most messages will be treated as off-topic");
    }

    if config.gateway.host == "0.0.0.0" && !config.gateway.allow_public_bind {
        warnings.push("Gateway bound to 0.0.0.0 without allow_public_bind = true");
    }

    warnings
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".bravomind"));
    }

    #[test]
    fn default_config_warns_only_about_missing_key() {
        let warnings = soft_warnings(&AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("API key"));
    }

    #[test]
    fn public_bind_without_opt_in_warns() {
        let mut config = AppConfig::default();
        config.api_key = Some("k".into());
        config.gateway.host = "0.0.0.0".into();
        assert!(soft_warnings(&config).iter().any(|w| w.contains("allow_public_bind")));
    }
}
