use kiosk_core::config::{AppConfig, LogFormat};

pub fn run() -> String {
    let config = match AppConfig::load(None) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let oracle_api_key = if config.oracle.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let admin_id = config.chat.admin_id.as_deref().unwrap_or("<unset>");
    let log_format = match config.logging.format {
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        render_line("database.url", &config.database.url, Some("KIOSK_DATABASE_URL")),
        render_line("database.max_connections", &config.database.max_connections.to_string(), None),
        render_line(
            "database.acquire_timeout_secs",
            &config.database.acquire_timeout_secs.to_string(),
            None,
        ),
        render_line("oracle.api_key", oracle_api_key, Some("KIOSK_ORACLE_API_KEY")),
        render_line("oracle.base_url", &config.oracle.base_url, Some("KIOSK_ORACLE_BASE_URL")),
        render_line("oracle.model", &config.oracle.model, Some("KIOSK_ORACLE_MODEL")),
        render_line("oracle.timeout_secs", &config.oracle.timeout_secs.to_string(), None),
        render_line("chat.admin_id", admin_id, Some("KIOSK_ADMIN_ID")),
        render_line("chat.command_prefix", &config.chat.command_prefix, None),
        render_line(
            "chat.negotiation_timeout_secs",
            &config.chat.negotiation_timeout_secs.to_string(),
            None,
        ),
        render_line("chat.sweep_interval_secs", &config.chat.sweep_interval_secs.to_string(), None),
        render_line("chat.catalog_limit", &config.chat.catalog_limit.to_string(), None),
        render_line("business.name", &config.business.name, None),
        render_line("business.currency_symbol", &config.business.currency_symbol, None),
        render_line(
            "business.free_delivery_minimum",
            &config.business.free_delivery_minimum.to_string(),
            None,
        ),
        render_line("server.host", &config.server.host, None),
        render_line("server.port", &config.server.port.to_string(), None),
        render_line("logging.filter", &config.logging.filter, Some("KIOSK_LOG_FILTER")),
        render_line("logging.format", log_format, None),
    ];

    lines.join("\n")
}

fn render_line(key: &str, value: &str, env_var: Option<&str>) -> String {
    match env_var {
        Some(env_var) => format!("  {key} = {value} (env: {env_var})"),
        None => format!("  {key} = {value}"),
    }
}
