//! Web server command.

use console::style;

use crate::config::Settings;
use crate::server::AppState;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Start the background poller (unless disabled) and the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str, background: bool) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;
    let scheduler = super::build_scheduler(settings)?;
    let config = scheduler.refresher().runtime().snapshot();

    println!(
        "{} Watching {} models (every {}s, batch size {}, request delay {}s)",
        style("→").cyan(),
        scheduler.catalog().len(),
        config.refresh_interval,
        config.batch_size,
        config.request_delay,
    );
    if config.proxy_enabled {
        println!(
            "  {} Proxy rotation on ({} proxies)",
            style("✓").green(),
            config.proxies.len()
        );
    }

    if background {
        scheduler.spawn_background();
    } else {
        println!(
            "  {} Background refresh disabled; use POST /api/refresh",
            style("!").yellow()
        );
    }

    println!(
        "{} Starting stockwatch server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(AppState::new(scheduler), &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "8080" -> 0.0.0.0:8080
/// - Just a host: "127.0.0.1" -> 127.0.0.1:5000
/// - Host and port: "127.0.0.1:8080" -> 127.0.0.1:8080
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("empty bind address");
    }

    if let Ok(port) = bind.parse::<u16>() {
        return Ok((DEFAULT_HOST.to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
        anyhow::bail!("invalid port in bind address: {}", bind);
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(
            parse_bind_address("8080").unwrap(),
            ("0.0.0.0".to_string(), 8080)
        );
        assert_eq!(
            parse_bind_address("127.0.0.1").unwrap(),
            ("127.0.0.1".to_string(), 5000)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0:5000").unwrap(),
            ("0.0.0.0".to_string(), 5000)
        );
        assert_eq!(
            parse_bind_address("localhost").unwrap(),
            ("localhost".to_string(), 5000)
        );
        assert!(parse_bind_address("localhost:http").is_err());
        assert!(parse_bind_address("").is_err());
    }
}
