use anyhow::{Context, Result, bail};

/// `expose <proxy_port>[:<target_host>]:<target_port>`, plus `PROXY_HOST` env.
#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    pub proxy_port: u16,
    pub target_host: String,
    pub target_port: u16,
    /// `<server_ip>:<control_port>` from `PROXY_HOST`.
    pub proxy_host: String,
}

const USAGE: &str = "usage: expose <proxy_port>[:<target_host>]:<target_port> (PROXY_HOST=<server_ip>:<control_port> must be set)";

pub fn parse_invocation(args: &[String], proxy_host_env: Option<String>) -> Result<Invocation> {
    let spec = args.first().context(USAGE)?;
    let (proxy_port, target_host, target_port) = parse_spec(spec)?;

    let proxy_host = proxy_host_env.context("PROXY_HOST environment variable must be set")?;
    validate_proxy_host(&proxy_host)?;

    Ok(Invocation {
        proxy_port,
        target_host,
        target_port,
        proxy_host,
    })
}

fn parse_spec(spec: &str) -> Result<(u16, String, u16)> {
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [proxy_port, target_port] => Ok((
            proxy_port
                .parse()
                .with_context(|| format!("invalid proxy port in {:?}", spec))?,
            "127.0.0.1".to_string(),
            target_port
                .parse()
                .with_context(|| format!("invalid target port in {:?}", spec))?,
        )),
        [proxy_port, target_host, target_port] => Ok((
            proxy_port
                .parse()
                .with_context(|| format!("invalid proxy port in {:?}", spec))?,
            target_host.to_string(),
            target_port
                .parse()
                .with_context(|| format!("invalid target port in {:?}", spec))?,
        )),
        _ => bail!("malformed invocation {:?}: {}", spec, USAGE),
    }
}

fn validate_proxy_host(proxy_host: &str) -> Result<()> {
    let (_host, port) = proxy_host
        .rsplit_once(':')
        .with_context(|| format!("PROXY_HOST {:?} must be <server_ip>:<control_port>", proxy_host))?;
    port.parse::<u16>()
        .with_context(|| format!("PROXY_HOST {:?} has an invalid control port", proxy_host))?;
    Ok(())
}

/// Extracts the bare host from a `PROXY_HOST`-shaped `host:port` string, for
/// dialing a bridge port on the same host (SPEC_FULL.md §4.5).
pub fn server_host(proxy_host: &str) -> Result<&str> {
    proxy_host
        .rsplit_once(':')
        .map(|(host, _)| host)
        .with_context(|| format!("PROXY_HOST {:?} must be <server_ip>:<control_port>", proxy_host))
}
