use anyhow::{Context, Result, bail};

/// `proxy_server <control_port>`
pub fn parse_invocation(args: &[String]) -> Result<u16> {
    let port_arg = args.first().context("usage: proxy_server <control_port>")?;
    let port: u16 = port_arg
        .parse()
        .with_context(|| format!("invalid control port {:?}", port_arg))?;
    if port == 0 {
        bail!("control port must be non-zero");
    }
    Ok(port)
}
