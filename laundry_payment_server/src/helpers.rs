use std::{
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use actix_web::HttpRequest;
use regex::Regex;

/// Best-effort client address, for the gateway IP whitelist and log lines. Proxy headers are only
/// honored when the deployment has explicitly opted in to them, since anyone can forge them when
/// the server is directly exposed.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut ip = None;
    if use_x_forwarded_for {
        ip = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            // The first entry is the originating client; later entries are intermediate proxies.
            .and_then(|s| s.split(',').next())
            .and_then(|s| parse_ip(s.trim()));
    }
    if ip.is_none() && use_forwarded {
        ip = req.headers().get("Forwarded").and_then(|v| v.to_str().ok()).and_then(extract_forwarded_ip);
    }
    if ip.is_none() {
        ip = req.peer_addr().map(|a| a.ip());
    }
    ip
}

fn extract_forwarded_ip(header: &str) -> Option<IpAddr> {
    let re = Regex::new(r"for=(?P<ip>[^;,\s]+)").ok()?;
    let captures = re.captures(header)?;
    let raw = captures.name("ip")?.as_str().trim_matches('"');
    parse_ip(raw)
}

/// Proxies report either a bare address or an address:port pair.
fn parse_ip(s: &str) -> Option<IpAddr> {
    IpAddr::from_str(s).ok().or_else(|| SocketAddr::from_str(s).ok().map(|a| a.ip()))
}
