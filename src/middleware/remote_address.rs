use crate::dispatcher::HandlerRequest;

/// Client address chain of a request
///
/// `X-Forwarded-For` entries in header order, then the socket peer when it is
/// not already listed. Empty entries are dropped.
#[must_use]
pub fn client_ips(req: &HandlerRequest) -> Vec<String> {
    let mut ips: Vec<String> = req
        .header_line("x-forwarded-for")
        .split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(peer) = req.remote_addr {
        let peer = peer.to_string();
        if !ips.contains(&peer) {
            ips.push(peer);
        }
    }
    ips
}
