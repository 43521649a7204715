use crate::domain::model::NodeIdentity;
use urlencoding::encode;

/// Port clients dial on the CDN edge.
pub const EDGE_TLS_PORT: u16 = 443;

/// Percent-encodes each segment and keeps the `/` separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Client link for the node as seen through the CDN: TLS on the edge,
/// WebSocket to the origin.
pub fn vless_share_link(identity: &NodeIdentity, domain: &str, display_name: &str) -> String {
    format!(
        "vless://{uuid}@{domain}:{port}?encryption=none&security=tls&type=ws&host={host}&path={path}&sni={sni}#{name}",
        uuid = identity.uuid,
        domain = domain,
        port = EDGE_TLS_PORT,
        host = encode_path(domain),
        path = encode_path(&identity.ws_path),
        sni = encode_path(domain),
        name = encode_path(display_name),
    )
}

pub fn display_name(node_name: &str, isp: &str) -> String {
    format!("{}-{}", node_name, isp)
}

pub fn links_file_content(link: &str) -> String {
    format!("CDN 節點：\n{}\n", link)
}

/// Operator checklist printed next to the link. The launcher cannot verify
/// any of it from inside the container.
pub fn operator_hints(domain: &str, port: u16, origin_ip: &str) -> Vec<String> {
    vec![
        format!(
            "節點只支持 CDN 模式，請確保域名({}) 已在 Cloudflare 解析並開啟代理。",
            domain
        ),
        format!(
            "你需要通過 Cloudflare 的 Origin Rules 將流量路由到代理監聽端口: {} (源站 {})",
            port, origin_ip
        ),
        "Cloudflare 的 SSL/TLS 加密模式必須為 靈活 (Flexible)。".to_string(),
    ]
}
