use crate::utils::error::{NodeError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const UNKNOWN_ISP: &str = "Unknown";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeMeta {
    country: Option<String>,
    as_organization: Option<String>,
}

/// `{country}-{asOrganization}` as reported by the edge, with spaces
/// replaced so the label survives in a URI fragment.
pub async fn lookup_isp(client: &Client, meta_url: &str, timeout: Duration) -> String {
    tracing::info!("正在獲取ISP信息...");
    match fetch_isp(client, meta_url, timeout).await {
        Ok(isp) => {
            tracing::info!("✓ 獲取ISP成功: {}", isp);
            isp
        }
        Err(e) => {
            tracing::warn!("❌ 獲取ISP失敗: {}", e);
            UNKNOWN_ISP.to_string()
        }
    }
}

async fn fetch_isp(client: &Client, meta_url: &str, timeout: Duration) -> Result<String> {
    let meta: EdgeMeta = client
        .get(meta_url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    match (meta.country, meta.as_organization) {
        (Some(country), Some(org)) => Ok(format!("{}-{}", country, org).replace(' ', "_")),
        _ => Err(NodeError::ResponseError {
            message: "edge meta response lacks country or asOrganization".to_string(),
        }),
    }
}
