use gatekeeper_contract::{DiscoverResponse, ToolDescriptor};
use gatekeeper_core::config::ToolServerEndpoint;
use tracing::{info, warn};

/// Polls every configured Tool Server's `/tools/discover` once at startup
/// and flattens the results into the registered tool set (spec §3
/// "ToolDescriptor... Registered at Gateway startup"). A Tool Server that
/// doesn't answer is skipped with a warning rather than failing the whole
/// Gateway boot — matching the reference workspace's tolerance for a
/// single unavailable subsystem at startup.
pub async fn discover_all(
    http: &reqwest::Client,
    endpoints: &[ToolServerEndpoint],
) -> Vec<ToolDescriptor> {
    let mut all = Vec::new();

    for endpoint in endpoints {
        let url = format!("{}/tools/discover", endpoint.base_url);
        match http.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<DiscoverResponse>().await {
                Ok(discovered) => {
                    info!(
                        server = %endpoint.name,
                        count = discovered.tools.len(),
                        "discovered tools"
                    );
                    all.extend(discovered.tools);
                }
                Err(e) => warn!(server = %endpoint.name, error = %e, "malformed discover response"),
            },
            Ok(resp) => warn!(server = %endpoint.name, status = %resp.status(), "discover call failed"),
            Err(e) => warn!(server = %endpoint.name, error = %e, "could not reach tool server at startup"),
        }
    }

    all
}
