use gatekeeper_contract::{DiscoverResponse, ToolDescriptor};

/// Builds the `/tools/discover` response from the Tool Server's static
/// descriptor list. Tool Servers are stateless (spec §4.4); this is a
/// plain projection, never a database read.
pub fn discover_response(descriptors: Vec<ToolDescriptor>) -> DiscoverResponse {
    DiscoverResponse { tools: descriptors }
}
