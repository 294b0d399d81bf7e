use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub planning_config: Option<serde_json::Value>,
}
