use crate::agent::protocol::ToolRequest;
use crate::traits::{Tool, ToolResult, ToolSpec};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(Arc::from(tool));
    }

    pub fn get_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Looks up the tool a request names, provided every required
    /// parameter is present with the type its schema declares.
    pub fn resolve(&self, request: &ToolRequest) -> Option<Arc<dyn Tool>> {
        let Some(tool) = self.get(&request.name) else {
            debug!(tool = %request.name, "request names an unknown tool");
            return None;
        };

        let spec = tool.spec();
        if let Some(missing) = spec
            .required_params()
            .into_iter()
            .find(|p| !request.has_arg(p, spec.param_type(p)))
        {
            debug!(tool = %request.name, param = missing, "request has no usable value for a required argument");
            return None;
        }

        Some(tool)
    }

    pub async fn execute(&self, name: &str, args: serde_json::Value) -> ToolResult {
        match self.get(name) {
            Some(tool) => match tool.execute(args).await {
                Ok(result) => result,
                Err(e) => ToolResult::error(format!("Execution failed: {}", e)),
            },
            None => ToolResult::error(format!("Tool '{}' not found", name)),
        }
    }
}
