//! Deployment context
//!
//! Everything the deployment tool knows about the deploy that just finished,
//! passed explicitly to each pipeline stage.

use crate::resource::template::CompiledTemplate;

#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub stack_name: String,
    pub region: String,
    pub stage: String,
    pub template: CompiledTemplate,
}

impl DeploymentContext {
    pub fn new(stack_name: &str, region: &str, stage: &str) -> Self {
        Self {
            stack_name: stack_name.to_string(),
            region: region.to_string(),
            stage: stage.to_string(),
            template: CompiledTemplate::default(),
        }
    }

    pub fn with_template(mut self, template: CompiledTemplate) -> Self {
        self.template = template;
        self
    }
}
