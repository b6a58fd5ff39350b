use super::attribute::{author_attributes, import_attribute};
use super::prim::{IDENTITY_PARAMS, PrimNode, author_prim, import_identity};
use crate::error::Result;
use crate::model::node::Node;
use crate::model::parameter::Parameter;
use crate::registry::{ApplyContext, NodeBehavior};
use crate::stage::{PrimSpec, ScenePath, Specifier, Stage};

/// Material or shader prim. Its attributes live on the node itself as ports
/// so other shading nodes can connect to them.
pub struct ShadingNode {
    prim: PrimNode,
}

impl ShadingNode {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            prim: PrimNode::new(Specifier::Def, type_name),
        }
    }
}

impl NodeBehavior for ShadingNode {
    fn parameters(&self) -> Vec<Parameter> {
        self.prim.parameters()
    }

    fn import_prim(&self, node: &mut Node, prim: &PrimSpec) {
        import_identity(node, prim);
        for (name, attribute) in &prim.attributes {
            import_attribute(node, name, attribute);
        }
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        let prim_path = author_prim(ctx, stage, path, Specifier::Def)?;
        let ports = ctx
            .node
            .scene_params()
            .filter(|p| !IDENTITY_PARAMS.contains(&p.name()));
        author_attributes(ctx, stage, &prim_path, ports)?;
        Ok(prim_path)
    }
}
