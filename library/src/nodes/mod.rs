//! Built-in node types.

pub mod arc;
pub mod attribute;
pub mod prim;
pub mod root;
pub mod shading;
pub mod variant;

use crate::error::{LibraryError, Result};
use crate::registry::{Capability, NodeCategory, NodeRegistry, NodeTypeDefinition};
use crate::stage::{ScenePath, Specifier};

pub const ROOT: &str = "Root";
pub const LAYER: &str = "Layer";
pub const PRIM: &str = "Prim";
pub const PRIM_DEFINE: &str = "PrimDefine";
pub const PRIM_OVERRIDE: &str = "PrimOverride";
pub const MATERIAL: &str = "Material";
pub const SHADER: &str = "Shader";
pub const ATTRIBUTE_SET: &str = "AttributeSet";
pub const TRANSFORM: &str = "Transform";
pub const RELATIONSHIP_SET: &str = "RelationshipSet";
pub const MATERIAL_ASSIGN: &str = "MaterialAssign";
pub const REFERENCE: &str = "Reference";
pub const PAYLOAD: &str = "Payload";
pub const VARIANT_SET: &str = "VariantSet";
pub const VARIANT_SELECT: &str = "VariantSelect";
pub const VARIANT_SWITCH: &str = "VariantSwitch";

/// Prim types that get their own definer node.
pub const TYPED_DEFINERS: &[&str] = &["Xform", "Scope", "Mesh", "Sphere", "Cube", "Camera"];

/// Attribute name prefix routed to `Transform` nodes.
pub const TRANSFORM_PREFIX: &str = "xformOp";
/// Relationship name prefix routed to `MaterialAssign` nodes.
pub const MATERIAL_BINDING_PREFIX: &str = "material:binding";

pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    use Capability::*;

    registry.register(
        NodeTypeDefinition::new(ROOT, NodeCategory::Layer)
            .with_description("Layer-wide metadata; the graph starts here")
            .with_label("Root")
            .with_behavior(root::RootNode),
    );
    registry.register(
        NodeTypeDefinition::new(LAYER, NodeCategory::Layer)
            .with_description("Adds a sublayer before anything else composes")
            .with_label("[basename(layerPath)]")
            .with_behavior(root::LayerNode),
    );

    registry.register(
        NodeTypeDefinition::new(PRIM, NodeCategory::Prim)
            .with_label("{primName}")
            .with_capabilities(&[PrimIdentity])
            .with_behavior(prim::PrimNode::new(Specifier::Over, "")),
    );
    registry.register(
        NodeTypeDefinition::new(PRIM_DEFINE, NodeCategory::Prim)
            .with_parent(PRIM)
            .with_description("Defines a prim")
            .with_label("{primName}")
            .with_capabilities(&[PrimIdentity])
            .with_behavior(prim::PrimNode::new(Specifier::Def, "")),
    );
    registry.register(
        NodeTypeDefinition::new(PRIM_OVERRIDE, NodeCategory::Prim)
            .with_parent(PRIM)
            .with_description("Overrides a prim defined elsewhere")
            .with_label("{primName}")
            .with_capabilities(&[PrimIdentity])
            .with_behavior(prim::PrimNode::new(Specifier::Over, "")),
    );
    for &type_name in TYPED_DEFINERS {
        registry.register(
            NodeTypeDefinition::new(type_name, NodeCategory::Prim)
                .with_parent(PRIM_DEFINE)
                .with_label("{primName}")
                .with_capabilities(&[PrimIdentity])
                .with_behavior(prim::PrimNode::new(Specifier::Def, type_name)),
        );
    }

    for type_name in [MATERIAL, SHADER] {
        registry.register(
            NodeTypeDefinition::new(type_name, NodeCategory::Shading)
                .with_parent(PRIM_DEFINE)
                .with_description("Defines a prim whose attributes are ports")
                .with_label("{primName}")
                .with_capabilities(&[PrimIdentity, Attributes])
                .with_behavior(shading::ShadingNode::new(type_name)),
        );
    }

    registry.register(
        NodeTypeDefinition::new(ATTRIBUTE_SET, NodeCategory::Property)
            .with_description("Authors attributes on the current prim")
            .with_capabilities(&[Attributes])
            .with_behavior(attribute::AttributeSetNode::generic()),
    );
    registry.register(
        NodeTypeDefinition::new(TRANSFORM, NodeCategory::Property)
            .with_parent(ATTRIBUTE_SET)
            .with_description("Authors transform ops on the current prim")
            .with_capabilities(&[Attributes])
            .with_behavior(attribute::AttributeSetNode::transform()),
    );
    registry.register(
        NodeTypeDefinition::new(RELATIONSHIP_SET, NodeCategory::Property)
            .with_description("Authors relationships on the current prim")
            .with_capabilities(&[Relationships])
            .with_behavior(attribute::RelationshipSetNode::generic()),
    );
    registry.register(
        NodeTypeDefinition::new(MATERIAL_ASSIGN, NodeCategory::Property)
            .with_parent(RELATIONSHIP_SET)
            .with_description("Binds materials to the current prim")
            .with_capabilities(&[Relationships])
            .with_behavior(attribute::RelationshipSetNode::material_binding()),
    );

    registry.register(
        NodeTypeDefinition::new(REFERENCE, NodeCategory::Composition)
            .with_label("[basename(assetPath)]")
            .with_behavior(arc::ArcNode::new(arc::ArcKind::Reference)),
    );
    registry.register(
        NodeTypeDefinition::new(PAYLOAD, NodeCategory::Composition)
            .with_label("[basename(assetPath)]")
            .with_behavior(arc::ArcNode::new(arc::ArcKind::Payload)),
    );

    registry.register(
        NodeTypeDefinition::new(VARIANT_SET, NodeCategory::Variant)
            .with_label("{variantSetName}")
            .with_capabilities(&[VariantAware])
            .with_behavior(variant::VariantSetNode),
    );
    registry.register(
        NodeTypeDefinition::new(VARIANT_SELECT, NodeCategory::Variant)
            .with_label("{variantSetName}: {variantSelection}")
            .with_capabilities(&[VariantAware])
            .with_behavior(variant::VariantSelectNode),
    );
    registry.register(
        NodeTypeDefinition::new(VARIANT_SWITCH, NodeCategory::Variant)
            .with_description("Children compose inside the selected variant")
            .with_label("{variantSet}: {variant}")
            .with_capabilities(&[VariantAware])
            .with_behavior(variant::VariantSwitchNode),
    );
}

/// Node type that defines a prim of `type_name` when it is imported.
pub fn definer_for(registry: &NodeRegistry, type_name: Option<&str>) -> &'static str {
    let candidates = TYPED_DEFINERS.iter().copied().chain([MATERIAL, SHADER]);
    for candidate in candidates {
        if type_name == Some(candidate) && registry.is_registered(candidate) {
            return candidate;
        }
    }
    PRIM_DEFINE
}

fn require_prim(path: &ScenePath, what: &str) -> Result<()> {
    if path.is_root() {
        return Err(LibraryError::graph(format!("{} needs a prim, got '/'", what)));
    }
    Ok(())
}
