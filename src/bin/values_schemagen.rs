use multicluster_observability_addon::addon::agent::AddonValues;

fn main() {
    let gen = schemars::gen::SchemaSettings::openapi3()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .with_visitor(kube::core::schema::StructuralSchemaRewriter)
        .into_generator();
    print!(
        "{}",
        serde_json::to_string_pretty(&gen.into_root_schema_for::<AddonValues>()).unwrap()
    )
}
