use serde_json::Value;

#[test]
fn openapi_describes_scope_schemas() -> anyhow::Result<()> {
    // Build the OpenAPI document the same way the server does
    let doc = cms_scopes::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;

    let schemas = v
        .get("components")
        .and_then(Value::as_object)
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
        .expect("components.schemas must exist");

    let section = schemas
        .get("SectionScope")
        .and_then(|s| s.get("properties"))
        .and_then(Value::as_object)
        .expect("components.schemas.SectionScope.properties must exist");
    for k in ["id", "group_id", "path_prefix", "name", "created_at"] {
        assert!(section.contains_key(k), "OpenAPI SectionScope schema missing '{}'", k);
    }

    for name in ["LocaleScope", "Decision", "DecisionReason", "GroupDetail", "CheckRequest"] {
        assert!(schemas.contains_key(name), "OpenAPI schema missing '{}'", name);
    }

    let paths = v.get("paths").and_then(Value::as_object).expect("paths must exist");
    for p in ["/groups/{id}/locale-scopes", "/groups/{id}/section-scopes/{scope_id}", "/authz/match-path"] {
        assert!(paths.contains_key(p), "OpenAPI missing path '{}'", p);
    }

    Ok(())
}
