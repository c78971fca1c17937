use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;

use crate::authz::{Decision, DecisionReason, ResourceContext};
use crate::models;
use crate::routes::{authz, groups, health, scopes, users};

#[derive(OpenApi)]
#[openapi(
	paths(
		health::health,
		users::create_user,
		users::get_user,
		users::update_user_flags,
		users::grant_user_permission,
		users::revoke_user_permission,
		groups::list_groups,
		groups::create_group,
		groups::get_group,
		groups::delete_group,
		groups::add_member,
		groups::remove_member,
		groups::grant_group_permission,
		groups::revoke_group_permission,
		groups::list_permissions,
		groups::create_permission,
		scopes::list_locale_scopes,
		scopes::create_locale_scope,
		scopes::delete_locale_scope,
		scopes::list_section_scopes,
		scopes::create_section_scope,
		scopes::delete_section_scope,
		authz::check,
		authz::match_path
	),
	components(
		schemas(
			health::HealthResponse,
			models::user::User,
			models::user::UserCreateRequest,
			models::user::UserFlagsRequest,
			models::rbac::Group,
			models::rbac::GroupCreateRequest,
			models::rbac::GroupDetail,
			models::rbac::Membership,
			models::rbac::AddMemberRequest,
			models::rbac::Permission,
			models::rbac::PermissionCreateRequest,
			models::rbac::GrantPermissionRequest,
			models::rbac::PermissionGrant,
			models::scope::LocaleScope,
			models::scope::LocaleScopeCreateRequest,
			models::scope::SectionScope,
			models::scope::SectionScopeCreateRequest,
			authz::CheckRequest,
			authz::MatchPathRequest,
			authz::MatchPathResponse,
			Decision,
			DecisionReason,
			ResourceContext
		)
	),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Users", description = "User accounts and direct grants"),
		(name = "Groups", description = "Groups, members and group grants"),
		(name = "Permissions", description = "Permission catalogue"),
		(name = "Scopes", description = "Locale and section scopes of a group"),
		(name = "Authorization", description = "Policy decisions")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	ensure_openapi_version(&mut doc);
	add_parameter_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

/// Serves the document at `/api-docs/openapi.json`.
pub fn docs_routes(doc: &utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let doc_json = Arc::new(serde_json::to_value(doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new().route("/api-docs/openapi.json", json_route))
}

fn ensure_security_components(doc: &mut Value) {
	let Some(root) = doc.as_object_mut() else { return; };
	let Some(components) = root
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
	else {
		return;
	};

	if let Some(schemes) = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
	{
		schemes.insert(
			"bearerAuth".to_string(),
			json!({
				"type": "http",
				"scheme": "bearer",
				"bearerFormat": "JWT"
			}),
		);
	}
}

fn ensure_openapi_version(doc: &mut Value) {
	if let Some(root) = doc.as_object_mut() {
		root.entry("openapi").or_insert_with(|| Value::String("3.1.0".to_string()));
	}
}

fn add_parameter_examples(doc: &mut Value) {
	let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else { return; };

	for operation in paths.values_mut().filter_map(Value::as_object_mut).flat_map(|ops| ops.values_mut()) {
		let Some(parameters) = operation.get_mut("parameters").and_then(Value::as_array_mut) else { continue; };
		for parameter in parameters.iter_mut() {
			let example = match parameter.get("name").and_then(Value::as_str) {
				Some("id" | "user_id" | "scope_id") => json!("00000000-0000-0000-0000-000000000000"),
				Some("code") => json!("cms.change_page"),
				_ => continue,
			};
			if let Some(obj) = parameter.as_object_mut() {
				obj.entry("example").or_insert(example);
			}
		}
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}
