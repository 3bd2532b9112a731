//! The static tool table.
//!
//! Every operation the bridge exposes is declared here once: tool name,
//! description, input schema and the handler route it maps onto. Both the
//! MCP `tools/list` response and the `/api` documentation object are derived
//! from this table, so the three surfaces cannot drift apart.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use axum::http::Method;
use rmcp::model::{JsonObject, Tool};
use serde_json::{Map, Value, json};

use crate::api::{ApiRequest, Resource};

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub resource: Resource,
    pub method: Method,
    pub schema: Value,
}

static REGISTRY: LazyLock<Vec<ToolSpec>> = LazyLock::new(build_registry);

pub fn all() -> &'static [ToolSpec] {
    &REGISTRY
}

pub fn find(name: &str) -> Option<&'static ToolSpec> {
    REGISTRY.iter().find(|spec| spec.name == name)
}

static TOOLS: LazyLock<Vec<Tool>> = LazyLock::new(|| {
    REGISTRY
        .iter()
        .map(|spec| Tool::new(spec.name, spec.description, Arc::new(object(&spec.schema))))
        .collect()
});

/// The memoized `tools/list` payload.
pub fn tools() -> &'static [Tool] {
    &TOOLS
}

pub fn tool_names() -> Vec<String> {
    REGISTRY.iter().map(|spec| spec.name.to_string()).collect()
}

fn object(schema: &Value) -> JsonObject {
    schema.as_object().cloned().unwrap_or_default()
}

/// Translate a tool invocation into the canonical handler request.
///
/// GET tools flatten their arguments into query strings; POST tools pass the
/// argument object through as the JSON body.
pub fn request_for(spec: &ToolSpec, arguments: JsonObject) -> ApiRequest {
    if spec.method == Method::POST {
        return ApiRequest::post(Value::Object(arguments));
    }
    let mut query = BTreeMap::new();
    for (name, value) in arguments {
        let rendered = match value {
            Value::Null => continue,
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            Value::String(text) => text,
            other => other.to_string(),
        };
        query.insert(name, rendered);
    }
    ApiRequest::get(query)
}

static DOCS: LazyLock<Value> = LazyLock::new(build_docs);

/// The `/api` documentation object, derived from the registry.
pub fn docs() -> &'static Value {
    &DOCS
}

fn build_docs() -> Value {
    let mut endpoints = Map::new();
    for spec in REGISTRY.iter() {
        let mut params = Map::new();
        if let Some(properties) = spec.schema.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let description = property
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                params.insert(name.clone(), json!(description));
            }
        }
        let operations = endpoints
            .entry(spec.resource.path().to_string())
            .or_insert_with(|| json!([]));
        if let Some(list) = operations.as_array_mut() {
            list.push(json!({
                "method": spec.method.as_str(),
                "tool": spec.name,
                "description": spec.description,
                "params": params,
            }));
        }
    }
    json!({
        "name": "gitlab-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "REST bridge and MCP tool server for the GitLab API",
        "endpoints": endpoints,
        "authentication": {
            "type": "Bearer Token",
            "header": "Authorization: Bearer <token>",
            "note": "Configure accepted tokens via the API_BEARER_TOKENS environment variable; an empty list leaves the API open.",
        },
    })
}

fn project_id_property() -> Value {
    json!({
        "type": "string",
        "description": "The project identifier - a numeric ID (e.g. '123') or a path (e.g. 'group/project')",
    })
}

fn limit_property() -> Value {
    json!({
        "type": "integer",
        "description": "Maximum number of results",
        "default": 20,
    })
}

fn build_registry() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "get_user",
            description: "Get information about the currently authenticated GitLab user",
            resource: Resource::User,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {},
            }),
        },
        ToolSpec {
            name: "list_users",
            description: "List GitLab users",
            resource: Resource::Users,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "search": {
                        "type": "string",
                        "description": "Search users by name or email",
                    },
                    "username": {
                        "type": "string",
                        "description": "Filter by exact username",
                    },
                    "active": {
                        "type": "boolean",
                        "description": "Filter by active status",
                        "default": true,
                    },
                    "limit": limit_property(),
                },
            }),
        },
        ToolSpec {
            name: "list_projects",
            description: "List GitLab projects visible to the authenticated user",
            resource: Resource::Projects,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "owned": {
                        "type": "boolean",
                        "description": "Return only projects owned by the authenticated user",
                    },
                    "starred": {
                        "type": "boolean",
                        "description": "Return only starred projects",
                    },
                    "search": {
                        "type": "string",
                        "description": "Search projects by name",
                    },
                    "limit": limit_property(),
                },
            }),
        },
        ToolSpec {
            name: "get_project",
            description: "Get details of a specific GitLab project",
            resource: Resource::Projects,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "id": project_id_property(),
                },
                "required": ["id"],
            }),
        },
        ToolSpec {
            name: "create_project",
            description: "Create a new GitLab project",
            resource: Resource::Projects,
            method: Method::POST,
            schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Project name",
                    },
                    "path": {
                        "type": "string",
                        "description": "Repository path (defaults to a slug of the name)",
                    },
                    "namespace_id": {
                        "type": "integer",
                        "description": "Namespace ID to create the project under",
                    },
                    "description": {
                        "type": "string",
                        "description": "Project description",
                    },
                    "visibility": {
                        "type": "string",
                        "description": "Project visibility",
                        "enum": ["private", "internal", "public"],
                        "default": "private",
                    },
                    "initialize_with_readme": {
                        "type": "boolean",
                        "description": "Initialize the repository with a README",
                        "default": false,
                    },
                },
                "required": ["name"],
            }),
        },
        ToolSpec {
            name: "list_issues",
            description: "List issues in a GitLab project",
            resource: Resource::Issues,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "state": {
                        "type": "string",
                        "description": "Filter by state",
                        "enum": ["opened", "closed", "all"],
                        "default": "opened",
                    },
                    "labels": {
                        "type": "string",
                        "description": "Comma-separated list of label names",
                    },
                    "limit": limit_property(),
                },
                "required": ["project_id"],
            }),
        },
        ToolSpec {
            name: "get_issue",
            description: "Get details of a specific issue",
            resource: Resource::Issues,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "issue_iid": {
                        "type": "integer",
                        "description": "The internal ID of the issue",
                    },
                },
                "required": ["project_id", "issue_iid"],
            }),
        },
        ToolSpec {
            name: "create_issue",
            description: "Create a new issue in a GitLab project",
            resource: Resource::Issues,
            method: Method::POST,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "title": {
                        "type": "string",
                        "description": "The title of the issue",
                    },
                    "description": {
                        "type": "string",
                        "description": "The description of the issue",
                    },
                    "labels": {
                        "type": "string",
                        "description": "Comma-separated list of labels",
                    },
                },
                "required": ["project_id", "title"],
            }),
        },
        ToolSpec {
            name: "list_merge_requests",
            description: "List merge requests in a GitLab project",
            resource: Resource::MergeRequests,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "state": {
                        "type": "string",
                        "description": "Filter by state",
                        "enum": ["opened", "closed", "locked", "merged", "all"],
                        "default": "opened",
                    },
                    "limit": limit_property(),
                },
                "required": ["project_id"],
            }),
        },
        ToolSpec {
            name: "get_merge_request",
            description: "Get details of a specific merge request",
            resource: Resource::MergeRequests,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "mr_iid": {
                        "type": "integer",
                        "description": "The internal ID of the merge request",
                    },
                },
                "required": ["project_id", "mr_iid"],
            }),
        },
        ToolSpec {
            name: "create_merge_request",
            description: "Create a new merge request in a GitLab project",
            resource: Resource::MergeRequests,
            method: Method::POST,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "source_branch": {
                        "type": "string",
                        "description": "The name of the source branch",
                    },
                    "target_branch": {
                        "type": "string",
                        "description": "The name of the target branch",
                    },
                    "title": {
                        "type": "string",
                        "description": "Merge request title",
                    },
                    "description": {
                        "type": "string",
                        "description": "Merge request description",
                    },
                    "labels": {
                        "type": "string",
                        "description": "Comma-separated list of labels",
                    },
                    "remove_source_branch": {
                        "type": "boolean",
                        "description": "Remove the source branch when merged",
                        "default": false,
                    },
                },
                "required": ["project_id", "source_branch", "target_branch", "title"],
            }),
        },
        ToolSpec {
            name: "list_pipelines",
            description: "List CI/CD pipelines for a GitLab project",
            resource: Resource::Pipelines,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "status": {
                        "type": "string",
                        "description": "Filter by pipeline status",
                        "enum": [
                            "created", "waiting_for_resource", "preparing", "pending",
                            "running", "success", "failed", "canceled", "skipped",
                            "manual", "scheduled",
                        ],
                    },
                    "limit": limit_property(),
                },
                "required": ["project_id"],
            }),
        },
        ToolSpec {
            name: "get_pipeline",
            description: "Get details of a specific pipeline",
            resource: Resource::Pipelines,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "pipeline_id": {
                        "type": "integer",
                        "description": "The pipeline ID",
                    },
                },
                "required": ["project_id", "pipeline_id"],
            }),
        },
        ToolSpec {
            name: "cancel_pipeline",
            description: "Cancel a running pipeline",
            resource: Resource::Pipelines,
            method: Method::POST,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "pipeline_id": {
                        "type": "integer",
                        "description": "The pipeline ID",
                    },
                },
                "required": ["project_id", "pipeline_id"],
            }),
        },
        ToolSpec {
            name: "list_branches",
            description: "List branches in a GitLab project",
            resource: Resource::Branches,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "search": {
                        "type": "string",
                        "description": "Search branches by name",
                    },
                    "limit": limit_property(),
                },
                "required": ["project_id"],
            }),
        },
        ToolSpec {
            name: "get_branch",
            description: "Get details of a specific branch",
            resource: Resource::Branches,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "branch": {
                        "type": "string",
                        "description": "The branch name",
                    },
                },
                "required": ["project_id", "branch"],
            }),
        },
        ToolSpec {
            name: "list_groups",
            description: "List GitLab groups",
            resource: Resource::Groups,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "search": {
                        "type": "string",
                        "description": "Search groups by name",
                    },
                    "limit": limit_property(),
                },
            }),
        },
        ToolSpec {
            name: "get_group",
            description: "Get details of a specific group",
            resource: Resource::Groups,
            method: Method::GET,
            schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "The group identifier - a numeric ID or a full path",
                    },
                },
                "required": ["id"],
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_tool_names_are_unique() {
        let names: BTreeSet<&str> = all().iter().map(|spec| spec.name).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn test_every_schema_is_an_object_schema() {
        for spec in all() {
            assert_eq!(spec.schema["type"], "object", "tool {}", spec.name);
            assert!(
                spec.schema["properties"].is_object(),
                "tool {} has no properties map",
                spec.name
            );
            if let Some(required) = spec.schema.get("required") {
                let properties = spec.schema["properties"].as_object().unwrap();
                for name in required.as_array().unwrap() {
                    assert!(
                        properties.contains_key(name.as_str().unwrap()),
                        "tool {} requires unknown parameter {name}",
                        spec.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_create_tools_post_and_the_rest_get() {
        for spec in all() {
            let expects_post = spec.name.starts_with("create_") || spec.name.starts_with("cancel_");
            assert_eq!(spec.method == Method::POST, expects_post, "tool {}", spec.name);
        }
    }

    #[test]
    fn test_find_and_tool_list_agree() {
        assert_eq!(tools().len(), all().len());
        for tool in tools() {
            let spec = find(&tool.name).unwrap();
            assert_eq!(spec.name, tool.name.as_ref());
            assert!(tool.description.is_some());
        }
        assert!(find("delete_everything").is_none());
    }

    #[test]
    fn test_get_arguments_become_query_strings() {
        let spec = find("list_projects").unwrap();
        let mut arguments = JsonObject::new();
        arguments.insert("owned".to_string(), json!(true));
        arguments.insert("limit".to_string(), json!(5));
        arguments.insert("search".to_string(), json!("tooling"));
        arguments.insert("starred".to_string(), Value::Null);

        let request = request_for(spec, arguments);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.param("owned"), Some("true"));
        assert_eq!(request.param("limit"), Some("5"));
        assert_eq!(request.param("search"), Some("tooling"));
        assert!(request.param("starred").is_none());
    }

    #[test]
    fn test_post_arguments_become_the_body() {
        let spec = find("create_issue").unwrap();
        let mut arguments = JsonObject::new();
        arguments.insert("project_id".to_string(), json!("42"));
        arguments.insert("title".to_string(), json!("Fix bug"));

        let request = request_for(spec, arguments);
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body["project_id"], "42");
        assert_eq!(request.body["title"], "Fix bug");
        assert!(request.query.is_empty());
    }

    #[test]
    fn test_docs_cover_the_registry_exactly() {
        let endpoints = docs()["endpoints"].as_object().unwrap();

        // Every registry entry appears under its endpoint path.
        for spec in all() {
            let operations = endpoints[spec.resource.path()].as_array().unwrap();
            assert!(
                operations.iter().any(|op| op["tool"] == spec.name
                    && op["method"] == spec.method.as_str()),
                "docs are missing {}",
                spec.name
            );
        }

        // And nothing is documented that the registry does not route.
        let documented: usize = endpoints
            .values()
            .map(|ops| ops.as_array().map(Vec::len).unwrap_or(0))
            .sum();
        assert_eq!(documented, all().len());
    }
}
