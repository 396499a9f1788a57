//! URI-addressed resources and their registry.
//!
//! Static resources are looked up by exact URI; templated resources by URI
//! prefix. New resources are added by registering a handler.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::{ContextError, Result};
use crate::project::ProjectContext;
use crate::types::ResourceDescriptor;

pub const OVERVIEW_URI: &str = "context://project/overview";
pub const STRUCTURE_URI: &str = "context://project/structure";
pub const DEPENDENCIES_URI: &str = "context://project/dependencies";
pub const FILE_URI_PREFIX: &str = "context://file/";
pub const FILE_URI_TEMPLATE: &str = "context://file/{path}";

const JSON_MIME: &str = "application/json";

/// One entry of a `resources/read` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

pub trait ResourceHandler: Send + Sync {
    fn descriptor(&self) -> ResourceDescriptor;

    fn read(&self, project: &ProjectContext, uri: &str) -> Result<ResourceContents>;
}

fn json_contents<T: Serialize>(uri: &str, value: &T) -> Result<ResourceContents> {
    Ok(ResourceContents {
        uri: uri.to_string(),
        mime_type: JSON_MIME.to_string(),
        text: serde_json::to_string_pretty(value)?,
    })
}

pub struct OverviewResource;

impl ResourceHandler for OverviewResource {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: OVERVIEW_URI.to_string(),
            name: "Project Overview".to_string(),
            description: "Name, version, detected language, framework, package manager, file statistics, and Git state of the project".to_string(),
            mime_type: JSON_MIME.to_string(),
            schema: Some(json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "version": {"type": "string"},
                    "description": {"type": "string"},
                    "rootPath": {"type": "string"},
                    "language": {"type": "string"},
                    "framework": {"type": "string"},
                    "packageManager": {"type": "string"},
                    "lastModified": {"type": "string", "format": "date-time"},
                    "fileCount": {"type": "integer"},
                    "sizeInBytes": {"type": "integer"},
                    "git": {"type": "object"}
                },
                "required": ["name", "version", "rootPath", "language", "fileCount", "sizeInBytes"]
            })),
        }
    }

    fn read(&self, project: &ProjectContext, uri: &str) -> Result<ResourceContents> {
        json_contents(uri, &project.overview()?)
    }
}

pub struct StructureResource;

impl ResourceHandler for StructureResource {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: STRUCTURE_URI.to_string(),
            name: "Project Structure".to_string(),
            description: "Directory tree of the project, directories before files, with build and dependency directories left out".to_string(),
            mime_type: JSON_MIME.to_string(),
            schema: None,
        }
    }

    fn read(&self, project: &ProjectContext, uri: &str) -> Result<ResourceContents> {
        json_contents(uri, &project.structure())
    }
}

pub struct DependenciesResource;

impl ResourceHandler for DependenciesResource {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: DEPENDENCIES_URI.to_string(),
            name: "Project Dependencies".to_string(),
            description: "Declared dependencies grouped by type, with package manager and lock file presence".to_string(),
            mime_type: JSON_MIME.to_string(),
            schema: None,
        }
    }

    fn read(&self, project: &ProjectContext, uri: &str) -> Result<ResourceContents> {
        json_contents(uri, &project.dependencies())
    }
}

pub struct FileResource;

impl ResourceHandler for FileResource {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: FILE_URI_TEMPLATE.to_string(),
            name: "Project File".to_string(),
            description: "Raw text of a file, addressed by its path relative to the project root (files over the size limit are refused)".to_string(),
            mime_type: "text/plain".to_string(),
            schema: None,
        }
    }

    fn read(&self, project: &ProjectContext, uri: &str) -> Result<ResourceContents> {
        let rel = uri.strip_prefix(FILE_URI_PREFIX).unwrap_or_default();
        if rel.is_empty() {
            return Err(ContextError::validation("file URI is missing a path"));
        }
        let file = project.read_file(rel)?;
        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: file.mime_type,
            text: file.text,
        })
    }
}

/// Resource handlers keyed by exact URI, plus prefix-matched templates.
#[derive(Default)]
pub struct ResourceRegistry {
    handlers: Vec<Box<dyn ResourceHandler>>,
    by_uri: HashMap<String, usize>,
    templates: Vec<(String, Box<dyn ResourceHandler>)>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The overview, structure, and dependencies snapshots plus file access.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(OverviewResource));
        registry.register(Box::new(StructureResource));
        registry.register(Box::new(DependenciesResource));
        registry.register_template(FILE_URI_PREFIX, Box::new(FileResource));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ResourceHandler>) {
        let uri = handler.descriptor().uri;
        self.by_uri.insert(uri, self.handlers.len());
        self.handlers.push(handler);
    }

    pub fn register_template(&mut self, prefix: &str, handler: Box<dyn ResourceHandler>) {
        self.templates.push((prefix.to_string(), handler));
    }

    /// Static resources in registration order, followed by templates.
    pub fn list(&self) -> Vec<ResourceDescriptor> {
        self.handlers
            .iter()
            .map(|h| h.descriptor())
            .chain(self.templates())
            .collect()
    }

    pub fn templates(&self) -> Vec<ResourceDescriptor> {
        self.templates.iter().map(|(_, h)| h.descriptor()).collect()
    }

    /// Reads a resource, returning the `{contents: [...]}` response body.
    pub fn read(&self, project: &ProjectContext, uri: &str) -> Result<Value> {
        let handler = match self.by_uri.get(uri) {
            Some(&idx) => &self.handlers[idx],
            None => self
                .templates
                .iter()
                .find(|(prefix, _)| uri.starts_with(prefix.as_str()))
                .map(|(_, h)| h)
                .ok_or_else(|| ContextError::not_found(format!("unknown resource URI: {}", uri)))?,
        };
        let contents = handler.read(project, uri)?;
        Ok(json!({ "contents": [contents] }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let uris: Vec<String> = ResourceRegistry::with_defaults()
            .list()
            .into_iter()
            .map(|d| d.uri)
            .collect();
        assert_eq!(
            uris,
            vec![OVERVIEW_URI, STRUCTURE_URI, DEPENDENCIES_URI, FILE_URI_TEMPLATE]
        );
    }

    #[test]
    fn test_descriptors_serialize_camel_case() {
        let json = serde_json::to_value(OverviewResource.descriptor()).unwrap();
        assert_eq!(json["mimeType"], "application/json");
        assert!(json["schema"].is_object());
        let json = serde_json::to_value(StructureResource.descriptor()).unwrap();
        assert!(json.get("schema").is_none());
    }

    #[test]
    fn test_templates_listed_separately() {
        let templates = ResourceRegistry::with_defaults().templates();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].uri, FILE_URI_TEMPLATE);
    }
}
