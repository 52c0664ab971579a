use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier as returned by Azure DevOps. Most ids are integers, project ids
/// are GUID strings; both render to the same string form Port expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Number(n) => write!(f, "{}", n),
            SourceId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for SourceId {
    fn from(value: i64) -> Self {
        SourceId::Number(value)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        SourceId::Text(value.to_string())
    }
}

/// Envelope used by every Azure DevOps list endpoint. A missing or `null`
/// `value` reads as an empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub value: Vec<T>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReference {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: SourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: Option<ProjectReference>,
}

impl Environment {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: SourceId::Number(id),
            name: name.into(),
            project: None,
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project = Some(ProjectReference {
            id: Some(project_id.into()),
        });
        self
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub id: Option<SourceId>,
}

/// One deployment into an environment. `owner` is the build that ran it and
/// `definition` the pipeline it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: SourceId,
    #[serde(default)]
    pub owner: Option<Reference>,
    #[serde(default)]
    pub definition: Option<Reference>,
}

impl DeploymentRecord {
    pub fn new(id: i64) -> Self {
        Self {
            id: SourceId::Number(id),
            owner: None,
            definition: None,
        }
    }

    pub fn with_owner(mut self, build_id: i64) -> Self {
        self.owner = Some(Reference {
            id: Some(SourceId::Number(build_id)),
        });
        self
    }

    pub fn with_definition(mut self, pipeline_id: i64) -> Self {
        self.definition = Some(Reference {
            id: Some(SourceId::Number(pipeline_id)),
        });
        self
    }

    pub fn build_id(&self) -> Option<String> {
        self.owner
            .as_ref()
            .and_then(|r| r.id.as_ref())
            .map(SourceId::to_string)
    }

    pub fn pipeline_id(&self) -> Option<String> {
        self.definition
            .as_ref()
            .and_then(|r| r.id.as_ref())
            .map(SourceId::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A Port entity payload. Both entity kinds share this shape and differ only
/// in their relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<R> {
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub team: Vec<String>,
    pub relations: R,
}

impl<R> Entity<R> {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>, relations: R) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            properties: serde_json::Map::new(),
            team: Vec::new(),
            relations,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRelations {
    pub project: Option<String>,
    pub pipeline: Vec<String>,
}

impl EnvironmentRelations {
    /// Records a pipeline id, keeping first-seen order. Returns false when the
    /// id was already present.
    pub fn add_pipeline(&mut self, pipeline_id: impl Into<String>) -> bool {
        let pipeline_id = pipeline_id.into();
        if self.pipeline.contains(&pipeline_id) {
            return false;
        }
        self.pipeline.push(pipeline_id);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRelations {
    pub environment: String,
    pub pipeline: Option<String>,
    pub build: Option<String>,
}

pub type EnvironmentEntity = Entity<EnvironmentRelations>;
pub type DeploymentEntity = Entity<DeploymentRelations>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_id_renders_numbers_and_strings() {
        let numeric: SourceId = serde_json::from_value(json!(10)).unwrap();
        assert_eq!(numeric.to_string(), "10");

        let guid: SourceId = serde_json::from_value(json!("a1b2-c3")).unwrap();
        assert_eq!(guid.to_string(), "a1b2-c3");
    }

    #[test]
    fn test_environment_deserialization() {
        let env: Environment = serde_json::from_value(json!({
            "id": 10,
            "name": "prod",
            "project": { "id": "proj-guid" },
            "createdBy": { "id": "someone" }
        }))
        .unwrap();

        assert_eq!(env.id, SourceId::Number(10));
        assert_eq!(env.name, "prod");
        assert_eq!(env.project_id(), Some("proj-guid"));
    }

    #[test]
    fn test_list_response_without_value_is_empty() {
        let list: ListResponse<Environment> = serde_json::from_value(json!({})).unwrap();
        assert!(list.value.is_empty());

        let list: ListResponse<DeploymentRecord> =
            serde_json::from_value(json!({ "count": 0, "value": null })).unwrap();
        assert!(list.value.is_empty());
    }

    #[test]
    fn test_reference_without_id() {
        let record: DeploymentRecord = serde_json::from_value(json!({
            "id": 99,
            "owner": {},
            "definition": { "id": null }
        }))
        .unwrap();

        assert_eq!(record.build_id(), None);
        assert_eq!(record.pipeline_id(), None);
    }

    #[test]
    fn test_deployment_record_accessors() {
        let record: DeploymentRecord = serde_json::from_value(json!({
            "id": 99,
            "owner": { "id": 55, "name": "20240101.1" },
            "definition": { "id": 7, "name": "ci" }
        }))
        .unwrap();

        assert_eq!(record.build_id().as_deref(), Some("55"));
        assert_eq!(record.pipeline_id().as_deref(), Some("7"));

        let bare = DeploymentRecord::new(1);
        assert_eq!(bare.build_id(), None);
        assert_eq!(bare.pipeline_id(), None);
    }

    #[test]
    fn test_entity_serializes_to_port_shape() {
        let entity = Entity::new(
            "99",
            "prod-99",
            DeploymentRelations {
                environment: "10".to_string(),
                pipeline: Some("7".to_string()),
                build: Some("55".to_string()),
            },
        );

        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({
                "identifier": "99",
                "title": "prod-99",
                "properties": {},
                "team": [],
                "relations": { "environment": "10", "pipeline": "7", "build": "55" }
            })
        );
    }

    #[test]
    fn test_add_pipeline_deduplicates() {
        let mut relations = EnvironmentRelations::default();
        assert!(relations.add_pipeline("7"));
        assert!(relations.add_pipeline("8"));
        assert!(!relations.add_pipeline("7"));
        assert_eq!(relations.pipeline, vec!["7", "8"]);
    }
}
