//! Project metadata and project listings from the public REST API

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::fetch::FetchQueue;
use crate::types::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Page size of user and studio listings
pub const PAGE_SIZE: usize = 20;

/// Public metadata of a project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project ID
    pub id: ProjectId,
    /// Title as shown on the site
    #[serde(default)]
    pub title: String,
    /// Author (project endpoint and user listings)
    #[serde(default)]
    pub author: Option<ProjectAuthor>,
    /// Author name (studio listings carry it flat)
    #[serde(default)]
    pub username: Option<String>,
    /// Timestamps
    #[serde(default)]
    pub history: Option<ProjectHistory>,
}

impl ProjectInfo {
    /// Author name from whichever field the endpoint filled in
    pub fn author_name(&self) -> Option<&str> {
        self.author
            .as_ref()
            .map(|a| a.username.as_str())
            .or(self.username.as_deref())
    }
}

/// Project author
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAuthor {
    /// Username
    pub username: String,
}

/// Project timestamps
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectHistory {
    /// Creation time
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    /// Time the project was shared, if it was
    #[serde(default)]
    pub shared: Option<DateTime<Utc>>,
}

/// Where to take a list of projects from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSource {
    /// A single project
    Single(ProjectId),
    /// Every shared project of a user
    User(String),
    /// Every project in a studio
    Studio(u64),
}

impl ProjectSource {
    fn page_path(&self, offset: usize) -> Option<String> {
        match self {
            ProjectSource::Single(_) => None,
            ProjectSource::User(username) => Some(format!(
                "users/{}/projects?limit={PAGE_SIZE}&offset={offset}",
                urlencoding::encode(username)
            )),
            ProjectSource::Studio(id) => Some(format!(
                "studios/{id}/projects?limit={PAGE_SIZE}&offset={offset}"
            )),
        }
    }
}

impl std::fmt::Display for ProjectSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectSource::Single(id) => write!(f, "project {id}"),
            ProjectSource::User(username) => write!(f, "user {username}"),
            ProjectSource::Studio(id) => write!(f, "studio {id}"),
        }
    }
}

/// Fetch the metadata of one project
///
/// # Errors
/// [`Error::Transport`] for network failures and non-2xx answers,
/// [`Error::Read`] if the body is not the expected JSON
pub async fn fetch_project_info(
    queue: &FetchQueue,
    endpoints: &EndpointConfig,
    id: ProjectId,
) -> Result<ProjectInfo> {
    let url = endpoints.api(&format!("projects/{id}"));
    let response = queue.enqueue(&url).await?.ensure_success()?;
    response.json()
}

/// List up to `limit` projects of a source
///
/// User and studio listings are paged [`PAGE_SIZE`] at a time until a short
/// page arrives or `limit` is reached. A single project is returned as a
/// one-element list.
pub async fn list_projects(
    queue: &FetchQueue,
    endpoints: &EndpointConfig,
    source: &ProjectSource,
    limit: usize,
) -> Result<Vec<ProjectInfo>> {
    if let ProjectSource::Single(id) = source {
        return Ok(vec![fetch_project_info(queue, endpoints, *id).await?]);
    }

    let mut projects: Vec<ProjectInfo> = Vec::new();
    let mut page_index = 0;

    while projects.len() < limit {
        let Some(path) = source.page_path(page_index * PAGE_SIZE) else {
            break;
        };
        let url = endpoints.api(&path);
        debug!(%source, page = page_index, url = %url, "Fetching listing page");

        let page: Vec<ProjectInfo> = queue
            .enqueue(&url)
            .await?
            .ensure_success()
            .map_err(|e| match e {
                Error::Transport {
                    url,
                    status: Some(404),
                    ..
                } => Error::Transport {
                    url,
                    reason: format!("{source} not found"),
                    status: Some(404),
                },
                other => other,
            })?
            .json()?;

        let page_len = page.len();
        projects.extend(page);
        page_index += 1;

        if page_len < PAGE_SIZE {
            break;
        }
    }

    projects.truncate(limit);
    info!(%source, count = projects.len(), "Listed projects");
    Ok(projects)
}
