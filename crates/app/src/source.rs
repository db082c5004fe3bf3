use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use learn_core::model::{Course, CourseId};
use services::{CatalogClient, CourseCatalog};

/// Where course content comes from: a local JSON file or the backend.
pub enum CourseSource {
    Local(CourseCatalog),
    Remote(Arc<CatalogClient>),
}

impl CourseSource {
    /// A catalog file wins over a configured backend.
    pub async fn resolve(
        catalog: Option<&Path>,
        remote: Option<Arc<CatalogClient>>,
    ) -> Result<Self> {
        if let Some(path) = catalog {
            let local = CourseCatalog::load(path)
                .await
                .with_context(|| format!("cannot load catalog {}", path.display()))?;
            return Ok(Self::Local(local));
        }
        match remote {
            Some(client) => Ok(Self::Remote(client)),
            None => bail!("no course source configured; pass --catalog or --api-url"),
        }
    }

    pub async fn courses(&self) -> Result<Vec<Course>> {
        match self {
            Self::Local(catalog) => Ok(catalog.courses().to_vec()),
            Self::Remote(client) => Ok(client.list_courses().await?),
        }
    }

    pub async fn course(&self, raw_id: &str) -> Result<Course> {
        let id: CourseId = raw_id
            .parse()
            .with_context(|| format!("invalid course id {raw_id:?}"))?;
        match self {
            Self::Local(catalog) => Ok(catalog.get(&id)?.clone()),
            Self::Remote(client) => Ok(client.get_course(&id).await?),
        }
    }
}
