use learn_core::model::{Course, CourseId};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::document::CourseDocument;
use crate::error::CatalogError;

/// Shown when the backend fails without a usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl CatalogConfig {
    /// Validates the base URL.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, CatalogError> {
        Ok(Self {
            base_url: Url::parse(base_url.trim())?,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// REST client for the course endpoints.
///
/// There is no timeout or retry policy; a failed call is reported once and
/// the caller decides whether to try again.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    config: CatalogConfig,
}

impl CatalogClient {
    #[must_use]
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// `GET /courses/get_all`
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the request fails or a course is invalid.
    pub async fn list_courses(&self) -> Result<Vec<Course>, CatalogError> {
        let docs: Vec<CourseDocument> = self.send(self.list_request()).await?;
        docs.into_iter().map(CourseDocument::into_course).collect()
    }

    /// `GET /courses/get/:id`
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the request fails or the course is invalid.
    pub async fn get_course(&self, id: &CourseId) -> Result<Course, CatalogError> {
        let doc: CourseDocument = self.send(self.get_request(id)).await?;
        doc.into_course()
    }

    /// `POST /courses/create`. The backend assigns the id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the request fails or the response is invalid.
    pub async fn create_course(&self, draft: &CourseDocument) -> Result<Course, CatalogError> {
        let doc: CourseDocument = self.send(self.create_request(draft)).await?;
        doc.into_course()
    }

    /// `PUT /courses/update/:id`
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the request fails or the response is invalid.
    pub async fn update_course(&self, course: &Course) -> Result<Course, CatalogError> {
        let doc: CourseDocument = self.send(self.update_request(course)).await?;
        doc.into_course()
    }

    /// `DELETE /courses/delete/:id`
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the request fails.
    pub async fn delete_course(&self, id: &CourseId) -> Result<(), CatalogError> {
        let response = self.delete_request(id).send().await?;
        check_status(response).await?;
        Ok(())
    }

    fn list_request(&self) -> RequestBuilder {
        self.request(Method::GET, "courses/get_all")
    }

    fn get_request(&self, id: &CourseId) -> RequestBuilder {
        self.request(Method::GET, &format!("courses/get/{id}"))
    }

    fn create_request(&self, draft: &CourseDocument) -> RequestBuilder {
        let mut body = draft.clone();
        body.id = None;
        self.request(Method::POST, "courses/create").json(&body)
    }

    fn update_request(&self, course: &Course) -> RequestBuilder {
        self.request(Method::PUT, &format!("courses/update/{}", course.id()))
            .json(&CourseDocument::from_course(course))
    }

    fn delete_request(&self, id: &CourseId) -> RequestBuilder {
        self.request(Method::DELETE, &format!("courses/delete/{id}"))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.config.endpoint(path));
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CatalogError> {
        let response = request.send().await?;
        debug!(url = %response.url(), status = %response.status(), "catalog response");
        let response = check_status(response).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.into_inner())
    }
}

async fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CatalogError::Api {
        status,
        message: error_message(&body),
    })
}

/// Backend error text, taken verbatim from `message` or `error`.
pub(crate) fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

/// Responses come either bare or wrapped as `{ "data": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}
