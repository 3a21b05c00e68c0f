//! HTTP client for the timetable REST server.
//!
//! Every call is tagged with a correlation id so a request can be followed
//! through the logs. Non-success responses are turned into [`ApiError`],
//! keeping the server's own `message` when it sends one.

use super::error::{ApiError, ApiResult};
use super::{LectureQuery, ListEnvelope, NewLecture, NewRoom, Resource, TimetableApi};
use crate::lecturers::{Cursor, LecturerQuery, LecturerSummary, NewLecturer, PageWindow};
use crate::schedule::{LectureEvent, RoomRef, StageRef, Weekday};
use crate::types::EntityId;
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use url::Url;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpTimetableConfig {
    /// Base URL of the API, e.g. `http://localhost:5000/api`
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpTimetableConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("timetable/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Client for the timetable server's REST endpoints.
pub struct HttpTimetableApi {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct LecturerPageBody {
    #[serde(default)]
    data: Option<Vec<LecturerSummary>>,
    #[serde(default)]
    next: Option<Cursor>,
    #[serde(default)]
    prev: Option<Cursor>,
}

#[derive(Debug, Serialize)]
struct DayOffsBody<'a> {
    day_offs: &'a [Weekday],
}

impl HttpTimetableApi {
    /// Creates a client with default configuration against `base_url`.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_config(HttpTimetableConfig {
            base_url: base_url.to_string(),
            ..HttpTimetableConfig::default()
        })
    }

    /// Creates a new client with custom configuration.
    pub fn with_config(config: HttpTimetableConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        // Url::join drops the last path segment unless it ends in '/'.
        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// `{collection}/{id}[/{suffix}]` with the id percent-encoded.
    fn item_endpoint(
        &self,
        collection: &str,
        id: &EntityId,
        suffix: Option<&str>,
    ) -> ApiResult<Url> {
        let mut url = self.endpoint(collection)?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| ApiError::UrlError {
                message: format!("{} cannot be a base URL", self.base_url),
            })?;
            segments.pop_if_empty().push(&id.to_string());
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let correlation_id = generate_correlation_id();
        let start = Instant::now();
        debug!(correlation_id = %correlation_id, url = %url, "GET");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!(correlation_id = %correlation_id, url = %url, error = %e, "Request failed");
            ApiError::from(e)
        })?;
        let response = check_status(response, &correlation_id).await?;
        let text = response.text().await?;
        let parsed = serde_json::from_str(&text)?;

        info!(
            correlation_id = %correlation_id,
            url = %url,
            duration_ms = start.elapsed().as_millis() as u64,
            "GET completed"
        );
        Ok(parsed)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ApiResult<()> {
        let correlation_id = generate_correlation_id();
        let start = Instant::now();
        info!(correlation_id = %correlation_id, method = %method, url = %url, "Sending mutation");

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            error!(correlation_id = %correlation_id, url = %url, error = %e, "Request failed");
            ApiError::from(e)
        })?;
        check_status(response, &correlation_id).await?;

        info!(
            correlation_id = %correlation_id,
            method = %method,
            duration_ms = start.elapsed().as_millis() as u64,
            "Mutation accepted"
        );
        Ok(())
    }
}

#[async_trait]
impl TimetableApi for HttpTimetableApi {
    async fn list_lectures(&self, query: &LectureQuery) -> ApiResult<Vec<LectureEvent>> {
        let mut url = self.endpoint("lectures")?;
        url.query_pairs_mut()
            .append_pair("stage_id", &query.stage_id.to_string())
            .append_pair("start_date", &query.start_date.format(DATE_FORMAT).to_string())
            .append_pair("end_date", &query.end_date.format(DATE_FORMAT).to_string());

        let envelope: ListEnvelope<LectureEvent> = self.get_json(url).await?;
        Ok(envelope.into_vec())
    }

    async fn list_lecturers(&self, query: &LecturerQuery) -> ApiResult<PageWindow> {
        let mut url = self.endpoint("lecturers")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(cursor) = &query.cursor {
                pairs.append_pair("next", cursor.as_str());
            }
        }

        let body: LecturerPageBody = self.get_json(url).await?;
        Ok(PageWindow {
            items: body.data.unwrap_or_default(),
            next: body.next,
            prev: body.prev,
            limit: query.limit,
        })
    }

    async fn list_rooms(&self) -> ApiResult<Vec<RoomRef>> {
        let envelope: ListEnvelope<RoomRef> = self.get_json(self.endpoint("rooms")?).await?;
        Ok(envelope.into_vec())
    }

    async fn list_stages(&self) -> ApiResult<Vec<StageRef>> {
        let envelope: ListEnvelope<StageRef> = self.get_json(self.endpoint("stages")?).await?;
        Ok(envelope.into_vec())
    }

    async fn create_lecture(&self, lecture: &NewLecture) -> ApiResult<()> {
        self.send(Method::POST, self.endpoint("lectures")?, Some(lecture)).await
    }

    async fn create_lecturer(&self, lecturer: &NewLecturer) -> ApiResult<()> {
        self.send(Method::POST, self.endpoint("lecturers")?, Some(lecturer)).await
    }

    async fn create_room(&self, room: &NewRoom) -> ApiResult<()> {
        self.send(Method::POST, self.endpoint("rooms")?, Some(room)).await
    }

    async fn delete(&self, resource: Resource, id: &EntityId) -> ApiResult<()> {
        let url = self.item_endpoint(resource.path(), id, None)?;
        self.send::<()>(Method::DELETE, url, None).await
    }

    async fn update_day_offs(&self, id: &EntityId, day_offs: &[Weekday]) -> ApiResult<()> {
        let url = self.item_endpoint("lecturers", id, Some("day-offs"))?;
        self.send(Method::PUT, url, Some(&DayOffsBody { day_offs })).await
    }
}

/// Passes success responses through and turns the rest into [`ApiError`].
async fn check_status(response: Response, correlation_id: &str) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let err = ApiError::from_response_body(status, &body);
    error!(
        correlation_id = %correlation_id,
        url = %url,
        status = status.as_u16(),
        error = %err,
        "Server rejected request"
    );
    Err(err)
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
