//! Meeting Store boundary. The materializer only ever calls `create`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{StatusCode, Url};

use crate::domain::{Meeting, MeetingDraft};
use crate::error::{Result, RouterError};
use crate::store::SharedCollection;

#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn create(&self, draft: MeetingDraft) -> Result<Meeting>;

    async fn get(&self, id: &str) -> Result<Option<Meeting>>;

    async fn list(&self) -> Result<Vec<Meeting>>;
}

/// Meetings kept in a local collection.
#[derive(Clone)]
pub struct LocalMeetingStore {
    meetings: SharedCollection<Meeting>,
}

impl LocalMeetingStore {
    pub fn new(meetings: SharedCollection<Meeting>) -> Self {
        Self { meetings }
    }
}

#[async_trait]
impl MeetingStore for LocalMeetingStore {
    async fn create(&self, draft: MeetingDraft) -> Result<Meeting> {
        draft.validate()?;
        self.meetings.insert(draft.into_meeting(Utc::now())).await
    }

    async fn get(&self, id: &str) -> Result<Option<Meeting>> {
        self.meetings.get(id).await
    }

    async fn list(&self) -> Result<Vec<Meeting>> {
        self.meetings.list().await
    }
}

/// Remote Meeting API reached over HTTP (`{base_url}/meetings`).
/// No retries: a failed call is reported once and the caller decides.
#[derive(Clone)]
pub struct HttpMeetingStore {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpMeetingStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| RouterError::Storage(format!("meeting store base url: {base_url}")))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("lead-router/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RouterError::Storage(format!("meeting store client: {e}")))?;
        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    /// `{base}/meetings` or `{base}/meetings/{id}`. The id is pushed as one
    /// encoded path segment, so `/`, `?` and `%` never leave it.
    fn url(&self, id: Option<&str>) -> Result<Url> {
        if let Some(id) = id {
            if matches!(id.trim(), "" | "." | "..") {
                return Err(RouterError::bad_request(format!("invalid meeting id '{id}'")));
            }
        }
        let mut url = self.base_url.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| RouterError::Storage("meeting store base url has no path".into()))?;
            segs.pop_if_empty().push("meetings");
            if let Some(id) = id {
                segs.push(id);
            }
        }
        Ok(url)
    }
}

fn upstream(context: &str, e: impl std::fmt::Display) -> RouterError {
    RouterError::UpstreamFailure(format!("{context}: {e}"))
}

#[async_trait]
impl MeetingStore for HttpMeetingStore {
    async fn create(&self, draft: MeetingDraft) -> Result<Meeting> {
        let rsp = self
            .client
            .post(self.url(None)?)
            .timeout(self.timeout)
            .json(&draft)
            .send()
            .await
            .map_err(|e| upstream("meeting create request failed", e))?;

        let rsp = rsp
            .error_for_status()
            .map_err(|e| upstream("meeting create HTTP error", e))?;
        rsp.json::<Meeting>()
            .await
            .map_err(|e| upstream("meeting create response unreadable", e))
    }

    async fn get(&self, id: &str) -> Result<Option<Meeting>> {
        let rsp = self
            .client
            .get(self.url(Some(id))?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upstream("meeting get request failed", e))?;
        if rsp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let rsp = rsp
            .error_for_status()
            .map_err(|e| upstream("meeting get HTTP error", e))?;
        rsp.json::<Meeting>()
            .await
            .map(Some)
            .map_err(|e| upstream("meeting get response unreadable", e))
    }

    async fn list(&self) -> Result<Vec<Meeting>> {
        let rsp = self
            .client
            .get(self.url(None)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upstream("meeting list request failed", e))?;
        let rsp = rsp
            .error_for_status()
            .map_err(|e| upstream("meeting list HTTP error", e))?;
        rsp.json::<Vec<Meeting>>()
            .await
            .map_err(|e| upstream("meeting list response unreadable", e))
    }
}
