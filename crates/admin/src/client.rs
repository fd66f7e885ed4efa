//! Admin API client implementation.
//!
//! Uses `graphql_client` request framing with `reqwest` 0.13 for HTTP. The
//! engine authenticates administrators with a bearer token issued on login;
//! the token lives in an [`AdminSession`] that is passed to every call.

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use quayside_core::JobId;

use crate::config::AdminConfig;
use crate::error::AdminError;
use crate::queries::{
    ActiveChannel, AdminLogin, GetJob, PaymentMethods, Reindex, ShippingMethods, Zones,
    active_channel, admin_login, get_job, payment_methods, reindex, shipping_methods, zones,
};
use crate::setup::SetupReport;
use crate::types::{Channel, CurrentUser, Job, LoginResult, PaymentMethod, ShippingMethod, Zone};

/// Response header carrying a new or refreshed session token.
pub const AUTH_TOKEN_HEADER: &str = "vendure-auth-token";

/// Request header selecting the channel.
pub const CHANNEL_TOKEN_HEADER: &str = "vendure-token";

/// Page size for setup list queries. Stores needing more are out of scope
/// for a setup check.
const LIST_TAKE: i64 = 100;

/// How often [`AdminClient::await_job`] polls.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// An authenticated administrator session.
///
/// Returned by [`AdminClient::login`]. The engine may refresh the token on
/// any response, so calls take the session mutably.
#[derive(Debug)]
pub struct AdminSession {
    token: SecretString,
    user: CurrentUser,
}

impl AdminSession {
    /// The administrator's login identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.user.identifier
    }

    fn set_token(&mut self, token: &str) {
        if self.token.expose_secret() != token {
            debug!("Admin API refreshed session token");
            self.token = SecretString::from(token.to_string());
        }
    }
}

/// Client for the commerce engine's Admin API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    endpoint: String,
    channel_token: Option<String>,
}

/// What the next job poll should do.
#[derive(Debug)]
enum PollStep {
    Done(Job),
    Wait,
}

impl AdminClient {
    /// Create a new Admin API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AdminConfig) -> Result<Self, AdminError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                client,
                endpoint: config.api_url.clone(),
                channel_token: config.channel_token.clone(),
            }),
        })
    }

    /// Send one operation. Returns the decoded data and any token the
    /// engine put in the response headers.
    async fn send<Q: GraphQLQuery>(
        &self,
        token: Option<&str>,
        variables: Q::Variables,
    ) -> Result<(Q::ResponseData, Option<String>), AdminError>
    where
        Q::Variables: serde::Serialize,
    {
        let request_body = Q::build_query(variables);
        let operation = request_body.operation_name;

        let mut request = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("Content-Type", "application/json")
            .json(&request_body);

        if let Some(channel) = &self.inner.channel_token {
            request = request.header(CHANNEL_TOKEN_HEADER, channel);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let issued = response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(AdminError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(AdminError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok((decode::<Q::ResponseData>(operation, &body)?, issued))
    }

    /// Execute an operation within a session.
    async fn execute<Q: GraphQLQuery>(
        &self,
        session: &mut AdminSession,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminError>
    where
        Q::Variables: serde::Serialize,
    {
        let (data, issued) = self
            .send::<Q>(Some(session.token.expose_secret()), variables)
            .await?;
        if let Some(token) = issued {
            session.set_token(&token);
        }
        Ok(data)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log in as an administrator.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::LoginRejected` for bad credentials, or
    /// `AdminError::MissingToken` if the engine is not configured for
    /// bearer-token sessions.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AdminSession, AdminError> {
        let (data, issued) = self
            .send::<AdminLogin>(
                None,
                admin_login::Variables {
                    username: username.to_string(),
                    password: password.expose_secret().to_string(),
                },
            )
            .await?;

        let user = match data.login {
            LoginResult::Ok(user) => user,
            LoginResult::Err(err) => return Err(AdminError::LoginRejected(err)),
        };
        let token = issued.ok_or(AdminError::MissingToken)?;

        info!(identifier = %user.identifier, "Logged in to Admin API");
        Ok(AdminSession {
            token: SecretString::from(token),
            user,
        })
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// The channel this session operates on.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn active_channel(&self, session: &mut AdminSession) -> Result<Channel, AdminError> {
        let data = self
            .execute::<ActiveChannel>(session, active_channel::Variables)
            .await?;
        Ok(data.active_channel)
    }

    /// List zones with their member regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn zones(&self, session: &mut AdminSession) -> Result<Vec<Zone>, AdminError> {
        let data = self
            .execute::<Zones>(session, zones::Variables { take: LIST_TAKE })
            .await?;
        Ok(data.zones.items)
    }

    /// List shipping methods.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn shipping_methods(
        &self,
        session: &mut AdminSession,
    ) -> Result<Vec<ShippingMethod>, AdminError> {
        let data = self
            .execute::<ShippingMethods>(session, shipping_methods::Variables { take: LIST_TAKE })
            .await?;
        Ok(data.shipping_methods.items)
    }

    /// List payment methods.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn payment_methods(
        &self,
        session: &mut AdminSession,
    ) -> Result<Vec<PaymentMethod>, AdminError> {
        let data = self
            .execute::<PaymentMethods>(session, payment_methods::Variables { take: LIST_TAKE })
            .await?;
        Ok(data.payment_methods.items)
    }

    /// Gather everything the checkout depends on into one report.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the list queries fails.
    #[instrument(skip(self, session))]
    pub async fn setup_report(
        &self,
        session: &mut AdminSession,
        payment_method_code: &str,
    ) -> Result<SetupReport, AdminError> {
        Ok(SetupReport {
            channel: self.active_channel(session).await?,
            zones: self.zones(session).await?,
            shipping_methods: self.shipping_methods(session).await?,
            payment_methods: self.payment_methods(session).await?,
            payment_method_code: payment_method_code.to_string(),
        })
    }

    // =========================================================================
    // Search index and jobs
    // =========================================================================

    /// Start rebuilding the search index.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn reindex(&self, session: &mut AdminSession) -> Result<Job, AdminError> {
        let data = self
            .execute::<Reindex>(session, reindex::Variables)
            .await?;
        info!(job_id = %data.reindex.id, "Search reindex started");
        Ok(data.reindex)
    }

    /// Look up a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(job_id = %id))]
    pub async fn job(
        &self,
        session: &mut AdminSession,
        id: &JobId,
    ) -> Result<Option<Job>, AdminError> {
        let data = self
            .execute::<GetJob>(
                session,
                get_job::Variables {
                    job_id: id.as_str().to_string(),
                },
            )
            .await?;
        Ok(data.job)
    }

    /// Poll a job every [`JOB_POLL_INTERVAL`] until it finishes.
    ///
    /// A job that ends `Failed` or `Cancelled` is returned, not turned into
    /// an error; check [`Job::state`].
    ///
    /// # Errors
    ///
    /// Returns `AdminError::JobTimeout` if the job is still running after
    /// `timeout`, and `AdminError::JobNotFound` if the engine forgets it.
    #[instrument(skip(self, session), fields(job_id = %id))]
    pub async fn await_job(
        &self,
        session: &mut AdminSession,
        id: &JobId,
        timeout: Duration,
    ) -> Result<Job, AdminError> {
        let started = Instant::now();
        loop {
            let job = self.job(session, id).await?;
            match poll_step(id, job, started.elapsed(), timeout)? {
                PollStep::Done(job) => return Ok(job),
                PollStep::Wait => tokio::time::sleep(JOB_POLL_INTERVAL).await,
            }
        }
    }
}

/// Decide what to do with a polled job.
fn poll_step(
    id: &JobId,
    job: Option<Job>,
    elapsed: Duration,
    timeout: Duration,
) -> Result<PollStep, AdminError> {
    let job = job.ok_or_else(|| AdminError::JobNotFound(id.clone()))?;
    if job.state.is_finished() {
        return Ok(PollStep::Done(job));
    }
    if elapsed >= timeout {
        return Err(AdminError::JobTimeout {
            id: id.clone(),
            state: job.state,
            waited: elapsed,
        });
    }
    debug!(state = %job.state, progress = job.progress, "Job still running");
    Ok(PollStep::Wait)
}

/// Decode a GraphQL response body, surfacing GraphQL errors.
fn decode<T>(operation: &str, body: &str) -> Result<T, AdminError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let response: Response<T> = serde_json::from_str(body).map_err(|e| {
        tracing::error!(operation, error = %e, "Failed to parse Admin API response");
        AdminError::Parse(e)
    })?;

    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let forbidden = errors.iter().any(|e| {
            e.extensions
                .as_ref()
                .and_then(|ext| ext.get("code"))
                .and_then(serde_json::Value::as_str)
                == Some("FORBIDDEN")
        });
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        if forbidden {
            return Err(AdminError::Unauthorized(messages.join("; ")));
        }
        return Err(AdminError::GraphQL(messages));
    }

    response
        .data
        .ok_or_else(|| AdminError::GraphQL(vec!["No data in response".to_string()]))
}
