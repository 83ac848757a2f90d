//! Discord remote client
//!
//! Two independent, stateless calls made at most once per CLI invocation:
//! - a guild snapshot (`GET /guilds/{id}?with_counts=true`, bot authorization)
//! - a webhook delivery (`POST <webhook url>` with a JSON body)
//!
//! Each request carries a fixed timeout. There is no retry, backoff or
//! connection reuse across invocations; any transport failure or non-success
//! status surfaces as `IncidentError::Remote`.

// Local crates
use crate::{
    discord::models::GuildInfo,
    helpers::errors::{IncidentError, IncidentResult},
};

// External crates
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

/// Per-request timeout for every outbound call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking client for the Discord REST API and incident webhooks.
///
/// The API base is injected so tests and self-hosted proxies can point the
/// client at another endpoint.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    api_base: Url,
    http: Client,
}

impl DiscordClient {
    /// Build a client rooted at `api_base` (for example `https://discord.com/api`).
    ///
    /// A base that is not an absolute http(s) URL is rejected with
    /// `IncidentError::Input`.
    #[instrument(
        name = "crash_monitor_discord::create",
        target = "discord::client::DiscordClient",
        skip_all,
        level = "debug"
    )]
    pub fn new(api_base: impl Into<String>) -> IncidentResult<Self> {
        let raw = api_base.into();
        let api_base = Url::parse(raw.trim().trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| IncidentError::Input(format!("invalid Discord API base URL: {raw}")))?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("crash-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(api_base = %api_base, "Created Discord client");
        Ok(Self { api_base, http })
    }

    /// Fetch guild metadata including approximate member and online counts.
    ///
    /// Both `token` and `guild_id` must be non-empty; otherwise the call fails
    /// with `IncidentError::Input` before any request is made.
    #[instrument(
        name = "crash_monitor_discord::fetch_guild_info",
        target = "discord::client::DiscordClient",
        skip(self, token),
        level = "debug"
    )]
    pub fn fetch_guild_info(&self, token: &str, guild_id: &str) -> IncidentResult<GuildInfo> {
        if token.trim().is_empty() || guild_id.trim().is_empty() {
            return Err(IncidentError::Input(
                "DISCORD_TOKEN and GUILD_ID must be set to fetch guild info".to_string(),
            ));
        }

        let url = self.guild_url(guild_id.trim())?;
        tracing::debug!(url = %url, "Requesting guild snapshot");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bot {}", token.trim()))
            .query(&[("with_counts", "true")])
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                tracing::error!(error = %e, status = ?e.status(), "Guild snapshot request failed");
                IncidentError::Remote(e)
            })?;

        let guild: GuildInfo = response.json()?;
        tracing::info!(
            guild_id = %guild.id,
            members = ?guild.approximate_member_count,
            online = ?guild.approximate_presence_count,
            "Fetched guild snapshot"
        );

        Ok(guild)
    }

    /// `{api_base}/guilds/{guild_id}` with the id percent-encoded as a single
    /// path segment.
    fn guild_url(&self, guild_id: &str) -> IncidentResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                IncidentError::Input(format!("invalid Discord API base URL: {}", self.api_base))
            })?
            .pop_if_empty()
            .push("guilds")
            .push(guild_id);
        Ok(url)
    }

    /// POST `payload` as JSON to `url`.
    #[instrument(
        name = "crash_monitor_discord::send_webhook",
        target = "discord::client::DiscordClient",
        skip_all,
        level = "debug"
    )]
    pub fn send_webhook<T>(&self, url: &str, payload: &T) -> IncidentResult<()>
    where
        T: Serialize + ?Sized,
    {
        if url.trim().is_empty() {
            return Err(IncidentError::Input(
                "a webhook URL is required to deliver a payload".to_string(),
            ));
        }

        let response = self
            .http
            .post(url.trim())
            .json(payload)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                tracing::error!(error = %e, status = ?e.status(), "Webhook delivery failed");
                IncidentError::Remote(e)
            })?;

        tracing::info!(status = %response.status(), "Webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::models::WebhookPayload;
    use crate::store::models::Severity;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // The blocking client must live outside the async runtime driving the mock.
    async fn blocking<T, F>(f: F) -> T
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.unwrap()
    }

    #[tokio::test]
    async fn fetch_guild_info_uses_bot_auth_and_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/guilds/123"))
            .and(query_param("with_counts", "true"))
            .and(header("authorization", "Bot secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "123",
                "name": "Crash Lab",
                "approximate_member_count": 42,
                "approximate_presence_count": 7,
                "owner_id": "1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/api/", server.uri());
        let guild = blocking(move || {
            DiscordClient::new(base).and_then(|client| client.fetch_guild_info("secret-token", "123"))
        })
        .await
        .unwrap();

        assert_eq!(guild.name, "Crash Lab");
        assert_eq!(guild.approximate_member_count, Some(42));
        assert_eq!(guild.approximate_presence_count, Some(7));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let base = server.uri();
        let results = blocking(move || {
            let client = DiscordClient::new(base)?;
            Ok::<_, IncidentError>((
                client.fetch_guild_info("", "123"),
                client.fetch_guild_info("token", "  "),
            ))
        })
        .await
        .unwrap();

        assert!(matches!(results.0, Err(IncidentError::Input(_))));
        assert!(matches!(results.1, Err(IncidentError::Input(_))));
    }

    #[tokio::test]
    async fn guild_error_status_is_a_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/123"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "401: Unauthorized",
                "code": 0
            })))
            .mount(&server)
            .await;

        let base = server.uri();
        let result = blocking(move || {
            DiscordClient::new(base).and_then(|client| client.fetch_guild_info("bad", "123"))
        })
        .await;

        match result {
            Err(IncidentError::Remote(e)) => {
                assert_eq!(e.status(), Some(reqwest::StatusCode::UNAUTHORIZED))
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn webhook_posts_json_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks/1/abc"))
            .and(body_json(json!({
                "content": "[MEDIUM] Test incident",
                "embeds": [{"title": "Crash monitor alert", "description": "Routine check"}]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/webhooks/1/abc", server.uri());
        let payload = WebhookPayload::incident_alert(Severity::Medium, "Test incident", "Routine check");
        let result = blocking(move || {
            DiscordClient::new("https://discord.com/api")
                .and_then(|client| client.send_webhook(&url, &payload))
        })
        .await;

        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn webhook_error_status_is_a_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = format!("{}/webhooks/broken", server.uri());
        let result = blocking(move || {
            DiscordClient::new("https://discord.com/api")
                .and_then(|client| client.send_webhook(&url, &json!({"content": "hi"})))
        })
        .await;

        assert!(matches!(result, Err(IncidentError::Remote(_))));
    }

    #[test]
    fn unreachable_webhook_is_a_remote_error() {
        let client = DiscordClient::new("https://discord.com/api").unwrap();
        let result = client.send_webhook("http://127.0.0.1:9/unreachable", &json!({"content": "hi"}));

        assert!(matches!(result, Err(IncidentError::Remote(_))));
    }

    #[test]
    fn guild_id_is_encoded_as_one_path_segment() {
        let client = DiscordClient::new("https://discord.com/api/").unwrap();
        let url = client.guild_url("12/34?x=1").unwrap();

        assert_eq!(url.as_str(), "https://discord.com/api/guilds/12%2F34%3Fx=1");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn guild_url_on_a_bare_host() {
        let client = DiscordClient::new("http://localhost:8080").unwrap();
        let url = client.guild_url("123").unwrap();

        assert_eq!(url.as_str(), "http://localhost:8080/guilds/123");
    }

    #[test]
    fn malformed_api_base_is_an_input_error() {
        assert!(matches!(
            DiscordClient::new("discord.com/api"),
            Err(IncidentError::Input(_))
        ));
        assert!(matches!(
            DiscordClient::new("mailto:ops@example.com"),
            Err(IncidentError::Input(_))
        ));
    }

    #[test]
    fn empty_webhook_url_is_an_input_error() {
        let client = DiscordClient::new("https://discord.com/api").unwrap();
        let result = client.send_webhook("", &json!({"content": "hi"}));

        assert!(matches!(result, Err(IncidentError::Input(_))));
    }
}
