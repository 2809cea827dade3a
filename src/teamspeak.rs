//! TeamSpeak WebQuery client.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// WebQuery status code for "database empty result set".
const EMPTY_RESULT_SET: i64 = 1281;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One row of `clientlist`. WebQuery returns every value as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEntry {
    pub client_nickname: String,
    /// "0" for voice clients, "1" for server query connections.
    #[serde(default)]
    pub client_type: String,
    #[serde(default)]
    pub client_away: String,
    #[serde(default)]
    pub client_output_muted: String,
}

impl ClientEntry {
    pub fn is_voice_client(&self) -> bool {
        self.client_type == "0"
    }

    /// Away or with speakers muted.
    pub fn is_away(&self) -> bool {
        self.client_away == "1" || self.client_output_muted == "1"
    }
}

/// Connected users split into active and away, each sorted case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserList {
    pub active: Vec<String>,
    pub away: Vec<String>,
}

impl UserList {
    pub fn from_clients(clients: &[ClientEntry]) -> Self {
        let users: Vec<&ClientEntry> = clients.iter().filter(|c| c.is_voice_client()).collect();

        let away: BTreeSet<&str> = users
            .iter()
            .filter(|c| c.is_away())
            .map(|c| c.client_nickname.as_str())
            .collect();
        let all: BTreeSet<&str> = users.iter().map(|c| c.client_nickname.as_str()).collect();

        Self {
            active: sorted_nicknames(all.difference(&away).copied()),
            away: sorted_nicknames(away.into_iter()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.away.is_empty()
    }
}

fn sorted_nicknames<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = names.map(str::to_string).collect();
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    body: Vec<ClientEntry>,
    status: QueryStatus,
}

#[derive(Deserialize)]
struct QueryStatus {
    code: i64,
    #[serde(default)]
    message: String,
}

pub struct WebQueryClient {
    base_url: String,
    api_key: String,
    server_id: u32,
    http: reqwest::Client,
}

impl WebQueryClient {
    pub fn new(base_url: &str, api_key: &str, server_id: u32) -> Result<Self, TeamSpeakError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TeamSpeakError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            server_id,
            http,
        })
    }

    fn clientlist_url(&self) -> String {
        format!("{}/{}/clientlist?-voice%20-away", self.base_url, self.server_id)
    }

    pub async fn fetch_clients(&self) -> Result<Vec<ClientEntry>, TeamSpeakError> {
        let response = self
            .http
            .get(self.clientlist_url())
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| TeamSpeakError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TeamSpeakError::Http(e.to_string()))?;

        // WebQuery reports query errors with a JSON status even on 4xx
        let parsed: QueryResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(TeamSpeakError::Status(status.as_u16(), body));
            }
            Err(e) => return Err(TeamSpeakError::Parse(e.to_string())),
        };

        match parsed.status.code {
            0 => {
                debug!("WebQuery returned {} clients", parsed.body.len());
                Ok(parsed.body)
            }
            EMPTY_RESULT_SET => Ok(Vec::new()),
            code => Err(TeamSpeakError::Query {
                code,
                message: parsed.status.message,
            }),
        }
    }

    pub async fn fetch_user_list(&self) -> Result<UserList, TeamSpeakError> {
        let clients = self.fetch_clients().await?;
        Ok(UserList::from_clients(&clients))
    }
}

#[derive(Debug)]
pub enum TeamSpeakError {
    Http(String),
    Status(u16, String),
    Parse(String),
    Query { code: i64, message: String },
}

impl std::fmt::Display for TeamSpeakError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSpeakError::Http(e) => write!(f, "HTTP error: {e}"),
            TeamSpeakError::Status(code, body) => write!(f, "HTTP {code}: {body}"),
            TeamSpeakError::Parse(e) => write!(f, "Parse error: {e}"),
            TeamSpeakError::Query { code, message } => write!(f, "WebQuery error {code}: {message}"),
        }
    }
}

impl std::error::Error for TeamSpeakError {}
