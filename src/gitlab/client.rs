use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::Directory;
use super::error::GitLabError;
use super::types::{Group, Project, User};

/// Page size for list endpoints. GitLab caps `per_page` at 100.
pub const PER_PAGE: u32 = 100;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking client for the subset of the GitLab v4 API the mirror needs.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    api: String,
}

/// Normalize a host such as `gitlab.example.com` or `https://gitlab.com/`
/// into the v4 API base URL.
pub fn api_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let host = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    if host.ends_with("/api/v4") {
        host
    } else {
        format!("{}/api/v4", host)
    }
}

impl GitLabClient {
    /// Build a client for `host` authenticating with a personal access token.
    ///
    /// # Errors
    /// Returns an error if the token is not a valid header value or the
    /// underlying HTTP client cannot be built.
    pub fn new(host: &str, token: &str, timeout: Duration) -> Result<Self, GitLabError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("glmirror/", env!("CARGO_PKG_VERSION"))),
        );
        if !token.is_empty() {
            let mut value = HeaderValue::from_str(token)?;
            value.set_sensitive(true);
            headers.insert("PRIVATE-TOKEN", value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api: api_base(host),
        })
    }

    /// The API base URL requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api
    }

    /// GET `path` and decode the body, returning the `X-Next-Page` header too.
    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Option<u32>), GitLabError> {
        let url = format!("{}{}", self.api, path);
        debug!(url = %url, ?query, "GET");

        let resp = self.http.get(&url).query(query).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(GitLabError::from_status(status, path, body));
        }

        let next_page = resp
            .headers()
            .get("x-next-page")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u32>().ok());

        let value = resp.json::<T>().map_err(|e| GitLabError::Decode {
            url,
            message: e.to_string(),
        })?;
        Ok((value, next_page))
    }

    /// GET a list endpoint, following `X-Next-Page` until the last page.
    ///
    /// Results are requested ordered by name ascending.
    fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, GitLabError> {
        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let query = [
                ("per_page", PER_PAGE.to_string()),
                ("order_by", "name".to_string()),
                ("sort", "asc".to_string()),
                ("page", page.to_string()),
            ];
            let (items, next): (Vec<T>, _) = self.get(path, &query)?;
            out.extend(items);
            match next {
                Some(n) if n > page => page = n,
                _ => break,
            }
        }
        Ok(out)
    }
}

impl Directory for GitLabClient {
    fn group(&self, id: u64) -> Result<Group, GitLabError> {
        let query = [("with_projects", "false".to_string())];
        self.get(&format!("/groups/{}", id), &query).map(|(g, _)| g)
    }

    fn group_projects(&self, id: u64) -> Result<Vec<Project>, GitLabError> {
        self.get_all(&format!("/groups/{}/projects", id))
    }

    fn subgroups(&self, id: u64) -> Result<Vec<Group>, GitLabError> {
        self.get_all(&format!("/groups/{}/subgroups", id))
    }

    fn project(&self, id: u64) -> Result<Project, GitLabError> {
        self.get(&format!("/projects/{}", id), &[]).map(|(p, _)| p)
    }

    fn current_user(&self) -> Result<User, GitLabError> {
        self.get("/user", &[]).map(|(u, _)| u)
    }
}
