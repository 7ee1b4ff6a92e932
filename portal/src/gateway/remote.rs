//! Supabase gateway
//!
//! Talks to a hosted Supabase project:
//! - rows through PostgREST at `{url}/rest/v1/{table}`
//! - objects through Storage at `{url}/storage/v1/object/...`
//!
//! Every request carries the project key as both `apikey` and bearer token.

use super::{Gateway, ListOptions, SortBy, StoredObject, Table, TableQuery, UploadOptions};
use crate::error::{AppError, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Gateway backed by a hosted Supabase project
#[derive(Clone)]
pub struct RemoteGateway {
    client: Client,
    base_url: Url,
    api_key: String,
}

/// Body of a storage list request
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    sort_by: &'a SortBy,
}

impl RemoteGateway {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Generic(format!("Invalid gateway URL {}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(AppError::Generic(format!(
                "Gateway URL cannot be used as a base: {}",
                base_url
            )));
        }

        if api_key.trim().is_empty() {
            return Err(AppError::Generic("Gateway API key is empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("elbaraa/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Base URL extended with percent-encoded path segments
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments.into_iter().filter(|s| !s.is_empty()));
        }
        url
    }

    fn object_endpoint(&self, kind: &[&str], bucket: &str, path: &str) -> Url {
        let segments = ["storage", "v1", "object"]
            .into_iter()
            .chain(kind.iter().copied())
            .chain(std::iter::once(bucket))
            .chain(path.split('/'));
        self.endpoint(segments)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }
}

/// PostgREST query-string pairs for a table query
fn rest_params(query: &TableQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for filter in &query.filters {
        params.push((filter.column.clone(), format!("eq.{}", filter.value)));
    }

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// A failed gateway response
#[derive(Debug)]
struct Failure {
    status: u16,
    message: String,
    duplicate: bool,
}

impl From<Failure> for AppError {
    fn from(failure: Failure) -> Self {
        AppError::Gateway {
            status: failure.status,
            message: failure.message,
        }
    }
}

/// Read the error body: PostgREST sends `message`, Storage sends `error`
/// and `message` plus its own `statusCode`, which may differ from the HTTP
/// status (an existing object comes back as 400 with `statusCode` "409").
async fn read_failure(response: Response) -> Failure {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<Value>(&body).ok();

    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|m| match m {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    };

    let duplicate = status == 409
        || field("statusCode").as_deref() == Some("409")
        || field("error").as_deref() == Some("Duplicate");
    let message = field("message").or_else(|| field("error")).unwrap_or(body);

    tracing::debug!("Gateway responded {}: {}", status, message);

    Failure {
        status,
        message,
        duplicate,
    }
}

/// Turn a non-success response into a gateway error carrying its message
async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(read_failure(response).await.into())
}

impl Gateway for RemoteGateway {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>> {
        let url = self.endpoint(["rest", "v1", query.table.name()]);
        tracing::debug!("Selecting from {}", query.table.name());

        let response = self
            .authorized(self.client.get(url))
            .query(&rest_params(query))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let url = self.endpoint(["rest", "v1", table.name()]);
        tracing::debug!("Inserting into {}", table.name());

        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let mut rows: Vec<Value> = check(response).await?.json().await?;
        if rows.is_empty() {
            return Err(AppError::Generic(format!(
                "Insert into {} returned no row",
                table.name()
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        options: &UploadOptions,
    ) -> Result<()> {
        let url = self.object_endpoint(&[], bucket, path);
        tracing::debug!("Uploading {}/{} ({} bytes)", bucket, path, data.len());

        let response = self
            .authorized(self.client.post(url))
            .header("cache-control", format!("max-age={}", options.cache_control))
            .header("x-upsert", options.upsert.to_string())
            .header(CONTENT_TYPE, &options.content_type)
            .body(data.to_vec())
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let failure = read_failure(response).await;
        if failure.duplicate {
            return Err(AppError::Conflict(format!("{}/{}", bucket, path)));
        }
        Err(failure.into())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.object_endpoint(&["public"], bucket, path).to_string()
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<StoredObject>> {
        let url = self.endpoint(["storage", "v1", "object", "list", bucket]);

        let body = ListRequest {
            prefix,
            limit: options.limit,
            offset: 0,
            sort_by: &options.sort_by,
        };

        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await?;

        let objects: Vec<StoredObject> = check(response).await?.json().await?;

        // Empty folders are represented by a hidden placeholder object
        Ok(objects
            .into_iter()
            .filter(|o| !o.name.starts_with('.'))
            .collect())
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<()> {
        let url = self.endpoint(["storage", "v1", "object", bucket]);

        let response = self
            .authorized(self.client.delete(url))
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A request as the stub server received it
    #[derive(Debug, Clone)]
    struct Captured {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve the canned `(status, body)` responses in order, one per connection
    async fn stub_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<Captured>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let captured = Arc::new(Mutex::new(Vec::new()));
        let log = captured.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);

                let reply = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        (url, captured)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n").filter(|l| !l.is_empty());
        let request_line = lines.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        let length: usize = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.parse().unwrap())
            .unwrap_or(0);

        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        Captured {
            request_line,
            headers,
            body: String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string(),
        }
    }

    fn stub_gateway(url: &str) -> RemoteGateway {
        RemoteGateway::new(url, "anon-key", Duration::from_secs(5)).unwrap()
    }

    fn test_gateway() -> RemoteGateway {
        RemoteGateway::new(
            "https://project.supabase.co",
            "anon-key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_rest_params_for_materials_query() {
        let query = TableQuery::from(Table::Materials)
            .eq("grade", "10th")
            .eq("subject", "History & Geography")
            .order("uploaded_at", false);

        let params = rest_params(&query);

        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("grade".to_string(), "eq.10th".to_string()),
                ("subject".to_string(), "eq.History & Geography".to_string()),
                ("order".to_string(), "uploaded_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let gateway = test_gateway();

        let url = gateway.public_url("materials", "11th/History & Geography/1700_abc.pdf");

        assert_eq!(
            url,
            "https://project.supabase.co/storage/v1/object/public/materials/11th/History%20&%20Geography/1700_abc.pdf"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let gateway = RemoteGateway::new(
            "https://proxy.example.test/supabase/",
            "key",
            Duration::from_secs(5),
        )
        .unwrap();

        let url = gateway.endpoint(["rest", "v1", "announcements"]);
        assert_eq!(
            url.as_str(),
            "https://proxy.example.test/supabase/rest/v1/announcements"
        );
    }

    #[tokio::test]
    async fn test_upload_sends_storage_headers() {
        let (url, captured) = stub_server(vec![(200, r#"{"Key":"materials/10th/Math/1_abc.pdf"}"#)]).await;
        let gateway = stub_gateway(&url);

        gateway
            .upload(
                "materials",
                "10th/Math/1_abc.pdf",
                b"%PDF-1.4",
                &UploadOptions::new("application/pdf"),
            )
            .await
            .unwrap();

        let requests = captured.lock().unwrap();
        let request = &requests[0];
        assert_eq!(
            request.request_line,
            "POST /storage/v1/object/materials/10th/Math/1_abc.pdf HTTP/1.1"
        );
        assert_eq!(request.header("x-upsert"), Some("false"));
        assert_eq!(request.header("cache-control"), Some("max-age=3600"));
        assert_eq!(request.header("content-type"), Some("application/pdf"));
        assert_eq!(request.header("apikey"), Some("anon-key"));
        assert_eq!(request.header("authorization"), Some("Bearer anon-key"));
        assert_eq!(request.body, "%PDF-1.4");
    }

    #[tokio::test]
    async fn test_duplicate_upload_is_a_conflict() {
        let (url, _captured) = stub_server(vec![
            (
                400,
                r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#,
            ),
            (409, r#"{"error":"Duplicate","message":"The resource already exists"}"#),
        ])
        .await;
        let gateway = stub_gateway(&url);
        let options = UploadOptions::new("image/png");

        for _ in 0..2 {
            let err = gateway
                .upload("calendar_images", "10th/1_abc.png", b"png", &options)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(ref p) if p == "calendar_images/10th/1_abc.png"));
        }
    }

    #[tokio::test]
    async fn test_other_upload_failures_keep_status() {
        let (url, _captured) = stub_server(vec![(
            413,
            r#"{"statusCode":"413","error":"Payload too large","message":"The object exceeded the maximum allowed size"}"#,
        )])
        .await;
        let gateway = stub_gateway(&url);

        let err = gateway
            .upload("materials", "10th/Math/big.pdf", b"x", &UploadOptions::new("application/pdf"))
            .await
            .unwrap_err();

        match err {
            AppError::Gateway { status, message } => {
                assert_eq!(status, 413);
                assert_eq!(message, "The object exceeded the maximum allowed size");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_message_extraction() {
        let (url, _captured) = stub_server(vec![
            (401, r#"{"code":"42501","message":"permission denied for table materials"}"#),
            (500, "upstream timeout"),
        ])
        .await;
        let gateway = stub_gateway(&url);
        let query = TableQuery::from(Table::Materials).eq("grade", "10th");

        let err = gateway.select(&query).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gateway returned 401: permission denied for table materials"
        );

        let err = gateway.select(&query).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Gateway { status: 500, ref message } if message == "upstream timeout"
        ));
    }

    #[tokio::test]
    async fn test_select_and_insert_requests() {
        let (url, captured) = stub_server(vec![
            (200, r#"[{"id":1,"title":"Exams","message":"Start Monday","created_at":"2024-05-01T08:00:00Z"}]"#),
            (201, r#"[{"id":2,"title":"Trip","message":"Friday","created_at":"2024-05-02T08:00:00Z"}]"#),
        ])
        .await;
        let gateway = stub_gateway(&url);

        let rows = gateway
            .select(&TableQuery::from(Table::Announcements).order("created_at", false))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let row = gateway
            .insert(Table::Announcements, json!({ "title": "Trip", "message": "Friday" }))
            .await
            .unwrap();
        assert_eq!(row["id"], 2);

        let requests = captured.lock().unwrap();
        assert_eq!(
            requests[0].request_line,
            "GET /rest/v1/announcements?select=*&order=created_at.desc HTTP/1.1"
        );
        assert_eq!(requests[1].request_line, "POST /rest/v1/announcements HTTP/1.1");
        assert_eq!(requests[1].header("prefer"), Some("return=representation"));
        let body: Value = serde_json::from_str(&requests[1].body).unwrap();
        assert_eq!(body, json!({ "title": "Trip", "message": "Friday" }));
    }

    #[tokio::test]
    async fn test_remove_request_shape() {
        let (url, captured) = stub_server(vec![(200, r#"[{"name":"10th/Math/1_abc.pdf"}]"#)]).await;
        let gateway = stub_gateway(&url);

        gateway.remove("materials", "10th/Math/1_abc.pdf").await.unwrap();

        let requests = captured.lock().unwrap();
        assert_eq!(requests[0].request_line, "DELETE /storage/v1/object/materials HTTP/1.1");
        let body: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body, json!({ "prefixes": ["10th/Math/1_abc.pdf"] }));
    }

    #[tokio::test]
    async fn test_list_skips_placeholder_objects() {
        let (url, captured) = stub_server(vec![(
            200,
            r#"[{"name":".emptyFolderPlaceholder","created_at":null},{"name":"1700_k3j9x.png","created_at":"2024-05-01T08:00:00Z"}]"#,
        )])
        .await;
        let gateway = stub_gateway(&url);

        let objects = gateway
            .list("calendar_images", "12th", &ListOptions::newest())
            .await
            .unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, "1700_k3j9x.png");

        let requests = captured.lock().unwrap();
        assert_eq!(
            requests[0].request_line,
            "POST /storage/v1/object/list/calendar_images HTTP/1.1"
        );
        let body: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["prefix"], "12th");
        assert_eq!(body["limit"], 1);
        assert_eq!(body["sortBy"], json!({ "column": "created_at", "order": "desc" }));
    }

    #[test]
    fn test_new_rejects_bad_configuration() {
        assert!(RemoteGateway::new("not a url", "key", Duration::from_secs(1)).is_err());
        assert!(RemoteGateway::new("https://x.supabase.co", " ", Duration::from_secs(1)).is_err());
    }
}
