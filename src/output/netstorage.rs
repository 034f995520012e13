use super::signer::sign_upload;
use super::{join_storage_path, read_from_start, ContentReader, Output};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response, Url};

/// Uploads to Akamai Netstorage over its signed HTTP API.
pub struct NetstorageOutput {
    client: Client,
    host: String,
    folder: String,
    prefix: String,
    base_url: String,
    key_name: String,
    secret: String,
}

impl NetstorageOutput {
    pub fn new(
        host: String,
        folder: String,
        key_name: String,
        secret: String,
        base_url: String,
    ) -> Self {
        Self::new_with_client(host, folder, key_name, secret, base_url, Client::new())
    }

    pub fn new_with_client(
        host: String,
        folder: String,
        key_name: String,
        secret: String,
        base_url: String,
        client: Client,
    ) -> Self {
        Self {
            client,
            host,
            folder,
            prefix: String::new(),
            base_url,
            key_name,
            secret,
        }
    }

    /// Path of `key` inside the storage group: folder, prefix, key.
    pub fn storage_path(&self, key: &str) -> String {
        join_storage_path(&[&self.folder, &self.prefix, key])
    }

    /// Request URL for `storage_path`, each segment percent-encoded so names
    /// containing `#`, `?` or spaces still address the signed path.
    fn url(&self, storage_path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("http://{}/", self.host))
            .map_err(|e| Error::Config(format!("invalid Netstorage host {}: {}", self.host, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("invalid Netstorage host {}", self.host)))?
            .pop_if_empty()
            .extend(storage_path.split('/'));
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let storage_path = self.storage_path(key);
        // The storage path doubles as the request's unique id.
        let headers = sign_upload(
            &self.key_name,
            &self.secret,
            &storage_path,
            &storage_path,
            Utc::now().timestamp(),
        );

        let mut request = self
            .client
            .request(method.clone(), self.url(&storage_path)?);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send {} {} to Netstorage: {}", method, storage_path, e);
            e
        })?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status().as_u16();
            let dump = dump_response(response).await;
            tracing::error!(
                "Netstorage {} {} returned status {}",
                method,
                storage_path,
                status
            );
            return Err(Error::UnexpectedStatus {
                status,
                method: method.to_string(),
                path: storage_path,
                dump,
            });
        }

        Ok(storage_path)
    }
}

/// Render a response as HTTP/1.x text: status line, headers, blank line, body.
async fn dump_response(response: Response) -> String {
    let mut dump = format!("{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        dump.push_str(&format!(
            "{}: {}\r\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
    dump.push_str("\r\n");
    match response.text().await {
        Ok(body) => dump.push_str(&body),
        Err(e) => dump.push_str(&format!("<body unreadable: {}>", e)),
    }
    dump
}

#[async_trait]
impl Output for NetstorageOutput {
    fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }

    async fn put_reader(
        &self,
        key: &str,
        content: &mut dyn ContentReader,
        content_type: &str,
    ) -> Result<()> {
        let data = read_from_start(content).await?;
        let storage_path = self
            .send(Method::PUT, key, Some(data), Some(content_type))
            .await?;
        tracing::info!("output: put {}", storage_path);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let storage_path = self.send(Method::DELETE, key, None, None).await?;
        tracing::info!("output: delete {}", storage_path);
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!(
            "{}/{}.json",
            self.base_url,
            join_storage_path(&[&self.prefix, key])
        )
    }

    fn describe(&self) -> String {
        format!(
            "netstorage http://{}/{}",
            self.host,
            join_storage_path(&[&self.folder, &self.prefix])
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::signer::{ACTION_HEADER, AUTH_DATA_HEADER, AUTH_SIGN_HEADER};
    use std::io::Cursor;
    use wiremock::matchers::{body_bytes, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_output(server: &MockServer) -> NetstorageOutput {
        NetstorageOutput::new(
            server.address().to_string(),
            "123456".to_string(),
            "uploader".to_string(),
            "abcdefghij".to_string(),
            "https://www.example.com".to_string(),
        )
    }

    #[tokio::test]
    async fn test_put_reader_signs_and_uploads() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/123456/site/css/app.css"))
            .and(header(ACTION_HEADER, "version=1&action=upload"))
            .and(header_exists(AUTH_DATA_HEADER))
            .and(header_exists(AUTH_SIGN_HEADER))
            .and(header("content-type", "text/css; charset=utf-8"))
            .and(body_bytes(b"body { color: red }".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut output = make_output(&server);
        output.set_prefix("site");

        let mut content = Cursor::new(b"body { color: red }".to_vec());
        output
            .put_reader("css/app.css", &mut content, "text/css; charset=utf-8")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_reader_encodes_reserved_characters_in_key() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let output = make_output(&server);
        for key in ["notes#1.txt", "what?.html", "a b.css"] {
            let mut content = Cursor::new(b"x".to_vec());
            output
                .put_reader(key, &mut content, "text/plain; charset=utf-8")
                .await
                .unwrap();
        }

        let targets: Vec<(String, Option<String>)> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| (r.url.path().to_string(), r.url.query().map(str::to_string)))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("/123456/notes%231.txt".to_string(), None),
                ("/123456/what%3F.html".to_string(), None),
                ("/123456/a%20b.css".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_unreadable_error_body_keeps_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises 100 body bytes, sends 5, then hangs up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\nx-diagnostic: cut\r\n\r\nshort",
                )
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let output = NetstorageOutput::new(
            address.to_string(),
            "123456".to_string(),
            "uploader".to_string(),
            "secret".to_string(),
            "https://www.example.com".to_string(),
        );
        let err = output.delete("a.css").await.unwrap_err();

        match err {
            Error::UnexpectedStatus { status, dump, .. } => {
                assert_eq!(status, 500);
                assert!(dump.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
                assert!(dump.contains("x-diagnostic: cut\r\n"));
                assert!(dump.contains("<body unreadable: "));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_data_names_storage_path_and_key() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let output = make_output(&server);
        let mut content = Cursor::new(b"<html></html>".to_vec());
        output
            .put_reader("index.html", &mut content, "text/html; charset=utf-8")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let auth_data = requests[0]
            .headers
            .get(AUTH_DATA_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(auth_data.starts_with("5, 0.0.0.0, 0.0.0.0, "));
        assert!(auth_data.ends_with(", 123456/index.html, uploader"));
    }

    #[tokio::test]
    async fn test_put_reader_non_200_embeds_response_dump() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-diagnostic", "bad-signature")
                    .set_body_string("Forbidden: signature mismatch"),
            )
            .mount(&server)
            .await;

        let output = make_output(&server);
        let mut content = Cursor::new(b"data".to_vec());
        let err = output
            .put_reader("a.js", &mut content, "text/javascript; charset=utf-8")
            .await
            .unwrap_err();

        match &err {
            Error::UnexpectedStatus {
                status, path, dump, ..
            } => {
                assert_eq!(*status, 403);
                assert_eq!(path, "123456/a.js");
                assert!(dump.starts_with("HTTP/1.1 403 Forbidden\r\n"));
                assert!(dump.contains("x-diagnostic: bad-signature\r\n"));
                assert!(dump.ends_with("\r\n\r\nForbidden: signature mismatch"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("unexpected response code 403"));
    }

    #[tokio::test]
    async fn test_non_200_success_codes_are_errors() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let output = make_output(&server);
        let mut content = Cursor::new(Vec::new());
        let err = output
            .put_reader("empty.txt", &mut content, "text/plain; charset=utf-8")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnexpectedStatus { status: 201, .. }));
    }

    #[tokio::test]
    async fn test_delete_sends_signed_delete() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/123456/old/page.html"))
            .and(header(ACTION_HEADER, "version=1&action=upload"))
            .and(header_exists(AUTH_SIGN_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut output = make_output(&server);
        output.set_prefix("old");
        output.delete("page.html").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_surfaces_missing_object() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let output = make_output(&server);
        let err = output.delete("gone.css").await.unwrap_err();

        assert!(matches!(err, Error::UnexpectedStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_http_error() {
        let output = NetstorageOutput::new(
            "127.0.0.1:1".to_string(),
            "123456".to_string(),
            "uploader".to_string(),
            "secret".to_string(),
            "https://www.example.com".to_string(),
        );
        let mut content = Cursor::new(b"x".to_vec());

        let err = output
            .put_reader("a.txt", &mut content, "text/plain; charset=utf-8")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[test]
    fn test_url_for_uses_prefix_and_base_url() {
        let mut output = NetstorageOutput::new(
            "example-nsu.akamaihd.net".to_string(),
            "123456".to_string(),
            "uploader".to_string(),
            "secret".to_string(),
            "https://www.example.com".to_string(),
        );

        assert_eq!(
            output.url_for("news/today"),
            "https://www.example.com/news/today.json"
        );

        output.set_prefix("v2");
        let first = output.url_for("news/today");
        assert_eq!(first, "https://www.example.com/v2/news/today.json");
        assert_eq!(output.url_for("news/today"), first);
    }

    #[test]
    fn test_storage_path_normalizes_separators() {
        let mut output = NetstorageOutput::new(
            "host".to_string(),
            "/123456/".to_string(),
            "k".to_string(),
            "s".to_string(),
            "http://host".to_string(),
        );
        output.set_prefix("/v2/");

        assert_eq!(output.storage_path("img//logo.png"), "123456/v2/img/logo.png");
    }
}
