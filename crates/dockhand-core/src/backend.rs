use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::state::Artifact;

/// Body of `POST /`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub message: String,
    #[serde(rename = "githubLink")]
    pub repository_link: String,
    #[serde(rename = "hasgit")]
    pub link_provided: bool,
    pub chat_history: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Dockerfile,
    FollowUp,
    Message,
    #[default]
    #[serde(other)]
    Other,
}

/// Reply to `POST /`.
///
/// The run command arrives as `commands` or, from older backends, `command`.
/// When both are present `commands` wins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawGenerationResponse")]
pub struct GenerationResponse {
    pub message: String,
    pub kind: ResponseKind,
    pub dockerfile: Option<String>,
    pub run_command: Option<String>,
}

#[derive(Deserialize)]
struct RawGenerationResponse {
    message: String,
    #[serde(rename = "type", default)]
    kind: ResponseKind,
    #[serde(default)]
    dockerfile: Option<String>,
    #[serde(default)]
    commands: Option<String>,
    #[serde(default)]
    command: Option<String>,
}

impl From<RawGenerationResponse> for GenerationResponse {
    fn from(raw: RawGenerationResponse) -> Self {
        Self {
            message: raw.message,
            kind: raw.kind,
            dockerfile: raw.dockerfile,
            run_command: raw.commands.or(raw.command),
        }
    }
}

/// Body of `POST /finalize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizeRequest {
    pub dockerfile: String,
    #[serde(rename = "commands")]
    pub run_command: Option<String>,
    #[serde(rename = "githubLink")]
    pub repository_link: String,
}

impl FinalizeRequest {
    pub fn new(artifact: &Artifact, repository_link: &str) -> Self {
        Self {
            dockerfile: artifact.dockerfile.clone(),
            run_command: artifact.run_command.clone(),
            repository_link: repository_link.to_string(),
        }
    }
}

/// The remote service that writes Dockerfiles.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;

    async fn finalize(&self, request: &FinalizeRequest) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let url = format!("{}/", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Generation request failed with status {}: {}", status, text));
        }

        let generation: GenerationResponse = response.json().await?;
        Ok(generation)
    }

    async fn finalize(&self, request: &FinalizeRequest) -> Result<()> {
        let url = format!("{}/finalize", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Finalize request failed with status: {}", response.status()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[test]
    fn test_generation_request_uses_wire_names() {
        let request = GenerationRequest {
            message: "Create a node app".to_string(),
            repository_link: "https://example.com/repo".to_string(),
            link_provided: true,
            chat_history: "Human: Create a node app".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "message": "Create a node app",
                "githubLink": "https://example.com/repo",
                "hasgit": true,
                "chat_history": "Human: Create a node app",
            })
        );
    }

    #[test]
    fn test_dockerfile_response_with_commands() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "message": "Here is your file",
            "type": "dockerfile",
            "dockerfile": "FROM node:18",
            "commands": "docker build .",
        }))
        .unwrap();

        assert_eq!(response.kind, ResponseKind::Dockerfile);
        assert_eq!(response.dockerfile.as_deref(), Some("FROM node:18"));
        assert_eq!(response.run_command.as_deref(), Some("docker build ."));
    }

    #[test]
    fn test_singular_command_field_is_accepted() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "message": "Here is your file",
            "type": "dockerfile",
            "dockerfile": "FROM rust:1",
            "command": "docker run app",
        }))
        .unwrap();

        assert_eq!(response.run_command.as_deref(), Some("docker run app"));
    }

    #[test]
    fn test_both_command_fields_prefer_commands() {
        let response: GenerationResponse = serde_json::from_str(
            r#"{"message":"Here is your file","type":"dockerfile","dockerfile":"FROM node:18","commands":"docker build .","command":"docker run app"}"#,
        )
        .unwrap();

        assert_eq!(response.kind, ResponseKind::Dockerfile);
        assert_eq!(response.dockerfile.as_deref(), Some("FROM node:18"));
        assert_eq!(response.run_command.as_deref(), Some("docker build ."));
    }

    #[test]
    fn test_null_commands_falls_back_to_command() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "message": "Here is your file",
            "type": "dockerfile",
            "dockerfile": "FROM node:18",
            "commands": null,
            "command": "docker run app",
        }))
        .unwrap();

        assert_eq!(response.run_command.as_deref(), Some("docker run app"));
    }

    #[test]
    fn test_follow_up_with_null_dockerfile() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "message": "Which port does the app listen on?",
            "type": "follow_up",
            "dockerfile": null,
        }))
        .unwrap();

        assert_eq!(response.kind, ResponseKind::FollowUp);
        assert!(response.dockerfile.is_none());
        assert!(response.run_command.is_none());
    }

    #[test]
    fn test_unknown_kind_maps_to_other() {
        let response: GenerationResponse =
            serde_json::from_value(json!({"message": "hi", "type": "compose"})).unwrap();
        assert_eq!(response.kind, ResponseKind::Other);
    }

    #[test]
    fn test_finalize_request_serializes_missing_command_as_null() {
        let artifact = Artifact {
            dockerfile: "FROM node:18".to_string(),
            run_command: None,
        };
        let request = FinalizeRequest::new(&artifact, "Not provided");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "dockerfile": "FROM node:18",
                "commands": null,
                "githubLink": "Not provided",
            })
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:3001/");
        assert_eq!(backend.base_url(), "http://localhost:3001");
    }

    /// Recorded request line and JSON body from the stub server
    struct Received {
        request_line: String,
        body: serde_json::Value,
    }

    /// Answer exactly one HTTP request on a local port with `status` and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before body");
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            Received {
                request_line: head.lines().next().unwrap_or_default().to_string(),
                body: serde_json::from_slice(&buf[header_end..header_end + content_length]).unwrap(),
            }
        });

        (base_url, handle)
    }

    fn local_backend(base_url: &str) -> HttpBackend {
        HttpBackend::with_client(base_url, Client::builder().no_proxy().build().unwrap())
    }

    fn node_request() -> GenerationRequest {
        GenerationRequest {
            message: "Create a node app".to_string(),
            repository_link: "https://example.com/repo".to_string(),
            link_provided: true,
            chat_history: "Human: Create a node app".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_posts_to_root_and_parses_reply() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"message":"Here is your file","type":"dockerfile","dockerfile":"FROM node:18","commands":"docker build ."}"#,
        )
        .await;
        let backend = local_backend(&format!("{}/", base_url));

        let response = backend.generate(&node_request()).await.unwrap();
        let received = server.await.unwrap();

        assert_eq!(received.request_line, "POST / HTTP/1.1");
        assert_eq!(
            received.body,
            json!({
                "message": "Create a node app",
                "githubLink": "https://example.com/repo",
                "hasgit": true,
                "chat_history": "Human: Create a node app",
            })
        );
        assert_eq!(response.kind, ResponseKind::Dockerfile);
        assert_eq!(response.run_command.as_deref(), Some("docker build ."));
    }

    #[tokio::test]
    async fn test_generate_server_error_is_err() {
        let (base_url, server) =
            serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let backend = local_backend(&base_url);

        let result = backend.generate(&node_request()).await;
        server.await.unwrap();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("500"), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_finalize_posts_artifact_to_finalize() {
        let (base_url, server) = serve_once("200 OK", "{}").await;
        let backend = local_backend(&base_url);
        let artifact = Artifact {
            dockerfile: "FROM node:18".to_string(),
            run_command: Some("docker build .".to_string()),
        };

        backend
            .finalize(&FinalizeRequest::new(&artifact, "https://example.com/repo"))
            .await
            .unwrap();
        let received = server.await.unwrap();

        assert_eq!(received.request_line, "POST /finalize HTTP/1.1");
        assert_eq!(
            received.body,
            json!({
                "dockerfile": "FROM node:18",
                "commands": "docker build .",
                "githubLink": "https://example.com/repo",
            })
        );
    }

    #[tokio::test]
    async fn test_finalize_server_error_is_err() {
        let (base_url, server) =
            serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let backend = local_backend(&base_url);
        let artifact = Artifact {
            dockerfile: "FROM node:18".to_string(),
            run_command: None,
        };

        let result = backend
            .finalize(&FinalizeRequest::new(&artifact, "Not provided"))
            .await;
        server.await.unwrap();

        assert!(result.is_err());
    }
}
