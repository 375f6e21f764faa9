use std::sync::Arc;

use box_core::auth::{Authenticator, Credentials, SubjectType};
use box_core::client::{BoxApi, BoxEndpoints, HttpBoxClient};
use box_core::control::{DownloadContent, DownloadRequest, ManageFolderRequest};
use box_core::services::{BoxSession, BuildClientFn, SessionError, SessionState};
use mockito::{Matcher, Server, ServerGuard};

fn build_session(server: &ServerGuard) -> BoxSession {
    let endpoints = BoxEndpoints::single_host(server.url());
    let build: BuildClientFn = Arc::new(move || {
        let endpoints = endpoints.clone();
        Box::pin(async move {
            let http = reqwest::Client::new();
            let auth = Arc::new(Authenticator::new(
                http.clone(),
                endpoints.clone(),
                Credentials::ClientCredentials {
                    client_id: "client".to_string(),
                    client_secret: "secret".to_string(),
                    subject_type: SubjectType::Enterprise,
                    subject_id: "100".to_string(),
                },
            ));
            auth.authenticate()
                .await
                .map_err(|err| SessionError::BuildFailed(err.to_string()))?;
            let client: Arc<dyn BoxApi> = Arc::new(HttpBoxClient::new(http, endpoints, auth));
            Ok(client)
        })
    });
    BoxSession::new(build)
}

async fn mock_token(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/oauth2/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"svc-token","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn initialized_session_serves_tool_calls() {
    let mut server = Server::new_async().await;
    let token = mock_token(&mut server).await;
    let me = server
        .mock("GET", "/2.0/users/me")
        .match_header("authorization", "Bearer svc-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"type":"user","id":"100","name":"Service Account"}"#)
        .create_async()
        .await;

    let session = build_session(&server);
    assert!(matches!(session.control(), Err(SessionError::Uninitialized)));

    session.initialize().await.expect("session should initialize");
    assert_eq!(session.state(), SessionState::Ready);

    let user = session
        .control()
        .expect("control plane")
        .who_am_i()
        .await
        .expect("current user");
    assert_eq!(user.name.as_deref(), Some("Service Account"));

    token.assert_async().await;
    me.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_fail_initialization() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/oauth2/token")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"invalid_grant","error_description":"Grant credentials are invalid"}"#)
        .create_async()
        .await;

    let session = build_session(&server);
    let err = session
        .initialize()
        .await
        .err()
        .expect("initialization should fail");
    assert!(matches!(err, SessionError::BuildFailed(ref reason) if reason.contains("invalid")));
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn folder_delete_reaches_the_api_with_recursive_flag() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let delete = server
        .mock("DELETE", "/2.0/folders/77")
        .match_query(Matcher::UrlEncoded("recursive".into(), "true".into()))
        .with_status(204)
        .create_async()
        .await;

    let session = build_session(&server);
    session.initialize().await.expect("session should initialize");
    let outcome = session
        .control()
        .expect("control plane")
        .manage_folder(ManageFolderRequest {
            action: "Delete".to_string(),
            folder_id: Some("77".to_string()),
            recursive: true,
            ..ManageFolderRequest::default()
        })
        .await
        .expect("delete folder");
    assert_eq!(outcome.message, "Folder with ID 77 deleted successfully");
    delete.assert_async().await;
}

#[tokio::test]
async fn download_dispatches_on_response_type() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let _info = server
        .mock("GET", "/2.0/files/5")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"type":"file","id":"5","name":"readme.md"}"#)
        .create_async()
        .await;
    let _content = server
        .mock("GET", "/2.0/files/5/content")
        .with_status(200)
        .with_header("content-type", "text/markdown; charset=utf-8")
        .with_body("# Hello")
        .create_async()
        .await;

    let session = build_session(&server);
    session.initialize().await.expect("session should initialize");
    let outcome = session
        .control()
        .expect("control plane")
        .download(DownloadRequest {
            file_id: "5".to_string(),
            ..DownloadRequest::default()
        })
        .await
        .expect("download");
    assert_eq!(outcome.mime_type.as_deref(), Some("text/markdown"));
    assert_eq!(
        outcome.content,
        DownloadContent::Text {
            text: "# Hello".to_string()
        }
    );
}
