//! End-to-end authorization flows against the in-memory store.

use std::sync::Arc;

use mcp_oauth::oauth::{
    AuthorizeRequest, ClientCredentials, CodeExchangeRequest, PkceChallenge, PkceVerifier,
    RefreshExchangeRequest,
};
use mcp_oauth::token::{IntrospectionRequest, RevocationRequest};
use mcp_oauth::types::{ClientMetadata, ExternalIdentity, TokenPair};
use mcp_oauth::{AuthConfig, AuthError, AuthorizationServer, SecretString};
use mcp_oauth_memory::InMemoryAuthStore;

const RESOURCE: &str = "https://mcp.example.com";
const REDIRECT: &str = "http://localhost:3000/callback";

struct Harness {
    store: Arc<InMemoryAuthStore>,
    server: AuthorizationServer,
}

fn harness() -> Harness {
    let mut config = AuthConfig {
        issuer: "https://auth.example.com".to_string(),
        resource: RESOURCE.to_string(),
        ..Default::default()
    };
    config.oauth.hmac_secret = SecretString::new("0123456789abcdef0123456789abcdef");

    let store = Arc::new(InMemoryAuthStore::new());
    let server = AuthorizationServer::new(config, store.stores()).expect("valid config");
    Harness { store, server }
}

async fn register(server: &AuthorizationServer, auth_method: &str) -> (String, Option<String>) {
    let client = server
        .registry()
        .register(ClientMetadata {
            redirect_uris: vec![REDIRECT.to_string()],
            token_endpoint_auth_method: Some(auth_method.to_string()),
            scope: Some("tools:read tools:write".to_string()),
            ..Default::default()
        })
        .await
        .expect("register client");
    (client.client_id, client.client_secret)
}

/// Runs authorize and callback, returning the code from the client redirect.
async fn obtain_code(server: &AuthorizationServer, client_id: &str, verifier: &PkceVerifier) -> String {
    let challenge = PkceChallenge::from_verifier(verifier);
    let request = AuthorizeRequest::code(client_id, REDIRECT, challenge.as_str())
        .with_state("client-state")
        .with_resource(RESOURCE);
    let start = server.sessions().begin(&request).await.expect("begin");

    let identity = ExternalIdentity::new("github", "42").with_username("octocat");
    let redirect = server
        .engine()
        .complete_authentication(&start.binding, identity)
        .await
        .expect("complete authentication");

    let url = url::Url::parse(&redirect).expect("redirect url");
    assert!(redirect.starts_with(REDIRECT));
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };
    assert_eq!(param("state").as_deref(), Some("client-state"));
    param("code").expect("code in redirect")
}

fn code_request(code: &str, verifier: &PkceVerifier, credentials: ClientCredentials) -> CodeExchangeRequest {
    CodeExchangeRequest {
        code: code.to_string(),
        redirect_uri: Some(REDIRECT.to_string()),
        code_verifier: Some(verifier.as_str().to_string()),
        resource: Some(RESOURCE.to_string()),
        credentials,
    }
}

fn refresh_request(pair: &TokenPair, client_id: &str) -> RefreshExchangeRequest {
    RefreshExchangeRequest {
        refresh_token: pair.refresh_token.clone(),
        scope: None,
        resource: None,
        credentials: ClientCredentials::public(client_id),
    }
}

async fn is_active(server: &AuthorizationServer, token: &str, client_id: &str) -> bool {
    server
        .engine()
        .introspect(&IntrospectionRequest {
            token: token.to_string(),
            token_type_hint: None,
            credentials: ClientCredentials::public(client_id),
        })
        .await
        .active
}

#[tokio::test]
async fn public_client_full_flow() {
    let Harness { store, server } = harness();
    let (client_id, secret) = register(&server, "none").await;
    assert!(secret.is_none());

    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &client_id, &verifier).await;
    assert_eq!(store.session_count(), 0);
    assert_eq!(store.code_count(), 1);

    let pair = server
        .engine()
        .exchange_code(code_request(&code, &verifier, ClientCredentials::public(&client_id)))
        .await
        .expect("exchange code");
    assert_eq!(pair.token_type, "bearer");
    assert_eq!(pair.expires_in, 3600);
    assert_eq!(pair.scope.as_deref(), Some("tools:read tools:write"));
    assert_eq!(store.code_count(), 0);

    let introspection = server
        .engine()
        .introspect(&IntrospectionRequest {
            token: pair.access_token.clone(),
            token_type_hint: Some("access_token".to_string()),
            credentials: ClientCredentials::public(&client_id),
        })
        .await;
    assert!(introspection.active);
    assert_eq!(introspection.client_id.as_deref(), Some(client_id.as_str()));
    assert_eq!(introspection.username.as_deref(), Some("octocat"));
    assert_eq!(introspection.sub.as_deref(), Some("github:42"));
    assert_eq!(introspection.aud.as_deref(), Some(RESOURCE));

    let metadata = server
        .tokens()
        .validate_access(&pair.access_token)
        .await
        .expect("validate access")
        .expect("active access token");
    assert_eq!(metadata.resource.as_deref(), Some(RESOURCE));
    assert_eq!(metadata.user_id, "github:42");
}

#[tokio::test]
async fn confidential_client_must_authenticate() {
    let Harness { server, .. } = harness();
    let (client_id, secret) = register(&server, "client_secret_basic").await;
    let secret = secret.expect("confidential clients get a secret");

    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &client_id, &verifier).await;

    let err = server
        .engine()
        .exchange_code(code_request(
            &code,
            &verifier,
            ClientCredentials::confidential(&client_id, "wrong-secret"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidClient { .. }));

    // A failed client authentication leaves the code redeemable
    let pair = server
        .engine()
        .exchange_code(code_request(
            &code,
            &verifier,
            ClientCredentials::confidential(&client_id, &secret),
        ))
        .await
        .expect("exchange with secret");
    assert!(!pair.access_token.is_empty());
}

#[tokio::test]
async fn code_is_single_use() {
    let Harness { server, .. } = harness();
    let (client_id, _) = register(&server, "none").await;
    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &client_id, &verifier).await;

    let credentials = ClientCredentials::public(&client_id);
    server
        .engine()
        .exchange_code(code_request(&code, &verifier, credentials.clone()))
        .await
        .expect("first exchange");

    let err = server
        .engine()
        .exchange_code(code_request(&code, &verifier, credentials))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));
}

#[tokio::test]
async fn concurrent_code_redemption_has_one_winner() {
    let Harness { server, .. } = harness();
    let (client_id, _) = register(&server, "none").await;
    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &client_id, &verifier).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let server = server.clone();
        let request = code_request(&code, &verifier, ClientCredentials::public(&client_id));
        handles.push(tokio::spawn(async move {
            server.engine().exchange_code(request).await.is_ok()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.expect("task") {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn wrong_verifier_is_rejected() {
    let Harness { server, .. } = harness();
    let (client_id, _) = register(&server, "none").await;
    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &client_id, &verifier).await;

    let other = PkceVerifier::generate();
    let err = server
        .engine()
        .exchange_code(code_request(&code, &other, ClientCredentials::public(&client_id)))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));
}

#[tokio::test]
async fn refresh_rotation_and_reuse_detection() {
    let Harness { store, server } = harness();
    let (client_id, _) = register(&server, "none").await;
    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &client_id, &verifier).await;
    let first = server
        .engine()
        .exchange_code(code_request(&code, &verifier, ClientCredentials::public(&client_id)))
        .await
        .expect("exchange");

    let second = server
        .engine()
        .exchange_refresh_token(refresh_request(&first, &client_id))
        .await
        .expect("rotate");
    assert_ne!(second.refresh_token, first.refresh_token);
    assert!(is_active(&server, &second.access_token, &client_id).await);

    // Presenting the rotated-away token is a replay
    let err = server
        .engine()
        .exchange_refresh_token(refresh_request(&first, &client_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));

    // The whole family is gone, including the legitimate successor
    assert!(!is_active(&server, &first.access_token, &client_id).await);
    assert!(!is_active(&server, &second.access_token, &client_id).await);
    assert!(!is_active(&server, &second.refresh_token, &client_id).await);
    assert_eq!(store.refresh_token_count(), 0);

    let err = server
        .engine()
        .exchange_refresh_token(refresh_request(&second, &client_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));
}

#[tokio::test]
async fn refresh_for_other_resource_is_rejected() {
    let Harness { server, .. } = harness();
    let (client_id, _) = register(&server, "none").await;
    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &client_id, &verifier).await;
    let pair = server
        .engine()
        .exchange_code(code_request(&code, &verifier, ClientCredentials::public(&client_id)))
        .await
        .expect("exchange");

    let mut request = refresh_request(&pair, &client_id);
    request.resource = Some("https://other.example.com".to_string());
    let err = server
        .engine()
        .exchange_refresh_token(request)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));

    // Still usable for the right resource
    let mut request = refresh_request(&pair, &client_id);
    request.resource = Some(RESOURCE.to_string());
    assert!(server.engine().exchange_refresh_token(request).await.is_ok());
}

#[tokio::test]
async fn introspection_hides_other_clients_tokens() {
    let Harness { server, .. } = harness();
    let (owner, _) = register(&server, "none").await;
    let (other, _) = register(&server, "none").await;
    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &owner, &verifier).await;
    let pair = server
        .engine()
        .exchange_code(code_request(&code, &verifier, ClientCredentials::public(&owner)))
        .await
        .expect("exchange");

    assert!(is_active(&server, &pair.access_token, &owner).await);
    assert!(!is_active(&server, &pair.access_token, &other).await);
    assert!(!is_active(&server, "not-a-token", &owner).await);
}

#[tokio::test]
async fn revocation_only_affects_owned_tokens() {
    let Harness { server, .. } = harness();
    let (owner, _) = register(&server, "none").await;
    let (other, _) = register(&server, "none").await;
    let verifier = PkceVerifier::generate();
    let code = obtain_code(&server, &owner, &verifier).await;
    let pair = server
        .engine()
        .exchange_code(code_request(&code, &verifier, ClientCredentials::public(&owner)))
        .await
        .expect("exchange");

    let revoke = |client_id: &str, token: &str, hint: Option<&str>| RevocationRequest {
        token: token.to_string(),
        token_type_hint: hint.map(str::to_string),
        credentials: ClientCredentials::public(client_id),
    };

    server
        .engine()
        .revoke(&revoke(&other, &pair.access_token, None))
        .await;
    assert!(is_active(&server, &pair.access_token, &owner).await);

    server
        .engine()
        .revoke(&revoke(&owner, &pair.access_token, Some("refresh_token")))
        .await;
    assert!(!is_active(&server, &pair.access_token, &owner).await);
    assert!(is_active(&server, &pair.refresh_token, &owner).await);

    server
        .engine()
        .revoke(&revoke(&owner, &pair.refresh_token, Some("refresh_token")))
        .await;
    assert!(!is_active(&server, &pair.refresh_token, &owner).await);
}
