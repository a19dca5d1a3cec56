//! Scraper role verification across primary and secondary servers.

use axum::http::StatusCode;

use lib_rtcv::client::CapabilityErrorKind;
use lib_rtcv::retrieve::{RequestError, RetryPolicy};
use lib_rtcv::utils::authorization_value;
use lib_rtcv::{ClientOptions, Cv, LoginUsersRestriction, ScraperClient, ScraperError, SendOutcome};
use project_tests::{env_for, MockConfig, MockRtcvServer, TEST_KEY, TEST_KEY_ID};

fn client_for(primary: &MockRtcvServer, secondaries: &[&MockRtcvServer]) -> ScraperClient {
    let env = env_for(
        primary.credentials(),
        secondaries.iter().map(|s| s.credentials()).collect(),
    );
    let options = ClientOptions {
        retry: RetryPolicy::no_retry(),
        ..ClientOptions::default()
    };
    ScraperClient::with_options(env, LoginUsersRestriction::One, options).unwrap()
}

#[tokio::test]
async fn every_server_is_checked() {
    let primary = MockRtcvServer::healthy().await.unwrap();
    let first = MockRtcvServer::healthy().await.unwrap();
    let second = MockRtcvServer::healthy().await.unwrap();
    let client = client_for(&primary, &[&first, &second]);

    client.authenticate().await.unwrap();
    assert!(client.is_authenticated());
    for server in [&primary, &first, &second] {
        assert_eq!(server.keyinfo_hits(), 1);
        assert_eq!(server.auth_headers(), vec![authorization_value(TEST_KEY_ID, TEST_KEY)]);
    }
}

#[tokio::test]
async fn second_authenticate_does_not_hit_the_servers() {
    let primary = MockRtcvServer::healthy().await.unwrap();
    let client = client_for(&primary, &[]);

    client.authenticate().await.unwrap();
    client.authenticate().await.unwrap();
    assert_eq!(primary.keyinfo_hits(), 1);
}

#[tokio::test]
async fn missing_role_on_a_secondary_names_that_server() {
    let primary = MockRtcvServer::healthy().await.unwrap();
    let lacking = MockRtcvServer::start(MockConfig::without_scraper_role()).await.unwrap();
    let third = MockRtcvServer::healthy().await.unwrap();
    let client = client_for(&primary, &[&lacking, &third]);

    match client.authenticate().await {
        Err(ScraperError::Capability(err)) => {
            assert_eq!(err.location, lacking.location());
            assert!(matches!(err.kind, CapabilityErrorKind::MissingScraperRole));
            assert!(err.to_string().contains(lacking.location()));
        }
        other => panic!("expected a capability error, got {:?}", other.map(|_| ())),
    }
    assert!(!client.is_authenticated());

    let err = client.send_cv(&Cv::new("blocked")).await.unwrap_err();
    assert!(matches!(err, ScraperError::NotAuthenticated));
    assert_eq!(primary.scan_hits(), 0);
}

#[tokio::test]
async fn rejected_key_surfaces_the_status() {
    let primary = MockRtcvServer::start(MockConfig {
        keyinfo_status: StatusCode::UNAUTHORIZED,
        ..MockConfig::default()
    })
    .await
    .unwrap();
    let client = client_for(&primary, &[]);

    match client.authenticate().await {
        Err(ScraperError::Capability(err)) => match err.kind {
            CapabilityErrorKind::Request(RequestError::Status { status, .. }) => {
                assert_eq!(status, 401);
            }
            other => panic!("expected a status error, got {:?}", other),
        },
        other => panic!("expected a capability error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn failed_authenticate_can_be_retried() {
    let lacking = MockRtcvServer::start(MockConfig::without_scraper_role()).await.unwrap();
    let primary = MockRtcvServer::healthy().await.unwrap();

    let broken = client_for(&lacking, &[]);
    assert!(broken.authenticate().await.is_err());
    assert!(broken.authenticate().await.is_err());
    assert_eq!(lacking.keyinfo_hits(), 2);

    let working = client_for(&primary, &[]);
    working.authenticate().await.unwrap();
    assert_eq!(working.send_cv(&Cv::new("after-auth")).await.unwrap(), SendOutcome::Sent);
}
