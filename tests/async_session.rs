#![cfg(feature = "async")]

mod support;

use std::time::Duration;

use support::{ENDPOINT, FakeXapi, PASSWORD, USERNAME};
use xenapi::api::enums::{Cls, SdnControllerProtocol};
use xenapi::api::{message, sdn_controller, user};
use xenapi::fault::codes;
use xenapi::{AsyncSession, Error, PollPolicy, SessionState};

async fn login(server: &FakeXapi) -> AsyncSession {
    AsyncSession::builder(ENDPOINT)
        .username(USERNAME)
        .password(PASSWORD)
        .transport(server.clone())
        .login()
        .await
        .expect("login")
}

fn quick() -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(1)).with_deadline(Duration::from_secs(5))
}

#[tokio::test]
async fn create_user_and_read_it_back() {
    let server = FakeXapi::new();
    let session = login(&server).await;

    let fields = user::UserRecord {
        short_name: "alice".into(),
        fullname: "Alice Example".into(),
        ..Default::default()
    };
    let r = session.execute(user::create(&fields)).await.expect("create");
    let record = session.execute(user::get_record(&r)).await.expect("record");
    assert_eq!(record.short_name, "alice");
    assert_eq!(record.fullname, "Alice Example");
}

#[tokio::test]
async fn async_destroy_many_completes() {
    let server = FakeXapi::new();
    let session = login(&server).await;
    let m = session
        .execute(message::create("A", 1, Cls::Host, "h", "body"))
        .await
        .expect("create");

    server.set_pending_polls(3);
    let k = session
        .execute(message::async_destroy_many(&[m]))
        .await
        .expect("async call");
    session
        .await_task::<()>(&k, quick())
        .await
        .expect("task succeeds");
    assert!(session
        .execute(message::get_all())
        .await
        .expect("get_all")
        .is_empty());
}

#[tokio::test]
async fn tasks_can_be_awaited_concurrently() {
    let server = FakeXapi::new();
    let session = login(&server).await;
    server.set_pending_polls(2);

    let mut handles = Vec::new();
    for port in [6640, 6641, 6642] {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            let k = session
                .execute(sdn_controller::async_introduce(
                    SdnControllerProtocol::Ssl,
                    "10.0.0.1",
                    port,
                ))
                .await?;
            let c: sdn_controller::SdnControllerRef = session.await_task(&k, quick()).await?;
            session.execute(sdn_controller::get_port(&c)).await
        }));
    }

    let mut ports = Vec::new();
    for handle in handles {
        ports.push(handle.await.expect("join").expect("introduce"));
    }
    ports.sort_unstable();
    assert_eq!(ports, vec![6640, 6641, 6642]);
}

#[tokio::test]
async fn fault_is_annotated() {
    let server = FakeXapi::new();
    let session = login(&server).await;
    let bogus = message::MessageRef::new("OpaqueRef:bogus");

    let err = session
        .execute(message::get_record(&bogus))
        .await
        .expect_err("bogus");
    let api = err.api_error().expect("api error");
    assert_eq!(api.code, codes::HANDLE_INVALID);
    assert_eq!(api.call.as_deref(), Some("message.get_record(self)"));
}

#[tokio::test]
async fn logout_twice_then_calls_fail() {
    let server = FakeXapi::new();
    let session = login(&server).await;

    session.logout().await.expect("logout");
    session.logout().await.expect("second logout");
    assert_eq!(session.state(), SessionState::Closed);

    let err = session
        .execute(message::get_all())
        .await
        .expect_err("closed");
    assert!(matches!(err, Error::SessionClosed));
}

#[tokio::test]
async fn redirect_is_followed() {
    let server = FakeXapi::new();
    server.redirect_to("https://10.0.0.2/");
    let session = login(&server).await;
    assert_eq!(session.endpoint().as_str(), "https://10.0.0.2/");

    let version = session.detect_versions().await.expect("versions");
    assert_eq!(version.api.to_string(), "2.21");
}

#[tokio::test]
async fn logout_stub_and_host_local_login() {
    let server = FakeXapi::new();
    let session = login(&server).await;
    session
        .execute(xenapi::api::session::logout())
        .await
        .expect("logout stub");
    assert_eq!(session.state(), SessionState::Closed);

    server.act_as_pool_member("10.0.0.1");
    let member = AsyncSession::builder(ENDPOINT)
        .username(USERNAME)
        .password(PASSWORD)
        .slave_local(true)
        .transport(server.clone())
        .login()
        .await
        .expect("host-local login");
    member.execute(message::get_all()).await.expect("call");
    member.logout().await.expect("local logout");
    assert_eq!(server.methods().last().map(String::as_str), Some("session.local_logout"));
}
