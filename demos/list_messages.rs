use chrono::{Duration, Utc};
use xenapi::Session;
use xenapi::api::message;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example list_messages -- https://pool.example root password 24
    let mut args = std::env::args().skip(1);
    let endpoint = args.next().ok_or("missing <endpoint>")?;
    let username = args.next().ok_or("missing <username>")?;
    let password = args.next().ok_or("missing <password>")?;
    let hours: i64 = args.next().unwrap_or_else(|| "24".into()).parse()?;

    let session = Session::builder(endpoint)
        .username(username)
        .password(password)
        .login()?;

    let version = session.detect_versions()?;
    println!(
        "API {} ({}), xapi {}",
        version.api,
        version.api.product().unwrap_or("unknown release"),
        version.xapi.as_deref().unwrap_or("?")
    );

    let since = Utc::now() - Duration::hours(hours);
    let mut messages: Vec<_> = session.execute(message::get_since(&since))?.into_iter().collect();
    messages.sort_by_key(|(_, m)| m.timestamp);
    for (_, m) in messages {
        println!("{} [{}] {} {}: {}", m.timestamp, m.priority, m.cls, m.obj_uuid, m.name);
    }

    session.logout()?;
    Ok(())
}
