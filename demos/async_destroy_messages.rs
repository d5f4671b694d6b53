use std::time::Duration;

use xenapi::api::message;
use xenapi::{PollPolicy, Session};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example async_destroy_messages -- https://pool.example root password HA_POOL_OVERCOMMITTED
    let mut args = std::env::args().skip(1);
    let endpoint = args.next().ok_or("missing <endpoint>")?;
    let username = args.next().ok_or("missing <username>")?;
    let password = args.next().ok_or("missing <password>")?;
    let name = args.next().ok_or("missing <message name>")?;

    let session = Session::builder(endpoint)
        .username(username)
        .password(password)
        .request_timeout(Duration::from_secs(30))
        .login()?;

    let doomed: Vec<_> = session
        .execute(message::get_all_records_where(&format!("field \"name\"=\"{name}\"")))?
        .into_keys()
        .collect();
    println!("Destroying {} message(s)", doomed.len());

    let task = session.execute(message::async_destroy_many(&doomed))?;
    let policy = PollPolicy::default().with_deadline(Duration::from_secs(120));
    session.await_task::<()>(&task, policy)?;
    session.execute(xenapi::api::task::destroy(&task))?;

    session.logout()?;
    Ok(())
}
