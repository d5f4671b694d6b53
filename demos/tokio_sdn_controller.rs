#[cfg(feature = "async")]
mod enabled {
    use std::time::Duration;

    use xenapi::api::enums::SdnControllerProtocol;
    use xenapi::api::sdn_controller;
    use xenapi::{AsyncSession, PollPolicy};

    #[tokio::main(flavor = "current_thread")]
    pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
        // Example:
        //   cargo run --example tokio_sdn_controller --features async -- https://pool.example root password 10.0.0.1
        let mut args = std::env::args().skip(1);
        let endpoint = args.next().ok_or("missing <endpoint>")?;
        let username = args.next().ok_or("missing <username>")?;
        let password = args.next().ok_or("missing <password>")?;
        let address = args.next().ok_or("missing <controller address>")?;

        let session = AsyncSession::builder(endpoint)
            .username(username)
            .password(password)
            .connect_timeout(Duration::from_secs(5))
            .login()
            .await?;

        let task = session
            .execute(sdn_controller::async_introduce(
                SdnControllerProtocol::Ssl,
                &address,
                6640,
            ))
            .await?;
        let controller: sdn_controller::SdnControllerRef =
            session.await_task(&task, PollPolicy::default()).await?;
        let record = session.execute(sdn_controller::get_record(&controller)).await?;
        println!("SDN controller {controller}: {record:?}");

        session.execute(sdn_controller::forget(&controller)).await?;
        session.logout().await?;
        Ok(())
    }
}

#[cfg(feature = "async")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    enabled::main()
}

#[cfg(not(feature = "async"))]
fn main() {
    eprintln!("This example requires feature `async`.");
}
