use xenapi::Session;
use xenapi::api::user;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example user_lifecycle -- https://pool.example root password alice
    let mut args = std::env::args().skip(1);
    let endpoint = args.next().ok_or("missing <endpoint>")?;
    let username = args.next().ok_or("missing <username>")?;
    let password = args.next().ok_or("missing <password>")?;
    let short_name = args.next().ok_or("missing <short_name>")?;

    let session = Session::builder(endpoint)
        .username(username)
        .password(password)
        .originator("user_lifecycle")
        .login()?;

    let fields = user::UserRecord {
        short_name: short_name.clone(),
        fullname: format!("{short_name} (demo)"),
        ..Default::default()
    };
    let r = session.execute(user::create(&fields))?;
    session.execute(user::add_to_other_config(&r, "created_by", "xenapi-rs"))?;

    let record = session.execute(user::get_record(&r))?;
    println!("User {r}: {record:?}");

    session.execute(user::destroy(&r))?;
    session.logout()?;
    Ok(())
}
