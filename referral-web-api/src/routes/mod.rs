use rocket::fairing::AdHoc;

pub mod commission;
pub mod earnings;
pub mod referral_code;

pub fn mount() -> AdHoc {
    AdHoc::on_ignite("Attaching Routes", |rocket| async {
        rocket.mount(
            "/",
            routes![
                commission::process,
                earnings::list,
                earnings::sum,
                earnings::levels,
                earnings::summary,
                referral_code::validate
            ],
        )
    })
}
