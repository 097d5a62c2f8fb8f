use anyhow::Context;

use crate::config::Credentials;

const DASH_USERNAME: &str = "DASH_USERNAME";

const DASH_PASSWORD: &str = "DASH_PASSWORD";

const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";

fn require(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} is not set"))
}

pub fn get_credentials() -> anyhow::Result<Credentials> {
    Ok(Credentials {
        username: require(DASH_USERNAME)?,
        password: require(DASH_PASSWORD)?,
    })
}

pub fn get_telegram_token() -> anyhow::Result<String> {
    require(TELEGRAM_TOKEN)
}
