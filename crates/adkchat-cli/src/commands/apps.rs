use anyhow::Result;

use adkchat_interaction::AgentApiClient;

use super::{Output, user_facing};

pub async fn list(base_url: &str, output: &Output) -> Result<()> {
    let apps = AgentApiClient::new(base_url)
        .list_apps()
        .await
        .map_err(user_facing)?;

    output.emit(&apps, || {
        if apps.is_empty() {
            println!("No apps available.");
        }
        for app in &apps {
            println!("{}", app);
        }
    })
}
