//! Host entry point: wires the console display and the button-less
//! controller variant together from `config.json`.

use std::sync::Arc;

use anyhow::Context;

use spotify_status::button::ButtonMonitor;
use spotify_status::config::Config;
use spotify_status::controller::PlaybackController;
use spotify_status::display::{ConsoleDisplay, ShowOptions, SharedDisplay};
use spotify_status::logging::init_logging;
use spotify_status::model::{CredentialManager, ReplyClassifier, RetryingHttpClient, SpotifyApi};

const CONFIG_PATH: &str = "config.json";
const REFRESH_TOKEN_PATH: &str = "refresh_token.txt";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let display: SharedDisplay = Arc::new(ConsoleDisplay);

    let config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            // configuration problems must be visible without log access
            display.show("Config error", &e.to_string(), ShowOptions::status());
            return Err(e.into());
        }
    };
    tracing::info!(path = CONFIG_PATH, "configuration loaded");

    let client = RetryingHttpClient::new(display.clone(), config.api_request_dot_size)
        .context("building http client")?;
    let classifier = ReplyClassifier::new(display.clone());
    let api = SpotifyApi::new(client.clone(), classifier.clone());

    let redirect_uri = format!("http://{}.local/callback/", config.wlan.mdns);
    let credentials = CredentialManager::new(
        client,
        classifier,
        &config.spotify,
        redirect_uri,
        config.wlan.mdns.clone(),
        REFRESH_TOKEN_PATH,
    );

    // no physical buttons on the host build
    let long_press = config.long_press_duration_milliseconds;
    let mut controller = PlaybackController::new(
        config,
        api,
        credentials,
        display.clone(),
        ButtonMonitor::inert(long_press),
        ButtonMonitor::inert(long_press),
    );

    tokio::select! {
        result = controller.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "controller stopped with an error");
                display.show("Error", &e.to_string(), ShowOptions::status());
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("keyboard interrupt received, stopping");
            display.clear();
        }
    }

    Ok(())
}
